use crate::model::TEXT_CAPACITY;

const ELLIPSIS: &str = "...";

enum EscapeMode {
    Esc,
    Csi,
    Osc,
    OscEsc,
}

/// Reduces arbitrary text to what a text field can hold: printable ASCII only,
/// escape sequences removed, at most `capacity` characters.
pub fn sanitize_field_text(input: &str, capacity: usize) -> String {
    let mut out = String::with_capacity(input.len().min(capacity));
    let mut esc_mode: Option<EscapeMode> = None;

    for c in input.chars() {
        if let Some(mode) = esc_mode.as_ref() {
            match mode {
                EscapeMode::Esc => match c {
                    '[' => esc_mode = Some(EscapeMode::Csi),
                    ']' => esc_mode = Some(EscapeMode::Osc),
                    _ => esc_mode = None,
                },
                EscapeMode::Csi => {
                    if ('@'..='~').contains(&c) {
                        esc_mode = None;
                    }
                }
                EscapeMode::Osc => {
                    if c == '\x07' {
                        esc_mode = None;
                    } else if c == '\x1b' {
                        esc_mode = Some(EscapeMode::OscEsc);
                    }
                }
                EscapeMode::OscEsc => {
                    if c == '\\' {
                        esc_mode = None;
                    } else if c != '\x1b' {
                        esc_mode = Some(EscapeMode::Osc);
                    }
                }
            }
            continue;
        }

        if c == '\x1b' {
            esc_mode = Some(EscapeMode::Esc);
            continue;
        }
        if c == '\t' {
            out.push(' ');
        } else if is_field_char(c) {
            out.push(c);
        } else {
            continue;
        }

        if out.len() >= capacity {
            break;
        }
    }

    out
}

pub fn sanitize_name(input: &str) -> String {
    sanitize_field_text(input, TEXT_CAPACITY)
}

/// Characters a text field accepts, typed or loaded from config.
pub fn is_field_char(c: char) -> bool {
    c == ' ' || c.is_ascii_graphic()
}

/// Fits `value` into `width` columns. Text that fits is left-aligned and
/// padded; longer text keeps its tail, right-aligned behind a leading "...".
pub fn fit_column(value: &str, width: usize) -> String {
    let len = value.chars().count();
    if len <= width {
        return format!("{value:<width$}");
    }
    if width <= ELLIPSIS.len() {
        return value.chars().skip(len - width).collect();
    }
    let keep = width - ELLIPSIS.len();
    let tail: String = value.chars().skip(len - keep).collect();
    format!("{ELLIPSIS}{tail}")
}

/// Left-aligned truncation for labels.
pub fn clip(value: &str, width: usize) -> String {
    let clipped: String = value.chars().take(width).collect();
    format!("{clipped:<width$}")
}
