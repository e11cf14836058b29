use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::line;
use ratatui::widgets::{Block, BorderType, Borders, Widget};

use crate::model::{Segment, Stage};
use crate::text::{clip, fit_column};

use super::entry::{Entry, Field};
use super::Dialog;

const FLAG_WIDTH: u16 = 3;

fn selected_style() -> Style {
    Style::default().add_modifier(Modifier::REVERSED)
}

fn active_column_style() -> Style {
    Style::default()
        .fg(Color::Black)
        .bg(Color::LightYellow)
        .add_modifier(Modifier::BOLD)
}

impl Widget for &Dialog<'_> {
    /// Draws border, divider and the rows visible from the current scroll
    /// offset. Expects [`Dialog::scroll_into_view`] to have run.
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Plain);
        if let Some(title) = self.title() {
            block = block.title(format!(" {title} "));
        }
        let inner = block.inner(area);
        block.render(area, buf);
        if inner.width < 3 || inner.height == 0 {
            return;
        }

        let label_width = (area.width / self.ratio()).clamp(1, inner.width - 2);
        let divider_x = area.x + label_width;
        buf[(divider_x, area.y)].set_symbol(line::HORIZONTAL_DOWN);
        buf[(divider_x, area.bottom() - 1)].set_symbol(line::HORIZONTAL_UP);
        for y in inner.y..inner.bottom() {
            buf[(divider_x, y)].set_symbol(line::VERTICAL);
        }

        let label_cells = usize::from(divider_x - inner.x);
        let value_x = divider_x + 1;
        let value_width = inner.right() - value_x;

        let rows = self.rows();
        let visible = rows
            .iter()
            .skip(self.scroll())
            .take(usize::from(inner.height));
        for (offset, row) in visible.enumerate() {
            let y = inner.y + offset as u16;
            let entry = &self.entries()[row.entry];
            let selected = self.is_selected(*row);
            let mut base = if selected {
                selected_style()
            } else {
                Style::default()
            };
            if !entry.is_editable() && !selected {
                base = base.add_modifier(Modifier::DIM);
            }

            let label = match row.item {
                Some(j) => format!("{:>w$}", j + 1, w = label_cells.min(4)),
                None => entry.label().to_string(),
            };
            buf.set_string(inner.x, y, clip(&label, label_cells), base);

            let value_area = Rect::new(value_x, y, value_width, 1);
            match row.item {
                None => {
                    let text = scalar_text(entry);
                    buf.set_string(
                        value_x,
                        y,
                        fit_column(&text, usize::from(value_width)),
                        base,
                    );
                }
                Some(item) => {
                    let column = selected.then(|| self.selection().column);
                    render_list_row(entry, item, value_area, column, base, buf);
                }
            }
        }
    }
}

fn scalar_text(entry: &Entry<'_>) -> String {
    match entry.field() {
        Field::Text(s) => s.to_string(),
        Field::Integer(v) => v.to_string(),
        Field::Boolean(b) => if **b { "[x]" } else { "[ ]" }.to_string(),
        Field::ParentRef(p) => p.map(|pid| pid.to_string()).unwrap_or_else(|| "-".into()),
        Field::StageList(v) => format!("{} stages", v.len()),
        Field::SegmentList(v) => format!("{} segments", v.len()),
    }
}

fn render_list_row(
    entry: &Entry<'_>,
    item: usize,
    area: Rect,
    active: Option<usize>,
    base: Style,
    buf: &mut Buffer,
) {
    let cells = match entry.field() {
        Field::StageList(stages) => stages.get(item).map(stage_cells),
        Field::SegmentList(segments) => segments.get(item).map(segment_cells),
        _ => None,
    };
    let Some(cells) = cells else {
        return;
    };

    buf.set_string(area.x, area.y, " ".repeat(usize::from(area.width)), base);
    let widths = column_widths(entry.field(), area.width);
    let mut x = area.x;
    for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
        if width == 0 {
            continue;
        }
        let style = if active == Some(i) {
            active_column_style()
        } else {
            base
        };
        let text = match cell {
            Cell::Text(s) => fit_column(s, usize::from(width)),
            Cell::Number(n) => fit_number(*n, usize::from(width)),
        };
        let room = usize::from(area.right().saturating_sub(x));
        buf.set_stringn(x, area.y, text, room, style);
        x = x.saturating_add(width + 1);
        if x >= area.right() {
            break;
        }
    }
}

enum Cell {
    Text(String),
    Number(u64),
}

fn stage_cells(stage: &Stage) -> [Cell; 3] {
    let flag = if stage.kind.is_io() { "[*]" } else { "[ ]" };
    [
        Cell::Text(flag.to_string()),
        Cell::Text(stage.name.clone()),
        Cell::Number(stage.duration),
    ]
}

fn segment_cells(segment: &Segment) -> [Cell; 3] {
    [
        Cell::Text(segment.name.clone()),
        Cell::Number(segment.address),
        Cell::Number(segment.size),
    ]
}

/// Widths of the three columns of a list row; one blank separates columns.
fn column_widths(field: &Field<'_>, width: u16) -> [u16; 3] {
    let num = (width / 4).clamp(1, 8);
    match field {
        Field::StageList(_) => {
            let name = width.saturating_sub(FLAG_WIDTH + num + 2);
            [FLAG_WIDTH.min(width), name, num]
        }
        _ => {
            let name = width.saturating_sub(2 * num + 2);
            [name, num, num]
        }
    }
}

fn fit_number(n: u64, width: usize) -> String {
    let s = n.to_string();
    if s.len() > width {
        fit_column(&s, width)
    } else {
        format!("{s:>width$}")
    }
}
