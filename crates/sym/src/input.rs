//! Raw keystroke decoding.
//!
//! The terminal runs in raw mode, so every key arrives as one or more bytes.
//! Navigation uses control-masked letters from a [`KeyLayout`] fixed at build
//! time, plus the `ESC [ A..D` arrow sequences. Other CSI sequences are swallowed.

use crate::text::is_field_char;

pub const ESC: u8 = 0x1b;
pub const DEL: u8 = 0x7f;

/// Byte produced by holding Ctrl with `key`.
pub const fn ctrl(key: u8) -> u8 {
    key & 0x1f
}

/// A decoded keystroke, before the dialog gives it a meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    JumpUp,
    JumpDown,
    Left,
    Right,
    Quit,
    /// Toggles a flag or types a blank, depending on the selected field.
    Space,
    Delete,
    Digit(u8),
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyLayout {
    pub name: &'static str,
    pub left: u8,
    pub down: u8,
    pub up: u8,
    pub right: u8,
    pub jump_up: u8,
    pub jump_down: u8,
    pub quit: u8,
}

impl KeyLayout {
    pub const QWERTY: KeyLayout = KeyLayout {
        name: "qwerty",
        left: b'h',
        down: b'j',
        up: b'k',
        right: b'l',
        jump_up: b'u',
        jump_down: b'd',
        quit: b'c',
    };

    // Same physical keys as QWERTY.
    pub const DVORAK: KeyLayout = KeyLayout {
        name: "dvorak",
        left: b'd',
        down: b'h',
        up: b't',
        right: b'n',
        jump_up: b'g',
        jump_down: b'e',
        quit: b'c',
    };

    pub const fn compiled() -> KeyLayout {
        if cfg!(feature = "dvorak") {
            Self::DVORAK
        } else {
            Self::QWERTY
        }
    }

    fn control_key(&self, byte: u8) -> Option<Key> {
        let table = [
            (self.up, Key::Up),
            (self.down, Key::Down),
            (self.left, Key::Left),
            (self.right, Key::Right),
            (self.jump_up, Key::JumpUp),
            (self.jump_down, Key::JumpDown),
            (self.quit, Key::Quit),
        ];
        table
            .into_iter()
            .find(|(letter, _)| ctrl(*letter) == byte)
            .map(|(_, key)| key)
    }

    /// Human-readable binding table, in display order.
    pub fn describe(&self) -> Vec<(String, &'static str)> {
        let c = |k: u8| format!("Ctrl-{}", (k as char).to_ascii_uppercase());
        vec![
            (format!("{} / Up", c(self.up)), "previous row"),
            (format!("{} / Down", c(self.down)), "next row"),
            (c(self.jump_up), "previous field (skips list rows)"),
            (c(self.jump_down), "next field (skips list rows)"),
            (format!("{} / Left", c(self.left)), "previous column"),
            (format!("{} / Right", c(self.right)), "next column"),
            ("Space".into(), "toggle flag, or type a blank in text"),
            ("0-9".into(), "append digit"),
            ("Backspace".into(), "delete last character / digit"),
            (c(self.quit), "finish editing"),
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Pending {
    #[default]
    Nothing,
    Esc,
    Csi,
}

/// Incremental byte-to-[`Key`] decoder. Multi-byte sequences may be split
/// across reads; state carries over between calls to [`Decoder::feed`].
#[derive(Debug, Clone)]
pub struct Decoder {
    layout: KeyLayout,
    pending: Pending,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(KeyLayout::compiled())
    }
}

impl Decoder {
    pub fn new(layout: KeyLayout) -> Self {
        Self {
            layout,
            pending: Pending::Nothing,
        }
    }

    pub fn layout(&self) -> &KeyLayout {
        &self.layout
    }

    pub fn feed(&mut self, byte: u8) -> Option<Key> {
        match std::mem::take(&mut self.pending) {
            Pending::Esc if byte == b'[' => {
                self.pending = Pending::Csi;
                return None;
            }
            // A lone ESC is dropped and the byte after it decoded normally.
            Pending::Esc | Pending::Nothing => {}
            // Parameter and intermediate bytes keep the sequence open; the
            // first byte in '@'..='~' ends it.
            Pending::Csi => match byte {
                0x20..=0x3f => {
                    self.pending = Pending::Csi;
                    return None;
                }
                b'@'..=b'~' => {
                    return match byte {
                        b'A' => Some(Key::Up),
                        b'B' => Some(Key::Down),
                        b'C' => Some(Key::Right),
                        b'D' => Some(Key::Left),
                        _ => None,
                    };
                }
                // Malformed sequence: drop it and decode this byte on its own.
                _ => {}
            },
        }

        if byte == ESC {
            self.pending = Pending::Esc;
            return None;
        }
        if let Some(key) = self.layout.control_key(byte) {
            return Some(key);
        }
        match byte {
            b' ' => Some(Key::Space),
            b'0'..=b'9' => Some(Key::Digit(byte - b'0')),
            _ if is_field_char(char::from(byte)) => Some(Key::Char(char::from(byte))),
            DEL => Some(Key::Delete),
            _ => None,
        }
    }

    pub fn feed_all(&mut self, bytes: &[u8]) -> Vec<Key> {
        bytes.iter().filter_map(|b| self.feed(*b)).collect()
    }
}
