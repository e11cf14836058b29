use crate::input::Key;
use crate::model::{StageKind, TEXT_CAPACITY};

use super::entry::{Field, SlotKind};
use super::{Dialog, Direction};

/// An edit or navigation step, already resolved against the selected field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    MoveUp,
    MoveDown,
    JumpUp,
    JumpDown,
    ShiftLeft,
    ShiftRight,
    Toggle,
    Append(char),
    Digit(u8),
    Delete,
    Quit,
}

impl Command {
    fn writes(self) -> bool {
        matches!(
            self,
            Command::Toggle | Command::Append(_) | Command::Digit(_) | Command::Delete
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Moved,
    Edited,
    Unchanged,
    /// The command was dropped; the reason is meant for the status line.
    Rejected(String),
    Quit,
}

/// Mutable view of the value under the cursor.
enum Slot<'s> {
    Text(&'s mut String),
    Number(&'s mut u64),
    OptionalNumber(&'s mut Option<u64>),
    Flag(&'s mut bool),
    Kind(&'s mut StageKind),
}

impl<'a> Dialog<'a> {
    fn selected_slot_kind(&self) -> Option<SlotKind> {
        let entry = self.entries.get(self.selection.entry)?;
        Some(entry.kind().slot(self.selection.column))
    }

    /// Gives a decoded key its meaning for the current selection. Space
    /// toggles a flag column but types a blank into a text column; digits
    /// accumulate into numbers but are plain characters in text.
    pub fn command_for(&self, key: Key) -> Option<Command> {
        let slot = self.selected_slot_kind();
        Some(match key {
            Key::Up => Command::MoveUp,
            Key::Down => Command::MoveDown,
            Key::JumpUp => Command::JumpUp,
            Key::JumpDown => Command::JumpDown,
            Key::Left => Command::ShiftLeft,
            Key::Right => Command::ShiftRight,
            Key::Quit => Command::Quit,
            Key::Delete => Command::Delete,
            Key::Space => match slot? {
                SlotKind::Flag => Command::Toggle,
                SlotKind::Text | SlotKind::Number => Command::Append(' '),
            },
            Key::Digit(d) => match slot? {
                SlotKind::Number => Command::Digit(d),
                SlotKind::Text | SlotKind::Flag => Command::Append(char::from(b'0' + d)),
            },
            Key::Char(c) => Command::Append(c),
        })
    }

    pub fn handle_key(&mut self, key: Key) -> Outcome {
        match self.command_for(key) {
            Some(cmd) => self.apply(cmd),
            None => Outcome::Unchanged,
        }
    }

    /// Applies one command, then re-syncs list sizes and scroll.
    pub fn apply(&mut self, cmd: Command) -> Outcome {
        let outcome = if cmd.writes() {
            self.apply_write(cmd)
        } else {
            match cmd {
                Command::MoveUp => self.move_up(),
                Command::MoveDown => self.move_down(),
                Command::JumpUp => self.jump(Direction::Up),
                Command::JumpDown => self.jump(Direction::Down),
                Command::ShiftLeft => self.shift(Direction::Up),
                Command::ShiftRight => self.shift(Direction::Down),
                Command::Quit => Outcome::Quit,
                _ => Outcome::Unchanged,
            }
        };

        let capped = self.sync();
        self.scroll_into_view();
        match (outcome, capped) {
            (Outcome::Edited, Some(msg)) => Outcome::Rejected(msg),
            (outcome, _) => outcome,
        }
    }

    fn apply_write(&mut self, cmd: Command) -> Outcome {
        let Some(entry) = self.entries.get(self.selection.entry) else {
            return Outcome::Unchanged;
        };
        if !entry.is_editable() {
            return Outcome::Rejected(format!("{} is read-only", entry.name()));
        }
        let name = entry.name().to_string();
        let Some(slot) = self.slot_mut() else {
            return Outcome::Unchanged;
        };

        match cmd {
            Command::Append(c) => append(slot, c, &name),
            Command::Digit(d) => accumulate(slot, d, &name),
            Command::Delete => delete(slot),
            Command::Toggle => toggle(slot, &name),
            _ => Outcome::Unchanged,
        }
    }

    fn slot_mut(&mut self) -> Option<Slot<'_>> {
        let sel = self.selection;
        let entry = self.entries.get_mut(sel.entry)?;
        Some(match entry.field_mut() {
            Field::Text(s) => Slot::Text(&mut **s),
            Field::Integer(v) => Slot::Number(&mut **v),
            Field::Boolean(b) => Slot::Flag(&mut **b),
            Field::ParentRef(p) => Slot::OptionalNumber(&mut **p),
            Field::StageList(stages) => {
                let stage = stages.get_mut(sel.item)?;
                match sel.column {
                    0 => Slot::Kind(&mut stage.kind),
                    1 => Slot::Text(&mut stage.name),
                    _ => Slot::Number(&mut stage.duration),
                }
            }
            Field::SegmentList(segments) => {
                let seg = segments.get_mut(sel.item)?;
                match sel.column {
                    0 => Slot::Text(&mut seg.name),
                    1 => Slot::Number(&mut seg.address),
                    _ => Slot::Number(&mut seg.size),
                }
            }
        })
    }

    fn move_down(&mut self) -> Outcome {
        let sel = self.selection;
        let entry = &self.entries[sel.entry];
        if entry.kind().is_list() && sel.item + 1 < entry.rows() {
            self.selection.item += 1;
            return Outcome::Moved;
        }
        match self.next_with_rows(sel.entry, Direction::Down) {
            Some(i) => {
                self.enter(i, 0);
                Outcome::Moved
            }
            None => Outcome::Unchanged,
        }
    }

    fn move_up(&mut self) -> Outcome {
        let sel = self.selection;
        if self.entries[sel.entry].kind().is_list() && sel.item > 0 {
            self.selection.item -= 1;
            return Outcome::Moved;
        }
        match self.next_with_rows(sel.entry, Direction::Up) {
            Some(i) => {
                let last = if self.entries[i].kind().is_list() {
                    self.entries[i].rows() - 1
                } else {
                    0
                };
                self.enter(i, last);
                Outcome::Moved
            }
            None => Outcome::Unchanged,
        }
    }

    fn jump(&mut self, dir: Direction) -> Outcome {
        match self.next_with_rows(self.selection.entry, dir) {
            Some(i) => {
                self.enter(i, 0);
                Outcome::Moved
            }
            None if self.selection.item != 0 => {
                self.selection.item = 0;
                Outcome::Moved
            }
            None => Outcome::Unchanged,
        }
    }

    fn shift(&mut self, dir: Direction) -> Outcome {
        let sel = self.selection;
        let entry = &mut self.entries[sel.entry];
        let max = entry.kind().arity() - 1;
        let column = match dir {
            Direction::Up => sel.column.saturating_sub(1),
            Direction::Down => (sel.column + 1).min(max),
        };
        if column == sel.column {
            return Outcome::Unchanged;
        }
        entry.set_column(column);
        self.selection.column = column;
        Outcome::Moved
    }

    fn enter(&mut self, entry: usize, item: usize) {
        self.selection.entry = entry;
        self.selection.item = item;
        self.selection.column = self.entries[entry].column();
    }
}

fn append(slot: Slot<'_>, c: char, name: &str) -> Outcome {
    match slot {
        Slot::Text(buf) => {
            if buf.chars().count() >= TEXT_CAPACITY {
                return Outcome::Rejected(format!(
                    "{name} is full ({TEXT_CAPACITY} characters)"
                ));
            }
            buf.push(c);
            Outcome::Edited
        }
        Slot::Number(_) | Slot::OptionalNumber(_) => {
            Outcome::Rejected(format!("{name} only accepts digits"))
        }
        Slot::Flag(_) | Slot::Kind(_) => {
            Outcome::Rejected(format!("press Space to toggle {name}"))
        }
    }
}

fn accumulate(slot: Slot<'_>, digit: u8, name: &str) -> Outcome {
    let digit = u64::from(digit);
    match slot {
        Slot::Number(v) => {
            *v = v.saturating_mul(10).saturating_add(digit);
            Outcome::Edited
        }
        Slot::OptionalNumber(v) => {
            let old = v.unwrap_or(0);
            *v = Some(old.saturating_mul(10).saturating_add(digit));
            Outcome::Edited
        }
        Slot::Text(_) | Slot::Flag(_) | Slot::Kind(_) => {
            append(slot, char::from(b'0' + digit as u8), name)
        }
    }
}

fn delete(slot: Slot<'_>) -> Outcome {
    match slot {
        Slot::Text(buf) => match buf.pop() {
            Some(_) => Outcome::Edited,
            None => Outcome::Unchanged,
        },
        // Lossy: dropping a trailing zero and dropping any other last digit
        // look the same.
        Slot::Number(v) => {
            if *v == 0 {
                return Outcome::Unchanged;
            }
            *v /= 10;
            Outcome::Edited
        }
        Slot::OptionalNumber(v) => match *v {
            Some(n) if n >= 10 => {
                *v = Some(n / 10);
                Outcome::Edited
            }
            Some(_) => {
                *v = None;
                Outcome::Edited
            }
            None => Outcome::Unchanged,
        },
        Slot::Flag(_) | Slot::Kind(_) => Outcome::Unchanged,
    }
}

fn toggle(slot: Slot<'_>, name: &str) -> Outcome {
    match slot {
        Slot::Flag(b) => {
            *b = !*b;
            Outcome::Edited
        }
        Slot::Kind(k) => {
            *k = k.toggled();
            Outcome::Edited
        }
        Slot::Text(_) | Slot::Number(_) | Slot::OptionalNumber(_) => {
            Outcome::Rejected(format!("{name} has nothing to toggle"))
        }
    }
}
