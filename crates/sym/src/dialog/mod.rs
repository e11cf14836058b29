//! Generic scrollable form: a bounded viewport over a list of typed entries,
//! some of which expand into one row per list item.

use ratatui::layout::Rect;

use crate::error::{Error, Result};
use crate::model::TEXT_CAPACITY;

mod command;
mod entry;
mod render;

pub use command::{Command, Outcome};
pub use entry::{Entry, EntryKind, Field, SlotKind};

/// Default upper bound for any repeat count.
pub const DEFAULT_MAX_ITEMS: usize = 64;

/// Which element is selected: the entry, the item within a list entry (always
/// 0 for scalars) and the active column within a list row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub entry: usize,
    pub item: usize,
    pub column: usize,
}

/// One visual row of the flattened dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Row {
    pub entry: usize,
    pub item: Option<usize>,
}

#[derive(Debug)]
pub struct Dialog<'a> {
    requested: Rect,
    area: Rect,
    ratio: u16,
    title: Option<String>,
    entries: Vec<Entry<'a>>,
    selection: Selection,
    scroll: usize,
    elements: usize,
    max_items: usize,
    /// Cap message raised while building, before anyone could see it.
    notice: Option<String>,
}

impl<'a> Dialog<'a> {
    /// Builds a dialog over `entries`, drawn inside `area` with the label
    /// column taking `1/ratio` of the width. List entries are sized from their
    /// repeat counts here.
    pub fn new(entries: Vec<Entry<'a>>, area: Rect, ratio: u16) -> Result<Self> {
        if entries.is_empty() {
            return Err(Error::msg("dialog needs at least one entry"));
        }
        if ratio < 2 {
            return Err(Error::msg(format!(
                "dialog ratio must be at least 2 (got {ratio})"
            )));
        }
        if area.height < 3 || area.width < 8 {
            return Err(Error::msg(format!(
                "dialog area {}x{} is too small (minimum 8x3)",
                area.width, area.height
            )));
        }
        for (i, e) in entries.iter().enumerate() {
            let Some(src) = e.repeat() else {
                continue;
            };
            let ok = entries
                .get(src)
                .map(|c| c.kind() == EntryKind::Integer)
                .unwrap_or(false);
            if !ok || !e.kind().is_list() {
                return Err(Error::msg(format!(
                    "entry {} '{}' must be a list repeated from an Integer entry (got index {})",
                    i,
                    e.name(),
                    src
                )));
            }
        }

        let mut dialog = Self {
            requested: area,
            area,
            ratio,
            title: None,
            entries,
            selection: Selection::default(),
            scroll: 0,
            elements: 0,
            max_items: DEFAULT_MAX_ITEMS,
            notice: None,
        };
        for e in &mut dialog.entries {
            if let Field::Text(s) = e.field_mut() {
                truncate_chars(s, TEXT_CAPACITY);
            }
        }
        dialog.notice = dialog.sync();
        dialog.selection.column = dialog.entries[dialog.selection.entry].column();
        Ok(dialog)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        if let Some(msg) = self.sync() {
            self.notice = Some(msg);
        }
        self
    }

    /// Takes the count-cap message left over from construction, if any.
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    pub fn ratio(&self) -> u16 {
        self.ratio
    }

    pub fn entries(&self) -> &[Entry<'a>] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&Entry<'a>> {
        self.entries.get(index)
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    /// Total rows: one per scalar entry plus every list item.
    pub fn element_count(&self) -> usize {
        self.elements
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Rows available for entries inside the border.
    pub fn content_height(&self) -> usize {
        usize::from(self.area.height.saturating_sub(2))
    }

    /// Clamps the viewport into `bounds`, e.g. after a terminal resize.
    pub fn fit(&mut self, bounds: Rect) {
        self.area = self.requested.intersection(bounds);
        self.scroll_into_view();
    }

    /// Overwrites an Integer entry, bypassing the editable flag. Used for
    /// derived values.
    pub fn set_integer(&mut self, index: usize, value: u64) -> bool {
        match self.entries.get_mut(index).map(Entry::field_mut) {
            Some(Field::Integer(v)) => {
                **v = value;
                true
            }
            _ => false,
        }
    }

    pub fn into_entries(self) -> Vec<Entry<'a>> {
        self.entries
    }

    /// Every row in display order.
    pub fn rows(&self) -> Vec<Row> {
        let mut out = Vec::with_capacity(self.elements);
        for (i, e) in self.entries.iter().enumerate() {
            match e.field().list_len() {
                Some(n) => out.extend((0..n).map(|j| Row {
                    entry: i,
                    item: Some(j),
                })),
                None => out.push(Row {
                    entry: i,
                    item: None,
                }),
            }
        }
        out
    }

    /// Position of the selected element among all rows.
    pub fn selection_row(&self) -> usize {
        let before: usize = self.entries[..self.selection.entry]
            .iter()
            .map(Entry::rows)
            .sum();
        before + self.selection.item
    }

    pub fn is_selected(&self, row: Row) -> bool {
        row.entry == self.selection.entry && row.item.unwrap_or(0) == self.selection.item
    }

    /// Brings list storage in line with the current repeat counts, then
    /// re-clamps the selection. Returns a message when a count had to be
    /// capped at `max_items`.
    pub fn sync(&mut self) -> Option<String> {
        let mut capped = None;
        for i in 0..self.entries.len() {
            let Some(src) = self.entries[i].repeat() else {
                continue;
            };
            let want = self.entries[src].field().integer().unwrap_or(0);
            let limit = self.max_items as u64;
            let want = if want > limit {
                self.set_integer(src, limit);
                capped = Some(format!(
                    "{} is limited to {} items",
                    self.entries[src].name(),
                    self.max_items
                ));
                limit
            } else {
                want
            };
            self.entries[i].resize_list(want as usize);
        }
        self.elements = self.entries.iter().map(Entry::rows).sum();
        self.clamp_selection();
        capped
    }

    fn clamp_selection(&mut self) {
        let last = self.entries.len() - 1;
        let mut sel = self.selection;
        sel.entry = sel.entry.min(last);
        if self.entries[sel.entry].rows() == 0 {
            let next = self
                .next_with_rows(sel.entry, Direction::Down)
                .or_else(|| self.next_with_rows(sel.entry, Direction::Up));
            if let Some(i) = next {
                sel.entry = i;
                sel.column = self.entries[i].column();
            }
        }
        let entry = &self.entries[sel.entry];
        sel.item = if entry.kind().is_list() {
            sel.item.min(entry.rows().saturating_sub(1))
        } else {
            0
        };
        sel.column = sel.column.min(entry.kind().arity() - 1);
        self.selection = sel;
    }

    /// Adjusts the scroll offset so the selected row is visible.
    pub fn scroll_into_view(&mut self) {
        let height = self.content_height().max(1);
        let row = self.selection_row();
        if row < self.scroll {
            self.scroll = row;
        } else if row >= self.scroll + height {
            self.scroll = row + 1 - height;
        }
        self.scroll = self.scroll.min(self.elements.saturating_sub(height));
    }

    /// Nearest entry strictly before/after `from` that has at least one row.
    fn next_with_rows(&self, from: usize, dir: Direction) -> Option<usize> {
        match dir {
            Direction::Down => (from + 1..self.entries.len()).find(|&i| self.entries[i].rows() > 0),
            Direction::Up => (0..from).rev().find(|&i| self.entries[i].rows() > 0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

fn truncate_chars(s: &mut String, max: usize) {
    if let Some((idx, _)) = s.char_indices().nth(max) {
        s.truncate(idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Stage;

    #[test]
    fn flattened_count_and_initial_selection() {
        let mut name = String::from("init");
        let mut count = 3u64;
        let entries = vec![
            Entry::new("Name", Field::Text(&mut name)),
            Entry::new("Stages", Field::Integer(&mut count)),
            Entry::new("", Field::StageList(Vec::new())).repeat_from(1),
        ];
        let d = Dialog::new(entries, Rect::new(0, 0, 30, 10), 2).expect("dialog");
        assert_eq!(d.element_count(), 5);
        assert_eq!(d.selection(), Selection::default());
        assert_eq!(d.rows().len(), 5);
        assert_eq!(
            d.rows()[4],
            Row {
                entry: 2,
                item: Some(2)
            }
        );
    }

    #[test]
    fn rejects_repeat_from_non_integer() {
        let mut name = String::new();
        let entries = vec![
            Entry::new("Name", Field::Text(&mut name)),
            Entry::new("", Field::StageList(vec![Stage::numbered(0)])).repeat_from(0),
        ];
        let err = Dialog::new(entries, Rect::new(0, 0, 30, 10), 2).expect_err("bad repeat");
        assert!(err.to_string().contains("repeated from an Integer"));
    }

    #[test]
    fn rejects_degenerate_geometry() {
        let mut v = 0u64;
        let err = Dialog::new(
            vec![Entry::new("V", Field::Integer(&mut v))],
            Rect::new(0, 0, 30, 2),
            2,
        )
        .expect_err("too short");
        assert!(err.to_string().contains("too small"));
    }

    #[test]
    fn over_capacity_text_is_truncated_on_construction() {
        let mut name = "n".repeat(TEXT_CAPACITY + 10);
        {
            let d = Dialog::new(
                vec![Entry::new("Name", Field::Text(&mut name))],
                Rect::new(0, 0, 30, 5),
                2,
            )
            .expect("dialog");
            assert_eq!(d.entries()[0].text_len(), Some(TEXT_CAPACITY));
        }
        assert_eq!(name.len(), TEXT_CAPACITY);
    }

    #[test]
    fn initial_count_is_capped() {
        let mut count = 500u64;
        {
            let mut d = Dialog::new(
                vec![
                    Entry::new("Stages", Field::Integer(&mut count)),
                    Entry::new("", Field::StageList(Vec::new())).repeat_from(0),
                ],
                Rect::new(0, 0, 30, 5),
                2,
            )
            .expect("dialog")
            .with_max_items(8);
            assert_eq!(d.element_count(), 9);
            assert_eq!(d.take_notice().as_deref(), Some("Stages is limited to 8 items"));
            assert_eq!(d.take_notice(), None);
        }
        assert_eq!(count, 8);
    }
}
