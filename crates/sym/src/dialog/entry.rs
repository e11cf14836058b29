use crate::model::{Pid, Segment, Stage};

/// Storage behind one entry.
///
/// Scalar variants borrow a field of the record being edited and are handed
/// back untouched when the dialog goes away. List variants are owned by the
/// dialog: it sizes them from their repeat count and the caller takes them
/// back with [`Field::into_stages`] / [`Field::into_segments`].
#[derive(Debug)]
pub enum Field<'a> {
    Text(&'a mut String),
    Integer(&'a mut u64),
    Boolean(&'a mut bool),
    /// Raw parent pid; `None` until the user types a digit.
    ParentRef(&'a mut Option<Pid>),
    StageList(Vec<Stage>),
    SegmentList(Vec<Segment>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Text,
    Integer,
    Boolean,
    ParentRef,
    StageList,
    SegmentList,
}

/// What a keystroke lands on once entry kind and column are known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Text,
    Number,
    Flag,
}

impl EntryKind {
    pub fn is_list(self) -> bool {
        matches!(self, EntryKind::StageList | EntryKind::SegmentList)
    }

    /// Number of editable columns in one row of this kind.
    pub fn arity(self) -> usize {
        if self.is_list() { 3 } else { 1 }
    }

    pub fn slot(self, column: usize) -> SlotKind {
        match self {
            EntryKind::Text => SlotKind::Text,
            EntryKind::Integer | EntryKind::ParentRef => SlotKind::Number,
            EntryKind::Boolean => SlotKind::Flag,
            EntryKind::StageList => match column {
                0 => SlotKind::Flag,
                1 => SlotKind::Text,
                _ => SlotKind::Number,
            },
            EntryKind::SegmentList => match column {
                0 => SlotKind::Text,
                _ => SlotKind::Number,
            },
        }
    }

    fn noun(self) -> &'static str {
        match self {
            EntryKind::Text => "text",
            EntryKind::Integer => "number",
            EntryKind::Boolean => "flag",
            EntryKind::ParentRef => "parent",
            EntryKind::StageList => "stage",
            EntryKind::SegmentList => "segment",
        }
    }
}

impl<'a> Field<'a> {
    pub fn kind(&self) -> EntryKind {
        match self {
            Field::Text(_) => EntryKind::Text,
            Field::Integer(_) => EntryKind::Integer,
            Field::Boolean(_) => EntryKind::Boolean,
            Field::ParentRef(_) => EntryKind::ParentRef,
            Field::StageList(_) => EntryKind::StageList,
            Field::SegmentList(_) => EntryKind::SegmentList,
        }
    }

    pub fn list_len(&self) -> Option<usize> {
        match self {
            Field::StageList(v) => Some(v.len()),
            Field::SegmentList(v) => Some(v.len()),
            _ => None,
        }
    }

    pub fn integer(&self) -> Option<u64> {
        match self {
            Field::Integer(v) => Some(**v),
            _ => None,
        }
    }

    pub fn into_stages(self) -> Option<Vec<Stage>> {
        match self {
            Field::StageList(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_segments(self) -> Option<Vec<Segment>> {
        match self {
            Field::SegmentList(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Entry<'a> {
    label: String,
    field: Field<'a>,
    editable: bool,
    /// Index of the Integer entry that holds this list's length.
    repeat: Option<usize>,
    /// Column last used in this entry's rows.
    column: usize,
    /// Items cut off by a shrinking count, in position order.
    hidden: Hidden,
}

#[derive(Debug, Default)]
struct Hidden {
    stages: Vec<Stage>,
    segments: Vec<Segment>,
}

/// Resizes `live` to `len`. Items cut off go to the front of `hidden` and come
/// back first when the list grows again; only then are defaults generated.
fn resize_keeping<T>(live: &mut Vec<T>, hidden: &mut Vec<T>, len: usize, make: fn(usize) -> T) {
    if live.len() > len {
        let mut cut = live.split_off(len);
        cut.append(hidden);
        *hidden = cut;
        return;
    }
    let restore = (len - live.len()).min(hidden.len());
    live.extend(hidden.drain(..restore));
    let start = live.len();
    live.extend((start..len).map(make));
}

impl<'a> Entry<'a> {
    pub fn new(label: impl Into<String>, field: Field<'a>) -> Self {
        Self {
            label: label.into(),
            field,
            editable: true,
            repeat: None,
            column: 0,
            hidden: Hidden::default(),
        }
    }

    pub fn read_only(mut self) -> Self {
        self.editable = false;
        self
    }

    /// Sizes this list from the Integer entry at `count_entry`.
    pub fn repeat_from(mut self, count_entry: usize) -> Self {
        self.repeat = Some(count_entry);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Label, or a generic noun for unlabeled list entries.
    pub fn name(&self) -> &str {
        if self.label.is_empty() {
            self.field.kind().noun()
        } else {
            &self.label
        }
    }

    pub fn kind(&self) -> EntryKind {
        self.field.kind()
    }

    pub fn field(&self) -> &Field<'a> {
        &self.field
    }

    pub(crate) fn field_mut(&mut self) -> &mut Field<'a> {
        &mut self.field
    }

    pub fn into_field(self) -> Field<'a> {
        self.field
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn repeat(&self) -> Option<usize> {
        self.repeat
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub(crate) fn set_column(&mut self, column: usize) {
        self.column = column.min(self.kind().arity() - 1);
    }

    /// Rows this entry occupies: one for scalars, the list length for lists.
    pub fn rows(&self) -> usize {
        self.field.list_len().unwrap_or(1)
    }

    /// Truncates or extends a list field to `len`. Truncated items are kept
    /// aside until the dialog is dropped. Scalars are left alone.
    pub(crate) fn resize_list(&mut self, len: usize) {
        match &mut self.field {
            Field::StageList(v) => resize_keeping(v, &mut self.hidden.stages, len, Stage::numbered),
            Field::SegmentList(v) => {
                resize_keeping(v, &mut self.hidden.segments, len, Segment::numbered)
            }
            _ => {}
        }
    }

    pub fn text_len(&self) -> Option<usize> {
        match &self.field {
            Field::Text(s) => Some(s.chars().count()),
            _ => None,
        }
    }
}
