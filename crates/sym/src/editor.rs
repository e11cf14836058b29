//! Binding between one [`Process`] and a [`Dialog`].

use std::fmt;

use ratatui::layout::Rect;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::DialogConfig;
use crate::dialog::{Dialog, Entry, Field, Outcome};
use crate::error::Result;
use crate::input::{Decoder, KeyLayout};
use crate::model::{
    Process, Registry, Segment, Stage, Violation, total_duration, total_memory,
};

const STAGE_COUNT: usize = 4;
const STAGES: usize = 5;
const LENGTH: usize = 6;
const SEGMENT_COUNT: usize = 7;
const SEGMENTS: usize = 8;
const MEMORY: usize = 9;

#[derive(Debug, Clone)]
pub struct EditorOptions {
    pub area: Rect,
    pub ratio: u16,
    pub title: Option<String>,
    pub max_items: usize,
    pub layout: KeyLayout,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self::from_config(&DialogConfig::default())
    }
}

impl EditorOptions {
    pub fn from_config(cfg: &DialogConfig) -> Self {
        Self {
            area: Rect::new(cfg.x, cfg.y, cfg.width, cfg.height),
            ratio: cfg.ratio,
            title: (!cfg.title.is_empty()).then(|| cfg.title.clone()),
            max_items: cfg.max_items,
            layout: KeyLayout::compiled(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct ProcessEditor<'a> {
    dialog: Dialog<'a>,
    decoder: Decoder,
    status: Option<String>,
}

impl<'a> ProcessEditor<'a> {
    /// Borrows the scalar fields of `process` and moves its stage and segment
    /// lists into the dialog until [`ProcessEditor::finish`].
    pub fn bind(process: &'a mut Process, opts: &EditorOptions) -> Result<Self> {
        let stages = std::mem::take(&mut process.stages);
        let segments = std::mem::take(&mut process.segments);
        let Process {
            pid,
            name,
            priority,
            arrival,
            length,
            memory,
            stage_count,
            segment_count,
            parent_pid_raw,
            ..
        } = process;

        let entries = vec![
            Entry::new("Name", Field::Text(name)),
            Entry::new("PID", Field::Integer(pid)),
            Entry::new("Priority", Field::Integer(priority)),
            Entry::new("Arrival", Field::Integer(arrival)),
            Entry::new("Stages", Field::Integer(stage_count)),
            Entry::new("", Field::StageList(stages)).repeat_from(STAGE_COUNT),
            Entry::new("Length", Field::Integer(length)).read_only(),
            Entry::new("Segments", Field::Integer(segment_count)),
            Entry::new("", Field::SegmentList(segments)).repeat_from(SEGMENT_COUNT),
            Entry::new("Memory", Field::Integer(memory)).read_only(),
            Entry::new("Parent", Field::ParentRef(parent_pid_raw)),
        ];

        let mut dialog =
            Dialog::new(entries, opts.area, opts.ratio)?.with_max_items(opts.max_items);
        if let Some(title) = &opts.title {
            dialog = dialog.with_title(title.clone());
        }
        let status = dialog.take_notice();
        if let Some(msg) = &status {
            warn!(%msg, "count capped while binding");
        }
        let mut editor = Self {
            dialog,
            decoder: Decoder::new(opts.layout),
            status,
        };
        editor.recompute();
        Ok(editor)
    }

    pub fn dialog(&self) -> &Dialog<'a> {
        &self.dialog
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn layout(&self) -> &KeyLayout {
        self.decoder.layout()
    }

    /// Per-frame upkeep before drawing into `bounds`.
    pub fn prepare(&mut self, bounds: Rect) {
        self.dialog.fit(bounds);
        if let Some(msg) = self.dialog.sync() {
            self.status = Some(msg);
        }
        self.recompute();
        self.dialog.scroll_into_view();
    }

    /// Feeds one raw input byte.
    pub fn feed(&mut self, byte: u8) -> Flow {
        let Some(key) = self.decoder.feed(byte) else {
            return Flow::Continue;
        };
        let outcome = self.dialog.handle_key(key);
        self.recompute();
        match outcome {
            Outcome::Quit => return Flow::Quit,
            Outcome::Rejected(msg) => {
                debug!(%msg, ?key, "keystroke rejected");
                self.status = Some(msg);
            }
            Outcome::Moved | Outcome::Edited => self.status = None,
            Outcome::Unchanged => {}
        }
        Flow::Continue
    }

    /// Re-derives length and memory from the live lists.
    pub fn recompute(&mut self) {
        let length = match self.dialog.entry(STAGES).map(Entry::field) {
            Some(Field::StageList(stages)) => total_duration(stages),
            _ => 0,
        };
        let memory = match self.dialog.entry(SEGMENTS).map(Entry::field) {
            Some(Field::SegmentList(segments)) => total_memory(segments),
            _ => 0,
        };
        self.dialog.set_integer(LENGTH, length);
        self.dialog.set_integer(MEMORY, memory);
    }

    /// Ends editing and hands back the lists the dialog owned.
    pub fn finish(self) -> EditedLists {
        let mut lists = EditedLists::default();
        for entry in self.dialog.into_entries() {
            match entry.into_field() {
                Field::StageList(v) => lists.stages = v,
                Field::SegmentList(v) => lists.segments = v,
                _ => {}
            }
        }
        lists
    }
}

#[derive(Debug, Default)]
pub struct EditedLists {
    pub stages: Vec<Stage>,
    pub segments: Vec<Segment>,
}

/// Puts the edited lists back into `process` and resolves its parent pid
/// against `registry`. An unknown pid leaves the process without a parent.
pub fn conclude(process: &mut Process, lists: EditedLists, registry: &Registry) {
    process.stage_count = lists.stages.len() as u64;
    process.segment_count = lists.segments.len() as u64;
    process.stages = lists.stages;
    process.segments = lists.segments;
    process.recompute_derived();

    process.parent = registry.resolve_parent(process.parent_pid_raw);
    match (process.parent_pid_raw, process.parent) {
        (Some(raw), None) => warn!(pid = process.pid, parent = raw, "parent pid not registered"),
        (_, Some(parent)) => info!(pid = process.pid, parent, "parent resolved"),
        (None, None) => {}
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub process: Process,
    pub inserted: bool,
    pub error: Option<String>,
    pub registry_size: usize,
    pub violations: Vec<Violation>,
}

/// Inserts the edited process and runs the advisory validity check.
pub fn submit(process: Process, registry: &mut Registry) -> SessionReport {
    let snapshot = process.clone();
    let (inserted, error) = match registry.insert(process) {
        Ok(()) => {
            info!(pid = snapshot.pid, "process registered");
            (true, None)
        }
        Err(e) => {
            warn!(pid = snapshot.pid, error = %e, "process not registered");
            (false, Some(e.to_string()))
        }
    };
    let violations = registry.validity_check();
    for v in &violations {
        warn!(violation = %v, "registry validity");
    }
    SessionReport {
        process: snapshot,
        inserted,
        error,
        registry_size: registry.len(),
        violations,
    }
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.process;
        writeln!(f, "process {} '{}'", p.pid, p.name)?;
        writeln!(
            f,
            "  priority {}  arrival {}  length {}  memory {}",
            p.priority, p.arrival, p.length, p.memory
        )?;
        writeln!(
            f,
            "  stages {}  segments {}",
            p.stages.len(),
            p.segments.len()
        )?;
        match (p.parent, p.parent_pid_raw) {
            (Some(parent), _) => writeln!(f, "  parent {parent}")?,
            (None, Some(raw)) => writeln!(f, "  parent {raw} (not registered, ignored)")?,
            (None, None) => writeln!(f, "  no parent")?,
        }
        match &self.error {
            None => writeln!(f, "inserted: yes ({} processes)", self.registry_size)?,
            Some(e) => writeln!(f, "inserted: no ({e})")?,
        }
        for v in &self.violations {
            writeln!(f, "warning: {v}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{DEL, ctrl};

    fn opts() -> EditorOptions {
        EditorOptions {
            area: Rect::new(0, 0, 40, 12),
            ratio: 3,
            title: None,
            max_items: 16,
            layout: KeyLayout::QWERTY,
        }
    }

    fn feed(editor: &mut ProcessEditor<'_>, bytes: &[u8]) -> Flow {
        for b in bytes {
            if editor.feed(*b) == Flow::Quit {
                return Flow::Quit;
            }
        }
        Flow::Continue
    }

    #[test]
    fn length_tracks_stage_durations() {
        let mut p = Process::new(1, "job");
        p.stage_count = 2;
        let lists = {
            let mut ed = ProcessEditor::bind(&mut p, &opts()).expect("bind");
            let down = ctrl(b'j');
            let right = ctrl(b'l');
            // Name, PID, Priority, Arrival, Stages, stage 1
            feed(&mut ed, &[down, down, down, down, down, right, right]);
            feed(&mut ed, b"12");
            feed(&mut ed, &[down]);
            feed(&mut ed, b"30");
            assert_eq!(
                ed.dialog().entry(LENGTH).and_then(|e| e.field().integer()),
                Some(42)
            );
            assert_eq!(feed(&mut ed, &[ctrl(b'c')]), Flow::Quit);
            ed.finish()
        };
        conclude(&mut p, lists, &Registry::new());
        assert_eq!(p.length, 42);
        assert_eq!(p.stage_count, 2);
        assert_eq!(p.stages[1].duration, 30);
    }

    #[test]
    fn read_only_rejection_reaches_status() {
        let mut p = Process::new(1, "job");
        let mut ed = ProcessEditor::bind(&mut p, &opts()).expect("bind");
        // Stages is 0, so the next row after it is Length.
        for _ in 0..5 {
            ed.feed(ctrl(b'j'));
        }
        ed.feed(b'5');
        assert_eq!(ed.status(), Some("Length is read-only"));
        ed.feed(ctrl(b'k'));
        assert_eq!(ed.status(), None);
    }

    #[test]
    fn oversized_count_is_capped_and_reported_on_bind() {
        let mut p = Process::new(1, "job");
        p.stage_count = 500;
        let lists = {
            let ed = ProcessEditor::bind(&mut p, &opts()).expect("bind");
            assert_eq!(ed.status(), Some("Stages is limited to 16 items"));
            ed.finish()
        };
        conclude(&mut p, lists, &Registry::new());
        assert_eq!(p.stage_count, 16);
        assert_eq!(p.stages.len(), 16);
    }

    #[test]
    fn name_edits_reach_the_process() {
        let mut p = Process::new(1, "ab");
        let lists = {
            let mut ed = ProcessEditor::bind(&mut p, &opts()).expect("bind");
            feed(&mut ed, &[DEL, b'c', b' ', b'9']);
            ed.finish()
        };
        conclude(&mut p, lists, &Registry::new());
        assert_eq!(p.name, "ac 9");
    }

    #[test]
    fn unresolved_parent_stays_unset() {
        let mut registry = Registry::new();
        registry.insert(Process::new(3, "parent")).expect("insert");

        let mut p = Process::new(4, "child");
        p.parent_pid_raw = Some(9);
        conclude(&mut p, EditedLists::default(), &registry);
        assert_eq!(p.parent, None);

        p.parent_pid_raw = Some(3);
        conclude(&mut p, EditedLists::default(), &registry);
        assert_eq!(p.parent, Some(3));
    }

    #[test]
    fn submit_reports_duplicates() {
        let mut registry = Registry::new();
        registry.insert(Process::new(2, "a")).expect("insert");
        let report = submit(Process::new(2, "b"), &mut registry);
        assert!(!report.inserted);
        assert_eq!(report.registry_size, 1);
        assert!(report.to_string().contains("inserted: no"));

        let report = submit(Process::new(5, "c"), &mut registry);
        assert!(report.inserted);
        assert_eq!(report.registry_size, 2);
    }
}
