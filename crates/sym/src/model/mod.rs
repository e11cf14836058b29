use serde::{Deserialize, Serialize};

pub mod registry;

pub use registry::{Registry, Violation, ViolationKind};

pub type Pid = u64;

/// Maximum number of characters a text field (process or stage name) can hold.
pub const TEXT_CAPACITY: usize = 128;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageKind {
    Io,
    #[default]
    Compute,
}

impl StageKind {
    pub fn toggled(self) -> Self {
        match self {
            StageKind::Io => StageKind::Compute,
            StageKind::Compute => StageKind::Io,
        }
    }

    pub fn is_io(self) -> bool {
        self == StageKind::Io
    }
}

/// One execution phase of a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stage {
    pub name: String,
    pub kind: StageKind,
    pub duration: u64,
}

impl Stage {
    /// Default stage for the given zero-based position in its list.
    pub fn numbered(position: usize) -> Self {
        Self {
            name: format!("stage {}", position + 1),
            kind: StageKind::Compute,
            duration: 0,
        }
    }
}

/// A memory region owned by a process. Load/unload times are carried for the
/// memory manager; the editor only exposes name, address and size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub name: String,
    pub load_at: u64,
    pub unload_at: u64,
    pub address: u64,
    pub size: u64,
}

impl Segment {
    pub fn numbered(position: usize) -> Self {
        Self {
            name: format!("segment {}", position + 1),
            load_at: 0,
            unload_at: 0,
            address: 0,
            size: 0,
        }
    }
}

// No scheduler drives these yet; every process stays `Launched`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    Launched,
    Acquiring,
    Ready,
    Executing,
    Blocked,
    Zombie,
    Terminated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Process {
    pub pid: Pid,
    pub name: String,
    pub priority: u64,
    pub arrival: u64,
    /// Sum of stage durations.
    pub length: u64,
    /// Sum of segment sizes.
    pub memory: u64,
    pub stage_count: u64,
    pub stages: Vec<Stage>,
    pub current_stage: usize,
    pub segment_count: u64,
    pub segments: Vec<Segment>,
    pub status: Status,
    /// Resolved parent. Only ever set to a pid present in the registry at
    /// resolution time.
    pub parent: Option<Pid>,
    /// Parent pid as typed by the user, before resolution.
    pub parent_pid_raw: Option<Pid>,
    pub turnaround: u64,
    pub elapsed: u64,
}

impl Process {
    pub fn new(pid: Pid, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
            priority: 0,
            arrival: 0,
            length: 0,
            memory: 0,
            stage_count: 0,
            stages: Vec::new(),
            current_stage: 0,
            segment_count: 0,
            segments: Vec::new(),
            status: Status::Launched,
            parent: None,
            parent_pid_raw: None,
            turnaround: 0,
            elapsed: 0,
        }
    }

    pub fn recompute_derived(&mut self) {
        self.length = total_duration(&self.stages);
        self.memory = total_memory(&self.segments);
    }
}

pub fn total_duration(stages: &[Stage]) -> u64 {
    stages
        .iter()
        .fold(0u64, |acc, s| acc.saturating_add(s.duration))
}

pub fn total_memory(segments: &[Segment]) -> u64 {
    segments
        .iter()
        .fold(0u64, |acc, s| acc.saturating_add(s.size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_totals_follow_lists() {
        let mut p = Process::new(7, "worker");
        p.stages = vec![Stage::numbered(0), Stage::numbered(1)];
        p.stages[0].duration = 4;
        p.stages[1].duration = 6;
        p.segments = vec![Segment::numbered(0)];
        p.segments[0].size = 512;

        p.recompute_derived();
        assert_eq!(p.length, 10);
        assert_eq!(p.memory, 512);
    }

    #[test]
    fn numbered_defaults_are_one_based() {
        let s = Stage::numbered(2);
        assert_eq!(s.name, "stage 3");
        assert_eq!(s.kind, StageKind::Compute);
        assert_eq!(s.duration, 0);
        assert_eq!(Segment::numbered(0).name, "segment 1");
    }

    #[test]
    fn totals_saturate() {
        let mut a = Stage::numbered(0);
        a.duration = u64::MAX;
        let mut b = Stage::numbered(1);
        b.duration = 5;
        assert_eq!(total_duration(&[a, b]), u64::MAX);
    }
}
