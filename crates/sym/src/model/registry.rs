use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{Pid, Process};

/// In-memory collection of every known process, ordered by ascending pid.
#[derive(Debug, Default)]
pub struct Registry {
    processes: BTreeMap<Pid, Process>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum ViolationKind {
    /// The parent does not arrive strictly before the child.
    ArrivesBeforeParent { parent_arrival: u64, child_arrival: u64 },
    /// The resolved parent pid is no longer registered.
    ParentMissing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub child: Pid,
    pub parent: Pid,
    #[serde(flatten)]
    pub kind: ViolationKind,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ViolationKind::ArrivesBeforeParent {
                parent_arrival,
                child_arrival,
            } => write!(
                f,
                "process {} arrives at {} but its parent {} arrives at {}",
                self.child, child_arrival, self.parent, parent_arrival
            ),
            ViolationKind::ParentMissing => write!(
                f,
                "process {} references parent {} which is not registered",
                self.child, self.parent
            ),
        }
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts in pid order. An existing pid is left untouched and reported as
    /// a duplicate.
    pub fn insert(&mut self, process: Process) -> Result<()> {
        if self.processes.contains_key(&process.pid) {
            return Err(Error::duplicate_pid(process.pid));
        }
        self.processes.insert(process.pid, process);
        Ok(())
    }

    pub fn lookup(&self, pid: Pid) -> Option<&Process> {
        self.processes.get(&pid)
    }

    pub fn lookup_mut(&mut self, pid: Pid) -> Option<&mut Process> {
        self.processes.get_mut(&pid)
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.processes.contains_key(&pid)
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Process> {
        self.processes.values()
    }

    /// Smallest pid greater than every registered one.
    pub fn next_pid(&self) -> Pid {
        self.processes
            .last_key_value()
            .map(|(pid, _)| pid.saturating_add(1))
            .unwrap_or(1)
    }

    /// Maps a raw parent pid onto a registered process, or `None`.
    pub fn resolve_parent(&self, raw: Option<Pid>) -> Option<Pid> {
        raw.filter(|pid| self.contains(*pid))
    }

    /// Advisory check of the parent/child arrival ordering. Nothing enforces it
    /// at insertion time.
    pub fn validity_check(&self) -> Vec<Violation> {
        let mut out = Vec::new();
        for child in self.processes.values() {
            let Some(parent_pid) = child.parent else {
                continue;
            };
            let kind = match self.lookup(parent_pid) {
                None => ViolationKind::ParentMissing,
                Some(parent) if parent.arrival >= child.arrival => {
                    ViolationKind::ArrivesBeforeParent {
                        parent_arrival: parent.arrival,
                        child_arrival: child.arrival,
                    }
                }
                Some(_) => continue,
            };
            out.push(Violation {
                child: child.pid,
                parent: parent_pid,
                kind,
            });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proc_at(pid: Pid, arrival: u64, parent: Option<Pid>) -> Process {
        let mut p = Process::new(pid, format!("p{pid}"));
        p.arrival = arrival;
        p.parent = parent;
        p
    }

    #[test]
    fn insert_keeps_pid_order_and_rejects_duplicates() {
        let mut reg = Registry::new();
        for pid in [3, 1, 2] {
            reg.insert(proc_at(pid, 0, None)).expect("fresh pid");
        }
        assert_eq!(reg.iter().map(|p| p.pid).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(reg.lookup(2).map(|p| p.pid), Some(2));

        let mut dup = proc_at(2, 99, None);
        dup.name = "impostor".into();
        let err = reg.insert(dup).expect_err("duplicate pid");
        assert!(err.is_duplicate_pid());
        assert_eq!(reg.len(), 3);
        assert_eq!(reg.lookup(2).map(|p| p.name.as_str()), Some("p2"));
    }

    #[test]
    fn next_pid_follows_highest() {
        let mut reg = Registry::new();
        assert_eq!(reg.next_pid(), 1);
        reg.insert(proc_at(41, 0, None)).expect("insert");
        reg.insert(proc_at(7, 0, None)).expect("insert");
        assert_eq!(reg.next_pid(), 42);
    }

    #[test]
    fn resolve_parent_only_returns_registered_pids() {
        let mut reg = Registry::new();
        reg.insert(proc_at(5, 0, None)).expect("insert");
        assert_eq!(reg.resolve_parent(Some(5)), Some(5));
        assert_eq!(reg.resolve_parent(Some(6)), None);
        assert_eq!(reg.resolve_parent(None), None);
    }

    #[test]
    fn validity_check_flags_late_parent() {
        let mut reg = Registry::new();
        reg.insert(proc_at(1, 5, None)).expect("insert");
        reg.insert(proc_at(2, 3, Some(1))).expect("insert");

        let v = reg.validity_check();
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].child, 2);
        assert_eq!(
            v[0].kind,
            ViolationKind::ArrivesBeforeParent {
                parent_arrival: 5,
                child_arrival: 3
            }
        );

        reg.lookup_mut(2).expect("child").arrival = 10;
        assert!(reg.validity_check().is_empty());
    }

    #[test]
    fn validity_check_equal_arrival_is_a_violation() {
        let mut reg = Registry::new();
        reg.insert(proc_at(1, 4, None)).expect("insert");
        reg.insert(proc_at(2, 4, Some(1))).expect("insert");
        assert_eq!(reg.validity_check().len(), 1);
    }

    #[test]
    fn validity_check_reports_missing_parent() {
        let mut reg = Registry::new();
        reg.insert(proc_at(2, 4, Some(9))).expect("insert");
        let v = reg.validity_check();
        assert_eq!(v[0].kind, ViolationKind::ParentMissing);
        assert!(v[0].to_string().contains("not registered"));
    }
}
