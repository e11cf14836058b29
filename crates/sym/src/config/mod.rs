use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use toml::Value;
use tracing::{debug, warn};

use crate::dialog::DEFAULT_MAX_ITEMS;
use crate::error::{Error, Result};
use crate::model::{Pid, Process, Registry, Segment, Stage, StageKind};
use crate::text::sanitize_name;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "sym.toml";

#[derive(Debug, Clone)]
pub struct ConfigDoc {
    pub path: PathBuf,
    pub value: Value,
}

impl ConfigDoc {
    pub fn parse(&self) -> Result<Config> {
        self.value.clone().try_into().map_err(|e| {
            Error::msg(format!("invalid config {}: {e}", self.path.display()))
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub dialog: DialogConfig,
    pub process: ProcessDefaults,
    pub registry: RegistrySeed,
    pub log: LogConfig,
}

impl Config {
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::msg(format!("failed to render config: {e}")))
    }
}

/// Placement and look of the editor dialog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DialogConfig {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    /// The label column takes `1/ratio` of the width.
    pub ratio: u16,
    pub title: String,
    pub max_items: usize,
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            x: 2,
            y: 1,
            width: 48,
            height: 16,
            ratio: 3,
            title: "Process".into(),
            max_items: DEFAULT_MAX_ITEMS,
        }
    }
}

/// Initial values of the record created by `sym edit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessDefaults {
    pub name: String,
    pub priority: u64,
    pub arrival: u64,
    pub stages: u64,
    pub segments: u64,
}

impl Default for ProcessDefaults {
    fn default() -> Self {
        Self {
            name: "a really long name".into(),
            priority: 0,
            arrival: 0,
            stages: 10,
            segments: 10,
        }
    }
}

impl ProcessDefaults {
    /// Lists stay empty; the editor sizes them from the counts.
    pub fn new_process(&self, pid: Pid) -> Process {
        let mut p = Process::new(pid, sanitize_name(&self.name));
        p.priority = self.priority;
        p.arrival = self.arrival;
        p.stage_count = self.stages;
        p.segment_count = self.segments;
        p
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistrySeed {
    pub processes: Vec<ProcessSeed>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessSeed {
    pub pid: Pid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub priority: u64,
    #[serde(default)]
    pub arrival: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Pid>,
    #[serde(default)]
    pub stages: Vec<StageSeed>,
    #[serde(default)]
    pub segments: Vec<SegmentSeed>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageSeed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub kind: StageKind,
    #[serde(default)]
    pub duration: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SegmentSeed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub address: u64,
    #[serde(default)]
    pub size: u64,
}

impl ProcessSeed {
    fn to_process(&self) -> Process {
        let mut p = Process::new(self.pid, sanitize_name(&self.name));
        p.priority = self.priority;
        p.arrival = self.arrival;
        p.parent_pid_raw = self.parent;
        p.stages = self
            .stages
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let mut stage = Stage::numbered(i);
                if let Some(name) = &s.name {
                    stage.name = sanitize_name(name);
                }
                stage.kind = s.kind;
                stage.duration = s.duration;
                stage
            })
            .collect();
        p.segments = self
            .segments
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let mut seg = Segment::numbered(i);
                if let Some(name) = &s.name {
                    seg.name = sanitize_name(name);
                }
                seg.address = s.address;
                seg.size = s.size;
                seg
            })
            .collect();
        p.stage_count = p.stages.len() as u64;
        p.segment_count = p.segments.len() as u64;
        p.recompute_derived();
        p
    }
}

impl RegistrySeed {
    /// Inserts every seed, then resolves parents against the full set so
    /// seeds may reference each other in any order.
    pub fn build(&self) -> Result<Registry> {
        let mut registry = Registry::new();
        for seed in &self.processes {
            registry
                .insert(seed.to_process())
                .map_err(|e| Error::msg(format!("registry seed: {e}")))?;
        }
        for seed in &self.processes {
            let resolved = registry.resolve_parent(seed.parent);
            if let (Some(raw), None) = (seed.parent, resolved) {
                warn!(pid = seed.pid, parent = raw, "seed parent not registered");
            }
            if let Some(p) = registry.lookup_mut(seed.pid) {
                p.parent = resolved;
            }
        }
        debug!(processes = registry.len(), "registry seeded");
        Ok(registry)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    pub format: LogFormat,
}

fn merge_values(base: &mut Value, child: Value) {
    match (base, child) {
        (Value::Table(base_tbl), Value::Table(child_tbl)) => {
            for (k, v) in child_tbl {
                match base_tbl.get_mut(&k) {
                    Some(existing) => merge_values(existing, v),
                    None => {
                        base_tbl.insert(k, v);
                    }
                }
            }
        }
        (base_slot, child_val) => {
            *base_slot = child_val;
        }
    }
}

fn resolve_ref_path(from_file: &Path, reference: &str) -> PathBuf {
    let p = PathBuf::from(reference);
    if p.is_absolute() {
        p
    } else {
        from_file.parent().unwrap_or_else(|| Path::new(".")).join(p)
    }
}

fn load_value_inner(path: &Path, stack: &mut HashSet<PathBuf>) -> Result<Value> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !stack.insert(canonical.clone()) {
        return Err(Error::msg(format!(
            "config extends cycle detected at {}",
            canonical.display()
        )));
    }

    let data = fs::read_to_string(path)
        .map_err(|e| Error::msg(format!("failed to read config {}: {e}", path.display())))?;
    let mut value: Value = toml::from_str(&data)
        .map_err(|e| Error::msg(format!("TOML parse error in {}: {e}", path.display())))?;

    let mut out = Value::Table(Default::default());
    if let Some(ext) = value.get("extends").and_then(Value::as_str) {
        let base_path = resolve_ref_path(path, ext);
        out = load_value_inner(&base_path, stack)?;
    }
    if let Some(tbl) = value.as_table_mut() {
        tbl.remove("extends");
    }
    merge_values(&mut out, value);

    stack.remove(&canonical);
    Ok(out)
}

/// Reads `path` with its `extends` chain merged in, parent first.
pub fn load(path: &Path) -> Result<ConfigDoc> {
    let mut stack = HashSet::<PathBuf>::new();
    let value = load_value_inner(path, &mut stack)?;
    Ok(ConfigDoc {
        path: path.to_path_buf(),
        value,
    })
}

/// Loads `path`, or `sym.toml` when it exists, or falls back to defaults.
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !p.is_file() {
                return Ok(Config::default());
            }
            p
        }
    };
    load(&path)?.parse()
}
