use std::fs;
use std::path::Path;

use sym::config;
use sym::editor::EditorOptions;
use sym::model::ViolationKind;

fn write(dir: &Path, name: &str, body: &str) {
    fs::write(dir.join(name), body).expect("write config");
}

#[test]
fn seeded_registry_from_extended_config() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(
        dir.path(),
        "base.toml",
        r#"
[dialog]
width = 56
height = 20

[[registry.processes]]
pid = 1
name = "init"
arrival = 5
"#,
    );
    write(
        dir.path(),
        "sym.toml",
        r#"
extends = "base.toml"

[dialog]
title = "New process"

[process]
name = "worker"
stages = 3

[[registry.processes]]
pid = 3
name = "shell"
arrival = 3
parent = 1
segments = [{ name = "text", address = 4096, size = 512 }]
"#,
    );

    let cfg = config::load_or_default(Some(&dir.path().join("sym.toml"))).expect("config");
    assert_eq!(cfg.dialog.width, 56);
    assert_eq!(cfg.dialog.title, "New process");

    // Arrays of tables are replaced, not appended, by the child file.
    let registry = cfg.registry.build().expect("registry");
    assert_eq!(registry.len(), 1);
    let shell = registry.lookup(3).expect("shell");
    assert_eq!(shell.memory, 512);
    assert_eq!(shell.parent, None);
    assert_eq!(shell.parent_pid_raw, Some(1));
    assert!(registry.validity_check().is_empty());

    let next = cfg.process.new_process(registry.next_pid());
    assert_eq!(next.pid, 4);
    assert_eq!(next.name, "worker");
    assert_eq!(next.stage_count, 3);

    let opts = EditorOptions::from_config(&cfg.dialog);
    assert_eq!(opts.area.width, 56);
    assert_eq!(opts.area.height, 20);
    assert_eq!(opts.title.as_deref(), Some("New process"));
}

#[test]
fn seeded_violations_are_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(
        dir.path(),
        "sym.toml",
        r#"
[[registry.processes]]
pid = 1
arrival = 5

[[registry.processes]]
pid = 2
arrival = 3
parent = 1

[[registry.processes]]
pid = 3
arrival = 10
parent = 1
"#,
    );
    let cfg = config::load_or_default(Some(&dir.path().join("sym.toml"))).expect("config");
    let registry = cfg.registry.build().expect("registry");
    let violations = registry.validity_check();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].child, 2);
    assert!(matches!(
        violations[0].kind,
        ViolationKind::ArrivesBeforeParent { .. }
    ));
}

#[test]
fn missing_explicit_config_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = config::load_or_default(Some(&dir.path().join("nope.toml"))).expect_err("missing");
    assert!(err.to_string().contains("failed to read config"));
}
