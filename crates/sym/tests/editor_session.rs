use std::collections::VecDeque;

use ratatui::Terminal;
use ratatui::backend::TestBackend;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Modifier;

use sym::config::ProcessDefaults;
use sym::editor::{EditorOptions, ProcessEditor, conclude, submit};
use sym::input::{KeyLayout, ctrl};
use sym::model::{Process, Registry};
use sym::ui::{InputEvent, KeySource, ScriptedKeys, SessionEnd, resize, run_session};

fn opts() -> EditorOptions {
    EditorOptions {
        area: Rect::new(0, 0, 40, 14),
        ratio: 3,
        title: Some("Process".into()),
        max_items: 16,
        layout: KeyLayout::QWERTY,
    }
}

fn screen_row(buf: &Buffer, y: u16) -> String {
    (0..buf.area.width).map(|x| buf[(x, y)].symbol()).collect()
}

fn find_row(buf: &Buffer, label: &str) -> Option<String> {
    (0..buf.area.height)
        .map(|y| screen_row(buf, y))
        .find(|row| row.contains(label))
}

/// Hands out a fixed list of events, then reports end of input.
struct Events(VecDeque<InputEvent>);

impl KeySource for Events {
    fn next_event(&mut self) -> sym::Result<InputEvent> {
        Ok(self.0.pop_front().unwrap_or(InputEvent::Closed))
    }
}

fn registry_with_parent() -> Registry {
    let mut registry = Registry::new();
    registry
        .insert(Process::new(1, "init"))
        .expect("insert parent");
    registry
}

/// Runs a scripted session and hands back the end state and the last frame.
fn edit(
    process: &mut Process,
    registry: &Registry,
    script: Vec<u8>,
) -> (SessionEnd, Buffer) {
    let mut terminal = Terminal::new(TestBackend::new(60, 20)).expect("terminal");
    let mut keys = ScriptedKeys::new(script);
    let (end, lists) = {
        let mut editor = ProcessEditor::bind(process, &opts()).expect("bind");
        let end = run_session(&mut terminal, &mut keys, &mut editor).expect("session");
        (end, editor.finish())
    };
    conclude(process, lists, registry);
    (end, terminal.backend().buffer().clone())
}

#[test]
fn full_session_sets_durations_and_parent() {
    let registry = registry_with_parent();
    let defaults = ProcessDefaults {
        stages: 2,
        segments: 1,
        ..ProcessDefaults::default()
    };
    let mut process = defaults.new_process(registry.next_pid());
    assert_eq!(process.pid, 2);

    let jump = ctrl(b'd');
    let mut script = vec![jump; 5];
    script.extend([ctrl(b'l'), ctrl(b'l'), b'7', ctrl(b'j'), b'5']);
    script.extend([jump; 5]);
    script.extend([b'1', ctrl(b'c')]);

    let (end, screen) = edit(&mut process, &registry, script);
    assert_eq!(end, SessionEnd::Quit);

    let length_row = find_row(&screen, "Length").expect("length row");
    assert!(length_row.contains("12"), "row was {length_row:?}");
    let parent_row = find_row(&screen, "Parent").expect("parent row");
    assert!(parent_row.contains('1'), "row was {parent_row:?}");

    assert_eq!(process.length, 12);
    assert_eq!(process.stage_count, 2);
    assert_eq!(process.segment_count, 1);
    assert_eq!(process.stages[0].duration, 7);
    assert_eq!(process.stages[1].duration, 5);
    assert_eq!(process.parent_pid_raw, Some(1));
    assert_eq!(process.parent, Some(1));
    assert_eq!(process.name, "a really long name");
}

#[test]
fn unknown_parent_is_left_unset() {
    let registry = registry_with_parent();
    let mut process = ProcessDefaults::default().new_process(registry.next_pid());

    let mut script = vec![ctrl(b'd'); 10];
    script.extend([b'4', b'2', ctrl(b'c')]);
    let (end, _) = edit(&mut process, &registry, script);

    assert_eq!(end, SessionEnd::Quit);
    assert_eq!(process.parent_pid_raw, Some(42));
    assert_eq!(process.parent, None);
}

#[test]
fn end_of_input_closes_the_session() {
    let registry = Registry::new();
    let mut process = Process::new(1, "job");
    resize::record(60, 20);

    let (end, screen) = edit(&mut process, &registry, b"\x7f\x7fzz".to_vec());
    assert_eq!(end, SessionEnd::Closed);
    assert_eq!(process.name, "jzz");
    assert!(find_row(&screen, "Name").is_some());
}

#[test]
fn rejected_key_shows_on_the_status_line() {
    let registry = Registry::new();
    let mut process = Process::new(1, "job");

    // Priority only takes digits; the last frame is drawn after the rejection.
    let script = vec![ctrl(b'j'), ctrl(b'j'), b'x'];
    let (_, screen) = edit(&mut process, &registry, script);
    let status = screen_row(&screen, 14);
    assert!(
        status.contains("Priority only accepts digits"),
        "status was {status:?}"
    );
}

#[test]
fn submit_after_session_reports_insertion_and_ordering() {
    let mut registry = registry_with_parent();
    let mut process = ProcessDefaults {
        stages: 0,
        segments: 0,
        ..ProcessDefaults::default()
    }
    .new_process(registry.next_pid());

    let mut script = vec![ctrl(b'd'); 8];
    script.extend([b'1', ctrl(b'c')]);
    edit(&mut process, &registry, script);
    assert_eq!(process.parent, Some(1));

    let report = submit(process, &mut registry);
    assert!(report.inserted);
    assert_eq!(report.registry_size, 2);
    // Both arrive at 0: the parent does not arrive strictly first.
    assert_eq!(report.violations.len(), 1);

    let json = serde_json::to_value(&report).expect("json");
    assert_eq!(json["process"]["parent"], 1);
    assert_eq!(json["violations"][0]["kind"], "arrives-before-parent");
}

#[test]
fn repaint_after_shrink_fits_the_new_size() {
    let mut process = Process::new(1, "job");
    process.stage_count = 3;
    let mut terminal = Terminal::new(TestBackend::new(60, 20)).expect("terminal");
    let mut editor = ProcessEditor::bind(&mut process, &opts()).expect("bind");

    // Name, PID, Priority, Arrival, Stages, 3 stages, Length, Segments,
    // Memory, Parent: eleven moves land on Parent.
    let mut walk = Events(vec![InputEvent::Byte(ctrl(b'j')); 11].into());
    let end = run_session(&mut terminal, &mut walk, &mut editor).expect("session");
    assert_eq!(end, SessionEnd::Closed);
    assert!(find_row(terminal.backend().buffer(), "Name").is_some());

    terminal.backend_mut().resize(30, 8);
    resize::record(30, 8);
    let mut repaint = Events(VecDeque::from([InputEvent::Repaint]));
    let end = run_session(&mut terminal, &mut repaint, &mut editor).expect("session");
    assert_eq!(end, SessionEnd::Closed);

    let screen = terminal.backend().buffer().clone();
    assert_eq!(screen.area, Rect::new(0, 0, 30, 8));
    let dialog = editor.dialog().area();
    assert!(dialog.width <= 30 && dialog.bottom() <= 7, "dialog was {dialog:?}");

    // Five content rows scrolled to the bottom: stage 3 through Parent.
    assert!(find_row(&screen, "Name").is_none());
    let y = (0..screen.area.height)
        .find(|&y| screen_row(&screen, y).contains("Parent"))
        .expect("parent row");
    assert!(y < 7, "parent drawn on row {y}");
    assert!(screen[(1, y)].modifier.contains(Modifier::REVERSED));
    assert!(screen_row(&screen, 7).contains("done"));
}
