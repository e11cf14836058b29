use std::collections::VecDeque;
use std::io::{self, Read, Stdout};

use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::{Frame, Terminal};
use tracing::{debug, info};

use crate::editor::{EditorOptions, Flow, ProcessEditor, conclude};
use crate::error::{Error, Result};
use crate::model::{Process, Registry};

pub mod resize;

/// One step of terminal input as seen by the session loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Byte(u8),
    /// The read was interrupted (normally by SIGWINCH); redraw and read again.
    Repaint,
    Closed,
}

pub trait KeySource {
    fn next_event(&mut self) -> Result<InputEvent>;
}

/// Blocking single-byte reads from stdin, for a terminal in raw mode.
pub struct StdinKeys {
    stdin: io::Stdin,
}

impl StdinKeys {
    pub fn new() -> Self {
        Self { stdin: io::stdin() }
    }
}

impl Default for StdinKeys {
    fn default() -> Self {
        Self::new()
    }
}

impl KeySource for StdinKeys {
    fn next_event(&mut self) -> Result<InputEvent> {
        let mut byte = [0u8; 1];
        match self.stdin.lock().read(&mut byte) {
            Ok(0) => Ok(InputEvent::Closed),
            Ok(_) => Ok(InputEvent::Byte(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(InputEvent::Repaint),
            Err(e) => Err(Error::msg(format!("failed to read input: {e}"))),
        }
    }
}

/// Replays a fixed byte sequence, then reports end of input.
#[derive(Debug, Clone, Default)]
pub struct ScriptedKeys {
    bytes: VecDeque<u8>,
}

impl ScriptedKeys {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into().into(),
        }
    }
}

impl KeySource for ScriptedKeys {
    fn next_event(&mut self) -> Result<InputEvent> {
        Ok(self
            .bytes
            .pop_front()
            .map_or(InputEvent::Closed, InputEvent::Byte))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Quit,
    /// Input ran out before the quit key.
    Closed,
}

/// Render, read one byte, apply; until quit or end of input.
pub fn run_session<B: Backend, K: KeySource>(
    terminal: &mut Terminal<B>,
    keys: &mut K,
    editor: &mut ProcessEditor<'_>,
) -> Result<SessionEnd> {
    loop {
        if resize::take_dirty() {
            debug!(size = ?resize::size(), "terminal resized");
            terminal
                .clear()
                .map_err(|e| Error::msg(format!("terminal clear failed: {e}")))?;
        }
        terminal
            .draw(|frame| draw_editor(frame, editor))
            .map_err(|e| Error::msg(format!("draw failed: {e}")))?;

        match keys.next_event()? {
            InputEvent::Byte(b) => {
                if editor.feed(b) == Flow::Quit {
                    return Ok(SessionEnd::Quit);
                }
            }
            InputEvent::Repaint => {}
            InputEvent::Closed => return Ok(SessionEnd::Closed),
        }
    }
}

/// Draws the dialog with a status line directly below it.
pub fn draw_editor(frame: &mut Frame<'_>, editor: &mut ProcessEditor<'_>) {
    let area = frame.area();
    let bounds = Rect {
        height: area.height.saturating_sub(1),
        ..area
    };
    editor.prepare(bounds);

    let dialog_area = editor.dialog().area();
    frame.render_widget(editor.dialog(), dialog_area);

    let y = dialog_area.bottom().min(area.bottom().saturating_sub(1));
    let x = dialog_area.x.min(area.right().saturating_sub(1));
    if area.height == 0 || area.width == 0 {
        return;
    }
    let status = Rect::new(x, y, area.right() - x, 1);
    frame.render_widget(Paragraph::new(status_line(editor)), status);
}

fn status_line(editor: &ProcessEditor<'_>) -> Line<'static> {
    match editor.status() {
        Some(msg) => Line::from(Span::styled(
            msg.to_string(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        None => {
            let quit = (editor.layout().quit as char).to_ascii_uppercase();
            Line::from(Span::styled(
                format!("Ctrl-{quit} done  arrows move  Space toggle"),
                Style::default().fg(Color::DarkGray),
            ))
        }
    }
}

fn restore_terminal() {
    disable_raw_mode().ok();
    execute!(io::stdout(), LeaveAlternateScreen, Show).ok();
}

fn install_panic_hook() {
    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore_terminal();
        prev(info);
    }));
}

fn enter_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, Hide).map_err(|e| Error::msg(e.to_string()))?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).map_err(|e| Error::msg(e.to_string()))?;
    terminal
        .clear()
        .map_err(|e| Error::msg(format!("tui clear failed: {e}")))?;
    Ok(terminal)
}

fn with_terminal<T>(
    f: impl FnOnce(&mut Terminal<CrosstermBackend<Stdout>>) -> Result<T>,
) -> Result<T> {
    enable_raw_mode().map_err(|e| Error::msg(e.to_string()))?;
    install_panic_hook();
    let mut terminal = match enter_terminal() {
        Ok(terminal) => terminal,
        Err(e) => {
            restore_terminal();
            return Err(e);
        }
    };

    let result = f(&mut terminal);

    restore_terminal();
    result
}

/// Runs one interactive edit of `process` on the real terminal, then resolves
/// its parent against `registry`. The lists are restored even on error.
pub fn run_editor(
    process: &mut Process,
    registry: &Registry,
    opts: &EditorOptions,
) -> Result<SessionEnd> {
    resize::install().map_err(|e| Error::msg(format!("failed to watch resizes: {e}")))?;
    let (result, lists) = {
        let mut editor = ProcessEditor::bind(process, opts)?;
        info!(
            area = ?editor.dialog().area(),
            entries = editor.dialog().entries().len(),
            layout = editor.layout().name,
            "edit session started"
        );
        let result =
            with_terminal(|terminal| run_session(terminal, &mut StdinKeys::new(), &mut editor));
        (result, editor.finish())
    };
    conclude(process, lists, registry);
    if let Ok(end) = &result {
        info!(?end, pid = process.pid, "edit session ended");
    }
    result
}
