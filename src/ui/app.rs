//! Main TUI application state and logic

use super::panes::{self, ScrollState, SourceScrollState, StatusRenderData};
use crate::snapshot::SnapshotManager;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Source,
    Stack,
    Heap,
    Events,
}

impl FocusedPane {
    /// Move focus to the next pane (clockwise: source -> events -> stack -> heap)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Source => FocusedPane::Events,
            FocusedPane::Events => FocusedPane::Stack,
            FocusedPane::Stack => FocusedPane::Heap,
            FocusedPane::Heap => FocusedPane::Source,
        }
    }

    /// Move focus to the previous pane (counter-clockwise)
    pub fn prev(self) -> Self {
        match self {
            FocusedPane::Source => FocusedPane::Heap,
            FocusedPane::Events => FocusedPane::Source,
            FocusedPane::Stack => FocusedPane::Events,
            FocusedPane::Heap => FocusedPane::Stack,
        }
    }
}

/// Step viewer over a recorded run
pub struct App {
    /// Recorded memory states, one per executed line plus the final state
    pub history: SnapshotManager,

    /// The script that was recorded
    pub source_code: String,

    /// Message for the run's outcome, shown on the last step
    pub outcome: String,

    /// Whether the run stopped on an error
    pub failed: bool,

    pub focused_pane: FocusedPane,

    /// Per-pane scroll offsets
    pub source_scroll: SourceScrollState,
    pub stack_scroll: ScrollState,
    pub heap_scroll: ScrollState,
    pub events_scroll: ScrollState,

    pub should_quit: bool,

    /// Status message to display
    pub status_message: String,

    /// Whether auto-play mode is active
    pub is_playing: bool,

    /// Last time a step was taken in play mode
    pub last_play_time: Instant,

    /// Last time space was pressed (for debouncing)
    pub last_space_press: Instant,
}

impl App {
    pub fn new(history: SnapshotManager, source_code: String, outcome: String, failed: bool) -> Self {
        let now = Instant::now();
        App {
            history,
            source_code,
            outcome,
            failed,
            focused_pane: FocusedPane::Source,
            source_scroll: SourceScrollState::default(),
            stack_scroll: ScrollState::default(),
            heap_scroll: ScrollState::default(),
            events_scroll: ScrollState::default(),
            should_quit: false,
            status_message: String::from("Ready!"),
            is_playing: false,
            last_play_time: now,
            last_space_press: now.checked_sub(Duration::from_secs(1)).unwrap_or(now),
        }
    }

    /// Run the TUI application
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            if self.is_playing && self.last_play_time.elapsed() >= Duration::from_secs(1) {
                if self.history.step_forward().is_ok() {
                    self.status_message = "Playing...".to_string();
                } else {
                    self.is_playing = false;
                    self.status_message = "Playback complete".to_string();
                }
                self.last_play_time = Instant::now();
            }

            // Poll with a timeout so auto-play keeps advancing
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        Ok(())
    }

    fn is_at_end(&self) -> bool {
        self.history.position() + 1 >= self.history.len()
    }

    fn render(&mut self, frame: &mut Frame) {
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(frame.area());

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(main_chunks[0]);

        // Left column: Source (top) | Events (bottom)
        let left_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(columns[0]);

        // Right column: Stack (top) | Heap (bottom)
        let right_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(columns[1]);

        let Some(snapshot) = self.history.current() else {
            return;
        };
        let at_end = self.is_at_end();
        let is_error = self.failed && at_end;

        panes::render_source_pane(
            frame,
            left_rows[0],
            &self.source_code,
            snapshot.line,
            is_error,
            self.focused_pane == FocusedPane::Source,
            &mut self.source_scroll,
        );

        panes::render_events_pane(
            frame,
            left_rows[1],
            snapshot.memory.events(),
            self.focused_pane == FocusedPane::Events,
            &mut self.events_scroll,
        );

        panes::render_stack_pane(
            frame,
            right_rows[0],
            &snapshot.memory,
            self.focused_pane == FocusedPane::Stack,
            &mut self.stack_scroll,
        );

        panes::render_heap_pane(
            frame,
            right_rows[1],
            &snapshot.memory,
            self.focused_pane == FocusedPane::Heap,
            &mut self.heap_scroll,
        );

        let message = if at_end && !self.is_playing {
            self.outcome.as_str()
        } else {
            self.status_message.as_str()
        };
        panes::render_status_bar(
            frame,
            main_chunks[1],
            StatusRenderData {
                message,
                current_step: self.history.position(),
                total_steps: self.history.len(),
                stats: snapshot.memory.stats(),
                is_error,
                is_playing: self.is_playing,
            },
        );
    }

    fn focused_scroll(&mut self) -> Option<&mut ScrollState> {
        match self.focused_pane {
            FocusedPane::Source => None,
            FocusedPane::Stack => Some(&mut self.stack_scroll),
            FocusedPane::Heap => Some(&mut self.heap_scroll),
            FocusedPane::Events => Some(&mut self.events_scroll),
        }
    }

    fn handle_key_event(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            // Number keys step forward N times directly
            KeyCode::Char(c @ '1'..='9') => {
                self.is_playing = false;
                let n = c.to_digit(10).unwrap_or(1);
                let stepped = (0..n)
                    .take_while(|_| self.history.step_forward().is_ok())
                    .count();
                self.status_message = format!("Stepped forward {} step(s)", stepped);
            }
            KeyCode::Tab => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::BackTab => {
                self.focused_pane = self.focused_pane.prev();
            }
            KeyCode::Left => {
                self.is_playing = false;
                self.status_message = match self.history.step_backward() {
                    Ok(()) => "Stepped backward".to_string(),
                    Err(err) => format!("Cannot step backward: {}", err),
                };
            }
            KeyCode::Right => {
                self.is_playing = false;
                self.status_message = match self.history.step_forward() {
                    Ok(()) => "Stepped forward".to_string(),
                    Err(err) => format!("Cannot step forward: {}", err),
                };
            }
            KeyCode::Up => match self.focused_scroll() {
                Some(scroll) => scroll.offset = scroll.offset.saturating_sub(1),
                // Scrolling up makes the current line move down visually
                None => {
                    if let Some(row) = self.source_scroll.target_line_row {
                        self.source_scroll.target_line_row = Some(row.saturating_add(1));
                    }
                }
            },
            KeyCode::Down => match self.focused_scroll() {
                Some(scroll) => scroll.offset = scroll.offset.saturating_add(1),
                None => {
                    if let Some(row) = self.source_scroll.target_line_row {
                        self.source_scroll.target_line_row = Some(row.saturating_sub(1));
                    }
                }
            },
            KeyCode::Char(' ') => {
                // Toggle auto-play (200ms debounce against key repeat)
                if self.last_space_press.elapsed() >= Duration::from_millis(200) {
                    self.last_space_press = Instant::now();
                    self.is_playing = !self.is_playing;
                    if self.is_playing {
                        if self.is_at_end() {
                            self.history.rewind_to_start();
                        }
                        let now = Instant::now();
                        self.last_play_time = now.checked_sub(Duration::from_secs(1)).unwrap_or(now);
                        self.status_message = "Playing...".to_string();
                    } else {
                        self.status_message = "Paused".to_string();
                    }
                }
            }
            KeyCode::Enter => {
                self.is_playing = false;
                self.history.jump_to_end();
                self.status_message = "Jumped to end".to_string();
            }
            KeyCode::Backspace => {
                self.is_playing = false;
                self.history.rewind_to_start();
                self.status_message = "Jumped to start".to_string();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Interpreter;
    use crate::snapshot::record;
    use crossterm::event::KeyModifiers;

    fn app() -> App {
        let mut interpreter = Interpreter::new();
        let script = "int main() {\n  int* p = new int;\n  delete p;\n}\n";
        let recording = record(&mut interpreter, script, usize::MAX);
        App::new(recording.history, script.to_string(), "done".to_string(), false)
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key_event(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn test_focus_cycles_through_all_panes() {
        let mut pane = FocusedPane::Source;
        for _ in 0..4 {
            pane = pane.next();
        }
        assert_eq!(pane, FocusedPane::Source);
        assert_eq!(FocusedPane::Source.next().prev(), FocusedPane::Source);
    }

    #[test]
    fn test_navigation_keys() {
        let mut app = app();
        press(&mut app, KeyCode::Right);
        assert_eq!(app.history.position(), 1);
        press(&mut app, KeyCode::Enter);
        assert!(app.is_at_end());
        press(&mut app, KeyCode::Right);
        assert!(app.status_message.starts_with("Cannot step forward"));
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.history.position(), 0);
        press(&mut app, KeyCode::Char('3'));
        assert_eq!(app.history.position(), 3);
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }
}
