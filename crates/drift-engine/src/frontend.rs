//! Interactive terminal session.
//!
//! Runs on a blocking thread next to the async tick loop. Input is
//! translated into edits on the shared state under the write lock; each
//! frame is captured under the read lock and painted after it is
//! released. The terminal is restored when the session ends, whichever
//! way it ends.

use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, Show};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::style::ResetColor;
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use drift_core::config::{BackgroundImage, FrontendConfig, GeometryConfig, SimulationConfig};
use drift_core::operator::OperatorState;
use drift_core::tick::SimulationState;
use drift_types::{Direction, GridDimensions};
use drift_world::{BrushOutcome, push_patch, toggle_patch};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::EngineError;
use crate::palette::Palette;
use crate::render::{self, Frame, GRID_TOP, Glyphs};

/// A user action bound to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Leave the session.
    Quit,
    /// Turn spawning on or off.
    ToggleSpawning,
    /// Raise the spawn rate by one step.
    RaiseSpawnRate,
    /// Lower the spawn rate by one step.
    LowerSpawnRate,
    /// Start a gust.
    Gust(Direction),
    /// Raise the temperature by one degree.
    Warmer,
    /// Lower the temperature by one degree.
    Colder,
    /// Show or hide the status line.
    ToggleStatus,
    /// Pause or resume the tick loop.
    TogglePause,
}

/// Map a key press to its command.
pub fn command_for(key: KeyEvent) -> Option<Command> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    let command = match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Command::Quit,
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Command::Quit,
        KeyCode::Char(' ') => Command::ToggleSpawning,
        KeyCode::Up => Command::RaiseSpawnRate,
        KeyCode::Down => Command::LowerSpawnRate,
        KeyCode::Left => Command::Gust(Direction::Left),
        KeyCode::Right => Command::Gust(Direction::Right),
        KeyCode::Char('+' | '=') => Command::Warmer,
        KeyCode::Char('-' | '_') => Command::Colder,
        KeyCode::Char('h' | 'H') => Command::ToggleStatus,
        KeyCode::Char('p' | 'P') => Command::TogglePause,
        _ => return None,
    };
    Some(command)
}

/// Apply a command that edits the simulation state.
///
/// Session-level commands (quit, status, pause) are ignored here.
pub fn apply_command(command: Command, state: &mut SimulationState, rng: &mut impl Rng) {
    match command {
        Command::ToggleSpawning => {
            let enabled = state.toggle_spawning();
            info!(enabled, "Spawning toggled");
        }
        Command::RaiseSpawnRate => {
            let rate = state.adjust_spawn_rate(state.params.spawn_rate_step());
            debug!(rate, "Spawn rate raised");
        }
        Command::LowerSpawnRate => {
            let rate = state.adjust_spawn_rate(-state.params.spawn_rate_step());
            debug!(rate, "Spawn rate lowered");
        }
        Command::Gust(direction) => {
            state.gust(direction, rng);
            debug!(
                ?direction,
                target = state.wind.target(),
                stop_at = state.wind.stop_at(),
                "Gust started"
            );
        }
        Command::Warmer => {
            let temperature = state.adjust_temperature(1);
            debug!(temperature, "Temperature raised");
        }
        Command::Colder => {
            let temperature = state.adjust_temperature(-1);
            debug!(temperature, "Temperature lowered");
        }
        Command::Quit | Command::ToggleStatus | Command::TogglePause => {}
    }
}

/// A pointer edit to apply to the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BrushAction {
    /// Place or remove snow around a cell.
    Toggle {
        /// Grid row.
        y: usize,
        /// Grid column.
        x: usize,
    },
    /// Push particles around a cell along the drag direction.
    Push {
        /// Grid row.
        y: usize,
        /// Grid column.
        x: usize,
        /// Rows moved since the last drag event.
        dir_y: f64,
        /// Columns moved since the last drag event.
        dir_x: f64,
    },
}

/// Left-button state between mouse events.
#[derive(Debug, Default)]
pub struct Pointer {
    last: Option<(usize, usize)>,
    dragged: bool,
}

impl Pointer {
    /// Track a mouse event and return the edit it triggers, if any.
    ///
    /// A release toggles a patch unless the press turned into a drag.
    /// Events outside the visible grid are ignored.
    pub fn on_mouse(&mut self, event: MouseEvent, dims: GridDimensions) -> Option<BrushAction> {
        let position = grid_position(event.column, event.row, dims);
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.last = position;
                self.dragged = false;
                None
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                let (y, x) = position?;
                let previous = self.last.replace((y, x));
                let (py, px) = previous?;
                if (py, px) == (y, x) {
                    return None;
                }
                self.dragged = true;
                Some(BrushAction::Push {
                    y,
                    x,
                    dir_y: coordinate(y) - coordinate(py),
                    dir_x: coordinate(x) - coordinate(px),
                })
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let dragged = std::mem::take(&mut self.dragged);
                self.last = None;
                let (y, x) = position?;
                (!dragged).then_some(BrushAction::Toggle { y, x })
            }
            _ => None,
        }
    }
}

/// Translate a terminal cell to grid coordinates.
fn grid_position(column: u16, row: u16, dims: GridDimensions) -> Option<(usize, usize)> {
    let y = usize::from(row.checked_sub(GRID_TOP)?);
    let column = usize::from(column);
    if y >= dims.height || column >= dims.visible_width {
        return None;
    }
    Some((y, dims.visible_start.checked_add(column)?))
}

fn coordinate(value: usize) -> f64 {
    f64::from(u32::try_from(value).unwrap_or(u32::MAX))
}

/// Raw mode, alternate screen, and mouse capture for the guard's lifetime.
struct TerminalGuard;

impl TerminalGuard {
    fn enter(out: &mut Stdout) -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let guard = Self;
        execute!(
            out,
            EnterAlternateScreen,
            EnableMouseCapture,
            Hide,
            Clear(ClearType::All)
        )?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let mut out = io::stdout();
        // Best effort: the process is leaving the screen either way.
        let _restored = execute!(
            out,
            ResetColor,
            Show,
            DisableMouseCapture,
            LeaveAlternateScreen
        );
        let _raw = terminal::disable_raw_mode();
    }
}

/// Whether the session continues after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// The interactive front-end.
pub struct Session {
    state: Arc<RwLock<SimulationState>>,
    operator: Arc<OperatorState>,
    settings: FrontendConfig,
    geometry: GeometryConfig,
    glyphs: Glyphs,
    palette: Palette,
    backgrounds: Vec<BackgroundImage>,
    show_status: bool,
    pointer: Pointer,
    rng: StdRng,
}

impl Session {
    /// Build a session; flake colors are drawn here, once.
    pub fn new(
        state: Arc<RwLock<SimulationState>>,
        operator: Arc<OperatorState>,
        config: &SimulationConfig,
    ) -> Self {
        let mut rng = StdRng::from_os_rng();
        let palette = Palette::generate(&config.visual.colors, &mut rng);
        Self {
            state,
            operator,
            settings: config.frontend.clone(),
            geometry: config.geometry.clone(),
            glyphs: Glyphs::from_config(&config.visual),
            palette,
            backgrounds: config.visual.backgrounds.clone(),
            show_status: config.frontend.show_status,
            pointer: Pointer::default(),
            rng,
        }
    }

    /// Run until the user quits or a stop is requested elsewhere.
    ///
    /// Must be called from a blocking thread: state locks are taken with
    /// `blocking_read` and `blocking_write`.
    pub fn run(mut self) -> Result<(), EngineError> {
        let mut out = io::stdout();
        let _terminal = TerminalGuard::enter(&mut out)?;
        info!("Terminal session started");

        let poll_interval = Duration::from_millis(self.settings.poll_interval_ms);
        let frame_interval = Duration::from_millis(self.settings.frame_interval_ms);
        let mut last_frame: Option<Instant> = None;

        while !self.operator.is_stop_requested() {
            if event::poll(poll_interval)? && self.handle_event(event::read()?, &mut out)? == Flow::Quit
            {
                info!("Quit requested from the terminal");
                break;
            }
            if last_frame.is_none_or(|at| at.elapsed() >= frame_interval) {
                self.draw(&mut out)?;
                last_frame = Some(Instant::now());
            }
        }
        Ok(())
    }

    fn handle_event(&mut self, event: Event, out: &mut Stdout) -> Result<Flow, EngineError> {
        match event {
            Event::Key(key) => {
                let Some(command) = command_for(key) else {
                    return Ok(Flow::Continue);
                };
                match command {
                    Command::Quit => return Ok(Flow::Quit),
                    Command::ToggleStatus => self.show_status = !self.show_status,
                    Command::TogglePause => {
                        let paused = self.operator.toggle_pause();
                        info!(paused, "Pause toggled");
                    }
                    _ => {
                        let mut state = self.state.blocking_write();
                        apply_command(command, &mut state, &mut self.rng);
                    }
                }
            }
            Event::Mouse(mouse) if is_left_button(mouse.kind) => self.handle_mouse(mouse),
            Event::Resize(columns, rows) => {
                let dims = self.geometry.dimensions(columns, rows);
                self.state.blocking_write().resize(dims)?;
                execute!(out, Clear(ClearType::All))?;
                info!(
                    columns,
                    rows,
                    width = dims.width,
                    height = dims.height,
                    "Terminal resized"
                );
            }
            _ => {}
        }
        Ok(Flow::Continue)
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let mut state = self.state.blocking_write();
        let dims = state.grid.dimensions();
        let radius = self.settings.brush_radius;
        match self.pointer.on_mouse(mouse, dims) {
            Some(BrushAction::Toggle { y, x }) => match toggle_patch(&mut state.grid, y, x, radius) {
                BrushOutcome::Removed(n) => debug!(y, x, removed = n, "Patch cleared"),
                BrushOutcome::Placed(n) => debug!(y, x, placed = n, "Patch filled"),
                BrushOutcome::Missed => {}
            },
            Some(BrushAction::Push { y, x, dir_y, dir_x }) => {
                let moved = push_patch(&mut state.grid, y, x, dir_y, dir_x, radius);
                debug!(y, x, moved, "Patch pushed");
            }
            None => {}
        }
    }

    fn draw(&self, out: &mut Stdout) -> Result<(), EngineError> {
        let frame = {
            let state = self.state.blocking_read();
            Frame::capture(
                &state,
                &self.glyphs,
                &self.backgrounds,
                self.operator.is_paused(),
            )
        };
        render::paint(out, &frame, &self.palette, self.show_status)?;
        Ok(())
    }
}

const fn is_left_button(kind: MouseEventKind) -> bool {
    matches!(
        kind,
        MouseEventKind::Down(MouseButton::Left)
            | MouseEventKind::Drag(MouseButton::Left)
            | MouseEventKind::Up(MouseButton::Left)
    )
}
