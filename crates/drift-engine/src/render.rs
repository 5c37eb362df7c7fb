//! Frame capture and terminal painting.
//!
//! A [`Frame`] is copied out of the simulation state while the read lock
//! is held and painted after the lock is released, so a slow terminal
//! never stalls the tick loop.

use std::io::{self, Write};

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType};
use drift_core::config::{BackgroundImage, VisualConfig};
use drift_core::tick::SimulationState;
use drift_types::ParticleType;
use drift_world::Cell;

use crate::palette::Palette;

/// Terminal row of the first grid row; the status line sits above it.
pub const GRID_TOP: u16 = 2;

const FALLBACK_FLAKE: char = '*';

/// How a glyph is colored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Nothing to draw.
    Blank,
    /// A flake colored by its tint.
    Flake(u8),
    /// Settled snow, packed snow, or ice.
    Stage,
    /// Part of a background picture.
    Background,
}

/// One character cell of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    /// Character to print.
    pub ch: char,
    /// Coloring rule.
    pub tone: Tone,
}

impl Glyph {
    const BLANK: Self = Self {
        ch: ' ',
        tone: Tone::Blank,
    };
}

/// Characters used for each particle type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyphs {
    flakes: Vec<char>,
    settled: char,
    packed: char,
    ice: char,
}

impl Glyphs {
    /// Take the first character of each configured flake glyph.
    pub fn from_config(visual: &VisualConfig) -> Self {
        Self {
            flakes: visual
                .flake_variants
                .iter()
                .map(|v| v.glyph.chars().next().unwrap_or(FALLBACK_FLAKE))
                .collect(),
            settled: visual.settled_glyph,
            packed: visual.packed_glyph,
            ice: visual.ice_glyph,
        }
    }

    fn glyph(&self, cell: &Cell) -> Glyph {
        let (ch, tone) = match cell.particle {
            ParticleType::Empty => return Glyph::BLANK,
            ParticleType::SnowFlake => (
                self.flakes
                    .get(cell.variant)
                    .copied()
                    .unwrap_or(FALLBACK_FLAKE),
                Tone::Flake(cell.tint),
            ),
            ParticleType::Settled => (self.settled, Tone::Stage),
            ParticleType::Packed => (self.packed, Tone::Stage),
            ParticleType::Ice => (self.ice, Tone::Stage),
        };
        Glyph { ch, tone }
    }
}

/// Values shown on the status line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusInfo {
    /// Whether new flakes are spawning.
    pub spawn_enabled: bool,
    /// Per-column spawn probability.
    pub spawn_rate: f64,
    /// Current wind force.
    pub wind: f64,
    /// Temperature setting.
    pub temperature: i32,
    /// Current backoff multiplier.
    pub backoff: f64,
    /// Flakes on the grid.
    pub flakes: usize,
    /// Whether the tick loop is paused.
    pub paused: bool,
}

/// Visible part of the grid plus the status values, ready to paint.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    width: usize,
    height: usize,
    glyphs: Vec<Glyph>,
    /// Status line values.
    pub status: StatusInfo,
}

impl Frame {
    /// Copy the visible viewport out of `state`.
    ///
    /// Background pictures fill cells that hold no particle.
    pub fn capture(
        state: &SimulationState,
        glyphs: &Glyphs,
        backgrounds: &[BackgroundImage],
        paused: bool,
    ) -> Self {
        let dims = state.grid.dimensions();
        let width = dims.visible_width;
        let height = dims.height;

        let mut cells = Vec::with_capacity(width.saturating_mul(height));
        for y in 0..height {
            let visible = state
                .grid
                .row(y)
                .and_then(|row| row.get(dims.visible_start..dims.visible_end()))
                .unwrap_or_default();
            cells.extend(visible.iter().map(|cell| glyphs.glyph(cell)));
            cells.resize(width.saturating_mul(y.saturating_add(1)), Glyph::BLANK);
        }

        let mut frame = Self {
            width,
            height,
            glyphs: cells,
            status: StatusInfo {
                spawn_enabled: state.params.spawn_enabled,
                spawn_rate: state.params.spawn_rate,
                wind: state.wind.current(),
                temperature: state.params.temperature,
                backoff: state.backoff.current(),
                flakes: state.grid.count(ParticleType::SnowFlake),
                paused,
            },
        };
        for image in backgrounds {
            frame.composite(image);
        }
        frame
    }

    fn composite(&mut self, image: &BackgroundImage) {
        let left = percent_of(image.x_percent, self.width);
        let top = percent_of(image.y_percent, self.height);
        for (dy, line) in image.lines.iter().enumerate() {
            for (dx, ch) in line.chars().enumerate() {
                if ch == ' ' {
                    continue;
                }
                let (y, x) = (top.saturating_add(dy), left.saturating_add(dx));
                if y >= self.height || x >= self.width {
                    continue;
                }
                let index = y.saturating_mul(self.width).saturating_add(x);
                if let Some(glyph) = self
                    .glyphs
                    .get_mut(index)
                    .filter(|g| g.tone == Tone::Blank)
                {
                    *glyph = Glyph {
                        ch,
                        tone: Tone::Background,
                    };
                }
            }
        }
    }

    /// Columns in the frame.
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Rows in the frame.
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Glyphs of row `y`.
    pub fn row(&self, y: usize) -> Option<&[Glyph]> {
        let start = y.checked_mul(self.width)?;
        self.glyphs.get(start..start.checked_add(self.width)?)
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn percent_of(percent: f64, extent: usize) -> usize {
    if percent.is_nan() || percent <= 0.0 {
        return 0;
    }
    (percent / 100.0 * extent as f64).floor() as usize
}

#[allow(clippy::cast_possible_truncation)]
fn whole_percent(fraction: f64) -> i64 {
    // saturating float-to-int cast
    (fraction * 100.0).trunc() as i64
}

/// Text of the wind indicator, with an arrow on the side the wind blows to.
pub fn wind_indicator(wind: f64) -> String {
    let strength = whole_percent(wind.abs());
    if wind < 0.0 {
        format!("← Wind: {strength}%")
    } else if wind > 0.0 {
        format!("Wind: {strength}% →")
    } else {
        "No Wind".to_owned()
    }
}

/// The full status line.
pub fn status_line(status: &StatusInfo) -> String {
    let spawn = if status.spawn_enabled { "ON" } else { "OFF" };
    let mut line = format!(
        "Q: Quit | SPACE: Snow [{spawn}] | ↑/↓: Rate ({}%) | ←/→: {} | +/-: Temp ({}) | Backoff: {:.2}x | Flakes: {}",
        whole_percent(status.spawn_rate),
        wind_indicator(status.wind),
        status.temperature,
        status.backoff,
        status.flakes,
    );
    if status.paused {
        line.push_str(" | PAUSED");
    }
    line
}

/// Paint `frame` starting at the top-left corner of the terminal.
///
/// # Errors
///
/// Returns any error from writing to `out`.
pub fn paint(
    out: &mut impl Write,
    frame: &Frame,
    palette: &Palette,
    show_status: bool,
) -> io::Result<()> {
    queue!(out, MoveTo(0, 0), Clear(ClearType::CurrentLine))?;
    if show_status {
        let text: String = status_line(&frame.status)
            .chars()
            .take(frame.width())
            .collect();
        queue!(out, SetForegroundColor(Color::White), Print(text))?;
    }

    for y in 0..frame.height() {
        let Some(row) = frame.row(y) else {
            continue;
        };
        let line = GRID_TOP.saturating_add(u16::try_from(y).unwrap_or(u16::MAX));
        queue!(out, MoveTo(0, line))?;

        let mut current: Option<Color> = None;
        for glyph in row {
            let color = match glyph.tone {
                Tone::Flake(tint) => palette.flake(tint),
                Tone::Background => Color::DarkGrey,
                Tone::Stage | Tone::Blank => Color::White,
            };
            if current != Some(color) {
                queue!(out, SetForegroundColor(color))?;
                current = Some(color);
            }
            queue!(out, Print(glyph.ch))?;
        }
    }

    queue!(out, ResetColor)?;
    out.flush()
}
