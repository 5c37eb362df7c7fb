//! Configuration loading and typed config structures for the Drift simulation.
//!
//! The canonical configuration lives in `drift-config.yaml`. This module
//! defines strongly-typed structs that mirror the YAML structure, and a
//! loader that reads, parses, and validates the file. Every section and
//! field has a default, so an empty file (or no file at all) yields the
//! reference behavior.
//!
//! An unknown color scheme, malformed YAML, or an out-of-range threshold
//! is a fatal startup error: it is reported once, before any tick runs.

use std::path::Path;

use drift_types::GridDimensions;
use drift_world::{BackoffSettings, WindSettings};
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content (including unknown color schemes).
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but a value is out of range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `drift-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Tick timing and population cap.
    #[serde(default)]
    pub world: WorldConfig,

    /// Initial values and bounds of the user-adjustable parameters.
    #[serde(default)]
    pub parameters: ParametersConfig,

    /// Compaction and melting thresholds.
    #[serde(default)]
    pub physics: PhysicsConfig,

    /// Wind ramp and gust duration.
    #[serde(default)]
    pub wind: WindSettings,

    /// Coverage backoff tuning.
    #[serde(default)]
    pub backoff: BackoffSettings,

    /// Viewport-to-grid geometry ratios.
    #[serde(default)]
    pub geometry: GeometryConfig,

    /// Glyphs, masses, colors, and background art.
    #[serde(default)]
    pub visual: VisualConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Simulation boundary parameters.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,

    /// Terminal front-end settings.
    #[serde(default)]
    pub frontend: FrontendConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `DRIFT_HEADLESS=1` (or `true`) overrides `frontend.headless`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value fails validation.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value fails validation.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.frontend.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Check every value the engine relies on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.world.tick_interval_ms == 0 {
            return invalid("world.tick_interval_ms must be at least 1");
        }
        check_probability("world.relief_fraction", self.world.relief_fraction)?;

        let p = &self.parameters;
        check_probability("parameters.min_spawn_rate", p.min_spawn_rate)?;
        check_probability("parameters.max_spawn_rate", p.max_spawn_rate)?;
        if p.min_spawn_rate > p.max_spawn_rate {
            return invalid("parameters.min_spawn_rate exceeds max_spawn_rate");
        }
        if p.spawn_rate < p.min_spawn_rate || p.spawn_rate > p.max_spawn_rate {
            return invalid("parameters.spawn_rate is outside [min_spawn_rate, max_spawn_rate]");
        }
        if p.min_temperature > p.max_temperature {
            return invalid("parameters.min_temperature exceeds max_temperature");
        }
        if p.temperature < p.min_temperature || p.temperature > p.max_temperature {
            return invalid("parameters.temperature is outside its bounds");
        }

        let melt = &self.physics.melt;
        for (name, value) in [
            ("physics.melt.base_chance", melt.base_chance),
            ("physics.melt.settled_to_packed", melt.settled_to_packed),
            ("physics.melt.settled_to_empty", melt.settled_to_empty),
            ("physics.melt.packed_to_ice", melt.packed_to_ice),
            ("physics.melt.packed_to_empty", melt.packed_to_empty),
            ("physics.melt.ice_to_empty", melt.ice_to_empty),
        ] {
            check_probability(name, value)?;
        }
        if !(self.physics.packing.base_time.is_finite() && self.physics.packing.base_time >= 0.0) {
            return invalid("physics.packing.base_time must be a non-negative number");
        }
        if !(self.physics.ice.base_time.is_finite() && self.physics.ice.base_time >= 0.0) {
            return invalid("physics.ice.base_time must be a non-negative number");
        }

        if !(self.wind.max_strength.is_finite() && self.wind.max_strength >= 0.0) {
            return invalid("wind.max_strength must be a non-negative number");
        }
        if !(self.wind.ramp_speed.is_finite() && self.wind.ramp_speed > 0.0) {
            return invalid("wind.ramp_speed must be positive");
        }
        if self.wind.min_duration_ticks > self.wind.max_duration_ticks {
            return invalid("wind.min_duration_ticks exceeds max_duration_ticks");
        }
        check_probability("wind.gust_min_factor", self.wind.gust_min_factor)?;

        let b = &self.backoff;
        if !(b.target_coverage > 0.0 && b.target_coverage <= 1.0) {
            return invalid("backoff.target_coverage must be in (0, 1]");
        }
        if !(b.steepness.is_finite() && b.steepness > 0.0) {
            return invalid("backoff.steepness must be a positive number");
        }
        check_probability("backoff.row_density", b.row_density)?;

        self.geometry.validate()?;

        if self.visual.flake_variants.is_empty() {
            return invalid("visual.flake_variants must list at least one variant");
        }
        for (i, variant) in self.visual.flake_variants.iter().enumerate() {
            if !(variant.mass.is_finite() && variant.mass > 0.0) {
                return invalid(&format!("visual.flake_variants[{i}].mass must be positive"));
            }
            if variant.glyph.chars().count() != 1 {
                return invalid(&format!(
                    "visual.flake_variants[{i}].glyph must be a single character"
                ));
            }
        }
        self.visual.colors.validate()?;
        Ok(())
    }

    /// Per-variant flake masses, in variant-index order.
    pub fn flake_masses(&self) -> Vec<f64> {
        self.visual.flake_variants.iter().map(|v| v.mass).collect()
    }
}

fn invalid(reason: &str) -> Result<(), ConfigError> {
    Err(ConfigError::Invalid {
        reason: reason.to_owned(),
    })
}

fn check_probability(name: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        invalid(&format!("{name} must be in [0, 1], got {value}"))
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Tick timing and population limits.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorldConfig {
    /// Real-time milliseconds between ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Maximum number of falling flakes; spawning pauses at this count.
    #[serde(default = "default_max_snowflakes")]
    pub max_snowflakes: usize,

    /// Fraction of `max_snowflakes` at which the off-screen bottom row is
    /// cleared.
    #[serde(default = "default_relief_fraction")]
    pub relief_fraction: f64,

    /// Minimum number of top-row columns tried per spawn pass.
    #[serde(default = "default_min_spawn_columns")]
    pub min_spawn_columns: usize,

    /// The spawn pass tries `visible_width / spawn_column_divisor` columns.
    #[serde(default = "default_spawn_column_divisor")]
    pub spawn_column_divisor: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_snowflakes: default_max_snowflakes(),
            relief_fraction: default_relief_fraction(),
            min_spawn_columns: default_min_spawn_columns(),
            spawn_column_divisor: default_spawn_column_divisor(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Starting values and bounds for the parameters the user adjusts live.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParametersConfig {
    /// Whether flakes spawn at startup.
    #[serde(default = "default_true")]
    pub spawn_enabled: bool,

    /// Initial per-column spawn probability.
    #[serde(default = "default_spawn_rate")]
    pub spawn_rate: f64,

    /// Lowest spawn probability reachable with the arrow keys.
    #[serde(default = "default_min_spawn_rate")]
    pub min_spawn_rate: f64,

    /// Highest spawn probability reachable with the arrow keys.
    #[serde(default = "default_max_spawn_rate")]
    pub max_spawn_rate: f64,

    /// Spawn probability change per key press.
    #[serde(default = "default_spawn_rate_step")]
    pub spawn_rate_step: f64,

    /// Initial temperature.
    #[serde(default)]
    pub temperature: i32,

    /// Coldest reachable temperature.
    #[serde(default = "default_min_temperature")]
    pub min_temperature: i32,

    /// Warmest reachable temperature.
    #[serde(default = "default_max_temperature")]
    pub max_temperature: i32,
}

impl Default for ParametersConfig {
    fn default() -> Self {
        Self {
            spawn_enabled: true,
            spawn_rate: default_spawn_rate(),
            min_spawn_rate: default_min_spawn_rate(),
            max_spawn_rate: default_max_spawn_rate(),
            spawn_rate_step: default_spawn_rate_step(),
            temperature: 0,
            min_temperature: default_min_temperature(),
            max_temperature: default_max_temperature(),
        }
    }
}

// ---------------------------------------------------------------------------
// Physics
// ---------------------------------------------------------------------------

/// Thresholds for every transition rule.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PhysicsConfig {
    /// Flake-to-settled compression thresholds.
    #[serde(default)]
    pub compression: CompressionConfig,

    /// Settled-to-packed thresholds.
    #[serde(default)]
    pub packing: PackingConfig,

    /// Packed-to-ice thresholds.
    #[serde(default)]
    pub ice: IceConfig,

    /// Melt probabilities.
    #[serde(default)]
    pub melt: MeltConfig,
}

/// Tiered neighbor/time thresholds for compressing a flake.
///
/// Each tier lowers both the required number of flake neighbors and the
/// required stationary ticks: base, then supported (floor or solid below),
/// then crowded (enough solid orthogonal neighbors).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompressionConfig {
    /// Flake neighbors needed without support.
    #[serde(default = "default_base_neighbors")]
    pub base_neighbors: u32,
    /// Stationary ticks to exceed without support.
    #[serde(default = "default_base_ticks")]
    pub base_ticks: u32,
    /// Flake neighbors needed when supported.
    #[serde(default = "default_supported_neighbors")]
    pub supported_neighbors: u32,
    /// Stationary ticks to exceed when supported.
    #[serde(default = "default_supported_ticks")]
    pub supported_ticks: u32,
    /// Flake neighbors needed when crowded by solids.
    #[serde(default = "default_crowded_neighbors")]
    pub crowded_neighbors: u32,
    /// Stationary ticks to exceed when crowded by solids.
    #[serde(default = "default_crowded_ticks")]
    pub crowded_ticks: u32,
    /// Solid orthogonal neighbors that make a flake crowded.
    #[serde(default = "default_crowded_solid_neighbors")]
    pub crowded_solid_neighbors: u32,
    /// Solid orthogonal neighbors that compress a flake immediately.
    #[serde(default = "default_enclosed_solid_neighbors")]
    pub enclosed_solid_neighbors: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            base_neighbors: default_base_neighbors(),
            base_ticks: default_base_ticks(),
            supported_neighbors: default_supported_neighbors(),
            supported_ticks: default_supported_ticks(),
            crowded_neighbors: default_crowded_neighbors(),
            crowded_ticks: default_crowded_ticks(),
            crowded_solid_neighbors: default_crowded_solid_neighbors(),
            enclosed_solid_neighbors: default_enclosed_solid_neighbors(),
        }
    }
}

/// Thresholds for packing settled snow.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PackingConfig {
    /// Stationary ticks to exceed before backoff scaling.
    #[serde(default = "default_pack_time")]
    pub base_time: f64,
    /// `Settled | Packed` cells needed in the 3x3 block (center included).
    #[serde(default = "default_pack_neighbors")]
    pub neighbor_threshold: u32,
    /// Contiguous `Settled | Packed` cells needed directly below.
    #[serde(default = "default_pack_depth")]
    pub column_depth: u32,
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            base_time: default_pack_time(),
            neighbor_threshold: default_pack_neighbors(),
            column_depth: default_pack_depth(),
        }
    }
}

/// Thresholds for turning packed snow into ice.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IceConfig {
    /// Stationary ticks to exceed before backoff scaling.
    #[serde(default = "default_ice_time")]
    pub base_time: f64,
    /// `Packed | Ice` cells needed in the 3x3 block (center included).
    #[serde(default = "default_ice_neighbors")]
    pub neighbor_threshold: u32,
    /// Contiguous `Packed | Ice` cells needed directly below.
    #[serde(default = "default_ice_depth")]
    pub column_depth: u32,
}

impl Default for IceConfig {
    fn default() -> Self {
        Self {
            base_time: default_ice_time(),
            neighbor_threshold: default_ice_neighbors(),
            column_depth: default_ice_depth(),
        }
    }
}

/// Melt probabilities. Each sub-branch is an independent draw.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MeltConfig {
    /// Per-tick melt chance at temperature 0; doubles every 2 degrees.
    #[serde(default = "default_base_melt_chance")]
    pub base_chance: f64,
    /// Chance a melting settled cell refreezes into packed snow.
    #[serde(default = "default_settled_to_packed")]
    pub settled_to_packed: f64,
    /// Chance a melting settled cell disappears.
    #[serde(default = "default_settled_to_empty")]
    pub settled_to_empty: f64,
    /// Chance a melting packed cell refreezes into ice.
    #[serde(default = "default_packed_to_ice")]
    pub packed_to_ice: f64,
    /// Chance a melting packed cell disappears.
    #[serde(default = "default_packed_to_empty")]
    pub packed_to_empty: f64,
    /// Chance a melting ice cell disappears.
    #[serde(default = "default_ice_to_empty")]
    pub ice_to_empty: f64,
}

impl Default for MeltConfig {
    fn default() -> Self {
        Self {
            base_chance: default_base_melt_chance(),
            settled_to_packed: default_settled_to_packed(),
            settled_to_empty: default_settled_to_empty(),
            packed_to_ice: default_packed_to_ice(),
            packed_to_empty: default_packed_to_empty(),
            ice_to_empty: default_ice_to_empty(),
        }
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Ratios that turn a terminal size into grid dimensions.
///
/// All column ratios are multiples of the terminal width.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeometryConfig {
    /// Grid width as a multiple of the viewport width.
    #[serde(default = "default_width_factor")]
    pub width_factor: f64,
    /// Where the viewport starts.
    #[serde(default = "default_visible_start_ratio")]
    pub visible_start_ratio: f64,
    /// Where the floor starts.
    #[serde(default = "default_floor_start_ratio")]
    pub floor_start_ratio: f64,
    /// Floor width.
    #[serde(default = "default_floor_width_ratio")]
    pub floor_width_ratio: f64,
    /// Terminal rows not available to the grid (status line and padding).
    #[serde(default = "default_reserved_rows")]
    pub reserved_rows: u16,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            width_factor: default_width_factor(),
            visible_start_ratio: default_visible_start_ratio(),
            floor_start_ratio: default_floor_start_ratio(),
            floor_width_ratio: default_floor_width_ratio(),
            reserved_rows: default_reserved_rows(),
        }
    }
}

impl GeometryConfig {
    /// Grid dimensions for a terminal of `columns x rows` cells.
    ///
    /// The grid is always at least as wide as the viewport, and the floor
    /// is clipped to the grid.
    pub fn dimensions(&self, columns: u16, rows: u16) -> GridDimensions {
        let visible_width = usize::from(columns);
        let scaled = |ratio: f64| scale(visible_width, ratio);

        let visible_start = scaled(self.visible_start_ratio);
        let width = scaled(self.width_factor).max(visible_start.saturating_add(visible_width));
        let floor_start = scaled(self.floor_start_ratio).min(width);
        let floor_width = scaled(self.floor_width_ratio).min(width.saturating_sub(floor_start));

        GridDimensions {
            width,
            height: usize::from(rows.saturating_sub(self.reserved_rows)),
            visible_start,
            visible_width,
            floor_start,
            floor_width,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("geometry.width_factor", self.width_factor),
            ("geometry.visible_start_ratio", self.visible_start_ratio),
            ("geometry.floor_start_ratio", self.floor_start_ratio),
            ("geometry.floor_width_ratio", self.floor_width_ratio),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return invalid(&format!("{name} must be a non-negative number"));
            }
        }
        if self.width_factor < 1.0 {
            return invalid("geometry.width_factor must be at least 1.0");
        }
        Ok(())
    }
}

/// `count * ratio`, truncated toward zero.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn scale(count: usize, ratio: f64) -> usize {
    // ratio is validated non-negative and terminal sizes fit in u16.
    (count as f64 * ratio).max(0.0) as usize
}

// ---------------------------------------------------------------------------
// Visual
// ---------------------------------------------------------------------------

/// One flake appearance with its fall mass.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FlakeVariant {
    /// Single-character glyph.
    pub glyph: String,
    /// Mass; heavier flakes fall straighter and resist wind.
    pub mass: f64,
}

/// Channel used by the single-channel color scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorChannel {
    /// Grayscale: the value is copied to all three channels.
    All,
    /// Red only.
    R,
    /// Green only.
    G,
    /// Blue only.
    B,
}

/// How flake colors are generated. Unknown `scheme` names fail to parse.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum ColorScheme {
    /// A random intensity on one channel (or gray).
    SingleChannel {
        /// Which channel receives the value.
        channel: ColorChannel,
        /// Lowest intensity.
        min: u8,
        /// Highest intensity.
        max: u8,
    },
    /// A random packed `0xRRGGBB` value in `[min, max]`.
    RgbRange {
        /// Lowest packed color.
        min: u32,
        /// Highest packed color.
        max: u32,
    },
    /// A random hue and lightness at fixed saturation.
    HslRamp {
        /// First hue, degrees.
        hue_start: f64,
        /// Last hue, degrees.
        hue_end: f64,
        /// Saturation, percent.
        saturation: f64,
        /// Lowest lightness, percent.
        lightness_min: f64,
        /// Highest lightness, percent.
        lightness_max: f64,
    },
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::HslRamp {
            hue_start: 190.0,
            hue_end: 230.0,
            saturation: 60.0,
            lightness_min: 75.0,
            lightness_max: 95.0,
        }
    }
}

impl ColorScheme {
    fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::SingleChannel { min, max, .. } if min > max => {
                invalid("visual.colors: min exceeds max")
            }
            Self::RgbRange { min, max } if min > max || max > 0x00FF_FFFF => {
                invalid("visual.colors: rgb range must satisfy min <= max <= 0xFFFFFF")
            }
            Self::HslRamp {
                hue_start,
                hue_end,
                ..
            } if !(hue_start.is_finite() && hue_end.is_finite()) => {
                invalid("visual.colors: hues must be finite numbers")
            }
            Self::HslRamp {
                saturation,
                lightness_min,
                lightness_max,
                ..
            } if !(0.0..=100.0).contains(&saturation)
                || !(0.0..=100.0).contains(&lightness_min)
                || !(0.0..=100.0).contains(&lightness_max)
                || lightness_min > lightness_max =>
            {
                invalid("visual.colors: hsl percentages must be within [0, 100] and ordered")
            }
            _ => Ok(()),
        }
    }
}

/// ASCII art composited behind empty cells.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BackgroundImage {
    /// Left edge, percent of the viewport width.
    #[serde(default)]
    pub x_percent: f64,
    /// Top edge, percent of the grid height.
    #[serde(default)]
    pub y_percent: f64,
    /// Rows of the picture; spaces are transparent.
    pub lines: Vec<String>,
}

/// Glyphs, masses, and colors.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VisualConfig {
    /// Flake variants; the variant index of a flake selects one of these.
    #[serde(default = "default_flake_variants")]
    pub flake_variants: Vec<FlakeVariant>,
    /// Glyph for settled snow.
    #[serde(default = "default_settled_glyph")]
    pub settled_glyph: char,
    /// Glyph for packed snow.
    #[serde(default = "default_packed_glyph")]
    pub packed_glyph: char,
    /// Glyph for ice.
    #[serde(default = "default_ice_glyph")]
    pub ice_glyph: char,
    /// Flake color generation.
    #[serde(default)]
    pub colors: ColorScheme,
    /// Background pictures.
    #[serde(default)]
    pub backgrounds: Vec<BackgroundImage>,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            flake_variants: default_flake_variants(),
            settled_glyph: default_settled_glyph(),
            packed_glyph: default_packed_glyph(),
            ice_glyph: default_ice_glyph(),
            colors: ColorScheme::default(),
            backgrounds: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging / bounds / front-end
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default log level filter (overridden by `RUST_LOG`).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log file used while the terminal front-end owns the screen.
    #[serde(default = "default_log_file")]
    pub file: String,
    /// Emit a tick summary every this many ticks (0 disables).
    #[serde(default = "default_summary_interval_ticks")]
    pub summary_interval_ticks: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
            summary_interval_ticks: default_summary_interval_ticks(),
        }
    }
}

/// Simulation boundary parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Stop after this many ticks (0 = unlimited).
    #[serde(default)]
    pub max_ticks: u64,
    /// Stop after this many wall-clock seconds (0 = unlimited).
    #[serde(default)]
    pub max_real_time_seconds: u64,
}

/// Terminal front-end settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FrontendConfig {
    /// Run without a terminal UI, logging summaries to stderr.
    #[serde(default)]
    pub headless: bool,
    /// Upper bound on each input poll, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Minimum time between redraws, in milliseconds.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    /// Half-width of the square patch edited by a click or drag.
    #[serde(default = "default_brush_radius")]
    pub brush_radius: usize,
    /// Whether the status line is shown at startup.
    #[serde(default = "default_true")]
    pub show_status: bool,
    /// Viewport columns simulated in headless mode.
    #[serde(default = "default_headless_columns")]
    pub headless_columns: u16,
    /// Viewport rows simulated in headless mode.
    #[serde(default = "default_headless_rows")]
    pub headless_rows: u16,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            headless: false,
            poll_interval_ms: default_poll_interval_ms(),
            frame_interval_ms: default_frame_interval_ms(),
            brush_radius: default_brush_radius(),
            show_status: true,
            headless_columns: default_headless_columns(),
            headless_rows: default_headless_rows(),
        }
    }
}

impl FrontendConfig {
    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("DRIFT_HEADLESS") {
            self.headless = matches!(value.trim(), "1" | "true" | "yes");
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (required by serde)
// ---------------------------------------------------------------------------

const fn default_tick_interval_ms() -> u64 {
    50
}

const fn default_max_snowflakes() -> usize {
    2000
}

const fn default_relief_fraction() -> f64 {
    0.95
}

const fn default_min_spawn_columns() -> usize {
    3
}

const fn default_spawn_column_divisor() -> usize {
    5
}

const fn default_spawn_rate() -> f64 {
    0.1
}

const fn default_min_spawn_rate() -> f64 {
    0.01
}

const fn default_max_spawn_rate() -> f64 {
    0.5
}

const fn default_spawn_rate_step() -> f64 {
    0.05
}

const fn default_min_temperature() -> i32 {
    -10
}

const fn default_max_temperature() -> i32 {
    10
}

const fn default_base_neighbors() -> u32 {
    4
}

const fn default_base_ticks() -> u32 {
    15
}

const fn default_supported_neighbors() -> u32 {
    3
}

const fn default_supported_ticks() -> u32 {
    8
}

const fn default_crowded_neighbors() -> u32 {
    2
}

const fn default_crowded_ticks() -> u32 {
    4
}

const fn default_crowded_solid_neighbors() -> u32 {
    2
}

const fn default_enclosed_solid_neighbors() -> u32 {
    3
}

const fn default_pack_time() -> f64 {
    1000.0
}

const fn default_pack_neighbors() -> u32 {
    7
}

const fn default_pack_depth() -> u32 {
    4
}

const fn default_ice_time() -> f64 {
    2000.0
}

const fn default_ice_neighbors() -> u32 {
    8
}

const fn default_ice_depth() -> u32 {
    5
}

const fn default_base_melt_chance() -> f64 {
    0.001
}

const fn default_settled_to_packed() -> f64 {
    0.2
}

const fn default_settled_to_empty() -> f64 {
    0.2
}

const fn default_packed_to_ice() -> f64 {
    0.2
}

const fn default_packed_to_empty() -> f64 {
    0.05
}

const fn default_ice_to_empty() -> f64 {
    0.01
}

const fn default_width_factor() -> f64 {
    2.0
}

const fn default_visible_start_ratio() -> f64 {
    0.5
}

const fn default_floor_start_ratio() -> f64 {
    0.25
}

const fn default_floor_width_ratio() -> f64 {
    1.5
}

const fn default_reserved_rows() -> u16 {
    3
}

fn default_flake_variants() -> Vec<FlakeVariant> {
    [
        ("❄", 1.0),
        ("❅", 0.9),
        ("❆", 1.1),
        ("*", 0.8),
        ("+", 0.7),
        (".", 0.5),
        ("⠋", 0.6),
        ("⠛", 0.8),
        ("⠟", 1.0),
        ("⠿", 1.2),
        ("⡿", 1.4),
        ("⣿", 1.6),
    ]
    .into_iter()
    .map(|(glyph, mass)| FlakeVariant {
        glyph: glyph.to_owned(),
        mass,
    })
    .collect()
}

const fn default_settled_glyph() -> char {
    '░'
}

const fn default_packed_glyph() -> char {
    '▒'
}

const fn default_ice_glyph() -> char {
    '▓'
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_log_file() -> String {
    "drift.log".to_owned()
}

const fn default_summary_interval_ticks() -> u64 {
    100
}

const fn default_poll_interval_ms() -> u64 {
    10
}

const fn default_frame_interval_ms() -> u64 {
    33
}

const fn default_brush_radius() -> usize {
    3
}

const fn default_headless_columns() -> u16 {
    80
}

const fn default_headless_rows() -> u16 {
    24
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.world.tick_interval_ms, 50);
        assert_eq!(config.world.max_snowflakes, 2000);
        assert_eq!(config.visual.flake_variants.len(), 12);
        assert_eq!(config.physics.compression.base_neighbors, 4);
        assert_eq!(config.physics.packing.neighbor_threshold, 7);
        assert_eq!(config.physics.ice.column_depth, 5);
    }

    #[test]
    fn parse_empty_yaml() {
        let config = SimulationConfig::parse("").unwrap();
        assert_eq!(config.world, WorldConfig::default());
        assert_eq!(config.physics, PhysicsConfig::default());
    }

    #[test]
    fn parse_partial_yaml() {
        let yaml = r"
world:
  tick_interval_ms: 20
physics:
  melt:
    base_chance: 0.01
  packing:
    base_time: 50
wind:
  max_strength: 1.0
visual:
  flake_variants:
    - { glyph: '*', mass: 1.0 }
    - { glyph: '.', mass: 0.5 }
  colors:
    scheme: single_channel
    channel: all
    min: 180
    max: 255
";
        let config = SimulationConfig::parse(yaml).unwrap();
        assert_eq!(config.world.tick_interval_ms, 20);
        assert_eq!(config.world.max_snowflakes, 2000);
        assert!((config.physics.melt.base_chance - 0.01).abs() < 1e-12);
        assert!((config.physics.melt.ice_to_empty - 0.01).abs() < 1e-12);
        assert!((config.physics.packing.base_time - 50.0).abs() < 1e-12);
        assert_eq!(config.physics.packing.neighbor_threshold, 7);
        assert!((config.wind.max_strength - 1.0).abs() < 1e-12);
        assert!((config.wind.ramp_speed - 0.05).abs() < 1e-12);
        assert_eq!(config.flake_masses(), vec![1.0, 0.5]);
        assert_eq!(
            config.visual.colors,
            ColorScheme::SingleChannel {
                channel: ColorChannel::All,
                min: 180,
                max: 255
            }
        );
    }

    #[test]
    fn unknown_color_scheme_is_fatal() {
        let yaml = "visual:\n  colors:\n    scheme: plaid\n";
        assert!(matches!(
            SimulationConfig::parse(yaml),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn malformed_yaml_is_fatal() {
        assert!(matches!(
            SimulationConfig::parse("world: [unclosed"),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn rejects_empty_variant_table() {
        let yaml = "visual:\n  flake_variants: []\n";
        assert!(matches!(
            SimulationConfig::parse(yaml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn rejects_non_positive_mass() {
        let yaml = "visual:\n  flake_variants:\n    - { glyph: '*', mass: 0.0 }\n";
        assert!(matches!(
            SimulationConfig::parse(yaml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn rejects_inverted_ranges() {
        let yaml = "parameters:\n  min_spawn_rate: 0.4\n  max_spawn_rate: 0.2\n";
        assert!(SimulationConfig::parse(yaml).is_err());

        let yaml = "wind:\n  min_duration_ticks: 100\n  max_duration_ticks: 10\n";
        assert!(SimulationConfig::parse(yaml).is_err());
    }

    #[test]
    fn rejects_out_of_range_probability() {
        let yaml = "physics:\n  melt:\n    packed_to_ice: 1.5\n";
        assert!(matches!(
            SimulationConfig::parse(yaml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn rejects_flat_backoff_curve() {
        let yaml = "backoff:\n  steepness: 0.0\n";
        assert!(matches!(
            SimulationConfig::parse(yaml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn rejects_infinite_hues() {
        let yaml = "visual:\n  colors:\n    scheme: hsl_ramp\n    hue_start: -.inf\n    \
                    hue_end: .inf\n    saturation: 60.0\n    lightness_min: 75.0\n    \
                    lightness_max: 95.0\n";
        assert!(matches!(
            SimulationConfig::parse(yaml),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn geometry_from_terminal_size() {
        let geometry = GeometryConfig::default();
        let dims = geometry.dimensions(80, 24);
        assert_eq!(dims.width, 160);
        assert_eq!(dims.height, 21);
        assert_eq!(dims.visible_start, 40);
        assert_eq!(dims.visible_width, 80);
        assert_eq!(dims.floor_start, 20);
        assert_eq!(dims.floor_width, 120);
    }

    #[test]
    fn geometry_never_narrower_than_viewport() {
        let geometry = GeometryConfig {
            width_factor: 1.0,
            visible_start_ratio: 0.5,
            floor_start_ratio: 0.0,
            floor_width_ratio: 3.0,
            reserved_rows: 3,
        };
        let dims = geometry.dimensions(10, 2);
        assert!(dims.visible_end() <= dims.width);
        assert!(dims.floor_end() <= dims.width);
        assert_eq!(dims.height, 0);
    }

    #[test]
    fn shipped_sample_matches_defaults() {
        let sample = include_str!("../../../drift-config.yaml");
        let config = SimulationConfig::parse(sample).unwrap();
        let defaults = SimulationConfig::default();
        assert_eq!(config.world, defaults.world);
        assert_eq!(config.parameters, defaults.parameters);
        assert_eq!(config.physics, defaults.physics);
        assert_eq!(config.wind, defaults.wind);
        assert_eq!(config.backoff, defaults.backoff);
        assert_eq!(config.visual.colors, defaults.visual.colors);
        assert_eq!(config.visual.backgrounds.len(), 1);
        assert_eq!(config.logging, defaults.logging);
    }
}
