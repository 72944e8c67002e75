//! Blockfall — coloured block groups drifting down a grid in the terminal.

mod app;
mod input;
mod registry;
mod sim;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use rand::Rng;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Grid size and tuning constants for the simulation.
///
/// Preconditions (checked by [`SimConfig::validate`], not by the simulation itself):
/// non-empty grid, `1 <= group_size <= rows`, finite positive `fall_speed`,
/// `spawn_threshold` in `[0, 1)` and at least one colour.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub rows: u16,
    pub cols: u16,
    /// Blocks per spawned group.
    pub group_size: u16,
    /// Rows added to every block each frame.
    pub fall_speed: f64,
    /// A spawn is attempted only when a uniform sample exceeds this.
    pub spawn_threshold: f64,
    /// A column stays blocked while any of its blocks is above this row. Defaults to `group_size`.
    pub block_threshold: Option<f64>,
    /// Row of the leading block of a fresh group.
    pub spawn_offset: f64,
    /// Palette size; block colours are indices below this.
    pub colors: u8,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rows: 15,
            cols: 20,
            group_size: 5,
            fall_speed: 0.05,
            spawn_threshold: 0.99,
            block_threshold: None,
            spawn_offset: 4.0,
            colors: 3,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("grid must have at least one row and one column (got {rows}x{cols})")]
    EmptyGrid { rows: u16, cols: u16 },
    #[error("group size must be between 1 and the row count {rows} (got {group_size})")]
    GroupSize { group_size: u16, rows: u16 },
    #[error("fall speed must be a positive finite number (got {0})")]
    FallSpeed(f64),
    #[error("spawn threshold must be in [0, 1) (got {0})")]
    SpawnThreshold(f64),
    #[error("{name} must be finite (got {value})")]
    NotFinite { name: &'static str, value: f64 },
    #[error("block threshold must be a finite, non-negative row (got {0})")]
    BlockThreshold(f64),
    #[error("palette needs at least one colour")]
    EmptyPalette,
    #[error("frame rate must be positive and give a representable frame interval (got {0})")]
    FrameRate(f64),
}

impl SimConfig {
    #[inline]
    pub fn block_threshold(&self) -> f64 {
        self.block_threshold
            .unwrap_or_else(|| f64::from(self.group_size))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(ConfigError::EmptyGrid {
                rows: self.rows,
                cols: self.cols,
            });
        }
        if self.group_size == 0 || self.group_size > self.rows {
            return Err(ConfigError::GroupSize {
                group_size: self.group_size,
                rows: self.rows,
            });
        }
        if !self.fall_speed.is_finite() || self.fall_speed <= 0.0 {
            return Err(ConfigError::FallSpeed(self.fall_speed));
        }
        if !(0.0..1.0).contains(&self.spawn_threshold) {
            return Err(ConfigError::SpawnThreshold(self.spawn_threshold));
        }
        if !self.spawn_offset.is_finite() {
            return Err(ConfigError::NotFinite {
                name: "spawn offset",
                value: self.spawn_offset,
            });
        }
        if let Some(t) = self.block_threshold.filter(|t| !t.is_finite() || *t < 0.0) {
            return Err(ConfigError::BlockThreshold(t));
        }
        if self.colors == 0 {
            return Err(ConfigError::EmptyPalette);
        }
        Ok(())
    }
}

/// Options for the terminal host (layout and effects), separate from the simulation.
#[derive(Debug, Clone)]
pub struct ViewConfig {
    /// Terminal columns per grid cell.
    pub cell_width: u16,
    pub frame_rate: f64,
    pub fade: bool,
    pub no_animation: bool,
}

impl ViewConfig {
    /// Time between frames. Fails for rates that are not positive or whose interval
    /// does not fit in a `Duration`.
    pub fn frame_interval(&self) -> Result<Duration, ConfigError> {
        let rate = self.frame_rate;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ConfigError::FrameRate(rate));
        }
        Duration::try_from_secs_f64(1.0 / rate).map_err(|_| ConfigError::FrameRate(rate))
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let theme = theme::Theme::load(args.palette, &args.color)?;
    let config = SimConfig {
        rows: args.rows,
        cols: args.cols,
        group_size: args.group_size,
        fall_speed: args.fall_speed,
        spawn_threshold: args.spawn_threshold,
        block_threshold: args.block_threshold,
        spawn_offset: args.spawn_offset,
        colors: theme.palette_len(),
    };
    config.validate()?;
    let view = ViewConfig {
        cell_width: args.cell_width.max(1),
        frame_rate: args.frame_rate,
        fade: !args.no_fade,
        no_animation: args.no_animation,
    };
    let frame_interval = view.frame_interval()?;

    init_logging(args.log_file.as_deref(), args.headless.is_some())?;
    let seed = args.seed.unwrap_or_else(|| rand::rng().random());
    log::info!("seed {}", seed);

    if let Some(frames) = args.headless {
        let report = app::run_headless(config, seed, frames)?;
        println!("seed:            {}", seed);
        println!("frames:          {}", report.stats.frames);
        println!("groups spawned:  {}", report.stats.groups_spawned);
        println!("spawns dropped:  {}", report.stats.spawns_dropped);
        println!("blocks culled:   {}", report.stats.blocks_culled);
        println!("live blocks:     {}", report.live);
        println!("peak live:       {}", report.peak_live);
        return Ok(());
    }

    let mut app = App::new(config, view, theme, seed, frame_interval);
    app.run()?;
    Ok(())
}

/// The TUI owns stderr's terminal, so logs only go to `--log-file` there.
/// Headless runs fall back to stderr.
fn init_logging(path: Option<&Path>, headless: bool) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    match path {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("creating log file {}", path.display()))?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        None if headless => {
            builder.target(env_logger::Target::Stderr);
        }
        None => return Ok(()),
    }
    builder.try_init().context("initialising logger")?;
    Ok(())
}

/// Falling coloured blocks in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "blockfall",
    version,
    about = "Coloured block groups drift down a grid and fade out at the bottom.",
    long_about = "Blockfall is a terminal screensaver.\n\n\
        Groups of blocks spawn in random columns, fall at a constant speed, fade out near \
        the bottom and disappear once off the grid. A new group never spawns into a column \
        whose previous group is still near the top.\n\n\
        Press q, Esc or Ctrl-C to quit."
)]
pub struct Args {
    /// Grid height in cells.
    #[arg(long, default_value = "15", value_name = "ROWS")]
    pub rows: u16,

    /// Grid width in cells.
    #[arg(long, default_value = "20", value_name = "COLS")]
    pub cols: u16,

    /// Terminal columns per grid cell (2 looks roughly square).
    #[arg(long, default_value = "2", value_name = "N")]
    pub cell_width: u16,

    /// Blocks per falling group.
    #[arg(long, default_value = "5", value_name = "N")]
    pub group_size: u16,

    /// Rows each block falls per frame.
    #[arg(long, default_value = "0.05", value_name = "ROWS")]
    pub fall_speed: f64,

    /// Spawn is attempted when a uniform [0, 1) sample exceeds this; 0.99 is about once per 100 frames.
    #[arg(long, default_value = "0.99", value_name = "P")]
    pub spawn_threshold: f64,

    /// Column stays blocked while any of its blocks is above this row. Defaults to the group size.
    #[arg(long, value_name = "ROW", allow_negative_numbers = true)]
    pub block_threshold: Option<f64>,

    /// Starting row of the leading block in a new group.
    #[arg(long, default_value = "4", value_name = "ROW", allow_negative_numbers = true)]
    pub spawn_offset: f64,

    /// RNG seed; random when not set.
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Target frames per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Colour palette for the blocks.
    #[arg(long, default_value = "classic")]
    pub palette: Palette,

    /// Block colour as hex (#RRGGBB or #RGB). Repeat to build a custom palette.
    #[arg(long, value_name = "HEX")]
    pub color: Vec<String>,

    /// Do not fade blocks out near the bottom.
    #[arg(long)]
    pub no_fade: bool,

    /// Disable the intro fade-in effect.
    #[arg(long)]
    pub no_animation: bool,

    /// Run this many frames without a terminal and print statistics.
    #[arg(long, value_name = "FRAMES")]
    pub headless: Option<u64>,

    /// Write logs here (filter with RUST_LOG).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    /// Red, green, blue.
    #[default]
    Classic,

    #[value(alias = "one-dark")]
    Onedark,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(SimConfig::default().validate(), Ok(()));
        assert_eq!(SimConfig::default().block_threshold(), 5.0);
    }

    #[test]
    fn test_group_taller_than_grid_rejected() {
        let config = SimConfig {
            rows: 4,
            ..SimConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::GroupSize { group_size: 5, rows: 4 })
        );
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        for t in [1.0, 1.5, -0.1, f64::NAN] {
            let config = SimConfig {
                spawn_threshold: t,
                ..SimConfig::default()
            };
            assert!(matches!(config.validate(), Err(ConfigError::SpawnThreshold(_))));
        }
    }

    #[test]
    fn test_bad_fall_speed_and_empty_grid() {
        let config = SimConfig {
            fall_speed: 0.0,
            ..SimConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::FallSpeed(_))));
        let config = SimConfig {
            cols: 0,
            ..SimConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyGrid { .. })));
    }

    #[test]
    fn test_block_threshold_must_be_non_negative() {
        for t in [-1.0, f64::INFINITY, f64::NAN] {
            let config = SimConfig {
                block_threshold: Some(t),
                ..SimConfig::default()
            };
            assert!(matches!(config.validate(), Err(ConfigError::BlockThreshold(_))));
        }
        let config = SimConfig {
            block_threshold: Some(0.0),
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_negative_numbers_reach_validation() {
        let args = Args::parse_from(["blockfall", "--block-threshold", "-1", "--spawn-offset", "-2"]);
        assert_eq!(args.block_threshold, Some(-1.0));
        assert_eq!(args.spawn_offset, -2.0);
    }

    fn view_at(frame_rate: f64) -> ViewConfig {
        ViewConfig {
            cell_width: 2,
            frame_rate,
            fade: true,
            no_animation: false,
        }
    }

    #[test]
    fn test_frame_interval() {
        assert_eq!(view_at(50.0).frame_interval(), Ok(Duration::from_millis(20)));
    }

    #[test]
    fn test_bad_frame_rate_rejected() {
        for rate in [0.0, -60.0, f64::NAN, f64::INFINITY, 1e-20] {
            assert!(matches!(view_at(rate).frame_interval(), Err(ConfigError::FrameRate(_))));
        }
    }

    #[test]
    fn test_args_defaults_match_config_defaults() {
        let args = Args::parse_from(["blockfall"]);
        let d = SimConfig::default();
        assert_eq!(args.rows, d.rows);
        assert_eq!(args.cols, d.cols);
        assert_eq!(args.group_size, d.group_size);
        assert_eq!(args.fall_speed, d.fall_speed);
        assert_eq!(args.spawn_threshold, d.spawn_threshold);
        assert_eq!(args.spawn_offset, d.spawn_offset);
        assert_eq!(args.palette, Palette::Classic);
    }

    #[test]
    fn test_args_repeated_colour() {
        let args = Args::parse_from(["blockfall", "--color", "#fff", "--color", "#000000"]);
        assert_eq!(args.color, vec!["#fff".to_string(), "#000000".to_string()]);
    }
}
