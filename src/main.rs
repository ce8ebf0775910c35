//! Stacktui — falling-block puzzle game in the terminal.

mod app;
mod game;
mod input;
mod piece;
mod stack;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use stack::{COLUMNS, ROWS};
use std::path::{Path, PathBuf};

/// Engine options derived from the CLI: board size, gravity interval, RNG seed.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub width: u16,
    pub height: u16,
    pub tick_ms: u64,
    pub seed: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = args.log_file.as_deref() {
        init_logging(path)?;
    }
    let theme = match theme::Theme::load(args.theme.as_deref(), args.palette) {
        Ok(theme) => theme,
        Err(e) => {
            log::warn!("theme load failed, using default: {e}");
            theme::Theme::default()
        }
    };
    let config = GameConfig {
        width: args.width,
        height: args.height,
        tick_ms: args.tick_ms,
        seed: args.seed,
    };
    let mut app = App::new(args, config, theme);
    app.run()?;
    Ok(())
}

/// Route `log` output to a file; the terminal is busy with the game.
fn init_logging(path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Falling-block puzzle game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "stacktui",
    version,
    about = "Falling-block puzzle in the terminal. Stack pieces, clear full rows, don't reach the top.",
    long_about = "Stacktui is a terminal falling-block puzzle.\n\n\
        A piece falls one row per tick. Move and rotate it; when it can fall no further it \
        locks into the stack. Full rows are cleared and everything above drops down. The game \
        ends when the stack reaches the top row.\n\n\
        CONTROLS:\n  Left/h  Move left    Right/l  Move right   Up/k/i  Rotate\n  \
        Down/j  Soft drop    P        Pause        R       Restart   Q / Esc  Quit"
)]
pub struct Args {
    /// Playfield width in columns.
    #[arg(long, default_value_t = COLUMNS as u16, value_name = "COLS", value_parser = clap::value_parser!(u16).range(4..=40))]
    pub width: u16,

    /// Playfield height in rows.
    #[arg(long, default_value_t = ROWS as u16, value_name = "ROWS", value_parser = clap::value_parser!(u16).range(4..=40))]
    pub height: u16,

    /// Gravity interval in ms: the piece falls one row per tick.
    #[arg(long, default_value = "1000", value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub tick_ms: u64,

    /// Target render frames per second.
    #[arg(long, default_value_t = 30.0, value_name = "RATE", value_parser = parse_frame_rate)]
    pub frame_rate: f64,

    /// Seed for the piece generator (same seed, same pieces).
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Hide the ghost piece.
    #[arg(long)]
    pub no_ghost: bool,

    /// Disable the line-clear flash.
    #[arg(long)]
    pub no_animation: bool,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Write logs to this file (filter with RUST_LOG, default info).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

fn parse_frame_rate(s: &str) -> Result<f64, String> {
    let rate: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(format!("{s} is not a positive frame rate"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
