//! Candytui: match-three candy cascade puzzle in the terminal.

mod app;
mod board;
mod game;
mod input;
mod runs;
mod special;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use board::Board;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options derived from CLI that affect play and playback.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub initial_level: u32,
    /// Reproducible games when set; otherwise seeded from the OS.
    pub seed: Option<u64>,
    /// Fixed starting board for the first level.
    pub layout: Option<Board>,
    /// False with --no-animation: snapshots are skipped, only the settled board is drawn.
    pub animate: bool,
    pub swap_delay: Duration,
    pub reveal_delay: Duration,
    pub settle_delay: Duration,
    pub revert_delay: Duration,
}

const SWAP_DELAY_MS: u64 = 120;
const REVERT_DELAY_MS: u64 = 160;

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(path) = &args.log_file {
        init_logging(path)?;
    }
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        tracing::warn!("theme not loaded: {e}");
        theme::Theme::for_palette(args.palette)
    });
    let layout = args.layout.as_deref().map(load_layout).transpose()?;
    let config = GameConfig {
        initial_level: args.level.max(1),
        seed: args.seed,
        layout,
        animate: !args.no_animation,
        swap_delay: Duration::from_millis(SWAP_DELAY_MS),
        reveal_delay: Duration::from_millis(args.reveal_ms),
        settle_delay: Duration::from_millis(args.settle_ms),
        revert_delay: Duration::from_millis(REVERT_DELAY_MS),
    };
    tracing::info!(?config.seed, level = config.initial_level, "starting");
    let mut app = App::new(config, theme);
    app.run()?;
    Ok(())
}

/// The terminal owns stdout/stderr, so logs only go to a file.
fn init_logging(path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating log file {}", path.display()))?;
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn load_layout(path: &Path) -> Result<Board> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading layout {}", path.display()))?;
    let board = text
        .parse::<Board>()
        .with_context(|| format!("parsing layout {}", path.display()))?;
    tracing::debug!("layout loaded from {}:\n{board}", path.display());
    Ok(board)
}

/// Match-three candy puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "candytui",
    version,
    about = "Match-three candy cascade puzzle in the terminal. Swap neighbours to line up three or more.",
    long_about = "Candytui is a terminal match-three puzzle.\n\n\
        Swap two neighbouring candies to line up three or more of a kind. Matches clear, \
        candies above fall, and new ones drop in; chains keep going on their own. Four in a \
        line makes a striped candy, an L or T makes a wrapped candy, five makes a colour bomb. \
        Swap a special to set it off. Reach the goal score before your moves run out.\n\n\
        CONTROLS:\n  Arrows / hjkl  Move cursor   Enter/Space  Select / swap\n  \
        R              Restart level Q / Esc      Quit\n\n\
        Select a candy, then a neighbour to swap. Select the same candy again to cancel.\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Level to start on.
    #[arg(short, long, default_value = "1", value_name = "N")]
    pub level: u32,

    /// Seed for candy generation; same seed, same boards.
    #[arg(short, long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Starting board: 8 lines of 8 candy letters (R O Y G B P). Lines starting with # are ignored.
    #[arg(long, value_name = "FILE")]
    pub layout: Option<PathBuf>,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Disable match animation (settled board only).
    #[arg(long)]
    pub no_animation: bool,

    /// How long matched candies stay highlighted before they clear.
    #[arg(long, default_value = "300", value_name = "MS")]
    pub reveal_ms: u64,

    /// Pause after candies fall and refill.
    #[arg(long, default_value = "160", value_name = "MS")]
    pub settle_ms: u64,

    /// Write logs here (filter with RUST_LOG, default info).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["candytui"]).unwrap();
        assert_eq!(args.level, 1);
        assert_eq!(args.seed, None);
        assert_eq!(args.palette, Palette::Normal);
        assert_eq!(args.reveal_ms, 300);
        assert_eq!(args.settle_ms, 160);
        assert!(!args.no_animation);
    }

    #[test]
    fn test_args_palette_alias() {
        let args =
            Args::try_parse_from(["candytui", "--palette", "colourblind", "-s", "42"]).unwrap();
        assert_eq!(args.palette, Palette::Colorblind);
        assert_eq!(args.seed, Some(42));
    }
}
