//! Command-line parsing for the damage assessment engine.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the geo/cost code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::damage::{DEFAULT_COST_DESTROYED, DEFAULT_COST_MAJOR_DAMAGE, DEFAULT_COST_MINOR_DAMAGE, DEFAULT_COST_NO_DAMAGE};
use crate::domain::{ClassifierKind, DEFAULT_IMAGE_SIZE};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "dmg", version, about = "Post-disaster damage assessment: tile pairing, geo-referencing and cost roll-ups")]
pub struct Cli {
    /// Log filter (e.g. `info`, `debug`, `dmg_assess=trace`).
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate, classify and cost a batch of pre/post tile pairs.
    Assess(AssessArgs),
    /// Only check pairing and metadata of a batch.
    Validate(ValidateArgs),
    /// Print geographic coordinates for one tile.
    Coords(CoordsArgs),
    /// Print a previously exported report JSON.
    Show(ShowArgs),
}

/// Inputs shared by `assess` and `validate`.
#[derive(Debug, Args, Clone)]
pub struct BatchArgs {
    /// Directory holding `<base>_pre_disaster.png` / `<base>_post_disaster.png` tiles.
    #[arg(long, value_name = "DIR")]
    pub images: PathBuf,

    /// Geo metadata JSON (`{"<tile>.png": [[6 coefficients], "<projection>"]}`).
    #[arg(long, value_name = "JSON")]
    pub metadata: PathBuf,
}

/// Tile pixel dimensions.
#[derive(Debug, Args, Clone)]
pub struct SizeArgs {
    /// Tile width in pixels.
    #[arg(long, default_value_t = DEFAULT_IMAGE_SIZE.0)]
    pub width: usize,

    /// Tile height in pixels.
    #[arg(long, default_value_t = DEFAULT_IMAGE_SIZE.1)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct AssessArgs {
    #[command(flatten)]
    pub batch: BatchArgs,

    #[command(flatten)]
    pub size: SizeArgs,

    /// Classification source.
    #[arg(long, value_enum, default_value_t = ClassifierKind::Http)]
    pub classifier: ClassifierKind,

    /// Saved inference response JSON (for `--classifier file`).
    #[arg(long, value_name = "JSON")]
    pub response: Option<PathBuf>,

    /// Seed for `--classifier synthetic`.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Unit cost (per pixel) of undamaged area.
    #[arg(long, default_value_t = DEFAULT_COST_NO_DAMAGE)]
    pub cost_no_damage: f64,

    /// Unit cost (per pixel) of minor damage.
    #[arg(long, default_value_t = DEFAULT_COST_MINOR_DAMAGE)]
    pub cost_minor: f64,

    /// Unit cost (per pixel) of major damage.
    #[arg(long, default_value_t = DEFAULT_COST_MAJOR_DAMAGE)]
    pub cost_major: f64,

    /// Unit cost (per pixel) of destroyed area.
    #[arg(long, default_value_t = DEFAULT_COST_DESTROYED)]
    pub cost_destroyed: f64,

    /// Export per-tile detail rows to CSV.
    #[arg(long = "export-csv", value_name = "CSV")]
    pub export_csv: Option<PathBuf>,

    /// Export the full report to JSON (readable by `dmg show`).
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,

    /// Also print categories with no clusters and no area.
    #[arg(long)]
    pub show_zero: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub batch: BatchArgs,
}

#[derive(Debug, Args, Clone)]
pub struct CoordsArgs {
    /// Geo metadata JSON.
    #[arg(long, value_name = "JSON")]
    pub metadata: PathBuf,

    /// Tile filename (or base name; its pre image is used).
    #[arg(long)]
    pub tile: String,

    #[command(flatten)]
    pub size: SizeArgs,

    /// Also locate a geographic point on the tile, as `LAT,LON`.
    #[arg(long, value_name = "LAT,LON", value_parser = parse_lat_lon, allow_hyphen_values = true)]
    pub at: Option<(f64, f64)>,

    /// Write the full per-pixel grid to CSV.
    #[arg(long, value_name = "CSV")]
    pub grid: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    /// Report JSON produced by `dmg assess --export-json`.
    #[arg(long, value_name = "JSON")]
    pub report: PathBuf,

    /// Also print categories with no clusters and no area.
    #[arg(long)]
    pub show_zero: bool,
}

/// Parse `LAT,LON`.
fn parse_lat_lon(raw: &str) -> Result<(f64, f64), String> {
    let (lat, lon) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LON, got '{raw}'"))?;
    let lat: f64 = lat.trim().parse().map_err(|_| format!("invalid latitude '{lat}'"))?;
    let lon: f64 = lon.trim().parse().map_err(|_| format!("invalid longitude '{lon}'"))?;
    if !(lat.is_finite() && lon.is_finite()) {
        return Err(format!("coordinates must be finite, got '{raw}'"));
    }
    Ok((lat, lon))
}
