//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - validates and assesses batches
//! - prints reports
//! - writes optional exports

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{AssessArgs, Cli, Command, CoordsArgs, ShowArgs, ValidateArgs};
use crate::damage::CostTable;
use crate::domain::{AssessConfig, GeoRecord, IMAGE_EXTENSION, PRE_MARKER};
use crate::error::{AppError, BatchError};
use crate::geo::{bounds, full_grid, reference_points};
use crate::io::ingest::{list_tile_names, read_metadata};
use crate::io::validate::{check_metadata_shape, match_pairs, parse_record};

pub mod pipeline;

/// Entry point for the `dmg` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Command::Assess(args) => handle_assess(args),
        Command::Validate(args) => handle_validate(args),
        Command::Coords(args) => handle_coords(args),
        Command::Show(args) => handle_show(args),
    }
}

/// Structured logs go to stderr so stdout stays clean for reports.
fn init_logging(filter: &str) -> Result<(), AppError> {
    let filter =
        EnvFilter::try_new(filter).map_err(|e| AppError::new(2, format!("Invalid --log-level '{filter}': {e}")))?;
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init()
        .map_err(|e| AppError::new(2, format!("Failed to initialise logging: {e}")))
}

fn handle_assess(args: AssessArgs) -> Result<(), AppError> {
    let config = assess_config_from_args(&args);
    let run = pipeline::run_assessment(&config)?;

    if !run.batch.skipped_files.is_empty() {
        warn!(count = run.batch.skipped_files.len(), "ignored non-tile files in images directory");
    }

    println!("{}", crate::report::format_report(&run.report, config.show_zero));

    // Optional exports.
    if let Some(path) = &config.export_csv {
        let details: Vec<_> = run.report.tiles.iter().map(|t| t.detail.clone()).collect();
        crate::io::export::write_details_csv(path, &run.report.header, &details)?;
        info!(path = %path.display(), "wrote detail CSV");
    }
    if let Some(path) = &config.export_json {
        crate::io::report_file::write_report_json(path, &run.report)?;
        info!(path = %path.display(), "wrote report JSON");
    }

    Ok(())
}

/// Pairing and metadata checks only; both outcomes are printed before failing.
fn handle_validate(args: ValidateArgs) -> Result<(), AppError> {
    let (names, _skipped) = list_tile_names(&args.batch.images)?;
    if names.is_empty() {
        return Err(AppError::new(
            3,
            format!("No tile images found in '{}'.", args.batch.images.display()),
        ));
    }
    let metadata = read_metadata(&args.batch.metadata)?;

    let pairs = match_pairs(&names);
    let metadata_ok = pairs.is_valid && check_metadata_shape(&metadata, &pairs.base_names);
    println!("{}", crate::report::format_pair_match(&pairs, metadata_ok));

    if !pairs.is_valid {
        return Err(BatchError::PairMismatch {
            unmatched: pairs.unmatched,
        }
        .into());
    }
    // Re-run the typed parse for a specific message.
    crate::io::validate::parse_metadata(&metadata, &pairs.base_names)?;
    Ok(())
}

fn handle_coords(args: CoordsArgs) -> Result<(), AppError> {
    if args.size.width == 0 || args.size.height == 0 {
        return Err(AppError::new(2, "Image width and height must be > 0."));
    }
    let metadata = read_metadata(&args.metadata)?;
    let (key, record) = lookup_tile(&metadata, &args.tile)?;

    let reference = reference_points(args.size.width, args.size.height, &record.transform);
    println!("Tile: {key}");
    println!("Projection: {}", record.projection);
    print!("{}", crate::report::format_reference_points(&reference));
    print!("{}", crate::report::format_bounds(&bounds(&reference)));

    if let Some((lat, lon)) = args.at {
        match record.transform.geo_to_pixel(lat, lon) {
            Some((x, y)) => {
                let inside = (0.0..args.size.width as f64).contains(&x) && (0.0..args.size.height as f64).contains(&y);
                println!(
                    "Point ({lat}, {lon}) -> pixel ({x:.2}, {y:.2}){}",
                    if inside { "" } else { " [outside tile]" }
                );
            }
            None => warn!(tile = %key, "geotransform is not invertible"),
        }
    }

    if let Some(path) = &args.grid {
        let grid = full_grid(args.size.width, args.size.height, &record.transform);
        crate::io::export::write_grid_csv(path, &grid)?;
        info!(path = %path.display(), points = grid.width * grid.height, "wrote geo grid CSV");
    }

    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let report = crate::io::report_file::read_report_json(&args.report)?;
    println!("{}", crate::report::format_report(&report, args.show_zero));
    Ok(())
}

/// Find a tile's metadata entry by filename, falling back to the pre image of a base name.
fn lookup_tile(metadata: &serde_json::Value, tile: &str) -> Result<(String, GeoRecord), AppError> {
    let Some(map) = metadata.as_object() else {
        return Err(BatchError::MetadataShape("top level must be an object".to_string()).into());
    };

    let pre_name = format!("{tile}{PRE_MARKER}.{IMAGE_EXTENSION}");
    let (key, value) = map
        .get_key_value(tile)
        .or_else(|| map.get_key_value(pre_name.as_str()))
        .ok_or_else(|| AppError::new(2, format!("No metadata entry for tile '{tile}'.")))?;

    Ok((key.clone(), parse_record(key, value)?))
}

pub fn assess_config_from_args(args: &AssessArgs) -> AssessConfig {
    AssessConfig {
        images_dir: args.batch.images.clone(),
        metadata_path: args.batch.metadata.clone(),
        classifier: args.classifier,
        response_path: args.response.clone(),
        seed: args.seed,
        image_width: args.size.width,
        image_height: args.size.height,
        cost_table: CostTable {
            no_damage: args.cost_no_damage,
            minor_damage: args.cost_minor,
            major_damage: args.cost_major,
            destroyed: args.cost_destroyed,
        },
        show_zero: args.show_zero,
        export_csv: args.export_csv.clone(),
        export_json: args.export_json.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_by_filename_or_base_name() {
        let metadata = json!({
            "a_pre_disaster.png": [[1.0, 0.1, 0.0, 2.0, 0.0, -0.1], "EPSG:4326"],
            "a_post_disaster.png": [[5.0, 0.1, 0.0, 6.0, 0.0, -0.1], "EPSG:4326"],
        });

        let (key, record) = lookup_tile(&metadata, "a").unwrap();
        assert_eq!(key, "a_pre_disaster.png");
        assert_eq!(record.transform.lon_origin, 1.0);

        let (key, record) = lookup_tile(&metadata, "a_post_disaster.png").unwrap();
        assert_eq!(key, "a_post_disaster.png");
        assert_eq!(record.transform.lon_origin, 5.0);

        assert_eq!(lookup_tile(&metadata, "b").unwrap_err().exit_code(), 2);
    }

    #[test]
    fn lookup_rejects_malformed_entry() {
        let metadata = json!({ "a_pre_disaster.png": [[1.0, 0.1], "EPSG:4326"] });
        assert_eq!(lookup_tile(&metadata, "a").unwrap_err().exit_code(), 2);
    }

    #[test]
    fn config_mirrors_flags() {
        let cli = Cli::parse_from([
            "dmg",
            "assess",
            "--images",
            "tiles",
            "--metadata",
            "meta.json",
            "--classifier",
            "synthetic",
            "--cost-major",
            "0.5",
            "--width",
            "256",
        ]);
        let Command::Assess(args) = cli.command else {
            panic!("expected assess");
        };
        let config = assess_config_from_args(&args);
        assert_eq!(config.cost_table.major_damage, 0.5);
        assert_eq!(config.image_width, 256);
        assert_eq!(config.image_height, 512);
        assert!(config.cost_table.validate().is_ok());
    }
}
