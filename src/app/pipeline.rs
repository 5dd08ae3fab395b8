//! Shared "assessment pipeline" logic used by the CLI commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! ingest + validate -> classify -> per-tile details -> batch summary
//!
//! Commands can then focus on presentation (printing vs exporting).

use chrono::Utc;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::classify::{self, Classifier};
use crate::damage::{batch_summary, tile_detail};
use crate::domain::{AssessConfig, BatchHeader, GeoMetadataSet, GeoRecord, ReportFile, TileReport, TilePair};
use crate::error::{AppError, BatchError};
use crate::geo::{bounds, reference_points};
use crate::io::ingest::{load_batch, IngestedBatch};

/// All computed outputs of a single `dmg assess` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub batch: IngestedBatch,
    pub report: ReportFile,
}

/// Execute the full pipeline with the classifier selected by `config`.
pub fn run_assessment(config: &AssessConfig) -> Result<RunOutput, AppError> {
    let classifier = classify::from_config(config)?;
    run_assessment_with(config, classifier.as_ref())
}

/// Execute the pipeline with an injected classifier.
pub fn run_assessment_with(config: &AssessConfig, classifier: &dyn Classifier) -> Result<RunOutput, AppError> {
    // 1) Check run settings before touching any input.
    config.cost_table.validate()?;
    if config.image_width == 0 || config.image_height == 0 {
        return Err(AppError::new(2, "Image width and height must be > 0."));
    }

    // 2) Pair tiles and validate metadata (all-or-nothing).
    let batch = load_batch(&config.images_dir, &config.metadata_path)?;
    let upload_time = Utc::now();
    let header = BatchHeader {
        batch_id: format!("batch-{}", upload_time.format("%Y%m%dT%H%M%S%3fZ")),
        upload_time,
    };
    info!(batch_id = %header.batch_id, pairs = batch.pairs.len(), "batch accepted");

    // 3) Classify.
    let classifications = classifier.classify(&batch)?;
    if classifications.len() != batch.pairs.len() {
        return Err(AppError::new(
            4,
            format!(
                "Classifier '{}' returned {} results for {} tile pairs.",
                classifier.name(),
                classifications.len(),
                batch.pairs.len()
            ),
        ));
    }
    info!(classifier = classifier.name(), "classification complete");

    // 4) Geo lookups happen only after the metadata passed validation.
    let records = batch
        .pairs
        .iter()
        .map(|pair| geo_record_for(pair, &batch.metadata))
        .collect::<Result<Vec<_>, _>>()?;

    // 5) Per-tile details (independent, computed in parallel, kept in batch order).
    let tiles: Vec<TileReport> = batch
        .pairs
        .par_iter()
        .zip(classifications.par_iter())
        .zip(records.par_iter())
        .map(|((pair, classification), record)| {
            let detail = tile_detail(pair, classification, record, &config.cost_table);
            let reference = reference_points(config.image_width, config.image_height, &record.transform);
            TileReport {
                detail,
                bounds: bounds(&reference),
                reference,
            }
        })
        .collect();

    // 6) Batch roll-up.
    let details: Vec<_> = tiles.iter().map(|t| t.detail.clone()).collect();
    let summary = batch_summary(&details, &config.cost_table);
    debug!(
        grand_area = summary.grand_area,
        grand_cost = summary.grand_cost,
        clusters = summary.total_clusters,
        "batch summary computed"
    );

    let report = ReportFile {
        tool: "dmg".to_string(),
        header,
        image_width: config.image_width,
        image_height: config.image_height,
        cost_table: config.cost_table,
        tiles,
        summary,
    };

    Ok(RunOutput { batch, report })
}

/// Metadata record of a pair's pre image.
fn geo_record_for<'a>(pair: &TilePair, metadata: &'a GeoMetadataSet) -> Result<&'a GeoRecord, BatchError> {
    let record = metadata
        .get(&pair.pre_image)
        .ok_or_else(|| BatchError::MetadataShape(format!("no entry for `{}`", pair.pre_image)))?;
    if record.transform.is_rotated() {
        debug!(tile = %pair.pre_image, "geotransform has rotation terms");
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    use serde_json::{json, Value};

    use crate::damage::CostTable;
    use crate::domain::{ClassifierKind, SeverityCategory, SeverityStats, TileClassification};

    struct FixedClassifier(Vec<SeverityStats>);

    impl Classifier for FixedClassifier {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn classify(&self, batch: &IngestedBatch) -> Result<Vec<TileClassification>, AppError> {
            Ok(batch
                .pairs
                .iter()
                .zip(self.0.iter())
                .map(|(_, stats)| TileClassification {
                    stats: *stats,
                    ..TileClassification::default()
                })
                .collect())
        }
    }

    fn setup(dir: &Path, bases: &[&str]) -> AssessConfig {
        let images = dir.join("images");
        fs::create_dir_all(&images).unwrap();
        let mut map = serde_json::Map::new();
        for (i, b) in bases.iter().enumerate() {
            for phase in ["pre", "post"] {
                let name = format!("{b}_{phase}_disaster.png");
                fs::write(images.join(&name), b"").unwrap();
                map.insert(name, json!([[10.0 + i as f64, 0.001, 0.0, 20.0, 0.0, -0.001], "EPSG:4326"]));
            }
        }
        let metadata_path = dir.join("meta.json");
        fs::write(&metadata_path, serde_json::to_vec(&Value::Object(map)).unwrap()).unwrap();

        AssessConfig {
            images_dir: images,
            metadata_path,
            classifier: ClassifierKind::Synthetic,
            response_path: None,
            seed: 42,
            image_width: 512,
            image_height: 512,
            cost_table: CostTable::default(),
            show_zero: false,
            export_csv: None,
            export_json: None,
        }
    }

    #[test]
    fn end_to_end_with_injected_classifier() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path(), &["b", "a"]);
        let classifier = FixedClassifier(vec![
            SeverityStats::default()
                .with(SeverityCategory::NoDamage, 1, 100.0)
                .with(SeverityCategory::MinorDamage, 1, 50.0),
            SeverityStats::default(),
        ]);

        let out = run_assessment_with(&config, &classifier).unwrap();
        let report = &out.report;

        assert_eq!(report.tiles.len(), 2);
        assert_eq!(report.tiles[0].detail.pair.base_name, "a");
        assert_eq!(report.tiles[1].detail.breakdown.len(), 4);
        assert!((report.summary.grand_cost - 6.0).abs() < 1e-12);
        assert_eq!(report.summary.total_clusters, 2);

        // "a" was written second, so its pre image carries lon origin 11.0.
        let a = &report.tiles[0];
        assert_eq!(a.detail.geo_params.lon_origin, 11.0);
        assert_eq!(a.reference.center, a.detail.geo_params.pixel_to_geo(256.0, 256.0));
    }

    #[test]
    fn synthetic_run_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path(), &["x", "y", "z"]);
        let first = run_assessment(&config).unwrap();
        let second = run_assessment(&config).unwrap();
        assert_eq!(first.report.summary, second.report.summary);
        let per_tile: f64 = first.report.tiles.iter().map(|t| t.detail.total_cost()).sum();
        assert!((first.report.summary.grand_cost - per_tile).abs() < 1e-6);
    }

    #[test]
    fn invalid_cost_table_stops_before_ingest() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = setup(dir.path(), &["x"]);
        config.cost_table.minor_damage = 0.5;
        let err = run_assessment(&config).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("minor < major"));
    }

    #[test]
    fn short_classifier_output_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = setup(dir.path(), &["x", "y"]);
        let classifier = FixedClassifier(vec![SeverityStats::default()]);
        let err = run_assessment_with(&config, &classifier).unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn file_classifier_requires_response_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = setup(dir.path(), &["x"]);
        config.classifier = ClassifierKind::File;
        let err = run_assessment(&config).unwrap_err();
        assert!(err.message().contains("--response"));
    }
}
