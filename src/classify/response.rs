//! Inference service wire format and its normalization into typed per-tile stats.
//!
//! Request:
//!
//! ```json
//! { "images": [ { "<base>_pre_disaster.png": "<location>", "<base>_post_disaster.png": "<location>" } ] }
//! ```
//!
//! Response (one entry per requested pair, same order):
//!
//! ```json
//! {
//!   "mask_image_urls": [ { "<base>_pre_disaster.png": "<url>", "<base>_post_disaster.png": "<url>" } ],
//!   "damage_severities": [ { "num_minor_damage": 3, "area_minor_damage": 412.0 } ]
//! }
//! ```
//!
//! Missing `num_*` / `area_*` keys count as zero. Negative or non-finite values are
//! rejected here so the aggregator only ever sees non-negative numbers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{CategoryStats, SeverityCategory, SeverityStats, TileClassification, TilePair};
use crate::error::AppError;
use crate::io::ingest::IngestedBatch;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub images: Vec<BTreeMap<String, String>>,
}

impl InferenceRequest {
    pub fn for_batch(batch: &IngestedBatch) -> Self {
        let images = batch
            .pairs
            .iter()
            .map(|pair| {
                [&pair.pre_image, &pair.post_image]
                    .into_iter()
                    .map(|name| (name.clone(), batch.image_location(name)))
                    .collect()
            })
            .collect();
        Self { images }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InferenceResponse {
    #[serde(default)]
    pub mask_image_urls: Vec<BTreeMap<String, String>>,
    #[serde(default)]
    pub damage_severities: Vec<BTreeMap<String, Value>>,
}

/// Convert a raw response into one classification per pair (same order as `pairs`).
pub fn normalize_response(response: &InferenceResponse, pairs: &[TilePair]) -> Result<Vec<TileClassification>, AppError> {
    if response.damage_severities.len() != pairs.len() {
        return Err(AppError::new(
            4,
            format!(
                "Inference response has {} damage entries for {} tile pairs.",
                response.damage_severities.len(),
                pairs.len()
            ),
        ));
    }

    pairs
        .iter()
        .zip(response.damage_severities.iter())
        .enumerate()
        .map(|(idx, (pair, severities))| {
            let masks = response.mask_image_urls.get(idx);
            let stats = parse_severities(severities)
                .map_err(|e| AppError::new(4, format!("Tile '{}': {e}", pair.base_name)))?;
            Ok(TileClassification {
                localisation_mask_url: masks.and_then(|m| m.get(&pair.pre_image)).cloned(),
                damage_mask_url: masks.and_then(|m| m.get(&pair.post_image)).cloned(),
                stats,
            })
        })
        .collect()
}

fn parse_severities(raw: &BTreeMap<String, Value>) -> Result<SeverityStats, String> {
    let mut stats = SeverityStats::default();
    for category in SeverityCategory::ALL {
        let count = match raw.get(&format!("num_{}", category.key())) {
            None | Some(Value::Null) => 0,
            Some(v) => parse_count(v).ok_or_else(|| {
                format!("`num_{}` must be a non-negative integer, got {v}", category.key())
            })?,
        };
        let area = match raw.get(&format!("area_{}", category.key())) {
            None | Some(Value::Null) => 0.0,
            Some(v) => parse_area(v).ok_or_else(|| {
                format!("`area_{}` must be a finite number >= 0, got {v}", category.key())
            })?,
        };
        stats.set(category, CategoryStats { count, area });
    }
    Ok(stats)
}

fn parse_count(v: &Value) -> Option<u64> {
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    // Some services emit integral floats (e.g. `3.0`).
    let f = v.as_f64()?;
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then_some(f as u64)
}

fn parse_area(v: &Value) -> Option<f64> {
    v.as_f64().filter(|a| a.is_finite() && *a >= 0.0)
}
