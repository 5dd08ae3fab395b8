//! Batch admissibility checks.
//!
//! A batch is either accepted whole or rejected whole:
//! - every pre tile needs its post tile and vice versa
//! - the metadata must cover exactly the batch's tiles, each with a well-formed record
//!
//! Downstream lookups are keyed by filename, so a partially valid batch is never
//! passed on.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::debug;

use crate::domain::{GeoMetadataSet, GeoRecord, GeoTransform, TilePair, IMAGE_EXTENSION, POST_MARKER, PRE_MARKER};
use crate::error::BatchError;
use crate::geo::COEFFICIENT_COUNT;

/// Outcome of pairing pre/post tile names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairMatch {
    pub is_valid: bool,
    /// Sorted base names; empty when the batch is invalid.
    pub base_names: Vec<String>,
    /// Base names lacking a partner (and names carrying no phase marker).
    pub unmatched: Vec<String>,
}

/// Split `name` at its last `.` into `(stem, ".ext")`.
///
/// Names without an extension yield an empty extension.
pub fn split_filename_and_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Mask image name derived from a tile name: `<stem>_mask<ext>`.
pub fn mask_name(image_name: &str) -> String {
    let (stem, ext) = split_filename_and_extension(image_name);
    format!("{stem}_mask{ext}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pre,
    Post,
}

fn classify_name(name: &str) -> Option<(Phase, &str)> {
    if !is_tile_image(name) {
        return None;
    }
    let (stem, _) = split_filename_and_extension(name);
    if let Some(base) = stem.strip_suffix(PRE_MARKER) {
        return Some((Phase::Pre, base));
    }
    stem.strip_suffix(POST_MARKER).map(|base| (Phase::Post, base))
}

/// Pair uploaded tile names by base name.
///
/// Valid iff the set of base names seen with the pre marker equals the set seen
/// with the post marker. Order of `tile_names` does not matter. A name without
/// either marker, or without the exact `.png` extension, can never be paired and
/// makes the batch invalid.
pub fn match_pairs<S: AsRef<str>>(tile_names: &[S]) -> PairMatch {
    let mut pre = BTreeSet::new();
    let mut post = BTreeSet::new();
    let mut unmarked = BTreeSet::new();

    for name in tile_names {
        let name = name.as_ref();
        match classify_name(name) {
            Some((Phase::Pre, base)) => {
                pre.insert(base.to_string());
            }
            Some((Phase::Post, base)) => {
                post.insert(base.to_string());
            }
            None => {
                unmarked.insert(name.to_string());
            }
        }
    }

    let mut unmatched: Vec<String> = pre.symmetric_difference(&post).cloned().collect();
    unmatched.extend(unmarked);
    unmatched.sort();

    let is_valid = unmatched.is_empty();
    debug!(
        tiles = tile_names.len(),
        pre = pre.len(),
        post = post.len(),
        unmatched = unmatched.len(),
        "matched tile pairs"
    );

    PairMatch {
        is_valid,
        base_names: if is_valid { pre.into_iter().collect() } else { Vec::new() },
        unmatched,
    }
}

/// Like [`match_pairs`], but turns an invalid batch into `PairMismatch`.
pub fn require_pairs<S: AsRef<str>>(tile_names: &[S]) -> Result<Vec<String>, BatchError> {
    let matched = match_pairs(tile_names);
    if matched.is_valid {
        Ok(matched.base_names)
    } else {
        Err(BatchError::PairMismatch {
            unmatched: matched.unmatched,
        })
    }
}

/// Sorted tile pairs for validated base names.
pub fn tile_pairs(base_names: &[String]) -> Vec<TilePair> {
    let mut pairs: Vec<TilePair> = base_names.iter().map(|b| TilePair::new(b)).collect();
    pairs.sort_by(|a, b| a.base_name.cmp(&b.base_name));
    pairs
}

/// Filenames the metadata must contain for the given base names.
pub fn expected_metadata_keys<S: AsRef<str>>(base_names: &[S]) -> BTreeSet<String> {
    base_names
        .iter()
        .flat_map(|b| {
            let pair = TilePair::new(b.as_ref());
            [pair.pre_image, pair.post_image]
        })
        .collect()
}

/// Boolean form of [`validate_metadata`].
pub fn check_metadata_shape<S: AsRef<str>>(metadata: &Value, expected_base_names: &[S]) -> bool {
    validate_metadata(metadata, expected_base_names).is_ok()
}

/// Check that `metadata` is exactly `{ "<tile>.png": [[6 numbers], "<srs>"], ... }`
/// for the pre and post tile of every expected base name.
pub fn validate_metadata<S: AsRef<str>>(metadata: &Value, expected_base_names: &[S]) -> Result<(), BatchError> {
    let Some(map) = metadata.as_object() else {
        return Err(BatchError::MetadataShape("top level must be an object".to_string()));
    };

    let expected = expected_metadata_keys(expected_base_names);
    if map.len() != 2 * expected_base_names.len() {
        return Err(BatchError::MetadataShape(format!(
            "expected {} entries, found {}",
            2 * expected_base_names.len(),
            map.len()
        )));
    }

    let actual: BTreeSet<String> = map.keys().cloned().collect();
    if actual != expected {
        let missing: Vec<&str> = expected.difference(&actual).map(String::as_str).collect();
        let extra: Vec<&str> = actual.difference(&expected).map(String::as_str).collect();
        return Err(BatchError::MetadataShape(format!(
            "key mismatch (missing: [{}], unexpected: [{}])",
            missing.join(", "),
            extra.join(", ")
        )));
    }

    for (key, value) in map {
        check_record_shape(key, value)?;
    }
    Ok(())
}

fn check_record_shape(key: &str, value: &Value) -> Result<(), BatchError> {
    let shape_err = |what: &str| BatchError::MetadataShape(format!("`{key}`: {what}"));

    let record = value
        .as_array()
        .filter(|r| r.len() == 2)
        .ok_or_else(|| shape_err("value must be a two-element list"))?;

    let coeffs = record[0]
        .as_array()
        .ok_or_else(|| shape_err("first element must be a coefficient list"))?;
    if coeffs.len() != COEFFICIENT_COUNT {
        return Err(shape_err(&format!(
            "expected {COEFFICIENT_COUNT} coefficients, found {}",
            coeffs.len()
        )));
    }
    if !coeffs.iter().all(Value::is_number) {
        return Err(shape_err("coefficients must all be numbers"));
    }
    if !record[1].is_string() {
        return Err(shape_err("second element must be a spatial-reference string"));
    }
    Ok(())
}

/// Validate and convert decoded metadata into typed records.
pub fn parse_metadata<S: AsRef<str>>(metadata: &Value, expected_base_names: &[S]) -> Result<GeoMetadataSet, BatchError> {
    validate_metadata(metadata, expected_base_names)?;

    let mut out = GeoMetadataSet::new();
    if let Some(map) = metadata.as_object() {
        for (key, value) in map {
            out.insert(key.clone(), parse_record(key, value)?);
        }
    }
    Ok(out)
}

/// Convert a single `[coefficients, projection]` entry.
pub fn parse_record(key: &str, value: &Value) -> Result<GeoRecord, BatchError> {
    check_record_shape(key, value)?;
    let transform = GeoTransform::from_json(&value[0])
        .map_err(|e| BatchError::MalformedTransform(format!("`{key}`: {e}")))?;
    let projection = value[1].as_str().unwrap_or_default().to_string();
    Ok(GeoRecord { transform, projection })
}

/// Keep only names carrying the tile image extension, matched exactly.
///
/// Tile names double as metadata keys, so `a_pre_disaster.PNG` is not a tile.
pub fn is_tile_image(name: &str) -> bool {
    let (_, ext) = split_filename_and_extension(name);
    ext.strip_prefix('.') == Some(IMAGE_EXTENSION)
}
