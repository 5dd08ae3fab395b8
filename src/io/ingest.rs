//! Batch ingest from disk.
//!
//! Turns an images directory plus a metadata JSON file into a validated batch:
//! matched tile pairs and a typed geo metadata set.
//!
//! Design goals:
//! - **All-or-nothing**: any pairing or metadata problem rejects the batch (exit code 2)
//! - **Deterministic**: tiles are processed in base-name order regardless of directory order
//! - **Separation of concerns**: no classification or cost logic here

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::domain::{GeoMetadataSet, TilePair};
use crate::error::AppError;
use crate::io::validate::{is_tile_image, parse_metadata, require_pairs, tile_pairs};

/// A validated batch, ready for classification.
#[derive(Debug, Clone)]
pub struct IngestedBatch {
    pub images_dir: PathBuf,
    pub pairs: Vec<TilePair>,
    pub metadata: GeoMetadataSet,
    /// Files in the images directory that were not tile images.
    pub skipped_files: Vec<String>,
}

impl IngestedBatch {
    pub fn base_names(&self) -> Vec<String> {
        self.pairs.iter().map(|p| p.base_name.clone()).collect()
    }

    /// Location of a tile image as handed to the classifier.
    pub fn image_location(&self, image_name: &str) -> String {
        self.images_dir.join(image_name).display().to_string()
    }
}

/// Tile image names in `dir` (sorted) plus the names of ignored files.
pub fn list_tile_names(dir: &Path) -> Result<(Vec<String>, Vec<String>), AppError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| AppError::new(2, format!("Failed to read images directory '{}': {e}", dir.display())))?;

    let mut tiles = Vec::new();
    let mut skipped = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| AppError::new(2, format!("Failed to list '{}': {e}", dir.display())))?;
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_tile_image(&name) {
            tiles.push(name);
        } else {
            debug!(file = %name, "ignoring non-tile file");
            skipped.push(name);
        }
    }
    tiles.sort();
    skipped.sort();
    Ok((tiles, skipped))
}

/// Read and decode a metadata JSON file (shape is checked separately).
pub fn read_metadata(path: &Path) -> Result<Value, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open metadata '{}': {e}", path.display())))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid JSON format in '{}': {e}", path.display())))
}

/// Load and validate a batch: pair tiles, then check metadata against the pairs.
pub fn load_batch(images_dir: &Path, metadata_path: &Path) -> Result<IngestedBatch, AppError> {
    let (tile_names, skipped_files) = list_tile_names(images_dir)?;
    if tile_names.is_empty() {
        return Err(AppError::new(
            3,
            format!("No .png tile images found in '{}'.", images_dir.display()),
        ));
    }

    let base_names = require_pairs(&tile_names)?;
    info!(tiles = tile_names.len(), pairs = base_names.len(), "tile pairs matched");

    let raw = read_metadata(metadata_path)?;
    let metadata = parse_metadata(&raw, &base_names)?;
    info!(entries = metadata.len(), "geo metadata validated");

    Ok(IngestedBatch {
        images_dir: images_dir.to_path_buf(),
        pairs: tile_pairs(&base_names),
        metadata,
        skipped_files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    fn write_metadata(path: &Path, bases: &[&str]) {
        let mut map = serde_json::Map::new();
        for b in bases {
            for phase in ["pre", "post"] {
                map.insert(
                    format!("{b}_{phase}_disaster.png"),
                    json!([[-93.5, 0.00001, 0.0, 30.25, 0.0, -0.00001], "EPSG:4326"]),
                );
            }
        }
        fs::write(path, serde_json::to_vec(&Value::Object(map)).unwrap()).unwrap();
    }

    #[test]
    fn loads_valid_batch() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b_pre_disaster.png", "b_post_disaster.png", "a_pre_disaster.png", "a_post_disaster.png"] {
            touch(dir.path(), name);
        }
        touch(dir.path(), "README.txt");
        let meta = dir.path().join("meta.json");
        write_metadata(&meta, &["a", "b"]);

        let batch = load_batch(dir.path(), &meta).unwrap();
        assert_eq!(batch.base_names(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(batch.metadata.len(), 4);
        // The metadata file sits next to the tiles here, so it is skipped too.
        assert_eq!(batch.skipped_files, vec!["README.txt".to_string(), "meta.json".to_string()]);
        assert!(batch.image_location("a_pre_disaster.png").ends_with("a_pre_disaster.png"));
    }

    #[test]
    fn unmatched_tile_rejects_batch() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a_pre_disaster.png");
        let meta = dir.path().join("meta.json");
        write_metadata(&meta, &["a"]);

        let err = load_batch(dir.path(), &meta).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("mismatched"));
    }

    #[test]
    fn metadata_mismatch_rejects_batch() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a_pre_disaster.png");
        touch(dir.path(), "a_post_disaster.png");
        let meta = dir.path().join("meta.json");
        write_metadata(&meta, &["a", "extra"]);

        let err = load_batch(dir.path(), &meta).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn invalid_json_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let meta = dir.path().join("meta.json");
        fs::write(&meta, b"{not json").unwrap();
        let err = read_metadata(&meta).unwrap_err();
        assert!(err.message().contains("Invalid JSON format"));
    }

    #[test]
    fn uppercase_extension_is_skipped_not_paired() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        fs::create_dir(&images).unwrap();
        for name in ["a_pre_disaster.png", "a_post_disaster.png", "b_pre_disaster.PNG", "b_post_disaster.PNG"] {
            touch(&images, name);
        }
        let meta = dir.path().join("meta.json");
        write_metadata(&meta, &["a"]);

        let batch = load_batch(&images, &meta).unwrap();
        assert_eq!(batch.base_names(), vec!["a".to_string()]);
        assert_eq!(
            batch.skipped_files,
            vec!["b_post_disaster.PNG".to_string(), "b_pre_disaster.PNG".to_string()]
        );
        let location = batch.image_location(&batch.pairs[0].pre_image);
        assert!(Path::new(&location).exists());
    }

    #[test]
    fn only_uppercase_tiles_leave_nothing_to_process() {
        let dir = tempfile::tempdir().unwrap();
        let images = dir.path().join("images");
        fs::create_dir(&images).unwrap();
        touch(&images, "a_pre_disaster.PNG");
        touch(&images, "a_post_disaster.PNG");
        let meta = dir.path().join("meta.json");
        fs::write(
            &meta,
            serde_json::to_vec(&json!({
                "a_pre_disaster.PNG": [[0.0, 1.0, 0.0, 0.0, 0.0, -1.0], "EPSG:4326"],
                "a_post_disaster.PNG": [[0.0, 1.0, 0.0, 0.0, 0.0, -1.0], "EPSG:4326"],
            }))
            .unwrap(),
        )
        .unwrap();

        let err = load_batch(&images, &meta).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn empty_directory_has_nothing_to_process() {
        let dir = tempfile::tempdir().unwrap();
        let meta = dir.path().join("meta.json");
        write_metadata(&meta, &[]);
        let err = load_batch(dir.path(), &meta).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
