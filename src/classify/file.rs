//! Replay a saved inference response from disk.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use tracing::info;

use crate::classify::response::{normalize_response, InferenceResponse};
use crate::classify::Classifier;
use crate::domain::TileClassification;
use crate::error::AppError;
use crate::io::ingest::IngestedBatch;

pub struct FileClassifier {
    path: PathBuf,
}

impl FileClassifier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Classifier for FileClassifier {
    fn name(&self) -> &'static str {
        "file"
    }

    fn classify(&self, batch: &IngestedBatch) -> Result<Vec<TileClassification>, AppError> {
        let file = File::open(&self.path).map_err(|e| {
            AppError::new(2, format!("Failed to open inference response '{}': {e}", self.path.display()))
        })?;
        let body: InferenceResponse = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| AppError::new(2, format!("Invalid inference response JSON: {e}")))?;
        info!(path = %self.path.display(), "loaded saved inference response");

        normalize_response(&body, &batch.pairs)
    }
}
