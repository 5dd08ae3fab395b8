//! Damage classification collaborators.
//!
//! The classifier itself is an external service; this module only defines the
//! seam ([`Classifier`]) and the implementations the CLI can inject:
//!
//! - `http`: the inference service
//! - `file`: a saved inference response
//! - `synthetic`: deterministic fake for offline runs

pub mod file;
pub mod http;
pub mod response;
pub mod synthetic;

pub use file::FileClassifier;
pub use http::{HttpClassifier, InferenceConfig};
pub use response::{normalize_response, InferenceRequest, InferenceResponse};
pub use synthetic::SyntheticClassifier;

use crate::domain::{AssessConfig, ClassifierKind, TileClassification};
use crate::error::AppError;
use crate::io::ingest::IngestedBatch;

/// Produces per-category damage stats for every pair of a validated batch.
pub trait Classifier {
    fn name(&self) -> &'static str;

    /// One classification per `batch.pairs` entry, in the same order.
    fn classify(&self, batch: &IngestedBatch) -> Result<Vec<TileClassification>, AppError>;
}

/// Build the classifier selected by the run configuration.
pub fn from_config(config: &AssessConfig) -> Result<Box<dyn Classifier>, AppError> {
    match config.classifier {
        ClassifierKind::Http => Ok(Box::new(HttpClassifier::from_env()?)),
        ClassifierKind::File => {
            let path = config
                .response_path
                .as_ref()
                .ok_or_else(|| AppError::new(2, "`--classifier file` requires `--response <FILE>`."))?;
            Ok(Box::new(FileClassifier::new(path)))
        }
        ClassifierKind::Synthetic => Ok(Box::new(SyntheticClassifier::new(
            config.seed,
            config.image_width,
            config.image_height,
        ))),
    }
}
