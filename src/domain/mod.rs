//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - naming constants and severity categories (`SeverityCategory`)
//! - geo types (`GeoTransform`, `GeoPoint`, `ReferencePoints`, `GeoMetadataSet`)
//! - damage outputs (`TileDamageDetail`, `BatchSummary`, `ReportFile`, etc.)

pub mod types;

pub use types::*;
