//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - built fresh per batch and passed between pipeline stages
//! - exported to JSON/CSV
//! - reloaded later for re-printing a report

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::damage::CostTable;

/// Extension every uploaded tile image carries.
pub const IMAGE_EXTENSION: &str = "png";

/// Marker between base name and extension for pre-disaster tiles.
pub const PRE_MARKER: &str = "_pre_disaster";

/// Marker between base name and extension for post-disaster tiles.
pub const POST_MARKER: &str = "_post_disaster";

/// Width x height of the tiles (and masks) produced by the classifier.
pub const DEFAULT_IMAGE_SIZE: (usize, usize) = (512, 512);

/// Damage severity class used for cost bucketing.
///
/// The declaration order is the reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityCategory {
    NoDamage,
    MinorDamage,
    MajorDamage,
    Destroyed,
}

impl SeverityCategory {
    pub const ALL: [SeverityCategory; 4] = [
        SeverityCategory::NoDamage,
        SeverityCategory::MinorDamage,
        SeverityCategory::MajorDamage,
        SeverityCategory::Destroyed,
    ];

    /// Stable key used in classifier payloads and exports.
    pub fn key(self) -> &'static str {
        match self {
            SeverityCategory::NoDamage => "no_damage",
            SeverityCategory::MinorDamage => "minor_damage",
            SeverityCategory::MajorDamage => "major_damage",
            SeverityCategory::Destroyed => "destroyed",
        }
    }

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            SeverityCategory::NoDamage => "No damage",
            SeverityCategory::MinorDamage => "Minor damage",
            SeverityCategory::MajorDamage => "Major damage",
            SeverityCategory::Destroyed => "Destroyed",
        }
    }
}

/// Affine pixel -> geographic transform (GDAL coefficient order).
///
/// `lon = lon_origin + x * pixel_width + y * rotation_x`
/// `lat = lat_origin + x * rotation_y + y * pixel_height`
///
/// Serialized as the plain 6-element coefficient list so `geo_params` round-trips
/// verbatim through exports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "[f64; 6]", try_from = "Vec<f64>")]
pub struct GeoTransform {
    pub lon_origin: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub lat_origin: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// The five canonical reference coordinates of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferencePoints {
    pub top_left: GeoPoint,
    pub top_right: GeoPoint,
    pub center: GeoPoint,
    pub bottom_left: GeoPoint,
    pub bottom_right: GeoPoint,
}

impl ReferencePoints {
    /// Named points in display order.
    pub fn named(&self) -> [(&'static str, GeoPoint); 5] {
        [
            ("top_left", self.top_left),
            ("top_right", self.top_right),
            ("center", self.center),
            ("bottom_left", self.bottom_left),
            ("bottom_right", self.bottom_right),
        ]
    }
}

/// Geographic extent covered by a tile's reference points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

/// Per-pixel geographic grid, indexed `[row][col]`.
#[derive(Debug, Clone)]
pub struct GeoGrid {
    pub width: usize,
    pub height: usize,
    pub points: Vec<Vec<GeoPoint>>,
    pub center: GeoPoint,
}

/// A matched pre/post tile pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilePair {
    pub base_name: String,
    pub pre_image: String,
    pub post_image: String,
}

impl TilePair {
    pub fn new(base_name: &str) -> Self {
        Self {
            base_name: base_name.to_string(),
            pre_image: format!("{base_name}{PRE_MARKER}.{IMAGE_EXTENSION}"),
            post_image: format!("{base_name}{POST_MARKER}.{IMAGE_EXTENSION}"),
        }
    }
}

/// One metadata entry: the tile's geotransform plus its spatial-reference text.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoRecord {
    pub transform: GeoTransform,
    pub projection: String,
}

/// Tile filename -> geo record, for every pre and post image of a batch.
pub type GeoMetadataSet = BTreeMap<String, GeoRecord>;

/// Classifier output for one category of one tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    /// Detected damage clusters.
    pub count: u64,
    /// Affected area in pixels.
    pub area: f64,
}

/// Per-category classifier output for one tile; every category is always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SeverityStats {
    pub no_damage: CategoryStats,
    pub minor_damage: CategoryStats,
    pub major_damage: CategoryStats,
    pub destroyed: CategoryStats,
}

impl SeverityStats {
    pub fn get(&self, category: SeverityCategory) -> CategoryStats {
        match category {
            SeverityCategory::NoDamage => self.no_damage,
            SeverityCategory::MinorDamage => self.minor_damage,
            SeverityCategory::MajorDamage => self.major_damage,
            SeverityCategory::Destroyed => self.destroyed,
        }
    }

    pub fn set(&mut self, category: SeverityCategory, stats: CategoryStats) {
        let slot = match category {
            SeverityCategory::NoDamage => &mut self.no_damage,
            SeverityCategory::MinorDamage => &mut self.minor_damage,
            SeverityCategory::MajorDamage => &mut self.major_damage,
            SeverityCategory::Destroyed => &mut self.destroyed,
        };
        *slot = stats;
    }

    /// Builder-style setter, handy for literals in tests and fakes.
    pub fn with(mut self, category: SeverityCategory, count: u64, area: f64) -> Self {
        self.set(category, CategoryStats { count, area });
        self
    }
}

/// Mask image references returned by the classifier for one tile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaskRefs {
    pub localisation_name: String,
    pub localisation_url: Option<String>,
    pub damage_name: String,
    pub damage_url: Option<String>,
}

/// Normalized classifier output for one tile (before costing).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileClassification {
    pub localisation_mask_url: Option<String>,
    pub damage_mask_url: Option<String>,
    pub stats: SeverityStats,
}

/// One row of a cost breakdown (per tile or batch-wide).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category: SeverityCategory,
    pub count: u64,
    pub area: f64,
    pub percentage: f64,
    pub cost: f64,
}

impl CategoryBreakdown {
    /// True when the row carries nothing worth displaying.
    pub fn is_empty(&self) -> bool {
        self.count == 0 && self.area == 0.0 && self.cost == 0.0
    }
}

/// Fully computed damage detail for one tile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileDamageDetail {
    pub pair: TilePair,
    pub masks: MaskRefs,
    pub stats: SeverityStats,
    /// Always four rows, in category order.
    pub breakdown: Vec<CategoryBreakdown>,
    /// Geotransform of the pre image, stored verbatim.
    pub geo_params: GeoTransform,
    pub projection: String,
}

impl TileDamageDetail {
    pub fn total_area(&self) -> f64 {
        self.breakdown.iter().map(|b| b.area).sum()
    }

    pub fn total_cost(&self) -> f64 {
        self.breakdown.iter().map(|b| b.cost).sum()
    }
}

/// Batch-wide roll-up of all tile details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Always four rows, in category order.
    pub categories: Vec<CategoryBreakdown>,
    pub grand_area: f64,
    pub grand_cost: f64,
    pub total_clusters: u64,
}

/// Identity of one processed batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchHeader {
    pub batch_id: String,
    pub upload_time: DateTime<Utc>,
}

/// Per-tile report entry: damage detail plus display coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileReport {
    pub detail: TileDamageDetail,
    pub reference: ReferencePoints,
    pub bounds: GeoBounds,
}

/// A saved report file (JSON); the renderer's template context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportFile {
    pub tool: String,
    pub header: BatchHeader,
    pub image_width: usize,
    pub image_height: usize,
    pub cost_table: CostTable,
    pub tiles: Vec<TileReport>,
    pub summary: BatchSummary,
}

/// Which classification collaborator to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    /// POST the batch to the inference service (`INFERENCE_API_URL`).
    Http,
    /// Read a previously saved inference response.
    File,
    /// Deterministic offline stand-in.
    Synthetic,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct AssessConfig {
    pub images_dir: PathBuf,
    pub metadata_path: PathBuf,

    pub classifier: ClassifierKind,
    /// Saved inference response, required when `classifier = file`.
    pub response_path: Option<PathBuf>,
    /// Seed for the synthetic classifier.
    pub seed: u64,

    pub image_width: usize,
    pub image_height: usize,

    pub cost_table: CostTable,

    /// Include all-zero rows in printed per-tile breakdowns.
    pub show_zero: bool,

    pub export_csv: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
}
