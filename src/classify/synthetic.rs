//! Deterministic offline stand-in for the inference service.
//!
//! Each tile gets its own RNG stream seeded from `(seed, base_name)`, so results
//! do not depend on batch composition or order.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::LogNormal;

use crate::classify::Classifier;
use crate::domain::{CategoryStats, SeverityCategory, SeverityStats, TileClassification};
use crate::error::AppError;
use crate::io::ingest::IngestedBatch;

/// Median cluster size in pixels (log-normal).
const CLUSTER_MEDIAN_PX: f64 = 150.0;
const CLUSTER_SIGMA_LN: f64 = 0.6;

pub struct SyntheticClassifier {
    seed: u64,
    width: usize,
    height: usize,
}

impl SyntheticClassifier {
    pub fn new(seed: u64, width: usize, height: usize) -> Self {
        Self { seed, width, height }
    }

    fn max_clusters(category: SeverityCategory) -> u64 {
        match category {
            SeverityCategory::NoDamage => 40,
            SeverityCategory::MinorDamage => 15,
            SeverityCategory::MajorDamage => 8,
            SeverityCategory::Destroyed => 5,
        }
    }

    fn tile_seed(&self, base_name: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.seed.hash(&mut hasher);
        base_name.hash(&mut hasher);
        hasher.finish()
    }

    /// Fake stats for one tile; total area never exceeds the tile's pixel count.
    pub fn tile_stats(&self, base_name: &str) -> Result<SeverityStats, AppError> {
        let mut rng = StdRng::seed_from_u64(self.tile_seed(base_name));
        let cluster_size = LogNormal::new(CLUSTER_MEDIAN_PX.ln(), CLUSTER_SIGMA_LN)
            .map_err(|e| AppError::new(4, format!("Cluster size distribution error: {e}")))?;

        let mut stats = SeverityStats::default();
        for category in SeverityCategory::ALL {
            let count = rng.gen_range(0..=Self::max_clusters(category));
            let area: f64 = (0..count).map(|_| cluster_size.sample(&mut rng).round()).sum();
            stats.set(category, CategoryStats { count, area });
        }

        let capacity = self.width as f64 * self.height as f64;
        let total: f64 = SeverityCategory::ALL.iter().map(|&c| stats.get(c).area).sum();
        if total > capacity && total > 0.0 {
            let scale = capacity / total;
            for category in SeverityCategory::ALL {
                let s = stats.get(category);
                stats.set(
                    category,
                    CategoryStats {
                        count: s.count,
                        area: (s.area * scale).floor(),
                    },
                );
            }
        }

        Ok(stats)
    }
}

impl Classifier for SyntheticClassifier {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn classify(&self, batch: &IngestedBatch) -> Result<Vec<TileClassification>, AppError> {
        batch
            .pairs
            .iter()
            .map(|pair| {
                Ok(TileClassification {
                    localisation_mask_url: None,
                    damage_mask_url: None,
                    stats: self.tile_stats(&pair.base_name)?,
                })
            })
            .collect()
    }
}
