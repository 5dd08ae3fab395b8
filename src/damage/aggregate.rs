//! Per-tile and batch-wide damage cost breakdowns.
//!
//! Pure arithmetic over already-normalized classifier output. Zero areas never
//! fail: percentages fall back to 0 when the denominator is 0.

use crate::damage::CostTable;
use crate::domain::{
    BatchSummary, CategoryBreakdown, GeoRecord, MaskRefs, SeverityCategory, SeverityStats, TileClassification,
    TileDamageDetail, TilePair,
};
use crate::io::validate::mask_name;

/// `100 * part / whole`, or 0 when `whole` is 0.
fn percentage(part: f64, whole: f64) -> f64 {
    if whole == 0.0 { 0.0 } else { 100.0 * part / whole }
}

/// Four breakdown rows (fixed category order) for one tile.
pub fn tile_breakdown(stats: &SeverityStats, costs: &CostTable) -> Vec<CategoryBreakdown> {
    let total_area: f64 = SeverityCategory::ALL.iter().map(|&c| stats.get(c).area).sum();

    SeverityCategory::ALL
        .iter()
        .map(|&category| {
            let s = stats.get(category);
            CategoryBreakdown {
                category,
                count: s.count,
                area: s.area,
                percentage: percentage(s.area, total_area),
                cost: s.area * costs.unit_cost(category),
            }
        })
        .collect()
}

/// Roll up tile details into per-category totals and grand totals.
///
/// Every tile contributes, including all-zero ones. Cluster counts saturate at
/// `u64::MAX` instead of overflowing.
pub fn batch_summary(details: &[TileDamageDetail], costs: &CostTable) -> BatchSummary {
    let mut totals = [(0u64, 0.0f64); 4];
    for detail in details {
        for (slot, &category) in totals.iter_mut().zip(SeverityCategory::ALL.iter()) {
            let s = detail.stats.get(category);
            slot.0 = slot.0.saturating_add(s.count);
            slot.1 += s.area;
        }
    }

    let grand_area: f64 = totals.iter().map(|&(_, area)| area).sum();

    let categories: Vec<CategoryBreakdown> = SeverityCategory::ALL
        .iter()
        .zip(totals.iter())
        .map(|(&category, &(count, area))| CategoryBreakdown {
            category,
            count,
            area,
            percentage: percentage(area, grand_area),
            cost: area * costs.unit_cost(category),
        })
        .collect();

    let grand_cost = categories.iter().map(|c| c.cost).sum();
    let total_clusters = categories.iter().fold(0u64, |acc, c| acc.saturating_add(c.count));

    BatchSummary {
        categories,
        grand_area,
        grand_cost,
        total_clusters,
    }
}

/// Assemble the full damage detail of one tile.
///
/// `geo` is the metadata record of the tile's pre image.
pub fn tile_detail(
    pair: &TilePair,
    classification: &TileClassification,
    geo: &GeoRecord,
    costs: &CostTable,
) -> TileDamageDetail {
    TileDamageDetail {
        pair: pair.clone(),
        masks: MaskRefs {
            localisation_name: mask_name(&pair.pre_image),
            localisation_url: classification.localisation_mask_url.clone(),
            damage_name: mask_name(&pair.post_image),
            damage_url: classification.damage_mask_url.clone(),
        },
        stats: classification.stats,
        breakdown: tile_breakdown(&classification.stats, costs),
        geo_params: geo.transform,
        projection: geo.projection.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::GeoTransform;
    use crate::domain::SeverityCategory::*;

    fn row(rows: &[CategoryBreakdown], category: SeverityCategory) -> CategoryBreakdown {
        *rows.iter().find(|r| r.category == category).unwrap()
    }

    fn detail(base: &str, stats: SeverityStats) -> TileDamageDetail {
        let record = GeoRecord {
            transform: GeoTransform::from_coefficients(&[0.0, 1.0, 0.0, 0.0, 0.0, -1.0]).unwrap(),
            projection: "EPSG:4326".to_string(),
        };
        let classification = TileClassification {
            stats,
            ..TileClassification::default()
        };
        tile_detail(&TilePair::new(base), &classification, &record, &CostTable::default())
    }

    #[test]
    fn breakdown_is_in_category_order() {
        let rows = tile_breakdown(&SeverityStats::default(), &CostTable::default());
        let order: Vec<_> = rows.iter().map(|r| r.category).collect();
        assert_eq!(order, vec![NoDamage, MinorDamage, MajorDamage, Destroyed]);
    }

    #[test]
    fn zero_area_gives_zero_percentages_and_cost() {
        let rows = tile_breakdown(&SeverityStats::default(), &CostTable::default());
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.percentage == 0.0));
        let total_cost: f64 = rows.iter().map(|r| r.cost).sum();
        assert_eq!(total_cost, 0.0);
    }

    #[test]
    fn percentages_and_costs_follow_areas() {
        let stats = SeverityStats::default()
            .with(NoDamage, 3, 100.0)
            .with(MinorDamage, 2, 50.0);
        let rows = tile_breakdown(&stats, &CostTable::default());

        assert!((row(&rows, NoDamage).percentage - 66.67).abs() < 0.01);
        assert!((row(&rows, MinorDamage).percentage - 33.33).abs() < 0.01);
        assert!((row(&rows, MinorDamage).cost - 6.0).abs() < 1e-12);
        assert_eq!(row(&rows, NoDamage).cost, 0.0);
        assert_eq!(row(&rows, MajorDamage).percentage, 0.0);
    }

    #[test]
    fn custom_cost_table_is_applied() {
        let stats = SeverityStats::default().with(Destroyed, 1, 10.0);
        let costs = CostTable {
            destroyed: 2.0,
            ..CostTable::default()
        };
        let rows = tile_breakdown(&stats, &costs);
        assert_eq!(row(&rows, Destroyed).cost, 20.0);
        assert_eq!(row(&rows, Destroyed).percentage, 100.0);
    }

    #[test]
    fn batch_totals_equal_manual_sums() {
        let tiles = vec![
            detail(
                "a",
                SeverityStats::default()
                    .with(NoDamage, 4, 400.0)
                    .with(MinorDamage, 2, 120.0)
                    .with(Destroyed, 1, 30.0),
            ),
            detail(
                "b",
                SeverityStats::default()
                    .with(MinorDamage, 1, 80.0)
                    .with(MajorDamage, 3, 150.0),
            ),
            detail("c", SeverityStats::default().with(NoDamage, 2, 220.0)),
        ];

        let summary = batch_summary(&tiles, &CostTable::default());

        assert_eq!(summary.total_clusters, 4 + 2 + 1 + 1 + 3 + 2);
        assert!((summary.grand_area - 1000.0).abs() < 1e-9);

        let expected_cost = 200.0 * 0.12 + 150.0 * 0.35 + 30.0 * 0.75;
        assert!((summary.grand_cost - expected_cost).abs() < 1e-9);

        let per_tile_cost: f64 = tiles.iter().map(|t| t.total_cost()).sum();
        assert!((summary.grand_cost - per_tile_cost).abs() < 1e-9);

        let no_damage = row(&summary.categories, NoDamage);
        assert_eq!(no_damage.count, 6);
        assert!((no_damage.area - 620.0).abs() < 1e-9);
        assert!((no_damage.percentage - 62.0).abs() < 1e-9);

        let pct_sum: f64 = summary.categories.iter().map(|c| c.percentage).sum();
        assert!((pct_sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn empty_batch_summary_is_all_zero() {
        let summary = batch_summary(&[], &CostTable::default());
        assert_eq!(summary.categories.len(), 4);
        assert_eq!(summary.grand_area, 0.0);
        assert_eq!(summary.grand_cost, 0.0);
        assert_eq!(summary.total_clusters, 0);
        assert!(summary.categories.iter().all(|c| c.percentage == 0.0));
    }

    #[test]
    fn all_zero_tile_keeps_its_rows() {
        let d = detail("quiet", SeverityStats::default());
        assert_eq!(d.breakdown.len(), 4);
        assert!(d.breakdown.iter().all(|r| r.is_empty()));
        assert_eq!(d.masks.localisation_name, "quiet_pre_disaster_mask.png");
        assert_eq!(d.masks.damage_name, "quiet_post_disaster_mask.png");
    }

    #[test]
    fn huge_cluster_counts_saturate() {
        let tiles = vec![
            detail("a", SeverityStats::default().with(MinorDamage, u64::MAX, 1.0)),
            detail("b", SeverityStats::default().with(MinorDamage, 5, 1.0).with(Destroyed, 7, 1.0)),
        ];
        let summary = batch_summary(&tiles, &CostTable::default());
        assert_eq!(row(&summary.categories, MinorDamage).count, u64::MAX);
        assert_eq!(row(&summary.categories, Destroyed).count, 7);
        assert_eq!(summary.total_clusters, u64::MAX);
        assert!((summary.grand_area - 3.0).abs() < 1e-12);
    }
}
