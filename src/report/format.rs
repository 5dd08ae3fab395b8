//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the geo/cost code stays clean and testable
//! - output changes are localized

use crate::domain::{CategoryBreakdown, GeoBounds, GeoPoint, ReferencePoints, ReportFile, TileReport};
use crate::io::validate::PairMatch;
use crate::report::display_breakdown;

/// Format a full report: header, per-tile sections, batch summary.
pub fn format_report(report: &ReportFile, show_zero: bool) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== {} - Damage Assessment ===\n", report.tool));
    out.push_str(&format!("Batch: {}\n", report.header.batch_id));
    out.push_str(&format!(
        "Uploaded: {}\n",
        report.header.upload_time.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!(
        "Tiles: {} pairs | {}x{} px\n",
        report.tiles.len(),
        report.image_width,
        report.image_height
    ));
    out.push_str(&format!(
        "Unit costs: minor={} major={} destroyed={}\n",
        report.cost_table.minor_damage, report.cost_table.major_damage, report.cost_table.destroyed
    ));

    for tile in &report.tiles {
        out.push('\n');
        out.push_str(&format_tile(tile, show_zero));
    }

    out.push('\n');
    out.push_str(&format_batch_summary(report));
    out
}

/// One tile section: names, masks, coordinates, breakdown.
pub fn format_tile(tile: &TileReport, show_zero: bool) -> String {
    let d = &tile.detail;
    let mut out = String::new();

    out.push_str(&format!("--- {} ---\n", d.pair.base_name));
    out.push_str(&format!("Pre : {}\n", d.pair.pre_image));
    out.push_str(&format!("Post: {}\n", d.pair.post_image));
    out.push_str(&format!(
        "Masks: {} {}\n",
        d.masks.localisation_name,
        d.masks.localisation_url.as_deref().unwrap_or("-")
    ));
    out.push_str(&format!(
        "       {} {}\n",
        d.masks.damage_name,
        d.masks.damage_url.as_deref().unwrap_or("-")
    ));
    out.push_str(&format!("Projection: {}\n", truncate(&d.projection, 60)));
    out.push_str(&format_reference_points(&tile.reference));
    out.push_str(&format_bounds(&tile.bounds));

    let rows = display_breakdown(&d.breakdown, show_zero);
    if rows.is_empty() {
        out.push_str("No damage clusters detected.\n");
    } else {
        out.push_str(&format_breakdown_table(&rows));
    }
    out.push_str(&format!(
        "Tile total: area={:.0}px cost={:.2}\n",
        d.total_area(),
        d.total_cost()
    ));
    out
}

/// Batch-wide table plus grand totals.
pub fn format_batch_summary(report: &ReportFile) -> String {
    let s = &report.summary;
    let mut out = String::new();

    out.push_str("Batch summary:\n");
    let rows: Vec<&CategoryBreakdown> = s.categories.iter().collect();
    out.push_str(&format_breakdown_table(&rows));
    out.push_str(&format!(
        "Total: clusters={} area={:.0}px cost={:.2}\n",
        s.total_clusters, s.grand_area, s.grand_cost
    ));
    out
}

/// The five reference coordinates of a tile.
pub fn format_reference_points(points: &ReferencePoints) -> String {
    let mut out = String::new();
    for (name, p) in points.named() {
        out.push_str(&format!("{:<13} {}\n", name, fmt_point(p)));
    }
    out
}

/// Lat/lon extent of a tile.
pub fn format_bounds(b: &GeoBounds) -> String {
    format!(
        "Bounds: lat=[{:.6}, {:.6}] lon=[{:.6}, {:.6}]\n",
        b.min_lat, b.max_lat, b.min_lon, b.max_lon
    )
}

/// Outcome of `dmg validate`.
pub fn format_pair_match(m: &PairMatch, metadata_ok: bool) -> String {
    let mut out = String::new();
    if m.is_valid {
        out.push_str(&format!("Pairs: {} complete\n", m.base_names.len()));
        for name in &m.base_names {
            out.push_str(&format!("  {name}\n"));
        }
    } else {
        out.push_str("Pairs: incomplete or mismatched\n");
        for name in &m.unmatched {
            out.push_str(&format!("  unmatched: {name}\n"));
        }
    }
    out.push_str(&format!("Metadata: {}\n", if metadata_ok { "ok" } else { "invalid" }));
    out
}

fn format_breakdown_table(rows: &[&CategoryBreakdown]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<14} {:>8} {:>12} {:>8} {:>12}\n",
            "category", "clusters", "area_px", "pct", "cost"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<14} {:-<8} {:-<12} {:-<8} {:-<12}\n", "", "", "", "", "").trim_end());
    out.push('\n');

    for r in rows {
        out.push_str(
            format!(
                "{:<14} {:>8} {:>12.0} {:>7.2}% {:>12.2}\n",
                r.category.display_name(),
                r.count,
                r.area,
                r.percentage,
                r.cost
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

fn fmt_point(p: GeoPoint) -> String {
    format!("({:.6}, {:.6})", p.lat, p.lon)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
