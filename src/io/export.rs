//! CSV exports.
//!
//! - per-tile damage detail rows (the persisted shape, `geo_params` verbatim)
//! - per-pixel geo grids
//!
//! Both are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::path::Path;

use crate::domain::{BatchHeader, GeoGrid, SeverityCategory, TileDamageDetail};
use crate::error::AppError;

fn csv_error(path: &Path, e: impl std::fmt::Display) -> AppError {
    AppError::new(4, format!("Failed to write CSV '{}': {e}", path.display()))
}

/// Header row of the detail export.
pub fn detail_header() -> Vec<String> {
    let mut cols: Vec<String> = [
        "batch_id",
        "upload_time",
        "pre_image_name",
        "post_image_name",
        "localisation_mask_name",
        "localisation_mask_url",
        "damage_mask_name",
        "damage_mask_url",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    for prefix in ["num", "area", "cost"] {
        for category in SeverityCategory::ALL {
            cols.push(format!("{prefix}_{}", category.key()));
        }
    }
    cols.extend(["total_cost", "geo_params", "projection"].iter().map(|s| s.to_string()));
    cols
}

/// Write one row per tile to a CSV file.
pub fn write_details_csv(path: &Path, header: &BatchHeader, details: &[TileDamageDetail]) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| csv_error(path, e))?;
    let mut writer = csv::Writer::from_writer(file);

    writer.write_record(detail_header()).map_err(|e| csv_error(path, e))?;

    for d in details {
        let geo_params = serde_json::to_string(&d.geo_params).map_err(|e| csv_error(path, e))?;
        let mut row = vec![
            header.batch_id.clone(),
            header.upload_time.to_rfc3339(),
            d.pair.pre_image.clone(),
            d.pair.post_image.clone(),
            d.masks.localisation_name.clone(),
            d.masks.localisation_url.clone().unwrap_or_default(),
            d.masks.damage_name.clone(),
            d.masks.damage_url.clone().unwrap_or_default(),
        ];
        row.extend(d.breakdown.iter().map(|b| b.count.to_string()));
        row.extend(d.breakdown.iter().map(|b| format!("{:.4}", b.area)));
        row.extend(d.breakdown.iter().map(|b| format!("{:.4}", b.cost)));
        row.push(format!("{:.4}", d.total_cost()));
        row.push(geo_params);
        row.push(d.projection.clone());

        writer.write_record(&row).map_err(|e| csv_error(path, e))?;
    }

    writer.flush().map_err(|e| csv_error(path, e))?;
    Ok(())
}

/// Write a per-pixel grid as `row,col,lat,lon`.
pub fn write_grid_csv(path: &Path, grid: &GeoGrid) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| csv_error(path, e))?;
    let mut writer = csv::Writer::from_writer(file);

    writer
        .write_record(["row", "col", "lat", "lon"])
        .map_err(|e| csv_error(path, e))?;

    for (row, cells) in grid.points.iter().enumerate() {
        for (col, p) in cells.iter().enumerate() {
            writer
                .write_record([
                    row.to_string(),
                    col.to_string(),
                    format!("{:.10}", p.lat),
                    format!("{:.10}", p.lon),
                ])
                .map_err(|e| csv_error(path, e))?;
        }
    }

    writer.flush().map_err(|e| csv_error(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::damage::{tile_detail, CostTable};
    use crate::domain::{GeoRecord, GeoTransform, SeverityStats, TileClassification, TilePair};
    use crate::geo::full_grid;

    #[test]
    fn detail_rows_carry_geo_params_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("details.csv");

        let record = GeoRecord {
            transform: GeoTransform::from_coefficients(&[-93.5, 0.5, 0.0, 30.25, 0.0, -0.5]).unwrap(),
            projection: "EPSG:4326".to_string(),
        };
        let classification = TileClassification {
            stats: SeverityStats::default().with(SeverityCategory::MinorDamage, 2, 50.0),
            damage_mask_url: Some("https://masks/x_post.png".to_string()),
            ..TileClassification::default()
        };
        let detail = tile_detail(&TilePair::new("x"), &classification, &record, &CostTable::default());
        let header = BatchHeader {
            batch_id: "b1".to_string(),
            upload_time: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        };

        write_details_csv(&path, &header, &[detail]).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), detail_header().len());
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);

        let col = |name: &str| headers.iter().position(|h| h == name).unwrap();
        let row = &rows[0];
        assert_eq!(&row[col("pre_image_name")], "x_pre_disaster.png");
        assert_eq!(&row[col("num_minor_damage")], "2");
        assert_eq!(&row[col("cost_minor_damage")], "6.0000");
        assert_eq!(&row[col("damage_mask_url")], "https://masks/x_post.png");
        assert_eq!(&row[col("geo_params")], "[-93.5,0.5,0.0,30.25,0.0,-0.5]");
    }

    #[test]
    fn grid_csv_has_one_row_per_pixel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.csv");
        let t = GeoTransform::from_coefficients(&[0.0, 1.0, 0.0, 0.0, 0.0, -1.0]).unwrap();
        write_grid_csv(&path, &full_grid(3, 2, &t)).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(reader.records().count(), 6);
    }
}
