//! Test data: reference CSVs ingested into a fresh database, and sample images.

use image::{ImageFormat, Rgb, RgbImage};
use recycle_lens::ingestion::{default_sources, ingest_all};
use recycle_lens::knowledge::open_and_prepare;
use std::io::Cursor;
use std::path::PathBuf;
use tempfile::TempDir;

const INTERNAL_PARTS_CSV: &str = "\
Item Name,Part Name,Materials Used,Recyclable,Reusable,Recycling Process
bottle,cap,PP,Yes,No,Shred and melt
bottle,body,PET,Yes,Yes,Wash and flake
can,shell,Aluminium,Yes,No,Melt
";

const RECYCLABLE_VALUES_CSV: &str = "\
Item Id,Part Name,Materials Used,Estimated Value
1,cap,PP,0.10 per kg
2,body,PET,0.30 per kg
";

const RECYCLING_CENTERS_CSV: &str = "\
Location,Center Name,Address,Contact,Working Hours,Website
Pune,Green Hub,MG Road 1,,9-5,
";

const REUSABLE_PARTS_CSV: &str = "\
Item Id,Part Name,Reuse Potential,Estimated Value
2,body,Planter,0.50
";

const RESALE_CENTERS_CSV: &str = "\
Location,Center Name,Address,Contact,Working Hours,Website
Pune,Second Life Store,FC Road 7,020-555,10-6,https://example.org
";

/// Creates the reference database by running the CSV ingestion over a data directory.
///
/// Returns the temp dir (keep it alive) and the database path.
pub fn create_test_db() -> anyhow::Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let data_dir = dir.path().join("data");
    std::fs::create_dir_all(&data_dir)?;
    for (file, content) in [
        ("internal_parts.csv", INTERNAL_PARTS_CSV),
        ("recyclable_values.csv", RECYCLABLE_VALUES_CSV),
        ("recycling_centers.csv", RECYCLING_CENTERS_CSV),
        ("reusable_parts.csv", REUSABLE_PARTS_CSV),
        ("resale_centers.csv", RESALE_CENTERS_CSV),
    ] {
        std::fs::write(data_dir.join(file), content)?;
    }

    let db_path = dir.path().join("data.db");
    let mut conn = open_and_prepare(&db_path)?;
    let report = ingest_all(&mut conn, &default_sources(&data_dir));
    anyhow::ensure!(
        report.failures() == 0,
        "Fixture ingestion failed: {:?}",
        report.entries
    );
    Ok((dir, db_path))
}

pub fn png_bytes() -> Vec<u8> {
    let mut bytes = Vec::new();
    RgbImage::from_pixel(16, 16, Rgb([30, 160, 90]))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("Failed to encode test image");
    bytes
}

pub fn text_bytes() -> Vec<u8> {
    b"this is not an image".to_vec()
}
