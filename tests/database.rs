// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! SQLite geometry database tests

use anyhow::Result;
use detgeom::geometry::{Material, SensitiveDetector, ShapeType, Unit, Volume};
use detgeom::io::{sql, text, GeometryDatabase};
use detgeom::Detector;
use tempfile::TempDir;

fn hodoscope(variation: &str, id: i64) -> Result<Detector> {
    let mut det = Detector::new("hodo").with_variation(variation).with_table_id(id);
    let mut sd = SensitiveDetector::new("hodo", "hodoscope tiles", "layer tile", 700)
        .with_thresholds("0.5*MeV", "100*ns", "1*mm");
    sd.add_bank_row("layer", "tile layer", 1, "Di")?;
    sd.add_bank_row("adc", "charge", 2, "Rd")?;

    det.add(
        Volume::new("hodo_mother")
            .with_description("O'Neil's hodoscope")
            .with_position([0.0, 0.0, 180.0], Unit::Centimeter)
            .with_shape(ShapeType::Tube)
            .with_dimensions([4.0, 180.0, 40.0], Unit::Millimeter)
            .with_material("G4_AIR"),
    )?;
    for tile in 1..=4i64 {
        det.add(
            Volume::new(format!("hodo_t{}", tile))
                .with_mother("hodo_mother")
                .with_position([15.0 * tile as f64, 0.0, 0.0], Unit::Millimeter)
                .with_rotation([0.0, 0.0, 90.0 * tile as f64], Unit::Degree)
                .with_color("3399ff")
                .with_shape(ShapeType::Box)
                .with_dimensions([7.5, 7.5, 7.5], Unit::Millimeter)
                .with_material("scintillator")
                .with_sensitive_detector(&sd)
                .with_identity(sd.identity(&[1, tile])?),
        )?;
    }
    det.add_sensitivity(sd);
    det.add_material(Material::from_component_str(
        "hodo_wrap",
        "tile wrapping",
        1.39,
        "G4_C 0.625 G4_H 0.042 G4_O 0.333",
    )?);
    Ok(det)
}

#[test]
fn test_file_database_round_trip() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("geometry.sqlite");
    let det = hodoscope("original", 1)?;
    {
        let mut db = GeometryDatabase::open(&path)?;
        let summary = db.write_detector(&det)?;
        assert_eq!(summary.table_id, 1);
        assert_eq!(summary.volumes, 5);
        assert_eq!(summary.hits, 1);
        assert_eq!(summary.bank_rows, 3);
        assert_eq!(summary.materials, 1);
    }

    let db = GeometryDatabase::open(&path)?;
    let back = db.read_detector("hodo", "original", 1)?;
    assert_eq!(text::format_geometry(&back), text::format_geometry(&det));
    assert_eq!(text::format_hits(&back), text::format_hits(&det));
    assert_eq!(text::format_banks(&back), text::format_banks(&det));
    assert_eq!(text::format_materials(&back, true), text::format_materials(&det, true));
    assert_eq!(back.get("hodo_mother").map(|v| v.description.as_str()), Some("O'Neil's hodoscope"));
    Ok(())
}

#[test]
fn test_variations_are_separate() -> Result<()> {
    let mut db = GeometryDatabase::open_in_memory()?;
    db.write_detector(&hodoscope("original", 1)?)?;

    let mut smaller = hodoscope("test", 0)?;
    smaller.remove("hodo_t4");
    let summary = db.write_detector(&smaller)?;
    assert_eq!(summary.table_id, 1);
    assert_eq!(db.latest_id("hodo__geometry", "test")?, Some(1));

    assert_eq!(db.read_detector("hodo", "original", 1)?.len(), 5);
    assert_eq!(db.read_detector("hodo", "test", 1)?.len(), 4);
    assert!(db.read_detector("hodo", "test", 2)?.is_empty());
    Ok(())
}

#[test]
fn test_rewrite_replaces_rows() -> Result<()> {
    let mut db = GeometryDatabase::open_in_memory()?;
    let det = hodoscope("original", 3)?;
    db.write_detector(&det)?;
    db.write_detector(&det)?;
    let back = db.read_detector("hodo", "original", 3)?;
    assert_eq!(back.len(), 5);
    assert_eq!(back.sensitivities().len(), 1);
    assert_eq!(back.sensitivities()[0].bank_rows().len(), 3);
    Ok(())
}

#[test]
fn test_gemc1_script() -> Result<()> {
    let det = hodoscope("original", 1)?.with_gemc_version(1);
    let script = sql::detector_script(&det);
    assert!(script.contains("CREATE TABLE"));
    assert!(script.contains("hodo__geometry"));
    assert!(script.contains("O''Neil''s hodoscope"));
    assert!(script.contains("now()"));
    Ok(())
}
