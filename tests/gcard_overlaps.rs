// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! gcard loading and overlap log tests

use anyhow::Result;
use detgeom::io::{self, load_gcard, make_overlap_detector, parse_overlap_log_file, text};
use detgeom::{render_detector, Detector, EngineConfig};
use tempfile::TempDir;

const TARGET: &str = "\
target | root | LH2 cell | 0*cm 0*cm -3*cm | 0*deg 0*deg 0*deg | aa0000 | Tube | 0*mm 10*mm 25*mm | G4_lH2 | no | 1 | 1 | 1 | 1 | 1 | no | no | no
";

const LOG: &str = "\
G4WT0 > Event 12 started
-------- WWWW ------- G4Exception-START -------- WWWW -------
*** G4Exception : GeomVol1002
      issued by : G4PVPlacement::CheckOverlaps()
Overlap is detected for volume target (G4Tubs)
          with its mother volume root (G4Box)
          at mother local point (0,0,-55.5), overlapping by at least: 2.5 mm
-------- WWWW -------- G4Exception-END --------- WWWW -------
-------- WWWW ------- G4Exception-START -------- WWWW -------
*** G4Exception : Run0001
      issued by : G4RunManager::BeamOn()
Nothing to do with geometry.
-------- WWWW -------- G4Exception-END --------- WWWW -------
";

#[test]
fn test_load_text_detectors_from_gcard() -> Result<()> {
    let dir = TempDir::new()?;
    std::fs::write(dir.path().join("target__geometry_lh2.txt"), TARGET)?;
    std::fs::write(
        dir.path().join("run.gcard"),
        r#"<gcard>
    <detector name="target" factory="TEXT" variation="lh2"/>
    <detector name="magnets/solenoid" factory="CAD"/>
    <option name="SAVE_ALL_MOTHERS" value="1"/>
</gcard>"#,
    )?;

    let detectors = load_gcard(dir.path().join("run.gcard"), &EngineConfig::default())?;
    assert_eq!(detectors.len(), 1);
    assert_eq!(detectors[0].name(), "target");
    assert_eq!(detectors[0].variation, "lh2");
    assert_eq!(detectors[0][0].material, "G4_lH2");
    Ok(())
}

#[test]
fn test_gcard_missing_table_fails() -> Result<()> {
    let dir = TempDir::new()?;
    std::fs::write(
        dir.path().join("run.gcard"),
        r#"<gcard><detector name="ghost" factory="TEXT"/></gcard>"#,
    )?;
    assert!(load_gcard(dir.path().join("run.gcard"), &EngineConfig::default()).is_err());
    Ok(())
}

#[test]
fn test_overlap_markers() -> Result<()> {
    let dir = TempDir::new()?;
    let log = dir.path().join("gemc.log");
    std::fs::write(&log, LOG)?;

    let overlaps = parse_overlap_log_file(&log)?;
    assert_eq!(overlaps.len(), 1);
    assert_eq!(overlaps[0].volume.as_deref(), Some("target"));
    assert_eq!(overlaps[0].neighbour.as_deref(), Some("root"));
    assert_eq!(overlaps[0].position, [0.0, 0.0, -55.5]);

    let markers = make_overlap_detector(&overlaps, "#00ff00", 5.0)?;
    let path = text::write_geometry(&markers, dir.path(), None)?;
    assert_eq!(path, dir.path().join("overlaps__geometry_original.txt"));

    let mut back = Detector::new("overlaps");
    io::read_geometry(&path, &mut back)?;
    let marker = &back[0];
    assert_eq!(marker.name, "Overlap1");
    assert_eq!(marker.description, "Overlap point");
    assert_eq!(marker.position.to_string(), "0*mm 0*mm -55.5*mm");
    assert_eq!(marker.material, "Vacuum");

    let scene = render_detector(&back, &EngineConfig::default())?;
    assert!(scene.volume("Overlap1").is_some());

    let json = serde_json::to_string(&overlaps)?;
    assert!(json.contains("\"kind\":\"Checker\""));
    Ok(())
}
