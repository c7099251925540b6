// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry overlap reports in GEANT4 simulation logs

use crate::detector::Detector;
use crate::error::{GeometryError, GeometryResult};
use crate::geometry::{ShapeType, Unit, Volume};
use anyhow::{Context, Result};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::path::Path;

const NUMBER: &str = r"[-+\d.eE]+";

/// Extra information depending on which GEANT4 check reported the overlap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum OverlapDetail {
    /// A track got confused while navigating (GeomNav exceptions)
    Navigation { direction: Option<[f64; 3]> },
    /// Reported by the overlap checker (GeomVol exceptions)
    Checker {
        volume_type: Option<String>,
        neighbour_type: Option<String>,
        /// Overlap length as printed, with its unit
        overlap: Option<String>,
    },
}

/// One overlap found in the log. Positions are in mm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlap {
    pub position: [f64; 3],
    pub volume: Option<String>,
    /// The previous volume, or the mother or sibling it overlaps with
    pub neighbour: Option<String>,
    pub detail: OverlapDetail,
}

struct Patterns {
    block_start: Regex,
    block_end: Regex,
    geom_nav: Regex,
    current: Regex,
    previous: Regex,
    position: Regex,
    direction: Regex,
    detected: Regex,
    with_mother: Regex,
    with_sibling: Regex,
    local_point: Regex,
}

fn compile(pattern: &str) -> GeometryResult<Regex> {
    Regex::new(&format!("(?i){}", pattern))
        .map_err(|e| GeometryError::Parse(format!("bad pattern '{}': {}", pattern, e)))
}

fn triple(pattern_head: &str) -> String {
    format!(
        r"{}\s*\(\s*({n})\*?\s*,\s*({n})\s*,\s*({n})\s*\)",
        pattern_head,
        n = NUMBER
    )
}

impl Patterns {
    fn new() -> GeometryResult<Self> {
        Ok(Self {
            block_start: compile(r"G4Exception-START")?,
            block_end: compile(r"G4Exception-END")?,
            geom_nav: compile(r"\*\*\* G4Exception\s+:\s+GeomNav")?,
            current: compile(r"Current\s+phys volume:\s+'([^']*)'")?,
            previous: compile(r"Previous\s+phys volume:\s+'([^']*)'")?,
            position: compile(&triple(r"at position\s*:"))?,
            direction: compile(&triple(r"in direction\s*:"))?,
            detected: compile(r"Overlap is detected for volume\s+(\S+)\s+\(([^)]*)\)")?,
            with_mother: compile(r"with its mother volume\s+(\S+)\s+\(([^)]*)\)")?,
            with_sibling: compile(r"with\s+(\S+)\s+\(([^)]*)\)\s+volume")?,
            local_point: compile(&format!(
                r"{},\s+overlapping by at least:\s*(.*)",
                triple(r"local point")
            ))?,
        })
    }
}

fn vector(caps: &Captures) -> Option<[f64; 3]> {
    Some([
        caps.get(1)?.as_str().parse().ok()?,
        caps.get(2)?.as_str().parse().ok()?,
        caps.get(3)?.as_str().parse().ok()?,
    ])
}

fn navigation(p: &Patterns, block: &[&str]) -> Option<Overlap> {
    let mut overlap = Overlap {
        position: [0.0; 3],
        volume: None,
        neighbour: None,
        detail: OverlapDetail::Navigation { direction: None },
    };
    let mut position = None;
    for line in block {
        if let Some(c) = p.current.captures(line) {
            overlap.volume = Some(c[1].to_string());
        }
        if let Some(c) = p.previous.captures(line) {
            overlap.neighbour = Some(c[1].to_string());
        }
        if let Some(c) = p.position.captures(line) {
            position = vector(&c);
        }
        if let Some(c) = p.direction.captures(line) {
            overlap.detail = OverlapDetail::Navigation {
                direction: vector(&c),
            };
        }
    }
    overlap.position = position?;
    Some(overlap)
}

fn checker(p: &Patterns, block: &[&str]) -> Option<Overlap> {
    let mut volume = None;
    let mut volume_type = None;
    let mut neighbour = None;
    let mut neighbour_type = None;
    let mut position = None;
    let mut length = None;

    for (i, line) in block.iter().enumerate() {
        let Some(c) = p.detected.captures(line) else {
            continue;
        };
        volume = Some(c[1].to_string());
        volume_type = Some(c[2].to_string());
        // The report spreads over the detection line and the two after it
        let window = &block[i..block.len().min(i + 3)];
        for text in window {
            if let Some(n) = p.with_mother.captures(text).or_else(|| p.with_sibling.captures(text)) {
                neighbour = Some(n[1].to_string());
                neighbour_type = Some(n[2].to_string());
                break;
            }
        }
        for text in window {
            if let Some(l) = p.local_point.captures(text) {
                position = vector(&l);
                length = Some(l[4].trim().to_string());
                break;
            }
        }
    }

    if position.is_none() || volume.is_none() {
        log::debug!("Could not parse overlap block:\n{}", block.join("\n"));
    }
    Some(Overlap {
        position: position?,
        volume,
        neighbour,
        detail: OverlapDetail::Checker {
            volume_type,
            neighbour_type,
            overlap: length,
        },
    })
}

/// Extract every overlap reported in a simulation log. Exception blocks
/// without a position are dropped.
pub fn parse_overlap_log(text: &str) -> GeometryResult<Vec<Overlap>> {
    let p = Patterns::new()?;
    let lines: Vec<&str> = text.lines().collect();
    let mut overlaps = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        if !p.block_start.is_match(lines[i]) {
            i += 1;
            continue;
        }
        let start = i + 1;
        let end = lines[start..]
            .iter()
            .position(|line| p.block_end.is_match(line))
            .map_or(lines.len(), |offset| start + offset);
        let block = &lines[start..end];

        let found = if block.iter().any(|line| p.geom_nav.is_match(line)) {
            navigation(&p, block)
        } else {
            checker(&p, block)
        };
        overlaps.extend(found);
        i = end + 1;
    }
    Ok(overlaps)
}

pub fn parse_overlap_log_file(path: impl AsRef<Path>) -> Result<Vec<Overlap>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read log file: {:?}", path))?;
    Ok(parse_overlap_log(&text)?)
}

/// Detector `overlaps` with a small box marker (`size_mm` half length) at
/// every overlap position.
pub fn make_overlap_detector(
    overlaps: &[Overlap],
    color: &str,
    size_mm: f64,
) -> GeometryResult<Detector> {
    let mut detector = Detector::new("overlaps");
    for (i, overlap) in overlaps.iter().enumerate() {
        detector.add(
            Volume::new(format!("Overlap{}", i + 1))
                .with_description("Overlap point")
                .with_position(overlap.position, Unit::Millimeter)
                .with_rotation([0.0; 3], Unit::Degree)
                .with_color(color.trim_start_matches('#'))
                .with_shape(ShapeType::Box)
                .with_dimensions([size_mm; 3], Unit::Millimeter)
                .with_sensitivity("no", "")
                .with_identity("no"),
        )?;
    }
    Ok(detector)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
Some run output
-------- WWWW ------- G4Exception-START -------- WWWW -------
*** G4Exception : GeomNav1002
      issued by : G4Navigator::ComputeStep()
Track stuck or not moving.
          Track stuck, not moving for 10 steps
          in volume -ftof_p1a_12- at point (-1650.2,-432.1,5120.9) (local point (0,0,0))
          direction: (0.1,0.2,0.97).
          Current  phys volume: 'ftof_p1a_12'
          Previous phys volume: 'ftof_p1a_11'
          at position : (-1650.2, -432.1, 5120.9)
          in direction: (0.1, 0.2, 0.97)
-------- WWWW -------- G4Exception-END --------- WWWW -------

Checking overlaps for volume ecal_u1 (G4Trap) ...
-------- WWWW ------- G4Exception-START -------- WWWW -------
*** G4Exception : GeomVol1002
      issued by : G4PVPlacement::CheckOverlaps()
Overlap is detected for volume ecal_u1:0 (G4Trap) with ecal_u2:0 (G4Trap) volume's
          local point (12.5,-3,40.25), overlapping by at least: 1.2 mm
NOTE: Reached maximum fixed number -1- of overlaps reports for this volume !
-------- WWWW -------- G4Exception-END --------- WWWW -------

-------- WWWW ------- G4Exception-START -------- WWWW -------
*** G4Exception : GeomVol1002
      issued by : G4PVPlacement::CheckOverlaps()
Overlap is detected for volume target (G4Tubs)
          apparently fully encapsulating volume beamline (G4Tubs) at the same level !
-------- WWWW -------- G4Exception-END --------- WWWW -------
-------- WWWW ------- G4Exception-START -------- WWWW -------
*** G4Exception : GeomVol1002
Overlap is detected for volume svt_l1 (G4Box)
          with its mother volume svt (G4Tubs)
          at mother local point (1,2,3), overlapping by at least: 0.5 mm
-------- WWWW -------- G4Exception-END --------- WWWW -------
";

    #[test]
    fn test_parse_log() {
        let overlaps = parse_overlap_log(LOG).unwrap();
        assert_eq!(overlaps.len(), 3);

        let nav = &overlaps[0];
        assert_eq!(nav.position, [-1650.2, -432.1, 5120.9]);
        assert_eq!(nav.volume.as_deref(), Some("ftof_p1a_12"));
        assert_eq!(nav.neighbour.as_deref(), Some("ftof_p1a_11"));
        assert_eq!(
            nav.detail,
            OverlapDetail::Navigation {
                direction: Some([0.1, 0.2, 0.97])
            }
        );

        let sibling = &overlaps[1];
        assert_eq!(sibling.position, [12.5, -3.0, 40.25]);
        assert_eq!(sibling.volume.as_deref(), Some("ecal_u1:0"));
        assert_eq!(sibling.neighbour.as_deref(), Some("ecal_u2:0"));
        match &sibling.detail {
            OverlapDetail::Checker { overlap, volume_type, .. } => {
                assert_eq!(overlap.as_deref(), Some("1.2 mm"));
                assert_eq!(volume_type.as_deref(), Some("G4Trap"));
            }
            other => panic!("unexpected detail {:?}", other),
        }

        let mother = &overlaps[2];
        assert_eq!(mother.neighbour.as_deref(), Some("svt"));
        assert_eq!(mother.position, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_unterminated_block() {
        let log = "G4Exception-START\n*** G4Exception : GeomNav1002\nat position : (1, 2, 3)\n";
        let overlaps = parse_overlap_log(log).unwrap();
        assert_eq!(overlaps.len(), 1);
        assert_eq!(overlaps[0].position, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_marker_detector() {
        let overlaps = parse_overlap_log(LOG).unwrap();
        let det = make_overlap_detector(&overlaps, "#ff0000", 10.0).unwrap();
        assert_eq!(det.name(), "overlaps");
        assert_eq!(det.len(), 3);
        let marker = det.get("Overlap2").unwrap();
        assert_eq!(marker.color, "ff0000");
        assert_eq!(marker.position.to_string(), "12.5*mm -3*mm 40.25*mm");
        assert_eq!(marker.dimensions.units()[0], Unit::Millimeter);
    }
}
