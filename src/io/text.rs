// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! GEMC `|` delimited text tables

use super::parser::{parse_quantities, parse_rotation};
use crate::detector::Detector;
use crate::error::{GeometryError, GeometryResult};
use crate::geometry::{Material, ShapeType, UnitPolicy, Volume, COLUMN_NAMES};
use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub fn geometry_file_name(detector: &str, variation: &str) -> String {
    format!("{}__geometry_{}.txt", detector, variation)
}

pub fn hit_file_name(detector: &str, variation: &str) -> String {
    format!("{}__hit_{}.txt", detector, variation)
}

pub fn bank_file_name(detector: &str) -> String {
    format!("{}__bank.txt", detector)
}

pub fn materials_file_name(detector: &str, variation: &str) -> String {
    format!("{}__materials_{}.txt", detector, variation)
}

/// Split a table line into trimmed fields, or `None` for blank and comment lines
fn split_fields(line: &str) -> Option<Vec<&str>> {
    if line.trim_start().starts_with('#') {
        return None;
    }
    let fields: Vec<&str> = line.split('|').map(str::trim).collect();
    if fields.len() < 2 {
        return None;
    }
    Some(fields)
}

fn parse_number<T: FromStr>(text: &str, column: usize, line: usize) -> GeometryResult<T>
where
    T::Err: std::fmt::Display,
{
    text.parse::<T>().map_err(|e| GeometryError::Format {
        line,
        reason: format!("column {} ({}): '{}': {}", column + 1, COLUMN_NAMES[column], text, e),
    })
}

/// Parse one geometry line. Returns `Ok(None)` for lines that carry no record.
pub fn parse_volume_line(
    text: &str,
    line: usize,
    policy: &UnitPolicy,
) -> GeometryResult<Option<Volume>> {
    let Some(mut fields) = split_fields(text) else {
        return Ok(None);
    };
    if fields.len() == COLUMN_NAMES.len() + 1 && fields.last() == Some(&"") {
        fields.pop();
    }
    volume_from_fields(&fields, line, policy).map(Some)
}

/// Build a volume from the 18 column values of a table row
pub fn volume_from_fields(
    fields: &[&str],
    line: usize,
    policy: &UnitPolicy,
) -> GeometryResult<Volume> {
    if fields.len() != COLUMN_NAMES.len() {
        return Err(GeometryError::Format {
            line,
            reason: format!("expected {} columns, found {}", COLUMN_NAMES.len(), fields.len()),
        });
    }
    let at_line = |e: GeometryError| GeometryError::Format {
        line,
        reason: e.to_string(),
    };

    let (rotation, rotation_order) = parse_rotation(fields[4], policy).map_err(at_line)?;
    let volume = Volume {
        name: fields[0].to_string(),
        mother: fields[1].to_string(),
        description: fields[2].to_string(),
        position: parse_quantities(fields[3], &policy.base.length, policy).map_err(at_line)?,
        rotation,
        rotation_order,
        color: fields[5].to_string(),
        shape: ShapeType::parse(fields[6]),
        dimensions: parse_quantities(fields[7], &policy.base.length, policy).map_err(at_line)?,
        material: fields[8].to_string(),
        magfield: fields[9].to_string(),
        ncopy: parse_number(fields[10], 10, line)?,
        pmany: parse_number(fields[11], 11, line)?,
        exist: parse_number(fields[12], 12, line)?,
        visible: parse_number(fields[13], 13, line)?,
        style: parse_number(fields[14], 14, line)?,
        sensitivity: fields[15].to_string(),
        hit_type: fields[16].to_string(),
        identity: fields[17].to_string(),
    };
    Ok(volume)
}

/// Parse a whole geometry table into `detector`, using the detector's unit
/// policy. Records that fail validation are reported and kept.
pub fn parse_geometry(source: &str, detector: &mut Detector) -> GeometryResult<usize> {
    let policy = detector.units.clone();
    let mut count = 0;
    for (i, text) in source.lines().enumerate() {
        let line = i + 1;
        let Some(volume) = parse_volume_line(text, line, &policy)? else {
            continue;
        };
        if let Err(e) = volume.validate() {
            log::warn!("Validation problem on line {}: {}", line, e);
            log::warn!("  {}", text.trim());
        }
        detector.add(volume).map_err(|e| GeometryError::Format {
            line,
            reason: e.to_string(),
        })?;
        count += 1;
    }
    Ok(count)
}

/// Parse a materials table into `detector`
pub fn parse_materials(source: &str, detector: &mut Detector) -> GeometryResult<usize> {
    let mut count = 0;
    for (i, text) in source.lines().enumerate() {
        if split_fields(text).is_none() {
            continue;
        }
        let material = Material::parse_line(text).map_err(|e| GeometryError::Format {
            line: i + 1,
            reason: e.to_string(),
        })?;
        detector.add_material(material);
        count += 1;
    }
    Ok(count)
}

pub fn format_geometry(detector: &Detector) -> String {
    detector.iter().map(|v| format!("{}\n", v)).collect()
}

pub fn format_hits(detector: &Detector) -> String {
    detector
        .sensitivities()
        .iter()
        .map(|sd| format!("{}\n", sd.hit_line()))
        .collect()
}

pub fn format_banks(detector: &Detector) -> String {
    detector
        .sensitivities()
        .iter()
        .flat_map(|sd| sd.bank_lines())
        .map(|line| format!("{}\n", line))
        .collect()
}

pub fn format_materials(detector: &Detector, extended: bool) -> String {
    detector
        .materials()
        .iter()
        .map(|m| format!("{}\n", m.to_line(extended)))
        .collect()
}

/// Write through a temporary file in the target directory so readers never
/// see a half written table.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {:?}", dir))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write {:?}", path))?;
    file.persist(path)
        .with_context(|| format!("Failed to move table into place: {:?}", path))?;
    log::debug!("Wrote {:?}", path);
    Ok(())
}

/// Read a geometry table file into `detector`
pub fn read_geometry(path: impl AsRef<Path>, detector: &mut Detector) -> Result<usize> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read geometry file: {:?}", path))?;
    let count = parse_geometry(&source, detector)
        .with_context(|| format!("Failed to parse geometry file: {:?}", path))?;
    log::info!("Read {} volumes from {:?}", count, path);
    Ok(count)
}

/// Read a materials table file into `detector`
pub fn read_materials(path: impl AsRef<Path>, detector: &mut Detector) -> Result<usize> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read materials file: {:?}", path))?;
    let count = parse_materials(&source, detector)
        .with_context(|| format!("Failed to parse materials file: {:?}", path))?;
    log::info!("Read {} materials from {:?}", count, path);
    Ok(count)
}

/// Write `<det>__geometry_<variation>.txt` in `dir`, or `file_name` when given
pub fn write_geometry(detector: &Detector, dir: &Path, file_name: Option<&str>) -> Result<PathBuf> {
    let name = match file_name {
        Some(name) => name.to_string(),
        None => geometry_file_name(detector.name(), &detector.variation),
    };
    let path = dir.join(name);
    write_atomic(&path, &format_geometry(detector))?;
    Ok(path)
}

pub fn write_hits(detector: &Detector, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(hit_file_name(detector.name(), &detector.variation));
    write_atomic(&path, &format_hits(detector))?;
    Ok(path)
}

pub fn write_banks(detector: &Detector, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(bank_file_name(detector.name()));
    write_atomic(&path, &format_banks(detector))?;
    Ok(path)
}

pub fn write_materials(detector: &Detector, dir: &Path, extended: bool) -> Result<PathBuf> {
    let path = dir.join(materials_file_name(detector.name(), &detector.variation));
    write_atomic(&path, &format_materials(detector, extended))?;
    Ok(path)
}

/// Write every table the detector has content for
pub fn write_all(detector: &Detector, dir: &Path, extended_materials: bool) -> Result<Vec<PathBuf>> {
    let mut written = vec![write_geometry(detector, dir, None)?];
    if detector.sensitivities().is_empty() {
        log::info!("No sensitive detectors in {}, skipping hit and bank tables", detector.name());
    } else {
        written.push(write_hits(detector, dir)?);
        written.push(write_banks(detector, dir)?);
    }
    if detector.materials().is_empty() {
        log::debug!("No materials defined, not writing the materials table");
    } else {
        written.push(write_materials(detector, dir, extended_materials)?);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{RotationOrder, Unit, UnitSystem};

    const LINE: &str = "flux | root | Flux plane | 0*cm 0*cm 100*cm | ordered: zxy 0*deg 90*deg 0*deg | \
                        ff00005 | Tube | 0*mm 50*mm 1*mm 0*deg 360*deg | G4_AIR | no | 1 | 1 | 1 | 1 | 0 | \
                        flux | flux | id manual 1";

    #[test]
    fn test_parse_line() {
        let v = parse_volume_line(LINE, 1, &UnitPolicy::default()).unwrap().unwrap();
        assert_eq!(v.name, "flux");
        assert_eq!(v.shape, ShapeType::Tube);
        assert_eq!(v.rotation_order, RotationOrder::parse("zxy").unwrap());
        assert_eq!(v.dimensions.len(), 5);
        assert_eq!(v.style, 0);
        assert_eq!(v.identity, "id manual 1");
        assert_eq!(v.to_string(), LINE);
    }

    #[test]
    fn test_skip_and_reject() {
        let policy = UnitPolicy::default();
        assert!(parse_volume_line("", 1, &policy).unwrap().is_none());
        assert!(parse_volume_line("   ", 1, &policy).unwrap().is_none());
        assert!(parse_volume_line("# a | b | c", 1, &policy).unwrap().is_none());
        assert!(matches!(
            parse_volume_line("a | b | c", 7, &policy),
            Err(GeometryError::Format { line: 7, .. })
        ));
        let trailing = format!("{} |", LINE);
        assert!(parse_volume_line(&trailing, 1, &policy).unwrap().is_some());
    }

    #[test]
    fn test_bad_integer_column() {
        let bad = LINE.replace("| 1 | 1 | 1 | 1 | 0 |", "| one | 1 | 1 | 1 | 0 |");
        let err = parse_volume_line(&bad, 3, &UnitPolicy::default()).unwrap_err();
        assert!(err.to_string().contains("ncopy"));
    }

    #[test]
    fn test_forced_conversion() {
        let policy = UnitPolicy {
            base: UnitSystem::default(),
            force_conversion: true,
        };
        let v = parse_volume_line(LINE, 1, &policy).unwrap().unwrap();
        assert_eq!(v.dimensions.units()[1], Unit::Centimeter);
        assert!((v.dimensions.values()[1] - 5.0).abs() < 1e-12);
        assert_eq!(v.rotation.units()[1], Unit::Radian);
    }

    #[test]
    fn test_duplicate_names_fail() {
        let mut det = Detector::new("flux");
        let source = format!("{}\n\n{}\n", LINE, LINE);
        let err = parse_geometry(&source, &mut det).unwrap_err();
        assert!(matches!(err, GeometryError::Format { line: 3, .. }));
    }

    #[test]
    fn test_invalid_records_are_kept() {
        let mut det = Detector::new("flux");
        let bad = LINE.replace("ff00005", "purple");
        assert_eq!(parse_geometry(&bad, &mut det).unwrap(), 1);
        assert_eq!(det[0].color, "purple");
    }
}
