// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry file importer

use super::text;
use crate::config::EngineConfig;
use crate::detector::Detector;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const GEOMETRY_MARKER: &str = "__geometry_";

/// Split `<det>__geometry_<variation>.txt` into detector name and variation
pub fn split_geometry_file_name(path: &Path) -> Option<(String, String)> {
    let stem = path.file_name()?.to_str()?.strip_suffix(".txt")?;
    let (detector, variation) = stem.split_once(GEOMETRY_MARKER)?;
    if detector.is_empty() || variation.is_empty() {
        return None;
    }
    Some((detector.to_string(), variation.to_string()))
}

/// Import a geometry table file, plus the matching materials table when it
/// sits next to it.
pub fn import_geometry_file(path: impl AsRef<Path>, config: &EngineConfig) -> Result<Detector> {
    let path = path.as_ref();
    let (name, variation) = match split_geometry_file_name(path) {
        Some(parts) => parts,
        None => {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .with_context(|| format!("Not a file name: {:?}", path))?;
            (stem.to_string(), config.variation.clone())
        }
    };

    let mut detector = config.detector(&name)?.with_variation(variation);
    text::read_geometry(path, &mut detector)?;

    let materials = path.with_file_name(text::materials_file_name(&name, &detector.variation));
    if materials.exists() {
        text::read_materials(&materials, &mut detector)?;
    }
    Ok(detector)
}

/// Geometry tables in `root`: the file itself, or every
/// `*__geometry_*.txt` below a directory, sorted by path.
pub fn discover_geometry_files(root: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    if !root.is_dir() {
        bail!("No such file or directory: {:?}", root);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.with_context(|| format!("Failed to walk {:?}", root))?;
        if entry.file_type().is_file() && split_geometry_file_name(entry.path()).is_some() {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const LINE: &str = "box | root | a box | 0*cm 0*cm 0*cm | 0*deg 0*deg 0*deg | ff0000 | Box | \
                        1*cm 1*cm 1*cm | Scint | no | 1 | 1 | 1 | 1 | 1 | no | no | no";

    #[test]
    fn test_split_file_name() {
        assert_eq!(
            split_geometry_file_name(Path::new("/x/ftof__geometry_rga_fall2018.txt")),
            Some(("ftof".to_string(), "rga_fall2018".to_string()))
        );
        assert!(split_geometry_file_name(Path::new("ftof__bank.txt")).is_none());
        assert!(split_geometry_file_name(Path::new("ftof__geometry_.txt")).is_none());
    }

    #[test]
    fn test_import_geometry_file() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("hodo__geometry_test.txt");
        let mut file = std::fs::File::create(&path)?;
        writeln!(file, "{}", LINE)?;
        std::fs::write(
            dir.path().join("hodo__materials_test.txt"),
            "Scint | plastic | 1.03 | 2 | C 9 H 10 | none | none | none | none | none\n",
        )?;

        let det = import_geometry_file(&path, &EngineConfig::default())?;
        assert_eq!(det.name(), "hodo");
        assert_eq!(det.variation, "test");
        assert_eq!(det.len(), 1);
        assert_eq!(det.materials().len(), 1);
        Ok(())
    }

    #[test]
    fn test_discover() -> Result<()> {
        let dir = TempDir::new()?;
        std::fs::create_dir(dir.path().join("sub"))?;
        std::fs::write(dir.path().join("b__geometry_original.txt"), LINE)?;
        std::fs::write(dir.path().join("sub/a__geometry_original.txt"), LINE)?;
        std::fs::write(dir.path().join("a__bank.txt"), "")?;

        let files = discover_geometry_files(dir.path())?;
        assert_eq!(files.len(), 2);
        assert!(discover_geometry_files(dir.path().join("missing")).is_err());
        Ok(())
    }
}
