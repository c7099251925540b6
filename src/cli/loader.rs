// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Resolve command line inputs into detectors

use crate::config::EngineConfig;
use crate::detector::Detector;
use crate::io::{discover_geometry_files, import_geometry_file, load_gcard};
use anyhow::Result;
use std::path::{Path, PathBuf};

/// What a command line input points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    Gcard(PathBuf),
    Geometry(PathBuf),
    Directory(PathBuf),
}

impl InputKind {
    pub fn detect(path: &Path) -> Self {
        if path.is_dir() {
            return InputKind::Directory(path.to_path_buf());
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("gcard") || ext.eq_ignore_ascii_case("xml") => {
                InputKind::Gcard(path.to_path_buf())
            }
            _ => InputKind::Geometry(path.to_path_buf()),
        }
    }
}

/// Load every detector named by `inputs`: gcards, geometry tables, or
/// directories searched for geometry tables.
pub fn load_inputs(inputs: &[PathBuf], config: &EngineConfig) -> Result<Vec<Detector>> {
    let mut detectors = Vec::new();
    for input in inputs {
        match InputKind::detect(input) {
            InputKind::Gcard(path) => detectors.extend(load_gcard(&path, config)?),
            InputKind::Geometry(path) => detectors.push(import_geometry_file(&path, config)?),
            InputKind::Directory(dir) => {
                let files = discover_geometry_files(&dir)?;
                if files.is_empty() {
                    log::warn!("No geometry tables found below {:?}", dir);
                }
                for file in files {
                    detectors.push(import_geometry_file(&file, config)?);
                }
            }
        }
    }
    Ok(detectors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detect_kind() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            InputKind::detect(dir.path()),
            InputKind::Directory(dir.path().to_path_buf())
        );
        assert!(matches!(
            InputKind::detect(Path::new("clas12.gcard")),
            InputKind::Gcard(_)
        ));
        assert!(matches!(
            InputKind::detect(Path::new("ftof__geometry_original.txt")),
            InputKind::Geometry(_)
        ));
    }

    #[test]
    fn test_load_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("cube__geometry_original.txt"),
            "Test_Cube | root | Test Cube | 0*cm 0*cm 0*cm | 0*deg 0*deg 0*deg | ff0000 | Box | 1*cm 1*cm 1*cm | Vacuum | no | 1 | 1 | 1 | 1 | 1 | no | no | no\n",
        )
        .unwrap();
        let detectors = load_inputs(&[dir.path().to_path_buf()], &EngineConfig::default()).unwrap();
        assert_eq!(detectors.len(), 1);
        assert_eq!(detectors[0].name(), "cube");
        assert_eq!(detectors[0].len(), 1);
    }
}
