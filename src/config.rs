// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Engine configuration

use crate::detector::{Detector, DEFAULT_VARIATION};
use crate::geometry::{UnitPolicy, UnitSystem};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File picked up from the working directory by [`EngineConfig::load`]
pub const CONFIG_FILE: &str = "detgeom.toml";

/// Settings shared by the converters, the database writer and the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base length and angle units, e.g. "cm rad"
    pub base_units: String,
    /// Convert every parsed value into the base units
    pub force_unit_conversion: bool,
    /// GEMC table layout to write (1 or 2)
    pub gemc_version: u32,
    /// Write the extended (GEMC 2.3+) material columns
    pub extended_materials: bool,
    pub variation: String,
    /// Table id; 0 or less picks the next free id when writing
    pub table_id: i64,
    /// SQLite file used by `db-write` and `db-read`
    pub database: PathBuf,
    /// Half length of the `root` world box in cm
    pub root_half_length: f64,
    /// Medium used when a material is unknown to the renderer
    pub fallback_material: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_units: "cm rad".to_string(),
            force_unit_conversion: false,
            gemc_version: 2,
            extended_materials: true,
            variation: DEFAULT_VARIATION.to_string(),
            table_id: 1,
            database: PathBuf::from("gemc_geometry.sqlite"),
            root_half_length: 1000.0,
            fallback_material: "Aluminum".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: EngineConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load `detgeom.toml` (or defaults) and apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = if PathBuf::from(CONFIG_FILE).exists() {
            Self::from_file(CONFIG_FILE)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `DETGEOM_*` overrides from a variable lookup
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(variation) = var("DETGEOM_VARIATION") {
            self.variation = variation;
        }
        if let Some(database) = var("DETGEOM_DATABASE") {
            self.database = PathBuf::from(database);
        }
        if let Some(force) = var("DETGEOM_FORCE_UNITS") {
            self.force_unit_conversion = matches!(force.trim(), "1" | "true" | "yes");
        }
        if let Some(units) = var("DETGEOM_BASE_UNITS") {
            self.base_units = units;
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    pub fn unit_policy(&self) -> Result<UnitPolicy> {
        let base = UnitSystem::parse(&self.base_units)
            .with_context(|| format!("Invalid base units '{}'", self.base_units))?;
        Ok(UnitPolicy {
            base,
            force_conversion: self.force_unit_conversion,
        })
    }

    /// Empty detector carrying these settings
    pub fn detector(&self, name: &str) -> Result<Detector> {
        Ok(Detector::new(name)
            .with_variation(self.variation.clone())
            .with_table_id(self.table_id)
            .with_gemc_version(self.gemc_version)
            .with_units(self.unit_policy()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Unit;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("detgeom.toml");
        let config = EngineConfig {
            variation: "rga_fall2018".into(),
            table_id: 0,
            ..EngineConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(EngineConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("detgeom.toml");
        std::fs::write(&path, "base_units = \"mm deg\"\n").unwrap();
        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.variation, "original");
        let policy = config.unit_policy().unwrap();
        assert_eq!(policy.base.length, Unit::Millimeter);
        assert_eq!(policy.base.angle, Unit::Degree);
    }

    #[test]
    fn test_overrides() {
        let mut config = EngineConfig::default();
        config.apply_overrides(|key| match key {
            "DETGEOM_VARIATION" => Some("test".into()),
            "DETGEOM_FORCE_UNITS" => Some("true".into()),
            _ => None,
        });
        assert_eq!(config.variation, "test");
        assert!(config.force_unit_conversion);
        assert_eq!(config.database, PathBuf::from("gemc_geometry.sqlite"));

        let det = config.detector("ftof").unwrap();
        assert_eq!(det.variation, "test");
        assert!(det.units.force_conversion);
    }

    #[test]
    fn test_bad_units() {
        let config = EngineConfig {
            base_units: "furlong".into(),
            ..EngineConfig::default()
        };
        assert!(config.unit_policy().is_err());
    }
}
