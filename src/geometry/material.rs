// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! User defined materials

use crate::error::{GeometryError, GeometryResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of optical-property columns added by the extended material format
const EXTENDED_COLUMNS: usize = 7;
const BASE_COLUMNS: usize = 10;

/// A material that is not predefined by GEANT4 or GEMC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub description: String,
    /// g/cm3
    pub density: f64,
    /// Element or material name with its mass fraction (or atom count)
    pub components: Vec<(String, f64)>,
    pub photon_energy: String,
    pub index_of_refraction: String,
    pub absorption_length: String,
    pub reflectivity: String,
    pub efficiency: String,
}

impl Material {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        density: f64,
        components: Vec<(String, f64)>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            density,
            components,
            photon_energy: "none".into(),
            index_of_refraction: "none".into(),
            absorption_length: "none".into(),
            reflectivity: "none".into(),
            efficiency: "none".into(),
        }
    }

    /// Components given as `"H 0.1 C 0.4"`
    pub fn from_component_str(
        name: impl Into<String>,
        description: impl Into<String>,
        density: f64,
        components: &str,
    ) -> GeometryResult<Self> {
        Ok(Self::new(name, description, density, parse_components(components)?))
    }

    pub fn component_text(&self) -> String {
        self.components
            .iter()
            .map(|(element, fraction)| format!("{} {}", element, fraction))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The `|` separated material line. The extended layout (GEMC 2.3 and
    /// later) appends seven `none` optical columns.
    pub fn to_line(&self, extended: bool) -> String {
        let mut columns = vec![
            self.name.clone(),
            self.description.clone(),
            self.density.to_string(),
            self.components.len().to_string(),
            self.component_text(),
            self.photon_energy.clone(),
            self.index_of_refraction.clone(),
            self.absorption_length.clone(),
            self.reflectivity.clone(),
            self.efficiency.clone(),
        ];
        if extended {
            columns.extend(std::iter::repeat("none".to_string()).take(EXTENDED_COLUMNS));
        }
        columns.join(" | ")
    }

    /// Parse a material line in either layout
    pub fn parse_line(line: &str) -> GeometryResult<Self> {
        let fields: Vec<&str> = line.split('|').map(str::trim).collect();
        if fields.len() != BASE_COLUMNS && fields.len() != BASE_COLUMNS + EXTENDED_COLUMNS {
            return Err(GeometryError::Parse(format!(
                "material line has {} columns, expected {} or {}",
                fields.len(),
                BASE_COLUMNS,
                BASE_COLUMNS + EXTENDED_COLUMNS
            )));
        }
        let density = fields[2].parse::<f64>().map_err(|e| {
            GeometryError::Parse(format!("bad density '{}' for {}: {}", fields[2], fields[0], e))
        })?;
        let components = parse_components(fields[4])?;
        if let Ok(count) = fields[3].parse::<usize>() {
            if count != components.len() {
                log::warn!(
                    "Material {} declares {} components but lists {}",
                    fields[0],
                    count,
                    components.len()
                );
            }
        }
        let mut material = Self::new(fields[0], fields[1], density, components);
        material.photon_energy = fields[5].to_string();
        material.index_of_refraction = fields[6].to_string();
        material.absorption_length = fields[7].to_string();
        material.reflectivity = fields[8].to_string();
        material.efficiency = fields[9].to_string();
        Ok(material)
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line(true))
    }
}

/// Split `"H 0.1 C 0.4"` into element/fraction pairs
pub fn parse_components(text: &str) -> GeometryResult<Vec<(String, f64)>> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() % 2 != 0 {
        return Err(GeometryError::Parse(format!(
            "material components '{}' are not name/fraction pairs",
            text
        )));
    }
    tokens
        .chunks(2)
        .map(|pair| {
            let fraction = pair[1].parse::<f64>().map_err(|e| {
                GeometryError::Parse(format!("bad fraction '{}' for {}: {}", pair[1], pair[0], e))
            })?;
            Ok((pair[0].to_string(), fraction))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scint() -> Material {
        Material::from_component_str("ScintPS", "Polystyrene", 1.032, "G4_C 0.915 G4_H 0.085").unwrap()
    }

    #[test]
    fn test_components_from_string() {
        let m = scint();
        assert_eq!(m.components.len(), 2);
        assert_eq!(m.components[1], ("G4_H".to_string(), 0.085));
        assert!(parse_components("H 0.1 C").is_err());
        assert!(parse_components("H x").is_err());
    }

    #[test]
    fn test_line_layouts() {
        let m = scint();
        let short = m.to_line(false);
        assert_eq!(
            short,
            "ScintPS | Polystyrene | 1.032 | 2 | G4_C 0.915 G4_H 0.085 | none | none | none | none | none"
        );
        assert_eq!(m.to_line(true).split('|').count(), 17);
    }

    #[test]
    fn test_parse_line() {
        let m = scint();
        assert_eq!(Material::parse_line(&m.to_line(true)).unwrap(), m);
        assert_eq!(Material::parse_line(&m.to_line(false)).unwrap(), m);
        assert!(Material::parse_line("a | b | c").is_err());
    }
}
