// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Media used when rendering a detector

use crate::detector::Detector;
use serde::{Deserialize, Serialize};

/// Material name for shapes that only take part in boolean operations
pub const COMPONENT: &str = "Component";

/// Transparency given to vacuum when the volume does not ask for one
pub const VACUUM_TRANSPARENCY: u8 = 80;

/// What a medium is made of. Densities are in g/cm3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Composition {
    Vacuum,
    Element { a: f64, z: u32, density: f64 },
    /// Element symbols with their weight fractions or atom counts
    Mixture {
        density: f64,
        elements: Vec<(String, f64)>,
    },
}

/// A material at a given transparency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medium {
    pub name: String,
    pub material: String,
    pub composition: Composition,
    pub transparency: u8,
}

fn mixture(density: f64, elements: &[(&str, f64)]) -> Composition {
    Composition::Mixture {
        density,
        elements: elements
            .iter()
            .map(|(symbol, fraction)| (symbol.to_string(), *fraction))
            .collect(),
    }
}

/// Built-in materials plus the ones a detector defines itself
#[derive(Debug, Clone)]
pub struct MaterialLibrary {
    fallback: String,
}

impl Default for MaterialLibrary {
    fn default() -> Self {
        Self::new("Aluminum")
    }
}

impl MaterialLibrary {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            fallback: fallback.into(),
        }
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn builtin(name: &str) -> Option<Composition> {
        let composition = match name {
            "Vacuum" | "G4_Galactic" => Composition::Vacuum,
            "Air" | "G4_AIR" => mixture(0.00129, &[("N", 0.7), ("O", 0.3)]),
            "Fe" | "Iron" | "G4_Fe" => Composition::Element {
                a: 55.845,
                z: 26,
                density: 7.87,
            },
            "Cu" | "Copper" | "G4_Cu" => Composition::Element {
                a: 63.546,
                z: 29,
                density: 8.96,
            },
            "Si" | "Silicon" | "Quartz" | "G4_Si" => Composition::Element {
                a: 28.0855,
                z: 14,
                density: 2.33,
            },
            "StainlessSteel" => mixture(
                8.02,
                &[("Mn", 0.02), ("Si", 0.01), ("Cr", 0.19), ("Ni", 0.10), ("Fe", 0.68)],
            ),
            "G4_Concrete" | "G4_CONCRETE" => mixture(
                2.4,
                &[
                    ("H", 0.01),
                    ("C", 0.001),
                    ("O", 0.529107),
                    ("Na", 0.016),
                    ("Mg", 0.002),
                    ("Al", 0.033872),
                    ("Si", 0.337021),
                    ("K", 0.013),
                    ("Ca", 0.044),
                    ("Fe", 0.014),
                ],
            ),
            "W" | "Tungsten" | "G4_W" => Composition::Element {
                a: 183.84,
                z: 74,
                density: 19.25,
            },
            "LeadTungsten" => mixture(8.28, &[("Pb", 1.0), ("W", 1.0), ("O", 4.0)]),
            "Scintillator" | "ScintillatorB" | "scintillator" => {
                mixture(1.032, &[("C", 9.0), ("H", 10.0)])
            }
            "Aluminum" | "G4_Al" => Composition::Element {
                a: 26.98,
                z: 13,
                density: 2.7,
            },
            _ => return None,
        };
        Some(composition)
    }

    fn user_defined(detector: &Detector, material: &str) -> Option<Composition> {
        let m = detector.find_material(material)?;
        Some(Composition::Mixture {
            density: m.density,
            elements: m
                .components
                .iter()
                .map(|(element, fraction)| {
                    let symbol = element.strip_prefix("G4_").unwrap_or(element);
                    (symbol.to_string(), *fraction)
                })
                .collect(),
        })
    }

    fn composition(&self, detector: &Detector, material: &str) -> (String, Composition) {
        if let Some(c) = Self::user_defined(detector, material).or_else(|| Self::builtin(material)) {
            return (material.to_string(), c);
        }
        log::warn!(
            "The material {} has not been defined, using {} instead",
            material,
            self.fallback
        );
        match Self::builtin(&self.fallback) {
            Some(c) => (self.fallback.clone(), c),
            None => {
                log::warn!("Fallback material {} is unknown, using Aluminum", self.fallback);
                let c = Self::builtin("Aluminum").unwrap_or(Composition::Vacuum);
                ("Aluminum".to_string(), c)
            }
        }
    }

    /// Resolve `material` to a medium with the given transparency
    pub fn resolve(&self, detector: &Detector, material: &str, transparency: u8) -> Medium {
        let (resolved, composition) = self.composition(detector, material);
        let transparency = match &composition {
            Composition::Vacuum if transparency == 0 => VACUUM_TRANSPARENCY,
            _ => transparency,
        };
        Medium {
            name: medium_key(&resolved, transparency),
            material: resolved,
            composition,
            transparency,
        }
    }
}

/// Cache key of a material at a transparency
pub fn medium_key(material: &str, transparency: u8) -> String {
    format!("{}_{}", material, transparency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Material;

    #[test]
    fn test_builtin_aliases() {
        assert_eq!(
            MaterialLibrary::builtin("Iron"),
            MaterialLibrary::builtin("G4_Fe")
        );
        assert!(MaterialLibrary::builtin("Unobtainium").is_none());
    }

    #[test]
    fn test_vacuum_transparency() {
        let det = Detector::new("test");
        let lib = MaterialLibrary::default();
        let vac = lib.resolve(&det, "Vacuum", 0);
        assert_eq!(vac.transparency, 80);
        assert_eq!(vac.name, "Vacuum_80");
        assert_eq!(lib.resolve(&det, "Vacuum", 30).transparency, 30);
    }

    #[test]
    fn test_fallback() {
        let det = Detector::new("test");
        let medium = MaterialLibrary::default().resolve(&det, "Unobtainium", 0);
        assert_eq!(medium.material, "Aluminum");
        assert_eq!(medium.name, "Aluminum_0");
    }

    #[test]
    fn test_user_material_first() {
        let mut det = Detector::new("test");
        det.add_material(
            Material::from_component_str("Iron", "custom iron", 7.0, "G4_Fe 1.0").unwrap(),
        );
        let medium = MaterialLibrary::default().resolve(&det, "Iron", 0);
        assert_eq!(
            medium.composition,
            Composition::Mixture {
                density: 7.0,
                elements: vec![("Fe".to_string(), 1.0)]
            }
        );
    }
}
