// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Shape types and their engine-ready solid parameters

use super::{Quantities, Unit, Volume};
use crate::error::{GeometryError, GeometryResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Boolean combination of two shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BooleanOp {
    Union,
    Subtraction,
    Intersection,
}

impl BooleanOp {
    pub fn symbol(self) -> char {
        match self {
            BooleanOp::Union => '+',
            BooleanOp::Subtraction => '-',
            BooleanOp::Intersection => '*',
        }
    }
}

/// Parsed `Operation:` shape type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BooleanOperation {
    /// `@` positions both operands in the mother frame; `~` is kept verbatim
    pub special: Option<char>,
    pub first: String,
    pub op: BooleanOp,
    pub second: String,
}

impl BooleanOperation {
    pub fn is_mother_relative(&self) -> bool {
        self.special == Some('@')
    }
}

/// The GEANT4 solid named in the type column of a volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ShapeType {
    Box,
    Tube,
    Sphere,
    Parallelepiped,
    Trd,
    G4Trap,
    G4GenericTrap,
    EllipticalTube,
    Eltu,
    Paraboloid,
    Ellipsoid,
    Cons,
    Polycone,
    Pgon,
    Polyhedra,
    Operation(BooleanOperation),
    CopyOf(String),
    /// Any other type string, preserved as written
    Other(String),
}

impl ShapeType {
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        match text {
            "Box" => ShapeType::Box,
            "Tube" => ShapeType::Tube,
            "Sphere" => ShapeType::Sphere,
            "Parallelepiped" => ShapeType::Parallelepiped,
            "Trd" => ShapeType::Trd,
            "G4Trap" => ShapeType::G4Trap,
            "G4GenericTrap" => ShapeType::G4GenericTrap,
            "EllipticalTube" => ShapeType::EllipticalTube,
            "Eltu" => ShapeType::Eltu,
            "Paraboloid" => ShapeType::Paraboloid,
            "Ellipsoid" => ShapeType::Ellipsoid,
            "Cons" => ShapeType::Cons,
            "Polycone" => ShapeType::Polycone,
            "Pgon" => ShapeType::Pgon,
            "Polyhedra" => ShapeType::Polyhedra,
            _ => {
                if text.starts_with("Operation:") {
                    match crate::io::parser::parse_operation(text) {
                        Some(op) => ShapeType::Operation(op),
                        None => ShapeType::Other(text.to_string()),
                    }
                } else if let Some(name) = text.strip_prefix("CopyOf ") {
                    ShapeType::CopyOf(name.trim().to_string())
                } else {
                    ShapeType::Other(text.to_string())
                }
            }
        }
    }

    /// Smallest number of dimensions the type can be built from
    pub fn min_dimensions(&self) -> usize {
        match self {
            ShapeType::Box | ShapeType::EllipticalTube | ShapeType::Eltu => 3,
            ShapeType::Tube | ShapeType::Paraboloid => 3,
            ShapeType::Sphere | ShapeType::Parallelepiped => 6,
            ShapeType::Trd | ShapeType::Ellipsoid => 5,
            ShapeType::G4Trap => 11,
            ShapeType::G4GenericTrap => 17,
            ShapeType::Cons => 7,
            ShapeType::Polycone => 3,
            ShapeType::Pgon | ShapeType::Polyhedra => 4,
            ShapeType::Operation(_) | ShapeType::CopyOf(_) | ShapeType::Other(_) => 0,
        }
    }

    pub fn is_primitive(&self) -> bool {
        !matches!(
            self,
            ShapeType::Operation(_) | ShapeType::CopyOf(_) | ShapeType::Other(_)
        )
    }
}

impl Default for ShapeType {
    fn default() -> Self {
        ShapeType::Other(String::new())
    }
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeType::Box => f.write_str("Box"),
            ShapeType::Tube => f.write_str("Tube"),
            ShapeType::Sphere => f.write_str("Sphere"),
            ShapeType::Parallelepiped => f.write_str("Parallelepiped"),
            ShapeType::Trd => f.write_str("Trd"),
            ShapeType::G4Trap => f.write_str("G4Trap"),
            ShapeType::G4GenericTrap => f.write_str("G4GenericTrap"),
            ShapeType::EllipticalTube => f.write_str("EllipticalTube"),
            ShapeType::Eltu => f.write_str("Eltu"),
            ShapeType::Paraboloid => f.write_str("Paraboloid"),
            ShapeType::Ellipsoid => f.write_str("Ellipsoid"),
            ShapeType::Cons => f.write_str("Cons"),
            ShapeType::Polycone => f.write_str("Polycone"),
            ShapeType::Pgon => f.write_str("Pgon"),
            ShapeType::Polyhedra => f.write_str("Polyhedra"),
            ShapeType::Operation(op) => {
                f.write_str("Operation:")?;
                if let Some(special) = op.special {
                    write!(f, "{}", special)?;
                }
                write!(f, " {} {} {}", op.first, op.op.symbol(), op.second)
            }
            ShapeType::CopyOf(name) => write!(f, "CopyOf {}", name),
            ShapeType::Other(text) => f.write_str(text),
        }
    }
}

impl From<String> for ShapeType {
    fn from(value: String) -> Self {
        ShapeType::parse(&value)
    }
}

impl From<&str> for ShapeType {
    fn from(value: &str) -> Self {
        ShapeType::parse(value)
    }
}

impl From<ShapeType> for String {
    fn from(shape: ShapeType) -> Self {
        shape.to_string()
    }
}

/// One z plane of a polycone or polyhedra, in cm
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZPlane {
    pub z: f64,
    pub rmin: f64,
    pub rmax: f64,
}

/// Solid parameters handed to a render backend. Lengths are in cm, angles
/// in degrees, with GEANT4 "start + delta" angles turned into start/end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Solid {
    Box {
        dx: f64,
        dy: f64,
        dz: f64,
    },
    Tube {
        rmin: f64,
        rmax: f64,
        dz: f64,
    },
    TubeSegment {
        rmin: f64,
        rmax: f64,
        dz: f64,
        phi1: f64,
        phi2: f64,
    },
    Sphere {
        rmin: f64,
        rmax: f64,
        phi1: f64,
        phi2: f64,
        theta1: f64,
        theta2: f64,
    },
    Parallelepiped {
        dx: f64,
        dy: f64,
        dz: f64,
        alpha: f64,
        theta: f64,
        phi: f64,
    },
    Trd {
        dx1: f64,
        dx2: f64,
        dy1: f64,
        dy2: f64,
        dz: f64,
    },
    Trap {
        dz: f64,
        theta: f64,
        phi: f64,
        h1: f64,
        bl1: f64,
        tl1: f64,
        alpha1: f64,
        h2: f64,
        bl2: f64,
        tl2: f64,
        alpha2: f64,
    },
    Arb8 {
        dz: f64,
        vertices: [[f64; 2]; 8],
    },
    EllipticalTube {
        dx: f64,
        dy: f64,
        dz: f64,
    },
    Paraboloid {
        rlo: f64,
        rhi: f64,
        dz: f64,
    },
    Ellipsoid {
        ax: f64,
        by: f64,
        cz: f64,
        zcut1: f64,
        zcut2: f64,
    },
    ConeSegment {
        dz: f64,
        rmin1: f64,
        rmax1: f64,
        rmin2: f64,
        rmax2: f64,
        phi1: f64,
        phi2: f64,
    },
    Polycone {
        phi_start: f64,
        dphi: f64,
        planes: Vec<ZPlane>,
    },
    Polyhedra {
        phi_start: f64,
        dphi: f64,
        sides: u32,
        planes: Vec<ZPlane>,
    },
}

/// Reads the dimension list of one volume
struct Dims<'a> {
    volume: &'a Volume,
    dims: &'a Quantities,
}

impl<'a> Dims<'a> {
    fn require(&self, expected: usize) -> GeometryResult<()> {
        if self.dims.len() < expected {
            return Err(GeometryError::Dimensions {
                volume: self.volume.name.clone(),
                shape: self.volume.shape.to_string(),
                expected,
                found: self.dims.len(),
            });
        }
        Ok(())
    }

    fn cm(&self, i: usize) -> GeometryResult<f64> {
        self.dims.value_in(i, &Unit::Centimeter)
    }

    fn deg(&self, i: usize) -> GeometryResult<f64> {
        self.dims.value_in(i, &Unit::Degree)
    }

    fn raw(&self, i: usize) -> f64 {
        self.dims.values().get(i).copied().unwrap_or(0.0)
    }

    fn count(&self, i: usize) -> GeometryResult<usize> {
        let value = self.raw(i);
        if value < 0.0 || value.fract() != 0.0 {
            return Err(GeometryError::Parse(format!(
                "volume '{}': dimension {} should be a count, found {}",
                self.volume.name, i, value
            )));
        }
        Ok(value as usize)
    }

    fn planes(&self, offset: usize, n: usize) -> GeometryResult<Vec<ZPlane>> {
        self.require(offset + 3 * n)?;
        (0..n)
            .map(|p| {
                Ok(ZPlane {
                    rmin: self.cm(offset + p)?,
                    rmax: self.cm(offset + n + p)?,
                    z: self.cm(offset + 2 * n + p)?,
                })
            })
            .collect()
    }
}

impl Solid {
    /// Convert the dimensions of a primitive volume into solid parameters.
    ///
    /// Boolean operations, copies and unknown types are not primitives and
    /// are resolved by the renderer.
    pub fn from_volume(volume: &Volume) -> GeometryResult<Solid> {
        let d = Dims {
            volume,
            dims: &volume.dimensions,
        };
        d.require(volume.shape.min_dimensions())?;

        let solid = match &volume.shape {
            ShapeType::Box => Solid::Box {
                dx: d.cm(0)?,
                dy: d.cm(1)?,
                dz: d.cm(2)?,
            },
            ShapeType::Tube => {
                let full = d.dims.len() == 3 || {
                    d.require(5)?;
                    d.raw(3) <= 0.0 && d.deg(4)? >= 360.0
                };
                if full {
                    Solid::Tube {
                        rmin: d.cm(0)?,
                        rmax: d.cm(1)?,
                        dz: d.cm(2)?,
                    }
                } else {
                    let phi1 = d.deg(3)?;
                    Solid::TubeSegment {
                        rmin: d.cm(0)?,
                        rmax: d.cm(1)?,
                        dz: d.cm(2)?,
                        phi1,
                        phi2: phi1 + d.deg(4)?,
                    }
                }
            }
            ShapeType::Sphere => {
                let phi1 = d.deg(2)?;
                let theta1 = d.deg(4)?;
                Solid::Sphere {
                    rmin: d.cm(0)?,
                    rmax: d.cm(1)?,
                    phi1,
                    phi2: phi1 + d.deg(3)?,
                    theta1,
                    theta2: theta1 + d.deg(5)?,
                }
            }
            ShapeType::Parallelepiped => Solid::Parallelepiped {
                dx: d.cm(0)?,
                dy: d.cm(1)?,
                dz: d.cm(2)?,
                alpha: d.deg(3)?,
                theta: d.deg(4)?,
                phi: d.deg(5)?,
            },
            ShapeType::Trd => Solid::Trd {
                dx1: d.cm(0)?,
                dx2: d.cm(1)?,
                dy1: d.cm(2)?,
                dy2: d.cm(3)?,
                dz: d.cm(4)?,
            },
            ShapeType::G4Trap => Solid::Trap {
                dz: d.cm(0)?,
                theta: d.deg(1)?,
                phi: d.deg(2)?,
                h1: d.cm(3)?,
                bl1: d.cm(4)?,
                tl1: d.cm(5)?,
                alpha1: d.deg(6)?,
                h2: d.cm(7)?,
                bl2: d.cm(8)?,
                tl2: d.cm(9)?,
                alpha2: d.deg(10)?,
            },
            ShapeType::G4GenericTrap => {
                let mut vertices = [[0.0; 2]; 8];
                for (i, vertex) in vertices.iter_mut().enumerate() {
                    *vertex = [d.cm(2 * i + 1)?, d.cm(2 * i + 2)?];
                }
                Solid::Arb8 {
                    dz: d.cm(0)?,
                    vertices,
                }
            }
            ShapeType::EllipticalTube | ShapeType::Eltu => Solid::EllipticalTube {
                dx: d.cm(0)?,
                dy: d.cm(1)?,
                dz: d.cm(2)?,
            },
            ShapeType::Paraboloid => Solid::Paraboloid {
                rlo: d.cm(1)?,
                rhi: d.cm(2)?,
                dz: d.cm(0)?,
            },
            ShapeType::Ellipsoid => {
                let cz = d.cm(2)?;
                let mut zcut1 = d.cm(3)?;
                let mut zcut2 = d.cm(4)?;
                if (zcut1 == 0.0 && zcut2 == 0.0) || zcut1 >= zcut2 {
                    zcut1 = -cz;
                    zcut2 = cz;
                }
                Solid::Ellipsoid {
                    ax: d.cm(0)?,
                    by: d.cm(1)?,
                    cz,
                    zcut1,
                    zcut2,
                }
            }
            ShapeType::Cons => {
                let phi1 = d.deg(5)?;
                Solid::ConeSegment {
                    dz: d.cm(4)?,
                    rmin1: d.cm(0)?,
                    rmax1: d.cm(1)?,
                    rmin2: d.cm(2)?,
                    rmax2: d.cm(3)?,
                    phi1,
                    phi2: phi1 + d.deg(6)?,
                }
            }
            ShapeType::Polycone => {
                let n = d.count(2)?;
                Solid::Polycone {
                    phi_start: d.deg(0)?,
                    dphi: d.deg(1)?,
                    planes: d.planes(3, n)?,
                }
            }
            ShapeType::Pgon | ShapeType::Polyhedra => {
                let sides = d.count(2)? as u32;
                let n = d.count(3)?;
                Solid::Polyhedra {
                    phi_start: d.deg(0)?,
                    dphi: d.deg(1)?,
                    sides,
                    planes: d.planes(4, n)?,
                }
            }
            ShapeType::Operation(_) | ShapeType::CopyOf(_) | ShapeType::Other(_) => {
                return Err(GeometryError::UnsupportedShape {
                    volume: volume.name.clone(),
                    shape: volume.shape.to_string(),
                })
            }
        };
        Ok(solid)
    }
}
