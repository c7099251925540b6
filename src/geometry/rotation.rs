// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Rotation order and placement transforms

use crate::error::{GeometryError, GeometryResult};
use nalgebra::{Matrix4, Rotation3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn from_char(c: char) -> Option<Self> {
        match c {
            'x' | 'X' => Some(Axis::X),
            'y' | 'Y' => Some(Axis::Y),
            'z' | 'Z' => Some(Axis::Z),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            Axis::X => 'x',
            Axis::Y => 'y',
            Axis::Z => 'z',
        }
    }

    pub fn unit_vector(self) -> Vector3<f64> {
        match self {
            Axis::X => Vector3::x(),
            Axis::Y => Vector3::y(),
            Axis::Z => Vector3::z(),
        }
    }
}

/// Order in which the three rotation angles are applied.
///
/// The implicit order (no `ordered:` prefix in the text column) is `xyz` and
/// is kept distinct from an explicit `xyz` so the text round-trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RotationOrder {
    axes: Option<[Axis; 3]>,
}

impl RotationOrder {
    pub fn parse(text: &str) -> GeometryResult<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Self::default());
        }
        let axes: Vec<Axis> = text.chars().filter_map(Axis::from_char).collect();
        let is_permutation = axes.len() == 3
            && text.chars().count() == 3
            && axes[0] != axes[1]
            && axes[1] != axes[2]
            && axes[0] != axes[2];
        if !is_permutation {
            return Err(GeometryError::RotationOrder(text.to_string()));
        }
        Ok(Self {
            axes: Some([axes[0], axes[1], axes[2]]),
        })
    }

    pub fn explicit(axes: [Axis; 3]) -> Self {
        Self { axes: Some(axes) }
    }

    pub fn axes(&self) -> [Axis; 3] {
        self.axes.unwrap_or([Axis::X, Axis::Y, Axis::Z])
    }

    pub fn is_explicit(&self) -> bool {
        self.axes.is_some()
    }
}

impl fmt::Display for RotationOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(axes) = self.axes {
            for axis in axes {
                write!(f, "{}", axis.as_char())?;
            }
        }
        Ok(())
    }
}

impl TryFrom<String> for RotationOrder {
    type Error = GeometryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RotationOrder> for String {
    fn from(order: RotationOrder) -> Self {
        order.to_string()
    }
}

/// Frame rotation built from successive rotations about the axes in `order`.
///
/// Each step multiplies on the left, so the first listed axis is applied first.
pub fn frame_rotation(angles_rad: [f64; 3], order: RotationOrder) -> Rotation3<f64> {
    order
        .axes()
        .iter()
        .zip(angles_rad)
        .fold(Rotation3::identity(), |acc, (axis, angle)| {
            let step = Rotation3::from_axis_angle(&nalgebra::Unit::new_unchecked(axis.unit_vector()), angle);
            step * acc
        })
}

/// Translation plus the rotation applied to an object when it is placed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Offset in cm
    pub translation: Vector3<f64>,
    /// Active rotation of the object, the inverse of its frame rotation
    pub rotation: Rotation3<f64>,
}

impl Placement {
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: Rotation3::identity(),
        }
    }

    /// Build from a GEANT4 style frame rotation
    pub fn from_frame(translation: Vector3<f64>, frame: Rotation3<f64>) -> Self {
        Self {
            translation,
            rotation: frame.inverse(),
        }
    }

    /// The frame rotation this placement was built from
    pub fn frame(&self) -> Rotation3<f64> {
        self.rotation.inverse()
    }

    /// Placement of `second` expressed in the frame of `first`.
    ///
    /// Used for `Operation:@` where both operands are positioned in the mother.
    pub fn relative_to(&self, first: &Placement) -> Placement {
        let frame_first = first.frame();
        let translation = frame_first * (self.translation - first.translation);
        let frame = self.frame() * frame_first.inverse();
        Placement::from_frame(translation, frame)
    }

    pub fn to_homogeneous(&self) -> Matrix4<f64> {
        let mut m = self.rotation.to_homogeneous();
        m[(0, 3)] = self.translation.x;
        m[(1, 3)] = self.translation.y;
        m[(2, 3)] = self.translation.z;
        m
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_order_parse() {
        assert!(!RotationOrder::parse("").unwrap().is_explicit());
        assert_eq!(
            RotationOrder::parse("zxy").unwrap().axes(),
            [Axis::Z, Axis::X, Axis::Y]
        );
        assert_eq!(RotationOrder::parse("xzy").unwrap().to_string(), "xzy");
        assert!(RotationOrder::parse("xxy").is_err());
        assert!(RotationOrder::parse("xy").is_err());
        assert!(RotationOrder::parse("xyzw").is_err());
    }

    #[test]
    fn test_single_axis_rotation() {
        let r = frame_rotation([0.0, 0.0, FRAC_PI_2], RotationOrder::default());
        let v = r * Vector3::x();
        assert_relative_eq!(v, Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn test_order_matters() {
        let angles = [FRAC_PI_2, FRAC_PI_2, 0.0];
        let xyz = frame_rotation(angles, RotationOrder::default());
        let yxz = frame_rotation(angles, RotationOrder::parse("yxz").unwrap());
        assert!((xyz.matrix() - yxz.matrix()).norm() > 1e-6);
    }

    #[test]
    fn test_placement_inverse() {
        let frame = frame_rotation([0.3, -0.2, 1.1], RotationOrder::default());
        let p = Placement::from_frame(Vector3::new(1.0, 2.0, 3.0), frame);
        assert_relative_eq!(p.frame().matrix(), frame.matrix(), epsilon = 1e-12);
        let m = p.to_homogeneous();
        assert_relative_eq!(m[(1, 3)], 2.0);
    }

    #[test]
    fn test_relative_placement() {
        let first = Placement::from_frame(Vector3::new(1.0, 0.0, 0.0), Rotation3::identity());
        let second = Placement::from_frame(Vector3::new(3.0, 1.0, 0.0), Rotation3::identity());
        let rel = second.relative_to(&first);
        assert_relative_eq!(rel.translation, Vector3::new(2.0, 1.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(rel.rotation.matrix(), Rotation3::identity().matrix(), epsilon = 1e-12);
    }
}
