// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! A single placed volume of a detector

use super::{
    frame_rotation, ColorAlpha, Placement, Quantities, RotationOrder, SensitiveDetector, ShapeType,
    Unit,
};
use crate::error::{GeometryError, GeometryResult};
use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the implicit top volume every detector hangs from
pub const ROOT_VOLUME: &str = "root";

/// Column names of the GEMC geometry table, in file order
pub const COLUMN_NAMES: [&str; 18] = [
    "name",
    "mother",
    "description",
    "pos",
    "rot",
    "col",
    "type",
    "dimensions",
    "material",
    "magfield",
    "ncopy",
    "pmany",
    "exist",
    "visible",
    "style",
    "sensitivity",
    "hitType",
    "identity",
];

/// One row of a GEMC geometry table.
///
/// Every field maps onto one column of the text format, see [`COLUMN_NAMES`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub name: String,
    pub mother: String,
    pub description: String,
    pub position: Quantities,
    pub rotation: Quantities,
    pub rotation_order: RotationOrder,
    /// `rrggbb[a]`, kept as written
    pub color: String,
    pub shape: ShapeType,
    pub dimensions: Quantities,
    pub material: String,
    pub magfield: String,
    pub ncopy: i64,
    pub pmany: i64,
    pub exist: u8,
    pub visible: u8,
    /// 0 wireframe, 1 solid
    pub style: u8,
    pub sensitivity: String,
    pub hit_type: String,
    pub identity: String,
}

impl Default for Volume {
    fn default() -> Self {
        Self::new("unknown")
    }
}

impl Volume {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mother: ROOT_VOLUME.to_string(),
            description: String::new(),
            position: Quantities::zeros(3, Unit::Centimeter),
            rotation: Quantities::zeros(3, Unit::Radian),
            rotation_order: RotationOrder::default(),
            color: "000000".to_string(),
            shape: ShapeType::default(),
            dimensions: Quantities::empty(),
            material: "Vacuum".to_string(),
            magfield: "no".to_string(),
            ncopy: 1,
            pmany: 1,
            exist: 1,
            visible: 1,
            style: 1,
            sensitivity: "no".to_string(),
            hit_type: String::new(),
            identity: String::new(),
        }
    }

    pub fn with_mother(mut self, mother: impl Into<String>) -> Self {
        self.mother = mother.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_position(mut self, position: [f64; 3], unit: Unit) -> Self {
        self.position = Quantities::uniform(position.to_vec(), unit);
        self
    }

    pub fn with_rotation(mut self, angles: [f64; 3], unit: Unit) -> Self {
        self.rotation = Quantities::uniform(angles.to_vec(), unit);
        self
    }

    pub fn with_rotation_order(mut self, order: RotationOrder) -> Self {
        self.rotation_order = order;
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn with_shape(mut self, shape: impl Into<ShapeType>) -> Self {
        self.shape = shape.into();
        self
    }

    pub fn with_dimensions(mut self, dims: impl Into<Vec<f64>>, unit: Unit) -> Self {
        self.dimensions = Quantities::uniform(dims, unit);
        self
    }

    /// Dimensions with mixed units, e.g. a polycone's angles, counts and lengths
    pub fn with_quantities(mut self, dims: Quantities) -> Self {
        self.dimensions = dims;
        self
    }

    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = material.into();
        self
    }

    pub fn with_magfield(mut self, magfield: impl Into<String>) -> Self {
        self.magfield = magfield.into();
        self
    }

    pub fn with_copies(mut self, ncopy: i64, pmany: i64) -> Self {
        self.ncopy = ncopy;
        self.pmany = pmany;
        self
    }

    pub fn with_exist(mut self, exist: bool) -> Self {
        self.exist = exist as u8;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible as u8;
        self
    }

    /// `true` for solid, `false` for wireframe
    pub fn with_style(mut self, solid: bool) -> Self {
        self.style = solid as u8;
        self
    }

    pub fn with_sensitivity(
        mut self,
        sensitivity: impl Into<String>,
        hit_type: impl Into<String>,
    ) -> Self {
        self.sensitivity = sensitivity.into();
        self.hit_type = hit_type.into();
        self
    }

    /// Use the sensitivity and hit type of a sensitive detector definition
    pub fn with_sensitive_detector(self, sd: &SensitiveDetector) -> Self {
        self.with_sensitivity(sd.name.clone(), sd.name.clone())
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = identity.into();
        self
    }

    /// Check the record for problems that would break the text format or
    /// the renderer. Returns the first problem, tagged with its legacy
    /// field number.
    pub fn validate(&self) -> GeometryResult<()> {
        let fail = |code: u32, field: &'static str, reason: String| {
            Err(GeometryError::Validation {
                volume: self.name.clone(),
                field,
                code,
                reason,
            })
        };

        if self.name.trim().is_empty() || !is_plain(&self.name) {
            return fail(1, "name", format!("invalid name '{}'", self.name));
        }
        if self.mother.trim().is_empty() || !is_plain(&self.mother) {
            return fail(2, "mother", format!("invalid mother '{}'", self.mother));
        }
        if !is_plain(&self.description) {
            return fail(3, "description", "contains a column separator".into());
        }

        for (quantities, base, field) in [
            (&self.position, 4, "pos"),
            (&self.rotation, 5, "rot"),
        ] {
            if quantities.len() != 3 {
                return fail(base, field, format!("expected 3 values, found {}", quantities.len()));
            }
            if quantities.values().iter().any(|v| !v.is_finite()) {
                return fail(base * 10 + 1, field, "non-finite value".into());
            }
            if !quantities.is_consistent() {
                return fail(base * 10 + 3, field, "values and units do not line up".into());
            }
        }

        if crate::io::parser::parse_color(&self.color).is_none() {
            return fail(6, "col", format!("'{}' is not an rrggbb[a] color", self.color));
        }
        if self.shape.to_string().trim().is_empty() || !is_plain(&self.shape.to_string()) {
            return fail(7, "type", format!("invalid type '{}'", self.shape));
        }
        if !self.dimensions.is_consistent() {
            return fail(8, "dimensions", "values and units do not line up".into());
        }
        if self.dimensions.len() < self.shape.min_dimensions() {
            return fail(
                8,
                "dimensions",
                format!(
                    "{} needs {} values, found {}",
                    self.shape,
                    self.shape.min_dimensions(),
                    self.dimensions.len()
                ),
            );
        }
        if self.material.trim().is_empty() || !is_plain(&self.material) {
            return fail(9, "material", format!("invalid material '{}'", self.material));
        }
        if !is_plain(&self.magfield) {
            return fail(10, "magfield", "contains a column separator".into());
        }
        if self.ncopy < 0 {
            return fail(11, "ncopy", format!("negative value {}", self.ncopy));
        }
        if self.pmany < 0 {
            return fail(12, "pmany", format!("negative value {}", self.pmany));
        }
        for (flag, code, field) in [
            (self.exist, 13, "exist"),
            (self.visible, 14, "visible"),
            (self.style, 15, "style"),
        ] {
            if flag > 1 {
                return fail(code, field, format!("flag must be 0 or 1, found {}", flag));
            }
        }
        if !is_plain(&self.sensitivity) {
            return fail(16, "sensitivity", "contains a column separator".into());
        }
        if !is_plain(&self.hit_type) {
            return fail(17, "hitType", "contains a column separator".into());
        }
        if !is_plain(&self.identity) {
            return fail(18, "identity", "contains a column separator".into());
        }
        Ok(())
    }

    /// Rotation column as written, including the `ordered:` prefix
    pub fn rotation_text(&self) -> String {
        if self.rotation_order.is_explicit() {
            format!("ordered: {} {}", self.rotation_order, self.rotation)
        } else {
            self.rotation.to_string()
        }
    }

    /// Column value by index, 0 (name) to 17 (identity)
    pub fn column(&self, index: usize) -> Option<String> {
        let value = match index {
            0 => self.name.clone(),
            1 => self.mother.clone(),
            2 => self.description.clone(),
            3 => self.position.to_string(),
            4 => self.rotation_text(),
            5 => self.color.clone(),
            6 => self.shape.to_string(),
            7 => self.dimensions.to_string(),
            8 => self.material.clone(),
            9 => self.magfield.clone(),
            10 => self.ncopy.to_string(),
            11 => self.pmany.to_string(),
            12 => self.exist.to_string(),
            13 => self.visible.to_string(),
            14 => self.style.to_string(),
            15 => self.sensitivity.clone(),
            16 => self.hit_type.clone(),
            17 => self.identity.clone(),
            _ => return None,
        };
        Some(value)
    }

    /// Column value by name. Accepts the common aliases (`type`/`g4type`,
    /// `dims`/`dimensions`, `pos`/`position`, ...).
    pub fn field(&self, name: &str) -> Option<String> {
        let index = match name {
            "name" => 0,
            "mother" => 1,
            "description" => 2,
            "pos" | "position" => 3,
            "rot" | "rotation" => 4,
            "col" | "color" => 5,
            "type" | "g4type" => 6,
            "dims" | "dimensions" => 7,
            "material" => 8,
            "magfield" => 9,
            "ncopy" => 10,
            "pmany" => 11,
            "exist" => 12,
            "visible" => 13,
            "style" => 14,
            "sensitivity" => 15,
            "hittype" | "hitType" | "hit_type" => 16,
            "identity" => 17,
            _ => return None,
        };
        self.column(index)
    }

    pub fn color_alpha(&self) -> ColorAlpha {
        ColorAlpha::parse(&self.color)
    }

    /// GEANT4 frame rotation described by the rotation column
    pub fn frame_rotation(&self) -> GeometryResult<Rotation3<f64>> {
        let mut angles = [0.0; 3];
        for (i, angle) in angles.iter_mut().enumerate() {
            *angle = self.rotation.value_in(i, &Unit::Radian)?;
        }
        Ok(frame_rotation(angles, self.rotation_order))
    }

    /// Position (in cm) and rotation of this volume inside its mother
    pub fn placement(&self) -> GeometryResult<Placement> {
        let mut t = Vector3::zeros();
        for i in 0..3 {
            t[i] = self.position.value_in(i, &Unit::Centimeter)?;
        }
        Ok(Placement::from_frame(t, self.frame_rotation()?))
    }

    pub fn is_root_child(&self) -> bool {
        self.mother == ROOT_VOLUME
    }
}

fn is_plain(text: &str) -> bool {
    !text.contains('|') && !text.contains('\n')
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for index in 0..COLUMN_NAMES.len() {
            if index > 0 {
                f.write_str(" | ")?;
            }
            f.write_str(&self.column(index).unwrap_or_default())?;
        }
        Ok(())
    }
}
