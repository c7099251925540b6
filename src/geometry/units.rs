// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Units and unit-tagged value lists

use crate::error::{GeometryError, GeometryResult};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Physical dimension of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Length,
    Angle,
    Count,
    Unknown,
}

/// A unit name as it appears in `value*unit` tokens.
///
/// Names without a known conversion are kept verbatim in [`Unit::Other`] so
/// they survive a read/write cycle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Unit {
    Millimeter,
    Centimeter,
    Meter,
    Inch,
    Radian,
    Milliradian,
    Degree,
    Counts,
    Other(String),
}

impl Unit {
    pub fn symbol(&self) -> &str {
        match self {
            Unit::Millimeter => "mm",
            Unit::Centimeter => "cm",
            Unit::Meter => "m",
            Unit::Inch => "inch",
            Unit::Radian => "rad",
            Unit::Milliradian => "mrad",
            Unit::Degree => "deg",
            Unit::Counts => "counts",
            Unit::Other(name) => name,
        }
    }

    pub fn kind(&self) -> UnitKind {
        match self {
            Unit::Millimeter | Unit::Centimeter | Unit::Meter | Unit::Inch => UnitKind::Length,
            Unit::Radian | Unit::Milliradian | Unit::Degree => UnitKind::Angle,
            Unit::Counts => UnitKind::Count,
            Unit::Other(_) => UnitKind::Unknown,
        }
    }

    /// Size of the unit expressed in cm (lengths) or rad (angles)
    fn reference_factor(&self) -> Option<f64> {
        match self {
            Unit::Millimeter => Some(0.1),
            Unit::Centimeter => Some(1.0),
            Unit::Meter => Some(100.0),
            Unit::Inch => Some(2.54),
            Unit::Radian => Some(1.0),
            Unit::Milliradian => Some(0.001),
            Unit::Degree => Some(1f64.to_radians()),
            Unit::Counts => Some(1.0),
            Unit::Other(_) => None,
        }
    }
}

impl FromStr for Unit {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().trim_matches('*');
        Ok(match name {
            "mm" => Unit::Millimeter,
            "cm" => Unit::Centimeter,
            "m" => Unit::Meter,
            "inch" | "inches" => Unit::Inch,
            "rad" => Unit::Radian,
            "mrad" => Unit::Milliradian,
            "deg" => Unit::Degree,
            "counts" => Unit::Counts,
            other => Unit::Other(other.to_string()),
        })
    }
}

impl From<String> for Unit {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(unit) => unit,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for Unit {
    fn from(value: &str) -> Self {
        Unit::from(value.to_string())
    }
}

impl From<Unit> for String {
    fn from(unit: Unit) -> Self {
        unit.symbol().to_string()
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Convert `value` from one unit into another of the same kind.
pub fn convert(value: f64, from: &Unit, to: &Unit) -> GeometryResult<f64> {
    if from == to {
        return Ok(value);
    }
    if from.kind() != to.kind() {
        return Err(GeometryError::UnitMismatch {
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    let src = from
        .reference_factor()
        .ok_or_else(|| GeometryError::UnknownUnit(from.to_string()))?;
    let dst = to
        .reference_factor()
        .ok_or_else(|| GeometryError::UnknownUnit(to.to_string()))?;
    Ok(value * src / dst)
}

/// The pair of base units values are normalised to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSystem {
    pub length: Unit,
    pub angle: Unit,
}

impl Default for UnitSystem {
    fn default() -> Self {
        Self {
            length: Unit::Centimeter,
            angle: Unit::Radian,
        }
    }
}

impl UnitSystem {
    pub fn new(length: Unit, angle: Unit) -> GeometryResult<Self> {
        if length.kind() != UnitKind::Length {
            return Err(GeometryError::UnitMismatch {
                from: length.to_string(),
                to: "length".into(),
            });
        }
        if angle.kind() != UnitKind::Angle {
            return Err(GeometryError::UnitMismatch {
                from: angle.to_string(),
                to: "angle".into(),
            });
        }
        if length == Unit::Inch {
            log::warn!("Base unit of inches is not recommended for GEANT4");
        }
        Ok(Self { length, angle })
    }

    /// Parse a space separated pair such as `"cm deg"` or `"*mm *rad"`.
    ///
    /// Either entry may be omitted; the default is kept for it.
    pub fn parse(spec: &str) -> GeometryResult<Self> {
        let mut system = Self::default();
        for token in spec.split_whitespace() {
            let unit = Unit::from(token);
            match unit.kind() {
                UnitKind::Length => system.length = unit,
                UnitKind::Angle => system.angle = unit,
                UnitKind::Count => {}
                UnitKind::Unknown => return Err(GeometryError::UnknownUnit(token.to_string())),
            }
        }
        Self::new(system.length, system.angle)
    }

    /// Base unit that values in `unit` are converted to
    pub fn base_for(&self, unit: &Unit) -> GeometryResult<Unit> {
        match unit.kind() {
            UnitKind::Length => Ok(self.length.clone()),
            UnitKind::Angle => Ok(self.angle.clone()),
            UnitKind::Count => Ok(Unit::Counts),
            UnitKind::Unknown => Err(GeometryError::UnknownUnit(unit.to_string())),
        }
    }

    /// Convert `value` expressed in `unit` into this system's base unit.
    pub fn to_base(&self, value: f64, unit: &Unit) -> GeometryResult<(f64, Unit)> {
        let base = self.base_for(unit)?;
        Ok((convert(value, unit, &base)?, base))
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.length, self.angle)
    }
}

/// How parsed values are treated
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitPolicy {
    pub base: UnitSystem,
    /// Convert everything into `base` while parsing
    pub force_conversion: bool,
}

/// A list of values, each tagged with its own unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Quantities {
    values: Vec<f64>,
    units: Vec<Unit>,
}

impl Quantities {
    pub fn new(values: Vec<f64>, units: Vec<Unit>) -> GeometryResult<Self> {
        if values.len() != units.len() {
            return Err(GeometryError::Parse(format!(
                "{} values but {} units",
                values.len(),
                units.len()
            )));
        }
        Ok(Self { values, units })
    }

    /// All values share `unit`
    pub fn uniform(values: impl Into<Vec<f64>>, unit: Unit) -> Self {
        let values = values.into();
        let units = vec![unit; values.len()];
        Self { values, units }
    }

    pub fn zeros(len: usize, unit: Unit) -> Self {
        Self::uniform(vec![0.0; len], unit)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64, unit: Unit) {
        self.values.push(value);
        self.units.push(unit);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn get(&self, index: usize) -> Option<(f64, &Unit)> {
        Some((*self.values.get(index)?, self.units.get(index)?))
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, &Unit)> {
        self.values.iter().copied().zip(self.units.iter())
    }

    /// Entry `index` expressed in `target`
    pub fn value_in(&self, index: usize, target: &Unit) -> GeometryResult<f64> {
        let (value, unit) = self.get(index).ok_or_else(|| {
            GeometryError::Parse(format!("no value at index {} of '{}'", index, self))
        })?;
        convert(value, unit, target)
    }

    /// Copy with every entry converted into the base units of `system`
    pub fn converted(&self, system: &UnitSystem) -> GeometryResult<Self> {
        let mut out = Self::default();
        for (value, unit) in self.iter() {
            let (value, unit) = system.to_base(value, unit)?;
            out.push(value, unit);
        }
        Ok(out)
    }

    /// True when the value and unit lists line up
    pub fn is_consistent(&self) -> bool {
        self.values.len() == self.units.len()
    }
}

impl fmt::Display for Quantities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (value, unit)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}*{}", value, unit)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_unit_names() {
        assert_eq!(Unit::from("inches"), Unit::Inch);
        assert_eq!(Unit::from("*deg"), Unit::Degree);
        assert_eq!(Unit::from("MeV"), Unit::Other("MeV".into()));
        assert_eq!(Unit::Degree.to_string(), "deg");
    }

    #[test]
    fn test_conversions() {
        assert_relative_eq!(convert(10.0, &Unit::Millimeter, &Unit::Centimeter).unwrap(), 1.0);
        assert_relative_eq!(convert(1.0, &Unit::Inch, &Unit::Millimeter).unwrap(), 25.4);
        assert_relative_eq!(
            convert(180.0, &Unit::Degree, &Unit::Radian).unwrap(),
            std::f64::consts::PI
        );
        assert_relative_eq!(convert(1.0, &Unit::Radian, &Unit::Milliradian).unwrap(), 1000.0);
        assert!(convert(1.0, &Unit::Centimeter, &Unit::Degree).is_err());
        assert!(convert(1.0, &Unit::Other("furlong".into()), &Unit::Meter).is_err());
    }

    #[test]
    fn test_unit_system_parse() {
        let system = UnitSystem::parse("mm deg").unwrap();
        assert_eq!(system.length, Unit::Millimeter);
        assert_eq!(system.angle, Unit::Degree);

        let system = UnitSystem::parse("*m").unwrap();
        assert_eq!(system.length, Unit::Meter);
        assert_eq!(system.angle, Unit::Radian);

        assert!(UnitSystem::parse("cm parsec").is_err());
    }

    #[test]
    fn test_quantities_display_and_convert() {
        let mut q = Quantities::uniform(vec![10.0, 2.5], Unit::Millimeter);
        q.push(90.0, Unit::Degree);
        assert_eq!(q.to_string(), "10*mm 2.5*mm 90*deg");

        let base = q.converted(&UnitSystem::default()).unwrap();
        assert_eq!(base.units()[0], Unit::Centimeter);
        assert_relative_eq!(base.values()[0], 1.0);
        assert_relative_eq!(base.values()[2], std::f64::consts::FRAC_PI_2);
    }

    #[test]
    fn test_quantities_length_mismatch() {
        assert!(Quantities::new(vec![1.0, 2.0], vec![Unit::Centimeter]).is_err());
    }
}
