// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Column parsers for the GEMC text format using pest

use crate::error::{GeometryError, GeometryResult};
use crate::geometry::{BooleanOp, BooleanOperation, Quantities, RotationOrder, Unit, UnitPolicy};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "io/gemc.pest"]
struct GemcParser;

fn syntax_error(what: &str, text: &str, err: pest::error::Error<Rule>) -> GeometryError {
    GeometryError::Parse(format!("invalid {} '{}': {}", what, text, err))
}

/// Parse a `value*unit` list such as `"10*mm 1.5*cm 0*m"`.
///
/// Tokens without a unit take `default_unit`. With forced conversion every
/// entry is converted into the policy's base units.
pub fn parse_quantities(
    text: &str,
    default_unit: &Unit,
    policy: &UnitPolicy,
) -> GeometryResult<Quantities> {
    let mut pairs = GemcParser::parse(Rule::quantity_list, text.trim())
        .map_err(|e| syntax_error("value list", text, e))?;

    let mut out = Quantities::empty();
    if let Some(list) = pairs.next() {
        for pair in list.into_inner() {
            if pair.as_rule() == Rule::quantity {
                let (value, unit) = parse_quantity(pair, default_unit, policy)?;
                out.push(value, unit);
            }
        }
    }
    Ok(out)
}

fn parse_quantity(
    pair: Pair<Rule>,
    default_unit: &Unit,
    policy: &UnitPolicy,
) -> GeometryResult<(f64, Unit)> {
    let mut value = None;
    let mut unit = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::number => {
                value = Some(inner.as_str().parse::<f64>().map_err(|e| {
                    GeometryError::Parse(format!("bad number '{}': {}", inner.as_str(), e))
                })?)
            }
            Rule::unit => unit = Some(Unit::from(inner.as_str())),
            _ => {}
        }
    }
    let value = value.ok_or_else(|| GeometryError::Parse("missing number".into()))?;
    let unit = unit.unwrap_or_else(|| default_unit.clone());

    if policy.force_conversion {
        let (converted, base) = policy.base.to_base(value, &unit)?;
        log::trace!("Conversion: {}*{} to {} {}", value, unit, converted, base);
        Ok((converted, base))
    } else {
        Ok((value, unit))
    }
}

/// Parse a rotation column, `[ordered: zyx] a*u b*u c*u`.
pub fn parse_rotation(text: &str, policy: &UnitPolicy) -> GeometryResult<(Quantities, RotationOrder)> {
    let angle = policy.base.angle.clone();
    let mut pairs = GemcParser::parse(Rule::rotation, text.trim())
        .map_err(|e| syntax_error("rotation", text, e))?;

    let mut order = RotationOrder::default();
    let mut angles = Quantities::empty();
    if let Some(rotation) = pairs.next() {
        for pair in rotation.into_inner() {
            match pair.as_rule() {
                Rule::axis_order => order = RotationOrder::parse(pair.as_str())?,
                Rule::quantity => {
                    let (value, unit) = parse_quantity(pair, &angle, policy)?;
                    angles.push(value, unit);
                }
                _ => {}
            }
        }
    }

    if angles.is_empty() {
        return Ok((Quantities::zeros(3, angle), order));
    }
    if angles.len() == 1 && !order.is_explicit() {
        log::warn!("Rotation with only one entry: {}", text.trim());
        if angles.values()[0] != 0.0 {
            log::warn!("Do not know what to do with it, setting rotation to zero");
        }
        return Ok((Quantities::zeros(3, angle), order));
    }
    Ok((angles, order))
}

/// Parse `Operation:[@|~] first op second`, or `None` for any other text.
pub fn parse_operation(text: &str) -> Option<BooleanOperation> {
    let mut pairs = GemcParser::parse(Rule::operation, text.trim()).ok()?;
    let mut relative = None;
    let mut names = Vec::with_capacity(2);
    let mut op = None;
    for pair in pairs.next()?.into_inner() {
        match pair.as_rule() {
            Rule::op_special => relative = pair.as_str().chars().next(),
            Rule::ident => names.push(pair.as_str().to_string()),
            Rule::op_symbol => {
                op = match pair.as_str() {
                    "+" => Some(BooleanOp::Union),
                    "-" => Some(BooleanOp::Subtraction),
                    "*" => Some(BooleanOp::Intersection),
                    _ => None,
                }
            }
            _ => {}
        }
    }
    let second = names.pop()?;
    let first = names.pop()?;
    Some(BooleanOperation {
        special: relative,
        first,
        op: op?,
        second,
    })
}

/// Split `[#]rrggbb[a]` into its channels and optional alpha digit.
pub fn parse_color(text: &str) -> Option<([u8; 3], Option<u8>)> {
    let mut pairs = GemcParser::parse(Rule::color, text.trim()).ok()?;
    let mut rgb = None;
    let mut alpha = None;
    for pair in pairs.next()?.into_inner() {
        match pair.as_rule() {
            Rule::rgb => {
                let hex = pair.as_str();
                let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
                rgb = Some([channel(0)?, channel(2)?, channel(4)?]);
            }
            Rule::alpha => alpha = pair.as_str().parse::<u8>().ok(),
            _ => {}
        }
    }
    Some((rgb?, alpha))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Axis, UnitSystem};

    #[test]
    fn test_parse_quantities() {
        let policy = UnitPolicy::default();
        let q = parse_quantities("10*mm 12*cm   1*m", &Unit::Centimeter, &policy).unwrap();
        assert_eq!(q.values(), &[10.0, 12.0, 1.0]);
        assert_eq!(q.units(), &[Unit::Millimeter, Unit::Centimeter, Unit::Meter]);
    }

    #[test]
    fn test_parse_quantities_without_units() {
        let policy = UnitPolicy::default();
        let q = parse_quantities("0 -1.5 2e2", &Unit::Centimeter, &policy).unwrap();
        assert_eq!(q.values(), &[0.0, -1.5, 200.0]);
        assert!(q.units().iter().all(|u| *u == Unit::Centimeter));
        assert!(parse_quantities("", &Unit::Centimeter, &policy).unwrap().is_empty());
    }

    #[test]
    fn test_parse_quantities_forced_conversion() {
        let policy = UnitPolicy {
            base: UnitSystem::parse("mm deg").unwrap(),
            force_conversion: true,
        };
        let q = parse_quantities("1*cm 2*inches 3*counts", &Unit::Millimeter, &policy).unwrap();
        assert_eq!(q.units(), &[Unit::Millimeter, Unit::Millimeter, Unit::Counts]);
        assert!((q.values()[0] - 10.0).abs() < 1e-12);
        assert!((q.values()[1] - 50.8).abs() < 1e-12);
        assert_eq!(q.values()[2], 3.0);
    }

    #[test]
    fn test_parse_quantities_rejects_garbage() {
        let policy = UnitPolicy::default();
        assert!(parse_quantities("10*mm abc", &Unit::Centimeter, &policy).is_err());
        assert!(parse_quantities("10**mm", &Unit::Centimeter, &policy).is_err());
    }

    #[test]
    fn test_parse_rotation_ordered() {
        let policy = UnitPolicy::default();
        let (angles, order) = parse_rotation("ordered: zyx 90*deg 0*deg 45*deg", &policy).unwrap();
        assert_eq!(order.axes(), [Axis::Z, Axis::Y, Axis::X]);
        assert!(order.is_explicit());
        assert_eq!(angles.values(), &[90.0, 0.0, 45.0]);
    }

    #[test]
    fn test_parse_rotation_single_entry_is_zero() {
        let policy = UnitPolicy::default();
        let (angles, order) = parse_rotation("0", &policy).unwrap();
        assert_eq!(angles.len(), 3);
        assert!(angles.values().iter().all(|v| *v == 0.0));
        assert!(angles.units().iter().all(|u| *u == Unit::Radian));
        assert!(!order.is_explicit());

        let (angles, _) = parse_rotation("", &policy).unwrap();
        assert_eq!(angles.len(), 3);
    }

    #[test]
    fn test_parse_operation() {
        let op = parse_operation("Operation:@ outer - inner").unwrap();
        assert_eq!(op.special, Some('@'));
        assert_eq!(op.first, "outer");
        assert_eq!(op.second, "inner");
        assert_eq!(op.op, BooleanOp::Subtraction);

        let op = parse_operation("Operation: a_1 * b2").unwrap();
        assert_eq!(op.special, None);
        assert_eq!(op.op, BooleanOp::Intersection);

        assert!(parse_operation("Box").is_none());
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("ff0000"), Some(([255, 0, 0], None)));
        assert_eq!(parse_color("#00Ff103"), Some(([0, 255, 16], Some(3))));
        assert_eq!(parse_color("red"), None);
    }
}
