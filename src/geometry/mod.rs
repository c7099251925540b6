// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - volumes, shapes, units and the definitions they reference

mod color;
mod material;
mod rotation;
mod sensitive;
mod shape;
mod trapezoid;
mod units;
mod volume;

pub use color::{Color, ColorAlpha};
pub use material::{parse_components, Material};
pub use rotation::{frame_rotation, Axis, Placement, RotationOrder};
pub use sensitive::{BankRow, BankSource, BankType, BankValue, SensitiveDetector};
pub use shape::{BooleanOp, BooleanOperation, ShapeType, Solid, ZPlane};
pub use trapezoid::{g4_trapezoid, TrapezoidParams};
pub use units::{convert, Quantities, Unit, UnitKind, UnitPolicy, UnitSystem};
pub use volume::{Volume, COLUMN_NAMES, ROOT_VOLUME};
