// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error types for the geometry model

use thiserror::Error;

/// Errors raised while building, parsing or rendering a detector geometry.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// A volume with the same name is already part of the detector
    #[error("Volume '{0}' is already defined")]
    DuplicateVolume(String),

    /// Lookup of a volume by name failed
    #[error("Volume not found: {0}")]
    VolumeNotFound(String),

    /// A volume names a mother that does not exist
    #[error("Volume '{volume}' has unknown mother '{mother}'")]
    DanglingMother { volume: String, mother: String },

    /// Mother references loop back on themselves
    #[error("Mother chain of volume '{0}' contains a cycle")]
    MotherCycle(String),

    /// A record failed validation. `code` is the legacy field number.
    #[error("Volume '{volume}' failed validation on field {code} ({field}): {reason}")]
    Validation {
        volume: String,
        field: &'static str,
        code: u32,
        reason: String,
    },

    /// Malformed text input
    #[error("Parse error: {0}")]
    Parse(String),

    /// A text line did not have the expected layout
    #[error("Line {line}: {reason}")]
    Format { line: usize, reason: String },

    /// Unit name that has no conversion factor
    #[error("Unknown unit '{0}'")]
    UnknownUnit(String),

    /// Conversion between units of different dimension
    #[error("Cannot convert '{from}' to '{to}'")]
    UnitMismatch { from: String, to: String },

    /// Rotation order string is not a permutation of "xyz"
    #[error("Unknown rotation order '{0}'")]
    RotationOrder(String),

    /// Not enough dimension values for the shape type
    #[error("Volume '{volume}' of type {shape} needs {expected} dimensions, found {found}")]
    Dimensions {
        volume: String,
        shape: String,
        expected: usize,
        found: usize,
    },

    /// The shape type cannot be turned into a solid
    #[error("The geometry shape '{shape}' of volume '{volume}' is not supported")]
    UnsupportedShape { volume: String, shape: String },

    /// A boolean operand or copied shape has not been built
    #[error("Shape '{0}' was not found or not yet placed")]
    ShapeNotPlaced(String),

    /// Identity indexes do not match the identifiers of a sensitive detector
    #[error("Sensitive detector '{name}' has {expected} identifiers, got {found} indexes")]
    IdentityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    /// Failure reported by a render backend
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result alias used across the geometry model
pub type GeometryResult<T> = Result<T, GeometryError>;
