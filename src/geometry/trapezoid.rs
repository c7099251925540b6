// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! G4Trap parameters from edge points

use serde::{Deserialize, Serialize};

/// Center, skew angle and half widths of a G4Trap
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrapezoidParams {
    pub cx: f64,
    pub cz: f64,
    /// Skew of the center line with respect to z, in radians
    pub theta: f64,
    /// Half width at the front face
    pub dx1: f64,
    /// Half width at the back face
    pub dx2: f64,
}

/// Compute a trapezoid whose front face sits at `z = front` with the given
/// `depth`. The left edge passes through `(p1x, p1z)` at angle `theta1` to the
/// z axis, the right edge through `(p2x, p2z)` at `theta2`.
///
/// Degenerate results (non-positive widths or crossed edges) are logged but
/// still returned.
#[allow(clippy::too_many_arguments)]
pub fn g4_trapezoid(
    front: f64,
    depth: f64,
    p1x: f64,
    p1z: f64,
    theta1: f64,
    p2x: f64,
    p2z: f64,
    theta2: f64,
) -> TrapezoidParams {
    let z1 = front;
    let z2 = front + depth;
    let (t1, t2) = (theta1.tan(), theta2.tan());

    let dx1 = ((p2x - p1x) - (z1 - p1z) * t1 + (z1 - p2z) * t2) / 2.0;
    let dx2 = ((p2x - p1x) - (z2 - p1z) * t1 + (z2 - p2z) * t2) / 2.0;

    let mid = (z1 + z2) / 2.0;
    let left_mid = p1x + (mid - p1z) * t1;
    let right_mid = p2x + (mid - p2z) * t2;

    let c1x = p2x + (z1 - p2z) * t2 - dx1;
    let c2x = p2x + (z2 - p2z) * t2 - dx2;

    let params = TrapezoidParams {
        cx: (c1x + c2x) / 2.0,
        cz: front + depth / 2.0,
        theta: (c2x - c1x).atan2(depth),
        dx1,
        dx2,
    };

    if dx1 <= 0.0 || dx2 <= 0.0 || left_mid > right_mid {
        log::warn!(
            "Probable problem with trapezoid calculation: front={} depth={} p1=({}, {}) p2=({}, {}) \
             theta1={} theta2={} mid edges=({}, {}) -> {:?}",
            front,
            depth,
            p1x,
            p1z,
            p2x,
            p2z,
            theta1,
            theta2,
            left_mid,
            right_mid,
            params
        );
    }
    params
}
