// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! detgeom - detector geometry for GEMC
//!
//! Describe a particle detector as a set of placed volumes, write it to the
//! GEMC text tables or an SQL database, read it back, and build it on a
//! geometry backend for display.

pub mod cli;
pub mod config;
pub mod detector;
pub mod error;
pub mod geometry;
pub mod io;
pub mod render;

pub use config::EngineConfig;
pub use detector::Detector;
pub use error::{GeometryError, GeometryResult};
pub use geometry::{Material, SensitiveDetector, ShapeType, Unit, Volume};
pub use io::{import_geometry_file, read_geometry, write_all};
pub use render::{GeometryBackend, GeometryRenderer, SceneBackend, SceneGraph};

use std::path::Path;

/// Build the whole tree of a detector into a scene graph
pub fn render_detector(detector: &Detector, config: &EngineConfig) -> GeometryResult<SceneGraph> {
    let mut renderer = GeometryRenderer::with_config(SceneBackend::new(detector.name()), config);
    renderer.build_volumes(detector, geometry::ROOT_VOLUME)?;
    Ok(renderer.finish()?.into_graph())
}

/// Load a `<det>__geometry_<variation>.txt` file and build its scene graph
pub fn render_file(path: impl AsRef<Path>, config: &EngineConfig) -> anyhow::Result<SceneGraph> {
    let detector = import_geometry_file(path, config)?;
    Ok(render_detector(&detector, config)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_cube() {
        let mut detector = Detector::new("cube");
        detector.quick_add_cube([0.0, 0.0, 0.0], 10.0).unwrap();
        let scene = render_detector(&detector, &EngineConfig::default()).unwrap();
        assert!(scene.closed);
        assert!(scene.volume("Test_Cube").is_some());
    }
}
