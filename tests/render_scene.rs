// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Scene building tests

use anyhow::Result;
use approx::assert_relative_eq;
use detgeom::geometry::{BooleanOp, ShapeType, Solid, Unit, Volume};
use detgeom::render::scene::SceneShape;
use detgeom::render::{Composition, GeometryRenderer, SceneBackend, SceneGraph};
use detgeom::{render_detector, Detector, EngineConfig};
use nalgebra::Vector3;
use tempfile::TempDir;

fn beamline() -> Result<Detector> {
    let mut det = Detector::new("beamline");
    det.add(
        Volume::new("pipe")
            .with_description("beam pipe")
            .with_color("999999")
            .with_shape(ShapeType::Tube)
            .with_dimensions([2.0, 2.2, 100.0], Unit::Centimeter)
            .with_material("G4_Fe"),
    )?;
    det.add(
        Volume::new("flange_body")
            .with_position([0.0, 0.0, 100.0], Unit::Centimeter)
            .with_shape(ShapeType::Tube)
            .with_dimensions([0.0, 8.0, 1.0], Unit::Centimeter)
            .with_material("Component"),
    )?;
    det.add(
        Volume::new("flange_bore")
            .with_position([0.0, 0.0, 100.0], Unit::Centimeter)
            .with_shape(ShapeType::Tube)
            .with_dimensions([0.0, 2.2, 2.0], Unit::Centimeter)
            .with_material("Component"),
    )?;
    det.add(
        Volume::new("flange")
            .with_position([0.0, 0.0, 100.0], Unit::Centimeter)
            .with_color("ccccff3")
            .with_shape("Operation:@ flange_body - flange_bore")
            .with_material("StainlessSteel"),
    )?;
    det.add(
        Volume::new("flange_downstream")
            .with_position([0.0, 0.0, -100.0], Unit::Centimeter)
            .with_shape("CopyOf flange")
            .with_material("StainlessSteel"),
    )?;
    det.add(
        Volume::new("window")
            .with_mother("pipe")
            .with_position([0.0, 0.0, 99.0], Unit::Centimeter)
            .with_shape(ShapeType::Tube)
            .with_dimensions([0.0, 2.0, 0.01], Unit::Centimeter)
            .with_material("Kapton")
            .with_style(false),
    )?;
    Ok(det)
}

#[test]
fn test_build_full_tree() -> Result<()> {
    let det = beamline()?;
    let scene = render_detector(&det, &EngineConfig::default())?;
    assert!(scene.closed);

    let root = scene.top_volume().expect("top volume");
    assert_eq!(root.name, "root");
    // pipe, flange and its copy sit in root; the components do not
    assert_eq!(root.nodes.len(), 3);
    assert!(scene.volume("flange_body").is_none());
    assert!(scene.shape("flange_body").is_some());

    let flange = scene.volume("flange").expect("flange volume");
    let copy = scene.volume("flange_downstream").expect("copy volume");
    assert_eq!(flange.shape, copy.shape);
    match &scene.shapes[flange.shape.0] {
        SceneShape::Boolean { op, placement, .. } => {
            assert_eq!(*op, BooleanOp::Subtraction);
            assert_relative_eq!(placement.translation, Vector3::zeros(), epsilon = 1e-12);
        }
        other => panic!("expected a boolean shape, got {:?}", other),
    }
    assert_eq!(flange.style.transparency, 30);

    // Unknown material falls back to aluminum, wireframe forces 70
    let window = scene.volume("window").expect("window volume");
    assert_eq!(window.style.transparency, 70);
    let medium = &scene.media[window.medium.0];
    assert_eq!(medium.material, "Aluminum");
    assert!(matches!(medium.composition, Composition::Element { z: 13, .. }));
    Ok(())
}

#[test]
fn test_build_from_sub_volume() -> Result<()> {
    let det = beamline()?;
    let mut renderer = GeometryRenderer::new(SceneBackend::new("pipe only"));
    renderer.build_volumes(&det, "pipe")?;
    assert!(renderer.is_placed("pipe"));
    assert!(renderer.is_placed("window"));
    assert!(!renderer.is_placed("flange"));

    let scene = renderer.finish()?.into_graph();
    let pipe = scene.volume("pipe").expect("pipe");
    assert_eq!(pipe.nodes.len(), 1);
    match &scene.shape("pipe") {
        Some(SceneShape::Primitive { solid: Solid::Tube { rmax, dz, .. }, .. }) => {
            assert_relative_eq!(*rmax, 2.2);
            assert_relative_eq!(*dz, 100.0);
        }
        other => panic!("unexpected pipe shape {:?}", other),
    }
    Ok(())
}

#[test]
fn test_scene_json_file() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("scene.json");
    let scene = render_detector(&beamline()?, &EngineConfig::default())?;
    scene.save_json(&path)?;

    let back = SceneGraph::load_json(&path)?;
    assert_eq!(back.volumes.len(), scene.volumes.len());
    assert_eq!(back.node_count(), scene.node_count());
    back.check()?;
    assert!(back.to_string().contains("window"));
    Ok(())
}

#[test]
fn test_missing_operand_is_an_error() -> Result<()> {
    let mut det = Detector::new("broken");
    det.add(
        Volume::new("cut")
            .with_shape("Operation: body - missing")
            .with_material("Air"),
    )?;
    det.add(
        Volume::new("body")
            .with_shape(ShapeType::Box)
            .with_dimensions([1.0, 1.0, 1.0], Unit::Centimeter)
            .with_material("Component"),
    )?;
    assert!(render_detector(&det, &EngineConfig::default()).is_err());
    Ok(())
}
