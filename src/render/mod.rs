// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Render adapter - turns a detector into calls on a geometry backend
//!
//! The renderer walks the mother/daughter tree of a [`Detector`] starting at
//! a given volume and asks a [`GeometryBackend`] to create media, shapes and
//! volumes, then to place each volume inside its mother. Boolean operands are
//! built on demand, the first operand at the origin and the second one at its
//! own placement (or, for `Operation:@`, at its placement relative to the
//! first operand).

pub mod materials;
pub mod scene;

pub use materials::{medium_key, Composition, MaterialLibrary, Medium, COMPONENT};
pub use scene::{SceneBackend, SceneGraph};

use crate::config::EngineConfig;
use crate::detector::Detector;
use crate::error::{GeometryError, GeometryResult};
use crate::geometry::{BooleanOp, Color, Placement, ShapeType, Solid, Volume, ROOT_VOLUME};
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

/// Transparency forced on wireframe volumes
pub const WIREFRAME_TRANSPARENCY: u8 = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShapeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediumId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VolumeId(pub usize);

/// Display attributes of a volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeStyle {
    pub color: Color,
    pub visible: bool,
    /// 0 opaque .. 100 invisible
    pub transparency: u8,
}

/// A geometry engine able to hold the scene described by a detector.
///
/// Lengths are in cm and angles in degrees, see [`Solid`].
pub trait GeometryBackend {
    fn define_medium(&mut self, medium: &Medium) -> GeometryResult<MediumId>;

    fn make_shape(&mut self, name: &str, solid: &Solid) -> GeometryResult<ShapeId>;

    /// Combine two shapes. `first` sits at the origin, `second` at `placement`.
    fn make_boolean(
        &mut self,
        name: &str,
        op: BooleanOp,
        first: ShapeId,
        second: ShapeId,
        placement: &Placement,
    ) -> GeometryResult<ShapeId>;

    fn make_volume(
        &mut self,
        name: &str,
        shape: ShapeId,
        medium: MediumId,
        style: &VolumeStyle,
    ) -> GeometryResult<VolumeId>;

    fn set_top(&mut self, volume: VolumeId) -> GeometryResult<()>;

    fn add_node(
        &mut self,
        mother: VolumeId,
        daughter: VolumeId,
        copy: u32,
        placement: &Placement,
    ) -> GeometryResult<()>;

    /// Finish the geometry. No more calls are made afterwards.
    fn close(&mut self) -> GeometryResult<()>;
}

/// Builds the volumes of one or more detectors on a backend
pub struct GeometryRenderer<B: GeometryBackend> {
    backend: B,
    library: MaterialLibrary,
    root_half_length: f64,
    media: AHashMap<String, MediumId>,
    shapes: AHashMap<String, ShapeId>,
    volumes: AHashMap<String, VolumeId>,
    placements: AHashMap<String, Placement>,
    visited: AHashSet<String>,
}

impl<B: GeometryBackend> GeometryRenderer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            library: MaterialLibrary::default(),
            root_half_length: 1000.0,
            media: AHashMap::new(),
            shapes: AHashMap::new(),
            volumes: AHashMap::new(),
            placements: AHashMap::new(),
            visited: AHashSet::new(),
        }
    }

    pub fn with_config(backend: B, config: &EngineConfig) -> Self {
        let mut renderer = Self::new(backend);
        renderer.library = MaterialLibrary::new(config.fallback_material.clone());
        renderer.root_half_length = config.root_half_length;
        renderer
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Close the backend and hand it back
    pub fn finish(mut self) -> GeometryResult<B> {
        self.backend.close()?;
        Ok(self.backend)
    }

    pub fn is_placed(&self, name: &str) -> bool {
        self.volumes.contains_key(name)
    }

    pub fn has_shape(&self, name: &str) -> bool {
        self.shapes.contains_key(name)
    }

    /// Placement recorded for a volume, in its mother's frame
    pub fn placement(&self, name: &str) -> Option<&Placement> {
        self.placements.get(name)
    }

    /// Build the tree of volumes below `mother`.
    ///
    /// Volumes whose mother chain does not reach `mother` are not placed.
    /// Several trees can be built by calling this again.
    pub fn build_volumes(&mut self, detector: &Detector, mother: &str) -> GeometryResult<()> {
        if !self.volumes.contains_key(mother) {
            if mother == ROOT_VOLUME {
                self.create_root_volume(detector)?;
            } else {
                let start = detector.find_volume(mother).ok_or_else(|| {
                    log::error!("Cannot place start volume {} because it cannot be found", mother);
                    GeometryError::VolumeNotFound(mother.to_string())
                })?;
                if !self.volumes.contains_key(ROOT_VOLUME) {
                    self.create_root_volume(detector)?;
                }
                self.visited.insert(start.name.clone());
                self.place_volume(detector, start, Some(ROOT_VOLUME))?;
            }
        }
        self.build_children(detector, mother)
    }

    fn build_children(&mut self, detector: &Detector, mother: &str) -> GeometryResult<()> {
        let children = detector.find_children(mother);
        log::debug!(
            "Placing in '{}': {:?}",
            mother,
            children.iter().map(|v| v.name.as_str()).collect::<Vec<_>>()
        );
        for child in children {
            if !self.visited.insert(child.name.clone()) {
                log::warn!("Volume {} was already visited, skipping", child.name);
                continue;
            }
            self.place_volume(detector, child, Some(mother))?;
            self.build_children(detector, &child.name)?;
        }
        Ok(())
    }

    /// Hidden vacuum box every other volume goes into
    fn create_root_volume(&mut self, detector: &Detector) -> GeometryResult<()> {
        let medium = self.medium(detector, "Vacuum", 0)?;
        let l = self.root_half_length;
        let shape = self
            .backend
            .make_shape(ROOT_VOLUME, &Solid::Box { dx: l, dy: l, dz: l })?;
        let style = VolumeStyle {
            color: Color::LIGHT_GRAY,
            visible: false,
            transparency: 0,
        };
        let root = self.backend.make_volume(ROOT_VOLUME, shape, medium, &style)?;
        self.backend.set_top(root)?;
        self.shapes.insert(ROOT_VOLUME.to_string(), shape);
        self.volumes.insert(ROOT_VOLUME.to_string(), root);
        self.placements.insert(ROOT_VOLUME.to_string(), Placement::identity());
        Ok(())
    }

    fn medium(&mut self, detector: &Detector, material: &str, transparency: u8) -> GeometryResult<MediumId> {
        let key = medium_key(material, transparency);
        if let Some(id) = self.media.get(&key) {
            return Ok(*id);
        }
        let medium = self.library.resolve(detector, material, transparency);
        // Fallbacks and vacuum defaults land on an already defined medium
        let id = match self.media.get(&medium.name) {
            Some(id) => *id,
            None => {
                log::debug!("Creating material {}", medium.name);
                let id = self.backend.define_medium(&medium)?;
                self.media.insert(medium.name.clone(), id);
                id
            }
        };
        self.media.insert(key, id);
        Ok(id)
    }

    /// Place one volume inside `mother` (its own mother when `None`).
    ///
    /// A missing mother is logged and the volume skipped. Volumes whose shape
    /// was already built are skipped too.
    pub fn place_volume(
        &mut self,
        detector: &Detector,
        volume: &Volume,
        mother: Option<&str>,
    ) -> GeometryResult<()> {
        let mother = mother.unwrap_or(volume.mother.as_str());
        let Some(&mother_id) = self.volumes.get(mother) else {
            log::error!(
                "Mother volume {} is not found, so cannot build {}",
                mother,
                volume.name
            );
            return Ok(());
        };
        if self.shapes.contains_key(&volume.name) {
            log::trace!("Shape of '{}' is done already", volume.name);
            return Ok(());
        }

        let color = volume.color_alpha();
        let mut transparency = color.transparency();
        if volume.style == 0 && transparency < WIREFRAME_TRANSPARENCY {
            transparency = WIREFRAME_TRANSPARENCY;
        }
        let medium = if volume.material == COMPONENT {
            None
        } else {
            Some(self.medium(detector, &volume.material, transparency)?)
        };

        let placement = volume.placement()?;
        self.placements.insert(volume.name.clone(), placement);
        if volume.exist == 0 {
            return Ok(());
        }

        log::debug!(
            "Mother: {} Volume: {} Type: {} Material: {} Vis: {}",
            mother,
            volume.name,
            volume.shape,
            volume.material,
            volume.visible
        );
        let shape = self.volume_shape(detector, volume)?;

        match medium {
            None => log::debug!("Component volume '{}' put on shapes table only", volume.name),
            Some(medium) => {
                let style = VolumeStyle {
                    color: color.color,
                    visible: volume.visible != 0,
                    transparency,
                };
                let id = self.backend.make_volume(&volume.name, shape, medium, &style)?;
                self.volumes.insert(volume.name.clone(), id);
                self.backend.add_node(mother_id, id, 1, &placement)?;
            }
        }
        Ok(())
    }

    fn volume_shape(&mut self, detector: &Detector, volume: &Volume) -> GeometryResult<ShapeId> {
        let id = match &volume.shape {
            ShapeType::Operation(operation) => {
                let (first, first_placement) = self.operand(detector, &operation.first)?;
                let (second, second_placement) = self.operand(detector, &operation.second)?;
                let placement = if operation.is_mother_relative() {
                    second_placement.relative_to(&first_placement)
                } else {
                    second_placement
                };
                self.backend.make_boolean(
                    &format!("{}_shape", volume.name),
                    operation.op,
                    first,
                    second,
                    &placement,
                )?
            }
            ShapeType::CopyOf(source) => {
                log::debug!("Making a copy of {}", source);
                *self
                    .shapes
                    .get(source)
                    .ok_or_else(|| GeometryError::ShapeNotPlaced(source.clone()))?
            }
            shape if shape.is_primitive() => {
                let solid = Solid::from_volume(volume)?;
                self.backend.make_shape(&volume.name, &solid)?
            }
            other => {
                return Err(GeometryError::UnsupportedShape {
                    volume: volume.name.clone(),
                    shape: other.to_string(),
                })
            }
        };
        self.shapes.insert(volume.name.clone(), id);
        Ok(id)
    }

    /// Shape and placement of a boolean operand, placed in its own mother
    /// first when needed.
    fn operand(&mut self, detector: &Detector, name: &str) -> GeometryResult<(ShapeId, Placement)> {
        if !self.shapes.contains_key(name) {
            let volume = detector
                .find_volume(name)
                .ok_or_else(|| GeometryError::VolumeNotFound(name.to_string()))?;
            self.place_volume(detector, volume, None)?;
        }
        let shape = self
            .shapes
            .get(name)
            .ok_or_else(|| GeometryError::ShapeNotPlaced(name.to_string()))?;
        let placement = self.placements.get(name).copied().unwrap_or_default();
        Ok((*shape, placement))
    }
}
