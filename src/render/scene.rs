// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Recording backend producing a serializable scene graph

use super::{GeometryBackend, Medium, MediumId, ShapeId, VolumeId, VolumeStyle};
use crate::error::{GeometryError, GeometryResult};
use crate::geometry::{BooleanOp, Placement, Solid};
use ahash::AHashSet;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SceneShape {
    Primitive {
        name: String,
        solid: Solid,
    },
    Boolean {
        name: String,
        op: BooleanOp,
        first: ShapeId,
        second: ShapeId,
        placement: Placement,
    },
}

impl SceneShape {
    pub fn name(&self) -> &str {
        match self {
            SceneShape::Primitive { name, .. } | SceneShape::Boolean { name, .. } => name,
        }
    }
}

/// A daughter placed inside a volume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub volume: VolumeId,
    pub copy: u32,
    pub placement: Placement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneVolume {
    pub name: String,
    pub shape: ShapeId,
    pub medium: MediumId,
    pub style: VolumeStyle,
    pub nodes: Vec<SceneNode>,
}

/// Everything a viewer needs to draw a detector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneGraph {
    pub name: String,
    pub media: Vec<Medium>,
    pub shapes: Vec<SceneShape>,
    pub volumes: Vec<SceneVolume>,
    pub top: Option<VolumeId>,
    pub closed: bool,
}

impl SceneGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn volume(&self, name: &str) -> Option<&SceneVolume> {
        self.volumes.iter().find(|v| v.name == name)
    }

    pub fn shape(&self, name: &str) -> Option<&SceneShape> {
        self.shapes.iter().find(|s| s.name() == name)
    }

    /// Placement of the second operand of a boolean shape
    pub fn boolean_placement(&self, name: &str) -> Option<&Placement> {
        match self.shape(name)? {
            SceneShape::Boolean { placement, .. } => Some(placement),
            SceneShape::Primitive { .. } => None,
        }
    }

    pub fn top_volume(&self) -> Option<&SceneVolume> {
        self.volumes.get(self.top?.0)
    }

    pub fn node_count(&self) -> usize {
        self.volumes.iter().map(|v| v.nodes.len()).sum()
    }

    /// Check that every id points at something, medium names are unique and
    /// the top volume is set
    pub fn check(&self) -> GeometryResult<()> {
        let bad = |what: String| Err(GeometryError::Backend(what));
        if self.top_volume().is_none() {
            return bad("top volume is not set".to_string());
        }
        let mut media = AHashSet::new();
        for medium in &self.media {
            if !media.insert(medium.name.as_str()) {
                return bad(format!("medium {} is defined twice", medium.name));
            }
        }
        for shape in &self.shapes {
            if let SceneShape::Boolean { name, first, second, .. } = shape {
                if first.0 >= self.shapes.len() || second.0 >= self.shapes.len() {
                    return bad(format!("boolean shape {} uses an unknown operand", name));
                }
            }
        }
        for volume in &self.volumes {
            if volume.shape.0 >= self.shapes.len() {
                return bad(format!("volume {} has an unknown shape", volume.name));
            }
            if volume.medium.0 >= self.media.len() {
                return bad(format!("volume {} has an unknown medium", volume.name));
            }
            if let Some(node) = volume.nodes.iter().find(|n| n.volume.0 >= self.volumes.len()) {
                return bad(format!(
                    "volume {} holds unknown daughter {}",
                    volume.name, node.volume.0
                ));
            }
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize scene")
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse scene")
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write scene: {:?}", path))
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scene: {:?}", path))?;
        Self::from_json(&text)
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, id: VolumeId, depth: usize) -> fmt::Result {
        let Some(volume) = self.volumes.get(id.0) else {
            return Ok(());
        };
        let medium = self
            .media
            .get(volume.medium.0)
            .map_or("?", |m| m.material.as_str());
        let shape = self.shapes.get(volume.shape.0).map_or("?", |s| match s {
            SceneShape::Primitive { .. } => "primitive",
            SceneShape::Boolean { .. } => "boolean",
        });
        writeln!(
            f,
            "{}{} [{}, {}{}]",
            "  ".repeat(depth),
            volume.name,
            shape,
            medium,
            if volume.style.visible { "" } else { ", hidden" }
        )?;
        // Guard against malformed graphs loaded from disk
        if depth > 256 {
            return Ok(());
        }
        for node in &volume.nodes {
            self.write_tree(f, node.volume, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for SceneGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Scene {}: {} media, {} shapes, {} volumes",
            self.name,
            self.media.len(),
            self.shapes.len(),
            self.volumes.len()
        )?;
        match self.top {
            Some(top) => self.write_tree(f, top, 0),
            None => Ok(()),
        }
    }
}

/// [`GeometryBackend`] that records every call into a [`SceneGraph`]
#[derive(Debug, Default)]
pub struct SceneBackend {
    graph: SceneGraph,
}

impl SceneBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            graph: SceneGraph::new(name),
        }
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn into_graph(self) -> SceneGraph {
        self.graph
    }

    fn ensure_open(&self) -> GeometryResult<()> {
        if self.graph.closed {
            return Err(GeometryError::Backend("scene is already closed".to_string()));
        }
        Ok(())
    }

    fn push_shape(&mut self, shape: SceneShape) -> ShapeId {
        self.graph.shapes.push(shape);
        ShapeId(self.graph.shapes.len() - 1)
    }
}

impl GeometryBackend for SceneBackend {
    fn define_medium(&mut self, medium: &Medium) -> GeometryResult<MediumId> {
        self.ensure_open()?;
        self.graph.media.push(medium.clone());
        Ok(MediumId(self.graph.media.len() - 1))
    }

    fn make_shape(&mut self, name: &str, solid: &Solid) -> GeometryResult<ShapeId> {
        self.ensure_open()?;
        Ok(self.push_shape(SceneShape::Primitive {
            name: name.to_string(),
            solid: solid.clone(),
        }))
    }

    fn make_boolean(
        &mut self,
        name: &str,
        op: BooleanOp,
        first: ShapeId,
        second: ShapeId,
        placement: &Placement,
    ) -> GeometryResult<ShapeId> {
        self.ensure_open()?;
        Ok(self.push_shape(SceneShape::Boolean {
            name: name.to_string(),
            op,
            first,
            second,
            placement: *placement,
        }))
    }

    fn make_volume(
        &mut self,
        name: &str,
        shape: ShapeId,
        medium: MediumId,
        style: &VolumeStyle,
    ) -> GeometryResult<VolumeId> {
        self.ensure_open()?;
        self.graph.volumes.push(SceneVolume {
            name: name.to_string(),
            shape,
            medium,
            style: *style,
            nodes: Vec::new(),
        });
        Ok(VolumeId(self.graph.volumes.len() - 1))
    }

    fn set_top(&mut self, volume: VolumeId) -> GeometryResult<()> {
        self.ensure_open()?;
        self.graph.top = Some(volume);
        Ok(())
    }

    fn add_node(
        &mut self,
        mother: VolumeId,
        daughter: VolumeId,
        copy: u32,
        placement: &Placement,
    ) -> GeometryResult<()> {
        self.ensure_open()?;
        let volume = self
            .graph
            .volumes
            .get_mut(mother.0)
            .ok_or_else(|| GeometryError::Backend(format!("unknown mother volume {}", mother.0)))?;
        volume.nodes.push(SceneNode {
            volume: daughter,
            copy,
            placement: *placement,
        });
        Ok(())
    }

    fn close(&mut self) -> GeometryResult<()> {
        self.ensure_open()?;
        self.graph.check()?;
        self.graph.closed = true;
        log::info!(
            "Closed scene {} with {} volumes and {} nodes",
            self.graph.name,
            self.graph.volumes.len(),
            self.graph.node_count()
        );
        Ok(())
    }
}
