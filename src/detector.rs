// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! A named collection of volumes forming one GEMC detector

use crate::error::{GeometryError, GeometryResult};
use crate::geometry::{
    Material, SensitiveDetector, ShapeType, Unit, UnitPolicy, Volume, ROOT_VOLUME,
};
use ahash::{AHashMap, AHashSet};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::ops::Index;

pub const DEFAULT_VARIATION: &str = "original";

/// Ordered, name indexed set of volumes plus the hit and material
/// definitions that belong to the same detector.
#[derive(Debug, Clone, Serialize)]
pub struct Detector {
    name: String,
    pub variation: String,
    /// GEMC 2 table id; 0 or less means "next free id"
    pub table_id: i64,
    pub gemc_version: u32,
    #[serde(skip)]
    pub units: UnitPolicy,
    volumes: Vec<Volume>,
    #[serde(skip)]
    index: AHashMap<String, usize>,
    sensitive: Vec<SensitiveDetector>,
    materials: Vec<Material>,
}

impl Detector {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variation: DEFAULT_VARIATION.to_string(),
            table_id: 1,
            gemc_version: 2,
            units: UnitPolicy::default(),
            volumes: Vec::new(),
            index: AHashMap::new(),
            sensitive: Vec::new(),
            materials: Vec::new(),
        }
    }

    pub fn with_variation(mut self, variation: impl Into<String>) -> Self {
        self.variation = variation.into();
        self
    }

    pub fn with_table_id(mut self, table_id: i64) -> Self {
        self.table_id = table_id;
        self
    }

    pub fn with_gemc_version(mut self, version: u32) -> Self {
        self.gemc_version = version;
        self
    }

    pub fn with_units(mut self, units: UnitPolicy) -> Self {
        self.units = units;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> String {
        format!("Geometry for {} variation: {}", self.name, self.variation)
    }

    pub fn geometry_table(&self) -> String {
        format!("{}__geometry", self.name)
    }

    pub fn parameters_table(&self) -> String {
        format!("{}__parameters", self.name)
    }

    pub fn hit_table(&self) -> String {
        format!("{}__hit", self.name)
    }

    pub fn bank_table(&self) -> String {
        format!("{}__bank", self.name)
    }

    pub fn materials_table(&self) -> String {
        format!("{}__materials", self.name)
    }

    /// Append a volume. Names are unique within a detector.
    pub fn add(&mut self, volume: Volume) -> GeometryResult<()> {
        if self.index.contains_key(&volume.name) {
            return Err(GeometryError::DuplicateVolume(volume.name));
        }
        self.index.insert(volume.name.clone(), self.volumes.len());
        self.volumes.push(volume);
        Ok(())
    }

    /// Insert or overwrite a volume in place, returning the previous one
    pub fn replace(&mut self, volume: Volume) -> Option<Volume> {
        match self.index.get(&volume.name) {
            Some(&i) => Some(std::mem::replace(&mut self.volumes[i], volume)),
            None => {
                self.index.insert(volume.name.clone(), self.volumes.len());
                self.volumes.push(volume);
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Volume> {
        let i = self.index.remove(name)?;
        let removed = self.volumes.remove(i);
        for position in self.index.values_mut() {
            if *position > i {
                *position -= 1;
            }
        }
        Some(removed)
    }

    pub fn get(&self, name: &str) -> Option<&Volume> {
        self.index.get(name).map(|&i| &self.volumes[i])
    }

    /// Mutable access by name. Renaming through this handle is not tracked;
    /// use [`Detector::remove`] and [`Detector::add`] instead.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Volume> {
        let i = *self.index.get(name)?;
        self.volumes.get_mut(i)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Volume> {
        self.volumes.iter()
    }

    pub fn volumes(&self) -> &[Volume] {
        &self.volumes
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    pub fn find_volume(&self, name: &str) -> Option<&Volume> {
        self.get(name)
    }

    /// Volumes whose name matches `pattern` from its first character.
    /// Use `.*foo` to match anywhere and `(?i)` to ignore case.
    pub fn find_volume_regex(&self, pattern: &str) -> GeometryResult<Vec<&Volume>> {
        let re = anchored(pattern)?;
        Ok(self.volumes.iter().filter(|v| re.is_match(&v.name)).collect())
    }

    pub fn find_children(&self, mother: &str) -> Vec<&Volume> {
        self.volumes.iter().filter(|v| v.mother == mother).collect()
    }

    /// Volumes whose mother name matches `pattern`, anchored like
    /// [`Detector::find_volume_regex`]
    pub fn find_children_regex(&self, pattern: &str) -> GeometryResult<Vec<&Volume>> {
        let re = anchored(pattern)?;
        Ok(self.volumes.iter().filter(|v| re.is_match(&v.mother)).collect())
    }

    pub fn add_sensitivity(&mut self, sd: SensitiveDetector) {
        if self.find_sensitivity(&sd.name).is_some() {
            log::warn!("More than one sensitive detector with name {} in {}", sd.name, self.name);
        }
        self.sensitive.push(sd);
    }

    pub fn find_sensitivity(&self, name: &str) -> Option<&SensitiveDetector> {
        self.sensitive.iter().find(|sd| sd.name == name)
    }

    pub fn sensitivities(&self) -> &[SensitiveDetector] {
        &self.sensitive
    }

    pub fn add_material(&mut self, material: Material) {
        self.materials.push(material);
    }

    pub fn find_material(&self, name: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.name == name)
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    /// Add a red vacuum cube in `root` for checking positions by eye.
    /// `size` is the half length in cm.
    pub fn quick_add_cube(&mut self, position: [f64; 3], size: f64) -> GeometryResult<()> {
        let cube = Volume::new("Test_Cube")
            .with_description("Test Cube")
            .with_position(position, Unit::Centimeter)
            .with_rotation([0.0; 3], Unit::Degree)
            .with_color("ff0000")
            .with_shape(ShapeType::Box)
            .with_dimensions([size, size, size], Unit::Centimeter)
            .with_sensitivity("no", "no")
            .with_identity("no");
        self.add(cube)
    }

    /// Every mother must name a volume of this detector or `root`, and no
    /// chain of mothers may loop. Returns all problems found.
    pub fn check_hierarchy(&self) -> Vec<GeometryError> {
        let mut problems = Vec::new();
        for volume in &self.volumes {
            if volume.mother != ROOT_VOLUME && !self.contains(&volume.mother) {
                problems.push(GeometryError::DanglingMother {
                    volume: volume.name.clone(),
                    mother: volume.mother.clone(),
                });
            }
        }

        for volume in &self.volumes {
            let mut seen = AHashSet::new();
            let mut current = self.get(&volume.mother);
            while let Some(v) = current {
                if v.name == volume.name {
                    problems.push(GeometryError::MotherCycle(volume.name.clone()));
                    break;
                }
                if !seen.insert(v.name.as_str()) {
                    break;
                }
                current = self.get(&v.mother);
            }
        }
        problems
    }
}

fn anchored(pattern: &str) -> GeometryResult<Regex> {
    Regex::new(&format!("^(?:{})", pattern))
        .map_err(|e| GeometryError::Parse(format!("bad pattern '{}': {}", pattern, e)))
}

impl Index<usize> for Detector {
    type Output = Volume;

    fn index(&self, index: usize) -> &Volume {
        &self.volumes[index]
    }
}

impl<'a> IntoIterator for &'a Detector {
    type Item = &'a Volume;
    type IntoIter = std::slice::Iter<'a, Volume>;

    fn into_iter(self) -> Self::IntoIter {
        self.volumes.iter()
    }
}

impl fmt::Display for Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Detector: {}", self.name)?;
        writeln!(f, "Variation: {} id: {}", self.variation, self.table_id)?;
        writeln!(f, "Geometry:")?;
        for v in &self.volumes {
            writeln!(f, "     {} in {} ::{}", v.name, v.mother, v.description)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Detector {
        let mut det = Detector::new("hodo").with_variation("test");
        det.add(Volume::new("hodo_mother").with_shape(ShapeType::Box)).unwrap();
        for i in 1..=3 {
            det.add(
                Volume::new(format!("paddle_{}", i))
                    .with_mother("hodo_mother")
                    .with_shape(ShapeType::Box),
            )
            .unwrap();
        }
        det.add(Volume::new("Paddle_light").with_mother("paddle_1")).unwrap();
        det
    }

    #[test]
    fn test_add_rejects_duplicates() {
        let mut det = sample();
        assert_eq!(det.len(), 5);
        assert!(matches!(
            det.add(Volume::new("paddle_2")),
            Err(GeometryError::DuplicateVolume(_))
        ));
        assert_eq!(det.len(), 5);
    }

    #[test]
    fn test_replace_and_remove_keep_order() {
        let mut det = sample();
        let old = det.replace(Volume::new("paddle_2").with_material("Air"));
        assert!(old.is_some());
        assert_eq!(det[2].material, "Air");

        let removed = det.remove("paddle_1").unwrap();
        assert_eq!(removed.name, "paddle_1");
        assert_eq!(det[1].name, "paddle_2");
        assert_eq!(det.get("paddle_3").unwrap().name, "paddle_3");
        assert!(det.remove("paddle_1").is_none());
    }

    #[test]
    fn test_get_mut() {
        let mut det = sample();
        det.get_mut("paddle_3").unwrap().visible = 0;
        assert_eq!(det.get("paddle_3").unwrap().visible, 0);
    }

    #[test]
    fn test_regex_lookups_are_anchored() {
        let det = sample();
        assert_eq!(det.find_volume_regex("paddle").unwrap().len(), 3);
        assert_eq!(det.find_volume_regex("(?i)paddle").unwrap().len(), 4);
        assert_eq!(det.find_volume_regex("mother").unwrap().len(), 0);
        assert_eq!(det.find_volume_regex(".*mother").unwrap().len(), 1);
        assert_eq!(det.find_children_regex("hodo").unwrap().len(), 3);
        assert!(det.find_volume_regex("(").is_err());
    }

    #[test]
    fn test_children() {
        let det = sample();
        assert_eq!(det.find_children("hodo_mother").len(), 3);
        assert_eq!(det.find_children("root").len(), 1);
        assert!(det.find_children("paddle_2").is_empty());
    }

    #[test]
    fn test_description_and_display() {
        let det = sample();
        assert_eq!(det.description(), "Geometry for hodo variation: test");
        assert!(det.to_string().contains("paddle_1 in hodo_mother ::"));
    }

    #[test]
    fn test_quick_add_cube() {
        let mut det = Detector::new("t");
        det.quick_add_cube([1.0, 2.0, 3.0], 0.1).unwrap();
        let cube = det.get("Test_Cube").unwrap();
        assert_eq!(cube.color, "ff0000");
        assert_eq!(cube.material, "Vacuum");
        assert!(det.quick_add_cube([0.0; 3], 0.1).is_err());
    }

    #[test]
    fn test_check_hierarchy() {
        let mut det = sample();
        assert!(det.check_hierarchy().is_empty());

        det.add(Volume::new("orphan").with_mother("nowhere")).unwrap();
        det.add(Volume::new("a").with_mother("b")).unwrap();
        det.add(Volume::new("b").with_mother("a")).unwrap();
        det.add(Volume::new("c").with_mother("a")).unwrap();
        let problems = det.check_hierarchy();
        assert_eq!(problems.len(), 3);
        assert!(matches!(&problems[0], GeometryError::DanglingMother { mother, .. } if mother == "nowhere"));
        let cycles: Vec<_> = problems
            .iter()
            .filter_map(|p| match p {
                GeometryError::MotherCycle(name) => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(cycles, ["a", "b"]);
    }

    #[test]
    fn test_sensitivities_and_materials() {
        let mut det = sample();
        det.add_sensitivity(SensitiveDetector::new("hodo", "Hodoscope", "layer paddle", 700));
        det.add_material(Material::new("Gas", "gas mix", 0.001, vec![("G4_Ar".into(), 1.0)]));
        assert!(det.find_sensitivity("hodo").is_some());
        assert!(det.find_sensitivity("ecal").is_none());
        assert_eq!(det.find_material("Gas").unwrap().density, 0.001);
    }
}
