//! Name-keyed material collection.

use std::collections::HashMap;

use crate::error::{XsError, XsResult};
use crate::material::{GroupXs, Material};

/// Validated materials sharing one group structure.
#[derive(Debug, Clone, Default)]
pub struct MaterialLibrary {
    materials: HashMap<String, Material>,
    num_groups: Option<usize>,
}

impl MaterialLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and add a material, replacing one with the same name.
    pub fn insert(&mut self, material: Material) -> XsResult<()> {
        material.validate()?;
        let g = material.num_groups();
        match self.num_groups {
            Some(expected) if expected != g => {
                return Err(XsError::GroupMismatch {
                    material: material.name.clone(),
                    expected,
                    actual: g,
                });
            }
            _ => self.num_groups = Some(g),
        }
        self.materials.insert(material.name.clone(), material);
        Ok(())
    }

    /// Build a library from several materials.
    pub fn from_materials(materials: impl IntoIterator<Item = Material>) -> XsResult<Self> {
        let mut library = Self::new();
        for m in materials {
            library.insert(m)?;
        }
        Ok(library)
    }

    pub fn get(&self, name: &str) -> XsResult<&Material> {
        self.materials
            .get(name)
            .ok_or_else(|| XsError::UnknownMaterial {
                name: name.to_string(),
            })
    }

    /// Cross sections of `material` in `group`.
    pub fn cross_sections(&self, material: &str, group: usize) -> XsResult<GroupXs<'_>> {
        self.get(material)?.group(group)
    }

    /// Group count shared by all materials (0 for an empty library).
    pub fn num_groups(&self) -> usize {
        self.num_groups.unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.materials.keys().map(String::as_str)
    }
}
