//! Read-only collaborators consumed by the engine: the material catalog and
//! the alchemist directory. Both are traits so a database-backed
//! implementation can replace the in-memory ones used by the CLI and tests.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::{AlchemistId, MaterialId};

/// A priced material as the catalog knows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: MaterialId,
    pub name: String,
    #[serde(default = "default_unit")]
    pub unit: String,
    pub unit_cost: f64,
    #[serde(default)]
    pub stock: f64,
}

fn default_unit() -> String {
    "unit".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alchemist {
    pub id: AlchemistId,
    pub name: String,
}

pub trait MaterialCatalog: Send + Sync {
    /// Returns `None` for unknown ids; pricing tolerates absence.
    fn lookup(&self, id: MaterialId) -> Option<Material>;
}

pub trait AlchemistDirectory: Send + Sync {
    fn find(&self, id: AlchemistId) -> Option<Alchemist>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    materials: HashMap<MaterialId, Material>,
}

impl InMemoryCatalog {
    pub fn new(materials: impl IntoIterator<Item = Material>) -> Self {
        Self {
            materials: materials.into_iter().map(|m| (m.id, m)).collect(),
        }
    }

    /// Materials sorted by id.
    pub fn materials(&self) -> Vec<&Material> {
        let mut all: Vec<_> = self.materials.values().collect();
        all.sort_by_key(|m| m.id);
        all
    }
}

impl MaterialCatalog for InMemoryCatalog {
    fn lookup(&self, id: MaterialId) -> Option<Material> {
        self.materials.get(&id).cloned()
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    alchemists: HashMap<AlchemistId, Alchemist>,
}

impl InMemoryDirectory {
    pub fn new(alchemists: impl IntoIterator<Item = Alchemist>) -> Self {
        Self {
            alchemists: alchemists.into_iter().map(|a| (a.id, a)).collect(),
        }
    }
}

impl AlchemistDirectory for InMemoryDirectory {
    fn find(&self, id: AlchemistId) -> Option<Alchemist> {
        self.alchemists.get(&id).cloned()
    }
}
