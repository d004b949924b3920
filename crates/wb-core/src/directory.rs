use std::collections::HashMap;

use crate::entity::{Entity, EntityId};

/// Read access to the host's actor and item documents.
pub trait EntityLookup {
    /// Look up a document by ID.
    fn get(&self, id: &EntityId) -> Option<&Entity>;
}

/// An in-memory collection of documents.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    entities: HashMap<EntityId, Entity>,
}

impl Directory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document, replacing any with the same ID. Returns its ID.
    pub fn insert(&mut self, entity: Entity) -> EntityId {
        let id = entity.id.clone();
        self.entities.insert(id.clone(), entity);
        id
    }

    /// Remove a document.
    pub fn remove(&mut self, id: &EntityId) -> Option<Entity> {
        self.entities.remove(id)
    }

    /// Mutable access to a document.
    pub fn get_mut(&mut self, id: &EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// Find the first document with the given name.
    pub fn find_by_name(&self, name: &str) -> Option<&Entity> {
        self.entities.values().find(|e| e.name == name)
    }

    /// Every document, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Documents flagged as templates, sorted by name.
    pub fn templates(&self) -> Vec<&Entity> {
        let mut templates: Vec<&Entity> = self.iter().filter(|e| e.is_template()).collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        templates
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if the directory holds no documents.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl EntityLookup for Directory {
    fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }
}
