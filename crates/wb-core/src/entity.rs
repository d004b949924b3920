use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::attribute::{Attribute, AttributeEntry, Attributes, GroupMeta, Groups};
use crate::slug::slugify;

/// Flag scope the system stores its document flags under.
pub const FLAG_SCOPE: &str = "worldbuilding";

/// Flag marking a document as a template for new documents.
pub const TEMPLATE_FLAG: &str = "isTemplate";

/// Length of generated document IDs.
pub const ID_LENGTH: usize = 16;

/// Identifier of an actor or item document.
///
/// Host IDs are opaque strings and pass through unchanged; only IDs minted
/// here follow the host's 16-character alphanumeric form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new random entity ID.
    pub fn new() -> Self {
        let mut id = Uuid::new_v4().simple().to_string();
        id.truncate(ID_LENGTH);
        Self(id)
    }

    /// The ID as the host stores it.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The document type of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A player character.
    Character,
    /// A non-player character.
    Npc,
    /// An item, owned by an actor or standing alone.
    Item,
}

impl EntityKind {
    /// Returns true for actor kinds, which may own items.
    pub fn is_actor(self) -> bool {
        matches!(self, Self::Character | Self::Npc)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Character => write!(f, "character"),
            Self::Npc => write!(f, "npc"),
            Self::Item => write!(f, "item"),
        }
    }
}

/// The system-specific data of an entity.
///
/// `attributes` and `groups` are always present after deserialization.
/// Any other system fields (biography, health, ...) are carried verbatim
/// so they stay addressable from formulas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemData {
    /// Ungrouped attributes and group member maps.
    #[serde(default)]
    pub attributes: Attributes,
    /// Group metadata, keyed by group key.
    #[serde(default)]
    pub groups: Groups,
    /// Remaining system fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SystemData {
    /// Returns true if `key` names a declared group.
    pub fn is_group(&self, key: &str) -> bool {
        self.groups.contains_key(key)
    }

    /// Keys of attribute entries that are not declared groups.
    pub fn ungrouped_keys(&self) -> impl Iterator<Item = &String> {
        self.attributes.keys().filter(|k| !self.is_group(k))
    }

    /// Look up a leaf by `key` or `group.key`.
    pub fn leaf(&self, path: &str) -> Option<&Attribute> {
        match path.split_once('.') {
            Some((group, key)) => self.attributes.get(group)?.as_group()?.get(key),
            None => self.attributes.get(path)?.as_leaf(),
        }
    }
}

/// An actor or item document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Document identifier.
    #[serde(rename = "_id", default)]
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Document type.
    #[serde(rename = "type")]
    pub kind: EntityKind,
    /// System data holding attributes and groups.
    #[serde(default)]
    pub system: SystemData,
    /// Items owned by an actor.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Entity>,
    /// Document flags, keyed by scope.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub flags: Map<String, Value>,
}

impl Entity {
    /// Create an empty entity with a fresh ID.
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            kind,
            system: SystemData::default(),
            items: Vec::new(),
            flags: Map::new(),
        }
    }

    /// Mark the entity as a template.
    pub fn as_template(mut self) -> Self {
        self.set_template(true);
        self
    }

    /// Returns true if the entity is flagged as a template.
    pub fn is_template(&self) -> bool {
        self.flags
            .get(FLAG_SCOPE)
            .and_then(|scope| scope.get(TEMPLATE_FLAG))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Set or clear the template flag. Clearing drops an emptied flag scope.
    pub fn set_template(&mut self, template: bool) {
        if template {
            let scope = self
                .flags
                .entry(FLAG_SCOPE)
                .or_insert_with(|| Value::Object(Map::new()));
            match scope.as_object_mut() {
                Some(scope) => {
                    scope.insert(TEMPLATE_FLAG.to_string(), Value::Bool(true));
                }
                None => *scope = serde_json::json!({ TEMPLATE_FLAG: true }),
            }
            return;
        }
        let emptied = match self.flags.get_mut(FLAG_SCOPE) {
            Some(Value::Object(scope)) => {
                scope.remove(TEMPLATE_FLAG);
                scope.is_empty()
            }
            _ => false,
        };
        if emptied {
            self.flags.remove(FLAG_SCOPE);
        }
    }

    /// Add an ungrouped attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, attr: Attribute) -> Self {
        self.system.attributes.insert(key.into(), AttributeEntry::Leaf(attr));
        self
    }

    /// Add a group with its label and members.
    pub fn with_group<I, K>(mut self, key: impl Into<String>, label: &str, members: I) -> Self
    where
        I: IntoIterator<Item = (K, Attribute)>,
        K: Into<String>,
    {
        let key = key.into();
        let members = members.into_iter().map(|(k, a)| (k.into(), a)).collect();
        self.system
            .attributes
            .insert(key.clone(), AttributeEntry::Group(members));
        self.system.groups.insert(key, GroupMeta::labeled(label));
        self
    }

    /// Add an owned item.
    pub fn with_item(mut self, item: Entity) -> Self {
        self.items.push(item);
        self
    }

    /// Look up an owned item by ID.
    pub fn item(&self, id: &EntityId) -> Option<&Entity> {
        self.items.iter().find(|i| &i.id == id)
    }

    /// The machine-safe form of the entity's name.
    pub fn slug(&self) -> String {
        slugify(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeType;
    use serde_json::json;

    #[test]
    fn deserialize_defaults_missing_maps() {
        let entity: Entity = serde_json::from_value(json!({
            "_id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "name": "Kael",
            "type": "character",
            "system": {"biography": "A wanderer."}
        }))
        .unwrap();
        assert!(entity.system.attributes.is_empty());
        assert!(entity.system.groups.is_empty());
        assert_eq!(entity.system.extra["biography"], json!("A wanderer."));
    }

    #[test]
    fn host_ids_pass_through() {
        let entity: Entity = serde_json::from_value(json!({
            "_id": "Xq3z9k2LmN0pQr5T",
            "name": "Kael",
            "type": "character"
        }))
        .unwrap();
        assert_eq!(entity.id.as_str(), "Xq3z9k2LmN0pQr5T");
        assert_eq!(serde_json::to_value(&entity).unwrap()["_id"], json!("Xq3z9k2LmN0pQr5T"));
    }

    #[test]
    fn generated_ids_look_like_host_ids() {
        let id = EntityId::new();
        assert_eq!(id.as_str().len(), ID_LENGTH);
        assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, EntityId::new());
    }

    #[test]
    fn leaf_lookup_by_path() {
        let entity = Entity::new(EntityKind::Character, "Kael")
            .with_attribute("hp", Attribute::resource(5.0, 0.0, 10.0))
            .with_group(
                "stats",
                "Stats",
                [("str", Attribute::new(AttributeType::Number, 3.0))],
            );
        assert!(entity.system.leaf("hp").unwrap().is_resource());
        assert_eq!(
            entity.system.leaf("stats.str").unwrap().value.as_number(),
            Some(3.0)
        );
        assert!(entity.system.leaf("stats").is_none());
        assert!(entity.system.leaf("stats.dex").is_none());
    }

    #[test]
    fn ungrouped_keys_skip_groups() {
        let entity = Entity::new(EntityKind::Npc, "Goblin")
            .with_attribute("hp", Attribute::resource(5.0, 0.0, 10.0))
            .with_group("stats", "Stats", Vec::<(String, Attribute)>::new());
        let keys: Vec<_> = entity.system.ungrouped_keys().collect();
        assert_eq!(keys, vec!["hp"]);
    }

    #[test]
    fn owned_item_lookup() {
        let sword = Entity::new(EntityKind::Item, "Long Sword");
        let id = sword.id.clone();
        let actor = Entity::new(EntityKind::Character, "Kael").with_item(sword);
        assert_eq!(actor.item(&id).unwrap().slug(), "long-sword");
        assert!(actor.item(&EntityId::new()).is_none());
    }

    #[test]
    fn template_flag() {
        let mut entity = Entity::new(EntityKind::Npc, "Goblin");
        assert!(!entity.is_template());
        entity.set_template(true);
        assert!(entity.is_template());
        assert_eq!(
            serde_json::to_value(&entity).unwrap()["flags"],
            json!({"worldbuilding": {"isTemplate": true}})
        );
        entity.set_template(false);
        assert!(!entity.is_template());
        assert!(entity.flags.is_empty());
    }

    #[test]
    fn template_flag_keeps_other_flags() {
        let mut entity: Entity = serde_json::from_value(json!({
            "name": "Goblin",
            "type": "npc",
            "flags": {"worldbuilding": {"isTemplate": true, "note": "x"}, "core": {}}
        }))
        .unwrap();
        assert!(entity.is_template());
        entity.set_template(false);
        assert_eq!(entity.flags["worldbuilding"], json!({"note": "x"}));
        assert!(entity.flags.contains_key("core"));
    }

    #[test]
    fn kinds() {
        assert!(EntityKind::Npc.is_actor());
        assert!(!EntityKind::Item.is_actor());
        assert_eq!(EntityKind::Character.to_string(), "character");
    }
}
