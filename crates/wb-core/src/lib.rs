//! Core types for the worldbuilding sheet engine: entities, attributes, and form data.
//!
//! This crate defines the data model that the schema engine in `wb-sheet`
//! operates on. Entities deserialize straight from the host's JSON document
//! shape; attributes are resolved once into a tagged leaf/group variant so
//! downstream code never re-inspects raw JSON to tell them apart.

/// Attribute dtypes, values, leaf attributes, and group entries.
pub mod attribute;
/// In-memory entity directory and the lookup interface used by the engine.
pub mod directory;
/// Entity identifiers, kinds, and system data.
pub mod entity;
/// Error types used throughout the crate.
pub mod error;
/// Flat form submissions and dotted-path property access.
pub mod form;
/// Machine-safe name slugs.
pub mod slug;

/// Re-export attribute types.
pub use attribute::{
    Attribute, AttributeEntry, AttributeType, AttributeValue, Attributes, GroupMeta, Groups,
};
/// Re-export directory types.
pub use directory::{Directory, EntityLookup};
/// Re-export core entity types.
pub use entity::{
    Entity, EntityId, EntityKind, FLAG_SCOPE, ID_LENGTH, SystemData, TEMPLATE_FLAG,
};
/// Re-export error types.
pub use error::{CoreError, CoreResult};
/// Re-export form types.
pub use form::{FormData, get_property, set_property};
/// Re-export the slug helper.
pub use slug::slugify;
