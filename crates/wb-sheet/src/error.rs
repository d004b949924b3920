//! Error types for the schema engine.

use std::fmt;

use wb_core::{CoreError, EntityId};

/// Which namespace a rejected key was submitted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScope {
    /// An attribute key, grouped or ungrouped.
    Attribute,
    /// A group key.
    Group,
}

impl fmt::Display for KeyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attribute => write!(f, "attribute"),
            Self::Group => write!(f, "group"),
        }
    }
}

/// Conditions reported by the schema engine.
///
/// Key and group rejections are not fatal: the diffing operations collect
/// them alongside the patch and carry on with the remaining entries.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A key contains whitespace or a period.
    #[error("{scope} key \"{key}\" may not contain spaces or periods")]
    InvalidKey {
        /// The rejected key.
        key: String,
        /// The namespace it was submitted for.
        scope: KeyScope,
    },

    /// A new group reuses an existing group key.
    #[error("group \"{0}\" already exists")]
    DuplicateGroup(String),

    /// A new group reuses the key of an ungrouped attribute.
    #[error("group \"{0}\" collides with an existing attribute")]
    GroupAttributeCollision(String),

    /// A new group uses a key reserved for the attribute namespace.
    #[error("group key \"{0}\" is reserved")]
    ReservedGroup(String),

    /// An ungrouped attribute reuses the key of a group.
    #[error("attribute \"{0}\" collides with an existing group")]
    AttributeGroupCollision(String),

    /// A document could not be found.
    #[error("document not found: {0}")]
    EntityNotFound(EntityId),

    /// An attribute path does not name a leaf attribute.
    #[error("attribute not found: {0}")]
    AttributeNotFound(String),

    /// An attribute holds nothing that can be rolled.
    #[error("attribute \"{0}\" has no formula to roll")]
    NotRollable(String),

    /// Entity or form data could not be read.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl SchemaError {
    /// Localization key for the host's notification channel.
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::InvalidKey {
                scope: KeyScope::Attribute,
                ..
            } => "SIMPLE.NotifyAttrInvalid",
            Self::InvalidKey {
                scope: KeyScope::Group,
                ..
            } => "SIMPLE.NotifyGroupAlphanumeric",
            Self::DuplicateGroup(_) => "SIMPLE.NotifyGroupDuplicate",
            Self::GroupAttributeCollision(_) => "SIMPLE.NotifyGroupAttrDuplicate",
            Self::ReservedGroup(_) => "SIMPLE.NotifyGroupReserved",
            Self::AttributeGroupCollision(_) => "SIMPLE.NotifyAttrDuplicate",
            Self::EntityNotFound(_) => "SIMPLE.NotifyDocumentMissing",
            Self::AttributeNotFound(_) | Self::NotRollable(_) => "SIMPLE.NotifyAttrMissing",
            Self::Core(_) => "SIMPLE.NotifyInvalidData",
        }
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Core(CoreError::Json(err))
    }
}

/// Convenience result type for schema engine operations.
pub type SheetResult<T> = Result<T, SchemaError>;
