//! Key validation for attributes and groups.

use wb_core::SystemData;

use crate::error::{KeyScope, SchemaError, SheetResult};

/// Group keys reserved for the attribute namespace.
pub const RESERVED_GROUP_KEYS: [&str; 2] = ["attr", "attributes"];

/// Returns true if `key` is usable as an attribute or group key.
///
/// Keys may not be empty and may not contain whitespace or `.`, which
/// separates path segments.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && !key.chars().any(|c| c.is_whitespace() || c == '.')
}

/// Check a key, naming the namespace in the error.
pub fn check_key(key: &str, scope: KeyScope) -> SheetResult<()> {
    if is_valid_key(key) {
        Ok(())
    } else {
        Err(SchemaError::InvalidKey {
            key: key.to_string(),
            scope,
        })
    }
}

/// Validate a key for a new group on an entity.
///
/// The key may not already be a group, may not collide with an ungrouped
/// attribute, may not be reserved, and must be a valid key.
pub fn validate_group(name: &str, system: &SystemData) -> SheetResult<()> {
    if system.is_group(name) {
        return Err(SchemaError::DuplicateGroup(name.to_string()));
    }
    if system.ungrouped_keys().any(|k| k == name) {
        return Err(SchemaError::GroupAttributeCollision(name.to_string()));
    }
    if RESERVED_GROUP_KEYS.contains(&name) {
        return Err(SchemaError::ReservedGroup(name.to_string()));
    }
    check_key(name, KeyScope::Group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wb_core::{Attribute, AttributeType, Entity, EntityKind};

    fn system() -> SystemData {
        Entity::new(EntityKind::Character, "Kael")
            .with_attribute("strength", Attribute::new(AttributeType::Number, 3.0))
            .with_group("skills", "Skills", Vec::<(String, Attribute)>::new())
            .system
    }

    #[test]
    fn key_characters() {
        assert!(is_valid_key("strength"));
        assert!(is_valid_key("hit-points_2"));
        assert!(!is_valid_key("hit points"));
        assert!(!is_valid_key("hit\tpoints"));
        assert!(!is_valid_key("hp.max"));
        assert!(!is_valid_key(""));
    }

    #[test]
    fn group_colliding_with_attribute() {
        let err = validate_group("strength", &system()).unwrap_err();
        assert!(matches!(err, SchemaError::GroupAttributeCollision(k) if k == "strength"));
    }

    #[test]
    fn duplicate_group() {
        let err = validate_group("skills", &system()).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateGroup(_)));
    }

    #[test]
    fn reserved_groups() {
        for name in RESERVED_GROUP_KEYS {
            assert!(matches!(
                validate_group(name, &system()),
                Err(SchemaError::ReservedGroup(_))
            ));
        }
    }

    #[test]
    fn group_with_bad_characters() {
        let err = validate_group("my group", &system()).unwrap_err();
        assert_eq!(err.message_key(), "SIMPLE.NotifyGroupAlphanumeric");
    }

    #[test]
    fn fresh_group_is_valid() {
        assert!(validate_group("spells", &system()).is_ok());
    }
}
