//! New documents seeded from template documents.
//!
//! A template's data is copied into the new document first and the caller's
//! data is merged over it. The copy gets a fresh ID and loses the template
//! flag.

use serde_json::{Map, Value};
use wb_core::{Entity, EntityId};

use crate::diff::merge_object;
use crate::error::SheetResult;

/// Build a new document from an optional template and creation data.
///
/// `overrides` uses the host document shape (`name`, `type`, `system`, ...),
/// merges deeply over the template, and honors `-=key` deletion markers.
/// Anything but a JSON object is ignored. Without a template the overrides
/// must carry at least `name` and `type`.
pub fn create_from_template(template: Option<&Entity>, overrides: &Value) -> SheetResult<Entity> {
    let mut doc = Map::new();
    if let Some(template) = template {
        let mut copy = template.clone();
        copy.id = EntityId::new();
        copy.set_template(false);
        if let Value::Object(data) = serde_json::to_value(&copy)? {
            doc = data;
        }
    }
    if let Value::Object(overrides) = overrides {
        merge_object(&mut doc, overrides);
    }

    let entity: Entity = serde_json::from_value(Value::Object(doc))?;
    tracing::debug!(
        template = template.map(|t| t.name.as_str()),
        name = %entity.name,
        kind = %entity.kind,
        "created document"
    );
    Ok(entity)
}
