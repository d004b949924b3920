//! Sheet controls that add or remove attribute and group fields.
//!
//! Controls never touch the entity. They edit the pending form submission,
//! and the diff turns the edited form into a patch like any other submit.

use wb_core::{AttributeType, FormData, SystemData};

use crate::diff::{ATTRIBUTES_FIELD, GROUPS_FIELD};
use crate::error::SheetResult;
use crate::projection::project_attributes;
use crate::validate::validate_group;

/// Generate an unused `attrN` key for a new attribute.
///
/// Numbering starts one past the number of entries in scope. Ungrouped keys
/// share their namespace with group keys; grouped keys only need to be
/// unique within their group.
pub fn next_attribute_key(system: &SystemData, group: Option<&str>) -> String {
    let taken = |key: &str| match group {
        Some(group) => system
            .attributes
            .get(group)
            .and_then(|entry| entry.as_group())
            .is_some_and(|members| members.contains_key(key)),
        None => system.attributes.contains_key(key) || system.is_group(key),
    };
    let count = match group {
        Some(group) => system
            .attributes
            .get(group)
            .and_then(|entry| entry.as_group())
            .map_or(0, |members| members.len()),
        None => system.attributes.len(),
    };

    let mut n = count + 1;
    loop {
        let key = format!("attr{n}");
        if !taken(&key) {
            return key;
        }
        n += 1;
    }
}

/// Form fields for a new attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttribute {
    /// The generated key.
    pub key: String,
    /// Fields to append to the form before submitting it.
    pub fields: FormData,
}

/// Build the fields for a new attribute, optionally inside a group.
///
/// Without an explicit dtype, grouped attributes are `String` and ungrouped
/// ones take the dtype of the last ungrouped attribute in sheet order.
pub fn create_attribute(
    system: &SystemData,
    group: Option<&str>,
    dtype: Option<AttributeType>,
) -> NewAttribute {
    let key = next_attribute_key(system, group);
    let dtype = dtype.unwrap_or_else(|| match group {
        Some(_) => AttributeType::String,
        None => project_attributes(system)
            .ungrouped
            .last()
            .map_or(AttributeType::String, |attr| attr.dtype),
    });

    let base = match group {
        Some(group) => format!("{ATTRIBUTES_FIELD}.{group}.{key}"),
        None => format!("{ATTRIBUTES_FIELD}.{key}"),
    };
    let mut fields = FormData::new()
        .with(format!("{base}.key"), key.clone())
        .with(format!("{base}.dtype"), dtype.as_str());
    if let Some(group) = group {
        fields.insert(format!("{base}.group"), group);
    }
    tracing::debug!(%key, group, %dtype, "new attribute fields");
    NewAttribute { key, fields }
}

/// Build the field for a new group after validating its name.
pub fn create_group(system: &SystemData, name: &str) -> SheetResult<FormData> {
    let name = name.trim();
    validate_group(name, system)?;
    Ok(FormData::new().with(format!("{GROUPS_FIELD}.{name}.key"), name))
}

/// Drop an attribute's fields from a form. `path` is `key` or `group.key`.
///
/// Returns false if the form held no such attribute.
pub fn delete_attribute(form: &mut FormData, path: &str) -> bool {
    form.remove_subtree(&format!("{ATTRIBUTES_FIELD}.{path}")) > 0
}

/// Drop a group and all of its attributes from a form.
pub fn delete_group(form: &mut FormData, group: &str) -> bool {
    let meta = form.remove_subtree(&format!("{GROUPS_FIELD}.{group}"));
    let members = form.remove_subtree(&format!("{ATTRIBUTES_FIELD}.{group}"));
    meta + members > 0
}
