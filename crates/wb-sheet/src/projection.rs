//! Display-ready projection of an entity's attributes and groups.
//!
//! The projection is the view-model a sheet template renders. It is rebuilt
//! from the entity on every request and never written back.

use std::cmp::Ordering;

use serde::Serialize;
use serde_json::Value;
use unicase::UniCase;
use wb_core::{
    Attribute, AttributeEntry, AttributeType, AttributeValue, Entity, EntityId, EntityKind,
    FormData, SystemData,
};

/// A leaf attribute as the sheet shows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeView {
    /// Attribute key within its scope.
    pub key: String,
    /// Owning group key, for grouped attributes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Display label, falling back to the key.
    pub label: String,
    /// Current value.
    pub value: AttributeValue,
    /// Data type.
    pub dtype: AttributeType,
    /// Lower bound for resources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Upper bound for resources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Rendered as a checkbox.
    pub is_checkbox: bool,
    /// Rendered with min/max inputs.
    pub is_resource: bool,
    /// Rendered with a roll button.
    pub is_formula: bool,
}

impl AttributeView {
    fn new(key: &str, group: Option<&str>, attr: &Attribute) -> Self {
        Self {
            key: key.to_string(),
            group: group.map(str::to_string),
            label: attr.label.clone().unwrap_or_else(|| key.to_string()),
            value: attr.value.clone(),
            dtype: attr.dtype,
            min: attr.min,
            max: attr.max,
            is_checkbox: attr.is_checkbox(),
            is_resource: attr.is_resource(),
            is_formula: attr.is_formula(),
        }
    }

    /// Dotted path of the attribute below `system.attributes`.
    pub fn path(&self) -> String {
        match &self.group {
            Some(group) => format!("{group}.{}", self.key),
            None => self.key.clone(),
        }
    }
}

/// An attribute group as the sheet shows it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupView {
    /// Group key.
    pub key: String,
    /// Display label, falling back to the key.
    pub label: String,
    /// Member attributes sorted by key.
    pub attributes: Vec<AttributeView>,
}

/// The attribute region of a sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeLayout {
    /// Attributes outside any group, sorted by key.
    pub ungrouped: Vec<AttributeView>,
    /// Groups sorted by label.
    pub groups: Vec<GroupView>,
}

/// An owned item as listed on its actor's sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    /// Item ID.
    pub id: EntityId,
    /// Item name.
    pub name: String,
    /// Roll-data key of the item.
    pub slug: String,
    /// The item's own attributes.
    #[serde(flatten)]
    pub layout: AttributeLayout,
}

/// Everything a sheet template needs about an entity's attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProjection {
    /// Entity ID.
    pub id: EntityId,
    /// Entity name.
    pub name: String,
    /// Entity kind.
    pub kind: EntityKind,
    /// Dtypes offered by the dtype selector.
    pub dtypes: Vec<AttributeType>,
    /// The entity's attributes.
    #[serde(flatten)]
    pub layout: AttributeLayout,
    /// Owned items.
    pub items: Vec<ItemView>,
}

/// Locale-aware key ordering: case-insensitive first, exact text to break ties.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    UniCase::new(a).cmp(&UniCase::new(b)).then_with(|| a.cmp(b))
}

/// Build the projection of an entity and its owned items.
pub fn project_entity(entity: &Entity) -> SheetProjection {
    SheetProjection {
        id: entity.id.clone(),
        name: entity.name.clone(),
        kind: entity.kind,
        dtypes: AttributeType::ALL.to_vec(),
        layout: project_attributes(&entity.system),
        items: entity
            .items
            .iter()
            .map(|item| ItemView {
                id: item.id.clone(),
                name: item.name.clone(),
                slug: item.slug(),
                layout: project_attributes(&item.system),
            })
            .collect(),
    }
}

/// Partition and sort the attributes of one document.
///
/// Groups whose attribute entry is missing or not a member map are skipped,
/// as are non-leaf entries under ungrouped keys.
pub fn project_attributes(system: &SystemData) -> AttributeLayout {
    let mut ungrouped: Vec<AttributeView> = system
        .ungrouped_keys()
        .filter_map(|key| {
            let attr = system.attributes.get(key)?.as_leaf()?;
            Some(AttributeView::new(key, None, attr))
        })
        .collect();
    ungrouped.sort_by(|a, b| locale_cmp(&a.key, &b.key));

    let mut groups: Vec<GroupView> = system
        .groups
        .iter()
        .filter_map(|(key, meta)| {
            let Some(AttributeEntry::Group(members)) = system.attributes.get(key) else {
                return None;
            };
            let mut attributes: Vec<AttributeView> = members
                .iter()
                .map(|(k, attr)| AttributeView::new(k, Some(key), attr))
                .collect();
            attributes.sort_by(|a, b| locale_cmp(&a.key, &b.key));
            Some(GroupView {
                key: key.clone(),
                label: meta.label.clone().unwrap_or_else(|| key.clone()),
                attributes,
            })
        })
        .collect();
    groups.sort_by(|a, b| locale_cmp(&a.label, &b.label));

    AttributeLayout { ungrouped, groups }
}

impl AttributeLayout {
    /// The attribute and group fields a rendered sheet form submits unchanged.
    pub fn to_form(&self) -> FormData {
        let mut form = FormData::new();
        for attr in &self.ungrouped {
            write_attribute(&mut form, &format!("system.attributes.{}", attr.key), attr);
        }
        for group in &self.groups {
            let base = format!("system.groups.{}", group.key);
            form.insert(format!("{base}.key"), group.key.clone());
            if group.label != group.key {
                form.insert(format!("{base}.label"), group.label.clone());
            }
            for attr in &group.attributes {
                let prefix = format!("system.attributes.{}.{}", group.key, attr.key);
                form.insert(format!("{prefix}.group"), group.key.clone());
                write_attribute(&mut form, &prefix, attr);
            }
        }
        form
    }
}

fn write_attribute(form: &mut FormData, prefix: &str, attr: &AttributeView) {
    form.insert(format!("{prefix}.key"), attr.key.clone());
    form.insert(format!("{prefix}.dtype"), attr.dtype.as_str());
    form.insert(format!("{prefix}.value"), attr.value.to_json());
    if attr.label != attr.key {
        form.insert(format!("{prefix}.label"), attr.label.clone());
    }
    if let Some(min) = attr.min {
        form.insert(format!("{prefix}.min"), Value::from(min));
    }
    if let Some(max) = attr.max {
        form.insert(format!("{prefix}.max"), Value::from(max));
    }
}
