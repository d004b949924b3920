//! Attribute and group diffing against submitted form data.
//!
//! A sheet form submits the complete desired state of the attribute and
//! group regions. Diffing rebuilds that state from the flat fields and turns
//! it into a patch for the host's partial-update merge: submitted entries are
//! written whole, and entries that exist on the document but were not
//! submitted get a `-=key` deletion marker. A renamed attribute is simply a
//! new key plus a deletion marker for the old one. Groups are keyed by their
//! form path; a group's `key` input does not rename it, since its member map
//! lives under the same key in the attribute region.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};
use wb_core::{AttributeEntry, Entity, FormData, SystemData, get_property};

use crate::error::{KeyScope, SchemaError, SheetResult};
use crate::validate::{check_key, validate_group};

/// Prefix marking a patch key for removal.
pub const DELETION_PREFIX: &str = "-=";

/// Patch field holding the attribute region.
pub const ATTRIBUTES_FIELD: &str = "system.attributes";

/// Patch field holding the group region.
pub const GROUPS_FIELD: &str = "system.groups";

/// Patch field holding the document ID.
pub const ID_FIELD: &str = "_id";

/// The deletion marker for `key`.
pub fn deletion_key(key: &str) -> String {
    format!("{DELETION_PREFIX}{key}")
}

/// Keys marked for deletion in one patch region.
pub fn deleted_keys(region: &Map<String, Value>) -> BTreeSet<&str> {
    region
        .keys()
        .filter_map(|k| k.strip_prefix(DELETION_PREFIX))
        .collect()
}

/// Keys written in one patch region.
pub fn written_keys(region: &Map<String, Value>) -> BTreeSet<&str> {
    region
        .keys()
        .filter(|k| !k.starts_with(DELETION_PREFIX))
        .map(String::as_str)
        .collect()
}

/// The outcome of diffing a form submission.
#[derive(Debug, Default)]
pub struct SheetUpdate {
    /// Flat patch for the host's update call.
    pub patch: Map<String, Value>,
    /// Entries that were rejected and left out of the patch.
    pub issues: Vec<SchemaError>,
}

impl SheetUpdate {
    /// The attribute region of the patch.
    pub fn attributes(&self) -> Option<&Map<String, Value>> {
        self.patch.get(ATTRIBUTES_FIELD)?.as_object()
    }

    /// The group region of the patch.
    pub fn groups(&self) -> Option<&Map<String, Value>> {
        self.patch.get(GROUPS_FIELD)?.as_object()
    }

    /// Returns true if nothing was rejected.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// A diffed patch region.
#[derive(Default)]
struct RegionDiff {
    entries: Map<String, Value>,
    issues: Vec<SchemaError>,
}

impl RegionDiff {
    fn reject(&mut self, err: SchemaError) {
        tracing::warn!(error = %err, "rejected sheet entry");
        self.issues.push(err);
    }
}

/// The submitted `key` field, taking the first of duplicated inputs.
fn key_field(obj: &Map<String, Value>) -> Option<&str> {
    match obj.get("key")? {
        Value::String(s) => Some(s),
        Value::Array(values) => values.first()?.as_str(),
        _ => None,
    }
}

fn without_key(obj: &Map<String, Value>) -> Value {
    let mut obj = obj.clone();
    obj.remove("key");
    Value::Object(obj)
}

fn region<'a>(expanded: &'a Value, field: &str) -> Option<&'a Map<String, Value>> {
    get_property(expanded, field)?.as_object()
}

fn diff_attributes(submitted: Option<&Map<String, Value>>, system: &SystemData) -> RegionDiff {
    let mut diff = RegionDiff::default();
    // Current keys whose submitted edit was rejected; they keep their last value.
    let mut kept: BTreeSet<String> = BTreeSet::new();
    let mut kept_members: BTreeSet<(String, String)> = BTreeSet::new();
    let mut groups: BTreeMap<String, Map<String, Value>> = BTreeMap::new();

    for (form_key, value) in submitted.into_iter().flatten() {
        let Some(obj) = value.as_object() else {
            continue;
        };

        if let Some(raw) = key_field(obj) {
            let key = raw.trim();
            let checked = check_key(key, KeyScope::Attribute).and_then(|()| {
                if system.is_group(key) {
                    Err(SchemaError::AttributeGroupCollision(key.to_string()))
                } else {
                    Ok(())
                }
            });
            match checked {
                Ok(()) => {
                    diff.entries.insert(key.to_string(), without_key(obj));
                }
                Err(err) => {
                    diff.reject(err);
                    kept.insert(form_key.clone());
                }
            }
            continue;
        }

        for (member_key, member) in obj {
            let Some(member) = member.as_object() else {
                continue;
            };
            let group = member
                .get("group")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .unwrap_or(form_key.as_str())
                .to_string();
            let key = key_field(member).unwrap_or(member_key.as_str()).trim();
            if let Err(err) = check_key(key, KeyScope::Attribute) {
                diff.reject(err);
                kept.insert(group.clone());
                kept_members.insert((group, member_key.clone()));
                continue;
            }
            groups
                .entry(group)
                .or_default()
                .insert(key.to_string(), without_key(member));
        }
    }

    for (group, mut members) in groups {
        if diff.entries.contains_key(&group) {
            diff.reject(SchemaError::AttributeGroupCollision(group));
            continue;
        }
        if let Some(AttributeEntry::Group(current)) = system.attributes.get(&group) {
            for key in current.keys() {
                let rejected = kept_members.contains(&(group.clone(), key.clone()));
                if !members.contains_key(key) && !rejected {
                    members.insert(deletion_key(key), Value::Null);
                }
            }
        }
        diff.entries.insert(group, Value::Object(members));
    }

    for key in system.attributes.keys() {
        if !diff.entries.contains_key(key) && !kept.contains(key) {
            diff.entries.insert(deletion_key(key), Value::Null);
        }
    }
    diff
}

fn diff_groups(submitted: Option<&Map<String, Value>>, system: &SystemData) -> RegionDiff {
    let mut diff = RegionDiff::default();
    let mut kept: BTreeSet<String> = BTreeSet::new();

    for (form_key, value) in submitted.into_iter().flatten() {
        let Some(obj) = value.as_object() else {
            continue;
        };
        let name = form_key.trim();
        let checked = check_key(name, KeyScope::Group).and_then(|()| {
            if system.is_group(name) {
                Ok(())
            } else {
                validate_group(name, system)
            }
        });
        match checked {
            Ok(()) => {
                diff.entries.insert(name.to_string(), without_key(obj));
            }
            Err(err) => {
                diff.reject(err);
                kept.insert(form_key.clone());
            }
        }
    }

    for key in system.groups.keys() {
        if !diff.entries.contains_key(key) && !kept.contains(key) {
            diff.entries.insert(deletion_key(key), Value::Null);
        }
    }
    diff
}

/// Every written group gets a member map, even with no members submitted.
///
/// A group whose members were all removed keeps an emptied map, and a new
/// group starts with an empty one.
fn declare_group_members(attributes: &mut RegionDiff, groups: &RegionDiff, system: &SystemData) {
    for group in written_keys(&groups.entries) {
        if attributes.entries.contains_key(group) {
            continue;
        }
        attributes.entries.remove(&deletion_key(group));
        let members: Map<String, Value> = match system.attributes.get(group) {
            Some(AttributeEntry::Group(current)) => current
                .keys()
                .map(|k| (deletion_key(k), Value::Null))
                .collect(),
            _ => Map::new(),
        };
        attributes
            .entries
            .insert(group.to_string(), Value::Object(members));
    }
}

/// Start a patch from the fields outside the diffed regions.
fn passthrough(form: &FormData, entity: &Entity, regions: &[&str]) -> Map<String, Value> {
    let mut rest = form.clone();
    for region in regions {
        rest.remove_subtree(region);
    }
    let mut patch: Map<String, Value> = rest.into_iter().collect();
    patch.insert(ID_FIELD.to_string(), Value::String(entity.id.to_string()));
    patch
}

/// Diff the attribute region of a submission.
pub fn update_attributes(form: &FormData, entity: &Entity) -> SheetResult<SheetUpdate> {
    let expanded = form.expand()?;
    let diff = diff_attributes(region(&expanded, ATTRIBUTES_FIELD), &entity.system);
    let mut patch = passthrough(form, entity, &[ATTRIBUTES_FIELD]);
    patch.insert(ATTRIBUTES_FIELD.to_string(), Value::Object(diff.entries));
    Ok(SheetUpdate {
        patch,
        issues: diff.issues,
    })
}

/// Diff the group region of a submission.
pub fn update_groups(form: &FormData, entity: &Entity) -> SheetResult<SheetUpdate> {
    let expanded = form.expand()?;
    let diff = diff_groups(region(&expanded, GROUPS_FIELD), &entity.system);
    let mut patch = passthrough(form, entity, &[GROUPS_FIELD]);
    patch.insert(GROUPS_FIELD.to_string(), Value::Object(diff.entries));
    Ok(SheetUpdate {
        patch,
        issues: diff.issues,
    })
}

/// Diff both regions of a sheet submission into one patch.
pub fn update_entity(form: &FormData, entity: &Entity) -> SheetResult<SheetUpdate> {
    let expanded = form.expand()?;
    let mut attributes = diff_attributes(region(&expanded, ATTRIBUTES_FIELD), &entity.system);
    let groups = diff_groups(region(&expanded, GROUPS_FIELD), &entity.system);
    declare_group_members(&mut attributes, &groups, &entity.system);

    let mut patch = passthrough(form, entity, &[ATTRIBUTES_FIELD, GROUPS_FIELD]);
    tracing::debug!(
        entity = %entity.name,
        attributes_written = written_keys(&attributes.entries).len(),
        attributes_deleted = deleted_keys(&attributes.entries).len(),
        groups_written = written_keys(&groups.entries).len(),
        groups_deleted = deleted_keys(&groups.entries).len(),
        "diffed sheet submission"
    );
    patch.insert(ATTRIBUTES_FIELD.to_string(), Value::Object(attributes.entries));
    patch.insert(GROUPS_FIELD.to_string(), Value::Object(groups.entries));

    let mut issues = attributes.issues;
    issues.extend(groups.issues);
    Ok(SheetUpdate { patch, issues })
}

/// Merge `source` into `target` the way the host's partial update does.
pub(crate) fn merge_object(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        if let Some(removed) = key.strip_prefix(DELETION_PREFIX) {
            target.remove(removed);
            continue;
        }
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_object(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Apply an update to a copy of the entity, honoring deletion markers.
///
/// This mirrors the host's partial-update merge so callers can preview the
/// result of a submission.
pub fn apply_update(entity: &Entity, update: &SheetUpdate) -> SheetResult<Entity> {
    let mut doc = serde_json::to_value(entity)?;
    for (path, value) in &update.patch {
        if path == ID_FIELD {
            continue;
        }
        let mut incoming = Map::new();
        let mut parts = path.rsplit('.');
        let leaf = parts.next().unwrap_or(path);
        incoming.insert(leaf.to_string(), value.clone());
        let nested = parts.fold(Value::Object(incoming), |inner, part| {
            let mut outer = Map::new();
            outer.insert(part.to_string(), inner);
            Value::Object(outer)
        });
        if let (Value::Object(target), Value::Object(source)) = (&mut doc, &nested) {
            merge_object(target, source);
        }
    }
    Ok(serde_json::from_value(doc)?)
}
