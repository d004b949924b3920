//! Roll-data: the variable context formulas resolve against.
//!
//! Roll-data is built from an actor's system data in three steps. Literal
//! values are copied (and aliased in shorthand mode), every owned item gets
//! its own snapshot under `items.<slug>`, and only then is each formula
//! attribute resolved, once. A formula that references another formula sees
//! that formula's unresolved text or the missing placeholder, never a
//! second-pass result.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use wb_core::{AttributeEntry, Entity, SystemData, get_property, set_property};

use crate::error::SheetResult;
use crate::formula::{
    FormulaContext, MissingPolicy, qualify_item_references, resolve_formula_value,
};
use crate::settings::SystemSettings;

/// Top-level roll-data key holding owned item snapshots. Never aliased.
pub const ITEMS_KEY: &str = "items";

/// Options for building roll-data.
#[derive(Debug, Clone, PartialEq)]
pub struct RollDataOptions {
    /// Alias attribute values at the top level.
    pub shorthand: bool,
    /// Substitution for references that resolve nowhere.
    pub missing: MissingPolicy,
}

impl Default for RollDataOptions {
    fn default() -> Self {
        Self {
            shorthand: true,
            missing: MissingPolicy::zero(),
        }
    }
}

impl From<&SystemSettings> for RollDataOptions {
    fn from(settings: &SystemSettings) -> Self {
        Self {
            shorthand: settings.macro_shorthand,
            missing: settings.missing_policy(),
        }
    }
}

/// A document's data snapshot before formulas are resolved.
struct Snapshot {
    data: Value,
    /// Top-level keys that hold shorthand aliases.
    aliases: BTreeSet<String>,
    /// Paths (`key` or `group.key`) of formula attributes.
    formulas: Vec<String>,
}

impl Snapshot {
    fn build(system: &SystemData, shorthand: bool) -> SheetResult<Self> {
        let mut data = serde_json::to_value(system)?;
        let mut aliases = BTreeSet::new();
        let mut formulas = Vec::new();

        for (key, entry) in &system.attributes {
            formulas.extend(
                entry
                    .leaves(key)
                    .into_iter()
                    .filter(|(_, attr)| attr.is_formula())
                    .map(|(path, _)| path),
            );

            if !shorthand {
                continue;
            }
            let Value::Object(root) = &mut data else {
                continue;
            };
            if key == ITEMS_KEY || root.contains_key(key) {
                continue;
            }
            let alias = match entry {
                AttributeEntry::Leaf(attr) => attr.value.to_json(),
                AttributeEntry::Group(members) => Value::Object(
                    members
                        .iter()
                        .map(|(k, attr)| (k.clone(), attr.value.to_json()))
                        .collect(),
                ),
                AttributeEntry::Invalid(_) => continue,
            };
            root.insert(key.clone(), alias);
            aliases.insert(key.clone());
        }

        Ok(Self {
            data,
            aliases,
            formulas,
        })
    }

    /// Whether the formula at `path` has a shorthand alias.
    fn is_aliased(&self, path: &str) -> bool {
        let top = path.split('.').next().unwrap_or(path);
        self.aliases.contains(top)
    }
}

/// A resolved formula value waiting to be written.
struct Resolved {
    path: String,
    alias: Option<String>,
    value: Value,
}

/// Resolve the formulas of one snapshot against its own data and a fallback.
fn resolve_formulas(
    snapshot: &Snapshot,
    fallback: Option<&Value>,
    item_slug: Option<&str>,
    options: &RollDataOptions,
) -> Vec<Resolved> {
    let mut context = FormulaContext::new(&snapshot.data);
    if let Some(fallback) = fallback {
        context = context.with_fallback(fallback);
    }

    snapshot
        .formulas
        .iter()
        .filter_map(|path| {
            let value_path = format!("attributes.{path}.value");
            let raw = get_property(&snapshot.data, &value_path)?;
            if is_falsy(raw) {
                return None;
            }
            let raw = match (raw, item_slug) {
                (Value::String(s), Some(slug)) => {
                    Value::String(qualify_item_references(s, slug, options.shorthand))
                }
                _ => raw.clone(),
            };
            Some(Resolved {
                value: resolve_formula_value(&raw, &context, &options.missing),
                alias: snapshot.is_aliased(path).then(|| path.clone()),
                path: value_path,
            })
        })
        .collect()
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

fn write_resolved(data: &mut Value, prefix: &str, resolved: Vec<Resolved>) {
    for r in resolved {
        set_property(data, &format!("{prefix}{}", r.path), r.value.clone());
        if let Some(alias) = r.alias {
            set_property(data, &format!("{prefix}{alias}"), r.value);
        }
    }
}

/// Build the roll-data of an actor and its owned items.
///
/// The fully qualified `attributes` and `groups` trees are always kept.
/// Items are keyed by their slugified names; when two items share a slug
/// the later one wins.
pub fn build_roll_data(actor: &Entity, options: &RollDataOptions) -> SheetResult<Value> {
    let actor_snapshot = Snapshot::build(&actor.system, options.shorthand)?;
    let mut data = actor_snapshot.data.clone();

    let mut items = Vec::with_capacity(actor.items.len());
    let mut item_data = Map::new();
    for item in &actor.items {
        let slug = item.slug();
        let snapshot = Snapshot::build(&item.system, options.shorthand)?;
        item_data.insert(slug.clone(), snapshot.data.clone());
        items.push((slug, snapshot));
    }
    if let Value::Object(root) = &mut data {
        root.insert(ITEMS_KEY.to_string(), Value::Object(item_data));
    }

    // Item formulas see their own item first, then the actor with every
    // item's literal values in place.
    let mut pending = Vec::new();
    for (slug, snapshot) in &items {
        let resolved = resolve_formulas(snapshot, Some(&data), Some(slug.as_str()), options);
        pending.push((format!("{ITEMS_KEY}.{slug}."), resolved));
    }
    let item_formulas: usize = pending.iter().map(|(_, r)| r.len()).sum();
    for (prefix, resolved) in pending {
        write_resolved(&mut data, &prefix, resolved);
    }

    let snapshot = Snapshot {
        data: data.clone(),
        ..actor_snapshot
    };
    let resolved = resolve_formulas(&snapshot, None, None, options);
    let actor_formulas = resolved.len();
    write_resolved(&mut data, "", resolved);

    tracing::debug!(
        actor = %actor.name,
        items = items.len(),
        item_formulas,
        actor_formulas,
        shorthand = options.shorthand,
        "built roll data"
    );
    Ok(data)
}
