//! Token bar data for tracked attributes.

use serde::Serialize;
use serde_json::{Map, Value};
use wb_core::{AttributeType, Entity, get_property};

use crate::diff::merge_object;
use crate::error::SheetResult;

/// What a token bar tracks.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BarAttribute {
    /// A bare number.
    Value {
        /// Path below the actor's system data.
        attribute: String,
        /// Current value.
        value: f64,
    },
    /// A value with an upper bound, and a lower one for resources.
    Bar {
        /// Path below the actor's system data.
        attribute: String,
        /// Current value.
        value: f64,
        /// Upper bound.
        max: f64,
        /// Lower bound, carried for resource attributes.
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
    },
}

impl BarAttribute {
    /// Fraction of the bar to fill, between 0 and 1.
    ///
    /// Value and max are shifted by min first so a bar with a non-zero floor
    /// fills in proportion. Plain values have no fill.
    pub fn fill(&self) -> Option<f64> {
        let Self::Bar {
            value, max, min, ..
        } = self
        else {
            return None;
        };
        let floor = min.unwrap_or(0.0);
        let range = max - floor;
        if range <= 0.0 {
            return Some(1.0);
        }
        Some(((value - floor) / range).clamp(0.0, 1.0))
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Read the bar data at a dotted path in an actor's system data,
/// e.g. `attributes.hp` or `attributes.pools.mana`.
///
/// Returns `None` when the path holds neither a number nor an object with
/// `value` and `max`.
pub fn bar_attribute(actor: &Entity, path: &str) -> SheetResult<Option<BarAttribute>> {
    let data = serde_json::to_value(&actor.system)?;
    let Some(current) = get_property(&data, path) else {
        return Ok(None);
    };

    if let Some(value) = number(current) {
        return Ok(Some(BarAttribute::Value {
            attribute: path.to_string(),
            value,
        }));
    }

    let Value::Object(obj) = current else {
        return Ok(None);
    };
    let (Some(value), Some(max)) = (obj.get("value"), obj.get("max")) else {
        return Ok(None);
    };
    let is_resource =
        obj.get("dtype").and_then(Value::as_str) == Some(AttributeType::Resource.as_str());
    let min = is_resource.then(|| obj.get("min").and_then(number).unwrap_or(0.0));
    Ok(Some(BarAttribute::Bar {
        attribute: path.to_string(),
        value: number(value).unwrap_or(0.0),
        max: number(max).unwrap_or(0.0),
        min,
    }))
}

/// Paths below an actor's system data that a token bar can track.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackedAttributes {
    /// Objects carrying both `value` and `max`.
    pub bar: Vec<String>,
    /// Numbers and numeric strings.
    pub value: Vec<String>,
}

/// Trackable paths offered by the template actors among `entities`.
///
/// The system data of every template actor is merged into one tree before
/// it is walked, so a path appears once even when several templates have it.
pub fn tracked_attributes<'a>(
    entities: impl IntoIterator<Item = &'a Entity>,
) -> SheetResult<TrackedAttributes> {
    let mut merged = Map::new();
    for actor in entities {
        if !actor.kind.is_actor() || !actor.is_template() {
            continue;
        }
        if let Value::Object(system) = serde_json::to_value(&actor.system)? {
            merge_object(&mut merged, &system);
        }
    }

    let mut tracked = TrackedAttributes::default();
    collect_tracked(&merged, &mut Vec::new(), &mut tracked);
    tracked.bar.sort();
    tracked.value.sort();
    Ok(tracked)
}

fn collect_tracked<'a>(
    data: &'a Map<String, Value>,
    path: &mut Vec<&'a str>,
    tracked: &mut TrackedAttributes,
) {
    for (key, value) in data {
        path.push(key);
        match value {
            Value::Object(obj) if obj.contains_key("value") && obj.contains_key("max") => {
                tracked.bar.push(path.join("."));
            }
            Value::Object(obj) => collect_tracked(obj, path, tracked),
            other if number(other).is_some_and(f64::is_finite) => {
                tracked.value.push(path.join("."));
            }
            _ => {}
        }
        path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wb_core::{Attribute, EntityKind};

    fn actor() -> Entity {
        let mut actor = Entity::new(EntityKind::Character, "Kael")
            .with_attribute("hp", Attribute::resource(15.0, 10.0, 20.0))
            .with_attribute("str", Attribute::new(AttributeType::Number, 3.0))
            .with_attribute("name", Attribute::new(AttributeType::String, "Kael"))
            .with_group("pools", "Pools", [("mana", Attribute::resource(2.0, 0.0, 8.0))]);
        actor
            .system
            .extra
            .insert("health".to_string(), json!({"value": 4, "max": 8}));
        actor.system.extra.insert("level".to_string(), json!(5));
        actor
    }

    #[test]
    fn resource_bar_carries_min() {
        let bar = bar_attribute(&actor(), "attributes.hp").unwrap().unwrap();
        assert_eq!(
            bar,
            BarAttribute::Bar {
                attribute: "attributes.hp".to_string(),
                value: 15.0,
                max: 20.0,
                min: Some(10.0),
            }
        );
        assert_eq!(bar.fill(), Some(0.5));
    }

    #[test]
    fn grouped_resource_bar() {
        let bar = bar_attribute(&actor(), "attributes.pools.mana").unwrap().unwrap();
        assert_eq!(bar.fill(), Some(0.25));
    }

    #[test]
    fn plain_bar_has_no_min() {
        let bar = bar_attribute(&actor(), "health").unwrap().unwrap();
        assert!(matches!(bar, BarAttribute::Bar { min: None, .. }));
        assert_eq!(bar.fill(), Some(0.5));
    }

    #[test]
    fn bare_numbers_are_values() {
        let value = bar_attribute(&actor(), "level").unwrap().unwrap();
        assert_eq!(value.fill(), None);
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!({"type": "value", "attribute": "level", "value": 5.0})
        );
    }

    #[test]
    fn untracked_paths() {
        let actor = actor();
        assert_eq!(bar_attribute(&actor, "attributes.str").unwrap(), None);
        assert_eq!(bar_attribute(&actor, "attributes.name").unwrap(), None);
        assert_eq!(bar_attribute(&actor, "nothing.here").unwrap(), None);
    }

    #[test]
    fn tracked_paths_come_from_template_actors() {
        let mut second = Entity::new(EntityKind::Npc, "Guard")
            .with_attribute("wis", Attribute::new(AttributeType::Number, 2.0))
            .with_attribute("hp", Attribute::resource(1.0, 0.0, 4.0))
            .as_template();
        second.system.extra.insert("mood".to_string(), json!("calm"));
        let plain = Entity::new(EntityKind::Npc, "Stranger")
            .with_attribute("secret", Attribute::new(AttributeType::Number, 9.0));
        let item = Entity::new(EntityKind::Item, "Orb")
            .with_attribute("charges", Attribute::new(AttributeType::Number, 3.0))
            .as_template();
        let entities = [actor().as_template(), second, plain, item];

        let tracked = tracked_attributes(&entities).unwrap();
        assert_eq!(
            tracked.bar,
            vec!["attributes.hp", "attributes.pools.mana", "health"]
        );
        assert_eq!(
            tracked.value,
            vec!["attributes.str.value", "attributes.wis.value", "level"]
        );
    }

    #[test]
    fn no_templates_track_nothing() {
        let entities = [actor()];
        assert_eq!(
            tracked_attributes(&entities).unwrap(),
            TrackedAttributes::default()
        );
    }

    #[test]
    fn fill_is_clamped() {
        let bar = BarAttribute::Bar {
            attribute: "x".to_string(),
            value: 30.0,
            max: 20.0,
            min: Some(10.0),
        };
        assert_eq!(bar.fill(), Some(1.0));
        let flat = BarAttribute::Bar {
            attribute: "x".to_string(),
            value: 0.0,
            max: 0.0,
            min: None,
        };
        assert_eq!(flat.fill(), Some(1.0));
    }
}
