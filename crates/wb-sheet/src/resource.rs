//! Resource clamping during derived-data preparation.
//!
//! A resource is a numeric attribute bounded by its own `min` and `max`.
//! Missing bounds count as zero.

use wb_core::{Attribute, AttributeValue, Attributes, Entity};

/// Clamp one resource attribute. Returns true if its value changed.
///
/// Non-resource attributes are left alone. A value that cannot be read as a
/// number counts as zero.
pub fn clamp_resource(attr: &mut Attribute) -> bool {
    if !attr.is_resource() {
        return false;
    }
    let min = attr.min.unwrap_or(0.0);
    let max = attr.max.unwrap_or(0.0);
    let current = attr.value.as_number().unwrap_or(0.0);
    let clamped = current.max(min).min(max);
    let next = AttributeValue::Number(clamped);
    if attr.value == next {
        return false;
    }
    attr.value = next;
    true
}

/// Clamp every resource attribute, including group members.
/// Returns how many values changed.
pub fn clamp_resource_values(attributes: &mut Attributes) -> usize {
    attributes
        .values_mut()
        .flat_map(|entry| entry.leaves_mut())
        .map(clamp_resource)
        .filter(|changed| *changed)
        .count()
}

/// Recompute derived data of an entity and its owned items.
pub fn prepare_derived_data(entity: &mut Entity) {
    let changed = clamp_resource_values(&mut entity.system.attributes);
    if changed > 0 {
        tracing::debug!(entity = %entity.name, changed, "clamped resource values");
    }
    for item in &mut entity.items {
        prepare_derived_data(item);
    }
}
