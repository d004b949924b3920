//! Roll requests for attributes, macros and initiative.
//!
//! The engine stops at a resolved formula string and a chat flavor; rolling
//! the dice is the host's job.

use serde::Serialize;
use wb_core::{AttributeValue, Entity, EntityId, EntityLookup};

use crate::error::{SchemaError, SheetResult};
use crate::formula::{FormulaContext, qualify_item_references, replace_formula_data};
use crate::roll_data::{RollDataOptions, build_roll_data};
use crate::settings::SystemSettings;

/// Flavor shown on initiative rolls.
pub const INITIATIVE_FLAVOR: &str = "Initiative";

/// A formula ready for the dice subsystem.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollRequest {
    /// Formula with every `@` reference substituted.
    pub formula: String,
    /// Chat flavor text.
    pub flavor: String,
}

/// Resolve a formula against an actor's roll-data.
pub fn formula_roll(
    actor: &Entity,
    formula: &str,
    flavor: &str,
    settings: &SystemSettings,
) -> SheetResult<RollRequest> {
    let data = build_roll_data(actor, &RollDataOptions::from(settings))?;
    let context = FormulaContext::new(&data);
    let resolved = replace_formula_data(formula, &context, &settings.missing_policy());
    tracing::debug!(actor = %actor.name, %flavor, formula = %resolved, "roll requested");
    Ok(RollRequest {
        formula: resolved,
        flavor: flavor.to_string(),
    })
}

/// Roll an attribute of an actor or of one of its owned items.
///
/// `attribute` is `key` or `group.key`. Item formulas may use `@item.` to
/// refer to their own item; they are still resolved against the owning
/// actor's roll-data.
pub fn attribute_roll(
    lookup: &impl EntityLookup,
    actor_id: &EntityId,
    item_id: Option<&EntityId>,
    attribute: &str,
    settings: &SystemSettings,
) -> SheetResult<RollRequest> {
    let actor = lookup
        .get(actor_id)
        .ok_or_else(|| SchemaError::EntityNotFound(actor_id.clone()))?;
    let owner = match item_id {
        Some(id) => actor
            .item(id)
            .ok_or_else(|| SchemaError::EntityNotFound(id.clone()))?,
        None => actor,
    };
    let attr = owner
        .system
        .leaf(attribute)
        .ok_or_else(|| SchemaError::AttributeNotFound(attribute.to_string()))?;

    let mut formula = match &attr.value {
        AttributeValue::Text(text) if !text.trim().is_empty() => text.trim().to_string(),
        AttributeValue::Number(_) => attr.value.to_json().to_string(),
        _ => return Err(SchemaError::NotRollable(attribute.to_string())),
    };
    if item_id.is_some() {
        formula = qualify_item_references(&formula, &owner.slug(), settings.macro_shorthand);
    }

    let key = attribute.rsplit('.').next().unwrap_or(attribute);
    let flavor = attr
        .label
        .as_deref()
        .filter(|label| !label.trim().is_empty())
        .unwrap_or(key);
    formula_roll(actor, &formula, flavor, settings)
}

/// Resolve the configured initiative formula for an actor.
pub fn initiative_roll(actor: &Entity, settings: &SystemSettings) -> SheetResult<RollRequest> {
    formula_roll(actor, &settings.init_formula, INITIATIVE_FLAVOR, settings)
}
