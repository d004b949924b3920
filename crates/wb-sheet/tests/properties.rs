//! Property tests for clamping, diffing, projection round-trips and formula
//! resolution.

use std::collections::BTreeSet;

use proptest::prelude::*;
use serde_json::json;
use wb_core::{Attribute, AttributeType, Entity, EntityKind, FormData};
use wb_sheet::diff::{deleted_keys, written_keys};
use wb_sheet::{
    FormulaContext, MissingPolicy, apply_update, clamp_resource, create_group, is_valid_key,
    project_attributes, replace_formula_data, update_attributes, update_entity,
};

fn leaf() -> impl Strategy<Value = Attribute> {
    let base = prop_oneof![
        (-50i32..50).prop_map(|n| Attribute::new(AttributeType::Number, f64::from(n))),
        "[a-z]{1,6}".prop_map(|s| Attribute::new(AttributeType::String, s)),
        any::<bool>().prop_map(|b| Attribute::new(AttributeType::Boolean, b)),
        "[a-z0-9@ +]{1,10}".prop_map(|s| Attribute::new(AttributeType::Formula, s)),
        (0i32..20, -5i32..5, 0i32..20).prop_map(|(v, lo, span)| {
            Attribute::resource(f64::from(v), f64::from(lo), f64::from(lo + span))
        }),
    ];
    (base, proptest::option::of("[A-Z][a-z]{0,5}"))
        .prop_map(|(attr, label)| Attribute { label, ..attr })
}

fn entity() -> impl Strategy<Value = Entity> {
    let ungrouped = proptest::collection::btree_map("u[a-z]{1,4}", leaf(), 0..5);
    let groups = proptest::collection::btree_map(
        "g[a-z]{1,4}",
        (
            "[A-Z][a-z]{0,5}",
            proptest::collection::btree_map("[a-z]{1,4}", leaf(), 0..3),
        ),
        0..3,
    );
    (ungrouped, groups).prop_map(|(ungrouped, groups)| {
        let mut entity = Entity::new(EntityKind::Character, "Prop");
        for (key, attr) in ungrouped {
            entity = entity.with_attribute(key, attr);
        }
        for (key, (label, members)) in groups {
            entity = entity.with_group(key, &label, members);
        }
        entity
    })
}

fn ungrouped_form(keys: &BTreeSet<String>) -> FormData {
    keys.iter().fold(FormData::new(), |form, key| {
        form.with(format!("system.attributes.{key}.key"), key.clone())
            .with(format!("system.attributes.{key}.dtype"), "Number")
            .with(format!("system.attributes.{key}.value"), 1)
    })
}

proptest! {
    #[test]
    fn clamped_resources_stay_in_bounds(
        value in -1.0e6f64..1.0e6,
        min in -1.0e3f64..1.0e3,
        span in 0.0f64..1.0e3,
    ) {
        let max = min + span;
        let mut attr = Attribute::resource(value, min, max);
        clamp_resource(&mut attr);
        let clamped = attr.value.as_number().unwrap_or(f64::NAN);
        prop_assert!(min <= clamped && clamped <= max);
        prop_assert!(!clamp_resource(&mut attr));
    }

    #[test]
    fn deletions_are_current_minus_submitted(
        current in proptest::collection::btree_set("k[0-7]", 0..8),
        submitted in proptest::collection::btree_set("k[0-7]", 0..8),
    ) {
        let entity = current.iter().fold(
            Entity::new(EntityKind::Npc, "Diff"),
            |e, key| e.with_attribute(key.clone(), Attribute::new(AttributeType::Number, 0.0)),
        );
        let update = update_attributes(&ungrouped_form(&submitted), &entity).unwrap();
        let attrs = update.attributes().unwrap();

        let expected_deleted: BTreeSet<&str> =
            current.difference(&submitted).map(String::as_str).collect();
        let expected_written: BTreeSet<&str> = submitted.iter().map(String::as_str).collect();
        prop_assert_eq!(deleted_keys(attrs), expected_deleted);
        prop_assert_eq!(written_keys(attrs), expected_written);
        prop_assert!(update.is_clean());
    }

    #[test]
    fn unmodified_submission_changes_nothing(entity in entity()) {
        let form = project_attributes(&entity.system).to_form();
        let update = update_entity(&form, &entity).unwrap();
        prop_assert!(update.is_clean());

        let attrs = update.attributes().unwrap();
        prop_assert!(deleted_keys(attrs).is_empty());
        for value in attrs.values() {
            if let Some(members) = value.as_object().filter(|_| value.get("dtype").is_none()) {
                prop_assert!(deleted_keys(members).is_empty());
            }
        }
        prop_assert!(deleted_keys(update.groups().unwrap()).is_empty());

        let next = apply_update(&entity, &update).unwrap();
        prop_assert_eq!(next, entity);
    }

    #[test]
    fn created_group_survives_resubmit(entity in entity(), name in "n[a-z]{1,4}") {
        let mut form = project_attributes(&entity.system).to_form();
        form.extend(create_group(&entity.system, &name).unwrap());
        let update = update_entity(&form, &entity).unwrap();
        prop_assert!(update.is_clean());
        let next = apply_update(&entity, &update).unwrap();
        prop_assert!(next.system.attributes.get(&name).and_then(|e| e.as_group()).is_some());

        let update = update_entity(&project_attributes(&next.system).to_form(), &next).unwrap();
        prop_assert!(deleted_keys(update.groups().unwrap()).is_empty());
        prop_assert!(deleted_keys(update.attributes().unwrap()).is_empty());
        prop_assert_eq!(apply_update(&next, &update).unwrap(), next);
    }

    #[test]
    fn group_key_edits_keep_members(entity in entity(), target in "[a-z]{1,6}") {
        let mut form = project_attributes(&entity.system).to_form();
        for key in entity.system.groups.keys() {
            form.insert(format!("system.groups.{key}.key"), target.clone());
        }
        let update = update_entity(&form, &entity).unwrap();
        prop_assert!(update.is_clean());
        prop_assert_eq!(apply_update(&entity, &update).unwrap(), entity);
    }

    #[test]
    fn formula_resolution_is_deterministic(
        formula in "[@a-z0-9 +.]{0,24}",
        values in proptest::collection::btree_map("[a-z]{1,3}", -5i64..5, 0..6),
    ) {
        let data = json!(values);
        let context = FormulaContext::new(&data);
        let first = replace_formula_data(&formula, &context, &MissingPolicy::zero());
        let second = replace_formula_data(&formula, &context, &MissingPolicy::zero());
        prop_assert_eq!(&first, &second);
        if !formula.contains('@') {
            prop_assert_eq!(first, formula);
        }
    }

    #[test]
    fn key_validity_matches_characters(key in "[a-z .\t_-]{0,8}") {
        let expected = !key.is_empty() && !key.contains([' ', '.', '\t']);
        prop_assert_eq!(is_valid_key(&key), expected);
    }
}
