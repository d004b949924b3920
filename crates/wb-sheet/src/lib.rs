//! Attribute schema engine for the worldbuilding sheet system.
//!
//! Projects an entity's free-form attributes and groups into a sheet
//! view-model, resolves `@attr` formula references against roll-data,
//! diffs submitted forms into patches with `-=` deletion markers, and keeps
//! resource values inside their bounds. Every operation is a pure function
//! over a document snapshot; persistence, dice and rendering belong to the
//! host.

pub mod controls;
pub mod diff;
pub mod error;
pub mod formula;
pub mod projection;
pub mod resource;
pub mod roll;
pub mod roll_data;
pub mod settings;
pub mod template;
pub mod token;
pub mod validate;

pub use controls::{
    NewAttribute, create_attribute, create_group, delete_attribute, delete_group,
    next_attribute_key,
};
pub use diff::{SheetUpdate, apply_update, update_attributes, update_entity, update_groups};
pub use error::{KeyScope, SchemaError, SheetResult};
pub use formula::{FormulaContext, MissingPolicy, replace_formula_data, resolve_formula_value};
pub use projection::{
    AttributeLayout, AttributeView, GroupView, ItemView, SheetProjection, project_attributes,
    project_entity,
};
pub use resource::{clamp_resource, clamp_resource_values, prepare_derived_data};
pub use roll::{RollRequest, attribute_roll, formula_roll, initiative_roll};
pub use roll_data::{RollDataOptions, build_roll_data};
pub use settings::SystemSettings;
pub use template::create_from_template;
pub use token::{BarAttribute, TrackedAttributes, bar_attribute, tracked_attributes};
pub use validate::{check_key, is_valid_key, validate_group};
