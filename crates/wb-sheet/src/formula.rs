//! `@attr` formula substitution.
//!
//! A formula such as `1d20 + @strength` is resolved by replacing each `@path`
//! token with the value found at that dotted path in a primary data context,
//! falling back to an optional secondary context. The dice subsystem only
//! ever sees the resolved string.

use std::sync::LazyLock;

use regex_lite::{Captures, Regex};
use serde_json::Value;
use wb_core::get_property;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([A-Za-z0-9_.-]+)").expect("valid regex"));

/// What to substitute for a token that resolves nowhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingPolicy {
    /// Leave the `@token` text in place for a later pass.
    Keep,
    /// Substitute this text.
    Placeholder(String),
}

impl MissingPolicy {
    /// Substitute `"0"` for unresolved tokens.
    pub fn zero() -> Self {
        Self::Placeholder("0".to_string())
    }
}

/// The data a formula resolves against.
#[derive(Debug, Clone, Copy)]
pub struct FormulaContext<'a> {
    /// Searched first: the document that owns the formula.
    pub primary: &'a Value,
    /// Searched when the primary context has no truthy value.
    pub secondary: Option<&'a Value>,
}

impl<'a> FormulaContext<'a> {
    /// A context with a single data source.
    pub fn new(primary: &'a Value) -> Self {
        Self {
            primary,
            secondary: None,
        }
    }

    /// Add a fallback data source.
    pub fn with_fallback(mut self, secondary: &'a Value) -> Self {
        self.secondary = Some(secondary);
        self
    }

    fn lookup(&self, path: &str) -> Option<String> {
        substitution(get_property(self.primary, path)).or_else(|| {
            self.secondary
                .and_then(|data| substitution(get_property(data, path)))
        })
    }
}

/// Text to substitute for a looked-up value, or `None` if it is falsy.
///
/// Objects and arrays have no formula text and count as unresolved.
fn substitution(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null | Value::Bool(false) => None,
        Value::Bool(true) => Some("true".to_string()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.trim().to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Replace every `@path` token in `formula`.
pub fn replace_formula_data(
    formula: &str,
    context: &FormulaContext<'_>,
    missing: &MissingPolicy,
) -> String {
    TOKEN_RE
        .replace_all(formula, |caps: &Captures<'_>| {
            let term = &caps[1];
            match (context.lookup(term), missing) {
                (Some(value), _) => value,
                (None, MissingPolicy::Placeholder(p)) => p.clone(),
                (None, MissingPolicy::Keep) => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Resolve a stored formula value.
///
/// Anything other than a string resolves to the numeric `0` sentinel.
pub fn resolve_formula_value(
    formula: &Value,
    context: &FormulaContext<'_>,
    missing: &MissingPolicy,
) -> Value {
    match formula {
        Value::String(s) => Value::String(replace_formula_data(s, context, missing)),
        _ => Value::from(0),
    }
}

/// Rewrite `@item.` references in a formula owned by an item.
///
/// The item's data lives under `items.<slug>` in its owner's roll-data;
/// without shorthand its attributes sit one level deeper, under `attributes`.
pub fn qualify_item_references(formula: &str, item_slug: &str, shorthand: bool) -> String {
    let replacement = if shorthand {
        format!("@items.{item_slug}.")
    } else {
        format!("@items.{item_slug}.attributes.")
    };
    formula.replace("@item.", &replacement)
}
