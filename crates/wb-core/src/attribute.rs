//! Dynamic attributes and attribute groups.
//!
//! On the host, attributes and groups share one JSON mapping and are told
//! apart only by whether an entry carries a `dtype`. Here that distinction is
//! made once, at deserialization, by [`AttributeEntry`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Attributes of an entity, keyed by attribute or group key.
pub type Attributes = BTreeMap<String, AttributeEntry>;

/// Group metadata of an entity, keyed by group key.
pub type Groups = BTreeMap<String, GroupMeta>;

/// The data type of a leaf attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeType {
    /// Free text.
    #[default]
    String,
    /// A plain number.
    Number,
    /// A checkbox.
    Boolean,
    /// A roll formula containing `@attr` references.
    Formula,
    /// A number clamped to a `min`/`max` range.
    Resource,
}

impl AttributeType {
    /// Every dtype, in the order a sheet offers them.
    pub const ALL: [Self; 5] = [
        Self::String,
        Self::Number,
        Self::Boolean,
        Self::Formula,
        Self::Resource,
    ];

    /// The host's name for this dtype.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Number => "Number",
            Self::Boolean => "Boolean",
            Self::Formula => "Formula",
            Self::Resource => "Resource",
        }
    }

    /// Parse a dtype from the host's name for it.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The stored value of a leaf attribute.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// A checkbox state.
    Boolean(bool),
    /// A numeric value.
    Number(f64),
    /// Text, including formulas.
    Text(String),
    /// No value.
    #[default]
    Empty,
}

impl AttributeValue {
    /// Numeric reading of the value, parsing text the way the host coerces it.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Text(s) if s.trim().is_empty() => Some(0.0),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Empty => None,
        }
    }

    /// Text of the value, if it holds text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Host truthiness: empty text, zero, `false` and no value are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Boolean(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Text(s) => !s.is_empty(),
            Self::Empty => false,
        }
    }

    /// JSON form of the value, writing whole numbers as integers.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Boolean(b) => Value::Bool(*b),
            Self::Number(n) => number_to_json(*n),
            Self::Text(s) => Value::String(s.clone()),
            Self::Empty => Value::Null,
        }
    }
}

impl Serialize for AttributeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<f64> for AttributeValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for AttributeValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Whole numbers within the exactly representable range become JSON integers.
fn number_to_json(n: f64) -> Value {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

/// A typed leaf attribute.
///
/// The attribute's key is the key it is stored under; a `key` field only
/// travels in submitted form data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Data type. Required: an entry without one is a group.
    pub dtype: AttributeType,
    /// Current value.
    #[serde(default)]
    pub value: AttributeValue,
    /// Display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Lower bound for resources.
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub min: Option<f64>,
    /// Upper bound for resources.
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub max: Option<f64>,
}

impl Attribute {
    /// Create an attribute of the given dtype and value.
    pub fn new(dtype: AttributeType, value: impl Into<AttributeValue>) -> Self {
        Self {
            dtype,
            value: value.into(),
            ..Self::default()
        }
    }

    /// Create a resource attribute with its bounds.
    pub fn resource(value: f64, min: f64, max: f64) -> Self {
        Self {
            dtype: AttributeType::Resource,
            value: AttributeValue::Number(value),
            min: Some(min),
            max: Some(max),
            ..Self::default()
        }
    }

    /// Set the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Returns true for checkbox attributes.
    pub fn is_checkbox(&self) -> bool {
        self.dtype == AttributeType::Boolean
    }

    /// Returns true for resource attributes.
    pub fn is_resource(&self) -> bool {
        self.dtype == AttributeType::Resource
    }

    /// Returns true for formula attributes.
    pub fn is_formula(&self) -> bool {
        self.dtype == AttributeType::Formula
    }
}

/// Accepts numbers, numeric strings, empty strings and null for `min`/`max`.
fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Metadata of an attribute group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupMeta {
    /// Display label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl GroupMeta {
    /// Create group metadata with a label.
    pub fn labeled(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
        }
    }
}

/// One entry of an entity's attribute mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeEntry {
    /// A single typed attribute.
    Leaf(Attribute),
    /// The members of an attribute group, keyed by attribute key.
    Group(BTreeMap<String, Attribute>),
    /// Data that is neither; kept so stale documents still load.
    Invalid(Value),
}

impl AttributeEntry {
    /// The leaf attribute, if this entry is one.
    pub fn as_leaf(&self) -> Option<&Attribute> {
        match self {
            Self::Leaf(attr) => Some(attr),
            _ => None,
        }
    }

    /// The group members, if this entry is a group.
    pub fn as_group(&self) -> Option<&BTreeMap<String, Attribute>> {
        match self {
            Self::Group(members) => Some(members),
            _ => None,
        }
    }

    /// Every leaf in this entry with its path relative to the attribute map.
    pub fn leaves<'a>(&'a self, key: &'a str) -> Vec<(String, &'a Attribute)> {
        match self {
            Self::Leaf(attr) => vec![(key.to_string(), attr)],
            Self::Group(members) => members
                .iter()
                .map(|(k, attr)| (format!("{key}.{k}"), attr))
                .collect(),
            Self::Invalid(_) => Vec::new(),
        }
    }

    /// Mutable access to every leaf in this entry.
    pub fn leaves_mut(&mut self) -> Vec<&mut Attribute> {
        match self {
            Self::Leaf(attr) => vec![attr],
            Self::Group(members) => members.values_mut().collect(),
            Self::Invalid(_) => Vec::new(),
        }
    }
}

impl From<Attribute> for AttributeEntry {
    fn from(attr: Attribute) -> Self {
        Self::Leaf(attr)
    }
}
