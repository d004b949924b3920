//! System settings injected into the engine.

use serde::{Deserialize, Serialize};

use crate::error::SheetResult;
use crate::formula::MissingPolicy;

/// Initiative formula used when none (or a blank one) is configured.
pub const DEFAULT_INIT_FORMULA: &str = "1d20";

/// World-level settings of the worldbuilding system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SystemSettings {
    /// Expose attribute values at the top level of roll-data.
    pub macro_shorthand: bool,
    /// Initiative roll formula.
    pub init_formula: String,
    /// Text substituted for unresolvable formula references; `None` keeps them.
    pub missing_placeholder: Option<String>,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            macro_shorthand: true,
            init_formula: DEFAULT_INIT_FORMULA.to_string(),
            missing_placeholder: Some("0".to_string()),
        }
    }
}

impl SystemSettings {
    /// Read settings from JSON, filling absent fields with defaults.
    pub fn from_json(json: &str) -> SheetResult<Self> {
        let settings: Self = serde_json::from_str(json)?;
        let formula = settings.init_formula.clone();
        Ok(settings.with_init_formula(formula))
    }

    /// Enable or disable shorthand roll-data.
    pub fn with_shorthand(mut self, enabled: bool) -> Self {
        self.macro_shorthand = enabled;
        self
    }

    /// Set the initiative formula, falling back to the default when blank.
    pub fn with_init_formula(mut self, formula: impl Into<String>) -> Self {
        let formula = formula.into();
        let trimmed = formula.trim();
        if trimmed.is_empty() {
            tracing::warn!("blank initiative formula, using {DEFAULT_INIT_FORMULA}");
            self.init_formula = DEFAULT_INIT_FORMULA.to_string();
        } else {
            self.init_formula = trimmed.to_string();
        }
        self
    }

    /// Set the placeholder for unresolvable references.
    pub fn with_missing_placeholder(mut self, placeholder: Option<String>) -> Self {
        self.missing_placeholder = placeholder;
        self
    }

    /// The missing-reference policy these settings select.
    pub fn missing_policy(&self) -> MissingPolicy {
        match &self.missing_placeholder {
            Some(p) => MissingPolicy::Placeholder(p.clone()),
            None => MissingPolicy::Keep,
        }
    }
}
