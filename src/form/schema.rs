use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::config::RawFieldConfig;
use super::error::FormResult;

/// Form configuration kept outside the markup.
///
/// Entries override the attributes of the element with the same name, key by
/// key. `submit` overrides the form's `angular-validator-submit` attribute.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FormSchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submit: Option<String>,
    pub fields: BTreeMap<String, RawFieldConfig>,
}

impl FormSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(source: &str) -> FormResult<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn with_submit(mut self, expression: impl Into<String>) -> Self {
        self.submit = Some(expression.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, config: RawFieldConfig) -> Self {
        self.fields.insert(name.into(), config);
        self
    }

    pub fn field(&self, name: &str) -> Option<&RawFieldConfig> {
        self.fields.get(name)
    }
}

/// Types that describe their form declaratively, usually through
/// `#[derive(FormSchema)]`.
pub trait FormSchemaSource {
    type Fields;

    fn fields() -> Self::Fields;
    fn form_schema() -> FormSchema;
}
