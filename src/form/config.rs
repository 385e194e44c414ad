use serde::{Deserialize, Serialize};

use super::error::{FormError, FormResult};
use crate::i18n::Locale;
use crate::markup::{Markup, NodeId, Selector};

pub const SUBMIT_ATTRIBUTE: &str = "angular-validator-submit";

/// Declarative per-field configuration as written in markup or a schema file.
///
/// Keys use the attribute spelling. Empty values count as absent.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct RawFieldConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validator: Option<String>,
    #[serde(rename = "ng-required", skip_serializing_if = "Option::is_none")]
    pub required: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_message: Option<String>,
    #[serde(
        rename = "validator-message-append-to",
        skip_serializing_if = "Option::is_none"
    )]
    pub message_append_to: Option<String>,
    #[serde(rename = "validator-group", skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(
        rename = "validator-group-elements",
        skip_serializing_if = "Option::is_none"
    )]
    pub group_elements: Option<String>,
}

impl RawFieldConfig {
    pub const VALIDATOR: &'static str = "validator";
    pub const REQUIRED: &'static str = "ng-required";
    pub const REQUIRED_MESSAGE: &'static str = "required-message";
    pub const INVALID_MESSAGE: &'static str = "invalid-message";
    pub const MESSAGE_APPEND_TO: &'static str = "validator-message-append-to";
    pub const GROUP: &'static str = "validator-group";
    pub const GROUP_ELEMENTS: &'static str = "validator-group-elements";

    pub fn from_markup<M>(markup: &M, node: NodeId) -> Self
    where
        M: Markup + ?Sized,
    {
        let read = |name: &str| non_empty(markup.attribute(node, name));
        Self {
            validator: read(Self::VALIDATOR),
            required: read(Self::REQUIRED),
            required_message: read(Self::REQUIRED_MESSAGE),
            invalid_message: read(Self::INVALID_MESSAGE),
            message_append_to: read(Self::MESSAGE_APPEND_TO),
            group: read(Self::GROUP),
            group_elements: read(Self::GROUP_ELEMENTS),
        }
    }

    /// Keys set in `overrides` replace the ones in `self`.
    pub fn merge(self, overrides: &RawFieldConfig) -> Self {
        let pick = |own: Option<String>, other: &Option<String>| {
            non_empty(other.as_deref()).or_else(|| non_empty(own.as_deref()))
        };
        Self {
            validator: pick(self.validator, &overrides.validator),
            required: pick(self.required, &overrides.required),
            required_message: pick(self.required_message, &overrides.required_message),
            invalid_message: pick(self.invalid_message, &overrides.invalid_message),
            message_append_to: pick(self.message_append_to, &overrides.message_append_to),
            group: pick(self.group, &overrides.group),
            group_elements: pick(self.group_elements, &overrides.group_elements),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Typed per-field configuration, built once when the field is subscribed.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FieldConfig {
    pub validator_expr: Option<String>,
    pub required_expr: Option<String>,
    pub required_message: Option<String>,
    pub invalid_message: Option<String>,
    pub message_append_to: Option<Selector>,
    pub group_container_class: Option<String>,
    pub group_container: Option<Selector>,
    pub group_member_selector: Option<Selector>,
}

impl FieldConfig {
    pub fn from_raw(field: &str, raw: &RawFieldConfig) -> FormResult<Self> {
        let selector = |attribute: &'static str, source: Option<&str>| {
            non_empty(source)
                .map(|value| {
                    Selector::parse(&value).map_err(|source| FormError::InvalidSelector {
                        field: field.to_string(),
                        attribute,
                        source,
                    })
                })
                .transpose()
        };
        let group_container_class = non_empty(raw.group.as_deref());
        let group_container = group_container_class
            .as_deref()
            .map(|class| {
                Selector::class(class).map_err(|source| FormError::InvalidSelector {
                    field: field.to_string(),
                    attribute: RawFieldConfig::GROUP,
                    source,
                })
            })
            .transpose()?;

        Ok(Self {
            validator_expr: non_empty(raw.validator.as_deref()),
            required_expr: non_empty(raw.required.as_deref()),
            required_message: non_empty(raw.required_message.as_deref()),
            invalid_message: non_empty(raw.invalid_message.as_deref()),
            message_append_to: selector(
                RawFieldConfig::MESSAGE_APPEND_TO,
                raw.message_append_to.as_deref(),
            )?,
            group_container_class,
            group_container,
            group_member_selector: selector(
                RawFieldConfig::GROUP_ELEMENTS,
                raw.group_elements.as_deref(),
            )?,
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct FormOptions {
    /// Marker class toggled on invalid fields, their parents and groups.
    pub invalid_class: String,
    /// Class identifying an annotation; only one per field may exist.
    pub message_class: String,
    pub annotation_tag: String,
    pub annotation_classes: Vec<String>,
    pub locale: Locale,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            invalid_class: "has-error".to_string(),
            message_class: "validationMessage".to_string(),
            annotation_tag: "label".to_string(),
            annotation_classes: vec!["control-label".to_string(), "has-error".to_string()],
            locale: Locale::System,
        }
    }
}

impl FormOptions {
    pub fn from_toml_str(source: &str) -> FormResult<Self> {
        Ok(toml::from_str(source)?)
    }

    pub(super) fn annotation_class_list(&self) -> Vec<String> {
        let mut classes = self.annotation_classes.clone();
        if !classes.contains(&self.message_class) {
            classes.push(self.message_class.clone());
        }
        classes
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::Document;

    #[test]
    fn attributes_build_raw_config() {
        let mut doc = Document::new();
        let input = doc.append_element(
            doc.root(),
            "input",
            &[
                ("name", "card"),
                ("validator", "card_ok"),
                ("ng-required", "needs_card"),
                ("required-message", "'Card required'"),
                ("validator-group", "billing"),
                ("validator-group-elements", "input"),
                ("invalid-message", "  "),
            ],
        );

        let raw = RawFieldConfig::from_markup(&doc, input);
        assert_eq!(raw.validator.as_deref(), Some("card_ok"));
        assert_eq!(raw.required.as_deref(), Some("needs_card"));
        assert_eq!(raw.required_message.as_deref(), Some("'Card required'"));
        assert_eq!(raw.invalid_message, None);
        assert_eq!(raw.group.as_deref(), Some("billing"));

        let config = FieldConfig::from_raw("card", &raw).expect("valid config");
        assert_eq!(config.group_container_class.as_deref(), Some("billing"));
        assert_eq!(
            config.group_container.as_ref().map(Selector::as_str),
            Some(".billing")
        );
        assert_eq!(
            config.group_member_selector.as_ref().map(Selector::as_str),
            Some("input")
        );
    }

    #[test]
    fn merge_prefers_overrides() {
        let base = RawFieldConfig {
            validator: Some("from_markup".into()),
            invalid_message: Some("'markup'".into()),
            ..RawFieldConfig::default()
        };
        let overrides = RawFieldConfig {
            validator: Some("from_schema".into()),
            group: Some("billing".into()),
            invalid_message: Some(String::new()),
            ..RawFieldConfig::default()
        };
        let merged = base.merge(&overrides);
        assert_eq!(merged.validator.as_deref(), Some("from_schema"));
        assert_eq!(merged.group.as_deref(), Some("billing"));
        assert_eq!(merged.invalid_message.as_deref(), Some("'markup'"));
        assert!(RawFieldConfig::default().is_empty());
    }

    #[test]
    fn invalid_selectors_are_configuration_errors() {
        let raw = RawFieldConfig {
            group: Some("billing".into()),
            group_elements: Some("input >".into()),
            ..RawFieldConfig::default()
        };
        let error = FieldConfig::from_raw("card", &raw).expect_err("selector is malformed");
        assert!(matches!(
            error,
            FormError::InvalidSelector {
                attribute: "validator-group-elements",
                ..
            }
        ));
        assert!(error.is_configuration());
    }

    #[test]
    fn options_load_from_toml() {
        let options = FormOptions::from_toml_str(
            r#"
                invalid-class = "is-invalid"
                annotation-classes = ["invalid-feedback"]
                locale = "de"
            "#,
        )
        .expect("valid options");
        assert_eq!(options.invalid_class, "is-invalid");
        assert_eq!(options.message_class, "validationMessage");
        assert_eq!(options.locale, Locale::Tag("de".into()));
        assert_eq!(
            options.annotation_class_list(),
            vec!["invalid-feedback".to_string(), "validationMessage".to_string()]
        );

        assert!(matches!(
            FormOptions::from_toml_str("unknown = 1"),
            Err(FormError::InvalidConfig(_))
        ));
    }
}
