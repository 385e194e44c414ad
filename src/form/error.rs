use crate::expr::EvalError;
use crate::markup::SelectorError;

#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("field `{field}` declares `validator-group-elements` without a `validator-group`")]
    MissingGroupContainer { field: String },
    #[error("cannot find elements by selector `{selector}` in validator-group `{group}`")]
    EmptyGroup { selector: String, group: String },
    #[error("cannot find a bound field named `{name}` in validator-group `{group}`")]
    UnboundGroupMember { name: String, group: String },
    #[error("field `{0}` is already bound")]
    DuplicateField(String),
    #[error("no bound field named `{0}`")]
    UnknownField(String),
    #[error("invalid selector in `{attribute}` of field `{field}`")]
    InvalidSelector {
        field: String,
        attribute: &'static str,
        #[source]
        source: SelectorError,
    },
    #[error("invalid form configuration")]
    InvalidConfig(#[from] toml::de::Error),
    #[error("failed to evaluate `{expression}`")]
    Evaluation {
        expression: String,
        #[source]
        source: EvalError,
    },
}

impl FormError {
    /// Markup or configuration mismatches, as opposed to evaluation failures.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, FormError::Evaluation { .. } | FormError::UnknownField(_))
    }
}

pub type FormResult<T> = Result<T, FormError>;
