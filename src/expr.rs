//! Expression evaluation seam.
//!
//! Validators, conditional `required` checks, message text and the submit
//! action are all configuration-supplied expression strings. The engine never
//! parses them; it hands them to an [`Evaluator`] together with a [`Scope`].

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};

use serde_json::{Number, Value};

use crate::form::{FieldState, FormState};

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("no definition for expression `{0}`")]
    Undefined(String),
    #[error("{0}")]
    Failed(String),
}

/// What an expression can see: the whole form, and the field it belongs to.
#[derive(Clone, Copy)]
pub struct Scope<'a> {
    form: &'a FormState,
    field: Option<&'a str>,
}

impl<'a> Scope<'a> {
    pub fn form(form: &'a FormState) -> Self {
        Self { form, field: None }
    }

    pub fn field(form: &'a FormState, name: &'a str) -> Self {
        Self {
            form,
            field: Some(name),
        }
    }

    pub fn form_state(&self) -> &'a FormState {
        self.form
    }

    pub fn field_name(&self) -> Option<&'a str> {
        self.field
    }

    pub fn field_state(&self) -> Option<&'a FieldState> {
        self.field.and_then(|name| self.form.field(name))
    }

    /// View value of the scoped field, empty when unbound.
    pub fn value(&self) -> &'a str {
        self.field_state()
            .map(|field| field.value.as_str())
            .unwrap_or_default()
    }

    pub fn lookup(&self, name: &str) -> Option<&'a FieldState> {
        self.form.field(name)
    }
}

impl Debug for Scope<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("field", &self.field)
            .field("submitted", &self.form.submitted())
            .finish()
    }
}

pub trait Evaluator {
    fn evaluate(&self, expression: &str, scope: &Scope<'_>) -> Result<Value, EvalError>;
}

impl<F> Evaluator for F
where
    F: Fn(&str, &Scope<'_>) -> Result<Value, EvalError>,
{
    fn evaluate(&self, expression: &str, scope: &Scope<'_>) -> Result<Value, EvalError> {
        (self)(expression, scope)
    }
}

type ExpressionFn = Box<dyn Fn(&Scope<'_>) -> Result<Value, EvalError>>;

/// Table-driven evaluator: each known expression string maps to a closure.
/// Unknown expressions fall back to [`literal`].
#[derive(Default)]
pub struct Expressions {
    table: HashMap<String, ExpressionFn>,
}

impl Expressions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define<F>(mut self, expression: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Scope<'_>) -> Value + 'static,
    {
        let wrapped: ExpressionFn =
            Box::new(move |scope: &Scope<'_>| -> Result<Value, EvalError> { Ok(f(scope)) });
        self.table.insert(expression.into(), wrapped);
        self
    }

    pub fn define_fallible<F>(mut self, expression: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Scope<'_>) -> Result<Value, EvalError> + 'static,
    {
        self.table.insert(expression.into(), Box::new(f));
        self
    }

    pub fn contains(&self, expression: &str) -> bool {
        self.table.contains_key(expression.trim())
    }
}

impl Evaluator for Expressions {
    fn evaluate(&self, expression: &str, scope: &Scope<'_>) -> Result<Value, EvalError> {
        let expression = expression.trim();
        if let Some(f) = self.table.get(expression) {
            return f(scope);
        }
        literal(expression).ok_or_else(|| EvalError::Undefined(expression.to_string()))
    }
}

impl Debug for Expressions {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut keys = self.table.keys().collect::<Vec<_>>();
        keys.sort();
        f.debug_struct("Expressions").field("defined", &keys).finish()
    }
}

/// Parses quoted strings, booleans, `null`/`undefined` and numbers.
pub fn literal(expression: &str) -> Option<Value> {
    let expression = expression.trim();
    let mut chars = expression.chars();
    if let (Some(first @ ('\'' | '"')), Some(last)) = (chars.next(), chars.next_back())
        && first == last
    {
        return Some(Value::String(chars.as_str().to_string()));
    }

    match expression {
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        "null" | "undefined" => Some(Value::Null),
        _ => expression
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
    }
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Text rendering of an evaluated message.
pub fn display_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn literals_cover_strings_numbers_and_keywords() {
        assert_eq!(literal("'Email is required'"), Some(json!("Email is required")));
        assert_eq!(literal(" \"x\" "), Some(json!("x")));
        assert_eq!(literal("''"), Some(json!("")));
        assert_eq!(literal("true"), Some(json!(true)));
        assert_eq!(literal("undefined"), Some(Value::Null));
        assert_eq!(literal("3"), Some(json!(3.0)));
        assert_eq!(literal("'unbalanced"), None);
        assert_eq!(literal("'"), None);
        assert_eq!(literal("isValid(email)"), None);
    }

    #[test]
    fn truthiness_follows_script_rules() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(false)));
        assert!(is_truthy(&json!("0")));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!(-1)));
    }

    #[test]
    fn table_entries_see_the_field_scope() {
        let mut form = FormState::new();
        form.bind("email", FieldState::new("a@b.com"))
            .expect("bind email");
        let expressions = Expressions::new()
            .define("email_has_at", |scope| json!(scope.value().contains('@')))
            .define_fallible("explode", |_| Err(EvalError::Failed("boom".into())));

        let scope = Scope::field(&form, "email");
        assert_eq!(
            expressions.evaluate("email_has_at", &scope),
            Ok(json!(true))
        );
        assert_eq!(
            expressions.evaluate(" 'literal' ", &scope),
            Ok(json!("literal"))
        );
        assert_eq!(
            expressions.evaluate("explode", &scope),
            Err(EvalError::Failed("boom".into()))
        );
        assert_eq!(
            expressions.evaluate("missing()", &Scope::form(&form)),
            Err(EvalError::Undefined("missing()".into()))
        );
    }

    #[test]
    fn closures_are_evaluators() {
        let form = FormState::new();
        let evaluator = |expression: &str, _scope: &Scope<'_>| -> Result<Value, EvalError> {
            Ok(json!(expression.len()))
        };
        assert_eq!(
            evaluator.evaluate("abcd", &Scope::form(&form)),
            Ok(json!(4))
        );
    }
}
