use serde_json::Value;
use tracing::trace;

use super::config::FieldConfig;
use super::error::{FormError, FormResult};
use super::state::{ErrorKind, FormState};
use crate::expr::{Evaluator, Scope, is_truthy};

/// Outcome of the per-tick validity checks, folded into the fingerprint.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Validity {
    /// Result of the custom validator, when one ran.
    pub custom: Option<bool>,
    /// Result of the conditional required expression, when one is declared.
    pub required: Option<bool>,
}

/// Runs the field's custom validator and conditional required check.
///
/// A falsy validator result sets [`ErrorKind::Custom`] and a truthy one
/// clears it; no other error kind is touched. The required check only
/// reports its value. If evaluation fails the field keeps its prior validity.
pub fn evaluate_validity<E>(
    state: &mut FormState,
    name: &str,
    config: &FieldConfig,
    evaluator: &E,
) -> FormResult<Validity>
where
    E: Evaluator + ?Sized,
{
    let mut validity = Validity::default();

    if let Some(expression) = &config.validator_expr
        && state.is_bound(name)
    {
        let result = evaluate(evaluator, expression, &Scope::field(state, name))?;
        let is_valid = is_truthy(&result);
        state
            .try_field_mut(name)?
            .set_validity(ErrorKind::Custom, is_valid);
        trace!(field = %name, is_valid, "custom validator evaluated");
        validity.custom = Some(is_valid);
    }

    if let Some(expression) = &config.required_expr {
        let result = evaluate(evaluator, expression, &Scope::field(state, name))?;
        validity.required = Some(is_truthy(&result));
    }

    Ok(validity)
}

pub(crate) fn evaluate<E>(evaluator: &E, expression: &str, scope: &Scope<'_>) -> FormResult<Value>
where
    E: Evaluator + ?Sized,
{
    evaluator
        .evaluate(expression, scope)
        .map_err(|source| FormError::Evaluation {
            expression: expression.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{EvalError, Expressions};
    use crate::form::FieldState;
    use serde_json::json;

    fn evaluator() -> Expressions {
        Expressions::new()
            .define("email_has_at", |scope| json!(scope.value().contains('@')))
            .define("needs_email", |scope| {
                json!(scope.lookup("newsletter").is_some_and(|field| field.value == "yes"))
            })
            .define_fallible("broken", |_| Err(EvalError::Failed("boom".into())))
    }

    fn config(validator: Option<&str>, required: Option<&str>) -> FieldConfig {
        FieldConfig {
            validator_expr: validator.map(str::to_string),
            required_expr: required.map(str::to_string),
            ..FieldConfig::default()
        }
    }

    #[test]
    fn custom_validator_sets_and_clears_only_custom_kind() {
        let mut state = FormState::new();
        state
            .bind("email", FieldState::new("abc").with_error(ErrorKind::Required))
            .expect("bind");
        let config = config(Some("email_has_at"), None);

        let validity =
            evaluate_validity(&mut state, "email", &config, &evaluator()).expect("evaluates");
        assert_eq!(validity.custom, Some(false));
        let field = state.field("email").expect("bound");
        assert!(field.has_error(&ErrorKind::Custom));
        assert!(field.has_error(&ErrorKind::Required));

        state
            .try_field_mut("email")
            .expect("bound")
            .set_view_value("a@b.com");
        let validity =
            evaluate_validity(&mut state, "email", &config, &evaluator()).expect("evaluates");
        assert_eq!(validity.custom, Some(true));
        let field = state.field("email").expect("bound");
        assert!(!field.has_error(&ErrorKind::Custom));
        assert!(field.has_error(&ErrorKind::Required));
    }

    #[test]
    fn required_expression_reports_without_changing_validity() {
        let mut state = FormState::new();
        state.bind("email", FieldState::new("")).expect("bind");
        state
            .bind("newsletter", FieldState::new("yes"))
            .expect("bind");

        let validity = evaluate_validity(
            &mut state,
            "email",
            &config(None, Some("needs_email")),
            &evaluator(),
        )
        .expect("evaluates");
        assert_eq!(
            validity,
            Validity {
                custom: None,
                required: Some(true),
            }
        );
        assert!(state.field("email").expect("bound").is_valid());
    }

    #[test]
    fn unbound_fields_skip_the_custom_validator() {
        let mut state = FormState::new();
        let validity = evaluate_validity(
            &mut state,
            "ghost",
            &config(Some("broken"), None),
            &evaluator(),
        )
        .expect("validator never runs");
        assert_eq!(validity, Validity::default());
    }

    #[test]
    fn evaluation_failure_propagates_and_keeps_prior_validity() {
        let mut state = FormState::new();
        state
            .bind("email", FieldState::new("x").with_error(ErrorKind::Custom))
            .expect("bind");

        let error = evaluate_validity(
            &mut state,
            "email",
            &config(Some("broken"), None),
            &evaluator(),
        )
        .expect_err("broken validator");
        assert!(matches!(
            error,
            FormError::Evaluation { ref expression, source: EvalError::Failed(_) }
                if expression == "broken"
        ));
        assert!(!error.is_configuration());
        assert!(
            state
                .field("email")
                .expect("bound")
                .has_error(&ErrorKind::Custom)
        );
    }
}
