use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tracing::{debug, debug_span};

use super::class::reconcile_classes;
use super::config::{FormOptions, SUBMIT_ATTRIBUTE};
use super::context::ReconcileContext;
use super::error::FormResult;
use super::message::reconcile_message;
use super::registry::{FieldRegistry, Fingerprint};
use super::schema::FormSchema;
use super::state::FormState;
use super::validation::{evaluate, evaluate_validity};
use crate::expr::{Evaluator, Scope};
use crate::i18n::I18nManager;
use crate::markup::{Markup, NodeId};

static FORM_ID_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FormId(pub u64);

impl FormId {
    pub fn next() -> Self {
        Self(FORM_ID_ALLOCATOR.fetch_add(1, Ordering::SeqCst))
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TickReport {
    /// The field set changed and the registry was rebuilt first.
    pub rebuilt: bool,
    pub checked: usize,
    pub reconciled: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SubmitOutcome {
    /// At least one field is invalid; the submit action did not run.
    Invalid,
    /// The form is valid but declares no submit action.
    NoAction,
    /// The submit action ran and produced this value.
    Submitted(Value),
}

/// Owns one form's validation lifecycle.
///
/// The controller holds the form state and the evaluator and lends both to
/// the validity check and the reconcilers on every tick. The markup is
/// borrowed per call since the host owns it.
pub struct FormController<E>
where
    E: Evaluator,
{
    id: FormId,
    form: NodeId,
    options: FormOptions,
    state: FormState,
    evaluator: E,
    registry: FieldRegistry,
    schema: Option<FormSchema>,
    submit_action: Option<String>,
    messages: I18nManager,
    field_count: Option<usize>,
}

impl<E> FormController<E>
where
    E: Evaluator,
{
    pub fn attach<M>(
        markup: &M,
        form: NodeId,
        evaluator: E,
        options: FormOptions,
    ) -> FormResult<Self>
    where
        M: Markup + ?Sized,
    {
        Self::attach_inner(markup, form, evaluator, options, None)
    }

    pub fn attach_with_schema<M>(
        markup: &M,
        form: NodeId,
        evaluator: E,
        options: FormOptions,
        schema: FormSchema,
    ) -> FormResult<Self>
    where
        M: Markup + ?Sized,
    {
        Self::attach_inner(markup, form, evaluator, options, Some(schema))
    }

    fn attach_inner<M>(
        markup: &M,
        form: NodeId,
        evaluator: E,
        options: FormOptions,
        schema: Option<FormSchema>,
    ) -> FormResult<Self>
    where
        M: Markup + ?Sized,
    {
        let submit_action = schema
            .as_ref()
            .and_then(|schema| schema.submit.clone())
            .or_else(|| markup.attribute(form, SUBMIT_ATTRIBUTE).map(str::to_string))
            .filter(|action| !action.trim().is_empty());
        let messages = I18nManager::with_locale(options.locale.clone());

        let mut controller = Self {
            id: FormId::next(),
            form,
            options,
            state: FormState::new(),
            evaluator,
            registry: FieldRegistry::new(),
            schema,
            submit_action,
            messages,
            field_count: None,
        };
        controller.refresh_registry(markup)?;
        debug!(
            form = controller.id.0,
            fields = controller.registry.len(),
            "form attached"
        );
        Ok(controller)
    }

    pub fn id(&self) -> FormId {
        self.id
    }

    pub fn form(&self) -> NodeId {
        self.form
    }

    pub fn options(&self) -> &FormOptions {
        &self.options
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    /// Write access for the binding layer.
    pub fn state_mut(&mut self) -> &mut FormState {
        &mut self.state
    }

    pub fn submitted(&self) -> bool {
        self.state.submitted()
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn messages(&self) -> &I18nManager {
        &self.messages
    }

    pub fn submit_action(&self) -> Option<&str> {
        self.submit_action.as_deref()
    }

    /// One reconciliation pass over every subscribed field.
    ///
    /// Per field: validity check, fingerprint comparison and, on a change,
    /// message then class reconciliation. The first error aborts the pass.
    pub fn tick<M>(&mut self, markup: &mut M) -> FormResult<TickReport>
    where
        M: Markup + ?Sized,
    {
        let span = debug_span!("form_tick", form = self.id.0);
        let _entered = span.enter();

        let mut report = TickReport {
            rebuilt: self.refresh_registry(markup)?,
            ..TickReport::default()
        };

        for subscription in self.registry.iter_mut() {
            report.checked += 1;
            let validity = evaluate_validity(
                &mut self.state,
                subscription.name(),
                subscription.config(),
                &self.evaluator,
            )?;
            let fingerprint = Fingerprint::capture(&self.state, subscription.name(), validity);
            if !subscription.observe(fingerprint) {
                continue;
            }

            let context = ReconcileContext {
                state: &self.state,
                evaluator: &self.evaluator,
                options: &self.options,
                messages: &self.messages,
            };
            reconcile_message(markup, context, subscription.field())?;
            reconcile_classes(markup, context, subscription.field())?;
            report.reconciled += 1;
        }

        Ok(report)
    }

    /// Marks the form submitted, reconciles, and runs the submit action only
    /// when every bound field is valid.
    pub fn submit<M>(&mut self, markup: &mut M) -> FormResult<SubmitOutcome>
    where
        M: Markup + ?Sized,
    {
        self.state.set_submitted(true);
        self.tick(markup)?;

        if !self.state.is_valid() {
            debug!(form = self.id.0, "submit blocked by invalid fields");
            return Ok(SubmitOutcome::Invalid);
        }

        let Some(action) = self.submit_action.as_deref() else {
            return Ok(SubmitOutcome::NoAction);
        };
        let result = evaluate(&self.evaluator, action, &Scope::form(&self.state))?;
        debug!(form = self.id.0, "submit action evaluated");
        Ok(SubmitOutcome::Submitted(result))
    }

    /// Empties every subscribed field, makes the form pristine and clears
    /// `submitted`. The next tick removes all annotations and marks.
    pub fn reset(&mut self) {
        for subscription in self.registry.iter() {
            if let Some(field) = self.state.field_mut(subscription.name()) {
                field.value.clear();
                field.model_value = Value::String(String::new());
            }
        }
        for field in self.state.fields_mut() {
            field.set_pristine();
        }
        self.state.set_submitted(false);
        debug!(form = self.id.0, "form reset");
    }

    /// Cancels every field subscription. Safe to call more than once.
    pub fn teardown(&mut self) -> usize {
        let cancelled = self.registry.teardown();
        self.field_count = None;
        debug!(form = self.id.0, cancelled, "form torn down");
        cancelled
    }

    fn refresh_registry<M>(&mut self, markup: &M) -> FormResult<bool>
    where
        M: Markup + ?Sized,
    {
        let controls = markup.form_controls(self.form);
        if self.field_count == Some(controls.len()) {
            return Ok(false);
        }

        self.registry
            .rebuild(markup, &controls, self.schema.as_ref())?;
        self.field_count = Some(controls.len());

        let names = self
            .registry
            .iter()
            .map(|subscription| subscription.name())
            .collect::<HashSet<_>>();
        let dropped = self.state.retain_names(&names);
        if !dropped.is_empty() {
            debug!(form = self.id.0, ?dropped, "dropped state of removed fields");
        }
        Ok(true)
    }
}
