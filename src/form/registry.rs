use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tracing::{debug, trace};

use super::config::{FieldConfig, RawFieldConfig};
use super::error::FormResult;
use super::schema::FormSchema;
use super::state::FormState;
use super::validation::Validity;
use crate::markup::{Markup, NodeId};

static SUBSCRIPTION_ID_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SubscriptionId(pub u64);

impl SubscriptionId {
    pub fn next() -> Self {
        Self(SUBSCRIPTION_ID_ALLOCATOR.fetch_add(1, Ordering::SeqCst))
    }
}

/// Composite of every signal that can change what a field should render.
///
/// The host gives no event for its own validity bookkeeping, so all
/// contributing signals are polled together and compared as one value.
#[derive(Clone, Debug, PartialEq)]
pub struct Fingerprint {
    pub value: String,
    pub submitted: bool,
    pub custom_validity: Option<bool>,
    pub required: Option<bool>,
    pub dirty: Option<bool>,
    pub model_value: Option<Value>,
    pub valid: Option<bool>,
}

impl Fingerprint {
    pub fn capture(state: &FormState, name: &str, validity: Validity) -> Self {
        let field = state.field(name);
        Self {
            value: field.map(|field| field.value.clone()).unwrap_or_default(),
            submitted: state.submitted(),
            custom_validity: validity.custom,
            required: validity.required,
            dirty: field.map(|field| field.dirty),
            model_value: field.map(|field| field.model_value.clone()),
            valid: field.map(|field| field.is_valid()),
        }
    }
}

/// Borrowed view of a subscribed field handed to the reconcilers.
#[derive(Clone, Copy, Debug)]
pub struct FieldRef<'a> {
    pub node: NodeId,
    pub name: &'a str,
    pub config: &'a FieldConfig,
}

#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    node: NodeId,
    name: String,
    config: FieldConfig,
    previous: Option<Fingerprint>,
}

impl Subscription {
    fn new(node: NodeId, name: String, config: FieldConfig) -> Self {
        Self {
            id: SubscriptionId::next(),
            node,
            name,
            config,
            previous: None,
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn field(&self) -> FieldRef<'_> {
        FieldRef {
            node: self.node,
            name: &self.name,
            config: &self.config,
        }
    }

    pub fn previous(&self) -> Option<&Fingerprint> {
        self.previous.as_ref()
    }

    /// Stores `fingerprint` and reports whether it differs from the last one.
    /// The first observation always reports a change.
    pub fn observe(&mut self, fingerprint: Fingerprint) -> bool {
        if self.previous.as_ref() == Some(&fingerprint) {
            return false;
        }
        self.previous = Some(fingerprint);
        true
    }

    fn cancel(self) {
        trace!(subscription = self.id.0, field = %self.name, "subscription cancelled");
    }
}

/// The active field subscriptions of one form, in document order.
#[derive(Debug, Default)]
pub struct FieldRegistry {
    subscriptions: Vec<Subscription>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every subscription with one per named control.
    pub fn rebuild<M>(
        &mut self,
        markup: &M,
        controls: &[NodeId],
        schema: Option<&FormSchema>,
    ) -> FormResult<()>
    where
        M: Markup + ?Sized,
    {
        self.teardown();

        for &node in controls {
            let Some(name) = markup
                .attribute(node, "name")
                .map(str::trim)
                .filter(|name| !name.is_empty())
            else {
                continue;
            };

            let mut raw = RawFieldConfig::from_markup(markup, node);
            if let Some(overrides) = schema.and_then(|schema| schema.field(name)) {
                raw = raw.merge(overrides);
            }
            let config = FieldConfig::from_raw(name, &raw)?;
            let subscription = Subscription::new(node, name.to_string(), config);
            trace!(subscription = subscription.id.0, field = %name, "subscription created");
            self.subscriptions.push(subscription);
        }

        debug!(
            controls = controls.len(),
            subscriptions = self.subscriptions.len(),
            "field registry rebuilt"
        );
        Ok(())
    }

    /// Cancels every subscription exactly once. Returns how many were live.
    pub fn teardown(&mut self) -> usize {
        let mut cancelled = 0;
        while let Some(subscription) = self.subscriptions.pop() {
            subscription.cancel();
            cancelled += 1;
        }
        cancelled
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subscription> {
        self.subscriptions.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Subscription> {
        self.subscriptions
            .iter()
            .find(|subscription| subscription.name == name)
    }

    pub(super) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Subscription> {
        self.subscriptions.iter_mut()
    }
}
