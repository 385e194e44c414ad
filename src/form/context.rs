use super::config::FormOptions;
use super::state::FormState;
use crate::i18n::I18nManager;

/// Everything a reconciler may read during one tick.
///
/// Reconcilers write markup only from this snapshot, never from what they
/// rendered earlier.
pub struct ReconcileContext<'a, E: ?Sized> {
    pub state: &'a FormState,
    pub evaluator: &'a E,
    pub options: &'a FormOptions,
    pub messages: &'a I18nManager,
}

impl<E: ?Sized> Clone for ReconcileContext<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: ?Sized> Copy for ReconcileContext<'_, E> {}
