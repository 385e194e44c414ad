use tracing::{debug, trace};

use super::context::ReconcileContext;
use super::error::FormResult;
use super::registry::FieldRef;
use super::state::ErrorKind;
use super::validation::evaluate;
use crate::expr::{Evaluator, Scope, display_text};
use crate::markup::{Annotation, Markup, NodeId};

pub const REQUIRED_MESSAGE_KEY: &str = "validation.required";
pub const INVALID_MESSAGE_KEY: &str = "validation.invalid";
/// Attribute naming the field an annotation belongs to.
pub const ANNOTATION_OWNER_ATTRIBUTE: &str = "data-validator-for";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MessageOutcome {
    /// The field has no bound state; markup untouched.
    Unbound,
    /// No annotation should exist and none does.
    Absent,
    Shown { node: NodeId, text: String },
    /// A message was due but its `validator-message-append-to` container
    /// did not resolve.
    Unplaced { text: String },
}

/// Brings the field's error annotation in line with the current state.
///
/// The field's existing annotation, recognized by its owner attribute, is
/// removed first. Then at most one is inserted: after the field, or as the
/// last child of the configured container.
pub fn reconcile_message<M, E>(
    markup: &mut M,
    context: ReconcileContext<'_, E>,
    field: FieldRef<'_>,
) -> FormResult<MessageOutcome>
where
    M: Markup + ?Sized,
    E: Evaluator + ?Sized,
{
    let Some(state) = context.state.field(field.name) else {
        return Ok(MessageOutcome::Unbound);
    };

    if let Some(existing) = find_annotation(markup, context, field) {
        trace!(field = %field.name, "removing annotation");
        markup.remove(existing);
    }

    if !context.state.submitted() {
        return Ok(MessageOutcome::Absent);
    }

    let text = if state.has_error(&ErrorKind::Required) {
        message_text(
            context,
            field,
            field.config.required_message.as_deref(),
            REQUIRED_MESSAGE_KEY,
        )?
    } else if state.is_invalid() {
        message_text(
            context,
            field,
            field.config.invalid_message.as_deref(),
            INVALID_MESSAGE_KEY,
        )?
    } else {
        return Ok(MessageOutcome::Absent);
    };

    let annotation = Annotation {
        tag: context.options.annotation_tag.clone(),
        classes: context.options.annotation_class_list(),
        attributes: vec![(
            ANNOTATION_OWNER_ATTRIBUTE.to_string(),
            field.name.to_string(),
        )],
        text,
    };
    let inserted = match &field.config.message_append_to {
        Some(selector) => markup
            .closest(field.node, selector)
            .map(|container| markup.append_child(container, &annotation)),
        None => markup.insert_after(field.node, &annotation),
    };

    match inserted {
        Some(node) => {
            trace!(field = %field.name, text = %annotation.text, "annotation inserted");
            Ok(MessageOutcome::Shown {
                node,
                text: annotation.text,
            })
        }
        None => {
            debug!(field = %field.name, "no container for annotation");
            Ok(MessageOutcome::Unplaced {
                text: annotation.text,
            })
        }
    }
}

fn find_annotation<M, E>(
    markup: &M,
    context: ReconcileContext<'_, E>,
    field: FieldRef<'_>,
) -> Option<NodeId>
where
    M: Markup + ?Sized,
    E: ?Sized,
{
    let container = match &field.config.message_append_to {
        Some(selector) => markup.closest(field.node, selector),
        None => markup.parent(field.node),
    }?;
    markup
        .children(container)
        .into_iter()
        .find(|child| {
            markup.has_class(*child, &context.options.message_class)
                && markup.attribute(*child, ANNOTATION_OWNER_ATTRIBUTE) == Some(field.name)
        })
}

fn message_text<E>(
    context: ReconcileContext<'_, E>,
    field: FieldRef<'_>,
    configured: Option<&str>,
    default_key: &str,
) -> FormResult<String>
where
    E: Evaluator + ?Sized,
{
    match configured {
        Some(expression) => {
            let value = evaluate(
                context.evaluator,
                expression,
                &Scope::field(context.state, field.name),
            )?;
            Ok(display_text(&value))
        }
        None => Ok(context
            .messages
            .t_with(default_key, &[("field", field.name)])),
    }
}
