use tracing::trace;

use super::context::ReconcileContext;
use super::error::{FormError, FormResult};
use super::registry::FieldRef;
use crate::markup::{Markup, NodeId};

/// Where the invalid marker class ended up after reconciliation.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ClassMarks {
    /// Field and its parent.
    pub field: bool,
    pub group: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ClassOutcome {
    Unbound,
    Applied(ClassMarks),
}

/// Brings the invalid marker class on the field, its parent and its group
/// container in line with the current state.
///
/// Marks are cleared first and then set from scratch. A single invalid
/// field marks its whole group; a valid field with
/// `validator-group-elements` marks the group when any member is invalid.
pub fn reconcile_classes<M, E>(
    markup: &mut M,
    context: ReconcileContext<'_, E>,
    field: FieldRef<'_>,
) -> FormResult<ClassOutcome>
where
    M: Markup + ?Sized,
    E: ?Sized,
{
    let config = field.config;
    if config.group_member_selector.is_some() && config.group_container_class.is_none() {
        return Err(FormError::MissingGroupContainer {
            field: field.name.to_string(),
        });
    }

    let Some(state) = context.state.field(field.name) else {
        return Ok(ClassOutcome::Unbound);
    };

    let invalid_class = context.options.invalid_class.as_str();
    let parent = markup.parent(field.node);
    let group = config
        .group_container
        .as_ref()
        .and_then(|selector| markup.closest(field.node, selector));

    for node in marked_nodes(field.node, parent, group) {
        markup.remove_class(node, invalid_class);
    }

    let mut marks = ClassMarks::default();
    if !context.state.submitted() {
        return Ok(ClassOutcome::Applied(marks));
    }

    if state.is_invalid() {
        markup.add_class(field.node, invalid_class);
        if let Some(parent) = parent {
            markup.add_class(parent, invalid_class);
        }
        marks.field = true;
        if let Some(group) = group {
            markup.add_class(group, invalid_class);
            marks.group = true;
        }
    } else if let Some(members_selector) = &config.group_member_selector {
        let group_name = config.group_container_class.clone().unwrap_or_default();
        let members = group
            .map(|group| markup.select_within(group, members_selector))
            .unwrap_or_default();
        if members.is_empty() {
            return Err(FormError::EmptyGroup {
                selector: members_selector.to_string(),
                group: group_name,
            });
        }

        let mut any_invalid = false;
        for member in members {
            let name = markup.attribute(member, "name").unwrap_or_default();
            let Some(member_state) = context.state.field(name) else {
                return Err(FormError::UnboundGroupMember {
                    name: name.to_string(),
                    group: group_name,
                });
            };
            any_invalid |= member_state.is_invalid();
        }

        if any_invalid && let Some(group) = group {
            markup.add_class(group, invalid_class);
            marks.group = true;
        }
    }

    trace!(
        field = %field.name,
        field_marked = marks.field,
        group_marked = marks.group,
        "classes reconciled"
    );
    Ok(ClassOutcome::Applied(marks))
}

fn marked_nodes(
    node: NodeId,
    parent: Option<NodeId>,
    group: Option<NodeId>,
) -> impl Iterator<Item = NodeId> {
    std::iter::once(node).chain(parent).chain(group)
}
