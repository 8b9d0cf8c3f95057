//! Per-object authorization.
//!
//! A policy is a plain function of (actor, action, resource). A request is
//! allowed only when every policy that applies to it allows it.

use uuid::Uuid;

use crate::utils::error::{AppError, AppResult};

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub is_staff: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// GET and other safe methods.
    Read,
    /// Anything that creates, changes or removes state.
    Write,
}

/// What the request targets, reduced to the fields the policies look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    User { id: Uuid },
    Event { organizer_id: Uuid },
    Comment { author_id: Uuid },
    Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Unauthenticated,
    Denied,
}

pub type Policy = fn(Option<&Actor>, Action, &Resource) -> Access;

pub fn authenticated(actor: Option<&Actor>, _: Action, _: &Resource) -> Access {
    match actor {
        Some(_) => Access::Allow,
        None => Access::Unauthenticated,
    }
}

/// Account records are visible and editable by their owner only, whatever the method.
pub fn self_only(actor: Option<&Actor>, _: Action, resource: &Resource) -> Access {
    match (actor, resource) {
        (None, _) => Access::Unauthenticated,
        (Some(actor), Resource::User { id }) if actor.user_id == *id => Access::Allow,
        (Some(_), Resource::User { .. }) => Access::Denied,
        (Some(_), _) => Access::Allow,
    }
}

pub fn organizer_or_read_only(actor: Option<&Actor>, action: Action, resource: &Resource) -> Access {
    match (action, resource) {
        (Action::Read, _) => Access::Allow,
        (Action::Write, Resource::Event { organizer_id }) => owner(actor, *organizer_id),
        (Action::Write, _) => Access::Allow,
    }
}

pub fn author_or_read_only(actor: Option<&Actor>, action: Action, resource: &Resource) -> Access {
    match (action, resource) {
        (Action::Read, _) => Access::Allow,
        (Action::Write, Resource::Comment { author_id }) => owner(actor, *author_id),
        (Action::Write, _) => Access::Allow,
    }
}

pub fn staff_or_read_only(actor: Option<&Actor>, action: Action, _: &Resource) -> Access {
    match (action, actor) {
        (Action::Read, _) => Access::Allow,
        (Action::Write, None) => Access::Unauthenticated,
        (Action::Write, Some(actor)) if actor.is_staff => Access::Allow,
        (Action::Write, Some(_)) => Access::Denied,
    }
}

fn owner(actor: Option<&Actor>, owner_id: Uuid) -> Access {
    match actor {
        None => Access::Unauthenticated,
        Some(actor) if actor.user_id == owner_id => Access::Allow,
        Some(_) => Access::Denied,
    }
}

/// Evaluates every policy and returns the first refusal.
pub fn evaluate(
    policies: &[Policy],
    actor: Option<&Actor>,
    action: Action,
    resource: &Resource,
) -> Access {
    policies
        .iter()
        .map(|policy| policy(actor, action, resource))
        .find(|access| *access != Access::Allow)
        .unwrap_or(Access::Allow)
}

pub fn authorize(
    policies: &[Policy],
    actor: Option<&Actor>,
    action: Action,
    resource: &Resource,
) -> AppResult<()> {
    match evaluate(policies, actor, action, resource) {
        Access::Allow => Ok(()),
        Access::Unauthenticated => Err(AppError::not_authenticated()),
        Access::Denied => {
            tracing::debug!(?actor, ?action, ?resource, "Permission denied");
            Err(AppError::permission_denied())
        }
    }
}

pub const USER_POLICIES: &[Policy] = &[authenticated, self_only];
pub const EVENT_POLICIES: &[Policy] = &[authenticated, organizer_or_read_only];
pub const COMMENT_POLICIES: &[Policy] = &[authenticated, author_or_read_only];
pub const CATEGORY_POLICIES: &[Policy] = &[authenticated, staff_or_read_only];
