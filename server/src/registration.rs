//! Attendance and waitlist toggles.
//!
//! The decisions are pure functions over a [`Membership`] snapshot. The
//! database layer takes the snapshot while holding the event row lock and
//! then applies the returned outcome, so two concurrent calls for the same
//! event never decide on the same snapshot.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::utils::response::status;

/// One user's standing on one event, read under the event lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Membership {
    pub attending: bool,
    pub waitlisted: bool,
    pub attendee_count: i64,
    pub capacity: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// The user was attending and has been removed.
    Unregistered,
    /// The user took a free seat and left the waitlist if they were on it.
    Registered { left_waitlist: bool },
    /// No seat left; nothing changed.
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitlistOutcome {
    Added,
    Removed,
    /// Attendees cannot join the waitlist; nothing changed.
    AlreadyRegistered,
}

pub fn decide_register(membership: Membership) -> RegisterOutcome {
    if membership.attending {
        RegisterOutcome::Unregistered
    } else if membership.attendee_count < membership.capacity {
        RegisterOutcome::Registered {
            left_waitlist: membership.waitlisted,
        }
    } else {
        RegisterOutcome::Full
    }
}

pub fn decide_waitlist(membership: Membership) -> WaitlistOutcome {
    if membership.attending {
        WaitlistOutcome::AlreadyRegistered
    } else if membership.waitlisted {
        WaitlistOutcome::Removed
    } else {
        WaitlistOutcome::Added
    }
}

impl RegisterOutcome {
    pub fn label(self) -> &'static str {
        match self {
            RegisterOutcome::Unregistered => "unregistered",
            RegisterOutcome::Registered { .. } => "registered",
            RegisterOutcome::Full => "event is full",
        }
    }

    pub fn status_code(self) -> StatusCode {
        match self {
            RegisterOutcome::Unregistered => StatusCode::OK,
            RegisterOutcome::Registered { .. } => StatusCode::CREATED,
            RegisterOutcome::Full => StatusCode::BAD_REQUEST,
        }
    }
}

impl WaitlistOutcome {
    pub fn label(self) -> &'static str {
        match self {
            WaitlistOutcome::Added => "added to waitlist",
            WaitlistOutcome::Removed => "removed from waitlist",
            WaitlistOutcome::AlreadyRegistered => "already registered",
        }
    }

    pub fn status_code(self) -> StatusCode {
        match self {
            WaitlistOutcome::Added => StatusCode::CREATED,
            WaitlistOutcome::Removed => StatusCode::OK,
            WaitlistOutcome::AlreadyRegistered => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for RegisterOutcome {
    fn into_response(self) -> Response {
        status(self.status_code(), self.label())
    }
}

impl IntoResponse for WaitlistOutcome {
    fn into_response(self) -> Response {
        status(self.status_code(), self.label())
    }
}
