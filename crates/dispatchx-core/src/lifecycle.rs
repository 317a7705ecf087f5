//! Per-request lifecycle state machine
//!
//! `Requested → ContextResolved → Decided → Executed → Logged`, with an exit
//! to `Failed` from any non-terminal state. `Logged` and `Failed` are
//! terminal: a record in either state is immutable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::DispatchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchState {
    Requested,
    ContextResolved,
    Decided,
    Executed,
    Logged,
    Failed,
}

impl DispatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchState::Requested => "requested",
            DispatchState::ContextResolved => "context_resolved",
            DispatchState::Decided => "decided",
            DispatchState::Executed => "executed",
            DispatchState::Logged => "logged",
            DispatchState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DispatchState::Logged | DispatchState::Failed)
    }

    /// Whether `next` is a legal successor of `self`
    pub fn can_advance_to(&self, next: DispatchState) -> bool {
        use DispatchState::*;
        match (self, next) {
            (Requested, ContextResolved)
            | (ContextResolved, Decided)
            | (Decided, Executed)
            | (Executed, Logged) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Advance to `next`, enforcing the transition guards
    pub fn advance(self, next: DispatchState) -> Result<DispatchState, DispatchError> {
        if self.can_advance_to(next) {
            Ok(next)
        } else {
            Err(DispatchError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DispatchState {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requested" => Ok(DispatchState::Requested),
            "context_resolved" => Ok(DispatchState::ContextResolved),
            "decided" => Ok(DispatchState::Decided),
            "executed" => Ok(DispatchState::Executed),
            "logged" => Ok(DispatchState::Logged),
            "failed" => Ok(DispatchState::Failed),
            other => Err(DispatchError::UnknownVariant {
                field: "state".to_string(),
                value: other.to_string(),
            }),
        }
    }
}
