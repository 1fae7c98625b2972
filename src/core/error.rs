//! # Errors
//!
//! Recoverable failures only. Misuse (e.g. pushing a controller that is
//! already on the stack) panics; no-op conditions (popping the root) return
//! `false`.

use std::fmt;

use crate::core::controller::ControllerId;
use crate::core::router::RouterKey;

/// Errors surfaced by the navigation engine.
#[derive(Debug, Clone, PartialEq)]
pub enum NavError {
    /// Saved state names a screen kind with no registered factory.
    UnknownScreen(String),
    /// Saved state names a change handler kind with no registered factory.
    UnknownChangeHandler(String),
    /// Restoring would put a second controller with this id into the arena.
    DuplicateController(ControllerId),
    /// The router key does not resolve to a live router.
    UnknownRouter(RouterKey),
}

impl fmt::Display for NavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavError::UnknownScreen(kind) => write!(f, "no screen registered for kind '{kind}'"),
            NavError::UnknownChangeHandler(kind) => {
                write!(f, "no change handler registered for kind '{kind}'")
            }
            NavError::DuplicateController(id) => {
                write!(f, "controller {id} already exists in this navigator")
            }
            NavError::UnknownRouter(key) => write!(f, "no router for {key}"),
        }
    }
}

impl std::error::Error for NavError {}

/// A change handler failed before it could signal completion. The router
/// keeps the change in flight and force-completes it on the next mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeError(pub String);

impl fmt::Display for ChangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "change handler failed: {}", self.0)
    }
}

impl std::error::Error for ChangeError {}
