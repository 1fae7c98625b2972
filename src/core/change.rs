//! # Change Handlers
//!
//! A change handler performs the visual swap between an outgoing and an
//! incoming view inside a container. It may finish synchronously or over
//! time (driven by `Navigator::advance`), and signals the end through a
//! `ChangeCompletion`.
//!
//! ```text
//! perform_change(container, from, to, is_push, completion)
//!        │
//!        ├── instant: mutate container, completion.complete()
//!        └── animated: keep completion, advance(..) until done, then complete()
//!
//! cancel(immediate = true)  → jump to the end state and complete now
//! ```
//!
//! `ChangeCompletion::complete` consumes the token, so a handler can signal
//! at most once. The navigator tolerates handlers that never signal: the
//! next mutation on that router force-completes the change.

use std::sync::mpsc::Sender;
use std::time::Duration;

use crate::core::bundle::Bundle;
use crate::core::error::ChangeError;
use crate::core::router::RouterKey;
use crate::core::view::{Container, ViewId};

/// The role a controller plays in a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    PushEnter,
    PushExit,
    PopEnter,
    PopExit,
}

impl ChangeType {
    pub fn entering(is_push: bool) -> Self {
        if is_push {
            ChangeType::PushEnter
        } else {
            ChangeType::PopEnter
        }
    }

    pub fn exiting(is_push: bool) -> Self {
        if is_push {
            ChangeType::PushExit
        } else {
            ChangeType::PopExit
        }
    }

    pub fn is_push(self) -> bool {
        matches!(self, ChangeType::PushEnter | ChangeType::PushExit)
    }

    pub fn is_enter(self) -> bool {
        matches!(self, ChangeType::PushEnter | ChangeType::PopEnter)
    }
}

/// Identifies one change execution on one router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeToken {
    pub router: RouterKey,
    pub seq: u64,
}

/// One-shot completion signal handed to `perform_change`.
#[derive(Debug)]
pub struct ChangeCompletion {
    token: ChangeToken,
    sender: Sender<ChangeToken>,
}

impl ChangeCompletion {
    pub(crate) fn new(token: ChangeToken, sender: Sender<ChangeToken>) -> Self {
        Self { token, sender }
    }

    pub fn token(&self) -> &ChangeToken {
        &self.token
    }

    /// Signals that the change has finished.
    pub fn complete(self) {
        if self.sender.send(self.token).is_err() {
            log::warn!("Change completed after its navigator was dropped");
        }
    }
}

/// Executes the visual transition between two views.
pub trait ChangeHandler {
    /// Registry key used to recreate this handler from saved state.
    fn kind(&self) -> &'static str;

    /// Starts the change. Must mount `to` (if any) into `container` and, when
    /// popping or when `removes_from_view_on_push()` is true, unmount `from`.
    /// Call `completion.complete()` when done, now or later.
    fn perform_change(
        &mut self,
        container: &mut Container,
        from: Option<ViewId>,
        to: Option<ViewId>,
        is_push: bool,
        completion: ChangeCompletion,
    ) -> Result<(), ChangeError>;

    /// Drives time-based changes forward.
    fn advance(&mut self, _container: &mut Container, _elapsed: Duration) {}

    /// Stops a running change. With `immediate`, the handler must reach its
    /// end state and complete synchronously; otherwise it may let the current
    /// animation run out.
    fn cancel(&mut self, _container: &mut Container, _immediate: bool) {}

    /// When false, a push leaves the outgoing view mounted (overlays).
    fn removes_from_view_on_push(&self) -> bool {
        true
    }

    /// Reusable handlers may run again on the same instance; others are
    /// replaced by a `copy()` after their first run.
    fn is_reusable(&self) -> bool {
        false
    }

    fn copy(&self) -> Box<dyn ChangeHandler>;

    fn save_state(&self, _bundle: &mut Bundle) {}

    fn restore_state(&mut self, _bundle: &Bundle) {}
}

/// Takes the handler stored in a transaction slot for execution, leaving a
/// fresh copy behind when the handler may not run twice.
pub(crate) fn checkout(
    slot: &mut Option<Box<dyn ChangeHandler>>,
) -> Option<Box<dyn ChangeHandler>> {
    let handler = slot.take()?;
    if !handler.is_reusable() {
        *slot = Some(handler.copy());
    }
    Some(handler)
}

const KEY_REMOVES_FROM_VIEW_ON_PUSH: &str = "removes_from_view_on_push";

/// Swaps views instantly.
#[derive(Debug, Clone)]
pub struct SimpleSwapChangeHandler {
    removes_from_view_on_push: bool,
}

impl SimpleSwapChangeHandler {
    pub const KIND: &'static str = "simple_swap";

    pub fn new() -> Self {
        Self {
            removes_from_view_on_push: true,
        }
    }

    /// A swap that keeps the outgoing view mounted on push, for dialogs and
    /// other partial-screen overlays.
    pub fn overlay() -> Self {
        Self {
            removes_from_view_on_push: false,
        }
    }
}

impl Default for SimpleSwapChangeHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeHandler for SimpleSwapChangeHandler {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn perform_change(
        &mut self,
        container: &mut Container,
        from: Option<ViewId>,
        to: Option<ViewId>,
        is_push: bool,
        completion: ChangeCompletion,
    ) -> Result<(), ChangeError> {
        if let Some(from) = from
            && (!is_push || self.removes_from_view_on_push)
        {
            container.remove_view(from);
        }
        if let Some(to) = to {
            container.add_view(to);
        }
        completion.complete();
        Ok(())
    }

    fn removes_from_view_on_push(&self) -> bool {
        self.removes_from_view_on_push
    }

    fn is_reusable(&self) -> bool {
        true
    }

    fn copy(&self) -> Box<dyn ChangeHandler> {
        Box::new(self.clone())
    }

    fn save_state(&self, bundle: &mut Bundle) {
        bundle.put(KEY_REMOVES_FROM_VIEW_ON_PUSH, self.removes_from_view_on_push);
    }

    fn restore_state(&mut self, bundle: &Bundle) {
        self.removes_from_view_on_push = bundle
            .get_bool(KEY_REMOVES_FROM_VIEW_ON_PUSH)
            .unwrap_or(true);
    }
}
