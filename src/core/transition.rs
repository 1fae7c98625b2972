//! # Transitions
//!
//! Turns a backstack mutation into at most one visible change per router.
//!
//! ```text
//! begin_mutation ── force-complete in-flight change, snapshot stack
//!       │
//!   (caller mutates the backstack)
//!       │
//! reconcile ── destroy removed entries not involved in the change
//!       ├──── top unchanged? sync what shows below it, done
//!       │      collect siblings the new top covers or uncovers
//!       ▼
//! perform_change ── create incoming view, mount uncovered views,
//!       │           change started, handler.perform_change(.., completion)
//!       ▼
//! complete_change (when the completion token arrives)
//!       outgoing detaches, covered siblings hide, incoming attaches,
//!       change ended, removed outgoing controller destroyed
//! ```
//!
//! Covered siblings get the outgoing change type and uncovered ones the
//! incoming type, so every controller whose visibility flips sees a
//! started/ended pair.
//!
//! A router runs one change at a time. Starting another first
//! force-completes the current one, so completions are never reordered.

use log::{debug, warn};

use crate::core::backstack::BackstackSnapshot;
use crate::core::change::{
    checkout, ChangeCompletion, ChangeHandler, ChangeToken, ChangeType, SimpleSwapChangeHandler,
};
use crate::core::controller::ControllerId;
use crate::core::lifecycle::{LifecyclePhase, RouterEvent};
use crate::core::navigator::Navigator;
use crate::core::router::{ActiveChange, RouterKey, Siblings};
use crate::core::transaction::Entry;

impl Navigator {
    /// Settles whatever is running on `key` and records the stack as it is
    /// before the caller mutates it.
    pub(crate) fn begin_mutation(&mut self, key: &RouterKey) -> BackstackSnapshot {
        self.force_complete(key);
        self.routers
            .get(key)
            .map(|router| router.backstack.snapshot())
            .unwrap_or_default()
    }

    /// Brings controllers and views in line with the mutated backstack.
    ///
    /// `removed` holds the entries the mutation took off the stack, top
    /// first. `direction` is `Some(is_push)` for explicit operations and
    /// `None` to infer it (push when the new top is not on the old stack).
    pub(crate) fn reconcile(
        &mut self,
        key: &RouterKey,
        before: BackstackSnapshot,
        removed: Vec<Entry>,
        direction: Option<bool>,
        handler_override: Option<Box<dyn ChangeHandler>>,
    ) {
        let Some(router) = self.routers.get(key) else {
            return;
        };
        let after_ids = router.backstack.ids();
        let new_visible = router.backstack.visible_ids();
        let new_top = after_ids.last().cloned();
        let old_top = before.top().cloned();

        let mut old_top_entry = None;
        let mut others = Vec::new();
        for entry in removed {
            if Some(entry.controller()) == old_top.as_ref() {
                old_top_entry = Some(entry);
            } else {
                others.push(entry);
            }
        }
        let old_top_removed = old_top_entry.is_some();

        for entry in &others {
            debug!("Destroying {} removed from {key} below the top", entry.controller());
            self.destroy_controller(entry.controller());
        }

        if old_top == new_top {
            self.sync_visible_below(key, &before.visible, &new_visible, new_top.as_ref());
            return;
        }

        let is_push = direction.unwrap_or_else(|| {
            new_top
                .as_ref()
                .is_some_and(|id| !before.contains(id))
        });

        let (handler, origin) = match handler_override {
            Some(handler) => (Some(handler), None),
            None if is_push => match &new_top {
                Some(id) => (self.checkout_handler(key, id, true), Some((id.clone(), true))),
                None => (None, None),
            },
            None => match (old_top_entry.as_mut(), &old_top) {
                (Some(entry), _) => (entry.pop_handler.take(), None),
                (None, Some(id)) => (
                    self.checkout_handler(key, id, false),
                    Some((id.clone(), false)),
                ),
                (None, None) => (None, None),
            },
        };
        let handler = handler.unwrap_or_else(|| Box::new(SimpleSwapChangeHandler::new()));

        let covered = before
            .visible
            .iter()
            .filter(|id| {
                Some(*id) != old_top.as_ref()
                    && Some(*id) != new_top.as_ref()
                    && !new_visible.contains(id)
                    && after_ids.contains(id)
            })
            .cloned()
            .collect();
        let uncovered = new_visible
            .iter()
            .filter(|id| Some(*id) != new_top.as_ref() && !before.visible.contains(id))
            .cloned()
            .collect();
        let siblings = Siblings { covered, uncovered };

        self.perform_change(
            key,
            old_top,
            new_top,
            is_push,
            handler,
            origin,
            old_top_removed,
            siblings,
        );
    }

    fn checkout_handler(
        &mut self,
        key: &RouterKey,
        id: &ControllerId,
        push_slot: bool,
    ) -> Option<Box<dyn ChangeHandler>> {
        let entry = self.routers.get_mut(key)?.backstack.entry_mut(id)?;
        if push_slot {
            checkout(&mut entry.push_handler)
        } else {
            checkout(&mut entry.pop_handler)
        }
    }

    /// Visibility changes below an unchanged top, e.g. removing the screen
    /// under an overlay.
    fn sync_visible_below(
        &mut self,
        key: &RouterKey,
        before: &[ControllerId],
        after: &[ControllerId],
        top: Option<&ControllerId>,
    ) {
        for id in before {
            if !after.contains(id) && self.controllers.contains_key(id) {
                self.hide_controller(key, id);
            }
        }
        for id in after {
            if Some(id) != top && !before.contains(id) {
                self.show_below(key, id, top);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn perform_change(
        &mut self,
        key: &RouterKey,
        from: Option<ControllerId>,
        to: Option<ControllerId>,
        is_push: bool,
        mut handler: Box<dyn ChangeHandler>,
        origin: Option<(ControllerId, bool)>,
        from_removed: bool,
        siblings: Siblings,
    ) {
        if !self.can_show(key) {
            debug!("{key} has no container; change recorded without views");
            for id in &siblings.covered {
                self.hide_controller(key, id);
            }
            if let Some(from) = &from {
                if from_removed {
                    self.destroy_controller(from);
                } else {
                    self.hide_controller(key, from);
                }
            }
            self.return_handler(key, handler, origin);
            return;
        }

        let seq = self.next_change_seq;
        self.next_change_seq += 1;
        let removes_from = !is_push || handler.removes_from_view_on_push();

        let to_view = to.as_ref().and_then(|id| self.ensure_view(key, id));
        let from_view = from
            .as_ref()
            .and_then(|id| self.controllers.get(id))
            .and_then(|controller| controller.view.as_ref().map(|view| view.id()));
        // Uncovered views go under whatever is on top while the change runs.
        let anchor = from_view.or(to_view);
        for id in &siblings.uncovered {
            self.mount_below(key, id, anchor);
        }

        if let Some(router) = self.routers.get(key) {
            router.listeners.emit(&RouterEvent::ChangeStarted {
                router: key.clone(),
                from: from.clone(),
                to: to.clone(),
                is_push,
            });
        }
        for id in from.iter().chain(&siblings.covered) {
            self.dispatch_change_started(id, ChangeType::exiting(is_push));
        }
        for id in to.iter().chain(&siblings.uncovered) {
            self.dispatch_change_started(id, ChangeType::entering(is_push));
        }

        debug!(
            "Change {seq} on {key}: {} -> {} ({}, {})",
            from.as_ref().map(ToString::to_string).unwrap_or_else(|| "-".into()),
            to.as_ref().map(ToString::to_string).unwrap_or_else(|| "-".into()),
            if is_push { "push" } else { "pop" },
            handler.kind()
        );

        let token = ChangeToken {
            router: key.clone(),
            seq,
        };
        let completion = ChangeCompletion::new(token, self.completion_tx.clone());
        let Some(router) = self.routers.get_mut(key) else {
            return;
        };
        let result = match router.container.as_mut() {
            Some(container) => {
                handler.perform_change(container, from_view, to_view, is_push, completion)
            }
            None => {
                completion.complete();
                Ok(())
            }
        };
        router.in_flight = Some(ActiveChange {
            seq,
            handler,
            from,
            to,
            is_push,
            from_removed,
            removes_from,
            origin,
            siblings,
        });
        if let Err(err) = result {
            warn!("Change {seq} on {key} failed: {err}; it completes on the next mutation");
        }
        self.drain_completions();
    }

    /// Applies every completion signalled so far.
    pub(crate) fn drain_completions(&mut self) {
        while let Ok(token) = self.completion_rx.try_recv() {
            self.complete_change(&token.router, token.seq);
        }
    }

    pub(crate) fn complete_change(&mut self, key: &RouterKey, seq: u64) {
        let Some(router) = self.routers.get_mut(key) else {
            debug!("Completion for vanished router {key} ignored");
            return;
        };
        if router.in_flight.as_ref().map(|change| change.seq) != Some(seq) {
            debug!("Stale completion {seq} on {key} ignored");
            return;
        }
        let Some(change) = router.in_flight.take() else {
            return;
        };

        let view_of = |id: &Option<ControllerId>| {
            id.as_ref()
                .and_then(|id| self.controllers.get(id))
                .and_then(|controller| controller.view.as_ref().map(|view| view.id()))
        };
        let (from_view, to_view) = (view_of(&change.from), view_of(&change.to));
        if let Some(container) = self.routers.get_mut(key).and_then(|r| r.container.as_mut()) {
            if change.removes_from
                && let Some(view) = from_view
            {
                container.remove_view(view);
            }
            if let Some(view) = to_view {
                container.add_view(view);
                container.set_translation(view, 0.0);
            }
        }

        if let Some(from) = &change.from
            && (change.from_removed || change.removes_from)
        {
            self.detach(from);
            if !change.from_removed {
                self.release_view_if_detached(from);
            }
        }
        for id in &change.siblings.covered {
            self.hide_controller(key, id);
        }
        for id in change.to.iter().chain(&change.siblings.uncovered) {
            self.attach(id);
        }

        for id in change.from.iter().chain(&change.siblings.covered) {
            self.dispatch_change_ended(id, ChangeType::exiting(change.is_push));
        }
        for id in change.to.iter().chain(&change.siblings.uncovered) {
            self.dispatch_change_ended(id, ChangeType::entering(change.is_push));
        }
        if change.from_removed
            && let Some(from) = &change.from
        {
            self.destroy_controller(from);
        }

        if let Some(router) = self.routers.get(key) {
            router.listeners.emit(&RouterEvent::ChangeCompleted {
                router: key.clone(),
                from: change.from.clone(),
                to: change.to.clone(),
                is_push: change.is_push,
            });
        }
        debug!("Change {seq} on {key} completed");
        self.return_handler(key, change.handler, change.origin);
    }

    /// Puts a reusable handler back into the transaction slot it came from.
    fn return_handler(
        &mut self,
        key: &RouterKey,
        handler: Box<dyn ChangeHandler>,
        origin: Option<(ControllerId, bool)>,
    ) {
        let Some((id, push_slot)) = origin else {
            return;
        };
        if !handler.is_reusable() {
            return;
        }
        if let Some(entry) = self
            .routers
            .get_mut(key)
            .and_then(|router| router.backstack.entry_mut(&id))
        {
            let slot = if push_slot {
                &mut entry.push_handler
            } else {
                &mut entry.pop_handler
            };
            if slot.is_none() {
                *slot = Some(handler);
            }
        }
    }

    /// Ends the change running on `key` right now. Handlers get the chance
    /// to jump to their end state; one that still does not signal is
    /// completed anyway.
    pub(crate) fn force_complete(&mut self, key: &RouterKey) {
        let Some(router) = self.routers.get_mut(key) else {
            return;
        };
        let Some(change) = router.in_flight.as_mut() else {
            return;
        };
        let seq = change.seq;
        debug!("Force-completing change {seq} on {key}");
        if let Some(container) = router.container.as_mut() {
            change.handler.cancel(container, true);
        }
        self.drain_completions();
        let still_running = self
            .routers
            .get(key)
            .and_then(|router| router.in_flight.as_ref())
            .is_some_and(|change| change.seq == seq);
        if still_running {
            warn!("Change {seq} on {key} did not complete on cancel; completing it");
            self.complete_change(key, seq);
        }
    }

    fn dispatch_change_started(&mut self, id: &ControllerId, change: ChangeType) {
        self.invoke(id, |screen, ctx, _| screen.on_change_started(ctx, change));
        self.emit(id, LifecyclePhase::ChangeStarted(change));
    }

    fn dispatch_change_ended(&mut self, id: &ControllerId, change: ChangeType) {
        self.invoke(id, |screen, ctx, _| screen.on_change_ended(ctx, change));
        self.emit(id, LifecyclePhase::ChangeEnded(change));
    }
}
