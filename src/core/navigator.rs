//! # Navigator
//!
//! The navigator owns every controller and router, keyed by id. Routers and
//! controllers refer to each other through keys only, so parent/child links
//! never form ownership cycles.
//!
//! ```text
//! Navigator
//! ├── controllers: ControllerId → Controller
//! ├── routers:     RouterKey    → Router (backstack + container)
//! ├── host_routers: [RouterKey]  attach order
//! └── commands:    queue of NavCommand raised by screen hooks
//! ```
//!
//! Every public mutation runs to a quiescent point before returning: the
//! backstack changes, lifecycle hooks run, synchronous change handlers
//! complete, and commands queued by hooks are applied in FIFO order.
//!
//! The navigator is deliberately `!Send`: screens, views and listeners live
//! on the UI thread. Change handlers that finish elsewhere signal through
//! `ChangeCompletion`, which is `Send`; the signal is applied on the next
//! call into the navigator (`advance` is the usual one).

use std::cmp::Reverse;
use std::collections::{HashMap, VecDeque};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::core::change::{ChangeHandler, ChangeToken};
use crate::core::controller::{
    Controller, ControllerContext, ControllerId, HostRequest, NavCommand, RetainViewMode, Screen,
};
use crate::core::lifecycle::{ControllerEvent, ListenerSet};
use crate::core::persistence::{Registry, RouterState};
use crate::core::router::{Router, RouterKey};
use crate::core::transaction::{Entry, Transaction};
use crate::core::view::{ContainerId, ViewId};

/// Which child router gets the first chance at a back press when a
/// controller hosts several.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChildBackPolicy {
    /// The child whose top entry was pushed most recently.
    #[default]
    MostRecentlyActive,
    /// The child router created first.
    RegistrationOrder,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigatorConfig {
    pub child_back_policy: ChildBackPolicy,
}

pub struct Navigator {
    pub(crate) config: NavigatorConfig,
    pub(crate) registry: Registry,
    pub(crate) controllers: HashMap<ControllerId, Controller>,
    pub(crate) routers: HashMap<RouterKey, Router>,
    pub(crate) host_routers: Vec<RouterKey>,
    /// Restored host router states waiting for `attach_router`.
    pub(crate) saved_host_routers: HashMap<ContainerId, RouterState>,
    pub(crate) commands: VecDeque<NavCommand>,
    pub(crate) host_requests: Vec<HostRequest>,
    pub(crate) completion_tx: Sender<ChangeToken>,
    pub(crate) completion_rx: Receiver<ChangeToken>,
    pub(crate) next_change_seq: u64,
    pub(crate) next_transaction_index: u64,
    pub(crate) next_router_seq: u64,
    pub(crate) context_available: bool,
    pub(crate) host_started: bool,
    pub(crate) lifecycle_listeners: ListenerSet<ControllerEvent>,
    settling: bool,
}

impl Navigator {
    pub fn new(config: NavigatorConfig, registry: Registry) -> Self {
        let (completion_tx, completion_rx) = mpsc::channel();
        Self {
            config,
            registry,
            controllers: HashMap::new(),
            routers: HashMap::new(),
            host_routers: Vec::new(),
            saved_host_routers: HashMap::new(),
            commands: VecDeque::new(),
            host_requests: Vec::new(),
            completion_tx,
            completion_rx,
            next_change_seq: 1,
            next_transaction_index: 0,
            next_router_seq: 0,
            context_available: false,
            host_started: false,
            lifecycle_listeners: ListenerSet::new(),
            settling: false,
        }
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Navigator-wide lifecycle observers; they see every controller's events
    /// after that controller's own listeners.
    pub fn lifecycle_listeners(&self) -> &ListenerSet<ControllerEvent> {
        &self.lifecycle_listeners
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    pub fn router(&self, key: &RouterKey) -> Option<&Router> {
        self.routers.get(key)
    }

    pub fn host_routers(&self) -> &[RouterKey] {
        &self.host_routers
    }

    pub fn controller(&self, id: &ControllerId) -> Option<&Controller> {
        self.controllers.get(id)
    }

    pub fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    pub fn screen<T: Screen>(&self, id: &ControllerId) -> Option<&T> {
        self.controllers.get(id)?.screen_as::<T>()
    }

    /// The controller whose current view is `view`.
    pub fn controller_for_view(&self, view: ViewId) -> Option<&Controller> {
        self.controllers
            .values()
            .find(|controller| controller.view().is_some_and(|v| v.id() == view))
    }

    /// Searches every router, host routers first, then depth-first through
    /// child routers, for the topmost entry tagged `tag`.
    pub fn find_controller_by_tag(&self, tag: &str) -> Option<&ControllerId> {
        self.host_routers
            .iter()
            .find_map(|key| self.find_tag_in(key, tag))
    }

    fn find_tag_in(&self, key: &RouterKey, tag: &str) -> Option<&ControllerId> {
        let router = self.routers.get(key)?;
        if let Some(index) = router.backstack.position_of_tag(tag) {
            return Some(router.backstack.entries()[index].controller());
        }
        router.backstack.entries().iter().rev().find_map(|entry| {
            let controller = self.controllers.get(entry.controller())?;
            controller
                .child_routers
                .iter()
                .find_map(|child| self.find_tag_in(child, tag))
        })
    }

    /// The controller `id` delivers results to, if it is still alive.
    pub fn target_of(&self, id: &ControllerId) -> Option<&Controller> {
        let target = self.controllers.get(id)?.target.as_ref()?;
        self.controllers.get(target)
    }

    /// Child routers hosted by `parent`, in creation order.
    pub fn child_routers(&self, parent: &ControllerId) -> Vec<&Router> {
        self.controllers
            .get(parent)
            .map(|controller| {
                controller
                    .child_routers
                    .iter()
                    .filter_map(|key| self.routers.get(key))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// True while any router has a change in flight.
    pub fn has_pending_changes(&self) -> bool {
        self.routers.values().any(Router::is_transitioning)
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    /// Replaces the whole backstack with `transaction`.
    ///
    /// # Panics
    ///
    /// If `key` does not name a live router.
    pub fn set_root(&mut self, key: &RouterKey, transaction: Transaction) {
        self.require_router(key);
        self.apply_set_root(key, transaction);
        self.settle();
    }

    /// # Panics
    ///
    /// If `key` does not name a live router, or the controller is already on
    /// a backstack.
    pub fn push(&mut self, key: &RouterKey, transaction: Transaction) {
        self.require_router(key);
        self.apply_push(key, transaction);
        self.settle();
    }

    /// Pops the top entry. Returns false when nothing was popped: the stack
    /// is empty, or it holds only the root and the router does not pop its
    /// last view.
    pub fn pop(&mut self, key: &RouterKey) -> bool {
        let popped = self.apply_pop(key);
        self.settle();
        popped
    }

    /// Removes `id` from the router wherever it sits in the backstack.
    pub fn pop_controller(&mut self, key: &RouterKey, id: &ControllerId) -> bool {
        let popped = self.apply_pop_controller(key, id);
        self.settle();
        popped
    }

    /// Pops everything above the topmost entry tagged `tag`.
    pub fn pop_to_tag(&mut self, key: &RouterKey, tag: &str) -> bool {
        let popped = self.apply_pop_to_tag(key, tag);
        self.settle();
        popped
    }

    /// Pops down to the root in a single transition.
    pub fn pop_to_root(&mut self, key: &RouterKey) -> bool {
        let popped = self.apply_pop_to_root(key);
        self.settle();
        popped
    }

    /// # Panics
    ///
    /// If `key` does not name a live router.
    pub fn replace_top(&mut self, key: &RouterKey, transaction: Transaction) {
        self.require_router(key);
        self.apply_replace_top(key, transaction);
        self.settle();
    }

    /// Replaces the backstack with `transactions` (bottom first) and runs a
    /// single transition to the new top. Every previous entry is destroyed.
    /// `handler` overrides the new top's own push handler.
    ///
    /// # Panics
    ///
    /// If `key` does not name a live router.
    pub fn set_backstack(
        &mut self,
        key: &RouterKey,
        transactions: Vec<Transaction>,
        handler: Option<Box<dyn ChangeHandler>>,
    ) {
        self.require_router(key);
        let before = self.begin_mutation(key);
        let removed = self.take_all_entries(key);
        for transaction in transactions {
            let entry = self.adopt(key, transaction);
            if let Some(router) = self.routers.get_mut(key) {
                router.backstack.push(entry);
            }
        }
        self.reconcile(key, before, removed, None, handler);
        self.settle();
    }

    pub fn set_pops_last_view(&mut self, key: &RouterKey, pops_last_view: bool) {
        if let Some(router) = self.routers.get_mut(key) {
            router.pops_last_view = pops_last_view;
        }
    }

    /// Offers a back press to `key`'s top controller, depth-first through
    /// its child routers, then pops `key` itself. Returns true if anything
    /// consumed it.
    pub fn handle_back(&mut self, key: &RouterKey) -> bool {
        let handled = self.back_router(key);
        self.settle();
        handled
    }

    /// Returns the key of the child router in `container` of `parent`'s view,
    /// creating it (or restoring its saved state) on first use.
    pub fn child_router(
        &mut self,
        parent: &ControllerId,
        container: impl Into<ContainerId>,
        tag: Option<&str>,
    ) -> RouterKey {
        let key = RouterKey::child(parent.clone(), container.into(), tag.map(str::to_string));
        self.ensure_child_router(&key);
        self.settle();
        key
    }

    /// Destroys a child router and every controller on it.
    pub fn remove_child_router(&mut self, key: &RouterKey) {
        if key.is_host() {
            warn!("remove_child_router called with host router {key}; ignored");
            return;
        }
        self.destroy_router(key);
        self.settle();
    }

    pub fn set_retain_view_mode(&mut self, id: &ControllerId, mode: RetainViewMode) {
        self.apply_retain_view_mode(id, mode);
        self.settle();
    }

    /// Makes `target` the controller `id` reports its results to. Returns
    /// false when either controller is not live.
    pub fn set_target(&mut self, id: &ControllerId, target: &ControllerId) -> bool {
        if !self.controllers.contains_key(target) {
            return false;
        }
        match self.controllers.get_mut(id) {
            Some(controller) => {
                controller.set_target(target);
                true
            }
            None => false,
        }
    }

    /// Runs `f` against the concrete screen behind `id` with a live context,
    /// then applies whatever navigation it requested.
    pub fn with_screen<T: Screen, R>(
        &mut self,
        id: &ControllerId,
        f: impl FnOnce(&mut T, &mut ControllerContext<'_>) -> R,
    ) -> Option<R> {
        let result = self
            .invoke(id, |screen, ctx, _| {
                screen.as_any_mut().downcast_mut::<T>().map(|screen| f(screen, ctx))
            })
            .flatten();
        self.settle();
        result
    }

    /// Drives running change handlers forward by `elapsed` and applies any
    /// completions signalled since the last call.
    pub fn advance(&mut self, elapsed: Duration) {
        let keys: Vec<RouterKey> = self
            .routers
            .iter()
            .filter(|(_, router)| router.in_flight.is_some())
            .map(|(key, _)| key.clone())
            .collect();
        for key in keys {
            if let Some(router) = self.routers.get_mut(&key)
                && let (Some(change), Some(container)) =
                    (router.in_flight.as_mut(), router.container.as_mut())
            {
                change.handler.advance(container, elapsed);
            }
        }
        self.settle();
    }

    /// Completes every change still in flight, on every router.
    pub fn complete_pending_changes(&mut self) {
        let keys: Vec<RouterKey> = self.routers.keys().cloned().collect();
        for key in keys {
            self.force_complete(&key);
        }
        self.settle();
    }

    /// Requests screens made of the host since the last call.
    pub fn take_host_requests(&mut self) -> Vec<HostRequest> {
        std::mem::take(&mut self.host_requests)
    }

    // ---------------------------------------------------------------------
    // Internals shared by the public API and queued commands
    // ---------------------------------------------------------------------

    fn require_router(&self, key: &RouterKey) {
        assert!(self.routers.contains_key(key), "no router for {key}");
    }

    /// Moves a transaction's controller into the arena and returns its entry.
    pub(crate) fn adopt(&mut self, key: &RouterKey, transaction: Transaction) -> Entry {
        let index = self.next_transaction_index;
        self.next_transaction_index += 1;
        let (mut controller, entry) = transaction.into_parts(index);
        assert!(
            !self.controllers.contains_key(controller.id()),
            "controller {} is already in this navigator",
            controller.id()
        );
        controller.router = Some(key.clone());
        controller.parent = key.parent().cloned();
        let id = controller.id().clone();
        debug!("Adopted {} ({}) onto {key}", id, controller.kind());
        self.controllers.insert(id.clone(), controller);
        self.ensure_context(&id);
        entry
    }

    fn take_all_entries(&mut self, key: &RouterKey) -> Vec<Entry> {
        self.routers
            .get_mut(key)
            .map(|router| router.backstack.clear())
            .unwrap_or_default()
    }

    pub(crate) fn apply_set_root(&mut self, key: &RouterKey, transaction: Transaction) {
        let before = self.begin_mutation(key);
        let removed = self.take_all_entries(key);
        let entry = self.adopt(key, transaction);
        if let Some(router) = self.routers.get_mut(key) {
            router.backstack.push(entry);
        }
        self.reconcile(key, before, removed, Some(true), None);
    }

    pub(crate) fn apply_push(&mut self, key: &RouterKey, transaction: Transaction) {
        let before = self.begin_mutation(key);
        let entry = self.adopt(key, transaction);
        if let Some(router) = self.routers.get_mut(key) {
            router.backstack.push(entry);
        }
        self.reconcile(key, before, Vec::new(), Some(true), None);
    }

    pub(crate) fn apply_pop(&mut self, key: &RouterKey) -> bool {
        let Some(router) = self.routers.get(key) else {
            return false;
        };
        let size = router.backstack.len();
        if size == 0 || (size == 1 && !router.pops_last_view) {
            debug!("Pop on {key} ignored (size {size})");
            return false;
        }
        let before = self.begin_mutation(key);
        let removed: Vec<Entry> = self
            .routers
            .get_mut(key)
            .and_then(|router| router.backstack.pop())
            .into_iter()
            .collect();
        self.reconcile(key, before, removed, Some(false), None);
        true
    }

    pub(crate) fn apply_pop_controller(&mut self, key: &RouterKey, id: &ControllerId) -> bool {
        let Some(router) = self.routers.get(key) else {
            return false;
        };
        if router.top() == Some(id) {
            return self.apply_pop(key);
        }
        if !router.backstack.contains(id) {
            return false;
        }
        let before = self.begin_mutation(key);
        let removed: Vec<Entry> = self
            .routers
            .get_mut(key)
            .and_then(|router| router.backstack.remove(id))
            .into_iter()
            .collect();
        self.reconcile(key, before, removed, Some(false), None);
        true
    }

    pub(crate) fn apply_pop_to_tag(&mut self, key: &RouterKey, tag: &str) -> bool {
        let Some(router) = self.routers.get(key) else {
            return false;
        };
        let Some(index) = router.backstack.position_of_tag(tag) else {
            return false;
        };
        if index + 1 == router.backstack.len() {
            return false;
        }
        self.truncate(key, index + 1);
        true
    }

    pub(crate) fn apply_pop_to_root(&mut self, key: &RouterKey) -> bool {
        if self.routers.get(key).is_none_or(|router| router.backstack.len() <= 1) {
            return false;
        }
        self.truncate(key, 1);
        true
    }

    fn truncate(&mut self, key: &RouterKey, keep: usize) {
        let before = self.begin_mutation(key);
        let removed = self
            .routers
            .get_mut(key)
            .map(|router| router.backstack.truncate(keep))
            .unwrap_or_default();
        self.reconcile(key, before, removed, Some(false), None);
    }

    pub(crate) fn apply_replace_top(&mut self, key: &RouterKey, transaction: Transaction) {
        let before = self.begin_mutation(key);
        let entry = self.adopt(key, transaction);
        let removed: Vec<Entry> = self
            .routers
            .get_mut(key)
            .and_then(|router| {
                if router.backstack.is_empty() {
                    router.backstack.push(entry);
                    None
                } else {
                    router.backstack.replace_top(entry)
                }
            })
            .into_iter()
            .collect();
        self.reconcile(key, before, removed, Some(true), None);
    }

    pub(crate) fn apply_retain_view_mode(&mut self, id: &ControllerId, mode: RetainViewMode) {
        let Some(controller) = self.controllers.get_mut(id) else {
            return;
        };
        controller.retain_view_mode = mode;
        if mode == RetainViewMode::ReleaseDetach {
            self.release_view_if_detached(id);
        }
    }

    fn back_router(&mut self, key: &RouterKey) -> bool {
        let Some(router) = self.routers.get(key) else {
            return false;
        };
        let Some(top) = router.top().cloned() else {
            return false;
        };
        if self.back_controller(&top) {
            return true;
        }
        match self.routers.get(key) {
            Some(router) if router.backstack.len() > 1 || router.pops_last_view => {
                self.apply_pop(key)
            }
            _ => false,
        }
    }

    /// Children first, then the screen itself. A controller that is not
    /// attached does not get to handle back.
    fn back_controller(&mut self, id: &ControllerId) -> bool {
        if !self.controllers.get(id).is_some_and(Controller::is_attached) {
            return false;
        }
        for child in self.children_in_back_order(id) {
            if self.back_router(&child) {
                return true;
            }
        }
        self.invoke(id, |screen, ctx, _| screen.handle_back(ctx))
            .unwrap_or(false)
    }

    fn children_in_back_order(&self, id: &ControllerId) -> Vec<RouterKey> {
        let Some(controller) = self.controllers.get(id) else {
            return Vec::new();
        };
        let mut children: Vec<&Router> = controller
            .child_routers
            .iter()
            .filter_map(|key| self.routers.get(key))
            .collect();
        match self.config.child_back_policy {
            ChildBackPolicy::RegistrationOrder => children.sort_by_key(|router| router.created_seq),
            ChildBackPolicy::MostRecentlyActive => children.sort_by_key(|router| {
                Reverse(router.backstack.top().map(Entry::transaction_index))
            }),
        }
        children.into_iter().map(|router| router.key.clone()).collect()
    }

    pub(crate) fn ensure_child_router(&mut self, key: &RouterKey) {
        let Some(parent_id) = key.parent() else {
            warn!("ensure_child_router called with host router {key}; ignored");
            return;
        };
        if self.routers.contains_key(key) {
            self.bind_child_router(key);
            return;
        }
        let Some(parent) = self.controllers.get_mut(parent_id) else {
            warn!("Child router {key} requested for unknown controller; ignored");
            return;
        };
        if parent.is_destroyed() {
            warn!("Child router {key} requested by destroyed controller; ignored");
            return;
        }
        parent.child_routers.push(key.clone());
        let saved = parent
            .saved_child_routers
            .iter()
            .position(|(saved_key, _)| saved_key == key)
            .map(|index| parent.saved_child_routers.remove(index).1);

        let seq = self.next_router_seq;
        self.next_router_seq += 1;
        self.routers.insert(key.clone(), Router::new(key.clone(), seq));
        debug!("Created child router {key}");
        if let Some(state) = saved {
            self.materialize_router(key, state);
        }
        self.bind_child_router(key);
    }

    // ---------------------------------------------------------------------
    // Command queue
    // ---------------------------------------------------------------------

    /// Applies completions and queued commands until nothing is left.
    pub(crate) fn settle(&mut self) {
        if self.settling {
            return;
        }
        self.settling = true;
        loop {
            self.drain_completions();
            let Some(command) = self.commands.pop_front() else {
                break;
            };
            self.apply_command(command);
        }
        self.settling = false;
    }

    fn apply_command(&mut self, command: NavCommand) {
        debug!("Applying {command:?}");
        match command {
            NavCommand::SetRoot(key, transaction) => {
                if self.command_router(&key) {
                    self.apply_set_root(&key, transaction);
                }
            }
            NavCommand::SetRootIfEmpty(key, transaction) => {
                if self.command_router(&key)
                    && self.routers.get(&key).is_some_and(|router| !router.has_root())
                {
                    self.apply_set_root(&key, transaction);
                }
            }
            NavCommand::Push(key, transaction) => {
                if self.command_router(&key) {
                    self.apply_push(&key, transaction);
                }
            }
            NavCommand::Pop(key) => {
                self.apply_pop(&key);
            }
            NavCommand::PopController(key, id) => {
                self.apply_pop_controller(&key, &id);
            }
            NavCommand::PopToRoot(key) => {
                self.apply_pop_to_root(&key);
            }
            NavCommand::ReplaceTop(key, transaction) => {
                if self.command_router(&key) {
                    self.apply_replace_top(&key, transaction);
                }
            }
            NavCommand::EnsureChildRouter(key) => self.ensure_child_router(&key),
            NavCommand::RemoveChildRouter(key) => {
                if !key.is_host() {
                    self.destroy_router(&key);
                }
            }
            NavCommand::SetRetainViewMode(id, mode) => self.apply_retain_view_mode(&id, mode),
            NavCommand::Host(request) => self.host_requests.push(request),
        }
    }

    fn command_router(&self, key: &RouterKey) -> bool {
        let exists = self.routers.contains_key(key);
        if !exists {
            warn!("Dropping command for missing router {key}");
        }
        exists
    }
}

impl std::fmt::Debug for Navigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Navigator")
            .field("host_routers", &self.host_routers)
            .field("routers", &self.routers.len())
            .field("controllers", &self.controllers.len())
            .field("context_available", &self.context_available)
            .field("host_started", &self.host_started)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::controller::ControllerState;
    use crate::test_support::{started_navigator, tx, TestScreen};

    fn tags(nav: &Navigator, key: &RouterKey) -> Vec<String> {
        nav.router(key)
            .unwrap()
            .backstack()
            .entries()
            .iter()
            .filter_map(|entry| entry.tag().map(str::to_string))
            .collect()
    }

    #[test]
    fn test_push_and_pop_update_backstack() {
        let (mut nav, main) = started_navigator();
        nav.set_root(&main, tx("a"));
        nav.push(&main, tx("b"));
        assert_eq!(tags(&nav, &main), vec!["a", "b"]);
        assert!(nav.pop(&main));
        assert_eq!(tags(&nav, &main), vec!["a"]);
    }

    #[test]
    fn test_pop_root_is_noop_unless_pops_last_view() {
        let (mut nav, main) = started_navigator();
        nav.set_root(&main, tx("a"));
        assert!(!nav.pop(&main));
        assert_eq!(nav.router(&main).unwrap().backstack_size(), 1);

        nav.set_pops_last_view(&main, true);
        assert!(nav.pop(&main));
        assert!(!nav.router(&main).unwrap().has_root());
        assert_eq!(nav.controller_count(), 0);
    }

    #[test]
    fn test_pop_to_tag_and_root() {
        let (mut nav, main) = started_navigator();
        nav.set_root(&main, tx("a"));
        for name in ["b", "c", "d"] {
            nav.push(&main, tx(name));
        }
        assert!(nav.pop_to_tag(&main, "b"));
        assert_eq!(tags(&nav, &main), vec!["a", "b"]);
        assert!(!nav.pop_to_tag(&main, "missing"));
        assert!(!nav.pop_to_tag(&main, "b"));
        assert!(nav.pop_to_root(&main));
        assert_eq!(tags(&nav, &main), vec!["a"]);
        assert!(!nav.pop_to_root(&main));
    }

    #[test]
    fn test_pop_controller_below_top_destroys_it() {
        let (mut nav, main) = started_navigator();
        nav.set_root(&main, tx("a"));
        nav.push(&main, tx("b"));
        nav.push(&main, tx("c"));
        let b = nav.find_controller_by_tag("b").unwrap().clone();
        assert!(nav.pop_controller(&main, &b));
        assert_eq!(tags(&nav, &main), vec!["a", "c"]);
        assert!(nav.controller(&b).is_none());
        let top = nav.router(&main).unwrap().top().unwrap().clone();
        assert_eq!(nav.controller(&top).unwrap().state(), ControllerState::Attached);
    }

    #[test]
    fn test_replace_top_keeps_size() {
        let (mut nav, main) = started_navigator();
        nav.set_root(&main, tx("a"));
        nav.push(&main, tx("b"));
        nav.replace_top(&main, tx("c"));
        assert_eq!(tags(&nav, &main), vec!["a", "c"]);
    }

    #[test]
    fn test_set_backstack_replaces_everything() {
        let (mut nav, main) = started_navigator();
        nav.set_root(&main, tx("a"));
        nav.push(&main, tx("b"));
        let a = nav.find_controller_by_tag("a").unwrap().clone();

        nav.set_backstack(&main, vec![tx("c"), tx("d")], None);
        assert_eq!(tags(&nav, &main), vec!["c", "d"]);
        assert!(nav.controller(&a).is_none());
        assert_eq!(nav.controller_count(), 2);
        let d = nav.find_controller_by_tag("d").unwrap().clone();
        assert!(nav.controller(&d).unwrap().is_attached());
    }

    #[test]
    fn test_with_screen_queues_navigation() {
        let (mut nav, main) = started_navigator();
        nav.set_root(&main, tx("a"));
        let a = nav.find_controller_by_tag("a").unwrap().clone();
        let pushed = nav.with_screen::<TestScreen, _>(&a, |_, ctx| {
            ctx.push_here(tx("b"));
        });
        assert!(pushed.is_some());
        assert_eq!(tags(&nav, &main), vec!["a", "b"]);
    }

    #[test]
    fn test_transaction_index_increases_per_push() {
        let (mut nav, main) = started_navigator();
        nav.set_root(&main, tx("a"));
        nav.push(&main, tx("b"));
        let router = nav.router(&main).unwrap();
        let indices: Vec<u64> = router
            .backstack()
            .entries()
            .iter()
            .map(Entry::transaction_index)
            .collect();
        assert!(indices[0] < indices[1]);
    }

    #[test]
    fn test_set_target_links_live_controllers() {
        let (mut nav, main) = started_navigator();
        nav.set_root(&main, tx("a"));
        nav.push(&main, tx("b"));
        let a = nav.find_controller_by_tag("a").unwrap().clone();
        let b = nav.find_controller_by_tag("b").unwrap().clone();

        assert!(nav.set_target(&b, &a));
        assert_eq!(nav.target_of(&b).map(Controller::id), Some(&a));
        assert!(!nav.set_target(&b, &ControllerId::from("gone")));
        assert!(nav.target_of(&a).is_none());
    }

    #[test]
    fn test_target_of_forgets_destroyed_target() {
        let (mut nav, main) = started_navigator();
        nav.set_root(&main, tx("a"));
        nav.push(&main, tx("b"));
        let a = nav.find_controller_by_tag("a").unwrap().clone();
        let b = nav.find_controller_by_tag("b").unwrap().clone();
        assert!(nav.set_target(&a, &b));
        assert!(nav.pop(&main));
        assert!(nav.target_of(&a).is_none());
    }

    /// A parent hosting child routers `l` (created first) and `r`, each with
    /// two entries; `r` got the most recent push.
    fn parent_with_two_children(
        policy: ChildBackPolicy,
    ) -> (Navigator, RouterKey, RouterKey, RouterKey) {
        let mut nav = Navigator::new(
            NavigatorConfig {
                child_back_policy: policy,
            },
            crate::test_support::registry(),
        );
        nav.on_context_available();
        nav.on_host_started();
        let main = nav.attach_router("main");
        let parent = TestScreen::new("parent").with_containers(&["l", "r"]).into_controller();
        let parent_id = parent.id().clone();
        nav.set_root(&main, Transaction::with(parent).tag("parent"));

        let left = nav.child_router(&parent_id, "l", None);
        let right = nav.child_router(&parent_id, "r", None);
        nav.set_root(&left, tx("l1"));
        nav.set_root(&right, tx("r1"));
        nav.push(&left, tx("l2"));
        nav.push(&right, tx("r2"));
        (nav, main, left, right)
    }

    #[test]
    fn test_back_goes_to_most_recently_active_child() {
        let (mut nav, main, left, right) =
            parent_with_two_children(ChildBackPolicy::MostRecentlyActive);
        assert!(nav.handle_back(&main));
        assert_eq!(tags(&nav, &right), vec!["r1"]);
        assert_eq!(tags(&nav, &left), vec!["l1", "l2"]);

        assert!(nav.handle_back(&main));
        assert_eq!(tags(&nav, &left), vec!["l1"]);
        assert!(!nav.handle_back(&main));
    }

    #[test]
    fn test_back_goes_to_first_registered_child() {
        let (mut nav, main, left, right) =
            parent_with_two_children(ChildBackPolicy::RegistrationOrder);
        assert!(nav.handle_back(&main));
        assert_eq!(tags(&nav, &left), vec!["l1"]);
        assert_eq!(tags(&nav, &right), vec!["r1", "r2"]);

        assert!(nav.handle_back(&main));
        assert_eq!(tags(&nav, &right), vec!["r1"]);
        assert!(!nav.handle_back(&main));
    }

    #[test]
    #[should_panic(expected = "no router for")]
    fn test_push_to_unknown_router_panics() {
        let (mut nav, _) = started_navigator();
        nav.push(&RouterKey::host("elsewhere"), tx("a"));
    }
}
