//! # Persistence
//!
//! Saving turns the live tree into plain serde data; restoring rebuilds it
//! through a `Registry` of factories keyed by screen and handler kind.
//!
//! ```text
//! NavigatorState
//! └── HostRouterState { container, router: RouterState }
//!     └── RouterState { backstack: [EntryState], pops_last_view }
//!         └── EntryState { controller: SavedController, tag, handlers, index }
//!             └── SavedController { id, kind, args, view_state,
//!                                   instance_state, child_routers: [..] }
//! ```
//!
//! Restore is all-or-nothing: the whole subtree is validated (every kind
//! registered, no duplicate ids) before any controller is built. On failure
//! the router is left empty and the error is returned.
//!
//! Child router states ride along with their parent controller and are
//! materialized when the parent asks for that child router again.

use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::core::bundle::Bundle;
use crate::core::change::{ChangeHandler, SimpleSwapChangeHandler};
use crate::core::controller::{Controller, ControllerId, RetainViewMode, Screen};
use crate::core::error::NavError;
use crate::core::lifecycle::LifecyclePhase;
use crate::core::navigator::Navigator;
use crate::core::router::RouterKey;
use crate::core::transaction::Entry;
use crate::core::view::ContainerId;

// ============================================================================
// Saved shapes
// ============================================================================

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct RouterState {
    pub backstack: Vec<EntryState>,
    #[serde(default)]
    pub pops_last_view: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EntryState {
    pub controller: SavedController,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_handler: Option<HandlerState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pop_handler: Option<HandlerState>,
    pub transaction_index: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SavedController {
    pub id: ControllerId,
    pub kind: String,
    #[serde(default)]
    pub args: Bundle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_state: Option<Bundle>,
    #[serde(default)]
    pub instance_state: Bundle,
    #[serde(default)]
    pub retain_view_mode: RetainViewMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ControllerId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_routers: Vec<ChildRouterState>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChildRouterState {
    pub container: ContainerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub router: RouterState,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HandlerState {
    pub kind: String,
    #[serde(default)]
    pub state: Bundle,
}

impl HandlerState {
    pub fn capture(handler: &dyn ChangeHandler) -> Self {
        let mut state = Bundle::new();
        handler.save_state(&mut state);
        Self {
            kind: handler.kind().to_string(),
            state,
        }
    }
}

/// Everything the navigator needs to rebuild its host routers.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct NavigatorState {
    pub routers: Vec<HostRouterState>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HostRouterState {
    pub container: ContainerId,
    pub router: RouterState,
}

// ============================================================================
// Registry
// ============================================================================

pub type ScreenFactory = fn(&Bundle) -> Box<dyn Screen>;
pub type HandlerFactory = fn() -> Box<dyn ChangeHandler>;

fn simple_swap() -> Box<dyn ChangeHandler> {
    Box::new(SimpleSwapChangeHandler::new())
}

/// Factories for everything that can appear in saved state.
#[derive(Clone)]
pub struct Registry {
    screens: HashMap<String, ScreenFactory>,
    handlers: HashMap<String, HandlerFactory>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// A registry that already knows `SimpleSwapChangeHandler`.
    pub fn new() -> Self {
        let mut registry = Self {
            screens: HashMap::new(),
            handlers: HashMap::new(),
        };
        registry.register_change_handler(SimpleSwapChangeHandler::KIND, simple_swap);
        registry
    }

    pub fn register_screen(&mut self, kind: &str, factory: ScreenFactory) -> &mut Self {
        self.screens.insert(kind.to_string(), factory);
        self
    }

    pub fn register_change_handler(&mut self, kind: &str, factory: HandlerFactory) -> &mut Self {
        self.handlers.insert(kind.to_string(), factory);
        self
    }

    pub fn has_screen(&self, kind: &str) -> bool {
        self.screens.contains_key(kind)
    }

    pub fn has_change_handler(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }

    pub fn build_screen(&self, kind: &str, args: &Bundle) -> Result<Box<dyn Screen>, NavError> {
        let factory = self
            .screens
            .get(kind)
            .ok_or_else(|| NavError::UnknownScreen(kind.to_string()))?;
        Ok(factory(args))
    }

    pub fn build_change_handler(
        &self,
        state: &HandlerState,
    ) -> Result<Box<dyn ChangeHandler>, NavError> {
        let factory = self
            .handlers
            .get(&state.kind)
            .ok_or_else(|| NavError::UnknownChangeHandler(state.kind.clone()))?;
        let mut handler = factory();
        handler.restore_state(&state.state);
        Ok(handler)
    }

    /// Checks a whole saved subtree. `seen` collects controller ids across
    /// calls so sibling routers cannot share one.
    pub fn validate(
        &self,
        state: &RouterState,
        seen: &mut HashSet<ControllerId>,
    ) -> Result<(), NavError> {
        for entry in &state.backstack {
            let controller = &entry.controller;
            if !self.has_screen(&controller.kind) {
                return Err(NavError::UnknownScreen(controller.kind.clone()));
            }
            if !seen.insert(controller.id.clone()) {
                return Err(NavError::DuplicateController(controller.id.clone()));
            }
            for handler in [&entry.push_handler, &entry.pop_handler].into_iter().flatten() {
                if !self.has_change_handler(&handler.kind) {
                    return Err(NavError::UnknownChangeHandler(handler.kind.clone()));
                }
            }
            for child in &controller.child_routers {
                self.validate(&child.router, seen)?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut screens: Vec<_> = self.screens.keys().collect();
        screens.sort();
        let mut handlers: Vec<_> = self.handlers.keys().collect();
        handlers.sort();
        f.debug_struct("Registry")
            .field("screens", &screens)
            .field("handlers", &handlers)
            .finish()
    }
}

// ============================================================================
// Save / restore on the navigator
// ============================================================================

impl Navigator {
    /// Captures `key`'s backstack and everything below it. In-flight changes
    /// are completed first so the saved stack matches what is on screen.
    pub fn save_router_state(&mut self, key: &RouterKey) -> Option<RouterState> {
        let state = self.capture_router(key);
        self.settle();
        state
    }

    fn capture_router(&mut self, key: &RouterKey) -> Option<RouterState> {
        self.force_complete(key);
        let router = self.routers.get(key)?;
        let ids = router.backstack.ids();
        let pops_last_view = router.pops_last_view;

        let mut backstack = Vec::with_capacity(ids.len());
        for id in &ids {
            let Some(controller) = self.capture_controller(id) else {
                continue;
            };
            let Some(entry) = self.routers.get(key).and_then(|r| r.backstack.entry(id)) else {
                continue;
            };
            backstack.push(EntryState {
                controller,
                tag: entry.tag.clone(),
                push_handler: entry.push_handler.as_deref().map(HandlerState::capture),
                pop_handler: entry.pop_handler.as_deref().map(HandlerState::capture),
                transaction_index: entry.transaction_index,
            });
        }
        Some(RouterState {
            backstack,
            pops_last_view,
        })
    }

    fn capture_controller(&mut self, id: &ControllerId) -> Option<SavedController> {
        if self.controllers.get(id)?.view.is_some() {
            self.save_view_state(id);
        }
        let mut instance_state = Bundle::new();
        self.invoke(id, |screen, _, _| screen.on_save_instance_state(&mut instance_state))?;
        self.emit(id, LifecyclePhase::SaveInstanceState);

        let children = self.controllers.get(id)?.child_routers.clone();
        let mut child_routers = Vec::new();
        for child in &children {
            if let Some(router) = self.capture_router(child) {
                child_routers.push(ChildRouterState {
                    container: child.container().clone(),
                    tag: child.tag().map(str::to_string),
                    router,
                });
            }
        }

        let controller = self.controllers.get(id)?;
        child_routers.extend(controller.saved_child_routers.iter().map(|(key, router)| {
            ChildRouterState {
                container: key.container().clone(),
                tag: key.tag().map(str::to_string),
                router: router.clone(),
            }
        }));
        Some(SavedController {
            id: id.clone(),
            kind: controller.kind().to_string(),
            args: controller.args.clone(),
            view_state: controller.view_state.clone(),
            instance_state,
            retain_view_mode: controller.retain_view_mode,
            target: controller.target.clone(),
            child_routers,
        })
    }

    /// Replaces `key`'s backstack with `state`. The current entries are
    /// destroyed first; if `state` does not validate the router stays empty.
    pub fn restore_router_state(
        &mut self,
        key: &RouterKey,
        state: RouterState,
    ) -> Result<(), NavError> {
        if !self.routers.contains_key(key) {
            return Err(NavError::UnknownRouter(key.clone()));
        }
        self.force_complete(key);
        let existing = self
            .routers
            .get_mut(key)
            .map(|router| router.backstack.clear())
            .unwrap_or_default();
        for entry in &existing {
            self.destroy_controller(entry.controller());
        }

        if let Err(err) = self.validate_fresh(&state) {
            warn!("Restore of {key} rejected: {err}");
            self.settle();
            return Err(err);
        }
        self.materialize_router(key, state);
        self.rebind(key);
        self.settle();
        Ok(())
    }

    fn validate_fresh(&self, state: &RouterState) -> Result<(), NavError> {
        let mut seen = HashSet::new();
        self.registry.validate(state, &mut seen)?;
        match seen.into_iter().find(|id| self.controllers.contains_key(id)) {
            Some(id) => Err(NavError::DuplicateController(id)),
            None => Ok(()),
        }
    }

    /// Builds controllers and entries for an already validated state.
    pub(crate) fn materialize_router(&mut self, key: &RouterKey, state: RouterState) {
        if let Some(router) = self.routers.get_mut(key) {
            router.pops_last_view = state.pops_last_view;
        }
        let count = state.backstack.len();
        for entry_state in state.backstack {
            let saved = entry_state.controller;
            if self.controllers.contains_key(&saved.id) {
                warn!("Skipping restored controller {}: id already live", saved.id);
                continue;
            }
            let screen = match self.registry.build_screen(&saved.kind, &saved.args) {
                Ok(screen) => screen,
                Err(err) => {
                    warn!("Skipping restored controller {}: {err}", saved.id);
                    continue;
                }
            };
            let id = saved.id.clone();
            let mut controller = Controller::from_parts(saved.id, screen, saved.args);
            controller.view_state = saved.view_state;
            controller.retain_view_mode = saved.retain_view_mode;
            controller.target = saved.target;
            controller.router = Some(key.clone());
            controller.parent = key.parent().cloned();
            controller.saved_child_routers = saved
                .child_routers
                .into_iter()
                .map(|child| {
                    let key = RouterKey::child(id.clone(), child.container, child.tag);
                    (key, child.router)
                })
                .collect();
            self.controllers.insert(id.clone(), controller);

            let instance_state = saved.instance_state;
            self.invoke(&id, |screen, _, _| screen.on_restore_instance_state(&instance_state));
            self.emit(&id, LifecyclePhase::RestoreInstanceState);
            self.ensure_context(&id);

            let entry = Entry {
                controller: id,
                push_handler: entry_state
                    .push_handler
                    .and_then(|state| self.rebuild_handler(&state)),
                pop_handler: entry_state
                    .pop_handler
                    .and_then(|state| self.rebuild_handler(&state)),
                tag: entry_state.tag,
                transaction_index: entry_state.transaction_index,
            };
            self.next_transaction_index = self
                .next_transaction_index
                .max(entry_state.transaction_index + 1);
            if let Some(router) = self.routers.get_mut(key) {
                router.backstack.push(entry);
            }
        }
        debug!("Materialized {count} entries on {key}");
    }

    fn rebuild_handler(&self, state: &HandlerState) -> Option<Box<dyn ChangeHandler>> {
        self.registry
            .build_change_handler(state)
            .inspect_err(|err| warn!("Dropping saved change handler: {err}"))
            .ok()
    }

    /// Saves every host router, including restored ones not attached yet.
    pub fn save_instance_state(&mut self) -> NavigatorState {
        let mut routers = Vec::new();
        for key in self.host_routers.clone() {
            if let Some(router) = self.capture_router(&key) {
                routers.push(HostRouterState {
                    container: key.container().clone(),
                    router,
                });
            }
        }
        let mut pending: Vec<_> = self.saved_host_routers.iter().collect();
        pending.sort_by(|a, b| a.0.cmp(b.0));
        routers.extend(pending.into_iter().map(|(container, router)| HostRouterState {
            container: container.clone(),
            router: router.clone(),
        }));
        self.settle();
        info!("Saved navigator state ({} host routers)", routers.len());
        NavigatorState { routers }
    }

    /// Validates `state` as a whole, then restores host routers that are
    /// already attached and parks the rest until `attach_router` asks for
    /// their container.
    pub fn restore_instance_state(&mut self, state: NavigatorState) -> Result<(), NavError> {
        let mut seen = HashSet::new();
        for host in &state.routers {
            self.registry.validate(&host.router, &mut seen)?;
        }
        for host in state.routers {
            let key = RouterKey::host(host.container.clone());
            if self.routers.contains_key(&key) {
                self.restore_router_state(&key, host.router)?;
            } else {
                self.saved_host_routers.insert(host.container, host.router);
            }
        }
        info!("Restored navigator state");
        Ok(())
    }
}
