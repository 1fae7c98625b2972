//! # Controllers
//!
//! A controller is one navigable screen: an identity, a lifecycle state, at
//! most one view, saved state, and the child routers hosted in its view.
//!
//! ```text
//! Controller
//! ├── id: ControllerId          stable across save/restore
//! ├── screen: Box<dyn Screen>   the behaviour (hooks below)
//! ├── args: Bundle              constructor arguments, persisted
//! ├── state: ControllerState
//! ├── view: Option<View>
//! ├── view_state / instance_state: Option<Bundle>
//! ├── child_routers: Vec<RouterKey>
//! └── parent / router / target  keys, never owning references
//! ```
//!
//! Screens never touch the arena directly. Every hook gets a
//! `ControllerContext`, and navigation requested from inside a hook is
//! queued as a `NavCommand` that the navigator applies once the current
//! operation has finished dispatching lifecycle calls.

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::bundle::Bundle;
use crate::core::change::ChangeType;
use crate::core::lifecycle::{ControllerEvent, ListenerId, ListenerSet};
use crate::core::persistence::RouterState;
use crate::core::router::RouterKey;
use crate::core::transaction::Transaction;
use crate::core::view::{ContainerId, View};

/// Process-unique, restore-stable controller identity.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ControllerId(String);

impl ControllerId {
    /// Generates a new UUID v4 identity.
    pub fn generate() -> Self {
        ControllerId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ControllerId {
    fn from(id: &str) -> Self {
        ControllerId(id.to_string())
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps log lines readable.
        f.write_str(self.0.get(..8).unwrap_or(&self.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Constructed, no view yet.
    Initialized,
    /// View created and mounted, waiting for its change to finish or for the
    /// host to allow attaching.
    ViewCreated,
    Attached,
    /// View unmounted; the view object may still be retained.
    Detached,
    Destroyed,
}

/// What happens to a view when its controller detaches.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RetainViewMode {
    /// Destroy the view on detach (saving view state first).
    #[default]
    ReleaseDetach,
    /// Keep the view across detach until retention ends or the controller is
    /// destroyed.
    RetainDetach,
}

/// Host lifecycle notifications fanned out to every live controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    Started,
    Resumed,
    Paused,
    Stopped,
}

/// The capability interface a concrete screen implements.
///
/// Only `kind` and `on_create_view` are required. Hooks that produce or
/// consume views get the view separately from the context.
pub trait Screen: Any {
    /// Registry key used to recreate this screen from saved state.
    fn kind(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn on_context_available(&mut self, _ctx: &mut ControllerContext<'_>) {}

    fn on_context_unavailable(&mut self, _ctx: &mut ControllerContext<'_>) {}

    /// Produces the screen's root view for `container`.
    fn on_create_view(&mut self, ctx: &mut ControllerContext<'_>, container: &ContainerId) -> View;

    fn on_attach(&mut self, _ctx: &mut ControllerContext<'_>, _view: &mut View) {}

    fn on_detach(&mut self, _ctx: &mut ControllerContext<'_>, _view: &mut View) {}

    fn on_destroy_view(&mut self, _ctx: &mut ControllerContext<'_>, _view: &mut View) {}

    /// Release everything. Child routers are already gone by now.
    fn on_destroy(&mut self, _ctx: &mut ControllerContext<'_>) {}

    fn on_save_view_state(&mut self, _view: &View, _out: &mut Bundle) {}

    fn on_restore_view_state(&mut self, _view: &mut View, _saved: &Bundle) {}

    fn on_save_instance_state(&mut self, _out: &mut Bundle) {}

    fn on_restore_instance_state(&mut self, _saved: &Bundle) {}

    fn on_change_started(&mut self, _ctx: &mut ControllerContext<'_>, _change: ChangeType) {}

    fn on_change_ended(&mut self, _ctx: &mut ControllerContext<'_>, _change: ChangeType) {}

    /// Returns true if back navigation was consumed. Child routers are
    /// offered back before this is called.
    fn handle_back(&mut self, _ctx: &mut ControllerContext<'_>) -> bool {
        false
    }

    fn on_host_event(&mut self, _ctx: &mut ControllerContext<'_>, _event: HostEvent) {}

    fn on_activity_result(
        &mut self,
        _ctx: &mut ControllerContext<'_>,
        _request_code: i32,
        _result_code: i32,
        _data: &Bundle,
    ) {
    }

    fn on_request_permissions_result(
        &mut self,
        _ctx: &mut ControllerContext<'_>,
        _request_code: i32,
        _permissions: &[String],
        _granted: &[bool],
    ) {
    }

    fn on_options_item_selected(&mut self, _ctx: &mut ControllerContext<'_>, _item: &str) -> bool {
        false
    }
}

/// Requests a controller makes of the host bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum HostRequest {
    StartActivityForResult {
        controller: ControllerId,
        intent: Bundle,
        request_code: i32,
    },
    RequestPermissions {
        controller: ControllerId,
        permissions: Vec<String>,
        request_code: i32,
    },
    InvalidateOptionsMenu,
    /// The controller was destroyed; forget its pending request codes.
    UnregisterResults { controller: ControllerId },
}

/// Navigation requested from inside a hook, applied after the hook returns.
pub enum NavCommand {
    SetRoot(RouterKey, Transaction),
    SetRootIfEmpty(RouterKey, Transaction),
    Push(RouterKey, Transaction),
    Pop(RouterKey),
    PopController(RouterKey, ControllerId),
    PopToRoot(RouterKey),
    ReplaceTop(RouterKey, Transaction),
    EnsureChildRouter(RouterKey),
    RemoveChildRouter(RouterKey),
    SetRetainViewMode(ControllerId, RetainViewMode),
    Host(HostRequest),
}

impl fmt::Debug for NavCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavCommand::SetRoot(router, _) => write!(f, "SetRoot({router})"),
            NavCommand::SetRootIfEmpty(router, _) => write!(f, "SetRootIfEmpty({router})"),
            NavCommand::Push(router, _) => write!(f, "Push({router})"),
            NavCommand::Pop(router) => write!(f, "Pop({router})"),
            NavCommand::PopController(router, id) => write!(f, "PopController({router}, {id})"),
            NavCommand::PopToRoot(router) => write!(f, "PopToRoot({router})"),
            NavCommand::ReplaceTop(router, _) => write!(f, "ReplaceTop({router})"),
            NavCommand::EnsureChildRouter(router) => write!(f, "EnsureChildRouter({router})"),
            NavCommand::RemoveChildRouter(router) => write!(f, "RemoveChildRouter({router})"),
            NavCommand::SetRetainViewMode(id, mode) => {
                write!(f, "SetRetainViewMode({id}, {mode:?})")
            }
            NavCommand::Host(request) => write!(f, "Host({request:?})"),
        }
    }
}

/// What a hook can see and request.
pub struct ControllerContext<'a> {
    id: &'a ControllerId,
    router: Option<&'a RouterKey>,
    args: &'a Bundle,
    commands: Vec<NavCommand>,
}

impl<'a> ControllerContext<'a> {
    pub(crate) fn new(
        id: &'a ControllerId,
        router: Option<&'a RouterKey>,
        args: &'a Bundle,
    ) -> Self {
        Self {
            id,
            router,
            args,
            commands: Vec::new(),
        }
    }

    pub fn id(&self) -> &ControllerId {
        self.id
    }

    /// The router this controller is pushed on, if any.
    pub fn router(&self) -> Option<&RouterKey> {
        self.router
    }

    pub fn args(&self) -> &Bundle {
        self.args
    }

    /// Key of the child router hosted in `container` of this controller's
    /// view. The router is created (or restored) when the command runs.
    pub fn child_router(
        &mut self,
        container: impl Into<ContainerId>,
        tag: Option<&str>,
    ) -> RouterKey {
        let key = RouterKey::child(self.id.clone(), container.into(), tag.map(str::to_string));
        self.commands.push(NavCommand::EnsureChildRouter(key.clone()));
        key
    }

    pub fn remove_child_router(&mut self, router: RouterKey) {
        self.commands.push(NavCommand::RemoveChildRouter(router));
    }

    pub fn set_root(&mut self, router: RouterKey, transaction: Transaction) {
        self.commands.push(NavCommand::SetRoot(router, transaction));
    }

    /// Sets a root only if the router's backstack is still empty when the
    /// command runs, e.g. after a restore already repopulated it.
    pub fn set_root_if_empty(&mut self, router: RouterKey, transaction: Transaction) {
        self.commands.push(NavCommand::SetRootIfEmpty(router, transaction));
    }

    pub fn push(&mut self, router: RouterKey, transaction: Transaction) {
        self.commands.push(NavCommand::Push(router, transaction));
    }

    /// Pushes onto this controller's own router.
    pub fn push_here(&mut self, transaction: Transaction) {
        if let Some(router) = self.router.cloned() {
            self.push(router, transaction);
        } else {
            log::warn!("Controller {} pushed without a router; dropped", self.id);
        }
    }

    pub fn pop(&mut self, router: RouterKey) {
        self.commands.push(NavCommand::Pop(router));
    }

    /// Removes this controller from its router, wherever it sits.
    pub fn pop_self(&mut self) {
        if let Some(router) = self.router.cloned() {
            self.commands
                .push(NavCommand::PopController(router, self.id.clone()));
        }
    }

    pub fn pop_to_root(&mut self, router: RouterKey) {
        self.commands.push(NavCommand::PopToRoot(router));
    }

    pub fn replace_top(&mut self, router: RouterKey, transaction: Transaction) {
        self.commands.push(NavCommand::ReplaceTop(router, transaction));
    }

    pub fn set_retain_view_mode(&mut self, mode: RetainViewMode) {
        self.commands
            .push(NavCommand::SetRetainViewMode(self.id.clone(), mode));
    }

    pub fn start_activity_for_result(&mut self, intent: Bundle, request_code: i32) {
        self.commands
            .push(NavCommand::Host(HostRequest::StartActivityForResult {
                controller: self.id.clone(),
                intent,
                request_code,
            }));
    }

    pub fn request_permissions(&mut self, permissions: Vec<String>, request_code: i32) {
        self.commands
            .push(NavCommand::Host(HostRequest::RequestPermissions {
                controller: self.id.clone(),
                permissions,
                request_code,
            }));
    }

    pub fn invalidate_options_menu(&mut self) {
        self.commands
            .push(NavCommand::Host(HostRequest::InvalidateOptionsMenu));
    }

    pub(crate) fn into_commands(self) -> Vec<NavCommand> {
        self.commands
    }
}

/// A screen plus the engine's bookkeeping for it.
pub struct Controller {
    pub(crate) id: ControllerId,
    pub(crate) screen: Box<dyn Screen>,
    pub(crate) args: Bundle,
    pub(crate) state: ControllerState,
    pub(crate) view: Option<View>,
    pub(crate) view_state: Option<Bundle>,
    pub(crate) retain_view_mode: RetainViewMode,
    pub(crate) listeners: ListenerSet<ControllerEvent>,
    pub(crate) router: Option<RouterKey>,
    pub(crate) parent: Option<ControllerId>,
    pub(crate) target: Option<ControllerId>,
    pub(crate) child_routers: Vec<RouterKey>,
    /// Saved child router states not yet claimed by a `child_router` call.
    pub(crate) saved_child_routers: Vec<(RouterKey, RouterState)>,
    pub(crate) has_context: bool,
    pub(crate) needs_attach: bool,
    /// Detached because the host stopped, not because it left the screen.
    pub(crate) detached_for_host: bool,
}

impl Controller {
    pub fn new(screen: impl Screen) -> Self {
        Self::with_args(screen, Bundle::new())
    }

    /// Creates a controller whose `args` are persisted and handed back to the
    /// screen factory on restore.
    pub fn with_args(screen: impl Screen, args: Bundle) -> Self {
        Self::from_parts(ControllerId::generate(), Box::new(screen), args)
    }

    pub(crate) fn from_parts(id: ControllerId, screen: Box<dyn Screen>, args: Bundle) -> Self {
        Self {
            id,
            screen,
            args,
            state: ControllerState::Initialized,
            view: None,
            view_state: None,
            retain_view_mode: RetainViewMode::default(),
            listeners: ListenerSet::new(),
            router: None,
            parent: None,
            target: None,
            child_routers: Vec::new(),
            saved_child_routers: Vec::new(),
            has_context: false,
            needs_attach: false,
            detached_for_host: false,
        }
    }

    pub fn id(&self) -> &ControllerId {
        &self.id
    }

    pub fn kind(&self) -> &'static str {
        self.screen.kind()
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn is_attached(&self) -> bool {
        self.state == ControllerState::Attached
    }

    pub fn is_destroyed(&self) -> bool {
        self.state == ControllerState::Destroyed
    }

    pub fn args(&self) -> &Bundle {
        &self.args
    }

    pub fn view(&self) -> Option<&View> {
        self.view.as_ref()
    }

    pub fn saved_view_state(&self) -> Option<&Bundle> {
        self.view_state.as_ref()
    }

    pub fn retain_view_mode(&self) -> RetainViewMode {
        self.retain_view_mode
    }

    /// Sets the retention policy before the controller is pushed. Once it is
    /// live, use `Navigator::set_retain_view_mode` so ending retention can
    /// release the view.
    pub fn set_retain_view_mode(&mut self, mode: RetainViewMode) {
        self.retain_view_mode = mode;
    }

    pub fn router(&self) -> Option<&RouterKey> {
        self.router.as_ref()
    }

    pub fn parent(&self) -> Option<&ControllerId> {
        self.parent.as_ref()
    }

    pub fn target(&self) -> Option<&ControllerId> {
        self.target.as_ref()
    }

    /// Marks `target` as the controller that should receive this one's results.
    /// Use this before pushing; once the controller lives in a navigator, use
    /// `Navigator::set_target`.
    pub fn set_target(&mut self, target: &ControllerId) {
        self.target = Some(target.clone());
    }

    pub fn child_routers(&self) -> &[RouterKey] {
        &self.child_routers
    }

    pub fn add_lifecycle_listener(
        &self,
        listener: impl Fn(&ControllerEvent) + 'static,
    ) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn remove_lifecycle_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn screen(&self) -> &dyn Screen {
        self.screen.as_ref()
    }

    pub fn screen_as<T: Screen>(&self) -> Option<&T> {
        self.screen.as_any().downcast_ref::<T>()
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("id", &self.id)
            .field("kind", &self.screen.kind())
            .field("state", &self.state)
            .field("has_view", &self.view.is_some())
            .finish()
    }
}
