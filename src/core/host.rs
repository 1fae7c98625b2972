//! # Host Bridge
//!
//! The navigator knows nothing about windows or processes. A host drives it
//! with lifecycle calls and receives the requests screens make of the
//! platform.
//!
//! ```text
//!  platform ──on_start/on_stop/..──▶ LifecycleHost ──▶ Navigator
//!     ▲                                   │
//!     └── start_activity_for_result ◀─────┘ (HostRequest outbox)
//!         request_permissions
//! ```
//!
//! `LifecycleHost` remembers which controller asked for which request code,
//! so results find their way back by controller id, including after a
//! save/restore cycle. Permission requests made while detached are queued
//! and replayed once the host attaches.

use std::collections::BTreeMap;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::core::bundle::Bundle;
use crate::core::controller::{ControllerId, HostEvent, HostRequest};
use crate::core::error::NavError;
use crate::core::navigator::Navigator;
use crate::core::persistence::NavigatorState;
use crate::core::router::{Router, RouterKey};
use crate::core::view::{Container, ContainerId};

// ============================================================================
// Navigator side
// ============================================================================

impl Navigator {
    /// Creates (or rebinds) the host router for `container`. A restored
    /// state saved for this container is materialized on first attach.
    pub fn attach_router(&mut self, container: impl Into<ContainerId>) -> RouterKey {
        let key = RouterKey::host(container.into());
        if !self.routers.contains_key(&key) {
            let seq = self.next_router_seq;
            self.next_router_seq += 1;
            self.routers.insert(key.clone(), Router::new(key.clone(), seq));
            self.host_routers.push(key.clone());
            info!("Attached host router {key}");
            if let Some(state) = self.saved_host_routers.remove(key.container()) {
                self.materialize_router(&key, state);
            }
        }
        if let Some(router) = self.routers.get_mut(&key)
            && router.container.is_none()
        {
            router.container = Some(Container::new(key.container().clone()));
        }
        self.rebind(&key);
        self.settle();
        key
    }

    /// The host can now provide resources; every controller learns so, top
    /// of each stack first.
    pub fn on_context_available(&mut self) {
        self.context_available = true;
        for id in self.tree_order() {
            self.ensure_context(&id);
        }
        for key in self.host_routers.clone() {
            self.rebind(&key);
        }
        self.settle();
    }

    pub fn on_host_started(&mut self) {
        self.host_started = true;
        self.fan_out(HostEvent::Started);
        for key in self.host_routers.clone() {
            self.rebind(&key);
        }
        self.settle();
    }

    pub fn on_host_resumed(&mut self) {
        self.fan_out(HostEvent::Resumed);
        self.settle();
    }

    pub fn on_host_paused(&mut self) {
        self.fan_out(HostEvent::Paused);
        self.settle();
    }

    /// Saves view state and detaches everything on screen. Views stay
    /// mounted so a restart re-attaches without recreating them.
    pub fn on_host_stopped(&mut self) {
        self.fan_out(HostEvent::Stopped);
        self.host_started = false;
        for id in self.tree_order() {
            if self.controllers.get(&id).is_some_and(|c| c.is_attached()) {
                self.save_view_state(&id);
                if let Some(controller) = self.controllers.get_mut(&id) {
                    controller.detached_for_host = true;
                }
            }
        }
        for key in self.host_routers.clone() {
            self.detach_router_controllers(&key);
        }
        self.settle();
    }

    /// With `transient`, the host is being recreated: views go, controllers
    /// and backstacks stay, and `attach_router` later rebinds them.
    /// Otherwise every router and controller is destroyed.
    pub fn on_host_destroyed(&mut self, transient: bool) {
        let keys: Vec<RouterKey> = self.routers.keys().cloned().collect();
        for key in &keys {
            self.force_complete(key);
        }
        if transient {
            for key in self.host_routers.clone() {
                self.unbind_router(&key);
            }
            for id in self.tree_order() {
                self.drop_context(&id);
            }
        } else {
            for key in self.host_routers.clone().iter().rev() {
                self.destroy_router(key);
            }
        }
        self.context_available = false;
        self.host_started = false;
        info!("Host destroyed (transient: {transient})");
        self.settle();
    }

    /// Routes a result to the controller that asked for it. Returns false if
    /// that controller is gone.
    pub fn deliver_activity_result(
        &mut self,
        id: &ControllerId,
        request_code: i32,
        result_code: i32,
        data: &Bundle,
    ) -> bool {
        let delivered = self
            .invoke(id, |screen, ctx, _| {
                screen.on_activity_result(ctx, request_code, result_code, data)
            })
            .is_some();
        self.settle();
        delivered
    }

    pub fn deliver_permissions_result(
        &mut self,
        id: &ControllerId,
        request_code: i32,
        permissions: &[String],
        granted: &[bool],
    ) -> bool {
        let delivered = self
            .invoke(id, |screen, ctx, _| {
                screen.on_request_permissions_result(ctx, request_code, permissions, granted)
            })
            .is_some();
        self.settle();
        delivered
    }

    /// Offers a menu selection to attached controllers, topmost first.
    pub fn options_item_selected(&mut self, item: &str) -> bool {
        let mut handled = false;
        for id in self.tree_order() {
            if !self.controllers.get(&id).is_some_and(|c| c.is_attached()) {
                continue;
            }
            if self
                .invoke(&id, |screen, ctx, _| screen.on_options_item_selected(ctx, item))
                .unwrap_or(false)
            {
                handled = true;
                break;
            }
        }
        self.settle();
        handled
    }

    fn fan_out(&mut self, event: HostEvent) {
        debug!("Host event {event:?}");
        for id in self.tree_order() {
            self.invoke(&id, |screen, ctx, _| screen.on_host_event(ctx, event));
        }
    }

    /// Every live controller: host routers in attach order, each stack top
    /// first, each controller followed by its child routers.
    pub(crate) fn tree_order(&self) -> Vec<ControllerId> {
        let mut out = Vec::new();
        for key in &self.host_routers {
            self.collect_tree(key, &mut out);
        }
        out
    }

    fn collect_tree(&self, key: &RouterKey, out: &mut Vec<ControllerId>) {
        let Some(router) = self.routers.get(key) else {
            return;
        };
        for entry in router.backstack.entries().iter().rev() {
            out.push(entry.controller().clone());
            if let Some(controller) = self.controllers.get(entry.controller()) {
                for child in &controller.child_routers {
                    self.collect_tree(child, out);
                }
            }
        }
    }
}

// ============================================================================
// Platform adapter
// ============================================================================

/// What the host platform does on behalf of screens.
pub trait Platform {
    fn start_activity_for_result(&mut self, intent: &Bundle, request_code: i32);

    fn request_permissions(&mut self, permissions: &[String], request_code: i32);

    fn invalidate_options_menu(&mut self) {}
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PendingPermissionRequest {
    pub controller: ControllerId,
    pub permissions: Vec<String>,
    pub request_code: i32,
}

/// Saved form of a `LifecycleHost`: the navigator tree plus request
/// bookkeeping.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct HostState {
    pub navigator: NavigatorState,
    #[serde(default)]
    pub activity_requests: BTreeMap<i32, ControllerId>,
    #[serde(default)]
    pub permission_requests: BTreeMap<i32, ControllerId>,
    #[serde(default)]
    pub pending_permissions: Vec<PendingPermissionRequest>,
}

/// Binds a navigator to a platform and its lifecycle.
pub struct LifecycleHost<P: Platform> {
    navigator: Navigator,
    platform: P,
    activity_requests: BTreeMap<i32, ControllerId>,
    permission_requests: BTreeMap<i32, ControllerId>,
    pending_permissions: Vec<PendingPermissionRequest>,
    attached: bool,
    destroyed: bool,
    prepared_for_detach: bool,
}

impl<P: Platform> LifecycleHost<P> {
    pub fn new(navigator: Navigator, platform: P) -> Self {
        Self {
            navigator,
            platform,
            activity_requests: BTreeMap::new(),
            permission_requests: BTreeMap::new(),
            pending_permissions: Vec::new(),
            attached: false,
            destroyed: false,
            prepared_for_detach: false,
        }
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Runs navigation against the navigator and forwards whatever the
    /// screens asked of the platform.
    pub fn dispatch<R>(&mut self, f: impl FnOnce(&mut Navigator) -> R) -> R {
        let result = f(&mut self.navigator);
        self.flush_requests();
        result
    }

    pub fn attach_router(&mut self, container: impl Into<ContainerId>) -> RouterKey {
        let container = container.into();
        self.dispatch(|navigator| navigator.attach_router(container))
    }

    /// The host gained its context: pending permission requests are
    /// replayed, newest first.
    pub fn on_attach(&mut self) {
        self.destroyed = false;
        if !self.attached {
            self.attached = true;
            while let Some(request) = self.pending_permissions.pop() {
                self.send_permission_request(request);
            }
        }
        self.dispatch(Navigator::on_context_available);
    }

    pub fn on_start(&mut self) {
        self.prepared_for_detach = false;
        self.dispatch(Navigator::on_host_started);
    }

    pub fn on_resume(&mut self) {
        self.dispatch(Navigator::on_host_resumed);
    }

    pub fn on_pause(&mut self) {
        self.dispatch(Navigator::on_host_paused);
    }

    pub fn on_stop(&mut self) {
        self.prepare_for_host_detach();
        self.dispatch(Navigator::on_host_stopped);
    }

    /// Saves everything needed to rebuild this host later.
    pub fn on_save_instance_state(&mut self) -> HostState {
        self.prepare_for_host_detach();
        let navigator = self.dispatch(Navigator::save_instance_state);
        HostState {
            navigator,
            activity_requests: self.activity_requests.clone(),
            permission_requests: self.permission_requests.clone(),
            pending_permissions: self.pending_permissions.clone(),
        }
    }

    /// Restores request bookkeeping and the navigator tree. Host routers
    /// come back as `attach_router` is called for their containers.
    pub fn restore(&mut self, state: HostState) -> Result<(), NavError> {
        self.activity_requests = state.activity_requests;
        self.permission_requests = state.permission_requests;
        self.pending_permissions = state.pending_permissions;
        self.dispatch(|navigator| navigator.restore_instance_state(state.navigator))
    }

    /// The host lost its context. `transient` means it will be recreated
    /// (the navigator keeps controllers); otherwise everything is destroyed.
    pub fn on_detach(&mut self, transient: bool) {
        self.attached = false;
        self.destroy_routers(transient);
    }

    pub fn on_destroy(&mut self) {
        self.destroy_routers(false);
    }

    fn destroy_routers(&mut self, transient: bool) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.prepare_for_host_detach();
        self.dispatch(|navigator| navigator.on_host_destroyed(transient));
    }

    /// Settles running changes once per detach cycle.
    fn prepare_for_host_detach(&mut self) {
        if self.prepared_for_detach {
            return;
        }
        self.prepared_for_detach = true;
        self.dispatch(Navigator::complete_pending_changes);
    }

    pub fn on_activity_result(
        &mut self,
        request_code: i32,
        result_code: i32,
        data: &Bundle,
    ) -> bool {
        let Some(id) = self.activity_requests.get(&request_code).cloned() else {
            debug!("No controller waiting on request {request_code}");
            return false;
        };
        self.dispatch(|navigator| {
            navigator.deliver_activity_result(&id, request_code, result_code, data)
        })
    }

    pub fn on_request_permissions_result(
        &mut self,
        request_code: i32,
        permissions: &[String],
        granted: &[bool],
    ) -> bool {
        let Some(id) = self.permission_requests.remove(&request_code) else {
            debug!("No controller waiting on permission request {request_code}");
            return false;
        };
        self.dispatch(|navigator| {
            navigator.deliver_permissions_result(&id, request_code, permissions, granted)
        })
    }

    pub fn on_options_item_selected(&mut self, item: &str) -> bool {
        self.dispatch(|navigator| navigator.options_item_selected(item))
    }

    fn flush_requests(&mut self) {
        for request in self.navigator.take_host_requests() {
            match request {
                HostRequest::StartActivityForResult {
                    controller,
                    intent,
                    request_code,
                } => {
                    self.activity_requests.insert(request_code, controller);
                    self.platform.start_activity_for_result(&intent, request_code);
                }
                HostRequest::RequestPermissions {
                    controller,
                    permissions,
                    request_code,
                } => {
                    let request = PendingPermissionRequest {
                        controller,
                        permissions,
                        request_code,
                    };
                    if self.attached {
                        self.send_permission_request(request);
                    } else {
                        self.pending_permissions.push(request);
                    }
                }
                HostRequest::InvalidateOptionsMenu => self.platform.invalidate_options_menu(),
                HostRequest::UnregisterResults { controller } => {
                    self.activity_requests.retain(|_, id| *id != controller);
                    self.permission_requests.retain(|_, id| *id != controller);
                    self.pending_permissions
                        .retain(|request| request.controller != controller);
                }
            }
        }
    }

    fn send_permission_request(&mut self, request: PendingPermissionRequest) {
        self.permission_requests
            .insert(request.request_code, request.controller);
        self.platform
            .request_permissions(&request.permissions, request.request_code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::navigator::NavigatorConfig;
    use crate::test_support::{registry, tx, RecordingPlatform, TestScreen};

    fn host() -> LifecycleHost<RecordingPlatform> {
        let navigator = Navigator::new(NavigatorConfig::default(), registry());
        LifecycleHost::new(navigator, RecordingPlatform::default())
    }

    #[test]
    fn test_activity_result_routes_to_requesting_controller() {
        let mut host = host();
        host.on_attach();
        host.on_start();
        let main = host.attach_router("main");
        host.dispatch(|nav| nav.set_root(&main, tx("a")));
        let a = host.navigator().find_controller_by_tag("a").unwrap().clone();

        host.dispatch(|nav| {
            nav.with_screen::<TestScreen, _>(&a, |_, ctx| {
                ctx.start_activity_for_result(Bundle::new().with("pick", "photo"), 7);
            })
        });
        assert_eq!(host.platform().started, vec![7]);

        assert!(host.on_activity_result(7, 1, &Bundle::new()));
        let screen = host.navigator().screen::<TestScreen>(&a).unwrap();
        assert_eq!(screen.results, vec![(7, 1)]);
        assert!(!host.on_activity_result(99, 1, &Bundle::new()));
    }

    #[test]
    fn test_permissions_queue_until_attached() {
        let mut host = host();
        let main = host.attach_router("main");
        host.dispatch(|nav| nav.set_root(&main, tx("a")));
        let a = host.navigator().find_controller_by_tag("a").unwrap().clone();
        host.dispatch(|nav| {
            nav.with_screen::<TestScreen, _>(&a, |_, ctx| {
                ctx.request_permissions(vec!["camera".to_string()], 1);
                ctx.request_permissions(vec!["mic".to_string()], 2);
            })
        });
        assert!(host.platform().permission_codes.is_empty());

        host.on_attach();
        assert_eq!(host.platform().permission_codes, vec![2, 1]);
        assert!(host.on_request_permissions_result(1, &["camera".to_string()], &[true]));
        assert!(!host.on_request_permissions_result(1, &["camera".to_string()], &[true]));
    }

    #[test]
    fn test_destroyed_controller_forgets_request_codes() {
        let mut host = host();
        host.on_attach();
        host.on_start();
        let main = host.attach_router("main");
        host.dispatch(|nav| {
            nav.set_root(&main, tx("a"));
            nav.push(&main, tx("b"));
        });
        let b = host.navigator().find_controller_by_tag("b").unwrap().clone();
        host.dispatch(|nav| {
            nav.with_screen::<TestScreen, _>(&b, |_, ctx| {
                ctx.start_activity_for_result(Bundle::new(), 3)
            })
        });
        host.dispatch(|nav| nav.pop(&main));
        assert!(!host.on_activity_result(3, 0, &Bundle::new()));
    }

    #[test]
    fn test_transient_destroy_keeps_backstack() {
        let mut host = host();
        host.on_attach();
        host.on_start();
        let main = host.attach_router("main");
        host.dispatch(|nav| {
            nav.set_root(&main, tx("a"));
            nav.push(&main, tx("b"));
        });
        host.on_stop();
        host.on_detach(true);
        let router = host.navigator().router(&main).unwrap();
        assert_eq!(router.backstack_size(), 2);
        assert!(!router.is_bound());

        host.on_attach();
        host.attach_router("main");
        host.on_start();
        let b = host.navigator().find_controller_by_tag("b").unwrap().clone();
        assert!(host.navigator().controller(&b).unwrap().is_attached());
    }

    #[test]
    fn test_host_state_round_trips_through_json() {
        let mut host = host();
        host.on_attach();
        host.on_start();
        let main = host.attach_router("main");
        host.dispatch(|nav| nav.set_root(&main, tx("a")));
        let state = host.on_save_instance_state();
        let json = serde_json::to_string_pretty(&state).unwrap();
        let parsed: HostState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, state);
    }
}
