//! # Lifecycle Dispatch
//!
//! Runs screen hooks and moves controllers through their states.
//!
//! ```text
//! Initialized ──ensure_view──▶ ViewCreated ──attach──▶ Attached
//!      ▲                            │                     │
//!      └────────destroy_view────────┘                   detach
//!                                                         ▼
//!                  destroy_controller ◀────────────── Detached
//!                          │
//!                          ▼
//!                      Destroyed (removed from the arena)
//! ```
//!
//! Attaching is gated: a host router's controllers attach only while the
//! host is started, a child router's only while its parent is attached.
//! A controller that cannot attach yet remembers it (`needs_attach`) and is
//! attached when the gate opens. Parents attach before their children;
//! children detach before their parents.

use log::debug;

use crate::core::bundle::Bundle;
use crate::core::controller::{
    Controller, ControllerContext, ControllerId, ControllerState, HostRequest, RetainViewMode,
    Screen,
};
use crate::core::lifecycle::{ControllerEvent, LifecyclePhase};
use crate::core::navigator::Navigator;
use crate::core::router::RouterKey;
use crate::core::view::{Container, View, ViewId};

impl Navigator {
    /// Calls into `id`'s screen with a fresh context, then queues whatever
    /// navigation the hook requested. Returns None for unknown controllers.
    pub(crate) fn invoke<R>(
        &mut self,
        id: &ControllerId,
        f: impl FnOnce(&mut dyn Screen, &mut ControllerContext<'_>, &mut Option<View>) -> R,
    ) -> Option<R> {
        let controller = self.controllers.get_mut(id)?;
        let Controller {
            id: own_id,
            screen,
            args,
            router,
            view,
            ..
        } = controller;
        let mut ctx = ControllerContext::new(own_id, router.as_ref(), args);
        let result = f(screen.as_mut(), &mut ctx, view);
        self.commands.extend(ctx.into_commands());
        Some(result)
    }

    /// Reports `phase` to the controller's listeners, then the navigator's.
    pub(crate) fn emit(&self, id: &ControllerId, phase: LifecyclePhase) {
        let event = ControllerEvent {
            controller: id.clone(),
            phase,
        };
        if let Some(controller) = self.controllers.get(id) {
            controller.listeners.emit(&event);
        }
        self.lifecycle_listeners.emit(&event);
    }

    /// Whether `key` can put views on screen right now.
    pub(crate) fn can_show(&self, key: &RouterKey) -> bool {
        self.context_available
            && self
                .routers
                .get(key)
                .is_some_and(|router| router.container.is_some())
    }

    fn can_attach(&self, id: &ControllerId) -> bool {
        let Some(key) = self.controllers.get(id).and_then(|c| c.router.as_ref()) else {
            return false;
        };
        if !self.can_show(key) {
            return false;
        }
        match key.parent() {
            None => self.host_started,
            Some(parent) => self
                .controllers
                .get(parent)
                .is_some_and(Controller::is_attached),
        }
    }

    pub(crate) fn ensure_context(&mut self, id: &ControllerId) {
        if !self.context_available
            || self
                .controllers
                .get(id)
                .is_none_or(|c| c.has_context || c.is_destroyed())
        {
            return;
        }
        self.invoke(id, |screen, ctx, _| screen.on_context_available(ctx));
        if let Some(controller) = self.controllers.get_mut(id) {
            controller.has_context = true;
        }
        self.emit(id, LifecyclePhase::ContextAvailable);
    }

    pub(crate) fn drop_context(&mut self, id: &ControllerId) {
        if !self.controllers.get(id).is_some_and(|c| c.has_context) {
            return;
        }
        self.invoke(id, |screen, ctx, _| screen.on_context_unavailable(ctx));
        if let Some(controller) = self.controllers.get_mut(id) {
            controller.has_context = false;
        }
        self.emit(id, LifecyclePhase::ContextUnavailable);
    }

    /// Returns `id`'s view, creating it for `key`'s container if needed.
    /// Existing views (retained, or still mounted) are reused as is.
    pub(crate) fn ensure_view(&mut self, key: &RouterKey, id: &ControllerId) -> Option<ViewId> {
        let container_id = self.routers.get(key)?.container.as_ref()?.id().clone();
        let controller = self.controllers.get(id)?;
        if controller.is_destroyed() {
            return None;
        }
        if let Some(view) = &controller.view {
            return Some(view.id());
        }

        self.ensure_context(id);
        self.emit(id, LifecyclePhase::PreCreateView);
        let view = self.invoke(id, |screen, ctx, _| screen.on_create_view(ctx, &container_id))?;
        let view_id = view.id();
        let controller = self.controllers.get_mut(id)?;
        controller.view = Some(view);
        controller.state = ControllerState::ViewCreated;
        let saved = controller.view_state.clone();
        debug!("Created {view_id} for {id} in {key}");

        if let Some(saved) = saved {
            self.invoke(id, |screen, _, view| {
                if let Some(view) = view.as_mut() {
                    screen.on_restore_view_state(view, &saved);
                }
            });
            self.emit(id, LifecyclePhase::RestoreViewState);
        }
        self.emit(id, LifecyclePhase::PostCreateView);
        self.bind_child_routers(id);
        Some(view_id)
    }

    /// Attaches `id` if its gate is open; otherwise marks it to attach later.
    pub(crate) fn attach(&mut self, id: &ControllerId) {
        let Some(controller) = self.controllers.get(id) else {
            return;
        };
        if controller.is_attached() || controller.is_destroyed() || controller.view.is_none() {
            return;
        }
        if !self.can_attach(id) {
            if let Some(controller) = self.controllers.get_mut(id) {
                controller.needs_attach = true;
            }
            return;
        }

        self.emit(id, LifecyclePhase::PreAttach);
        self.invoke(id, |screen, ctx, view| {
            if let Some(view) = view.as_mut() {
                screen.on_attach(ctx, view);
            }
        });
        let Some(controller) = self.controllers.get_mut(id) else {
            return;
        };
        controller.state = ControllerState::Attached;
        controller.needs_attach = false;
        controller.detached_for_host = false;
        let children = controller.child_routers.clone();
        self.emit(id, LifecyclePhase::PostAttach);

        for child in children {
            self.attach_router_controllers(&child);
        }
    }

    /// Attaches the visible controllers of `key` that are not mid-change.
    pub(crate) fn attach_router_controllers(&mut self, key: &RouterKey) {
        let Some(router) = self.routers.get(key) else {
            return;
        };
        let ids: Vec<ControllerId> = router
            .backstack
            .visible_ids()
            .into_iter()
            .filter(|id| !router.in_flight_entering(id))
            .collect();
        for id in ids {
            self.attach(&id);
        }
    }

    pub(crate) fn detach(&mut self, id: &ControllerId) {
        let Some(controller) = self.controllers.get(id) else {
            return;
        };
        if !controller.is_attached() {
            return;
        }
        let children = controller.child_routers.clone();
        for child in children.iter().rev() {
            self.detach_router_controllers(child);
        }

        self.emit(id, LifecyclePhase::PreDetach);
        self.invoke(id, |screen, ctx, view| {
            if let Some(view) = view.as_mut() {
                screen.on_detach(ctx, view);
            }
        });
        if let Some(controller) = self.controllers.get_mut(id) {
            controller.state = ControllerState::Detached;
        }
        self.emit(id, LifecyclePhase::PostDetach);
    }

    /// Detaches every attached controller of `key`, top first.
    pub(crate) fn detach_router_controllers(&mut self, key: &RouterKey) {
        self.force_complete(key);
        let ids = self
            .routers
            .get(key)
            .map(|router| router.backstack.ids())
            .unwrap_or_default();
        for id in ids.iter().rev() {
            self.detach(id);
        }
    }

    /// Takes a surviving controller off screen: detach, unmount, and release
    /// the view unless it is retained.
    pub(crate) fn hide_controller(&mut self, key: &RouterKey, id: &ControllerId) {
        self.detach(id);
        if let Some(view) = self.view_id(id)
            && let Some(container) = self.routers.get_mut(key).and_then(|r| r.container.as_mut())
        {
            container.remove_view(view);
        }
        self.release_view_if_detached(id);
    }

    /// Puts a controller that became visible under the top back on screen.
    pub(crate) fn show_below(
        &mut self,
        key: &RouterKey,
        id: &ControllerId,
        anchor: Option<&ControllerId>,
    ) {
        let anchor_view = anchor.and_then(|anchor| self.view_id(anchor));
        if self.mount_below(key, id, anchor_view) {
            self.attach(id);
        }
    }

    /// Creates `id`'s view if needed and mounts it under `anchor`. Returns
    /// false when `key` cannot show views.
    pub(crate) fn mount_below(
        &mut self,
        key: &RouterKey,
        id: &ControllerId,
        anchor: Option<ViewId>,
    ) -> bool {
        if !self.can_show(key) {
            return false;
        }
        let Some(view) = self.ensure_view(key, id) else {
            return false;
        };
        if let Some(container) = self.routers.get_mut(key).and_then(|r| r.container.as_mut()) {
            match anchor {
                Some(anchor) => container.insert_view_below(view, anchor),
                None => container.add_view(view),
            }
        }
        true
    }

    fn view_id(&self, id: &ControllerId) -> Option<ViewId> {
        self.controllers
            .get(id)
            .and_then(|controller| controller.view.as_ref().map(View::id))
    }

    /// Destroys an unmounted, unattached view unless the controller retains
    /// views or a change is still moving it.
    pub(crate) fn release_view_if_detached(&mut self, id: &ControllerId) {
        let Some(controller) = self.controllers.get(id) else {
            return;
        };
        if controller.retain_view_mode == RetainViewMode::RetainDetach || controller.is_attached() {
            return;
        }
        let Some(view) = controller.view.as_ref().map(View::id) else {
            return;
        };
        if let Some(router) = controller.router.as_ref().and_then(|key| self.routers.get(key)) {
            let mounted = router
                .container
                .as_ref()
                .is_some_and(|container| container.contains(view));
            let moving = router
                .in_flight
                .as_ref()
                .is_some_and(|change| change.change_type_for(id).is_some());
            if mounted || moving {
                return;
            }
        }
        self.destroy_view(id, true);
    }

    pub(crate) fn save_view_state(&mut self, id: &ControllerId) {
        let mut out = Bundle::new();
        let saved = self
            .invoke(id, |screen, _, view| {
                view.as_ref()
                    .map(|view| screen.on_save_view_state(view, &mut out))
                    .is_some()
            })
            .unwrap_or(false);
        if saved {
            if let Some(controller) = self.controllers.get_mut(id) {
                controller.view_state = Some(out);
            }
            self.emit(id, LifecyclePhase::SaveViewState);
        }
    }

    /// Destroys `id`'s view, saving its state first when `save` is set. Child
    /// routers hosted in the view lose their containers but keep their
    /// backstacks.
    pub(crate) fn destroy_view(&mut self, id: &ControllerId, save: bool) {
        let Some(view) = self.view_id(id) else {
            return;
        };
        self.detach(id);
        let (children, router) = match self.controllers.get(id) {
            Some(controller) => (controller.child_routers.clone(), controller.router.clone()),
            None => return,
        };
        for child in &children {
            self.unbind_router(child);
        }
        if save {
            self.save_view_state(id);
        }
        if let Some(container) = router
            .as_ref()
            .and_then(|key| self.routers.get_mut(key))
            .and_then(|router| router.container.as_mut())
        {
            container.remove_view(view);
        }

        self.emit(id, LifecyclePhase::PreDestroyView);
        self.invoke(id, |screen, ctx, view| {
            if let Some(view) = view.as_mut() {
                screen.on_destroy_view(ctx, view);
            }
        });
        if let Some(controller) = self.controllers.get_mut(id) {
            controller.view = None;
            if controller.state == ControllerState::ViewCreated {
                controller.state = ControllerState::Initialized;
            }
        }
        debug!("Destroyed {view} of {id}");
        self.emit(id, LifecyclePhase::PostDestroyView);
    }

    /// Tears `id` down for good: detach, child routers, view, then
    /// `on_destroy`. The controller leaves the arena.
    pub(crate) fn destroy_controller(&mut self, id: &ControllerId) {
        let Some(controller) = self.controllers.get(id) else {
            return;
        };
        if controller.is_destroyed() {
            return;
        }
        self.detach(id);
        let children = self
            .controllers
            .get(id)
            .map(|controller| controller.child_routers.clone())
            .unwrap_or_default();
        for child in children.iter().rev() {
            self.destroy_router(child);
        }
        self.destroy_view(id, false);
        self.drop_context(id);

        self.emit(id, LifecyclePhase::PreDestroy);
        self.invoke(id, |screen, ctx, _| screen.on_destroy(ctx));
        if let Some(controller) = self.controllers.get_mut(id) {
            controller.state = ControllerState::Destroyed;
        }
        self.emit(id, LifecyclePhase::PostDestroy);
        self.host_requests.push(HostRequest::UnregisterResults {
            controller: id.clone(),
        });
        self.controllers.remove(id);
        debug!("Destroyed controller {id}");
    }

    /// Destroys every controller on `key` and forgets the router.
    pub(crate) fn destroy_router(&mut self, key: &RouterKey) {
        self.force_complete(key);
        let entries = self
            .routers
            .get_mut(key)
            .map(|router| router.backstack.clear())
            .unwrap_or_default();
        for entry in &entries {
            self.destroy_controller(entry.controller());
        }
        self.routers.remove(key);
        self.host_routers.retain(|existing| existing != key);
        if let Some(parent) = key.parent().and_then(|id| self.controllers.get_mut(id)) {
            parent.child_routers.retain(|existing| existing != key);
        }
        debug!("Destroyed router {key}");
    }

    /// Gives `key` a container if its parent's view declares one.
    pub(crate) fn bind_child_router(&mut self, key: &RouterKey) {
        let Some(parent) = key.parent() else {
            return;
        };
        let hosted = self
            .controllers
            .get(parent)
            .and_then(|controller| controller.view.as_ref())
            .is_some_and(|view| view.hosts(key.container()));
        if !hosted {
            debug!("{key} waits for its parent view to provide a container");
            return;
        }
        let Some(router) = self.routers.get_mut(key) else {
            return;
        };
        if router.container.is_none() {
            router.container = Some(Container::new(key.container().clone()));
        }
        self.rebind(key);
    }

    fn bind_child_routers(&mut self, parent: &ControllerId) {
        let children = self
            .controllers
            .get(parent)
            .map(|controller| controller.child_routers.clone())
            .unwrap_or_default();
        for child in &children {
            self.bind_child_router(child);
        }
    }

    /// Takes `key`'s container away: views are destroyed with their state
    /// saved, controllers and backstack stay.
    pub(crate) fn unbind_router(&mut self, key: &RouterKey) {
        self.force_complete(key);
        let ids = self
            .routers
            .get(key)
            .map(|router| router.backstack.ids())
            .unwrap_or_default();
        for id in ids.iter().rev() {
            self.destroy_view(id, true);
        }
        if let Some(router) = self.routers.get_mut(key) {
            router.container = None;
        }
    }

    /// Mounts and attaches `key`'s visible controllers, e.g. after its
    /// container came back.
    pub(crate) fn rebind(&mut self, key: &RouterKey) {
        if !self.can_show(key) {
            return;
        }
        let visible = self
            .routers
            .get(key)
            .map(|router| router.backstack.visible_ids())
            .unwrap_or_default();
        for id in &visible {
            if let Some(view) = self.ensure_view(key, id)
                && let Some(container) =
                    self.routers.get_mut(key).and_then(|r| r.container.as_mut())
            {
                container.add_view(view);
            }
        }
        for id in &visible {
            self.attach(id);
        }
    }
}
