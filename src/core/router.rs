//! # Routers
//!
//! A router owns one backstack and, while its host provides one, one
//! container. Routers are addressed by `RouterKey`: the (parent controller,
//! container, tag) triple. Host routers have no parent.
//!
//! The `Router` struct is the read-only face of a router; every mutation goes
//! through `Navigator`, which owns all routers and controllers.

use std::fmt;

use crate::core::backstack::Backstack;
use crate::core::change::{ChangeHandler, ChangeType};
use crate::core::controller::ControllerId;
use crate::core::lifecycle::{ListenerId, ListenerSet, RouterEvent};
use crate::core::view::{Container, ContainerId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouterKey {
    parent: Option<ControllerId>,
    container: ContainerId,
    tag: Option<String>,
}

impl RouterKey {
    /// A router attached directly to the host for `container`.
    pub fn host(container: impl Into<ContainerId>) -> Self {
        Self {
            parent: None,
            container: container.into(),
            tag: None,
        }
    }

    /// A router hosted in `container` of `parent`'s view.
    pub fn child(parent: ControllerId, container: ContainerId, tag: Option<String>) -> Self {
        Self {
            parent: Some(parent),
            container,
            tag,
        }
    }

    pub fn parent(&self) -> Option<&ControllerId> {
        self.parent.as_ref()
    }

    pub fn container(&self) -> &ContainerId {
        &self.container
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn is_host(&self) -> bool {
        self.parent.is_none()
    }
}

impl fmt::Display for RouterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parent {
            Some(parent) => write!(f, "{parent}/{}", self.container)?,
            None => write!(f, "host/{}", self.container)?,
        }
        if let Some(tag) = &self.tag {
            write!(f, "#{tag}")?;
        }
        Ok(())
    }
}

/// The change currently running on a router.
pub(crate) struct ActiveChange {
    pub seq: u64,
    pub handler: Box<dyn ChangeHandler>,
    pub from: Option<ControllerId>,
    pub to: Option<ControllerId>,
    pub is_push: bool,
    /// `from` left the backstack and is destroyed when the change completes.
    pub from_removed: bool,
    /// Whether `from` is unmounted when the change completes.
    pub removes_from: bool,
    /// Where a reusable handler goes back to: (controller, is push slot).
    pub origin: Option<(ControllerId, bool)>,
    pub siblings: Siblings,
}

/// Controllers below the top whose visibility flips with a change. They
/// take part in it alongside `from` and `to`.
#[derive(Debug, Default)]
pub(crate) struct Siblings {
    /// Visible before, hidden when the change completes.
    pub covered: Vec<ControllerId>,
    /// Mounted when the change starts, attached when it completes.
    pub uncovered: Vec<ControllerId>,
}

impl ActiveChange {
    pub fn change_type_for(&self, id: &ControllerId) -> Option<ChangeType> {
        if self.to.as_ref() == Some(id) || self.siblings.uncovered.contains(id) {
            Some(ChangeType::entering(self.is_push))
        } else if self.from.as_ref() == Some(id) || self.siblings.covered.contains(id) {
            Some(ChangeType::exiting(self.is_push))
        } else {
            None
        }
    }
}

pub struct Router {
    pub(crate) key: RouterKey,
    pub(crate) backstack: Backstack,
    pub(crate) container: Option<Container>,
    pub(crate) in_flight: Option<ActiveChange>,
    pub(crate) pops_last_view: bool,
    pub(crate) listeners: ListenerSet<RouterEvent>,
    /// Creation order among siblings, for `ChildBackPolicy::RegistrationOrder`.
    pub(crate) created_seq: u64,
}

impl Router {
    pub(crate) fn new(key: RouterKey, created_seq: u64) -> Self {
        Self {
            key,
            backstack: Backstack::new(),
            container: None,
            in_flight: None,
            pops_last_view: false,
            listeners: ListenerSet::new(),
            created_seq,
        }
    }

    pub fn key(&self) -> &RouterKey {
        &self.key
    }

    pub fn backstack(&self) -> &Backstack {
        &self.backstack
    }

    pub fn backstack_size(&self) -> usize {
        self.backstack.len()
    }

    pub fn has_root(&self) -> bool {
        !self.backstack.is_empty()
    }

    pub fn top(&self) -> Option<&ControllerId> {
        self.backstack.top_id()
    }

    pub fn container(&self) -> Option<&Container> {
        self.container.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.container.is_some()
    }

    /// True while a change handler is still running.
    pub fn is_transitioning(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn pops_last_view(&self) -> bool {
        self.pops_last_view
    }

    pub fn add_change_listener(&self, listener: impl Fn(&RouterEvent) + 'static) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn remove_change_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub(crate) fn in_flight_entering(&self, id: &ControllerId) -> bool {
        self.in_flight
            .as_ref()
            .and_then(|change| change.change_type_for(id))
            .is_some_and(ChangeType::is_enter)
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("key", &self.key)
            .field("backstack", &self.backstack)
            .field("bound", &self.container.is_some())
            .field("transitioning", &self.in_flight.is_some())
            .finish()
    }
}
