//! # Lifecycle Events
//!
//! Observers attach to a controller, a router, or the whole navigator and
//! receive tagged events instead of overriding callbacks.
//!
//! `ListenerSet` is single-threaded shared state (`Rc<RefCell<..>>`).
//! `emit` iterates a snapshot of the registered listeners, so a listener may
//! add or remove listeners (including itself) while being notified; the
//! change takes effect on the next emit.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::core::change::ChangeType;
use crate::core::controller::ControllerId;
use crate::core::router::RouterKey;

/// Handle returned by `ListenerSet::add`, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<E> = Rc<dyn Fn(&E)>;

struct Slots<E> {
    next_id: u64,
    listeners: Rc<Vec<(ListenerId, Listener<E>)>>,
}

/// An ordered set of event callbacks. Cloning shares the same set.
pub struct ListenerSet<E> {
    inner: Rc<RefCell<Slots<E>>>,
}

impl<E> Clone for ListenerSet<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E> Default for ListenerSet<E> {
    fn default() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Slots {
                next_id: 1,
                listeners: Rc::new(Vec::new()),
            })),
        }
    }
}

impl<E> fmt::Debug for ListenerSet<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet").field("len", &self.len()).finish()
    }
}

impl<E> ListenerSet<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` after all existing ones.
    pub fn add(&self, listener: impl Fn(&E) + 'static) -> ListenerId {
        let mut registry = self.inner.borrow_mut();
        let id = ListenerId(registry.next_id);
        registry.next_id += 1;
        let mut listeners = registry.listeners.as_ref().clone();
        listeners.push((id, Rc::new(listener)));
        registry.listeners = Rc::new(listeners);
        id
    }

    pub fn remove(&self, id: ListenerId) -> bool {
        let mut registry = self.inner.borrow_mut();
        let before = registry.listeners.len();
        let listeners: Vec<_> = registry
            .listeners
            .iter()
            .filter(|(existing, _)| *existing != id)
            .cloned()
            .collect();
        let removed = listeners.len() != before;
        registry.listeners = Rc::new(listeners);
        removed
    }

    pub fn emit(&self, event: &E) {
        let snapshot = Rc::clone(&self.inner.borrow().listeners);
        for (_, listener) in snapshot.iter() {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A step of the controller lifecycle, reported before and after the
/// matching screen hook runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    ContextAvailable,
    ContextUnavailable,
    PreCreateView,
    PostCreateView,
    PreAttach,
    PostAttach,
    PreDetach,
    PostDetach,
    PreDestroyView,
    PostDestroyView,
    PreDestroy,
    PostDestroy,
    SaveViewState,
    RestoreViewState,
    SaveInstanceState,
    RestoreInstanceState,
    ChangeStarted(ChangeType),
    ChangeEnded(ChangeType),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerEvent {
    pub controller: ControllerId,
    pub phase: LifecyclePhase,
}

/// Router-level change notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum RouterEvent {
    ChangeStarted {
        router: RouterKey,
        from: Option<ControllerId>,
        to: Option<ControllerId>,
        is_push: bool,
    },
    ChangeCompleted {
        router: RouterKey,
        from: Option<ControllerId>,
        to: Option<ControllerId>,
        is_push: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_emit_in_registration_order() {
        let set: ListenerSet<u32> = ListenerSet::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for tag in ["first", "second"] {
            let log = Rc::clone(&log);
            set.add(move |event| log.borrow_mut().push(format!("{tag}:{event}")));
        }
        set.emit(&7);
        assert_eq!(*log.borrow(), vec!["first:7", "second:7"]);
    }

    #[test]
    fn test_remove_listener() {
        let set: ListenerSet<()> = ListenerSet::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let id = set.add(move |_| counter.set(counter.get() + 1));
        set.emit(&());
        assert!(set.remove(id));
        assert!(!set.remove(id));
        set.emit(&());
        assert_eq!(hits.get(), 1);
        assert!(set.is_empty());
    }

    #[test]
    fn test_listener_can_unregister_itself_during_emit() {
        let set: ListenerSet<()> = ListenerSet::new();
        let hits = Rc::new(Cell::new(0));
        let own_id = Rc::new(Cell::new(None));

        let handle = set.clone();
        let counter = Rc::clone(&hits);
        let slot = Rc::clone(&own_id);
        let id = set.add(move |_| {
            counter.set(counter.get() + 1);
            if let Some(id) = slot.get() {
                handle.remove(id);
            }
        });
        own_id.set(Some(id));

        set.emit(&());
        set.emit(&());
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn test_listener_added_during_emit_runs_next_time() {
        let set: ListenerSet<()> = ListenerSet::new();
        let hits = Rc::new(Cell::new(0));
        let handle = set.clone();
        let counter = Rc::clone(&hits);
        set.add(move |_| {
            let counter = Rc::clone(&counter);
            handle.add(move |_| counter.set(counter.get() + 1));
        });
        set.emit(&());
        assert_eq!(hits.get(), 0);
        set.emit(&());
        assert_eq!(hits.get(), 1);
    }
}
