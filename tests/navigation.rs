use std::any::Any;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;

use navstack::core::change::ChangeCompletion;
use navstack::core::error::ChangeError;
use navstack::core::lifecycle::RouterEvent;
use navstack::core::{
    Bundle, ChangeHandler, Container, ContainerId, Controller, ControllerContext, ControllerId,
    NavError, Navigator, NavigatorConfig, Registry, RouterKey, Screen, Transaction, View, ViewId,
};

// ============================================================================
// Helper Functions
// ============================================================================

thread_local! {
    static LOG: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

fn record(name: &str, hook: &str) {
    LOG.with(|log| log.borrow_mut().push(format!("{name}:{hook}")));
}

fn take_log() -> Vec<String> {
    LOG.with(|log| std::mem::take(&mut *log.borrow_mut()))
}

fn hooks_of(log: &[String], name: &str) -> Vec<String> {
    let prefix = format!("{name}:");
    log.iter()
        .filter_map(|entry| entry.strip_prefix(&prefix).map(str::to_string))
        .collect()
}

fn position(log: &[String], entry: &str) -> usize {
    log.iter()
        .position(|logged| logged == entry)
        .unwrap_or_else(|| panic!("{entry} missing from {log:?}"))
}

/// Records the view-facing hooks; optionally hosts one child container.
struct Recorder {
    name: String,
    child_container: Option<String>,
}

impl Recorder {
    const KIND: &'static str = "recorder";

    fn build(args: &Bundle) -> Box<dyn Screen> {
        Box::new(Self {
            name: args.get_str("name").unwrap_or("restored").to_string(),
            child_container: args.get_str("child_container").map(str::to_string),
        })
    }
}

impl Screen for Recorder {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn on_create_view(
        &mut self,
        _ctx: &mut ControllerContext<'_>,
        _container: &ContainerId,
    ) -> View {
        record(&self.name, "on_create_view");
        match &self.child_container {
            Some(container) => View::new().with_container(container.as_str()),
            None => View::new(),
        }
    }

    fn on_attach(&mut self, _ctx: &mut ControllerContext<'_>, _view: &mut View) {
        record(&self.name, "on_attach");
    }

    fn on_detach(&mut self, _ctx: &mut ControllerContext<'_>, _view: &mut View) {
        record(&self.name, "on_detach");
    }

    fn on_destroy_view(&mut self, _ctx: &mut ControllerContext<'_>, _view: &mut View) {
        record(&self.name, "on_destroy_view");
    }

    fn on_destroy(&mut self, _ctx: &mut ControllerContext<'_>) {
        record(&self.name, "on_destroy");
    }
}

fn controller(name: &str) -> Controller {
    let args = Bundle::new().with("name", name);
    Controller::with_args(
        Recorder {
            name: name.to_string(),
            child_container: None,
        },
        args,
    )
}

fn tx(name: &str) -> Transaction {
    Transaction::with(controller(name)).tag(name)
}

/// A controller whose view hosts a child container named `container`.
fn parent_tx(name: &str, container: &str) -> Transaction {
    let args = Bundle::new().with("name", name).with("child_container", container);
    let screen = Recorder {
        name: name.to_string(),
        child_container: Some(container.to_string()),
    };
    Transaction::with(Controller::with_args(screen, args)).tag(name)
}

fn registry() -> Registry {
    let mut registry = Registry::new();
    registry.register_screen(Recorder::KIND, Recorder::build);
    registry
}

fn started_navigator() -> (Navigator, RouterKey) {
    let mut nav = Navigator::new(NavigatorConfig::default(), registry());
    nav.on_context_available();
    nav.on_host_started();
    let main = nav.attach_router("main");
    take_log();
    (nav, main)
}

fn tags(nav: &Navigator, key: &RouterKey) -> Vec<String> {
    nav.router(key)
        .map(|router| {
            router
                .backstack()
                .entries()
                .iter()
                .map(|entry| entry.tag().unwrap_or("").to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn top_tag(nav: &Navigator, key: &RouterKey) -> Option<String> {
    nav.router(key)?
        .backstack()
        .top()?
        .tag()
        .map(str::to_string)
}

/// Mounts the incoming view and waits to be completed or cancelled.
#[derive(Clone, Default)]
struct DeferredChangeHandler {
    pending: Rc<RefCell<Vec<ChangeCompletion>>>,
}

impl DeferredChangeHandler {
    fn pending(&self) -> usize {
        self.pending.borrow().len()
    }
}

impl ChangeHandler for DeferredChangeHandler {
    fn kind(&self) -> &'static str {
        "deferred"
    }

    fn perform_change(
        &mut self,
        container: &mut Container,
        from: Option<ViewId>,
        to: Option<ViewId>,
        _is_push: bool,
        completion: ChangeCompletion,
    ) -> Result<(), ChangeError> {
        if let Some(from) = from {
            container.remove_view(from);
        }
        if let Some(to) = to {
            container.add_view(to);
        }
        self.pending.borrow_mut().push(completion);
        Ok(())
    }

    fn cancel(&mut self, _container: &mut Container, immediate: bool) {
        if immediate {
            for completion in self.pending.borrow_mut().drain(..) {
                completion.complete();
            }
        }
    }

    fn copy(&self) -> Box<dyn ChangeHandler> {
        Box::new(self.clone())
    }
}

// ============================================================================
// Backstack Operations
// ============================================================================

#[test]
fn test_set_root_push_pop_keep_a_root() {
    let (mut nav, main) = started_navigator();
    nav.set_root(&main, tx("a"));
    nav.push(&main, tx("b"));
    assert_eq!(tags(&nav, &main), vec!["a", "b"]);

    assert!(nav.pop(&main));
    assert!(!nav.pop(&main));
    assert_eq!(tags(&nav, &main), vec!["a"]);
    assert_eq!(nav.router(&main).unwrap().backstack_size(), 1);
}

#[test]
fn test_backstack_never_holds_a_controller_twice() {
    let (mut nav, main) = started_navigator();
    nav.set_root(&main, tx("a"));
    nav.push(&main, tx("b"));
    nav.replace_top(&main, tx("c"));
    nav.push(&main, tx("d"));
    nav.pop_to_tag(&main, "c");
    nav.push(&main, tx("e"));

    let router = nav.router(&main).unwrap();
    let ids = router.backstack().ids();
    let unique: HashSet<&ControllerId> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len());
    assert_eq!(tags(&nav, &main), vec!["a", "c", "e"]);
}

#[test]
fn test_replace_top_swaps_without_growing() {
    let (mut nav, main) = started_navigator();
    nav.set_root(&main, tx("a"));
    nav.push(&main, tx("b"));
    take_log();

    nav.replace_top(&main, tx("c"));
    let log = take_log();
    assert_eq!(tags(&nav, &main), vec!["a", "c"]);
    assert!(hooks_of(&log, "b").contains(&"on_destroy".to_string()));
    assert!(hooks_of(&log, "a").is_empty());
}

// ============================================================================
// Lifecycle Ordering
// ============================================================================

#[test]
fn test_push_then_pop_lifecycle_order() {
    let (mut nav, main) = started_navigator();
    nav.set_root(&main, tx("b"));
    take_log();

    nav.push(&main, tx("c"));
    let push = take_log();
    assert_eq!(hooks_of(&push, "b"), vec!["on_detach", "on_destroy_view"]);
    assert_eq!(hooks_of(&push, "c"), vec!["on_create_view", "on_attach"]);
    assert!(position(&push, "b:on_detach") < position(&push, "c:on_attach"));

    assert!(nav.pop(&main));
    let pop = take_log();
    assert_eq!(hooks_of(&pop, "c"), vec!["on_detach", "on_destroy_view", "on_destroy"]);
    assert_eq!(hooks_of(&pop, "b"), vec!["on_create_view", "on_attach"]);
    assert!(position(&pop, "c:on_detach") < position(&pop, "b:on_attach"));
    assert_eq!(top_tag(&nav, &main).as_deref(), Some("b"));
}

#[test]
fn test_pop_to_root_runs_a_single_change() {
    let (mut nav, main) = started_navigator();
    nav.set_root(&main, tx("a"));
    nav.push(&main, tx("b"));
    nav.push(&main, tx("c"));

    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    nav.router(&main)
        .unwrap()
        .add_change_listener(move |event| sink.borrow_mut().push(event.clone()));
    take_log();

    assert!(nav.pop_to_root(&main));
    let log = take_log();

    let a = nav.find_controller_by_tag("a").unwrap().clone();
    let started: Vec<_> = events
        .borrow()
        .iter()
        .filter_map(|event| match event {
            RouterEvent::ChangeStarted { to, is_push, .. } => Some((to.clone(), *is_push)),
            _ => None,
        })
        .collect();
    assert_eq!(started, vec![(Some(a), false)]);

    let b = hooks_of(&log, "b");
    assert!(!b.contains(&"on_attach".to_string()));
    assert!(!b.contains(&"on_detach".to_string()));
    assert!(b.contains(&"on_destroy".to_string()));
    assert_eq!(top_tag(&nav, &main).as_deref(), Some("a"));
}

#[test]
fn test_new_change_force_completes_the_running_one() {
    let (mut nav, main) = started_navigator();
    nav.set_root(&main, tx("a"));
    let deferred = DeferredChangeHandler::default();
    nav.push(&main, tx("b").push_handler(deferred.clone()));
    assert_eq!(deferred.pending(), 1);
    assert!(nav.has_pending_changes());

    nav.push(&main, tx("c"));
    let log = take_log();
    assert_eq!(deferred.pending(), 0);
    assert!(position(&log, "b:on_attach") < position(&log, "c:on_create_view"));
    assert!(position(&log, "b:on_detach") < position(&log, "c:on_attach"));

    let c = nav.find_controller_by_tag("c").unwrap().clone();
    assert!(nav.controller(&c).unwrap().is_attached());
    assert!(!nav.has_pending_changes());
}

#[test]
fn test_deferred_change_attaches_after_completion() {
    let (mut nav, main) = started_navigator();
    nav.set_root(&main, tx("a"));
    let deferred = DeferredChangeHandler::default();
    nav.push(&main, tx("b").push_handler(deferred.clone()));
    let b = nav.find_controller_by_tag("b").unwrap().clone();
    assert!(!nav.controller(&b).unwrap().is_attached());

    nav.complete_pending_changes();
    nav.advance(Duration::ZERO);
    assert!(nav.controller(&b).unwrap().is_attached());
    assert!(!nav.router(&main).unwrap().is_transitioning());
}

// ============================================================================
// Back Handling
// ============================================================================

#[test]
fn test_back_drains_child_router_before_parent() {
    let (mut nav, main) = started_navigator();
    nav.set_root(&main, tx("home"));
    let parent = parent_tx("parent", "inner");
    let parent_id = parent.controller_id().clone();
    nav.push(&main, parent);

    let child = nav.child_router(&parent_id, "inner", None);
    nav.set_root(&child, tx("c1"));
    nav.push(&child, tx("c2"));

    assert!(nav.handle_back(&main));
    assert_eq!(tags(&nav, &child), vec!["c1"]);
    assert_eq!(tags(&nav, &main), vec!["home", "parent"]);

    assert!(nav.handle_back(&main));
    assert_eq!(tags(&nav, &main), vec!["home"]);
    assert!(nav.router(&child).is_none());

    assert!(!nav.handle_back(&main));
}

#[test]
fn test_removing_child_router_destroys_its_controllers() {
    let (mut nav, main) = started_navigator();
    let parent = parent_tx("parent", "inner");
    let parent_id = parent.controller_id().clone();
    nav.set_root(&main, parent);
    let child = nav.child_router(&parent_id, "inner", Some("side"));
    nav.set_root(&child, tx("c1"));
    take_log();

    nav.remove_child_router(&child);
    let log = take_log();
    assert!(hooks_of(&log, "c1").contains(&"on_destroy".to_string()));
    assert!(nav.router(&child).is_none());
    assert!(nav.find_controller_by_tag("c1").is_none());
}

// ============================================================================
// Save / Restore
// ============================================================================

#[test]
fn test_saved_router_restores_into_fresh_navigator() {
    let (mut nav, main) = started_navigator();
    nav.set_root(&main, tx("root"));
    nav.push(&main, tx("x"));
    let saved = nav.save_router_state(&main).unwrap();
    let blob = serde_json::to_string(&saved).unwrap();
    nav.on_host_destroyed(false);
    assert_eq!(nav.controller_count(), 0);

    let (mut fresh, main) = started_navigator();
    let state = serde_json::from_str(&blob).unwrap();
    fresh.restore_router_state(&main, state).unwrap();

    let router = fresh.router(&main).unwrap();
    assert_eq!(router.backstack_size(), 2);
    assert_eq!(top_tag(&fresh, &main).as_deref(), Some("x"));
    let top = router.top().unwrap().clone();
    assert!(fresh.controller(&top).unwrap().is_attached());
}

#[test]
fn test_restoring_twice_matches_restoring_once() {
    let (mut nav, main) = started_navigator();
    nav.set_root(&main, tx("root"));
    nav.push(&main, tx("x"));
    let saved = nav.save_router_state(&main).unwrap();

    let (mut other, other_main) = started_navigator();
    other.restore_router_state(&other_main, saved.clone()).unwrap();
    let once = (tags(&other, &other_main), other.router(&other_main).unwrap().backstack().ids());
    other.restore_router_state(&other_main, saved).unwrap();
    let twice = (tags(&other, &other_main), other.router(&other_main).unwrap().backstack().ids());

    assert_eq!(once, twice);
    assert_eq!(other.controller_count(), 2);
}

#[test]
fn test_child_routers_are_saved_with_their_parent() {
    let (mut nav, main) = started_navigator();
    let parent = parent_tx("parent", "inner");
    let parent_id = parent.controller_id().clone();
    nav.set_root(&main, parent);
    let child = nav.child_router(&parent_id, "inner", None);
    nav.set_root(&child, tx("c1"));
    nav.push(&child, tx("c2"));
    let saved = nav.save_router_state(&main).unwrap();

    let (mut fresh, fresh_main) = started_navigator();
    fresh.restore_router_state(&fresh_main, saved).unwrap();
    let restored_child = fresh.child_router(&parent_id, "inner", None);
    assert_eq!(tags(&fresh, &restored_child), vec!["c1", "c2"]);
}

#[test]
fn test_unrestorable_state_leaves_router_empty() {
    let (mut nav, main) = started_navigator();
    nav.set_root(&main, tx("root"));
    nav.push(&main, tx("x"));
    let mut saved = nav.save_router_state(&main).unwrap();
    saved.backstack[1].controller.kind = "missing".to_string();

    let (mut fresh, fresh_main) = started_navigator();
    fresh.set_root(&fresh_main, tx("existing"));
    let result = fresh.restore_router_state(&fresh_main, saved);
    assert_eq!(result, Err(NavError::UnknownScreen("missing".to_string())));
    assert_eq!(fresh.router(&fresh_main).unwrap().backstack_size(), 0);

    fresh.set_root(&fresh_main, tx("recovered"));
    assert_eq!(top_tag(&fresh, &fresh_main).as_deref(), Some("recovered"));
}
