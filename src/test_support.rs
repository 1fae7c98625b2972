//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).
//!
//! `TestScreen` writes every hook it receives to a thread-local log as
//! `"{name}:{hook}"`. Each test runs on its own thread, so `take_log()`
//! only ever sees the current test's calls.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::core::bundle::Bundle;
use crate::core::change::{ChangeCompletion, ChangeHandler, ChangeType};
use crate::core::controller::{Controller, ControllerContext, HostEvent, Screen};
use crate::core::error::ChangeError;
use crate::core::host::Platform;
use crate::core::navigator::{Navigator, NavigatorConfig};
use crate::core::persistence::Registry;
use crate::core::router::RouterKey;
use crate::core::transaction::Transaction;
use crate::core::view::{Container, ContainerId, View, ViewId};

thread_local! {
    static LOG: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

fn record(name: &str, hook: &str) {
    LOG.with(|log| log.borrow_mut().push(format!("{name}:{hook}")));
}

/// Drains the hook log for the current test.
pub fn take_log() -> Vec<String> {
    LOG.with(|log| std::mem::take(&mut *log.borrow_mut()))
}

/// Hook entries for `name` only, with the name prefix stripped.
pub fn hooks_of(log: &[String], name: &str) -> Vec<String> {
    let prefix = format!("{name}:");
    log.iter()
        .filter_map(|entry| entry.strip_prefix(&prefix).map(str::to_string))
        .collect()
}

pub struct TestScreen {
    pub name: String,
    pub containers: Vec<String>,
    pub consume_back: bool,
    pub scroll: i64,
    pub counter: i64,
    pub results: Vec<(i32, i32)>,
}

impl TestScreen {
    pub const KIND: &'static str = "test";

    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            containers: Vec::new(),
            consume_back: false,
            scroll: 0,
            counter: 0,
            results: Vec::new(),
        }
    }

    pub fn with_containers(mut self, containers: &[&str]) -> Self {
        self.containers = containers.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn consuming_back(mut self) -> Self {
        self.consume_back = true;
        self
    }

    pub fn args(&self) -> Bundle {
        Bundle::new()
            .with("name", self.name.clone())
            .with("containers", self.containers.clone())
            .with("consume_back", self.consume_back)
    }

    pub fn build(args: &Bundle) -> Box<dyn Screen> {
        let containers = args
            .get("containers")
            .and_then(|value| value.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        Box::new(Self {
            containers,
            consume_back: args.get_bool("consume_back").unwrap_or(false),
            ..Self::new(args.get_str("name").unwrap_or("restored"))
        })
    }

    pub fn into_controller(self) -> Controller {
        let args = self.args();
        Controller::with_args(self, args)
    }
}

impl Screen for TestScreen {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn on_context_available(&mut self, _ctx: &mut ControllerContext<'_>) {
        record(&self.name, "on_context_available");
    }

    fn on_context_unavailable(&mut self, _ctx: &mut ControllerContext<'_>) {
        record(&self.name, "on_context_unavailable");
    }

    fn on_create_view(
        &mut self,
        _ctx: &mut ControllerContext<'_>,
        _container: &ContainerId,
    ) -> View {
        record(&self.name, "on_create_view");
        self.containers
            .iter()
            .fold(View::new(), |view, container| view.with_container(container.as_str()))
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

    fn on_save_view_state(&mut self, _view: &View, out: &mut Bundle) {
        out.put("scroll", self.scroll);
    }

    fn on_restore_view_state(&mut self, _view: &mut View, saved: &Bundle) {
        record(&self.name, "on_restore_view_state");
        self.scroll = saved.get_i64("scroll").unwrap_or(0);
    }

    fn on_save_instance_state(&mut self, out: &mut Bundle) {
        out.put("counter", self.counter);
    }

    fn on_restore_instance_state(&mut self, saved: &Bundle) {
        self.counter = saved.get_i64("counter").unwrap_or(0);
    }

    fn on_change_started(&mut self, _ctx: &mut ControllerContext<'_>, change: ChangeType) {
        record(&self.name, &format!("change_started({change:?})"));
    }

    fn on_change_ended(&mut self, _ctx: &mut ControllerContext<'_>, change: ChangeType) {
        record(&self.name, &format!("change_ended({change:?})"));
    }

    fn handle_back(&mut self, _ctx: &mut ControllerContext<'_>) -> bool {
        record(&self.name, "handle_back");
        self.consume_back
    }

    fn on_host_event(&mut self, _ctx: &mut ControllerContext<'_>, event: HostEvent) {
        record(&self.name, &format!("host({event:?})"));
    }

    fn on_activity_result(
        &mut self,
        _ctx: &mut ControllerContext<'_>,
        request_code: i32,
        result_code: i32,
        _data: &Bundle,
    ) {
        self.results.push((request_code, result_code));
    }
}

/// A transaction for a named `TestScreen`, tagged with its name.
pub fn tx(name: &str) -> Transaction {
    Transaction::with(TestScreen::new(name).into_controller()).tag(name)
}

pub fn registry() -> Registry {
    let mut registry = Registry::new();
    registry.register_screen(TestScreen::KIND, TestScreen::build);
    registry
}

/// A navigator whose host is attached and started, with one host router.
pub fn started_navigator() -> (Navigator, RouterKey) {
    let mut nav = Navigator::new(NavigatorConfig::default(), registry());
    nav.on_context_available();
    nav.on_host_started();
    let main = nav.attach_router("main");
    take_log();
    (nav, main)
}

/// Swaps views like a simple swap but only completes when told to.
#[derive(Clone)]
pub struct ManualChangeHandler {
    pending: Rc<RefCell<Vec<ChangeCompletion>>>,
    complete_on_cancel: bool,
}

impl ManualChangeHandler {
    pub fn new() -> Self {
        Self {
            pending: Rc::new(RefCell::new(Vec::new())),
            complete_on_cancel: true,
        }
    }

    /// A handler that ignores `cancel`, to exercise forced completion.
    pub fn stubborn() -> Self {
        Self {
            complete_on_cancel: false,
            ..Self::new()
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn complete_all(&self) {
        for completion in self.pending.borrow_mut().drain(..) {
            completion.complete();
        }
    }
}

impl ChangeHandler for ManualChangeHandler {
    fn kind(&self) -> &'static str {
        "manual"
    }

    fn perform_change(
        &mut self,
        container: &mut Container,
        from: Option<ViewId>,
        to: Option<ViewId>,
        _is_push: bool,
        completion: ChangeCompletion,
    ) -> Result<(), ChangeError> {
        if let Some(to) = to {
            container.add_view(to);
        }
        if let Some(from) = from {
            container.set_translation(from, 0.5);
        }
        self.pending.borrow_mut().push(completion);
        Ok(())
    }

    fn cancel(&mut self, _container: &mut Container, immediate: bool) {
        if immediate && self.complete_on_cancel {
            self.complete_all();
        }
    }

    fn copy(&self) -> Box<dyn ChangeHandler> {
        Box::new(self.clone())
    }
}

/// Records what the host was asked to do.
#[derive(Debug, Default)]
pub struct RecordingPlatform {
    pub started: Vec<i32>,
    pub permission_codes: Vec<i32>,
    pub menu_invalidations: usize,
}

impl Platform for RecordingPlatform {
    fn start_activity_for_result(&mut self, _intent: &Bundle, request_code: i32) {
        self.started.push(request_code);
    }

    fn request_permissions(&mut self, _permissions: &[String], request_code: i32) {
        self.permission_codes.push(request_code);
    }

    fn invalidate_options_menu(&mut self) {
        self.menu_invalidations += 1;
    }
}
