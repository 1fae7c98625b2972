//! # Demo Screens
//!
//! One `Screen` implementation, `DemoScreen`, plays every page of the demo:
//!
//! ```text
//! Home ─┬─ Detail 1 ─ Detail 2 ─ …          (slide transitions)
//!       ├─ Parent ──┬─ "left"  child router  (Child 1 ─ Child 2 ─ …)
//!       │           └─ "right" child router
//!       ├─ Dialog                            (overlay, Home stays visible)
//!       ├─ Pick a color                      (start_activity_for_result)
//!       └─ Ask permission                    (request_permissions)
//! ```
//!
//! The page and the demo settings travel in the controller's args, so the
//! registry can rebuild any page from a snapshot.

use std::any::Any;
use std::time::Duration;

use log::{debug, info};

use crate::core::bundle::Bundle;
use crate::core::change::{ChangeType, SimpleSwapChangeHandler};
use crate::core::controller::{Controller, ControllerContext, HostEvent, RetainViewMode, Screen};
use crate::core::transaction::Transaction;
use crate::core::view::{ContainerId, View};
use crate::tui::slide::SlideChangeHandler;

pub const PICK_COLOR_REQUEST: i32 = 1;
pub const CAMERA_REQUEST: i32 = 2;
pub const RESULT_OK: i32 = -1;
pub const RESULT_CANCELED: i32 = 0;

pub const LEFT_CONTAINER: &str = "left";
pub const RIGHT_CONTAINER: &str = "right";

pub const HOME_ITEMS: [&str; 5] = [
    "Detail stack",
    "Parent with two child routers",
    "Dialog overlay",
    "Pick a color (result)",
    "Ask for camera permission",
];

/// Settings every demo page carries so the pages it opens look the same.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemoSettings {
    pub animation: Duration,
    pub retain: RetainViewMode,
}

impl DemoSettings {
    fn write(&self, args: &mut Bundle) {
        args.put("animation_ms", self.animation.as_millis() as u64);
        args.put(
            "retain_view",
            matches!(self.retain, RetainViewMode::RetainDetach),
        );
    }

    fn read(args: &Bundle) -> Self {
        Self {
            animation: Duration::from_millis(args.get_u64("animation_ms").unwrap_or(0)),
            retain: if args.get_bool("retain_view").unwrap_or(false) {
                RetainViewMode::RetainDetach
            } else {
                RetainViewMode::ReleaseDetach
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DemoPage {
    Home,
    Detail { depth: u32 },
    Parent,
    Child { side: String, depth: u32 },
    Dialog,
}

impl DemoPage {
    pub fn title(&self) -> String {
        match self {
            DemoPage::Home => "Home".to_string(),
            DemoPage::Detail { depth } => format!("Detail {depth}"),
            DemoPage::Parent => "Parent".to_string(),
            DemoPage::Child { side, depth } => format!("{side} {depth}"),
            DemoPage::Dialog => "Dialog".to_string(),
        }
    }

    /// Backstack tag for this page.
    pub fn tag(&self) -> String {
        match self {
            DemoPage::Home => "home".to_string(),
            DemoPage::Detail { depth } => format!("detail-{depth}"),
            DemoPage::Parent => "parent".to_string(),
            DemoPage::Child { side, depth } => format!("{side}-{depth}"),
            DemoPage::Dialog => "dialog".to_string(),
        }
    }

    fn write(&self, args: &mut Bundle) {
        let (page, depth) = match self {
            DemoPage::Home => ("home", 0),
            DemoPage::Detail { depth } => ("detail", *depth),
            DemoPage::Parent => ("parent", 0),
            DemoPage::Child { side, depth } => {
                args.put("side", side.clone());
                ("child", *depth)
            }
            DemoPage::Dialog => ("dialog", 0),
        };
        args.put("page", page);
        args.put("depth", depth as u64);
    }

    fn read(args: &Bundle) -> Self {
        let depth = args.get_u64("depth").unwrap_or(1) as u32;
        match args.get_str("page").unwrap_or("home") {
            "detail" => DemoPage::Detail { depth },
            "parent" => DemoPage::Parent,
            "child" => DemoPage::Child {
                side: args.get_str("side").unwrap_or(LEFT_CONTAINER).to_string(),
                depth,
            },
            "dialog" => DemoPage::Dialog,
            _ => DemoPage::Home,
        }
    }
}

/// Keys the event loop forwards to the focused screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoKey {
    Up,
    Down,
    Open,
    SwitchFocus,
    PopToRoot,
}

pub struct DemoScreen {
    page: DemoPage,
    settings: DemoSettings,
    /// View state: highlighted row on Home.
    selected: usize,
    /// Instance state from here down.
    visits: i64,
    color: Option<String>,
    permission: Option<bool>,
    focus: usize,
}

impl DemoScreen {
    pub const KIND: &'static str = "demo";

    pub fn new(page: DemoPage, settings: DemoSettings) -> Self {
        Self {
            page,
            settings,
            selected: 0,
            visits: 0,
            color: None,
            permission: None,
            focus: 0,
        }
    }

    /// Registry factory.
    pub fn build(args: &Bundle) -> Box<dyn Screen> {
        Box::new(Self::new(DemoPage::read(args), DemoSettings::read(args)))
    }

    pub fn controller(page: DemoPage, settings: DemoSettings) -> Controller {
        let mut args = Bundle::new();
        page.write(&mut args);
        settings.write(&mut args);
        let mut controller = Controller::with_args(Self::new(page, settings), args);
        controller.set_retain_view_mode(settings.retain);
        controller
    }

    /// A transaction for `page`: dialogs swap in as an overlay, everything
    /// else slides.
    pub fn transaction(page: DemoPage, settings: DemoSettings) -> Transaction {
        let tag = page.tag();
        let overlay = page == DemoPage::Dialog;
        let transaction = Transaction::with(Self::controller(page, settings)).tag(tag);
        if overlay {
            transaction
                .push_handler(SimpleSwapChangeHandler::overlay())
                .pop_handler(SimpleSwapChangeHandler::overlay())
        } else {
            transaction
                .push_handler(SlideChangeHandler::new(settings.animation))
                .pop_handler(SlideChangeHandler::new(settings.animation))
        }
    }

    pub fn page(&self) -> &DemoPage {
        &self.page
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn visits(&self) -> i64 {
        self.visits
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    pub fn permission(&self) -> Option<bool> {
        self.permission
    }

    /// Index of the focused child container on a Parent page.
    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn focused_container(&self) -> Option<&str> {
        match self.page {
            DemoPage::Parent => Some(if self.focus == 0 {
                LEFT_CONTAINER
            } else {
                RIGHT_CONTAINER
            }),
            _ => None,
        }
    }

    /// Returns true if the key did something.
    pub fn handle_key(&mut self, ctx: &mut ControllerContext<'_>, key: DemoKey) -> bool {
        match (self.page.clone(), key) {
            (DemoPage::Home, DemoKey::Up) => {
                self.selected = self.selected.checked_sub(1).unwrap_or(HOME_ITEMS.len() - 1);
                true
            }
            (DemoPage::Home, DemoKey::Down) => {
                self.selected = (self.selected + 1) % HOME_ITEMS.len();
                true
            }
            (DemoPage::Home, DemoKey::Open) => {
                self.open_home_item(ctx);
                true
            }
            (DemoPage::Detail { depth }, DemoKey::Open) => {
                let next = DemoPage::Detail { depth: depth + 1 };
                ctx.push_here(Self::transaction(next, self.settings));
                true
            }
            (DemoPage::Detail { .. }, DemoKey::PopToRoot) => match ctx.router().cloned() {
                Some(router) => {
                    ctx.pop_to_root(router);
                    true
                }
                None => false,
            },
            (DemoPage::Child { side, depth }, DemoKey::Open) => {
                let next = DemoPage::Child {
                    side,
                    depth: depth + 1,
                };
                ctx.push_here(Self::transaction(next, self.settings));
                true
            }
            (DemoPage::Parent, DemoKey::SwitchFocus) => {
                self.focus = (self.focus + 1) % 2;
                true
            }
            (DemoPage::Dialog, DemoKey::Open) => {
                ctx.pop_self();
                true
            }
            _ => false,
        }
    }

    fn open_home_item(&mut self, ctx: &mut ControllerContext<'_>) {
        let page = match self.selected {
            0 => DemoPage::Detail { depth: 1 },
            1 => DemoPage::Parent,
            2 => DemoPage::Dialog,
            3 => {
                ctx.start_activity_for_result(
                    Bundle::new().with("action", "pick_color"),
                    PICK_COLOR_REQUEST,
                );
                return;
            }
            _ => {
                ctx.request_permissions(vec!["camera".to_string()], CAMERA_REQUEST);
                return;
            }
        };
        ctx.push_here(Self::transaction(page, self.settings));
    }
}

impl Screen for DemoScreen {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn on_create_view(&mut self, ctx: &mut ControllerContext<'_>, container: &ContainerId) -> View {
        debug!("{} creating view in {}", self.page.title(), container);
        if self.page != DemoPage::Parent {
            return View::new();
        }
        for side in [LEFT_CONTAINER, RIGHT_CONTAINER] {
            let router = ctx.child_router(side, None);
            let root = DemoPage::Child {
                side: side.to_string(),
                depth: 1,
            };
            ctx.set_root_if_empty(router, Self::transaction(root, self.settings));
        }
        View::new()
            .with_container(LEFT_CONTAINER)
            .with_container(RIGHT_CONTAINER)
    }

    fn on_attach(&mut self, _ctx: &mut ControllerContext<'_>, _view: &mut View) {
        self.visits += 1;
    }

    fn on_change_ended(&mut self, ctx: &mut ControllerContext<'_>, change: ChangeType) {
        if change.is_enter() && self.page == DemoPage::Dialog {
            ctx.invalidate_options_menu();
        }
    }

    fn on_save_view_state(&mut self, _view: &View, out: &mut Bundle) {
        out.put("selected", self.selected as u64);
    }

    fn on_restore_view_state(&mut self, _view: &mut View, saved: &Bundle) {
        self.selected = saved.get_u64("selected").unwrap_or(0) as usize;
    }

    fn on_save_instance_state(&mut self, out: &mut Bundle) {
        out.put("visits", self.visits);
        out.put("focus", self.focus as u64);
        if let Some(color) = &self.color {
            out.put("color", color.clone());
        }
        if let Some(granted) = self.permission {
            out.put("permission", granted);
        }
    }

    fn on_restore_instance_state(&mut self, saved: &Bundle) {
        self.visits = saved.get_i64("visits").unwrap_or(0);
        self.focus = saved.get_u64("focus").unwrap_or(0) as usize % 2;
        self.color = saved.get_str("color").map(str::to_string);
        self.permission = saved.get_bool("permission");
    }

    fn on_host_event(&mut self, _ctx: &mut ControllerContext<'_>, event: HostEvent) {
        debug!("{} saw host {:?}", self.page.title(), event);
    }

    fn on_activity_result(
        &mut self,
        _ctx: &mut ControllerContext<'_>,
        request_code: i32,
        result_code: i32,
        data: &Bundle,
    ) {
        if request_code != PICK_COLOR_REQUEST {
            return;
        }
        if result_code == RESULT_OK {
            self.color = data.get_str("color").map(str::to_string);
            info!("{} picked {:?}", self.page.title(), self.color);
        } else {
            info!("{} color pick cancelled", self.page.title());
        }
    }

    fn on_request_permissions_result(
        &mut self,
        _ctx: &mut ControllerContext<'_>,
        request_code: i32,
        _permissions: &[String],
        granted: &[bool],
    ) {
        if request_code == CAMERA_REQUEST {
            self.permission = Some(granted.first().copied().unwrap_or(false));
        }
    }

    fn on_options_item_selected(&mut self, _ctx: &mut ControllerContext<'_>, item: &str) -> bool {
        if item == "reset" && self.page == DemoPage::Home {
            self.color = None;
            self.permission = None;
            return true;
        }
        false
    }
}
