//! # TUI Host
//!
//! The ratatui-specific layer and the demo's host bridge. It owns a
//! `LifecycleHost` around the navigator, drives its lifecycle (attach,
//! start, resume, and the reverse on exit), feeds keyboard input to the
//! focused screen, and renders the router tree every frame.
//!
//! This is the only module that knows about ratatui and crossterm.
//!
//! ## Redraw Strategy
//!
//! - **Transitioning**: ticks every ~16ms, forwarding elapsed time to running
//!   change handlers through `Navigator::advance`, and redraws each tick.
//! - **Idle**: sleeps up to 500ms, only redraws on events or terminal resize.

mod component;
mod components;
mod event;
pub mod platform;
pub mod screens;
pub mod slide;
mod ui;

use log::{info, warn};
use std::io::stdout;
use std::path::Path;
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, Show};
use crossterm::execute;

use crate::core::bundle::Bundle;
use crate::core::config::ResolvedConfig;
use crate::core::controller::ControllerId;
use crate::core::host::LifecycleHost;
use crate::core::navigator::Navigator;
use crate::core::persistence::Registry;
use crate::core::router::RouterKey;
use crate::core::snapshot;
use crate::tui::component::EventHandler;
use crate::tui::components::{PromptEvent, PromptState};
use crate::tui::event::{TuiEvent, poll_event_immediate, poll_event_timeout};
use crate::tui::platform::{COLORS, PlatformPrompt, TerminalPlatform};
use crate::tui::screens::{DemoKey, DemoPage, DemoScreen, DemoSettings, RESULT_CANCELED, RESULT_OK};
use crate::tui::slide::SlideChangeHandler;

pub const MAIN_CONTAINER: &str = "main";

/// TUI-specific presentation state (not part of the navigation engine)
pub struct TuiState {
    pub main: RouterKey,
    pub status_message: String,
    pub prompt: PromptState,
}

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> std::io::Result<Self> {
        execute!(stdout(), Hide)?;
        info!("Terminal modes enabled (hidden cursor)");
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(stdout(), Show);
    }
}

/// Every screen kind and change handler the demo can restore.
pub fn demo_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register_screen(DemoScreen::KIND, DemoScreen::build)
        .register_change_handler(SlideChangeHandler::KIND, SlideChangeHandler::build);
    registry
}

/// Builds the host, restores the last snapshot when asked to, and brings
/// the host up to resumed with a root on the main router.
pub fn start_host(
    config: &ResolvedConfig,
    settings: DemoSettings,
) -> (LifecycleHost<TerminalPlatform>, RouterKey) {
    let navigator = Navigator::new(config.navigator.clone(), demo_registry());
    let mut host = LifecycleHost::new(navigator, TerminalPlatform::default());
    host.on_attach();

    if config.restore_on_start {
        restore_snapshot(&mut host, &config.state_file);
    }

    let main = host.attach_router(MAIN_CONTAINER);
    let has_root = host.navigator().router(&main).is_some_and(|router| router.has_root());
    if !has_root {
        host.dispatch(|navigator| {
            navigator.set_root(&main, DemoScreen::transaction(DemoPage::Home, settings))
        });
    }
    host.on_start();
    host.on_resume();
    (host, main)
}

fn restore_snapshot(host: &mut LifecycleHost<TerminalPlatform>, path: &Path) {
    match snapshot::load_snapshot(path) {
        Ok(Some(saved)) => {
            info!("Restoring snapshot {} from {}", saved.meta.id, saved.meta.saved_at);
            if let Err(e) = host.restore(saved.host) {
                warn!("Snapshot could not be restored, starting fresh: {}", e);
            }
        }
        Ok(None) => {}
        Err(e) => warn!("Failed to read snapshot {}: {}", path.display(), e),
    }
}

/// Pauses, stops, saves and destroys the host.
pub fn shut_down_host(host: &mut LifecycleHost<TerminalPlatform>, state_file: &Path) {
    host.on_pause();
    host.on_stop();
    let state = host.on_save_instance_state();
    if let Err(e) = snapshot::save_snapshot(state_file, state) {
        warn!("Failed to save snapshot: {}", e);
    }
    host.on_destroy();
}

/// A configuration change: the host goes away and comes back, controllers
/// and backstacks survive, views are rebuilt from saved view state.
pub fn recreate_host(host: &mut LifecycleHost<TerminalPlatform>) -> RouterKey {
    host.on_pause();
    host.on_stop();
    host.on_detach(true);
    host.on_attach();
    let main = host.attach_router(MAIN_CONTAINER);
    host.on_start();
    host.on_resume();
    main
}

/// The controller that receives screen keys: the main top, or on a Parent
/// page the top of its focused child router, recursively.
pub fn focused_controller(navigator: &Navigator, key: &RouterKey) -> Option<ControllerId> {
    let top = navigator.router(key)?.top()?.clone();
    let focused_child = navigator
        .screen::<DemoScreen>(&top)
        .and_then(DemoScreen::focused_container)
        .and_then(|container| {
            navigator
                .child_routers(&top)
                .into_iter()
                .find(|router| router.key().container().as_str() == container)
        })
        .and_then(|router| focused_controller(navigator, router.key()));
    Some(focused_child.unwrap_or(top))
}

fn send_key(host: &mut LifecycleHost<TerminalPlatform>, id: &ControllerId, key: DemoKey) -> bool {
    host.dispatch(|navigator| {
        navigator.with_screen::<DemoScreen, _>(id, |screen, ctx| screen.handle_key(ctx, key))
    })
    .unwrap_or(false)
}

/// Answers the prompt at the front of the platform queue.
fn answer_prompt(host: &mut LifecycleHost<TerminalPlatform>, event: PromptEvent) -> String {
    let Some(prompt) = host.platform_mut().take_current() else {
        return String::new();
    };
    match (prompt, event) {
        (PlatformPrompt::PickColor { request_code }, PromptEvent::Choose(index)) => {
            let color = COLORS.get(index).copied().unwrap_or(COLORS[0]);
            let data = Bundle::new().with("color", color);
            host.on_activity_result(request_code, RESULT_OK, &data);
            format!("Picked {color}")
        }
        (PlatformPrompt::PickColor { request_code }, PromptEvent::Dismiss) => {
            host.on_activity_result(request_code, RESULT_CANCELED, &Bundle::new());
            "Pick cancelled".to_string()
        }
        (PlatformPrompt::Permission { request_code, permissions }, event) => {
            let granted = event == PromptEvent::Choose(0);
            let grants = vec![granted; permissions.len()];
            host.on_request_permissions_result(request_code, &permissions, &grants);
            let status = if granted { "Permission granted" } else { "Permission denied" };
            status.to_string()
        }
    }
}

pub fn run(config: ResolvedConfig) -> std::io::Result<()> {
    let settings = DemoSettings {
        animation: Duration::from_millis(config.animation_ms),
        retain: config.default_retain_view_mode,
    };
    let (mut host, main) = start_host(&config, settings);
    let mut tui = TuiState {
        main,
        status_message: String::new(),
        prompt: PromptState::default(),
    };

    let mut terminal = ratatui::init();
    let _terminal_mode_guard = TerminalModeGuard::new();

    let mut last_tick = Instant::now();
    let mut needs_redraw = true; // Force first frame
    let mut shown_prompt: Option<PlatformPrompt> = None;

    loop {
        let now = Instant::now();
        let elapsed = now - last_tick;
        last_tick = now;

        let transitioning = host.navigator().has_pending_changes();
        if transitioning {
            host.dispatch(|navigator| navigator.advance(elapsed));
            needs_redraw = true;
        }

        // Reset the prompt cursor whenever a new prompt comes up
        let current = host.platform().current().cloned();
        if current != shown_prompt {
            if let Some(prompt) = &current {
                tui.prompt.reset(prompt.options().len());
            }
            shown_prompt = current;
            needs_redraw = true;
        }

        if needs_redraw {
            terminal.draw(|f| ui::draw_ui(f, host.navigator(), &tui, shown_prompt.as_ref()))?;
            needs_redraw = false;
        }

        let timeout = if transitioning {
            Duration::from_millis(16)
        } else {
            Duration::from_millis(500)
        };
        let first_event = poll_event_timeout(timeout);
        if first_event.is_some() {
            needs_redraw = true;
        }

        let mut should_quit = false;
        for event in first_event
            .into_iter()
            .chain(std::iter::from_fn(poll_event_immediate))
        {
            if event == TuiEvent::Resize {
                continue;
            }
            if event == TuiEvent::Quit {
                should_quit = true;
                break;
            }

            // An open prompt captures everything else
            if host.platform().current().is_some() {
                if let Some(prompt_event) = tui.prompt.handle_event(&event) {
                    tui.status_message = answer_prompt(&mut host, prompt_event);
                }
                continue;
            }

            match event {
                TuiEvent::Back => {
                    let main = tui.main.clone();
                    if !host.dispatch(|navigator| navigator.handle_back(&main)) {
                        should_quit = true;
                        break;
                    }
                }
                TuiEvent::SaveSnapshot => {
                    let state = host.on_save_instance_state();
                    tui.status_message = match snapshot::save_snapshot(&config.state_file, state) {
                        Ok(meta) => {
                            format!("Snapshot saved at {}", meta.saved_at.format("%H:%M:%S"))
                        }
                        Err(e) => {
                            warn!("Failed to save snapshot: {}", e);
                            format!("Save failed: {e}")
                        }
                    };
                }
                TuiEvent::Recreate => {
                    tui.main = recreate_host(&mut host);
                    tui.status_message = "Host recreated".to_string();
                }
                TuiEvent::ResetMenu => {
                    if host.on_options_item_selected("reset") {
                        tui.status_message = "Results cleared".to_string();
                    }
                }
                TuiEvent::SwitchFocus => {
                    // Focus belongs to the Parent page itself, not its children
                    let top = host
                        .navigator()
                        .router(&tui.main)
                        .and_then(|router| router.top())
                        .cloned();
                    if let Some(top) = top {
                        send_key(&mut host, &top, DemoKey::SwitchFocus);
                    }
                }
                TuiEvent::Up | TuiEvent::Down | TuiEvent::Open | TuiEvent::PopToRoot => {
                    let key = match event {
                        TuiEvent::Up => DemoKey::Up,
                        TuiEvent::Down => DemoKey::Down,
                        TuiEvent::Open => DemoKey::Open,
                        _ => DemoKey::PopToRoot,
                    };
                    if let Some(id) = focused_controller(host.navigator(), &tui.main) {
                        send_key(&mut host, &id, key);
                    }
                }
                TuiEvent::Quit | TuiEvent::Resize => {}
            }
        }

        if should_quit {
            break;
        }
    }

    shut_down_host(&mut host, &config.state_file);
    info!("Shut down after {} controllers", host.navigator().controller_count());

    ratatui::restore();
    Ok(())
}
