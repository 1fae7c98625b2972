//! # Terminal Platform
//!
//! Stands in for the operating system behind the demo host. Activity and
//! permission requests become prompts the event loop shows one at a time;
//! the user's answer is fed back through `LifecycleHost`.

use std::collections::VecDeque;

use log::info;

use crate::core::bundle::Bundle;
use crate::core::host::Platform;

pub const COLORS: [&str; 4] = ["red", "green", "blue", "teal"];

#[derive(Debug, Clone, PartialEq)]
pub enum PlatformPrompt {
    PickColor { request_code: i32 },
    Permission { request_code: i32, permissions: Vec<String> },
}

impl PlatformPrompt {
    pub fn title(&self) -> &'static str {
        match self {
            PlatformPrompt::PickColor { .. } => "Pick a color",
            PlatformPrompt::Permission { .. } => "Permission request",
        }
    }

    pub fn options(&self) -> Vec<String> {
        match self {
            PlatformPrompt::PickColor { .. } => COLORS.iter().map(|c| c.to_string()).collect(),
            PlatformPrompt::Permission { permissions, .. } => vec![
                format!("Allow {}", permissions.join(", ")),
                "Deny".to_string(),
            ],
        }
    }
}

#[derive(Debug, Default)]
pub struct TerminalPlatform {
    prompts: VecDeque<PlatformPrompt>,
    menu_invalidations: usize,
}

impl TerminalPlatform {
    pub fn current(&self) -> Option<&PlatformPrompt> {
        self.prompts.front()
    }

    pub fn take_current(&mut self) -> Option<PlatformPrompt> {
        self.prompts.pop_front()
    }

    pub fn menu_invalidations(&self) -> usize {
        self.menu_invalidations
    }
}

impl Platform for TerminalPlatform {
    fn start_activity_for_result(&mut self, intent: &Bundle, request_code: i32) {
        info!(
            "Starting {:?} for result (request {request_code})",
            intent.get_str("action")
        );
        self.prompts
            .push_back(PlatformPrompt::PickColor { request_code });
    }

    fn request_permissions(&mut self, permissions: &[String], request_code: i32) {
        info!("Requesting {permissions:?} (request {request_code})");
        self.prompts.push_back(PlatformPrompt::Permission {
            request_code,
            permissions: permissions.to_vec(),
        });
    }

    fn invalidate_options_menu(&mut self) {
        self.menu_invalidations += 1;
    }
}
