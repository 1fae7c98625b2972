//! # Navigation Engine
//!
//! Screen-stack navigation with no knowledge of any UI technology.
//!
//! ```text
//!                    ┌─────────────────────────────┐
//!                    │            CORE             │
//!                    │        (this module)        │
//!                    │                             │
//!                    │  • Navigator (arena)        │
//!                    │  • Router / Backstack       │
//!                    │  • Controller lifecycle     │
//!                    │  • ChangeHandler protocol   │
//!                    │                             │
//!                    │  No terminal. No rendering. │
//!                    └──────────────┬──────────────┘
//!                                   │
//!            ┌──────────────────────┼──────────────────────┐
//!            ▼                      ▼                      ▼
//!     ┌────────────┐         ┌────────────┐         ┌────────────┐
//!     │    TUI     │         │  snapshot  │         │   tests    │
//!     │   demo     │         │ (JSON file)│         │ (recording │
//!     │ (ratatui)  │         │            │         │  screens)  │
//!     └────────────┘         └────────────┘         └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`navigator`]: the arena and the public navigation API
//! - [`transition`] / [`dispatch`]: how a backstack change becomes lifecycle calls
//! - [`persistence`]: saved-state shapes and the factory registry
//! - [`host`]: host lifecycle hooks and the platform bridge

pub mod backstack;
pub mod bundle;
pub mod change;
pub mod config;
pub mod controller;
mod dispatch;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod navigator;
pub mod persistence;
pub mod router;
pub mod snapshot;
pub mod transaction;
mod transition;
pub mod view;

// Re-export commonly used types for convenience
pub use bundle::Bundle;
pub use change::{ChangeCompletion, ChangeHandler, ChangeType, SimpleSwapChangeHandler};
pub use controller::{Controller, ControllerContext, ControllerId, ControllerState, RetainViewMode, Screen};
pub use error::NavError;
pub use navigator::{ChildBackPolicy, Navigator, NavigatorConfig};
pub use persistence::Registry;
pub use router::{Router, RouterKey};
pub use transaction::Transaction;
pub use view::{Container, ContainerId, View, ViewId};
