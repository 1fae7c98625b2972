//! # TUI Components
//!
//! Reusable pieces of the demo interface.
//!
//! ### Stateless Components (Props-Based Rendering)
//!
//! - `TitleBar`: breadcrumb of the main backstack plus status
//! - `PromptDialog`: modal list for a pending platform prompt
//!
//! ### Stateful Components (Event-Driven)
//!
//! - `PromptState`: highlighted row of the open prompt; turns key events into
//!   `PromptEvent`s
//!
//! Screens themselves are not components: `ui.rs` walks the router tree and
//! draws each mounted view from its `DemoScreen`.

mod prompt;
mod title_bar;

pub use prompt::{PromptDialog, PromptEvent, PromptState};
pub use title_bar::TitleBar;
