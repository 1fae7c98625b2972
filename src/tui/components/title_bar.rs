//! # TitleBar Component
//!
//! Top status bar showing the main backstack and transient notifications.
//!
//! ## Responsibilities
//!
//! - Display the main router's backstack as a breadcrumb (root first)
//! - Display status messages (e.g., "Snapshot saved", "Host recreated")
//! - Show a "⇄" marker while any router has a change in flight
//!
//! ## Design Decisions
//!
//! ### Stateless Component
//!
//! TitleBar is purely presentational. It receives all data as props and has
//! no internal state:
//!
//! ```rust,ignore
//! let mut title_bar = TitleBar::new(vec!["home".into(), "detail-1".into()], String::new(), false);
//! title_bar.render(frame, area);
//! ```
//!
//! ### Truncation
//!
//! The breadcrumb is trimmed from the left (keeping the top of the stack)
//! when it does not fit, measured in display columns with `unicode-width`.

use crate::tui::component::Component;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::text::Span;
use unicode_width::UnicodeWidthStr;

const SEPARATOR: &str = " › ";
const ELLIPSIS: &str = "…";

pub struct TitleBar {
    /// Tags of the main backstack, root first
    pub breadcrumb: Vec<String>,
    /// Status message (e.g., "Snapshot saved")
    pub status_message: String,
    /// Whether a transition is running
    pub transitioning: bool,
}

impl TitleBar {
    pub fn new(breadcrumb: Vec<String>, status_message: String, transitioning: bool) -> Self {
        Self {
            breadcrumb,
            status_message,
            transitioning,
        }
    }

    /// The full title line, trimmed to `width` columns.
    pub fn text(&self, width: usize) -> String {
        let mut suffix = String::new();
        if !self.status_message.is_empty() {
            suffix.push_str(" | ");
            suffix.push_str(&self.status_message);
        }
        if self.transitioning {
            suffix.push_str(" | ⇄");
        }
        let prefix = "navstack: ";
        let budget = width.saturating_sub(prefix.width() + suffix.width());
        format!("{prefix}{}{suffix}", fit_breadcrumb(&self.breadcrumb, budget))
    }
}

/// Joins `crumbs`, dropping the oldest ones until the result fits.
fn fit_breadcrumb(crumbs: &[String], budget: usize) -> String {
    let mut start = 0;
    loop {
        let joined = crumbs[start..].join(SEPARATOR);
        let text = if start > 0 {
            format!("{ELLIPSIS}{SEPARATOR}{joined}")
        } else {
            joined
        };
        if text.width() <= budget || start + 1 >= crumbs.len() {
            return text;
        }
        start += 1;
    }
}

impl Component for TitleBar {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let title_text = self.text(area.width as usize);
        frame.render_widget(Span::raw(title_text), area);
    }
}
