//! # Views and Containers
//!
//! The engine never renders anything. A `View` is the handle a screen hands
//! back from `on_create_view`; a `Container` is the surface a Router mounts
//! views into. Adapters (the TUI, tests) read both to decide what to draw.
//!
//! ```text
//! Container "main"
//! ├── ViewId(3)   bottom (e.g. a screen under an overlay)
//! └── ViewId(7)   top
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::core::bundle::Bundle;

static NEXT_VIEW_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique view handle. Views are not persisted, so neither are ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(u64);

impl ViewId {
    fn next() -> Self {
        ViewId(NEXT_VIEW_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

/// Identifies a container surface: a host window region or a slot inside a
/// parent screen's view.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        ContainerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ContainerId {
    fn from(id: &str) -> Self {
        ContainerId(id.to_string())
    }
}

impl From<String> for ContainerId {
    fn from(id: String) -> Self {
        ContainerId(id)
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A screen's root view.
#[derive(Debug)]
pub struct View {
    id: ViewId,
    containers: Vec<ContainerId>,
    /// Free-form presentation data owned by the screen (scroll offsets,
    /// selection, text). Saved through `on_save_view_state` when the view is
    /// torn down temporarily.
    pub state: Bundle,
}

impl View {
    pub fn new() -> Self {
        Self {
            id: ViewId::next(),
            containers: Vec::new(),
            state: Bundle::new(),
        }
    }

    /// Declares a child container hosted inside this view. Child routers
    /// bound to this id get a surface while the view exists.
    pub fn with_container(mut self, container: impl Into<ContainerId>) -> Self {
        self.containers.push(container.into());
        self
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn containers(&self) -> &[ContainerId] {
        &self.containers
    }

    pub fn hosts(&self, container: &ContainerId) -> bool {
        self.containers.contains(container)
    }
}

impl Default for View {
    fn default() -> Self {
        Self::new()
    }
}

/// The surface a Router renders into: mounted views, bottom to top.
#[derive(Debug)]
pub struct Container {
    id: ContainerId,
    views: Vec<ViewId>,
    translations: HashMap<ViewId, f32>,
}

impl Container {
    pub fn new(id: impl Into<ContainerId>) -> Self {
        Self {
            id: id.into(),
            views: Vec::new(),
            translations: HashMap::new(),
        }
    }

    pub fn id(&self) -> &ContainerId {
        &self.id
    }

    pub fn views(&self) -> &[ViewId] {
        &self.views
    }

    pub fn top_view(&self) -> Option<ViewId> {
        self.views.last().copied()
    }

    pub fn contains(&self, view: ViewId) -> bool {
        self.views.contains(&view)
    }

    /// Mounts `view` on top. Mounting an already mounted view is a no-op.
    pub fn add_view(&mut self, view: ViewId) {
        if !self.contains(view) {
            self.views.push(view);
        }
    }

    /// Mounts `view` directly beneath `anchor`, or on top if `anchor` is not
    /// mounted.
    pub fn insert_view_below(&mut self, view: ViewId, anchor: ViewId) {
        if self.contains(view) {
            return;
        }
        match self.views.iter().position(|v| *v == anchor) {
            Some(index) => self.views.insert(index, view),
            None => self.views.push(view),
        }
    }

    pub fn remove_view(&mut self, view: ViewId) -> bool {
        self.translations.remove(&view);
        let before = self.views.len();
        self.views.retain(|v| *v != view);
        before != self.views.len()
    }

    /// Horizontal offset as a fraction of the container width. Animated
    /// handlers drive this; zero means fully in place.
    pub fn set_translation(&mut self, view: ViewId, fraction: f32) {
        if fraction == 0.0 {
            self.translations.remove(&view);
        } else {
            self.translations.insert(view, fraction);
        }
    }

    pub fn translation(&self, view: ViewId) -> f32 {
        self.translations.get(&view).copied().unwrap_or(0.0)
    }

    pub fn clear(&mut self) {
        self.views.clear();
        self.translations.clear();
    }
}
