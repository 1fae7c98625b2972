//! # Transactions
//!
//! `Transaction` is what callers build: a controller plus its push/pop
//! change handlers and an optional tag. Pushing it moves the controller into
//! the navigator's arena and leaves an `Entry` on the backstack.
//!
//! Entries compare by controller identity, never by content.

use std::fmt;

use crate::core::change::ChangeHandler;
use crate::core::controller::{Controller, ControllerId};

pub struct Transaction {
    pub(crate) controller: Controller,
    pub(crate) push_handler: Option<Box<dyn ChangeHandler>>,
    pub(crate) pop_handler: Option<Box<dyn ChangeHandler>>,
    pub(crate) tag: Option<String>,
}

impl Transaction {
    pub fn with(controller: Controller) -> Self {
        Self {
            controller,
            push_handler: None,
            pop_handler: None,
            tag: None,
        }
    }

    pub fn push_handler(mut self, handler: impl ChangeHandler + 'static) -> Self {
        self.push_handler = Some(Box::new(handler));
        self
    }

    pub fn pop_handler(mut self, handler: impl ChangeHandler + 'static) -> Self {
        self.pop_handler = Some(Box::new(handler));
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn controller_id(&self) -> &ControllerId {
        self.controller.id()
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut Controller {
        &mut self.controller
    }

    /// Splits into the arena-bound controller and its backstack entry.
    pub(crate) fn into_parts(self, transaction_index: u64) -> (Controller, Entry) {
        let entry = Entry {
            controller: self.controller.id().clone(),
            push_handler: self.push_handler,
            pop_handler: self.pop_handler,
            tag: self.tag,
            transaction_index,
        };
        (self.controller, entry)
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("controller", &self.controller)
            .field("tag", &self.tag)
            .finish()
    }
}

/// A pushed transaction: the backstack's element type.
pub struct Entry {
    pub(crate) controller: ControllerId,
    pub(crate) push_handler: Option<Box<dyn ChangeHandler>>,
    pub(crate) pop_handler: Option<Box<dyn ChangeHandler>>,
    pub(crate) tag: Option<String>,
    /// Navigator-wide push counter; orders child routers by recency.
    pub(crate) transaction_index: u64,
}

impl Entry {
    pub fn controller(&self) -> &ControllerId {
        &self.controller
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn transaction_index(&self) -> u64 {
        self.transaction_index
    }

    pub fn push_handler(&self) -> Option<&dyn ChangeHandler> {
        self.push_handler.as_deref()
    }

    pub fn pop_handler(&self) -> Option<&dyn ChangeHandler> {
        self.pop_handler.as_deref()
    }

    /// Whether this entry hides whatever sits below it once pushed.
    pub(crate) fn covers_below(&self) -> bool {
        self.push_handler
            .as_ref()
            .is_none_or(|handler| handler.removes_from_view_on_push())
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.controller == other.controller
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("controller", &self.controller)
            .field("tag", &self.tag)
            .field("transaction_index", &self.transaction_index)
            .finish()
    }
}
