//! # Backstack
//!
//! Ordered entries, bottom (root, index 0) to top (visible). Mutations here
//! are pure bookkeeping; the navigator snapshots the stack before a mutation
//! and reconciles lifecycle and views against the snapshot afterwards.
//!
//! Invariants:
//! - a controller appears at most once
//! - index order is presentation order

use std::collections::HashSet;

use crate::core::controller::ControllerId;
use crate::core::transaction::Entry;

#[derive(Debug, Default)]
pub struct Backstack {
    entries: Vec<Entry>,
}

/// What a stack looked like before a mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackstackSnapshot {
    pub ids: Vec<ControllerId>,
    pub visible: Vec<ControllerId>,
}

impl BackstackSnapshot {
    pub fn top(&self) -> Option<&ControllerId> {
        self.ids.last()
    }

    pub fn contains(&self, id: &ControllerId) -> bool {
        self.ids.contains(id)
    }
}

impl Backstack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn root(&self) -> Option<&Entry> {
        self.entries.first()
    }

    pub fn top(&self) -> Option<&Entry> {
        self.entries.last()
    }

    pub fn top_id(&self) -> Option<&ControllerId> {
        self.top().map(Entry::controller)
    }

    pub fn contains(&self, id: &ControllerId) -> bool {
        self.entries.iter().any(|entry| &entry.controller == id)
    }

    pub fn position(&self, id: &ControllerId) -> Option<usize> {
        self.entries.iter().position(|entry| &entry.controller == id)
    }

    pub fn position_of_tag(&self, tag: &str) -> Option<usize> {
        self.entries
            .iter()
            .rposition(|entry| entry.tag.as_deref() == Some(tag))
    }

    pub fn entry(&self, id: &ControllerId) -> Option<&Entry> {
        self.entries.iter().find(|entry| &entry.controller == id)
    }

    pub(crate) fn entry_mut(&mut self, id: &ControllerId) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|entry| &entry.controller == id)
    }

    pub fn ids(&self) -> Vec<ControllerId> {
        self.entries.iter().map(|entry| entry.controller.clone()).collect()
    }

    /// Entries whose views should be showing, bottom to top: the top entry
    /// plus everything beneath it up to and including the first entry that
    /// is covered by an opaque push.
    pub fn visible_ids(&self) -> Vec<ControllerId> {
        let mut visible = Vec::new();
        for entry in self.entries.iter().rev() {
            visible.push(entry.controller.clone());
            if entry.covers_below() {
                break;
            }
        }
        visible.reverse();
        visible
    }

    pub fn snapshot(&self) -> BackstackSnapshot {
        BackstackSnapshot {
            ids: self.ids(),
            visible: self.visible_ids(),
        }
    }

    /// Appends `entry` on top.
    ///
    /// # Panics
    ///
    /// If the entry's controller is already on this backstack.
    pub fn push(&mut self, entry: Entry) {
        assert!(
            !self.contains(&entry.controller),
            "controller {} is already on this backstack",
            entry.controller
        );
        self.entries.push(entry);
    }

    pub fn pop(&mut self) -> Option<Entry> {
        self.entries.pop()
    }

    /// Removes every entry above index `keep - 1`, returning them top first.
    pub fn truncate(&mut self, keep: usize) -> Vec<Entry> {
        if keep >= self.entries.len() {
            return Vec::new();
        }
        let mut removed = self.entries.split_off(keep);
        removed.reverse();
        removed
    }

    pub fn remove(&mut self, id: &ControllerId) -> Option<Entry> {
        let index = self.position(id)?;
        Some(self.entries.remove(index))
    }

    /// Swaps the top entry for `entry` with no intermediate empty state.
    pub fn replace_top(&mut self, entry: Entry) -> Option<Entry> {
        let old = self.entries.pop();
        self.push(entry);
        old
    }

    /// Removes every entry, top first.
    pub fn clear(&mut self) -> Vec<Entry> {
        self.truncate(0)
    }

    /// Every controller on the stack is distinct.
    pub fn is_consistent(&self) -> bool {
        let mut seen = HashSet::new();
        self.entries.iter().all(|entry| seen.insert(&entry.controller))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::change::SimpleSwapChangeHandler;
    use crate::core::controller::Controller;
    use crate::core::transaction::Transaction;
    use crate::test_support::TestScreen;

    fn entry(name: &str) -> Entry {
        Transaction::with(Controller::new(TestScreen::new(name)))
            .tag(name)
            .into_parts(0)
            .1
    }

    fn overlay(name: &str) -> Entry {
        Transaction::with(Controller::new(TestScreen::new(name)))
            .push_handler(SimpleSwapChangeHandler::overlay())
            .tag(name)
            .into_parts(0)
            .1
    }

    fn tags(stack: &Backstack) -> Vec<&str> {
        stack.entries().iter().filter_map(Entry::tag).collect()
    }

    #[test]
    fn test_push_pop_order() {
        let mut stack = Backstack::new();
        stack.push(entry("a"));
        stack.push(entry("b"));
        stack.push(entry("c"));
        assert_eq!(stack.top().and_then(Entry::tag), Some("c"));
        assert_eq!(stack.root().and_then(Entry::tag), Some("a"));
        assert_eq!(stack.pop().and_then(|e| e.tag), Some("c".to_string()));
        assert_eq!(tags(&stack), vec!["a", "b"]);
    }

    #[test]
    #[should_panic(expected = "already on this backstack")]
    fn test_duplicate_push_panics() {
        let mut stack = Backstack::new();
        let first = entry("a");
        let duplicate = Entry {
            controller: first.controller.clone(),
            push_handler: None,
            pop_handler: None,
            tag: None,
            transaction_index: 1,
        };
        stack.push(first);
        stack.push(duplicate);
    }

    #[test]
    fn test_truncate_returns_removed_top_first() {
        let mut stack = Backstack::new();
        for name in ["a", "b", "c", "d"] {
            stack.push(entry(name));
        }
        let removed = stack.truncate(1);
        let removed_tags: Vec<_> = removed.iter().filter_map(Entry::tag).collect();
        assert_eq!(removed_tags, vec!["d", "c", "b"]);
        assert_eq!(tags(&stack), vec!["a"]);
        assert!(stack.truncate(5).is_empty());
    }

    #[test]
    fn test_replace_top() {
        let mut stack = Backstack::new();
        stack.push(entry("a"));
        stack.push(entry("b"));
        let old = stack.replace_top(entry("c")).unwrap();
        assert_eq!(old.tag(), Some("b"));
        assert_eq!(tags(&stack), vec!["a", "c"]);
    }

    #[test]
    fn test_position_of_tag_prefers_topmost() {
        let mut stack = Backstack::new();
        stack.push(entry("x"));
        stack.push(entry("y"));
        stack.push(entry("x2"));
        assert_eq!(stack.position_of_tag("y"), Some(1));
        assert_eq!(stack.position_of_tag("missing"), None);
    }

    #[test]
    fn test_visible_ids_stop_at_opaque_entry() {
        let mut stack = Backstack::new();
        let a = entry("a");
        let b = entry("b");
        let dialog = overlay("dialog");
        let (b_id, dialog_id) = (b.controller.clone(), dialog.controller.clone());
        stack.push(a);
        stack.push(b);
        stack.push(dialog);
        assert_eq!(stack.visible_ids(), vec![b_id.clone(), dialog_id]);

        stack.pop();
        assert_eq!(stack.visible_ids(), vec![b_id]);
    }

    #[test]
    fn test_overlay_root_shows_alone() {
        let mut stack = Backstack::new();
        let dialog = overlay("dialog");
        let id = dialog.controller.clone();
        stack.push(dialog);
        assert_eq!(stack.visible_ids(), vec![id]);
        assert!(stack.is_consistent());
    }

    #[test]
    fn test_snapshot_top() {
        let mut stack = Backstack::new();
        assert!(stack.snapshot().top().is_none());
        let a = entry("a");
        let id = a.controller.clone();
        stack.push(a);
        let snapshot = stack.snapshot();
        assert_eq!(snapshot.top(), Some(&id));
        assert!(snapshot.contains(&id));
    }
}
