#![forbid(unsafe_code)]

//! Render batches: the unit of output handed to a UI surface.
//!
//! One render pass accumulates per-component diffs, disposed components,
//! disposed event handlers, and teardown failures in a
//! [`RenderBatchBuilder`]. [`RenderBatchBuilder::finish`] freezes them into
//! an immutable [`RenderBatch`].

use std::collections::HashSet;
use std::fmt;

use rtree_core::{ComponentId, EventHandlerId};

use crate::edit::RenderTreeDiff;

/// A component whose teardown hook failed while being disposed.
///
/// Disposal continues past the failure; the batch carries it so the host can
/// report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownFailure {
    pub component_id: ComponentId,
    pub type_name: &'static str,
    pub message: String,
}

impl fmt::Display for TeardownFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "component {} ({}) failed to dispose: {}",
            self.component_id, self.type_name, self.message
        )
    }
}

/// Accumulates the output of one render pass.
#[derive(Debug, Default)]
pub struct RenderBatchBuilder {
    diffs: Vec<RenderTreeDiff>,
    disposed_components: Vec<ComponentId>,
    disposed_set: HashSet<ComponentId>,
    disposed_handlers: Vec<EventHandlerId>,
    teardown_failures: Vec<TeardownFailure>,
}

impl RenderBatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a component's diff. Empty diffs are kept: they mark the
    /// component as rendered in this pass.
    pub fn append_diff(&mut self, diff: RenderTreeDiff) {
        self.diffs.push(diff);
    }

    /// Record a disposed component. Returns `false` if it was already
    /// recorded in this batch.
    pub fn record_disposed_component(&mut self, id: ComponentId) -> bool {
        if !self.disposed_set.insert(id) {
            return false;
        }
        self.disposed_components.push(id);
        true
    }

    pub fn record_disposed_handler(&mut self, id: EventHandlerId) {
        self.disposed_handlers.push(id);
    }

    pub fn record_disposed_handlers(&mut self, ids: impl IntoIterator<Item = EventHandlerId>) {
        self.disposed_handlers.extend(ids);
    }

    pub fn record_teardown_failure(&mut self, failure: TeardownFailure) {
        self.teardown_failures.push(failure);
    }

    #[inline]
    pub fn is_disposed(&self, id: ComponentId) -> bool {
        self.disposed_set.contains(&id)
    }

    /// Number of diffs recorded so far.
    #[inline]
    pub fn diff_count(&self) -> usize {
        self.diffs.len()
    }

    pub fn finish(self) -> RenderBatch {
        RenderBatch {
            diffs: self.diffs,
            disposed_components: self.disposed_components,
            disposed_handlers: self.disposed_handlers,
            teardown_failures: self.teardown_failures,
        }
    }
}

/// The finished output of one render pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderBatch {
    diffs: Vec<RenderTreeDiff>,
    disposed_components: Vec<ComponentId>,
    disposed_handlers: Vec<EventHandlerId>,
    teardown_failures: Vec<TeardownFailure>,
}

impl RenderBatch {
    /// Per-component diffs in the order the components rendered.
    #[inline]
    pub fn updated_components(&self) -> &[RenderTreeDiff] {
        &self.diffs
    }

    #[inline]
    pub fn disposed_components(&self) -> &[ComponentId] {
        &self.disposed_components
    }

    #[inline]
    pub fn disposed_handlers(&self) -> &[EventHandlerId] {
        &self.disposed_handlers
    }

    #[inline]
    pub fn teardown_failures(&self) -> &[TeardownFailure] {
        &self.teardown_failures
    }

    /// All diffs recorded for `id`, in render order.
    pub fn diffs_for(&self, id: ComponentId) -> impl Iterator<Item = &RenderTreeDiff> + '_ {
        self.diffs.iter().filter(move |d| d.component_id() == id)
    }

    /// Whether the batch carries no edits and no disposals.
    pub fn is_empty(&self) -> bool {
        self.diffs.iter().all(RenderTreeDiff::is_empty)
            && self.disposed_components.is_empty()
            && self.disposed_handlers.is_empty()
            && self.teardown_failures.is_empty()
    }

    pub fn total_edits(&self) -> usize {
        self.diffs.iter().map(RenderTreeDiff::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edit::{RenderTreeEdit, TreePath};

    fn text_diff(id: u32, text: &str) -> RenderTreeDiff {
        RenderTreeDiff::new(
            ComponentId(id),
            vec![RenderTreeEdit::SetText {
                at: TreePath::from([0]),
                text: text.into(),
            }],
        )
    }

    #[test]
    fn empty_builder_finishes_empty() {
        let batch = RenderBatchBuilder::new().finish();
        assert!(batch.is_empty());
        assert_eq!(batch.total_edits(), 0);
    }

    #[test]
    fn empty_diffs_do_not_make_batch_non_empty() {
        let mut b = RenderBatchBuilder::new();
        b.append_diff(RenderTreeDiff::new(ComponentId(1), Vec::new()));
        let batch = b.finish();
        assert!(batch.is_empty());
        assert_eq!(batch.updated_components().len(), 1);
    }

    #[test]
    fn disposed_components_are_deduplicated() {
        let mut b = RenderBatchBuilder::new();
        assert!(b.record_disposed_component(ComponentId(4)));
        assert!(!b.record_disposed_component(ComponentId(4)));
        assert!(b.is_disposed(ComponentId(4)));
        assert_eq!(b.finish().disposed_components(), &[ComponentId(4)]);
    }

    #[test]
    fn diffs_for_filters_by_component() {
        let mut b = RenderBatchBuilder::new();
        b.append_diff(text_diff(1, "a"));
        b.append_diff(text_diff(2, "b"));
        b.append_diff(text_diff(1, "c"));
        let batch = b.finish();
        assert_eq!(batch.diffs_for(ComponentId(1)).count(), 2);
        assert_eq!(batch.total_edits(), 3);
    }

    #[test]
    fn teardown_failure_display() {
        let failure = TeardownFailure {
            component_id: ComponentId(9),
            type_name: "Timer",
            message: "already stopped".into(),
        };
        assert_eq!(
            failure.to_string(),
            "component #9 (Timer) failed to dispose: already stopped"
        );
    }
}
