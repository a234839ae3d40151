#![forbid(unsafe_code)]

//! Edit vocabulary produced by the diff and consumed by UI-surface adapters.
//!
//! Every edit addresses a node through a [`TreePath`]: the child indices
//! from the component's root list down to the node, counting only visible
//! nodes (elements, text, markup, component placeholders; regions are
//! flattened away). A path is valid against the tree as it stands after all
//! earlier edits of the same diff were applied, so an adapter applies edits
//! strictly in order without recomputing anything.

use std::fmt;

use rtree_core::{AttributeValue, ComponentId, Frame};
use smallvec::SmallVec;

/// Position of a node in a component's visible tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TreePath(SmallVec<[u32; 8]>);

impl TreePath {
    /// The component's root list itself (no node).
    pub fn root() -> Self {
        Self(SmallVec::new())
    }

    /// Path of the `index`-th child of this node.
    pub fn child(&self, index: usize) -> Self {
        debug_assert!(u32::try_from(index).is_ok(), "sibling index overflow");
        let mut indices = self.0.clone();
        indices.push(index as u32);
        Self(indices)
    }

    #[inline]
    pub fn indices(&self) -> &[u32] {
        &self.0
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Parent indices and the position within the parent.
    pub fn split_last(&self) -> Option<(&[u32], usize)> {
        self.0
            .split_last()
            .map(|(last, parent)| (parent, *last as usize))
    }
}

impl<const N: usize> From<[u32; N]> for TreePath {
    fn from(indices: [u32; N]) -> Self {
        Self(indices.into_iter().collect())
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for index in &self.0 {
            write!(f, "/{index}")?;
        }
        Ok(())
    }
}

/// A single change to a component's rendered output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderTreeEdit {
    /// Add or overwrite an attribute on an element.
    SetAttribute {
        owner: TreePath,
        name: String,
        value: AttributeValue,
    },
    /// Remove an attribute from an element.
    RemoveAttribute { owner: TreePath, name: String },
    /// Replace the content of a text node.
    SetText { at: TreePath, text: String },
    /// Insert one node built from `frames` (a complete subtree).
    InsertSubtree { at: TreePath, frames: Vec<Frame> },
    /// Remove the node at `at` with all of its descendants.
    RemoveSubtree { at: TreePath },
    /// Move a node between two positions under the same parent: remove it
    /// at `from`, then insert it at `to`.
    MoveSubtree { from: TreePath, to: TreePath },
    /// The child component at `at` received new parameters and is being
    /// re-rendered within the same batch.
    UpdateComponentPlaceholder {
        at: TreePath,
        component_id: ComponentId,
    },
}

impl RenderTreeEdit {
    /// Whether this edit changes content rather than structure.
    pub fn is_content_edit(&self) -> bool {
        matches!(
            self,
            Self::SetAttribute { .. } | Self::RemoveAttribute { .. } | Self::SetText { .. }
        )
    }
}

/// The ordered edits for one component within one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTreeDiff {
    component_id: ComponentId,
    edits: Vec<RenderTreeEdit>,
}

impl RenderTreeDiff {
    pub fn new(component_id: ComponentId, edits: Vec<RenderTreeEdit>) -> Self {
        Self {
            component_id,
            edits,
        }
    }

    #[inline]
    pub fn component_id(&self) -> ComponentId {
        self.component_id
    }

    #[inline]
    pub fn edits(&self) -> &[RenderTreeEdit] {
        &self.edits
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderTreeEdit> + '_ {
        self.edits.iter()
    }
}
