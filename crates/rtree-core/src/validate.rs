#![forbid(unsafe_code)]

//! Structural validation of finished frame sequences.
//!
//! One linear pass with a stack of open scopes checks that:
//!
//! 1. Every declared subtree length is non-zero and fits inside its parent
//!    (or the buffer, at top level).
//! 2. Every attribute frame sits in the leading attribute run of an
//!    element or component.
//! 3. A component frame owns attribute frames only.
//!
//! Sequences produced by [`RenderTreeBuilder`](crate::builder::RenderTreeBuilder)
//! always pass; hand-assembled or corrupted sequences may not.

use crate::error::TreeError;
use crate::frame::Frame;

#[derive(Debug, Clone, Copy)]
struct Scope {
    end: usize,
    attributes_open: bool,
    /// Index of the owning frame when it is a component.
    component: Option<usize>,
}

/// Check the structural invariants of `frames`.
pub fn validate_frames(frames: &[Frame]) -> Result<(), TreeError> {
    let mut open: Vec<Scope> = Vec::new();

    for (index, frame) in frames.iter().enumerate() {
        while open.last().is_some_and(|scope| index >= scope.end) {
            open.pop();
        }

        if frame.as_attribute().is_some() {
            if !open.last().is_some_and(|scope| scope.attributes_open) {
                return Err(TreeError::OrphanAttribute { index });
            }
        } else if let Some(scope) = open.last_mut() {
            if let Some(component) = scope.component {
                return Err(TreeError::ComponentContent { index: component });
            }
            scope.attributes_open = false;
        }

        if let Some(declared) = frame.declared_subtree_length() {
            if declared == 0 {
                return Err(TreeError::EmptySubtree { index });
            }
            let limit = open.last().map_or(frames.len(), |scope| scope.end);
            let end = index.saturating_add(declared);
            if end > limit {
                return Err(TreeError::SubtreeLengthMismatch {
                    index,
                    declared,
                    available: limit - index,
                });
            }
            open.push(Scope {
                end,
                attributes_open: frame.is_owner(),
                component: matches!(frame, Frame::Component { .. }).then_some(index),
            });
        }
    }

    Ok(())
}
