#![forbid(unsafe_code)]

//! Errors raised while building, enumerating, or validating frames.

use crate::frame::FrameType;

/// Render tree error.
///
/// Usage errors are contract violations by the caller and are reported
/// immediately. Structural errors mean a frame sequence is malformed; they
/// abort the diff of the component that produced it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// An attribute was added after other content, or with no owner open.
    #[error(
        "attribute `{name}` added out of sequence: attributes must directly follow an open element or component"
    )]
    InvalidSequence { name: String },

    /// Frames were requested while some frame is still open.
    #[error("render tree has {open} unclosed frame(s)")]
    UnclosedFrames { open: usize },

    /// A close call had nothing to close.
    #[error("close_{expected} called with no open frame")]
    CloseWithoutOpen { expected: FrameType },

    /// A close call does not match the innermost open frame.
    #[error("close_{expected} called while the innermost open frame is a {found}")]
    MismatchedClose {
        expected: FrameType,
        found: FrameType,
    },

    /// A structural key was set after the open frame received content.
    #[error("structural key set after content was added to the open {frame_type}")]
    KeyAfterContent { frame_type: FrameType },

    /// A structural key was set with no element or component open.
    #[error("structural key set with no open element or component")]
    KeyWithoutOwner,

    /// `current()` called on a parameter enumerator before `move_next()`.
    #[error("iteration has not yet started")]
    NotStarted,

    /// A subtree length runs past the end of its parent or the buffer.
    #[error(
        "frame {index} declares subtree length {declared} but only {available} frame(s) remain in its parent"
    )]
    SubtreeLengthMismatch {
        index: usize,
        declared: usize,
        available: usize,
    },

    /// A subtree length of zero.
    #[error("frame {index} declares an empty subtree")]
    EmptySubtree { index: usize },

    /// An attribute frame outside an owner's leading attribute run.
    #[error("attribute frame {index} has no owning element or component")]
    OrphanAttribute { index: usize },

    /// A component frame owns something other than its parameters.
    #[error("component frame {index} may only own attribute frames")]
    ComponentContent { index: usize },
}

impl TreeError {
    /// Whether this error reports a malformed frame sequence.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::SubtreeLengthMismatch { .. }
                | Self::EmptySubtree { .. }
                | Self::OrphanAttribute { .. }
                | Self::ComponentContent { .. }
        )
    }
}
