#![forbid(unsafe_code)]

//! rtree public facade crate.
//!
//! Re-exports the common types of the internal crates and offers a small
//! prelude for day-to-day use.

// --- Core re-exports -------------------------------------------------------

pub use rtree_core::{
    AttributeValue, CaptureId, ComponentId, ComponentType, EventHandlerId, Frame, FrameKey,
    FrameType, Parameter, ParameterCollection, ParameterEnumerator, RenderTreeBuilder, TreeError,
    validate_frames,
};

// --- Render re-exports -----------------------------------------------------

pub use rtree_render::{
    ApplyError, ChildComponentHost, DiffConfig, DiffError, DuplicateKeyPolicy, HeadlessSurface,
    RenderBatch, RenderBatchBuilder, RenderTreeDiff, RenderTreeEdit, TeardownFailure, TreePath,
    compute_diff,
};

// --- Runtime re-exports ----------------------------------------------------

#[cfg(feature = "runtime")]
pub use rtree_runtime::{
    Capabilities, Component, ComponentError, ComponentRegistry, ComponentState, RenderError,
    Renderer, RendererConfig, UiEvent,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for rtree users.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Tree construction or structure failure.
    #[error(transparent)]
    Tree(#[from] TreeError),
    /// Diff failure.
    #[error(transparent)]
    Diff(#[from] DiffError),
    /// A batch did not fit the surface it was applied to.
    #[error(transparent)]
    Apply(#[from] ApplyError),
    /// Render pass or dispatch failure.
    #[cfg(feature = "runtime")]
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Standard result type for rtree APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        AttributeValue, ComponentId, ComponentType, DiffConfig, Error, EventHandlerId, Frame,
        HeadlessSurface, ParameterCollection, RenderBatch, RenderTreeBuilder, RenderTreeEdit,
        Result, TreeError, TreePath,
    };

    #[cfg(feature = "runtime")]
    pub use crate::{
        Capabilities, Component, ComponentError, ComponentRegistry, Renderer, RendererConfig,
        UiEvent,
    };

    pub use crate::{core, render};
    #[cfg(feature = "runtime")]
    pub use crate::runtime;
}

pub use rtree_core as core;
pub use rtree_render as render;
#[cfg(feature = "runtime")]
pub use rtree_runtime as runtime;
