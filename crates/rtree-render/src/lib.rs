#![forbid(unsafe_code)]

//! Render kernel: tree diffs, edit batches, and headless presentation.

pub mod batch;
pub mod diff;
pub mod edit;
pub mod headless;

pub use batch::{RenderBatch, RenderBatchBuilder, TeardownFailure};
pub use diff::{
    ChildComponentHost, ChildRender, DiffConfig, DiffError, DiffOutcome, DuplicateKeyPolicy,
    compute_diff,
};
pub use edit::{RenderTreeDiff, RenderTreeEdit, TreePath};
pub use headless::{ApplyError, HeadlessSurface, Node, apply_edit, materialize};
