#![forbid(unsafe_code)]

//! Core: flat render-tree frames, the tree builder, parameter enumeration,
//! and structural validation.
//!
//! A component renders into a [`RenderTreeBuilder`], producing a pre-order
//! sequence of [`Frame`]s where every owner records how many frames belong
//! to it. Everything downstream (diffing, batching, the headless surface)
//! works on those slices by index.

pub mod builder;
pub mod error;
pub mod frame;
pub mod logging;
pub mod params;
pub mod validate;

pub use builder::RenderTreeBuilder;
pub use error::TreeError;
pub use frame::{
    AttributeValue, CaptureId, ComponentId, ComponentType, EventHandlerId, Frame, FrameKey,
    FrameType,
};
pub use params::{Parameter, ParameterCollection, ParameterEnumerator, Parameters};
pub use validate::validate_frames;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, debug_span, trace, trace_span, warn};
