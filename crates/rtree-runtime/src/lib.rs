#![forbid(unsafe_code)]

//! rtree runtime
//!
//! Ties the core and render crates into a component runtime.
//!
//! # Key Components
//!
//! - [`Component`] - Trait for render logic and optional lifecycle hooks
//! - [`Capabilities`] - Optional behaviours, checked once at construction
//! - [`ComponentState`] - Double-buffered render state of one instance
//! - [`Renderer`] - Component table and render-pass driver
//! - [`RendererConfig`] - Renderer and diff configuration
//!
//! # How it fits
//! The caller decides which component needs rendering and asks the
//! [`Renderer`]; the renderer renders it and every affected child, diffs
//! each against its last output with `rtree-render`, and returns one
//! [`RenderBatch`](rtree_render::RenderBatch) for the UI surface.

pub mod component;
pub mod component_state;
pub mod debug_trace;
pub mod error;
pub mod renderer;

pub use component::{Capabilities, Component, ComponentFactory, UiEvent};
pub use component_state::{ComponentState, RenderBuffers, RenderOutcome};
pub use error::{ComponentError, RenderError};
pub use renderer::{ComponentRegistry, DEFAULT_MAX_RENDERS_PER_PASS, Renderer, RendererConfig};
