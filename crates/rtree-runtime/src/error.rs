#![forbid(unsafe_code)]

//! Runtime error types.

use std::error::Error as StdError;

use rtree_core::{ComponentId, ComponentType, TreeError};
use rtree_render::DiffError;

/// Failure reported by a component hook (event handler or teardown).
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ComponentError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl ComponentError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying error, using its message.
    pub fn from_source(source: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors surfaced by component state and the renderer.
///
/// Usage, structural and loop-limit errors abort the render pass they occur
/// in. Dispatch errors are scoped to the one event.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Render logic misused the tree builder.
    #[error("render logic failed: {0}")]
    Build(#[from] TreeError),

    /// The diff could not be computed.
    #[error(transparent)]
    Diff(#[from] DiffError),

    /// The component does not handle events.
    #[error("component type `{component_type}` does not handle events")]
    EventDispatchUnsupported { component_type: &'static str },

    /// The component was disposed.
    #[error("component {id} is disposed")]
    ComponentDisposed { id: ComponentId },

    /// No component with this id exists.
    #[error("unknown component {id}")]
    UnknownComponent { id: ComponentId },

    /// No factory is registered for this component type.
    #[error("no factory registered for component type `{component_type}`")]
    UnknownComponentType { component_type: ComponentType },

    /// An event handler failed.
    #[error("event handler of component {id} failed: {source}")]
    Handler {
        id: ComponentId,
        #[source]
        source: ComponentError,
    },

    /// A single pass rendered more components than allowed.
    #[error("render pass exceeded {limit} component renders")]
    RenderLoopLimit { limit: usize },
}

impl RenderError {
    /// Whether the error aborted a whole render pass.
    pub fn aborts_pass(&self) -> bool {
        matches!(
            self,
            Self::Build(_) | Self::Diff(_) | Self::RenderLoopLimit { .. }
        )
    }
}
