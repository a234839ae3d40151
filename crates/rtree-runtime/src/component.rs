#![forbid(unsafe_code)]

//! The component contract.
//!
//! A [`Component`] turns its parameters and internal state into frames.
//! Optional behaviours (events, teardown, after-render notification) are
//! declared once through [`Component::capabilities`]; the runtime caches
//! the set when the component state is constructed and consults only the
//! cached flags afterwards.

use bitflags::bitflags;
use rtree_core::{EventHandlerId, ParameterCollection, RenderTreeBuilder, TreeError};

use crate::error::ComponentError;

bitflags! {
    /// Optional behaviours a component opts into.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capabilities: u8 {
        /// Receives events through [`Component::handle_event`].
        const HANDLE_EVENT = 0b001;
        /// Runs [`Component::dispose`] when removed.
        const DISPOSE      = 0b010;
        /// Runs [`Component::on_after_render`] once a pass completes.
        const AFTER_RENDER = 0b100;
    }
}

/// Event payload delivered to a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiEvent {
    /// Event kind, e.g. `"click"` or `"input"`.
    pub kind: String,
    /// Optional payload such as the new value of an input.
    pub data: Option<String>,
}

impl UiEvent {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            data: None,
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }
}

/// A unit of UI that renders into a [`RenderTreeBuilder`].
pub trait Component {
    /// Name used in errors and logs.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Optional behaviours. Queried once, at construction.
    fn capabilities(&self) -> Capabilities {
        Capabilities::empty()
    }

    /// Receive the parameters bound by the parent's component frame.
    fn set_parameters(&mut self, params: ParameterCollection<'_>) {
        let _ = params;
    }

    /// Produce this component's frames.
    fn render(&mut self, builder: &mut RenderTreeBuilder) -> Result<(), TreeError>;

    /// Run the handler identified by `handler`.
    fn handle_event(&mut self, handler: EventHandlerId, event: &UiEvent) -> Result<(), ComponentError> {
        let _ = (handler, event);
        Ok(())
    }

    /// Release resources held by the component.
    fn dispose(&mut self) -> Result<(), ComponentError> {
        Ok(())
    }

    fn on_after_render(&mut self) {}
}

/// Boxed constructor for a component type.
pub type ComponentFactory = Box<dyn Fn() -> Box<dyn Component>>;
