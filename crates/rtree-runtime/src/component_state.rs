#![forbid(unsafe_code)]

//! Per-instance render state.
//!
//! [`ComponentState`] owns a component, its two render buffers and its
//! lifecycle flag. One render swaps the buffers (the last output becomes the
//! diff baseline), clears the new current buffer, lets the component fill
//! it, diffs, and appends the diff to the pass's batch.
//!
//! # Lifecycle
//!
//! `Active` → `Disposed`, one way. A disposed state renders nothing and
//! rejects events with [`RenderError::ComponentDisposed`].

use rtree_core::{
    AttributeValue, ComponentId, EventHandlerId, Frame, ParameterCollection, RenderTreeBuilder,
    TreeError,
};
use rtree_render::{
    ChildComponentHost, ChildRender, DiffConfig, RenderBatchBuilder, TeardownFailure,
    compute_diff,
};
use tracing::{debug, trace, warn};

use crate::component::{Capabilities, Component, UiEvent};
use crate::error::RenderError;

/// Two render buffers whose roles flip on every render.
///
/// Swapping flips an index; neither buffer is moved or reallocated.
#[derive(Debug, Default)]
pub struct RenderBuffers {
    slots: [RenderTreeBuilder; 2],
    current: usize,
}

impl RenderBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the current buffer the previous one and vice versa.
    #[inline]
    pub fn swap(&mut self) {
        self.current ^= 1;
    }

    #[inline]
    pub fn current(&self) -> &RenderTreeBuilder {
        &self.slots[self.current]
    }

    #[inline]
    pub fn current_mut(&mut self) -> &mut RenderTreeBuilder {
        &mut self.slots[self.current]
    }

    #[inline]
    pub fn previous(&self) -> &RenderTreeBuilder {
        &self.slots[self.current ^ 1]
    }

    /// Previous buffer for reading next to the current one for writing.
    pub fn split_mut(&mut self) -> (&RenderTreeBuilder, &mut RenderTreeBuilder) {
        let [a, b] = &mut self.slots;
        if self.current == 0 { (&*b, a) } else { (&*a, b) }
    }

    /// Empty both buffers.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.clear();
        }
    }
}

/// Result of one successful render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOutcome {
    /// Child components to render next, in frame order.
    pub children: Vec<ChildRender>,
    /// Child components whose frames disappeared; the caller disposes them.
    pub removed: Vec<ComponentId>,
}

/// A live component instance and its render buffers.
pub struct ComponentState {
    id: ComponentId,
    parent: Option<ComponentId>,
    component: Box<dyn Component>,
    capabilities: Capabilities,
    type_name: &'static str,
    buffers: RenderBuffers,
    disposed: bool,
    render_count: u64,
}

impl std::fmt::Debug for ComponentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentState")
            .field("id", &self.id)
            .field("parent", &self.parent)
            .field("type_name", &self.type_name)
            .field("capabilities", &self.capabilities)
            .field("disposed", &self.disposed)
            .field("render_count", &self.render_count)
            .finish_non_exhaustive()
    }
}

impl ComponentState {
    pub fn new(id: ComponentId, parent: Option<ComponentId>, component: Box<dyn Component>) -> Self {
        let capabilities = component.capabilities();
        let type_name = component.type_name();
        Self {
            id,
            parent,
            component,
            capabilities,
            type_name,
            buffers: RenderBuffers::new(),
            disposed: false,
            render_count: 0,
        }
    }

    #[inline]
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Non-owning link to the parent component, if any.
    #[inline]
    pub fn parent(&self) -> Option<ComponentId> {
        self.parent
    }

    #[inline]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    #[inline]
    pub fn render_count(&self) -> u64 {
        self.render_count
    }

    /// Frames of the last successful render.
    pub fn current_frames(&self) -> &[Frame] {
        self.buffers.current().frames().unwrap_or_default()
    }

    /// Frames of the render before that.
    pub fn previous_frames(&self) -> &[Frame] {
        self.buffers.previous().frames().unwrap_or_default()
    }

    /// Forward parameters bound by the parent.
    pub fn set_parameters(&mut self, params: ParameterCollection<'_>) {
        if !self.disposed {
            self.component.set_parameters(params);
        }
    }

    /// Render the component itself into `batch`.
    pub fn render<H: ChildComponentHost + ?Sized>(
        &mut self,
        batch: &mut RenderBatchBuilder,
        host: &mut H,
        config: &DiffConfig,
    ) -> Result<RenderOutcome, RenderError> {
        self.render_with(batch, host, config, |component, builder| {
            component.render(builder)
        })
    }

    /// Render with caller-supplied render logic instead of the component's
    /// own [`Component::render`].
    ///
    /// A no-op returning an empty outcome when disposed. On failure the
    /// buffers are restored, so the last good output stays the baseline, and
    /// nothing is appended to `batch`.
    pub fn render_into_batch<H, F>(
        &mut self,
        batch: &mut RenderBatchBuilder,
        host: &mut H,
        config: &DiffConfig,
        render_logic: F,
    ) -> Result<RenderOutcome, RenderError>
    where
        H: ChildComponentHost + ?Sized,
        F: FnOnce(&mut RenderTreeBuilder) -> Result<(), TreeError>,
    {
        self.render_with(batch, host, config, |_, builder| render_logic(builder))
    }

    fn render_with<H, F>(
        &mut self,
        batch: &mut RenderBatchBuilder,
        host: &mut H,
        config: &DiffConfig,
        render_logic: F,
    ) -> Result<RenderOutcome, RenderError>
    where
        H: ChildComponentHost + ?Sized,
        F: FnOnce(&mut dyn Component, &mut RenderTreeBuilder) -> Result<(), TreeError>,
    {
        if self.disposed {
            trace!(component = self.id.id(), "render skipped, component disposed");
            return Ok(RenderOutcome::default());
        }

        self.buffers.swap();
        self.buffers.current_mut().clear();

        let result = render_logic(self.component.as_mut(), self.buffers.current_mut())
            .map_err(RenderError::from)
            .and_then(|()| {
                let (previous, current) = self.buffers.split_mut();
                let previous = previous.frames()?;
                let current = current.frames_mut()?;
                Ok(compute_diff(host, config, self.id, previous, current)?)
            });

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                self.buffers.swap();
                debug!(component = self.id.id(), error = %err, "render failed, buffers restored");
                return Err(err);
            }
        };

        self.render_count += 1;
        trace!(
            component = self.id.id(),
            edits = outcome.diff.len(),
            children = outcome.children.len(),
            "component rendered"
        );

        batch.record_disposed_handlers(outcome.disposed_handlers);
        batch.append_diff(outcome.diff);
        Ok(RenderOutcome {
            children: outcome.children,
            removed: outcome.disposed_components,
        })
    }

    /// Undo the buffer swap of the last successful render.
    ///
    /// Used when a later step of the same pass fails and the pass's batch is
    /// discarded.
    pub(crate) fn revert_render(&mut self) {
        self.buffers.swap();
        self.render_count = self.render_count.saturating_sub(1);
    }

    /// Dispose this component into `batch`.
    ///
    /// Returns the child components found in the current output; the caller
    /// disposes those in turn. A teardown failure is recorded in the batch
    /// and does not stop disposal. Disposing twice returns nothing.
    pub fn dispose_in_batch(&mut self, batch: &mut RenderBatchBuilder) -> Vec<ComponentId> {
        if self.disposed {
            return Vec::new();
        }
        self.disposed = true;
        batch.record_disposed_component(self.id);

        if self.capabilities.contains(Capabilities::DISPOSE) {
            if let Err(err) = self.component.dispose() {
                warn!(
                    component = self.id.id(),
                    component_type = self.type_name,
                    error = %err,
                    "teardown failed"
                );
                batch.record_teardown_failure(TeardownFailure {
                    component_id: self.id,
                    type_name: self.type_name,
                    message: err.to_string(),
                });
            }
        }

        let mut children = Vec::new();
        for frame in self.current_frames() {
            match frame {
                Frame::Component {
                    component_id: Some(id),
                    ..
                } => children.push(*id),
                Frame::Attribute {
                    value: AttributeValue::Handler(handler),
                    ..
                } => batch.record_disposed_handler(*handler),
                _ => {}
            }
        }
        self.buffers.clear();

        debug!(
            component = self.id.id(),
            children = children.len(),
            "component disposed"
        );
        children
    }

    /// Deliver an event to the component.
    pub fn dispatch_event(&mut self, handler: EventHandlerId, event: &UiEvent) -> Result<(), RenderError> {
        if self.disposed {
            return Err(RenderError::ComponentDisposed { id: self.id });
        }
        if !self.capabilities.contains(Capabilities::HANDLE_EVENT) {
            return Err(RenderError::EventDispatchUnsupported {
                component_type: self.type_name,
            });
        }
        self.component
            .handle_event(handler, event)
            .map_err(|source| RenderError::Handler {
                id: self.id,
                source,
            })
    }

    /// Run the after-render hook, if the component has one.
    pub fn notify_render_completed(&mut self) {
        if !self.disposed && self.capabilities.contains(Capabilities::AFTER_RENDER) {
            self.component.on_after_render();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::error::ComponentError;
    use rtree_core::ComponentType;
    use rtree_render::{DiffError, RenderTreeEdit, TreePath};

    struct NoChildren;

    impl ChildComponentHost for NoChildren {
        fn instantiate_child(
            &mut self,
            _parent: ComponentId,
            component_type: ComponentType,
        ) -> Result<ComponentId, DiffError> {
            Err(DiffError::ChildInstantiation {
                component_type,
                reason: "no children in this test".into(),
            })
        }
    }

    /// Shared log of hook calls.
    type Log = Rc<RefCell<Vec<String>>>;

    struct Greeter {
        text: String,
        caps: Capabilities,
        fail_dispose: bool,
        log: Log,
    }

    impl Greeter {
        fn new(caps: Capabilities, log: &Log) -> Self {
            Self {
                text: "hi".into(),
                caps,
                fail_dispose: false,
                log: Rc::clone(log),
            }
        }
    }

    impl Component for Greeter {
        fn type_name(&self) -> &'static str {
            "Greeter"
        }

        fn capabilities(&self) -> Capabilities {
            self.caps
        }

        fn render(&mut self, b: &mut RenderTreeBuilder) -> Result<(), TreeError> {
            b.open_element("button");
            b.add_attribute("onclick", EventHandlerId(7))?;
            b.add_text(self.text.as_str());
            b.close_element()
        }

        fn handle_event(&mut self, handler: EventHandlerId, event: &UiEvent) -> Result<(), ComponentError> {
            self.log.borrow_mut().push(format!("{}:{}", handler.0, event.kind));
            self.text = "bye".into();
            Ok(())
        }

        fn dispose(&mut self) -> Result<(), ComponentError> {
            self.log.borrow_mut().push("dispose".into());
            if self.fail_dispose {
                return Err(ComponentError::new("timer already stopped"));
            }
            Ok(())
        }

        fn on_after_render(&mut self) {
            self.log.borrow_mut().push("after_render".into());
        }
    }

    fn state(caps: Capabilities, log: &Log) -> ComponentState {
        ComponentState::new(ComponentId(1), None, Box::new(Greeter::new(caps, log)))
    }

    #[test]
    fn buffers_swap_by_index() {
        let mut buffers = RenderBuffers::new();
        buffers.current_mut().add_text("a");
        buffers.swap();
        assert!(buffers.current().is_empty());
        assert_eq!(buffers.previous().len(), 1);
        let (previous, current) = buffers.split_mut();
        assert_eq!(previous.len(), 1);
        current.add_text("b");
        buffers.swap();
        assert_eq!(buffers.current().frames().unwrap(), &[Frame::text("a")]);
        assert_eq!(buffers.previous().frames().unwrap(), &[Frame::text("b")]);
    }

    #[test]
    fn first_render_inserts_then_event_updates_text() {
        let log = Log::default();
        let mut s = state(Capabilities::HANDLE_EVENT, &log);
        let config = DiffConfig::default();

        let mut batch = RenderBatchBuilder::new();
        s.render(&mut batch, &mut NoChildren, &config).unwrap();
        let batch = batch.finish();
        assert!(matches!(
            batch.updated_components()[0].edits(),
            [RenderTreeEdit::InsertSubtree { .. }]
        ));

        s.dispatch_event(EventHandlerId(7), &UiEvent::new("click")).unwrap();
        assert_eq!(log.borrow().as_slice(), ["7:click"]);

        let mut batch = RenderBatchBuilder::new();
        s.render(&mut batch, &mut NoChildren, &config).unwrap();
        let batch = batch.finish();
        assert_eq!(
            batch.updated_components()[0].edits(),
            &[RenderTreeEdit::SetText {
                at: TreePath::from([0, 0]),
                text: "bye".into()
            }]
        );
        assert_eq!(s.render_count(), 2);
    }

    #[test]
    fn dispatch_without_capability_names_type() {
        let log = Log::default();
        let mut s = state(Capabilities::empty(), &log);
        let err = s
            .dispatch_event(EventHandlerId(7), &UiEvent::new("click"))
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::EventDispatchUnsupported {
                component_type: "Greeter"
            }
        ));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn disposed_state_is_inert() {
        let log = Log::default();
        let mut s = state(Capabilities::all(), &log);
        let config = DiffConfig::default();
        s.render(&mut RenderBatchBuilder::new(), &mut NoChildren, &config)
            .unwrap();

        let mut batch = RenderBatchBuilder::new();
        assert!(s.dispose_in_batch(&mut batch).is_empty());
        let batch = batch.finish();
        assert_eq!(batch.disposed_components(), &[ComponentId(1)]);
        assert_eq!(batch.disposed_handlers(), &[EventHandlerId(7)]);
        assert!(s.is_disposed());

        let mut batch = RenderBatchBuilder::new();
        let outcome = s.render(&mut batch, &mut NoChildren, &config).unwrap();
        assert_eq!(outcome, RenderOutcome::default());
        assert!(batch.finish().updated_components().is_empty());

        let err = s
            .dispatch_event(EventHandlerId(7), &UiEvent::new("click"))
            .unwrap_err();
        assert!(matches!(err, RenderError::ComponentDisposed { id: ComponentId(1) }));
        s.notify_render_completed();
        assert_eq!(log.borrow().as_slice(), ["dispose"]);
    }

    #[test]
    fn teardown_failure_is_recorded_not_propagated() {
        let log = Log::default();
        let mut greeter = Greeter::new(Capabilities::DISPOSE, &log);
        greeter.fail_dispose = true;
        let mut s = ComponentState::new(ComponentId(3), Some(ComponentId(1)), Box::new(greeter));

        let mut batch = RenderBatchBuilder::new();
        s.dispose_in_batch(&mut batch);
        let batch = batch.finish();
        assert_eq!(batch.disposed_components(), &[ComponentId(3)]);
        assert_eq!(batch.teardown_failures().len(), 1);
        assert_eq!(batch.teardown_failures()[0].type_name, "Greeter");
        assert_eq!(batch.teardown_failures()[0].message, "timer already stopped");
        assert_eq!(s.parent(), Some(ComponentId(1)));
    }

    #[test]
    fn dispose_without_capability_skips_hook() {
        let log = Log::default();
        let mut s = state(Capabilities::empty(), &log);
        s.dispose_in_batch(&mut RenderBatchBuilder::new());
        assert!(log.borrow().is_empty());
        assert!(s.dispose_in_batch(&mut RenderBatchBuilder::new()).is_empty());
    }

    #[test]
    fn after_render_hook_respects_capability() {
        let log = Log::default();
        state(Capabilities::empty(), &log).notify_render_completed();
        assert!(log.borrow().is_empty());
        state(Capabilities::AFTER_RENDER, &log).notify_render_completed();
        assert_eq!(log.borrow().as_slice(), ["after_render"]);
    }

    #[test]
    fn failed_render_keeps_last_output() {
        let log = Log::default();
        let mut s = state(Capabilities::empty(), &log);
        let config = DiffConfig::default();
        s.render(&mut RenderBatchBuilder::new(), &mut NoChildren, &config)
            .unwrap();
        let good = s.current_frames().to_vec();

        let mut batch = RenderBatchBuilder::new();
        let err = s
            .render_into_batch(&mut batch, &mut NoChildren, &config, |b| {
                b.open_element("div");
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, RenderError::Build(TreeError::UnclosedFrames { .. })));
        assert_eq!(batch.diff_count(), 0);
        assert_eq!(s.current_frames(), good.as_slice());

        // The next render diffs against the last good output.
        let mut batch = RenderBatchBuilder::new();
        s.render(&mut batch, &mut NoChildren, &config).unwrap();
        assert!(batch.finish().updated_components()[0].is_empty());
    }

    #[test]
    fn custom_render_logic_is_diffed() {
        let log = Log::default();
        let mut s = state(Capabilities::empty(), &log);
        let config = DiffConfig::default();
        let mut batch = RenderBatchBuilder::new();
        s.render_into_batch(&mut batch, &mut NoChildren, &config, |b| {
            b.add_text("A");
            b.add_text("B");
            b.add_text("C");
            Ok(())
        })
        .unwrap();
        let mut batch = RenderBatchBuilder::new();
        s.render_into_batch(&mut batch, &mut NoChildren, &config, |b| {
            b.add_text("A");
            b.add_text("C");
            Ok(())
        })
        .unwrap();
        assert_eq!(
            batch.finish().updated_components()[0].edits(),
            &[RenderTreeEdit::RemoveSubtree {
                at: TreePath::from([1])
            }]
        );
    }
}
