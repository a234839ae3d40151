#![forbid(unsafe_code)]

//! Renderer host: owns the component table and drives render passes.
//!
//! The [`Renderer`] keeps every [`ComponentState`] in an index-addressed
//! table; a component's id is its slot, and parent links are plain ids into
//! the same table. The caller decides *when* a component re-renders and
//! calls [`Renderer::render_component`]; the renderer then completes the
//! pass:
//!
//! 1. Render the requested component.
//! 2. Render every child component its diff reports, in queue order, after
//!    binding the child's parameters from the parent's component frame.
//! 3. Dispose every component whose frames were removed, recursively.
//! 4. Run after-render hooks for each rendered component.
//! 5. Hand out the finished [`RenderBatch`].
//!
//! A failure in steps 1 or 2 aborts the pass: every component rendered so
//! far has its buffers restored, children instantiated by the pass are
//! dropped, children bound during the pass get their parameters again from
//! the restored parent output, and no batch is produced.
//!
//! # Example
//!
//! ```ignore
//! let mut registry = ComponentRegistry::new();
//! registry.register(ComponentType::new("Counter"), || Box::new(Counter::default()));
//! let mut renderer = Renderer::new(RendererConfig::default(), registry);
//! let root = renderer.attach_root(ComponentType::new("Counter"))?;
//! let batch = renderer.render_component(root)?;
//! surface.apply_batch(&batch)?;
//! ```

use std::collections::{HashMap, VecDeque};

use rtree_core::{ComponentId, ComponentType, EventHandlerId, ParameterCollection};
use rtree_render::{
    ChildComponentHost, DiffConfig, DiffError, RenderBatch, RenderBatchBuilder,
};
use tracing::{debug, debug_span, warn};

use crate::component::{Component, ComponentFactory, UiEvent};
use crate::component_state::ComponentState;
use crate::debug_trace;
use crate::error::RenderError;

/// Default bound on component renders within one pass.
pub const DEFAULT_MAX_RENDERS_PER_PASS: usize = 10_000;

/// Configuration for the renderer host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererConfig {
    /// Diff engine configuration used for every component.
    pub diff: DiffConfig,
    /// Upper bound on component renders in one pass.
    pub max_renders_per_pass: usize,
    /// Run after-render hooks once a pass completes.
    pub notify_after_render: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            diff: DiffConfig::default(),
            max_renders_per_pass: DEFAULT_MAX_RENDERS_PER_PASS,
            notify_after_render: true,
        }
    }
}

impl RendererConfig {
    /// Set the diff configuration.
    #[must_use]
    pub fn with_diff(mut self, diff: DiffConfig) -> Self {
        self.diff = diff;
        self
    }

    /// Set the per-pass render bound.
    #[must_use]
    pub fn with_max_renders_per_pass(mut self, limit: usize) -> Self {
        self.max_renders_per_pass = limit;
        self
    }

    /// Enable or disable after-render hooks.
    #[must_use]
    pub fn with_notify_after_render(mut self, enabled: bool) -> Self {
        self.notify_after_render = enabled;
        self
    }
}

/// Maps component types to factories.
#[derive(Default)]
pub struct ComponentRegistry {
    factories: HashMap<ComponentType, ComponentFactory>,
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the factory for `component_type`.
    pub fn register<F>(&mut self, component_type: ComponentType, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Component> + 'static,
    {
        self.factories.insert(component_type, Box::new(factory));
        self
    }

    pub fn contains(&self, component_type: ComponentType) -> bool {
        self.factories.contains_key(&component_type)
    }

    fn create(&self, component_type: ComponentType) -> Option<Box<dyn Component>> {
        self.factories.get(&component_type).map(|factory| factory())
    }
}

/// Child host for one component render: creates states for new children.
struct PassHost<'a> {
    registry: &'a ComponentRegistry,
    next_id: &'a mut u32,
    created: Vec<ComponentState>,
}

impl ChildComponentHost for PassHost<'_> {
    fn instantiate_child(
        &mut self,
        parent: ComponentId,
        component_type: ComponentType,
    ) -> Result<ComponentId, DiffError> {
        let component =
            self.registry
                .create(component_type)
                .ok_or_else(|| DiffError::ChildInstantiation {
                    component_type,
                    reason: "no factory registered".into(),
                })?;
        let id = ComponentId(*self.next_id);
        *self.next_id += 1;
        self.created
            .push(ComponentState::new(id, Some(parent), component));
        Ok(id)
    }
}

/// Where a queued child takes its parameters from.
#[derive(Debug, Clone, Copy)]
struct Binding {
    parent: ComponentId,
    frame_index: usize,
}

/// Bookkeeping for one pass, used to roll back on failure.
#[derive(Debug, Default)]
struct PassLog {
    rendered: Vec<ComponentId>,
    created: Vec<ComponentId>,
    removed: Vec<ComponentId>,
    bound: Vec<(ComponentId, Binding)>,
}

/// Owns component states and produces one batch per render pass.
pub struct Renderer {
    config: RendererConfig,
    registry: ComponentRegistry,
    slots: Vec<Option<ComponentState>>,
    next_id: u32,
    passes: u64,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("config", &self.config)
            .field("components", &self.component_count())
            .field("passes", &self.passes)
            .finish_non_exhaustive()
    }
}

impl Renderer {
    pub fn new(config: RendererConfig, registry: ComponentRegistry) -> Self {
        Self {
            config,
            registry,
            slots: Vec::new(),
            next_id: 1,
            passes: 0,
        }
    }

    #[inline]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Instantiate a registered component type as a root.
    pub fn attach_root(&mut self, component_type: ComponentType) -> Result<ComponentId, RenderError> {
        let component = self
            .registry
            .create(component_type)
            .ok_or(RenderError::UnknownComponentType { component_type })?;
        Ok(self.attach_root_component(component))
    }

    /// Attach an already constructed component as a root.
    pub fn attach_root_component(&mut self, component: Box<dyn Component>) -> ComponentId {
        let id = ComponentId(self.next_id);
        self.next_id += 1;
        self.insert(ComponentState::new(id, None, component));
        debug!(component = id.id(), "root attached");
        id
    }

    /// Component state by id, disposed or not.
    pub fn state(&self, id: ComponentId) -> Option<&ComponentState> {
        self.slots.get(slot_index(id)).and_then(Option::as_ref)
    }

    /// Non-owning parent link of a component.
    pub fn parent_of(&self, id: ComponentId) -> Option<ComponentId> {
        self.state(id).and_then(ComponentState::parent)
    }

    /// Whether `id` names a live (not disposed) component.
    pub fn is_live(&self, id: ComponentId) -> bool {
        self.state(id).is_some_and(|s| !s.is_disposed())
    }

    /// Number of component states held, including disposed ones.
    pub fn component_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Drop the states of disposed components. Their ids become unknown.
    pub fn prune_disposed(&mut self) -> usize {
        let mut pruned = 0;
        for slot in &mut self.slots {
            if slot.as_ref().is_some_and(ComponentState::is_disposed) {
                *slot = None;
                pruned += 1;
            }
        }
        pruned
    }

    /// Render `id` and every child component its output requires.
    ///
    /// Rendering a disposed component yields an empty batch.
    pub fn render_component(&mut self, id: ComponentId) -> Result<RenderBatch, RenderError> {
        let span = debug_span!("render_pass", root = id.id(), pass = self.passes);
        let _guard = span.enter();

        let state = self.state(id).ok_or(RenderError::UnknownComponent { id })?;
        if state.is_disposed() {
            debug!(component = id.id(), "render requested for disposed component");
            return Ok(RenderBatch::default());
        }

        let mut batch = RenderBatchBuilder::new();
        let mut log = PassLog::default();
        if let Err(err) = self.render_queue(id, &mut batch, &mut log) {
            warn!(root = id.id(), error = %err, "render pass aborted");
            self.roll_back(&log);
            return Err(err);
        }

        self.dispose_all(&log.removed, &mut batch);

        if self.config.notify_after_render {
            for &rendered in &log.rendered {
                if let Some(state) = self.state_mut(rendered) {
                    state.notify_render_completed();
                }
            }
        }

        self.passes += 1;
        let batch = batch.finish();
        debug!(
            rendered = log.rendered.len(),
            edits = batch.total_edits(),
            disposed = batch.disposed_components().len(),
            "render pass finished"
        );
        debug_trace!(
            PASS,
            "root={} rendered={} edits={} disposed={}",
            id,
            log.rendered.len(),
            batch.total_edits(),
            batch.disposed_components().len()
        );
        Ok(batch)
    }

    fn render_queue(
        &mut self,
        root: ComponentId,
        batch: &mut RenderBatchBuilder,
        log: &mut PassLog,
    ) -> Result<(), RenderError> {
        let limit = self.config.max_renders_per_pass;
        let mut queue: VecDeque<(ComponentId, Option<Binding>)> = VecDeque::from([(root, None)]);

        while let Some((id, binding)) = queue.pop_front() {
            if log.rendered.len() >= limit {
                return Err(RenderError::RenderLoopLimit { limit });
            }
            if let Some(binding) = binding {
                self.bind_parameters(id, binding)?;
                log.bound.push((id, binding));
            }

            let Self {
                config,
                registry,
                slots,
                next_id,
                ..
            } = &mut *self;
            let state = slots
                .get_mut(slot_index(id))
                .and_then(Option::as_mut)
                .ok_or(RenderError::UnknownComponent { id })?;
            let mut host = PassHost {
                registry,
                next_id,
                created: Vec::new(),
            };
            let outcome = state.render(batch, &mut host, &config.diff)?;
            log.rendered.push(id);

            for child in host.created {
                log.created.push(child.id());
                self.insert(child);
            }
            log.removed.extend(outcome.removed);
            queue.extend(outcome.children.into_iter().map(|child| {
                (
                    child.component_id,
                    Some(Binding {
                        parent: id,
                        frame_index: child.frame_index,
                    }),
                )
            }));
        }
        Ok(())
    }

    /// Hand a child the attributes of its component frame in the parent.
    fn bind_parameters(&mut self, child: ComponentId, binding: Binding) -> Result<(), RenderError> {
        let index = slot_index(child);
        let mut state = self
            .slots
            .get_mut(index)
            .and_then(Option::take)
            .ok_or(RenderError::UnknownComponent { id: child })?;
        if let Some(parent) = self.state(binding.parent) {
            state.set_parameters(ParameterCollection::new(
                parent.current_frames(),
                binding.frame_index,
            ));
        }
        self.slots[index] = Some(state);
        Ok(())
    }

    fn roll_back(&mut self, log: &PassLog) {
        debug_trace!(
            ROLLBACK,
            "reverting rendered={} created={} rebinding={}",
            log.rendered.len(),
            log.created.len(),
            log.bound.len()
        );
        for &id in &log.rendered {
            if let Some(state) = self.state_mut(id) {
                state.revert_render();
            }
        }
        for &id in &log.created {
            if let Some(slot) = self.slots.get_mut(slot_index(id)) {
                *slot = None;
            }
        }
        // Surviving children saw parameters from the aborted output.
        for &(child, binding) in &log.bound {
            if self.state(child).is_none() {
                continue;
            }
            let restored = self.state(binding.parent).and_then(|parent| {
                parent
                    .current_frames()
                    .iter()
                    .position(|frame| frame.component_id() == Some(child))
            });
            match restored {
                Some(frame_index) => {
                    let binding = Binding {
                        parent: binding.parent,
                        frame_index,
                    };
                    if let Err(err) = self.bind_parameters(child, binding) {
                        warn!(component = child.id(), error = %err, "rebind after rollback failed");
                    }
                }
                None => debug!(
                    component = child.id(),
                    parent = binding.parent.id(),
                    "no restored frame to rebind"
                ),
            }
        }
    }

    fn dispose_all(&mut self, removed: &[ComponentId], batch: &mut RenderBatchBuilder) {
        let mut pending: Vec<ComponentId> = removed.to_vec();
        while let Some(id) = pending.pop() {
            match self.state_mut(id) {
                Some(state) => {
                    debug_trace!(DISPOSE, "component={} type={}", id, state.type_name());
                    pending.extend(state.dispose_in_batch(batch));
                }
                None => warn!(component = id.id(), "disposal requested for unknown component"),
            }
        }
    }

    /// Deliver an event to one component's handler.
    ///
    /// The component is not re-rendered; call [`Self::render_component`]
    /// when its output should reflect the event.
    pub fn dispatch_event(
        &mut self,
        id: ComponentId,
        handler: EventHandlerId,
        event: &UiEvent,
    ) -> Result<(), RenderError> {
        let state = self
            .state_mut(id)
            .ok_or(RenderError::UnknownComponent { id })?;
        debug_trace!(DISPATCH, "component={} handler={} kind={}", id, handler.0, event.kind);
        state.dispatch_event(handler, event)
    }

    fn state_mut(&mut self, id: ComponentId) -> Option<&mut ComponentState> {
        self.slots.get_mut(slot_index(id)).and_then(Option::as_mut)
    }

    fn insert(&mut self, state: ComponentState) {
        let index = slot_index(state.id());
        if self.slots.len() <= index {
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index] = Some(state);
    }
}

#[inline]
fn slot_index(id: ComponentId) -> usize {
    id.id() as usize
}
