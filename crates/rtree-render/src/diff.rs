#![forbid(unsafe_code)]

//! Diff computation between render trees.
//!
//! [`compute_diff`] compares the previous and current frame sequences of one
//! component and produces the ordered [`RenderTreeEdit`]s that turn the
//! previous visible tree into the current one.
//!
//! # Algorithm
//!
//! Both sequences are validated first; a malformed sequence aborts the diff.
//! Then, per sibling run (starting at the component's root list):
//!
//! 1. Collect the visible siblings of each side. Regions are transparent:
//!    stepping into a region's first descendant keeps the walk flat.
//! 2. Match keyed siblings by key (one hash lookup each).
//! 3. Match unkeyed leftovers in order with a one-step lookahead, so a single
//!    removed or inserted sibling does not shift every following pair.
//! 4. Emit removals (ascending, offset by earlier removals), then walk the
//!    current siblings left to right emitting moves, insertions, and the
//!    recursive diff of each matched pair.
//!
//! Matched elements get a name-keyed attribute diff; matched text nodes get
//! `SetText` when their content changed; matched child components are bound
//! to the same instance and reported for their own render. Child components
//! are never diffed inline: each one owns its own buffers.
//!
//! # Complexity
//!
//! Linear in the number of frames visited, plus one hash lookup per keyed
//! frame. Moves cost a shift of the live sibling list each. No general
//! tree-edit-distance search is attempted.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::ops::Range;

use rtree_core::{
    AttributeValue, ComponentId, ComponentType, EventHandlerId, Frame, FrameKey, FrameType,
    ParameterEnumerator, TreeError, validate_frames,
};
use rtree_core::{debug_span, trace, warn};

use crate::edit::{RenderTreeDiff, RenderTreeEdit, TreePath};

/// Failure while diffing one component.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    /// A frame sequence violates its structural invariants.
    #[error("malformed render tree: {0}")]
    Malformed(#[from] TreeError),

    /// Two siblings share a structural key under [`DuplicateKeyPolicy::Reject`].
    #[error("duplicate structural key `{key}` among siblings (frame {index})")]
    DuplicateKey { key: String, index: usize },

    /// The host could not create a child component.
    #[error("failed to instantiate child component `{component_type}`: {reason}")]
    ChildInstantiation {
        component_type: ComponentType,
        reason: String,
    },
}

/// Creates child component instances for newly inserted component frames.
pub trait ChildComponentHost {
    fn instantiate_child(
        &mut self,
        parent: ComponentId,
        component_type: ComponentType,
    ) -> Result<ComponentId, DiffError>;
}

/// What to do when siblings share a structural key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateKeyPolicy {
    /// Keep the first keyed sibling; later duplicates are matched as if
    /// unkeyed.
    #[default]
    Positional,
    /// Abort the diff with [`DiffError::DuplicateKey`].
    Reject,
}

/// Diff engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffConfig {
    /// Look one sibling ahead when unkeyed siblings differ, so that a single
    /// insertion or removal is reported as such.
    pub unkeyed_lookahead: bool,
    /// Handling of duplicate structural keys within one sibling run.
    pub duplicate_keys: DuplicateKeyPolicy,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            unkeyed_lookahead: true,
            duplicate_keys: DuplicateKeyPolicy::Positional,
        }
    }
}

impl DiffConfig {
    /// Config that rejects duplicate keys.
    pub fn strict() -> Self {
        Self {
            duplicate_keys: DuplicateKeyPolicy::Reject,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_unkeyed_lookahead(mut self, enabled: bool) -> Self {
        self.unkeyed_lookahead = enabled;
        self
    }

    #[must_use]
    pub fn with_duplicate_keys(mut self, policy: DuplicateKeyPolicy) -> Self {
        self.duplicate_keys = policy;
        self
    }
}

/// A child component that must be rendered in the current pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildRender {
    pub component_id: ComponentId,
    /// Index of the child's component frame in the parent's current frames;
    /// its attribute run holds the child's parameters.
    pub frame_index: usize,
    /// Whether the child was instantiated by this diff.
    pub is_new: bool,
}

/// Everything one diff produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOutcome {
    pub diff: RenderTreeDiff,
    /// Child components whose frames were removed.
    pub disposed_components: Vec<ComponentId>,
    /// Event handlers that were removed or replaced.
    pub disposed_handlers: Vec<EventHandlerId>,
    /// Child components to render next, in frame order.
    pub children: Vec<ChildRender>,
}

/// Compute the edits turning `previous` into `current` for one component.
///
/// Component frames in `current` are bound to child instances: matched
/// frames inherit the previous instance, inserted frames get a new one from
/// `host`.
pub fn compute_diff<H: ChildComponentHost + ?Sized>(
    host: &mut H,
    config: &DiffConfig,
    component_id: ComponentId,
    previous: &[Frame],
    current: &mut [Frame],
) -> Result<DiffOutcome, DiffError> {
    let span = debug_span!(
        "diff_compute",
        component = component_id.id(),
        previous = previous.len(),
        current = current.len()
    );
    let _guard = span.enter();

    validate_frames(previous)?;
    validate_frames(current)?;

    let previous_len = previous.len();
    let current_len = current.len();
    let mut ctx = DiffContext {
        host,
        config,
        component_id,
        prev: previous,
        curr: current,
        edits: Vec::new(),
        disposed_components: Vec::new(),
        disposed_handlers: Vec::new(),
        children: Vec::new(),
    };
    ctx.diff_siblings(&TreePath::root(), 0..previous_len, 0..current_len)?;

    trace!(
        edits = ctx.edits.len(),
        disposed = ctx.disposed_components.len(),
        "diff computed"
    );

    Ok(DiffOutcome {
        diff: RenderTreeDiff::new(component_id, ctx.edits),
        disposed_components: ctx.disposed_components,
        disposed_handlers: ctx.disposed_handlers,
        children: ctx.children,
    })
}

struct DiffContext<'a, H: ?Sized> {
    host: &'a mut H,
    config: &'a DiffConfig,
    component_id: ComponentId,
    prev: &'a [Frame],
    curr: &'a mut [Frame],
    edits: Vec<RenderTreeEdit>,
    disposed_components: Vec<ComponentId>,
    disposed_handlers: Vec<EventHandlerId>,
    children: Vec<ChildRender>,
}

impl<H: ChildComponentHost + ?Sized> DiffContext<'_, H> {
    fn diff_siblings(
        &mut self,
        path: &TreePath,
        prev_range: Range<usize>,
        curr_range: Range<usize>,
    ) -> Result<(), DiffError> {
        let prev = self.prev;
        let mut old = Vec::new();
        visible_siblings(prev, prev_range, &mut old);
        let mut new = Vec::new();
        visible_siblings(self.curr, curr_range, &mut new);

        if old.is_empty() && new.is_empty() {
            return Ok(());
        }

        let policy = self.config.duplicate_keys;
        let old_keyed = keyed_positions(prev, &old, policy)?;
        let new_keyed = keyed_positions(self.curr, &new, policy)?;

        let mut new_to_old: Vec<Option<usize>> = vec![None; new.len()];
        let mut old_matched = vec![false; old.len()];

        // Keyed siblings first.
        if old_keyed.contains(&true) && new_keyed.contains(&true) {
            let mut by_key: HashMap<&FrameKey, usize> = HashMap::new();
            for (pos, &index) in old.iter().enumerate() {
                if old_keyed[pos] {
                    if let Some(key) = prev[index].key() {
                        by_key.insert(key, pos);
                    }
                }
            }
            for (pos, &index) in new.iter().enumerate() {
                if !new_keyed[pos] {
                    continue;
                }
                let Some(key) = self.curr[index].key() else {
                    continue;
                };
                if let Some(&old_pos) = by_key.get(key) {
                    if compatible(&prev[old[old_pos]], &self.curr[index]) {
                        new_to_old[pos] = Some(old_pos);
                        old_matched[old_pos] = true;
                    }
                }
            }
        }

        // Unkeyed leftovers in original order.
        let old_rest: Vec<usize> = (0..old.len()).filter(|&p| !old_keyed[p]).collect();
        let new_rest: Vec<usize> = (0..new.len()).filter(|&p| !new_keyed[p]).collect();
        let (mut x, mut y) = (0, 0);
        while x < old_rest.len() && y < new_rest.len() {
            let (old_pos, new_pos) = (old_rest[x], new_rest[y]);
            let (of, nf) = (old[old_pos], new[new_pos]);

            if !self.same_subtree(of, nf) {
                if self.config.unkeyed_lookahead {
                    if x + 1 < old_rest.len() && self.same_subtree(old[old_rest[x + 1]], nf) {
                        x += 1;
                        continue;
                    }
                    if y + 1 < new_rest.len() && self.same_subtree(of, new[new_rest[y + 1]]) {
                        y += 1;
                        continue;
                    }
                }
                if !compatible(&prev[of], &self.curr[nf]) {
                    x += 1;
                    y += 1;
                    continue;
                }
            }

            new_to_old[new_pos] = Some(old_pos);
            old_matched[old_pos] = true;
            x += 1;
            y += 1;
        }

        // Removals, addressed against the list as it shrinks.
        let mut removed = 0;
        for (pos, &index) in old.iter().enumerate() {
            if !old_matched[pos] {
                self.remove_subtree(path.child(pos - removed), index);
                removed += 1;
            }
        }

        // Survivors in previous order; `None` marks an inserted sibling.
        let mut live: Vec<Option<usize>> = (0..old.len())
            .filter(|&p| old_matched[p])
            .map(Some)
            .collect();

        for (pos, &index) in new.iter().enumerate() {
            match new_to_old[pos] {
                Some(old_pos) => {
                    if live[pos] != Some(old_pos) {
                        let found = live[pos..]
                            .iter()
                            .position(|slot| *slot == Some(old_pos))
                            .map(|offset| pos + offset);
                        debug_assert!(found.is_some(), "matched sibling missing from live list");
                        if let Some(from) = found {
                            let slot = live.remove(from);
                            live.insert(pos, slot);
                            self.edits.push(RenderTreeEdit::MoveSubtree {
                                from: path.child(from),
                                to: path.child(pos),
                            });
                        }
                    }
                    self.diff_pair(&path.child(pos), old[old_pos], index)?;
                }
                None => {
                    self.insert_subtree(path.child(pos), index)?;
                    live.insert(pos, None);
                }
            }
        }

        Ok(())
    }

    fn diff_pair(&mut self, path: &TreePath, of: usize, nf: usize) -> Result<(), DiffError> {
        match self.curr[nf].frame_type() {
            FrameType::Element => {
                self.diff_attributes(path, of, nf);
                let old_children = children_range(self.prev, of);
                let new_children = children_range(self.curr, nf);
                self.diff_siblings(path, old_children, new_children)
            }
            FrameType::Text => {
                if let (Frame::Text { content: old }, Frame::Text { content: new }) =
                    (&self.prev[of], &self.curr[nf])
                {
                    if old != new {
                        self.edits.push(RenderTreeEdit::SetText {
                            at: path.clone(),
                            text: new.clone(),
                        });
                    }
                }
                Ok(())
            }
            FrameType::Component => self.update_component(path, of, nf),
            // Matched markup is equal by construction; the rest are not
            // visible siblings.
            _ => Ok(()),
        }
    }

    fn diff_attributes(&mut self, path: &TreePath, of: usize, nf: usize) {
        let old_attrs = collect_attributes(self.prev, of);
        let curr: &[Frame] = self.curr;
        let new_attrs = collect_attributes(curr, nf);
        if old_attrs.is_empty() && new_attrs.is_empty() {
            return;
        }

        let old_by_name: HashMap<&str, &AttributeValue> = old_attrs.iter().copied().collect();
        for &(name, value) in &new_attrs {
            match old_by_name.get(name) {
                Some(&old) if old == value => {}
                previous => {
                    if let Some(handler) = previous.and_then(|old| old.as_handler()) {
                        self.disposed_handlers.push(handler);
                    }
                    self.edits.push(RenderTreeEdit::SetAttribute {
                        owner: path.clone(),
                        name: name.to_owned(),
                        value: value.clone(),
                    });
                }
            }
        }

        let new_names: HashSet<&str> = new_attrs.iter().map(|&(name, _)| name).collect();
        for &(name, value) in &old_attrs {
            if !new_names.contains(name) {
                if let Some(handler) = value.as_handler() {
                    self.disposed_handlers.push(handler);
                }
                self.edits.push(RenderTreeEdit::RemoveAttribute {
                    owner: path.clone(),
                    name: name.to_owned(),
                });
            }
        }
    }

    fn update_component(&mut self, path: &TreePath, of: usize, nf: usize) -> Result<(), DiffError> {
        let (component_id, is_new) = match self.prev[of].component_id() {
            Some(id) => (id, false),
            None => (self.instantiate(nf)?, true),
        };
        self.curr[nf].bind_component(component_id);

        if is_new || !same_attributes(self.prev, of, self.curr, nf) {
            self.edits.push(RenderTreeEdit::UpdateComponentPlaceholder {
                at: path.clone(),
                component_id,
            });
        }
        self.children.push(ChildRender {
            component_id,
            frame_index: nf,
            is_new,
        });
        Ok(())
    }

    fn insert_subtree(&mut self, at: TreePath, nf: usize) -> Result<(), DiffError> {
        let end = nf + self.curr[nf].subtree_length();
        // Validated input: component frames own only attributes, so every
        // component in range is a child of this component.
        for index in nf..end {
            if self.curr[index].frame_type() == FrameType::Component {
                let component_id = self.instantiate(index)?;
                self.curr[index].bind_component(component_id);
                self.children.push(ChildRender {
                    component_id,
                    frame_index: index,
                    is_new: true,
                });
            }
        }
        self.edits.push(RenderTreeEdit::InsertSubtree {
            at,
            frames: self.curr[nf..end].to_vec(),
        });
        Ok(())
    }

    fn remove_subtree(&mut self, at: TreePath, of: usize) {
        let prev = self.prev;
        let end = of + prev[of].subtree_length();
        for frame in &prev[of..end] {
            match frame {
                Frame::Component {
                    component_id: Some(id),
                    ..
                } => self.disposed_components.push(*id),
                Frame::Attribute {
                    value: AttributeValue::Handler(handler),
                    ..
                } => self.disposed_handlers.push(*handler),
                _ => {}
            }
        }
        self.edits.push(RenderTreeEdit::RemoveSubtree { at });
    }

    fn instantiate(&mut self, nf: usize) -> Result<ComponentId, DiffError> {
        let component_type = match &self.curr[nf] {
            Frame::Component { component_type, .. } => *component_type,
            _ => unreachable!("instantiate called on a non-component frame"),
        };
        let id = self.host.instantiate_child(self.component_id, component_type)?;
        trace!(parent = self.component_id.id(), child = id.id(), %component_type, "child instantiated");
        Ok(id)
    }

    /// Whether two subtrees render identically (bound instances aside).
    fn same_subtree(&self, of: usize, nf: usize) -> bool {
        let a = &self.prev[of..of + self.prev[of].subtree_length()];
        let b = &self.curr[nf..nf + self.curr[nf].subtree_length()];
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| equivalent(x, y))
    }
}

/// Frame indices of the visible siblings in `range`.
fn visible_siblings(frames: &[Frame], range: Range<usize>, out: &mut Vec<usize>) {
    let mut index = range.start;
    while index < range.end {
        match &frames[index] {
            // Step into the region: its descendants are our siblings.
            Frame::Region { .. } | Frame::Capture { .. } | Frame::Attribute { .. } => index += 1,
            frame => {
                out.push(index);
                index += frame.subtree_length();
            }
        }
    }
}

/// Descendant range of an owner, past its attribute run.
fn children_range(frames: &[Frame], owner: usize) -> Range<usize> {
    let end = owner + frames[owner].subtree_length();
    let mut start = owner + 1;
    while start < end && frames[start].frame_type() == FrameType::Attribute {
        start += 1;
    }
    start..end
}

fn collect_attributes(frames: &[Frame], owner: usize) -> Vec<(&str, &AttributeValue)> {
    let mut enumerator = ParameterEnumerator::new(frames, owner);
    let mut out = Vec::new();
    while enumerator.move_next() {
        if let Ok(param) = enumerator.current() {
            out.push((param.name, param.value));
        }
    }
    out
}

fn same_attributes(prev: &[Frame], of: usize, curr: &[Frame], nf: usize) -> bool {
    let old_attrs = collect_attributes(prev, of);
    let new_attrs = collect_attributes(curr, nf);
    if old_attrs.len() != new_attrs.len() {
        return false;
    }
    let old_by_name: HashMap<&str, &AttributeValue> = old_attrs.into_iter().collect();
    new_attrs
        .iter()
        .all(|(name, value)| old_by_name.get(name) == Some(value))
}

/// Marks which siblings take part in keyed matching.
fn keyed_positions(
    frames: &[Frame],
    siblings: &[usize],
    policy: DuplicateKeyPolicy,
) -> Result<Vec<bool>, DiffError> {
    let mut keyed = vec![false; siblings.len()];
    let mut seen: HashMap<&FrameKey, usize> = HashMap::new();
    for (pos, &index) in siblings.iter().enumerate() {
        let Some(key) = frames[index].key() else {
            continue;
        };
        match seen.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(index);
                keyed[pos] = true;
            }
            Entry::Occupied(first) => match policy {
                DuplicateKeyPolicy::Reject => {
                    return Err(DiffError::DuplicateKey {
                        key: key.to_string(),
                        index,
                    });
                }
                DuplicateKeyPolicy::Positional => {
                    warn!(%key, first = *first.get(), index, "duplicate structural key, matching positionally");
                }
            },
        }
    }
    Ok(keyed)
}

/// Whether two frames may be updated in place.
fn compatible(old: &Frame, new: &Frame) -> bool {
    match (old, new) {
        (
            Frame::Element {
                tag: a, key: ka, ..
            },
            Frame::Element {
                tag: b, key: kb, ..
            },
        ) => a == b && ka == kb,
        (
            Frame::Component {
                component_type: a,
                key: ka,
                ..
            },
            Frame::Component {
                component_type: b,
                key: kb,
                ..
            },
        ) => a == b && ka == kb,
        (Frame::Text { .. }, Frame::Text { .. }) => true,
        (Frame::Markup { content: a }, Frame::Markup { content: b }) => a == b,
        _ => false,
    }
}

/// Frame equality that ignores bound component instances.
fn equivalent(old: &Frame, new: &Frame) -> bool {
    match (old, new) {
        (Frame::Component { .. }, Frame::Component { .. }) => {
            compatible(old, new) && old.subtree_length() == new.subtree_length()
        }
        _ => old == new,
    }
}
