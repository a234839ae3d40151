#![forbid(unsafe_code)]

//! Headless UI surface for validating render batches.
//!
//! [`HeadlessSurface`] keeps a materialized node tree per component and
//! applies [`RenderBatch`]es to it edit by edit, exactly as a real surface
//! adapter would. Tests compare the result with [`materialize`]d frames to
//! check that a diff reproduces the current tree.
//!
//! # Scope
//!
//! This is NOT a DOM. It tracks only what edits can observe:
//! - Element tags, attributes (name-keyed, order-insensitive) and children
//! - Text and markup content
//! - Component placeholders and the instance bound to each
//!
//! Regions are flattened away and captures are dropped, matching the diff's
//! view of the tree.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use rtree_core::{AttributeValue, ComponentId, Frame};

use crate::batch::RenderBatch;
use crate::edit::{RenderTreeEdit, TreePath};

/// A visible node of a component's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element {
        tag: String,
        attributes: BTreeMap<String, AttributeValue>,
        children: Vec<Node>,
    },
    Text(String),
    Markup(String),
    /// Placeholder for a child component's output.
    Component(Option<ComponentId>),
}

/// An edit that does not fit the tree it is applied to.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    #[error("no node at {0}")]
    InvalidPath(TreePath),
    #[error("node at {0} is not an element")]
    NotAnElement(TreePath),
    #[error("node at {0} is not a text node")]
    NotText(TreePath),
    #[error("node at {0} is not a component placeholder")]
    NotComponent(TreePath),
    #[error("element at {owner} has no attribute `{name}`")]
    MissingAttribute { owner: TreePath, name: String },
    #[error("insert at {at} must carry exactly one visible node, found {nodes}")]
    InvalidInsert { at: TreePath, nodes: usize },
    #[error("move from {from} to {to} crosses parents")]
    CrossParentMove { from: TreePath, to: TreePath },
}

/// Build the visible node tree of a frame sequence.
pub fn materialize(frames: &[Frame]) -> Vec<Node> {
    let mut out = Vec::new();
    materialize_range(frames, 0, frames.len(), &mut out);
    out
}

fn materialize_range(frames: &[Frame], start: usize, end: usize, out: &mut Vec<Node>) {
    let mut index = start;
    while index < end {
        let frame = &frames[index];
        let next = index + frame.subtree_length().max(1);
        match frame {
            Frame::Region { .. } | Frame::Capture { .. } | Frame::Attribute { .. } => {
                index += 1;
                continue;
            }
            Frame::Element { tag, .. } => {
                let mut attributes = BTreeMap::new();
                let mut child = index + 1;
                while child < next {
                    let Some((name, value)) = frames[child].as_attribute() else {
                        break;
                    };
                    attributes.insert(name.to_owned(), value.clone());
                    child += 1;
                }
                let mut children = Vec::new();
                materialize_range(frames, child, next.min(end), &mut children);
                out.push(Node::Element {
                    tag: tag.to_string(),
                    attributes,
                    children,
                });
            }
            Frame::Text { content } => out.push(Node::Text(content.clone())),
            Frame::Markup { content } => out.push(Node::Markup(content.clone())),
            Frame::Component { component_id, .. } => out.push(Node::Component(*component_id)),
        }
        index = next;
    }
}

/// Apply one edit to a component's root list.
pub fn apply_edit(roots: &mut Vec<Node>, edit: &RenderTreeEdit) -> Result<(), ApplyError> {
    match edit {
        RenderTreeEdit::SetAttribute { owner, name, value } => match node_mut(roots, owner)? {
            Node::Element { attributes, .. } => {
                attributes.insert(name.clone(), value.clone());
                Ok(())
            }
            _ => Err(ApplyError::NotAnElement(owner.clone())),
        },
        RenderTreeEdit::RemoveAttribute { owner, name } => match node_mut(roots, owner)? {
            Node::Element { attributes, .. } => match attributes.remove(name) {
                Some(_) => Ok(()),
                None => Err(ApplyError::MissingAttribute {
                    owner: owner.clone(),
                    name: name.clone(),
                }),
            },
            _ => Err(ApplyError::NotAnElement(owner.clone())),
        },
        RenderTreeEdit::SetText { at, text } => match node_mut(roots, at)? {
            Node::Text(content) => {
                content.clone_from(text);
                Ok(())
            }
            _ => Err(ApplyError::NotText(at.clone())),
        },
        RenderTreeEdit::InsertSubtree { at, frames } => {
            let mut nodes = materialize(frames);
            if nodes.len() != 1 {
                return Err(ApplyError::InvalidInsert {
                    at: at.clone(),
                    nodes: nodes.len(),
                });
            }
            let (parent, pos) = at
                .split_last()
                .ok_or_else(|| ApplyError::InvalidPath(at.clone()))?;
            let siblings = children_mut(roots, parent, at)?;
            if pos > siblings.len() {
                return Err(ApplyError::InvalidPath(at.clone()));
            }
            siblings.insert(pos, nodes.remove(0));
            Ok(())
        }
        RenderTreeEdit::RemoveSubtree { at } => {
            let (parent, pos) = at
                .split_last()
                .ok_or_else(|| ApplyError::InvalidPath(at.clone()))?;
            let siblings = children_mut(roots, parent, at)?;
            if pos >= siblings.len() {
                return Err(ApplyError::InvalidPath(at.clone()));
            }
            siblings.remove(pos);
            Ok(())
        }
        RenderTreeEdit::MoveSubtree { from, to } => {
            let cross = || ApplyError::CrossParentMove {
                from: from.clone(),
                to: to.clone(),
            };
            let (parent, source) = from.split_last().ok_or_else(cross)?;
            let (target_parent, target) = to.split_last().ok_or_else(cross)?;
            if parent != target_parent {
                return Err(cross());
            }
            let siblings = children_mut(roots, parent, from)?;
            if source >= siblings.len() {
                return Err(ApplyError::InvalidPath(from.clone()));
            }
            if target >= siblings.len() {
                return Err(ApplyError::InvalidPath(to.clone()));
            }
            let node = siblings.remove(source);
            siblings.insert(target, node);
            Ok(())
        }
        RenderTreeEdit::UpdateComponentPlaceholder { at, component_id } => {
            match node_mut(roots, at)? {
                Node::Component(slot) => {
                    *slot = Some(*component_id);
                    Ok(())
                }
                _ => Err(ApplyError::NotComponent(at.clone())),
            }
        }
    }
}

fn children_mut<'a>(
    roots: &'a mut Vec<Node>,
    parent: &[u32],
    path: &TreePath,
) -> Result<&'a mut Vec<Node>, ApplyError> {
    let mut list = roots;
    for &index in parent {
        match list.get_mut(index as usize) {
            Some(Node::Element { children, .. }) => list = children,
            Some(_) => return Err(ApplyError::NotAnElement(path.clone())),
            None => return Err(ApplyError::InvalidPath(path.clone())),
        }
    }
    Ok(list)
}

fn node_mut<'a>(roots: &'a mut Vec<Node>, path: &TreePath) -> Result<&'a mut Node, ApplyError> {
    let (parent, pos) = path
        .split_last()
        .ok_or_else(|| ApplyError::InvalidPath(path.clone()))?;
    children_mut(roots, parent, path)?
        .get_mut(pos)
        .ok_or_else(|| ApplyError::InvalidPath(path.clone()))
}

/// In-memory surface that applies render batches.
#[derive(Debug, Default, Clone)]
pub struct HeadlessSurface {
    components: BTreeMap<ComponentId, Vec<Node>>,
    batches_applied: usize,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply every diff of `batch` in order, then drop disposed components.
    ///
    /// Stops at the first edit that does not fit; the surface is left
    /// partially updated in that case.
    pub fn apply_batch(&mut self, batch: &RenderBatch) -> Result<(), ApplyError> {
        for diff in batch.updated_components() {
            let roots = self.components.entry(diff.component_id()).or_default();
            for edit in diff.iter() {
                apply_edit(roots, edit)?;
            }
        }
        for id in batch.disposed_components() {
            self.components.remove(id);
        }
        self.batches_applied += 1;
        Ok(())
    }

    /// Root nodes of a component, if it has rendered and is not disposed.
    pub fn roots(&self, id: ComponentId) -> Option<&[Node]> {
        self.components.get(&id).map(Vec::as_slice)
    }

    #[inline]
    pub fn contains(&self, id: ComponentId) -> bool {
        self.components.contains_key(&id)
    }

    #[inline]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    #[inline]
    pub fn batches_applied(&self) -> usize {
        self.batches_applied
    }

    /// Serialize a component's output, expanding child placeholders.
    ///
    /// Attributes print in name order; `Bool(false)` attributes are omitted
    /// and `Bool(true)` ones print bare.
    pub fn to_markup(&self, id: ComponentId) -> String {
        let mut out = String::new();
        if let Some(roots) = self.components.get(&id) {
            self.write_nodes(roots, &mut out);
        }
        out
    }

    fn write_nodes(&self, nodes: &[Node], out: &mut String) {
        for node in nodes {
            match node {
                Node::Element {
                    tag,
                    attributes,
                    children,
                } => {
                    out.push('<');
                    out.push_str(tag);
                    for (name, value) in attributes {
                        match value {
                            AttributeValue::Bool(false) => {}
                            AttributeValue::Bool(true) => {
                                let _ = write!(out, " {name}");
                            }
                            other => {
                                let _ = write!(out, " {name}=\"{}\"", escape(&other.to_string()));
                            }
                        }
                    }
                    out.push('>');
                    self.write_nodes(children, out);
                    let _ = write!(out, "</{tag}>");
                }
                Node::Text(text) => out.push_str(&escape(text)),
                Node::Markup(markup) => out.push_str(markup),
                Node::Component(Some(child)) => match self.components.get(child) {
                    Some(roots) => self.write_nodes(roots, out),
                    None => {
                        let _ = write!(out, "<!--{child}-->");
                    }
                },
                Node::Component(None) => out.push_str("<!--unbound-->"),
            }
        }
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::RenderBatchBuilder;
    use crate::edit::RenderTreeDiff;
    use rtree_core::{ComponentType, RenderTreeBuilder};

    fn frames(f: impl FnOnce(&mut RenderTreeBuilder)) -> Vec<Frame> {
        let mut b = RenderTreeBuilder::new();
        f(&mut b);
        b.frames().unwrap().to_vec()
    }

    fn batch(id: u32, edits: Vec<RenderTreeEdit>) -> RenderBatch {
        let mut b = RenderBatchBuilder::new();
        b.append_diff(RenderTreeDiff::new(ComponentId(id), edits));
        b.finish()
    }

    #[test]
    fn materialize_flattens_regions_and_reads_attributes() {
        let f = frames(|b| {
            b.open_region();
            b.open_element("a");
            b.add_attribute("href", "/x").unwrap();
            b.add_text("link");
            b.close_element().unwrap();
            b.close_region().unwrap();
            b.add_markup("<br>");
        });
        let nodes = materialize(&f);
        assert_eq!(nodes.len(), 2);
        match &nodes[0] {
            Node::Element {
                tag,
                attributes,
                children,
            } => {
                assert_eq!(tag, "a");
                assert_eq!(attributes.get("href"), Some(&AttributeValue::from("/x")));
                assert_eq!(children, &[Node::Text("link".into())]);
            }
            other => panic!("unexpected node {other:?}"),
        }
        assert_eq!(nodes[1], Node::Markup("<br>".into()));
    }

    #[test]
    fn materialize_component_ignores_parameters() {
        let f = frames(|b| {
            b.open_component(ComponentType::new("Card"));
            b.add_attribute("title", "t").unwrap();
            b.close_component().unwrap();
        });
        assert_eq!(materialize(&f), vec![Node::Component(None)]);
    }

    #[test]
    fn insert_move_remove_sequence() {
        let mut surface = HeadlessSurface::new();
        let insert = |pos: u32, text: &str| RenderTreeEdit::InsertSubtree {
            at: TreePath::from([pos]),
            frames: vec![Frame::text(text)],
        };
        surface
            .apply_batch(&batch(1, vec![insert(0, "a"), insert(1, "b"), insert(2, "c")]))
            .unwrap();
        assert_eq!(surface.to_markup(ComponentId(1)), "abc");

        surface
            .apply_batch(&batch(
                1,
                vec![
                    RenderTreeEdit::MoveSubtree {
                        from: TreePath::from([2]),
                        to: TreePath::from([0]),
                    },
                    RenderTreeEdit::RemoveSubtree {
                        at: TreePath::from([1]),
                    },
                ],
            ))
            .unwrap();
        assert_eq!(surface.to_markup(ComponentId(1)), "cb");
        assert_eq!(surface.batches_applied(), 2);
    }

    #[test]
    fn attribute_edits_and_markup_output() {
        let mut surface = HeadlessSurface::new();
        let owner = TreePath::from([0]);
        surface
            .apply_batch(&batch(
                1,
                vec![
                    RenderTreeEdit::InsertSubtree {
                        at: owner.clone(),
                        frames: frames(|b| {
                            b.open_element("input");
                            b.add_attribute("value", "a<b").unwrap();
                            b.add_attribute("hidden", false).unwrap();
                            b.close_element().unwrap();
                        }),
                    },
                    RenderTreeEdit::SetAttribute {
                        owner: owner.clone(),
                        name: "disabled".into(),
                        value: true.into(),
                    },
                ],
            ))
            .unwrap();
        assert_eq!(
            surface.to_markup(ComponentId(1)),
            "<input disabled value=\"a&lt;b\"></input>"
        );

        let err = surface
            .apply_batch(&batch(
                1,
                vec![RenderTreeEdit::RemoveAttribute {
                    owner: owner.clone(),
                    name: "missing".into(),
                }],
            ))
            .unwrap_err();
        assert_eq!(
            err,
            ApplyError::MissingAttribute {
                owner,
                name: "missing".into()
            }
        );
    }

    #[test]
    fn mistyped_targets_are_rejected() {
        let mut roots = vec![Node::Text("x".into())];
        let at = TreePath::from([0]);
        assert_eq!(
            apply_edit(
                &mut roots,
                &RenderTreeEdit::SetAttribute {
                    owner: at.clone(),
                    name: "a".into(),
                    value: "1".into()
                }
            ),
            Err(ApplyError::NotAnElement(at.clone()))
        );
        assert_eq!(
            apply_edit(
                &mut roots,
                &RenderTreeEdit::UpdateComponentPlaceholder {
                    at: at.clone(),
                    component_id: ComponentId(2)
                }
            ),
            Err(ApplyError::NotComponent(at.clone()))
        );
        assert_eq!(
            apply_edit(&mut roots, &RenderTreeEdit::RemoveSubtree { at: TreePath::from([3]) }),
            Err(ApplyError::InvalidPath(TreePath::from([3])))
        );
        assert!(matches!(
            apply_edit(
                &mut roots,
                &RenderTreeEdit::MoveSubtree {
                    from: TreePath::from([0]),
                    to: TreePath::from([0, 1])
                }
            ),
            Err(ApplyError::CrossParentMove { .. })
        ));
    }

    #[test]
    fn placeholders_expand_and_disposal_drops_children() {
        let mut surface = HeadlessSurface::new();
        let mut b = RenderBatchBuilder::new();
        b.append_diff(RenderTreeDiff::new(
            ComponentId(1),
            vec![
                RenderTreeEdit::InsertSubtree {
                    at: TreePath::from([0]),
                    frames: vec![Frame::Component {
                        component_type: ComponentType::new("Child"),
                        key: None,
                        subtree_length: 1,
                        component_id: Some(ComponentId(2)),
                    }],
                },
            ],
        ));
        b.append_diff(RenderTreeDiff::new(
            ComponentId(2),
            vec![RenderTreeEdit::InsertSubtree {
                at: TreePath::from([0]),
                frames: vec![Frame::text("inner")],
            }],
        ));
        surface.apply_batch(&b.finish()).unwrap();
        assert_eq!(surface.to_markup(ComponentId(1)), "inner");

        let mut b = RenderBatchBuilder::new();
        b.record_disposed_component(ComponentId(2));
        surface.apply_batch(&b.finish()).unwrap();
        assert!(!surface.contains(ComponentId(2)));
        assert_eq!(surface.to_markup(ComponentId(1)), "<!--#2-->");
    }
}
