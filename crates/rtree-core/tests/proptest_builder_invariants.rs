//! Property-based invariant tests for the render tree builder.
//!
//! For arbitrary trees built through `RenderTreeBuilder`:
//!
//! 1. Every frame's subtree length equals the size of its subtree.
//! 2. The finished sequence passes structural validation.
//! 3. Enumerating an element's parameters yields exactly its attributes, in
//!    insertion order.
//! 4. Clearing and rebuilding produces an identical sequence.
//! 5. Inflating a root subtree length is reported as a mismatch.
//! 6. A component frame owning anything but attributes is rejected by both
//!    the builder and validation.

use proptest::prelude::*;
use rtree_core::{
    ComponentType, Frame, ParameterEnumerator, RenderTreeBuilder, TreeError, validate_frames,
};

// ── Helpers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Node {
    Element {
        tag: &'static str,
        attrs: Vec<(String, String)>,
        children: Vec<Node>,
    },
    Region(Vec<Node>),
    Text(String),
    Markup(String),
}

fn node_strategy() -> impl Strategy<Value = Node> {
    let leaf = prop_oneof![
        "[a-z]{0,4}".prop_map(Node::Text),
        "[a-z]{1,3}".prop_map(Node::Markup),
    ];
    leaf.prop_recursive(4, 48, 4, |inner| {
        prop_oneof![
            (
                prop::sample::select(vec!["div", "span", "p", "li"]),
                prop::collection::vec(("[a-d]", "[0-9]{1,2}"), 0..4),
                prop::collection::vec(inner.clone(), 0..4),
            )
                .prop_map(|(tag, attrs, children)| Node::Element {
                    tag,
                    attrs,
                    children,
                }),
            prop::collection::vec(inner, 0..3).prop_map(Node::Region),
        ]
    })
}

fn forest_strategy() -> impl Strategy<Value = Vec<Node>> {
    prop::collection::vec(node_strategy(), 0..5)
}

fn build(node: &Node, b: &mut RenderTreeBuilder) -> Result<(), TreeError> {
    match node {
        Node::Element {
            tag,
            attrs,
            children,
        } => {
            b.open_element(*tag);
            for (name, value) in attrs {
                b.add_attribute(name.clone(), value.as_str())?;
            }
            for child in children {
                build(child, b)?;
            }
            b.close_element()
        }
        Node::Region(children) => {
            b.open_region();
            for child in children {
                build(child, b)?;
            }
            b.close_region()
        }
        Node::Text(text) => {
            b.add_text(text.as_str());
            Ok(())
        }
        Node::Markup(markup) => {
            b.add_markup(markup.as_str());
            Ok(())
        }
    }
}

fn build_forest(forest: &[Node]) -> Vec<Frame> {
    let mut b = RenderTreeBuilder::new();
    for node in forest {
        build(node, &mut b).expect("generated trees are well formed");
    }
    b.frames().expect("all frames closed").to_vec()
}

/// Expected subtree length of every frame, in pre-order.
fn expected_lengths(node: &Node, out: &mut Vec<usize>) -> usize {
    let slot = out.len();
    out.push(0);
    let total = match node {
        Node::Element {
            attrs, children, ..
        } => {
            out.extend(std::iter::repeat_n(1, attrs.len()));
            1 + attrs.len()
                + children
                    .iter()
                    .map(|c| expected_lengths(c, out))
                    .sum::<usize>()
        }
        Node::Region(children) => {
            1 + children
                .iter()
                .map(|c| expected_lengths(c, out))
                .sum::<usize>()
        }
        Node::Text(_) | Node::Markup(_) => 1,
    };
    out[slot] = total;
    total
}

/// Attributes of every element, in pre-order of the elements.
fn expected_attrs(node: &Node, out: &mut Vec<Vec<(String, String)>>) {
    match node {
        Node::Element {
            attrs, children, ..
        } => {
            out.push(attrs.clone());
            children.iter().for_each(|c| expected_attrs(c, out));
        }
        Node::Region(children) => children.iter().for_each(|c| expected_attrs(c, out)),
        Node::Text(_) | Node::Markup(_) => {}
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Subtree lengths are exact
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn subtree_lengths_are_exact(forest in forest_strategy()) {
        let frames = build_forest(&forest);
        let mut expected = Vec::new();
        for node in &forest {
            expected_lengths(node, &mut expected);
        }
        let actual: Vec<usize> = frames.iter().map(Frame::subtree_length).collect();
        prop_assert_eq!(actual, expected);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Builder output always validates
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn builder_output_validates(forest in forest_strategy()) {
        let frames = build_forest(&forest);
        prop_assert_eq!(validate_frames(&frames), Ok(()));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Parameter enumeration matches attributes
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn parameters_match_attributes(forest in forest_strategy()) {
        let frames = build_forest(&forest);
        let mut expected = Vec::new();
        for node in &forest {
            expected_attrs(node, &mut expected);
        }

        let mut actual = Vec::new();
        for (index, frame) in frames.iter().enumerate() {
            if !matches!(frame, Frame::Element { .. }) {
                continue;
            }
            let mut e = ParameterEnumerator::new(&frames, index);
            let mut attrs = Vec::new();
            while e.move_next() {
                let p = e.current().unwrap();
                attrs.push((p.name.to_string(), p.value.to_string()));
            }
            actual.push(attrs);
        }
        prop_assert_eq!(actual, expected);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Clear + rebuild is deterministic
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn clear_then_rebuild_is_identical(first in forest_strategy(), second in forest_strategy()) {
        let mut b = RenderTreeBuilder::new();
        for node in &first {
            build(node, &mut b).unwrap();
        }
        b.clear();
        for node in &second {
            build(node, &mut b).unwrap();
        }
        let expected = build_forest(&second);
        prop_assert_eq!(b.frames().unwrap(), expected.as_slice());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Overlong subtree lengths are always detected
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn overlong_root_is_detected(forest in forest_strategy()) {
        let mut frames = build_forest(&forest);
        let total = frames.len();
        if let Some(Frame::Element { subtree_length, .. } | Frame::Region { subtree_length }) =
            frames.first_mut()
        {
            *subtree_length += total;
            let result = validate_frames(&frames);
            prop_assert!(
                matches!(result, Err(TreeError::SubtreeLengthMismatch { index: 0, .. })),
                "expected mismatch, got {:?}",
                result
            );
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Component frames own parameters only
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn component_content_is_rejected(
        params in prop::collection::vec(("[a-d]", "[0-9]"), 0..3),
        forest in forest_strategy(),
    ) {
        let mut b = RenderTreeBuilder::new();
        b.open_component(ComponentType::new("Card"));
        for (name, value) in &params {
            b.add_attribute(name.clone(), value.as_str()).unwrap();
        }
        for node in &forest {
            build(node, &mut b).unwrap();
        }
        let closed = b.close_component();
        if forest.is_empty() {
            prop_assert_eq!(closed, Ok(()));
        } else {
            prop_assert_eq!(closed, Err(TreeError::ComponentContent { index: 0 }));
        }

        let content = build_forest(&forest);
        let mut frames = vec![Frame::Component {
            component_type: ComponentType::new("Card"),
            key: None,
            subtree_length: 1 + params.len() + content.len(),
            component_id: None,
        }];
        frames.extend(params.iter().map(|(n, v)| Frame::attribute(n.clone(), v.as_str())));
        frames.extend(content);
        let expected = if forest.is_empty() {
            Ok(())
        } else {
            Err(TreeError::ComponentContent { index: 0 })
        };
        prop_assert_eq!(validate_frames(&frames), expected);
    }
}
