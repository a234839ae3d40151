#![forbid(unsafe_code)]

//! Render tree frames.
//!
//! A component's rendered output is stored as a flat, pre-order sequence of
//! [`Frame`]s rather than a pointer-linked tree. Owner frames (elements,
//! components) and regions record a *subtree length*: the number of frames
//! belonging to them, themselves included. Skipping a whole subtree is a
//! single index addition.
//!
//! # Layout
//!
//! ```text
//! index  frame                         subtree_length
//! 0      Element("div")                4
//! 1        Attribute(class = "card")   -
//! 2        Element("span")             2
//! 3          Text("hi")                -
//! ```
//!
//! # Invariants
//!
//! 1. An owner at index `i` with length `L` owns exactly `[i + 1, i + L)`.
//! 2. Attribute frames of an owner are contiguous and come first among its
//!    descendants.
//! 3. Leaf frames (text, attribute, markup, capture) have an implicit
//!    subtree length of 1.

use std::borrow::Cow;
use std::fmt;

/// Identity of a live component instance.
///
/// Assigned by the renderer; unique for the renderer's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ComponentId(pub u32);

impl ComponentId {
    /// Create a component ID from a raw value.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[inline]
    pub const fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Token identifying an attribute-bound event handler.
///
/// Handlers are chosen by the component author while rendering; the same
/// token rendered twice is the same handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventHandlerId(pub u64);

impl EventHandlerId {
    #[inline]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn id(self) -> u64 {
        self.0
    }
}

/// Opaque identifier carried by a capture marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaptureId(pub u32);

/// Name of a component type, used to instantiate child components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentType(&'static str);

impl ComponentType {
    #[inline]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    #[inline]
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Author-supplied hint used to match siblings across renders.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameKey(Cow<'static, str>);

impl FrameKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FrameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for FrameKey {
    fn from(key: &'static str) -> Self {
        Self(Cow::Borrowed(key))
    }
}

impl From<String> for FrameKey {
    fn from(key: String) -> Self {
        Self(Cow::Owned(key))
    }
}

macro_rules! frame_key_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for FrameKey {
                fn from(key: $ty) -> Self {
                    Self(Cow::Owned(key.to_string()))
                }
            }
        )*
    };
}

frame_key_from_int!(u32, u64, usize, i32, i64);

/// Value of an attribute frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// Plain string value.
    Text(String),
    /// Boolean flag attribute.
    Bool(bool),
    /// Event handler delegate token.
    Handler(EventHandlerId),
}

impl AttributeValue {
    /// The handler token, if this value is an event handler.
    #[inline]
    pub fn as_handler(&self) -> Option<EventHandlerId> {
        match self {
            Self::Handler(id) => Some(*id),
            _ => None,
        }
    }

    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Bool(flag) => write!(f, "{flag}"),
            Self::Handler(id) => write!(f, "handler:{}", id.0),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<EventHandlerId> for AttributeValue {
    fn from(value: EventHandlerId) -> Self {
        Self::Handler(value)
    }
}

/// Discriminant of a [`Frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    Element,
    Text,
    Attribute,
    Component,
    Region,
    Markup,
    Capture,
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Element => "element",
            Self::Text => "text",
            Self::Attribute => "attribute",
            Self::Component => "component",
            Self::Region => "region",
            Self::Markup => "markup",
            Self::Capture => "capture",
        };
        f.write_str(name)
    }
}

/// One record of the flattened render tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Element {
        tag: Cow<'static, str>,
        key: Option<FrameKey>,
        subtree_length: usize,
    },
    Text {
        content: String,
    },
    Attribute {
        name: Cow<'static, str>,
        value: AttributeValue,
    },
    Component {
        component_type: ComponentType,
        key: Option<FrameKey>,
        subtree_length: usize,
        /// Child instance bound to this frame. `None` until the diff
        /// instantiates or retains the child.
        component_id: Option<ComponentId>,
    },
    /// Transparent grouping marker; its descendants are siblings of the
    /// region's own siblings.
    Region {
        subtree_length: usize,
    },
    Markup {
        content: String,
    },
    Capture {
        capture_id: CaptureId,
    },
}

impl Frame {
    /// Create a text frame.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    /// Create an attribute frame.
    pub fn attribute(name: impl Into<Cow<'static, str>>, value: impl Into<AttributeValue>) -> Self {
        Self::Attribute {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Create a markup frame.
    pub fn markup(content: impl Into<String>) -> Self {
        Self::Markup {
            content: content.into(),
        }
    }

    /// Frame discriminant.
    #[inline]
    pub fn frame_type(&self) -> FrameType {
        match self {
            Self::Element { .. } => FrameType::Element,
            Self::Text { .. } => FrameType::Text,
            Self::Attribute { .. } => FrameType::Attribute,
            Self::Component { .. } => FrameType::Component,
            Self::Region { .. } => FrameType::Region,
            Self::Markup { .. } => FrameType::Markup,
            Self::Capture { .. } => FrameType::Capture,
        }
    }

    /// Number of frames belonging to this frame, itself included.
    ///
    /// Leaf frames report 1.
    #[inline]
    pub fn subtree_length(&self) -> usize {
        match self {
            Self::Element { subtree_length, .. }
            | Self::Component { subtree_length, .. }
            | Self::Region { subtree_length } => *subtree_length,
            _ => 1,
        }
    }

    /// Subtree length as declared by the frame, for frames that carry one.
    #[inline]
    pub fn declared_subtree_length(&self) -> Option<usize> {
        match self {
            Self::Element { subtree_length, .. }
            | Self::Component { subtree_length, .. }
            | Self::Region { subtree_length } => Some(*subtree_length),
            _ => None,
        }
    }

    pub(crate) fn set_subtree_length(&mut self, length: usize) {
        match self {
            Self::Element { subtree_length, .. }
            | Self::Component { subtree_length, .. }
            | Self::Region { subtree_length } => *subtree_length = length,
            _ => {}
        }
    }

    /// Whether this frame can own attribute frames.
    #[inline]
    pub fn is_owner(&self) -> bool {
        matches!(self, Self::Element { .. } | Self::Component { .. })
    }

    /// Structural key of an element or component frame.
    #[inline]
    pub fn key(&self) -> Option<&FrameKey> {
        match self {
            Self::Element { key, .. } | Self::Component { key, .. } => key.as_ref(),
            _ => None,
        }
    }

    /// Name and value of an attribute frame.
    #[inline]
    pub fn as_attribute(&self) -> Option<(&str, &AttributeValue)> {
        match self {
            Self::Attribute { name, value } => Some((&**name, value)),
            _ => None,
        }
    }

    /// Child component bound to a component frame.
    #[inline]
    pub fn component_id(&self) -> Option<ComponentId> {
        match self {
            Self::Component { component_id, .. } => *component_id,
            _ => None,
        }
    }

    /// Bind a child component to this frame.
    ///
    /// Returns `false` (and changes nothing) if this is not a component frame.
    pub fn bind_component(&mut self, id: ComponentId) -> bool {
        match self {
            Self::Component { component_id, .. } => {
                *component_id = Some(id);
                true
            }
            _ => false,
        }
    }
}
