#![forbid(unsafe_code)]

//! Render tree builder.
//!
//! [`RenderTreeBuilder`] appends frames in depth-first order. Opening an
//! element, component, or region pushes its index onto an explicit stack;
//! closing pops it and backpatches the subtree length. No recursion is
//! involved, so arbitrarily deep trees are fine.
//!
//! # Usage
//!
//! ```
//! use rtree_core::builder::RenderTreeBuilder;
//!
//! let mut builder = RenderTreeBuilder::new();
//! builder.open_element("div");
//! builder.add_attribute("class", "card").unwrap();
//! builder.add_text("hello");
//! builder.close_element().unwrap();
//!
//! let frames = builder.frames().unwrap();
//! assert_eq!(frames.len(), 3);
//! assert_eq!(frames[0].subtree_length(), 3);
//! ```
//!
//! # Invariants
//!
//! 1. `open` holds indices of owner/region frames in nesting order.
//! 2. `attributes_open` is true only while the last appended frame is the
//!    innermost open owner or one of its attributes.

use std::borrow::Cow;

use crate::error::TreeError;
use crate::frame::{AttributeValue, CaptureId, ComponentType, Frame, FrameKey, FrameType};

/// Growable buffer of frames with open-frame bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct RenderTreeBuilder {
    frames: Vec<Frame>,
    /// Indices of currently open frames.
    open: Vec<usize>,
    attributes_open: bool,
}

impl RenderTreeBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with room for `capacity` frames.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            frames: Vec::with_capacity(capacity),
            open: Vec::new(),
            attributes_open: false,
        }
    }

    /// Reset to empty, keeping allocated capacity.
    pub fn clear(&mut self) {
        self.frames.clear();
        self.open.clear();
        self.attributes_open = false;
    }

    /// Number of frames appended so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of currently open frames.
    #[inline]
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Open an element frame.
    pub fn open_element(&mut self, tag: impl Into<Cow<'static, str>>) {
        self.push_open(Frame::Element {
            tag: tag.into(),
            key: None,
            subtree_length: 1,
        });
        self.attributes_open = true;
    }

    /// Close the innermost open element.
    pub fn close_element(&mut self) -> Result<(), TreeError> {
        self.close(FrameType::Element)
    }

    /// Open a child component frame.
    ///
    /// Attributes added next become the child's parameters. A component
    /// frame owns nothing else: closing it after any other content was
    /// added fails with [`TreeError::ComponentContent`].
    pub fn open_component(&mut self, component_type: ComponentType) {
        self.push_open(Frame::Component {
            component_type,
            key: None,
            subtree_length: 1,
            component_id: None,
        });
        self.attributes_open = true;
    }

    /// Close the innermost open component.
    pub fn close_component(&mut self) -> Result<(), TreeError> {
        self.close(FrameType::Component)
    }

    /// Open a transparent region.
    pub fn open_region(&mut self) {
        self.push_open(Frame::Region { subtree_length: 1 });
        self.attributes_open = false;
    }

    /// Close the innermost open region.
    pub fn close_region(&mut self) -> Result<(), TreeError> {
        self.close(FrameType::Region)
    }

    /// Attach a structural key to the innermost open element or component.
    ///
    /// Must be called before any child content is added; attributes may
    /// precede it.
    pub fn set_key(&mut self, key: impl Into<FrameKey>) -> Result<(), TreeError> {
        let Some(&index) = self.open.last() else {
            return Err(TreeError::KeyWithoutOwner);
        };
        let frame_type = self.frames[index].frame_type();
        if !self.attributes_open {
            return Err(TreeError::KeyAfterContent { frame_type });
        }
        match &mut self.frames[index] {
            Frame::Element { key: slot, .. } | Frame::Component { key: slot, .. } => {
                *slot = Some(key.into());
                Ok(())
            }
            _ => Err(TreeError::KeyAfterContent { frame_type }),
        }
    }

    /// Append an attribute to the innermost open owner.
    ///
    /// Fails with [`TreeError::InvalidSequence`] if any non-attribute frame
    /// has been added since the owner was opened.
    pub fn add_attribute(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        value: impl Into<AttributeValue>,
    ) -> Result<(), TreeError> {
        let name = name.into();
        if !self.attributes_open {
            return Err(TreeError::InvalidSequence {
                name: name.into_owned(),
            });
        }
        self.frames.push(Frame::Attribute {
            name,
            value: value.into(),
        });
        Ok(())
    }

    /// Append a text frame.
    pub fn add_text(&mut self, content: impl Into<String>) {
        self.push_leaf(Frame::text(content));
    }

    /// Append a pre-escaped markup frame.
    pub fn add_markup(&mut self, content: impl Into<String>) {
        self.push_leaf(Frame::markup(content));
    }

    /// Append a capture marker for the enclosing element's native handle.
    pub fn add_capture(&mut self, capture_id: CaptureId) {
        self.push_leaf(Frame::Capture { capture_id });
    }

    /// The finished frame sequence.
    ///
    /// Fails with [`TreeError::UnclosedFrames`] while any frame is open.
    pub fn frames(&self) -> Result<&[Frame], TreeError> {
        self.ensure_closed()?;
        Ok(&self.frames)
    }

    /// Mutable access to the finished frames, for binding child component
    /// identities during a diff.
    pub fn frames_mut(&mut self) -> Result<&mut [Frame], TreeError> {
        self.ensure_closed()?;
        Ok(&mut self.frames)
    }

    fn ensure_closed(&self) -> Result<(), TreeError> {
        if self.open.is_empty() {
            Ok(())
        } else {
            Err(TreeError::UnclosedFrames {
                open: self.open.len(),
            })
        }
    }

    fn push_open(&mut self, frame: Frame) {
        self.open.push(self.frames.len());
        self.frames.push(frame);
    }

    fn push_leaf(&mut self, frame: Frame) {
        self.frames.push(frame);
        self.attributes_open = false;
    }

    fn close(&mut self, expected: FrameType) -> Result<(), TreeError> {
        let Some(&index) = self.open.last() else {
            return Err(TreeError::CloseWithoutOpen { expected });
        };
        let found = self.frames[index].frame_type();
        if found != expected {
            return Err(TreeError::MismatchedClose { expected, found });
        }
        if found == FrameType::Component
            && self.frames[index + 1..]
                .iter()
                .any(|frame| frame.as_attribute().is_none())
        {
            return Err(TreeError::ComponentContent { index });
        }
        self.open.pop();
        let length = self.frames.len() - index;
        self.frames[index].set_subtree_length(length);
        self.attributes_open = false;
        Ok(())
    }
}
