#![forbid(unsafe_code)]

//! Parameter enumeration over an owner's attribute run.
//!
//! The attributes of an element or component frame are stored immediately
//! after it, before any other descendant. [`ParameterEnumerator`] walks that
//! run in a single forward pass: it stops at the first non-attribute frame
//! or at the end of the owner's subtree, whichever comes first, looking at
//! most one frame ahead.
//!
//! The enumerator is plain `Copy` data. Copying it copies the position, so
//! handing it to another caller never shares iteration state; to start over,
//! build a fresh one from the same frames and owner index.

use crate::error::TreeError;
use crate::frame::{AttributeValue, Frame, FrameType};

/// One attribute of an owner frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter<'a> {
    pub name: &'a str,
    pub value: &'a AttributeValue,
}

/// Forward-only cursor over the attributes of one owner frame.
#[derive(Debug, Clone, Copy)]
pub struct ParameterEnumerator<'a> {
    frames: &'a [Frame],
    owner_index: usize,
    descendants_end: usize,
    current_index: usize,
}

impl<'a> ParameterEnumerator<'a> {
    /// Create an enumerator positioned before the first attribute of the
    /// owner at `owner_index`.
    ///
    /// An out-of-range owner index yields an empty enumeration.
    pub fn new(frames: &'a [Frame], owner_index: usize) -> Self {
        let subtree_length = frames.get(owner_index).map_or(0, Frame::subtree_length);
        let descendants_end = owner_index
            .saturating_add(subtree_length)
            .min(frames.len());
        Self {
            frames,
            owner_index,
            descendants_end,
            current_index: owner_index,
        }
    }

    /// Advance to the next attribute.
    ///
    /// Returns `false`, leaving the cursor where it was, once the owner's
    /// descendants are exhausted or a non-attribute frame is reached.
    pub fn move_next(&mut self) -> bool {
        let next_index = self.current_index + 1;
        if next_index >= self.descendants_end {
            return false;
        }

        // Attributes always precede other descendants, so the first
        // non-attribute frame ends the run.
        if self.frames[next_index].frame_type() != FrameType::Attribute {
            return false;
        }

        self.current_index = next_index;
        true
    }

    /// The attribute under the cursor.
    ///
    /// Fails with [`TreeError::NotStarted`] before the first successful
    /// [`move_next`](Self::move_next).
    pub fn current(&self) -> Result<Parameter<'a>, TreeError> {
        if self.current_index <= self.owner_index {
            return Err(TreeError::NotStarted);
        }
        let frames: &'a [Frame] = self.frames;
        match frames[self.current_index].as_attribute() {
            Some((name, value)) => Ok(Parameter { name, value }),
            None => Err(TreeError::OrphanAttribute {
                index: self.current_index,
            }),
        }
    }
}

/// The attributes of one owner frame, as handed to a child component.
#[derive(Debug, Clone, Copy)]
pub struct ParameterCollection<'a> {
    frames: &'a [Frame],
    owner_index: usize,
}

impl<'a> ParameterCollection<'a> {
    pub fn new(frames: &'a [Frame], owner_index: usize) -> Self {
        Self {
            frames,
            owner_index,
        }
    }

    /// A collection with no parameters.
    pub fn empty() -> Self {
        Self {
            frames: &[],
            owner_index: 0,
        }
    }

    /// A fresh enumerator positioned before the first parameter.
    pub fn enumerator(&self) -> ParameterEnumerator<'a> {
        ParameterEnumerator::new(self.frames, self.owner_index)
    }

    pub fn iter(&self) -> Parameters<'a> {
        Parameters {
            inner: self.enumerator(),
        }
    }

    /// Value of the parameter called `name`.
    pub fn get(&self, name: &str) -> Option<&'a AttributeValue> {
        self.iter().find(|p| p.name == name).map(|p| p.value)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        !self.enumerator().move_next()
    }
}

impl<'a> IntoIterator for ParameterCollection<'a> {
    type Item = Parameter<'a>;
    type IntoIter = Parameters<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`ParameterCollection`].
#[derive(Debug, Clone)]
pub struct Parameters<'a> {
    inner: ParameterEnumerator<'a>,
}

impl<'a> Iterator for Parameters<'a> {
    type Item = Parameter<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.inner.move_next() {
            self.inner.current().ok()
        } else {
            None
        }
    }
}
