//! Byte strings
//!
//! A `Vec<u8>` field is a sequence like any other and expands into one
//! element per byte. [`Bytes`] holds the same bytes as a single text value.

use crate::core::error::XmlResult;
use crate::core::value::{ValueMut, ValueRef, XmlScalar, XmlValue};
use std::borrow::Cow;
use std::ops::{Deref, DerefMut};

/// Raw bytes written as text
///
/// Invalid UTF-8 is written with replacement characters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Bytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl Deref for Bytes {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.0
    }
}

impl DerefMut for Bytes {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.0
    }
}

impl XmlScalar for Bytes {
    fn to_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    fn set_text(&mut self, text: &str) -> XmlResult<()> {
        self.0.clear();
        self.0.extend_from_slice(text.as_bytes());
        Ok(())
    }

    fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    fn is_string(&self) -> bool {
        true
    }
}

impl XmlValue for Bytes {
    fn type_name(&self) -> &'static str {
        "Bytes"
    }

    fn as_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Scalar(self)
    }

    fn as_value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Scalar(self)
    }
}
