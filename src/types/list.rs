//! Whitespace-separated list values
//!
//! XML schemas often type an attribute as a list, e.g. `codecs="avc1 mp4a"`.
//! [`SpaceSeparated`] renders its items joined by single spaces and parses
//! any run of whitespace as a separator.

use crate::core::error::XmlResult;
use crate::core::value::{ValueMut, ValueRef, XmlScalar, XmlValue};
use std::borrow::Cow;
use std::ops::{Deref, DerefMut};

/// A list of scalars held in a single text value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpaceSeparated<T>(pub Vec<T>);

impl<T> SpaceSeparated<T> {
    /// Wrap a list
    pub fn new(items: Vec<T>) -> Self {
        Self(items)
    }

    /// Unwrap the list
    pub fn into_inner(self) -> Vec<T> {
        self.0
    }
}

impl<T> From<Vec<T>> for SpaceSeparated<T> {
    fn from(items: Vec<T>) -> Self {
        Self(items)
    }
}

impl<T> Deref for SpaceSeparated<T> {
    type Target = Vec<T>;

    fn deref(&self) -> &Vec<T> {
        &self.0
    }
}

impl<T> DerefMut for SpaceSeparated<T> {
    fn deref_mut(&mut self) -> &mut Vec<T> {
        &mut self.0
    }
}

impl<T: XmlScalar + Default> XmlScalar for SpaceSeparated<T> {
    fn to_text(&self) -> Cow<'_, str> {
        let parts: Vec<Cow<'_, str>> = self.0.iter().map(|item| item.to_text()).collect();
        Cow::Owned(parts.join(" "))
    }

    fn set_text(&mut self, text: &str) -> XmlResult<()> {
        let mut items = Vec::new();
        for word in text.split_whitespace() {
            let mut item = T::default();
            item.set_text(word)?;
            items.push(item);
        }
        self.0 = items;
        Ok(())
    }

    fn is_zero(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T: XmlScalar + Default> XmlValue for SpaceSeparated<T> {
    fn type_name(&self) -> &'static str {
        "SpaceSeparated"
    }

    fn as_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Scalar(self)
    }

    fn as_value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Scalar(self)
    }
}
