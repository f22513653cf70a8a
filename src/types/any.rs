//! Catch-all element type
//!
//! [`AnyElement`] keeps an element it does not understand: its name, every
//! attribute (namespace declarations included) and its raw inner markup.
//! Used as the value of an `any` field, unknown content survives a decode and
//! re-encode cycle.

use crate::core::token::{Attr, Name};
use crate::xml_schema;
use std::fmt;

/// An element kept as name, attributes and raw content
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnyElement {
    /// Element name
    pub name: Name,
    /// Attributes in document order
    pub attrs: Vec<Attr>,
    /// Markup between the start and end tags, verbatim
    pub inner_xml: String,
}

xml_schema!(AnyElement {
    name: ",name",
    attrs: ",any,attr",
    inner_xml: ",innerxml",
});

impl AnyElement {
    /// Create an empty element
    pub fn new(name: Name) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    /// Add an attribute
    pub fn with_attr(mut self, name: Name, value: impl Into<String>) -> Self {
        self.attrs.push(Attr::new(name, value));
        self
    }

    /// Set the raw inner markup
    pub fn with_inner_xml(mut self, inner_xml: impl Into<String>) -> Self {
        self.inner_xml = inner_xml.into();
        self
    }

    /// Value of the first attribute with this local name
    pub fn attr(&self, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|attr| attr.name.local == local)
            .map(|attr| attr.value.as_str())
    }
}

impl fmt::Display for AnyElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::decoder::from_str;
    use crate::core::encoder::to_string;
    use crate::core::namespace::ns;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builders() {
        let element = AnyElement::new(Name::local("x"))
            .with_attr(Name::local("k"), "v")
            .with_inner_xml("<y/>");
        assert_eq!(element.attr("k"), Some("v"));
        assert_eq!(element.attr("missing"), None);
        assert_eq!(to_string(&element).unwrap(), r#"<x k="v"><y/></x>"#);
    }

    #[test]
    fn test_keeps_namespaces_and_markup() {
        let input = r#"<c:x xmlns:c="urn:c" c:k="v">a<b>c</b></c:x>"#;
        let element: AnyElement = from_str(input).unwrap();
        assert_eq!(element.name, Name::new("urn:c", "x"));
        assert_eq!(
            element.attrs,
            vec![
                Attr::new(Name::new(ns::XMLNS, "c"), "urn:c"),
                Attr::new(Name::new("urn:c", "k"), "v"),
            ]
        );
        assert_eq!(element.inner_xml, "a<b>c</b>");

        let again: AnyElement = from_str(&to_string(&element).unwrap()).unwrap();
        assert_eq!(again, element);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_json() {
        let element = AnyElement::new(Name::new("urn:c", "x"))
            .with_attr(Name::local("k"), "v")
            .with_inner_xml("<y/>");
        let json = serde_json::to_string(&element).unwrap();
        let back: AnyElement = serde_json::from_str(&json).unwrap();
        assert_eq!(back, element);
    }
}
