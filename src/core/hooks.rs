//! Extensibility hooks
//!
//! A value can take over its own encoding or decoding at two levels:
//!
//! - element hooks ([`MarshalXml`], [`UnmarshalXml`]) read or write the whole
//!   element through the token interfaces below;
//! - text hooks ([`MarshalText`], [`UnmarshalText`]) only convert the value
//!   to and from text, and the engine keeps writing the surrounding element or
//!   attribute.
//!
//! Types opt in by returning a hook from [`XmlValue::encode_hook`] or
//! [`XmlValue::decode_hook`]. Element hooks are checked before text hooks.

use crate::core::error::XmlResult;
use crate::core::token::{StartElement, Token};
use crate::core::value::XmlValue;

/// Custom encoding of a value
pub enum EncodeHook<'a> {
    /// Write the whole element
    Element(&'a dyn MarshalXml),
    /// Provide the text content only
    Text(&'a dyn MarshalText),
}

/// Custom decoding of a value
pub enum DecodeHook<'a> {
    /// Read the whole element
    Element(&'a mut dyn UnmarshalXml),
    /// Accept the text content only
    Text(&'a mut dyn UnmarshalText),
}

/// Writes a value as a complete element
pub trait MarshalXml {
    /// Encode `self` as an element named by `start`
    ///
    /// The implementation must close every element it opens, and may not
    /// close elements opened outside of it.
    fn marshal_xml(&self, encoder: &mut dyn TokenEncoder, start: StartElement) -> XmlResult<()>;
}

/// Renders a value as text
pub trait MarshalText {
    /// Text form of the value
    fn marshal_text(&self) -> XmlResult<String>;
}

/// Reads a value from a complete element
pub trait UnmarshalXml {
    /// Decode `self` from the element opened by `start`
    ///
    /// The decoder reports the end of input when the element closes; the
    /// implementation must consume the element up to that point.
    fn unmarshal_xml(&mut self, decoder: &mut dyn TokenDecoder, start: &StartElement)
        -> XmlResult<()>;
}

/// Parses a value from text
pub trait UnmarshalText {
    /// Replace `self` from its text form
    fn unmarshal_text(&mut self, text: &str) -> XmlResult<()>;
}

/// Token sink handed to element hooks
pub trait TokenEncoder {
    /// Write one token
    fn encode_token(&mut self, token: Token) -> XmlResult<()>;

    /// Encode a value using `start` as its outermost element
    fn encode_element(&mut self, value: &dyn XmlValue, start: StartElement) -> XmlResult<()>;
}

/// Token source handed to element hooks
pub trait TokenDecoder {
    /// Next token, or `None` at the end of the current element
    fn token(&mut self) -> XmlResult<Option<Token>>;

    /// Decode the element opened by `start` into `value`
    fn decode_element(&mut self, value: &mut dyn XmlValue, start: &StartElement)
        -> XmlResult<()>;

    /// Consume tokens up to the end of the most recently opened element
    fn skip(&mut self) -> XmlResult<()>;

    /// Raw markup up to the end of the innermost open element
    fn read_inner_xml(&mut self) -> XmlResult<String>;
}
