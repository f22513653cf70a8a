//! # xmlbind
//!
//! Declarative, namespace-aware XML binding for typed Rust values.
//!
//! A struct declares once how each of its fields maps to XML, as a tag
//! string, and the engine encodes and decodes it from that table:
//!
//! - elements, attributes, character data, CDATA, comments, raw inner markup
//!   and catch-all fields;
//! - wrapper paths (`"Location>URL"`) that nest a field below synthetic
//!   elements;
//! - embedded records whose fields are spliced into the outer record;
//! - `omitempty` for zero values;
//! - namespaces, with prefixes declared and reused per element scope;
//! - hooks for types that encode or decode themselves.
//!
//! ```
//! use xmlbind::{xml_schema, Name};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Period {
//!     id: String,
//! }
//!
//! xml_schema!(Period {
//!     id: "id,attr,omitempty",
//! });
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Mpd {
//!     xml_name: Name,
//!     kind: String,
//!     periods: Vec<Period>,
//! }
//!
//! xml_schema!(Mpd {
//!     xml_name: "urn:mpeg:dash:schema:mpd:2011 MPD",
//!     kind: "type,attr",
//!     periods: "Period",
//! });
//!
//! let mpd = Mpd {
//!     kind: "static".into(),
//!     periods: vec![Period { id: "period-0".into() }],
//!     ..Default::default()
//! };
//! let xml = xmlbind::to_string(&mpd).unwrap();
//! assert_eq!(
//!     xml,
//!     r#"<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" type="static"><Period id="period-0"></Period></MPD>"#
//! );
//!
//! let back: Mpd = xmlbind::from_str(&xml).unwrap();
//! assert_eq!(back.periods, mpd.periods);
//! ```

pub mod core;
pub mod types;
mod utils;

pub use crate::core::{
    decode_into, from_reader, from_slice, from_str, ns, to_string, to_vec, to_vec_indented,
    to_vec_named, to_writer, Attr, DecodeHook, DecodeOptions, Decoder, DescriptorCache,
    EncodeHook, EncodeOptions, Encoder, EndElement, FieldDecl, FieldInfo, FieldKind, MarshalText,
    MarshalXml, Name, StartElement, Token, TokenDecoder, TokenEncoder, TypeDescriptor,
    UnmarshalText, UnmarshalXml, ValueMut, ValueRef, XmlError, XmlRecord, XmlResult, XmlScalar,
    XmlSchema, XmlSeq, XmlValue,
};
pub use crate::types::{AnyElement, Bytes, SpaceSeparated};

/// Standard XML declaration, for callers to write before a document
///
/// The encoder never writes it.
pub const HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
