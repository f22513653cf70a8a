//! Core binding engine
//!
//! This module contains the value model, schema declarations, type
//! descriptors and their cache, the namespace-aware writer, and the encoder
//! and decoder built on top of them.

pub mod cache;
pub mod decoder;
pub mod descriptor;
pub mod encoder;
pub mod error;
pub mod hooks;
pub mod namespace;
pub mod schema;
pub mod token;
pub mod value;
pub mod writer;

pub use cache::DescriptorCache;
pub use decoder::{decode_into, from_reader, from_slice, from_str, DecodeOptions, Decoder};
pub use descriptor::{FieldInfo, FieldKind, TypeDescriptor};
pub use encoder::{to_string, to_vec, to_vec_indented, to_vec_named, to_writer, EncodeOptions, Encoder};
pub use error::{XmlError, XmlResult};
pub use hooks::{
    DecodeHook, EncodeHook, MarshalText, MarshalXml, TokenDecoder, TokenEncoder, UnmarshalText,
    UnmarshalXml,
};
pub use namespace::ns;
pub use schema::{FieldDecl, XmlSchema};
pub use token::{Attr, EndElement, Name, StartElement, Token};
pub use value::{ValueMut, ValueRef, XmlRecord, XmlScalar, XmlSeq, XmlValue};
