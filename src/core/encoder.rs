//! Value encoder
//!
//! Walks a value graph and writes it as XML. Records are laid out from their
//! cached [`TypeDescriptor`]: attributes first, then the remaining fields in
//! declaration order, opening and closing wrapper elements only where
//! adjacent fields' paths differ.

use crate::core::cache::DescriptorCache;
use crate::core::descriptor::{FieldInfo, FieldKind, TypeDescriptor};
use crate::core::error::{XmlError, XmlResult};
use crate::core::hooks::{EncodeHook, MarshalText, MarshalXml, TokenEncoder};
use crate::core::namespace::ns;
use crate::core::token::{Attr, Name, StartElement, Token};
use crate::core::value::{field_at, is_empty_value, settle, ValueRef, XmlRecord, XmlValue};
use crate::core::writer::Printer;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

/// Encoder configuration
#[derive(Debug, Clone, Default)]
pub struct EncodeOptions {
    /// Line prefix and per-level indentation unit
    pub indent: Option<(String, String)>,
    /// Preferred prefixes keyed by namespace URI
    pub prefix_hints: HashMap<String, String>,
    /// Descriptor cache; the global cache when unset
    pub cache: Option<Arc<DescriptorCache>>,
}

impl EncodeOptions {
    /// Default options: no indentation, global cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Put each element on its own line, starting with `prefix` followed by
    /// one `indent` per nesting level
    pub fn indent(mut self, prefix: impl Into<String>, indent: impl Into<String>) -> Self {
        self.indent = Some((prefix.into(), indent.into()));
        self
    }

    /// Prefer `prefix` when `uri` needs a prefixed declaration
    pub fn prefix_hint(mut self, uri: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.prefix_hints.insert(uri.into(), prefix.into());
        self
    }

    /// Use a dedicated descriptor cache
    pub fn cache(mut self, cache: Arc<DescriptorCache>) -> Self {
        self.cache = Some(cache);
        self
    }
}

/// Writes values as XML to a sink
pub struct Encoder<W: Write> {
    printer: Printer<W>,
    cache: Arc<DescriptorCache>,
}

impl<W: Write> Encoder<W> {
    /// Create an encoder with default options
    pub fn new(writer: W) -> Self {
        Self {
            printer: Printer::new(writer),
            cache: DescriptorCache::global(),
        }
    }

    /// Apply options
    pub fn with_options(mut self, options: EncodeOptions) -> Self {
        if let Some((prefix, indent)) = &options.indent {
            self.printer.set_indent(prefix, indent);
        }
        self.printer.set_prefix_hints(options.prefix_hints);
        if let Some(cache) = options.cache {
            self.cache = cache;
        }
        self
    }

    /// Encode a value and flush
    pub fn encode(&mut self, value: &dyn XmlValue) -> XmlResult<()> {
        self.marshal_value(value, None, None)?;
        self.printer.flush()
    }

    /// Encode a value using `start` as its outermost element, and flush
    pub fn encode_element(&mut self, value: &dyn XmlValue, start: StartElement) -> XmlResult<()> {
        self.marshal_value(value, None, Some(&start))?;
        self.printer.flush()
    }

    /// Write one token
    ///
    /// Does not flush: tokens are usually part of a larger encode.
    pub fn encode_token(&mut self, token: Token) -> XmlResult<()> {
        self.printer.write_token(token)
    }

    /// Flush the sink
    pub fn flush(&mut self) -> XmlResult<()> {
        self.printer.flush()
    }

    /// Flush and finish; fails if an element is still open
    pub fn close(&mut self) -> XmlResult<()> {
        self.printer.close()
    }

    /// Underlying sink
    pub fn get_ref(&self) -> &W {
        self.printer.get_ref()
    }

    /// Consume the encoder and return the sink
    pub fn into_inner(self) -> W {
        self.printer.into_inner()
    }

    fn marshal_value(
        &mut self,
        value: &dyn XmlValue,
        finfo: Option<&FieldInfo>,
        template: Option<&StartElement>,
    ) -> XmlResult<()> {
        if let Some(template) = template {
            if template.name.local.is_empty() {
                return Err(XmlError::Malformed(
                    "encode_element with a start element missing its name".to_string(),
                ));
            }
        }
        if finfo.is_some_and(|info| info.omit_empty) && is_empty_value(value) {
            return Ok(());
        }
        let Some(value) = settle(value) else {
            return Ok(());
        };

        if let Some(hook) = value.encode_hook() {
            let start = default_start(value, finfo, template);
            return match hook {
                EncodeHook::Element(hook) => self.marshal_hook(hook, start, value.type_name()),
                EncodeHook::Text(hook) => self.marshal_text_hook(hook, start),
            };
        }

        let record = match value.as_value_ref() {
            ValueRef::Seq(seq) => {
                for i in 0..seq.len() {
                    if let Some(item) = seq.item(i) {
                        self.marshal_value(item, finfo, template)?;
                    }
                }
                return Ok(());
            }
            ValueRef::Optional(_) => return Ok(()),
            ValueRef::Unsupported(kind) => {
                return Err(XmlError::UnsupportedType(format!(
                    "{} ({})",
                    value.type_name(),
                    kind
                )))
            }
            ValueRef::Opaque | ValueRef::Name(_) | ValueRef::Attr(_) => {
                return Err(XmlError::UnsupportedType(format!(
                    "{} cannot be encoded as an element",
                    value.type_name()
                )))
            }
            ValueRef::Record(record) => Some(record),
            ValueRef::Scalar(_) => None,
        };
        let descriptor = match record {
            Some(record) => Some(self.cache.descriptor(record)?),
            None => None,
        };

        let mut start = StartElement::default();
        if let Some(template) = template {
            start.name = template.name.clone();
            start.attrs.extend(template.attrs.iter().cloned());
        } else if let (Some(descriptor), Some(record)) = (&descriptor, record) {
            if let Some(name) = record_name(descriptor, record) {
                start.name = name;
            }
        }
        if start.name.local.is_empty() {
            if let Some(info) = finfo {
                start.name = info.xml_name();
            }
        }
        if start.name.local.is_empty() {
            let name = bare_type_name(value.type_name());
            if name.is_empty() {
                return Err(XmlError::Malformed(format!(
                    "no element name for {}",
                    value.type_name()
                )));
            }
            start.name.local = name.to_string();
        }

        if let (Some(descriptor), Some(record)) = (&descriptor, record) {
            for info in descriptor.fields.iter().filter(|info| info.kind.is_attr()) {
                let Some(field) = field_at(record, &info.index) else {
                    continue;
                };
                if info.omit_empty && is_empty_value(field) {
                    continue;
                }
                marshal_attr(&mut start, &info.xml_name(), field)?;
            }

            // A named record without a namespace must not inherit the parent's
            let has_xmlns = start
                .attrs
                .iter()
                .any(|attr| attr.name.space.is_empty() && attr.name.local == ns::XMLNS_PREFIX);
            if descriptor.name_field.is_some()
                && start.name.space.is_empty()
                && !has_xmlns
                && !self.printer.default_namespace().is_empty()
            {
                start
                    .attrs
                    .push(Attr::new(Name::local(ns::XMLNS_PREFIX), String::new()));
            }
        }

        self.printer.write_start(&start)?;
        match (value.as_value_ref(), &descriptor) {
            (ValueRef::Record(record), Some(descriptor)) => {
                self.marshal_record(descriptor, record)?
            }
            (ValueRef::Scalar(scalar), _) => self.printer.write_text(&scalar.to_text())?,
            _ => {}
        }
        self.printer.write_end(&start.name)?;
        self.printer.cached_error()
    }

    fn marshal_hook(
        &mut self,
        hook: &dyn MarshalXml,
        start: StartElement,
        owner: &str,
    ) -> XmlResult<()> {
        let mark = self.printer.push_marker();
        hook.marshal_xml(self, start)?;
        self.printer.pop_marker(mark, owner)
    }

    fn marshal_text_hook(&mut self, hook: &dyn MarshalText, start: StartElement) -> XmlResult<()> {
        self.printer.write_start(&start)?;
        let text = hook.marshal_text()?;
        self.printer.write_text(&text)?;
        self.printer.write_end(&start.name)
    }

    fn marshal_record(
        &mut self,
        descriptor: &TypeDescriptor,
        record: &dyn XmlRecord,
    ) -> XmlResult<()> {
        let mut wrappers: Vec<String> = Vec::new();
        for info in &descriptor.fields {
            if info.kind.is_attr() {
                continue;
            }
            // Behind an absent embedded record
            let Some(field) = field_at(record, &info.index) else {
                continue;
            };

            match info.kind {
                FieldKind::CharData | FieldKind::CData => {
                    self.trim_wrappers(&mut wrappers, &info.parents)?;
                    if let Some(text) = content_text(field, descriptor, info)? {
                        if info.kind == FieldKind::CData {
                            self.printer.write_cdata(&text)?;
                        } else {
                            self.printer.write_text(&text)?;
                        }
                    }
                    continue;
                }
                FieldKind::Comment => {
                    self.trim_wrappers(&mut wrappers, &info.parents)?;
                    let Some(value) = settle(field) else {
                        continue;
                    };
                    let text = match value.as_value_ref() {
                        ValueRef::Scalar(scalar) if scalar.is_string() => scalar.to_text(),
                        _ => {
                            return Err(XmlError::UnsupportedType(format!(
                                "bad type {} for comment field {} of {}",
                                value.type_name(),
                                info.ident,
                                descriptor.type_name
                            )))
                        }
                    };
                    if !text.is_empty() {
                        self.printer.write_comment(&text)?;
                    }
                    continue;
                }
                FieldKind::InnerXml => {
                    let Some(value) = settle(field) else {
                        continue;
                    };
                    if let ValueRef::Scalar(scalar) = value.as_value_ref() {
                        if scalar.is_string() {
                            self.printer.write_raw(&scalar.to_text())?;
                            continue;
                        }
                    }
                }
                kind if kind.is_element() => {
                    self.trim_wrappers(&mut wrappers, &info.parents)?;
                    if info.parents.len() > wrappers.len() && settle(field).is_some() {
                        let missing = info.parents[wrappers.len()..].to_vec();
                        for parent in missing {
                            self.printer
                                .write_start(&StartElement::new(Name::local(parent.clone())))?;
                            wrappers.push(parent);
                        }
                    }
                }
                _ => {}
            }
            self.marshal_value(field, Some(info), None)?;
        }
        self.trim_wrappers(&mut wrappers, &[])?;
        self.printer.cached_error()
    }

    /// Close wrappers down to the longest common prefix with `parents`
    fn trim_wrappers(&mut self, wrappers: &mut Vec<String>, parents: &[String]) -> XmlResult<()> {
        let split = wrappers
            .iter()
            .zip(parents)
            .take_while(|(open, wanted)| open == wanted)
            .count();
        while wrappers.len() > split {
            if let Some(open) = wrappers.pop() {
                self.printer.write_end(&Name::local(open))?;
            }
        }
        Ok(())
    }
}

impl<W: Write> TokenEncoder for Encoder<W> {
    fn encode_token(&mut self, token: Token) -> XmlResult<()> {
        Encoder::encode_token(self, token)
    }

    fn encode_element(&mut self, value: &dyn XmlValue, start: StartElement) -> XmlResult<()> {
        Encoder::encode_element(self, value, start)
    }
}

/// Element name given by a record's name field
fn record_name(descriptor: &TypeDescriptor, record: &dyn XmlRecord) -> Option<Name> {
    let info = descriptor.name_field.as_ref()?;
    if !info.name.is_empty() {
        return Some(info.xml_name());
    }
    let value = settle(field_at(record, &info.index)?)?;
    match value.as_value_ref() {
        ValueRef::Name(name) if !name.local.is_empty() => Some(name.clone()),
        _ => None,
    }
}

/// Start element for a hook: template, then field name, then type name
fn default_start(
    value: &dyn XmlValue,
    finfo: Option<&FieldInfo>,
    template: Option<&StartElement>,
) -> StartElement {
    if let Some(template) = template {
        return template.clone();
    }
    match finfo {
        Some(info) if !info.name.is_empty() => StartElement::new(info.xml_name()),
        _ => StartElement::new(Name::local(bare_type_name(value.type_name()))),
    }
}

fn marshal_attr(start: &mut StartElement, name: &Name, value: &dyn XmlValue) -> XmlResult<()> {
    let Some(value) = settle(value) else {
        return Ok(());
    };
    if let Some(EncodeHook::Text(hook)) = value.encode_hook() {
        start.attrs.push(Attr::new(name.clone(), hook.marshal_text()?));
        return Ok(());
    }
    match value.as_value_ref() {
        ValueRef::Seq(seq) => {
            for i in 0..seq.len() {
                if let Some(item) = seq.item(i) {
                    marshal_attr(start, name, item)?;
                }
            }
        }
        ValueRef::Attr(attr) => start.attrs.push(attr.clone()),
        ValueRef::Scalar(scalar) => start
            .attrs
            .push(Attr::new(name.clone(), scalar.to_text().into_owned())),
        ValueRef::Optional(_) => {}
        ValueRef::Record(_) | ValueRef::Name(_) | ValueRef::Opaque => {
            return Err(XmlError::UnsupportedType(format!(
                "{} cannot be encoded as attribute {}",
                value.type_name(),
                name
            )))
        }
        ValueRef::Unsupported(kind) => {
            return Err(XmlError::UnsupportedType(format!(
                "{} ({})",
                value.type_name(),
                kind
            )))
        }
    }
    Ok(())
}

/// Text of a character data field; `None` when the value is absent
fn content_text(
    field: &dyn XmlValue,
    descriptor: &TypeDescriptor,
    info: &FieldInfo,
) -> XmlResult<Option<String>> {
    let Some(value) = settle(field) else {
        return Ok(None);
    };
    if let Some(EncodeHook::Text(hook)) = value.encode_hook() {
        return hook.marshal_text().map(Some);
    }
    match value.as_value_ref() {
        ValueRef::Scalar(scalar) => Ok(Some(scalar.to_text().into_owned())),
        _ => Err(XmlError::UnsupportedType(format!(
            "bad type {} for character data field {} of {}",
            value.type_name(),
            info.ident,
            descriptor.type_name
        ))),
    }
}

/// Type name without module path or generic arguments
pub(crate) fn bare_type_name(type_name: &str) -> &str {
    let without_generics = type_name.split('<').next().unwrap_or(type_name);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}

/// Encode a value to bytes
pub fn to_vec<T: XmlValue>(value: &T) -> XmlResult<Vec<u8>> {
    let mut encoder = Encoder::new(Vec::new());
    encoder.encode(value)?;
    Ok(encoder.into_inner())
}

/// Encode a value to a string
pub fn to_string<T: XmlValue>(value: &T) -> XmlResult<String> {
    into_string(to_vec(value)?)
}

/// Encode a value with `name` as its root element name
pub fn to_vec_named<T: XmlValue>(value: &T, name: Name) -> XmlResult<Vec<u8>> {
    let mut encoder = Encoder::new(Vec::new());
    encoder.encode_element(value, StartElement::new(name))?;
    Ok(encoder.into_inner())
}

/// Encode a value with each element on its own indented line
pub fn to_vec_indented<T: XmlValue>(value: &T, prefix: &str, indent: &str) -> XmlResult<Vec<u8>> {
    let mut encoder =
        Encoder::new(Vec::new()).with_options(EncodeOptions::new().indent(prefix, indent));
    encoder.encode(value)?;
    Ok(encoder.into_inner())
}

/// Encode a value into a writer
pub fn to_writer<W: Write, T: XmlValue>(writer: W, value: &T) -> XmlResult<()> {
    let mut encoder = Encoder::new(writer);
    encoder.encode(value)
}

fn into_string(bytes: Vec<u8>) -> XmlResult<String> {
    String::from_utf8(bytes).map_err(|e| XmlError::InternalError(format!("non UTF-8 output: {}", e)))
}
