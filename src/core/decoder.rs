//! Value decoder
//!
//! Reads XML with `quick_xml::NsReader` and fills values through their
//! [`ValueMut`] views, matching elements and attributes against the same
//! descriptors the encoder uses.
//!
//! Typed entry points decode into a fresh `Default` value and hand it back
//! only on success.

use crate::core::cache::DescriptorCache;
use crate::core::descriptor::{FieldKind, TypeDescriptor};
use crate::core::error::{XmlError, XmlResult};
use crate::core::hooks::{DecodeHook, TokenDecoder, UnmarshalXml};
use crate::core::namespace::ns;
use crate::core::token::{Attr, EndElement, Name, StartElement, Token};
use crate::core::value::{field_at_mut, ValueMut, XmlRecord, XmlValue};
use crate::utils::chars::line_at;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;
use std::borrow::Cow;
use std::io::Read;
use std::sync::Arc;
use tracing::trace;

/// Default limit for [`from_reader`]
pub const DEFAULT_MAX_INPUT_SIZE: usize = 16 * 1024 * 1024;

/// Decoder configuration
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Largest input [`from_reader`] accepts, in bytes
    pub max_input_size: usize,
    /// Descriptor cache; the global cache when unset
    pub cache: Option<Arc<DescriptorCache>>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_input_size: DEFAULT_MAX_INPUT_SIZE,
            cache: None,
        }
    }
}

impl DecodeOptions {
    /// Default options: 16 MiB limit, global cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the input size limit
    pub fn max_input_size(mut self, limit: usize) -> Self {
        self.max_input_size = limit;
        self
    }

    /// Use a dedicated descriptor cache
    pub fn cache(mut self, cache: Arc<DescriptorCache>) -> Self {
        self.cache = Some(cache);
        self
    }
}

struct RawToken {
    token: Token,
    start: usize,
    end: usize,
}

/// Reads tokens and values from an in-memory document
pub struct Decoder<'a> {
    input: &'a [u8],
    reader: NsReader<&'a [u8]>,
    cache: Arc<DescriptorCache>,
    /// Names of the open elements
    stack: Vec<Name>,
    /// Depths at which element hooks see the end of input
    eof_marks: Vec<usize>,
    peeked: Option<RawToken>,
    stashed: Option<RawToken>,
    last_start: usize,
    last_end: usize,
}

impl<'a> Decoder<'a> {
    /// Create a decoder over a complete document
    pub fn new(input: &'a [u8]) -> Self {
        let mut reader = NsReader::from_reader(input);
        let config = reader.config_mut();
        config.expand_empty_elements = true;
        config.check_end_names = true;
        config.trim_text(false);
        Self {
            input,
            reader,
            cache: DescriptorCache::global(),
            stack: Vec::new(),
            eof_marks: Vec::new(),
            peeked: None,
            stashed: None,
            last_start: 0,
            last_end: 0,
        }
    }

    /// Apply options
    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        if let Some(cache) = options.cache {
            self.cache = cache;
        }
        self
    }

    /// Decode the first element of the document into `value`
    pub fn decode(&mut self, value: &mut dyn XmlValue) -> XmlResult<()> {
        loop {
            match self.take_raw()? {
                Some(Token::Start(start)) => return self.unmarshal(value, &start),
                Some(_) => {}
                None => return Err(self.syntax_at("no root element", self.input.len())),
            }
        }
    }

    /// Decode the element opened by `start`, already read, into `value`
    pub fn decode_element(&mut self, value: &mut dyn XmlValue, start: &StartElement) -> XmlResult<()> {
        self.unmarshal(value, start)
    }

    /// Next token; `None` at the end of the document, or at the end of the
    /// element handed to an element hook
    pub fn token(&mut self) -> XmlResult<Option<Token>> {
        let at_end = matches!(
            self.peek_raw()?,
            Some(RawToken {
                token: Token::End(_),
                ..
            })
        );
        if at_end && self.eof_marks.last() == Some(&self.stack.len()) {
            return Ok(None);
        }
        self.take_raw()
    }

    /// Consume tokens up to and including the end of the innermost open element
    pub fn skip(&mut self) -> XmlResult<()> {
        let mut depth = 0usize;
        loop {
            match self.token()? {
                Some(Token::Start(_)) => depth += 1,
                Some(Token::End(_)) => {
                    if depth == 0 {
                        return Ok(());
                    }
                    depth -= 1;
                }
                Some(_) => {}
                None => return Ok(()),
            }
        }
    }

    /// Raw markup between the last token read and the end of the innermost
    /// open element
    ///
    /// The end tag is consumed too, except for the element handed to an
    /// element hook, whose end the engine reads after the hook returns.
    pub fn read_inner_xml(&mut self) -> XmlResult<String> {
        let from = self.last_end;
        let depth = self.stack.len();
        loop {
            let next = self.peek_raw()?.map(|raw| match raw.token {
                Token::End(_) => Some(raw.start),
                _ => None,
            });
            match next {
                None => return Err(self.unexpected_eof()),
                Some(Some(to)) if self.stack.len() == depth => {
                    if self.eof_marks.last() != Some(&depth) {
                        self.take_raw()?;
                    }
                    let to = to.max(from);
                    return Ok(self.utf8(&self.input[from..to], from)?.to_string());
                }
                Some(_) => {
                    self.take_raw()?;
                }
            }
        }
    }

    fn position(&self) -> usize {
        self.reader.buffer_position() as usize
    }

    fn syntax_at(&self, message: impl Into<String>, offset: usize) -> XmlError {
        XmlError::Syntax {
            message: message.into(),
            line: line_at(self.input, offset),
        }
    }

    fn unexpected_eof(&self) -> XmlError {
        self.syntax_at("unexpected EOF", self.input.len())
    }

    fn utf8<'b>(&self, bytes: &'b [u8], offset: usize) -> XmlResult<&'b str> {
        std::str::from_utf8(bytes).map_err(|e| self.syntax_at(format!("invalid UTF-8: {}", e), offset))
    }

    fn text(&self, raw: &[u8], offset: usize) -> XmlResult<String> {
        // Line breaks are normalized before references, so `&#xD;` keeps its `\r`
        let raw = normalize_newlines(Cow::Borrowed(self.utf8(raw, offset)?));
        let text = unescape(&raw).map_err(|e| self.syntax_at(e.to_string(), offset))?;
        Ok(text.into_owned())
    }

    fn peek_raw(&mut self) -> XmlResult<Option<&RawToken>> {
        if self.peeked.is_none() {
            self.peeked = self.read_raw()?;
        }
        Ok(self.peeked.as_ref())
    }

    fn take_raw(&mut self) -> XmlResult<Option<Token>> {
        let raw = match self.peeked.take() {
            Some(raw) => Some(raw),
            None => self.read_raw()?,
        };
        let Some(raw) = raw else {
            return Ok(None);
        };
        self.last_start = raw.start;
        self.last_end = raw.end;
        match &raw.token {
            Token::Start(start) => self.stack.push(start.name.clone()),
            Token::End(_) => {
                self.stack.pop();
            }
            _ => {}
        }
        Ok(Some(raw.token))
    }

    /// Read the next token, merging adjacent text and entity references
    fn read_raw(&mut self) -> XmlResult<Option<RawToken>> {
        if let Some(raw) = self.stashed.take() {
            return Ok(Some(raw));
        }
        let mut text: Option<(String, usize)> = None;
        loop {
            let start = self.position();
            let result = self
                .reader
                .read_resolved_event()
                .map(|(resolved, event)| (resolved_space(resolved), event));
            let (space, event) = match result {
                Ok(read) => read,
                Err(e) => {
                    let offset = self.reader.error_position() as usize;
                    return Err(self.syntax_at(e.to_string(), offset));
                }
            };

            let piece = match &event {
                Event::Text(e) => Some(self.text(e, start)?),
                Event::GeneralRef(e) => {
                    let name = self.utf8(e, start)?;
                    let entity = format!("&{};", name);
                    let resolved = unescape(&entity).map_err(|_| {
                        self.syntax_at(format!("invalid character entity {}", entity), start)
                    })?;
                    Some(resolved.into_owned())
                }
                _ => None,
            };
            if let Some(piece) = piece {
                match &mut text {
                    Some((buf, _)) => buf.push_str(&piece),
                    None => text = Some((piece, start)),
                }
                continue;
            }

            let token = self.convert(space, event, start)?;
            let raw = token.map(|token| RawToken {
                token,
                start,
                end: self.position(),
            });
            if let Some((buf, text_start)) = text {
                self.stashed = raw;
                return Ok(Some(RawToken {
                    token: Token::CharData(buf),
                    start: text_start,
                    end: start,
                }));
            }
            return Ok(raw);
        }
    }

    fn convert(&self, space: String, event: Event<'a>, offset: usize) -> XmlResult<Option<Token>> {
        let token = match event {
            Event::Start(e) => {
                let local = self.utf8(e.local_name().as_ref(), offset)?.to_string();
                let attrs = self.attributes(&e, offset)?;
                Token::Start(StartElement {
                    name: Name::new(space, local),
                    attrs,
                })
            }
            Event::End(e) => {
                let local = self.utf8(e.local_name().as_ref(), offset)?.to_string();
                Token::End(EndElement {
                    name: Name::new(space, local),
                })
            }
            Event::CData(e) => Token::CharData(normalize_newlines(Cow::Borrowed(
                self.utf8(&e, offset)?,
            ))),
            Event::Comment(e) => Token::Comment(self.utf8(&e, offset)?.to_string()),
            Event::Decl(e) => {
                let content = self.utf8(&e, offset)?;
                let inst = content.strip_prefix("xml").unwrap_or(content).trim();
                Token::ProcInst {
                    target: "xml".to_string(),
                    inst: inst.to_string(),
                }
            }
            Event::PI(e) => {
                let content = self.utf8(&e, offset)?;
                let (target, inst) = match content.find(char::is_whitespace) {
                    Some(i) => (&content[..i], content[i..].trim_start()),
                    None => (content, ""),
                };
                Token::ProcInst {
                    target: target.to_string(),
                    inst: inst.to_string(),
                }
            }
            Event::DocType(e) => {
                Token::Directive(format!("DOCTYPE {}", self.utf8(&e, offset)?.trim_start()))
            }
            Event::Eof => {
                if !self.stack.is_empty() {
                    return Err(self.unexpected_eof());
                }
                return Ok(None);
            }
            Event::Empty(_) | Event::Text(_) | Event::GeneralRef(_) => {
                return Err(XmlError::InternalError(
                    "unexpected event from the XML reader".to_string(),
                ))
            }
        };
        Ok(Some(token))
    }

    fn attributes(&self, e: &BytesStart<'_>, offset: usize) -> XmlResult<Vec<Attr>> {
        let mut attrs = Vec::new();
        for attr in e.attributes().with_checks(false) {
            let attr = attr.map_err(|err| self.syntax_at(err.to_string(), offset))?;
            let key = self.utf8(attr.key.as_ref(), offset)?;
            let name = if key == ns::XMLNS_PREFIX {
                Name::local(ns::XMLNS_PREFIX)
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                Name::new(ns::XMLNS, prefix)
            } else {
                let (resolved, local) = self.reader.resolve_attribute(attr.key);
                let local = self.utf8(local.as_ref(), offset)?.to_string();
                Name::new(resolved_space(resolved), local)
            };
            let value = self.text(&attr.value, offset)?;
            attrs.push(Attr::new(name, value));
        }
        Ok(attrs)
    }

    /// Consume tokens through the end of the innermost open element
    fn skip_element(&mut self) -> XmlResult<()> {
        let mut depth = 0usize;
        loop {
            match self.take_raw()? {
                Some(Token::Start(_)) => depth += 1,
                Some(Token::End(_)) => {
                    if depth == 0 {
                        return Ok(());
                    }
                    depth -= 1;
                }
                Some(_) => {}
                None => return Err(self.unexpected_eof()),
            }
        }
    }

    /// Character data directly inside the current element; child elements
    /// are skipped
    fn collect_text(&mut self) -> XmlResult<String> {
        let mut text = String::new();
        loop {
            match self.take_raw()? {
                Some(Token::CharData(data)) => text.push_str(&data),
                Some(Token::Start(_)) => self.skip_element()?,
                Some(Token::End(_)) => return Ok(text),
                Some(_) => {}
                None => return Err(self.unexpected_eof()),
            }
        }
    }

    fn unmarshal(&mut self, value: &mut dyn XmlValue, start: &StartElement) -> XmlResult<()> {
        let type_name = value.type_name();
        match value.decode_hook() {
            Some(DecodeHook::Element(hook)) => return self.unmarshal_hook(hook, start, type_name),
            Some(DecodeHook::Text(hook)) => {
                let text = self.collect_text()?;
                return hook.unmarshal_text(&text);
            }
            None => {}
        }

        match value.as_value_mut() {
            ValueMut::Seq(seq) => {
                let len = seq.len();
                let result = self.unmarshal(seq.push_default(), start);
                if result.is_err() {
                    seq.truncate(len);
                }
                result
            }
            ValueMut::Scalar(scalar) => {
                let text = self.collect_text()?;
                scalar.set_text(&text)
            }
            ValueMut::Name(name) => {
                *name = start.name.clone();
                self.skip_element()
            }
            ValueMut::Record(record) => self.unmarshal_record(record, start),
            ValueMut::Attr(_) | ValueMut::Opaque => Err(XmlError::UnsupportedType(format!(
                "cannot decode element <{}> into {}",
                start.name.local, type_name
            ))),
            ValueMut::Unsupported(kind) => Err(XmlError::UnsupportedType(format!(
                "{} ({})",
                type_name, kind
            ))),
        }
    }

    fn unmarshal_hook(
        &mut self,
        hook: &mut dyn UnmarshalXml,
        start: &StartElement,
        owner: &str,
    ) -> XmlResult<()> {
        let mark = self.stack.len();
        self.eof_marks.push(mark);
        let result = hook.unmarshal_xml(self, start);
        self.eof_marks.pop();
        result?;

        let at_end = matches!(
            self.peek_raw()?,
            Some(RawToken {
                token: Token::End(_),
                ..
            })
        );
        if !at_end || self.stack.len() != mark {
            return Err(XmlError::Malformed(format!(
                "{} did not consume entire <{}> element",
                owner, start.name.local
            )));
        }
        self.take_raw()?;
        Ok(())
    }

    fn unmarshal_record(
        &mut self,
        record: &mut dyn XmlRecord,
        start: &StartElement,
    ) -> XmlResult<()> {
        let descriptor = self.cache.descriptor(record)?;
        let inner_start = self.last_end;

        if let Some(info) = &descriptor.name_field {
            if !info.name.is_empty() && !info.matches(&start.name) {
                return Err(XmlError::BadValue(format!(
                    "expected element <{}>{} but have <{}>{}",
                    info.name,
                    in_namespace(&info.space),
                    start.name.local,
                    in_namespace(&start.name.space)
                )));
            }
            if let ValueMut::Name(name) = field_at_mut(record, &info.index)?.as_value_mut() {
                *name = start.name.clone();
            }
        }

        let any_attr = descriptor.fields_of(FieldKind::AnyAttr).next();
        for attr in &start.attrs {
            let target = descriptor
                .fields_of(FieldKind::Attr)
                .find(|info| info.matches(&attr.name))
                .or(any_attr);
            if let Some(info) = target {
                unmarshal_attr(field_at_mut(record, &info.index)?, attr)?;
            }
        }

        let text_field = descriptor
            .fields
            .iter()
            .find(|info| matches!(info.kind, FieldKind::CharData | FieldKind::CData));
        let comment_field = descriptor.fields_of(FieldKind::Comment).next();
        let inner_field = descriptor.fields_of(FieldKind::InnerXml).next();
        let any_field = descriptor.fields_of(FieldKind::Any).next();

        let mut text = String::new();
        let mut comments = String::new();
        let inner_end = loop {
            match self.take_raw()? {
                Some(Token::Start(child)) => {
                    if self.unmarshal_path(&descriptor, record, &[], &child)? {
                        continue;
                    }
                    match any_field {
                        Some(info) => self.unmarshal(field_at_mut(record, &info.index)?, &child)?,
                        None => {
                            trace!(
                                element = %child.name.local,
                                record = descriptor.type_name,
                                "skipping unknown element"
                            );
                            self.skip_element()?;
                        }
                    }
                }
                Some(Token::End(_)) => break self.last_start,
                Some(Token::CharData(data)) => {
                    if text_field.is_some() {
                        text.push_str(&data);
                    }
                }
                Some(Token::Comment(data)) => {
                    if comment_field.is_some() {
                        comments.push_str(&data);
                    }
                }
                Some(_) => {}
                None => return Err(self.unexpected_eof()),
            }
        };

        if let Some(info) = text_field {
            if !text.is_empty() {
                assign_text(field_at_mut(record, &info.index)?, &text)?;
            }
        }
        if let Some(info) = comment_field {
            if !comments.is_empty() {
                assign_text(field_at_mut(record, &info.index)?, &comments)?;
            }
        }
        if let Some(info) = inner_field {
            let raw = self.utf8(&self.input[inner_start..inner_end.max(inner_start)], inner_start)?;
            if !raw.is_empty() {
                if let ValueMut::Scalar(scalar) = field_at_mut(record, &info.index)?.as_value_mut() {
                    if scalar.is_string() {
                        scalar.set_text(raw)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Decode `child` into the element field it names below `parents`
    ///
    /// Returns `false` when no field matches. A child that opens a wrapper
    /// path is consumed whole, its own children matched recursively.
    fn unmarshal_path(
        &mut self,
        descriptor: &TypeDescriptor,
        record: &mut dyn XmlRecord,
        parents: &[String],
        child: &StartElement,
    ) -> XmlResult<bool> {
        let mut wrapper: Option<&[String]> = None;
        for info in descriptor.fields_of(FieldKind::Element) {
            if info.parents.len() < parents.len()
                || info.parents[..parents.len()] != *parents
                || (!info.space.is_empty() && info.space != child.name.space)
            {
                continue;
            }
            if info.parents.len() == parents.len() && info.name == child.name.local {
                self.unmarshal(field_at_mut(record, &info.index)?, child)?;
                return Ok(true);
            }
            if info.parents.len() > parents.len() && info.parents[parents.len()] == child.name.local {
                wrapper = Some(&info.parents[..=parents.len()]);
                break;
            }
        }

        let Some(path) = wrapper else {
            return Ok(false);
        };
        loop {
            match self.take_raw()? {
                Some(Token::Start(inner)) => {
                    if !self.unmarshal_path(descriptor, record, path, &inner)? {
                        self.skip_element()?;
                    }
                }
                Some(Token::End(_)) => return Ok(true),
                Some(_) => {}
                None => return Err(self.unexpected_eof()),
            }
        }
    }
}

impl TokenDecoder for Decoder<'_> {
    fn token(&mut self) -> XmlResult<Option<Token>> {
        Decoder::token(self)
    }

    fn decode_element(&mut self, value: &mut dyn XmlValue, start: &StartElement) -> XmlResult<()> {
        Decoder::decode_element(self, value, start)
    }

    fn skip(&mut self) -> XmlResult<()> {
        Decoder::skip(self)
    }

    fn read_inner_xml(&mut self) -> XmlResult<String> {
        Decoder::read_inner_xml(self)
    }
}

fn resolved_space(resolved: ResolveResult<'_>) -> String {
    match resolved {
        ResolveResult::Bound(namespace) => String::from_utf8_lossy(namespace.as_ref()).into_owned(),
        ResolveResult::Unbound => String::new(),
        ResolveResult::Unknown(prefix) if prefix == ns::XML_PREFIX.as_bytes() => ns::XML.to_string(),
        ResolveResult::Unknown(prefix) => String::from_utf8_lossy(&prefix).into_owned(),
    }
}

fn normalize_newlines(text: Cow<'_, str>) -> String {
    if text.contains('\r') {
        text.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        text.into_owned()
    }
}

fn in_namespace(space: &str) -> String {
    if space.is_empty() {
        String::new()
    } else {
        format!(" in namespace {}", space)
    }
}

fn assign_text(value: &mut dyn XmlValue, text: &str) -> XmlResult<()> {
    let type_name = value.type_name();
    if let Some(DecodeHook::Text(hook)) = value.decode_hook() {
        return hook.unmarshal_text(text);
    }
    match value.as_value_mut() {
        ValueMut::Scalar(scalar) => scalar.set_text(text),
        _ => Err(XmlError::UnsupportedType(format!(
            "cannot decode character data into {}",
            type_name
        ))),
    }
}

fn unmarshal_attr(value: &mut dyn XmlValue, attr: &Attr) -> XmlResult<()> {
    let type_name = value.type_name();
    if let Some(DecodeHook::Text(hook)) = value.decode_hook() {
        return hook.unmarshal_text(&attr.value);
    }
    match value.as_value_mut() {
        ValueMut::Seq(seq) => {
            let len = seq.len();
            let result = unmarshal_attr(seq.push_default(), attr);
            if result.is_err() {
                seq.truncate(len);
            }
            result
        }
        ValueMut::Attr(target) => {
            *target = attr.clone();
            Ok(())
        }
        ValueMut::Scalar(scalar) => scalar.set_text(&attr.value),
        ValueMut::Record(_) | ValueMut::Name(_) | ValueMut::Opaque | ValueMut::Unsupported(_) => {
            Err(XmlError::UnsupportedType(format!(
                "cannot decode attribute {} into {}",
                attr.name, type_name
            )))
        }
    }
}

/// Decode a value from bytes
pub fn from_slice<T: XmlValue + Default>(input: &[u8]) -> XmlResult<T> {
    let mut value = T::default();
    Decoder::new(input).decode(&mut value)?;
    Ok(value)
}

/// Decode a value from a string
pub fn from_str<T: XmlValue + Default>(input: &str) -> XmlResult<T> {
    from_slice(input.as_bytes())
}

/// Read a whole document, up to the configured size limit, and decode it
pub fn from_reader<R: Read, T: XmlValue + Default>(reader: R, options: DecodeOptions) -> XmlResult<T> {
    let limit = options.max_input_size;
    let mut input = Vec::new();
    reader
        .take((limit as u64).saturating_add(1))
        .read_to_end(&mut input)?;
    if input.len() > limit {
        return Err(XmlError::LimitExceeded(limit));
    }
    let mut value = T::default();
    Decoder::new(&input).with_options(options).decode(&mut value)?;
    Ok(value)
}

/// Decode into `target`, which is left untouched on failure
pub fn decode_into<T: XmlValue + Default>(input: &[u8], target: &mut T) -> XmlResult<()> {
    *target = from_slice(input)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hooks::UnmarshalText;
    use crate::xml_schema;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Default, PartialEq)]
    struct Note {
        lang: String,
        text: String,
        remark: String,
    }

    xml_schema!(Note {
        lang: "http://www.w3.org/XML/1998/namespace lang,attr",
        text: ",chardata",
        remark: ",comment",
    });

    #[derive(Debug, Default, PartialEq)]
    struct Book {
        xml_name: Name,
        id: u32,
        tags: Vec<String>,
        authors: Vec<String>,
        notes: Vec<Note>,
        raw: String,
    }

    xml_schema!(Book {
        xml_name: "book",
        id: "id,attr",
        tags: "tags,attr",
        authors: "authors>author",
        notes: "note",
        raw: ",innerxml",
    });

    #[derive(Debug, Default, PartialEq)]
    struct Upper(String);

    impl UnmarshalText for Upper {
        fn unmarshal_text(&mut self, text: &str) -> XmlResult<()> {
            self.0 = text.to_uppercase();
            Ok(())
        }
    }

    impl XmlValue for Upper {
        fn type_name(&self) -> &'static str {
            "Upper"
        }

        fn as_value_ref(&self) -> crate::core::value::ValueRef<'_> {
            crate::core::value::ValueRef::Opaque
        }

        fn as_value_mut(&mut self) -> ValueMut<'_> {
            ValueMut::Opaque
        }

        fn decode_hook(&mut self) -> Option<DecodeHook<'_>> {
            Some(DecodeHook::Text(self))
        }
    }

    /// Counts child elements; with the flag set it stops after the first
    #[derive(Debug, Default)]
    struct ChildCount(usize, bool);

    impl UnmarshalXml for ChildCount {
        fn unmarshal_xml(&mut self, decoder: &mut dyn TokenDecoder, _start: &StartElement) -> XmlResult<()> {
            while let Some(token) = decoder.token()? {
                if let Token::Start(_) = token {
                    self.0 += 1;
                    if self.1 {
                        return Ok(());
                    }
                    decoder.skip()?;
                }
            }
            Ok(())
        }
    }

    impl XmlValue for ChildCount {
        fn type_name(&self) -> &'static str {
            "ChildCount"
        }

        fn as_value_ref(&self) -> crate::core::value::ValueRef<'_> {
            crate::core::value::ValueRef::Opaque
        }

        fn as_value_mut(&mut self) -> ValueMut<'_> {
            ValueMut::Opaque
        }

        fn decode_hook(&mut self) -> Option<DecodeHook<'_>> {
            Some(DecodeHook::Element(self))
        }
    }

    #[test]
    fn test_decode_record() {
        let input = concat!(
            r#"<book id=" 7 " tags="a" tags="b">"#,
            "<authors><author>Ann</author><author>Bo</author></authors>",
            r#"<note xml:lang="en">Hi &amp; bye<!--c--></note>"#,
            "<unknown><x/></unknown>",
            "</book>"
        );
        let book: Book = from_str(input).unwrap();
        assert_eq!(book.xml_name, Name::local("book"));
        assert_eq!(book.id, 7);
        assert_eq!(book.tags, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(book.authors, vec!["Ann".to_string(), "Bo".to_string()]);
        assert_eq!(
            book.notes,
            vec![Note {
                lang: "en".into(),
                text: "Hi & bye".into(),
                remark: "c".into(),
            }]
        );
        assert!(book.raw.starts_with("<authors><author>Ann</author>"));
        assert!(book.raw.ends_with("<unknown><x/></unknown>"));
    }

    #[test]
    fn test_name_field_mismatch() {
        let err = from_str::<Book>("<magazine/>").unwrap_err();
        assert!(matches!(err, XmlError::BadValue(_)));
    }

    #[test]
    fn test_bad_scalar() {
        let err = from_str::<Book>(r#"<book id="x"/>"#).unwrap_err();
        assert!(matches!(err, XmlError::BadValue(_)));
    }

    #[test]
    fn test_syntax_error_line() {
        let err = from_str::<Book>("<book>\n<note>\n</book>").unwrap_err();
        assert!(matches!(err, XmlError::Syntax { .. }));
        assert_eq!(err.line(), Some(3));

        let err = from_str::<Book>("<book>\n<note>").unwrap_err();
        assert!(matches!(err, XmlError::Syntax { .. }));
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn test_token_stream() {
        let input = "<?xml version=\"1.0\"?>\n<!DOCTYPE a><a:x xmlns:a=\"urn:a\" a:k=\"v\">t<![CDATA[<c>]]></a:x>";
        let mut decoder = Decoder::new(input.as_bytes());
        let mut tokens = Vec::new();
        while let Some(token) = decoder.token().unwrap() {
            tokens.push(token);
        }
        assert_eq!(
            tokens,
            vec![
                Token::ProcInst {
                    target: "xml".into(),
                    inst: "version=\"1.0\"".into(),
                },
                Token::CharData("\n".into()),
                Token::Directive("DOCTYPE a".into()),
                Token::Start(StartElement {
                    name: Name::new("urn:a", "x"),
                    attrs: vec![
                        Attr::new(Name::new(ns::XMLNS, "a"), "urn:a"),
                        Attr::new(Name::new("urn:a", "k"), "v"),
                    ],
                }),
                Token::CharData("t".into()),
                Token::CharData("<c>".into()),
                Token::End(EndElement {
                    name: Name::new("urn:a", "x"),
                }),
            ]
        );
    }

    #[test]
    fn test_read_inner_xml() {
        let mut decoder = Decoder::new(b"<a><b>1</b><c/></a>");
        assert!(matches!(decoder.token().unwrap(), Some(Token::Start(_))));
        assert_eq!(decoder.read_inner_xml().unwrap(), "<b>1</b><c/>");
        assert_eq!(decoder.token().unwrap(), None);
    }

    #[test]
    fn test_text_hook() {
        let mut value = Upper::default();
        Decoder::new(b"<u>abc<i>skipped</i>d</u>")
            .decode(&mut value)
            .unwrap();
        assert_eq!(value, Upper("ABCD".into()));
    }

    #[test]
    fn test_element_hook_sees_end_of_element() {
        let mut value = ChildCount::default();
        Decoder::new(b"<r><a><x/></a><b/>text</r>")
            .decode(&mut value)
            .unwrap();
        assert_eq!(value.0, 2);
    }

    #[test]
    fn test_element_hook_must_consume_element() {
        let mut value = ChildCount(0, true);
        let err = Decoder::new(b"<r><a><x/></a></r>")
            .decode(&mut value)
            .unwrap_err();
        assert!(matches!(err, XmlError::Malformed(_)));
    }

    #[test]
    fn test_from_reader_limit() {
        let input = b"<book id=\"1\"></book>".to_vec();
        let err = from_reader::<_, Book>(&input[..], DecodeOptions::new().max_input_size(8)).unwrap_err();
        assert!(matches!(err, XmlError::LimitExceeded(8)));

        let book: Book = from_reader(&input[..], DecodeOptions::new()).unwrap();
        assert_eq!(book.id, 1);
    }

    #[test]
    fn test_decode_into_keeps_target_on_failure() {
        let mut book = Book {
            id: 3,
            ..Book::default()
        };
        assert!(decode_into(b"<book id=\"4\"><note>", &mut book).is_err());
        assert_eq!(book.id, 3);
        decode_into(b"<book id=\"4\"/>", &mut book).unwrap();
        assert_eq!(book.id, 4);
    }

    #[test]
    fn test_injected_cache_is_used() {
        let cache = Arc::new(DescriptorCache::new());
        let mut book = Book::default();
        Decoder::new(b"<book id=\"2\"/>")
            .with_options(DecodeOptions::new().cache(cache.clone()))
            .decode(&mut book)
            .unwrap();
        assert_eq!(book.id, 2);
        let descriptor = cache.descriptor(&book).unwrap();
        let raw = descriptor.fields.iter().find(|info| info.ident == "raw");
        assert_eq!(raw.map(|info| info.kind), Some(FieldKind::InnerXml));
    }
}
