//! Low-level XML token writer
//!
//! Wraps a `quick_xml::Writer`, tracks open elements and their namespace
//! bindings, applies indentation, and keeps the first write error so that
//! every later write reports it again.

use crate::core::error::{XmlError, XmlResult};
use crate::core::namespace::{ns, ElementFrame, NamespaceScopes};
use crate::core::token::{is_valid_directive, Name, StartElement, Token};
use crate::utils::chars::{is_name, join_prefixed, split_prefixed};
use crate::utils::escape::{escape_attr, escape_text, replace_invalid};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesCData, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use std::borrow::Cow;
use quick_xml::Writer;
use std::collections::HashMap;
use std::io::{self, Write};

/// Token writer with element and namespace bookkeeping
pub struct Printer<W: Write> {
    writer: Writer<W>,
    scopes: NamespaceScopes,
    prefix: String,
    indent: String,
    depth: usize,
    indented_in: bool,
    put_newline: bool,
    written: bool,
    closed: bool,
    error: Option<(io::ErrorKind, String)>,
}

impl<W: Write> Printer<W> {
    /// Create a printer over a sink
    pub fn new(inner: W) -> Self {
        Self {
            writer: Writer::new(inner),
            scopes: NamespaceScopes::new(),
            prefix: String::new(),
            indent: String::new(),
            depth: 0,
            indented_in: false,
            put_newline: false,
            written: false,
            closed: false,
            error: None,
        }
    }

    /// Start each element on a new line with `prefix` and one `indent` per level
    pub fn set_indent(&mut self, prefix: &str, indent: &str) {
        self.prefix = prefix.to_string();
        self.indent = indent.to_string();
    }

    /// Preferred prefixes for namespaces that need a declaration
    pub fn set_prefix_hints(&mut self, hints: HashMap<String, String>) {
        self.scopes.set_hints(hints);
    }

    /// Underlying sink
    pub fn get_ref(&self) -> &W {
        self.writer.get_ref()
    }

    /// Consume the printer and return the sink
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    /// Number of open frames, hook markers included
    pub fn open_frames(&self) -> usize {
        self.scopes.len()
    }

    /// Default namespace in effect at the innermost open element
    pub fn default_namespace(&self) -> &str {
        self.scopes.default_namespace()
    }

    /// First write error, if any
    pub fn cached_error(&self) -> XmlResult<()> {
        match &self.error {
            Some((kind, message)) => Err(XmlError::Io(io::Error::new(*kind, message.clone()))),
            None => Ok(()),
        }
    }

    fn ready(&mut self) -> XmlResult<()> {
        self.cached_error()?;
        if self.closed {
            return self.record(Err(io::Error::other("use of closed encoder")));
        }
        Ok(())
    }

    fn record(&mut self, result: io::Result<()>) -> XmlResult<()> {
        match result {
            Ok(()) => {
                self.written = true;
                Ok(())
            }
            Err(err) => {
                if self.error.is_none() {
                    self.error = Some((err.kind(), err.to_string()));
                }
                Err(XmlError::Io(err))
            }
        }
    }

    fn emit(&mut self, event: Event<'_>) -> XmlResult<()> {
        self.ready()?;
        let result = self.writer.write_event(event);
        self.record(result)
    }

    fn emit_raw(&mut self, raw: &str) -> XmlResult<()> {
        if raw.is_empty() {
            return self.cached_error();
        }
        self.ready()?;
        let result = self.writer.get_mut().write_all(raw.as_bytes());
        self.record(result)
    }

    fn write_indent(&mut self, depth_delta: i32) -> XmlResult<()> {
        if self.prefix.is_empty() && self.indent.is_empty() {
            return Ok(());
        }
        if depth_delta < 0 {
            self.depth = self.depth.saturating_sub(1);
            if self.indented_in {
                self.indented_in = false;
                return Ok(());
            }
        }
        let mut line = String::new();
        if self.put_newline {
            line.push('\n');
        } else {
            self.put_newline = true;
        }
        line.push_str(&self.prefix);
        for _ in 0..self.depth {
            line.push_str(&self.indent);
        }
        if depth_delta > 0 {
            self.depth += 1;
            self.indented_in = true;
        }
        self.emit_raw(&line)
    }

    /// Open an element, declaring namespaces as needed
    pub fn write_start(&mut self, start: &StartElement) -> XmlResult<()> {
        if start.name.local.is_empty() {
            return Err(XmlError::Malformed("start tag with no name".to_string()));
        }

        let parent_default = self.scopes.default_namespace().to_string();
        let mut frame = ElementFrame::new(&start.name, &parent_default);
        for attr in &start.attrs {
            if attr.name.space.is_empty() && attr.name.local == ns::XMLNS_PREFIX {
                frame.default_ns = attr.value.clone();
            }
        }
        let space = frame.space.clone();
        let local = frame.local.clone();
        let mut prefix = frame.prefix.clone();
        self.scopes.push(frame);

        let mut space_defined = false;
        if !space.is_empty() {
            space_defined = start.attrs.iter().any(|attr| {
                attr.name.space.is_empty()
                    && attr.name.local == ns::XMLNS_PREFIX
                    && attr.value == space
            });
            if !space_defined && prefix.is_empty() && parent_default == space {
                space_defined = true;
            }
            if !space_defined && prefix.is_empty() {
                let declared = start.attrs.iter().find(|attr| {
                    attr.name.space == ns::XMLNS && !attr.name.local.is_empty() && attr.value == space
                });
                if let Some(attr) = declared {
                    prefix = self.scopes.create_prefix(&attr.value, &attr.name.local).0;
                    space_defined = true;
                }
            }
            if !space_defined && prefix.is_empty() {
                if let Some(bound) = self.scopes.lookup_prefix(&space) {
                    prefix = bound;
                    space_defined = true;
                }
            }
        }

        self.write_indent(1)?;

        let mut attrs: Vec<(String, String)> = Vec::with_capacity(start.attrs.len() + 1);
        let mut default_ns = None;
        if !prefix.is_empty() {
            if !space.is_empty() && !space_defined {
                let (chosen, created) = self.scopes.create_prefix(&space, &prefix);
                prefix = chosen;
                if created {
                    attrs.push((format!("xmlns:{}", prefix), space.clone()));
                }
            }
        } else if !space.is_empty() && !space_defined {
            attrs.push((ns::XMLNS_PREFIX.to_string(), space.clone()));
            default_ns = Some(space.clone());
        }

        for attr in &start.attrs {
            if attr.name.local.is_empty() {
                continue;
            }
            if attr.name.space == ns::XMLNS {
                let (_, declared) = split_prefixed(&attr.name.local);
                self.scopes.create_prefix(&attr.value, declared);
                attrs.push((format!("xmlns:{}", declared), attr.value.clone()));
            } else if !attr.name.space.is_empty() {
                let (preferred, attr_local) = split_prefixed(&attr.name.local);
                let (chosen, created) = self.scopes.create_prefix(&attr.name.space, preferred);
                if created {
                    attrs.push((format!("xmlns:{}", chosen), attr.name.space.clone()));
                }
                attrs.push((join_prefixed(&chosen, attr_local), attr.value.clone()));
            } else {
                attrs.push((attr.name.local.clone(), attr.value.clone()));
            }
        }

        let qualified = join_prefixed(&prefix, &local);
        if let Some(frame) = self.scopes.top_mut() {
            frame.prefix = prefix;
            if let Some(default_ns) = default_ns {
                frame.default_ns = default_ns;
            }
        }

        let mut element = BytesStart::new(qualified);
        for (key, value) in &attrs {
            let value = escape_attr(value);
            element.push_attribute(Attribute {
                key: QName(key.as_bytes()),
                value: Cow::Borrowed(value.as_bytes()),
            });
        }
        self.emit(Event::Start(element))
    }

    /// Close the innermost element, which must match `name`
    pub fn write_end(&mut self, name: &Name) -> XmlResult<()> {
        if name.local.is_empty() {
            return Err(XmlError::Malformed("end tag with no name".to_string()));
        }
        let (prefix, local) = split_prefixed(&name.local);
        let frame = match self.scopes.top() {
            Some(frame) if !frame.is_marker() => frame,
            _ => {
                return Err(XmlError::Malformed(format!(
                    "end tag </{}> without start tag",
                    name.local
                )))
            }
        };
        if !prefix.is_empty() && !frame.prefix.is_empty() && prefix != frame.prefix {
            return Err(XmlError::Malformed(format!(
                "end prefix </{}:{}> does not match start prefix <{}>",
                prefix,
                local,
                frame.qualified()
            )));
        }
        if local != frame.local {
            return Err(XmlError::Malformed(format!(
                "end tag </{}> does not match start tag <{}>",
                local, frame.local
            )));
        }
        if name.space != frame.space {
            return Err(XmlError::Malformed(format!(
                "end namespace {:?} does not match start namespace {:?}",
                name.space, frame.space
            )));
        }
        let qualified = frame.qualified();

        self.write_indent(-1)?;
        self.emit(Event::End(BytesEnd::new(qualified)))?;
        self.scopes.pop();
        Ok(())
    }

    /// Write escaped character data
    pub fn write_text(&mut self, text: &str) -> XmlResult<()> {
        if text.is_empty() {
            return self.cached_error();
        }
        self.emit(Event::Text(BytesText::from_escaped(escape_text(text))))
    }

    /// Write a CDATA section
    pub fn write_cdata(&mut self, text: &str) -> XmlResult<()> {
        if text.contains("]]>") {
            return Err(XmlError::Malformed(
                "CDATA content must not contain \"]]>\"".to_string(),
            ));
        }
        if text.is_empty() {
            return self.cached_error();
        }
        self.emit(Event::CData(BytesCData::new(replace_invalid(text))))
    }

    /// Write a comment field on its own line
    pub fn write_comment(&mut self, text: &str) -> XmlResult<()> {
        if text.contains("--") {
            return Err(XmlError::Malformed(
                "comments must not contain \"--\"".to_string(),
            ));
        }
        self.write_indent(0)?;
        // "--->" is not allowed, so a trailing dash is padded
        let content = if text.ends_with('-') {
            format!("{} ", replace_invalid(text))
        } else {
            replace_invalid(text).into_owned()
        };
        self.emit(Event::Comment(BytesText::from_escaped(content)))
    }

    /// Write markup verbatim
    pub fn write_raw(&mut self, raw: &str) -> XmlResult<()> {
        self.emit_raw(raw)
    }

    /// Write one token, validating it first
    pub fn write_token(&mut self, token: Token) -> XmlResult<()> {
        match token {
            Token::Start(start) => self.write_start(&start)?,
            Token::End(end) => self.write_end(&end.name)?,
            Token::CharData(text) => self.write_text(&text)?,
            Token::Comment(text) => {
                if text.contains("-->") {
                    return Err(XmlError::Malformed(
                        "comment token containing \"-->\" marker".to_string(),
                    ));
                }
                self.emit(Event::Comment(BytesText::from_escaped(replace_invalid(&text))))?;
            }
            Token::ProcInst { target, inst } => {
                if target == "xml" && self.written {
                    return Err(XmlError::Malformed(
                        "processing instruction with xml target is only valid as the first token"
                            .to_string(),
                    ));
                }
                if !is_name(&target) {
                    return Err(XmlError::Malformed(format!(
                        "processing instruction with invalid target {:?}",
                        target
                    )));
                }
                if inst.contains("?>") {
                    return Err(XmlError::Malformed(
                        "processing instruction containing \"?>\" marker".to_string(),
                    ));
                }
                let content = if inst.is_empty() {
                    target
                } else {
                    format!("{} {}", target, inst)
                };
                self.emit(Event::PI(BytesPI::new(content)))?;
            }
            Token::Directive(directive) => {
                if !is_valid_directive(&directive) {
                    return Err(XmlError::Malformed(
                        "directive containing unbalanced < or > markers".to_string(),
                    ));
                }
                self.emit_raw(&format!("<!{}>", directive))?;
            }
        }
        self.cached_error()
    }

    /// Open a frame that hook output may not close
    pub fn push_marker(&mut self) -> usize {
        let default_ns = self.scopes.default_namespace().to_string();
        self.scopes.push(ElementFrame::marker(&default_ns));
        self.scopes.len()
    }

    /// Close the marker opened at `mark`, reporting elements the hook left open
    pub fn pop_marker(&mut self, mark: usize, owner: &str) -> XmlResult<()> {
        if self.scopes.len() > mark {
            let open = self
                .scopes
                .top()
                .map(ElementFrame::qualified)
                .unwrap_or_default();
            return Err(XmlError::Malformed(format!(
                "{} wrote invalid XML: <{}> not closed",
                owner, open
            )));
        }
        self.scopes.truncate(mark.saturating_sub(1));
        Ok(())
    }

    /// Flush the sink
    pub fn flush(&mut self) -> XmlResult<()> {
        self.cached_error()?;
        let result = self.writer.get_mut().flush();
        self.record(result)
    }

    /// Flush and refuse further writes; reports an element left open
    pub fn close(&mut self) -> XmlResult<()> {
        if self.closed {
            return Ok(());
        }
        self.flush()?;
        self.closed = true;
        if let Some(frame) = self.scopes.top() {
            return Err(XmlError::Malformed(format!(
                "unclosed tag <{}>",
                frame.qualified()
            )));
        }
        Ok(())
    }
}
