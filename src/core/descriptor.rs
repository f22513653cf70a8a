//! Field metadata
//!
//! Parses the tag strings of a [`FieldDecl`] table into a [`TypeDescriptor`]:
//! one [`FieldInfo`] per serializable field, with embedded records spliced in
//! and name conflicts resolved.
//!
//! Tag grammar:
//!
//! ```text
//! tag   := "-" | [namespace " "] [prefix ":"] [path] ["," flag]*
//! path  := name (">" name)*
//! flag  := attr | chardata | cdata | innerxml | comment | any | omitempty | name
//! ```

use crate::core::error::{XmlError, XmlResult};
use crate::core::schema::FieldDecl;
use crate::core::token::Name;
use crate::utils::chars::{join_prefixed, split_prefixed};
use std::collections::HashSet;

/// Identifier that marks the name field without a `name` flag
pub const NAME_FIELD_IDENT: &str = "xml_name";

/// How a field is placed in the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FieldKind {
    /// Child element
    Element,
    /// Attribute
    Attr,
    /// Catch-all for attributes no other field matches
    AnyAttr,
    /// Catch-all for elements no other field matches
    Any,
    /// Escaped character data
    CharData,
    /// Character data in a CDATA section
    CData,
    /// XML comment
    Comment,
    /// Raw inner markup
    InnerXml,
    /// Element name of the record
    Name,
}

impl FieldKind {
    /// Whether the field is rendered as an attribute
    pub fn is_attr(self) -> bool {
        matches!(self, FieldKind::Attr | FieldKind::AnyAttr)
    }

    /// Whether the field is rendered as child elements
    pub fn is_element(self) -> bool {
        matches!(self, FieldKind::Element | FieldKind::Any)
    }
}

/// Metadata of one serializable field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Field identifier
    pub ident: &'static str,
    /// Local name, without prefix
    pub name: String,
    /// Namespace URI
    pub space: String,
    /// Prefix requested by the tag
    pub prefix: String,
    /// Placement
    pub kind: FieldKind,
    /// Wrapper elements between the record and the field
    pub parents: Vec<String>,
    /// Skip zero values
    pub omit_empty: bool,
    /// Field indices through embedded records
    pub index: Vec<usize>,
}

impl FieldInfo {
    /// Name as written, with the tag prefix joined to the local name
    pub fn xml_name(&self) -> Name {
        Name::new(self.space.clone(), join_prefixed(&self.prefix, &self.name))
    }

    /// Whether an element or attribute name matches this field
    ///
    /// A field without a namespace matches any namespace.
    pub fn matches(&self, name: &Name) -> bool {
        let (_, local) = split_prefixed(&name.local);
        local == self.name && (self.space.is_empty() || self.space == name.space)
    }
}

/// Parsed field metadata of one record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Bare type name
    pub type_name: &'static str,
    /// Serializable fields in declaration order
    pub fields: Vec<FieldInfo>,
    /// The field that names the element, if any
    pub name_field: Option<FieldInfo>,
}

impl TypeDescriptor {
    /// Build a descriptor from a declaration table
    pub fn build(type_name: &'static str, decls: &'static [FieldDecl]) -> XmlResult<Self> {
        let mut descriptor = TypeDescriptor {
            type_name,
            fields: Vec::new(),
            name_field: None,
        };

        for (i, decl) in decls.iter().enumerate() {
            if let Some(inner_decls) = decl.embedded {
                let inner = TypeDescriptor::build(decl.ident, inner_decls)?;
                if descriptor.name_field.is_none() {
                    descriptor.name_field = inner.name_field.map(|mut info| {
                        info.index.insert(0, i);
                        info
                    });
                }
                for mut info in inner.fields {
                    info.index.insert(0, i);
                    descriptor.add_field(info)?;
                }
                continue;
            }

            let Some(mut info) = parse_tag(decl.ident, decl.tag)? else {
                continue;
            };
            info.index = vec![i];

            if info.kind == FieldKind::Name {
                let own = descriptor
                    .name_field
                    .as_ref()
                    .map(|existing| existing.index.len() == 1)
                    .unwrap_or(false);
                if own {
                    return Err(XmlError::BadSchema(format!(
                        "{} declares more than one name field ({})",
                        type_name, decl.ident
                    )));
                }
                descriptor.name_field = Some(info);
                continue;
            }

            descriptor.add_field(info)?;
        }

        descriptor.check_wrapper_paths()?;
        Ok(descriptor)
    }

    /// Fixed element name declared by the name field
    pub fn fixed_name(&self) -> Option<Name> {
        self.name_field
            .as_ref()
            .filter(|info| !info.name.is_empty())
            .map(FieldInfo::xml_name)
    }

    /// Fields of the given kind
    pub fn fields_of(&self, kind: FieldKind) -> impl Iterator<Item = &FieldInfo> {
        self.fields.iter().filter(move |info| info.kind == kind)
    }

    /// Add a field, resolving conflicts by embedding depth
    fn add_field(&mut self, new: FieldInfo) -> XmlResult<()> {
        let conflicts: Vec<usize> = self
            .fields
            .iter()
            .enumerate()
            .filter(|(_, old)| conflicts_with(old, &new))
            .map(|(i, _)| i)
            .collect();

        if conflicts.is_empty() {
            self.fields.push(new);
            return Ok(());
        }

        // A shallower field hides the new one
        if conflicts
            .iter()
            .any(|&i| self.fields[i].index.len() < new.index.len())
        {
            return Ok(());
        }

        if let Some(&i) = conflicts
            .iter()
            .find(|&&i| self.fields[i].index.len() == new.index.len())
        {
            return Err(XmlError::BadSchema(format!(
                "{}: field {} conflicts with field {}",
                self.type_name, self.fields[i].ident, new.ident
            )));
        }

        for &i in conflicts.iter().rev() {
            self.fields.remove(i);
        }
        self.fields.push(new);
        Ok(())
    }

    /// Reject wrapper paths interrupted by an unrelated field
    ///
    /// Replays the open/close sequence of the encoder; reopening a wrapper
    /// that was already closed means the fields sharing it are not adjacent.
    fn check_wrapper_paths(&self) -> XmlResult<()> {
        let mut stack: Vec<&str> = Vec::new();
        let mut closed: HashSet<Vec<&str>> = HashSet::new();

        for info in &self.fields {
            match info.kind {
                FieldKind::Attr | FieldKind::AnyAttr | FieldKind::InnerXml => continue,
                _ => {}
            }
            let parents: Vec<&str> = info.parents.iter().map(String::as_str).collect();
            let split = stack
                .iter()
                .zip(parents.iter())
                .take_while(|(a, b)| a == b)
                .count();
            while stack.len() > split {
                closed.insert(stack.clone());
                stack.pop();
            }
            for &parent in &parents[split..] {
                stack.push(parent);
                if closed.contains(&stack) {
                    return Err(XmlError::BadSchema(format!(
                        "{}: fields under <{}> are not adjacent (interrupted before {})",
                        self.type_name,
                        stack.join(">"),
                        info.ident
                    )));
                }
            }
        }
        Ok(())
    }
}

fn conflicts_with(old: &FieldInfo, new: &FieldInfo) -> bool {
    if old.kind != new.kind {
        return false;
    }
    if !old.space.is_empty() && !new.space.is_empty() && old.space != new.space {
        return false;
    }
    let shared = old.parents.len().min(new.parents.len());
    if old.parents[..shared] != new.parents[..shared] {
        return false;
    }
    if old.parents.len() > new.parents.len() {
        old.parents[new.parents.len()] == new.name
    } else if old.parents.len() < new.parents.len() {
        new.parents[old.parents.len()] == old.name
    } else {
        new.name == old.name && new.space == old.space
    }
}

/// Parse one tag string
///
/// Returns `None` for a skipped (`"-"`) field. The access path is left empty.
pub fn parse_tag(ident: &'static str, tag: &str) -> XmlResult<Option<FieldInfo>> {
    if tag == "-" {
        return Ok(None);
    }
    let invalid = |why: &str| XmlError::BadSchema(format!("field {} tag {:?}: {}", ident, tag, why));

    let (space, rest) = match tag.split_once(' ') {
        Some((space, rest)) => (space, rest),
        None => ("", tag),
    };
    let mut parts = rest.split(',');
    let path = parts.next().unwrap_or("");

    let mut attr = false;
    let mut omit_empty = false;
    let mut name_flag = ident == NAME_FIELD_IDENT;
    let mut mode: Option<FieldKind> = None;
    let mut any = false;
    for flag in parts {
        let kind = match flag {
            "attr" => {
                attr = true;
                continue;
            }
            "omitempty" => {
                omit_empty = true;
                continue;
            }
            "name" => {
                name_flag = true;
                continue;
            }
            "any" => {
                any = true;
                continue;
            }
            "chardata" => FieldKind::CharData,
            "cdata" => FieldKind::CData,
            "innerxml" => FieldKind::InnerXml,
            "comment" => FieldKind::Comment,
            "" => continue,
            other => return Err(invalid(&format!("unknown flag {:?}", other))),
        };
        if mode.replace(kind).is_some() {
            return Err(invalid("more than one placement flag"));
        }
    }

    let kind = match (mode, attr, any, name_flag) {
        (None, false, false, false) => FieldKind::Element,
        (None, true, false, false) => FieldKind::Attr,
        (None, true, true, false) => FieldKind::AnyAttr,
        (None, false, true, false) => FieldKind::Any,
        (Some(kind), false, false, false) => kind,
        (None, false, false, true) => FieldKind::Name,
        _ => return Err(invalid("invalid combination of flags")),
    };

    if omit_empty && !matches!(kind, FieldKind::Element | FieldKind::Attr | FieldKind::Any) {
        return Err(invalid("omitempty is only valid for elements and attributes"));
    }
    if !path.is_empty() && !matches!(kind, FieldKind::Element | FieldKind::Attr | FieldKind::Name)
    {
        return Err(invalid("only elements and attributes take a name"));
    }
    if !space.is_empty() && path.is_empty() {
        return Err(invalid("namespace without a name"));
    }

    let mut segments: Vec<&str> = path.split('>').collect();
    if segments.len() > 1 {
        if kind != FieldKind::Element {
            return Err(invalid("wrapper paths are only valid for elements"));
        }
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(invalid("empty wrapper path segment"));
        }
    }
    let last = segments.pop().unwrap_or("");
    let (prefix, local) = split_prefixed(last);

    let name = if local.is_empty() && kind != FieldKind::Name {
        ident.to_string()
    } else {
        local.to_string()
    };

    Ok(Some(FieldInfo {
        ident,
        name,
        space: space.to_string(),
        prefix: prefix.to_string(),
        kind,
        parents: segments.into_iter().map(String::from).collect(),
        omit_empty,
        index: Vec::new(),
    }))
}
