//! XML token model
//!
//! Names, attributes and the tokens exchanged with the streaming encoder and
//! decoder. A `Name` keeps the namespace URI separate from the local part;
//! the local part may still carry a `prefix:` when a caller asks for a
//! specific prefix.

use std::fmt;

/// A namespace-qualified XML name
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Name {
    /// Namespace URI (empty for no namespace)
    pub space: String,
    /// Local name, optionally `prefix:local`
    pub local: String,
}

impl Name {
    /// Create a name in a namespace
    pub fn new(space: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            space: space.into(),
            local: local.into(),
        }
    }

    /// Create a name without a namespace
    pub fn local(local: impl Into<String>) -> Self {
        Self::new(String::new(), local)
    }

    /// Whether the local part is empty
    pub fn is_empty(&self) -> bool {
        self.local.is_empty()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.space.is_empty() {
            write!(f, "{}", self.local)
        } else {
            write!(f, "{{{}}}{}", self.space, self.local)
        }
    }
}

/// An attribute of a start element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Attr {
    /// Attribute name
    pub name: Name,
    /// Unescaped attribute value
    pub value: String,
}

impl Attr {
    /// Create an attribute
    pub fn new(name: Name, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

/// A start tag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartElement {
    /// Element name
    pub name: Name,
    /// Attributes in document order
    pub attrs: Vec<Attr>,
}

impl StartElement {
    /// Create a start element without attributes
    pub fn new(name: Name) -> Self {
        Self {
            name,
            attrs: Vec::new(),
        }
    }

    /// Add an attribute
    pub fn with_attr(mut self, name: Name, value: impl Into<String>) -> Self {
        self.attrs.push(Attr::new(name, value));
        self
    }

    /// The matching end element
    pub fn end(&self) -> EndElement {
        EndElement {
            name: self.name.clone(),
        }
    }
}

/// An end tag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndElement {
    /// Element name
    pub name: Name,
}

/// One XML token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `<name attr="value">`
    Start(StartElement),
    /// `</name>`
    End(EndElement),
    /// Unescaped character data (text and CDATA sections alike)
    CharData(String),
    /// `<!--comment-->`
    Comment(String),
    /// `<?target inst?>`
    ProcInst {
        /// Processing instruction target
        target: String,
        /// Instruction body
        inst: String,
    },
    /// `<!directive>`
    Directive(String),
}

/// Whether a directive has balanced `<`/`>` markers outside quotes and comments
pub fn is_valid_directive(dir: &str) -> bool {
    let bytes = dir.as_bytes();
    let mut depth = 0usize;
    let mut in_quote: Option<u8> = None;
    let mut in_comment = false;

    for (i, &c) in bytes.iter().enumerate() {
        if in_comment {
            if c == b'>' && i >= 2 && &bytes[i - 2..=i] == b"-->" {
                in_comment = false;
            }
            continue;
        }
        if let Some(q) = in_quote {
            if c == q {
                in_quote = None;
            }
            continue;
        }
        match c {
            b'\'' | b'"' => in_quote = Some(c),
            b'<' => {
                if bytes[i..].starts_with(b"<!--") && i + 4 < bytes.len() {
                    in_comment = true;
                } else {
                    depth += 1;
                }
            }
            b'>' => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    depth == 0 && in_quote.is_none() && !in_comment
}
