//! Namespace prefix management
//!
//! Prefix bindings live on the element frame that declared them. Lookups walk
//! the open frames innermost-first, so a binding introduced deeper in the tree
//! shadows an outer binding of the same prefix until its element closes.

use crate::core::token::Name;
use crate::utils::chars::{is_name, join_prefixed, split_prefixed};
use std::collections::HashMap;

/// Reserved namespaces
pub mod ns {
    /// XML namespace (for xml:lang, etc.)
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    /// Namespace of `xmlns:*` declaration attributes
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
    /// XML prefix
    pub const XML_PREFIX: &str = "xml";
    /// Namespace declaration prefix
    pub const XMLNS_PREFIX: &str = "xmlns";
}

/// One open element in an encoder
#[derive(Debug, Clone, Default)]
pub struct ElementFrame {
    /// Namespace URI of the element
    pub space: String,
    /// Prefix the element is rendered with
    pub prefix: String,
    /// Local name (empty for a hook marker)
    pub local: String,
    /// Default namespace in effect inside the element
    pub default_ns: String,
    marker: bool,
    uri_to_prefix: HashMap<String, String>,
    prefix_to_uri: HashMap<String, String>,
}

impl ElementFrame {
    /// Frame for an element about to be opened
    pub fn new(name: &Name, default_ns: &str) -> Self {
        let (prefix, local) = split_prefixed(&name.local);
        Self {
            space: name.space.clone(),
            prefix: prefix.to_string(),
            local: local.to_string(),
            default_ns: default_ns.to_string(),
            ..Self::default()
        }
    }

    /// Frame that hook output may not close
    pub fn marker(default_ns: &str) -> Self {
        Self {
            default_ns: default_ns.to_string(),
            marker: true,
            ..Self::default()
        }
    }

    /// Whether this frame guards a hook call
    pub fn is_marker(&self) -> bool {
        self.marker
    }

    /// Qualified name as written in the tag
    pub fn qualified(&self) -> String {
        join_prefixed(&self.prefix, &self.local)
    }

    fn bind(&mut self, uri: &str, prefix: &str) {
        self.uri_to_prefix
            .entry(uri.to_string())
            .or_insert_with(|| prefix.to_string());
        self.prefix_to_uri
            .insert(prefix.to_string(), uri.to_string());
    }

    fn prefix_for(&self, uri: &str) -> Option<&str> {
        self.uri_to_prefix.get(uri).map(|s| s.as_str())
    }

    fn binds_prefix(&self, prefix: &str) -> bool {
        self.prefix_to_uri.contains_key(prefix)
    }
}

/// Stack of open element frames with their prefix bindings
#[derive(Debug, Default)]
pub struct NamespaceScopes {
    frames: Vec<ElementFrame>,
    hints: HashMap<String, String>,
    seq: usize,
}

impl NamespaceScopes {
    /// Create an empty scope stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Set preferred prefixes per namespace URI
    pub fn set_hints(&mut self, hints: HashMap<String, String>) {
        self.hints = hints;
    }

    /// Number of open frames, markers included
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether no frame is open
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Open a frame
    pub fn push(&mut self, frame: ElementFrame) {
        self.frames.push(frame);
    }

    /// Close the innermost frame
    pub fn pop(&mut self) -> Option<ElementFrame> {
        self.frames.pop()
    }

    /// Innermost frame
    pub fn top(&self) -> Option<&ElementFrame> {
        self.frames.last()
    }

    /// Innermost frame, mutable
    pub fn top_mut(&mut self) -> Option<&mut ElementFrame> {
        self.frames.last_mut()
    }

    /// Default namespace in effect at the innermost frame
    pub fn default_namespace(&self) -> &str {
        self.frames
            .last()
            .map(|frame| frame.default_ns.as_str())
            .unwrap_or("")
    }

    /// Find the prefix bound to `uri` without creating one
    ///
    /// A binding is ignored when a deeper frame rebinds its prefix.
    pub fn lookup_prefix(&self, uri: &str) -> Option<String> {
        match uri {
            ns::XML => return Some(ns::XML_PREFIX.to_string()),
            ns::XMLNS => return Some(ns::XMLNS_PREFIX.to_string()),
            _ => {}
        }
        for (depth, frame) in self.frames.iter().enumerate().rev() {
            if let Some(prefix) = frame.prefix_for(uri) {
                let shadowed = self.frames[depth + 1..]
                    .iter()
                    .any(|deeper| deeper.binds_prefix(prefix));
                if shadowed {
                    return None;
                }
                return Some(prefix.to_string());
            }
        }
        None
    }

    /// Find or declare a prefix for `uri` on the innermost frame
    ///
    /// Returns the prefix and whether a new binding was created, in which case
    /// the caller must write the matching `xmlns:prefix` declaration.
    pub fn create_prefix(&mut self, uri: &str, preferred: &str) -> (String, bool) {
        if let Some(prefix) = self.lookup_prefix(uri) {
            if preferred.is_empty() || prefix == preferred {
                return (prefix, false);
            }
        }

        let preferred = if preferred.is_empty() {
            self.hints.get(uri).cloned().unwrap_or_default()
        } else {
            preferred.to_string()
        };

        let Some(frame) = self.frames.last() else {
            return (String::new(), false);
        };

        let mut prefix = preferred;
        if prefix.is_empty() || frame.binds_prefix(&prefix) {
            prefix = uri.trim_end_matches('/').to_string();
        }
        if let Some(i) = prefix.rfind('/') {
            prefix = prefix[i + 1..].to_string();
        }
        if prefix.is_empty() || !is_name(&prefix) || prefix.contains(':') {
            prefix = "_".to_string();
        }
        // Names starting with "xml" in any case are reserved
        if prefix.get(..3).is_some_and(|head| head.eq_ignore_ascii_case("xml")) {
            prefix = format!("_{}", prefix);
        }
        if frame.binds_prefix(&prefix) {
            loop {
                self.seq += 1;
                let candidate = format!("{}_{}", prefix, self.seq);
                if !frame.binds_prefix(&candidate) {
                    prefix = candidate;
                    break;
                }
            }
        }

        if let Some(frame) = self.frames.last_mut() {
            frame.bind(uri, &prefix);
        }
        tracing::trace!(prefix = %prefix, uri = %uri, "declared namespace prefix");
        (prefix, true)
    }

    /// Drop frames down to `len`
    pub fn truncate(&mut self, len: usize) {
        self.frames.truncate(len);
    }
}
