use std::fmt;

// @module: Markup node tree and serialization

/// Path from the document root to a node: the first entry selects a root
/// node, each following entry a child index (text nodes count).
pub type NodePath = Vec<usize>;

/// A single node in a parsed markup tree
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupNode {
    /// An element with its tag name, ordered attributes and ordered children
    Element {
        /// Tag name as written in the source (namespace prefixes kept)
        tag: String,
        /// Attributes in source order
        attrs: Vec<(String, String)>,
        /// Child nodes in source order
        children: Vec<MarkupNode>,
    },
    /// A literal text run (entities already decoded)
    Text(String),
}

impl MarkupNode {
    /// Create an element node without attributes
    pub fn element(tag: &str) -> Self {
        MarkupNode::Element {
            tag: tag.to_string(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create a text node
    pub fn text(content: &str) -> Self {
        MarkupNode::Text(content.to_string())
    }

    /// Tag name, or None for text nodes
    pub fn tag(&self) -> Option<&str> {
        match self {
            MarkupNode::Element { tag, .. } => Some(tag.as_str()),
            MarkupNode::Text(_) => None,
        }
    }

    /// Child nodes, empty for text nodes
    pub fn children(&self) -> &[MarkupNode] {
        match self {
            MarkupNode::Element { children, .. } => children,
            MarkupNode::Text(_) => &[],
        }
    }

    /// Mutable child list; None for text nodes
    pub fn children_mut(&mut self) -> Option<&mut Vec<MarkupNode>> {
        match self {
            MarkupNode::Element { children, .. } => Some(children),
            MarkupNode::Text(_) => None,
        }
    }

    /// Concatenated text content of this node and all descendants
    pub fn collect_text(&self) -> String {
        let mut out = String::new();
        self.collect_text_into(&mut out);
        out
    }

    fn collect_text_into(&self, out: &mut String) {
        match self {
            MarkupNode::Text(t) => out.push_str(t),
            MarkupNode::Element { children, .. } => {
                for child in children {
                    child.collect_text_into(out);
                }
            }
        }
    }

    /// Direct (non-recursive) text content of an element
    pub fn direct_text(&self) -> String {
        let mut out = String::new();
        for child in self.children() {
            if let MarkupNode::Text(t) = child {
                out.push_str(t);
            }
        }
        out
    }

    /// Depth-first iteration over this node and all descendants
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Serialize this subtree back to markup text
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        self.serialize_into(&mut out);
        out
    }

    fn serialize_into(&self, out: &mut String) {
        match self {
            MarkupNode::Text(t) => out.push_str(&escape_text(t)),
            MarkupNode::Element { tag, attrs, children } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                if children.is_empty() {
                    out.push_str("/>");
                } else {
                    out.push('>');
                    for child in children {
                        child.serialize_into(out);
                    }
                    out.push_str("</");
                    out.push_str(tag);
                    out.push('>');
                }
            }
        }
    }
}

impl fmt::Display for MarkupNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.serialize())
    }
}

/// Depth-first iterator over a subtree
pub struct Descendants<'a> {
    stack: Vec<&'a MarkupNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a MarkupNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        if let MarkupNode::Element { children, .. } = node {
            for child in children.iter().rev() {
                self.stack.push(child);
            }
        }
        Some(node)
    }
}

/// A parsed markup file: the prolog (XML declaration, doctype and anything
/// else before the first element, kept verbatim) plus the root node list.
#[derive(Debug, Clone, Default)]
pub struct MarkupDocument {
    /// Raw text before the first root element
    pub prolog: String,
    /// Top-level nodes in source order
    pub roots: Vec<MarkupNode>,
}

impl MarkupDocument {
    /// Resolve a node path to a shared reference
    pub fn node_at_path(&self, path: &[usize]) -> Option<&MarkupNode> {
        let (first, rest) = path.split_first()?;
        let mut node = self.roots.get(*first)?;
        for idx in rest {
            node = node.children().get(*idx)?;
        }
        Some(node)
    }

    /// Resolve a node path to a mutable reference
    pub fn node_at_path_mut(&mut self, path: &[usize]) -> Option<&mut MarkupNode> {
        let (first, rest) = path.split_first()?;
        let mut node = self.roots.get_mut(*first)?;
        for idx in rest {
            node = match node {
                MarkupNode::Element { children, .. } => children.get_mut(*idx)?,
                MarkupNode::Text(_) => return None,
            };
        }
        Some(node)
    }

    /// Serialize the whole document, prolog included
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.prolog);
        for root in &self.roots {
            root.serialize_into(&mut out);
        }
        out
    }
}

/// Escape the markup metacharacters in text content
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape an attribute value for double-quoted serialization
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
