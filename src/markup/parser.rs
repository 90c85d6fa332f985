use anyhow::Result;
use log::{debug, warn};

use super::node::{MarkupDocument, MarkupNode};

// @module: Forgiving XML/XHTML scanner producing MarkupNode trees

/// HTML void elements that never carry children even without a slash
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta",
    "param", "source", "track", "wbr",
];

/// Parse a markup file into a document tree.
///
/// The scanner keeps the prolog (XML declaration, doctype, leading comments)
/// verbatim, decodes entities in text and attribute values, and recovers from
/// mismatched closing tags by unwinding to the nearest matching ancestor.
/// Comments and processing instructions inside the body are dropped.
pub fn parse_document(source: &str) -> Result<MarkupDocument> {
    let first_element = find_first_element(source);
    let (prolog, body) = source.split_at(first_element);

    let mut parser = Parser {
        input: body,
        chars: body.char_indices().peekable(),
    };
    let roots = parser.parse_nodes(&mut Vec::new())?;

    Ok(MarkupDocument {
        prolog: prolog.to_string(),
        roots,
    })
}

/// Byte offset of the first real element tag, skipping declarations,
/// doctypes and comments that belong to the prolog
fn find_first_element(source: &str) -> usize {
    let bytes = source.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'<' {
            let rest = &source[i..];
            if rest.starts_with("<?") {
                i += rest.find("?>").map(|p| p + 2).unwrap_or(rest.len());
            } else if rest.starts_with("<!--") {
                i += rest.find("-->").map(|p| p + 3).unwrap_or(rest.len());
            } else if rest.starts_with("<!") {
                i += rest.find('>').map(|p| p + 1).unwrap_or(rest.len());
            } else {
                return i;
            }
        } else {
            i += 1;
        }
    }
    source.len()
}

struct Parser<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Parser<'a> {
    /// Parse sibling nodes until EOF or a closing tag for an open ancestor
    fn parse_nodes(&mut self, open_stack: &mut Vec<String>) -> Result<Vec<MarkupNode>> {
        let mut nodes = Vec::new();
        let mut text = String::new();

        while let Some(&(pos, ch)) = self.chars.peek() {
            if ch != '<' {
                self.chars.next();
                if ch == '&' {
                    text.push_str(&self.read_entity(pos));
                } else {
                    text.push(ch);
                }
                continue;
            }

            let rest = &self.input[pos..];
            if rest.starts_with("</") {
                // Closing tag: ours, an ancestor's (recover), or stray (skip)
                let name = peek_close_name(rest);
                if let Some(expected) = open_stack.last() {
                    if name.eq_ignore_ascii_case(expected) {
                        flush_text(&mut text, &mut nodes);
                        self.skip_past('>');
                        open_stack.pop();
                        return Ok(nodes);
                    }
                    if open_stack.iter().any(|t| t.eq_ignore_ascii_case(&name)) {
                        // Unwind: pretend the current element was closed here
                        warn!("Recovering from mismatched </{}>, closing <{}>", name, expected);
                        flush_text(&mut text, &mut nodes);
                        open_stack.pop();
                        return Ok(nodes);
                    }
                }
                debug!("Dropping stray closing tag </{}>", name);
                self.skip_past('>');
            } else if rest.starts_with("<!--") {
                self.skip_comment();
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                self.skip_past('>');
            } else {
                flush_text(&mut text, &mut nodes);
                if let Some(node) = self.parse_element(open_stack)? {
                    nodes.push(node);
                }
            }
        }

        flush_text(&mut text, &mut nodes);
        Ok(nodes)
    }

    /// Parse one element starting at '<'
    fn parse_element(&mut self, open_stack: &mut Vec<String>) -> Result<Option<MarkupNode>> {
        self.chars.next(); // consume '<'

        let tag = self.read_name();
        if tag.is_empty() {
            // A lone '<' in sloppy markup; treat it as text
            return Ok(Some(MarkupNode::Text("<".to_string())));
        }

        let mut attrs = Vec::new();
        let mut self_closing = false;

        loop {
            self.skip_whitespace();
            match self.chars.peek() {
                Some(&(_, '>')) => {
                    self.chars.next();
                    break;
                }
                Some(&(_, '/')) => {
                    self.chars.next();
                    self_closing = true;
                }
                Some(_) => {
                    let name = self.read_name();
                    if name.is_empty() {
                        // Unparseable attribute junk; drop one char and go on
                        self.chars.next();
                        continue;
                    }
                    self.skip_whitespace();
                    let value = if matches!(self.chars.peek(), Some(&(_, '='))) {
                        self.chars.next();
                        self.skip_whitespace();
                        self.read_attr_value()
                    } else {
                        String::new()
                    };
                    attrs.push((name, value));
                }
                None => break,
            }
        }

        let children = if self_closing || VOID_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str()) {
            Vec::new()
        } else {
            open_stack.push(tag.clone());
            let depth = open_stack.len();
            let children = self.parse_nodes(open_stack)?;
            // parse_nodes pops on a matched close; an EOF leaves it open
            if open_stack.len() >= depth {
                open_stack.truncate(depth - 1);
            }
            children
        };

        Ok(Some(MarkupNode::Element { tag, attrs, children }))
    }

    fn read_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_alphanumeric() || matches!(ch, ':' | '-' | '_' | '.') {
                name.push(ch);
                self.chars.next();
            } else {
                break;
            }
        }
        name
    }

    fn read_attr_value(&mut self) -> String {
        match self.chars.peek() {
            Some(&(_, quote @ ('"' | '\''))) => {
                self.chars.next();
                let mut value = String::new();
                while let Some((pos, ch)) = self.chars.next() {
                    if ch == quote {
                        break;
                    }
                    if ch == '&' {
                        value.push_str(&self.read_entity(pos));
                    } else {
                        value.push(ch);
                    }
                }
                value
            }
            _ => {
                // Unquoted value, read until whitespace or tag end
                let mut value = String::new();
                while let Some(&(_, ch)) = self.chars.peek() {
                    if ch.is_whitespace() || ch == '>' || ch == '/' {
                        break;
                    }
                    value.push(ch);
                    self.chars.next();
                }
                value
            }
        }
    }

    /// Decode the entity whose '&' was just consumed at byte offset `amp_pos`
    fn read_entity(&mut self, amp_pos: usize) -> String {
        let rest = &self.input[amp_pos..];
        let semi = match rest.char_indices().take(12).find(|&(_, c)| c == ';') {
            Some((idx, _)) => idx,
            None => return "&".to_string(),
        };
        let body = &rest[1..semi];
        let decoded = match body {
            "lt" => Some('<'),
            "gt" => Some('>'),
            "amp" => Some('&'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ => {
                if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                    u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
                } else if let Some(dec) = body.strip_prefix('#') {
                    dec.parse::<u32>().ok().and_then(char::from_u32)
                } else {
                    None
                }
            }
        };

        match decoded {
            Some(ch) => {
                // Consume up to and including the ';'
                for _ in 0..body.chars().count() + 1 {
                    self.chars.next();
                }
                ch.to_string()
            }
            None => "&".to_string(),
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some(&(_, ch)) if ch.is_whitespace()) {
            self.chars.next();
        }
    }

    fn skip_past(&mut self, end: char) {
        for (_, ch) in self.chars.by_ref() {
            if ch == end {
                break;
            }
        }
    }

    fn skip_comment(&mut self) {
        // Consumes "<!--" then everything through "-->"
        let mut tail = String::new();
        for (_, ch) in self.chars.by_ref() {
            tail.push(ch);
            if tail.ends_with("-->") {
                break;
            }
        }
    }
}

fn peek_close_name(rest: &str) -> String {
    rest[2..]
        .chars()
        .take_while(|c| c.is_alphanumeric() || matches!(c, ':' | '-' | '_' | '.'))
        .collect()
}

fn flush_text(text: &mut String, nodes: &mut Vec<MarkupNode>) {
    if !text.is_empty() {
        nodes.push(MarkupNode::Text(std::mem::take(text)));
    }
}
