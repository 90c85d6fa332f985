use std::collections::HashMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::errors::CodecError;
use crate::markup::{parse_document, MarkupDocument, MarkupNode, NodePath};

use super::sentinels::{find_sentinel, ANCHOR_END, ANCHOR_START, BLOCK_END, BLOCK_START};

// @module: Anchor extraction and restoration

/// Elements whose content is never translatable and is reinserted verbatim
const MONOLITHIC_TAGS: &[&str] = &["math", "svg", "canvas", "video", "audio"];

/// Block-level elements that can carry translatable text in XHTML content
const TRANSLATABLE_TAGS: &[&str] = &[
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "li", "td", "th", "caption",
    "figcaption", "blockquote", "dt", "dd", "cite", "footer", "aside", "div",
    "section", "article",
];

/// DOCX run children that make a run opaque (breaks, tabs, drawings)
const DOCX_OPAQUE_RUN_CHILDREN: &[&str] = &["br", "tab", "drawing", "pict"];

/// How markup is mapped onto anchors for a given container format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionProfile {
    /// XHTML content: arbitrary inline elements become container anchors
    Epub,
    /// WordprocessingML: formatting runs (`w:r`) become anchors, `w:pPr` is structural
    Docx,
}

/// Whether an anchor wraps translated content or stands for raw markup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    /// Rebuilt around recursively restored inner content
    Container,
    /// Reinserted verbatim from stored raw markup
    Monolithic,
}

/// One extracted formatting element, addressed by a block-local anchor id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatTag {
    /// Anchor id, unique within its block only (numbering restarts per block)
    pub id: u32,
    /// Tag name of the replaced element
    pub tag_name: String,
    /// Attributes of the replaced element, in source order
    pub attributes: Vec<(String, String)>,
    /// Raw serialized markup, present for monolithic entries and DOCX runs
    pub raw_markup: Option<String>,
    /// Container or monolithic restoration behavior
    pub kind: FormatKind,
}

/// One translatable unit extracted from a single document element
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Path of the source element inside its file's tree
    pub source_path: NodePath,
    /// Flat text with anchor markers in place of markup
    pub anchored_text: String,
    /// Anchor table for this block
    pub formats: Vec<FormatTag>,
    /// Character count of the anchored text
    pub char_size: usize,
}

/// Extraction and restoration of anchor-tagged text
pub struct AnchorCodec;

/// Counter and format table owned by one block extraction call
struct ExtractionState {
    next_id: u32,
    formats: Vec<FormatTag>,
}

impl ExtractionState {
    fn new() -> Self {
        // Anchor numbering restarts at 1 for every block
        Self { next_id: 1, formats: Vec::new() }
    }

    fn allocate(&mut self, tag: FormatTag) -> u32 {
        let id = tag.id;
        self.formats.push(tag);
        self.next_id += 1;
        id
    }
}

impl AnchorCodec {
    // =========================================================================
    // Block discovery
    // =========================================================================

    /// Find the paths of all translatable block elements in a document.
    ///
    /// An element that only exists to hold other translatable elements (no
    /// direct text of its own) is skipped in favor of its children; once an
    /// element is selected, its subtree belongs to that block alone.
    pub fn discover_blocks(doc: &MarkupDocument, profile: ExtractionProfile) -> Vec<NodePath> {
        let mut paths = Vec::new();
        for (idx, root) in doc.roots.iter().enumerate() {
            Self::discover_in(root, vec![idx], profile, &mut paths);
        }
        paths
    }

    fn discover_in(
        node: &MarkupNode,
        path: NodePath,
        profile: ExtractionProfile,
        out: &mut Vec<NodePath>,
    ) {
        let MarkupNode::Element { tag, children, .. } = node else {
            return;
        };

        let is_block = match profile {
            ExtractionProfile::Epub => {
                let name = local_name(tag).to_ascii_lowercase();
                if TRANSLATABLE_TAGS.contains(&name.as_str()) {
                    let has_translatable_child = children.iter().any(|c| {
                        c.tag()
                            .map(|t| TRANSLATABLE_TAGS.contains(&local_name(t).to_ascii_lowercase().as_str()))
                            .unwrap_or(false)
                    });
                    // A pure wrapper defers to its children; direct text claims it
                    !(has_translatable_child && node.direct_text().trim().is_empty())
                } else {
                    false
                }
            }
            ExtractionProfile::Docx => {
                local_name(tag) == "p" && !node.collect_text().trim().is_empty()
            }
        };

        if is_block {
            out.push(path);
            return;
        }

        for (idx, child) in children.iter().enumerate() {
            let mut child_path = path.clone();
            child_path.push(idx);
            Self::discover_in(child, child_path, profile, out);
        }
    }

    /// Extract all blocks of a document in document order
    pub fn extract_blocks(
        doc: &MarkupDocument,
        profile: ExtractionProfile,
    ) -> Result<Vec<Block>, CodecError> {
        let mut blocks = Vec::new();
        for path in Self::discover_blocks(doc, profile) {
            let node = doc
                .node_at_path(&path)
                .expect("discovered path must resolve");
            let (text, formats) = Self::extract(node, profile)?;
            blocks.push(Block {
                source_path: path,
                char_size: text.chars().count(),
                anchored_text: text,
                formats,
            });
        }
        Ok(blocks)
    }

    // =========================================================================
    // Extraction
    // =========================================================================

    /// Extract one block element into anchor-tagged text plus its format table
    pub fn extract(
        root: &MarkupNode,
        profile: ExtractionProfile,
    ) -> Result<(String, Vec<FormatTag>), CodecError> {
        let mut state = ExtractionState::new();
        let text = match profile {
            ExtractionProfile::Epub => Self::extract_epub(root, true, &mut state)?,
            ExtractionProfile::Docx => Self::extract_docx(root, &mut state)?,
        };
        Ok((text, state.formats))
    }

    fn extract_epub(
        node: &MarkupNode,
        is_root: bool,
        state: &mut ExtractionState,
    ) -> Result<String, CodecError> {
        match node {
            MarkupNode::Text(text) => {
                check_for_sentinels(text)?;
                Ok(escape_metachars(text))
            }
            MarkupNode::Element { tag, attrs, children } => {
                let name = local_name(tag).to_ascii_lowercase();
                if MONOLITHIC_TAGS.contains(&name.as_str()) {
                    let id = state.allocate(FormatTag {
                        id: state.next_id,
                        tag_name: tag.clone(),
                        attributes: attrs.clone(),
                        raw_markup: Some(node.serialize()),
                        kind: FormatKind::Monolithic,
                    });
                    return Ok(anchor_ref(id));
                }

                // Children are numbered before their parent
                let mut inner = String::new();
                for child in children {
                    inner.push_str(&Self::extract_epub(child, false, state)?);
                }

                if is_root {
                    return Ok(inner);
                }

                if inner.trim().is_empty() {
                    // Nothing translatable inside; keep the element verbatim
                    let id = state.allocate(FormatTag {
                        id: state.next_id,
                        tag_name: tag.clone(),
                        attributes: attrs.clone(),
                        raw_markup: Some(node.serialize()),
                        kind: FormatKind::Monolithic,
                    });
                    return Ok(anchor_ref(id));
                }

                let id = state.allocate(FormatTag {
                    id: state.next_id,
                    tag_name: tag.clone(),
                    attributes: attrs.clone(),
                    raw_markup: None,
                    kind: FormatKind::Container,
                });
                Ok(format!("{BLOCK_START}{inner}{BLOCK_END}{}", anchor_ref(id)))
            }
        }
    }

    fn extract_docx(node: &MarkupNode, state: &mut ExtractionState) -> Result<String, CodecError> {
        let MarkupNode::Element { tag, attrs, children } = node else {
            // Text between WordprocessingML elements is insignificant
            return Ok(String::new());
        };

        match local_name(tag) {
            "t" => {
                let text = node.collect_text();
                check_for_sentinels(&text)?;
                Ok(escape_metachars(&text))
            }
            "r" => {
                let text_child = children
                    .iter()
                    .find(|c| c.tag().map(|t| local_name(t) == "t").unwrap_or(false));
                let has_opaque_child = children.iter().any(|c| {
                    c.tag()
                        .map(|t| DOCX_OPAQUE_RUN_CHILDREN.contains(&local_name(t)))
                        .unwrap_or(false)
                });
                let has_properties = children
                    .iter()
                    .any(|c| c.tag().map(|t| local_name(t) == "rPr").unwrap_or(false));

                if let Some(text_child) = text_child {
                    let text = text_child.collect_text();
                    check_for_sentinels(&text)?;
                    let inner = escape_metachars(&text);
                    if !has_properties && !has_opaque_child {
                        // Unformatted run: its text joins the surrounding flow
                        return Ok(inner);
                    }
                    let id = state.allocate(FormatTag {
                        id: state.next_id,
                        tag_name: tag.clone(),
                        attributes: attrs.clone(),
                        raw_markup: Some(node.serialize()),
                        kind: FormatKind::Container,
                    });
                    Ok(format!("{BLOCK_START}{inner}{BLOCK_END}{}", anchor_ref(id)))
                } else if has_opaque_child {
                    let id = state.allocate(FormatTag {
                        id: state.next_id,
                        tag_name: tag.clone(),
                        attributes: attrs.clone(),
                        raw_markup: Some(node.serialize()),
                        kind: FormatKind::Monolithic,
                    });
                    Ok(anchor_ref(id))
                } else {
                    Self::extract_docx_children(children, state)
                }
            }
            _ => Self::extract_docx_children(children, state),
        }
    }

    fn extract_docx_children(
        children: &[MarkupNode],
        state: &mut ExtractionState,
    ) -> Result<String, CodecError> {
        let mut out = String::new();
        for child in children {
            if child.tag().is_some() {
                out.push_str(&Self::extract_docx(child, state)?);
            }
        }
        Ok(out)
    }

    // =========================================================================
    // Restoration
    // =========================================================================

    /// Rebuild the node list for a block from its translated anchored text
    pub fn restore(
        block: &Block,
        translated_text: &str,
        profile: ExtractionProfile,
    ) -> Vec<MarkupNode> {
        let format_map: HashMap<u32, &FormatTag> =
            block.formats.iter().map(|f| (f.id, f)).collect();
        let chars: Vec<char> = translated_text.chars().collect();
        Self::parse_to_nodes(&chars, &format_map, profile)
    }

    fn parse_to_nodes(
        chars: &[char],
        format_map: &HashMap<u32, &FormatTag>,
        profile: ExtractionProfile,
    ) -> Vec<MarkupNode> {
        let mut nodes = Vec::new();
        let mut literal = String::new();
        let mut i = 0;

        while i < chars.len() {
            if chars[i] == BLOCK_START {
                if let Some(close) = find_balanced_close(chars, i) {
                    if let Some((id, consumed)) = parse_anchor(&chars[close + 1..]) {
                        if let Some(fmt) = format_map.get(&id) {
                            let inner = &chars[i + 1..close];
                            flush_literal(&mut literal, &mut nodes, profile);
                            nodes.push(Self::rebuild_container(fmt, inner, format_map, profile));
                            i = close + 1 + consumed;
                            continue;
                        }
                    }
                }
            }

            if chars[i] == ANCHOR_START {
                if let Some((id, consumed)) = parse_anchor(&chars[i..]) {
                    if let Some(fmt) = format_map.get(&id) {
                        flush_literal(&mut literal, &mut nodes, profile);
                        nodes.extend(Self::rebuild_bare(fmt));
                        i += consumed;
                        continue;
                    }
                }
            }

            // Unresolvable marker text stays visible instead of vanishing
            literal.push(chars[i]);
            i += 1;
        }

        flush_literal(&mut literal, &mut nodes, profile);
        nodes
    }

    /// Rebuild a container anchor around recursively restored inner content
    fn rebuild_container(
        fmt: &FormatTag,
        inner: &[char],
        format_map: &HashMap<u32, &FormatTag>,
        profile: ExtractionProfile,
    ) -> MarkupNode {
        match (&fmt.raw_markup, fmt.kind) {
            (Some(raw), FormatKind::Container) => {
                // Clone-and-replace: keep the original run, swap its text
                let inner_text = unescape_metachars(&inner.iter().collect::<String>());
                rebuild_docx_run(raw, &inner_text)
            }
            (Some(raw), FormatKind::Monolithic) => {
                // A monolithic id wrapped in block markers; the raw markup wins
                warn!("Monolithic anchor {} carried inline content; reinserting raw markup", fmt.id);
                parse_raw_nodes(raw)
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| MarkupNode::text(""))
            }
            (None, _) => MarkupNode::Element {
                tag: fmt.tag_name.clone(),
                attrs: fmt.attributes.clone(),
                children: Self::parse_to_nodes(inner, format_map, profile),
            },
        }
    }

    /// Rebuild a bare anchor reference (no surrounding block markers)
    fn rebuild_bare(fmt: &FormatTag) -> Vec<MarkupNode> {
        match &fmt.raw_markup {
            Some(raw) => parse_raw_nodes(raw),
            None => vec![MarkupNode::Element {
                tag: fmt.tag_name.clone(),
                attrs: fmt.attributes.clone(),
                children: Vec::new(),
            }],
        }
    }

    /// Splice restored nodes into the tree, preserving structural children
    pub fn apply(
        doc: &mut MarkupDocument,
        block: &Block,
        nodes: Vec<MarkupNode>,
        profile: ExtractionProfile,
    ) -> Result<(), CodecError> {
        let target = doc.node_at_path_mut(&block.source_path).ok_or_else(|| {
            CodecError::MarkupParse("block path no longer resolves in tree".to_string())
        })?;
        let children = target.children_mut().ok_or_else(|| {
            CodecError::MarkupParse("block path resolves to a text node".to_string())
        })?;

        match profile {
            ExtractionProfile::Epub => {
                children.clear();
                children.extend(nodes);
            }
            ExtractionProfile::Docx => {
                // Paragraph properties stay; only text/inline content is replaced
                children.retain(|c| {
                    c.tag().map(|t| local_name(t) == "pPr").unwrap_or(false)
                });
                children.extend(nodes);
            }
        }
        Ok(())
    }
}

/// Tag name without its namespace prefix
pub fn local_name(tag: &str) -> &str {
    tag.rsplit(':').next().unwrap_or(tag)
}

fn anchor_ref(id: u32) -> String {
    format!("{ANCHOR_START}{id}{ANCHOR_END}")
}

fn check_for_sentinels(text: &str) -> Result<(), CodecError> {
    if let Some(ch) = find_sentinel(text) {
        return Err(CodecError::SentinelCollision { codepoint: ch as u32 });
    }
    Ok(())
}

/// Escape the two markup metacharacters so literal text can never be
/// mistaken for markup when spliced back
fn escape_metachars(text: &str) -> String {
    text.replace('<', "&lt;").replace('>', "&gt;")
}

fn unescape_metachars(text: &str) -> String {
    text.replace("&lt;", "<").replace("&gt;", ">")
}

/// Index of the BLOCK_END matching the BLOCK_START at `open`, nesting-aware
fn find_balanced_close(chars: &[char], open: usize) -> Option<usize> {
    let mut level = 1;
    for (offset, &ch) in chars[open + 1..].iter().enumerate() {
        if ch == BLOCK_START {
            level += 1;
        } else if ch == BLOCK_END {
            level -= 1;
            if level == 0 {
                return Some(open + 1 + offset);
            }
        }
    }
    None
}

/// Parse `⦗digits⦘` at the start of the slice; returns (id, chars consumed)
fn parse_anchor(chars: &[char]) -> Option<(u32, usize)> {
    if chars.first() != Some(&ANCHOR_START) {
        return None;
    }
    let mut digits = String::new();
    let mut i = 1;
    while i < chars.len() && chars[i].is_ascii_digit() {
        digits.push(chars[i]);
        i += 1;
    }
    if digits.is_empty() || chars.get(i) != Some(&ANCHOR_END) {
        return None;
    }
    digits.parse().ok().map(|id| (id, i + 1))
}

fn flush_literal(literal: &mut String, nodes: &mut Vec<MarkupNode>, profile: ExtractionProfile) {
    if literal.is_empty() {
        return;
    }
    let text = unescape_metachars(&std::mem::take(literal));
    match profile {
        ExtractionProfile::Epub => nodes.push(MarkupNode::Text(text)),
        ExtractionProfile::Docx => {
            // Loose text needs a run wrapper to be valid WordprocessingML
            nodes.push(MarkupNode::Element {
                tag: "w:r".to_string(),
                attrs: Vec::new(),
                children: vec![MarkupNode::Element {
                    tag: "w:t".to_string(),
                    attrs: vec![("xml:space".to_string(), "preserve".to_string())],
                    children: vec![MarkupNode::Text(text)],
                }],
            });
        }
    }
}

fn parse_raw_nodes(raw: &str) -> Vec<MarkupNode> {
    match parse_document(raw) {
        Ok(doc) => doc.roots,
        Err(e) => {
            warn!("Stored raw markup failed to re-parse: {}", e);
            Vec::new()
        }
    }
}

/// Clone a stored DOCX run and replace the text of its `w:t` child
fn rebuild_docx_run(raw: &str, inner_text: &str) -> MarkupNode {
    let mut roots = parse_raw_nodes(raw);
    let Some(mut run) = (if roots.is_empty() { None } else { Some(roots.remove(0)) }) else {
        return MarkupNode::text(inner_text);
    };
    if let Some(t_node) = find_text_element_mut(&mut run) {
        if let Some(children) = t_node.children_mut() {
            children.clear();
            children.push(MarkupNode::Text(inner_text.to_string()));
        }
    }
    run
}

fn find_text_element_mut(node: &mut MarkupNode) -> Option<&mut MarkupNode> {
    let is_t = node.tag().map(|t| local_name(t) == "t").unwrap_or(false);
    if is_t {
        return Some(node);
    }
    if let MarkupNode::Element { children, .. } = node {
        for child in children {
            if let Some(found) = find_text_element_mut(child) {
                return Some(found);
            }
        }
    }
    None
}
