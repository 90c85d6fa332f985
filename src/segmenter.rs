/*!
 * Size-bounded batching of blocks and plain text.
 *
 * Two independent modes live here:
 *
 * - `group_blocks` / `format_for_ai`: greedy bin-packing of anchored blocks
 *   into translation units framed with the sentinel alphabet.
 * - `chunk_text`: plain-text/Markdown chunking that treats `<table>` spans as
 *   indivisible and only cuts at block-level boundaries. Concatenating the
 *   chunks always reproduces the input exactly.
 *
 * The character budget is a soft guideline in both modes: a block or
 * protected span larger than the budget is emitted whole, never split.
 */

use log::{debug, error, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::anchor::sentinels::{delimiter_for, DELIMITER_POOL, GROUP_END, GROUP_START};
use crate::anchor::Block;

/// Closing tags and blank lines where plain-text chunks may end
static BLOCK_BOUNDARY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</(?:p|div|li|ul|ol|h[1-6]|blockquote|section|article|dl|dt|dd|pre|figure)>|(?:\r?\n){2,}")
        .expect("Invalid block boundary regex")
});

/// Opening table tag, nesting-aware scanning starts here
static TABLE_OPEN_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<table[\s>]").expect("Invalid table open regex"));

/// A batch of blocks submitted to the translator as one unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    /// Indices into the pipeline's flat block list, in document order
    pub block_indices: Vec<usize>,
    /// Formatted text sent to the translator
    pub original_text: String,
    /// Raw translator output once processed (empty until then)
    #[serde(default)]
    pub translated_text: String,
    /// Set when the response failed structural validation
    #[serde(default)]
    pub is_error: bool,
}

impl Group {
    /// Whether this group has been through the translator
    pub fn is_translated(&self) -> bool {
        !self.translated_text.is_empty()
    }
}

/// Pack blocks into groups under a character budget.
///
/// Blocks are appended while the cumulative size stays within `max_chars`;
/// a block that alone exceeds the budget still gets a group of its own.
/// Group size is additionally capped at the delimiter pool length so
/// per-position delimiters never repeat within one group.
pub fn group_blocks(blocks: &[Block], max_chars: usize) -> Vec<Group> {
    if blocks.is_empty() {
        warn!("No blocks to group");
        return Vec::new();
    }

    let effective_max = max_chars.max(100);
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut current_size = 0usize;

    for (idx, block) in blocks.iter().enumerate() {
        let fits = current_size + block.char_size <= effective_max
            && current.len() < DELIMITER_POOL.len();
        if !current.is_empty() && !fits {
            groups.push(std::mem::take(&mut current));
            current_size = 0;
        }
        current.push(idx);
        current_size += block.char_size;
    }
    if !current.is_empty() {
        groups.push(current);
    }

    let total_grouped: usize = groups.iter().map(|g| g.len()).sum();
    if total_grouped != blocks.len() {
        error!(
            "Lost blocks during grouping! Original: {}, grouped: {}",
            blocks.len(),
            total_grouped
        );
    }

    groups
        .into_iter()
        .map(|block_indices| {
            let texts: Vec<&str> = block_indices
                .iter()
                .map(|&i| blocks[i].anchored_text.as_str())
                .collect();
            Group {
                original_text: format_for_ai(&texts),
                block_indices,
                translated_text: String::new(),
                is_error: false,
            }
        })
        .collect()
}

/// Frame block texts for the translator: one group span, each block wrapped
/// in its position's delimiter pair
pub fn format_for_ai(texts: &[&str]) -> String {
    let mut lines = Vec::with_capacity(texts.len() + 2);
    lines.push(GROUP_START.to_string());
    for (i, text) in texts.iter().enumerate() {
        let delim = delimiter_for(i);
        lines.push(format!("{delim}{text}{delim}"));
    }
    lines.push(GROUP_END.to_string());
    lines.join("\n")
}

/// Chunk plain text or Markdown under a character budget.
///
/// `<table>...</table>` spans are located by nesting-aware tag scanning and
/// never broken; everything else splits only at closing block tags or blank
/// lines. Adjacent segments are merged greedily while they fit.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let segments = split_segments(text);
    let effective_max = max_chars.max(1);

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for segment in &segments {
        if !current.is_empty() && current.len() + segment.len() > effective_max {
            chunks.push(std::mem::take(&mut current));
        }
        current.push_str(segment);
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    debug!("Chunked {} chars into {} chunks", text.len(), chunks.len());
    chunks
}

/// Split text into minimal segments: protected table spans stay whole,
/// the rest is cut after every block boundary
fn split_segments(text: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut pos = 0;

    while pos < text.len() {
        let rest = &text[pos..];
        match TABLE_OPEN_REGEX.find(rest) {
            Some(open) => {
                if open.start() > 0 {
                    split_at_boundaries(&rest[..open.start()], &mut segments);
                }
                let table_end = find_table_end(rest, open.start());
                segments.push(&rest[open.start()..table_end]);
                pos += table_end;
            }
            None => {
                split_at_boundaries(rest, &mut segments);
                break;
            }
        }
    }

    segments
}

/// Cut unprotected text after each block boundary match
fn split_at_boundaries<'a>(text: &'a str, out: &mut Vec<&'a str>) {
    let mut last = 0;
    for m in BLOCK_BOUNDARY_REGEX.find_iter(text) {
        out.push(&text[last..m.end()]);
        last = m.end();
    }
    if last < text.len() {
        out.push(&text[last..]);
    }
}

/// Byte offset just past the `</table>` matching the `<table` at `open`,
/// or the end of the text if the span never closes
fn find_table_end(text: &str, open: usize) -> usize {
    let lower = text.to_ascii_lowercase();
    let mut depth = 0usize;
    let mut pos = open;

    while pos < lower.len() {
        if lower[pos..].starts_with("<table") {
            depth += 1;
            pos += "<table".len();
        } else if lower[pos..].starts_with("</table") {
            depth = depth.saturating_sub(1);
            let close = lower[pos..].find('>').map(|p| pos + p + 1).unwrap_or(lower.len());
            pos = close;
            if depth == 0 {
                return pos;
            }
        } else {
            // Advance one character, staying on a char boundary
            pos += lower[pos..].chars().next().map(char::len_utf8).unwrap_or(1);
        }
    }

    warn!("Unclosed <table> span; protecting through end of text");
    text.len()
}
