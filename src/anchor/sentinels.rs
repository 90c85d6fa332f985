/*!
 * Reserved sentinel alphabet for anchor-tagged text.
 *
 * Every structural character the codec emits is drawn from mathematical
 * symbol ranges that effectively never occur in book text or markup. This is
 * a trust assumption, not a guarantee: extraction pre-scans source text and
 * refuses to encode anything that already contains one of these characters.
 */

/// Opens the single translation-unit frame sent to the model
pub const GROUP_START: char = '⟬';
/// Closes the translation-unit frame
pub const GROUP_END: char = '⟭';

/// Opens the payload of a container anchor
pub const BLOCK_START: char = '⟦';
/// Closes the payload of a container anchor
pub const BLOCK_END: char = '⟧';

/// Opens a numeric anchor id
pub const ANCHOR_START: char = '⦗';
/// Closes a numeric anchor id
pub const ANCHOR_END: char = '⦘';

/// Rotating pool of per-position block delimiters inside a group.
///
/// Position `i` uses `DELIMITER_POOL[i % len]` on both sides of its text.
/// Groups are capped at the pool length so a delimiter never repeats within
/// one group.
pub const DELIMITER_POOL: [char; 42] = [
    '⧖', '⧗', '⧘', '⧙', '⧚', '⧛', '⧜', '⧝', '⧞', '⧟', '⨀', '⨁', '⨂', '⨃',
    '⨄', '⨅', '⨆', '⨇', '⨈', '⨉', '⨊', '⨋', '⨌', '⨍', '⨎', '⨏', '⨐', '⨑',
    '⨒', '⨓', '⨔', '⨕', '⨖', '⨗', '⨘', '⨙', '⨚', '⨛', '⨜', '⨝', '⨞', '⨟',
];

/// Delimiter character for a block position within a group
pub fn delimiter_for(position: usize) -> char {
    DELIMITER_POOL[position % DELIMITER_POOL.len()]
}

/// Whether a character belongs to the reserved alphabet
pub fn is_sentinel(ch: char) -> bool {
    matches!(
        ch,
        GROUP_START | GROUP_END | BLOCK_START | BLOCK_END | ANCHOR_START | ANCHOR_END
    ) || DELIMITER_POOL.contains(&ch)
}

/// First reserved character found in the given text, if any
pub fn find_sentinel(text: &str) -> Option<char> {
    text.chars().find(|&ch| is_sentinel(ch))
}
