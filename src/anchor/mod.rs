/*!
 * Anchor codec: markup trees to flat anchor-tagged text and back.
 *
 * Extraction replaces inline markup with sentinel-delimited numeric anchors
 * so a translation service only ever sees plain text, and restoration
 * rebuilds the original elements around the translated text. The sentinel
 * alphabet lives in `sentinels`; the codec itself in `codec`.
 */

pub use self::codec::{AnchorCodec, Block, ExtractionProfile, FormatKind, FormatTag};
pub use self::sentinels::{
    ANCHOR_END, ANCHOR_START, BLOCK_END, BLOCK_START, GROUP_END, GROUP_START,
};

pub mod codec;
pub mod sentinels;
