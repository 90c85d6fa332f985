/*!
 * In-memory markup tree model.
 *
 * This module contains the owned node tree that the anchor codec operates on:
 *
 * - `node`: the `MarkupNode` tree, path addressing and serialization
 * - `parser`: a small forgiving XML/XHTML fragment scanner
 *
 * The parser does not validate well-formedness beyond what it needs to build
 * a tree; malformed input is recovered from where possible and reported via
 * log warnings, never silently reshuffled.
 */

pub use self::node::{MarkupDocument, MarkupNode, NodePath};
pub use self::parser::parse_document;

pub mod node;
pub mod parser;
