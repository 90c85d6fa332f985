/*!
 * # YADTwAI - Yet Another Document Translator with AI
 *
 * A Rust library for automatic translation of structured documents
 * (EPUB/DOCX) with perfect preservation of markup, inline formatting and
 * document layout.
 *
 * ## Features
 *
 * - Flatten arbitrarily nested markup into plain text carrying recoverable
 *   anchor markers, and splice translations back without losing a single
 *   formatting run
 * - Batch text for the translation service under a character budget, with
 *   atomic protection of indivisible spans
 * - Validate every response against the structure it was sent with before
 *   letting it anywhere near the document
 * - Resume interrupted runs from a per-group checkpoint
 * - Reuse previously validated translations across runs
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `markup`: In-memory markup tree model and fragment parser
 * - `anchor`: Anchor codec (extraction and restoration) and its sentinel alphabet
 * - `segmenter`: Size-bounded batching of blocks and plain text
 * - `validation`: Structural validation of translator responses
 * - `pipeline`: Resumable, checkpointed translation state machine
 * - `container`: EPUB/DOCX extract and repack collaborators
 * - `translation`: Streaming translation service and sqlite translation memory
 * - `providers`: Client implementations for LLM endpoints
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod anchor;
pub mod app_config;
pub mod app_controller;
pub mod container;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod markup;
pub mod pipeline;
pub mod providers;
pub mod segmenter;
pub mod translation;
pub mod validation;

// Re-export main types for easier usage
pub use anchor::{AnchorCodec, Block, ExtractionProfile, FormatKind, FormatTag};
pub use app_config::Config;
pub use app_controller::Controller;
pub use errors::{AppError, CodecError, PipelineError, ProviderError};
pub use markup::{MarkupDocument, MarkupNode};
pub use pipeline::{CancellationToken, PipelineState, PipelineStatus, TranslationPipeline};
pub use segmenter::Group;
pub use translation::TranslationService;
