use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use futures_util::StreamExt;
use log::{debug, info, warn};

use crate::anchor::{AnchorCodec, Block};
use crate::container::SourceKind;
use crate::errors::PipelineError;
use crate::file_utils::FileManager;
use crate::markup::parse_document;
use crate::segmenter::group_blocks;
use crate::translation::TranslationService;
use crate::validation::validate_and_parse;

use super::state::{PipelineState, StateStore, STATE_VERSION};

// @module: Resumable translation state machine

/// Visible prefix stored with responses that failed structural validation
pub const STRUCTURE_ERROR_PREFIX: &str = "[STRUCTURE ERROR] ";

/// Terminal status of one pipeline invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStatus {
    /// Nothing to do (already finished)
    Idle,
    /// Stopped cooperatively at a group boundary
    Stopped,
    /// All requested groups processed
    Finished,
}

/// Cooperative cancellation handle, checked at group boundaries only.
///
/// An in-flight streaming call always runs to completion before a stop takes
/// effect; there is no ambient status flag anywhere else.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a fresh, uncancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop at the next group boundary
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether a stop has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Outcome of restoring translations into the working directory
#[derive(Debug, Default, Clone)]
pub struct RestoreReport {
    /// Files whose blocks were restored and rewritten
    pub files_restored: usize,
    /// Files skipped because their block count drifted from the cache
    pub files_skipped: Vec<String>,
    /// Groups left out because they are flagged or not yet translated
    pub groups_skipped: usize,
}

/// Resumable translation pipeline over one input document.
///
/// First invocation extracts the container, builds the flat group list and
/// persists it; later invocations resume from the cursor or re-translate an
/// explicit subset of groups. Exactly one checkpoint is written per group.
pub struct TranslationPipeline {
    service: TranslationService,
    store: StateStore,
    /// Character budget per group (soft)
    max_group_chars: usize,
    /// Number of preceding (original, translated) pairs fed as context
    context_window: usize,
}

impl TranslationPipeline {
    /// Create a pipeline over a translation service and state store
    pub fn new(
        service: TranslationService,
        store: StateStore,
        max_group_chars: usize,
        context_window: usize,
    ) -> Self {
        Self { service, store, max_group_chars, context_window }
    }

    /// State store this pipeline checkpoints into
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    // =========================================================================
    // Preparation
    // =========================================================================

    /// Load the persisted state for an input, or build it from scratch.
    ///
    /// If a cached state exists but its working directory is gone, the
    /// container is re-extracted so restoration has trees to write into.
    pub fn prepare(&self, input: &Path) -> Result<PipelineState> {
        if let Some(state) = self.store.load(input)? {
            if !FileManager::dir_exists(&state.working_dir) {
                warn!("Working directory missing, re-extracting {:?}", input);
                state.source_kind.extract(input, &state.working_dir)?;
            }
            return Ok(state);
        }

        self.build_state(input)
    }

    fn build_state(&self, input: &Path) -> Result<PipelineState> {
        if !FileManager::file_exists(input) {
            return Err(anyhow!("Input file does not exist: {:?}", input));
        }

        let source_kind = SourceKind::from_path(input)?;
        let working_dir = self.store.working_dir(input);

        // A stale extraction without a state file is worthless; start clean
        FileManager::remove_dir_if_exists(&working_dir)?;
        source_kind.extract(input, &working_dir)?;

        let profile = source_kind.profile();
        let content_files = source_kind.content_files(&working_dir)?;
        info!("Found {} content files in {:?}", content_files.len(), input);

        let mut blocks: Vec<Block> = Vec::new();
        let mut block_files: BTreeMap<usize, String> = BTreeMap::new();
        let mut file_block_counts: BTreeMap<String, usize> = BTreeMap::new();

        for rel_path in &content_files {
            let content = FileManager::read_to_string(working_dir.join(rel_path))?;
            let doc = parse_document(&content)
                .with_context(|| format!("Failed to parse content file: {}", rel_path))?;

            let file_blocks = AnchorCodec::extract_blocks(&doc, profile)?;
            file_block_counts.insert(rel_path.clone(), file_blocks.len());
            debug!("{}: {} blocks", rel_path, file_blocks.len());

            for block in file_blocks {
                block_files.insert(blocks.len(), rel_path.clone());
                blocks.push(block);
            }
        }

        let groups = group_blocks(&blocks, self.max_group_chars);
        info!("Segmented {} blocks into {} groups", blocks.len(), groups.len());

        let mut state = PipelineState {
            version: STATE_VERSION,
            source_kind,
            input_path: input.to_path_buf(),
            working_dir,
            cursor: 0,
            groups,
            blocks,
            block_files,
            file_block_counts,
            finished: false,
            updated_at: None,
        };
        self.store.save(&mut state)?;
        Ok(state)
    }

    // =========================================================================
    // Translation run
    // =========================================================================

    /// Run the pipeline: resume from the cursor, or process exactly the
    /// requested subset of group indices (cursor untouched).
    ///
    /// The progress callback receives
    /// `(group_index, total_groups, original, partial_translation, is_final)`
    /// once per streamed fragment and once more with `is_final = true` when a
    /// group completes.
    pub async fn run<F>(
        &self,
        input: &Path,
        cancel: &CancellationToken,
        subset: Option<&[usize]>,
        mut progress: F,
    ) -> Result<PipelineStatus>
    where
        F: FnMut(usize, usize, &str, &str, bool),
    {
        let mut state = self.prepare(input)?;
        let total = state.groups.len();

        let indices: Vec<usize> = match subset {
            Some(requested) => {
                for &idx in requested {
                    if idx >= total {
                        return Err(anyhow!(PipelineError::GroupOutOfRange(idx)));
                    }
                }
                requested.to_vec()
            }
            None => {
                if state.cursor >= total {
                    debug!("Nothing to do, cursor already at {}/{}", state.cursor, total);
                    return Ok(PipelineStatus::Idle);
                }
                (state.cursor..total).collect()
            }
        };
        let advancing_cursor = subset.is_none();

        for idx in indices {
            if cancel.is_cancelled() {
                info!("Stop requested, checkpointing at group {}", idx);
                self.store.save(&mut state)?;
                return Ok(PipelineStatus::Stopped);
            }

            let original = state.groups[idx].original_text.clone();
            let expected = state.groups[idx].block_indices.len();

            let full = match self.service.recall(&original) {
                Some(hit) => {
                    debug!("Group {} served from translation memory", idx);
                    hit
                }
                None => {
                    let mut accumulated = String::new();
                    let mut stream = self
                        .service
                        .translate_stream(&original, &self.history(&state, idx))
                        .await;
                    while let Some(fragment) = stream.next().await {
                        accumulated.push_str(&fragment);
                        progress(idx, total, &original, &accumulated, false);
                    }
                    accumulated
                }
            };

            let (parsed, validation) = validate_and_parse(&full, expected);
            let group = &mut state.groups[idx];
            if parsed.is_some() {
                group.translated_text = full;
                group.is_error = false;
                self.service.remember(&original, &group.translated_text);
            } else {
                warn!(
                    "Group {} failed validation: {}",
                    idx,
                    validation.error_message.as_deref().unwrap_or("unknown")
                );
                group.translated_text = format!("{STRUCTURE_ERROR_PREFIX}{full}");
                group.is_error = true;
            }

            let display = state.groups[idx].translated_text.clone();
            progress(idx, total, &original, &display, true);

            if advancing_cursor {
                state.cursor = idx + 1;
            }
            self.store.save(&mut state)?;
        }

        if advancing_cursor && state.cursor >= total {
            state.finished = true;
            self.store.save(&mut state)?;
        }
        Ok(PipelineStatus::Finished)
    }

    /// Context window: the last `k` successfully translated groups before
    /// `idx`, as (original, translated) pairs in document order
    fn history(&self, state: &PipelineState, idx: usize) -> Vec<(String, String)> {
        if self.context_window == 0 {
            return Vec::new();
        }
        let mut pairs: Vec<(String, String)> = state.groups[..idx]
            .iter()
            .rev()
            .filter(|g| g.is_translated() && !g.is_error)
            .take(self.context_window)
            .map(|g| (g.original_text.clone(), g.translated_text.clone()))
            .collect();
        pairs.reverse();
        pairs
    }

    // =========================================================================
    // Restoration
    // =========================================================================

    /// Splice every validated translation back into the working directory's
    /// content files. Files whose freshly parsed block count disagrees with
    /// the cached mapping are skipped whole rather than guessed at.
    pub fn restore_translations(&self, state: &PipelineState) -> Result<RestoreReport> {
        let profile = state.source_kind.profile();
        let mut report = RestoreReport::default();

        // Per-block translated texts, via the validator only
        let mut block_texts: BTreeMap<usize, String> = BTreeMap::new();
        for group in &state.groups {
            if group.is_error || !group.is_translated() {
                report.groups_skipped += 1;
                continue;
            }
            let (parsed, _) = validate_and_parse(&group.translated_text, group.block_indices.len());
            match parsed {
                Some(texts) => {
                    for (&block_idx, text) in group.block_indices.iter().zip(texts) {
                        block_texts.insert(block_idx, text);
                    }
                }
                None => {
                    // Validated at translation time; drift here means the
                    // stored text was edited by hand into an invalid shape
                    warn!("Stored group no longer validates, leaving its blocks untouched");
                    report.groups_skipped += 1;
                }
            }
        }

        for rel_path in state.content_files() {
            let file_path = state.working_dir.join(&rel_path);
            let content = FileManager::read_to_string(&file_path)?;
            let mut doc = parse_document(&content)
                .with_context(|| format!("Failed to parse content file: {}", rel_path))?;

            let fresh_count = AnchorCodec::discover_blocks(&doc, profile).len();
            let cached_count = state.file_block_counts.get(&rel_path).copied().unwrap_or(0);
            if fresh_count != cached_count {
                warn!(
                    "Block count drift in {} (cached {}, found {}); skipping file",
                    rel_path, cached_count, fresh_count
                );
                report.files_skipped.push(rel_path);
                continue;
            }

            let mut touched = false;
            for block_idx in state.blocks_for_file(&rel_path) {
                let Some(translated) = block_texts.get(&block_idx) else {
                    continue;
                };
                let block = &state.blocks[block_idx];
                let nodes = AnchorCodec::restore(block, translated, profile);
                AnchorCodec::apply(&mut doc, block, nodes, profile)
                    .with_context(|| format!("Failed to splice block {} into {}", block_idx, rel_path))?;
                touched = true;
            }

            if touched {
                FileManager::write_to_file(&file_path, &doc.serialize())?;
                report.files_restored += 1;
            }
        }

        info!(
            "Restoration done: {} files written, {} skipped, {} groups left out",
            report.files_restored,
            report.files_skipped.len(),
            report.groups_skipped
        );
        Ok(report)
    }
}
