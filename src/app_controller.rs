use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};

use crate::app_config::Config;
use crate::pipeline::{CancellationToken, PipelineStatus, StateStore, TranslationPipeline};
use crate::providers::openai::OpenAI;
use crate::translation::{TranslationMemory, TranslationService};

// @module: Application controller wiring config, pipeline and container I/O

/// Main application controller
pub struct Controller {
    /// Application configuration
    config: Config,
    /// The pipeline driving extraction, translation and checkpointing
    pipeline: TranslationPipeline,
}

impl Controller {
    /// Create a controller from a validated configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;

        let provider = Arc::new(OpenAI::new(
            &config.translation.endpoint,
            &config.translation.api_key,
            &config.translation.model,
            config.translation.temperature,
        ));

        let cache_dir = config.effective_cache_dir();
        crate::file_utils::FileManager::ensure_dir(&cache_dir)?;
        let memory = TranslationMemory::open(cache_dir.join("memory.db"))
            .context("Failed to open translation memory")?;
        let service = TranslationService::new(provider, &config.resolved_system_prompt())
            .with_memory(memory);

        Self::with_service(config, service)
    }

    /// Create a controller over an already-built translation service
    /// (used by tests to substitute a mock provider)
    pub fn with_service(config: Config, service: TranslationService) -> Result<Self> {
        let cache_dir = config.effective_cache_dir();
        let store = StateStore::new(&cache_dir)?;
        let pipeline = TranslationPipeline::new(
            service,
            store,
            config.translation.max_group_chars,
            config.translation.context_window,
        );
        Ok(Self { config, pipeline })
    }

    /// The pipeline this controller drives
    pub fn pipeline(&self) -> &TranslationPipeline {
        &self.pipeline
    }

    /// The configuration this controller runs with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Translate a document end to end: extract, translate every remaining
    /// group, splice the results back and repack into the output directory.
    pub async fn run(&self, input: PathBuf, output_dir: PathBuf, force_overwrite: bool) -> Result<()> {
        let output = Self::output_path(&input, &output_dir)?;
        if output.exists() && !force_overwrite {
            warn!("Output already exists: {:?}. Use -f to force overwrite.", output);
            return Ok(());
        }

        let status = self.translate(&input, None).await?;
        if status == PipelineStatus::Stopped {
            info!("Translation stopped; run again to resume from the checkpoint");
            return Ok(());
        }

        self.export(&input, &output_dir, true)
    }

    /// Re-translate an explicit set of group indices, then stop
    pub async fn run_groups(&self, input: PathBuf, group_indices: &[usize]) -> Result<()> {
        self.translate(&input, Some(group_indices)).await?;
        info!("Re-translated {} group(s)", group_indices.len());
        Ok(())
    }

    /// Segment the document without translating anything
    pub fn prepare_only(&self, input: &Path) -> Result<()> {
        let state = self.pipeline.prepare(input)?;
        info!(
            "Prepared {:?}: {} blocks in {} groups across {} files",
            input,
            state.blocks.len(),
            state.groups.len(),
            state.file_block_counts.len()
        );
        Ok(())
    }

    /// Restore whatever has been translated so far and repack the container
    pub fn export(&self, input: &Path, output_dir: &Path, force_overwrite: bool) -> Result<()> {
        let output = Self::output_path(input, output_dir)?;
        if output.exists() && !force_overwrite {
            warn!("Output already exists: {:?}. Use -f to force overwrite.", output);
            return Ok(());
        }

        let state = self
            .pipeline
            .store()
            .load(input)?
            .ok_or_else(|| anyhow!("No translation state for {:?}; run a translation first", input))?;

        let report = self.pipeline.restore_translations(&state)?;
        for skipped in &report.files_skipped {
            warn!("Content drifted from the cached mapping, left untouched: {}", skipped);
        }

        crate::file_utils::FileManager::ensure_dir(output_dir)?;
        state.source_kind.repack(&state.working_dir, &output)?;
        info!("Saved translated document to {:?}", output);
        Ok(())
    }

    /// Drop the cached state and working directory for an input
    pub fn clear_cache(&self, input: &Path) -> Result<()> {
        self.pipeline.store().clear(input)?;
        info!("Cleared cached state for {:?}", input);
        Ok(())
    }

    async fn translate(&self, input: &Path, subset: Option<&[usize]>) -> Result<PipelineStatus> {
        let state = self.pipeline.prepare(input)?;
        let total = state.groups.len() as u64;

        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        bar.set_position(state.cursor as u64);

        // Ctrl-C requests a cooperative stop at the next group boundary
        let cancel = CancellationToken::new();
        let signal_token = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Stop requested, finishing the current group first");
                signal_token.cancel();
            }
        });

        let bar_for_progress = bar.clone();
        let status = self
            .pipeline
            .run(input, &cancel, subset, move |idx, _total, _orig, partial, is_final| {
                if is_final {
                    bar_for_progress.set_position(idx as u64 + 1);
                    bar_for_progress.set_message(String::new());
                } else {
                    // Show the tail of the streaming translation
                    let tail: String = tail_chars(partial, 32).replace('\n', " ");
                    bar_for_progress.set_message(tail);
                }
            })
            .await?;

        match status {
            PipelineStatus::Finished => bar.finish_with_message("done"),
            PipelineStatus::Stopped => bar.abandon_with_message("stopped"),
            PipelineStatus::Idle => bar.finish_with_message("nothing to do"),
        }
        Ok(status)
    }

    /// Output path mirrors the input name with a `_translated` suffix
    fn output_path(input: &Path, output_dir: &Path) -> Result<PathBuf> {
        let stem = input
            .file_stem()
            .ok_or_else(|| anyhow!("Input has no file name: {:?}", input))?
            .to_string_lossy();
        let ext = input
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(output_dir.join(format!("{}_translated.{}", stem, ext)))
    }
}

/// Last `n` characters of a string
fn tail_chars(text: &str, n: usize) -> String {
    let count = text.chars().count();
    text.chars().skip(count.saturating_sub(n)).collect()
}
