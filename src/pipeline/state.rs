use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::anchor::Block;
use crate::container::SourceKind;
use crate::errors::PipelineError;
use crate::file_utils::FileManager;
use crate::segmenter::Group;

// @module: Persisted pipeline state and its on-disk store

/// Schema version this build reads and writes
pub const STATE_VERSION: u32 = 1;

/// Everything needed to resume a translation run, persisted after every
/// processed group. Written only through full-file atomic replacement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    /// Schema version; anything else is rejected on load
    pub version: u32,
    /// Container format of the input
    pub source_kind: SourceKind,
    /// The input document this state belongs to
    pub input_path: PathBuf,
    /// Directory the container was extracted into
    pub working_dir: PathBuf,
    /// Index of the next unprocessed group
    pub cursor: usize,
    /// All groups in document order
    pub groups: Vec<Group>,
    /// All blocks in document order, across files
    pub blocks: Vec<Block>,
    /// Block index -> content file (relative path) it was extracted from
    pub block_files: BTreeMap<usize, String>,
    /// Content file -> number of blocks found at extraction time,
    /// used to detect drift before restoration
    pub file_block_counts: BTreeMap<String, usize>,
    /// Whether every group has been processed
    pub finished: bool,
    /// Timestamp of the last checkpoint
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl PipelineState {
    /// Block indices belonging to one content file, in document order
    pub fn blocks_for_file(&self, rel_path: &str) -> Vec<usize> {
        self.block_files
            .iter()
            .filter(|(_, file)| file.as_str() == rel_path)
            .map(|(&idx, _)| idx)
            .collect()
    }

    /// Content files in first-seen block order
    pub fn content_files(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for file in self.block_files.values() {
            if !seen.contains(file) {
                seen.push(file.clone());
            }
        }
        seen
    }
}

/// On-disk store of pipeline states, one JSON file per input document
pub struct StateStore {
    /// Directory holding state files and extraction working dirs
    cache_dir: PathBuf,
}

impl StateStore {
    /// Create a store rooted at the given cache directory
    pub fn new<P: AsRef<Path>>(cache_dir: P) -> Result<Self> {
        FileManager::ensure_dir(cache_dir.as_ref())?;
        Ok(Self { cache_dir: cache_dir.as_ref().to_path_buf() })
    }

    /// Root directory of this store
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// State file path for an input document
    pub fn state_path(&self, input: &Path) -> PathBuf {
        let base = input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "input".to_string());
        self.cache_dir.join(format!("{}_cache.json", base))
    }

    /// Extraction working directory for an input document
    pub fn working_dir(&self, input: &Path) -> PathBuf {
        let base = input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "input".to_string());
        self.cache_dir.join(format!("{}_extracted", base))
    }

    /// Load the state for an input, if one was persisted.
    ///
    /// A state file with an unrecognized schema version is an error, never a
    /// guess; a state file that does not parse at all is reported as corrupt.
    pub fn load(&self, input: &Path) -> Result<Option<PipelineState>> {
        let path = self.state_path(input);
        if !FileManager::file_exists(&path) {
            return Ok(None);
        }

        let raw = FileManager::read_to_string(&path)?;
        let value: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| anyhow!(PipelineError::CorruptState(e.to_string())))?;

        let found = value
            .get("version")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| {
                anyhow!(PipelineError::CorruptState("missing version field".to_string()))
            })? as u32;
        if found != STATE_VERSION {
            return Err(anyhow!(PipelineError::UnsupportedStateVersion {
                found,
                expected: STATE_VERSION,
            }));
        }

        let state: PipelineState = serde_json::from_value(value)
            .map_err(|e| anyhow!(PipelineError::CorruptState(e.to_string())))?;
        debug!(
            "Loaded state for {:?}: cursor {}/{}, finished={}",
            input,
            state.cursor,
            state.groups.len(),
            state.finished
        );
        Ok(Some(state))
    }

    /// Checkpoint the state: full-file atomic rewrite
    pub fn save(&self, state: &mut PipelineState) -> Result<()> {
        state.updated_at = Some(chrono::Local::now().to_rfc3339());
        let json = serde_json::to_string_pretty(state).context("Failed to serialize state")?;
        FileManager::atomic_write(self.state_path(&state.input_path), &json)
    }

    /// Drop the persisted state and working directory for an input
    pub fn clear(&self, input: &Path) -> Result<()> {
        FileManager::remove_file_if_exists(self.state_path(input))?;
        FileManager::remove_dir_if_exists(self.working_dir(input))
    }
}
