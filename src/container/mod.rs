/*!
 * Document container I/O.
 *
 * EPUB and DOCX are both zip archives of XML/XHTML trees. This module
 * handles extract-to-directory and repack-from-directory, plus the
 * format-specific packaging rules the rest of the crate must never think
 * about (EPUB's uncompressed-first `mimetype` entry, forward-slash archive
 * paths, which member files actually carry content).
 */

use std::path::Path;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::anchor::ExtractionProfile;

pub mod docx;
pub mod epub;

/// The container format of an input document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// EPUB: zipped XHTML content discovered through the OPF spine
    Epub,
    /// DOCX: zipped WordprocessingML under `word/`
    Docx,
}

impl SourceKind {
    /// Detect the container format from a file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let ext = path
            .as_ref()
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "epub" => Ok(SourceKind::Epub),
            "docx" => Ok(SourceKind::Docx),
            other => Err(anyhow!("Unsupported container format: .{}", other)),
        }
    }

    /// Extraction profile the anchor codec should use for this format
    pub fn profile(&self) -> ExtractionProfile {
        match self {
            SourceKind::Epub => ExtractionProfile::Epub,
            SourceKind::Docx => ExtractionProfile::Docx,
        }
    }

    /// Extract the container into a working directory
    pub fn extract<P: AsRef<Path>, Q: AsRef<Path>>(&self, input: P, working_dir: Q) -> Result<()> {
        match self {
            SourceKind::Epub => epub::extract(input, working_dir),
            SourceKind::Docx => docx::extract(input, working_dir),
        }
    }

    /// Relative paths of the content files to translate, in document order
    pub fn content_files<P: AsRef<Path>>(&self, working_dir: P) -> Result<Vec<String>> {
        match self {
            SourceKind::Epub => epub::content_files(working_dir),
            SourceKind::Docx => docx::content_files(working_dir),
        }
    }

    /// Repack the working directory into an output container
    pub fn repack<P: AsRef<Path>, Q: AsRef<Path>>(&self, working_dir: P, output: Q) -> Result<()> {
        match self {
            SourceKind::Epub => epub::repack(working_dir, output),
            SourceKind::Docx => docx::repack(working_dir, output),
        }
    }
}

/// Archive path for a file under the working dir: relative, forward slashes
pub(crate) fn archive_path(working_dir: &Path, file: &Path) -> Result<String> {
    let rel = file
        .strip_prefix(working_dir)
        .map_err(|_| anyhow!("File {:?} escapes working dir", file))?;
    Ok(rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}
