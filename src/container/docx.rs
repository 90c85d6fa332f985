use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::debug;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::file_utils::FileManager;

use super::archive_path;

// @module: DOCX unzip, content discovery and repack

/// Prefixes of auxiliary content files under word/ worth translating
const AUX_CONTENT_PREFIXES: &[&str] = &["header", "footer", "footnotes", "endnotes", "comments"];

/// Extract a DOCX completely into a working directory
pub fn extract<P: AsRef<Path>, Q: AsRef<Path>>(input: P, working_dir: Q) -> Result<()> {
    let file = File::open(input.as_ref())
        .with_context(|| format!("Failed to open DOCX: {:?}", input.as_ref()))?;
    let mut archive = ZipArchive::new(file).context("Failed to read DOCX archive")?;
    FileManager::ensure_dir(working_dir.as_ref())?;
    archive
        .extract(working_dir.as_ref())
        .context("Failed to extract DOCX archive")?;
    debug!("Extracted {} entries to {:?}", archive.len(), working_dir.as_ref());
    Ok(())
}

/// Relative paths of the content XML files: the main document first, then
/// headers, footers, footnotes, endnotes and comments.
pub fn content_files<P: AsRef<Path>>(working_dir: P) -> Result<Vec<String>> {
    let working_dir = working_dir.as_ref();
    let word_dir = working_dir.join("word");

    let mut files = Vec::new();

    let main_doc = word_dir.join("document.xml");
    if main_doc.exists() {
        files.push(archive_path(working_dir, &main_doc)?);
    }

    if word_dir.exists() {
        let mut aux = Vec::new();
        for entry in std::fs::read_dir(&word_dir).context("Failed to read word/ directory")? {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            let is_aux = AUX_CONTENT_PREFIXES.iter().any(|p| name.starts_with(p))
                && name.ends_with(".xml");
            if path.is_file() && is_aux {
                aux.push(archive_path(working_dir, &path)?);
            }
        }
        aux.sort();
        files.extend(aux);
    }

    if files.is_empty() {
        return Err(anyhow!("No content XML found under {:?}", word_dir));
    }
    Ok(files)
}

/// Repack the working directory into a DOCX (plain deflated archive)
pub fn repack<P: AsRef<Path>, Q: AsRef<Path>>(working_dir: P, output: Q) -> Result<()> {
    let working_dir = working_dir.as_ref();
    if !working_dir.exists() {
        return Err(anyhow!("No working directory to repack: {:?}", working_dir));
    }

    let out_file = File::create(output.as_ref())
        .with_context(|| format!("Failed to create output DOCX: {:?}", output.as_ref()))?;
    let mut zip = ZipWriter::new(out_file);
    let deflated = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in WalkDir::new(working_dir).sort_by_file_name() {
        let entry = entry.context("Failed to read working dir entry")?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = archive_path(working_dir, path)?;
        zip.start_file(name, deflated)?;
        let mut content = Vec::new();
        File::open(path)?.read_to_end(&mut content)?;
        zip.write_all(&content)?;
    }

    zip.finish().context("Failed to finalize DOCX archive")?;
    Ok(())
}
