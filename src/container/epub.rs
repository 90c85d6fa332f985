use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::anchor::codec::local_name;
use crate::file_utils::FileManager;
use crate::markup::{parse_document, MarkupNode};

use super::archive_path;

// @module: EPUB unzip, spine discovery and standards-compliant repack

/// File name fragments that mark structural, non-content documents
const SKIP_PATTERNS: &[&str] = &["titlepage", "title_page", "cover", "nav", "toc", "container.xml"];

/// Content file extensions inside an EPUB
const CONTENT_EXTENSIONS: &[&str] = &["xhtml", "html", "htm"];

/// Extract an EPUB completely into a working directory
pub fn extract<P: AsRef<Path>, Q: AsRef<Path>>(input: P, working_dir: Q) -> Result<()> {
    let file = File::open(input.as_ref())
        .with_context(|| format!("Failed to open EPUB: {:?}", input.as_ref()))?;
    let mut archive = ZipArchive::new(file).context("Failed to read EPUB archive")?;
    FileManager::ensure_dir(working_dir.as_ref())?;
    archive
        .extract(working_dir.as_ref())
        .context("Failed to extract EPUB archive")?;
    debug!("Extracted {} entries to {:?}", archive.len(), working_dir.as_ref());
    Ok(())
}

/// Relative paths of the translatable content files, spine order first.
///
/// The OPF manifest/spine (located via `META-INF/container.xml`) gives the
/// authoritative reading order; if anything about that chain is broken the
/// working dir is walked for content files instead. Structural documents
/// (cover, nav, toc...) are skipped either way.
pub fn content_files<P: AsRef<Path>>(working_dir: P) -> Result<Vec<String>> {
    let working_dir = working_dir.as_ref();

    match spine_files(working_dir) {
        Ok(files) if !files.is_empty() => Ok(files),
        Ok(_) => {
            warn!("OPF spine lists no content files, falling back to directory walk");
            walk_content_files(working_dir)
        }
        Err(e) => {
            warn!("Spine discovery failed ({}), falling back to directory walk", e);
            walk_content_files(working_dir)
        }
    }
}

/// Content files in spine order from the OPF
fn spine_files(working_dir: &Path) -> Result<Vec<String>> {
    let container_path = working_dir.join("META-INF").join("container.xml");
    let container = FileManager::read_to_string(&container_path)?;
    let container_doc = parse_document(&container)?;

    let opf_rel = container_doc.roots[0]
        .descendants()
        .find(|n| n.tag().map(|t| local_name(t) == "rootfile").unwrap_or(false))
        .and_then(|n| attr_value(n, "full-path"))
        .ok_or_else(|| anyhow!("No rootfile entry in container.xml"))?;

    let opf_path = working_dir.join(&opf_rel);
    let content_dir = opf_path.parent().unwrap_or(working_dir).to_path_buf();
    let opf = FileManager::read_to_string(&opf_path)?;
    let opf_doc = parse_document(&opf)?;
    let opf_root = opf_doc
        .roots
        .first()
        .ok_or_else(|| anyhow!("Empty OPF document"))?;

    // Manifest: id -> href
    let mut manifest: Vec<(String, String)> = Vec::new();
    for node in opf_root.descendants() {
        if node.tag().map(|t| local_name(t) == "item").unwrap_or(false) {
            if let (Some(id), Some(href)) = (attr_value(node, "id"), attr_value(node, "href")) {
                manifest.push((id, href));
            }
        }
    }

    // Spine: ordered idrefs resolved through the manifest
    let mut files = Vec::new();
    for node in opf_root.descendants() {
        if node.tag().map(|t| local_name(t) == "itemref").unwrap_or(false) {
            let Some(idref) = attr_value(node, "idref") else {
                continue;
            };
            let Some((_, href)) = manifest.iter().find(|(id, _)| *id == idref) else {
                continue;
            };
            let full = content_dir.join(href);
            if is_content_file(&full) && !is_skipped(&full) {
                files.push(archive_path(working_dir, &full)?);
            }
        }
    }

    debug!("Spine yielded {} content files", files.len());
    Ok(files)
}

/// Directory-walk fallback when the OPF chain is unusable
fn walk_content_files(working_dir: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(working_dir).sort_by_file_name() {
        let entry = entry.context("Failed to read working dir entry")?;
        let path = entry.path();
        if path.is_file() && is_content_file(path) && !is_skipped(path) {
            files.push(archive_path(working_dir, path)?);
        }
    }
    Ok(files)
}

fn is_content_file(path: &Path) -> bool {
    path.extension()
        .map(|e| {
            let ext = e.to_string_lossy().to_lowercase();
            CONTENT_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

fn is_skipped(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    SKIP_PATTERNS.iter().any(|p| name.contains(p))
}

fn attr_value(node: &MarkupNode, wanted: &str) -> Option<String> {
    if let MarkupNode::Element { attrs, .. } = node {
        attrs
            .iter()
            .find(|(name, _)| name == wanted || local_name(name) == wanted)
            .map(|(_, value)| value.clone())
    } else {
        None
    }
}

/// Repack the working directory into an EPUB.
///
/// The `mimetype` entry must be the first in the archive and stored
/// uncompressed, and archive paths must use forward slashes regardless of
/// platform; some readers refuse the book otherwise.
pub fn repack<P: AsRef<Path>, Q: AsRef<Path>>(working_dir: P, output: Q) -> Result<()> {
    let working_dir = working_dir.as_ref();
    if !working_dir.exists() {
        return Err(anyhow!("No working directory to repack: {:?}", working_dir));
    }

    let out_file = File::create(output.as_ref())
        .with_context(|| format!("Failed to create output EPUB: {:?}", output.as_ref()))?;
    let mut zip = ZipWriter::new(out_file);

    let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mimetype_path = working_dir.join("mimetype");
    zip.start_file("mimetype", stored)?;
    if mimetype_path.exists() {
        let mut content = Vec::new();
        File::open(&mimetype_path)?.read_to_end(&mut content)?;
        zip.write_all(&content)?;
    } else {
        zip.write_all(b"application/epub+zip")?;
    }

    for entry in WalkDir::new(working_dir).sort_by_file_name() {
        let entry = entry.context("Failed to read working dir entry")?;
        let path = entry.path();
        if !path.is_file() || path == mimetype_path {
            continue;
        }
        let name = archive_path(working_dir, path)?;
        zip.start_file(name, deflated)?;
        let mut content = Vec::new();
        File::open(path)?.read_to_end(&mut content)?;
        zip.write_all(&content)?;
    }

    zip.finish().context("Failed to finalize EPUB archive")?;
    Ok(())
}

/// Build a minimal EPUB file from (path, content) pairs (testing support)
pub fn build_archive<P: AsRef<Path>>(output: P, entries: &[(&str, &str)]) -> Result<()> {
    let out_file = File::create(output.as_ref())?;
    let mut zip = ZipWriter::new(out_file);

    let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("mimetype", stored)?;
    zip.write_all(b"application/epub+zip")?;
    for (name, content) in entries {
        zip.start_file(*name, deflated)?;
        zip.write_all(content.as_bytes())?;
    }
    zip.finish()?;
    Ok(())
}

/// Verify the mimetype-first invariant of a packed EPUB (testing support)
pub fn first_entry_name<P: AsRef<Path>>(path: P) -> Result<String> {
    let file = File::open(path.as_ref())?;
    let mut archive = ZipArchive::new(file)?;
    if archive.is_empty() {
        return Err(anyhow!("Archive is empty"));
    }
    Ok(archive.by_index(0)?.name().to_string())
}
