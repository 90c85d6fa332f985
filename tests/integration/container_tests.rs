/*!
 * Container round-trip tests: packaging invariants and content discovery.
 */

use tempfile::TempDir;

use crate::common::build_epub_fixture;
use yadtwai::container::{docx, epub, SourceKind};

#[test]
fn test_sourceKind_detectionAndProfiles() {
    assert_eq!(SourceKind::from_path("a.epub").unwrap(), SourceKind::Epub);
    assert_eq!(SourceKind::from_path("b.docx").unwrap(), SourceKind::Docx);
    assert!(SourceKind::from_path("c.pdf").is_err());
}

#[test]
fn test_epub_extractRepack_shouldKeepMimetypeFirstAndStored() {
    let tmp = TempDir::new().unwrap();
    let input = build_epub_fixture(tmp.path());
    let working = tmp.path().join("work");
    let output = tmp.path().join("out.epub");

    epub::extract(&input, &working).unwrap();
    epub::repack(&working, &output).unwrap();

    assert_eq!(epub::first_entry_name(&output).unwrap(), "mimetype");

    // The repacked book extracts to identical content
    let rework = tmp.path().join("rework");
    epub::extract(&output, &rework).unwrap();
    let original = std::fs::read_to_string(working.join("OEBPS/ch1.xhtml")).unwrap();
    let repacked = std::fs::read_to_string(rework.join("OEBPS/ch1.xhtml")).unwrap();
    assert_eq!(original, repacked);
}

#[test]
fn test_epub_contentFiles_shouldFollowSpineOrder() {
    let tmp = TempDir::new().unwrap();
    let input = build_epub_fixture(tmp.path());
    let working = tmp.path().join("work");

    epub::extract(&input, &working).unwrap();
    let files = epub::content_files(&working).unwrap();

    assert_eq!(files, vec!["OEBPS/ch1.xhtml", "OEBPS/ch2.xhtml"]);
}

#[test]
fn test_docx_contentFiles_shouldIncludeAuxiliaryParts() {
    let tmp = TempDir::new().unwrap();
    let working = tmp.path().join("work");
    std::fs::create_dir_all(working.join("word")).unwrap();
    std::fs::write(
        working.join("word/document.xml"),
        "<w:document><w:body><w:p><w:r><w:t>Main text</w:t></w:r></w:p></w:body></w:document>",
    )
    .unwrap();
    std::fs::write(working.join("word/footnotes.xml"), "<w:footnotes/>").unwrap();
    std::fs::write(working.join("word/fontTable.xml"), "<w:fonts/>").unwrap();

    let files = docx::content_files(&working).unwrap();
    assert_eq!(files, vec!["word/document.xml", "word/footnotes.xml"]);
}

#[test]
fn test_docx_repackExtract_shouldRoundTrip() {
    let tmp = TempDir::new().unwrap();
    let working = tmp.path().join("work");
    std::fs::create_dir_all(working.join("word")).unwrap();
    let content = "<w:document><w:body><w:p><w:r><w:t>Round trip</w:t></w:r></w:p></w:body></w:document>";
    std::fs::write(working.join("word/document.xml"), content).unwrap();

    let output = tmp.path().join("out.docx");
    docx::repack(&working, &output).unwrap();
    let rework = tmp.path().join("rework");
    docx::extract(&output, &rework).unwrap();

    assert_eq!(
        std::fs::read_to_string(rework.join("word/document.xml")).unwrap(),
        content
    );
}
