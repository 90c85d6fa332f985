/*!
 * Common test utilities shared across the test suite.
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use yadtwai::app_config::Config;
use yadtwai::app_controller::Controller;
use yadtwai::container::epub::build_archive;
use yadtwai::pipeline::{StateStore, TranslationPipeline};
use yadtwai::providers::mock::MockTranslator;
use yadtwai::translation::TranslationService;

pub const CONTAINER_XML: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

pub const CONTENT_OPF: &str = r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <manifest>
    <item id="ch1" href="ch1.xhtml" media-type="application/xhtml+xml"/>
    <item id="ch2" href="ch2.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine>
    <itemref idref="ch1"/>
    <itemref idref="ch2"/>
  </spine>
</package>"#;

pub const CH1_XHTML: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<html><body><p>Hello world.</p><p><i>emph</i> text.</p></body></html>";

pub const CH2_XHTML: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<html><body><h1>Chapter two</h1><p>Second file content with a <b>bold run</b> inside.</p></body></html>";

/// Build a small two-chapter EPUB fixture and return its path
pub fn build_epub_fixture(dir: &Path) -> PathBuf {
    let epub = dir.join("book.epub");
    build_archive(
        &epub,
        &[
            ("META-INF/container.xml", CONTAINER_XML),
            ("OEBPS/content.opf", CONTENT_OPF),
            ("OEBPS/ch1.xhtml", CH1_XHTML),
            ("OEBPS/ch2.xhtml", CH2_XHTML),
        ],
    )
    .expect("Failed to build EPUB fixture");
    epub
}

/// A config whose cache dir lives inside the given temp dir
pub fn test_config(tmp: &TempDir) -> Config {
    let mut config = Config::default();
    config.cache_dir = Some(tmp.path().join("cache"));
    config
}

/// A pipeline over a mock provider, checkpointing into the temp dir
pub fn mock_pipeline(tmp: &TempDir, mock: Arc<MockTranslator>) -> TranslationPipeline {
    mock_pipeline_with(tmp, mock, 2000, 2, false)
}

/// A pipeline with explicit group budget, context window and memory choice
pub fn mock_pipeline_with(
    tmp: &TempDir,
    mock: Arc<MockTranslator>,
    max_group_chars: usize,
    context_window: usize,
    with_memory: bool,
) -> TranslationPipeline {
    let mut service = TranslationService::new(mock, "test prompt");
    if with_memory {
        let memory = yadtwai::translation::TranslationMemory::open(tmp.path().join("memory.db"))
            .expect("Failed to open translation memory");
        service = service.with_memory(memory);
    }
    let store = StateStore::new(tmp.path().join("cache")).expect("Failed to create state store");
    TranslationPipeline::new(service, store, max_group_chars, context_window)
}

/// An EPUB whose four long paragraphs each exceed a 100-char group budget,
/// forcing one group per block
pub fn build_multigroup_epub_fixture(dir: &Path) -> PathBuf {
    let paragraphs: String = (0..4)
        .map(|i| {
            format!(
                "<p>Paragraph {} is deliberately padded with enough running text to push \
                 it well past the one hundred character group budget on its own.</p>",
                i
            )
        })
        .collect();
    let body = format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<html><body>{}</body></html>",
        paragraphs
    );
    let opf = r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <manifest>
    <item id="ch1" href="ch1.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine>
    <itemref idref="ch1"/>
  </spine>
</package>"#;

    let epub = dir.join("long.epub");
    build_archive(
        &epub,
        &[
            ("META-INF/container.xml", CONTAINER_XML),
            ("OEBPS/content.opf", opf),
            ("OEBPS/ch1.xhtml", &body),
        ],
    )
    .expect("Failed to build EPUB fixture");
    epub
}

/// A controller over a mock provider
pub fn mock_controller(tmp: &TempDir, mock: Arc<MockTranslator>) -> Controller {
    let service = TranslationService::new(mock, "test prompt");
    Controller::with_service(test_config(tmp), service).expect("Failed to build controller")
}
