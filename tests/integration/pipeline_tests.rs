/*!
 * End-to-end pipeline tests with the mock provider: full runs, resume
 * semantics, error tagging, subset re-translation and restoration safety.
 */

use std::sync::Arc;

use tempfile::TempDir;

use crate::common::{
    build_epub_fixture, build_multigroup_epub_fixture, mock_controller, mock_pipeline,
    mock_pipeline_with,
};
use yadtwai::pipeline::{CancellationToken, PipelineStatus};
use yadtwai::providers::mock::MockTranslator;

fn noop(_: usize, _: usize, _: &str, _: &str, _: bool) {}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[tokio::test]
async fn test_run_withEchoProvider_shouldFinishAndPreserveMarkup() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let input = build_epub_fixture(tmp.path());
    let pipeline = mock_pipeline(&tmp, Arc::new(MockTranslator::echo()));

    let cancel = CancellationToken::new();
    let status = pipeline.run(&input, &cancel, None, noop).await.unwrap();
    assert_eq!(status, PipelineStatus::Finished);

    let state = pipeline.store().load(&input).unwrap().unwrap();
    assert!(state.finished);
    assert_eq!(state.cursor, state.groups.len());
    assert!(state.groups.iter().all(|g| g.is_translated() && !g.is_error));

    let report = pipeline.restore_translations(&state).unwrap();
    assert_eq!(report.files_restored, 2);
    assert!(report.files_skipped.is_empty());

    let ch1 = std::fs::read_to_string(state.working_dir.join("OEBPS/ch1.xhtml")).unwrap();
    assert!(ch1.contains("Hello world."));
    assert!(ch1.contains("<i>emph</i> text."));

    let ch2 = std::fs::read_to_string(state.working_dir.join("OEBPS/ch2.xhtml")).unwrap();
    assert!(ch2.contains("<b>bold run</b>"));
}

#[tokio::test]
async fn test_resume_afterStop_shouldNotReprocessEarlierGroups() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let input = build_multigroup_epub_fixture(tmp.path());
    let mock = Arc::new(MockTranslator::echo());
    let pipeline = mock_pipeline_with(&tmp, mock.clone(), 100, 1, false);

    // Stop cooperatively once the first group completes
    let cancel = CancellationToken::new();
    let stop_after_first = cancel.clone();
    let status = pipeline
        .run(&input, &cancel, None, move |idx, _, _, _, is_final| {
            if idx == 0 && is_final {
                stop_after_first.cancel();
            }
        })
        .await
        .unwrap();
    assert_eq!(status, PipelineStatus::Stopped);

    let state = pipeline.store().load(&input).unwrap().unwrap();
    assert_eq!(state.groups.len(), 4);
    assert_eq!(state.cursor, 1);
    let first_translation = state.groups[0].translated_text.clone();
    assert!(!first_translation.is_empty());
    let calls_after_stop = mock.calls();
    assert_eq!(calls_after_stop, 1);

    // Resume: groups before the cursor are never touched again
    let status = pipeline
        .run(&input, &CancellationToken::new(), None, noop)
        .await
        .unwrap();
    assert_eq!(status, PipelineStatus::Finished);

    let state = pipeline.store().load(&input).unwrap().unwrap();
    assert_eq!(state.groups[0].translated_text, first_translation);
    assert_eq!(mock.calls(), calls_after_stop + 3);
    assert!(state.finished);
}

#[tokio::test]
async fn test_run_whenAlreadyFinished_shouldBeIdle() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let input = build_epub_fixture(tmp.path());
    let mock = Arc::new(MockTranslator::echo());
    let pipeline = mock_pipeline(&tmp, mock.clone());

    pipeline.run(&input, &CancellationToken::new(), None, noop).await.unwrap();
    let calls = mock.calls();

    let status = pipeline.run(&input, &CancellationToken::new(), None, noop).await.unwrap();
    assert_eq!(status, PipelineStatus::Idle);
    assert_eq!(mock.calls(), calls, "no provider calls on an idle run");
}

#[tokio::test]
async fn test_run_withCorruptingProvider_shouldTagErrorsAndKeepGoing() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let input = build_multigroup_epub_fixture(tmp.path());
    let pipeline = mock_pipeline_with(&tmp, Arc::new(MockTranslator::corrupting()), 100, 1, false);

    let status = pipeline.run(&input, &CancellationToken::new(), None, noop).await.unwrap();
    assert_eq!(status, PipelineStatus::Finished, "a bad provider must not abort the run");

    let state = pipeline.store().load(&input).unwrap().unwrap();
    assert!(state.groups.iter().all(|g| g.is_error));
    assert!(state
        .groups
        .iter()
        .all(|g| g.translated_text.starts_with("[STRUCTURE ERROR] ")));

    // Nothing gets spliced back from flagged groups
    let report = pipeline.restore_translations(&state).unwrap();
    assert_eq!(report.files_restored, 0);
    assert_eq!(report.groups_skipped, state.groups.len());
}

#[tokio::test]
async fn test_run_withFailingProvider_shouldEmbedErrorLiteral() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let input = build_epub_fixture(tmp.path());
    let pipeline = mock_pipeline(&tmp, Arc::new(MockTranslator::failing()));

    let status = pipeline.run(&input, &CancellationToken::new(), None, noop).await.unwrap();
    assert_eq!(status, PipelineStatus::Finished);

    let state = pipeline.store().load(&input).unwrap().unwrap();
    for group in &state.groups {
        assert!(group.is_error);
        assert!(group.translated_text.contains("[TRANSLATION ERROR:"));
    }
}

#[tokio::test]
async fn test_runSubset_shouldFixOneGroupWithoutMovingCursor() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let input = build_multigroup_epub_fixture(tmp.path());

    // First pass corrupts everything
    let corrupting = mock_pipeline_with(&tmp, Arc::new(MockTranslator::corrupting()), 100, 1, false);
    corrupting.run(&input, &CancellationToken::new(), None, noop).await.unwrap();

    // Ad hoc re-translation of group 1 with a working provider
    let fixed = mock_pipeline_with(&tmp, Arc::new(MockTranslator::echo()), 100, 1, false);
    let status = fixed
        .run(&input, &CancellationToken::new(), Some(&[1]), noop)
        .await
        .unwrap();
    assert_eq!(status, PipelineStatus::Finished);

    let state = fixed.store().load(&input).unwrap().unwrap();
    assert!(!state.groups[1].is_error, "requested group is repaired");
    assert!(state.groups[0].is_error, "other groups untouched");
    assert!(state.groups[2].is_error);
    assert_eq!(state.cursor, state.groups.len(), "cursor not moved by subset runs");
}

#[tokio::test]
async fn test_runSubset_withOutOfRangeIndex_shouldError() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let input = build_epub_fixture(tmp.path());
    let pipeline = mock_pipeline(&tmp, Arc::new(MockTranslator::echo()));

    let result = pipeline
        .run(&input, &CancellationToken::new(), Some(&[99]), noop)
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_progressCallback_shouldStreamPartialsThenFinal() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let input = build_epub_fixture(tmp.path());
    let pipeline = mock_pipeline(&tmp, Arc::new(MockTranslator::echo()));

    let mut events: Vec<(usize, bool, usize)> = Vec::new();
    pipeline
        .run(&input, &CancellationToken::new(), None, |idx, _, _, partial, is_final| {
            events.push((idx, is_final, partial.len()));
        })
        .await
        .unwrap();

    assert!(events.len() > 1, "streaming must produce intermediate events");
    assert!(events.last().unwrap().1, "last event is final");
    // Partial translations only ever grow within a group
    let partials: Vec<usize> = events
        .iter()
        .filter(|(idx, is_final, _)| *idx == 0 && !is_final)
        .map(|(_, _, len)| *len)
        .collect();
    assert!(partials.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_translationMemory_shouldShortCircuitSecondRun() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let input = build_epub_fixture(tmp.path());
    let mock = Arc::new(MockTranslator::echo());
    let pipeline = mock_pipeline_with(&tmp, mock.clone(), 2000, 2, true);

    pipeline.run(&input, &CancellationToken::new(), None, noop).await.unwrap();
    let calls_first = mock.calls();
    assert!(calls_first > 0);

    // Same content, fresh pipeline state: everything comes from memory
    pipeline.store().clear(&input).unwrap();
    pipeline.run(&input, &CancellationToken::new(), None, noop).await.unwrap();
    assert_eq!(mock.calls(), calls_first, "second run must be served from memory");
}

#[tokio::test]
async fn test_restore_withDriftedFile_shouldSkipItWhole() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let input = build_epub_fixture(tmp.path());
    let pipeline = mock_pipeline(&tmp, Arc::new(MockTranslator::echo()));

    pipeline.run(&input, &CancellationToken::new(), None, noop).await.unwrap();
    let state = pipeline.store().load(&input).unwrap().unwrap();

    // A paragraph appears in ch1 behind the cache's back
    let ch1_path = state.working_dir.join("OEBPS/ch1.xhtml");
    let drifted = std::fs::read_to_string(&ch1_path)
        .unwrap()
        .replace("</body>", "<p>surprise</p></body>");
    std::fs::write(&ch1_path, &drifted).unwrap();

    let report = pipeline.restore_translations(&state).unwrap();
    assert_eq!(report.files_skipped, vec!["OEBPS/ch1.xhtml".to_string()]);
    assert_eq!(report.files_restored, 1);

    // The drifted file was left exactly as found
    assert_eq!(std::fs::read_to_string(&ch1_path).unwrap(), drifted);
}

#[tokio::test]
async fn test_workingDirGone_shouldBeRecreatedOnResume() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let input = build_epub_fixture(tmp.path());
    let pipeline = mock_pipeline(&tmp, Arc::new(MockTranslator::echo()));

    pipeline.run(&input, &CancellationToken::new(), None, noop).await.unwrap();
    let state = pipeline.store().load(&input).unwrap().unwrap();
    std::fs::remove_dir_all(&state.working_dir).unwrap();

    // prepare() re-extracts the container so restoration has trees again
    let state = pipeline.prepare(&input).unwrap();
    assert!(state.working_dir.join("OEBPS/ch1.xhtml").exists());

    let report = pipeline.restore_translations(&state).unwrap();
    assert_eq!(report.files_restored, 2);
}

#[tokio::test]
async fn test_run_withDocxInput_shouldPreserveRunsAndProperties() {
    init_logging();
    let tmp = TempDir::new().unwrap();

    // Build a DOCX fixture by repacking a working dir
    let seed = tmp.path().join("seed");
    std::fs::create_dir_all(seed.join("word")).unwrap();
    std::fs::write(
        seed.join("word/document.xml"),
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <w:document><w:body>\
         <w:p><w:pPr><w:jc w:val=\"center\"/></w:pPr>\
         <w:r><w:rPr><w:b/></w:rPr><w:t>Bold heading</w:t></w:r></w:p>\
         <w:p><w:r><w:t>Plain body text of the second paragraph.</w:t></w:r></w:p>\
         </w:body></w:document>",
    )
    .unwrap();
    let input = tmp.path().join("report.docx");
    yadtwai::container::docx::repack(&seed, &input).unwrap();

    let pipeline = mock_pipeline(&tmp, Arc::new(MockTranslator::echo()));
    let status = pipeline.run(&input, &CancellationToken::new(), None, noop).await.unwrap();
    assert_eq!(status, PipelineStatus::Finished);

    let state = pipeline.store().load(&input).unwrap().unwrap();
    assert_eq!(state.blocks.len(), 2);
    pipeline.restore_translations(&state).unwrap();

    let restored = std::fs::read_to_string(state.working_dir.join("word/document.xml")).unwrap();
    // The formatted run and the paragraph properties both survive
    assert!(restored.contains("<w:jc w:val=\"center\"/>"));
    assert!(restored.contains("<w:b/>"));
    assert!(restored.contains("Bold heading"));
    assert!(restored.contains("Plain body text of the second paragraph."));
}

#[tokio::test]
async fn test_controllerRun_endToEnd_shouldProduceTranslatedEpub() {
    init_logging();
    let tmp = TempDir::new().unwrap();
    let input = build_epub_fixture(tmp.path());
    let output_dir = tmp.path().join("out");
    let controller = mock_controller(&tmp, Arc::new(MockTranslator::echo()));

    controller
        .run(input.clone(), output_dir.clone(), false)
        .await
        .unwrap();

    let output = output_dir.join("book_translated.epub");
    assert!(output.exists());

    // Packaging invariants and content survive the whole journey
    assert_eq!(
        yadtwai::container::epub::first_entry_name(&output).unwrap(),
        "mimetype"
    );
    let rework = tmp.path().join("rework");
    yadtwai::container::epub::extract(&output, &rework).unwrap();
    let ch1 = std::fs::read_to_string(rework.join("OEBPS/ch1.xhtml")).unwrap();
    assert!(ch1.contains("<i>emph</i>"));
}
