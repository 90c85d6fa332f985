/*!
 * Pipeline state persistence tests: schema versioning, atomic checkpoint
 * round trips and the block-to-file bookkeeping.
 */

use std::path::Path;

use tempfile::TempDir;

use yadtwai::container::SourceKind;
use yadtwai::pipeline::{PipelineState, StateStore, STATE_VERSION};
use yadtwai::segmenter::Group;

fn empty_state(store: &StateStore, input: &Path) -> PipelineState {
    PipelineState {
        version: STATE_VERSION,
        source_kind: SourceKind::Epub,
        input_path: input.to_path_buf(),
        working_dir: store.working_dir(input),
        cursor: 0,
        groups: Vec::new(),
        blocks: Vec::new(),
        block_files: Default::default(),
        file_block_counts: Default::default(),
        finished: false,
        updated_at: None,
    }
}

#[test]
fn test_saveAndLoad_withGroups_shouldRoundTripEverything() {
    let tmp = TempDir::new().unwrap();
    let store = StateStore::new(tmp.path()).unwrap();
    let input = Path::new("book.epub");

    let mut state = empty_state(&store, input);
    state.groups.push(Group {
        block_indices: vec![0, 1],
        original_text: "formatted".to_string(),
        translated_text: "übersetzt".to_string(),
        is_error: false,
    });
    state.groups.push(Group {
        block_indices: vec![2],
        original_text: "second".to_string(),
        translated_text: String::new(),
        is_error: true,
    });
    state.cursor = 1;
    state.block_files.insert(0, "OEBPS/ch1.xhtml".to_string());
    state.block_files.insert(1, "OEBPS/ch1.xhtml".to_string());
    state.block_files.insert(2, "OEBPS/ch2.xhtml".to_string());
    state.file_block_counts.insert("OEBPS/ch1.xhtml".to_string(), 2);

    store.save(&mut state).unwrap();
    let loaded = store.load(input).unwrap().unwrap();

    assert_eq!(loaded.cursor, 1);
    assert_eq!(loaded.groups.len(), 2);
    assert_eq!(loaded.groups[0].translated_text, "übersetzt");
    assert!(loaded.groups[1].is_error);
    assert_eq!(loaded.blocks_for_file("OEBPS/ch1.xhtml"), vec![0, 1]);
    assert_eq!(
        loaded.content_files(),
        vec!["OEBPS/ch1.xhtml", "OEBPS/ch2.xhtml"]
    );
}

#[test]
fn test_load_withFutureVersion_shouldRejectNotGuess() {
    let tmp = TempDir::new().unwrap();
    let store = StateStore::new(tmp.path()).unwrap();
    let input = Path::new("book.epub");

    let mut state = empty_state(&store, input);
    store.save(&mut state).unwrap();

    let path = store.state_path(input);
    let raw = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, raw.replace("\"version\": 1", "\"version\": 2")).unwrap();

    assert!(store.load(input).is_err());
}

#[test]
fn test_save_shouldStampCheckpointTime() {
    let tmp = TempDir::new().unwrap();
    let store = StateStore::new(tmp.path()).unwrap();
    let input = Path::new("book.epub");

    let mut state = empty_state(&store, input);
    assert!(state.updated_at.is_none());
    store.save(&mut state).unwrap();
    assert!(state.updated_at.is_some());
}

#[test]
fn test_stateFiles_forDifferentInputs_shouldNotCollide() {
    let tmp = TempDir::new().unwrap();
    let store = StateStore::new(tmp.path()).unwrap();

    let a = Path::new("alpha.epub");
    let b = Path::new("beta.epub");
    assert_ne!(store.state_path(a), store.state_path(b));
    assert_ne!(store.working_dir(a), store.working_dir(b));
}
