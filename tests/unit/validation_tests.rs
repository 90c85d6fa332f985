/*!
 * Response validator tests: completeness over well-formed responses,
 * hard failure on any structural damage.
 */

use yadtwai::anchor::sentinels::{delimiter_for, GROUP_END, GROUP_START};
use yadtwai::segmenter::format_for_ai;
use yadtwai::validation::validate_and_parse;

#[test]
fn test_validateAndParse_withDistinctBlocks_shouldReturnAllInOrder() {
    let texts: Vec<String> = (0..10).map(|i| format!("translated block {}", i)).collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let response = format_for_ai(&refs);

    let (parsed, validation) = validate_and_parse(&response, refs.len());

    assert!(validation.passed());
    assert_eq!(parsed.unwrap(), texts);
}

#[test]
fn test_validateAndParse_removingAnyClosingDelimiter_shouldFail() {
    let refs = ["one", "two", "three"];
    let response = format_for_ai(&refs);

    for position in 0..refs.len() {
        let delim = delimiter_for(position);
        // Remove the closing (second) occurrence of this position's delimiter
        let first = response.find(delim).unwrap();
        let second = response[first + delim.len_utf8()..].find(delim).unwrap()
            + first
            + delim.len_utf8();
        let mut broken = response.clone();
        broken.remove(second);

        let (parsed, validation) = validate_and_parse(&broken, refs.len());
        assert!(parsed.is_none(), "position {position} should fail");
        assert!(!validation.passed());
    }
}

#[test]
fn test_validateAndParse_withMissingGroupEnd_shouldFail() {
    let response = format_for_ai(&["block"]).replace(GROUP_END, "");
    let (parsed, validation) = validate_and_parse(&response, 1);

    assert!(parsed.is_none());
    assert!(!validation.group_frame_present);
}

#[test]
fn test_validateAndParse_withMissingGroupStart_shouldFail() {
    let response = format_for_ai(&["block"]).replace(GROUP_START, "");
    let (parsed, _) = validate_and_parse(&response, 1);
    assert!(parsed.is_none());
}

#[test]
fn test_validateAndParse_withWrongBlockCount_shouldFail() {
    // Response carries two blocks, three expected
    let response = format_for_ai(&["one", "two"]);
    let (parsed, validation) = validate_and_parse(&response, 3);

    assert!(parsed.is_none());
    assert_eq!(validation.missing_positions, vec![2]);
}

#[test]
fn test_validateAndParse_shouldTrimBlockTexts() {
    let d0 = delimiter_for(0);
    let response = format!("{GROUP_START}\n{d0}  padded text  {d0}\n{GROUP_END}");
    let (parsed, _) = validate_and_parse(&response, 1);

    assert_eq!(parsed.unwrap(), vec!["padded text"]);
}
