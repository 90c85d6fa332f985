/*!
 * Language utility tests.
 */

use yadtwai::language_utils::{
    get_language_name, language_codes_match, validate_language_code,
};

#[test]
fn test_validateLanguageCode_withCommonCodes_shouldAccept() {
    for code in ["en", "zh", "fr", "de", "ja", "eng", "zho", "fra"] {
        assert!(validate_language_code(code).is_ok(), "rejected {code}");
    }
}

#[test]
fn test_validateLanguageCode_withInvalidCodes_shouldReject() {
    for code in ["", "x", "xx", "abcd", "123"] {
        assert!(validate_language_code(code).is_err(), "accepted {code}");
    }
}

#[test]
fn test_languageCodesMatch_withBibliographicSpellings_shouldMatch() {
    assert!(language_codes_match("fr", "fre"));
    assert!(language_codes_match("fre", "fra"));
    assert!(language_codes_match("zh", "chi"));
}

#[test]
fn test_getLanguageName_shouldBeHumanReadable() {
    assert_eq!(get_language_name("ja").unwrap(), "Japanese");
    assert_eq!(get_language_name("deu").unwrap(), "German");
}
