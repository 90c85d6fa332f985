use anyhow::{anyhow, Result};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// Accepts ISO 639-1 (2-letter) and ISO 639-3 (3-letter) codes, including
/// the bibliographic 639-2/B spellings some tooling still emits.
/// ISO 639-2/B codes that differ from their 639-2/T equivalents
const PART2B_TO_PART2T: &[(&str, &str)] = &[
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("dut", "nld"),
    ("fre", "fra"),
    ("geo", "kat"),
    ("ger", "deu"),
    ("gre", "ell"),
    ("ice", "isl"),
    ("mac", "mkd"),
    ("may", "msa"),
    ("per", "fas"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Resolve any accepted code spelling to a Language
pub fn resolve(code: &str) -> Result<Language> {
    let normalized = code.trim().to_lowercase();
    let resolved = match normalized.len() {
        2 => Language::from_639_1(&normalized),
        3 => {
            let part2t = PART2B_TO_PART2T
                .iter()
                .find(|(b, _)| *b == normalized)
                .map(|(_, t)| *t)
                .unwrap_or(&normalized);
            Language::from_639_3(part2t)
        }
        _ => None,
    };
    resolved.ok_or_else(|| anyhow!("Invalid language code: {}", code))
}

/// Validate that a code names a real language
pub fn validate_language_code(code: &str) -> Result<()> {
    resolve(code).map(|_| ())
}

/// Check if two language codes name the same language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (resolve(code1), resolve(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// English display name for a language code
pub fn get_language_name(code: &str) -> Result<String> {
    Ok(resolve(code)?.to_name().to_string())
}
