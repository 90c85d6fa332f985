use log::debug;

use crate::anchor::sentinels::{delimiter_for, GROUP_END, GROUP_START};

// @module: Group response validation and parsing

/// Outcome details of validating one translator response
#[derive(Debug, Clone)]
pub struct ResponseValidation {
    /// Number of block texts the response was expected to carry
    pub expected_count: usize,
    /// Block positions whose delimiter pair was found
    pub found_positions: Vec<usize>,
    /// Block positions whose delimiter pair was missing
    pub missing_positions: Vec<usize>,
    /// Whether the group frame was present at all
    pub group_frame_present: bool,
    /// Error message if validation failed
    pub error_message: Option<String>,
}

impl ResponseValidation {
    /// Whether the response can be handed to the codec
    pub fn passed(&self) -> bool {
        self.group_frame_present && self.missing_positions.is_empty()
    }

    fn success(expected_count: usize) -> Self {
        Self {
            expected_count,
            found_positions: (0..expected_count).collect(),
            missing_positions: Vec::new(),
            group_frame_present: true,
            error_message: None,
        }
    }

    fn missing_frame(expected_count: usize) -> Self {
        Self {
            expected_count,
            found_positions: Vec::new(),
            missing_positions: (0..expected_count).collect(),
            group_frame_present: false,
            error_message: Some("Response carries no group frame".to_string()),
        }
    }
}

/// Validate a translator response against the expected block count and
/// extract the per-block texts in original order.
///
/// Returns `(None, validation)` unless the single group frame is present and
/// every expected position yields exactly one delimiter-wrapped text.
pub fn validate_and_parse(
    response_text: &str,
    expected_count: usize,
) -> (Option<Vec<String>>, ResponseValidation) {
    // Locate the group span: first opener to last closer
    let Some(start) = response_text.find(GROUP_START) else {
        return (None, ResponseValidation::missing_frame(expected_count));
    };
    let Some(end) = response_text.rfind(GROUP_END) else {
        return (None, ResponseValidation::missing_frame(expected_count));
    };
    if end <= start {
        return (None, ResponseValidation::missing_frame(expected_count));
    }

    let content = response_text[start + GROUP_START.len_utf8()..end].trim();

    let mut texts = Vec::with_capacity(expected_count);
    let mut found = Vec::new();
    let mut missing = Vec::new();

    for position in 0..expected_count {
        match extract_delimited(content, delimiter_for(position)) {
            Some(text) => {
                found.push(position);
                texts.push(text.trim().to_string());
            }
            None => missing.push(position),
        }
    }

    debug!(
        "Response validation: expected={}, found={}, missing={:?}",
        expected_count,
        found.len(),
        missing
    );

    if !missing.is_empty() {
        let validation = ResponseValidation {
            expected_count,
            found_positions: found,
            error_message: Some(format!("Missing block positions: {:?}", missing)),
            missing_positions: missing,
            group_frame_present: true,
        };
        return (None, validation);
    }

    (Some(texts), ResponseValidation::success(expected_count))
}

/// First non-greedy `delim ... delim` span in the content
fn extract_delimited(content: &str, delim: char) -> Option<&str> {
    let open = content.find(delim)?;
    let after_open = open + delim.len_utf8();
    let close = content[after_open..].find(delim)? + after_open;
    Some(&content[after_open..close])
}
