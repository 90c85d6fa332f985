/*!
 * Mock provider implementations for testing.
 *
 * The mock simulates the streaming contract without any network:
 * - `MockTranslator::echo()` - streams the last user message back unchanged
 * - `MockTranslator::scripted(..)` - streams pre-seeded responses in order
 * - `MockTranslator::failing()` - errors before the stream opens
 * - `MockTranslator::corrupting()` - echoes with the final delimiter removed
 */

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::anchor::sentinels::DELIMITER_POOL;
use crate::errors::ProviderError;

use super::{ChatMessage, FragmentStream, Provider};

/// Behavior mode for the mock translator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Stream the last user message back verbatim
    Echo,
    /// Stream pre-seeded responses, falling back to echo when exhausted
    Scripted,
    /// Fail every call before any fragment is produced
    Failing,
    /// Echo with the last block delimiter stripped (structural corruption)
    Corrupting,
}

/// Mock provider for exercising the pipeline without a real endpoint
#[derive(Debug)]
pub struct MockTranslator {
    /// Behavior mode
    behavior: MockBehavior,
    /// Pre-seeded responses for Scripted mode
    responses: Mutex<VecDeque<String>>,
    /// Number of chat_stream calls made
    call_count: Arc<AtomicUsize>,
    /// Fragment size in characters for streamed output
    fragment_chars: usize,
}

impl MockTranslator {
    /// Create a mock with the given behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            responses: Mutex::new(VecDeque::new()),
            call_count: Arc::new(AtomicUsize::new(0)),
            fragment_chars: 7,
        }
    }

    /// Mock that echoes requests back verbatim
    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    /// Mock that plays back the given responses in order
    pub fn scripted(responses: Vec<String>) -> Self {
        let mock = Self::new(MockBehavior::Scripted);
        *mock.responses.lock() = responses.into();
        mock
    }

    /// Mock that always fails
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Mock that corrupts the structure of every response
    pub fn corrupting() -> Self {
        Self::new(MockBehavior::Corrupting)
    }

    /// Number of chat_stream calls made so far
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn fragment(&self, text: String) -> FragmentStream {
        let chars: Vec<char> = text.chars().collect();
        let fragments: Vec<Result<String, ProviderError>> = chars
            .chunks(self.fragment_chars)
            .map(|c| Ok(c.iter().collect()))
            .collect();
        Box::pin(futures_util::stream::iter(fragments))
    }
}

#[async_trait]
impl Provider for MockTranslator {
    async fn chat_stream(&self, messages: Vec<ChatMessage>) -> Result<FragmentStream, ProviderError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.clone())
            .unwrap_or_default();

        match self.behavior {
            MockBehavior::Echo => Ok(self.fragment(last_user)),
            MockBehavior::Scripted => {
                let scripted = self.responses.lock().pop_front();
                Ok(self.fragment(scripted.unwrap_or(last_user)))
            }
            MockBehavior::Failing => Err(ProviderError::RequestFailed(
                "mock provider configured to fail".to_string(),
            )),
            MockBehavior::Corrupting => {
                let mut corrupted = last_user;
                if let Some(pos) = corrupted.rfind(|c| DELIMITER_POOL.contains(&c)) {
                    corrupted.remove(pos);
                }
                Ok(self.fragment(corrupted))
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match self.behavior {
            MockBehavior::Failing => Err(ProviderError::ConnectionError("mock offline".to_string())),
            _ => Ok(()),
        }
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}
