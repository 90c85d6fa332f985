use std::sync::Arc;

use futures_util::StreamExt;
use log::{error, warn};

use crate::providers::{ChatMessage, FragmentStream, Provider};

use super::memory::TranslationMemory;

// @module: History-aware streaming translation facade

/// Translation service wrapping a streaming provider.
///
/// Provider failures never abort a run: they surface as a single in-band
/// bracketed literal fragment so the pipeline can keep going and a reviewer
/// can see exactly what happened.
pub struct TranslationService {
    /// The provider performing the actual calls
    provider: Arc<dyn Provider>,
    /// System prompt prefixed to every conversation
    system_prompt: String,
    /// Optional reuse store for already-translated texts
    memory: Option<TranslationMemory>,
}

impl TranslationService {
    /// Create a new service over the given provider
    pub fn new(provider: Arc<dyn Provider>, system_prompt: &str) -> Self {
        Self {
            provider,
            system_prompt: system_prompt.to_string(),
            memory: None,
        }
    }

    /// Attach a translation memory
    pub fn with_memory(mut self, memory: TranslationMemory) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Model name the underlying provider is configured for
    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Look up a previous translation of exactly this text
    pub fn recall(&self, original: &str) -> Option<String> {
        let memory = self.memory.as_ref()?;
        match memory.get(original, self.provider.model()) {
            Ok(hit) => hit,
            Err(e) => {
                warn!("Translation memory lookup failed: {}", e);
                None
            }
        }
    }

    /// Record a validated translation for future reuse
    pub fn remember(&self, original: &str, translated: &str) {
        if let Some(memory) = &self.memory {
            if let Err(e) = memory.save(original, translated, self.provider.model()) {
                warn!("Translation memory save failed: {}", e);
            }
        }
    }

    /// Stream the translation of `text`, with prior (original, translated)
    /// pairs supplied as earlier conversation turns for consistency.
    ///
    /// The returned stream is infallible from the caller's point of view:
    /// any provider error is folded into a literal
    /// `[TRANSLATION ERROR: ...]` fragment.
    pub async fn translate_stream(
        &self,
        text: &str,
        history: &[(String, String)],
    ) -> futures::stream::BoxStream<'static, String> {
        let mut messages = Vec::with_capacity(history.len() * 2 + 2);
        messages.push(ChatMessage::system(&self.system_prompt));
        for (original, translated) in history {
            if !original.is_empty() && !translated.is_empty() {
                messages.push(ChatMessage::user(original));
                messages.push(ChatMessage::assistant(translated));
            }
        }
        messages.push(ChatMessage::user(text));

        let opened: Result<FragmentStream, _> = self.provider.chat_stream(messages).await;

        let stream: FragmentStream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                error!("Translation call failed to start: {}", e);
                Box::pin(futures_util::stream::iter(vec![Err(e)]))
            }
        };

        Box::pin(stream.map(|fragment| match fragment {
            Ok(text) => text,
            Err(e) => {
                error!("Translation stream error: {}", e);
                format!("[TRANSLATION ERROR: {}]", e)
            }
        }))
    }
}
