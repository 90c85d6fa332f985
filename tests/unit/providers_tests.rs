/*!
 * Provider seam tests: the streaming contract as seen by the service layer.
 */

use std::sync::Arc;

use futures_util::StreamExt;
use tokio_test::block_on;

use yadtwai::providers::mock::MockTranslator;
use yadtwai::providers::{ChatMessage, Provider};
use yadtwai::translation::TranslationService;

#[test]
fn test_chatStream_shouldDeliverFragmentsLazily() {
    block_on(async {
        let mock = MockTranslator::echo();
        let mut stream = mock
            .chat_stream(vec![ChatMessage::user("a somewhat longer message to fragment")])
            .await
            .unwrap();

        let mut fragments = Vec::new();
        while let Some(fragment) = stream.next().await {
            fragments.push(fragment.unwrap());
        }

        assert!(fragments.len() > 1, "stream must arrive in multiple fragments");
        assert_eq!(fragments.concat(), "a somewhat longer message to fragment");
    });
}

#[test]
fn test_service_withHistory_shouldSendPriorTurnsBeforeCurrent() {
    block_on(async {
        // The echo mock returns the last user turn; if history ordering were
        // wrong, a prior original would come back instead
        let service = TranslationService::new(Arc::new(MockTranslator::echo()), "prompt");
        let history = vec![
            ("first original".to_string(), "first translation".to_string()),
            ("second original".to_string(), "second translation".to_string()),
        ];

        let output: String = service
            .translate_stream("the current text", &history)
            .await
            .collect::<Vec<_>>()
            .await
            .concat();

        assert_eq!(output, "the current text");
    });
}

#[test]
fn test_testConnection_shouldReflectProviderHealth() {
    block_on(async {
        assert!(MockTranslator::echo().test_connection().await.is_ok());
        assert!(MockTranslator::failing().test_connection().await.is_err());
    });
}
