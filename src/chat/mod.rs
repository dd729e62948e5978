/// Chat assistant module.
///
/// Resolves user questions in two tiers: a built-in FAQ table answers common
/// "how do I" questions locally, and everything else is forwarded to a
/// generative-language backend through a stateless relay.
///
/// # Architecture
///
/// - `faq` - normalized exact-substring and fuzzy FAQ matching
/// - `relay` - validation plus the Gemini-style backend client
///
/// The [`Assistant`] ties both to the persisted chat transcript.
mod faq;
mod relay;

pub use faq::{FaqTable, normalize};
pub use relay::{ChatBackend, ChatRelay, GeminiClient};

use std::sync::Arc;

use tracing::error;

use crate::error::{RelayError, TaskError};
use crate::store::LocalStore;
use crate::types::{ChatMessage, Role};

/// Reply shown when the backend fails; mirrors a toast, not a crash.
const FALLBACK_REPLY: &str = "Sorry, something went wrong. Please try again later.";

pub struct Assistant {
    faq: FaqTable,
    relay: ChatRelay,
    store: Arc<LocalStore>,
}

impl Assistant {
    pub fn new(relay: ChatRelay, store: Arc<LocalStore>) -> Self {
        Self {
            faq: FaqTable::builtin().clone(),
            relay,
            store,
        }
    }

    pub fn with_faq(mut self, faq: FaqTable) -> Self {
        self.faq = faq;
        self
    }

    /// Answer the conversation's latest user utterance.
    ///
    /// FAQ hits return without touching the backend. Backend failures other
    /// than caller mistakes are logged and converted into a single apologetic
    /// assistant reply.
    pub async fn reply(&self, history: &[ChatMessage]) -> Result<String, RelayError> {
        let Some(last) = history.last() else {
            return Err(RelayError::Validation("empty message sequence".into()));
        };
        if last.role != Role::User {
            return Err(RelayError::Validation(
                "last message must come from the user".into(),
            ));
        }

        if let Some(answer) = self.faq.lookup(&last.content) {
            return Ok(answer.to_string());
        }

        match self.relay.relay(history).await {
            Ok(reply) => Ok(reply),
            Err(RelayError::Validation(msg)) => Err(RelayError::Validation(msg)),
            Err(e) => {
                error!(error = %e, "chat relay failed");
                Ok(FALLBACK_REPLY.to_string())
            }
        }
    }

    /// Append a user turn to the persisted transcript, produce the reply,
    /// persist it, and return it.
    pub async fn send(&self, text: impl Into<String>) -> Result<String, RelayError> {
        let storage = |e: TaskError| RelayError::Internal(e.to_string());

        self.store
            .push_chat_message(ChatMessage::user(text))
            .map_err(storage)?;
        let history = self.store.chat_messages().map_err(storage)?;

        let reply = self.reply(&history).await?;
        self.store
            .push_chat_message(ChatMessage::bot(reply.clone()))
            .map_err(storage)?;
        Ok(reply)
    }

    /// The persisted conversation, oldest first.
    pub fn transcript(&self) -> Result<Vec<ChatMessage>, TaskError> {
        self.store.chat_messages()
    }

    /// Forget the persisted conversation.
    pub fn clear(&self) -> Result<(), TaskError> {
        self.store.clear_chat()
    }
}
