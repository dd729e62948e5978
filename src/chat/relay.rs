use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::RelayError;
use crate::types::{ChatMessage, Role};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-2.5-pro";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Conversational backend behind the relay. One request, one reply; no
/// retries, no streaming.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, RelayError>;
}

/// Stateless proxy in front of the generative-language backend.
///
/// Prepends the fixed assistant persona to the conversation and forwards it
/// unchanged. Holds no per-conversation state.
pub struct ChatRelay {
    backend: std::sync::Arc<dyn ChatBackend>,
}

impl ChatRelay {
    pub fn new(backend: std::sync::Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    pub async fn relay(&self, history: &[ChatMessage]) -> Result<String, RelayError> {
        if history.is_empty() {
            return Err(RelayError::Validation("empty message sequence".into()));
        }
        if history.last().map(|m| m.role) != Some(Role::User) {
            return Err(RelayError::Validation(
                "last message must come from the user".into(),
            ));
        }
        self.backend.complete(history).await
    }
}

// Gemini wire types
#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<WireContent>,
}

#[derive(Serialize)]
struct WireContent {
    role: &'static str,
    parts: Vec<WirePart>,
}

#[derive(Serialize, Deserialize)]
struct WirePart {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<WirePart>,
}

/// Client for the Gemini `generateContent` endpoint.
///
/// The credential is read from the environment at construction and checked
/// before any request is built, so a missing key never produces an outbound
/// call.
pub struct GeminiClient {
    client: reqwest::Client,
    api_base: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn from_env() -> Result<Self, RelayError> {
        let api_base = env::var("GEMINI_API_URL").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let model = env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self::new(api_base, model, env::var("API_KEY").ok())
    }

    pub fn new(
        api_base: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RelayError::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            api_base: api_base.into(),
            model: model.into(),
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    /// Fixed persona and ground rules sent ahead of every conversation.
    fn system_instruction() -> &'static str {
        r#"You are the doeet assistant, a friendly helper inside a to-do application.

Your role is to help users understand how to use the app by guiding them through steps like adding, editing, or deleting tasks. You cannot perform these actions directly.

Step-by-step instructions you can refer to:

How to add a to-do:
1. Go to the Dashboard in the sidebar.
2. Click the "+" button at the top of the to-dos.
3. Enter the title, description, priority and due date.
4. Click "Create To-Do".

How to delete a to-do:
1. Find the task(s) you want to delete.
2. Click the trash icon or drag and drop into the trash icon.
3. Confirm the deletion.

How to edit a to-do:
1. Click on the task you want to edit.
2. On the Details page select the pencil icon at the top, update your to-do.
3. Click "Save".

How to add a new category:
1. Go to the "Categories" page in the sidebar.
2. Add a new category name and save.

How to log out:
Use the "Logout" link in the sidebar menu.

If a user asks how to perform one of these actions, tell them the steps above. If they ask you to do the task, politely explain that you can't, but you can show them how. You can also offer motivation, productivity tips, general knowledge or jokes if asked."#
    }

    fn build_contents(messages: &[ChatMessage]) -> Vec<WireContent> {
        let mut contents = vec![WireContent {
            role: "user",
            parts: vec![WirePart {
                text: Self::system_instruction().to_string(),
            }],
        }];
        contents.extend(messages.iter().map(|msg| WireContent {
            role: match msg.role {
                Role::User => "user",
                Role::Bot => "model",
            },
            parts: vec![WirePart {
                text: msg.content.clone(),
            }],
        }));
        contents
    }
}

#[async_trait]
impl ChatBackend for GeminiClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, RelayError> {
        let Some(key) = &self.api_key else {
            return Err(RelayError::Configuration);
        };

        let url = format!(
            "{}/{}:generateContent?key={}",
            self.api_base, self.model, key
        );
        let request = GenerateRequest {
            contents: Self::build_contents(messages),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RelayError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::Upstream(format!(
                "backend returned {}: {}",
                status, body
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| RelayError::Upstream(format!("unparseable backend payload: {}", e)))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| RelayError::Upstream("backend reply is missing text content".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_credential_fails_without_an_outbound_call() {
        // Unroutable base makes any accidental request error differently
        // than Configuration.
        let client = GeminiClient::new("http://127.0.0.1:1/models", "test-model", None).unwrap();
        let err = client
            .complete(&[ChatMessage::user("hello")])
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Configuration));
    }

    #[test]
    fn empty_credential_counts_as_missing() {
        let client =
            GeminiClient::new(DEFAULT_API_BASE, DEFAULT_MODEL, Some(String::new())).unwrap();
        assert!(client.api_key.is_none());
    }

    #[test]
    fn contents_prepend_persona_and_map_bot_to_model() {
        let contents = GeminiClient::build_contents(&[
            ChatMessage::user("hi"),
            ChatMessage::bot("hello!"),
            ChatMessage::user("how are you"),
        ]);
        assert_eq!(contents.len(), 4);
        assert_eq!(contents[0].role, "user");
        assert!(contents[0].parts[0].text.contains("doeet assistant"));
        assert_eq!(contents[2].role, "model");
        assert_eq!(contents[3].parts[0].text, "how are you");
    }
}
