use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{IntegrationError, IntegrationResult, truncate_body};
use crate::config::Chat;

const SERVICE: &str = "chat provider";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Returns the assistant reply for `message`, with optional page or
    /// exercise context supplied by the client.
    async fn reply(&self, message: &str, context: Option<&str>) -> IntegrationResult<String>;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ChatMessage,
}

pub struct HttpChatProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    system_prompt: String,
}

impl HttpChatProvider {
    pub fn new(client: reqwest::Client, config: &Chat) -> Self {
        Self {
            client,
            api_url: config.api_url().to_string(),
            api_key: config.api_key().to_string(),
            model: config.model().to_string(),
            system_prompt: config.system_prompt().to_string(),
        }
    }
}

/// System prompt first, then the optional context, then the user message.
pub fn build_messages(system_prompt: &str, message: &str, context: Option<&str>) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::new("system", system_prompt)];
    if let Some(context) = context.map(str::trim).filter(|c| !c.is_empty()) {
        messages.push(ChatMessage::new(
            "system",
            format!("Context from the learner's current page:\n{context}"),
        ));
    }
    messages.push(ChatMessage::new("user", message));
    messages
}

fn extract_reply(response: CompletionResponse) -> IntegrationResult<String> {
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| IntegrationError::UnexpectedPayload {
            service: SERVICE,
            reason: String::from("no choices in completion"),
        })
}

#[async_trait]
impl ChatProvider for HttpChatProvider {
    #[tracing::instrument(skip_all)]
    async fn reply(&self, message: &str, context: Option<&str>) -> IntegrationResult<String> {
        if self.api_key.is_empty() {
            return Err(IntegrationError::NotConfigured("chat.api_key"));
        }

        let body = CompletionRequest {
            model: &self.model,
            messages: build_messages(&self.system_prompt, message, context),
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IntegrationError::UpstreamStatus {
                service: SERVICE,
                status: status.as_u16(),
                body: truncate_body(body, 512),
            });
        }

        let completion: CompletionResponse = response.json().await?;
        let reply = extract_reply(completion)?;
        tracing::debug!(chars = reply.len(), "chat reply received");
        Ok(reply)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn messages_include_context_only_when_present() {
        let messages = build_messages("be nice", "what is a loop?", None);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1], ChatMessage::new("user", "what is a loop?"));

        let messages = build_messages("be nice", "why?", Some("  Lesson: Loops "));
        assert_eq!(messages.len(), 3);
        assert!(messages[1].content.ends_with("Lesson: Loops"));

        assert_eq!(build_messages("p", "m", Some("   ")).len(), 2);
    }

    #[test]
    fn reply_is_first_choice() {
        let raw = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"A loop repeats."}}]}"#;
        let parsed: CompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(extract_reply(parsed).unwrap(), "A loop repeats.");
    }

    #[test]
    fn empty_choices_is_an_error() {
        let parsed: CompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            extract_reply(parsed),
            Err(IntegrationError::UnexpectedPayload { .. })
        ));
    }
}
