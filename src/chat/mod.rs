//! Chat-assisted drafting.
//!
//! Each tier of a project carries its own transcript. A drafting turn sends
//! a domain-specific persona prompt, the stored transcript and the new user
//! message to the model, and returns the assistant's reply. Storing the
//! updated transcript is left to the caller.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::crew::{Domain, Tier};
use crate::error::LlmError;
use crate::llm::{GenerationRequest, LlmProvider, Message};

/// Who wrote a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    #[serde(alias = "ai")]
    Assistant,
}

impl Speaker {
    fn wire_role(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(alias = "role")]
    pub speaker: Speaker,
    #[serde(alias = "content")]
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Assistant,
            text: text.into(),
        }
    }

    fn to_wire(&self) -> Message {
        Message {
            role: self.speaker.wire_role().to_string(),
            content: self.text.clone(),
        }
    }
}

/// System prompt for the drafting assistant of one (domain, tier).
///
/// Micro-tier assistants see the macro draft as context.
pub fn assistant_prompt(domain: Domain, tier: Tier, macro_context: &str) -> String {
    let persona = match (domain, tier) {
        (Domain::History, Tier::Macro) => "World Architect",
        (Domain::History, Tier::Micro) => "Literary Editor",
        (_, Tier::Macro) => "Business Strategist",
        (_, Tier::Micro) => "Project Manager and Legal Counsel",
    };

    match tier {
        Tier::Macro => format!(
            "You are a {}. Help the author develop this idea through conversation. \
             Ask pointed questions and propose concrete options.",
            persona
        ),
        Tier::Micro => {
            let context = if macro_context.trim().is_empty() {
                crate::crew::NO_CONTEXT
            } else {
                macro_context
            };
            format!(
                "You are a {}. Help the author turn the plan into execution. Context: {}",
                persona, context
            )
        }
    }
}

/// Plain-text rendering of a transcript, one `speaker: text` line per message.
pub fn render_transcript(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.speaker.wire_role(), m.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drafting assistant backed by a completion provider.
pub struct ChatAssistant {
    llm: Arc<dyn LlmProvider>,
}

impl ChatAssistant {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Produces the assistant's answer to `user_text`.
    pub async fn reply(
        &self,
        domain: Domain,
        tier: Tier,
        macro_context: &str,
        history: &[ChatMessage],
        user_text: &str,
    ) -> Result<ChatMessage, LlmError> {
        if !self.llm.is_configured() {
            return Err(LlmError::MissingApiKey);
        }

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(assistant_prompt(domain, tier, macro_context)));
        messages.extend(history.iter().map(ChatMessage::to_wire));
        messages.push(Message::user(user_text));

        let response = self.llm.generate(GenerationRequest::new("", messages)).await?;
        let text = response
            .first_content()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| LlmError::ParseError("No content in LLM response".to_string()))?;

        tracing::debug!(domain = %domain, tier = %tier, chars = text.len(), "Chat reply received");
        Ok(ChatMessage::assistant(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Choice, GenerationResponse, Usage};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct EchoProvider {
        configured: bool,
        last: Mutex<Option<GenerationRequest>>,
    }

    #[async_trait]
    impl LlmProvider for EchoProvider {
        async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
            let reply = format!("echo {}", request.messages.len());
            *self.last.lock().expect("lock not poisoned") = Some(request);
            Ok(GenerationResponse {
                id: "mock".to_string(),
                model: "mock-model".to_string(),
                choices: vec![Choice {
                    index: 0,
                    message: Message::assistant(reply),
                    finish_reason: "stop".to_string(),
                }],
                usage: Usage::default(),
            })
        }

        fn is_configured(&self) -> bool {
            self.configured
        }
    }

    #[test]
    fn test_legacy_transcript_deserializes() {
        let json = r#"[{"role":"user","content":"hi"},{"role":"ai","content":"hello"}]"#;
        let messages: Vec<ChatMessage> = serde_json::from_str(json).unwrap();
        assert_eq!(messages, vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")]);

        let out = serde_json::to_string(&messages[1]).unwrap();
        assert_eq!(out, r#"{"speaker":"assistant","text":"hello"}"#);
    }

    #[test]
    fn test_prompts_by_domain_and_tier() {
        assert!(assistant_prompt(Domain::History, Tier::Macro, "").starts_with("You are a World Architect."));
        let micro = assistant_prompt(Domain::PhysicalVenture, Tier::Micro, "A bakery downtown");
        assert!(micro.starts_with("You are a Project Manager and Legal Counsel."));
        assert!(micro.ends_with("Context: A bakery downtown"));
        assert!(assistant_prompt(Domain::History, Tier::Micro, " ").contains("(no macro context provided)"));
    }

    #[test]
    fn test_render_transcript() {
        let text = render_transcript(&[ChatMessage::user("idea?"), ChatMessage::assistant("yes")]);
        assert_eq!(text, "user: idea?\nassistant: yes");
    }

    #[tokio::test]
    async fn test_reply_sends_system_history_then_user() {
        let provider = Arc::new(EchoProvider {
            configured: true,
            last: Mutex::new(None),
        });
        let assistant = ChatAssistant::new(provider.clone());
        let history = vec![ChatMessage::user("a"), ChatMessage::assistant("b")];

        let reply = assistant
            .reply(Domain::DigitalProduct, Tier::Macro, "", &history, "c")
            .await
            .unwrap();

        assert_eq!(reply, ChatMessage::assistant("echo 4"));
        let request = provider.last.lock().unwrap().clone().unwrap();
        let roles: Vec<_> = request.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, ["system", "user", "assistant", "user"]);
    }

    #[tokio::test]
    async fn test_reply_fails_fast_without_credential() {
        let provider = Arc::new(EchoProvider {
            configured: false,
            last: Mutex::new(None),
        });
        let err = ChatAssistant::new(provider.clone())
            .reply(Domain::History, Tier::Macro, "", &[], "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));
        assert!(provider.last.lock().unwrap().is_none());
    }
}
