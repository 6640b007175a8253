use tracing::debug;

use crate::annotation::{parse_annotation, Annotation};
use crate::llm::client::{ChatClient, GenerationError};
use crate::llm::prompts;

/// Result of asking for an annotation.
#[derive(Debug, Clone, PartialEq)]
pub enum Generated {
    Annotation(Annotation),
    /// No chat API is configured for this run
    Skipped,
}

/// Turns preset text into an [`Annotation`] through a chat model.
pub struct AnnotationGenerator {
    client: Option<Box<dyn ChatClient>>,
}

impl AnnotationGenerator {
    pub fn new(client: Box<dyn ChatClient>) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// A generator that skips every request.
    pub fn disabled() -> Self {
        Self { client: None }
    }

    pub fn from_client(client: Option<Box<dyn ChatClient>>) -> Self {
        match client {
            Some(client) => Self::new(client),
            None => Self::disabled(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    pub async fn generate(&self, preset_text: &str) -> Result<Generated, GenerationError> {
        let Some(client) = self.client.as_ref() else {
            return Ok(Generated::Skipped);
        };

        let reply = client
            .complete(
                prompts::ANALYST_SYSTEM_PROMPT,
                &prompts::analyst_user_prompt(preset_text),
            )
            .await?;
        debug!("Model reply: {} chars", reply.len());

        parse_annotation(&reply).map(Generated::Annotation)
    }
}
