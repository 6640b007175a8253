use anyhow::Result;
use tracing::{info, warn};

use super::client::ChatClient;
use super::client_impl::OpenAIClient;
use crate::config::LlmConfig;

/// Create the chat client from the environment.
/// Returns `None` (with a warning) when no key or base URL is configured;
/// annotation generation is then skipped for the whole run.
pub fn create_client(llm_config: &LlmConfig) -> Result<Option<Box<dyn ChatClient>>> {
    let Some(resolved) = llm_config.resolve() else {
        warn!(
            "No API key ({}) or base URL ({}) provided, skipping AI description generation",
            llm_config.api_key_env, llm_config.base_url_env
        );
        return Ok(None);
    };

    let client = OpenAIClient::with_base_url(
        resolved.api_key,
        resolved.model,
        resolved.base_url,
        llm_config.temperature,
        llm_config.timeout_secs,
    )?;
    info!(
        "Using model {} at {} for preset descriptions",
        client.model(),
        client.base_url()
    );
    Ok(Some(Box::new(client)))
}
