use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const SYSTEM_PROMPT: &str = "Você é um assistente especializado em análise de dados de vendas. \
Responda em português brasileiro de forma clara e útil.";

pub const MAX_TOKENS: u32 = 500;
pub const TEMPERATURE: f64 = 0.7;

const REFERER: &str = "https://localhost";
const APP_TITLE: &str = "Bot Consultor de planilha";

/// One remote model that can answer a prompt
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    /// Model identifier, used in logs and replies
    fn model(&self) -> &str;
}

/// OpenAI-compatible chat completion client
pub struct LlmClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl LlmClient {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| DashboardError::Config(format!("Failed to build LLM client: {}", e)))?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub async fn call_llm(&self, model: &str, system: &str, user: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS
        });

        debug!(model, prompt_chars = user.len(), "Calling LLM");
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("HTTP-Referer", REFERER)
            .header("X-Title", APP_TITLE)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| DashboardError::Llm(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let snippet: String = text.chars().take(200).collect();
            return Err(DashboardError::Llm(format!("status {}: {}", status.as_u16(), snippet)));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| DashboardError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| DashboardError::Llm("No content in LLM response".to_string()))?;

        Ok(content.to_string())
    }
}

/// Binds a shared client to one model identifier
pub struct ModelProvider {
    client: Arc<LlmClient>,
    model: String,
}

impl ModelProvider {
    pub fn new(client: Arc<LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl CompletionProvider for ModelProvider {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.client.call_llm(&self.model, system, user).await
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// One provider per configured model, in order. Empty without an API key.
pub fn providers_from_config(config: &DashboardConfig) -> Result<Vec<Box<dyn CompletionProvider>>> {
    let Some(api_key) = config.llm_api_key.clone() else {
        return Ok(Vec::new());
    };
    let client = Arc::new(LlmClient::new(&config.llm_base_url, api_key, config.llm_timeout)?);
    Ok(config
        .llm_models
        .iter()
        .map(|model| Box::new(ModelProvider::new(client.clone(), model.as_str())) as Box<dyn CompletionProvider>)
        .collect())
}
