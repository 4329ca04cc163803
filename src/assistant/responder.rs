use crate::analytics::SalesAggregation;
use crate::assistant::context::{build_context, build_prompt};
use crate::assistant::fallback::{self, NO_DATA_MESSAGE};
use crate::assistant::llm::{providers_from_config, CompletionProvider, SYSTEM_PROMPT};
use crate::config::DashboardConfig;
use crate::error::Result;
use crate::failover;
use serde::Serialize;
use tracing::{info, warn};

/// Where an answer came from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplySource {
    Remote { model: String },
    Local,
}

#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    pub text: String,
    pub source: ReplySource,
}

impl Reply {
    fn local(text: String) -> Self {
        Self {
            text,
            source: ReplySource::Local,
        }
    }
}

/// Answers questions about the cached sales data. Remote models are tried
/// in order; if none answers, a keyword-matched local template is used.
pub struct ConversationalResponder {
    providers: Vec<Box<dyn CompletionProvider>>,
}

impl ConversationalResponder {
    pub fn new(providers: Vec<Box<dyn CompletionProvider>>) -> Self {
        Self { providers }
    }

    pub fn from_config(config: &DashboardConfig) -> Result<Self> {
        Ok(Self::new(providers_from_config(config)?))
    }

    /// Local answers only
    pub fn offline() -> Self {
        Self::new(Vec::new())
    }

    pub fn model_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.model().to_string()).collect()
    }

    pub async fn respond(&self, message: &str, agg: Option<&SalesAggregation>, last_update: Option<&str>) -> Reply {
        let agg = match agg.filter(|a| !a.is_empty()) {
            Some(agg) => agg,
            None => {
                info!("Chat request without loaded data");
                return Reply::local(NO_DATA_MESSAGE.to_string());
            }
        };

        if self.providers.is_empty() {
            return Reply::local(fallback::local_answer(message, Some(agg)));
        }

        let prompt = build_prompt(&build_context(agg, last_update), message);
        let attempt = failover::first_success(
            &self.providers,
            |p| p.model().to_string(),
            |p| p.complete(SYSTEM_PROMPT, &prompt),
            |text: &String| !text.trim().is_empty(),
        )
        .await;

        match attempt {
            Ok(success) => Reply {
                text: success.value,
                source: ReplySource::Remote { model: success.provider },
            },
            Err(exhausted) => {
                warn!(
                    models = exhausted.failures.len(),
                    "Every model failed, answering locally: {}",
                    exhausted.summary()
                );
                Reply::local(fallback::local_answer(message, Some(agg)))
            }
        }
    }
}
