//! Dashboard Service
//!
//! Owns the sheet cache and the responder and produces the JSON bodies of
//! the HTTP surface. Transport concerns live in `http`.

use crate::analytics::aggregate_collection;
use crate::assistant::ConversationalResponder;
use crate::cache::{CacheSnapshot, RefreshOutcome, SheetCache};
use crate::config::DashboardConfig;
use crate::error::Result;
use crate::ingestion::FetchChain;
use crate::record::SheetCollection;
use crate::report::{self, ReportMetadata};
use chrono::Local;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::info;

pub const SERVICE_NAME: &str = "sales-dashboard";

/// Status code plus JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }
}

pub struct DashboardService {
    cache: Arc<SheetCache>,
    responder: ConversationalResponder,
}

impl DashboardService {
    pub fn new(cache: Arc<SheetCache>, responder: ConversationalResponder) -> Self {
        Self { cache, responder }
    }

    /// Production wiring: fetch chain, cache and responder from configuration
    pub fn from_config(config: &DashboardConfig) -> Result<Self> {
        let chain = FetchChain::from_config(config)?;
        info!(strategies = ?chain.provider_names(), "Fetch chain ready");
        let cache = Arc::new(SheetCache::new(Arc::new(chain)));
        let responder = ConversationalResponder::from_config(config)?;
        info!(models = ?responder.model_names(), "Responder ready");
        Ok(Self::new(cache, responder))
    }

    pub fn cache(&self) -> Arc<SheetCache> {
        self.cache.clone()
    }

    /// `GET /api/data`. Loads once if nothing is cached yet.
    pub async fn data(&self) -> ApiResponse {
        match self.cache.ensure_loaded().await {
            Some(snapshot) => {
                let mut body = collection_info(&snapshot);
                body.insert("data".to_string(), json!(snapshot.collection));
                ApiResponse::ok(Value::Object(body))
            }
            None => ApiResponse::ok(json!({
                "data": [],
                "last_update": null,
                "count": 0
            })),
        }
    }

    /// `POST /api/update`
    pub async fn update(&self) -> ApiResponse {
        let outcome = self.cache.refresh().await;
        let mut body = match self.cache.read() {
            Some(snapshot) => collection_info(&snapshot),
            None => Map::new(),
        };

        let (success, message) = match &outcome {
            RefreshOutcome::Updated { .. } => (true, "Dados atualizados com sucesso!"),
            RefreshOutcome::Retained => (false, "Não foi possível obter dados novos; mantendo os dados anteriores."),
        };
        body.insert("success".to_string(), json!(success));
        body.insert("message".to_string(), json!(message));
        body.insert("outcome".to_string(), json!(outcome));
        body.entry("last_update".to_string()).or_insert(Value::Null);
        ApiResponse::ok(Value::Object(body))
    }

    /// `GET|POST /api/analysis`
    pub async fn analysis(&self) -> ApiResponse {
        let now = Local::now();
        let mut body = json!({ "timestamp": now.format("%Y-%m-%d %H:%M:%S").to_string() });

        match self.cache.read() {
            Some(snapshot) => {
                let agg = aggregate_collection(&snapshot.collection);
                let meta = ReportMetadata::new(now, Some(snapshot.last_updated_label()));
                body["analysis"] = json!(report::render(&agg, &meta));
                body["summary"] = json!(agg.summary());
            }
            None => {
                body["analysis"] = json!(report::NO_DATA_REPORT);
            }
        }
        ApiResponse::ok(body)
    }

    /// `POST /api/chat` with `{"message": "..."}`
    pub async fn chat(&self, request: &Value) -> ApiResponse {
        let message = request
            .get("message")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or("");
        if message.is_empty() {
            return ApiResponse::error(400, "Mensagem não fornecida");
        }

        let snapshot = self.cache.read();
        let agg = snapshot.as_ref().map(|s| aggregate_collection(&s.collection));
        let last_update = snapshot.as_ref().map(|s| s.last_updated_label());

        let reply = self
            .responder
            .respond(message, agg.as_ref(), last_update.as_deref())
            .await;
        info!(source = ?reply.source, chars = reply.text.len(), "Chat answered");

        ApiResponse::ok(json!({
            "response": reply.text,
            "source": reply.source,
            "timestamp": Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
        }))
    }

    /// `GET /api/health`
    pub fn health(&self) -> ApiResponse {
        let snapshot = self.cache.read();
        ApiResponse::ok(json!({
            "status": "ok",
            "service": SERVICE_NAME,
            "data_loaded": snapshot.is_some(),
            "records": snapshot.as_ref().map(|s| s.collection.total_records()).unwrap_or(0),
            "last_update": snapshot.as_ref().map(|s| s.last_updated_label())
        }))
    }

    /// `GET /api/sheets`
    pub fn sheets(&self) -> ApiResponse {
        let summaries = self
            .cache
            .read()
            .map(|s| s.collection.summaries())
            .unwrap_or_default();
        let names: Vec<&str> = summaries.iter().map(|s| s.name.as_str()).collect();
        ApiResponse::ok(json!({
            "sheets": names,
            "details": summaries
        }))
    }
}

/// Counters shared by the data and update bodies
fn collection_info(snapshot: &CacheSnapshot) -> Map<String, Value> {
    let mut info = Map::new();
    info.insert("last_update".to_string(), json!(snapshot.last_updated_label()));
    match &snapshot.collection {
        SheetCollection::Sheets(sheets) => {
            let sheets_info: Map<String, Value> = sheets
                .iter()
                .map(|s| (s.key.clone(), json!({ "nome": s.name, "registros": s.record_count() })))
                .collect();
            info.insert("total_sheets".to_string(), json!(sheets.len()));
            info.insert("total_records".to_string(), json!(snapshot.collection.total_records()));
            info.insert("sheets_info".to_string(), Value::Object(sheets_info));
        }
        SheetCollection::Flat(rows) => {
            info.insert("count".to_string(), json!(rows.len()));
        }
    }
    info
}
