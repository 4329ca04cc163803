mod common;

use common::{post, StubServer};
use sales_dashboard::analytics::aggregate;
use sales_dashboard::assistant::llm::{providers_from_config, LlmClient, MAX_TOKENS};
use sales_dashboard::assistant::{ConversationalResponder, ReplySource};
use sales_dashboard::record::{RowRecord, COL_PRODUCT, COL_REVENUE};
use sales_dashboard::DashboardConfig;
use std::time::Duration;

const COMPLETION: &str = r#"{"choices":[{"message":{"role":"assistant","content":"  Vendas estáveis.  "}}]}"#;

#[tokio::test]
async fn test_client_sends_chat_completion_request() {
    let server = StubServer::start(vec![post("/v1/chat/completions", 200, COMPLETION)]).await;
    let client = LlmClient::new(&format!("{}/v1", server.base_url), "secret".to_string(), Duration::from_secs(5)).unwrap();

    let answer = client.call_llm("model-a", "sistema", "pergunta").await.unwrap();
    assert_eq!(answer, "Vendas estáveis.");

    let requests = server.requests.lock().unwrap();
    let (request, _) = &requests[0];
    assert_eq!(request.headers.get("authorization").map(String::as_str), Some("Bearer secret"));
    assert!(request.headers.contains_key("x-title"));

    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["model"], "model-a");
    assert_eq!(body["max_tokens"], MAX_TOKENS);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "pergunta");
}

#[tokio::test]
async fn test_client_rejects_error_status_and_missing_content() {
    let server = StubServer::start(vec![
        post("/down/chat/completions", 429, r#"{"error":"rate limited"}"#),
        post("/empty/chat/completions", 200, r#"{"choices":[]}"#),
    ])
    .await;

    let down = LlmClient::new(&format!("{}/down", server.base_url), "k".to_string(), Duration::from_secs(5)).unwrap();
    let err = down.call_llm("m", "s", "u").await.unwrap_err();
    assert!(err.to_string().contains("429"));

    let empty = LlmClient::new(&format!("{}/empty", server.base_url), "k".to_string(), Duration::from_secs(5)).unwrap();
    assert!(empty.call_llm("m", "s", "u").await.is_err());
}

fn loaded() -> sales_dashboard::SalesAggregation {
    aggregate(&vec![
        RowRecord::new().with(COL_PRODUCT, "Notebook").with(COL_REVENUE, "R$ 100,00"),
        RowRecord::new().with(COL_PRODUCT, "Mouse").with(COL_REVENUE, "abc"),
        RowRecord::new().with(COL_PRODUCT, "Cabo").with(COL_REVENUE, "50"),
    ])
}

#[tokio::test]
async fn test_every_configured_model_failing_falls_back_locally() {
    // No routes: every model gets a 404
    let server = StubServer::start(vec![]).await;
    let config = DashboardConfig::default().with_llm(format!("{}/v1", server.base_url), Some("k".to_string()));
    let responder = ConversationalResponder::new(providers_from_config(&config).unwrap());

    let reply = responder.respond("Mostre as vendas", Some(&loaded()), Some("2025-06-01 09:00:00")).await;

    assert_eq!(reply.source, ReplySource::Local);
    assert!(reply.text.starts_with("# 📊 Resumo de Vendas Atual"));
    assert!(reply.text.contains("**Receita Total**: R$ 150.00"));
    assert!(reply.text.contains("**Ticket Médio**: R$ 50.00"));
    assert_eq!(server.requests.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn test_first_configured_model_answers() {
    let server = StubServer::start(vec![post("/v1/chat/completions", 200, COMPLETION)]).await;
    let config = DashboardConfig::default()
        .with_llm(format!("{}/v1", server.base_url), Some("k".to_string()))
        .with_models(vec!["first".to_string(), "second".to_string()]);
    let responder = ConversationalResponder::from_config(&config).unwrap();

    let reply = responder.respond("oi", Some(&loaded()), None).await;
    assert_eq!(reply.source, ReplySource::Remote { model: "first".to_string() });
    assert_eq!(reply.text, "Vendas estáveis.");

    let requests = server.requests.lock().unwrap();
    let body: serde_json::Value = serde_json::from_str(&requests[0].0.body).unwrap();
    let prompt = body["messages"][1]["content"].as_str().unwrap();
    assert!(prompt.contains("PERGUNTA DO USUÁRIO: oi"));
    assert!(prompt.contains("- Total de transações: 3"));
}
