//! Unit tests for katana-client module

use crate::dispatcher::{Envelope, Method, NETWORK_ERROR};
use crate::*;
use katana_core::{Action, ApiResult, ClientConfig};
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(base_url: &str, api_key: Option<&str>) -> CostKatanaClient {
    let mut config = ClientConfig::new(base_url).unwrap().with_user_id("user-1");
    if let Some(key) = api_key {
        config = config.with_api_key(key);
    }
    CostKatanaClient::from_config(config).unwrap()
}

fn ok_body(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": data}))
}

/// A localhost URL nothing listens on.
fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/api", port)
}

#[test]
fn test_envelope_shape() {
    let config = ClientConfig::new("https://example.test/api")
        .unwrap()
        .with_api_key("k1")
        .with_user_id("u1");
    let request = OptimizePromptRequest::new("Explain closures").with_model("gpt-4o");
    let payload = request.payload();
    let envelope = Envelope::new(Action::OptimizePrompt, &config, &payload);

    let rendered = serde_json::to_string_pretty(&envelope).unwrap();
    insta::assert_snapshot!(rendered, @r###"
    {
      "action": "optimize_prompt",
      "user_id": "u1",
      "api_key": "k1",
      "prompt": "Explain closures",
      "model": "gpt-4o",
      "target_reduction": 20,
      "preserve_quality": true
    }
    "###);
}

#[test]
fn test_envelope_identity_always_present() {
    let config = ClientConfig::new("https://example.test/api").unwrap();
    let envelope = Envelope::new(Action::GetProjects, &config, &NoFields {});
    let value = serde_json::to_value(&envelope).unwrap();
    assert_eq!(
        value,
        json!({"action": "get_projects", "user_id": null, "api_key": null})
    );
}

#[test]
fn test_track_usage_payload_tokens() {
    let request = TrackUsageRequest::new("Hello", "Hi there", "gpt-4o");
    let payload = serde_json::to_value(request.payload()).unwrap();
    assert_eq!(
        payload["tokens_used"],
        json!({"prompt_tokens": 2, "completion_tokens": 2, "total_tokens": 4})
    );
    assert_eq!(payload["request_type"], "code_generation");
    assert!(payload.get("language").is_none());
    assert!(payload.get("context_files").is_none());

    let detailed = TrackUsageRequest::new("p", "r", "m")
        .with_language("rust")
        .with_context_file("src/main.rs")
        .with_request_type("chat")
        .with_execution_time(250);
    let payload = serde_json::to_value(detailed.payload()).unwrap();
    assert_eq!(payload["language"], "rust");
    assert_eq!(payload["context_files"], json!(["src/main.rs"]));
    assert_eq!(payload["request_type"], "chat");
    assert_eq!(payload["execution_time"], 250);
}

#[tokio::test]
async fn test_track_usage_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/cursor/action"))
        .and(header("authorization", "Bearer k1"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "action": "track_usage",
            "api_key": "k1",
            "model": "gpt-4o",
            "tokens_used": {"total_tokens": 10}
        })))
        .respond_with(ok_body(json!({"usage_id": "u-42", "cost": 0.0003})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&format!("{}/api", server.uri()), Some("k1"));
    let request = TrackUsageRequest::new("p".repeat(20), "r".repeat(20), "gpt-4o");
    let result = client.track_usage(&request).await;

    let data = result.into_data().expect("tracking should succeed");
    assert_eq!(data.usage_id.as_deref(), Some("u-42"));
    assert_eq!(data.cost, Some(0.0003));

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    let body: Value = received[0].body_json().unwrap();
    assert_eq!(body["user_id"], "user-1");
    assert_eq!(body["tokens_used"]["prompt_tokens"], 5);
    assert_eq!(body["tokens_used"]["completion_tokens"], 5);
}

#[tokio::test]
async fn test_no_authorization_without_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cursor/action"))
        .respond_with(ok_body(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pricing/updates"))
        .respond_with(ok_body(json!({"updates": []})))
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), None);
    assert!(client.get_projects().await.is_success());
    assert!(client.get_pricing_updates().await.is_success());

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 2);
    for request in received {
        assert!(request.headers.get("authorization").is_none());
        assert_eq!(request.headers.get("content-type").unwrap(), "application/json");
    }
}

#[tokio::test]
async fn test_authorization_on_every_request_with_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cursor/action"))
        .respond_with(ok_body(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ok_body(json!({"status": "ok"})))
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), Some("secret"));
    client.get_user_status().await;
    client.trigger_monitoring().await;
    client.get_pricing_updates().await;
    client.validate_connection().await;

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 4);
    for request in received {
        assert_eq!(request.headers.get("authorization").unwrap(), "Bearer secret");
    }
}

#[tokio::test]
async fn test_config_update_applies_to_next_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cursor/action"))
        .respond_with(ok_body(json!({})))
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), None);
    client.get_projects().await;
    client.config().set_api_key(Some("fresh".to_string()));
    client.get_projects().await;

    let received = server.received_requests().await.unwrap();
    assert!(received[0].headers.get("authorization").is_none());
    assert_eq!(received[1].headers.get("authorization").unwrap(), "Bearer fresh");
    let body: Value = received[1].body_json().unwrap();
    assert_eq!(body["api_key"], "fresh");
}

#[tokio::test]
async fn test_every_action_uses_multiplexed_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cursor/action"))
        .respond_with(ok_body(json!({})))
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), Some("k"));
    client.get_analytics(&AnalyticsRequest::for_range("7d")).await;
    client
        .workspace_setup(&WorkspaceSetupRequest {
            workspace: WorkspaceInfo {
                name: "demo".to_string(),
                path: "/tmp/demo".to_string(),
                ..Default::default()
            },
        })
        .await;
    client.get_suggestions(&SuggestionsRequest::default()).await;
    client
        .analyze_code(&AnalyzeCodeRequest {
            code: "fn main() {}".to_string(),
            language: "rust".to_string(),
            file_path: None,
        })
        .await;
    client
        .create_project(&CreateProjectRequest {
            name: "demo".to_string(),
            budget: Some(50.0),
            ..Default::default()
        })
        .await;
    client.get_personalized_tips(&TipsRequest::default()).await;
    client
        .score_response_quality(&QualityScoreRequest {
            prompt: "q".to_string(),
            response: "a".to_string(),
            model: None,
        })
        .await;
    client
        .run_model_comparison(&ModelComparisonRequest {
            prompt: "q".to_string(),
            models: vec!["gpt-4o".to_string(), "claude-3-haiku".to_string()],
        })
        .await;
    client.compare_pricing(&ComparePricingRequest::default()).await;
    client.generate_cost_forecast(&ForecastRequest::default()).await;
    client
        .query_agent(&AgentQueryRequest {
            query: "Where am I overspending?".to_string(),
            context: None,
        })
        .await;
    client.analyze_opportunities(&OpportunitiesRequest::default()).await;
    client.get_prompt_templates(&TemplatesRequest::default()).await;

    let received = server.received_requests().await.unwrap();
    let actions: Vec<String> = received
        .iter()
        .map(|r| {
            let body: Value = r.body_json().unwrap();
            assert_eq!(body["api_key"], "k");
            assert_eq!(body["user_id"], "user-1");
            body["action"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(
        actions,
        vec![
            "get_analytics",
            "workspace_setup",
            "get_suggestions",
            "analyze_code",
            "create_project",
            "get_personalized_tips",
            "score_response_quality",
            "run_model_comparison",
            "compare_pricing",
            "generate_cost_forecast",
            "query_agent",
            "analyze_opportunities",
            "get_prompt_templates",
        ]
    );
}

#[tokio::test]
async fn test_optimize_prompt_fixed_targets() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cursor/action"))
        .and(body_partial_json(json!({
            "action": "optimize_prompt",
            "prompt": "Please could you kindly explain closures",
            "target_reduction": 20,
            "preserve_quality": true
        })))
        .respond_with(ok_body(json!({
            "optimized_prompt": "Explain closures",
            "token_reduction": 42.5
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), Some("k"));
    let result = client
        .optimize_prompt(&OptimizePromptRequest::new(
            "Please could you kindly explain closures",
        ))
        .await;
    let data = result.into_data().unwrap();
    assert_eq!(data.optimized_prompt.as_deref(), Some("Explain closures"));
    assert_eq!(data.token_reduction, Some(42.5));
    assert!(data.suggestions.is_empty());
}

#[tokio::test]
async fn test_server_reported_failure_passes_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "Quota exceeded",
            "message": "Upgrade your plan"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), Some("k"));
    let result = client.get_user_status().await;
    assert_eq!(
        result,
        ApiResult::failure("Quota exceeded", "Upgrade your plan")
    );
}

#[tokio::test]
async fn test_http_error_uses_server_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "error": "Invalid API key",
            "message": "Authentication failed"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), Some("bad"));
    let result = client.get_projects().await;
    assert_eq!(result.error(), Some("Invalid API key"));
    assert_eq!(result.message(), Some("Authentication failed"));
}

#[tokio::test]
async fn test_http_error_falls_back_to_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), None);
    let result = client.get_pricing_updates().await;
    assert_eq!(result.error(), Some("HTTP 502: Bad Gateway"));
    assert_eq!(result.message(), Some("Request failed"));
}

#[tokio::test]
async fn test_http_error_keeps_message_when_error_is_not_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "success": false,
            "error": {"code": "E1"},
            "message": "Email invalid"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), None);
    let result = client.get_projects().await;
    assert_eq!(result.error(), Some("HTTP 422: Unprocessable Entity"));
    assert_eq!(result.message(), Some("Email invalid"));
}

#[tokio::test]
async fn test_malformed_body_is_transport_class() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("definitely not json"))
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), None);
    let result = client.get_pricing_updates().await;
    assert!(!result.is_success());
    assert!(result.error().unwrap().contains(&server.uri()));
    assert_eq!(result.message(), Some(NETWORK_ERROR));
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    let base_url = closed_port_url();
    let client = client_for(&base_url, Some("k"));

    let result = client.get_user_status().await;
    let error = result.error().expect("should fail");
    assert!(error.contains(&base_url), "error should name {}: {}", base_url, error);
    assert_eq!(result.message(), Some("Network error occurred"));
}

#[tokio::test]
async fn test_validate_connection_falls_through_to_health() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/cursor/health"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ok_body(json!({"status": "healthy"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ok_body(json!({"status": "unused"})))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), None);
    let result = client.validate_connection().await;
    assert_eq!(result, ApiResult::success(json!({"status": "healthy"})));
}

#[tokio::test]
async fn test_validate_connection_all_fail_is_synthesized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"error": "last probe"})))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), None);
    let result = client.validate_connection().await;
    let error = result.error().unwrap();
    assert!(!error.contains("last probe"));
    assert!(error.contains("/cursor/health, /health, /api/health"));
    assert_eq!(result.message(), Some("Connection validation failed"));
}

#[tokio::test]
async fn test_magic_link_falls_back_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cursor/action"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "Unknown action"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/magic-link"))
        .respond_with(ok_body(json!({"magic_link": "https://example.test/login/abc"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), None);
    let result = client
        .generate_magic_link(&MagicLinkRequest::new("dev@example.test"))
        .await;
    let data = result.into_data().unwrap();
    assert_eq!(data.link(), Some("https://example.test/login/abc"));

    let received = server.received_requests().await.unwrap();
    let direct: Value = received[1].body_json().unwrap();
    assert_eq!(direct, json!({"email": "dev@example.test", "source": "cursor"}));
}

#[tokio::test]
async fn test_magic_link_fallback_failure_is_final() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cursor/action"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "first"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/magic-link"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "second",
            "message": "Invalid email"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), None);
    let result = client
        .generate_magic_link(&MagicLinkRequest::new("not-an-email"))
        .await;
    assert_eq!(result, ApiResult::failure("second", "Invalid email"));
}

#[tokio::test]
async fn test_magic_link_no_fallback_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cursor/action"))
        .respond_with(ok_body(json!({"url": "https://example.test/l/1"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/magic-link"))
        .respond_with(ok_body(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), None);
    let result = client
        .generate_magic_link(&MagicLinkRequest::new("dev@example.test"))
        .await;
    assert_eq!(result.data().and_then(|d| d.link()), Some("https://example.test/l/1"));
}

#[tokio::test]
async fn test_raw_request_get_sends_no_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/custom"))
        .respond_with(ok_body(json!(1)))
        .mount(&server)
        .await;

    let client = client_for(&server.uri(), None);
    let result: ApiResult<u32> = client
        .dispatcher()
        .request(Method::Get, "/custom", Some(&json!({"ignored": true})))
        .await;
    assert_eq!(result, ApiResult::success(1));

    let received = server.received_requests().await.unwrap();
    assert!(received[0].body.is_empty());
}
