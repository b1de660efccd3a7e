//! Integration tests for Cost Katana
//!
//! These drive the `katana` binary against a mock backend, so settings,
//! client and tracker are exercised together.

use serde_json::{Value, json};
use std::path::Path;
use std::process::{Output, Stdio};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Command for the binary, isolated from the caller's environment.
fn katana(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_katana"));
    cmd.current_dir(dir)
        .env_remove("COST_KATANA_BACKEND_URL")
        .env_remove("COST_KATANA_API_KEY")
        .env_remove("COST_KATANA_USER_ID")
        .env_remove("RUST_LOG");
    cmd
}

async fn run(cmd: &mut Command) -> Output {
    cmd.output().await.expect("Failed to execute katana")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

async fn configure(dir: &Path, server: &MockServer, api_key: &str) {
    let output = run(katana(dir).args([
        "configure",
        "--backend-url",
        &server.uri(),
        "--api-key",
        api_key,
        "--user-id",
        "dev-1",
    ]))
    .await;
    assert!(output.status.success(), "configure failed: {}", stderr(&output));
}

/// Test that the CLI can be invoked
#[tokio::test]
async fn test_cli_invocation() {
    let dir = TempDir::new().unwrap();
    let output = run(katana(dir.path()).arg("--help")).await;

    let text = stdout(&output);
    assert!(output.status.success());
    assert!(text.contains("Cost Katana"));
    for command in ["configure", "login", "track", "optimize", "watch"] {
        assert!(text.contains(command), "missing {} in help", command);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_configure_then_analytics() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cursor/action"))
        .and(header("authorization", "Bearer file-key"))
        .and(body_partial_json(json!({
            "action": "get_analytics",
            "time_range": "7d",
            "user_id": "dev-1",
            "api_key": "file-key"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"total_cost": 2.5, "total_requests": 12}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    configure(dir.path(), &server, "file-key").await;

    let saved = std::fs::read_to_string(dir.path().join(".cost-katana.toml")).unwrap();
    assert!(saved.contains("backendUrl"));
    assert!(saved.contains("apiKey"));

    let output = run(katana(dir.path()).args(["analytics", "--range", "7d"])).await;
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let data: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(data["total_cost"], 2.5);
    assert_eq!(data["total_requests"], 12);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_environment_overrides_settings_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("authorization", "Bearer env-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    configure(dir.path(), &server, "file-key").await;

    let output = run(katana(dir.path())
        .env("COST_KATANA_API_KEY", "env-key")
        .arg("projects"))
    .await;
    assert!(output.status.success(), "stderr: {}", stderr(&output));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failure_reported_on_stderr() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "success": false,
            "error": "Invalid email",
            "message": "Bad request"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    configure(dir.path(), &server, "k").await;

    let output = run(katana(dir.path()).args(["login", "nobody", "--no-open"])).await;
    assert!(!output.status.success());
    assert!(stdout(&output).is_empty());
    assert!(stderr(&output).contains("Error: Invalid email (Bad request)"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unreachable_backend_fails_cleanly() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let dir = TempDir::new().unwrap();
    let output = run(katana(dir.path())
        .env("COST_KATANA_BACKEND_URL", format!("http://127.0.0.1:{}", port))
        .arg("status"))
    .await;

    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("Unable to reach Cost Katana backend"));
    assert!(err.contains("(Network error occurred)"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_watch_tracks_editor_events() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cursor/action"))
        .and(body_partial_json(json!({"action": "track_usage"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"cost": 0.0001}
        })))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    configure(dir.path(), &server, "k").await;

    let edit = |name: &str| {
        json!({
            "type": "insertion",
            "file_name": name,
            "language": "rust",
            "text": "fn generated() {\n    let total = items.iter().map(|i| i.cost).sum::<f64>();\n}\n"
        })
        .to_string()
    };
    let input = [
        edit("a.rs"),
        edit("a.rs"),
        "not json".to_string(),
        json!({"type": "insertion", "file_name": "b.rs", "text": "short"}).to_string(),
        edit("b.rs"),
    ]
    .join("\n");

    let mut child = katana(dir.path())
        .args(["watch", "--no-poll"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    let mut stdin = child.stdin.take().unwrap();
    stdin.write_all(input.as_bytes()).await.unwrap();
    drop(stdin);

    let output = child.wait_with_output().await.unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("Ignoring malformed editor event"));

    let prompts: Vec<String> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.body_json::<Value>().unwrap()["prompt"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(prompts.len(), 2);
    assert!(prompts.contains(&"AI-assisted edit in a.rs".to_string()));
    assert!(prompts.contains(&"AI-assisted edit in b.rs".to_string()));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_watch_survives_undecodable_line() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"action": "track_usage"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    configure(dir.path(), &server, "k").await;

    let edit = json!({
        "type": "insertion",
        "file_name": "a.rs",
        "text": "fn generated() {\n    let total = items.iter().map(|i| i.cost).sum::<f64>();\n}\n"
    })
    .to_string();
    let mut input = format!("{}\n", edit).into_bytes();
    input.extend_from_slice(b"\xff\xfe\n");

    let mut child = katana(dir.path())
        .args(["watch", "--no-poll"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    let mut stdin = child.stdin.take().unwrap();
    stdin.write_all(&input).await.unwrap();
    drop(stdin);

    let output = child.wait_with_output().await.unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("Ignoring malformed editor event"));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

/// Library crates work without the binary, on a plain blocking runtime
#[test]
fn test_library_client_without_backend() {
    use katana_client::{CostKatanaClient, TrackUsageRequest};
    use katana_core::ClientConfig;

    let config = ClientConfig::new("http://127.0.0.1:9").unwrap().with_api_key("k");
    let client = CostKatanaClient::from_config(config).unwrap();

    let result = tokio_test::block_on(client.track_usage(&TrackUsageRequest::new("p", "r", "m")));
    assert!(!result.is_success());
    assert_eq!(result.message(), Some("Network error occurred"));
}
