use std::fs;
use std::path::PathBuf;

use reqflow_cli::commands::status::StatusArgs;
use reqflow_cli::commands::{session, status, submit, totals};
use reqflow_client::testing::user;
use reqflow_core::config::AppConfig;
use reqflow_core::domain::user::Role;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn totals_recomputes_rows_and_budget() {
    let dir = TempDir::new().expect("tempdir");
    let file = write_request(
        &dir,
        json!({
            "kind": "payment",
            "itemGroups": [
                {"description": "Paper", "frequency": 2, "quantity": 3, "unitCost": 10, "total": 999},
                {"description": "Printer", "unitCost": 200}
            ]
        }),
    );

    let result = totals::run(&file);
    assert_eq!(result.exit_code, 0, "expected totals to succeed: {}", result.output);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "totals");
    let message = payload["message"].as_str().unwrap_or_default();
    assert!(message.contains("1. Paper = 60"), "row total recomputed: {message}");
    assert!(message.contains("2. Printer = 200"), "missing counts default to one: {message}");
    assert!(message.contains("budget = 260"), "budget: {message}");
}

#[test]
fn totals_uses_travel_rows_for_travel_requests() {
    let dir = TempDir::new().expect("tempdir");
    let file = write_request(
        &dir,
        json!({
            "kind": "travel",
            "itemGroups": [{"expense": "Hotel", "daysNumber": 3, "rate": "45.5"}]
        }),
    );

    let payload = parse_payload(&totals::run(&file).output);
    let message = payload["message"].as_str().unwrap_or_default();
    assert!(message.contains("Hotel = 136.5"), "travel total: {message}");
}

#[test]
fn totals_rejects_unknown_kind() {
    let dir = TempDir::new().expect("tempdir");
    let file = write_request(&dir, json!({"kind": "invoice"}));

    let result = totals::run(&file);
    assert_eq!(result.exit_code, 6);
    let payload = parse_payload(&result.output);
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["error_class"], "input");
}

#[tokio::test]
async fn submit_without_reviewer_saves_a_draft() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payment-requests/save"))
        .and(header("authorization", "Bearer static-token"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"status": 201, "message": "Saved"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("tempdir");
    let config = config_for(&server, &dir, Some("static-token"));
    let file = write_request(&dir, json!({"kind": "payment", "department": "Research"}));

    let result = submit::run(&config, &file, &[]).await;
    assert_eq!(result.exit_code, 0, "expected save to succeed: {}", result.output);
    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "submit");
    assert_eq!(payload["message"], "Saved");
}

#[tokio::test]
async fn submit_with_reviewer_and_missing_fields_makes_no_call() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("tempdir");
    let config = config_for(&server, &dir, Some("static-token"));
    let file = write_request(&dir, json!({"kind": "payment", "reviewedBy": "rev-1"}));

    let result = submit::run(&config, &file, &[]).await;
    assert_eq!(result.exit_code, 6, "expected local refusal: {}", result.output);
    assert_eq!(parse_payload(&result.output)["error_class"], "invalid_request");
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn submit_surfaces_business_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/payment-requests/save"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": 422, "message": "Budget line closed"})),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("tempdir");
    let config = config_for(&server, &dir, Some("static-token"));
    let file = write_request(&dir, json!({"kind": "payment"}));

    let result = submit::run(&config, &file, &[]).await;
    assert_eq!(result.exit_code, 5);
    let payload = parse_payload(&result.output);
    assert_eq!(payload["error_class"], "rejected");
    assert_eq!(payload["message"], "Budget line closed");
}

#[tokio::test]
async fn status_requires_a_session() {
    let server = MockServer::start().await;
    let dir = TempDir::new().expect("tempdir");
    let config = config_for(&server, &dir, None);

    let result = status::run(&config, status_args("reviewed")).await;
    assert_eq!(result.exit_code, 4);
    assert_eq!(parse_payload(&result.output)["error_class"], "session");
}

#[tokio::test]
async fn login_then_review_a_pending_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": 200,
            "data": {
                "user": serde_json::to_value(user("rev-1", Role::Reviewer)).expect("user json"),
                "token": "session-token"
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/payment-requests/pay-1"))
        .and(header("authorization", "Bearer session-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"_id": "pay-1", "status": "pending", "reviewedBy": "rev-1"}
        })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/payment-requests/pay-1/update-status"))
        .and(body_json(json!({"status": "reviewed", "comment": "Quotes attached"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": 200, "message": "Updated"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("tempdir");
    let config = config_for(&server, &dir, None);

    let login = session::login(&config, "rev-1@example.org", Some("pw".to_string())).await;
    assert_eq!(login.exit_code, 0, "login: {}", login.output);

    let whoami = session::whoami(&config, false).await;
    assert!(parse_payload(&whoami.output)["message"]
        .as_str()
        .unwrap_or_default()
        .contains("rev-1"));

    let mut args = status_args("reviewed");
    args.comment = Some("Quotes attached".to_string());
    let result = status::run(&config, args).await;
    assert_eq!(result.exit_code, 0, "status: {}", result.output);
    assert_eq!(parse_payload(&result.output)["message"], "Updated");

    let logout = session::logout(&config).await;
    assert_eq!(logout.exit_code, 0);
    assert_eq!(session::whoami(&config, false).await.exit_code, 4);
}

#[tokio::test]
async fn status_refuses_an_actor_who_is_not_the_reviewer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "user": serde_json::to_value(user("staff-2", Role::Staff)).expect("user json"),
                "accessToken": "other-token"
            }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/payment-requests/pay-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"_id": "pay-1", "status": "pending", "reviewedBy": "rev-1"}
        })))
        .mount(&server)
        .await;

    let dir = TempDir::new().expect("tempdir");
    let config = config_for(&server, &dir, None);
    assert_eq!(session::login(&config, "staff-2@example.org", Some("pw".to_string())).await.exit_code, 0);

    let result = status::run(&config, status_args("reviewed")).await;
    assert_eq!(result.exit_code, 6, "status: {}", result.output);
    assert_eq!(parse_payload(&result.output)["error_class"], "invalid_request");
    let patched = server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.method.as_str() == "PATCH")
        .count();
    assert_eq!(patched, 0);
}

fn config_for(server: &MockServer, dir: &TempDir, token: Option<&str>) -> AppConfig {
    let mut config = AppConfig::default();
    config.api.base_url = server.uri();
    config.api.max_retries = 0;
    config.session.storage_dir = dir.path().join("session");
    config.api.token = token.map(|token| token.to_string().into());
    config
}

fn status_args(status: &str) -> StatusArgs {
    StatusArgs {
        kind: "payment".to_string(),
        id: "pay-1".to_string(),
        status: status.to_string(),
        comment: None,
        assume_yes: true,
    }
}

fn write_request(dir: &TempDir, document: Value) -> PathBuf {
    let file = dir.path().join("request.json");
    fs::write(&file, document.to_string()).expect("write request file");
    file
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}
