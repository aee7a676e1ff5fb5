//! 2Captcha-style solver against a mock API.

use std::time::Duration;
use ticketwatch_scanner::{CaptchaSolver, SolverError, TwoCaptchaSolver};
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn solver(server: &MockServer, max_polls: u32) -> TwoCaptchaSolver {
    TwoCaptchaSolver::new(
        "test-key".to_string(),
        server.uri(),
        Duration::from_millis(1),
        max_polls,
    )
}

async fn mount_submit(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/in.php"))
        .and(body_string_contains("googlekey=site-key"))
        .and(body_string_contains("method=userrecaptcha"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_solve_polls_until_ready() {
    let server = MockServer::start().await;
    mount_submit(&server, serde_json::json!({"status": 1, "request": "4242"})).await;

    Mock::given(method("GET"))
        .and(path("/res.php"))
        .and(query_param("id", "4242"))
        .and(query_param("action", "get"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"status": 0, "request": "CAPCHA_NOT_READY"})),
        )
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/res.php"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"status": 1, "request": "solved-token"})),
        )
        .mount(&server)
        .await;

    let token = solver(&server, 10)
        .solve("site-key", "https://tickets.example.gov/search")
        .await
        .expect("solve succeeds");

    assert_eq!(token.as_deref(), Some("solved-token"));
}

#[tokio::test]
async fn test_rejected_submission_is_none() {
    let server = MockServer::start().await;
    mount_submit(
        &server,
        serde_json::json!({"status": 0, "request": "ERROR_ZERO_BALANCE"}),
    )
    .await;

    let token = solver(&server, 10)
        .solve("site-key", "https://tickets.example.gov/search")
        .await
        .expect("solve returns");

    assert!(token.is_none());
}

#[tokio::test]
async fn test_unsolvable_challenge_is_none() {
    let server = MockServer::start().await;
    mount_submit(&server, serde_json::json!({"status": 1, "request": "4242"})).await;
    Mock::given(method("GET"))
        .and(path("/res.php"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"status": 0, "request": "ERROR_CAPTCHA_UNSOLVABLE"})),
        )
        .mount(&server)
        .await;

    let token = solver(&server, 10)
        .solve("site-key", "https://tickets.example.gov/search")
        .await
        .expect("solve returns");

    assert!(token.is_none());
}

#[tokio::test]
async fn test_gives_up_after_max_polls() {
    let server = MockServer::start().await;
    mount_submit(&server, serde_json::json!({"status": 1, "request": "4242"})).await;
    Mock::given(method("GET"))
        .and(path("/res.php"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"status": 0, "request": "CAPCHA_NOT_READY"})),
        )
        .expect(3)
        .mount(&server)
        .await;

    let token = solver(&server, 3)
        .solve("site-key", "https://tickets.example.gov/search")
        .await
        .expect("solve returns");

    assert!(token.is_none());
}

#[tokio::test]
async fn test_http_failure_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/in.php"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = solver(&server, 3)
        .solve("site-key", "https://tickets.example.gov/search")
        .await
        .unwrap_err();

    assert!(matches!(err, SolverError::Http(_)));
}

#[tokio::test]
async fn test_malformed_reply_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/in.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK|4242"))
        .mount(&server)
        .await;

    let err = solver(&server, 3)
        .solve("site-key", "https://tickets.example.gov/search")
        .await
        .unwrap_err();

    assert!(matches!(err, SolverError::InvalidResponse(_)));
}
