//! Integration tests for the contact HTTP endpoint.
//!
//! Each test spins up an Axum server on a random port with a recording mail
//! transport and exercises the real JSON contract over HTTP.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use contact_intake::config::IntakeConfig;
use contact_intake::error::TransportError;
use contact_intake::intake::{
    ContactPipeline, FixedWindowLimiter, MailTransport, OutboundMessage, RateLimitRecord,
};
use contact_intake::routes::contact_routes;

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Transport stub that records messages instead of sending them.
#[derive(Default)]
struct StubTransport {
    sent: Mutex<Vec<OutboundMessage>>,
    fail: bool,
}

impl StubTransport {
    fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for StubTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(message.clone());
        if self.fail {
            return Err(TransportError::SendFailed("421 service unavailable".into()));
        }
        Ok(())
    }
}

fn configured() -> IntakeConfig {
    IntakeConfig {
        mail_user: Some("owner@example.com".into()),
        mail_password: Some(secrecy::SecretString::from("app-pass")),
        ..IntakeConfig::default()
    }
}

struct TestServer {
    base: String,
    transport: Arc<StubTransport>,
    pipeline: ContactPipeline,
    client: reqwest::Client,
}

impl TestServer {
    async fn post(&self, source: Option<&str>, body: &Value) -> (u16, Value) {
        self.post_raw(source, body.to_string()).await
    }

    async fn post_raw(&self, source: Option<&str>, body: String) -> (u16, Value) {
        let mut req = self
            .client
            .post(format!("{}/api/contact", self.base))
            .header("content-type", "application/json")
            .body(body);
        if let Some(ip) = source {
            req = req.header("x-forwarded-for", ip);
        }
        let resp = req.send().await.expect("request failed");
        let status = resp.status().as_u16();
        let json = resp.json::<Value>().await.expect("invalid JSON from server");
        (status, json)
    }
}

/// Start an Axum server on a random port.
async fn start_server(config: IntakeConfig, transport: StubTransport) -> TestServer {
    let transport = Arc::new(transport);
    let limiter = FixedWindowLimiter::in_memory(config.rate_limit, config.rate_window);
    let pipeline = ContactPipeline::new(Arc::new(config), limiter, transport.clone());
    let app = contact_routes(pipeline.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        base: format!("http://127.0.0.1:{port}"),
        transport,
        pipeline,
        client: reqwest::Client::new(),
    }
}

fn form() -> Value {
    json!({
        "name": "Asha Rao",
        "email": "asha@example.com",
        "phone": "+91 98765 43210",
        "service": "Mobile Apps",
        "message": "We need an app for our clinic."
    })
}

// ── Success ──────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_ok() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(configured(), StubTransport::default()).await;
        let json: Value = server
            .client
            .get(format!("{}/health", server.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["service"], "contact-intake");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn valid_form_returns_200_and_sends_notification() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(configured(), StubTransport::default()).await;

        let (status, json) = server.post(Some("203.0.113.9"), &form()).await;
        assert_eq!(status, 200);
        assert_eq!(json["message"], "Email sent successfully!");

        let sent = server.transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "owner@example.com");
        assert_eq!(sent[0].reply_to.as_deref(), Some("asha@example.com"));
        assert_eq!(sent[0].subject, "New Inquiry from Asha Rao - Mobile Apps");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn confirmation_flag_sends_second_message() {
    timeout(TEST_TIMEOUT, async {
        let config = IntakeConfig {
            send_confirmation: true,
            ..configured()
        };
        let server = start_server(config, StubTransport::default()).await;

        let (status, _) = server.post(None, &form()).await;
        assert_eq!(status, 200);

        let sent = server.transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].recipient, "asha@example.com");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn script_name_is_escaped_in_html() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(configured(), StubTransport::default()).await;

        let mut body = form();
        body["name"] = json!("<script>alert(1)</script>");
        let (status, _) = server.post(None, &body).await;
        assert_eq!(status, 200);

        let html = &server.transport.sent()[0].html_body;
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    })
    .await
    .expect("test timed out");
}

// ── Client errors ────────────────────────────────────────────────────

#[tokio::test]
async fn missing_fields_return_400() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(configured(), StubTransport::default()).await;

        let (status, json) = server
            .post(None, &json!({"name": "Asha", "email": "asha@example.com"}))
            .await;
        assert_eq!(status, 400);
        assert_eq!(json["error"], "Name, email, and message are required.");
        assert!(server.transport.sent().is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn invalid_email_returns_400() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(configured(), StubTransport::default()).await;

        let mut body = form();
        body["email"] = json!("not-an-email");
        let (status, json) = server.post(None, &body).await;
        assert_eq!(status, 400);
        assert_eq!(json["error"], "Please provide a valid email address.");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unaddressable_email_returns_400_without_sending() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(configured(), StubTransport::default()).await;

        let mut body = form();
        body["email"] = json!("a,b@c.co");
        let (status, json) = server.post(None, &body).await;
        assert_eq!(status, 400);
        assert_eq!(json["error"], "Please provide a valid email address.");
        assert!(server.transport.sent().is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn malformed_json_is_treated_as_empty_form() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(configured(), StubTransport::default()).await;

        let (status, json) = server.post_raw(None, "{not json".into()).await;
        assert_eq!(status, 400);
        assert_eq!(json["error"], "Name, email, and message are required.");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn sixth_submission_in_window_returns_429() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(configured(), StubTransport::default()).await;

        for _ in 0..5 {
            let (status, _) = server.post(Some("198.51.100.4"), &form()).await;
            assert_eq!(status, 200);
        }
        let (status, json) = server.post(Some("198.51.100.4"), &form()).await;
        assert_eq!(status, 429);
        assert_eq!(json["error"], "Too many requests. Please try again later.");
        assert_eq!(server.transport.sent().len(), 5);

        // A different source still has its own quota.
        let (status, _) = server.post(Some("198.51.100.5"), &form()).await;
        assert_eq!(status, 200);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn concurrent_requests_at_threshold_admit_exactly_one() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(configured(), StubTransport::default()).await;
        let now = chrono::Utc::now();
        server
            .pipeline
            .limiter()
            .store()
            .put(
                "192.0.2.1",
                RateLimitRecord {
                    count: 4,
                    window_start: now,
                },
            )
            .await;

        let body = form();
        let (a, b) = futures::join!(
            server.post(Some("192.0.2.1"), &body),
            server.post(Some("192.0.2.1"), &body),
        );
        let mut statuses = [a.0, b.0];
        statuses.sort_unstable();
        assert_eq!(statuses, [200, 429]);
        assert_eq!(server.transport.sent().len(), 1);
    })
    .await
    .expect("test timed out");
}

// ── Server errors ────────────────────────────────────────────────────

#[tokio::test]
async fn missing_credentials_return_generic_500() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server(IntakeConfig::default(), StubTransport::default()).await;

        let (status, json) = server.post(None, &form()).await;
        assert_eq!(status, 500);
        assert_eq!(
            json["error"],
            "Server configuration error. Please try again later."
        );
        assert!(server.transport.sent().is_empty());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn transport_failure_returns_generic_500() {
    timeout(TEST_TIMEOUT, async {
        let transport = StubTransport {
            fail: true,
            ..StubTransport::default()
        };
        let server = start_server(configured(), transport).await;

        let (status, json) = server.post(None, &form()).await;
        assert_eq!(status, 500);
        assert_eq!(
            json["error"],
            "Failed to send message. Please try again later."
        );
        assert!(!json.to_string().contains("421"));
    })
    .await
    .expect("test timed out");
}
