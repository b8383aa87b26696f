//! HTTP endpoints for the contact form.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use crate::config::IntakeConfig;
use crate::error::Result;
use crate::intake::rate_limit::spawn_sweep_task;
use crate::intake::{ContactPipeline, FixedWindowLimiter, SmtpMailer};

/// Wire the SMTP pipeline, bind the configured port and serve until shutdown.
pub async fn serve(config: Arc<IntakeConfig>) -> Result<()> {
    let mailer = Arc::new(SmtpMailer::from_config(&config)?);
    let limiter = FixedWindowLimiter::in_memory(config.rate_limit, config.rate_window);
    let _sweep_handle = spawn_sweep_task(limiter.clone(), config.sweep_interval);

    let pipeline = ContactPipeline::new(Arc::clone(&config), limiter, mailer);
    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(port = config.port, "Contact intake server started");

    axum::serve(listener, contact_routes(pipeline)).await?;
    Ok(())
}

/// Build the Axum router with the contact and health routes.
pub fn contact_routes(pipeline: ContactPipeline) -> Router {
    let cors_allow_any = pipeline.config().cors_allow_any;

    let router = Router::new()
        .route("/health", get(health))
        .route("/api/contact", post(submit_contact))
        .with_state(pipeline);

    if cors_allow_any {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "contact-intake"
    }))
}

// ── Contact ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct SuccessBody {
    message: &'static str,
}

async fn submit_contact(
    State(pipeline): State<ContactPipeline>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let source = client_source(&headers);

    // Parsed leniently: the rate limit applies before the body is judged.
    let raw: Value = serde_json::from_slice(&body).unwrap_or_else(|e| {
        debug!(error = %e, "Unparseable contact body");
        Value::Null
    });

    match pipeline.submit(source.as_deref(), &raw).await {
        Ok(receipt) => {
            debug!(
                submission_id = %receipt.id,
                confirmation_sent = receipt.confirmation_sent,
                "Contact submission accepted"
            );
            (
                StatusCode::OK,
                Json(SuccessBody {
                    message: receipt.message,
                }),
            )
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Originating address: first `X-Forwarded-For` hop, else `X-Real-IP`.
pub fn client_source(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    forwarded.or_else(real_ip).map(str::to_string)
}
