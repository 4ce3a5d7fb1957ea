use crate::infra::{AppState, QueuedMailbox};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use estate_flow::audit::AuditLog;
use estate_flow::runtime::ReplyRouter;
use estate_flow::workflows::desk::{listing_router, ListingDesk, Outbox};
use estate_flow::workflows::documents::InboundMessage;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct MailboxPush {
    pub(crate) messages: Vec<InboundMessage>,
}

pub(crate) fn with_service_routes<L, O>(
    desk: Arc<ListingDesk<L, O>>,
    mailbox: Arc<QueuedMailbox>,
    replies: ReplyRouter,
) -> axum::Router
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    listing_router(desk)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/mailbox/inbound",
            axum::routing::post(mailbox_endpoint),
        )
        .layer(Extension(mailbox))
        .layer(Extension(replies))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Queue connector payloads for the reply workers. Unlike `/api/v1/replies`
/// this returns before the replies are processed.
pub(crate) async fn mailbox_endpoint(
    Extension(mailbox): Extension<Arc<QueuedMailbox>>,
    Json(payload): Json<MailboxPush>,
) -> impl IntoResponse {
    let accepted = payload.messages.len();
    let pending = mailbox.push(payload.messages);
    (
        StatusCode::ACCEPTED,
        Json(json!({ "accepted": accepted, "pending": pending })),
    )
}
