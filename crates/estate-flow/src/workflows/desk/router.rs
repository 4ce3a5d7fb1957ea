use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Extension, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::error::{DeskError, DeskErrorKind};
use super::ports::Outbox;
use super::publish::Platform;
use super::service::{
    DeliveryOutcome, ListingDesk, NewChecklistItem, NewListing, NewPacket, PublishResult,
};
use crate::audit::{export_csv, AuditFilter, AuditLog};
use crate::runtime::ReplyRouter;
use crate::workflows::documents::{ExceptionId, Holder, InboundMessage, MessageId, PacketId};
use crate::workflows::listing::{
    Actor, ChecklistStatus, GateError, HolderRole, ItemCategory, ListingId, WorkflowState,
};

/// Router exposing every listing desk operation under `/api/v1`.
pub fn listing_router<L, O>(desk: Arc<ListingDesk<L, O>>) -> Router
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    Router::new()
        .route(
            "/api/v1/listings",
            post(create_listing_handler::<L, O>).get(list_listings_handler::<L, O>),
        )
        .route("/api/v1/listings/:listing_id", get(listing_handler::<L, O>))
        .route(
            "/api/v1/listings/:listing_id/checklist",
            post(add_item_handler::<L, O>),
        )
        .route(
            "/api/v1/listings/:listing_id/checklist/:item",
            put(set_item_status_handler::<L, O>),
        )
        .route(
            "/api/v1/listings/:listing_id/gates",
            get(gate_check_handler::<L, O>),
        )
        .route(
            "/api/v1/listings/:listing_id/advance",
            post(advance_handler::<L, O>),
        )
        .route(
            "/api/v1/listings/:listing_id/overrides",
            post(override_handler::<L, O>),
        )
        .route(
            "/api/v1/listings/:listing_id/packets",
            post(create_packet_handler::<L, O>),
        )
        .route(
            "/api/v1/listings/:listing_id/publish",
            post(publish_handler::<L, O>),
        )
        .route(
            "/api/v1/listings/:listing_id/publications/:platform",
            post(publish_result_handler::<L, O>),
        )
        .route(
            "/api/v1/listings/:listing_id/audit",
            get(listing_audit_handler::<L, O>),
        )
        .route(
            "/api/v1/listings/:listing_id/audit/export",
            get(audit_export_handler::<L, O>),
        )
        .route("/api/v1/audit", get(audit_handler::<L, O>))
        .route(
            "/api/v1/packets/:packet_id/send",
            post(send_packet_handler::<L, O>),
        )
        .route(
            "/api/v1/packets/:packet_id/pause",
            post(pause_handler::<L, O>),
        )
        .route(
            "/api/v1/packets/:packet_id/resume",
            post(resume_handler::<L, O>),
        )
        .route("/api/v1/replies", post(reply_handler::<L, O>))
        .route(
            "/api/v1/messages/:message_id/ingest",
            post(ingest_handler::<L, O>),
        )
        .route("/api/v1/messages/:message_id/qa", post(qa_handler::<L, O>))
        .route(
            "/api/v1/messages/:message_id/dispatch",
            post(dispatch_handler::<L, O>),
        )
        .route(
            "/api/v1/messages/:message_id/discard",
            post(discard_handler::<L, O>),
        )
        .route(
            "/api/v1/messages/:message_id/delivery",
            post(delivery_handler::<L, O>),
        )
        .route(
            "/api/v1/exceptions/:exception_id/resolve",
            post(resolve_handler::<L, O>),
        )
        .route("/api/v1/follow-ups/tick", post(tick_handler::<L, O>))
        .with_state(desk)
}

impl IntoResponse for DeskError {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            DeskErrorKind::NotFound => StatusCode::NOT_FOUND,
            DeskErrorKind::GateNotMet | DeskErrorKind::Conflict => StatusCode::CONFLICT,
            DeskErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            DeskErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
            DeskErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = match &self {
            DeskError::Gate(GateError::GateNotMet { target, unmet }) => json!({
                "error": self.to_string(),
                "target": target,
                "unmet": unmet,
            }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, axum::Json(payload)).into_response()
    }
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, DeskError>) -> Response {
    match result {
        Ok(value) => (status, axum::Json(value)).into_response(),
        Err(err) => err.into_response(),
    }
}

fn user(name: &str) -> Result<Actor, DeskError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DeskError::Validation(
            "every mutation needs a named actor".to_string(),
        ));
    }
    Ok(Actor::user(name))
}

#[derive(Debug, Deserialize)]
pub struct ActorRequest {
    pub actor: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateListingRequest {
    pub actor: String,
    pub title: String,
    #[serde(default)]
    pub initial_state: Option<WorkflowState>,
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub actor: String,
    pub name: String,
    pub category: ItemCategory,
    pub holder: HolderRole,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub actor: String,
    pub status: ChecklistStatus,
}

#[derive(Debug, Deserialize)]
pub struct OverrideRequest {
    pub actor: String,
    pub gate: String,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePacketRequest {
    pub actor: String,
    pub holder: Holder,
    pub items: Vec<String>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct SendPacketRequest {
    pub actor: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub actor: String,
    pub action: String,
}

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub actor: String,
    pub platforms: Vec<Platform>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TickRequest {
    /// Evaluate as of this instant instead of the desk clock.
    #[serde(default)]
    pub at: Option<DateTime<Utc>>,
}

pub(crate) async fn create_listing_handler<L, O>(
    State(desk): State<Arc<ListingDesk<L, O>>>,
    axum::Json(request): axum::Json<CreateListingRequest>,
) -> Response
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    let result = user(&request.actor).and_then(|actor| {
        desk.create_listing(
            NewListing {
                title: request.title,
                initial_state: request.initial_state,
            },
            &actor,
        )
    });
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn list_listings_handler<L, O>(
    State(desk): State<Arc<ListingDesk<L, O>>>,
) -> Response
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    (StatusCode::OK, axum::Json(desk.listings())).into_response()
}

pub(crate) async fn listing_handler<L, O>(
    State(desk): State<Arc<ListingDesk<L, O>>>,
    Path(listing_id): Path<String>,
) -> Response
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    respond(StatusCode::OK, desk.listing(&ListingId(listing_id)))
}

pub(crate) async fn add_item_handler<L, O>(
    State(desk): State<Arc<ListingDesk<L, O>>>,
    Path(listing_id): Path<String>,
    axum::Json(request): axum::Json<AddItemRequest>,
) -> Response
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    let result = user(&request.actor).and_then(|actor| {
        desk.add_checklist_item(
            &ListingId(listing_id),
            NewChecklistItem {
                name: request.name,
                category: request.category,
                holder: request.holder,
            },
            &actor,
        )
    });
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn set_item_status_handler<L, O>(
    State(desk): State<Arc<ListingDesk<L, O>>>,
    Path((listing_id, item)): Path<(String, String)>,
    axum::Json(request): axum::Json<SetStatusRequest>,
) -> Response
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    let id = ListingId(listing_id);
    let result = user(&request.actor)
        .and_then(|actor| desk.set_item_status(&id, &item, request.status, &actor))
        .and_then(|transition| {
            desk.checklist(&id).map(|items| {
                json!({
                    "changed": transition.is_some(),
                    "transition": transition,
                    "item": items.into_iter().find(|entry| entry.name == item),
                })
            })
        });
    respond(StatusCode::OK, result)
}

pub(crate) async fn gate_check_handler<L, O>(
    State(desk): State<Arc<ListingDesk<L, O>>>,
    Path(listing_id): Path<String>,
) -> Response
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    let result = desk.can_advance(&ListingId(listing_id)).map(|check| {
        json!({
            "can_advance": check.can_advance(),
            "check": check,
        })
    });
    respond(StatusCode::OK, result)
}

pub(crate) async fn advance_handler<L, O>(
    State(desk): State<Arc<ListingDesk<L, O>>>,
    Path(listing_id): Path<String>,
    axum::Json(request): axum::Json<ActorRequest>,
) -> Response
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    let result = user(&request.actor)
        .and_then(|actor| desk.advance(&ListingId(listing_id), &actor))
        .map(|state| json!({ "state": state }));
    respond(StatusCode::OK, result)
}

pub(crate) async fn override_handler<L, O>(
    State(desk): State<Arc<ListingDesk<L, O>>>,
    Path(listing_id): Path<String>,
    axum::Json(request): axum::Json<OverrideRequest>,
) -> Response
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    let result = user(&request.actor).and_then(|actor| {
        desk.override_gate(
            &ListingId(listing_id),
            &request.gate,
            &request.reason,
            &actor,
        )
    });
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn create_packet_handler<L, O>(
    State(desk): State<Arc<ListingDesk<L, O>>>,
    Path(listing_id): Path<String>,
    axum::Json(request): axum::Json<CreatePacketRequest>,
) -> Response
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    let result = user(&request.actor).and_then(|actor| {
        desk.create_packet(
            &ListingId(listing_id),
            NewPacket {
                holder: request.holder,
                items: request.items,
                deadline: request.deadline,
            },
            &actor,
        )
    });
    respond(StatusCode::CREATED, result)
}

pub(crate) async fn send_packet_handler<L, O>(
    State(desk): State<Arc<ListingDesk<L, O>>>,
    Path(packet_id): Path<String>,
    axum::Json(request): axum::Json<SendPacketRequest>,
) -> Response
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    let result = user(&request.actor)
        .and_then(|actor| desk.send_packet(&PacketId(packet_id), &request.body, &actor));
    respond(StatusCode::OK, result)
}

pub(crate) async fn pause_handler<L, O>(
    State(desk): State<Arc<ListingDesk<L, O>>>,
    Path(packet_id): Path<String>,
    axum::Json(request): axum::Json<ActorRequest>,
) -> Response
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    let result =
        user(&request.actor).and_then(|actor| desk.pause_follow_ups(&PacketId(packet_id), &actor));
    respond(StatusCode::OK, result)
}

pub(crate) async fn resume_handler<L, O>(
    State(desk): State<Arc<ListingDesk<L, O>>>,
    Path(packet_id): Path<String>,
    axum::Json(request): axum::Json<ActorRequest>,
) -> Response
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    let result = user(&request.actor)
        .and_then(|actor| desk.resume_follow_ups(&PacketId(packet_id), &actor));
    respond(StatusCode::OK, result)
}

/// Replies go through the thread's reply worker when a [`ReplyRouter`] is
/// layered onto the router, so they are ordered with polled mail and their
/// attachments are ingested before the response.
pub(crate) async fn reply_handler<L, O>(
    State(desk): State<Arc<ListingDesk<L, O>>>,
    replies: Option<Extension<ReplyRouter>>,
    axum::Json(inbound): axum::Json<InboundMessage>,
) -> Response
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    let result = match replies {
        Some(Extension(router)) => router.submit(inbound).await,
        None => desk.receive_reply(inbound),
    };
    respond(StatusCode::ACCEPTED, result)
}

pub(crate) async fn ingest_handler<L, O>(
    State(desk): State<Arc<ListingDesk<L, O>>>,
    Path(message_id): Path<String>,
    axum::Json(request): axum::Json<ActorRequest>,
) -> Response
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    let result = user(&request.actor)
        .and_then(|actor| desk.ingest_attachments(&MessageId(message_id), &actor));
    respond(StatusCode::OK, result)
}

pub(crate) async fn qa_handler<L, O>(
    State(desk): State<Arc<ListingDesk<L, O>>>,
    Path(message_id): Path<String>,
    axum::Json(request): axum::Json<ActorRequest>,
) -> Response
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    let result =
        user(&request.actor).and_then(|actor| desk.run_qa(&MessageId(message_id), &actor));
    respond(StatusCode::OK, result)
}

pub(crate) async fn dispatch_handler<L, O>(
    State(desk): State<Arc<ListingDesk<L, O>>>,
    Path(message_id): Path<String>,
    axum::Json(request): axum::Json<ActorRequest>,
) -> Response
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    let result = user(&request.actor)
        .and_then(|actor| desk.dispatch_draft(&MessageId(message_id), &actor));
    respond(StatusCode::OK, result)
}

pub(crate) async fn discard_handler<L, O>(
    State(desk): State<Arc<ListingDesk<L, O>>>,
    Path(message_id): Path<String>,
    axum::Json(request): axum::Json<ActorRequest>,
) -> Response
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    let result = user(&request.actor)
        .and_then(|actor| desk.discard_draft(&MessageId(message_id), &actor));
    respond(StatusCode::OK, result)
}

pub(crate) async fn delivery_handler<L, O>(
    State(desk): State<Arc<ListingDesk<L, O>>>,
    Path(message_id): Path<String>,
    axum::Json(outcome): axum::Json<DeliveryOutcome>,
) -> Response
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    match desk.record_delivery(&MessageId(message_id), outcome) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn resolve_handler<L, O>(
    State(desk): State<Arc<ListingDesk<L, O>>>,
    Path(exception_id): Path<String>,
    axum::Json(request): axum::Json<ResolveRequest>,
) -> Response
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    let result = user(&request.actor).and_then(|actor| {
        desk.resolve_exception(&ExceptionId(exception_id), &request.action, &actor)
    });
    respond(StatusCode::OK, result)
}

pub(crate) async fn tick_handler<L, O>(
    State(desk): State<Arc<ListingDesk<L, O>>>,
    request: Option<axum::Json<TickRequest>>,
) -> Response
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    let at = request
        .and_then(|axum::Json(request)| request.at)
        .unwrap_or_else(|| desk.now());
    respond(StatusCode::OK, desk.tick(at))
}

pub(crate) async fn publish_handler<L, O>(
    State(desk): State<Arc<ListingDesk<L, O>>>,
    Path(listing_id): Path<String>,
    axum::Json(request): axum::Json<PublishRequest>,
) -> Response
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    let result = user(&request.actor)
        .and_then(|actor| desk.publish(&ListingId(listing_id), &request.platforms, &actor));
    respond(StatusCode::ACCEPTED, result)
}

pub(crate) async fn publish_result_handler<L, O>(
    State(desk): State<Arc<ListingDesk<L, O>>>,
    Path((listing_id, platform)): Path<(String, String)>,
    axum::Json(result): axum::Json<PublishResult>,
) -> Response
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    let outcome = platform
        .parse::<Platform>()
        .map_err(DeskError::Validation)
        .and_then(|platform| desk.on_publish_result(&ListingId(listing_id), platform, result));
    respond(StatusCode::OK, outcome)
}

pub(crate) async fn listing_audit_handler<L, O>(
    State(desk): State<Arc<ListingDesk<L, O>>>,
    Path(listing_id): Path<String>,
    Query(filter): Query<AuditFilter>,
) -> Response
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    respond(
        StatusCode::OK,
        desk.audit_trail(Some(&ListingId(listing_id)), &filter),
    )
}

pub(crate) async fn audit_handler<L, O>(
    State(desk): State<Arc<ListingDesk<L, O>>>,
    Query(filter): Query<AuditFilter>,
) -> Response
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    respond(StatusCode::OK, desk.audit_trail(None, &filter))
}

pub(crate) async fn audit_export_handler<L, O>(
    State(desk): State<Arc<ListingDesk<L, O>>>,
    Path(listing_id): Path<String>,
    Query(filter): Query<AuditFilter>,
) -> Response
where
    L: AuditLog + 'static,
    O: Outbox + 'static,
{
    let id = ListingId(listing_id);
    let rendered = desk.audit_trail(Some(&id), &filter).and_then(|entries| {
        let mut buffer = Vec::new();
        export_csv(&entries, &mut buffer)?;
        Ok(buffer)
    });

    match rendered {
        Ok(csv) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{id}-audit.csv\""),
                ),
            ],
            csv,
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}
