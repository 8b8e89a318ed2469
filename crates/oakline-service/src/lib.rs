//! # Oakline Service
//!
//! HTTP surface for the Oakline investor portal. Every route is a thin
//! adapter over [`PortalEngine`]: extractors pull the actor and payload out
//! of the request, the engine enforces roles, ownership, and step order, and
//! domain errors map onto one JSON error envelope.
//!
//! The service is deliberately state-free beyond the shared engine handle, so
//! the router can be cloned per connection and exercised in-process by tests.

#![deny(unsafe_code)]

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;
use uuid::Uuid;

use oakline_core::{
    Account, ActivityRecord, ActorRole, ApplicationView, ConsultationRequest, ContactMessage,
    DeletionReport, DocumentRequest, InvestmentTerms, Notification, NotificationKind,
    PaymentRecord, PortalEngine, PortalError, PortalResult, StorageConfig,
};

pub const SERVICE_NAME: &str = "oakline-service";

/// Runtime configuration for the HTTP service.
#[derive(Debug, Default)]
pub struct ServiceConfig {
    pub storage: StorageConfig,
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ServiceState {
    pub engine: Arc<PortalEngine>,
}

impl ServiceState {
    pub async fn bootstrap(config: ServiceConfig) -> PortalResult<Self> {
        let engine = PortalEngine::bootstrap(config.storage).await?;
        Ok(Self {
            engine: Arc::new(engine),
        })
    }
}

// ── Error envelope ──────────────────────────────────────────────────────

/// Adapter from domain errors to HTTP responses. Every failure renders as
/// `{"error": "...", "code": "..."}` with the matching status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Portal(#[from] PortalError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let ApiError::Portal(err) = self;
        let (status, code) = match &err {
            PortalError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            PortalError::Unauthorized(_) => (StatusCode::FORBIDDEN, "unauthorized"),
            PortalError::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation"),
            PortalError::InvalidTransition(_) => (StatusCode::CONFLICT, "conflict"),
            PortalError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage"),
        };
        if status.is_server_error() {
            error!(error = %err, "request failed");
        }
        let body = Json(json!({ "error": err.to_string(), "code": code }));
        (status, body).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ── Request and response bodies ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RegisterAccountRequest {
    email: String,
    full_name: String,
    role: ActorRole,
}

#[derive(Debug, Deserialize)]
struct SubmitApplicationRequest {
    investor_id: Uuid,
    #[serde(flatten)]
    terms: InvestmentTerms,
}

/// Body for workflow transition calls: the acting account.
#[derive(Debug, Deserialize)]
struct ActorRequest {
    actor_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct ActorQuery {
    actor_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct PaymentRequest {
    actor_id: Uuid,
    amount: u64,
    memo: String,
}

#[derive(Debug, Deserialize)]
struct NotificationQuery {
    role: ActorRole,
    account_id: Option<Uuid>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct UnreadQuery {
    role: ActorRole,
    account_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct MarkAllRequest {
    role: ActorRole,
    account_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct DispatchRequest {
    application_id: Uuid,
    notification_type: NotificationKind,
}

#[derive(Debug, Deserialize)]
struct ConsultationBody {
    full_name: String,
    email: String,
    phone: Option<String>,
    topic: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ContactBody {
    name: String,
    email: String,
    subject: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct DocumentBody {
    account_id: Uuid,
    document_name: String,
}

#[derive(Debug, Deserialize)]
struct ResolveBody {
    actor_id: Uuid,
    approve: bool,
}

#[derive(Debug, Deserialize)]
struct DocumentScopeQuery {
    account_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
struct ActivityQuery {
    actor_id: Uuid,
    after: Option<u64>,
    limit: Option<usize>,
}

#[derive(Serialize)]
struct ItemList<T> {
    items: Vec<T>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    storage_backend: &'static str,
}

#[derive(Serialize)]
struct UnreadCountResponse {
    unread: u64,
}

#[derive(Serialize)]
struct MarkAllResponse {
    updated: u64,
}

#[derive(Serialize)]
struct DeletedResponse {
    deleted: Uuid,
}

// ── Router ──────────────────────────────────────────────────────────────

pub fn build_router(state: ServiceState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/accounts", post(register_account).get(list_accounts))
        .route("/accounts/:id", get(get_account))
        .route("/applications", post(submit_application).get(list_applications))
        .route("/applications/:id", get(get_application))
        .route("/applications/:id/sign-subscription", post(sign_subscription))
        .route(
            "/applications/:id/admin-sign-subscription",
            post(admin_sign_subscription),
        )
        .route("/applications/:id/promissory-note", post(create_promissory_note))
        .route(
            "/applications/:id/sign-promissory-note",
            post(sign_promissory_note),
        )
        .route(
            "/applications/:id/complete-wire-transfer",
            post(complete_wire_transfer),
        )
        .route(
            "/applications/:id/confirm-funds-received",
            post(confirm_funds_received),
        )
        .route(
            "/applications/:id/connect-bank-account",
            post(connect_bank_account),
        )
        .route(
            "/applications/:id/complete-admin-setup",
            post(complete_admin_setup),
        )
        .route("/applications/:id/mark-completed", post(mark_completed))
        .route("/applications/:id/cancel", post(cancel_application))
        .route(
            "/applications/:id/payments",
            get(list_payments).post(record_payment),
        )
        .route("/notifications", get(list_notifications))
        .route("/notifications/unread-count", get(unread_count))
        .route("/notifications/read-all", post(mark_all_read))
        .route("/notifications/dispatch", post(dispatch_notification))
        .route("/notifications/:id/read", post(mark_notification_read))
        .route("/consultations", post(submit_consultation).get(list_consultations))
        .route("/contact", post(submit_contact_message).get(list_contact_messages))
        .route("/documents", post(request_document).get(list_document_requests))
        .route("/documents/:id/resolve", post(resolve_document_request))
        .route("/admin/activity", get(list_activity))
        .route("/admin/users/:id", delete(delete_user))
        .route("/admin/investments/:id", delete(delete_investment))
        .route("/admin/consultations/:id", delete(delete_consultation))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Handlers ────────────────────────────────────────────────────────────

async fn health(State(state): State<ServiceState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: SERVICE_NAME,
        storage_backend: state.engine.backend_label(),
    })
}

async fn register_account(
    State(state): State<ServiceState>,
    Json(body): Json<RegisterAccountRequest>,
) -> ApiResult<Account> {
    Ok(Json(
        state
            .engine
            .register_account(body.email, body.full_name, body.role)
            .await?,
    ))
}

async fn list_accounts(
    State(state): State<ServiceState>,
    Query(query): Query<ActorQuery>,
) -> ApiResult<ItemList<Account>> {
    let items = state.engine.list_accounts(query.actor_id).await?;
    Ok(Json(ItemList { items }))
}

async fn get_account(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Account> {
    Ok(Json(state.engine.get_account(id).await?))
}

async fn submit_application(
    State(state): State<ServiceState>,
    Json(body): Json<SubmitApplicationRequest>,
) -> ApiResult<ApplicationView> {
    Ok(Json(
        state
            .engine
            .submit_application(body.investor_id, body.terms)
            .await?,
    ))
}

async fn list_applications(
    State(state): State<ServiceState>,
    Query(query): Query<ActorQuery>,
) -> ApiResult<ItemList<ApplicationView>> {
    let items = state.engine.list_applications(query.actor_id).await?;
    Ok(Json(ItemList { items }))
}

async fn get_application(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ApplicationView> {
    Ok(Json(state.engine.get_application(id).await?))
}

async fn sign_subscription(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ActorRequest>,
) -> ApiResult<ApplicationView> {
    Ok(Json(state.engine.sign_subscription(id, body.actor_id).await?))
}

async fn admin_sign_subscription(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ActorRequest>,
) -> ApiResult<ApplicationView> {
    Ok(Json(
        state.engine.admin_sign_subscription(id, body.actor_id).await?,
    ))
}

async fn create_promissory_note(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ActorRequest>,
) -> ApiResult<ApplicationView> {
    Ok(Json(
        state.engine.create_promissory_note(id, body.actor_id).await?,
    ))
}

async fn sign_promissory_note(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ActorRequest>,
) -> ApiResult<ApplicationView> {
    Ok(Json(
        state.engine.sign_promissory_note(id, body.actor_id).await?,
    ))
}

async fn complete_wire_transfer(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ActorRequest>,
) -> ApiResult<ApplicationView> {
    Ok(Json(
        state.engine.complete_wire_transfer(id, body.actor_id).await?,
    ))
}

async fn confirm_funds_received(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ActorRequest>,
) -> ApiResult<ApplicationView> {
    Ok(Json(
        state.engine.confirm_funds_received(id, body.actor_id).await?,
    ))
}

async fn connect_bank_account(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ActorRequest>,
) -> ApiResult<ApplicationView> {
    Ok(Json(
        state.engine.connect_bank_account(id, body.actor_id).await?,
    ))
}

async fn complete_admin_setup(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ActorRequest>,
) -> ApiResult<ApplicationView> {
    Ok(Json(
        state.engine.complete_admin_setup(id, body.actor_id).await?,
    ))
}

async fn mark_completed(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ActorRequest>,
) -> ApiResult<ApplicationView> {
    Ok(Json(state.engine.mark_completed(id, body.actor_id).await?))
}

async fn cancel_application(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ActorRequest>,
) -> ApiResult<ApplicationView> {
    Ok(Json(state.engine.cancel_application(id, body.actor_id).await?))
}

async fn list_payments(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ItemList<PaymentRecord>> {
    let items = state.engine.list_payments(id).await?;
    Ok(Json(ItemList { items }))
}

async fn record_payment(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
    Json(body): Json<PaymentRequest>,
) -> ApiResult<PaymentRecord> {
    Ok(Json(
        state
            .engine
            .record_payment(body.actor_id, id, body.amount, body.memo)
            .await?,
    ))
}

async fn list_notifications(
    State(state): State<ServiceState>,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<ItemList<Notification>> {
    let limit = query.limit.unwrap_or(50).min(200);
    let items = state
        .engine
        .list_notifications(query.role, query.account_id, limit)
        .await?;
    Ok(Json(ItemList { items }))
}

async fn unread_count(
    State(state): State<ServiceState>,
    Query(query): Query<UnreadQuery>,
) -> ApiResult<UnreadCountResponse> {
    let unread = state.engine.unread_count(query.role, query.account_id).await?;
    Ok(Json(UnreadCountResponse { unread }))
}

async fn mark_notification_read(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Notification> {
    Ok(Json(state.engine.mark_notification_read(id).await?))
}

async fn mark_all_read(
    State(state): State<ServiceState>,
    Json(body): Json<MarkAllRequest>,
) -> ApiResult<MarkAllResponse> {
    let updated = state
        .engine
        .mark_all_notifications_read(body.role, body.account_id)
        .await?;
    Ok(Json(MarkAllResponse { updated }))
}

async fn dispatch_notification(
    State(state): State<ServiceState>,
    Json(body): Json<DispatchRequest>,
) -> ApiResult<Notification> {
    Ok(Json(
        state
            .engine
            .dispatch_notification(body.application_id, body.notification_type)
            .await?,
    ))
}

async fn submit_consultation(
    State(state): State<ServiceState>,
    Json(body): Json<ConsultationBody>,
) -> ApiResult<ConsultationRequest> {
    let mut request =
        ConsultationRequest::new(body.full_name, body.email, body.topic, body.message);
    if let Some(phone) = body.phone {
        request = request.with_phone(phone);
    }
    Ok(Json(state.engine.submit_consultation(request).await?))
}

async fn list_consultations(
    State(state): State<ServiceState>,
    Query(query): Query<ActorQuery>,
) -> ApiResult<ItemList<ConsultationRequest>> {
    let items = state.engine.list_consultations(query.actor_id).await?;
    Ok(Json(ItemList { items }))
}

async fn submit_contact_message(
    State(state): State<ServiceState>,
    Json(body): Json<ContactBody>,
) -> ApiResult<ContactMessage> {
    let message = ContactMessage::new(body.name, body.email, body.subject, body.message);
    Ok(Json(state.engine.submit_contact_message(message).await?))
}

async fn list_contact_messages(
    State(state): State<ServiceState>,
    Query(query): Query<ActorQuery>,
) -> ApiResult<ItemList<ContactMessage>> {
    let items = state.engine.list_contact_messages(query.actor_id).await?;
    Ok(Json(ItemList { items }))
}

async fn request_document(
    State(state): State<ServiceState>,
    Json(body): Json<DocumentBody>,
) -> ApiResult<DocumentRequest> {
    Ok(Json(
        state
            .engine
            .request_document(body.account_id, body.document_name)
            .await?,
    ))
}

async fn list_document_requests(
    State(state): State<ServiceState>,
    Query(query): Query<DocumentScopeQuery>,
) -> ApiResult<ItemList<DocumentRequest>> {
    let items = state.engine.list_document_requests(query.account_id).await?;
    Ok(Json(ItemList { items }))
}

async fn resolve_document_request(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
    Json(body): Json<ResolveBody>,
) -> ApiResult<DocumentRequest> {
    Ok(Json(
        state
            .engine
            .resolve_document_request(body.actor_id, id, body.approve)
            .await?,
    ))
}

async fn list_activity(
    State(state): State<ServiceState>,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<ItemList<ActivityRecord>> {
    let limit = query.limit.unwrap_or(100).min(500);
    let items = state
        .engine
        .list_activity(query.actor_id, query.after, limit)
        .await?;
    Ok(Json(ItemList { items }))
}

async fn delete_user(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ActorQuery>,
) -> ApiResult<DeletionReport> {
    Ok(Json(state.engine.delete_user(query.actor_id, id).await?))
}

async fn delete_investment(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ActorQuery>,
) -> ApiResult<DeletionReport> {
    Ok(Json(state.engine.delete_investment(query.actor_id, id).await?))
}

async fn delete_consultation(
    State(state): State<ServiceState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ActorQuery>,
) -> ApiResult<DeletedResponse> {
    state.engine.delete_consultation(query.actor_id, id).await?;
    Ok(Json(DeletedResponse { deleted: id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    async fn portal() -> Router {
        let state = ServiceState::bootstrap(ServiceConfig::default()).await.unwrap();
        build_router(state)
    }

    async fn send(
        router: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn register(router: &Router, email: &str, name: &str, role: &str) -> Uuid {
        let (status, body) = send(
            router,
            Method::POST,
            "/accounts",
            Some(json!({ "email": email, "full_name": name, "role": role })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "registration failed: {body}");
        body["id"].as_str().unwrap().parse().unwrap()
    }

    async fn open_application(router: &Router, investor: Uuid) -> Uuid {
        let (status, body) = send(
            router,
            Method::POST,
            "/applications",
            Some(json!({
                "investor_id": investor,
                "investment_amount": 250_000,
                "annual_percentage": 12.0,
                "payment_frequency": "monthly",
                "term_months": 24,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "submission failed: {body}");
        body["id"].as_str().unwrap().parse().unwrap()
    }

    async fn transition(router: &Router, app: Uuid, action: &str, actor: Uuid) -> (StatusCode, Value) {
        send(
            router,
            Method::POST,
            &format!("/applications/{app}/{action}"),
            Some(json!({ "actor_id": actor })),
        )
        .await
    }

    #[tokio::test]
    async fn health_reports_the_storage_backend() {
        let router = portal().await;
        let (status, body) = send(&router, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "oakline-service");
        assert_eq!(body["storage_backend"], "memory");
    }

    #[tokio::test]
    async fn application_lifecycle_over_rest() {
        let router = portal().await;
        let investor = register(&router, "ava@example.com", "Ava Chen", "user").await;
        let admin = register(&router, "ops@oakline.example", "Site Operations", "admin").await;
        let app = open_application(&router, investor).await;

        let steps = [
            ("sign-subscription", investor),
            ("admin-sign-subscription", admin),
            ("promissory-note", admin),
            ("sign-promissory-note", investor),
            ("complete-wire-transfer", investor),
            ("confirm-funds-received", admin),
            ("connect-bank-account", investor),
            ("complete-admin-setup", admin),
        ];
        for (action, actor) in steps {
            let (status, body) = transition(&router, app, action, actor).await;
            assert_eq!(status, StatusCode::OK, "{action} failed: {body}");
        }

        let (status, body) = send(&router, Method::GET, &format!("/applications/{app}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["current_step"], "active");
        assert_eq!(body["progress_percentage"], 100);
        assert_eq!(body["display_text"], "Investment Active");
        assert_eq!(body["funds_received"], true);

        let (status, body) = transition(&router, app, "mark-completed", admin).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["current_step"], "completed");
    }

    #[test]
    fn api_errors_keep_the_domain_message() {
        let err = ApiError::from(PortalError::not_found("account", "a1b2"));
        assert_eq!(err.to_string(), "Not found: account 'a1b2' not found");

        let ApiError::Portal(inner) = ApiError::from(PortalError::step_conflict(
            "subscription_pending",
            "active",
        ));
        assert!(matches!(inner, PortalError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn wrong_role_returns_forbidden() {
        let router = portal().await;
        let investor = register(&router, "ava@example.com", "Ava Chen", "user").await;
        register(&router, "ops@oakline.example", "Site Operations", "admin").await;
        let app = open_application(&router, investor).await;

        let (status, body) = transition(&router, app, "admin-sign-subscription", investor).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "unauthorized");
    }

    #[tokio::test]
    async fn doubled_transition_returns_conflict() {
        let router = portal().await;
        let investor = register(&router, "ava@example.com", "Ava Chen", "user").await;
        register(&router, "ops@oakline.example", "Site Operations", "admin").await;
        let app = open_application(&router, investor).await;

        let (status, _) = transition(&router, app, "sign-subscription", investor).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = transition(&router, app, "sign-subscription", investor).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "conflict");
        assert!(body["error"].as_str().unwrap().contains("step order violation"));
    }

    #[tokio::test]
    async fn unknown_application_returns_not_found() {
        let router = portal().await;
        let missing = Uuid::new_v4();
        let (status, body) =
            send(&router, Method::GET, &format!("/applications/{missing}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
    }

    #[tokio::test]
    async fn invalid_terms_are_rejected() {
        let router = portal().await;
        let investor = register(&router, "ava@example.com", "Ava Chen", "user").await;
        let (status, body) = send(
            &router,
            Method::POST,
            "/applications",
            Some(json!({
                "investor_id": investor,
                "investment_amount": 0,
                "annual_percentage": 12.0,
                "payment_frequency": "monthly",
                "term_months": 24,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "validation");
    }

    #[tokio::test]
    async fn malformed_ids_are_rejected() {
        let router = portal().await;
        let (status, _) = send(&router, Method::GET, "/applications/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn notification_endpoints_track_reads() {
        let router = portal().await;
        let investor = register(&router, "ava@example.com", "Ava Chen", "user").await;
        register(&router, "ops@oakline.example", "Site Operations", "admin").await;
        let app = open_application(&router, investor).await;
        transition(&router, app, "sign-subscription", investor).await;

        let (status, body) =
            send(&router, Method::GET, "/notifications?role=admin&limit=10", None).await;
        assert_eq!(status, StatusCode::OK);
        let items = body["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        let first_id = items[0]["id"].as_str().unwrap().to_string();

        let (status, body) =
            send(&router, Method::GET, "/notifications/unread-count?role=admin", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["unread"], 2);

        let (status, body) = send(
            &router,
            Method::POST,
            &format!("/notifications/{first_id}/read"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_read"], true);

        let (status, body) = send(
            &router,
            Method::POST,
            "/notifications/read-all",
            Some(json!({ "role": "admin" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["updated"], 1);

        let (_, body) =
            send(&router, Method::GET, "/notifications/unread-count?role=admin", None).await;
        assert_eq!(body["unread"], 0);
    }

    #[tokio::test]
    async fn dispatch_advances_the_workflow() {
        let router = portal().await;
        let investor = register(&router, "ava@example.com", "Ava Chen", "user").await;
        let admin = register(&router, "ops@oakline.example", "Site Operations", "admin").await;
        let app = open_application(&router, investor).await;
        transition(&router, app, "sign-subscription", investor).await;
        transition(&router, app, "admin-sign-subscription", admin).await;
        transition(&router, app, "promissory-note", admin).await;

        let dispatch = json!({
            "application_id": app,
            "notification_type": "promissory_note_signed",
        });
        let (status, _) = send(
            &router,
            Method::POST,
            "/notifications/dispatch",
            Some(dispatch.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&router, Method::GET, &format!("/applications/{app}"), None).await;
        assert_eq!(body["current_step"], "funds_pending");

        let (status, body) = send(
            &router,
            Method::POST,
            "/notifications/dispatch",
            Some(dispatch),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "conflict");
    }

    #[tokio::test]
    async fn delete_user_requires_admin_over_rest() {
        let router = portal().await;
        let investor = register(&router, "ava@example.com", "Ava Chen", "user").await;
        let admin = register(&router, "ops@oakline.example", "Site Operations", "admin").await;
        let other = register(&router, "noor@example.com", "Noor Haddad", "user").await;

        let (status, body) = send(
            &router,
            Method::DELETE,
            &format!("/admin/users/{other}?actor_id={investor}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "unauthorized");

        let (status, body) = send(
            &router,
            Method::DELETE,
            &format!("/admin/users/{other}?actor_id={admin}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted_id"], other.to_string());

        let (status, _) =
            send(&router, Method::GET, &format!("/accounts/{other}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn payments_over_rest_require_an_active_investment() {
        let router = portal().await;
        let investor = register(&router, "ava@example.com", "Ava Chen", "user").await;
        let admin = register(&router, "ops@oakline.example", "Site Operations", "admin").await;
        let app = open_application(&router, investor).await;

        let (status, body) = send(
            &router,
            Method::POST,
            &format!("/applications/{app}/payments"),
            Some(json!({ "actor_id": admin, "amount": 2_500, "memo": "monthly payout" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "conflict");

        let steps = [
            ("sign-subscription", investor),
            ("admin-sign-subscription", admin),
            ("promissory-note", admin),
            ("sign-promissory-note", investor),
            ("complete-wire-transfer", investor),
            ("confirm-funds-received", admin),
            ("connect-bank-account", investor),
            ("complete-admin-setup", admin),
        ];
        for (action, actor) in steps {
            transition(&router, app, action, actor).await;
        }

        let (status, body) = send(
            &router,
            Method::POST,
            &format!("/applications/{app}/payments"),
            Some(json!({ "actor_id": admin, "amount": 2_500, "memo": "monthly payout" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["amount"], 2_500);

        let (status, body) = send(
            &router,
            Method::GET,
            &format!("/applications/{app}/payments"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn consultation_intake_roundtrip() {
        let router = portal().await;
        let admin = register(&router, "ops@oakline.example", "Site Operations", "admin").await;

        let (status, body) = send(
            &router,
            Method::POST,
            "/consultations",
            Some(json!({
                "full_name": "Sam Porter",
                "email": "sam@example.com",
                "phone": "555-0142",
                "topic": "Self-directed IRA",
                "message": "Can I invest through my IRA?",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let consultation_id = body["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &router,
            Method::GET,
            &format!("/consultations?actor_id={admin}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"].as_array().unwrap().len(), 1);

        let (status, body) = send(
            &router,
            Method::DELETE,
            &format!("/admin/consultations/{consultation_id}?actor_id={admin}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted"], consultation_id);
    }

    #[tokio::test]
    async fn document_flow_over_rest() {
        let router = portal().await;
        let investor = register(&router, "ava@example.com", "Ava Chen", "user").await;
        let admin = register(&router, "ops@oakline.example", "Site Operations", "admin").await;

        let (status, body) = send(
            &router,
            Method::POST,
            "/documents",
            Some(json!({ "account_id": investor, "document_name": "2025 K-1 Statement" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "pending");
        let request_id = body["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &router,
            Method::POST,
            &format!("/documents/{request_id}/resolve"),
            Some(json!({ "actor_id": admin, "approve": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "approved");

        let (status, body) = send(
            &router,
            Method::GET,
            &format!("/documents?account_id={investor}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"].as_array().unwrap().len(), 1);

        let (_, body) = send(
            &router,
            Method::GET,
            &format!("/notifications?role=user&account_id={investor}"),
            None,
        )
        .await;
        assert_eq!(body["items"][0]["kind"], "document_approved");
    }
}
