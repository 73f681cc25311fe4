//! REST API for the invoice dashboard.
//!
//! Endpoints:
//! - `GET /api/health`: liveness plus bootstrap state
//! - `GET /api/customers`, `GET /api/revenue`, `GET /api/cards`
//! - `GET /api/invoices?query=&page=`, `GET /api/invoices/latest`,
//!   `GET /api/invoices/:id`, `DELETE /api/invoices/:id`
//! - `POST /api/invoices`: batch write endpoint used by the bulk import
//! - `POST /actions/invoices`, `POST /actions/invoices/:id`,
//!   `POST /actions/invoices/:id/delete`: server-side form actions
//! - `POST /api/login`
//! - `GET/POST /api/communications`, `POST /api/communications/:id/direction`,
//!   `DELETE /api/communications/:id`, `GET/PUT /api/settings`

mod error;

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::auth::{AuthenticatedUser, CredentialVerifier, Credentials};
use crate::bootstrap::BootstrapCoordinator;
use crate::communications::{CanMessage, CanMessageFields, CanSettings, CommunicationsStore};
use crate::forms::{self, FormState, InvoiceForm};
use crate::storage::store::dollars_to_cents;
use crate::storage::{
    CardData, CustomerField, DashboardStore, Invoice, InvoiceStatus, InvoiceSummary,
    LatestInvoice, NewInvoice, RevenueRow,
};

pub use error::{ApiError, ApiResult, ErrorResponse};

/// Where form actions send the browser after a successful write.
pub const INVOICES_PAGE: &str = "/dashboard/invoices";

/// Shared state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DashboardStore>,
    pub bootstrap: Arc<BootstrapCoordinator>,
    pub verifier: CredentialVerifier,
    pub communications: Arc<CommunicationsStore>,
}

impl AppState {
    /// State with a credential verifier over `store` and the sample CAN table.
    pub fn new(store: Arc<dyn DashboardStore>, bootstrap: Arc<BootstrapCoordinator>) -> Self {
        Self {
            verifier: CredentialVerifier::new(store.clone()),
            communications: Arc::new(CommunicationsStore::seeded()),
            store,
            bootstrap,
        }
    }
}

/// Bind `address` and serve the API until the process stops.
pub async fn serve(
    state: AppState,
    address: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = tokio::net::TcpListener::bind(address).await?;
    info!(address = %listener.local_addr()?, "REST API listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Build the axum router (separated for testing).
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/customers", get(customers))
        .route("/api/revenue", get(revenue))
        .route("/api/cards", get(cards))
        .route("/api/invoices", get(filtered_invoices).post(create_invoices))
        .route("/api/invoices/latest", get(latest_invoices))
        .route("/api/invoices/:id", get(invoice_by_id).delete(delete_invoice))
        .route("/actions/invoices", post(create_invoice_action))
        .route("/actions/invoices/:id", post(update_invoice_action))
        .route("/actions/invoices/:id/delete", post(delete_invoice_action))
        .route("/api/login", post(login))
        .route(
            "/api/communications",
            get(list_messages).post(create_message),
        )
        .route("/api/communications/:id", axum::routing::delete(delete_message))
        .route("/api/communications/:id/direction", post(toggle_direction))
        .route("/api/settings", get(settings).put(update_settings))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Dashboard reads
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = if state.bootstrap.is_initialized() {
        "initialized"
    } else {
        "pending"
    };
    Json(HealthResponse {
        status: "ok".to_string(),
        database: database.to_string(),
    })
}

async fn customers(State(state): State<AppState>) -> ApiResult<Json<Vec<CustomerField>>> {
    Ok(Json(state.store.fetch_customers().await?))
}

async fn revenue(State(state): State<AppState>) -> ApiResult<Json<Vec<RevenueRow>>> {
    Ok(Json(state.store.fetch_revenue().await?))
}

async fn cards(State(state): State<AppState>) -> ApiResult<Json<CardData>> {
    Ok(Json(state.store.fetch_card_data().await?))
}

async fn latest_invoices(State(state): State<AppState>) -> ApiResult<Json<Vec<LatestInvoice>>> {
    Ok(Json(state.store.fetch_latest_invoices().await?))
}

#[derive(Debug, Default, Deserialize)]
pub struct InvoiceSearch {
    pub query: Option<String>,
    pub page: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InvoicePage {
    pub invoices: Vec<InvoiceSummary>,
    pub total_pages: u64,
}

async fn filtered_invoices(
    State(state): State<AppState>,
    Query(search): Query<InvoiceSearch>,
) -> ApiResult<Json<InvoicePage>> {
    let query = search.query.unwrap_or_default();
    let page = search.page.unwrap_or(1).max(1);

    let (invoices, total_pages) = tokio::try_join!(
        state.store.fetch_filtered_invoices(&query, page),
        state.store.fetch_invoice_pages(&query),
    )?;

    Ok(Json(InvoicePage {
        invoices,
        total_pages,
    }))
}

async fn invoice_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Invoice>> {
    state
        .store
        .fetch_invoice_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Invoice {}", id)))
}

async fn delete_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if state.store.delete_invoice(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Invoice {}", id)))
    }
}

// ============================================================================
// Batch write endpoint
// ============================================================================

/// One invoice of a batch write. `amount` is in dollars.
#[derive(Debug, Deserialize)]
struct InvoiceItem {
    id: Option<Uuid>,
    customer_id: Uuid,
    amount: f64,
    status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub created: u64,
}

fn parse_item(index: usize, value: serde_json::Value) -> ApiResult<NewInvoice> {
    let invalid = |reason: String| ApiError::InvalidItem { index, reason };

    let item: InvoiceItem = serde_json::from_value(value).map_err(|e| invalid(e.to_string()))?;

    if !item.amount.is_finite() {
        return Err(invalid("amount must be a finite number".to_string()));
    }
    let amount = dollars_to_cents(item.amount);
    if amount <= 0 {
        return Err(invalid("amount must be at least one cent".to_string()));
    }
    if amount > i64::from(i32::MAX) {
        return Err(invalid("amount is too large".to_string()));
    }
    let status = item
        .status
        .parse::<InvoiceStatus>()
        .map_err(|_| invalid(format!("unknown status '{}'", item.status)))?;

    Ok(NewInvoice {
        id: item.id,
        customer_id: item.customer_id,
        amount,
        status,
        date: Utc::now().date_naive(),
    })
}

async fn create_invoices(
    State(state): State<AppState>,
    body: Result<Json<Vec<serde_json::Value>>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let Json(items) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    if items.is_empty() {
        return Err(ApiError::BadRequest("No invoices submitted".to_string()));
    }

    let invoices = items
        .into_iter()
        .enumerate()
        .map(|(index, value)| parse_item(index, value))
        .collect::<ApiResult<Vec<_>>>()?;

    let count = invoices.len();
    let created = state.store.create_invoices(invoices).await?;
    info!(submitted = count, created, "Invoice batch written");

    Ok((StatusCode::CREATED, Json(CreatedResponse { created })))
}

// ============================================================================
// Form actions
// ============================================================================

fn form_response(state: FormState) -> Response {
    let status = if state.is_database_error() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(state)).into_response()
}

async fn create_invoice_action(
    State(state): State<AppState>,
    Form(form): Form<InvoiceForm>,
) -> Response {
    match forms::create_invoice(state.store.as_ref(), &form).await {
        Ok(_) => Redirect::to(INVOICES_PAGE).into_response(),
        Err(form_state) => form_response(form_state),
    }
}

async fn update_invoice_action(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Form(form): Form<InvoiceForm>,
) -> Response {
    match forms::update_invoice(state.store.as_ref(), id, &form).await {
        Ok(true) => Redirect::to(INVOICES_PAGE).into_response(),
        Ok(false) => ApiError::NotFound(format!("Invoice {}", id)).into_response(),
        Err(form_state) => form_response(form_state),
    }
}

async fn delete_invoice_action(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match forms::delete_invoice(state.store.as_ref(), id).await {
        Ok(_) => Redirect::to(INVOICES_PAGE).into_response(),
        Err(form_state) => form_response(form_state),
    }
}

// ============================================================================
// Login
// ============================================================================

async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> ApiResult<Json<AuthenticatedUser>> {
    Ok(Json(state.verifier.verify(&credentials).await?))
}

// ============================================================================
// CAN communications
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct MessageSearch {
    pub search: Option<String>,
}

async fn list_messages(
    State(state): State<AppState>,
    Query(search): Query<MessageSearch>,
) -> Json<Vec<CanMessage>> {
    Json(state.communications.list(search.search.as_deref()).await)
}

async fn create_message(
    State(state): State<AppState>,
    Json(fields): Json<CanMessageFields>,
) -> ApiResult<(StatusCode, Json<CanMessage>)> {
    let message = state.communications.create(fields).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn toggle_direction(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> ApiResult<Json<CanMessage>> {
    Ok(Json(state.communications.toggle_direction(id).await?))
}

async fn delete_message(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> ApiResult<StatusCode> {
    state.communications.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn settings(State(state): State<AppState>) -> Json<CanSettings> {
    Json(state.communications.settings().await)
}

async fn update_settings(
    State(state): State<AppState>,
    Json(settings): Json<CanSettings>,
) -> ApiResult<Json<CanSettings>> {
    Ok(Json(state.communications.update_settings(settings).await?))
}
