use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::booking::BookingError;
use super::dispatch::{GeoVerifier, NotificationPublisher};
use super::domain::{AgentId, LeadId, PaymentPlan, QuoteId, UnitId, VisitId, VisitStatus};
use super::handover::{CheckInError, CheckInRequest, GatePassError, VisitError};
use super::intake::{IntakeError, LeadIntake};
use super::inventory::InventoryError;
use super::quote::{DiscountInput, QuoteError};
use super::repository::{
    AgentRepository, BookingRepository, LeadRepository, UnitRepository,
};
use super::service::{PipelineError, PipelineService};
use super::stages::{Disposition, QuickAction};

/// Router builder exposing the pipeline operations over HTTP.
pub fn pipeline_router<L, A, U, B, N, G>(
    service: Arc<PipelineService<L, A, U, B, N, G>>,
) -> Router
where
    L: LeadRepository + 'static,
    A: AgentRepository + 'static,
    U: UnitRepository + 'static,
    B: BookingRepository + 'static,
    N: NotificationPublisher + 'static,
    G: GeoVerifier + 'static,
{
    Router::new()
        .route("/api/v1/leads", post(intake_handler::<L, A, U, B, N, G>))
        .route(
            "/api/v1/leads/:lead_id",
            get(lead_status_handler::<L, A, U, B, N, G>),
        )
        .route(
            "/api/v1/leads/:lead_id/disposition",
            post(disposition_handler::<L, A, U, B, N, G>),
        )
        .route(
            "/api/v1/leads/:lead_id/quick-action",
            post(quick_action_handler::<L, A, U, B, N, G>),
        )
        .route(
            "/api/v1/leads/:lead_id/quotes",
            post(generate_quote_handler::<L, A, U, B, N, G>),
        )
        .route(
            "/api/v1/leads/:lead_id/quotes/:quote_id/approve",
            post(approve_quote_handler::<L, A, U, B, N, G>),
        )
        .route(
            "/api/v1/leads/:lead_id/quotes/:quote_id/reject",
            post(reject_quote_handler::<L, A, U, B, N, G>),
        )
        .route(
            "/api/v1/leads/:lead_id/book",
            post(book_handler::<L, A, U, B, N, G>),
        )
        .route(
            "/api/v1/leads/:lead_id/gate-pass",
            post(issue_gate_pass_handler::<L, A, U, B, N, G>),
        )
        .route(
            "/api/v1/leads/:lead_id/visits/:visit_id",
            post(advance_visit_handler::<L, A, U, B, N, G>),
        )
        .route(
            "/api/v1/reception/check-in",
            post(check_in_handler::<L, A, U, B, N, G>),
        )
        .route(
            "/api/v1/reception/gate-pass",
            post(scan_gate_pass_handler::<L, A, U, B, N, G>),
        )
        .route(
            "/api/v1/units/:unit_id/cost-sheet",
            post(cost_sheet_handler::<L, A, U, B, N, G>),
        )
        .route(
            "/api/v1/units/:unit_id/block",
            post(block_unit_handler::<L, A, U, B, N, G>),
        )
        .route(
            "/api/v1/units/:unit_id/release",
            post(release_unit_handler::<L, A, U, B, N, G>),
        )
        .with_state(service)
}

/// Map a pipeline failure to an HTTP status plus a machine-readable reason
/// code. Callers show different remediation per reason, so "already sold",
/// "quote stale", and "quote not approved" must never collapse together.
pub fn status_and_reason(error: &PipelineError) -> (StatusCode, &'static str) {
    match error {
        PipelineError::LeadNotFound => (StatusCode::NOT_FOUND, "lead_not_found"),
        PipelineError::Intake(IntakeError::DuplicateLead) => {
            (StatusCode::CONFLICT, "duplicate_lead")
        }
        PipelineError::Intake(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation"),
        PipelineError::Stage(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_transition"),
        PipelineError::Quote(QuoteError::QuoteNotFound) => {
            (StatusCode::NOT_FOUND, "quote_not_found")
        }
        PipelineError::Quote(QuoteError::NotPendingApproval(_))
        | PipelineError::Quote(QuoteError::NotRejectable(_)) => {
            (StatusCode::CONFLICT, "quote_state")
        }
        PipelineError::Quote(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation"),
        PipelineError::Inventory(InventoryError::UnitNotFound) => {
            (StatusCode::NOT_FOUND, "unit_not_found")
        }
        PipelineError::Inventory(InventoryError::NotAvailable(_)) => {
            (StatusCode::CONFLICT, "unit_not_available")
        }
        PipelineError::Inventory(InventoryError::NotBlocked(_)) => {
            (StatusCode::CONFLICT, "unit_not_blocked")
        }
        PipelineError::Inventory(InventoryError::AlreadySold) => {
            (StatusCode::CONFLICT, "unit_already_sold")
        }
        PipelineError::Inventory(InventoryError::StaleWrite) => {
            (StatusCode::CONFLICT, "stale_write")
        }
        PipelineError::Inventory(InventoryError::Repository(_)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "repository")
        }
        PipelineError::CheckIn(CheckInError::SourceConflict { .. }) => {
            (StatusCode::CONFLICT, "source_conflict")
        }
        PipelineError::CheckIn(CheckInError::Intake(_)) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "validation")
        }
        PipelineError::CheckIn(CheckInError::Repository(_)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "repository")
        }
        PipelineError::GatePass(GatePassError::NotFound) => {
            (StatusCode::NOT_FOUND, "gate_pass_not_found")
        }
        PipelineError::GatePass(GatePassError::AlreadyUsed) => {
            (StatusCode::CONFLICT, "gate_pass_used")
        }
        PipelineError::GatePass(GatePassError::Expired) => {
            (StatusCode::CONFLICT, "gate_pass_expired")
        }
        PipelineError::GatePass(GatePassError::Repository(_)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "repository")
        }
        PipelineError::Visit(VisitError::LeadNotFound) => {
            (StatusCode::NOT_FOUND, "lead_not_found")
        }
        PipelineError::Visit(VisitError::VisitNotFound) => {
            (StatusCode::NOT_FOUND, "visit_not_found")
        }
        PipelineError::Visit(VisitError::InvalidTransition { .. }) => {
            (StatusCode::CONFLICT, "visit_state")
        }
        PipelineError::Visit(VisitError::Repository(_)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "repository")
        }
        PipelineError::Booking(BookingError::LeadNotFound) => {
            (StatusCode::NOT_FOUND, "lead_not_found")
        }
        PipelineError::Booking(BookingError::QuoteNotFound) => {
            (StatusCode::NOT_FOUND, "quote_not_found")
        }
        PipelineError::Booking(BookingError::QuoteNotApproved(_)) => {
            (StatusCode::CONFLICT, "quote_not_approved")
        }
        PipelineError::Booking(BookingError::QuoteExpired) => {
            (StatusCode::CONFLICT, "quote_expired")
        }
        PipelineError::Booking(BookingError::UnitAlreadySold) => {
            (StatusCode::CONFLICT, "unit_already_sold")
        }
        PipelineError::Booking(BookingError::Inventory(InventoryError::StaleWrite)) => {
            (StatusCode::CONFLICT, "stale_write")
        }
        PipelineError::Booking(_) => (StatusCode::INTERNAL_SERVER_ERROR, "repository"),
        PipelineError::Repository(_) => (StatusCode::INTERNAL_SERVER_ERROR, "repository"),
    }
}

fn error_response(error: PipelineError) -> Response {
    let (status, reason) = status_and_reason(&error);
    let payload = json!({
        "error": error.to_string(),
        "reason": reason,
    });
    (status, axum::Json(payload)).into_response()
}

#[derive(Debug, Deserialize)]
pub(crate) struct DispositionRequest {
    pub(crate) author: String,
    #[serde(flatten)]
    pub(crate) disposition: Disposition,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuickActionRequest {
    pub(crate) author: String,
    pub(crate) action: QuickAction,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuoteRequest {
    pub(crate) unit_id: String,
    pub(crate) discount_per_area: i64,
    #[serde(default)]
    pub(crate) include_parking: bool,
    pub(crate) payment_plan: PaymentPlan,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CostSheetRequest {
    pub(crate) discount_per_area: i64,
    #[serde(default)]
    pub(crate) include_parking: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GatePassScanRequest {
    pub(crate) token: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BlockRequest {
    pub(crate) agent_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BookRequest {
    pub(crate) quote_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VisitAdvanceRequest {
    pub(crate) status: VisitStatus,
}

pub(crate) async fn intake_handler<L, A, U, B, N, G>(
    State(service): State<Arc<PipelineService<L, A, U, B, N, G>>>,
    axum::Json(intake): axum::Json<LeadIntake>,
) -> Response
where
    L: LeadRepository + 'static,
    A: AgentRepository + 'static,
    U: UnitRepository + 'static,
    B: BookingRepository + 'static,
    N: NotificationPublisher + 'static,
    G: GeoVerifier + 'static,
{
    match service.intake_lead(intake, Utc::now()) {
        Ok(lead) => (StatusCode::CREATED, axum::Json(lead.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn lead_status_handler<L, A, U, B, N, G>(
    State(service): State<Arc<PipelineService<L, A, U, B, N, G>>>,
    Path(lead_id): Path<String>,
) -> Response
where
    L: LeadRepository + 'static,
    A: AgentRepository + 'static,
    U: UnitRepository + 'static,
    B: BookingRepository + 'static,
    N: NotificationPublisher + 'static,
    G: GeoVerifier + 'static,
{
    match service.get_lead(&LeadId(lead_id)) {
        Ok(lead) => (StatusCode::OK, axum::Json(lead.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn disposition_handler<L, A, U, B, N, G>(
    State(service): State<Arc<PipelineService<L, A, U, B, N, G>>>,
    Path(lead_id): Path<String>,
    axum::Json(request): axum::Json<DispositionRequest>,
) -> Response
where
    L: LeadRepository + 'static,
    A: AgentRepository + 'static,
    U: UnitRepository + 'static,
    B: BookingRepository + 'static,
    N: NotificationPublisher + 'static,
    G: GeoVerifier + 'static,
{
    match service.disposition(
        &LeadId(lead_id),
        request.disposition,
        &request.author,
        Utc::now(),
    ) {
        Ok(lead) => (StatusCode::OK, axum::Json(lead.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn quick_action_handler<L, A, U, B, N, G>(
    State(service): State<Arc<PipelineService<L, A, U, B, N, G>>>,
    Path(lead_id): Path<String>,
    axum::Json(request): axum::Json<QuickActionRequest>,
) -> Response
where
    L: LeadRepository + 'static,
    A: AgentRepository + 'static,
    U: UnitRepository + 'static,
    B: BookingRepository + 'static,
    N: NotificationPublisher + 'static,
    G: GeoVerifier + 'static,
{
    match service.quick_action(&LeadId(lead_id), request.action, &request.author, Utc::now()) {
        Ok(lead) => (StatusCode::OK, axum::Json(lead.status_view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn generate_quote_handler<L, A, U, B, N, G>(
    State(service): State<Arc<PipelineService<L, A, U, B, N, G>>>,
    Path(lead_id): Path<String>,
    axum::Json(request): axum::Json<QuoteRequest>,
) -> Response
where
    L: LeadRepository + 'static,
    A: AgentRepository + 'static,
    U: UnitRepository + 'static,
    B: BookingRepository + 'static,
    N: NotificationPublisher + 'static,
    G: GeoVerifier + 'static,
{
    let discount = DiscountInput {
        per_area: request.discount_per_area,
        include_parking: request.include_parking,
    };
    match service.generate_quote(
        &LeadId(lead_id),
        &UnitId(request.unit_id),
        discount,
        request.payment_plan,
        Utc::now(),
    ) {
        Ok(quote) => (StatusCode::CREATED, axum::Json(quote)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn approve_quote_handler<L, A, U, B, N, G>(
    State(service): State<Arc<PipelineService<L, A, U, B, N, G>>>,
    Path((lead_id, quote_id)): Path<(String, String)>,
) -> Response
where
    L: LeadRepository + 'static,
    A: AgentRepository + 'static,
    U: UnitRepository + 'static,
    B: BookingRepository + 'static,
    N: NotificationPublisher + 'static,
    G: GeoVerifier + 'static,
{
    match service.approve_quote(&LeadId(lead_id), &QuoteId(quote_id), Utc::now()) {
        Ok(quote) => (StatusCode::OK, axum::Json(quote)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn reject_quote_handler<L, A, U, B, N, G>(
    State(service): State<Arc<PipelineService<L, A, U, B, N, G>>>,
    Path((lead_id, quote_id)): Path<(String, String)>,
) -> Response
where
    L: LeadRepository + 'static,
    A: AgentRepository + 'static,
    U: UnitRepository + 'static,
    B: BookingRepository + 'static,
    N: NotificationPublisher + 'static,
    G: GeoVerifier + 'static,
{
    match service.reject_quote(&LeadId(lead_id), &QuoteId(quote_id), Utc::now()) {
        Ok(quote) => (StatusCode::OK, axum::Json(quote)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn book_handler<L, A, U, B, N, G>(
    State(service): State<Arc<PipelineService<L, A, U, B, N, G>>>,
    Path(lead_id): Path<String>,
    axum::Json(request): axum::Json<BookRequest>,
) -> Response
where
    L: LeadRepository + 'static,
    A: AgentRepository + 'static,
    U: UnitRepository + 'static,
    B: BookingRepository + 'static,
    N: NotificationPublisher + 'static,
    G: GeoVerifier + 'static,
{
    match service.finalize_booking(&LeadId(lead_id), &QuoteId(request.quote_id), Utc::now()) {
        Ok(outcome) => {
            let payload = json!({
                "booking": outcome.booking,
                "warnings": outcome.warnings,
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn issue_gate_pass_handler<L, A, U, B, N, G>(
    State(service): State<Arc<PipelineService<L, A, U, B, N, G>>>,
    Path(lead_id): Path<String>,
) -> Response
where
    L: LeadRepository + 'static,
    A: AgentRepository + 'static,
    U: UnitRepository + 'static,
    B: BookingRepository + 'static,
    N: NotificationPublisher + 'static,
    G: GeoVerifier + 'static,
{
    match service.issue_gate_pass(&LeadId(lead_id), Utc::now()) {
        Ok(pass) => (StatusCode::CREATED, axum::Json(pass)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn advance_visit_handler<L, A, U, B, N, G>(
    State(service): State<Arc<PipelineService<L, A, U, B, N, G>>>,
    Path((lead_id, visit_id)): Path<(String, String)>,
    axum::Json(request): axum::Json<VisitAdvanceRequest>,
) -> Response
where
    L: LeadRepository + 'static,
    A: AgentRepository + 'static,
    U: UnitRepository + 'static,
    B: BookingRepository + 'static,
    N: NotificationPublisher + 'static,
    G: GeoVerifier + 'static,
{
    match service.advance_visit(&LeadId(lead_id), &VisitId(visit_id), request.status) {
        Ok(visit) => (StatusCode::OK, axum::Json(visit)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn check_in_handler<L, A, U, B, N, G>(
    State(service): State<Arc<PipelineService<L, A, U, B, N, G>>>,
    axum::Json(request): axum::Json<CheckInRequest>,
) -> Response
where
    L: LeadRepository + 'static,
    A: AgentRepository + 'static,
    U: UnitRepository + 'static,
    B: BookingRepository + 'static,
    N: NotificationPublisher + 'static,
    G: GeoVerifier + 'static,
{
    match service.check_in(request, Utc::now()) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn scan_gate_pass_handler<L, A, U, B, N, G>(
    State(service): State<Arc<PipelineService<L, A, U, B, N, G>>>,
    axum::Json(request): axum::Json<GatePassScanRequest>,
) -> Response
where
    L: LeadRepository + 'static,
    A: AgentRepository + 'static,
    U: UnitRepository + 'static,
    B: BookingRepository + 'static,
    N: NotificationPublisher + 'static,
    G: GeoVerifier + 'static,
{
    match service.scan_gate_pass(&request.token, Utc::now()) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn cost_sheet_handler<L, A, U, B, N, G>(
    State(service): State<Arc<PipelineService<L, A, U, B, N, G>>>,
    Path(unit_id): Path<String>,
    axum::Json(request): axum::Json<CostSheetRequest>,
) -> Response
where
    L: LeadRepository + 'static,
    A: AgentRepository + 'static,
    U: UnitRepository + 'static,
    B: BookingRepository + 'static,
    N: NotificationPublisher + 'static,
    G: GeoVerifier + 'static,
{
    let discount = DiscountInput {
        per_area: request.discount_per_area,
        include_parking: request.include_parking,
    };
    match service.preview_cost_sheet(&UnitId(unit_id), discount) {
        Ok(sheet) => (StatusCode::OK, axum::Json(sheet)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn block_unit_handler<L, A, U, B, N, G>(
    State(service): State<Arc<PipelineService<L, A, U, B, N, G>>>,
    Path(unit_id): Path<String>,
    axum::Json(request): axum::Json<BlockRequest>,
) -> Response
where
    L: LeadRepository + 'static,
    A: AgentRepository + 'static,
    U: UnitRepository + 'static,
    B: BookingRepository + 'static,
    N: NotificationPublisher + 'static,
    G: GeoVerifier + 'static,
{
    match service.block_unit(&UnitId(unit_id), AgentId(request.agent_id), Utc::now()) {
        Ok(unit) => (StatusCode::OK, axum::Json(unit)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn release_unit_handler<L, A, U, B, N, G>(
    State(service): State<Arc<PipelineService<L, A, U, B, N, G>>>,
    Path(unit_id): Path<String>,
) -> Response
where
    L: LeadRepository + 'static,
    A: AgentRepository + 'static,
    U: UnitRepository + 'static,
    B: BookingRepository + 'static,
    N: NotificationPublisher + 'static,
    G: GeoVerifier + 'static,
{
    match service.release_unit(&UnitId(unit_id)) {
        Ok(unit) => (StatusCode::OK, axum::Json(unit)).into_response(),
        Err(error) => error_response(error),
    }
}
