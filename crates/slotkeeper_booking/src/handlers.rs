// File: crates/slotkeeper_booking/src/handlers.rs
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use slotkeeper_common::models::{Appointment, Customer, ReminderAction, Service, ServiceCatalog, TimeSlot};
use slotkeeper_common::{validation_error, SlotkeeperError};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::availability::AvailabilityEngine;
use crate::booking::BookingService;
use crate::reminders::ReminderScheduler;

// Shared state needed by the booking handlers
#[derive(Clone)]
pub struct BookingState {
    pub catalog: Arc<ServiceCatalog>,
    pub availability: Arc<AvailabilityEngine>,
    pub booking: Arc<BookingService>,
    pub reminders: Arc<ReminderScheduler>,
}

#[derive(Deserialize, Debug)]
pub struct AvailabilityQuery {
    /// Business-local day, `YYYY-MM-DD`.
    pub date: String,
    pub service_id: String,
}

#[derive(Serialize, Debug)]
pub struct AvailabilityResponse {
    pub date: NaiveDate,
    pub service_id: String,
    pub slots: Vec<TimeSlot>,
}

#[derive(Deserialize, Debug)]
pub struct BookRequest {
    pub service_id: String,
    /// RFC 3339 instant.
    pub start_time: String,
    pub customer_id: String,
    pub customer_name: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct ConfirmationResponse {
    pub appointment_id: String,
    pub confirmed_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug)]
pub struct CallbackRequest {
    /// Button payload such as `confirm:evt123`.
    pub data: String,
}

#[derive(Serialize, Debug)]
pub struct CallbackResponse {
    pub action: ReminderAction,
    pub message: String,
}

/// Cancelled when the handler future is dropped, e.g. on client disconnect,
/// which aborts pending upstream retries.
fn request_token() -> (CancellationToken, tokio_util::sync::DropGuard) {
    let token = CancellationToken::new();
    let guard = token.clone().drop_guard();
    (token, guard)
}

fn parse_date(raw: &str) -> Result<NaiveDate, SlotkeeperError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| validation_error("Invalid date format (YYYY-MM-DD)"))
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>, SlotkeeperError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| validation_error(format!("Invalid start_time: {}", e)))
}

pub async fn list_services_handler(State(state): State<Arc<BookingState>>) -> Json<Vec<Service>> {
    Json(state.catalog.all().to_vec())
}

pub async fn get_availability_handler(
    State(state): State<Arc<BookingState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, SlotkeeperError> {
    let date = parse_date(&query.date)?;
    let (cancel, _guard) = request_token();

    let slots = state
        .availability
        .available_slots_for_service(date, &query.service_id, &cancel)
        .await?;

    Ok(Json(AvailabilityResponse {
        date,
        service_id: query.service_id,
        slots,
    }))
}

pub async fn book_handler(
    State(state): State<Arc<BookingState>>,
    Json(request): Json<BookRequest>,
) -> Result<(StatusCode, Json<Appointment>), SlotkeeperError> {
    let start = parse_instant(&request.start_time)?;
    let customer = Customer {
        id: request.customer_id,
        display_name: request.customer_name,
    };
    let draft = state.booking.draft(
        &request.service_id,
        start,
        customer,
        request.notes.unwrap_or_default(),
    )?;
    let (cancel, _guard) = request_token();

    let created = state.booking.book(&draft, &cancel).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn cancel_handler(
    State(state): State<Arc<BookingState>>,
    Path(appointment_id): Path<String>,
) -> Result<StatusCode, SlotkeeperError> {
    let (cancel, _guard) = request_token();
    state.booking.cancel(&appointment_id, &cancel).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn confirm_handler(
    State(state): State<Arc<BookingState>>,
    Path(appointment_id): Path<String>,
) -> Result<Json<ConfirmationResponse>, SlotkeeperError> {
    let (cancel, _guard) = request_token();
    let metadata = state
        .reminders
        .record_confirmation(&appointment_id, &cancel)
        .await?;
    Ok(Json(ConfirmationResponse {
        appointment_id,
        confirmed_at: metadata.confirmed_at,
    }))
}

/// Routes a reminder button press back into confirmation or cancellation.
pub async fn reminder_callback_handler(
    State(state): State<Arc<BookingState>>,
    Json(request): Json<CallbackRequest>,
) -> Result<Json<CallbackResponse>, SlotkeeperError> {
    let action = ReminderAction::parse_callback(&request.data)
        .ok_or_else(|| validation_error(format!("Unknown callback data {:?}", request.data)))?;
    info!(data = %request.data, "reminder action received");

    let message = match &action {
        ReminderAction::Confirm { appointment_id } => {
            let (cancel, _guard) = request_token();
            state
                .reminders
                .record_confirmation(appointment_id, &cancel)
                .await?;
            "Thank you, your appointment is confirmed.".to_string()
        }
        ReminderAction::Cancel { appointment_id } => {
            let (cancel, _guard) = request_token();
            state.booking.cancel(appointment_id, &cancel).await?;
            "Your appointment has been cancelled.".to_string()
        }
    };
    Ok(Json(CallbackResponse { action, message }))
}
