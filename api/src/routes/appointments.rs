//! Appointment booking and status routes.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use db::{
    models::{Appointment, DATE_FORMAT},
    scheduling::{BookingRequest, StatusUpdate},
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    AppState,
    error::{AppError, Result},
    identity::StaffIdentity,
};

/// Booking confirmation for a successfully reserved slot.
#[derive(Debug, Serialize, ToSchema)]
pub struct BookingResponse {
    message: &'static str,
    appointment: Appointment,
}

/// Book an appointment
///
/// Fails with 409 if a non-canceled appointment already occupies the slot
/// for the same provider or the same patient.
#[utoipa::path(
    post,
    path = "/appointments/create",
    request_body = BookingRequest,
    responses(
        (status = 200, description = "Slot reserved", body = BookingResponse),
        (status = 400, description = "Missing or malformed fields"),
        (status = 409, description = "The slot is already booked"),
        (status = 401, description = "Missing staff identity"),
    )
)]
#[instrument(skip(db))]
#[axum::debug_handler]
pub async fn create_appointment(
    State(AppState { db, .. }): State<AppState>,
    identity: StaffIdentity,
    Json(body): Json<BookingRequest>,
) -> Result<Json<BookingResponse>> {
    let appointment = db::scheduling::book(&db, body).await?;

    Ok(Json(BookingResponse {
        message: "Appointment Booked",
        appointment,
    }))
}

/// Query parameters for the day listing.
#[derive(Debug, Deserialize, IntoParams)]
pub struct AppointmentQueryParams {
    /// Day to list, `YYYY-MM-DD`. Defaults to today.
    date: Option<String>,

    /// Narrow the listing to one provider.
    staff_id: Option<Uuid>,
}

/// List appointments for a day
#[utoipa::path(
    get,
    path = "/appointments",
    params(AppointmentQueryParams),
    responses(
        (status = 200, description = "Returns the day's appointments ordered by time", body = Vec<Appointment>),
        (status = 400, description = "Malformed date"),
    )
)]
#[instrument(skip(db))]
#[axum::debug_handler]
pub async fn list_appointments(
    State(AppState { db, .. }): State<AppState>,
    Query(params): Query<AppointmentQueryParams>,
) -> Result<Json<Vec<Appointment>>> {
    let date = match &params.date {
        Some(date) => Date::parse(date, DATE_FORMAT)
            .map_err(|_| AppError::BadRequest("invalid date, expected YYYY-MM-DD"))?,
        None => OffsetDateTime::now_utc().date(),
    };

    let appointments = db::scheduling::list_for_day(&db, date, params.staff_id).await?;
    Ok(Json(appointments))
}

/// Get an appointment by id
#[utoipa::path(
    get,
    path = "/appointments/{id}",
    params(("id", description = "The appointment id")),
    responses(
        (status = 200, description = "Returns the appointment", body = Appointment),
        (status = 404, description = "The appointment does not exist"),
    )
)]
#[instrument(skip(db))]
#[axum::debug_handler]
pub async fn get_appointment(
    State(AppState { db, .. }): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>> {
    let appointment = db::scheduling::get(&db, id).await?;
    Ok(Json(appointment))
}

/// Confirmation of an applied status transition.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    message: &'static str,
    appointment: Appointment,
}

/// Update an appointment's status
///
/// Transitions are forward only. Canceling requires a non-empty `reason`
/// and frees the slot for re-booking; completing requires no reason.
#[utoipa::path(
    post,
    path = "/appointments/{id}/status",
    request_body = StatusUpdate,
    params(("id", description = "The appointment id")),
    responses(
        (status = 200, description = "Status updated", body = StatusResponse),
        (status = 400, description = "Invalid transition or missing reason"),
        (status = 404, description = "The appointment does not exist"),
        (status = 401, description = "Missing staff identity"),
    )
)]
#[instrument(skip(db))]
#[axum::debug_handler]
pub async fn update_appointment_status(
    State(AppState { db, .. }): State<AppState>,
    identity: StaffIdentity,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<StatusResponse>> {
    let appointment = db::scheduling::set_status(&db, id, body).await?;

    let message = match appointment.status {
        db::models::AppointmentStatus::Canceled => "Appointment canceled",
        _ => "Appointment updated",
    };

    Ok(Json(StatusResponse {
        message,
        appointment,
    }))
}
