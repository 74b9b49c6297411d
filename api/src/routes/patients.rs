//! Patient intake, search and edit routes.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use db::{
    models::Patient,
    patients::{NewPatient, UpdatePatient},
};
use serde::Deserialize;
use tracing::instrument;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{AppState, error::Result, identity::StaffIdentity};

const fn default_count() -> i64 {
    20
}

/// Query parameters for patient list and search.
#[derive(Debug, Deserialize, IntoParams)]
pub struct PatientQueryParams {
    /// Case-insensitive substring matched against name, chart number and phone.
    q: Option<String>,

    #[serde(rename = "_count")]
    #[serde(default = "default_count")]
    #[param(minimum = 1, maximum = 100, default = 20)]
    count: i64,

    #[serde(rename = "_offset")]
    #[serde(default)]
    #[param(minimum = 0, default = 0)]
    offset: i64,
}

/// Register a new patient
#[utoipa::path(
    post,
    path = "/patients",
    request_body = NewPatient,
    responses(
        (status = 200, description = "Patient created", body = Patient),
        (status = 400, description = "Missing or malformed fields"),
        (status = 401, description = "Missing staff identity"),
    )
)]
#[instrument(skip(db))]
#[axum::debug_handler]
pub async fn create_patient(
    State(AppState { db, .. }): State<AppState>,
    identity: StaffIdentity,
    Json(body): Json<NewPatient>,
) -> Result<Json<Patient>> {
    let patient = db::patients::create(&db, body).await?;
    Ok(Json(patient))
}

/// List or search patients
#[utoipa::path(
    get,
    path = "/patients",
    params(PatientQueryParams),
    responses(
        (status = 200, description = "Returns a paginated list of patients", body = Vec<Patient>),
    )
)]
#[instrument(skip(db))]
#[axum::debug_handler]
pub async fn list_patients(
    State(AppState { db, .. }): State<AppState>,
    Query(params): Query<PatientQueryParams>,
) -> Result<Json<Vec<Patient>>> {
    let patients = db::patients::search(
        &db,
        params.q.as_deref(),
        params.count.clamp(1, 100),
        params.offset.max(0),
    )
    .await?;

    Ok(Json(patients))
}

/// Get a patient by id
#[utoipa::path(
    get,
    path = "/patients/{id}",
    params(("id", description = "The patient id")),
    responses(
        (status = 200, description = "Returns the patient", body = Patient),
        (status = 404, description = "The patient does not exist"),
    )
)]
#[instrument(skip(db))]
#[axum::debug_handler]
pub async fn get_patient(
    State(AppState { db, .. }): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Patient>> {
    let patient = db::patients::get(&db, id).await?;
    Ok(Json(patient))
}

/// Edit a patient record
///
/// Absent fields keep their current value. Setting `status` to `Inactive`
/// retires the record; patients are never hard-deleted.
#[utoipa::path(
    put,
    path = "/patients/{id}",
    request_body = UpdatePatient,
    params(("id", description = "The patient id")),
    responses(
        (status = 200, description = "Returns the updated patient", body = Patient),
        (status = 400, description = "Malformed fields"),
        (status = 404, description = "The patient does not exist"),
    )
)]
#[instrument(skip(db))]
#[axum::debug_handler]
pub async fn update_patient(
    State(AppState { db, .. }): State<AppState>,
    identity: StaffIdentity,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePatient>,
) -> Result<Json<Patient>> {
    let patient = db::patients::update(&db, id, body).await?;
    Ok(Json(patient))
}
