//! Staff directory routes.

use axum::{Json, extract::State};
use db::{models::Staff, staff::NewStaff};
use tracing::instrument;

use crate::{AppState, error::Result, identity::StaffIdentity};

/// Add a staff member
#[utoipa::path(
    post,
    path = "/staff",
    request_body = NewStaff,
    responses(
        (status = 200, description = "Staff member created", body = Staff),
        (status = 400, description = "Missing fields or duplicate username"),
        (status = 401, description = "Missing staff identity"),
    )
)]
#[instrument(skip(db))]
#[axum::debug_handler]
pub async fn create_staff(
    State(AppState { db, .. }): State<AppState>,
    identity: StaffIdentity,
    Json(body): Json<NewStaff>,
) -> Result<Json<Staff>> {
    let staff = db::staff::create(&db, body).await?;
    Ok(Json(staff))
}

/// List staff members
#[utoipa::path(
    get,
    path = "/staff",
    responses(
        (status = 200, description = "Returns all staff members", body = Vec<Staff>),
    )
)]
#[instrument(skip(db))]
#[axum::debug_handler]
pub async fn list_staff(State(AppState { db, .. }): State<AppState>) -> Result<Json<Vec<Staff>>> {
    let staff = db::staff::list(&db).await?;
    Ok(Json(staff))
}
