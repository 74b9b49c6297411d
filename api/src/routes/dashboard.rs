//! The dashboard stats route.

use axum::{Json, extract::State};
use db::dashboard::DashboardStats;
use tracing::instrument;

use crate::{AppState, error::Result};

/// Get clinic activity stats
#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Returns counts and the most recent appointments", body = DashboardStats),
    )
)]
#[instrument(skip(db))]
#[axum::debug_handler]
pub async fn dashboard_stats(
    State(AppState { db, .. }): State<AppState>,
) -> Result<Json<DashboardStats>> {
    let stats = db::dashboard::stats(&db).await?;
    Ok(Json(stats))
}
