//! Aggregate counts for the dashboard view.

use serde::Serialize;
use sqlx::PgPool;
use time::OffsetDateTime;
use utoipa::ToSchema;

use crate::{models::Appointment, Result};

/// A snapshot of clinic activity.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_patients: i64,
    pub appointments_today: i64,
    pub total_staff: i64,
    /// Invoices that are not yet fully paid.
    pub pending_invoices: i64,
    /// The five most recent appointments.
    pub recent_activity: Vec<Appointment>,
}

pub async fn stats(db: &PgPool) -> Result<DashboardStats> {
    let today = OffsetDateTime::now_utc().date();

    let total_patients = sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM "patient""#)
        .fetch_one(db)
        .await?;

    let appointments_today =
        sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM "appointment" WHERE "date" = $1"#)
            .bind(today)
            .fetch_one(db)
            .await?;

    let total_staff = sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM "staff""#)
        .fetch_one(db)
        .await?;

    let pending_invoices =
        sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM "invoice" WHERE "status" <> 'PAID'"#)
            .fetch_one(db)
            .await?;

    let recent_activity = sqlx::query_as::<_, Appointment>(
        r#"SELECT * FROM "appointment" ORDER BY "date" DESC, "time" DESC LIMIT 5"#,
    )
    .fetch_all(db)
    .await?;

    Ok(DashboardStats {
        total_patients,
        appointments_today,
        total_staff,
        pending_invoices,
        recent_activity,
    })
}
