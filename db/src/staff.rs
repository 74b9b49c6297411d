//! Staff identity queries. Read-mostly; staff own appointments.

use serde::Deserialize;
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{models::Staff, Error, Result};

/// An unvalidated staff creation request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewStaff {
    pub username: Option<String>,
    /// Free-form role tag, e.g. `Doctor`.
    pub role: Option<String>,
}

#[instrument(skip(db))]
pub async fn create(db: &PgPool, staff: NewStaff) -> Result<Staff> {
    let (Some(username), Some(role)) = (staff.username, staff.role) else {
        return Err(Error::Validation("missing required fields"));
    };

    let now = OffsetDateTime::now_utc();
    let created = sqlx::query_as::<_, Staff>(
        r#"
        INSERT INTO "staff" ("id", "username", "role", "created_at", "updated_at")
        VALUES ($1, $2, $3, $4, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::now_v7())
    .bind(&username)
    .bind(&role)
    .bind(now)
    .fetch_one(db)
    .await
    .map_err(|err| match err {
        sqlx::Error::Database(e) if e.kind() == sqlx::error::ErrorKind::UniqueViolation => {
            Error::Validation("username is already taken")
        }
        err => Error::Database(err),
    })?;

    info!(staff = %created.id, username = %created.username, "created staff");
    Ok(created)
}

pub async fn list(db: &PgPool) -> Result<Vec<Staff>> {
    let staff = sqlx::query_as::<_, Staff>(r#"SELECT * FROM "staff" ORDER BY "username""#)
        .fetch_all(db)
        .await?;

    Ok(staff)
}
