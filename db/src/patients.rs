//! Patient record queries.
//!
//! Patients are never hard-deleted; retiring a record means setting its
//! lifecycle status to `Inactive` through [`update`]. The chart number is
//! assigned at intake and immutable afterwards.

use serde::Deserialize;
use sqlx::PgPool;
use time::{Date, OffsetDateTime};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    models::{Patient, PatientStatus, DATE_FORMAT},
    Error, Result,
};

/// An unvalidated intake form.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewPatient {
    pub name: Option<String>,
    /// Date of birth, `YYYY-MM-DD`
    #[schema(value_type = String, example = "1999-01-20")]
    pub dob: Option<String>,
    pub chart_number: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// A staff edit of an existing record. Absent fields keep their value.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdatePatient {
    pub name: Option<String>,
    #[schema(value_type = String, example = "1999-01-20")]
    pub dob: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub status: Option<PatientStatus>,
}

fn parse_dob(dob: &str) -> Result<Date> {
    Date::parse(dob, DATE_FORMAT).map_err(|_| Error::Validation("invalid dob, expected YYYY-MM-DD"))
}

/// Creates a patient record from an intake form.
#[instrument(skip(db))]
pub async fn create(db: &PgPool, patient: NewPatient) -> Result<Patient> {
    let (Some(name), Some(dob), Some(chart_number), Some(phone)) = (
        patient.name,
        patient.dob,
        patient.chart_number,
        patient.phone,
    ) else {
        return Err(Error::Validation("missing required fields"));
    };

    let dob = parse_dob(&dob)?;
    let now = OffsetDateTime::now_utc();

    let created = sqlx::query_as::<_, Patient>(
        r#"
        INSERT INTO "patient"
            ("id", "name", "dob", "chart_number", "phone", "address", "status", "created_at", "updated_at")
        VALUES ($1, $2, $3, $4, $5, $6, 'Active', $7, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::now_v7())
    .bind(&name)
    .bind(dob)
    .bind(&chart_number)
    .bind(&phone)
    .bind(patient.address)
    .bind(now)
    .fetch_one(db)
    .await
    .map_err(|err| match err {
        sqlx::Error::Database(e) if e.kind() == sqlx::error::ErrorKind::UniqueViolation => {
            Error::Validation("chart number is already in use")
        }
        err => Error::Database(err),
    })?;

    info!(patient = %created.id, chart = %created.chart_number, "created patient");
    Ok(created)
}

/// Applies a partial update to a patient record.
#[instrument(skip(db))]
pub async fn update(db: &PgPool, id: Uuid, update: UpdatePatient) -> Result<Patient> {
    let dob = update.dob.as_deref().map(parse_dob).transpose()?;

    let patient = sqlx::query_as::<_, Patient>(
        r#"
        UPDATE "patient"
        SET "name" = COALESCE($2, "name"),
            "dob" = COALESCE($3, "dob"),
            "phone" = COALESCE($4, "phone"),
            "address" = COALESCE($5, "address"),
            "status" = COALESCE($6, "status"),
            "updated_at" = $7
        WHERE "id" = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(update.name)
    .bind(dob)
    .bind(update.phone)
    .bind(update.address)
    .bind(update.status)
    .bind(OffsetDateTime::now_utc())
    .fetch_optional(db)
    .await?
    .ok_or(Error::NotFound)?;

    info!(patient = %patient.id, "updated patient");
    Ok(patient)
}

/// Case-insensitive substring search over name, chart number and phone.
/// Without a query string, lists all patients.
pub async fn search(
    db: &PgPool,
    query: Option<&str>,
    count: i64,
    offset: i64,
) -> Result<Vec<Patient>> {
    let pattern = query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(|q| format!("%{q}%"));

    let patients = sqlx::query_as::<_, Patient>(
        r#"
        SELECT * FROM "patient"
        WHERE $1::TEXT IS NULL
            OR "name" ILIKE $1
            OR "chart_number" ILIKE $1
            OR "phone" ILIKE $1
        ORDER BY "name"
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(pattern)
    .bind(count)
    .bind(offset)
    .fetch_all(db)
    .await?;

    Ok(patients)
}

pub async fn get(db: &PgPool, id: Uuid) -> Result<Patient> {
    sqlx::query_as::<_, Patient>(r#"SELECT * FROM "patient" WHERE "id" = $1"#)
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or(Error::NotFound)
}
