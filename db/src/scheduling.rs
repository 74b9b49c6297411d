//! The scheduling guard.
//!
//! A slot is one provider/date/time combination. Booking succeeds only if no
//! non-canceled appointment occupies the requested slot for the same provider
//! or the same patient. The decision itself is a pure function over the
//! candidate rows ([`find_conflict`]); [`book`] wraps it in a transaction and
//! relies on the partial unique indexes in [`crate::schema`] as the backstop
//! against concurrent bookings the in-process check cannot see.

use std::fmt;

use serde::Deserialize;
use sqlx::PgPool;
use time::{Date, OffsetDateTime, Time};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    models::{Appointment, AppointmentStatus, DATE_FORMAT, TIME_FORMAT},
    Error, Result,
};

const DEFAULT_VISIT_TYPE: &str = "General Checkup";

/// An unvalidated booking request, exactly as received on the wire.
///
/// Required fields are `Option`s so that a missing field surfaces as a 400
/// validation error instead of a body-rejection.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BookingRequest {
    pub staff_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    /// `YYYY-MM-DD`
    #[schema(value_type = String, example = "2025-01-01")]
    pub date: Option<String>,
    /// `HH:MM`
    #[schema(value_type = String, example = "10:00")]
    pub time: Option<String>,
    pub visit_type: Option<String>,
}

/// A validated booking request.
#[derive(Debug, Clone)]
pub struct SlotRequest {
    pub staff_id: Uuid,
    pub patient_id: Uuid,
    pub date: Date,
    pub time: Time,
    pub visit_type: String,
}

/// Which party already occupies the colliding slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictParty {
    Provider,
    Patient,
}

impl fmt::Display for ConflictParty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictParty::Provider => write!(f, "provider"),
            ConflictParty::Patient => write!(f, "patient"),
        }
    }
}

/// A rejected booking: the party and the slot it is already booked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotConflict {
    pub party: ConflictParty,
    pub date: Date,
    pub time: Time,
}

impl fmt::Display for SlotConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let date = self.date.format(DATE_FORMAT).map_err(|_| fmt::Error)?;
        let time = self.time.format(TIME_FORMAT).map_err(|_| fmt::Error)?;
        write!(
            f,
            "the {} is already booked on {date} at {time}",
            self.party
        )
    }
}

/// Checks presence and formats of all required booking fields.
pub fn validate(request: BookingRequest) -> Result<SlotRequest> {
    let (Some(staff_id), Some(patient_id), Some(date), Some(time)) = (
        request.staff_id,
        request.patient_id,
        request.date,
        request.time,
    ) else {
        return Err(Error::Validation("missing required fields"));
    };

    let date = Date::parse(&date, DATE_FORMAT)
        .map_err(|_| Error::Validation("invalid date, expected YYYY-MM-DD"))?;
    let time = Time::parse(&time, TIME_FORMAT)
        .map_err(|_| Error::Validation("invalid time, expected HH:MM"))?;

    let visit_type = match request.visit_type {
        Some(v) if !v.trim().is_empty() => v,
        _ => DEFAULT_VISIT_TYPE.to_string(),
    };

    Ok(SlotRequest {
        staff_id,
        patient_id,
        date,
        time,
        visit_type,
    })
}

/// The conflict rule.
///
/// A non-canceled appointment at the same date and time conflicts when it
/// belongs to the same provider or the same patient; provider collisions are
/// reported first. `exclude` skips the record being edited. Canceled rows
/// never occupy a slot, so re-booking after cancellation succeeds.
#[must_use]
pub fn find_conflict(
    request: &SlotRequest,
    existing: &[Appointment],
    exclude: Option<Uuid>,
) -> Option<SlotConflict> {
    let occupied = |appt: &Appointment| {
        appt.status != AppointmentStatus::Canceled
            && appt.date == request.date
            && appt.time == request.time
            && Some(appt.id) != exclude
    };

    let party = if existing
        .iter()
        .any(|a| occupied(a) && a.staff_id == request.staff_id)
    {
        ConflictParty::Provider
    } else if existing
        .iter()
        .any(|a| occupied(a) && a.patient_id == request.patient_id)
    {
        ConflictParty::Patient
    } else {
        return None;
    };

    Some(SlotConflict {
        party,
        date: request.date,
        time: request.time,
    })
}

/// A status update request for an existing appointment.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StatusUpdate {
    pub status: Option<AppointmentStatus>,
    pub reason: Option<String>,
}

/// Validates a status transition and returns the reason to persist, if any.
///
/// Transitions are forward only: `Scheduled` is the only state that can be
/// left, and `Canceled` requires a non-empty reason. Moving to `Completed`
/// needs no reason and does not re-run the conflict check.
pub fn validate_transition(
    current: AppointmentStatus,
    next: AppointmentStatus,
    reason: Option<&str>,
) -> Result<Option<String>> {
    if current != AppointmentStatus::Scheduled {
        return Err(Error::Validation(
            "appointment is already completed or canceled",
        ));
    }

    match next {
        AppointmentStatus::Scheduled => Err(Error::Validation("invalid status update")),
        AppointmentStatus::Completed => Ok(None),
        AppointmentStatus::Canceled => match reason {
            Some(r) if !r.trim().is_empty() => Ok(Some(r.to_string())),
            _ => Err(Error::Validation("reason is required for cancellation")),
        },
    }
}

/// Names the colliding party for a conflict caught by the storage engine
/// instead of the in-process check. The violated index identifies whose
/// slot was taken.
fn race_conflict_party(constraint: Option<&str>) -> ConflictParty {
    match constraint {
        Some("appointment_patient_slot_idx") => ConflictParty::Patient,
        _ => ConflictParty::Provider,
    }
}

/// Books an appointment, or fails with [`Error::Conflict`] if the slot is
/// occupied. The check and the insert run in one transaction.
#[instrument(skip(db))]
pub async fn book(db: &PgPool, request: BookingRequest) -> Result<Appointment> {
    let request = validate(request)?;

    let mut tx = db.begin().await?;

    // Lock the rows the conflict decision is based on. Inserts committed by
    // a racing transaction are caught by the partial unique indexes below.
    let existing = sqlx::query_as::<_, Appointment>(
        r#"
        SELECT * FROM "appointment"
        WHERE "date" = $1 AND "time" = $2 AND ("staff_id" = $3 OR "patient_id" = $4)
        FOR UPDATE
        "#,
    )
    .bind(request.date)
    .bind(request.time)
    .bind(request.staff_id)
    .bind(request.patient_id)
    .fetch_all(&mut *tx)
    .await?;

    if let Some(conflict) = find_conflict(&request, &existing, None) {
        return Err(Error::Conflict(conflict));
    }

    let now = OffsetDateTime::now_utc();
    let appointment = sqlx::query_as::<_, Appointment>(
        r#"
        INSERT INTO "appointment"
            ("id", "staff_id", "patient_id", "date", "time", "status", "visit_type", "created_at", "updated_at")
        VALUES ($1, $2, $3, $4, $5, 'Scheduled', $6, $7, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::now_v7())
    .bind(request.staff_id)
    .bind(request.patient_id)
    .bind(request.date)
    .bind(request.time)
    .bind(&request.visit_type)
    .bind(now)
    .fetch_one(&mut *tx)
    .await
    .map_err(|err| match err {
        sqlx::Error::Database(e) if e.kind() == sqlx::error::ErrorKind::UniqueViolation => {
            // A concurrent booking won the race for this slot.
            Error::Conflict(SlotConflict {
                party: race_conflict_party(e.constraint()),
                date: request.date,
                time: request.time,
            })
        }
        sqlx::Error::Database(e) if e.kind() == sqlx::error::ErrorKind::ForeignKeyViolation => {
            Error::NotFound
        }
        err => Error::Database(err),
    })?;

    tx.commit().await?;

    info!(appointment = %appointment.id, "booked appointment");
    Ok(appointment)
}

/// Applies a status transition to an appointment.
#[instrument(skip(db))]
pub async fn set_status(db: &PgPool, id: Uuid, update: StatusUpdate) -> Result<Appointment> {
    let next = update
        .status
        .ok_or(Error::Validation("missing required fields"))?;

    let mut tx = db.begin().await?;

    let current = sqlx::query_as::<_, Appointment>(
        r#"SELECT * FROM "appointment" WHERE "id" = $1 FOR UPDATE"#,
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(Error::NotFound)?;

    let reason = validate_transition(current.status, next, update.reason.as_deref())?;

    let appointment = sqlx::query_as::<_, Appointment>(
        r#"
        UPDATE "appointment"
        SET "status" = $2, "reason" = COALESCE($3, "reason"), "updated_at" = $4
        WHERE "id" = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(next)
    .bind(reason)
    .bind(OffsetDateTime::now_utc())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(appointment = %appointment.id, status = ?appointment.status, "updated appointment status");
    Ok(appointment)
}

/// All appointments on a given day, optionally narrowed to one provider.
pub async fn list_for_day(
    db: &PgPool,
    date: Date,
    staff_id: Option<Uuid>,
) -> Result<Vec<Appointment>> {
    let appointments = sqlx::query_as::<_, Appointment>(
        r#"
        SELECT * FROM "appointment"
        WHERE "date" = $1 AND ($2::UUID IS NULL OR "staff_id" = $2)
        ORDER BY "time"
        "#,
    )
    .bind(date)
    .bind(staff_id)
    .fetch_all(db)
    .await?;

    Ok(appointments)
}

pub async fn get(db: &PgPool, id: Uuid) -> Result<Appointment> {
    sqlx::query_as::<_, Appointment>(r#"SELECT * FROM "appointment" WHERE "id" = $1"#)
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or(Error::NotFound)
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime, time};

    use super::*;

    fn slot_request(staff: Uuid, patient: Uuid) -> SlotRequest {
        SlotRequest {
            staff_id: staff,
            patient_id: patient,
            date: date!(2025 - 01 - 01),
            time: time!(10:00),
            visit_type: DEFAULT_VISIT_TYPE.to_string(),
        }
    }

    fn appointment(staff: Uuid, patient: Uuid, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: Uuid::now_v7(),
            staff_id: staff,
            patient_id: patient,
            date: date!(2025 - 01 - 01),
            time: time!(10:00),
            status,
            visit_type: DEFAULT_VISIT_TYPE.to_string(),
            reason: None,
            created_at: datetime!(2025-01-01 08:00 UTC),
            updated_at: datetime!(2025-01-01 08:00 UTC),
        }
    }

    fn ids() -> (Uuid, Uuid) {
        (Uuid::now_v7(), Uuid::now_v7())
    }

    #[test]
    fn same_provider_same_slot_conflicts() {
        let (staff, patient) = ids();
        let request = slot_request(staff, Uuid::now_v7());
        let existing = vec![appointment(staff, patient, AppointmentStatus::Scheduled)];

        let conflict = find_conflict(&request, &existing, None).unwrap();
        assert_eq!(conflict.party, ConflictParty::Provider);
        assert_eq!(conflict.date, request.date);
        assert_eq!(conflict.time, request.time);
    }

    #[test]
    fn same_patient_same_slot_conflicts() {
        let (staff, patient) = ids();
        let request = slot_request(Uuid::now_v7(), patient);
        let existing = vec![appointment(staff, patient, AppointmentStatus::Scheduled)];

        let conflict = find_conflict(&request, &existing, None).unwrap();
        assert_eq!(conflict.party, ConflictParty::Patient);
    }

    #[test]
    fn provider_conflict_takes_priority_over_patient() {
        let (staff, patient) = ids();
        let request = slot_request(staff, patient);
        let existing = vec![
            appointment(Uuid::now_v7(), patient, AppointmentStatus::Scheduled),
            appointment(staff, Uuid::now_v7(), AppointmentStatus::Scheduled),
        ];

        let conflict = find_conflict(&request, &existing, None).unwrap();
        assert_eq!(conflict.party, ConflictParty::Provider);
    }

    #[test]
    fn completed_appointments_still_occupy_the_slot() {
        let (staff, patient) = ids();
        let request = slot_request(staff, Uuid::now_v7());
        let existing = vec![appointment(staff, patient, AppointmentStatus::Completed)];

        assert!(find_conflict(&request, &existing, None).is_some());
    }

    #[test]
    fn canceled_appointments_free_the_slot() {
        let (staff, patient) = ids();
        let request = slot_request(staff, patient);
        let existing = vec![appointment(staff, patient, AppointmentStatus::Canceled)];

        assert!(find_conflict(&request, &existing, None).is_none());
    }

    #[test]
    fn editing_an_appointment_does_not_conflict_with_itself() {
        let (staff, patient) = ids();
        let request = slot_request(staff, patient);
        let existing = vec![appointment(staff, patient, AppointmentStatus::Scheduled)];

        assert!(find_conflict(&request, &existing, Some(existing[0].id)).is_none());
        assert!(find_conflict(&request, &existing, Some(Uuid::now_v7())).is_some());
    }

    #[test]
    fn a_different_slot_does_not_conflict() {
        let (staff, patient) = ids();
        let mut request = slot_request(staff, patient);
        request.time = time!(11:00);
        let existing = vec![appointment(staff, patient, AppointmentStatus::Scheduled)];

        assert!(find_conflict(&request, &existing, None).is_none());
    }

    #[test]
    fn booking_sequence_with_cancellation() {
        // book, re-book (conflict), cancel, re-book again (free)
        let (staff, patient) = ids();
        let request = slot_request(staff, patient);
        let mut booked = appointment(staff, patient, AppointmentStatus::Scheduled);

        assert!(find_conflict(&request, std::slice::from_ref(&booked), None).is_some());

        let reason =
            validate_transition(booked.status, AppointmentStatus::Canceled, Some("x")).unwrap();
        booked.status = AppointmentStatus::Canceled;
        booked.reason = reason;

        assert_eq!(booked.reason.as_deref(), Some("x"));
        assert!(find_conflict(&request, std::slice::from_ref(&booked), None).is_none());
    }

    #[test]
    fn validate_requires_all_fields() {
        let request = BookingRequest {
            staff_id: Some(Uuid::now_v7()),
            patient_id: Some(Uuid::now_v7()),
            date: Some("2025-01-01".to_string()),
            time: None,
            visit_type: None,
        };

        assert!(matches!(
            validate(request),
            Err(Error::Validation("missing required fields"))
        ));
    }

    #[test]
    fn validate_rejects_malformed_date_and_time() {
        let request = BookingRequest {
            staff_id: Some(Uuid::now_v7()),
            patient_id: Some(Uuid::now_v7()),
            date: Some("01/01/2025".to_string()),
            time: Some("10:00".to_string()),
            visit_type: None,
        };
        assert!(matches!(validate(request), Err(Error::Validation(_))));

        let request = BookingRequest {
            staff_id: Some(Uuid::now_v7()),
            patient_id: Some(Uuid::now_v7()),
            date: Some("2025-01-01".to_string()),
            time: Some("25:99".to_string()),
            visit_type: None,
        };
        assert!(matches!(validate(request), Err(Error::Validation(_))));
    }

    #[test]
    fn validate_defaults_the_visit_type() {
        let request = BookingRequest {
            staff_id: Some(Uuid::now_v7()),
            patient_id: Some(Uuid::now_v7()),
            date: Some("2025-01-01".to_string()),
            time: Some("10:00".to_string()),
            visit_type: Some("  ".to_string()),
        };

        assert_eq!(validate(request).unwrap().visit_type, DEFAULT_VISIT_TYPE);
    }

    #[test]
    fn cancellation_requires_a_reason() {
        let err = validate_transition(
            AppointmentStatus::Scheduled,
            AppointmentStatus::Canceled,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = validate_transition(
            AppointmentStatus::Scheduled,
            AppointmentStatus::Canceled,
            Some("   "),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let reason = validate_transition(
            AppointmentStatus::Scheduled,
            AppointmentStatus::Canceled,
            Some("patient request"),
        )
        .unwrap();
        assert_eq!(reason.as_deref(), Some("patient request"));
    }

    #[test]
    fn completion_requires_no_reason() {
        let reason = validate_transition(
            AppointmentStatus::Scheduled,
            AppointmentStatus::Completed,
            None,
        )
        .unwrap();
        assert!(reason.is_none());
    }

    #[test]
    fn terminal_states_cannot_transition() {
        for current in [AppointmentStatus::Completed, AppointmentStatus::Canceled] {
            for next in [
                AppointmentStatus::Scheduled,
                AppointmentStatus::Completed,
                AppointmentStatus::Canceled,
            ] {
                assert!(validate_transition(current, next, Some("x")).is_err());
            }
        }
    }

    #[test]
    fn race_conflicts_name_the_violated_party() {
        assert_eq!(
            race_conflict_party(Some("appointment_patient_slot_idx")),
            ConflictParty::Patient
        );
        assert_eq!(
            race_conflict_party(Some("appointment_provider_slot_idx")),
            ConflictParty::Provider
        );
        assert_eq!(race_conflict_party(None), ConflictParty::Provider);
    }

    #[test]
    fn conflict_message_names_party_and_slot() {
        let conflict = SlotConflict {
            party: ConflictParty::Provider,
            date: date!(2025 - 01 - 01),
            time: time!(10:00),
        };

        assert_eq!(
            conflict.to_string(),
            "the provider is already booked on 2025-01-01 at 10:00"
        );
    }
}
