//! Row models for the clinic schema.
//!
//! Every table in [`crate::schema`] has a matching struct here. Dates are
//! exchanged as `YYYY-MM-DD` and times of day as `HH:MM`; the serde helper
//! modules at the bottom implement those formats.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{
    format_description::BorrowedFormatItem, macros::format_description, Date, OffsetDateTime, Time,
};
use utoipa::ToSchema;
use uuid::Uuid;

/// Wire format for calendar dates.
pub const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Wire format for times of day. Seconds are not part of the scheduling
/// model; a slot is identified by its minute.
pub const TIME_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]");

/// Lifecycle state of a patient record. Patients are never hard-deleted,
/// they are marked `Inactive` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "patient_status", rename_all = "PascalCase")]
pub enum PatientStatus {
    Active,
    Inactive,
}

/// Appointment lifecycle. Transitions are forward only: `Scheduled` may move
/// to `Completed` or `Canceled`, both of which are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "appointment_status", rename_all = "PascalCase")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Canceled,
}

/// Derived invoice state, computed from `total_amount` and `paid_amount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "invoice_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum InvoiceStatus {
    Open,
    Partial,
    Paid,
}

impl InvoiceStatus {
    /// Display color used by billing screens for the status badge.
    #[must_use]
    pub fn badge_color(self) -> &'static str {
        match self {
            InvoiceStatus::Open => "blue",
            InvoiceStatus::Partial => "orange",
            InvoiceStatus::Paid => "green",
        }
    }
}

/// A caregiver or admin identity. Owns appointments.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Staff {
    pub id: Uuid,
    pub username: String,
    /// Free-form role tag, e.g. `Doctor`.
    pub role: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A patient identity record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "date_format")]
    #[schema(value_type = String, example = "1999-01-20")]
    pub dob: Date,
    /// Unique human-readable identifier, e.g. `CH-1001`.
    pub chart_number: String,
    pub phone: String,
    pub address: Option<String>,
    pub status: PatientStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A booked slot: one provider, one patient, one date + time of day.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Appointment {
    pub id: Uuid,
    pub staff_id: Uuid,
    pub patient_id: Uuid,
    #[serde(with = "date_format")]
    #[schema(value_type = String, example = "2025-01-01")]
    pub date: Date,
    #[serde(with = "time_format")]
    #[schema(value_type = String, example = "10:00")]
    pub time: Time,
    pub status: AppointmentStatus,
    pub visit_type: String,
    /// Cancellation reason. Required when (and only set by) canceling.
    pub reason: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A patient billing document. `total_amount` is fixed at creation time as
/// the sum of its line items; `paid_amount` only grows via payment postings.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Invoice {
    pub id: Uuid,
    pub patient_id: Uuid,
    #[serde(with = "date_format")]
    #[schema(value_type = String, example = "2025-12-05")]
    pub date_issued: Date,
    pub status: InvoiceStatus,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Invoice {
    /// Outstanding amount, floored at zero for display. Overpayment is kept
    /// in `paid_amount` but never shown as a negative balance.
    #[must_use]
    pub fn balance_due(&self) -> Decimal {
        (self.total_amount - self.paid_amount).max(Decimal::ZERO)
    }
}

/// A line item, immutable once created and owned by exactly one invoice.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct InvoiceItem {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub description: String,
    pub qty: i32,
    pub unit_price: Decimal,
}

impl InvoiceItem {
    #[must_use]
    pub fn total(&self) -> Decimal {
        Decimal::from(self.qty) * self.unit_price
    }
}

/// An append-only ledger entry attributed to one invoice.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub method: Option<String>,
    pub reference: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub posted_at: OffsetDateTime,
}

/// Serde helpers for [`DATE_FORMAT`].
pub mod date_format {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    use super::DATE_FORMAT;

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        let s = date.format(DATE_FORMAT).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let s = String::deserialize(deserializer)?;
        Date::parse(&s, DATE_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Serde helpers for [`TIME_FORMAT`].
pub mod time_format {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Time;

    use super::TIME_FORMAT;

    pub fn serialize<S: Serializer>(time: &Time, serializer: S) -> Result<S::Ok, S::Error> {
        let s = time.format(TIME_FORMAT).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Time, D::Error> {
        let s = String::deserialize(deserializer)?;
        Time::parse(&s, TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime, time};
    use uuid::Uuid;

    use super::*;

    #[test]
    fn appointment_wire_formats() {
        let appt = Appointment {
            id: Uuid::nil(),
            staff_id: Uuid::nil(),
            patient_id: Uuid::nil(),
            date: date!(2025 - 01 - 01),
            time: time!(10:00),
            status: AppointmentStatus::Scheduled,
            visit_type: "General Checkup".to_string(),
            reason: None,
            created_at: datetime!(2025-01-01 09:00 UTC),
            updated_at: datetime!(2025-01-01 09:00 UTC),
        };

        let value = serde_json::to_value(&appt).unwrap();
        assert_eq!(value["date"], "2025-01-01");
        assert_eq!(value["time"], "10:00");
        assert_eq!(value["status"], "Scheduled");
    }

    #[test]
    fn invoice_status_uses_uppercase_wire_names() {
        assert_eq!(
            serde_json::to_value(InvoiceStatus::Partial).unwrap(),
            "PARTIAL"
        );
        assert_eq!(
            serde_json::from_value::<InvoiceStatus>("PAID".into()).unwrap(),
            InvoiceStatus::Paid
        );
    }

    #[test]
    fn balance_due_is_clamped_at_zero() {
        let invoice = Invoice {
            id: Uuid::nil(),
            patient_id: Uuid::nil(),
            date_issued: date!(2025 - 12 - 05),
            status: InvoiceStatus::Paid,
            total_amount: Decimal::new(10_000, 2),
            paid_amount: Decimal::new(12_000, 2),
            created_at: datetime!(2025-12-05 09:00 UTC),
            updated_at: datetime!(2025-12-05 09:00 UTC),
        };

        assert_eq!(invoice.balance_due(), Decimal::ZERO);
    }
}
