//! Demo seed data for development environments.
//!
//! Goes through the regular services so the seeded rows satisfy the same
//! invariants as user-created ones. A no-op on a non-empty database.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{info, instrument};

use crate::{
    billing::{self, NewInvoice, NewInvoiceItem},
    patients::{self, NewPatient},
    scheduling::{self, BookingRequest},
    staff::{self, NewStaff},
    Result,
};

/// Seeds two staff members, two patients, one appointment and one invoice
/// with two line items (total 150.00) if the database is empty.
#[instrument(skip(db))]
pub async fn seed_demo(db: &PgPool) -> Result<()> {
    let staff_count = sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM "staff""#)
        .fetch_one(db)
        .await?;
    if staff_count > 0 {
        return Ok(());
    }

    let rivera = staff::create(
        db,
        NewStaff {
            username: Some("Dr. Rivera".to_string()),
            role: Some("Doctor".to_string()),
        },
    )
    .await?;
    staff::create(
        db,
        NewStaff {
            username: Some("Dr. Smith".to_string()),
            role: Some("Doctor".to_string()),
        },
    )
    .await?;

    let alex = patients::create(
        db,
        NewPatient {
            name: Some("Alex Lee".to_string()),
            dob: Some("1999-01-20".to_string()),
            chart_number: Some("CH-1001".to_string()),
            phone: Some("555-0101".to_string()),
            address: None,
        },
    )
    .await?;
    patients::create(
        db,
        NewPatient {
            name: Some("Priya Shah".to_string()),
            dob: Some("1990-01-01".to_string()),
            chart_number: Some("CH-1002".to_string()),
            phone: Some("555-0102".to_string()),
            address: None,
        },
    )
    .await?;

    scheduling::book(
        db,
        BookingRequest {
            staff_id: Some(rivera.id),
            patient_id: Some(alex.id),
            date: Some("2025-12-01".to_string()),
            time: Some("09:00".to_string()),
            visit_type: None,
        },
    )
    .await?;

    billing::create_invoice(
        db,
        NewInvoice {
            patient_id: Some(alex.id),
            date: Some("2025-12-05".to_string()),
            items: vec![
                NewInvoiceItem {
                    description: "Office Visit - Standard".to_string(),
                    qty: 1,
                    unit_price: Decimal::from(100),
                },
                NewInvoiceItem {
                    description: "Lab Fee - Basic Panel".to_string(),
                    qty: 1,
                    unit_price: Decimal::from(50),
                },
            ],
        },
    )
    .await?;

    info!("seeded demo data");
    Ok(())
}
