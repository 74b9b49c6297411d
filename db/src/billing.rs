//! The billing ledger.
//!
//! An invoice is created with a fixed total (the sum of its line items) and a
//! cumulative `paid_amount` that only grows through payment postings, each of
//! which is recorded as an append-only [`Payment`] row. The derived status
//! moves `OPEN -> PARTIAL -> PAID` as payments accumulate; a single payment
//! covering the full total skips `PARTIAL`. Amounts are exact decimals.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use time::{Date, OffsetDateTime};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    models::{Invoice, InvoiceItem, InvoiceStatus, Payment, DATE_FORMAT},
    Error, Result,
};

/// A line item of a not-yet-created invoice.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewInvoiceItem {
    pub description: String,
    pub qty: i32,
    pub unit_price: Decimal,
}

/// An unvalidated invoice creation request.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewInvoice {
    pub patient_id: Option<Uuid>,
    /// Issue date, `YYYY-MM-DD`
    #[schema(value_type = String, example = "2025-12-05")]
    pub date: Option<String>,
    #[serde(default)]
    pub items: Vec<NewInvoiceItem>,
}

/// A validated invoice creation request.
#[derive(Debug, Clone)]
pub struct ValidatedInvoice {
    pub patient_id: Uuid,
    pub date_issued: Date,
    pub items: Vec<NewInvoiceItem>,
}

/// An unvalidated payment posting.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PaymentRequest {
    pub amount: Option<Decimal>,
    pub method: Option<String>,
    pub reference: Option<String>,
}

/// The result of applying one payment to an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PaymentOutcome {
    /// True cumulative amount received, not clamped on overpayment.
    pub paid_amount: Decimal,
    /// Outstanding amount, floored at zero for display.
    pub balance: Decimal,
    pub status: InvoiceStatus,
}

/// Invoice total: Σ(qty × unit price) over its line items.
#[must_use]
pub fn invoice_total(items: &[NewInvoiceItem]) -> Decimal {
    items
        .iter()
        .map(|item| Decimal::from(item.qty) * item.unit_price)
        .sum()
}

/// Checks presence and plausibility of all invoice fields.
pub fn validate(invoice: NewInvoice) -> Result<ValidatedInvoice> {
    let (Some(patient_id), Some(date)) = (invoice.patient_id, invoice.date) else {
        return Err(Error::Validation("missing required fields"));
    };

    let date_issued = Date::parse(&date, DATE_FORMAT)
        .map_err(|_| Error::Validation("invalid date, expected YYYY-MM-DD"))?;

    if invoice.items.is_empty() {
        return Err(Error::Validation("an invoice requires at least one line item"));
    }

    for item in &invoice.items {
        if item.description.trim().is_empty() {
            return Err(Error::Validation("line item description is required"));
        }
        if item.qty < 1 {
            return Err(Error::Validation("line item qty must be at least 1"));
        }
        if item.unit_price < Decimal::ZERO {
            return Err(Error::Validation("line item unit price cannot be negative"));
        }
    }

    Ok(ValidatedInvoice {
        patient_id,
        date_issued,
        items: invoice.items,
    })
}

/// Status derivation, evaluated in this order: settled, then started, then
/// untouched.
#[must_use]
pub fn derive_status(total: Decimal, paid: Decimal) -> InvoiceStatus {
    if total - paid <= Decimal::ZERO {
        InvoiceStatus::Paid
    } else if paid > Decimal::ZERO {
        InvoiceStatus::Partial
    } else {
        InvoiceStatus::Open
    }
}

/// Applies one payment to an invoice balance.
///
/// Overpayment is allowed: `paid_amount` keeps the true cumulative amount
/// received while `balance` clamps at zero.
pub fn apply_payment(total: Decimal, paid: Decimal, amount: Decimal) -> Result<PaymentOutcome> {
    if amount <= Decimal::ZERO {
        return Err(Error::Validation("payment amount must be greater than zero"));
    }

    let paid_amount = paid + amount;
    Ok(PaymentOutcome {
        paid_amount,
        balance: (total - paid_amount).max(Decimal::ZERO),
        status: derive_status(total, paid_amount),
    })
}

/// Creates an invoice together with its line items in one transaction.
#[instrument(skip(db))]
pub async fn create_invoice(db: &PgPool, invoice: NewInvoice) -> Result<(Invoice, Vec<InvoiceItem>)> {
    let invoice = validate(invoice)?;
    let total = invoice_total(&invoice.items);

    let mut tx = db.begin().await?;

    let patient = sqlx::query_scalar::<_, Uuid>(r#"SELECT "id" FROM "patient" WHERE "id" = $1"#)
        .bind(invoice.patient_id)
        .fetch_optional(&mut *tx)
        .await?;
    if patient.is_none() {
        return Err(Error::NotFound);
    }

    let now = OffsetDateTime::now_utc();
    let created = sqlx::query_as::<_, Invoice>(
        r#"
        INSERT INTO "invoice"
            ("id", "patient_id", "date_issued", "status", "total_amount", "paid_amount", "created_at", "updated_at")
        VALUES ($1, $2, $3, 'OPEN', $4, 0, $5, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::now_v7())
    .bind(invoice.patient_id)
    .bind(invoice.date_issued)
    .bind(total)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    let mut items = Vec::with_capacity(invoice.items.len());
    for item in &invoice.items {
        let row = sqlx::query_as::<_, InvoiceItem>(
            r#"
            INSERT INTO "invoice_item" ("id", "invoice_id", "description", "qty", "unit_price")
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(created.id)
        .bind(&item.description)
        .bind(item.qty)
        .bind(item.unit_price)
        .fetch_one(&mut *tx)
        .await?;
        items.push(row);
    }

    tx.commit().await?;

    info!(invoice = %created.id, %total, "created invoice");
    Ok((created, items))
}

/// Posts a payment against an invoice. The ledger entry, the new
/// `paid_amount` and the derived status are persisted atomically; no partial
/// state is observable to a concurrent reader.
#[instrument(skip(db))]
pub async fn post_payment(
    db: &PgPool,
    invoice_id: Uuid,
    request: PaymentRequest,
) -> Result<(Payment, Invoice)> {
    let amount = request
        .amount
        .ok_or(Error::Validation("missing required fields"))?;

    let mut tx = db.begin().await?;

    let invoice =
        sqlx::query_as::<_, Invoice>(r#"SELECT * FROM "invoice" WHERE "id" = $1 FOR UPDATE"#)
            .bind(invoice_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(Error::NotFound)?;

    let outcome = apply_payment(invoice.total_amount, invoice.paid_amount, amount)?;

    let payment = sqlx::query_as::<_, Payment>(
        r#"
        INSERT INTO "payment" ("id", "invoice_id", "amount", "method", "reference", "posted_at")
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::now_v7())
    .bind(invoice_id)
    .bind(amount)
    .bind(request.method)
    .bind(request.reference)
    .bind(OffsetDateTime::now_utc())
    .fetch_one(&mut *tx)
    .await?;

    let invoice = sqlx::query_as::<_, Invoice>(
        r#"
        UPDATE "invoice"
        SET "paid_amount" = $2, "status" = $3, "updated_at" = $4
        WHERE "id" = $1
        RETURNING *
        "#,
    )
    .bind(invoice_id)
    .bind(outcome.paid_amount)
    .bind(outcome.status)
    .bind(OffsetDateTime::now_utc())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(invoice = %invoice.id, %amount, status = ?invoice.status, "posted payment");
    Ok((payment, invoice))
}

/// A line item as rendered in invoice details, with its computed total.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LineItem {
    pub id: Uuid,
    pub description: String,
    pub qty: i32,
    pub unit_price: Decimal,
    /// qty × unit price.
    pub total: Decimal,
}

impl From<InvoiceItem> for LineItem {
    fn from(item: InvoiceItem) -> Self {
        let total = item.total();
        LineItem {
            id: item.id,
            description: item.description,
            qty: item.qty,
            unit_price: item.unit_price,
            total,
        }
    }
}

/// A full invoice: header, patient identity, line items and payment ledger.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InvoiceDetails {
    pub invoice: Invoice,
    pub patient_name: String,
    pub patient_chart: String,
    /// Balance due, floored at zero.
    pub balance: Decimal,
    pub items: Vec<LineItem>,
    pub payments: Vec<Payment>,
}

pub async fn get_details(db: &PgPool, id: Uuid) -> Result<InvoiceDetails> {
    let invoice = sqlx::query_as::<_, Invoice>(r#"SELECT * FROM "invoice" WHERE "id" = $1"#)
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or(Error::NotFound)?;

    let (patient_name, patient_chart) = sqlx::query_as::<_, (String, String)>(
        r#"SELECT "name", "chart_number" FROM "patient" WHERE "id" = $1"#,
    )
    .bind(invoice.patient_id)
    .fetch_one(db)
    .await?;

    let items = sqlx::query_as::<_, InvoiceItem>(
        r#"SELECT * FROM "invoice_item" WHERE "invoice_id" = $1 ORDER BY "id""#,
    )
    .bind(id)
    .fetch_all(db)
    .await?;

    let payments = sqlx::query_as::<_, Payment>(
        r#"SELECT * FROM "payment" WHERE "invoice_id" = $1 ORDER BY "posted_at""#,
    )
    .bind(id)
    .fetch_all(db)
    .await?;

    let balance = invoice.balance_due();
    Ok(InvoiceDetails {
        invoice,
        patient_name,
        patient_chart,
        balance,
        items: items.into_iter().map(LineItem::from).collect(),
        payments,
    })
}

/// Invoices, newest first.
pub async fn list(db: &PgPool, count: i64, offset: i64) -> Result<Vec<Invoice>> {
    let invoices = sqlx::query_as::<_, Invoice>(
        r#"
        SELECT * FROM "invoice"
        ORDER BY "date_issued" DESC, "created_at" DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(count)
    .bind(offset)
    .fetch_all(db)
    .await?;

    Ok(invoices)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn item(description: &str, qty: i32, unit_price: Decimal) -> NewInvoiceItem {
        NewInvoiceItem {
            description: description.to_string(),
            qty,
            unit_price,
        }
    }

    fn new_invoice(items: Vec<NewInvoiceItem>) -> NewInvoice {
        NewInvoice {
            patient_id: Some(Uuid::now_v7()),
            date: Some("2025-12-05".to_string()),
            items,
        }
    }

    #[test]
    fn total_is_the_sum_of_line_items() {
        let items = vec![
            item("Office Visit - Standard", 1, dec!(100.00)),
            item("Lab Fee - Basic Panel", 1, dec!(50.00)),
        ];
        assert_eq!(invoice_total(&items), dec!(150.00));

        let items = vec![item("Dressing kit", 3, dec!(12.50))];
        assert_eq!(invoice_total(&items), dec!(37.50));
    }

    #[test]
    fn validate_rejects_empty_item_lists() {
        let err = validate(new_invoice(vec![])).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn validate_rejects_missing_fields() {
        let mut invoice = new_invoice(vec![item("Visit", 1, dec!(100))]);
        invoice.patient_id = None;
        assert!(matches!(
            validate(invoice),
            Err(Error::Validation("missing required fields"))
        ));

        let mut invoice = new_invoice(vec![item("Visit", 1, dec!(100))]);
        invoice.date = Some("05-12-2025".to_string());
        assert!(matches!(validate(invoice), Err(Error::Validation(_))));
    }

    #[test]
    fn validate_rejects_bad_line_items() {
        assert!(validate(new_invoice(vec![item("Visit", 0, dec!(100))])).is_err());
        assert!(validate(new_invoice(vec![item("Visit", 1, dec!(-1))])).is_err());
        assert!(validate(new_invoice(vec![item("  ", 1, dec!(100))])).is_err());
        assert!(validate(new_invoice(vec![item("Visit", 1, dec!(0))])).is_ok());
    }

    #[test]
    fn partial_then_paid() {
        // total 150.00 (items 100.00 + 50.00)
        let total = invoice_total(&[
            item("Office Visit - Standard", 1, dec!(100.00)),
            item("Lab Fee - Basic Panel", 1, dec!(50.00)),
        ]);

        let first = apply_payment(total, Decimal::ZERO, dec!(100)).unwrap();
        assert_eq!(first.status, InvoiceStatus::Partial);
        assert_eq!(first.balance, dec!(50.00));

        let second = apply_payment(total, first.paid_amount, dec!(50)).unwrap();
        assert_eq!(second.status, InvoiceStatus::Paid);
        assert_eq!(second.balance, dec!(0.00));
    }

    #[test]
    fn line_items_render_their_computed_total() {
        let line: LineItem = InvoiceItem {
            id: Uuid::now_v7(),
            invoice_id: Uuid::now_v7(),
            description: "Dressing kit".to_string(),
            qty: 3,
            unit_price: dec!(12.50),
        }
        .into();

        assert_eq!(line.total, dec!(37.50));
    }

    #[test]
    fn full_payment_skips_partial() {
        let outcome = apply_payment(dec!(100), Decimal::ZERO, dec!(100)).unwrap();
        assert_eq!(outcome.status, InvoiceStatus::Paid);
        assert_eq!(outcome.balance, Decimal::ZERO);
    }

    #[test]
    fn overpayment_clamps_balance_but_not_paid_amount() {
        let outcome = apply_payment(dec!(100), dec!(80), dec!(40)).unwrap();
        assert_eq!(outcome.paid_amount, dec!(120));
        assert_eq!(outcome.balance, Decimal::ZERO);
        assert_eq!(outcome.status, InvoiceStatus::Paid);
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        assert!(apply_payment(dec!(100), Decimal::ZERO, Decimal::ZERO).is_err());
        assert!(apply_payment(dec!(100), Decimal::ZERO, dec!(-5)).is_err());
    }

    #[test]
    fn paid_amount_is_monotonic_over_any_payment_sequence() {
        let total = dec!(150);
        let mut paid = Decimal::ZERO;
        let mut last_balance = total;

        for amount in [dec!(10), dec!(0.01), dec!(49.99), dec!(40), dec!(75)] {
            let outcome = apply_payment(total, paid, amount).unwrap();
            assert!(outcome.paid_amount > paid);
            assert!(outcome.balance <= last_balance);
            assert_eq!(outcome.balance, (total - outcome.paid_amount).max(Decimal::ZERO));
            assert_eq!(outcome.status, derive_status(total, outcome.paid_amount));
            paid = outcome.paid_amount;
            last_balance = outcome.balance;
        }

        assert_eq!(paid, dec!(175.00));
        assert_eq!(last_balance, Decimal::ZERO);
    }

    #[test]
    fn status_never_moves_backwards() {
        let total = dec!(100);
        let mut paid = Decimal::ZERO;
        let mut rank = 0;

        for amount in [dec!(30), dec!(30), dec!(40), dec!(1)] {
            paid = apply_payment(total, paid, amount).unwrap().paid_amount;
            let next_rank = match derive_status(total, paid) {
                InvoiceStatus::Open => 0,
                InvoiceStatus::Partial => 1,
                InvoiceStatus::Paid => 2,
            };
            assert!(next_rank >= rank);
            rank = next_rank;
        }

        assert_eq!(rank, 2);
    }
}
