//! Invoice and payment routes.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use db::{
    billing::{InvoiceDetails, NewInvoice, PaymentRequest},
    models::{Invoice, InvoiceItem, InvoiceStatus},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{AppState, error::Result, identity::StaffIdentity};

/// A created invoice with its computed total and line items.
#[derive(Debug, Serialize, ToSchema)]
pub struct InvoiceCreatedResponse {
    message: &'static str,
    invoice: Invoice,
    items: Vec<InvoiceItem>,
}

/// Create an invoice
///
/// The total is computed server-side as the sum of the line items and is
/// fixed from then on.
#[utoipa::path(
    post,
    path = "/invoices/create",
    request_body = NewInvoice,
    responses(
        (status = 200, description = "Invoice created with its computed total", body = InvoiceCreatedResponse),
        (status = 400, description = "Missing fields or empty item list"),
        (status = 404, description = "The patient does not exist"),
        (status = 401, description = "Missing staff identity"),
    )
)]
#[instrument(skip(db))]
#[axum::debug_handler]
pub async fn create_invoice(
    State(AppState { db, .. }): State<AppState>,
    identity: StaffIdentity,
    Json(body): Json<NewInvoice>,
) -> Result<Json<InvoiceCreatedResponse>> {
    let (invoice, items) = db::billing::create_invoice(&db, body).await?;

    Ok(Json(InvoiceCreatedResponse {
        message: "Invoice Created",
        invoice,
        items,
    }))
}

const fn default_count() -> i64 {
    20
}

/// Query parameters for the invoice listing.
#[derive(Debug, Deserialize, IntoParams)]
pub struct InvoiceQueryParams {
    #[serde(rename = "_count")]
    #[serde(default = "default_count")]
    #[param(minimum = 1, maximum = 100, default = 20)]
    count: i64,

    #[serde(rename = "_offset")]
    #[serde(default)]
    #[param(minimum = 0, default = 0)]
    offset: i64,
}

/// List invoices, newest first
#[utoipa::path(
    get,
    path = "/invoices",
    params(InvoiceQueryParams),
    responses(
        (status = 200, description = "Returns a paginated list of invoices", body = Vec<Invoice>),
    )
)]
#[instrument(skip(db))]
#[axum::debug_handler]
pub async fn list_invoices(
    State(AppState { db, .. }): State<AppState>,
    Query(params): Query<InvoiceQueryParams>,
) -> Result<Json<Vec<Invoice>>> {
    let invoices =
        db::billing::list(&db, params.count.clamp(1, 100), params.offset.max(0)).await?;
    Ok(Json(invoices))
}

/// Get an invoice with items, payments and balance
#[utoipa::path(
    get,
    path = "/invoices/{id}/details",
    params(("id", description = "The invoice id")),
    responses(
        (status = 200, description = "Returns the full invoice", body = InvoiceDetails),
        (status = 404, description = "The invoice does not exist"),
    )
)]
#[instrument(skip(db))]
#[axum::debug_handler]
pub async fn get_invoice_details(
    State(AppState { db, .. }): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceDetails>> {
    let details = db::billing::get_details(&db, id).await?;
    Ok(Json(details))
}

/// Confirmation of a recorded payment.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentResponse {
    message: &'static str,
    /// Balance due after this payment, floored at zero.
    new_balance: Decimal,
    new_status: InvoiceStatus,
    badge_color: &'static str,
}

/// Post a payment against an invoice
///
/// Payments are append-only ledger entries; the invoice's cumulative
/// `paid_amount` and derived status are updated atomically with the entry.
#[utoipa::path(
    post,
    path = "/invoices/{id}/pay",
    request_body = PaymentRequest,
    params(("id", description = "The invoice id")),
    responses(
        (status = 200, description = "Payment recorded", body = PaymentResponse),
        (status = 400, description = "Missing or non-positive amount"),
        (status = 404, description = "The invoice does not exist"),
        (status = 401, description = "Missing staff identity"),
    )
)]
#[instrument(skip(db))]
#[axum::debug_handler]
pub async fn post_payment(
    State(AppState { db, .. }): State<AppState>,
    identity: StaffIdentity,
    Path(id): Path<Uuid>,
    Json(body): Json<PaymentRequest>,
) -> Result<Json<PaymentResponse>> {
    let (_payment, invoice) = db::billing::post_payment(&db, id, body).await?;

    Ok(Json(PaymentResponse {
        message: "Payment Recorded",
        new_balance: invoice.balance_due(),
        new_status: invoice.status,
        badge_color: invoice.status.badge_color(),
    }))
}
