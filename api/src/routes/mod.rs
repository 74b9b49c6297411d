use axum::Router;
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_scalar::{Scalar, Servable as _};

use crate::AppState;

mod appointments;
mod dashboard;
mod invoices;
mod patients;
mod staff;

pub fn build_router() -> Router<AppState> {
    let (router, openapi) = OpenApiRouter::<AppState>::new()
        .routes(routes!(patients::create_patient, patients::list_patients))
        .routes(routes!(patients::get_patient, patients::update_patient))
        .routes(routes!(staff::create_staff, staff::list_staff))
        .routes(routes!(appointments::create_appointment))
        .routes(routes!(appointments::list_appointments))
        .routes(routes!(appointments::get_appointment))
        .routes(routes!(appointments::update_appointment_status))
        .routes(routes!(invoices::create_invoice))
        .routes(routes!(invoices::list_invoices))
        .routes(routes!(invoices::get_invoice_details))
        .routes(routes!(invoices::post_payment))
        .routes(routes!(dashboard::dashboard_stats))
        .split_for_parts();

    router.merge(Scalar::with_url("/docs", openapi))
}
