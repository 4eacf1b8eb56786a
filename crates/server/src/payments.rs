//! Payment API endpoints

use api_types::{
    invoice::InvoiceView,
    payment::{PaymentListResponse, PaymentNew, PaymentRecorded},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use engine::{Account, RecordPaymentCmd};
use uuid::Uuid;

use crate::{
    ServerError,
    server::ServerState,
    views::{invoice_view, payment_view},
};

pub async fn list(
    Extension(account): Extension<Account>,
    State(state): State<ServerState>,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<PaymentListResponse>, ServerError> {
    let payments = state.engine.list_payments(&account.id, invoice_id).await?;
    Ok(Json(PaymentListResponse {
        payments: payments.into_iter().map(payment_view).collect(),
    }))
}

/// Handle requests for recording a payment on an invoice
pub async fn payment_new(
    Extension(account): Extension<Account>,
    State(state): State<ServerState>,
    Path(invoice_id): Path<Uuid>,
    WithRejection(Json(payload), _): WithRejection<Json<PaymentNew>, ServerError>,
) -> Result<(StatusCode, Json<PaymentRecorded>), ServerError> {
    let paid_on = payload.paid_on.unwrap_or_else(|| Utc::now().date_naive());
    let mut cmd = RecordPaymentCmd::new(&account.id, invoice_id, payload.amount, paid_on);
    if let Some(method) = payload.method {
        cmd = cmd.method(method);
    }

    let update = state.engine.record_payment(cmd).await?;
    Ok((
        StatusCode::CREATED,
        Json(PaymentRecorded {
            payment: payment_view(update.payment),
            invoice: invoice_view(update.invoice),
        }),
    ))
}

/// Remove a payment and return the invoice it belonged to.
pub async fn delete(
    Extension(account): Extension<Account>,
    State(state): State<ServerState>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<InvoiceView>, ServerError> {
    let invoice = state.engine.delete_payment(&account.id, payment_id).await?;
    Ok(Json(invoice_view(invoice)))
}
