//! Invoice API endpoints

use api_types::{
    BulkResponse,
    invoice::{
        BulkInvoiceNew, DispatchReport, InvoiceListQuery, InvoiceListResponse, InvoiceNew,
        InvoiceUpdate, InvoiceView,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use engine::{
    Account, BulkReport, CreateInvoiceCmd, InvoiceListFilter, InvoiceMeta, UpdateInvoiceCmd,
};
use uuid::Uuid;

use crate::{
    ServerError,
    server::ServerState,
    views::{decode_bulk, invoice_view, item_inputs, parse_status},
};

fn create_cmd(account_id: &str, payload: InvoiceNew) -> CreateInvoiceCmd {
    CreateInvoiceCmd {
        account_id: account_id.to_string(),
        client_id: payload.client_id,
        items: item_inputs(payload.items),
        tax_rate: payload.tax_rate.to_string(),
        bank_account_id: payload.bank_account_id,
        issue_date: payload.issue_date,
        scheduled_at: payload.scheduled_at,
        meta: InvoiceMeta {
            order_number: payload.order_number,
            project_number: payload.project_number,
            notes: payload.notes,
        },
        client_total: payload.total.map(|total| total.to_string()),
    }
}

fn update_cmd(account_id: &str, invoice_id: Uuid, payload: InvoiceUpdate) -> UpdateInvoiceCmd {
    UpdateInvoiceCmd {
        account_id: account_id.to_string(),
        invoice_id,
        number: payload.number,
        client_id: payload.client_id,
        bank_account_id: payload.bank_account_id,
        items: payload.items.map(item_inputs),
        tax_rate: payload.tax_rate.map(|rate| rate.to_string()),
        client_total: payload.total.map(|total| total.to_string()),
        issue_date: payload.issue_date,
        scheduled_at: payload.scheduled_at,
        status: payload.status.map(parse_status),
        order_number: payload.order_number,
        project_number: payload.project_number,
        notes: payload.notes,
        respect_edit_lock: false,
    }
}

pub async fn list(
    Extension(account): Extension<Account>,
    State(state): State<ServerState>,
    Query(query): Query<InvoiceListQuery>,
) -> Result<Json<InvoiceListResponse>, ServerError> {
    let filter = InvoiceListFilter {
        status: query.status.map(parse_status),
        client_id: query.client_id,
        recurring_template_id: query.recurring_template_id,
    };
    let invoices = state.engine.list_invoices(&account.id, &filter).await?;

    Ok(Json(InvoiceListResponse {
        invoices: invoices.into_iter().map(invoice_view).collect(),
    }))
}

/// Handle requests for creating a new invoice
pub async fn invoice_new(
    Extension(account): Extension<Account>,
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): WithRejection<Json<InvoiceNew>, ServerError>,
) -> Result<(StatusCode, Json<InvoiceView>), ServerError> {
    let invoice = state
        .engine
        .create_invoice(create_cmd(&account.id, payload))
        .await?;

    Ok((StatusCode::CREATED, Json(invoice_view(invoice))))
}

pub async fn bulk_new(
    Extension(account): Extension<Account>,
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): WithRejection<Json<BulkInvoiceNew>, ServerError>,
) -> Result<Json<BulkResponse<InvoiceView>>, ServerError> {
    let (cmds, layout) = decode_bulk(payload.invoices, "invoices", |invoice| {
        create_cmd(&account.id, invoice)
    })?;
    let report = if layout.nothing_decoded() {
        BulkReport { results: Vec::new() }
    } else {
        state.engine.bulk_create_invoices(cmds).await?
    };

    Ok(Json(layout.respond(report, invoice_view)))
}

pub async fn get(
    Extension(account): Extension<Account>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceView>, ServerError> {
    let invoice = state.engine.invoice(&account.id, id).await?;
    Ok(Json(invoice_view(invoice)))
}

/// Handle partial updates.
///
/// Only draft, scheduled and sent invoices accept content edits; later
/// statuses can still change status.
pub async fn update(
    Extension(account): Extension<Account>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    WithRejection(Json(payload), _): WithRejection<Json<InvoiceUpdate>, ServerError>,
) -> Result<Json<InvoiceView>, ServerError> {
    let cmd = update_cmd(&account.id, id, payload).respect_edit_lock();
    let invoice = state.engine.update_invoice(cmd).await?;
    Ok(Json(invoice_view(invoice)))
}

pub async fn delete(
    Extension(account): Extension<Account>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_invoice(&account.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Run the scheduled dispatch job right away.
pub async fn process_scheduled(
    State(state): State<ServerState>,
) -> Result<Json<DispatchReport>, ServerError> {
    let report = state
        .engine
        .process_scheduled_invoices(Utc::now(), state.notifier.as_ref())
        .await?;

    Ok(Json(DispatchReport {
        processed: report.processed,
        sent: report.sent,
        skipped: report.skipped,
        errors: report.errors,
        error_messages: report.error_messages,
    }))
}
