//! Recurring invoice API endpoints

use api_types::{
    BulkResponse,
    invoice::InvoiceView,
    recurring::{
        BulkTemplateNew, GenerationReport, TemplateListResponse, TemplateNew, TemplateUpdate,
        TemplateView,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use engine::{Account, BulkReport, CreateTemplateCmd, UpdateTemplateCmd};
use uuid::Uuid;

use crate::{
    ServerError,
    server::ServerState,
    views::{decode_bulk, invoice_view, item_inputs, parse_cadence, template_view},
};

fn create_cmd(account_id: &str, payload: TemplateNew) -> CreateTemplateCmd {
    CreateTemplateCmd {
        account_id: account_id.to_string(),
        client_id: payload.client_id,
        bank_account_id: payload.bank_account_id,
        cadence: parse_cadence(payload.cadence),
        start_date: payload.start_date,
        end_date: payload.end_date,
        tax_rate: payload.tax_rate.to_string(),
        notes: payload.notes,
        items: item_inputs(payload.items),
    }
}

pub async fn list(
    Extension(account): Extension<Account>,
    State(state): State<ServerState>,
) -> Result<Json<TemplateListResponse>, ServerError> {
    let templates = state.engine.list_templates(&account.id).await?;
    Ok(Json(TemplateListResponse {
        templates: templates.into_iter().map(template_view).collect(),
    }))
}

/// Handle requests for creating a new recurring template
pub async fn template_new(
    Extension(account): Extension<Account>,
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): WithRejection<Json<TemplateNew>, ServerError>,
) -> Result<(StatusCode, Json<TemplateView>), ServerError> {
    let template = state
        .engine
        .create_template(create_cmd(&account.id, payload))
        .await?;
    Ok((StatusCode::CREATED, Json(template_view(template))))
}

pub async fn bulk_new(
    Extension(account): Extension<Account>,
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): WithRejection<Json<BulkTemplateNew>, ServerError>,
) -> Result<Json<BulkResponse<TemplateView>>, ServerError> {
    let (cmds, layout) = decode_bulk(payload.templates, "recurring templates", |template| {
        create_cmd(&account.id, template)
    })?;
    let report = if layout.nothing_decoded() {
        BulkReport { results: Vec::new() }
    } else {
        state.engine.bulk_create_templates(cmds).await?
    };

    Ok(Json(layout.respond(report, template_view)))
}

pub async fn get(
    Extension(account): Extension<Account>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TemplateView>, ServerError> {
    let template = state.engine.template(&account.id, id).await?;
    Ok(Json(template_view(template)))
}

pub async fn update(
    Extension(account): Extension<Account>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    WithRejection(Json(payload), _): WithRejection<Json<TemplateUpdate>, ServerError>,
) -> Result<Json<TemplateView>, ServerError> {
    let cmd = UpdateTemplateCmd {
        account_id: account.id.clone(),
        template_id: id,
        client_id: payload.client_id,
        bank_account_id: payload.bank_account_id,
        cadence: payload.cadence.map(parse_cadence),
        start_date: payload.start_date,
        end_date: payload.end_date,
        tax_rate: payload.tax_rate.map(|rate| rate.to_string()),
        notes: payload.notes,
        items: payload.items.map(item_inputs),
    };

    let template = state.engine.update_template(cmd).await?;
    Ok(Json(template_view(template)))
}

pub async fn delete(
    Extension(account): Extension<Account>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_template(&account.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn pause(
    Extension(account): Extension<Account>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TemplateView>, ServerError> {
    let template = state.engine.pause_template(&account.id, id).await?;
    Ok(Json(template_view(template)))
}

pub async fn resume(
    Extension(account): Extension<Account>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TemplateView>, ServerError> {
    let today = Utc::now().date_naive();
    let template = state.engine.resume_template(&account.id, id, today).await?;
    Ok(Json(template_view(template)))
}

/// Generate the next invoice of a template right away.
pub async fn generate(
    Extension(account): Extension<Account>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<InvoiceView>), ServerError> {
    let today = Utc::now().date_naive();
    let invoice = state
        .engine
        .generate_from_template(&account.id, id, today)
        .await?;
    Ok((StatusCode::CREATED, Json(invoice_view(invoice))))
}

/// Run the recurring generation job right away.
pub async fn process_due(
    State(state): State<ServerState>,
) -> Result<Json<GenerationReport>, ServerError> {
    let report = state.engine.generate_due(Utc::now().date_naive()).await?;

    Ok(Json(GenerationReport {
        processed: report.processed,
        generated: report.generated,
        skipped: report.skipped,
        deactivated: report.deactivated,
        errors: report.errors,
        error_messages: report.error_messages,
    }))
}
