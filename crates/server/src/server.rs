use axum::{
    Json, Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Error as AxumError, Header},
};

use std::sync::Arc;

use crate::{invoices, payments, recurring};
use api_types::Health;
use engine::{Engine, EngineError, InvoiceNotifier};

static ACCOUNT_HEADER: axum::http::HeaderName =
    axum::http::HeaderName::from_static("x-account-id");

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    /// Used by the manual dispatch trigger.
    pub notifier: Arc<dyn InvoiceNotifier>,
}

/// `TypedHeader` for the account header
///
/// The upstream auth layer verifies the caller and injects the account id
/// in the "x-account-id" entry of the header.
#[derive(Debug)]
struct AccountHeader(String);

impl Header for AccountHeader {
    fn name() -> &'static axum::http::HeaderName {
        &ACCOUNT_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i axum::http::HeaderValue>,
    {
        let value = values.next().ok_or_else(AxumError::invalid)?;
        let Ok(value) = value.to_str() else {
            return Err(AxumError::invalid());
        };
        let value = value.trim();
        if value.is_empty() {
            return Err(AxumError::invalid());
        }

        Ok(AccountHeader(value.to_string()))
    }

    fn encode<E: Extend<axum::http::HeaderValue>>(&self, values: &mut E) {
        match axum::http::HeaderValue::from_str(&self.0) {
            Ok(value) => values.extend(std::iter::once(value)),
            Err(_) => tracing::error!("failed to encode x-account-id header"),
        }
    }
}

async fn auth(
    account_header: Option<TypedHeader<AccountHeader>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(TypedHeader(AccountHeader(account_id))) = account_header else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    let account = match state.engine.account(&account_id).await {
        Ok(account) => account,
        Err(EngineError::KeyNotFound(_)) => return Err(StatusCode::UNAUTHORIZED),
        Err(err) => {
            tracing::error!("failed to resolve account {account_id}: {err}");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    request.extensions_mut().insert(account);
    Ok(next.run(request).await)
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
    })
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route(
            "/invoices",
            get(invoices::list).post(invoices::invoice_new),
        )
        .route("/invoices/bulk", post(invoices::bulk_new))
        .route(
            "/invoices/process-scheduled",
            post(invoices::process_scheduled),
        )
        .route(
            "/invoices/{id}",
            get(invoices::get)
                .patch(invoices::update)
                .delete(invoices::delete),
        )
        .route(
            "/invoices/{id}/payments",
            get(payments::list).post(payments::payment_new),
        )
        .route(
            "/payments/{id}",
            axum::routing::delete(payments::delete),
        )
        .route(
            "/recurring-invoices",
            get(recurring::list).post(recurring::template_new),
        )
        .route("/recurring-invoices/bulk", post(recurring::bulk_new))
        .route(
            "/recurring-invoices/process-due",
            post(recurring::process_due),
        )
        .route(
            "/recurring-invoices/{id}",
            get(recurring::get)
                .patch(recurring::update)
                .delete(recurring::delete),
        )
        .route("/recurring-invoices/{id}/pause", post(recurring::pause))
        .route("/recurring-invoices/{id}/resume", post(recurring::resume))
        .route(
            "/recurring-invoices/{id}/generate",
            post(recurring::generate),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .route("/health", get(health))
        .with_state(state)
}

/// The full HTTP application, ready to be served.
pub fn app(engine: Engine, notifier: Arc<dyn InvoiceNotifier>) -> Router {
    router(ServerState {
        engine: Arc::new(engine),
        notifier,
    })
}

pub async fn run_with_listener(
    engine: Engine,
    notifier: Arc<dyn InvoiceNotifier>,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app(engine, notifier)).await
}
