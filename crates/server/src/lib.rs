use api_types::ErrorBody;
use axum::{Json, extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse};
use engine::EngineError;

pub use server::{ServerState, app, run_with_listener};

mod invoices;
mod payments;
mod recurring;
mod server;
mod views;

pub enum ServerError {
    Engine(EngineError),
    /// The request itself is malformed.
    Generic(String),
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::InvalidTransition(_) | EngineError::InvoiceLocked(_) => StatusCode::CONFLICT,
        EngineError::Validation(_)
        | EngineError::TotalMismatch(_)
        | EngineError::ImmutableField(_)
        | EngineError::TemplateInactive(_)
        | EngineError::TemplateEnded(_) => StatusCode::BAD_REQUEST,
        EngineError::SequenceUnavailable(_)
        | EngineError::Delivery(_)
        | EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn body_for_engine_error(err: EngineError) -> ErrorBody {
    match err {
        EngineError::SequenceUnavailable(_) | EngineError::Delivery(_) | EngineError::Database(_) => {
            tracing::error!("internal engine error: {err}");
            ErrorBody {
                error: "internal server error".to_string(),
                details: None,
            }
        }
        other => ErrorBody {
            error: other.kind().to_string(),
            details: Some(other.to_string()),
        },
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), body_for_engine_error(err)),
            ServerError::Generic(details) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: "validation_error".to_string(),
                    details: Some(details),
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Generic(format!("invalid request body: {}", rejection.body_text()))
    }
}
