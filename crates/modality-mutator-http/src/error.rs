//! Error responses for the HTTP facade.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use modality_client::CommandError;
use modality_types::MutatorId;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing mutator_apikey header")]
    MissingApiKey,
    #[error("invalid api key")]
    InvalidApiKey,
    #[error("mutator not found: {0}")]
    MutatorNotFound(String),
    #[error("mutator {mutator} already has an active mutation")]
    AlreadyInjected { mutator: MutatorId },
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("mutator error: {0}")]
    Mutator(String),
}

impl ApiError {
    /// - missing key: 400, wrong key: 401
    /// - unknown mutator: 404
    /// - second inject before reset: 409
    /// - params that fail the descriptor: 422
    /// - the mutator itself failed: 500
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingApiKey => StatusCode::BAD_REQUEST,
            Self::InvalidApiKey => StatusCode::UNAUTHORIZED,
            Self::MutatorNotFound(_) => StatusCode::NOT_FOUND,
            Self::AlreadyInjected { .. } => StatusCode::CONFLICT,
            Self::InvalidParams(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Mutator(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CommandError> for ApiError {
    fn from(e: CommandError) -> Self {
        match e {
            CommandError::AlreadyInjected { mutator, .. } => Self::AlreadyInjected { mutator },
            CommandError::UnknownMutator(id) => Self::MutatorNotFound(id.to_string()),
            CommandError::InvalidParams(msg) => Self::InvalidParams(msg),
            CommandError::Mutator(e) => Self::Mutator(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "mutator request failed");
        } else {
            tracing::debug!(error = %self, %status, "mutator request rejected");
        }
        // The mutator's own message stays in the log.
        let message = match &self {
            Self::Mutator(_) => "internal mutator error".to_string(),
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
