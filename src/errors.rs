use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::models::ConversationState;
use crate::services::card_crypto::CardCryptoError;
use crate::services::partner::PartnerError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("invalid conversation state: {0}")]
    InvalidState(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("AI provider error: {0}")]
    Ai(String),

    #[error("could not understand the request (classifier replied {0:?})")]
    Unclassified(String),

    #[error("partner API error: {0}")]
    Partner(#[from] PartnerError),

    #[error("payment was charged but the cart could not be confirmed (order {orderid}): {source}")]
    PaymentUnconfirmed {
        orderid: String,
        #[source]
        source: PartnerError,
    },

    #[error("card encryption error: {0}")]
    Crypto(#[from] CardCryptoError),

    #[error("conversation did not settle after {0} steps")]
    StepLimit(usize),

    /// A failure that hands the conversation back so the caller can retry from it.
    #[error("{source}")]
    Resumable {
        source: Box<AppError>,
        state: Box<ConversationState>,
    },
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::InvalidState(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_)
            | AppError::Ai(_)
            | AppError::Unclassified(_)
            | AppError::Partner(_)
            | AppError::PaymentUnconfirmed { .. }
            | AppError::Crypto(_)
            | AppError::StepLimit(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Resumable { source, .. } => source.status(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Resumable { state, .. } => {
                serde_json::json!({ "error": self.to_string(), "state": state })
            }
            _ => serde_json::json!({ "error": self.to_string() }),
        };
        (status, axum::Json(body)).into_response()
    }
}
