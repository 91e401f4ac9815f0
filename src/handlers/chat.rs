use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::ConversationState;
use crate::services::flow::{self, TurnOutcome};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ChatRequest {
    pub input: String,
    #[serde(default)]
    pub state: Option<serde_json::Value>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChatResponse {
    Prompt {
        prompt: String,
        state: ConversationState,
    },
    Final {
        message: String,
        state: ConversationState,
    },
}

impl From<TurnOutcome> for ChatResponse {
    fn from(outcome: TurnOutcome) -> Self {
        match outcome {
            TurnOutcome::Prompt { prompt, state } => ChatResponse::Prompt { prompt, state },
            TurnOutcome::Final { message, state } => ChatResponse::Final { message, state },
        }
    }
}

// POST /api/chat
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let convo = match payload.state {
        None | Some(serde_json::Value::Null) => ConversationState::default(),
        Some(value) => serde_json::from_value(value)
            .map_err(|e| AppError::InvalidState(e.to_string()))?,
    };

    match flow::run_turn(&state, convo, &payload.input).await {
        Ok(outcome) => Ok(Json(outcome.into())),
        Err(e) => {
            tracing::error!(error = %e, "chat turn failed");
            Err(e)
        }
    }
}
