use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::llm::prompts::{SYNTHESIS_FAILURE_MESSAGE, TRANSPORT_FAILURE_MESSAGE};
use crate::llm::CompletionOutcome;
use crate::server::state::AppState;
use crate::ui::client::{ChatRequestBody, ChatResponseBody, SpeechRequestBody};

/// Synthesized audio may be reused by the browser for an hour
pub const SPEECH_CACHE_CONTROL: &str = "public, max-age=3600";

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(ChatResponseBody::error(message))).into_response()
}

/// `POST /chat`
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequestBody>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!("Rejected chat request: {}", rejection);
            return error_response(StatusCode::BAD_REQUEST, TRANSPORT_FAILURE_MESSAGE);
        }
    };

    debug!("Chat request ({} chars)", request.message.chars().count());
    let outcome = state.completion.complete(&request.message).await;
    info!(outcome = outcome.kind(), "Chat request finished");

    match outcome {
        CompletionOutcome::Success { text } => {
            (StatusCode::OK, Json(ChatResponseBody::reply(text))).into_response()
        }
        failure => error_response(StatusCode::INTERNAL_SERVER_ERROR, failure.user_message()),
    }
}

/// `POST /speech`
pub async fn speech(
    State(state): State<AppState>,
    payload: Result<Json<SpeechRequestBody>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!("Rejected speech request: {}", rejection);
            return error_response(StatusCode::BAD_REQUEST, SYNTHESIS_FAILURE_MESSAGE);
        }
    };

    match state.synthesis.synthesize(&request.text).await {
        Ok(audio) => {
            debug!("Returning {} bytes of {}", audio.len(), audio.content_type);
            (
                [
                    (header::CONTENT_TYPE, audio.content_type),
                    (header::CACHE_CONTROL, SPEECH_CACHE_CONTROL.to_string()),
                ],
                audio.bytes,
            )
                .into_response()
        }
        Err(failure) => {
            warn!("Speech synthesis failed: {}", failure.detail);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, SYNTHESIS_FAILURE_MESSAGE)
        }
    }
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
