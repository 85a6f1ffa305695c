use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use serde_json::Value;

use crate::error::ApiError;
use crate::server::AppState;

pub(crate) const PROMPT_MISSING: &str = "Prompt is missing";

#[derive(serde::Serialize)]
pub(crate) struct ChatResponse {
    response: String,
}

#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
}

/// Pull the prompt out of a request body. Absent, null, and empty prompts are
/// "missing"; any other string, blank or not, is passed through.
pub(crate) fn extract_prompt(body: &[u8]) -> Result<String, ApiError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid request body: {e}")))?;
    let Value::Object(mut fields) = value else {
        return Err(ApiError::BadRequest(
            "invalid request body: expected a JSON object".into(),
        ));
    };
    match fields.remove("prompt") {
        None | Some(Value::Null) => Err(ApiError::BadRequest(PROMPT_MISSING.into())),
        Some(Value::String(prompt)) if prompt.is_empty() => {
            Err(ApiError::BadRequest(PROMPT_MISSING.into()))
        }
        Some(Value::String(prompt)) => Ok(prompt),
        Some(_) => Err(ApiError::BadRequest(
            "invalid request body: prompt must be a string".into(),
        )),
    }
}

pub(crate) async fn chat_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ChatResponse>, ApiError> {
    let prompt = extract_prompt(&body)?;
    tracing::info!(prompt_len = prompt.len(), "chat request");
    let response = state.handler.answer(prompt).await?;
    Ok(Json(ChatResponse { response }))
}

pub(crate) async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}
