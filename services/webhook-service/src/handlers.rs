use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::Value;

use crate::models::StatusResponse;
use crate::row::{build_row, SourceHeaders};
use crate::state::AppState;

pub const HEALTH_MESSAGE: &str = "Checkbox webhook receiver is running.";
pub const WRITE_FAILED_MESSAGE: &str = "Failed to write to sheet";

const ORG_NAME_HEADER: &str = "orgname";
const CSU_HEADER: &str = "csu";

pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, HEALTH_MESSAGE)
}

pub async fn checkbox_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    // Content-Type is ignored; the survey tool does not always send one.
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::warn!(error = %err, body_len = body.len(), "rejected webhook with invalid json");
            return (
                StatusCode::BAD_REQUEST,
                Json(StatusResponse::error(format!("Invalid JSON: {err}"))),
            )
                .into_response();
        }
    };

    let pretty = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string());
    tracing::info!(payload = %pretty, "received payload");

    let source = source_headers(&headers);
    let row = build_row(&payload, &source, Utc::now());

    if let Err(err) = state.sink.append_row(&row.into_cells()).await {
        tracing::error!(error = %err, "error writing to sheet");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(StatusResponse::error(WRITE_FAILED_MESSAGE)),
        )
            .into_response();
    }

    tracing::info!(
        org_name = source.org_name.as_deref().unwrap_or("-"),
        csu = source.csu.as_deref().unwrap_or("-"),
        "row appended"
    );
    (StatusCode::OK, Json(StatusResponse::success())).into_response()
}

fn source_headers(headers: &HeaderMap) -> SourceHeaders {
    let read = |name: &str| {
        headers
            .get(name)
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
    };
    SourceHeaders {
        org_name: read(ORG_NAME_HEADER),
        csu: read(CSU_HEADER),
    }
}
