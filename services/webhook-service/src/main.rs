mod app;
mod audit;
mod auth;
mod config;
mod error;
mod handlers;
mod models;
mod row;
mod sheets;
mod state;

use std::{process::ExitCode, sync::Arc};

use surveyrelay_common::{bind_listener, init_tracing, shutdown_signal};

use crate::auth::ServiceAccountKey;
use crate::config::WebhookConfig;
use crate::sheets::SheetsClient;
use crate::state::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    let _guards = init_tracing("webhook-service");

    let config = WebhookConfig::from_env();

    let key = match ServiceAccountKey::from_file(&config.credentials_path) {
        Ok(key) => key,
        Err(err) => {
            tracing::error!(error = %err, "load service account credentials failed");
            return ExitCode::FAILURE;
        }
    };

    // Authenticate once up front; requests reuse this handle.
    let sheet = match SheetsClient::open(&config.sheets, key).await {
        Ok(sheet) => sheet,
        Err(err) => {
            tracing::error!(
                error = %err,
                spreadsheet_id = %config.sheets.spreadsheet_id,
                worksheet = %config.sheets.worksheet,
                "open spreadsheet failed"
            );
            return ExitCode::FAILURE;
        }
    };

    let app = app::build_router(AppState::new(Arc::new(sheet)), config.max_body_bytes);
    let listener = match bind_listener(config.port).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, port = config.port, "bind listener failed");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(port = config.port, "checkbox webhook receiver listening");

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %err, "server error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
