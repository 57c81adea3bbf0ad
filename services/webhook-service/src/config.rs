use std::path::PathBuf;

use surveyrelay_common::env_or;

use crate::sheets::SheetsConfig;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_CREDENTIALS_FILE: &str = "service_account.json";
pub const DEFAULT_SPREADSHEET_ID: &str = "1UQtc6_iIJ5IVbdjwVgEV17MZ_0kyQ-CCc7_-LDOpL_E";
pub const DEFAULT_WORKSHEET: &str = "Sheet1";
pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com";
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

pub struct WebhookConfig {
    pub port: u16,
    pub max_body_bytes: usize,
    pub credentials_path: PathBuf,
    pub sheets: SheetsConfig,
}

impl WebhookConfig {
    pub fn from_env() -> Self {
        // Spreadsheet coordinates are compiled in; env only overrides per deployment.
        Self {
            port: env_or("PORT", DEFAULT_PORT),
            max_body_bytes: env_or("MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES),
            credentials_path: env_or(
                "GOOGLE_CREDENTIALS_FILE",
                PathBuf::from(DEFAULT_CREDENTIALS_FILE),
            ),
            sheets: SheetsConfig {
                api_base: env_or("SHEETS_API_BASE", DEFAULT_SHEETS_API_BASE.to_string()),
                spreadsheet_id: env_or("SPREADSHEET_ID", DEFAULT_SPREADSHEET_ID.to_string()),
                worksheet: env_or("WORKSHEET_NAME", DEFAULT_WORKSHEET.to_string()),
            },
        }
    }
}
