use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::auth::{ServiceAccountKey, TokenSource};
use crate::error::SheetsError;
use crate::row::Cell;

#[async_trait]
pub trait RowSink: Send + Sync {
    async fn append_row(&self, cells: &[Cell]) -> Result<(), SheetsError>;
}

#[derive(Clone)]
pub struct SheetsConfig {
    pub api_base: String,
    pub spreadsheet_id: String,
    pub worksheet: String,
}

pub struct SheetsClient {
    http: reqwest::Client,
    tokens: TokenSource,
    api_base: Url,
    spreadsheet_id: String,
    worksheet: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AppendRequest<'a> {
    major_dimension: &'static str,
    values: [&'a [Cell]; 1],
}

#[derive(Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    title: String,
}

impl SheetsClient {
    pub async fn open(config: &SheetsConfig, key: ServiceAccountKey) -> Result<Self, SheetsError> {
        // Authenticate and confirm the worksheet exists before serving webhooks.
        let api_base = Url::parse(&config.api_base)
            .map_err(|err| SheetsError::InvalidUrl(format!("{}: {err}", config.api_base)))?;
        let http = reqwest::Client::new();
        let tokens = TokenSource::new(http.clone(), key)?;
        let client = Self {
            http,
            tokens,
            api_base,
            spreadsheet_id: config.spreadsheet_id.clone(),
            worksheet: config.worksheet.clone(),
        };
        client.ensure_worksheet().await?;
        tracing::info!(
            client_email = %client.tokens.client_email(),
            spreadsheet_id = %client.spreadsheet_id,
            worksheet = %client.worksheet,
            "spreadsheet opened"
        );
        Ok(client)
    }

    async fn ensure_worksheet(&self) -> Result<(), SheetsError> {
        let mut url = self.endpoint(&["v4", "spreadsheets", self.spreadsheet_id.as_str()])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties.title");

        let token = self.tokens.token().await?;
        let response = self.http.get(url).bearer_auth(token).send().await?;
        let metadata: SpreadsheetMetadata = check_status(response).await?.json().await?;

        if metadata
            .sheets
            .iter()
            .any(|sheet| sheet.properties.title == self.worksheet)
        {
            Ok(())
        } else {
            Err(SheetsError::WorksheetNotFound(self.worksheet.clone()))
        }
    }

    fn append_url(&self) -> Result<Url, SheetsError> {
        // A1 notation quotes the tab name and doubles embedded quotes.
        let range = format!("'{}':append", self.worksheet.replace('\'', "''"));
        let mut url = self.endpoint(&[
            "v4",
            "spreadsheets",
            self.spreadsheet_id.as_str(),
            "values",
            range.as_str(),
        ])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");
        Ok(url)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, SheetsError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| SheetsError::InvalidUrl(self.api_base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl RowSink for SheetsClient {
    async fn append_row(&self, cells: &[Cell]) -> Result<(), SheetsError> {
        let url = self.append_url()?;
        let token = self.tokens.token().await?;
        let body = AppendRequest {
            major_dimension: "ROWS",
            values: [cells],
        };
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SheetsError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SheetsError::Api {
        status: status.as_u16(),
        body,
    })
}
