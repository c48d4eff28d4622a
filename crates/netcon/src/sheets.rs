use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::export::Row;

pub const SHEETS_API_URL: &str = "https://sheets.googleapis.com";
pub const SPREADSHEET_ID: &str = "1OeJnf9Eq5EuFn23s0n553jiGcGuXuoafREjz32T9i6I";
pub const GAMES_RANGE: &str = "Partidas!A:Z";
pub const CALENDAR_RANGE: &str = "Calendario!B:T";

#[derive(Debug, thiserror::Error)]
pub enum SheetsError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Update of {range} rejected with status {status}: {body}")]
    Rejected {
        range: String,
        status: u16,
        body: String,
    },
    #[error("No access token configured for the Sheets API")]
    MissingCredentials,
    #[error("Failed to serialize rows: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Destination for exported grids. Every call replaces the whole range.
pub trait SheetSink {
    fn overwrite(
        &self,
        range: &str,
        rows: &[Row],
    ) -> impl Future<Output = Result<(), SheetsError>>;
}

#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub api_url: String,
    pub spreadsheet_id: String,
    pub games_range: String,
    pub calendar_range: String,
    /// OAuth bearer token with the spreadsheets scope.
    pub access_token: Option<String>,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            api_url: SHEETS_API_URL.to_string(),
            spreadsheet_id: SPREADSHEET_ID.to_string(),
            games_range: GAMES_RANGE.to_string(),
            calendar_range: CALENDAR_RANGE.to_string(),
            access_token: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: &'a [Row],
}

/// Google Sheets v4 `values.update` client.
#[derive(Debug, Clone)]
pub struct GoogleSheets {
    client: Client,
    api_url: String,
    spreadsheet_id: String,
    access_token: String,
}

impl GoogleSheets {
    pub fn new(config: &SheetsConfig) -> Result<Self, SheetsError> {
        let access_token = config
            .access_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(SheetsError::MissingCredentials)?
            .to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            access_token,
        })
    }

    fn update_url(&self, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}?valueInputOption=USER_ENTERED",
            self.api_url, self.spreadsheet_id, range
        )
    }
}

impl SheetSink for GoogleSheets {
    async fn overwrite(&self, range: &str, rows: &[Row]) -> Result<(), SheetsError> {
        log::info!("Writing {} rows to {}", rows.len(), range);

        let body = ValueRange {
            range,
            major_dimension: "ROWS",
            values: rows,
        };
        let response = self
            .client
            .put(self.update_url(range))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(SheetsError::Rejected {
                range: range.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        log::debug!("Sheets API accepted {}", range);
        Ok(())
    }
}
