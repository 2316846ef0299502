use super::SpreadsheetService;
use crate::config::GoogleConfig;
use crate::error::{AppError, Result};
use crate::sheets::auth::GoogleAuth;
use crate::sheets::types::{AppendRequest, AppendResponse, ValuesResponse};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

const SHEETS_API_BASE_URL: &str = "https://sheets.googleapis.com/v4";

pub struct SheetsClient {
    client: Client,
    access_token: String,
    base_url: String,
}

impl SheetsClient {
    /// Create a new SheetsClient with authenticated access
    ///
    /// This will automatically handle token validation, refresh, or
    /// interactive authentication as needed.
    #[instrument(name = "Authenticating to Google Sheets", skip_all)]
    pub async fn new(config: &GoogleConfig) -> Result<Self> {
        let auth = GoogleAuth::new(config)?;
        let tokens = auth.get_valid_tokens().await?;

        Ok(Self {
            client: auth.http_client(),
            access_token: tokens.access_token,
            base_url: SHEETS_API_BASE_URL.to_string(),
        })
    }
}

#[async_trait]
impl SpreadsheetService for SheetsClient {
    #[instrument(name = "Probing sheet", skip_all, fields(sheet = %sheet_name))]
    async fn probe_column_rows(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<usize> {
        let url = format!(
            "{}/spreadsheets/{}/values/{}!A1:A",
            self.base_url, spreadsheet_id, sheet_name
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Sheets(format!(
                "Failed to read column A of '{}': {} - {}",
                sheet_name, status, body
            )));
        }

        let values: ValuesResponse = response.json().await?;

        Ok(values.values.map(|rows| rows.len()).unwrap_or(0))
    }

    #[instrument(name = "Appending rows", skip_all, fields(range = %range))]
    async fn append_rows(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: &[Vec<String>],
    ) -> Result<()> {
        let url = format!(
            "{}/spreadsheets/{}/values/{}:append",
            self.base_url, spreadsheet_id, range
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&AppendRequest { values: rows })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Sheets(format!(
                "Failed to append to '{}': {} - {}",
                range, status, body
            )));
        }

        let ack: AppendResponse = response.json().await?;
        let updates = ack.updates.as_ref();
        debug!(
            updated_range = updates.and_then(|u| u.updated_range.as_deref()),
            updated_rows = updates.and_then(|u| u.updated_rows),
            "Append acknowledged"
        );

        Ok(())
    }
}
