use crate::config::UploadConfig;
use crate::error::Result;
use crate::sheets::SpreadsheetService;
use crate::table::Table;
use tracing::{debug, info, instrument};

pub struct Uploader<S> {
    config: UploadConfig,
    sheets_client: S,
}

#[derive(Debug)]
pub struct UploadOutcome {
    /// A1 range the append started at
    pub range: String,
    /// Number of rows submitted
    pub rows: usize,
}

impl<S> Uploader<S>
where
    S: SpreadsheetService + Sync,
{
    pub fn new(config: UploadConfig, sheets_client: S) -> Self {
        Self {
            config,
            sheets_client,
        }
    }

    /// Append every data row of `table` after the last populated row of
    /// the probe column, in one batch.
    #[instrument(name = "Upload", skip_all, fields(sheet = %self.config.sheet_name))]
    pub async fn upload(&self, table: &Table) -> Result<UploadOutcome> {
        let occupied = self
            .sheets_client
            .probe_column_rows(&self.config.spreadsheet_id, &self.config.sheet_name)
            .await?;

        let range = format!("{}!A{}", self.config.sheet_name, occupied + 1);
        debug!(occupied, range = %range, "Computed append start");

        self.sheets_client
            .append_rows(&self.config.spreadsheet_id, &range, table.rows())
            .await?;

        info!(rows = table.rows().len(), range = %range, "Rows appended");

        Ok(UploadOutcome {
            range,
            rows: table.rows().len(),
        })
    }
}
