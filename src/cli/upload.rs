use crate::config::Config;
use crate::error::Result;
use crate::sheets::SheetsClient;
use crate::table::Table;
use crate::upload::Uploader;
use tracing::info;

pub async fn execute() -> Result<()> {
    let config = Config::load()?;

    let sheets_client = SheetsClient::new(&config.google).await?;

    let table = Table::load(&config.upload.csv_path)?;
    if table.is_empty() {
        info!(path = ?config.upload.csv_path, "CSV file has no data rows, nothing to append");
        return Ok(());
    }

    let uploader = Uploader::new(config.upload, sheets_client);
    let outcome = uploader.upload(&table).await?;

    info!(rows = outcome.rows, range = %outcome.range, "Upload completed");

    Ok(())
}
