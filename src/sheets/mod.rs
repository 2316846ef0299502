mod auth;
mod client;
mod types;

pub use client::SheetsClient;

// Re-export clear_tokens for CLI usage
pub use auth::clear_tokens as clear_sheets_tokens;

use crate::error::Result;
use async_trait::async_trait;

/// Narrow view of the spreadsheet service used by the uploader.
#[async_trait]
pub trait SpreadsheetService {
    /// Number of populated rows in the probe column (column A) of the
    /// sheet, counted from row 1 down to the last populated cell. Gaps
    /// above the last value are included in the count; data in other
    /// columns below it is not seen, so the result understates the true
    /// end of data when column A has trailing blanks.
    async fn probe_column_rows(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<usize>;

    /// Append `rows` starting at `range`, inserting new rows rather than
    /// overwriting, with cell values taken literally.
    async fn append_rows(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: &[Vec<String>],
    ) -> Result<()>;
}
