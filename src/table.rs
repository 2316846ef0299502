use crate::error::{AppError, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// In-memory copy of a CSV file: the header row plus data rows, both in
/// file order, all cells as strings.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Load a CSV file from disk.
    ///
    /// Fails if the path does not exist or the file cannot be parsed as
    /// CSV. A parse error anywhere aborts the whole load; no partial table
    /// is returned.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AppError::Csv(format!("CSV file not found at {:?}", path)));
        }

        let file = File::open(path)
            .map_err(|e| AppError::Csv(format!("Failed to open {:?}: {}", path, e)))?;

        Self::from_reader(file)
    }

    fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|e| AppError::Csv(format!("Failed to read CSV headers: {}", e)))?
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut rows = Vec::new();
        for result in csv_reader.records() {
            let record = result
                .map_err(|e| AppError::Csv(format!("Failed to parse CSV record: {}", e)))?;
            rows.push(record.iter().map(|s| s.to_string()).collect());
        }

        Ok(Table { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Data rows only, header excluded.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod test_helpers {
    use super::*;

    pub(crate) fn mock_table(rows: usize) -> Table {
        Table {
            headers: vec!["name".to_string(), "amount".to_string()],
            rows: (0..rows)
                .map(|i| vec![format!("row {}", i), format!("{}.00", i)])
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_load_missing_path() {
        let path = PathBuf::from("/nonexistent/input.csv");
        let err = Table::load(&path).unwrap_err();
        assert!(err.to_string().contains("not found"), "got: {}", err);
    }

    #[test]
    fn test_rows_preserve_file_order() {
        let input = "name,amount\nrent,1200\ngroceries,84.50\nrent,1200\n";
        let table = Table::from_reader(input.as_bytes()).unwrap();

        assert_eq!(table.headers(), ["name", "amount"]);
        assert_eq!(
            table.rows(),
            [
                vec!["rent".to_string(), "1200".to_string()],
                vec!["groceries".to_string(), "84.50".to_string()],
                vec!["rent".to_string(), "1200".to_string()],
            ]
        );
    }

    #[test]
    fn test_quoted_fields() {
        let input = "description,amount\n\"coffee, beans\",12.99\n";
        let table = Table::from_reader(input.as_bytes()).unwrap();

        assert_eq!(
            table.rows(),
            [vec!["coffee, beans".to_string(), "12.99".to_string()]]
        );
    }

    #[test]
    fn test_ragged_row_is_an_error() {
        let input = "name,amount\nrent,1200\ngroceries\n";
        let err = Table::from_reader(input.as_bytes()).unwrap_err();
        assert!(matches!(err, AppError::Csv(_)));
    }

    #[test]
    fn test_header_only_file_is_empty() {
        let input = "name,amount\n";
        let table = Table::from_reader(input.as_bytes()).unwrap();

        assert!(table.is_empty());
        assert_eq!(table.headers(), ["name", "amount"]);
    }
}
