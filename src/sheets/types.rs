use serde::{Deserialize, Serialize};

// https://developers.google.com/workspace/sheets/api/reference/rest/v4/spreadsheets.values/get
#[derive(Debug, Deserialize)]
pub(super) struct ValuesResponse {
    /// Absent when the requested range holds no data
    pub(super) values: Option<Vec<Vec<serde_json::Value>>>,
}

// https://developers.google.com/workspace/sheets/api/reference/rest/v4/spreadsheets.values/append
#[derive(Debug, Serialize)]
pub(super) struct AppendRequest<'a> {
    pub(super) values: &'a [Vec<String>],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AppendResponse {
    pub(super) updates: Option<AppendUpdates>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AppendUpdates {
    pub(super) updated_range: Option<String>,
    pub(super) updated_rows: Option<i64>,
}
