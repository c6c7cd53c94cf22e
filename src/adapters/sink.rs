use crate::domain::model::InteractionRecord;
use crate::domain::ports::InteractionSink;
use crate::utils::error::{HandoutError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";
pub const DEFAULT_WORKSHEET: &str = "interactions";
pub const DEFAULT_TOKEN_ENV: &str = "GOOGLE_SHEETS_TOKEN";

fn sink_error(message: impl Into<String>) -> HandoutError {
    HandoutError::SinkError {
        message: message.into(),
    }
}

/// Spreadsheet key from whatever was configured, checked in order:
/// a full `http(s)://` address, a partial reference containing `/d/`,
/// or the bare key itself.
pub fn resolve_sheet_location(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let invalid = |reason: &str| HandoutError::InvalidConfigValueError {
        field: "log.location".to_string(),
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid("Spreadsheet location cannot be empty"));
    }

    let key = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        let url = Url::parse(trimmed).map_err(|_| invalid("Invalid spreadsheet URL"))?;
        let segments: Vec<&str> = url.path_segments().map(|s| s.collect()).unwrap_or_default();
        segments
            .iter()
            .position(|segment| *segment == "d")
            .and_then(|index| segments.get(index + 1))
            .map(|key| key.to_string())
            .ok_or_else(|| invalid("URL does not contain a /d/<key> segment"))?
    } else if let Some((_, rest)) = trimmed.split_once("/d/") {
        rest.split(['/', '?', '#']).next().unwrap_or_default().to_string()
    } else {
        trimmed.to_string()
    };

    if key.is_empty() || key.chars().any(|c| !(c.is_ascii_alphanumeric() || c == '-' || c == '_')) {
        return Err(invalid("Spreadsheet key may only contain letters, digits, '-' and '_'"));
    }
    Ok(key)
}

/// Discards every record. Used when logging is switched off.
#[derive(Debug, Clone, Default)]
pub struct NullSink;

#[async_trait]
impl InteractionSink for NullSink {
    async fn append(&self, _record: &InteractionRecord) -> Result<()> {
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<InteractionRecord>> {
        Ok(Vec::new())
    }
}

/// Appends rows to a local CSV file, writing the header once.
#[derive(Debug, Clone)]
pub struct CsvInteractionSink {
    path: PathBuf,
}

impl CsvInteractionSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl InteractionSink for CsvInteractionSink {
    async fn append(&self, record: &InteractionRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let needs_header = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<InteractionRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut records = Vec::new();
        for (index, row) in reader.deserialize::<InteractionRecord>().enumerate() {
            match row {
                Ok(record) => records.push(record),
                // header is line 1
                Err(e) => tracing::warn!("Skipping unreadable log row {}: {}", index + 2, e),
            }
        }
        Ok(records)
    }
}

#[derive(Debug, serde::Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Google Sheets v4 values API on one worksheet.
pub struct SheetsInteractionSink {
    client: Client,
    api_base: String,
    spreadsheet_key: String,
    worksheet: String,
    access_token: Option<String>,
    token_env: String,
}

impl SheetsInteractionSink {
    pub fn new(location: &str, worksheet: impl Into<String>, token_env: impl Into<String>) -> Result<Self> {
        let token_env = token_env.into();
        let access_token = std::env::var(&token_env)
            .ok()
            .filter(|token| !token.trim().is_empty());
        let client = Client::builder().timeout(Duration::from_secs(20)).build()?;

        Ok(Self {
            client,
            api_base: SHEETS_API_BASE.to_string(),
            spreadsheet_key: resolve_sheet_location(location)?,
            worksheet: worksheet.into(),
            access_token,
            token_env,
        })
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn spreadsheet_key(&self) -> &str {
        &self.spreadsheet_key
    }

    fn token(&self) -> Result<&str> {
        self.access_token
            .as_deref()
            .ok_or_else(|| sink_error(format!("{} is not set", self.token_env)))
    }

    fn values_url(&self, suffix: &str) -> String {
        format!(
            "{}/spreadsheets/{}/values/{}{}",
            self.api_base, self.spreadsheet_key, self.worksheet, suffix
        )
    }
}

fn row_values(record: &InteractionRecord) -> Vec<serde_json::Value> {
    let mut row: Vec<serde_json::Value> = record
        .to_row()
        .into_iter()
        .map(serde_json::Value::String)
        .collect();
    // 最後一欄保留數字型態
    if let Some(last) = row.last_mut() {
        *last = serde_json::Value::from(record.num_services_kept);
    }
    row
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Maps sheet rows onto records using the header row; unknown columns are ignored.
fn records_from_rows(rows: &[Vec<serde_json::Value>]) -> Vec<InteractionRecord> {
    let Some((header, data)) = rows.split_first() else {
        return Vec::new();
    };
    let header: Vec<String> = header.iter().map(cell_text).collect();

    data.iter()
        .map(|row| {
            let field = |name: &str| {
                header
                    .iter()
                    .position(|h| h == name)
                    .and_then(|index| row.get(index))
                    .map(cell_text)
                    .unwrap_or_default()
            };
            InteractionRecord {
                interaction_id: field("interaction_id"),
                timestamp: field("timestamp"),
                site: field("site"),
                age_group: field("age_group"),
                language: field("language"),
                housing_status: field("housing_status"),
                needs: field("needs"),
                service_ids_kept: field("service_ids_kept"),
                service_ids_removed: field("service_ids_removed"),
                num_services_kept: field("num_services_kept").trim().parse().unwrap_or(0),
            }
        })
        .collect()
}

#[async_trait]
impl InteractionSink for SheetsInteractionSink {
    async fn append(&self, record: &InteractionRecord) -> Result<()> {
        let token = self.token()?;
        let response = self
            .client
            .post(self.values_url("!A1:append"))
            .bearer_auth(token)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&serde_json::json!({ "values": [row_values(record)] }))
            .send()
            .await
            .map_err(|e| sink_error(format!("append failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(sink_error(format!(
                "append returned status {}",
                response.status().as_u16()
            )));
        }
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<InteractionRecord>> {
        let token = self.token()?;
        let response = self
            .client
            .get(self.values_url(""))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| sink_error(format!("read failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(sink_error(format!(
                "read returned status {}",
                response.status().as_u16()
            )));
        }

        let range: ValueRange = response
            .json()
            .await
            .map_err(|e| sink_error(format!("unreadable sheet data: {}", e)))?;
        Ok(records_from_rows(&range.values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::INTERACTION_COLUMNS;
    use httpmock::prelude::*;
    use tempfile::TempDir;

    fn record(id: &str, kept: &str, count: usize) -> InteractionRecord {
        InteractionRecord {
            interaction_id: format!("{}_{}", id, count),
            timestamp: id.to_string(),
            site: "NFCM".to_string(),
            age_group: "18-29".to_string(),
            language: "Cree".to_string(),
            housing_status: "Not specified".to_string(),
            needs: "food;housing".to_string(),
            service_ids_kept: kept.to_string(),
            service_ids_removed: String::new(),
            num_services_kept: count,
        }
    }

    #[test]
    fn test_resolve_full_url() {
        let key = resolve_sheet_location(
            "https://docs.google.com/spreadsheets/d/1AbC-xyz_09/edit#gid=0",
        )
        .unwrap();
        assert_eq!(key, "1AbC-xyz_09");
    }

    #[test]
    fn test_resolve_partial_reference() {
        assert_eq!(
            resolve_sheet_location("docs.google.com/spreadsheets/d/1AbC-xyz_09/edit").unwrap(),
            "1AbC-xyz_09"
        );
        assert_eq!(resolve_sheet_location("/d/1AbC?usp=sharing").unwrap(), "1AbC");
    }

    #[test]
    fn test_resolve_bare_key() {
        assert_eq!(resolve_sheet_location("  1AbC-xyz_09 \n").unwrap(), "1AbC-xyz_09");
    }

    #[test]
    fn test_resolve_rejects_garbage() {
        assert!(resolve_sheet_location("").is_err());
        assert!(resolve_sheet_location("https://docs.google.com/spreadsheets/").is_err());
        assert!(resolve_sheet_location("not a key").is_err());
    }

    #[tokio::test]
    async fn test_csv_sink_appends_with_single_header() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("logs/interactions.csv");
        let sink = CsvInteractionSink::new(&path);

        sink.append(&record("2025-01-01T10:00:00", "1;2", 2)).await.unwrap();
        sink.append(&record("2025-01-02T11:00:00", "3", 1)).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("interaction_id").count(), 1);
        assert!(content.starts_with(&INTERACTION_COLUMNS.join(",")));

        let loaded = sink.load_all().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].service_ids_kept, "1;2");
        assert_eq!(loaded[1].num_services_kept, 1);
    }

    #[tokio::test]
    async fn test_csv_sink_skips_malformed_rows() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("interactions.csv");
        let sink = CsvInteractionSink::new(&path);

        sink.append(&record("2025-01-01T10:00:00", "1", 1)).await.unwrap();
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            use std::io::Write;
            writeln!(file, "broken,row,with,too,few,columns").unwrap();
            writeln!(
                file,
                "x_1,2025-01-02T09:00:00,NFCM,18-29,Cree,Shelter,food,4,,many"
            )
            .unwrap();
        }
        sink.append(&record("2025-01-03T12:00:00", "5;6", 2)).await.unwrap();

        let loaded = sink.load_all().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].service_ids_kept, "1");
        assert_eq!(loaded[1].service_ids_kept, "5;6");
    }

    #[tokio::test]
    async fn test_csv_sink_missing_file_loads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let sink = CsvInteractionSink::new(temp_dir.path().join("none.csv"));
        assert!(sink.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sheets_append_sends_raw_row() {
        let server = MockServer::start_async().await;
        let api_mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/spreadsheets/1AbC/values/interactions!A1:append")
                    .query_param("valueInputOption", "RAW")
                    .header("Authorization", "Bearer token-1")
                    .json_body(serde_json::json!({
                        "values": [[
                            "2025-01-01T10:00:00_2", "2025-01-01T10:00:00", "NFCM", "18-29",
                            "Cree", "Not specified", "food;housing", "1;2", "", 2
                        ]]
                    }));
                then.status(200).json_body(serde_json::json!({}));
            })
            .await;

        let sink = SheetsInteractionSink::new(
            "https://docs.google.com/spreadsheets/d/1AbC/edit",
            DEFAULT_WORKSHEET,
            "SERVICE_HANDOUT_TEST_UNSET_TOKEN",
        )
        .unwrap()
        .with_api_base(server.base_url())
        .with_access_token("token-1");

        sink.append(&record("2025-01-01T10:00:00", "1;2", 2)).await.unwrap();
        api_mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_sheets_load_all_maps_header() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/spreadsheets/1AbC/values/interactions");
                then.status(200).json_body(serde_json::json!({
                    "range": "interactions!A1:J3",
                    "values": [
                        ["timestamp", "needs", "service_ids_kept", "num_services_kept", "age_group"],
                        ["2025-01-01T10:00:00", "food", "1;2", "2", "55+"],
                        ["2025-01-02T10:00:00", "housing", "3", 1]
                    ]
                }));
            })
            .await;

        let sink = SheetsInteractionSink::new("1AbC", DEFAULT_WORKSHEET, "SERVICE_HANDOUT_TEST_UNSET_TOKEN")
            .unwrap()
            .with_api_base(server.base_url())
            .with_access_token("token-1");

        let records = sink.load_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].age_group, "55+");
        assert_eq!(records[0].num_services_kept, 2);
        assert_eq!(records[1].num_services_kept, 1);
        assert_eq!(records[1].age_group, "");
    }

    #[tokio::test]
    async fn test_sheets_without_token_fails_as_sink_error() {
        let sink = SheetsInteractionSink::new("1AbC", DEFAULT_WORKSHEET, "SERVICE_HANDOUT_TEST_UNSET_TOKEN").unwrap();
        let err = sink.append(&record("2025-01-01T10:00:00", "1", 1)).await.unwrap_err();
        assert!(matches!(err, HandoutError::SinkError { .. }));
    }
}
