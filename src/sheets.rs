//! Thin wrapper over the Google Sheets v4 REST API for worksheet setup and row appends.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::CredentialSource;
use crate::types::JournalEntry;
use crate::utils::mask_id;

pub const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive",
];

pub const HEADER: [&str; 9] = [
    "timestamp_local",
    "discord_user",
    "message_id",
    "ticker",
    "position",
    "price_open",
    "price_close",
    "gain_loss",
    "gain_loss%",
];

const NEW_SHEET_ROWS: u32 = 1000;

/// Append-only tabular store for journal rows.
#[async_trait]
pub trait RowSink: Send + Sync {
    async fn append_row(&self, entry: &JournalEntry) -> Result<()>;
}

/// Cell values in header order. Absent values become empty cells here and nowhere else.
pub fn row_values(entry: &JournalEntry) -> Vec<Value> {
    let opt = |v: Option<f64>| v.map_or_else(|| json!(""), |x| json!(x));
    vec![
        json!(entry.timestamp_local),
        json!(entry.user),
        json!(entry.message_id),
        json!(entry.ticker),
        json!(entry.position.as_str()),
        json!(entry.price_open),
        opt(entry.price_close),
        opt(entry.gain_loss),
        opt(entry.gain_loss_percent),
    ]
}

/// A1 notation with the sheet title quoted (`'` doubled inside the title).
pub fn a1_range(sheet: &str, cells: &str) -> String {
    format!("'{}'!{}", sheet.replace('\'', "''"), cells)
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

pub struct SheetsClient {
    http: Client,
    auth: Arc<dyn TokenProvider>,
    base_url: String,
    spreadsheet_id: String,
    worksheet: String,
}

impl SheetsClient {
    pub fn new(creds: &CredentialSource, spreadsheet_id: &str, worksheet: &str) -> Result<Self> {
        let auth: Arc<dyn TokenProvider> = Arc::new(load_service_account(creds)?);
        Ok(Self::with_provider(auth, SHEETS_API, spreadsheet_id, worksheet))
    }

    pub fn with_provider(
        auth: Arc<dyn TokenProvider>,
        base_url: &str,
        spreadsheet_id: &str,
        worksheet: &str,
    ) -> Self {
        Self {
            http: Client::new(),
            auth,
            base_url: base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
            worksheet: worksheet.to_string(),
        }
    }

    pub fn worksheet(&self) -> &str {
        &self.worksheet
    }

    /// `{base}/{segments...}` with each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url).context("parse Sheets base url")?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Sheets base url cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn bearer(&self) -> Result<String> {
        let token = self
            .auth
            .token(SCOPES)
            .await
            .context("fetch service-account token")?;
        Ok(token.as_str().to_string())
    }

    pub async fn worksheet_titles(&self) -> Result<Vec<String>> {
        let url = self.url(&[&self.spreadsheet_id])?;
        debug!("GET {url}");
        let resp = self
            .http
            .get(url)
            .bearer_auth(self.bearer().await?)
            .query(&[("fields", "sheets.properties.title")])
            .send()
            .await
            .context("list worksheets")?;
        let meta: SpreadsheetMeta = check(resp).await?.json().await?;
        Ok(meta.sheets.into_iter().map(|s| s.properties.title).collect())
    }

    async fn add_worksheet(&self) -> Result<()> {
        let url = self.url(&[&format!("{}:batchUpdate", self.spreadsheet_id)])?;
        let body = json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": self.worksheet,
                        "gridProperties": {
                            "rowCount": NEW_SHEET_ROWS,
                            "columnCount": HEADER.len(),
                        }
                    }
                }
            }]
        });
        debug!("POST {url}");
        let resp = self
            .http
            .post(url)
            .bearer_auth(self.bearer().await?)
            .json(&body)
            .send()
            .await
            .context("add worksheet")?;
        check(resp).await?;
        Ok(())
    }

    async fn write_header(&self) -> Result<()> {
        let range = a1_range(&self.worksheet, "A1:I1");
        let url = self.url(&[&self.spreadsheet_id, "values", &range])?;
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": [HEADER],
        });
        debug!("PUT {url}");
        let resp = self
            .http
            .put(url)
            .bearer_auth(self.bearer().await?)
            .query(&[("valueInputOption", "RAW")])
            .json(&body)
            .send()
            .await
            .context("write header row")?;
        check(resp).await?;
        Ok(())
    }

    /// Create the worksheet with its header row unless it already exists.
    pub async fn ensure_worksheet(&self) -> Result<()> {
        let titles = self.worksheet_titles().await?;
        info!(
            "Spreadsheet {} worksheets: {:?}",
            mask_id(&self.spreadsheet_id),
            titles
        );
        if titles.iter().any(|t| t == &self.worksheet) {
            return Ok(());
        }
        self.add_worksheet().await?;
        self.write_header().await?;
        info!("Created worksheet '{}' with headers.", self.worksheet);
        Ok(())
    }
}

#[async_trait]
impl RowSink for SheetsClient {
    async fn append_row(&self, entry: &JournalEntry) -> Result<()> {
        let range = a1_range(&self.worksheet, "A1");
        let url = self.url(&[&self.spreadsheet_id, "values", &format!("{range}:append")])?;
        let body = json!({ "values": [row_values(entry)] });
        debug!("POST {url}");
        let resp = self
            .http
            .post(url)
            .bearer_auth(self.bearer().await?)
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&body)
            .send()
            .await
            .context("append journal row")?;
        check(resp).await?;
        Ok(())
    }
}

fn load_service_account(creds: &CredentialSource) -> Result<CustomServiceAccount> {
    match creds {
        CredentialSource::File { path } => CustomServiceAccount::from_file(path)
            .with_context(|| format!("read service account key from {path}")),
        CredentialSource::Env { var } => {
            let json = std::env::var(var).with_context(|| format!("missing {var} in environment"))?;
            CustomServiceAccount::from_json(&json)
                .with_context(|| format!("parse service account key from {var}"))
        }
    }
}

async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        anyhow::bail!("Sheets API error (HTTP {status}): {text}");
    }
    Ok(resp)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::Position;
    use axum::http::{HeaderMap, Method, Uri};
    use axum::{Json, Router};
    use gcp_auth::Token;
    use tokio::sync::Mutex;

    /// Collects appended rows; optionally fails every append.
    #[derive(Default)]
    pub(crate) struct MemorySink {
        pub rows: Mutex<Vec<Vec<Value>>>,
        pub fail: bool,
    }

    #[async_trait]
    impl RowSink for MemorySink {
        async fn append_row(&self, entry: &JournalEntry) -> Result<()> {
            if self.fail {
                anyhow::bail!("quota exceeded");
            }
            self.rows.lock().await.push(row_values(entry));
            Ok(())
        }
    }

    fn entry(close: Option<f64>, gl: Option<f64>, pct: Option<f64>) -> JournalEntry {
        JournalEntry {
            timestamp_local: "2024-03-15 20:00:00".into(),
            user: "trader#0".into(),
            message_id: "42".into(),
            ticker: "EMTK".into(),
            position: Position::Long,
            price_open: 100.0,
            price_close: close,
            gain_loss: gl,
            gain_loss_percent: pct,
        }
    }

    #[test]
    fn header_has_nine_fixed_columns() {
        assert_eq!(HEADER.len(), 9);
        assert_eq!(HEADER[0], "timestamp_local");
        assert_eq!(HEADER[1], "discord_user");
        assert_eq!(HEADER[8], "gain_loss%");
    }

    #[test]
    fn closed_row_has_numbers() {
        let row = row_values(&entry(Some(110.0), Some(10.0), Some(10.0)));
        assert_eq!(row.len(), HEADER.len());
        assert_eq!(row[2], json!("42"));
        assert_eq!(row[4], json!("long"));
        assert_eq!(row[5], json!(100.0));
        assert_eq!(row[6], json!(110.0));
        assert_eq!(row[7], json!(10.0));
        assert_eq!(row[8], json!(10.0));
    }

    #[test]
    fn open_row_has_empty_cells() {
        let row = row_values(&entry(None, None, None));
        assert_eq!(row[6], json!(""));
        assert_eq!(row[7], json!(""));
        assert_eq!(row[8], json!(""));
    }

    #[test]
    fn a1_range_quotes_title() {
        assert_eq!(a1_range("TradingJournal", "A1:I1"), "'TradingJournal'!A1:I1");
        assert_eq!(a1_range("Bob's Trades", "A1"), "'Bob''s Trades'!A1");
    }

    #[tokio::test]
    async fn memory_sink_records_rows() {
        let sink = MemorySink::default();
        sink.append_row(&entry(None, None, None)).await.unwrap();
        assert_eq!(sink.rows.lock().await.len(), 1);

        let failing = MemorySink { fail: true, ..Default::default() };
        assert!(failing.append_row(&entry(None, None, None)).await.is_err());
    }

    struct StaticToken;

    #[async_trait]
    impl TokenProvider for StaticToken {
        async fn token(&self, _scopes: &[&str]) -> Result<Arc<Token>, gcp_auth::Error> {
            let token: Token =
                serde_json::from_str(r#"{"access_token":"t","expires_in":3600}"#).unwrap();
            Ok(Arc::new(token))
        }

        async fn project_id(&self) -> Result<Arc<str>, gcp_auth::Error> {
            Ok(Arc::from("test-project"))
        }
    }

    #[derive(Debug, Clone)]
    struct Seen {
        method: Method,
        uri: String,
        auth: String,
        body: String,
    }

    type SeenLog = Arc<std::sync::Mutex<Vec<Seen>>>;

    /// Local stand-in for the Sheets API that lists `titles` and records every request.
    async fn fake_sheets(titles: &[&str]) -> (String, SeenLog) {
        let seen: SeenLog = Arc::default();
        let sheets: Vec<Value> = titles
            .iter()
            .map(|t| json!({ "properties": { "title": t } }))
            .collect();
        let log = seen.clone();
        let app = Router::new().fallback(
            move |method: Method, uri: Uri, headers: HeaderMap, body: String| {
                let log = log.clone();
                let sheets = sheets.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    let is_get = method == Method::GET;
                    log.lock().unwrap().push(Seen {
                        method,
                        uri: uri.to_string(),
                        auth,
                        body,
                    });
                    if is_get {
                        Json(json!({ "sheets": sheets }))
                    } else {
                        Json(json!({}))
                    }
                }
            },
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("http://{addr}/v4/spreadsheets"), seen)
    }

    fn client(base: &str, worksheet: &str) -> SheetsClient {
        SheetsClient::with_provider(Arc::new(StaticToken), base, "sid", worksheet)
    }

    fn body_json(seen: &Seen) -> Value {
        serde_json::from_str(&seen.body).unwrap()
    }

    #[tokio::test]
    async fn existing_worksheet_is_left_alone() {
        let (base, seen) = fake_sheets(&["Sheet1", "TradingJournal"]).await;
        client(&base, "TradingJournal").ensure_worksheet().await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, Method::GET);
        assert_eq!(seen[0].uri, "/v4/spreadsheets/sid?fields=sheets.properties.title");
        assert_eq!(seen[0].auth, "Bearer t");
    }

    #[tokio::test]
    async fn missing_worksheet_is_created_with_header() {
        let (base, seen) = fake_sheets(&["Sheet1"]).await;
        client(&base, "Bob's Trades").ensure_worksheet().await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].method, Method::GET);

        assert_eq!(seen[1].method, Method::POST);
        assert_eq!(seen[1].uri, "/v4/spreadsheets/sid:batchUpdate");
        let props = &body_json(&seen[1])["requests"][0]["addSheet"]["properties"];
        assert_eq!(props["title"], json!("Bob's Trades"));
        assert_eq!(props["gridProperties"]["rowCount"], json!(1000));
        assert_eq!(props["gridProperties"]["columnCount"], json!(9));

        assert_eq!(seen[2].method, Method::PUT);
        assert_eq!(
            seen[2].uri,
            "/v4/spreadsheets/sid/values/'Bob''s%20Trades'!A1:I1?valueInputOption=RAW"
        );
        assert_eq!(body_json(&seen[2])["values"][0], json!(HEADER));
    }

    #[tokio::test]
    async fn append_posts_user_entered_row() {
        let (base, seen) = fake_sheets(&[]).await;
        client(&base, "Bob's Trades")
            .append_row(&entry(None, None, None))
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, Method::POST);
        assert_eq!(
            seen[0].uri,
            "/v4/spreadsheets/sid/values/'Bob''s%20Trades'!A1:append?valueInputOption=USER_ENTERED&insertDataOption=INSERT_ROWS"
        );
        assert_eq!(seen[0].auth, "Bearer t");
        let row = &body_json(&seen[0])["values"][0];
        assert_eq!(row[3], json!("EMTK"));
        assert_eq!(row[5], json!(100.0));
        assert_eq!(row[6], json!(""));
        assert_eq!(row[8], json!(""));
    }
}
