// API client module: a small blocking HTTP client that pushes EDA output
// files to the dashboard's external upload endpoint. Validation of the
// local file happens here too, so a bad path never touches the network.

use crate::error::{UploadError, UploadResult};
use anyhow::Context;
use reqwest::blocking::{multipart, Client};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::{Deserialize, Deserializer, Serialize};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";
pub const UPLOAD_PATH: &str = "/api/eda-files/external/upload";
/// Sent on the wire as `X-API-Key`; header names are case-insensitive.
pub const API_KEY_HEADER: &str = "x-api-key";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);
/// Matches the server's multipart limit; anything larger is rejected there.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Blocking client used for uploads. Cheap to clone: the inner reqwest
/// client shares its connection pool.
#[derive(Clone, Debug)]
pub struct UploadClient {
    client: Client,
    timeout: Duration,
    max_file_size: u64,
}

/// One upload attempt: who we are, what we send and where.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadRequest {
    pub api_key: String,
    pub file_path: PathBuf,
    pub server_url: String,
}

impl UploadRequest {
    pub fn new(api_key: impl Into<String>, file_path: impl Into<PathBuf>) -> Self {
        UploadRequest {
            api_key: api_key.into(),
            file_path: file_path.into(),
            server_url: DEFAULT_SERVER_URL.to_string(),
        }
    }

    pub fn with_server_url(mut self, server_url: impl Into<String>) -> Self {
        self.server_url = server_url.into();
        self
    }

    /// Full URL of the upload endpoint. A trailing slash on the server URL
    /// is dropped so `http://host/` and `http://host` behave the same.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.server_url.trim_end_matches('/'), UPLOAD_PATH)
    }
}

/// File types the server accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Json,
}

impl FileKind {
    /// Classify a path by its extension, ignoring case.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(FileKind::Csv),
            "json" => Some(FileKind::Json),
            _ => None,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            FileKind::Csv => "text/csv",
            FileKind::Json => "application/json",
        }
    }
}

/// A request that passed local validation and is ready to go out.
#[derive(Debug)]
pub struct PreparedUpload {
    pub request: UploadRequest,
    pub kind: FileKind,
    pub file_name: String,
    pub size: u64,
    api_key: HeaderValue,
}

/// What the server hands back on `201 Created`. `fileId` is numeric on
/// some deployments, so it goes through `string_or_number`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    #[serde(deserialize_with = "string_or_number")]
    pub file_id: String,
    pub file_name: String,
    pub processed_at: String,
}

#[derive(Deserialize)]
struct SuccessEnvelope {
    data: UploadReceipt,
}

/// Error body sent with any non-201 status. Both fields are optional.
#[derive(Deserialize, Debug, Default)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

impl UploadClient {
    /// Build a client with the default 300 second timeout and 100 MiB
    /// file size limit. The timeout is applied per request in `send`.
    pub fn new() -> anyhow::Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(UploadClient {
            client,
            timeout: DEFAULT_TIMEOUT,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        })
    }

    /// Override the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// Validate and upload in one go.
    pub fn upload(&self, request: &UploadRequest) -> UploadResult<UploadReceipt> {
        let prepared = self.prepare(request)?;
        self.send(&prepared)
    }

    /// Check the local preconditions in order: the path is a regular file,
    /// the extension is csv/json, the size is within limits, and the API
    /// key can be sent as a header. No network traffic happens here.
    pub fn prepare(&self, request: &UploadRequest) -> UploadResult<PreparedUpload> {
        let path = &request.file_path;
        let metadata = match fs::metadata(path) {
            Ok(m) if m.is_file() => m,
            _ => {
                return Err(UploadError::FileNotFound { path: path.clone() });
            }
        };

        let kind = FileKind::from_path(path).ok_or_else(|| UploadError::UnsupportedFileType {
            path: path.clone(),
            extension: path
                .extension()
                .map(|e| e.to_string_lossy().into_owned()),
        })?;

        let size = metadata.len();
        if size > self.max_file_size {
            return Err(UploadError::FileTooLarge {
                size,
                limit: self.max_file_size,
            });
        }

        let mut api_key =
            HeaderValue::from_str(&request.api_key).map_err(|_| UploadError::InvalidApiKey)?;
        api_key.set_sensitive(true);

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(PreparedUpload {
            request: request.clone(),
            kind,
            file_name,
            size,
            api_key,
        })
    }

    /// POST the prepared file as multipart/form-data under the field name
    /// `file` and interpret the response.
    pub fn send(&self, upload: &PreparedUpload) -> UploadResult<UploadReceipt> {
        let url = upload.request.endpoint();
        let server_url = &upload.request.server_url;
        let path = &upload.request.file_path;

        // The file may have disappeared since `prepare`; treat that the
        // same as a missing file.
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => UploadError::FileNotFound { path: path.clone() },
            _ => UploadError::Unexpected(format!("Failed to open {}: {}", path.display(), e)),
        })?;

        let part = multipart::Part::reader_with_length(file, upload.size)
            .file_name(upload.file_name.clone())
            .mime_str(upload.kind.mime())
            .map_err(UploadError::Request)?;
        let form = multipart::Form::new().part("file", part);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, upload.api_key.clone());

        tracing::debug!(url = %url, file = %upload.file_name, size = upload.size, "sending upload");

        let res = self
            .client
            .post(&url)
            .headers(headers)
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .map_err(|e| UploadError::from_transport(e, server_url))?;

        let status = res.status();
        let body = res
            .text()
            .map_err(|e| UploadError::from_transport(e, server_url))?;
        tracing::debug!(status = %status, bytes = body.len(), "received response");

        if status == StatusCode::CREATED {
            parse_receipt(&body)
        } else {
            Err(parse_failure(status, &body))
        }
    }
}

/// Pull the receipt out of a 201 body. Missing or empty fields mean the
/// server did not actually confirm the upload.
fn parse_receipt(body: &str) -> UploadResult<UploadReceipt> {
    let envelope: SuccessEnvelope = serde_json::from_str(body)
        .map_err(|e| UploadError::Unexpected(format!("Malformed success response: {}", e)))?;
    let receipt = envelope.data;

    for (field, value) in [
        ("fileId", &receipt.file_id),
        ("fileName", &receipt.file_name),
        ("processedAt", &receipt.processed_at),
    ] {
        if value.is_empty() {
            return Err(UploadError::Unexpected(format!(
                "Success response has an empty `{}`",
                field
            )));
        }
    }
    Ok(receipt)
}

const BODY_EXCERPT_CHARS: usize = 200;

/// Non-201 responses: take whatever `error`/`message` the server gave us
/// and fill in placeholders for the rest. A body that is not JSON (say a
/// proxy's HTML error page) is kept as a short excerpt in `message`.
fn parse_failure(status: StatusCode, body: &str) -> UploadError {
    let parsed = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed,
        Err(_) => ErrorBody {
            error: None,
            message: body_excerpt(body),
        },
    };
    UploadError::HttpStatus {
        status,
        error: parsed.error.unwrap_or_else(|| "Unknown error".into()),
        message: parsed
            .message
            .unwrap_or_else(|| "No message provided".into()),
    }
}

fn body_excerpt(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut excerpt: String = trimmed.chars().take(BODY_EXCERPT_CHARS).collect();
    if trimmed.chars().count() > BODY_EXCERPT_CHARS {
        excerpt.push_str("...");
    }
    Some(excerpt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn file_kind_ignores_case() {
        assert_eq!(FileKind::from_path(Path::new("a.csv")), Some(FileKind::Csv));
        assert_eq!(FileKind::from_path(Path::new("a.CSV")), Some(FileKind::Csv));
        assert_eq!(FileKind::from_path(Path::new("dir/b.Json")), Some(FileKind::Json));
        assert_eq!(FileKind::from_path(Path::new("a.txt")), None);
        assert_eq!(FileKind::from_path(Path::new("a.json.bak")), None);
        assert_eq!(FileKind::from_path(Path::new("noext")), None);
        assert_eq!(FileKind::Csv.mime(), "text/csv");
        assert_eq!(FileKind::Json.mime(), "application/json");
    }

    #[test]
    fn timeout_defaults_and_overrides() {
        let client = UploadClient::new().unwrap();
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);
        let client = client.timeout(Duration::from_millis(250));
        assert_eq!(client.timeout, Duration::from_millis(250));
    }

    #[test]
    fn endpoint_drops_trailing_slash() {
        let req = UploadRequest::new("k", "f.csv");
        assert_eq!(req.endpoint(), "http://localhost:3000/api/eda-files/external/upload");
        let req = req.with_server_url("https://api.example.com/");
        assert_eq!(req.endpoint(), "https://api.example.com/api/eda-files/external/upload");
    }

    #[test]
    fn receipt_accepts_numeric_file_id() {
        let body = r#"{"success":true,"data":{"fileId":42,"fileName":"run.csv","fileSize":10,"processedAt":"2024-01-01T00:00:00Z"}}"#;
        let receipt = parse_receipt(body).unwrap();
        assert_eq!(receipt.file_id, "42");
        assert_eq!(receipt.file_name, "run.csv");
        assert_eq!(receipt.processed_at, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn receipt_rejects_missing_or_empty_fields() {
        let missing = parse_receipt(r#"{"data":{"fileId":"1","fileName":"a.csv"}}"#).unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::UnexpectedError);

        let empty =
            parse_receipt(r#"{"data":{"fileId":"","fileName":"a.csv","processedAt":"now"}}"#)
                .unwrap_err();
        assert_eq!(empty.kind(), ErrorKind::UnexpectedError);

        let garbage = parse_receipt("<html>oops</html>").unwrap_err();
        assert_eq!(garbage.kind(), ErrorKind::UnexpectedError);
    }

    #[test]
    fn failure_body_falls_back_to_placeholders() {
        match parse_failure(StatusCode::BAD_GATEWAY, "") {
            UploadError::HttpStatus { status, error, message } => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(error, "Unknown error");
                assert_eq!(message, "No message provided");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        match parse_failure(StatusCode::UNAUTHORIZED, r#"{"error":"Invalid API key"}"#) {
            UploadError::HttpStatus { error, message, .. } => {
                assert_eq!(error, "Invalid API key");
                assert_eq!(message, "No message provided");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn non_json_failure_body_is_kept_as_excerpt() {
        let html = "<html><body>502 Bad Gateway</body></html>";
        match parse_failure(StatusCode::BAD_GATEWAY, &format!("  {}\n", html)) {
            UploadError::HttpStatus { error, message, .. } => {
                assert_eq!(error, "Unknown error");
                assert_eq!(message, html);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let long = "é".repeat(BODY_EXCERPT_CHARS + 50);
        match parse_failure(StatusCode::INTERNAL_SERVER_ERROR, &long) {
            UploadError::HttpStatus { message, .. } => {
                assert_eq!(message.chars().count(), BODY_EXCERPT_CHARS + 3);
                assert!(message.ends_with("..."));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn prepare_rejects_directories_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let client = UploadClient::new().unwrap();
        let err = client
            .prepare(&UploadRequest::new("k", dir.path()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
    }

    #[test]
    fn prepare_checks_size_limit_and_api_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.csv");
        fs::write(&path, "a,b\n1,2\n").unwrap();

        let client = UploadClient::new().unwrap().max_file_size(4);
        let err = client.prepare(&UploadRequest::new("k", &path)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileTooLarge);

        let client = UploadClient::new().unwrap();
        let err = client
            .prepare(&UploadRequest::new("bad\nkey", &path))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidApiKey);

        let prepared = client.prepare(&UploadRequest::new("k", &path)).unwrap();
        assert_eq!(prepared.kind, FileKind::Csv);
        assert_eq!(prepared.file_name, "big.csv");
        assert_eq!(prepared.size, 8);
    }
}
