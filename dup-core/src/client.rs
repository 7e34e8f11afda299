use reqwest::header::{CONTENT_RANGE, LOCATION, RANGE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use url::Url;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com";

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";
pub const NATIVE_MIME_PREFIX: &str = "application/vnd.google-apps.";
pub const FILE_FIELDS: &str =
    "id, name, mimeType, size, modifiedTime, webViewLink, parents, md5Checksum";
pub const LIST_FIELDS: &str =
    "files(id, name, mimeType, size, modifiedTime, webViewLink, parents, md5Checksum)";

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("resumable upload session was not returned")]
    MissingUploadSession,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorClass {
    Auth,
    NotFound,
    RateLimit,
    Transient,
    Permanent,
}

#[derive(Clone)]
pub struct DriveClient {
    http: Client,
    base_url: Url,
    token: String,
}

impl DriveClient {
    pub fn new(token: impl Into<String>) -> Result<Self, DriveError> {
        Self::with_base_url(DEFAULT_BASE_URL, token)
    }

    pub fn with_base_url(base_url: &str, token: impl Into<String>) -> Result<Self, DriveError> {
        Ok(Self {
            http: Client::new(),
            base_url: Url::parse(base_url)?,
            token: token.into(),
        })
    }

    pub async fn get_file(&self, id: &str, fields: &str) -> Result<DriveFile, DriveError> {
        let mut url = self.endpoint(&format!("/drive/v3/files/{id}"))?;
        url.query_pairs_mut().append_pair("fields", fields);
        tracing::debug!(id, "drive get_file");
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn list_files(&self, query: &FileQuery<'_>) -> Result<FileList, DriveError> {
        let mut url = self.endpoint("/drive/v3/files")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", query.q);
            pairs.append_pair("pageSize", &query.page_size.max(1).to_string());
            pairs.append_pair("fields", query.fields);
            if let Some(order_by) = query.order_by {
                pairs.append_pair("orderBy", order_by);
            }
        }
        tracing::debug!(q = query.q, page_size = query.page_size, "drive list_files");
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn create_folder(&self, name: &str, parent_id: &str) -> Result<DriveFile, DriveError> {
        let mut url = self.endpoint("/drive/v3/files")?;
        url.query_pairs_mut().append_pair("fields", FILE_FIELDS);
        let body = NewFile {
            name,
            mime_type: Some(FOLDER_MIME_TYPE),
            parents: [parent_id],
        };
        tracing::debug!(name, parent_id, "drive create_folder");
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn create_permission(
        &self,
        id: &str,
        permission: &Permission,
    ) -> Result<Permission, DriveError> {
        let url = self.endpoint(&format!("/drive/v3/files/{id}/permissions"))?;
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(permission)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    pub async fn list_permissions(&self, id: &str) -> Result<Vec<Permission>, DriveError> {
        let mut url = self.endpoint(&format!("/drive/v3/files/{id}/permissions"))?;
        url.query_pairs_mut()
            .append_pair("fields", "permissions(type, role)");
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        let list: PermissionList = Self::handle_response(response).await?;
        Ok(list.permissions)
    }

    pub async fn start_resumable_upload(
        &self,
        name: &str,
        parent_id: &str,
        size: u64,
    ) -> Result<Url, DriveError> {
        let mut url = self.endpoint("/upload/drive/v3/files")?;
        url.query_pairs_mut()
            .append_pair("uploadType", "resumable")
            .append_pair("fields", FILE_FIELDS);
        let body = NewFile {
            name,
            mime_type: None,
            parents: [parent_id],
        };
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .header("X-Upload-Content-Length", size)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::Api { status, body });
        }
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(DriveError::MissingUploadSession)?;
        Ok(Url::parse(location)?)
    }

    /// Sends one chunk of a resumable upload starting at `offset`.
    pub async fn upload_chunk(
        &self,
        session: &Url,
        chunk: Vec<u8>,
        offset: u64,
        total: u64,
    ) -> Result<UploadStatus, DriveError> {
        let content_range = if chunk.is_empty() {
            format!("bytes */{total}")
        } else {
            format!("bytes {}-{}/{total}", offset, offset + chunk.len() as u64 - 1)
        };
        let response = self
            .http
            .put(session.clone())
            .bearer_auth(&self.token)
            .header(CONTENT_RANGE, content_range)
            .body(chunk)
            .send()
            .await?;
        if response.status().as_u16() == 308 {
            let received = response
                .headers()
                .get(RANGE)
                .and_then(|value| value.to_str().ok())
                .and_then(parse_received_range)
                .unwrap_or(offset);
            return Ok(UploadStatus::InProgress { received });
        }
        Ok(UploadStatus::Complete(Self::handle_response(response).await?))
    }

    pub async fn download_chunk(
        &self,
        source: &DownloadSource,
        offset: u64,
        chunk_size: u64,
    ) -> Result<DownloadChunk, DriveError> {
        let url = match source {
            DownloadSource::Media { id } => {
                let mut url = self.endpoint(&format!("/drive/v3/files/{id}"))?;
                url.query_pairs_mut().append_pair("alt", "media");
                url
            }
            DownloadSource::Export { id, mime_type } => {
                let mut url = self.endpoint(&format!("/drive/v3/files/{id}/export"))?;
                url.query_pairs_mut().append_pair("mimeType", mime_type);
                url
            }
        };
        let range = format!("bytes={}-{}", offset, offset + chunk_size.max(1) - 1);
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .header(RANGE, range)
            .send()
            .await?;
        let status = response.status();
        // A zero-byte file cannot satisfy any range: 416 with `bytes */0`.
        if status == StatusCode::RANGE_NOT_SATISFIABLE && offset == 0 {
            let empty = response
                .headers()
                .get(CONTENT_RANGE)
                .and_then(|value| value.to_str().ok())
                .and_then(parse_content_range_total)
                == Some(0);
            if empty {
                return Ok(DownloadChunk {
                    bytes: Vec::new(),
                    total_size: Some(0),
                    done: true,
                });
            }
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::Api { status, body });
        }
        let partial = status == StatusCode::PARTIAL_CONTENT;
        let total_size = if partial {
            response
                .headers()
                .get(CONTENT_RANGE)
                .and_then(|value| value.to_str().ok())
                .and_then(parse_content_range_total)
        } else {
            response.content_length()
        };
        let bytes = response.bytes().await?.to_vec();
        let done = match (partial, total_size) {
            (false, _) => true,
            (true, Some(total)) => offset + bytes.len() as u64 >= total,
            (true, None) => bytes.is_empty(),
        };
        Ok(DownloadChunk {
            bytes,
            total_size,
            done,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, DriveError> {
        Ok(self.base_url.join(path)?)
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, DriveError> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(DriveError::Api { status, body })
        }
    }
}

impl DriveError {
    pub fn classification(&self) -> Option<ApiErrorClass> {
        match self {
            DriveError::Api { status, .. } => Some(classify_api_status(*status)),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.classification() == Some(ApiErrorClass::NotFound)
    }

    /// Connectivity failures below the HTTP layer: the request never produced a response.
    pub fn is_transport(&self) -> bool {
        match self {
            DriveError::Request(err) => {
                err.is_timeout() || err.is_connect() || err.is_request() || err.is_body()
            }
            _ => false,
        }
    }
}

fn classify_api_status(status: StatusCode) -> ApiErrorClass {
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        ApiErrorClass::Auth
    } else if status == StatusCode::NOT_FOUND {
        ApiErrorClass::NotFound
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        ApiErrorClass::RateLimit
    } else if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
        ApiErrorClass::Transient
    } else {
        ApiErrorClass::Permanent
    }
}

/// Escapes a value for use inside a single-quoted Drive query literal.
pub fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

// "bytes=0-524287" -> 524288
fn parse_received_range(value: &str) -> Option<u64> {
    let end = value.strip_prefix("bytes=")?.split('-').nth(1)?;
    end.trim().parse::<u64>().ok().map(|end| end + 1)
}

// "bytes 0-99/1234" -> 1234
fn parse_content_range_total(value: &str) -> Option<u64> {
    let total = value.rsplit('/').next()?;
    total.trim().parse::<u64>().ok()
}

fn deserialize_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Size {
        Number(u64),
        Text(String),
    }

    match Option::<Size>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Size::Number(n)) => Ok(Some(n)),
        Some(Size::Text(text)) => text
            .parse::<u64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FileQuery<'a> {
    pub q: &'a str,
    pub page_size: u32,
    pub order_by: Option<&'a str>,
    pub fields: &'a str,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    #[serde(default, deserialize_with = "deserialize_size")]
    pub size: Option<u64>,
    #[serde(default)]
    pub modified_time: Option<String>,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub web_view_link: Option<String>,
    #[serde(default)]
    pub md5_checksum: Option<String>,
}

impl DriveFile {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    #[serde(default, rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Permission {
    #[serde(rename = "type")]
    pub grantee_type: String,
    pub role: String,
}

impl Permission {
    pub fn anyone_reader() -> Self {
        Self {
            grantee_type: "anyone".to_string(),
            role: "reader".to_string(),
        }
    }

    pub fn is_anyone(&self) -> bool {
        self.grantee_type == "anyone"
    }
}

#[derive(Debug, Deserialize)]
struct PermissionList {
    #[serde(default)]
    permissions: Vec<Permission>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NewFile<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    mime_type: Option<&'a str>,
    parents: [&'a str; 1],
}

#[derive(Debug, PartialEq, Eq)]
pub enum UploadStatus {
    InProgress { received: u64 },
    Complete(DriveFile),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadSource {
    Media { id: String },
    Export { id: String, mime_type: String },
}

#[derive(Debug)]
pub struct DownloadChunk {
    pub bytes: Vec<u8>,
    pub total_size: Option<u64>,
    pub done: bool,
}
