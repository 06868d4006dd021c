//! HTTP binding of the repository collaborator.
//!
//! Talks to a Laserfiche repository API server. All routes hang off
//! `<server>/v1/Repositories/<repository>/`:
//!
//! | Operation | Route |
//! |-----------|-------|
//! | log in    | `POST Token` (password grant, form body) |
//! | metadata  | `GET Entries/<id>` |
//! | content   | `GET Entries/<id>/Laserfiche.Repository.Document/edoc` |
//! | unlock    | `DELETE Entries/<id>/Laserfiche.Repository.Document/lock`, `DELETE Entries/<id>/lock` |
//! | import    | `POST Entries/<id>/Laserfiche.Repository.Document/pages` (`image/tiff` body streamed from disk) |
//! | log out   | `DELETE Token` |
//!
//! Every request after login carries the bearer token.

use super::{Connector, DocumentInfo, Edoc, EntryInfo, RepositorySession};
use crate::config::RepositoryConfig;
use crate::error::RepositoryError;
use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const DOCUMENT: &str = "Laserfiche.Repository.Document";

/// Slowest sustained upload rate an import is given time for.
const MIN_UPLOAD_BYTES_PER_SEC: u64 = 1024 * 1024;

/// Production [`Connector`] over HTTP.
#[derive(Debug, Default, Clone)]
pub struct HttpConnector;

impl HttpConnector {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntryResponse {
    id: i32,
    #[serde(default)]
    name: String,
    #[serde(default)]
    parent_id: Option<i32>,
    #[serde(default)]
    full_path: String,
    #[serde(default)]
    entry_type: String,
    #[serde(default)]
    page_count: u32,
    #[serde(default)]
    extension: Option<String>,
    #[serde(default)]
    is_locked: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImportResponse {
    page_count: u32,
}

#[async_trait]
impl Connector for HttpConnector {
    async fn log_in(
        &self,
        config: &RepositoryConfig,
    ) -> Result<Box<dyn RepositorySession>, RepositoryError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        // No client-wide timeout: page uploads get one sized to the body.
        let client = Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(transport)?;

        let base = repository_url(config)?;
        let session = HttpSession {
            client,
            base,
            token: String::new(),
            timeout,
        };

        info!(
            "Logging in to repository '{}' as '{}'",
            config.repository, config.username
        );
        let response = session
            .client
            .post(session.url(&["Token"]))
            .timeout(timeout)
            .form(&[
                ("grant_type", "password"),
                ("username", config.username.as_str()),
                ("password", config.password.as_str()),
            ])
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if matches!(
            status,
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            let body = response.text().await.unwrap_or_default();
            return Err(RepositoryError::Auth {
                detail: format!("HTTP {status}: {body}"),
            });
        }
        let token: TokenResponse = parse_json(check(response, None).await?).await?;

        Ok(Box::new(HttpSession {
            token: token.access_token,
            ..session
        }))
    }
}

/// `<server>/v1/Repositories/<repository>` with the repository name escaped.
fn repository_url(config: &RepositoryConfig) -> Result<Url, RepositoryError> {
    let raw = config.base_url();
    let mut url = Url::parse(&raw).map_err(|e| RepositoryError::Transport(format!("'{raw}': {e}")))?;
    url.path_segments_mut()
        .map_err(|_| RepositoryError::Transport(format!("'{raw}' cannot be a base URL")))?
        .pop_if_empty()
        .extend(["v1", "Repositories", config.repository.as_str()]);
    Ok(url)
}

/// Time allowed for a request carrying `body_len` bytes.
fn upload_timeout(base: Duration, body_len: u64) -> Duration {
    base + Duration::from_secs(body_len / MIN_UPLOAD_BYTES_PER_SEC)
}

struct HttpSession {
    client: Client,
    base: Url,
    token: String,
    timeout: Duration,
}

impl HttpSession {
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // `base` was validated as a base URL in `repository_url`.
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    /// Authenticated request with the per-request timeout.
    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        self.client
            .request(method, self.url(segments))
            .bearer_auth(&self.token)
            .timeout(self.timeout)
    }

    async fn get_entry(&self, entry_id: i32) -> Result<EntryResponse, RepositoryError> {
        let id = entry_id.to_string();
        let response = self
            .request(Method::GET, &["Entries", &id])
            .send()
            .await
            .map_err(transport)?;
        parse_json(check(response, Some(entry_id)).await?).await
    }

    async fn delete_lock(&self, segments: &[&str], entry_id: i32) -> Result<(), RepositoryError> {
        let response = self
            .request(Method::DELETE, segments)
            .send()
            .await
            .map_err(transport)?;
        match response.status() {
            // Nothing to unlock.
            StatusCode::NOT_FOUND | StatusCode::CONFLICT => {
                debug!("Entry {} held no lock ({})", entry_id, response.status());
                Ok(())
            }
            _ => check(response, Some(entry_id)).await.map(|_| ()),
        }
    }
}

#[async_trait]
impl RepositorySession for HttpSession {
    async fn document_info(&self, entry_id: i32) -> Result<DocumentInfo, RepositoryError> {
        let entry = self.get_entry(entry_id).await?;
        Ok(DocumentInfo {
            id: entry.id,
            name: entry.name,
            extension: entry.extension.unwrap_or_default(),
            page_count: entry.page_count,
            is_locked: entry.is_locked,
        })
    }

    async fn entry_info(&self, entry_id: i32) -> Result<EntryInfo, RepositoryError> {
        let entry = self.get_entry(entry_id).await?;
        Ok(EntryInfo {
            id: entry.id,
            name: entry.name,
            parent_id: entry.parent_id,
            full_path: entry.full_path,
            entry_type: entry.entry_type,
        })
    }

    async fn read_edoc(&self, entry_id: i32) -> Result<Edoc, RepositoryError> {
        let id = entry_id.to_string();
        let response = self
            .request(Method::GET, &["Entries", &id, DOCUMENT, "edoc"])
            .send()
            .await
            .map_err(transport)?;
        let response = check(response, Some(entry_id)).await?;

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = response.bytes().await.map_err(transport)?.to_vec();
        debug!(
            "Downloaded {} bytes ({}) for entry {}",
            bytes.len(),
            mime_type,
            entry_id
        );
        Ok(Edoc { bytes, mime_type })
    }

    async fn unlock_document(&self, entry_id: i32) -> Result<(), RepositoryError> {
        let id = entry_id.to_string();
        self.delete_lock(&["Entries", &id, DOCUMENT, "lock"], entry_id)
            .await
    }

    async fn unlock_entry(&self, entry_id: i32) -> Result<(), RepositoryError> {
        let id = entry_id.to_string();
        self.delete_lock(&["Entries", &id, "lock"], entry_id).await
    }

    async fn import_images(
        &self,
        entry_id: i32,
        tiff_path: &Path,
    ) -> Result<u32, RepositoryError> {
        let io_error = |e: std::io::Error| RepositoryError::Io {
            path: tiff_path.to_path_buf(),
            source: e,
        };
        let file = tokio::fs::File::open(tiff_path).await.map_err(io_error)?;
        let len = file.metadata().await.map_err(io_error)?.len();

        let id = entry_id.to_string();
        info!("Uploading {} bytes of TIFF to entry {}", len, entry_id);
        let response = self
            .request(Method::POST, &["Entries", &id, DOCUMENT, "pages"])
            .timeout(upload_timeout(self.timeout, len))
            .header(CONTENT_TYPE, "image/tiff")
            .header(CONTENT_LENGTH, len)
            .body(Body::from(file))
            .send()
            .await
            .map_err(transport)?;
        let imported: ImportResponse =
            parse_json(check(response, Some(entry_id)).await?).await?;
        Ok(imported.page_count)
    }

    async fn close(&self) -> Result<(), RepositoryError> {
        let response = self
            .request(Method::DELETE, &["Token"])
            .send()
            .await
            .map_err(transport)?;
        check(response, None).await.map(|_| ())
    }
}

// ── Response helpers ─────────────────────────────────────────────────────

fn transport(e: reqwest::Error) -> RepositoryError {
    RepositoryError::Transport(error_chain(&e))
}

/// `e` followed by each distinct message down its `source()` chain.
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut detail = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        let message = cause.to_string();
        if !detail.contains(&message) {
            detail.push_str(": ");
            detail.push_str(&message);
        }
        source = cause.source();
    }
    detail
}

/// Map a non-2xx response onto the error taxonomy. A 404 is only
/// [`RepositoryError::NotFound`] on routes that address an entry.
async fn check(response: Response, entry_id: Option<i32>) -> Result<Response, RepositoryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(match (status, entry_id) {
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => RepositoryError::Auth {
            detail: format!("HTTP {status}: {body}"),
        },
        (StatusCode::NOT_FOUND, Some(entry_id)) => RepositoryError::NotFound { entry_id },
        _ => RepositoryError::Http {
            status: status.as_u16(),
            body,
        },
    })
}

async fn parse_json<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, RepositoryError> {
    let bytes = response.bytes().await.map_err(transport)?;
    serde_json::from_slice(&bytes).map_err(|e| RepositoryError::MalformedResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(server: &str, repository: &str) -> RepositoryConfig {
        RepositoryConfig {
            server: server.into(),
            repository: repository.into(),
            timeout_secs: 5,
            ..RepositoryConfig::default()
        }
    }

    #[test]
    fn repository_url_appends_segments() {
        let url = repository_url(&config("http://lf/LFRepositoryAPI/", "CITY")).unwrap();
        assert_eq!(url.as_str(), "http://lf/LFRepositoryAPI/v1/Repositories/CITY");
    }

    #[test]
    fn repository_url_escapes_name() {
        let url = repository_url(&config("lf", "City Clerk")).unwrap();
        assert_eq!(url.as_str(), "http://lf/v1/Repositories/City%20Clerk");
    }

    #[derive(Debug, thiserror::Error)]
    #[error("{message}")]
    struct Layer {
        message: &'static str,
        #[source]
        source: Option<Box<Layer>>,
    }

    #[test]
    fn error_chain_keeps_every_cause() {
        let err = Layer {
            message: "error sending request",
            source: Some(Box::new(Layer {
                message: "tcp connect error",
                source: Some(Box::new(Layer {
                    message: "Connection refused (os error 111)",
                    source: None,
                })),
            })),
        };
        assert_eq!(
            error_chain(&err),
            "error sending request: tcp connect error: Connection refused (os error 111)"
        );
    }

    #[test]
    fn error_chain_skips_repeated_messages() {
        let err = Layer {
            message: "client error (Connect): timed out",
            source: Some(Box::new(Layer {
                message: "timed out",
                source: None,
            })),
        };
        assert_eq!(error_chain(&err), "client error (Connect): timed out");
    }

    #[test]
    fn upload_timeout_grows_with_body() {
        let base = Duration::from_secs(120);
        assert_eq!(upload_timeout(base, 0), base);
        assert_eq!(upload_timeout(base, 512 * 1024), base);
        // 2.5 GB of uncompressed 24-bit pages.
        let big = 2_500_000_000;
        assert_eq!(
            upload_timeout(base, big),
            base + Duration::from_secs(big / MIN_UPLOAD_BYTES_PER_SEC)
        );
        assert!(upload_timeout(base, big) > Duration::from_secs(2000));
    }

    #[test]
    fn entry_response_tolerates_missing_fields() {
        let entry: EntryResponse = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        assert_eq!(entry.id, 42);
        assert_eq!(entry.page_count, 0);
        assert!(entry.extension.is_none());
        assert!(!entry.is_locked);
    }
}
