//! HTTP transport over libcurl.
//!
//! The easy handle is blocking, so each attempt runs on tokio's blocking pool.
//! Progress crosses back through the [`ProgressReporter`]; cancellation is
//! observed in the curl progress callback, which aborts the transfer.

use anyhow::{Context, Result};
use std::str;
use std::time::Duration;
use url::Url;

use super::{FetchRequest, FetchedResource, Fetcher, ResponseHeaders};
use crate::config::ServerConfig;
use crate::retry::{classify_curl_error, classify_http_status, FetchError};
use crate::task::ResourceId;

/// Placeholder for the resource id in the download path template.
const ID_PLACEHOLDER: &str = "{id}";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Fetches `GET <base_url>/<download_path>` with `{id}` substituted.
#[derive(Debug, Clone)]
pub struct CurlFetcher {
    base_url: Url,
    download_path: String,
    auth_token: Option<String>,
}

impl CurlFetcher {
    pub fn new(base_url: &str, download_path: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)
            .with_context(|| format!("invalid server base URL: {}", base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("server base URL cannot carry a path: {}", base_url);
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        if !download_path.contains(ID_PLACEHOLDER) {
            anyhow::bail!(
                "download path {:?} has no {} placeholder",
                download_path,
                ID_PLACEHOLDER
            );
        }
        Ok(Self {
            base_url,
            download_path: download_path.trim_start_matches('/').to_string(),
            auth_token: None,
        })
    }

    pub fn from_config(server: &ServerConfig) -> Result<Self> {
        let fetcher = Self::new(&server.base_url, &server.download_path)?;
        Ok(match &server.auth_token {
            Some(token) => fetcher.with_auth_token(token.clone()),
            None => fetcher,
        })
    }

    /// Sends `Authorization: Bearer <token>` with every request.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Download URL for `resource_id`; each path segment is percent-encoded.
    pub fn resource_url(&self, resource_id: &ResourceId) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            for seg in self.download_path.split('/') {
                segments.push(&seg.replace(ID_PLACEHOLDER, resource_id.as_str()));
            }
        }
        url
    }
}

impl Fetcher for CurlFetcher {
    fn fetch(
        &self,
        resource_id: &ResourceId,
        request: FetchRequest,
    ) -> impl std::future::Future<Output = Result<FetchedResource, FetchError>> + Send {
        let url = self.resource_url(resource_id);
        let auth_token = self.auth_token.clone();
        let resource_id = resource_id.clone();
        async move {
            tracing::debug!(%resource_id, %url, "GET");
            tokio::task::spawn_blocking(move || {
                perform_get(url.as_str(), auth_token.as_deref(), &request)
            })
            .await
            .map_err(|e| FetchError::connection(format!("transfer worker failed: {}", e)))?
        }
    }
}

fn setup_error(e: curl::Error) -> FetchError {
    FetchError::connection(format!("curl setup: {}", e))
}

/// Blocking GET of `url` into memory.
fn perform_get(
    url: &str,
    auth_token: Option<&str>,
    request: &FetchRequest,
) -> Result<FetchedResource, FetchError> {
    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(setup_error)?;
    easy.follow_location(true).map_err(setup_error)?;
    easy.max_redirections(10).map_err(setup_error)?;
    easy.connect_timeout(CONNECT_TIMEOUT).map_err(setup_error)?;
    easy.timeout(request.timeout).map_err(setup_error)?;
    easy.progress(true).map_err(setup_error)?;

    if let Some(token) = auth_token {
        let mut list = curl::easy::List::new();
        list.append(&format!("Authorization: Bearer {}", token.trim()))
            .map_err(setup_error)?;
        easy.http_headers(list).map_err(setup_error)?;
    }

    let mut body: Vec<u8> = Vec::new();
    let mut headers = ResponseHeaders::new();
    let mut last_reported: Option<u64> = None;

    let performed = {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                if let Ok(line) = str::from_utf8(data) {
                    // A new status line starts a new response (redirect hop).
                    if line.starts_with("HTTP/") {
                        headers.clear();
                    } else {
                        headers.push_line(line);
                    }
                }
                true
            })
            .map_err(setup_error)?;
        transfer
            .write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })
            .map_err(setup_error)?;
        transfer
            .progress_function(|dltotal, dlnow, _, _| {
                if request.cancel.is_cancelled() {
                    return false;
                }
                let loaded = dlnow.max(0.0) as u64;
                if last_reported != Some(loaded) {
                    let total = (dltotal > 0.0).then(|| dltotal as u64);
                    request.progress.report(loaded, total);
                    last_reported = Some(loaded);
                }
                true
            })
            .map_err(setup_error)?;
        transfer.perform()
    };

    if let Err(e) = performed {
        let kind = classify_curl_error(&e, request.cancel.is_cancelled());
        return Err(FetchError::new(kind, e.to_string()));
    }

    let code = easy
        .response_code()
        .map_err(|e| FetchError::connection(format!("no response code: {}", e)))?;
    if !(200..300).contains(&code) {
        return Err(FetchError::new(
            classify_http_status(code),
            format!("GET {} returned HTTP {}", url, code),
        ));
    }

    Ok(FetchedResource {
        payload: body,
        headers,
    })
}
