//! HTTP response wrapper.

use std::path::Path;

use reqwest::{Response, StatusCode};
use tokio::io::AsyncWriteExt;

use super::FetchError;

/// HTTP response wrapper.
pub struct HttpResponse {
    pub status: StatusCode,
    url: String,
    response: Response,
}

impl HttpResponse {
    pub(crate) fn new(url: &str, response: Response) -> Self {
        Self {
            status: response.status(),
            url: url.to_string(),
            response,
        }
    }

    /// Client or server error status.
    pub fn is_error(&self) -> bool {
        self.status.is_client_error() || self.status.is_server_error()
    }

    /// URL after redirects were followed.
    pub fn final_url(&self) -> &str {
        self.response.url().as_str()
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
    }

    /// Get the Content-Type header, lowercased.
    pub fn content_type(&self) -> Option<String> {
        self.header("content-type").map(|s| s.to_lowercase())
    }

    /// Get response body as text.
    pub async fn text(self) -> Result<String, FetchError> {
        let url = self.url;
        self.response
            .text()
            .await
            .map_err(|e| FetchError::Request { url, source: e })
    }

    /// Stream the body to `path` chunk by chunk. Returns bytes written.
    pub async fn save_to(mut self, path: &Path) -> std::io::Result<u64> {
        let mut file = tokio::fs::File::create(path).await?;
        let mut written = 0u64;
        while let Some(chunk) = self
            .response
            .chunk()
            .await
            .map_err(std::io::Error::other)?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }
}
