// src/utils/http.rs

//! HTTP client utilities.

use url::Url;

use crate::error::{AppError, Result};
use crate::models::SourceConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &SourceConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout())
        .build()?;
    Ok(client)
}

/// Fetch a page body as text.
///
/// `file://` URLs are read from disk so that saved pages can be replayed.
pub async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String> {
    let parsed = Url::parse(url)?;
    if parsed.scheme() == "file" {
        let path = parsed
            .to_file_path()
            .map_err(|_| AppError::acquisition(format!("not a local path: {url}")))?;
        return Ok(tokio::fs::read_to_string(path).await?);
    }

    let text = client
        .get(parsed)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(text)
}
