//! Input resolution: turn what the caller sent into a deck URL and download
//! the deck's viewer page.
//!
//! The HTTP surface receives deck addresses as a single path segment, so
//! they arrive base64-encoded and, inside that, percent-encoded. Both layers
//! are peeled here before anything touches the network.

use crate::config::DeckConfig;
use crate::error::DeckError;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use std::time::Duration;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Require an absolute `http`/`https` URL with a host.
pub fn validate_url(input: &str) -> Result<String, DeckError> {
    let invalid = || DeckError::InvalidInput {
        input: input.to_string(),
    };
    if !is_url(input) {
        return Err(invalid());
    }
    let parsed = reqwest::Url::parse(input).map_err(|_| invalid())?;
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(invalid());
    }
    Ok(input.to_string())
}

/// Decode a base64-wrapped, percent-encoded deck address.
///
/// The standard alphabet is tried first, then the URL-safe one; padding is
/// optional for both. The result must be a valid deck URL.
pub fn decode_deck_url(encoded: &str) -> Result<String, DeckError> {
    let encoded = encoded.trim();
    let raw = [STANDARD, URL_SAFE, STANDARD_NO_PAD, URL_SAFE_NO_PAD]
        .iter()
        .find_map(|engine| engine.decode(encoded).ok())
        .ok_or_else(|| DeckError::InvalidEncodedUrl {
            reason: format!("'{encoded}' is not valid base64"),
        })?;

    if !raw.is_ascii() {
        return Err(DeckError::InvalidEncodedUrl {
            reason: "decoded address is not ASCII".into(),
        });
    }
    // ASCII is valid UTF-8.
    let ascii = String::from_utf8_lossy(&raw);

    let url = urlencoding::decode(&ascii).map_err(|e| DeckError::InvalidEncodedUrl {
        reason: format!("bad percent-encoding: {e}"),
    })?;

    debug!("Decoded deck address: {}", url);
    validate_url(&url)
}

/// Download the deck's viewer page and return its HTML.
pub async fn fetch_viewer_page(url: &str, config: &DeckConfig) -> Result<String, DeckError> {
    info!("Fetching viewer page: {}", url);
    let secs = config.page_timeout_secs;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(secs))
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| DeckError::PageFetchFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let network_error = |e: reqwest::Error| {
        if e.is_timeout() {
            DeckError::PageTimeout {
                url: url.to_string(),
                secs,
            }
        } else {
            DeckError::PageFetchFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(network_error)?;
    if !response.status().is_success() {
        return Err(DeckError::PageFetchFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let html = response.text().await.map_err(network_error)?;
    debug!("Viewer page: {} bytes", html.len());
    Ok(html)
}
