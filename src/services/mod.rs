//! HTTP clients for background assets and privacy documents.
//!
//! All calls are blocking and are made from the control thread, never from
//! the frame loop. Failures are typed as [`AssetError`] and degrade the
//! affected surface only.

mod backgrounds;
mod privacy;

pub use backgrounds::BackgroundService;
pub use privacy::{normalize_multiline, Employee, OverlayText, PrivacyLevel, PrivacyService};

use std::path::PathBuf;
use std::time::Duration;

use image::RgbImage;
use reqwest::blocking::Client;
use reqwest::Url;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("invalid URL {url}: {reason}")]
    Url { url: String, reason: String },
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid JSON from {url}: {source}")]
    Json {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("HTTP {status}: {url}")]
    Status { url: String, status: u16 },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {origin}: {source}")]
    Decode {
        origin: String,
        #[source]
        source: image::ImageError,
    },
    #[error("no user id configured")]
    NoUser,
}

pub(crate) fn http_client() -> Result<Client, AssetError> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(AssetError::Client)
}

/// Resolve `reference` against `base`; absolute URLs pass through.
pub(crate) fn resolve_url(base: &str, reference: &str) -> Result<Url, AssetError> {
    let joined = Url::parse(base).and_then(|base| base.join(reference));
    joined.map_err(|err| AssetError::Url {
        url: reference.to_string(),
        reason: err.to_string(),
    })
}

pub(crate) fn fetch_bytes(client: &Client, url: &str) -> Result<Vec<u8>, AssetError> {
    let http = |source: reqwest::Error| AssetError::Http {
        url: url.to_string(),
        source,
    };
    let response = client.get(url).send().map_err(http)?;
    if !response.status().is_success() {
        return Err(AssetError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }
    Ok(response.bytes().map_err(http)?.to_vec())
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Load an image from an HTTP(S) URL or a local path.
pub fn load_image(client: &Client, source: &str) -> Result<RgbImage, AssetError> {
    let decode = |source_err: image::ImageError| AssetError::Decode {
        origin: source.to_string(),
        source: source_err,
    };
    let image = if is_remote(source) {
        let bytes = fetch_bytes(client, source)?;
        image::load_from_memory(&bytes).map_err(decode)?
    } else {
        let path = PathBuf::from(source);
        if !path.is_file() {
            return Err(AssetError::Read {
                path,
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        image::open(&path).map_err(decode)?
    };
    Ok(image.to_rgb8())
}
