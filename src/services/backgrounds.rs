use std::path::Path;

use reqwest::blocking::multipart::Form;
use reqwest::blocking::Client;
use serde::Deserialize;

use super::{http_client, resolve_url, AssetError};

#[derive(Debug, Default, Deserialize)]
struct BackgroundList {
    #[serde(default)]
    backgrounds: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    path: Option<String>,
}

/// Per-user background picker backend.
pub struct BackgroundService {
    api_base: String,
    user_id: Option<String>,
    client: Client,
}

impl BackgroundService {
    pub fn new(api_base: impl Into<String>, user_id: Option<String>) -> Result<Self, AssetError> {
        Ok(Self {
            api_base: api_base.into(),
            user_id,
            client: http_client()?,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn user_id(&self) -> Result<&str, AssetError> {
        self.user_id.as_deref().ok_or(AssetError::NoUser)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path)
    }

    /// Absolute URLs of the user's backgrounds.
    pub fn list(&self) -> Result<Vec<String>, AssetError> {
        let url = self.endpoint(&format!("backgrounds/{}", self.user_id()?));
        let http = |source: reqwest::Error| AssetError::Http {
            url: url.clone(),
            source,
        };
        let response = self.client.get(&url).send().map_err(http)?;
        if !response.status().is_success() {
            return Err(AssetError::Status {
                url: url.clone(),
                status: response.status().as_u16(),
            });
        }
        let list: BackgroundList = response.json().map_err(http)?;
        list.backgrounds
            .iter()
            .map(|relative| resolve_url(&self.api_base, relative).map(String::from))
            .collect()
    }

    /// [`list`](Self::list), degrading to an empty picker on any failure.
    pub fn list_or_empty(&self) -> Vec<String> {
        match self.list() {
            Ok(urls) => urls,
            Err(e) => {
                tracing::warn!("Background list unavailable: {}", e);
                Vec::new()
            }
        }
    }

    /// Upload a local image; returns the absolute URL of the stored copy
    /// when the service reports one.
    pub fn upload(&self, file: &Path) -> Result<Option<String>, AssetError> {
        let user_id = self.user_id()?.to_string();
        let url = self.endpoint("upload_background/");
        let form = Form::new()
            .text("user_id", user_id)
            .file("file", file)
            .map_err(|source| AssetError::Read {
                path: file.to_path_buf(),
                source,
            })?;

        let http = |source: reqwest::Error| AssetError::Http {
            url: url.clone(),
            source,
        };
        let response = self.client.post(&url).multipart(form).send().map_err(http)?;
        if !response.status().is_success() {
            return Err(AssetError::Status {
                url: url.clone(),
                status: response.status().as_u16(),
            });
        }
        let uploaded: UploadResponse = response.json().map_err(http)?;
        uploaded
            .path
            .map(|relative| resolve_url(&self.api_base, &relative).map(String::from))
            .transpose()
    }
}
