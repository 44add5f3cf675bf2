use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

use crate::config::UploadConfig;
use crate::error::{Result, YtdlrError};

pub const TOKEN_ENV_VAR: &str = "YTDLR_DRIVE_TOKEN";

/// Cloud storage upload
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Upload `path` into `folder_id`, returning a shareable link
    async fn upload(&self, path: &Path, folder_id: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct TokenFile {
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    web_view_link: Option<String>,
}

/// Pick the access token: the environment wins over the token file.
pub fn resolve_token(env_token: Option<String>, token_path: &Path) -> Result<String> {
    if let Some(token) = env_token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
        return Ok(token);
    }

    let content = std::fs::read_to_string(token_path).map_err(|e| {
        YtdlrError::Upload(format!(
            "No {} set and token file {} unreadable: {}",
            TOKEN_ENV_VAR,
            token_path.display(),
            e
        ))
    })?;
    let token: TokenFile = serde_json::from_str(&content)?;
    Ok(token.access_token)
}

/// Google Drive v3 uploader
pub struct DriveUploader {
    client: Client,
    config: UploadConfig,
}

impl DriveUploader {
    pub fn new(config: UploadConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("ytdlr/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    fn access_token(&self) -> Result<String> {
        resolve_token(std::env::var(TOKEN_ENV_VAR).ok(), &self.config.token_path)
    }

    async fn check(response: reqwest::Response, step: &str) -> Result<DriveFile> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(YtdlrError::Upload(format!("{} failed: HTTP {}: {}", step, status, body)));
        }
        Ok(response.json::<DriveFile>().await?)
    }
}

#[async_trait]
impl Uploader for DriveUploader {
    async fn upload(&self, path: &Path, folder_id: &str) -> Result<String> {
        if !path.is_file() {
            return Err(YtdlrError::MissingInput(path.display().to_string()));
        }
        if folder_id.trim().is_empty() {
            return Err(YtdlrError::Upload("No destination folder id given".to_string()));
        }

        let token = self.access_token()?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        info!("Uploading {} to folder {}", path.display(), folder_id);
        let bytes = tokio::fs::read(path).await?;

        // Content first, then name and parent
        let created = self
            .client
            .post(format!("{}/files", self.config.upload_base))
            .query(&[("uploadType", "media"), ("fields", "id")])
            .bearer_auth(&token)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await?;
        let created = Self::check(created, "Content upload").await?;
        debug!("Created Drive file {}", created.id);

        let updated = self
            .client
            .patch(format!("{}/files/{}", self.config.api_base, created.id))
            .query(&[("addParents", folder_id), ("fields", "id,webViewLink")])
            .bearer_auth(&token)
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await?;
        let updated = Self::check(updated, "Metadata update").await?;

        let link = updated
            .web_view_link
            .unwrap_or_else(|| format!("https://drive.google.com/file/d/{}/view", updated.id));
        info!("Uploaded {}: {}", name, link);
        Ok(link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_env_token_wins() {
        let token = resolve_token(Some(" abc ".to_string()), Path::new("/nowhere.json")).unwrap();
        assert_eq!(token, "abc");
    }

    #[test]
    fn test_token_file_fallback() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("token.json");
        file.write_str(r#"{"access_token": "ya29.token", "expires_in": 3599}"#).unwrap();

        let token = resolve_token(Some("   ".to_string()), file.path()).unwrap();
        assert_eq!(token, "ya29.token");
    }

    #[test]
    fn test_missing_token_is_upload_error() {
        let result = resolve_token(None, Path::new("/definitely/missing/token.json"));
        assert!(matches!(result, Err(YtdlrError::Upload(_))));
    }

    #[tokio::test]
    async fn test_upload_rejects_missing_file_before_network() {
        let uploader = DriveUploader::new(crate::config::Config::default().upload).unwrap();
        let result = uploader.upload(Path::new("/missing/video.mp4"), "folder").await;
        assert!(matches!(result, Err(YtdlrError::MissingInput(_))));
    }
}
