use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use reqwest::{Client, header::CONTENT_TYPE};
use serde::Deserialize;
use url::Url;

use crate::{
    archive::{ArchiveMetadata, ArchiveUploader, identifier_for},
    auth::User,
    generation::{AspectRatio, PROMPT_REQUIRED, Style, ValidationError},
    image_processing::{decode_data_url, get_extension_from_mime_type, is_data_url, resolve_image_mime},
    store::{ImageRecord, NewImageRecord, RecordStore},
};

const TITLE_CHARS: usize = 100;

/// A generation result the caller wants to keep.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub prompt: String,
    #[serde(default)]
    pub style: Style,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    pub image_url: String,
    pub provider: String,
    #[serde(default)]
    pub is_placeholder: bool,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub archive: bool,
}

impl PublishRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.prompt.trim().is_empty() {
            return Err(ValidationError(PROMPT_REQUIRED.to_string()));
        }
        if self.image_url.trim().is_empty() {
            return Err(ValidationError("imageUrl is required".to_string()));
        }
        Ok(())
    }
}

pub struct Publisher {
    client: Client,
    archive: Arc<ArchiveUploader>,
    records: Arc<dyn RecordStore>,
}

impl Publisher {
    pub fn new(client: Client, archive: Arc<ArchiveUploader>, records: Arc<dyn RecordStore>) -> Self {
        Self {
            client,
            archive,
            records,
        }
    }

    /// Stores the record, archiving the image first when asked. A failed
    /// archive upload only loses the archive link.
    pub async fn publish(&self, user: &User, request: PublishRequest) -> Result<ImageRecord> {
        let archive_url = if request.archive && !request.is_placeholder && self.archive.is_configured() {
            match self.archive_image(user, &request).await {
                Ok(url) => Some(url),
                Err(err) => {
                    tracing::warn!(error = ?err, user = %user.id, "archive upload failed, publishing without it");
                    None
                }
            }
        } else {
            None
        };

        self.records
            .create(NewImageRecord {
                user_id: user.id.clone(),
                prompt: request.prompt.trim().to_string(),
                style: request.style,
                aspect_ratio: request.aspect_ratio,
                image_url: request.image_url,
                provider: request.provider,
                is_placeholder: request.is_placeholder,
                note: request.note,
                archive_url,
            })
            .await
    }

    async fn archive_image(&self, user: &User, request: &PublishRequest) -> Result<String> {
        let (mime, bytes) = self.resolve_image_bytes(&request.image_url).await?;
        let filename = format!("image.{}", get_extension_from_mime_type(&mime));
        let identifier = identifier_for(&request.prompt, Utc::now().timestamp_millis());
        let creator = if user.name.trim().is_empty() {
            user.id.as_str()
        } else {
            user.name.as_str()
        };
        let metadata = ArchiveMetadata {
            title: header_text(&request.prompt, TITLE_CHARS),
            description: header_text(
                &format!(
                    "AI-generated image ({}, style {}): {}",
                    request.provider, request.style, request.prompt
                ),
                usize::MAX,
            ),
            creator: header_text(creator, TITLE_CHARS),
            subject: format!("ai-generated;{}", request.style),
        };
        let upload = self
            .archive
            .upload_bytes(Some(&identifier), &filename, &metadata, &bytes)
            .await?;
        Ok(upload.archive_url)
    }

    /// Image bytes from an inline data URL or a remote download.
    pub async fn resolve_image_bytes(&self, image_url: &str) -> Result<(String, Vec<u8>)> {
        if is_data_url(image_url) {
            return decode_data_url(image_url);
        }
        let parsed = Url::parse(image_url).with_context(|| format!("invalid image url {image_url}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("unsupported image url scheme {}", parsed.scheme());
        }
        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .with_context(|| format!("downloading {image_url}"))?;
        if !response.status().is_success() {
            bail!("download of {image_url} failed with status {}", response.status());
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();
        if bytes.is_empty() {
            bail!("download of {image_url} returned no data");
        }
        let Some(mime) = resolve_image_mime(content_type.as_deref(), &bytes) else {
            bail!("download of {image_url} is not an image");
        };
        Ok((mime, bytes))
    }
}

/// Printable ASCII only, so the value can travel as an HTTP header.
fn header_text(text: &str, max_chars: usize) -> String {
    let cleaned: String = text
        .chars()
        .map(|ch| if ch.is_ascii_graphic() || ch == ' ' { ch } else { ' ' })
        .take(max_chars)
        .collect();
    cleaned.trim().to_string()
}
