//! Uploads finished images to the Internet Archive's S3-compatible endpoint.
//!
//! Requests are signed server-side with an HMAC over a canonical string, so the
//! long-lived credentials never reach the caller.

use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, header::HeaderValue};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use thiserror::Error;

use crate::{
    config::ArchiveConfig,
    image_processing::{DEFAULT_IMAGE_MIME, detect_mime_type},
    logging::excerpt,
    providers::{LOG_EXCERPT_CHARS, build_http_client},
};

type HmacSha1 = Hmac<Sha1>;

const UPLOAD_TIMEOUT: Duration = Duration::from_secs(60);
const MEDIA_TYPE: &str = "image";
const MAX_SLUG_CHARS: usize = 48;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveMetadata {
    pub title: String,
    pub description: String,
    pub creator: String,
    pub subject: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveUploadRequest {
    #[serde(default)]
    pub identifier: Option<String>,
    pub filename: String,
    pub metadata: ArchiveMetadata,
    pub image_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveUpload {
    pub success: bool,
    pub url: String,
    pub archive_url: String,
    pub identifier: String,
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Internet Archive credentials not configured")]
    NotConfigured,
    #[error("{0}")]
    InvalidInput(String),
    #[error("Upload failed: {status}")]
    Upstream { status: u16, body: String },
    #[error("Upload failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("signing failed: {0}")]
    Signing(String),
}

pub struct ArchiveUploader {
    client: Client,
    config: ArchiveConfig,
}

impl ArchiveUploader {
    pub fn new(config: ArchiveConfig) -> Self {
        Self {
            client: build_http_client(UPLOAD_TIMEOUT),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Accepts the wire request with a base64 payload.
    pub async fn upload(&self, request: ArchiveUploadRequest) -> Result<ArchiveUpload, ArchiveError> {
        if !self.is_configured() {
            return Err(ArchiveError::NotConfigured);
        }
        let bytes = STANDARD
            .decode(request.image_data.trim())
            .map_err(|err| ArchiveError::InvalidInput(format!("imageData is not valid base64: {err}")))?;
        self.upload_bytes(
            request.identifier.as_deref(),
            &request.filename,
            &request.metadata,
            &bytes,
        )
        .await
    }

    pub async fn upload_bytes(
        &self,
        identifier: Option<&str>,
        filename: &str,
        metadata: &ArchiveMetadata,
        bytes: &[u8],
    ) -> Result<ArchiveUpload, ArchiveError> {
        let (Some(access_key), Some(secret_key)) =
            (self.config.access_key.as_deref(), self.config.secret_key.as_deref())
        else {
            return Err(ArchiveError::NotConfigured);
        };
        if bytes.is_empty() {
            return Err(ArchiveError::InvalidInput("imageData is empty".to_string()));
        }
        validate_path_component("filename", filename)?;
        let identifier = match identifier.map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => {
                validate_path_component("identifier", value)?;
                value.to_string()
            }
            None => derive_identifier(filename, Utc::now().timestamp_millis()),
        };

        let content_type = detect_mime_type(bytes).unwrap_or(DEFAULT_IMAGE_MIME);
        let date = http_date();
        let resource = format!("/{identifier}/{filename}");
        let meta_headers = [
            ("x-archive-meta-title", metadata.title.as_str()),
            ("x-archive-meta-description", metadata.description.as_str()),
            ("x-archive-meta-creator", metadata.creator.as_str()),
            ("x-archive-meta-subject", metadata.subject.as_str()),
        ];
        let mut header_values = Vec::with_capacity(meta_headers.len());
        for (name, value) in meta_headers {
            let header = HeaderValue::from_str(value).map_err(|_| {
                ArchiveError::InvalidInput(format!(
                    "metadata for {name} must be printable ASCII without line breaks"
                ))
            })?;
            header_values.push((name, header));
        }

        let canonical = canonical_string(
            content_type,
            &date,
            &self.config.collection,
            metadata,
            &resource,
        );
        let signature = sign(secret_key, &canonical)?;
        let url = format!("{}{resource}", self.config.base_url);

        tracing::info!(identifier = %identifier, filename, size = bytes.len(), "uploading to archive");
        let mut request = self
            .client
            .put(&url)
            .header("Authorization", format!("LOW {access_key}:{signature}"))
            .header("Date", &date)
            .header("Content-Type", content_type)
            .header("x-amz-auto-make-bucket", "1")
            .header("x-archive-meta-collection", &self.config.collection)
            .header("x-archive-meta-mediatype", MEDIA_TYPE);
        for (name, value) in header_values {
            request = request.header(name, value);
        }
        let response = request.body(bytes.to_vec()).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status, body = %excerpt(&body, LOG_EXCERPT_CHARS), "archive upload failed");
            return Err(ArchiveError::Upstream { status, body });
        }

        Ok(ArchiveUpload {
            success: true,
            url,
            archive_url: format!("{}/{identifier}", self.config.details_base_url),
            identifier,
        })
    }
}

/// Newline-joined string covered by the signature. Amazon-style headers are
/// listed in lexical order.
pub fn canonical_string(
    content_type: &str,
    date: &str,
    collection: &str,
    metadata: &ArchiveMetadata,
    resource: &str,
) -> String {
    [
        "PUT".to_string(),
        String::new(),
        content_type.to_string(),
        date.to_string(),
        "x-amz-auto-make-bucket:1".to_string(),
        format!("x-archive-meta-collection:{collection}"),
        format!("x-archive-meta-creator:{}", metadata.creator),
        format!("x-archive-meta-description:{}", metadata.description),
        format!("x-archive-meta-mediatype:{MEDIA_TYPE}"),
        format!("x-archive-meta-subject:{}", metadata.subject),
        format!("x-archive-meta-title:{}", metadata.title),
        resource.to_string(),
    ]
    .join("\n")
}

/// Base64 HMAC-SHA1 of `canonical`, as the archive's S3 endpoint expects.
pub fn sign(secret: &str, canonical: &str) -> Result<String, ArchiveError> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
        .map_err(|err| ArchiveError::Signing(err.to_string()))?;
    mac.update(canonical.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Lowercase slug of the filename stem plus a millisecond timestamp.
pub fn derive_identifier(filename: &str, millis: i64) -> String {
    let stem = filename.rsplit_once('.').map_or(filename, |(stem, _)| stem);
    identifier_for(stem, millis)
}

/// Slug of arbitrary text plus a millisecond timestamp.
pub fn identifier_for(text: &str, millis: i64) -> String {
    let slug = slugify(text);
    if slug.is_empty() {
        format!("image-{millis}")
    } else {
        format!("{slug}-{millis}")
    }
}

/// ASCII alphanumerics lowercased, every other run collapsed to one `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len().min(MAX_SLUG_CHARS));
    for ch in text.chars() {
        if slug.len() >= MAX_SLUG_CHARS {
            break;
        }
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

fn validate_path_component(field: &str, value: &str) -> Result<(), ArchiveError> {
    let valid = !value.is_empty()
        && value != "."
        && value != ".."
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ArchiveError::InvalidInput(format!(
            "{field} may only contain letters, digits, '-', '_' and '.'"
        )))
    }
}

fn http_date() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
