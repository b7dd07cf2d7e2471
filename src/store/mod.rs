mod local;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::generation::{AspectRatio, Style};

pub use local::LocalRecordStore;

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// A published generation owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: String,
    pub user_id: String,
    pub prompt: String,
    pub style: Style,
    pub aspect_ratio: AspectRatio,
    pub image_url: String,
    pub provider: String,
    pub is_placeholder: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_url: Option<String>,
    pub likes: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImageRecord {
    pub user_id: String,
    pub prompt: String,
    pub style: Style,
    pub aspect_ratio: AspectRatio,
    pub image_url: String,
    pub provider: String,
    pub is_placeholder: bool,
    pub note: Option<String>,
    pub archive_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl Page {
    pub fn new(limit: Option<usize>, offset: Option<usize>) -> Self {
        Self {
            limit: limit.filter(|limit| *limit > 0).unwrap_or(DEFAULT_PAGE_SIZE),
            offset: offset.unwrap_or(0),
        }
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Assigns the id, creation time and zero likes.
    async fn create(&self, record: NewImageRecord) -> Result<ImageRecord>;

    async fn get(&self, id: &str) -> Result<Option<ImageRecord>>;

    /// Newest first.
    async fn list_for_user(&self, user_id: &str, page: Page) -> Result<Vec<ImageRecord>>;

    /// Newest first, across all users.
    async fn list_public(&self, page: Page) -> Result<Vec<ImageRecord>>;

    async fn update_likes(&self, id: &str, likes: u64) -> Result<Option<ImageRecord>>;

    /// `false` when nothing was stored under `id`.
    async fn delete(&self, id: &str) -> Result<bool>;
}
