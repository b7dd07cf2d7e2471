use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use uuid::Uuid;

use super::{ImageRecord, NewImageRecord, Page, RecordStore};

const RECORD_DIR: &str = "records";

/// One pretty-printed JSON file per record under `<base>/records/`.
#[derive(Clone, Debug)]
pub struct LocalRecordStore {
    base_dir: PathBuf,
}

impl LocalRecordStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn record_dir(&self) -> PathBuf {
        self.base_dir.join(RECORD_DIR)
    }

    /// Only uuid-shaped ids map to a file, so ids never escape the record dir.
    fn record_path(&self, id: &str) -> Option<PathBuf> {
        let id = Uuid::parse_str(id).ok()?;
        Some(self.record_dir().join(format!("{id}.json")))
    }

    async fn write(&self, path: &Path, record: &ImageRecord) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let payload = serde_json::to_vec_pretty(record)?;
        fs::write(path, payload).await?;
        Ok(())
    }

    async fn read(&self, path: &Path) -> Result<Option<ImageRecord>> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn load_all(&self) -> Result<Vec<ImageRecord>> {
        let mut dir = match fs::read_dir(self.record_dir()).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut records = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path).await?;
            match serde_json::from_slice::<ImageRecord>(&bytes) {
                Ok(record) => records.push(record),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping unreadable record")
                }
            }
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn list_where<F>(&self, page: Page, keep: F) -> Result<Vec<ImageRecord>>
    where
        F: Fn(&ImageRecord) -> bool + Send,
    {
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .filter(|record| keep(record))
            .skip(page.offset)
            .take(page.limit)
            .collect())
    }
}

#[async_trait]
impl RecordStore for LocalRecordStore {
    async fn create(&self, record: NewImageRecord) -> Result<ImageRecord> {
        let id = Uuid::new_v4().to_string();
        let record = ImageRecord {
            id: id.clone(),
            user_id: record.user_id,
            prompt: record.prompt,
            style: record.style,
            aspect_ratio: record.aspect_ratio,
            image_url: record.image_url,
            provider: record.provider,
            is_placeholder: record.is_placeholder,
            note: record.note,
            archive_url: record.archive_url,
            likes: 0,
            created_at: Utc::now(),
            updated_at: None,
        };
        let path = self.record_dir().join(format!("{id}.json"));
        self.write(&path, &record).await?;
        tracing::info!(id = %record.id, user = %record.user_id, "record created");
        Ok(record)
    }

    async fn get(&self, id: &str) -> Result<Option<ImageRecord>> {
        match self.record_path(id) {
            Some(path) => self.read(&path).await,
            None => Ok(None),
        }
    }

    async fn list_for_user(&self, user_id: &str, page: Page) -> Result<Vec<ImageRecord>> {
        self.list_where(page, |record| record.user_id == user_id).await
    }

    async fn list_public(&self, page: Page) -> Result<Vec<ImageRecord>> {
        self.list_where(page, |_| true).await
    }

    async fn update_likes(&self, id: &str, likes: u64) -> Result<Option<ImageRecord>> {
        let Some(path) = self.record_path(id) else {
            return Ok(None);
        };
        let Some(mut record) = self.read(&path).await? else {
            return Ok(None);
        };
        record.likes = likes;
        record.updated_at = Some(Utc::now());
        self.write(&path, &record).await?;
        Ok(Some(record))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let Some(path) = self.record_path(id) else {
            return Ok(false);
        };
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}
