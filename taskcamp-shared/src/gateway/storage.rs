/// File storage gateway
///
/// Attachments and avatars live in a remote file store; the database only
/// keeps bookkeeping records ([`crate::models::task::Attachment`]). This
/// module defines the trait the handlers program against and an in-memory
/// implementation used for local development and tests.
///
/// Deletion is deliberately forgiving: [`StorageGateway::bulk_delete`]
/// never fails as a whole, it reports which file IDs could not be removed
/// so callers can log them as orphans and move on. Losing a remote file is
/// recoverable; blocking a project deletion on a flaky file server is not.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use super::GatewayError;

/// Metadata accompanying an upload
#[derive(Debug, Clone)]
pub struct UploadMetadata {
    /// Original file name, used for display and extension detection
    pub file_name: String,

    /// Logical folder in the remote store (e.g. "taskcamp/tasks")
    pub folder: String,

    /// MIME type as reported by the client
    pub content_type: String,
}

/// A successfully stored file
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Gateway-assigned file ID (used for deletion)
    pub file_id: String,

    /// Public URL to the file
    pub url: String,

    /// Storage path within the gateway
    pub path: String,

    /// Optional thumbnail URL (images only)
    pub thumbnail: Option<String>,
}

/// Trait for file storage backends
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Uploads a file and returns its bookkeeping record
    async fn upload(&self, data: Bytes, meta: UploadMetadata) -> Result<StoredFile, GatewayError>;

    /// Deletes a single file by gateway file ID
    async fn delete(&self, file_id: &str) -> Result<(), GatewayError>;

    /// Deletes many files, best effort
    ///
    /// # Returns
    ///
    /// The file IDs that could NOT be deleted (empty on full success)
    async fn bulk_delete(&self, file_ids: &[String]) -> Vec<String>;
}

/// In-memory storage backend for development and tests
///
/// Keeps file bytes in a mutex-guarded map and supports failure injection
/// so tests can exercise the orphaned-file paths.
#[derive(Default)]
pub struct InMemoryStorage {
    files: Mutex<HashMap<String, Bytes>>,
    fail_uploads: AtomicBool,
    fail_deletes: AtomicBool,
}

impl InMemoryStorage {
    /// Creates an empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent upload fail with `Unavailable`
    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent delete fail with `Unavailable`
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Number of files currently stored
    pub fn file_count(&self) -> usize {
        self.files.lock().map(|f| f.len()).unwrap_or(0)
    }

    /// Whether a file ID is currently stored
    pub fn contains(&self, file_id: &str) -> bool {
        self.files
            .lock()
            .map(|f| f.contains_key(file_id))
            .unwrap_or(false)
    }
}

#[async_trait]
impl StorageGateway for InMemoryStorage {
    async fn upload(&self, data: Bytes, meta: UploadMetadata) -> Result<StoredFile, GatewayError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable(
                "upload failure injected".to_string(),
            ));
        }

        let file_id = Uuid::new_v4().to_string();
        let path = format!("{}/{}", meta.folder.trim_end_matches('/'), file_id);
        let url = format!("memory://{path}/{}", meta.file_name);

        let thumbnail = meta
            .content_type
            .starts_with("image/")
            .then(|| format!("{url}?tr=thumb"));

        if let Ok(mut files) = self.files.lock() {
            files.insert(file_id.clone(), data);
        }

        Ok(StoredFile {
            file_id,
            url,
            path,
            thumbnail,
        })
    }

    async fn delete(&self, file_id: &str) -> Result<(), GatewayError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(GatewayError::Unavailable(
                "delete failure injected".to_string(),
            ));
        }

        let removed = self
            .files
            .lock()
            .ok()
            .and_then(|mut files| files.remove(file_id));

        match removed {
            Some(_) => Ok(()),
            None => Err(GatewayError::NotFound(file_id.to_string())),
        }
    }

    async fn bulk_delete(&self, file_ids: &[String]) -> Vec<String> {
        let mut failed = Vec::new();

        for file_id in file_ids {
            if self.delete(file_id).await.is_err() {
                failed.push(file_id.clone());
            }
        }

        failed
    }
}
