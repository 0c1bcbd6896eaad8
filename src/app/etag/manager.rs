//! ETag manager: conditional request headers and response reconciliation
//!
//! The manager owns every [`CacheEntry`] behind a single async mutex. The
//! lock covers lookup and replace only; snapshot file I/O happens on a copy
//! taken under the lock.

use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::app::client::HttpResponse;
use crate::constants::{files, status};
use crate::errors::{CacheError, CacheResult, NetworkError};

use super::types::{BackendReply, CacheEntry, CacheSnapshot, Reconciliation};

/// Conditional cache keyed by request signature
#[derive(Debug, Default)]
pub struct ETagManager {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ETagManager {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache seeded from a snapshot file
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the file cannot be read or decoded
    pub async fn from_snapshot(path: &Path) -> CacheResult<Self> {
        let manager = Self::new();
        manager.load(path).await?;
        Ok(manager)
    }

    /// ETag to send as `If-None-Match` for `signature`
    ///
    /// Returns `None` when nothing is cached or when `refresh_etag` forces a
    /// full fetch.
    pub async fn etag_header(&self, signature: &str, refresh_etag: bool) -> Option<String> {
        if refresh_etag {
            return None;
        }
        let entries = self.entries.lock().await;
        entries.get(signature).map(|entry| entry.etag.clone())
    }

    /// Decide what the caller sees for `reply`, updating the cache on fresh
    /// successes
    ///
    /// `retried` tells whether the request already went out without a
    /// conditional header; a 304 for such a request cannot be resolved by
    /// another retry and is surfaced as an error.
    pub async fn reconcile(
        &self,
        signature: &str,
        reply: BackendReply,
        retried: bool,
    ) -> Reconciliation {
        let BackendReply {
            status_code,
            etag,
            body,
            decode_error,
        } = reply;

        if let Some(error) = decode_error {
            return Reconciliation::Response(HttpResponse {
                status_code,
                body: None,
                error: Some(error),
            });
        }

        if status_code == status::NOT_MODIFIED {
            let stored = {
                let entries = self.entries.lock().await;
                entries.get(signature).map(CacheEntry::to_response)
            };

            return match stored {
                Some(response) => {
                    debug!("Serving cached response for {}", signature);
                    Reconciliation::Response(response)
                }
                None if retried => {
                    warn!(
                        "Received 304 for {} after a full refetch; giving up",
                        signature
                    );
                    Reconciliation::Response(HttpResponse {
                        status_code,
                        body,
                        error: Some(NetworkError::NotModifiedWithoutCache {
                            signature: signature.to_string(),
                        }),
                    })
                }
                None => {
                    warn!(
                        "Received 304 for {} but nothing is cached; refetching",
                        signature
                    );
                    Reconciliation::RetryRequired
                }
            };
        }

        if (200..300).contains(&status_code) {
            if let (Some(etag), Some(body)) = (etag, body.as_ref()) {
                let entry = CacheEntry::new(signature, etag, body.clone(), status_code);
                self.entries
                    .lock()
                    .await
                    .insert(signature.to_string(), entry);
                debug!("Stored ETag for {}", signature);
            }
        }

        Reconciliation::Response(HttpResponse::new(status_code, body))
    }

    /// Copy of the entry for `signature`, if any
    pub async fn entry(&self, signature: &str) -> Option<CacheEntry> {
        self.entries.lock().await.get(signature).cloned()
    }

    /// Number of cached entries
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Drop every entry
    pub async fn clear(&self) {
        let removed = {
            let mut entries = self.entries.lock().await;
            let removed = entries.len();
            entries.clear();
            removed
        };
        info!("Cleared {} cached ETag entries", removed);
    }

    /// Write the cache to `path` atomically (temp file + rename)
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if encoding or any file operation fails
    pub async fn save(&self, path: &Path) -> CacheResult<usize> {
        let mut entries: Vec<CacheEntry> = {
            let entries = self.entries.lock().await;
            entries.values().cloned().collect()
        };
        entries.sort_by(|a, b| a.signature.cmp(&b.signature));
        let count = entries.len();

        let snapshot = CacheSnapshot {
            saved_at: Utc::now(),
            entries,
        };
        let encoded = serde_json::to_vec_pretty(&snapshot)?;

        let io_error = |source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(io_error)?;
            }
        }

        let mut temp_name = path.as_os_str().to_owned();
        temp_name.push(files::TEMP_FILE_SUFFIX);
        let temp_path = Path::new(&temp_name);

        fs::write(temp_path, &encoded).await.map_err(io_error)?;
        fs::rename(temp_path, path).await.map_err(io_error)?;

        debug!("Saved {} ETag entries to {}", count, path.display());
        Ok(count)
    }

    /// Replace the cache content with the snapshot at `path`
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the file cannot be read or decoded; the cache
    /// is left unchanged in that case
    pub async fn load(&self, path: &Path) -> CacheResult<usize> {
        let raw = fs::read(path).await.map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot: CacheSnapshot = serde_json::from_slice(&raw)?;
        let count = snapshot.entries.len();

        let loaded: HashMap<String, CacheEntry> = snapshot
            .entries
            .into_iter()
            .map(|entry| (entry.signature.clone(), entry))
            .collect();
        *self.entries.lock().await = loaded;

        info!("Loaded {} ETag entries from {}", count, path.display());
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::client::JsonObject;
    use serde_json::json;
    use tempfile::TempDir;

    const SIGNATURE: &str = "GET https://api.example.com/v1/offerings";

    fn object(value: serde_json::Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    fn fresh(status_code: i32, etag: Option<&str>, body: serde_json::Value) -> BackendReply {
        BackendReply {
            status_code,
            etag: etag.map(str::to_string),
            body: Some(object(body)),
            decode_error: None,
        }
    }

    fn not_modified() -> BackendReply {
        BackendReply {
            status_code: 304,
            etag: Some("x".to_string()),
            body: Some(JsonObject::new()),
            decode_error: None,
        }
    }

    #[tokio::test]
    async fn test_fresh_success_is_stored_and_returned() {
        let manager = ETagManager::new();
        let result = manager
            .reconcile(SIGNATURE, fresh(200, Some("x"), json!({"a": 1})), false)
            .await;

        assert_eq!(
            result,
            Reconciliation::Response(HttpResponse::new(200, Some(object(json!({"a": 1})))))
        );
        assert_eq!(manager.etag_header(SIGNATURE, false).await.as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn test_not_modified_replays_stored_body_and_status() {
        let manager = ETagManager::new();
        manager
            .reconcile(SIGNATURE, fresh(201, Some("x"), json!({"a": 1})), false)
            .await;

        let result = manager.reconcile(SIGNATURE, not_modified(), false).await;
        assert_eq!(
            result,
            Reconciliation::Response(HttpResponse::new(201, Some(object(json!({"a": 1})))))
        );
    }

    #[tokio::test]
    async fn test_not_modified_without_entry_requires_retry() {
        let manager = ETagManager::new();
        let result = manager.reconcile(SIGNATURE, not_modified(), false).await;
        assert_eq!(result, Reconciliation::RetryRequired);
    }

    #[tokio::test]
    async fn test_not_modified_on_retry_surfaces_error() {
        let manager = ETagManager::new();
        match manager.reconcile(SIGNATURE, not_modified(), true).await {
            Reconciliation::Response(response) => {
                assert_eq!(response.status_code, 304);
                assert!(matches!(
                    response.error,
                    Some(NetworkError::NotModifiedWithoutCache { .. })
                ));
            }
            other => panic!("Expected a response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_decode_error_leaves_entry_untouched() {
        let manager = ETagManager::new();
        manager
            .reconcile(SIGNATURE, fresh(200, Some("x"), json!({"a": 1})), false)
            .await;

        let reply = BackendReply {
            status_code: 200,
            etag: Some("y".to_string()),
            body: None,
            decode_error: Some(NetworkError::Decode {
                reason: "expected value".to_string(),
            }),
        };
        match manager.reconcile(SIGNATURE, reply, false).await {
            Reconciliation::Response(response) => {
                assert_eq!(response.status_code, 200);
                assert!(response.body.is_none());
                assert!(response.error.is_some());
            }
            other => panic!("Expected a response, got {:?}", other),
        }

        let entry = manager.entry(SIGNATURE).await.unwrap();
        assert_eq!(entry.etag, "x");
    }

    #[tokio::test]
    async fn test_other_statuses_pass_through() {
        let manager = ETagManager::new();

        // Errors carrying an ETag are not cached
        let result = manager
            .reconcile(SIGNATURE, fresh(404, Some("x"), json!({"code": 7})), false)
            .await;
        assert_eq!(
            result,
            Reconciliation::Response(HttpResponse::new(404, Some(object(json!({"code": 7})))))
        );

        // Successes without an ETag are not cached either
        manager
            .reconcile(SIGNATURE, fresh(200, None, json!({"a": 1})), false)
            .await;
        assert!(manager.is_empty().await);
    }

    #[tokio::test]
    async fn test_refresh_omits_etag() {
        let manager = ETagManager::new();
        manager
            .reconcile(SIGNATURE, fresh(200, Some("x"), json!({})), false)
            .await;

        assert!(manager.etag_header(SIGNATURE, true).await.is_none());
        assert!(manager.etag_header("GET other", false).await.is_none());
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let manager = ETagManager::new();
        manager
            .reconcile(SIGNATURE, fresh(200, Some("x"), json!({"v": 1})), false)
            .await;
        manager
            .reconcile(SIGNATURE, fresh(200, Some("y"), json!({"v": 2})), false)
            .await;

        assert_eq!(manager.len().await, 1);
        let entry = manager.entry(SIGNATURE).await.unwrap();
        assert_eq!(entry.etag, "y");
        assert_eq!(entry.stored_body, object(json!({"v": 2})));
    }

    #[tokio::test]
    async fn test_clear() {
        let manager = ETagManager::new();
        manager
            .reconcile(SIGNATURE, fresh(200, Some("x"), json!({})), false)
            .await;
        manager.clear().await;

        assert!(manager.is_empty().await);
        assert_eq!(
            manager.reconcile(SIGNATURE, not_modified(), false).await,
            Reconciliation::RetryRequired
        );
    }

    #[tokio::test]
    async fn test_snapshot_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join(files::ETAG_SNAPSHOT_FILE_NAME);

        let manager = ETagManager::new();
        manager
            .reconcile(SIGNATURE, fresh(200, Some("x"), json!({"a": 1})), false)
            .await;
        manager
            .reconcile("GET https://api.example.com/v1/health", fresh(200, Some("h"), json!({})), false)
            .await;

        assert_eq!(manager.save(&path).await.unwrap(), 2);

        let restored = ETagManager::from_snapshot(&path).await.unwrap();
        assert_eq!(restored.len().await, 2);
        assert_eq!(restored.entry(SIGNATURE).await, manager.entry(SIGNATURE).await);
    }

    #[tokio::test]
    async fn test_load_missing_snapshot_keeps_entries() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ETagManager::new();
        manager
            .reconcile(SIGNATURE, fresh(200, Some("x"), json!({})), false)
            .await;

        let result = manager.load(&temp_dir.path().join("missing.json")).await;
        assert!(matches!(result, Err(CacheError::Io { .. })));
        assert_eq!(manager.len().await, 1);
    }
}
