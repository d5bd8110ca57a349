use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use blob_store::{BlobRecord, BlobStore, ByteStream, StoreError};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tracing::debug;

/// Contract for file storage backends. Callers depend on this trait, never
/// on a concrete store.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Stores `data` under `path`. Completes with the stored record, or
    /// with one propagated failure; a failed write leaves no record behind.
    /// No existence check is performed; callers wanting exclusivity must
    /// check first.
    async fn create_file(
        &self,
        path: &str,
        data: ByteStream,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> Result<BlobRecord, StoreError>;

    /// Looks up the record stored at `path`. `NotFound` is the expected
    /// negative outcome, not a fault.
    async fn find(&self, path: &str) -> Result<BlobRecord, StoreError>;

    /// Removes the record at `path` and returns it. `NotFound` when no
    /// record matches; nothing is mutated in that case.
    async fn delete_file(&self, path: &str) -> Result<BlobRecord, StoreError>;

    /// Lazy byte stream of the content at `path`. Single-pass; the caller
    /// consumes or drops it, the service does no buffering.
    async fn read_stream(&self, path: &str) -> Result<ByteStream, StoreError>;

    /// Drains the content at `path` into one contiguous buffer. Holds the
    /// whole object in memory, so this is unsuitable for arbitrarily large
    /// objects; use [`FileStore::read_stream`] for those.
    async fn read_bytes(&self, path: &str) -> Result<Bytes, StoreError>;
}

#[derive(Clone)]
pub struct FileStorageService {
    store: Arc<BlobStore>,
}

impl FileStorageService {
    pub fn new(store: Arc<BlobStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl FileStore for FileStorageService {
    async fn create_file(
        &self,
        path: &str,
        data: ByteStream,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> Result<BlobRecord, StoreError> {
        debug!("writing to blob store, path = {:?}", path);
        self.store.put(path, data, content_type, metadata).await
    }

    async fn find(&self, path: &str) -> Result<BlobRecord, StoreError> {
        self.store.head(path).await
    }

    async fn delete_file(&self, path: &str) -> Result<BlobRecord, StoreError> {
        self.store.delete(path).await
    }

    async fn read_stream(&self, path: &str) -> Result<ByteStream, StoreError> {
        self.store.get(path).await
    }

    async fn read_bytes(&self, path: &str) -> Result<Bytes, StoreError> {
        let mut stream = self.read_stream(path).await?;
        let mut bytes = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| StoreError::Stream {
                path: path.to_string(),
                source: e,
            })?;
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes.into())
    }
}

#[cfg(test)]
mod tests {
    use blob_store::BlobStoreConfig;
    use futures::stream;

    use super::*;

    fn memory_service() -> FileStorageService {
        let store = BlobStore::new(BlobStoreConfig::new("memory:///")).unwrap();
        FileStorageService::new(Arc::new(store))
    }

    fn one_shot(data: &'static [u8]) -> ByteStream {
        Box::pin(stream::once(async move { Ok(Bytes::from_static(data)) }))
    }

    #[tokio::test]
    async fn test_create_read_roundtrip() {
        let service = memory_service();
        let record = service
            .create_file(
                "users/u-1/documents/notes.txt",
                one_shot(b"some notes"),
                "text/plain",
                HashMap::new(),
            )
            .await
            .unwrap();
        assert_eq!(record.path, "users/u-1/documents/notes.txt");
        assert_eq!(record.content_type, "text/plain");

        let bytes = service.read_bytes("users/u-1/documents/notes.txt").await.unwrap();
        assert_eq!(&bytes[..], b"some notes");
    }

    #[tokio::test]
    async fn test_find_missing_fails() {
        let service = memory_service();
        let err = service.find("public/documents/ghost.txt").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_find_returns_created_record() {
        let service = memory_service();
        let mut metadata = HashMap::new();
        metadata.insert("label".to_string(), "invoice".to_string());
        let created = service
            .create_file("public/documents/inv.pdf", one_shot(b"%PDF"), "application/pdf", metadata)
            .await
            .unwrap();

        let found = service.find("public/documents/inv.pdf").await.unwrap();
        assert_eq!(found.path, created.path);
        assert_eq!(found.content_type, "application/pdf");
        assert_eq!(found.metadata.get("label").map(String::as_str), Some("invoice"));
    }

    #[tokio::test]
    async fn test_delete_then_find_fails() {
        let service = memory_service();
        service
            .create_file("public/docs/tmp.txt", one_shot(b"x"), "text/plain", HashMap::new())
            .await
            .unwrap();

        let removed = service.delete_file("public/docs/tmp.txt").await.unwrap();
        assert_eq!(removed.path, "public/docs/tmp.txt");
        assert!(service.find("public/docs/tmp.txt").await.unwrap_err().is_not_found());
        assert!(service
            .delete_file("public/docs/tmp.txt")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_read_stream_single_pass() {
        let service = memory_service();
        service
            .create_file("public/docs/stream.bin", one_shot(b"chunked"), "application/octet-stream", HashMap::new())
            .await
            .unwrap();

        let mut stream = service.read_stream("public/docs/stream.bin").await.unwrap();
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(out, b"chunked");
    }
}
