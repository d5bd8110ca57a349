use std::sync::Arc;

use blob_store::StoreError;
use tracing::debug;
use uuid::Uuid;

use super::{resolver, Resolution, UploadMode, UploadRequest};
use crate::service::FileStore;

/// Builds upload policies bound to one `(collection, mode)` pair. Holds no
/// state beyond the storage handle; one factory serves every collection.
pub struct UploadPolicyFactory<S> {
    storage: Arc<S>,
}

impl<S: FileStore> UploadPolicyFactory<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Per-upload random folder isolation; uploads are never rejected.
    pub fn random_folder(&self, collection: &str) -> UploadPolicy<S> {
        self.policy(collection, UploadMode::RandomFolder)
    }

    /// Fixed folder with collision rejection.
    pub fn fixed_folder(&self, collection: &str) -> UploadPolicy<S> {
        self.policy(collection, UploadMode::FixedFolderReject)
    }

    /// Fixed avatar slot with optional forced overwrite.
    pub fn avatar_slot(&self, collection: &str) -> UploadPolicy<S> {
        self.policy(collection, UploadMode::FixedSlotOverwrite)
    }

    fn policy(&self, collection: &str, mode: UploadMode) -> UploadPolicy<S> {
        UploadPolicy {
            storage: self.storage.clone(),
            collection: collection.to_string(),
            mode,
        }
    }
}

/// Reusable upload configuration for one collection. Resolving yields a
/// destination the caller streams bytes to, or an already-exists signal.
///
/// The existence check and the caller's subsequent write are not atomic:
/// two concurrent uploads to the same fixed path can both pass the check
/// and both write, leaving last-write-wins behavior. Accepted gap.
pub struct UploadPolicy<S> {
    storage: Arc<S>,
    collection: String,
    mode: UploadMode,
}

impl<S: FileStore> UploadPolicy<S> {
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn mode(&self) -> UploadMode {
        self.mode
    }

    pub async fn resolve(&self, request: &UploadRequest<'_>) -> Result<Resolution, StoreError> {
        match self.mode {
            UploadMode::RandomFolder => {
                let token = Uuid::new_v4().to_string();
                Ok(Resolution::Accepted(resolver::random_folder(
                    request.identity,
                    &self.collection,
                    &token,
                    request.original_filename,
                )))
            }
            UploadMode::FixedFolderReject => {
                let destination =
                    resolver::fixed_folder(&self.collection, request.original_filename);
                let path = destination.path();
                match self.storage.find(&path).await {
                    Ok(_) => {
                        debug!("file already exists, path = {:?}", path);
                        Ok(Resolution::AlreadyExists { path })
                    }
                    Err(e) if e.is_not_found() => Ok(Resolution::Accepted(destination)),
                    Err(e) => Err(e),
                }
            }
            UploadMode::FixedSlotOverwrite => {
                let destination = resolver::avatar_slot(&self.collection);
                let path = destination.path();
                match self.storage.find(&path).await {
                    Ok(_) if request.force_overwrite => {
                        self.storage.delete_file(&path).await?;
                        Ok(Resolution::Accepted(destination))
                    }
                    Ok(_) => {
                        debug!("file already exists, path = {:?}", path);
                        Ok(Resolution::AlreadyExists { path })
                    }
                    Err(e) if e.is_not_found() => Ok(Resolution::Accepted(destination)),
                    Err(e) => Err(e),
                }
            }
        }
    }
}
