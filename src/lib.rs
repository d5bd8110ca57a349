pub mod config;
pub mod service;
pub mod upload;

pub use blob_store::{BlobRecord, BlobStore, BlobStoreConfig, ByteStream, StoreError};
pub use config::ServiceConfig;
pub use service::{FileStorageService, FileStore};
pub use upload::{
    Destination,
    Resolution,
    UploadMode,
    UploadPolicy,
    UploadPolicyFactory,
    UploadRequest,
};
