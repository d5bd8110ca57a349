use std::{collections::HashMap, env, sync::Arc};

use anyhow::Result;
use bytes::Bytes;
use futures::{stream::BoxStream, StreamExt};
use object_store::{
    parse_url,
    path::Path,
    Attribute,
    Attributes,
    GetOptions,
    ObjectMeta,
    ObjectStore,
    ObjectStoreScheme,
    PutMultipartOptions,
    WriteMultipart,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};
use url::Url;

/// Lazy, single-pass sequence of bytes. Consuming it twice is not
/// supported; callers needing multiple passes must buffer.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("file not found: {path}")]
    NotFound { path: String },

    #[error("blob store unavailable: {source}")]
    Unavailable { source: object_store::Error },

    #[error("error reading stream for {path}: {source}")]
    Stream { path: String, source: anyhow::Error },
}

impl StoreError {
    /// Identifies the expected negative lookup outcome, as opposed to a
    /// store fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

fn store_error(key: &str, err: object_store::Error) -> StoreError {
    match err {
        object_store::Error::NotFound { .. } => StoreError::NotFound {
            path: key.to_string(),
        },
        err => StoreError::Unavailable { source: err },
    }
}

/// Metadata for one stored object, returned by every create, lookup and
/// delete operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRecord {
    pub id: String,
    pub path: String,
    pub content_type: String,
    pub metadata: HashMap<String, String>,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobStoreConfig {
    pub url: Option<String>,
}

impl BlobStoreConfig {
    pub fn new(url: &str) -> Self {
        BlobStoreConfig {
            url: Some(url.to_string()),
        }
    }

    /// Configured URL, or the environment-supplied one, or the static
    /// default under the current directory.
    pub fn url(&self) -> String {
        self.url.clone().unwrap_or_else(default_url)
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.url())?;
        ObjectStoreScheme::parse(&url)?;
        Ok(())
    }
}

impl Default for BlobStoreConfig {
    fn default() -> Self {
        let url = default_url();
        info!("using blob store url: {}", url);
        BlobStoreConfig { url: Some(url) }
    }
}

fn default_url() -> String {
    env::var("BLOB_STORE_URL").unwrap_or_else(|_| {
        format!(
            "file://{}",
            env::current_dir()
                .unwrap()
                .join("file_service_storage/blobs")
                .to_str()
                .unwrap()
        )
    })
}

/// Streaming, path-addressed binary object store over any
/// `object_store`-supported backend (`file://`, `memory:///`, `s3://`).
///
/// The backend handle is built once at construction; a URL that cannot be
/// parsed fails here rather than on first use. No operation performs an
/// existence check on behalf of the caller, so exclusivity at a path is the
/// caller's responsibility.
#[derive(Clone)]
pub struct BlobStore {
    object_store: Arc<dyn ObjectStore>,
    root: Path,
}

impl BlobStore {
    pub fn new(config: BlobStoreConfig) -> Result<Self> {
        let url = config.url().parse::<Url>()?;
        let (object_store, root) = parse_url(&url)?;
        Ok(Self {
            object_store: Arc::new(object_store),
            root,
        })
    }

    fn full_path(&self, key: &str) -> Path {
        Path::from(format!("{}/{}", self.root, key))
    }

    /// Streams `data` into the object at `key`. A mid-stream failure aborts
    /// the multipart upload, so no record at `key` becomes observable.
    ///
    /// Content type and caller metadata are stored as object attributes.
    /// Backends without attribute support (the local filesystem backend,
    /// the `file://` default) store the content only; a later [`head`]
    /// returns `application/octet-stream` and empty metadata for such
    /// records. The degraded write is logged at warn level.
    ///
    /// [`head`]: BlobStore::head
    pub async fn put(
        &self,
        key: &str,
        mut data: ByteStream,
        content_type: &str,
        metadata: HashMap<String, String>,
    ) -> Result<BlobRecord, StoreError> {
        let path = self.full_path(key);
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        for (name, value) in &metadata {
            attributes.insert(Attribute::Metadata(name.clone().into()), value.clone().into());
        }

        let opts = PutMultipartOptions {
            attributes,
            ..Default::default()
        };
        let upload = match self.object_store.put_multipart_opts(&path, opts).await {
            Ok(upload) => upload,
            // Local filesystem backends don't persist attributes; store the
            // content without them.
            Err(
                object_store::Error::NotImplemented | object_store::Error::NotSupported { .. },
            ) => {
                warn!(
                    "backend does not persist attributes, content type and metadata will not survive lookup, path = {:?}",
                    key
                );
                self.object_store
                    .put_multipart(&path)
                    .await
                    .map_err(|e| store_error(key, e))?
            }
            Err(e) => return Err(store_error(key, e)),
        };

        let mut writer = WriteMultipart::new(upload);
        let mut size_bytes = 0;
        while let Some(chunk) = data.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    let _ = writer.abort().await;
                    return Err(StoreError::Stream {
                        path: key.to_string(),
                        source: e,
                    });
                }
            };
            if let Err(e) = writer.wait_for_capacity(1).await {
                let _ = writer.abort().await;
                return Err(store_error(key, e));
            }
            size_bytes += chunk.len() as u64;
            writer.write(&chunk);
        }
        let result = writer.finish().await.map_err(|e| store_error(key, e))?;
        debug!("wrote blob, path = {:?}, size = {}", key, size_bytes);

        Ok(BlobRecord {
            id: result.e_tag.unwrap_or_else(|| key.to_string()),
            path: key.to_string(),
            content_type: content_type.to_string(),
            metadata,
            size_bytes,
        })
    }

    /// Metadata lookup without transferring the content.
    ///
    /// For records whose backend did not persist attributes (see
    /// [`BlobStore::put`]), the content type reads back as
    /// `application/octet-stream` and the metadata map is empty.
    pub async fn head(&self, key: &str) -> Result<BlobRecord, StoreError> {
        let options = GetOptions {
            head: true,
            ..Default::default()
        };
        let result = self
            .object_store
            .get_opts(&self.full_path(key), options)
            .await
            .map_err(|e| store_error(key, e))?;
        Ok(record_from(key, &result.meta, &result.attributes))
    }

    pub async fn get(&self, key: &str) -> Result<ByteStream, StoreError> {
        let get_result = self
            .object_store
            .get(&self.full_path(key))
            .await
            .map_err(|e| store_error(key, e))?;
        let (tx, rx) = mpsc::unbounded_channel();
        let key = key.to_string();
        tokio::spawn(async move {
            let mut stream = get_result.into_stream();
            while let Some(chunk) = stream.next().await {
                let _ = tx.send(
                    chunk.map_err(|e| {
                        anyhow::anyhow!("error reading object {:?}: {:?}", key.clone(), e)
                    }),
                );
            }
        });
        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    /// Removes the record at `key` and returns it.
    pub async fn delete(&self, key: &str) -> Result<BlobRecord, StoreError> {
        let record = self.head(key).await?;
        self.object_store
            .delete(&self.full_path(key))
            .await
            .map_err(|e| store_error(key, e))?;
        debug!("deleted blob, path = {:?}", key);
        Ok(record)
    }
}

fn record_from(key: &str, meta: &ObjectMeta, attributes: &Attributes) -> BlobRecord {
    let mut content_type = "application/octet-stream".to_string();
    let mut metadata = HashMap::new();
    for (attribute, value) in attributes {
        match attribute {
            Attribute::ContentType => content_type = value.to_string(),
            Attribute::Metadata(name) => {
                metadata.insert(name.to_string(), value.to_string());
            }
            _ => {}
        }
    }
    BlobRecord {
        id: meta.e_tag.clone().unwrap_or_else(|| key.to_string()),
        path: key.to_string(),
        content_type,
        metadata,
        size_bytes: meta.size,
    }
}
