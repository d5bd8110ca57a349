//! Upload-path resolution: maps an inbound upload (identity, collection,
//! mode, force flag) to a destination path in the store, detecting
//! collisions and enforcing per-mode overwrite rules. The pure path
//! computation lives in [`resolver`]; the existence checks and deletes
//! around it live in the policy layer.

mod policy;
pub mod resolver;

pub use policy::{UploadPolicy, UploadPolicyFactory};

/// Placement strategy for one upload collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// Every upload lands in a freshly generated random folder; never
    /// rejected.
    RandomFolder,
    /// Uploads land in one fixed folder; an occupied destination rejects
    /// the upload.
    FixedFolderReject,
    /// Uploads land in one fixed slot (`photo.jpg`); an occupied slot
    /// rejects unless the caller forces an overwrite.
    FixedSlotOverwrite,
}

/// One inbound upload, as seen by the resolution policy. Discarded after
/// resolution.
#[derive(Debug, Clone)]
pub struct UploadRequest<'a> {
    /// Caller identity; absent means anonymous/public.
    pub identity: Option<&'a str>,
    pub original_filename: &'a str,
    /// Only meaningful under [`UploadMode::FixedSlotOverwrite`].
    pub force_overwrite: bool,
}

/// Resolved destination, split so the upload-parsing collaborator can
/// consume directory and filename separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub directory: String,
    pub filename: String,
}

impl Destination {
    pub fn path(&self) -> String {
        format!("{}/{}", self.directory, self.filename)
    }
}

/// Outcome of resolving one upload. `AlreadyExists` is a normal negative
/// decision, not a fault; the pipeline surfaces it without aborting the
/// request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Accepted(Destination),
    AlreadyExists { path: String },
}

impl Resolution {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Resolution::Accepted(_))
    }
}
