//! Pure destination computation. No I/O happens here; the policy layer
//! performs the existence checks.

use super::Destination;

/// Fixed filename used by the avatar slot.
pub const AVATAR_FILENAME: &str = "photo.jpg";

const PUBLIC_ROOT: &str = "public";

/// Root path segment for an upload: per-user when an identity is present,
/// the shared public namespace otherwise.
pub fn root_segment(identity: Option<&str>) -> String {
    match identity {
        Some(id) => format!("users/{}", id),
        None => PUBLIC_ROOT.to_string(),
    }
}

/// Destination for [`super::UploadMode::RandomFolder`]: the caller supplies
/// a fresh globally-unique `token`, so no existence check is needed and
/// two uploads of the same filename never collide.
pub fn random_folder(
    identity: Option<&str>,
    collection: &str,
    token: &str,
    original_filename: &str,
) -> Destination {
    Destination {
        directory: format!("{}/{}/{}", root_segment(identity), collection, token),
        filename: original_filename.to_string(),
    }
}

/// Destination for [`super::UploadMode::FixedFolderReject`].
///
/// Always rooted at the public namespace, identity or not: collision
/// checks for fixed folders are namespace-global. This mirrors the
/// historical layout; whether per-identity isolation was intended instead
/// is an open product question.
pub fn fixed_folder(collection: &str, original_filename: &str) -> Destination {
    Destination {
        directory: format!("{}/{}", PUBLIC_ROOT, collection),
        filename: original_filename.to_string(),
    }
}

/// Destination for [`super::UploadMode::FixedSlotOverwrite`]: the avatar
/// slot, public-rooted like [`fixed_folder`].
pub fn avatar_slot(collection: &str) -> Destination {
    Destination {
        directory: format!("{}/{}", PUBLIC_ROOT, collection),
        filename: AVATAR_FILENAME.to_string(),
    }
}
