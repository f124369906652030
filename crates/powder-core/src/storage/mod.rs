//! Object storage boundary for resort thumbnails.
//!
//! Only the returned path/URL is ever written to the cache; image bytes
//! never are, except as a `data:` URL when no remote storage is reachable.

mod supabase;
mod thumbnail;

pub use supabase::SupabaseStorage;
pub use thumbnail::{data_url, prepare_thumbnail, ThumbnailFormat, ThumbnailImage, ThumbnailOptions};

use crate::Result;

/// Upload target for thumbnail images
#[allow(async_fn_in_trait)]
pub trait ObjectStorage {
    /// Store `bytes` at `path`, returning the stored object path.
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;

    /// Public URL for a stored object path.
    fn public_url(&self, path: &str) -> String;
}

/// Strip characters that are unsafe in an object path segment.
pub fn sanitize_segment(value: &str) -> String {
    value
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                ch
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_matches('.')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_segment_replaces_separators() {
        assert_eq!(sanitize_segment(" crew/1 "), "crew_1");
        assert_eq!(sanitize_segment("../etc"), "_etc");
    }
}
