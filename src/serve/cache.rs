//! Cache policy for served assets.
//!
//! Bundlers put a content hash in the file name of build outputs
//! (`index-aZ3kP9.js`, `chunk.4f2a9c1b.css`). Those files never change
//! under the same name, so they can be cached for a year; everything else
//! must be revalidated on every use.

use crate::blob::BlobId;
use crate::paths::last_segment;

/// Cache-Control for content-hashed file names.
pub const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Cache-Control for everything else.
pub const REVALIDATE_CACHE_CONTROL: &str = "public, max-age=0, must-revalidate";

const MIN_HASH_LEN: usize = 6;
const MAX_HASH_LEN: usize = 12;

/// True if the file name looks like `<name>[-.]<hash>.<ext>`.
///
/// The hash is 6 to 12 ASCII alphanumerics or underscores, the extension is
/// lowercase (`[a-z0-9]+`, so `woff2` counts). This is a heuristic: a miss
/// only costs cache efficiency.
///
/// # Examples
///
/// ```
/// use siteship::serve::is_hashed_asset;
///
/// assert!(is_hashed_asset("/assets/index-aZ3kP9.js"));
/// assert!(is_hashed_asset("/static/main.4f2a9c1b.css"));
/// assert!(!is_hashed_asset("/index.html"));
/// assert!(!is_hashed_asset("/assets/index-abc.js"));
/// ```
pub fn is_hashed_asset(path: &str) -> bool {
    let name = last_segment(path);

    let Some((stem, ext)) = name.rsplit_once('.') else {
        return false;
    };
    if ext.is_empty()
        || !ext
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
    {
        return false;
    }

    let Some(sep) = stem.rfind(['-', '.']) else {
        return false;
    };
    let hash = &stem[sep + 1..];
    (MIN_HASH_LEN..=MAX_HASH_LEN).contains(&hash.len())
        && hash.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Picks the Cache-Control directive for a resolved path.
pub fn cache_control_for(path: &str) -> &'static str {
    if is_hashed_asset(path) {
        IMMUTABLE_CACHE_CONTROL
    } else {
        REVALIDATE_CACHE_CONTROL
    }
}

/// Strong ETag for a blob: the quoted blob id.
pub fn etag_for(blob_id: &BlobId) -> String {
    format!("\"{blob_id}\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_hashed_names() {
        let hashed = [
            "/assets/index-aZ3kP9.js",
            "/assets/vendor-0123456789ab.js",
            "/assets/font-abc_123.woff2",
            "/main.4f2a9c1b.css",
            "/deep/nested/path/chunk-ABCDEF.mjs",
        ];
        for path in hashed {
            assert!(is_hashed_asset(path), "expected hashed: {path}");
        }
    }

    #[test]
    fn test_unhashed_names() {
        let plain = [
            "/index.html",
            "/",
            "/favicon.ico",
            "/assets/index-abc12.js",         // hash too short
            "/assets/index-0123456789abc.js", // hash too long
            "/assets/index-aZ3kP9.JS",        // uppercase extension
            "/assets/index-aZ3kP9",           // no extension
            "/assets/index aZ3kP9.js",        // no separator
            "/assets/index-aZ3k!9.js",        // non-word char in hash
            "/assets/index-aZ3kP9.js/",       // directory
        ];
        for path in plain {
            assert!(!is_hashed_asset(path), "expected plain: {path}");
        }
    }

    #[test]
    fn test_cache_control_split() {
        assert_eq!(cache_control_for("/assets/index-aZ3kP9.js"), IMMUTABLE_CACHE_CONTROL);
        assert_eq!(cache_control_for("/index.html"), REVALIDATE_CACHE_CONTROL);
    }

    #[test]
    fn test_etag_is_quoted_blob_id() {
        assert_eq!(etag_for(&BlobId::from("abc")), "\"abc\"");
    }

    proptest! {
        #[test]
        fn hash_length_window(
            name in "[a-z]{1,8}",
            hash in "[A-Za-z0-9_]{1,20}",
            ext in "[a-z]{1,5}",
        ) {
            let path = format!("/assets/{name}-{hash}.{ext}");
            let expected = (6..=12).contains(&hash.len());
            prop_assert_eq!(is_hashed_asset(&path), expected);
        }
    }
}
