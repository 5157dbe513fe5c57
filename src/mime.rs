//! Content type lookup for deployed files.
//!
//! The declared type is stored on the asset at upload time and served back
//! verbatim, so text types carry an explicit charset here.

use std::path::Path;

/// Content type for files `mime_guess` does not know.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Guesses the content type of a file from its extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use siteship::mime::guess_content_type;
///
/// assert_eq!(guess_content_type(Path::new("index.html")), "text/html; charset=utf-8");
/// assert_eq!(guess_content_type(Path::new("logo.png")), "image/png");
/// assert_eq!(guess_content_type(Path::new("LICENSE")), "application/octet-stream");
/// ```
pub fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    // Build artifacts mime_guess misses
    match ext.as_deref() {
        Some("map") => return "application/json; charset=utf-8",
        Some("webmanifest") => return "application/manifest+json; charset=utf-8",
        None => return FALLBACK_CONTENT_TYPE,
        Some(_) => {},
    }

    mime_guess::from_path(path)
        .first_raw()
        .map_or(FALLBACK_CONTENT_TYPE, with_charset)
}

/// Adds `charset=utf-8` to textual types.
fn with_charset(essence: &'static str) -> &'static str {
    match essence {
        "text/html" => "text/html; charset=utf-8",
        "text/css" => "text/css; charset=utf-8",
        "text/javascript" | "application/javascript" => "text/javascript; charset=utf-8",
        "application/json" => "application/json; charset=utf-8",
        "text/plain" => "text/plain; charset=utf-8",
        "text/xml" | "application/xml" => "application/xml; charset=utf-8",
        "text/csv" => "text/csv; charset=utf-8",
        other => other,
    }
}
