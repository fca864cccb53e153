//! MIME types for the artifact formats we serve.
//!
//! Suffix table checked in order, most-specific first (`.tar.gz` must win
//! over `.tar` and `.gz`). Matching is ASCII case-insensitive, so
//! `Foo.AppImage` and `foo.appimage` resolve the same.

pub const OCTET_STREAM: &str = "application/octet-stream";

const SUFFIX_TABLE: &[(&str, &str)] = &[
    (".tar.gz", "application/gzip"),
    (".appimage", "application/x-executable"),
    (".dmg", "application/x-apple-diskimage"),
    (".pkg", "application/x-installer"),
    (".zip", "application/zip"),
    (".exe", "application/x-msdownload"),
    (".msi", "application/x-msi"),
    (".deb", "application/vnd.debian.binary-package"),
    (".rpm", "application/x-rpm"),
    (".tar", "application/x-tar"),
    (".gz", "application/gzip"),
];

/// Look up the MIME type for a filename by its suffix.
pub fn from_filename(filename: &str) -> Option<&'static str> {
    let lower = filename.to_ascii_lowercase();
    SUFFIX_TABLE
        .iter()
        .find(|(suffix, _)| lower.ends_with(suffix))
        .map(|&(_, mime)| mime)
}

/// Like [`from_filename`], falling back to `application/octet-stream`.
pub fn from_filename_or_default(filename: &str) -> &'static str {
    from_filename(filename).unwrap_or(OCTET_STREAM)
}
