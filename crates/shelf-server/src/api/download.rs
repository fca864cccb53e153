//! Guarded artifact download endpoint.
//!
//! `GET /api/download/{app}/{platform}/{filename}` resolves the requested
//! file inside the configured downloads root and serves it with headers
//! that force a save-as download. The path guard works on canonicalized
//! paths, so `..` segments and symlinks pointing outside the root are both
//! rejected with 403.

use std::path::Path as FsPath;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::Router;

use crate::mime;
use crate::AppState;
use shelf_common::{AppError, AppResult};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/{*path}", get(download_artifact))
        .with_state(state)
}

async fn download_artifact(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> AppResult<Response> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let artifact = read_artifact(&state.config.downloads.root, &segments).await?;

    tracing::debug!(
        file = %artifact.filename,
        size = artifact.size,
        "Serving download"
    );

    download_response(artifact)
}

/// A fully buffered artifact ready to serve.
#[derive(Debug)]
struct Artifact {
    filename: String,
    size: u64,
    mime: &'static str,
    data: Vec<u8>,
}

/// Resolve `segments` inside `root` and read the file.
///
/// Fails `Forbidden` for any path escaping the root, `NotFound` for
/// missing or non-regular files, `Internal` for anything else.
async fn read_artifact(root: &FsPath, segments: &[&str]) -> AppResult<Artifact> {
    let filename = segments
        .last()
        .copied()
        .ok_or_else(|| AppError::NotFound("File not found".into()))?;

    // Literal `..` segments are rejected before touching the filesystem,
    // so probes at nonexistent targets still get 403.
    if segments.iter().any(|s| *s == "..") {
        return Err(AppError::Forbidden("Access denied".into()));
    }

    let mut candidate = root.to_path_buf();
    candidate.extend(segments);

    let canonical_root = tokio::fs::canonicalize(root)
        .await
        .map_err(|_| AppError::NotFound("File not found".into()))?;
    let canonical = tokio::fs::canonicalize(&candidate)
        .await
        .map_err(|_| AppError::NotFound("File not found".into()))?;

    // Symlinks inside the tree may resolve anywhere; the check must use
    // canonical forms, not the raw request path.
    if !canonical.starts_with(&canonical_root) {
        tracing::warn!(requested = %candidate.display(), "Download path escapes root");
        return Err(AppError::Forbidden("Access denied".into()));
    }

    let meta = tokio::fs::metadata(&canonical)
        .await
        .map_err(|_| AppError::NotFound("File not found".into()))?;
    if !meta.is_file() {
        return Err(AppError::NotFound("File not found".into()));
    }

    let data = tokio::fs::read(&canonical)
        .await
        .map_err(|e| anyhow::anyhow!("Reading {}: {}", canonical.display(), e))?;

    Ok(Artifact {
        filename: filename.to_string(),
        size: meta.len(),
        mime: mime::from_filename_or_default(filename),
        data,
    })
}

/// Assemble the 200 response with attachment and no-cache headers.
///
/// Content-Disposition carries both the quoted filename and the RFC 5987
/// `filename*` form for non-ASCII names.
fn download_response(artifact: Artifact) -> AppResult<Response> {
    let disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        artifact.filename.replace('"', "\\\""),
        urlencoding::encode(&artifact.filename)
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, artifact.mime)
        .header(header::CONTENT_LENGTH, artifact.size)
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        .header("x-download-options", "noopen")
        .header(
            header::CACHE_CONTROL,
            "no-cache, no-store, must-revalidate, private",
        )
        .header(header::PRAGMA, "no-cache")
        .header(header::EXPIRES, "0")
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::X_FRAME_OPTIONS, "DENY")
        .header(header::REFERRER_POLICY, "strict-origin-when-cross-origin")
        .header("cross-origin-resource-policy", "same-origin")
        .header("x-requested-with", "XMLHttpRequest")
        .header(
            header::STRICT_TRANSPORT_SECURITY,
            "max-age=31536000; includeSubDomains",
        )
        .body(Body::from(artifact.data))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Building download response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog;
    use axum::http::Request;
    use shelf_common::config::{AppConfig, DownloadsConfig, ServerConfig};
    use std::fs;
    use std::path::Path as StdPath;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn write_file(path: &StdPath, contents: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn test_router(root: &StdPath) -> Router {
        let state = Arc::new(AppState {
            config: AppConfig {
                server: ServerConfig::default(),
                downloads: DownloadsConfig {
                    root: root.to_path_buf(),
                },
            },
        });
        Router::new().nest("/api/download", router(state))
    }

    async fn fetch(root: &StdPath, uri: &str) -> Response {
        test_router(root)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn serves_artifact_with_download_headers() {
        let root = TempDir::new().unwrap();
        write_file(&root.path().join("AppX/mac/AppX-1.1.dmg"), b"disk image");

        let response = fetch(root.path(), "/api/download/AppX/mac/AppX-1.1.dmg").await;
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "application/x-apple-diskimage");
        assert_eq!(headers[header::CONTENT_LENGTH], "10");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"AppX-1.1.dmg\"; filename*=UTF-8''AppX-1.1.dmg"
        );
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers["x-download-options"], "noopen");
        assert_eq!(
            headers[header::CACHE_CONTROL],
            "no-cache, no-store, must-revalidate, private"
        );
        assert_eq!(headers[header::PRAGMA], "no-cache");
        assert_eq!(headers[header::EXPIRES], "0");
        assert_eq!(headers[header::ACCEPT_RANGES], "bytes");
        assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers["cross-origin-resource-policy"], "same-origin");
        assert_eq!(
            headers[header::STRICT_TRANSPORT_SECURITY],
            "max-age=31536000; includeSubDomains"
        );
    }

    #[tokio::test]
    async fn traversal_is_forbidden() {
        let root = TempDir::new().unwrap();
        write_file(&root.path().join("AppX/mac/AppX-1.1.dmg"), b"x");

        let response = fetch(
            root.path(),
            "/api/download/AppX/mac/../../../etc/passwd",
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn traversal_to_missing_target_is_still_forbidden() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("AppX/mac")).unwrap();

        let err = read_artifact(root.path(), &["AppX", "mac", "..", "..", "nope"])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_escaping_root_is_forbidden() {
        let outside = TempDir::new().unwrap();
        write_file(&outside.path().join("secret.txt"), b"secret");

        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("AppX/linux")).unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("secret.txt"),
            root.path().join("AppX/linux/secret.txt"),
        )
        .unwrap();

        let err = read_artifact(root.path(), &["AppX", "linux", "secret.txt"])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("AppX/mac")).unwrap();

        let response = fetch(root.path(), "/api/download/AppX/mac/nope.dmg").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn directory_is_not_found() {
        let root = TempDir::new().unwrap();
        write_file(&root.path().join("AppX/mac/AppX.dmg"), b"x");

        let err = read_artifact(root.path(), &["AppX", "mac"]).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn unknown_suffix_served_as_octet_stream() {
        let root = TempDir::new().unwrap();
        write_file(&root.path().join("AppX/linux/AppX-1.0.bin"), b"x");

        let response = fetch(root.path(), "/api/download/AppX/linux/AppX-1.0.bin").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn catalog_urls_round_trip() {
        let root = TempDir::new().unwrap();
        write_file(&root.path().join("AppX/mac/AppX-1.1.dmg"), b"mac");
        write_file(&root.path().join("AppX/windows/AppX-1.1.exe"), b"win");
        write_file(&root.path().join("Tool/linux/tool.tar.gz"), b"tar");

        let apps = catalog::build_catalog(root.path()).await;
        assert_eq!(apps.len(), 2);

        for app in &apps {
            for file in app.platforms.values() {
                let segments: Vec<&str> = file
                    .url
                    .strip_prefix("/api/download/")
                    .unwrap()
                    .split('/')
                    .collect();
                let artifact = read_artifact(root.path(), &segments).await.unwrap();
                assert_eq!(artifact.filename, file.name);
                assert_eq!(artifact.size, file.size_bytes);
            }
        }
    }

    #[tokio::test]
    async fn tar_gz_gets_gzip_mime() {
        let root = TempDir::new().unwrap();
        write_file(&root.path().join("Tool/linux/tool-0.3.tar.gz"), b"x");

        let artifact = read_artifact(root.path(), &["Tool", "linux", "tool-0.3.tar.gz"])
            .await
            .unwrap();
        assert_eq!(artifact.mime, "application/gzip");
    }

    #[test]
    fn disposition_escapes_quotes_and_encodes_utf8() {
        let ascii = Artifact {
            filename: "App \"beta\".zip".into(),
            size: 1,
            mime: mime::OCTET_STREAM,
            data: vec![0],
        };
        let response = download_response(ascii).unwrap();
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"App \\\"beta\\\".zip\"; filename*=UTF-8''App%20%22beta%22.zip"
        );

        // Non-ASCII names survive through the RFC 5987 form.
        let utf8 = Artifact {
            filename: "été.dmg".into(),
            size: 1,
            mime: mime::OCTET_STREAM,
            data: vec![0],
        };
        let response = download_response(utf8).unwrap();
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION].as_bytes(),
            "attachment; filename=\"été.dmg\"; filename*=UTF-8''%C3%A9t%C3%A9.dmg".as_bytes()
        );
    }
}
