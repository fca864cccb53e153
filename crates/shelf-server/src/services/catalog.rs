//! Catalog builder — scans the downloads root for app bundles.
//!
//! Layout on disk:
//!
//! ```text
//! <root>/<app>/icon.{png,jpg,jpeg,svg}
//! <root>/<app>/description.{md,txt,json}
//! <root>/<app>/{mac,windows,linux}/<artifact>
//! ```
//!
//! Each platform directory contributes its most recently modified file as
//! the current release artifact. The catalog is rebuilt from the
//! filesystem on every request; filesystem failures degrade to absence
//! (a missing icon, platform, or app) rather than failing the listing.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Icon candidates, first existing file wins.
const ICON_CANDIDATES: &[&str] = &["icon.png", "icon.jpg", "icon.jpeg", "icon.svg"];

/// Description candidates, first existing file wins. All three variants
/// are read as opaque text; the `.json` form is not parsed.
const DESCRIPTION_CANDIDATES: &[&str] = &["description.md", "description.txt", "description.json"];

/// Target platform, one fixed subdirectory per app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Mac,
    Windows,
    Linux,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Mac, Platform::Windows, Platform::Linux];

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Mac => "mac",
            Platform::Windows => "windows",
            Platform::Linux => "linux",
        }
    }
}

/// One platform's current release artifact.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadFile {
    pub name: String,
    pub size_bytes: u64,
    pub modified_at: DateTime<Utc>,
    pub url: String,
}

/// One app directory with at least one downloadable artifact.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppEntry {
    pub app_name: String,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub platforms: BTreeMap<Platform, DownloadFile>,
}

/// Scan `root` and build the catalog.
///
/// Apps come out in directory-listing order (not sorted). An unreadable
/// root yields an empty catalog.
pub async fn build_catalog(root: &Path) -> Vec<AppEntry> {
    let mut apps = Vec::new();

    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(root = %root.display(), "Cannot list downloads root: {}", e);
            return apps;
        }
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        // metadata() follows symlinks, so a linked app directory counts.
        let is_dir = tokio::fs::metadata(entry.path())
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            continue;
        }
        let Ok(app_name) = entry.file_name().into_string() else {
            continue;
        };

        if let Some(app) = scan_app(&entry.path(), &app_name).await {
            apps.push(app);
        }
    }

    apps
}

/// Scan a single app directory. Returns `None` when no platform holds any
/// artifact — such apps are omitted from the catalog entirely.
async fn scan_app(app_path: &Path, app_name: &str) -> Option<AppEntry> {
    let mut platforms = BTreeMap::new();

    for platform in Platform::ALL {
        let platform_path = app_path.join(platform.as_str());
        let is_dir = tokio::fs::metadata(&platform_path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            continue;
        }

        if let Some(artifact) = pick_latest_file(&platform_path).await {
            let url = format!(
                "/api/download/{}/{}/{}",
                app_name,
                platform.as_str(),
                artifact.name
            );
            platforms.insert(
                platform,
                DownloadFile {
                    name: artifact.name,
                    size_bytes: artifact.size_bytes,
                    modified_at: artifact.modified_at.into(),
                    url,
                },
            );
        }
    }

    if platforms.is_empty() {
        return None;
    }

    Some(AppEntry {
        app_name: app_name.to_string(),
        icon: find_icon(app_path, app_name).await,
        description: find_description(app_path).await,
        platforms,
    })
}

struct SelectedFile {
    name: String,
    size_bytes: u64,
    modified_at: SystemTime,
}

/// Pick the most recently modified regular file in `dir`.
///
/// Entries whose metadata cannot be read are skipped. Equal modification
/// times are resolved by lexicographic filename comparison, greater name
/// wins, so the selection is deterministic regardless of listing order.
async fn pick_latest_file(dir: &Path) -> Option<SelectedFile> {
    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    let mut latest: Option<SelectedFile> = None;

    while let Ok(Some(entry)) = entries.next_entry().await {
        // Follow symlinks here too; DirEntry::metadata would not.
        let Ok(meta) = tokio::fs::metadata(entry.path()).await else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        let Ok(modified_at) = meta.modified() else {
            continue;
        };
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };

        let newer = match &latest {
            None => true,
            Some(best) => {
                modified_at > best.modified_at
                    || (modified_at == best.modified_at && name > best.name)
            }
        };
        if newer {
            latest = Some(SelectedFile {
                name,
                size_bytes: meta.len(),
                modified_at,
            });
        }
    }

    latest
}

/// First existing icon candidate, as a URL under the static tree.
async fn find_icon(app_path: &Path, app_name: &str) -> Option<String> {
    for candidate in ICON_CANDIDATES {
        let is_file = tokio::fs::metadata(app_path.join(candidate))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if is_file {
            return Some(format!("/downloads/{}/{}", app_name, candidate));
        }
    }
    None
}

/// First readable description candidate, verbatim text.
async fn find_description(app_path: &Path) -> Option<String> {
    for candidate in DESCRIPTION_CANDIDATES {
        if let Ok(text) = tokio::fs::read_to_string(app_path.join(candidate)).await {
            return Some(text);
        }
    }
    None
}
