use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};

pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "csv", "jpg", "jpeg", "png", "gif",
    "zip", "rar",
];
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Where an uploaded file lands under the storage root. Avatar and library
/// uploads are spread over dated directories; everything else is flat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    JobDocuments,
    AgreementDocuments,
    ClientLogos,
    Avatars,
    Library,
    DailyLogExcel,
    DailyLogPdf,
}

impl FileCategory {
    pub fn directory(&self, now: DateTime<Utc>) -> String {
        match self {
            FileCategory::JobDocuments => "jobs".to_string(),
            FileCategory::AgreementDocuments => "agreements".to_string(),
            FileCategory::ClientLogos => "logos".to_string(),
            FileCategory::Avatars => format!("avatars/{}", now.format("%Y/%m/%d")),
            FileCategory::Library => format!("documents/{}", now.format("%Y/%m/%d")),
            FileCategory::DailyLogExcel => "daily_logs/excel".to_string(),
            FileCategory::DailyLogPdf => "daily_logs/pdf".to_string(),
        }
    }

    pub fn max_bytes(&self) -> usize {
        match self {
            FileCategory::ClientLogos | FileCategory::Avatars => MAX_IMAGE_BYTES,
            _ => MAX_DOCUMENT_BYTES,
        }
    }

    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            FileCategory::ClientLogos | FileCategory::Avatars => IMAGE_EXTENSIONS,
            FileCategory::DailyLogExcel => &["xlsx", "xls"],
            FileCategory::DailyLogPdf => &["pdf"],
            _ => DOCUMENT_EXTENSIONS,
        }
    }
}

pub fn file_extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Keeps only characters that are safe in a flat filename. Path separators in
/// client-supplied names must never reach the filesystem.
pub fn sanitize_filename(original: &str) -> String {
    let cleaned: String = original
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches(['_', '.']).is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

/// Upload naming scheme: `{unix_ts}_{random token}_{sanitized original name}`.
pub fn stored_filename(original: &str, now: DateTime<Utc>) -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();
    format!("{}_{}_{}", now.timestamp(), token, sanitize_filename(original))
}

pub fn build_storage_path(category: FileCategory, original: &str, now: DateTime<Utc>) -> String {
    format!("{}/{}", category.directory(now), stored_filename(original, now))
}

/// Returns human-readable problems with an upload, empty when acceptable.
pub fn check_upload(category: FileCategory, original_name: &str, size_bytes: usize) -> Vec<String> {
    let mut problems = Vec::new();
    let extension = file_extension(original_name);
    if !category.allowed_extensions().contains(&extension.as_str()) {
        problems.push(format!("file type .{extension} is not allowed"));
    }
    if size_bytes > category.max_bytes() {
        problems.push(format!(
            "file exceeds the maximum size of {} bytes",
            category.max_bytes()
        ));
    }
    problems
}

/// Logo and avatar uploads must actually decode as a known raster format,
/// not just carry an image extension.
pub fn looks_like_image(bytes: &[u8]) -> bool {
    image::guess_format(bytes).is_ok()
}

#[async_trait]
pub trait FileStore: Send + Sync + 'static {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<()>;

    async fn get(&self, path: &str) -> Result<Vec<u8>>;

    async fn exists(&self, path: &str) -> Result<bool>;

    /// Deleting a path that does not exist is a no-op.
    async fn delete(&self, path: &str) -> Result<()>;
}

pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        for component in relative.components() {
            match component {
                Component::Normal(_) => {}
                _ => bail!("invalid storage path: {path}"),
            }
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create directory for {path}"))?;
        }
        tokio::fs::write(&full, bytes)
            .await
            .with_context(|| format!("failed to write file {path}"))?;
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path)?;
        tokio::fs::read(&full)
            .await
            .with_context(|| format!("failed to read file {path}"))
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let full = self.resolve(path)?;
        Ok(tokio::fs::try_exists(&full).await.unwrap_or(false))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full = self.resolve(path)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("failed to delete file {path}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn sanitizes_hostile_filenames() {
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_filename("report 2024.pdf"), "report_2024.pdf");
        assert_eq!(sanitize_filename("///"), "file");
    }

    #[test]
    fn stored_filenames_carry_timestamp_and_original_name() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let name = stored_filename("rig-log.pdf", now);
        assert!(name.starts_with(&format!("{}_", now.timestamp())));
        assert!(name.ends_with("_rig-log.pdf"));
    }

    #[test]
    fn dated_categories_spread_over_daily_directories() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(FileCategory::Avatars.directory(now), "avatars/2024/06/01");
        assert_eq!(FileCategory::Library.directory(now), "documents/2024/06/01");
        assert_eq!(FileCategory::JobDocuments.directory(now), "jobs");
    }

    #[test]
    fn rejects_oversized_and_wrong_extension_uploads() {
        let problems = check_upload(FileCategory::ClientLogos, "logo.exe", MAX_IMAGE_BYTES + 1);
        assert_eq!(problems.len(), 2);
        assert!(check_upload(FileCategory::ClientLogos, "logo.png", 100).is_empty());
        assert!(check_upload(FileCategory::DailyLogPdf, "log.xlsx", 100).len() == 1);
    }

    #[tokio::test]
    async fn local_store_put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());

        store.put("jobs/a.txt", b"hello".to_vec()).await.unwrap();
        assert!(store.exists("jobs/a.txt").await.unwrap());
        assert_eq!(store.get("jobs/a.txt").await.unwrap(), b"hello");

        store.delete("jobs/a.txt").await.unwrap();
        assert!(!store.exists("jobs/a.txt").await.unwrap());
        // Second delete is a no-op.
        store.delete("jobs/a.txt").await.unwrap();
    }

    #[tokio::test]
    async fn local_store_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path());
        assert!(store.get("../outside.txt").await.is_err());
        assert!(store.put("/abs/path.txt", Vec::new()).await.is_err());
    }
}
