//! Files retrieved from hosts by a batch GET

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{CaracaraError, Result};
use crate::http::FalconHttpClient;

/// Password protecting every archive served by the extracted file endpoint
const ARCHIVE_PASSWORD: &str = "infected";

/// A file uploaded to the Falcon cloud by a batch GET
#[derive(Clone, Debug)]
pub struct GetFile {
    pub device_id: String,
    /// Path of the file on the host
    pub filename: String,
    pub session_id: String,
    pub sha256: String,
    pub size: u64,
    pub(crate) http: Arc<FalconHttpClient>,
}

impl GetFile {
    /// Name of the file on the host without its directory.
    ///
    /// Unix paths start with `/`; anything else is treated as a Windows path.
    pub fn basename(&self) -> &str {
        let separator = if self.filename.starts_with('/') { '/' } else { '\\' };
        self.filename
            .rsplit(separator)
            .next()
            .unwrap_or(&self.filename)
    }

    /// File name used when downloading into a directory
    pub fn local_name(&self) -> String {
        let (stem, ext) = split_extension(self.basename());
        format!("{stem}_{}_{}{ext}", self.sha256, self.device_id)
    }

    /// Download the file from the Falcon cloud.
    ///
    /// When `output_path` is a directory the file is named after its
    /// basename, hash and device ID. The password-protected 7z archive is
    /// kept unless `extract` is set; after extraction it is deleted unless
    /// `preserve_7z` is set. Returns the path of the written file.
    pub async fn download(&self, output_path: &Path, extract: bool, preserve_7z: bool) -> Result<PathBuf> {
        #[derive(Serialize)]
        struct Query<'a> {
            session_id: &'a str,
            sha256: &'a str,
            filename: &'a str,
        }

        let full_output_path = if output_path.is_dir() {
            output_path.join(self.local_name())
        } else {
            output_path.to_path_buf()
        };

        let archive_path = if !extract && has_7z_extension(&full_output_path) {
            full_output_path.clone()
        } else {
            append_extension(&full_output_path, "7z")
        };

        info!(
            "Downloading {} from device {} to {}",
            self.filename,
            self.device_id,
            archive_path.display()
        );

        let contents = self
            .http
            .get_bytes_with_query(
                "/real-time-response/entities/extracted-file-contents/v1",
                &Query {
                    session_id: &self.session_id,
                    sha256: &self.sha256,
                    filename: &self.filename,
                },
            )
            .await?;
        tokio::fs::write(&archive_path, &contents).await?;
        debug!("Wrote {} bytes to {}", contents.len(), archive_path.display());

        if !extract {
            return Ok(archive_path);
        }

        let target = full_output_path.clone();
        tokio::task::spawn_blocking(move || extract_archive(&archive_path, &target, preserve_7z))
            .await
            .map_err(|e| CaracaraError::Other(e.into()))??;

        info!("Extracted {} to {}", self.filename, full_output_path.display());
        Ok(full_output_path)
    }
}

/// Unpack the single file inside `archive_path` to `target`
fn extract_archive(archive_path: &Path, target: &Path, preserve_7z: bool) -> Result<()> {
    let parent = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let staging = tempfile::tempdir_in(parent)?;

    sevenz_rust::decompress_file_with_password(archive_path, staging.path(), ARCHIVE_PASSWORD.into())
        .map_err(|e| CaracaraError::Archive(e.to_string()))?;

    let extracted = first_file(staging.path())?.ok_or_else(|| {
        CaracaraError::Archive(format!("{} contains no files", archive_path.display()))
    })?;
    fs::rename(&extracted, target)?;

    if !preserve_7z {
        fs::remove_file(archive_path)?;
    }
    Ok(())
}

/// First regular file found below `dir`
fn first_file(dir: &Path) -> Result<Option<PathBuf>> {
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let mut entries: Vec<PathBuf> = fs::read_dir(&current)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<_>>()?;
        entries.sort();
        for path in entries {
            if path.is_file() {
                return Ok(Some(path));
            }
            pending.push(path);
        }
    }
    Ok(None)
}

/// Split a file name into stem and extension. Leading dots belong to the stem.
fn split_extension(name: &str) -> (&str, &str) {
    let leading = name.len() - name.trim_start_matches('.').len();
    match name[leading..].rfind('.') {
        Some(idx) => name.split_at(leading + idx),
        None => (name, ""),
    }
}

fn has_7z_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "7z")
}

fn append_extension(path: &Path, extension: &str) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(".");
    raw.push(extension);
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ClientConfig;

    fn get_file(filename: &str) -> GetFile {
        GetFile {
            device_id: "dev1".to_string(),
            filename: filename.to_string(),
            session_id: "session".to_string(),
            sha256: "abc123".to_string(),
            size: 10,
            http: Arc::new(FalconHttpClient::new(ClientConfig::new("id", "secret")).unwrap()),
        }
    }

    #[test]
    fn test_basename() {
        assert_eq!(get_file("/etc/hosts").basename(), "hosts");
        assert_eq!(get_file("C:\\Windows\\notepad.exe").basename(), "notepad.exe");
        assert_eq!(get_file("plain.txt").basename(), "plain.txt");
    }

    #[test]
    fn test_local_name() {
        assert_eq!(
            get_file("C:\\Windows\\notepad.exe").local_name(),
            "notepad_abc123_dev1.exe"
        );
        assert_eq!(get_file("/etc/hosts").local_name(), "hosts_abc123_dev1");
        assert_eq!(get_file("/root/.bashrc").local_name(), ".bashrc_abc123_dev1");
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("a.tar.gz"), ("a.tar", ".gz"));
        assert_eq!(split_extension("noext"), ("noext", ""));
        assert_eq!(split_extension("..hidden"), ("..hidden", ""));
    }

    #[test]
    fn test_archive_paths() {
        let path = Path::new("/tmp/out.bin");
        assert_eq!(append_extension(path, "7z"), PathBuf::from("/tmp/out.bin.7z"));
        assert!(has_7z_extension(Path::new("/tmp/out.7z")));
        assert!(!has_7z_extension(path));
    }

    #[test]
    fn test_first_file_in_nested_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("inner")).unwrap();
        fs::write(dir.path().join("inner").join("file.txt"), b"data").unwrap();
        let found = first_file(dir.path()).unwrap().unwrap();
        assert_eq!(found.file_name().unwrap(), "file.txt");

        let empty = tempfile::tempdir().unwrap();
        assert!(first_file(empty.path()).unwrap().is_none());
    }
}
