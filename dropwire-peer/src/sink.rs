//! Where received files go

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::warn;

use dropwire_common::control::FALLBACK_FILENAME;

/// How many numbered alternatives to try before giving up
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Accepts a decrypted file from a receiver session
#[async_trait]
pub trait FileSink: Send {
    /// Store `contents` under a name derived from `name`; returns the final path
    async fn save(&mut self, name: &str, contents: &[u8]) -> io::Result<PathBuf>;
}

/// Writes files into a directory, never overwriting existing files
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl FileSink for DirectorySink {
    async fn save(&mut self, name: &str, contents: &[u8]) -> io::Result<PathBuf> {
        let name = safe_file_name(name);
        let mut candidate = self.dir.join(&name);

        for attempt in 1..=MAX_NAME_ATTEMPTS {
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
                .await
            {
                Ok(file) => {
                    write_or_discard(file, &candidate, contents).await?;
                    return Ok(candidate);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    candidate = self.dir.join(numbered_name(&name, attempt));
                }
                Err(e) => return Err(e),
            }
        }

        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free file name for {}", name),
        ))
    }
}

/// Write `contents` to a freshly created file, deleting it if the write fails
async fn write_or_discard<W>(mut file: W, path: &Path, contents: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let result = async {
        file.write_all(contents).await?;
        file.flush().await
    }
    .await;
    if let Err(e) = result {
        drop(file);
        if let Err(remove) = tokio::fs::remove_file(path).await {
            warn!("Could not remove partial file {}: {}", path.display(), remove);
        }
        return Err(e);
    }
    Ok(())
}

/// Reduce a received name to a single safe path component
///
/// Only the final component survives, so `../../etc/passwd` becomes `passwd`.
/// Names that reduce to nothing become [`FALLBACK_FILENAME`].
pub fn safe_file_name(name: &str) -> String {
    let last = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim_matches(char::is_whitespace);
    let cleaned: String = last.chars().filter(|c| !c.is_control()).collect();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        FALLBACK_FILENAME.to_string()
    } else {
        cleaned
    }
}

/// `report.pdf` -> `report (2).pdf`
fn numbered_name(name: &str, n: u32) -> String {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(FALLBACK_FILENAME);
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) => format!("{} ({}).{}", stem, n, ext),
        None => format!("{} ({})", stem, n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("report.pdf"), "report.pdf");
        assert_eq!(safe_file_name("../../etc/passwd"), "passwd");
        assert_eq!(safe_file_name("C:\\Users\\me\\notes.txt"), "notes.txt");
        assert_eq!(safe_file_name("dir/"), FALLBACK_FILENAME);
        assert_eq!(safe_file_name(".."), FALLBACK_FILENAME);
        assert_eq!(safe_file_name(""), FALLBACK_FILENAME);
        assert_eq!(safe_file_name("a\u{0}b"), "ab");
    }

    #[test]
    fn test_numbered_name() {
        assert_eq!(numbered_name("report.pdf", 1), "report (1).pdf");
        assert_eq!(numbered_name("archive.tar.gz", 2), "archive.tar (2).gz");
        assert_eq!(numbered_name("README", 3), "README (3)");
    }

    #[tokio::test]
    async fn test_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path());

        let path = sink.save("hello.txt", b"hi").await.unwrap();

        assert_eq!(path, dir.path().join("hello.txt"));
        assert_eq!(std::fs::read(&path).unwrap(), b"hi");
    }

    #[tokio::test]
    async fn test_save_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("photo.jpg"), b"original").unwrap();
        let mut sink = DirectorySink::new(dir.path());

        let first = sink.save("photo.jpg", b"one").await.unwrap();
        let second = sink.save("photo.jpg", b"two").await.unwrap();

        assert_eq!(first, dir.path().join("photo (1).jpg"));
        assert_eq!(second, dir.path().join("photo (2).jpg"));
        assert_eq!(
            std::fs::read(dir.path().join("photo.jpg")).unwrap(),
            b"original"
        );
    }

    #[tokio::test]
    async fn test_save_strips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path());

        let path = sink.save("../escape.txt", b"x").await.unwrap();

        assert_eq!(path, dir.path().join("escape.txt"));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.bin");
        std::fs::write(&path, b"").unwrap();
        let (writer, reader) = tokio::io::duplex(8);
        drop(reader);

        let err = write_or_discard(writer, &path, b"0123456789abcdef")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_save_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path().join("missing"));

        let err = sink.save("a.txt", b"x").await.unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
