//! Input resolution: turn user-supplied paths into [`SourceFile`]s.
//!
//! Directories are expanded recursively so a whole recipe folder can be
//! imported at once. Files are read lazily: a `SourceFile` backed by a path
//! only touches the disk when a worker picks it up.

use bytes::Bytes;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Extensions the import pool accepts. Everything else is dropped from a
/// batch before it is queued.
pub const SUPPORTED_EXTENSIONS: &[&str] =
    &["txt", "md", "docx", "pdf", "png", "jpg", "jpeg", "gif", "webp"];

/// A file waiting to be converted.
#[derive(Debug, Clone)]
pub struct SourceFile {
    name: String,
    origin: Origin,
}

#[derive(Debug, Clone)]
enum Origin {
    Disk(PathBuf),
    Memory(Bytes),
}

impl SourceFile {
    /// A file on disk. The name is the final path component.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            name,
            origin: Origin::Disk(path),
        }
    }

    /// An in-memory file, e.g. bytes received from another process.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            origin: Origin::Memory(bytes.into()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lower-cased text after the last `.`, or `""` when there is none.
    pub fn extension(&self) -> String {
        extension_of(&self.name)
    }

    /// Name without its final extension, used as the default title.
    pub fn base_name(&self) -> &str {
        match self.name.rfind('.') {
            Some(i) if i > 0 => &self.name[..i],
            _ => &self.name,
        }
    }

    pub fn is_supported(&self) -> bool {
        SUPPORTED_EXTENSIONS.contains(&self.extension().as_str())
    }

    /// Read the full contents.
    pub async fn read(&self) -> std::io::Result<Bytes> {
        match &self.origin {
            Origin::Disk(path) => {
                let bytes = tokio::fs::read(path).await?;
                debug!("Read {} ({} bytes)", path.display(), bytes.len());
                Ok(Bytes::from(bytes))
            }
            Origin::Memory(bytes) => Ok(bytes.clone()),
        }
    }
}

/// Lower-cased extension of a file name; `""` when the name has no `.`.
pub fn extension_of(name: &str) -> String {
    match name.rfind('.') {
        Some(i) => name[i + 1..].to_lowercase(),
        None => String::new(),
    }
}

/// Expand paths into files: plain files are kept as given, directories are
/// walked recursively with entries sorted by name. Unreadable entries are
/// logged and skipped.
pub fn collect_files<P: AsRef<Path>>(paths: &[P]) -> Vec<SourceFile> {
    let mut files = Vec::new();
    for p in paths {
        let p = p.as_ref();
        if p.is_dir() {
            for entry in WalkDir::new(p).sort_by_file_name() {
                match entry {
                    Ok(e) if e.file_type().is_file() => {
                        files.push(SourceFile::from_path(e.into_path()))
                    }
                    Ok(_) => {}
                    Err(e) => warn!("Skipping unreadable entry under {}: {}", p.display(), e),
                }
            }
        } else {
            files.push(SourceFile::from_path(p));
        }
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_and_base_name() {
        let f = SourceFile::from_bytes("Grandma's Pie.DOCX", Bytes::new());
        assert_eq!(f.extension(), "docx");
        assert_eq!(f.base_name(), "Grandma's Pie");
        assert!(f.is_supported());

        let f = SourceFile::from_bytes("notes", Bytes::new());
        assert_eq!(f.extension(), "");
        assert_eq!(f.base_name(), "notes");
        assert!(!f.is_supported());

        let f = SourceFile::from_bytes("archive.tar.gz", Bytes::new());
        assert_eq!(f.extension(), "gz");
        assert_eq!(f.base_name(), "archive.tar");
    }

    #[test]
    fn hidden_file_keeps_its_name() {
        let f = SourceFile::from_bytes(".md", Bytes::new());
        assert_eq!(f.base_name(), ".md");
        assert_eq!(f.extension(), "md");
    }

    #[tokio::test]
    async fn collect_walks_directories_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a.md"), "a").unwrap();
        std::fs::write(dir.path().join("sub/c.png"), "c").unwrap();

        let files = collect_files(&[dir.path()]);
        let names: Vec<&str> = files.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["a.md", "b.txt", "c.png"]);
        assert_eq!(&files[0].read().await.unwrap()[..], b"a");
    }
}
