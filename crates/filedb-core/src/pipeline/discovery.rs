//! File discovery inside storage object directories.
//!
//! Every regular file is returned: classification happens by content later.

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::config::ProcessingConfig;

/// Discovers files in directories.
pub struct FileDiscovery {
    config: ProcessingConfig,
}

/// A file found under an object directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,
    /// Path relative to the walked directory, `/`-separated
    pub content_path: String,
    /// File size in bytes at discovery time
    pub size: u64,
}

impl FileDiscovery {
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    /// Discover all files at a path, sorted by path.
    ///
    /// A file path yields itself, with its file name as content path.
    /// Unreadable directory entries are logged and skipped.
    pub fn discover(&self, path: &Path) -> Vec<DiscoveredFile> {
        if path.is_file() {
            let content_path = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            return std::fs::metadata(path)
                .map(|meta| {
                    vec![DiscoveredFile {
                        path: path.to_path_buf(),
                        content_path,
                        size: meta.len(),
                    }]
                })
                .unwrap_or_default();
        }

        let skip_hidden = self.config.skip_hidden;
        let mut files = Vec::new();

        let walker = WalkDir::new(path)
            .follow_links(self.config.follow_links)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !(skip_hidden && is_hidden(e)));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            files.push(DiscoveredFile {
                content_path: content_path(path, entry.path()),
                path: entry.into_path(),
                size: meta.len(),
            });
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    /// Get total size of all discovered files.
    pub fn total_size(files: &[DiscoveredFile]) -> u64 {
        files.iter().map(|f| f.size).sum()
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|name| name.starts_with('.'))
}

fn content_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("images/W22084-I0886")).unwrap();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::write(root.join("images/W22084-I0886/I08860002.tif"), b"b").unwrap();
        std::fs::write(root.join("images/W22084-I0886/I08860001.tif"), b"a").unwrap();
        std::fs::write(root.join("images/W22084-I0886/dimensions.json"), b"{}").unwrap();
        std::fs::write(root.join(".git/HEAD"), b"ref").unwrap();
        std::fs::write(root.join(".DS_Store"), b"x").unwrap();
        std::fs::write(root.join("notes.txt"), b"hello").unwrap();
        dir
    }

    #[test]
    fn test_discover_all_extensions_sorted() {
        let dir = tree();
        let discovery = FileDiscovery::new(ProcessingConfig::default());
        let files = discovery.discover(dir.path());
        let paths: Vec<&str> = files.iter().map(|f| f.content_path.as_str()).collect();
        assert_eq!(
            paths,
            [
                "images/W22084-I0886/I08860001.tif",
                "images/W22084-I0886/I08860002.tif",
                "images/W22084-I0886/dimensions.json",
                "notes.txt",
            ]
        );
        assert_eq!(FileDiscovery::total_size(&files), 1 + 1 + 2 + 5);
    }

    #[test]
    fn test_hidden_files_included_on_request() {
        let dir = tree();
        let config = ProcessingConfig {
            skip_hidden: false,
            ..Default::default()
        };
        let files = FileDiscovery::new(config).discover(dir.path());
        assert!(files.iter().any(|f| f.content_path == ".git/HEAD"));
        assert!(files.iter().any(|f| f.content_path == ".DS_Store"));
        assert_eq!(files.len(), 6);
    }

    #[test]
    fn test_single_file() {
        let dir = tree();
        let path = dir.path().join("notes.txt");
        let files = FileDiscovery::new(ProcessingConfig::default()).discover(&path);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].content_path, "notes.txt");
        assert_eq!(files[0].size, 5);
    }

    #[test]
    fn test_missing_path() {
        let files = FileDiscovery::new(ProcessingConfig::default()).discover(Path::new("/nonexistent/W1"));
        assert!(files.is_empty());
    }
}
