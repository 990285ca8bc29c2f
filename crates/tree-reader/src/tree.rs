use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;

use crate::reader::ReaderError;

/// A file from a fetched tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    /// Forward-slash path relative to the requested sub-path. Never empty,
    /// never starts with `/`.
    pub path: String,
    content: Bytes,
}

impl ExtractedFile {
    pub fn new(path: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// The file's bytes. Repeatable and cheap: the buffer is shared, not copied.
    pub fn content(&self) -> Bytes {
        self.content.clone()
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Options for [`TreeResponse::dir`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirOptions {
    /// Directory to write into. A fresh temporary directory is created when
    /// unset; cleaning it up is the caller's job.
    pub target_dir: Option<PathBuf>,
}

impl DirOptions {
    pub fn target(dir: impl Into<PathBuf>) -> Self {
        Self {
            target_dir: Some(dir.into()),
        }
    }
}

/// The result of a successful tree read.
///
/// Extraction has already happened by the time this is returned; `files` and
/// `dir` only read from the shared in-memory snapshot.
#[derive(Debug, Clone)]
pub struct TreeResponse {
    etag: String,
    files: Arc<[ExtractedFile]>,
}

impl TreeResponse {
    pub fn new(etag: impl Into<String>, files: Vec<ExtractedFile>) -> Self {
        Self {
            etag: etag.into(),
            files: files.into(),
        }
    }

    /// Commit id the tree was fetched at.
    pub fn etag(&self) -> &str {
        &self.etag
    }

    /// Files in archive order.
    pub fn files(&self) -> &[ExtractedFile] {
        &self.files
    }

    /// Write every file below a directory, creating parents as needed.
    /// Returns the directory written to.
    pub fn dir(&self, options: DirOptions) -> Result<PathBuf, ReaderError> {
        let root = match options.target_dir {
            Some(dir) => {
                std::fs::create_dir_all(&dir)?;
                dir
            }
            None => tempfile::Builder::new()
                .prefix("tree-reader-")
                .tempdir()?
                .keep(),
        };

        for file in self.files.iter() {
            let path = join_relative(&root, &file.path)?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, &file.content)?;
        }

        tracing::debug!(
            dir = %root.display(),
            files = self.files.len(),
            "materialized tree"
        );

        Ok(root)
    }
}

/// Join a forward-slash relative path onto `root`, refusing anything that
/// would land outside it.
fn join_relative(root: &Path, relative: &str) -> Result<PathBuf, ReaderError> {
    let relative_path = Path::new(relative);
    let escapes = relative.is_empty()
        || relative_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));

    if escapes {
        return Err(ReaderError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("refusing to write outside target directory: {relative}"),
        )));
    }

    Ok(root.join(relative_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> TreeResponse {
        TreeResponse::new(
            "12ab34cd56ef",
            vec![
                ExtractedFile::new("mkdocs.yml", "site_name: Test\n"),
                ExtractedFile::new("docs/index.md", "# Test\n"),
            ],
        )
    }

    #[test]
    fn files_are_stable_across_calls() {
        let tree = sample_tree();
        let first: Vec<(String, Bytes)> = tree
            .files()
            .iter()
            .map(|f| (f.path.clone(), f.content()))
            .collect();
        let second: Vec<(String, Bytes)> = tree
            .files()
            .iter()
            .map(|f| (f.path.clone(), f.content()))
            .collect();
        assert_eq!(first, second);
        assert_eq!(tree.etag(), "12ab34cd56ef");
    }

    #[test]
    fn dir_writes_files_into_target() {
        let tmp = tempfile::tempdir().unwrap();
        let tree = sample_tree();

        let dir = tree.dir(DirOptions::target(tmp.path())).unwrap();

        assert_eq!(dir, tmp.path());
        assert_eq!(
            std::fs::read_to_string(dir.join("mkdocs.yml")).unwrap(),
            "site_name: Test\n"
        );
        assert_eq!(
            std::fs::read_to_string(dir.join("docs").join("index.md")).unwrap(),
            "# Test\n"
        );
    }

    #[test]
    fn dir_creates_missing_target() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("nested").join("out");

        let dir = sample_tree().dir(DirOptions::target(&target)).unwrap();

        assert_eq!(dir, target);
        assert!(target.join("docs/index.md").is_file());
    }

    #[test]
    fn dir_without_target_creates_fresh_directory() {
        let tree = sample_tree();

        let first = tree.dir(DirOptions::default()).unwrap();
        let second = tree.dir(DirOptions::default()).unwrap();

        assert_ne!(first, second);
        for dir in [&first, &second] {
            assert_eq!(std::fs::read(dir.join("mkdocs.yml")).unwrap(), b"site_name: Test\n");
        }

        let _ = std::fs::remove_dir_all(first);
        let _ = std::fs::remove_dir_all(second);
    }

    #[test]
    fn dir_leaves_unrelated_files_out_of_listing() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("stray.txt"), "old").unwrap();
        let tree = sample_tree();

        tree.dir(DirOptions::target(tmp.path())).unwrap();

        let paths: Vec<&str> = tree.files().iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["mkdocs.yml", "docs/index.md"]);
    }

    #[test]
    fn dir_rejects_escaping_paths() {
        let tmp = tempfile::tempdir().unwrap();
        let tree = TreeResponse::new("abc", vec![ExtractedFile::new("../evil.txt", "x")]);

        let result = tree.dir(DirOptions::target(tmp.path().join("out")));

        assert!(matches!(result, Err(ReaderError::Io(_))));
        assert!(!tmp.path().join("evil.txt").exists());
    }
}
