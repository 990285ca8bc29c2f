use std::io::{Cursor, Read};

use flate2::read::GzDecoder;
use tree_reader::ExtractedFile;

/// Decoder to use for a downloaded archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
}

impl ArchiveKind {
    /// Pick a decoder from the response content type, then the filename hint,
    /// then the leading magic bytes. Defaults to zip.
    pub fn detect(content_type: Option<&str>, filename: Option<&str>, bytes: &[u8]) -> Self {
        let content_type = content_type.map(|ct| ct.to_lowercase());
        match content_type.as_deref() {
            Some(ct) if ct.contains("zip") && !ct.contains("gzip") => return Self::Zip,
            Some(ct) if ct.contains("gzip") || ct.contains("x-tar") => return Self::TarGz,
            _ => {}
        }

        if let Some(name) = filename.map(str::to_lowercase) {
            if name.ends_with(".zip") {
                return Self::Zip;
            }
            if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
                return Self::TarGz;
            }
        }

        if bytes.starts_with(&[0x1f, 0x8b]) {
            Self::TarGz
        } else {
            Self::Zip
        }
    }
}

/// Why a downloaded archive could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("invalid zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("invalid tar archive: {0}")]
    Tar(#[source] std::io::Error),

    #[error("failed to read {path}: {source}")]
    Entry {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Decode an archive into files relative to `sub_path`.
///
/// Every archive wraps its content in a single top-level directory whose
/// name is not known in advance; that first segment is dropped from every
/// entry. Entries outside `sub_path` are dropped, directories are never
/// returned, and the output follows archive order.
pub fn extract_files(
    bytes: &[u8],
    kind: ArchiveKind,
    sub_path: &str,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    match kind {
        ArchiveKind::Zip => extract_zip(bytes, sub_path),
        ArchiveKind::TarGz => extract_tar_gz(bytes, sub_path),
    }
}

fn extract_zip(bytes: &[u8], sub_path: &str) -> Result<Vec<ExtractedFile>, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;

    let mut files = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;

        if entry.is_dir() {
            continue;
        }

        let entry_path = entry.name().to_owned();
        let Some(relative) = relocate(&entry_path, sub_path) else {
            continue;
        };

        // Declared sizes come from the archive itself and are not trusted
        let mut content = Vec::new();
        entry
            .read_to_end(&mut content)
            .map_err(|source| ExtractError::Entry {
                path: entry_path.clone(),
                source,
            })?;

        files.push(ExtractedFile::new(relative, content));
    }

    Ok(files)
}

fn extract_tar_gz(bytes: &[u8], sub_path: &str) -> Result<Vec<ExtractedFile>, ExtractError> {
    let decoder = GzDecoder::new(bytes);
    let mut archive = tar::Archive::new(decoder);

    let entries = archive.entries().map_err(ExtractError::Tar)?;

    let mut files = Vec::new();

    for entry_result in entries {
        let mut entry = entry_result.map_err(ExtractError::Tar)?;

        // Skip directories, links and pax headers
        if entry.header().entry_type() != tar::EntryType::Regular {
            continue;
        }

        let entry_path = entry
            .path()
            .map_err(ExtractError::Tar)?
            .to_string_lossy()
            .replace('\\', "/");

        let Some(relative) = relocate(&entry_path, sub_path) else {
            continue;
        };

        let mut content = Vec::new();
        entry
            .read_to_end(&mut content)
            .map_err(|source| ExtractError::Entry {
                path: entry_path.clone(),
                source,
            })?;

        files.push(ExtractedFile::new(relative, content));
    }

    Ok(files)
}

/// Map an archive entry path to its path relative to `sub_path`, or `None`
/// if the entry is not exposed.
pub fn relocate(entry_path: &str, sub_path: &str) -> Option<String> {
    if entry_path.ends_with('/') {
        return None;
    }

    if !is_safe_entry_path(entry_path) {
        tracing::warn!(path = entry_path, "skipping archive entry with unsafe path");
        return None;
    }

    // Drop the wrapper directory
    let (_, without_root) = entry_path.split_once('/')?;

    let relative = if sub_path.is_empty() {
        without_root
    } else if without_root == sub_path {
        // The sub-path names a single file
        without_root.rsplit('/').next().unwrap_or(without_root)
    } else {
        without_root.strip_prefix(sub_path)?.strip_prefix('/')?
    };

    let relative = relative.trim_start_matches('/');
    if relative.is_empty() {
        None
    } else {
        Some(relative.to_owned())
    }
}

fn is_safe_entry_path(path: &str) -> bool {
    !path.starts_with('/')
        && !path.contains('\\')
        && path.split('/').all(|segment| segment != "..")
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::GzEncoder;
    use zip::write::SimpleFileOptions;

    use super::*;

    fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        for (name, content) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(content.as_bytes()).unwrap();
            }
        }

        writer.finish().unwrap().into_inner()
    }

    fn build_tarball(entries: &[(&str, &str)]) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut archive = tar::Builder::new(encoder);

        for (file_path, content) in entries {
            let data = content.as_bytes();
            let mut header = tar::Header::new_gnu();
            header.set_path(file_path).unwrap();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_entry_type(tar::EntryType::Regular);
            header.set_cksum();
            archive.append(&header, data).unwrap();
        }

        archive.into_inner().unwrap().finish().unwrap()
    }

    fn paths(files: &[ExtractedFile]) -> Vec<&str> {
        files.iter().map(|f| f.path.as_str()).collect()
    }

    // -- relocate --

    #[test]
    fn strips_wrapper_directory() {
        assert_eq!(
            relocate("backstage-mock-12ab34cd56ef/docs/index.md", ""),
            Some("docs/index.md".into())
        );
    }

    #[test]
    fn top_level_file_without_wrapper_is_dropped() {
        assert_eq!(relocate("README.md", ""), None);
    }

    #[test]
    fn re_roots_under_sub_path() {
        assert_eq!(
            relocate("wrapper/docs/index.md", "docs"),
            Some("index.md".into())
        );
        assert_eq!(relocate("wrapper/mkdocs.yml", "docs"), None);
    }

    #[test]
    fn sub_path_prefix_must_end_at_segment() {
        assert_eq!(relocate("wrapper/docs-old/index.md", "docs"), None);
    }

    #[test]
    fn sub_path_naming_a_file_keeps_file_name() {
        assert_eq!(
            relocate("wrapper/docs/index.md", "docs/index.md"),
            Some("index.md".into())
        );
    }

    #[test]
    fn directory_entries_are_dropped() {
        assert_eq!(relocate("wrapper/docs/", ""), None);
        assert_eq!(relocate("wrapper/", ""), None);
    }

    #[test]
    fn unsafe_paths_are_dropped() {
        assert_eq!(relocate("wrapper/../etc/passwd", ""), None);
        assert_eq!(relocate("/etc/passwd", ""), None);
        assert_eq!(relocate("wrapper\\..\\evil", ""), None);
    }

    // -- detect --

    #[test]
    fn detects_from_content_type() {
        assert_eq!(
            ArchiveKind::detect(Some("application/zip"), None, &[]),
            ArchiveKind::Zip
        );
        assert_eq!(
            ArchiveKind::detect(Some("application/x-gzip"), None, &[]),
            ArchiveKind::TarGz
        );
    }

    #[test]
    fn detects_from_filename_when_content_type_is_generic() {
        assert_eq!(
            ArchiveKind::detect(Some("application/octet-stream"), Some("mock.tgz"), &[]),
            ArchiveKind::TarGz
        );
        assert_eq!(
            ArchiveKind::detect(None, Some("backstage-mock.zip"), &[]),
            ArchiveKind::Zip
        );
    }

    #[test]
    fn detects_from_magic_bytes() {
        assert_eq!(ArchiveKind::detect(None, None, &[0x1f, 0x8b, 0x08]), ArchiveKind::TarGz);
        assert_eq!(ArchiveKind::detect(None, None, b"PK\x03\x04"), ArchiveKind::Zip);
    }

    // -- extract_files --

    #[test]
    fn zip_extraction_keeps_archive_order() {
        let zip = build_zip(&[
            ("backstage-mock-12ab34cd56ef/", ""),
            ("backstage-mock-12ab34cd56ef/docs/", ""),
            ("backstage-mock-12ab34cd56ef/docs/index.md", "# Test\n"),
            ("backstage-mock-12ab34cd56ef/mkdocs.yml", "site_name: Test\n"),
        ]);

        let files = extract_files(&zip, ArchiveKind::Zip, "").unwrap();

        assert_eq!(paths(&files), vec!["docs/index.md", "mkdocs.yml"]);
        assert_eq!(&files[0].content()[..], b"# Test\n");
        assert_eq!(&files[1].content()[..], b"site_name: Test\n");
    }

    #[test]
    fn zip_extraction_filters_sub_path() {
        let zip = build_zip(&[
            ("wrapper/docs/index.md", "# Test\n"),
            ("wrapper/mkdocs.yml", "site_name: Test\n"),
        ]);

        let files = extract_files(&zip, ArchiveKind::Zip, "docs").unwrap();

        assert_eq!(paths(&files), vec!["index.md"]);
        assert_eq!(&files[0].content()[..], b"# Test\n");
    }

    #[test]
    fn empty_match_is_not_an_error() {
        let zip = build_zip(&[("wrapper/mkdocs.yml", "site_name: Test\n")]);

        let files = extract_files(&zip, ArchiveKind::Zip, "docs").unwrap();

        assert!(files.is_empty());
    }

    #[test]
    fn tar_gz_extraction_filters_sub_path() {
        let tarball = build_tarball(&[
            ("mock/docs/index.md", "# Test\n"),
            ("mock/docs/guide/setup.md", "setup"),
            ("mock/mkdocs.yml", "site_name: Test\n"),
        ]);

        let files = extract_files(&tarball, ArchiveKind::TarGz, "docs").unwrap();

        assert_eq!(paths(&files), vec!["index.md", "guide/setup.md"]);
    }

    #[test]
    fn corrupt_entry_data_is_an_error() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file("wrapper/greeting.txt", options).unwrap();
        writer.write_all(b"hello archive").unwrap();
        let mut zip = writer.finish().unwrap().into_inner();

        // Flip a byte of the stored data so the checksum no longer matches
        let at = zip
            .windows(b"hello archive".len())
            .position(|window| window == b"hello archive")
            .unwrap();
        zip[at] = b'j';

        let result = extract_files(&zip, ArchiveKind::Zip, "");
        assert!(matches!(result, Err(ExtractError::Entry { .. })));
    }

    #[test]
    fn truncated_zip_is_an_error() {
        let zip = build_zip(&[
            ("wrapper/docs/index.md", "# Test\n"),
            ("wrapper/mkdocs.yml", "site_name: Test\n"),
        ]);

        let result = extract_files(&zip[..zip.len() / 2], ArchiveKind::Zip, "");
        assert!(matches!(result, Err(ExtractError::Zip(_))));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let result = extract_files(b"<html>not an archive</html>", ArchiveKind::Zip, "");
        assert!(result.is_err());

        let result = extract_files(b"<html>not an archive</html>", ArchiveKind::TarGz, "");
        assert!(result.is_err());
    }
}
