use std::sync::Arc;

use crate::tree::TreeResponse;

/// Errors that can occur when reading from a remote repository.
///
/// Every variant is fatal to the call that produced it. `NotModified` is not
/// a failure in the usual sense: it reports that the caller's etag is already
/// current and no data was transferred.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("Incorrect URL: {url}, no provider is configured for this host")]
    UnknownLocation { url: String },

    #[error("Incorrect URL: {url}, {reason}")]
    InvalidLocation { url: String, reason: String },

    #[error("failed to resolve version of {url} on {host}{}: {message}", status_suffix(.status))]
    VersionResolutionFailed {
        url: String,
        host: String,
        status: Option<u16>,
        message: String,
    },

    #[error(
        "failed to download archive for {url} from {host}{}: {message}",
        status_suffix(.status)
    )]
    ArchiveFetchFailed {
        url: String,
        host: String,
        status: Option<u16>,
        message: String,
    },

    #[error("failed to decode archive for {url}: {message}")]
    ArchiveDecodeFailed { url: String, message: String },

    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("failed to read {url}{}: {message}", status_suffix(.status))]
    ReadFailed {
        url: String,
        status: Option<u16>,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not modified")]
    NotModified,
}

impl ReaderError {
    pub fn is_not_modified(&self) -> bool {
        matches!(self, Self::NotModified)
    }

    /// Upstream HTTP status, when the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::VersionResolutionFailed { status, .. }
            | Self::ArchiveFetchFailed { status, .. }
            | Self::ReadFailed { status, .. } => *status,
            _ => None,
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {code})"),
        None => String::new(),
    }
}

/// Options for [`UrlReader::read_tree`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadTreeOptions {
    /// Etag from a previous read. If it still names the current version the
    /// read fails with [`ReaderError::NotModified`].
    pub etag: Option<String>,
}

impl ReadTreeOptions {
    pub fn with_etag(etag: impl Into<String>) -> Self {
        Self {
            etag: Some(etag.into()),
        }
    }
}

/// Reads files and trees out of hosted repositories identified by URL.
#[async_trait::async_trait]
pub trait UrlReader: Send + Sync {
    /// Fetch the raw content of a single file.
    async fn read(&self, url: &str) -> Result<Vec<u8>, ReaderError>;

    /// Fetch the file tree at `url`.
    async fn read_tree(
        &self,
        url: &str,
        options: ReadTreeOptions,
    ) -> Result<TreeResponse, ReaderError>;
}

#[async_trait::async_trait]
impl<T: UrlReader + ?Sized> UrlReader for Arc<T> {
    async fn read(&self, url: &str) -> Result<Vec<u8>, ReaderError> {
        (**self).read(url).await
    }

    async fn read_tree(
        &self,
        url: &str,
        options: ReadTreeOptions,
    ) -> Result<TreeResponse, ReaderError> {
        (**self).read_tree(url, options).await
    }
}
