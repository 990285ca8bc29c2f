use std::sync::Arc;

use crate::reader::{ReadTreeOptions, ReaderError, UrlReader};
use crate::tree::TreeResponse;

/// A reader that delegates to multiple inner readers, using the first one
/// that recognises the URL's host.
pub struct CompositeReader {
    readers: Vec<Arc<dyn UrlReader>>,
}

impl CompositeReader {
    pub fn new(readers: Vec<Arc<dyn UrlReader>>) -> Self {
        Self { readers }
    }
}

#[async_trait::async_trait]
impl UrlReader for CompositeReader {
    async fn read(&self, url: &str) -> Result<Vec<u8>, ReaderError> {
        for reader in &self.readers {
            match reader.read(url).await {
                Err(ReaderError::UnknownLocation { .. }) => continue,
                other => return other,
            }
        }
        Err(ReaderError::UnknownLocation { url: url.to_owned() })
    }

    async fn read_tree(
        &self,
        url: &str,
        options: ReadTreeOptions,
    ) -> Result<TreeResponse, ReaderError> {
        for reader in &self.readers {
            match reader.read_tree(url, options.clone()).await {
                Err(ReaderError::UnknownLocation { .. }) => continue,
                other => return other,
            }
        }
        Err(ReaderError::UnknownLocation { url: url.to_owned() })
    }
}
