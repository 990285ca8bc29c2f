use std::collections::HashMap;

use crate::{ReadTreeOptions, ReaderError, TreeResponse, UrlReader};

/// In-memory reader for testing. Serves fixed trees and files by exact URL
/// and honours conditional reads against the stored tree's etag.
#[derive(Default)]
pub struct InMemoryReader {
    trees: HashMap<String, TreeResponse>,
    files: HashMap<String, Vec<u8>>,
}

impl InMemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tree(&mut self, url: impl Into<String>, tree: TreeResponse) {
        self.trees.insert(url.into(), tree);
    }

    pub fn add_file(&mut self, url: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.files.insert(url.into(), content.into());
    }
}

#[async_trait::async_trait]
impl UrlReader for InMemoryReader {
    async fn read(&self, url: &str) -> Result<Vec<u8>, ReaderError> {
        self.files
            .get(url)
            .cloned()
            .ok_or_else(|| ReaderError::UnknownLocation { url: url.to_owned() })
    }

    async fn read_tree(
        &self,
        url: &str,
        options: ReadTreeOptions,
    ) -> Result<TreeResponse, ReaderError> {
        let tree = self
            .trees
            .get(url)
            .ok_or_else(|| ReaderError::UnknownLocation { url: url.to_owned() })?;

        if options.etag.as_deref() == Some(tree.etag()) {
            return Err(ReaderError::NotModified);
        }

        Ok(tree.clone())
    }
}
