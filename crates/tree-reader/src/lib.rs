pub mod composite;
pub mod location;
pub mod provider;
pub mod reader;
pub mod tree;

pub use composite::CompositeReader;
pub use location::{LocationDescriptor, RefType, ResolvedVersion, normalize_sub_path};
pub use provider::{
    ArchiveFormat, CLOUD_HOST, Credential, ProviderConfig, ProviderKind, default_api_base_url,
};
pub use reader::{ReadTreeOptions, ReaderError, UrlReader};
pub use tree::{DirOptions, ExtractedFile, TreeResponse};

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
