pub mod api;
pub mod archive;
pub mod extract;
pub mod location;
pub mod reader;
mod request;
pub mod version;

pub use archive::ArchiveStream;
pub use extract::ArchiveKind;
pub use location::{ParsedUrl, parse_url, to_cloud_url, to_server_url};
pub use reader::BitbucketUrlReader;
pub use request::EndpointError;
