use std::fmt;

use tree_reader::{
    ProviderConfig, ProviderKind, ReadTreeOptions, ReaderError, RefType, TreeResponse, UrlReader,
};
use url::Url;

use crate::archive;
use crate::extract::{self, ArchiveKind};
use crate::location::{self, ParsedUrl};
use crate::request::{self, endpoint, path_segments};
use crate::version;

/// Reads files and trees from cloud and self-hosted Bitbucket instances.
///
/// The provider set is fixed at construction. Each call resolves its URL
/// against that set and runs independently; nothing is cached between calls.
pub struct BitbucketUrlReader {
    providers: Vec<ProviderConfig>,
    client: reqwest::Client,
}

impl BitbucketUrlReader {
    pub fn new(providers: Vec<ProviderConfig>) -> Self {
        Self::with_client(providers, reqwest::Client::new())
    }

    pub fn with_client(providers: Vec<ProviderConfig>, client: reqwest::Client) -> Self {
        Self { providers, client }
    }

    pub fn providers(&self) -> &[ProviderConfig] {
        &self.providers
    }

    /// API URL serving the raw bytes of the file a location points at.
    async fn file_url(&self, parsed: &ParsedUrl<'_>, url: &str) -> Result<Url, ReaderError> {
        let provider = parsed.provider;
        let location = &parsed.location;

        if !location.has_sub_path() {
            return Err(ReaderError::InvalidLocation {
                url: url.to_owned(),
                reason: "Error: URL does not point at a file".into(),
            });
        }

        let git_ref = match (location.ref_type, &location.git_ref) {
            (RefType::Branch | RefType::Commit, Some(git_ref)) => git_ref.clone(),
            _ => version::default_branch(&self.client, provider, location)
                .await
                .map_err(|f| ReaderError::VersionResolutionFailed {
                    url: url.to_owned(),
                    host: provider.host.clone(),
                    status: f.status,
                    message: f.message,
                })?,
        };

        let org = location.organization.as_str();
        let repo = location.repository.as_str();

        let file_url = match provider.kind {
            ProviderKind::Cloud => endpoint(
                &provider.api_base_url,
                ["repositories", org, repo, "src", git_ref.as_str()]
                    .into_iter()
                    .chain(path_segments(&location.sub_path)),
            ),
            ProviderKind::Server => endpoint(
                &provider.api_base_url,
                ["projects", org, "repos", repo, "raw"]
                    .into_iter()
                    .chain(path_segments(&location.sub_path)),
            )
            .map(|mut file_url| {
                file_url.query_pairs_mut().append_pair("at", &git_ref);
                file_url
            }),
        };

        file_url.map_err(|e| ReaderError::ReadFailed {
            url: url.to_owned(),
            status: None,
            message: e.to_string(),
        })
    }
}

impl fmt::Display for BitbucketUrlReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .providers
            .iter()
            .map(|p| format!("bitbucket{{host={},authed={}}}", p.host, p.is_authed()))
            .collect();
        f.write_str(&rendered.join(", "))
    }
}

#[async_trait::async_trait]
impl UrlReader for BitbucketUrlReader {
    #[tracing::instrument(skip_all, fields(url = %url))]
    async fn read(&self, url: &str) -> Result<Vec<u8>, ReaderError> {
        let parsed = location::parse_url(url, &self.providers)?;
        let file_url = self.file_url(&parsed, url).await?;

        let response = request::send(&self.client, file_url, parsed.provider.credential.as_ref())
            .await
            .map_err(|failure| match failure.status {
                Some(404) => ReaderError::NotFound {
                    url: url.to_owned(),
                },
                status => ReaderError::ReadFailed {
                    url: url.to_owned(),
                    status,
                    message: failure.message,
                },
            })?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| ReaderError::ReadFailed {
            url: url.to_owned(),
            status: Some(status),
            message: format!("failed to read body: {e}"),
        })?;

        Ok(bytes.to_vec())
    }

    #[tracing::instrument(skip_all, fields(url = %url))]
    async fn read_tree(
        &self,
        url: &str,
        options: ReadTreeOptions,
    ) -> Result<TreeResponse, ReaderError> {
        let parsed = location::parse_url(url, &self.providers)?;
        tracing::debug!(
            location = %parsed.location,
            kind = %parsed.provider.kind,
            "parsed location"
        );

        let version =
            version::resolve_version(&self.client, parsed.provider, &parsed.location, url).await?;

        if let Some(etag) = options.etag.as_deref()
            && version.matches_etag(etag)
        {
            tracing::debug!(etag, "etag is current, skipping download");
            return Err(ReaderError::NotModified);
        }

        let stream = archive::fetch_archive(&self.client, &parsed, &version, url).await?;
        let content_type = stream.content_type.clone();
        let filename = stream.suggested_filename.clone();

        let bytes = stream
            .into_bytes()
            .await
            .map_err(|e| ReaderError::ArchiveFetchFailed {
                url: url.to_owned(),
                host: parsed.provider.host.clone(),
                status: None,
                message: format!("failed to read archive body: {e}"),
            })?;

        let kind = ArchiveKind::detect(content_type.as_deref(), filename.as_deref(), &bytes);
        tracing::debug!(?kind, size = bytes.len(), "downloaded archive");

        let files = extract::extract_files(&bytes, kind, &parsed.location.sub_path)
            .map_err(|e| ReaderError::ArchiveDecodeFailed {
                url: url.to_owned(),
                message: e.to_string(),
            })?;

        tracing::info!(
            etag = %version.commit_id,
            files = files.len(),
            "read tree"
        );

        Ok(TreeResponse::new(version.commit_id, files))
    }
}
