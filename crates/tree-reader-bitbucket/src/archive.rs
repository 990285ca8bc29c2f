use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use tree_reader::{ProviderKind, ReaderError, ResolvedVersion};
use url::Url;

use crate::location::ParsedUrl;
use crate::request::{self, EndpointError, endpoint};

/// A downloaded archive body that has not been read yet.
pub struct ArchiveStream {
    pub body: BoxStream<'static, Result<Bytes, reqwest::Error>>,
    /// Filename from `Content-Disposition`, if the server sent one.
    pub suggested_filename: Option<String>,
    pub content_type: Option<String>,
}

impl ArchiveStream {
    /// Drain the body into one buffer. Zip decoding needs random access, so
    /// the archive is held in memory for the duration of extraction.
    pub async fn into_bytes(mut self) -> Result<Vec<u8>, reqwest::Error> {
        let mut buf = Vec::new();
        while let Some(chunk) = self.body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf)
    }
}

/// Download URL for the archive of a location at a resolved version.
///
/// Cloud archives come from the web host (`/{org}/{repo}/get/{commit}.zip`)
/// and cover the whole repository. Server archives come from the REST API,
/// are prefixed with the repository name and are filtered server-side by
/// `path` when the location has a sub-path.
pub fn archive_url(
    parsed: &ParsedUrl<'_>,
    version: &ResolvedVersion,
) -> Result<Url, EndpointError> {
    let provider = parsed.provider;
    let location = &parsed.location;
    let org = location.organization.as_str();
    let repo = location.repository.as_str();

    match provider.kind {
        ProviderKind::Cloud => {
            let file = format!(
                "{}.{}",
                version.commit_id,
                provider.archive_format.extension()
            );
            endpoint(&parsed.origin, [org, repo, "get", file.as_str()])
        }
        ProviderKind::Server => {
            let mut url = endpoint(
                &provider.api_base_url,
                ["projects", org, "repos", repo, "archive"],
            )?;
            {
                let mut query = url.query_pairs_mut();
                query
                    .append_pair("format", provider.archive_format.server_format())
                    .append_pair("prefix", repo)
                    .append_pair("at", &version.commit_id);
                if location.has_sub_path() {
                    query.append_pair("path", &location.sub_path);
                }
            }
            Ok(url)
        }
    }
}

/// Request the archive and hand back its unread body.
pub async fn fetch_archive(
    client: &reqwest::Client,
    parsed: &ParsedUrl<'_>,
    version: &ResolvedVersion,
    url: &str,
) -> Result<ArchiveStream, ReaderError> {
    let fail = |status: Option<u16>, message: String| ReaderError::ArchiveFetchFailed {
        url: url.to_owned(),
        host: parsed.provider.host.clone(),
        status,
        message,
    };

    let archive_url = archive_url(parsed, version).map_err(|e| fail(None, e.to_string()))?;
    let response = request::send(client, archive_url, parsed.provider.credential.as_ref())
        .await
        .map_err(|f| fail(f.status, f.message))?;

    let headers = response.headers();
    let content_type = headers
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let suggested_filename = headers
        .get(reqwest::header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .and_then(filename_from_disposition);

    Ok(ArchiveStream {
        body: response.bytes_stream().boxed(),
        suggested_filename,
        content_type,
    })
}

/// Pull `filename=...` out of a `Content-Disposition` header value.
pub fn filename_from_disposition(value: &str) -> Option<String> {
    value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_owned())
        .filter(|name| !name.is_empty())
}
