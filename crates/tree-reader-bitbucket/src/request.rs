use serde::de::DeserializeOwned;
use tree_reader::Credential;
use url::Url;

const USER_AGENT: &str = "tree-reader";

/// Why an API call failed, before it is mapped onto a [`tree_reader::ReaderError`].
#[derive(Debug)]
pub(crate) struct Failure {
    pub status: Option<u16>,
    pub message: String,
}

impl Failure {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<EndpointError> for Failure {
    fn from(err: EndpointError) -> Self {
        Self::new(None, err.to_string())
    }
}

/// A provider URL that could not be built from its configured base.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("invalid base URL {base}: {source}")]
    InvalidBase {
        base: String,
        #[source]
        source: url::ParseError,
    },

    #[error("base URL cannot have a path: {0}")]
    CannotBeABase(String),
}

/// A GET with the user agent and credential every provider call carries.
pub(crate) fn build_request(
    client: &reqwest::Client,
    url: Url,
    credential: Option<&Credential>,
) -> reqwest::RequestBuilder {
    let req = client.get(url).header("User-Agent", USER_AGENT);

    match credential {
        Some(Credential::Token(token)) => req.header("Authorization", format!("Bearer {token}")),
        Some(Credential::Basic { username, password }) => req.basic_auth(username, Some(password)),
        None => req,
    }
}

/// Send a request, failing on transport errors and non-2xx statuses.
pub(crate) async fn send(
    client: &reqwest::Client,
    url: Url,
    credential: Option<&Credential>,
) -> Result<reqwest::Response, Failure> {
    tracing::debug!(%url, "GET");

    let response = build_request(client, url, credential)
        .send()
        .await
        .map_err(|e| Failure::new(None, e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_else(|_| "unknown".into());
        return Err(Failure::new(
            Some(status.as_u16()),
            format!("{status}: {}", body.trim()),
        ));
    }

    Ok(response)
}

/// GET a JSON document.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: Url,
    credential: Option<&Credential>,
) -> Result<T, Failure> {
    let response = send(client, url, credential).await?;
    let status = response.status().as_u16();

    response
        .json()
        .await
        .map_err(|e| Failure::new(Some(status), format!("invalid response body: {e}")))
}

/// Append path segments to a base URL. Each segment is percent-encoded, so
/// multi-segment paths must be split by the caller.
pub(crate) fn endpoint<'a>(
    base: &str,
    segments: impl IntoIterator<Item = &'a str>,
) -> Result<Url, EndpointError> {
    let mut url = Url::parse(base).map_err(|source| EndpointError::InvalidBase {
        base: base.to_owned(),
        source,
    })?;
    url.path_segments_mut()
        .map_err(|_| EndpointError::CannotBeABase(base.to_owned()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Split a normalized sub-path into segments, yielding nothing for the root.
pub(crate) fn path_segments(sub_path: &str) -> impl Iterator<Item = &str> {
    sub_path.split('/').filter(|s| !s.is_empty())
}
