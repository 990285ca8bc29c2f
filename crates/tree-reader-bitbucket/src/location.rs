use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use tree_reader::{LocationDescriptor, ProviderConfig, ProviderKind, ReaderError};
use url::Url;

const INVALID_PATH: &str = "Error: Invalid Bitbucket URL or file path";

/// Characters escaped when rendering a single path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// A URL matched to its provider and parsed into a descriptor.
#[derive(Debug, Clone)]
pub struct ParsedUrl<'a> {
    pub provider: &'a ProviderConfig,
    /// `scheme://host[:port]` of the URL, used for web (non-API) endpoints.
    pub origin: String,
    pub location: LocationDescriptor,
}

/// The `host[:port]` key a URL is matched against configured providers by.
pub fn host_key(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    })
}

/// Match `raw` against the configured providers and parse its path with the
/// grammar of the matching provider.
pub fn parse_url<'a>(
    raw: &str,
    providers: &'a [ProviderConfig],
) -> Result<ParsedUrl<'a>, ReaderError> {
    let url = Url::parse(raw).map_err(|e| ReaderError::InvalidLocation {
        url: raw.to_owned(),
        reason: format!("Error: {e}"),
    })?;

    let provider = host_key(&url)
        .and_then(|key| providers.iter().find(|p| p.host == key))
        .ok_or_else(|| ReaderError::UnknownLocation {
            url: raw.to_owned(),
        })?;

    let decoded = decode_segments(&url).map_err(|reason| ReaderError::InvalidLocation {
        url: raw.to_owned(),
        reason,
    })?;
    let segments: Vec<&str> = decoded.iter().map(String::as_str).collect();

    let location = match provider.kind {
        ProviderKind::Cloud => parse_cloud_path(&segments),
        ProviderKind::Server => parse_server_path(&segments, &url),
    }
    .ok_or_else(|| ReaderError::InvalidLocation {
        url: raw.to_owned(),
        reason: INVALID_PATH.to_owned(),
    })?;

    Ok(ParsedUrl {
        provider,
        origin: url.origin().ascii_serialization(),
        location,
    })
}

/// Non-empty path segments of `url`, percent-decoded.
fn decode_segments(url: &Url) -> Result<Vec<String>, String> {
    let Some(segments) = url.path_segments() else {
        return Ok(Vec::new());
    };

    segments
        .filter(|s| !s.is_empty())
        .map(|segment| {
            percent_decode_str(segment)
                .decode_utf8()
                .map(|decoded| decoded.into_owned())
                .map_err(|_| format!("Error: path segment {segment} is not valid UTF-8"))
        })
        .collect()
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Encode each segment of a sub-path, keeping the separators.
fn encode_sub_path(sub_path: &str) -> String {
    sub_path
        .split('/')
        .map(encode_segment)
        .collect::<Vec<_>>()
        .join("/")
}

/// `{org}/{repo}` or `{org}/{repo}/src/{ref}[/{path...}]`
fn parse_cloud_path(segments: &[&str]) -> Option<LocationDescriptor> {
    match segments {
        [org, repo] => Some(LocationDescriptor::new(*org, *repo)),
        [org, repo, "src", git_ref, rest @ ..] => Some(
            LocationDescriptor::new(*org, *repo)
                .with_ref(*git_ref)
                .with_sub_path(rest.join("/")),
        ),
        _ => None,
    }
}

/// `projects/{org}/repos/{repo}[/browse[/{path...}]]`, ref from `?at=`.
fn parse_server_path(segments: &[&str], url: &Url) -> Option<LocationDescriptor> {
    let (org, repo, rest) = match segments {
        ["projects", org, "repos", repo] => (*org, *repo, &[][..]),
        ["projects", org, "repos", repo, "browse", rest @ ..] => (*org, *repo, rest),
        _ => return None,
    };

    let mut location = LocationDescriptor::new(org, repo).with_sub_path(rest.join("/"));

    let at = url
        .query_pairs()
        .find(|(key, _)| key == "at")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty());
    if let Some(git_ref) = at {
        location = location.with_ref(git_ref);
    }

    Some(location)
}

/// Render a descriptor in the cloud grammar. A default-branch location with a
/// sub-path has no cloud form and yields `None`.
pub fn to_cloud_url(origin: &str, location: &LocationDescriptor) -> Option<String> {
    let base = format!(
        "{origin}/{}/{}",
        encode_segment(&location.organization),
        encode_segment(&location.repository)
    );

    match &location.git_ref {
        None if location.has_sub_path() => None,
        None => Some(base),
        Some(git_ref) if location.has_sub_path() => Some(format!(
            "{base}/src/{}/{}",
            encode_segment(git_ref),
            encode_sub_path(&location.sub_path)
        )),
        Some(git_ref) => Some(format!("{base}/src/{}", encode_segment(git_ref))),
    }
}

/// Render a descriptor in the server grammar.
pub fn to_server_url(origin: &str, location: &LocationDescriptor) -> String {
    let mut rendered = format!(
        "{origin}/projects/{}/repos/{}/browse",
        encode_segment(&location.organization),
        encode_segment(&location.repository)
    );
    if location.has_sub_path() {
        rendered.push('/');
        rendered.push_str(&encode_sub_path(&location.sub_path));
    }
    if let Some(git_ref) = &location.git_ref {
        let query: String = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("at", git_ref)
            .finish();
        rendered.push('?');
        rendered.push_str(&query);
    }
    rendered
}
