use std::fmt;

/// Host of the cloud-hosted service. Every other host is treated as a
/// self-hosted server unless configured otherwise.
pub const CLOUD_HOST: &str = "bitbucket.org";

const CLOUD_API_BASE_URL: &str = "https://api.bitbucket.org/2.0";

/// Which URL grammar and API dialect a configured host speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// `/{org}/{repo}/src/{ref}/{path}` URLs, 2.0 REST API.
    Cloud,
    /// `/projects/{org}/repos/{repo}/browse/{path}?at={ref}` URLs, 1.0 REST API.
    Server,
}

impl ProviderKind {
    /// Kind implied by a host name alone.
    pub fn infer(host: &str) -> Self {
        if host == CLOUD_HOST {
            Self::Cloud
        } else {
            Self::Server
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cloud" => Some(Self::Cloud),
            "server" => Some(Self::Server),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cloud => write!(f, "cloud"),
            Self::Server => write!(f, "server"),
        }
    }
}

/// Archive encoding requested from the download endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    #[default]
    Zip,
    TarGz,
}

impl ArchiveFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "zip" => Some(Self::Zip),
            "tgz" | "tar.gz" => Some(Self::TarGz),
            _ => None,
        }
    }

    /// File extension used by the cloud `get/{ref}.{ext}` endpoint.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::TarGz => "tar.gz",
        }
    }

    /// Value of the server archive endpoint's `format` parameter.
    pub fn server_format(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::TarGz => "tgz",
        }
    }
}

/// Credential attached to every outgoing request for a provider.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Sent as `Authorization: Bearer <token>`.
    Token(String),
    /// Username plus app password, sent as HTTP basic auth.
    Basic { username: String, password: String },
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token(***)"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

/// One configured hosting endpoint. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// `host[:port]` as it appears in repository URLs.
    pub host: String,
    pub api_base_url: String,
    pub kind: ProviderKind,
    pub credential: Option<Credential>,
    pub archive_format: ArchiveFormat,
}

impl ProviderConfig {
    pub fn new(host: impl Into<String>, api_base_url: impl Into<String>) -> Self {
        let host = host.into();
        Self {
            kind: ProviderKind::infer(&host),
            host,
            api_base_url: api_base_url.into(),
            credential: None,
            archive_format: ArchiveFormat::default(),
        }
    }

    /// Config for a host with its conventional API base URL.
    pub fn for_host(host: impl Into<String>) -> Self {
        let host = host.into();
        let api_base_url = default_api_base_url(&host, ProviderKind::infer(&host));
        Self::new(host, api_base_url)
    }

    pub fn with_kind(mut self, kind: ProviderKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn with_archive_format(mut self, format: ArchiveFormat) -> Self {
        self.archive_format = format;
        self
    }

    pub fn is_authed(&self) -> bool {
        self.credential.is_some()
    }
}

/// Conventional REST API root for a host of the given kind.
pub fn default_api_base_url(host: &str, kind: ProviderKind) -> String {
    match kind {
        ProviderKind::Cloud if host == CLOUD_HOST => CLOUD_API_BASE_URL.to_owned(),
        ProviderKind::Cloud => format!("https://api.{host}/2.0"),
        ProviderKind::Server => format!("https://{host}/rest/api/1.0"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloud_host_infers_cloud_kind() {
        let config = ProviderConfig::for_host("bitbucket.org");
        assert_eq!(config.kind, ProviderKind::Cloud);
        assert_eq!(config.api_base_url, "https://api.bitbucket.org/2.0");
    }

    #[test]
    fn other_hosts_infer_server_kind() {
        let config = ProviderConfig::for_host("bitbucket.mycompany.net");
        assert_eq!(config.kind, ProviderKind::Server);
        assert_eq!(
            config.api_base_url,
            "https://bitbucket.mycompany.net/rest/api/1.0"
        );
    }

    #[test]
    fn explicit_kind_overrides_inference() {
        let config = ProviderConfig::new("127.0.0.1:8080", "http://127.0.0.1:8080/api")
            .with_kind(ProviderKind::Cloud);
        assert_eq!(config.kind, ProviderKind::Cloud);
    }

    #[test]
    fn credential_debug_hides_secrets() {
        let token = format!("{:?}", Credential::Token("s3cret".into()));
        assert!(!token.contains("s3cret"));

        let basic = format!(
            "{:?}",
            Credential::Basic {
                username: "me".into(),
                password: "hunter2".into(),
            }
        );
        assert!(basic.contains("me"));
        assert!(!basic.contains("hunter2"));
    }

    #[test]
    fn archive_format_parses_aliases() {
        assert_eq!(ArchiveFormat::parse("ZIP"), Some(ArchiveFormat::Zip));
        assert_eq!(ArchiveFormat::parse("tgz"), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::parse("tar.gz"), Some(ArchiveFormat::TarGz));
        assert_eq!(ArchiveFormat::parse("rar"), None);
    }
}
