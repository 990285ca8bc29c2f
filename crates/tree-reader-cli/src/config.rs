use std::path::PathBuf;

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use tree_reader::{
    ArchiveFormat, CLOUD_HOST, Credential, ProviderConfig, ProviderKind, default_api_base_url,
};

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: Vec<ProviderEntry>,
}

/// A single configured Bitbucket host.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProviderEntry {
    pub host: String,
    pub api_base_url: Option<String>,
    /// `cloud` or `server`. Inferred from the host when absent.
    pub kind: Option<String>,
    pub token: Option<String>,
    pub username: Option<String>,
    pub app_password: Option<String>,
    /// `zip` or `tgz`.
    pub archive_format: Option<String>,
}

impl ProviderEntry {
    /// Build the provider this entry describes. `fallback_token` is used
    /// when the entry carries no credential of its own.
    pub fn to_provider(&self, fallback_token: Option<&str>) -> Result<ProviderConfig> {
        let kind = match &self.kind {
            Some(kind) => ProviderKind::parse(kind)
                .ok_or_else(|| anyhow!("unknown provider kind `{kind}` for {}", self.host))?,
            None => ProviderKind::infer(&self.host),
        };

        let api_base_url = self
            .api_base_url
            .clone()
            .unwrap_or_else(|| default_api_base_url(&self.host, kind));
        let mut provider = ProviderConfig::new(&self.host, api_base_url).with_kind(kind);

        if let Some(format) = &self.archive_format {
            let format = ArchiveFormat::parse(format)
                .ok_or_else(|| anyhow!("unknown archive format `{format}` for {}", self.host))?;
            provider = provider.with_archive_format(format);
        }

        let credential = match (&self.username, &self.app_password, &self.token) {
            (Some(username), Some(password), _) => Some(Credential::Basic {
                username: username.clone(),
                password: password.clone(),
            }),
            (_, _, Some(token)) => Some(Credential::Token(token.clone())),
            _ => fallback_token.map(|token| Credential::Token(token.to_owned())),
        };

        if let Some(credential) = credential {
            provider = provider.with_credential(credential);
        }

        Ok(provider)
    }
}

/// Built-in provider list: Bitbucket Cloud only.
pub fn default_providers() -> Vec<ProviderEntry> {
    vec![ProviderEntry {
        host: CLOUD_HOST.into(),
        ..ProviderEntry::default()
    }]
}

/// Config file path: `~/.config/tree-reader/providers.toml`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tree-reader").join("providers.toml"))
}

/// Load config from file, falling back to defaults if missing.
pub fn load_config() -> AppConfig {
    if let Some(path) = config_path()
        && let Ok(contents) = std::fs::read_to_string(&path)
    {
        match toml::from_str::<AppConfig>(&contents) {
            Ok(config) if !config.providers.is_empty() => return config,
            Ok(_) => {}
            Err(e) => tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to parse config, using defaults"
            ),
        }
    }

    AppConfig {
        providers: default_providers(),
    }
}
