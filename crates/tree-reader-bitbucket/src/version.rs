use tree_reader::{
    LocationDescriptor, ProviderConfig, ProviderKind, ReaderError, RefType, ResolvedVersion,
};

use crate::api::{CloudCommits, CloudRepository, ServerBranch, ServerCommits};
use crate::request::{self, Failure, endpoint};

/// Resolve the location's ref to a concrete commit.
///
/// Commit refs are taken as-is; branches cost one API call and the default
/// branch costs two.
pub async fn resolve_version(
    client: &reqwest::Client,
    provider: &ProviderConfig,
    location: &LocationDescriptor,
    url: &str,
) -> Result<ResolvedVersion, ReaderError> {
    let result = match (location.ref_type, location.git_ref.as_deref()) {
        (RefType::Commit, Some(commit)) => Ok(ResolvedVersion::from_hash(commit)),
        (RefType::Branch, Some(branch)) => latest_commit(client, provider, location, branch).await,
        _ => match default_branch(client, provider, location).await {
            Ok(branch) => latest_commit(client, provider, location, &branch).await,
            Err(failure) => Err(failure),
        },
    };

    let version = result.map_err(|failure| version_error(provider, url, failure))?;
    tracing::debug!(commit = %version.commit_id, "resolved version");
    Ok(version)
}

/// Name of the repository's default branch.
pub(crate) async fn default_branch(
    client: &reqwest::Client,
    provider: &ProviderConfig,
    location: &LocationDescriptor,
) -> Result<String, Failure> {
    let credential = provider.credential.as_ref();
    let org = location.organization.as_str();
    let repo = location.repository.as_str();

    match provider.kind {
        ProviderKind::Cloud => {
            let url = endpoint(&provider.api_base_url, ["repositories", org, repo])?;
            let repository: CloudRepository = request::get_json(client, url, credential).await?;
            repository
                .mainbranch
                .map(|branch| branch.name)
                .ok_or_else(|| Failure::new(None, "repository has no main branch"))
        }
        ProviderKind::Server => {
            let url = endpoint(
                &provider.api_base_url,
                ["projects", org, "repos", repo, "branches", "default"],
            )?;
            let branch: ServerBranch = request::get_json(client, url, credential).await?;
            Ok(branch.display_id)
        }
    }
}

/// Id of the newest commit on `branch`.
async fn latest_commit(
    client: &reqwest::Client,
    provider: &ProviderConfig,
    location: &LocationDescriptor,
    branch: &str,
) -> Result<ResolvedVersion, Failure> {
    let credential = provider.credential.as_ref();
    let org = location.organization.as_str();
    let repo = location.repository.as_str();

    let hash = match provider.kind {
        ProviderKind::Cloud => {
            let mut url = endpoint(
                &provider.api_base_url,
                ["repositories", org, repo, "commits", branch],
            )?;
            url.query_pairs_mut().append_pair("pagelen", "1");

            let commits: CloudCommits = request::get_json(client, url, credential).await?;
            commits.values.into_iter().next().map(|c| c.hash)
        }
        ProviderKind::Server => {
            let mut url = endpoint(
                &provider.api_base_url,
                ["projects", org, "repos", repo, "commits"],
            )?;
            url.query_pairs_mut()
                .append_pair("until", branch)
                .append_pair("limit", "1");

            let commits: ServerCommits = request::get_json(client, url, credential).await?;
            commits.values.into_iter().next().map(|c| c.id)
        }
    };

    hash.filter(|h| !h.is_empty())
        .map(|h| ResolvedVersion::from_hash(&h))
        .ok_or_else(|| Failure::new(None, format!("no commits found for ref {branch}")))
}

fn version_error(provider: &ProviderConfig, url: &str, failure: Failure) -> ReaderError {
    ReaderError::VersionResolutionFailed {
        url: url.to_owned(),
        host: provider.host.clone(),
        status: failure.status,
        message: failure.message,
    }
}
