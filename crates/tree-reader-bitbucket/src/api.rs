use serde::Deserialize;

/// Cloud repository metadata.
/// `GET /repositories/{workspace}/{repo}`
#[derive(Debug, Deserialize)]
pub struct CloudRepository {
    pub mainbranch: Option<CloudBranch>,
}

#[derive(Debug, Deserialize)]
pub struct CloudBranch {
    pub name: String,
}

/// One page of cloud commits.
/// `GET /repositories/{workspace}/{repo}/commits/{branch}?pagelen=1`
#[derive(Debug, Deserialize)]
pub struct CloudCommits {
    #[serde(default)]
    pub values: Vec<CloudCommit>,
}

#[derive(Debug, Deserialize)]
pub struct CloudCommit {
    pub hash: String,
}

/// Server default branch.
/// `GET /projects/{project}/repos/{repo}/branches/default`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerBranch {
    pub display_id: String,
}

/// One page of server commits.
/// `GET /projects/{project}/repos/{repo}/commits?until={ref}&limit=1`
#[derive(Debug, Deserialize)]
pub struct ServerCommits {
    #[serde(default)]
    pub values: Vec<ServerCommit>,
}

#[derive(Debug, Deserialize)]
pub struct ServerCommit {
    pub id: String,
}
