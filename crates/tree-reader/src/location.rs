use std::fmt;

/// Length of the commit id prefix used as an etag.
pub const SHORT_COMMIT_LEN: usize = 12;

/// How the ref of a location was expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefType {
    /// A named branch.
    Branch,
    /// An immutable commit id.
    Commit,
    /// No ref given: the repository's default branch.
    Default,
}

impl RefType {
    /// Classify an explicit ref. Full 40-character hex ids are commits,
    /// anything else is treated as a branch name.
    pub fn classify(git_ref: &str) -> Self {
        if git_ref.len() == 40 && git_ref.bytes().all(|b| b.is_ascii_hexdigit()) {
            Self::Commit
        } else {
            Self::Branch
        }
    }
}

/// A normalized location inside a hosted repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationDescriptor {
    pub organization: String,
    pub repository: String,
    pub ref_type: RefType,
    /// `None` exactly when `ref_type` is `Default`.
    pub git_ref: Option<String>,
    /// Slash-separated path below the repository root, without leading or
    /// trailing slashes. Empty for the whole repository.
    pub sub_path: String,
}

impl LocationDescriptor {
    pub fn new(organization: impl Into<String>, repository: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            repository: repository.into(),
            ref_type: RefType::Default,
            git_ref: None,
            sub_path: String::new(),
        }
    }

    /// Pin the descriptor to an explicit ref, classifying it.
    pub fn with_ref(mut self, git_ref: impl Into<String>) -> Self {
        let git_ref = git_ref.into();
        self.ref_type = RefType::classify(&git_ref);
        self.git_ref = Some(git_ref);
        self
    }

    pub fn with_sub_path(mut self, sub_path: impl AsRef<str>) -> Self {
        self.sub_path = normalize_sub_path(sub_path.as_ref());
        self
    }

    pub fn has_sub_path(&self) -> bool {
        !self.sub_path.is_empty()
    }
}

impl fmt::Display for LocationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.organization, self.repository)?;
        if let Some(git_ref) = &self.git_ref {
            write!(f, "@{git_ref}")?;
        }
        if self.has_sub_path() {
            write!(f, ":{}", self.sub_path)?;
        }
        Ok(())
    }
}

/// Collapse a user-supplied sub-path to `a/b/c` form: no empty segments, no
/// leading or trailing slash.
pub fn normalize_sub_path(raw: &str) -> String {
    raw.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// A concrete, immutable version of a location. Its commit id doubles as the
/// tree etag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedVersion {
    pub commit_id: String,
}

impl ResolvedVersion {
    /// Build from a provider commit hash, keeping the short prefix.
    pub fn from_hash(hash: &str) -> Self {
        Self {
            commit_id: hash.chars().take(SHORT_COMMIT_LEN).collect(),
        }
    }

    /// True if a caller-held etag names this exact version.
    pub fn matches_etag(&self, etag: &str) -> bool {
        self.commit_id == etag
    }
}
