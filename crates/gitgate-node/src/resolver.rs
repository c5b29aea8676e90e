//! Maps the repository part of a request path onto a directory.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Errors returned by [`RepoResolver::resolve`].
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Nothing exists at the joined path.
    #[error("repository not found: {0}")]
    NotFound(String),
    /// The segment tries to leave the project root.
    #[error("repository path escapes project root: {0}")]
    Traversal(String),
    /// The working directory was needed and could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolves repository path segments under a project root.
#[derive(Debug, Clone)]
pub struct RepoResolver {
    root: PathBuf,
}

impl RepoResolver {
    /// Creates a resolver rooted at `root`. An empty root means the
    /// working directory at resolve time.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the configured root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Joins `segment` onto the root and checks that the result exists.
    ///
    /// Existence is the only check: the directory is not required to be a
    /// git repository.
    pub async fn resolve(&self, segment: &str) -> Result<PathBuf, ResolveError> {
        let relative = Path::new(segment.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(ResolveError::Traversal(segment.to_string()));
        }

        let root = if self.root.as_os_str().is_empty() {
            std::env::current_dir()?
        } else {
            self.root.clone()
        };

        let dir = root.join(relative);
        match tokio::fs::try_exists(&dir).await {
            Ok(true) => Ok(dir),
            Ok(false) => Err(ResolveError::NotFound(segment.to_string())),
            Err(e) => {
                tracing::debug!(path = %dir.display(), error = %e, "Repository stat failed");
                Err(ResolveError::NotFound(segment.to_string()))
            }
        }
    }
}
