use std::path::{Path, PathBuf};

use git2::Repository;

/// Read-only view of the git repository holding the workspace.
///
/// Mutating git operations (commit, tag, push) go through the command
/// runner so they honour dry runs; this wrapper only answers questions.
pub struct GitRepo {
    repo: Repository,
}

impl GitRepo {
    /// Discovers the repository containing `start` or one of its parents.
    ///
    /// # Returns
    /// * `Some(GitRepo)` - Repository found
    /// * `None` - `start` is not inside a git repository
    pub fn discover(start: &Path) -> Option<Self> {
        Repository::discover(start).ok().map(|repo| GitRepo { repo })
    }

    /// The working tree root; `None` for bare repositories.
    pub fn workdir(&self) -> Option<PathBuf> {
        self.repo.workdir().map(Path::to_path_buf)
    }

    /// Short name of the checked-out branch, if HEAD is on one.
    pub fn current_branch(&self) -> Option<String> {
        let head = self.repo.head().ok()?;
        if !head.is_branch() {
            return None;
        }
        head.shorthand().map(str::to_string)
    }
}

/// Resolves the workspace root.
///
/// Uses the explicit directory when given, otherwise the git working tree
/// around `cwd`, otherwise `cwd` itself.
pub fn resolve_workspace_root(explicit: Option<&Path>, cwd: &Path) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    GitRepo::discover(cwd)
        .and_then(|repo| repo.workdir())
        .unwrap_or_else(|| cwd.to_path_buf())
}
