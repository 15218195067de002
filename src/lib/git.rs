//! Local clones of the git repositories packages are taken from.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tracing::{debug, info};

use crate::COMMIT_LEN;
use crate::canonical::CanonicalUrl;
use crate::error::Error;

/// Something that can produce a working tree of `repo` at `commit`.
#[allow(async_fn_in_trait)]
pub trait Checkout {
    async fn checkout(&self, repo: &CanonicalUrl, commit: &str) -> Result<PathBuf, Error>;
}

/// A directory of git clones, one per repository, reused across runs. Requires `git` to be
/// installed and available on `PATH`.
#[derive(Debug, Clone)]
pub struct GitCache {
    root: PathBuf,
}

impl GitCache {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// The clone directory for a repository, e.g. `https_github.com_foo_bar`.
    pub fn clone_dir(&self, repo: &CanonicalUrl) -> PathBuf {
        let name = repo.to_string().replace("://", "_").replace('/', "_");
        self.root.join(name)
    }
}

impl Checkout for GitCache {
    async fn checkout(&self, repo: &CanonicalUrl, commit: &str) -> Result<PathBuf, Error> {
        let url = repo.to_string();
        let clone_dir = self.clone_dir(repo);
        if !clone_dir.join(".git").is_dir() {
            info!("Cloning {url} into {}", clone_dir.display());
            std::fs::create_dir_all(&self.root)?;
            run_git(None, &["clone", &url, &clone_dir.to_string_lossy()]).await?;
        }
        let head = head_commit(&clone_dir)?;
        if abbreviate(&head) != abbreviate(commit) {
            debug!("{url} is at {head}, checking out {commit}");
            run_git(Some(&clone_dir), &["fetch", "origin", commit]).await?;
            run_git(Some(&clone_dir), &["checkout", commit]).await?;
        } else {
            debug!("{url} is already at {commit}");
        }
        Ok(clone_dir)
    }
}

/// The first [`COMMIT_LEN`] characters of a commit hash.
pub fn abbreviate(commit: &str) -> &str {
    commit.get(..COMMIT_LEN).unwrap_or(commit)
}

fn head_commit(repo_dir: &Path) -> Result<String, Error> {
    let repo = git2::Repository::open(repo_dir)?;
    let head = repo.head()?.peel_to_commit()?;
    Ok(head.id().to_string())
}

async fn run_git(dir: Option<&Path>, args: &[&str]) -> Result<(), Error> {
    let mut git = tokio::process::Command::new("git");
    git.args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(Stdio::null());
    if let Some(dir) = dir {
        git.current_dir(dir);
    }
    let output = git.output().await?;
    if output.status.success() {
        Ok(())
    } else {
        Err(Error::Subprocess {
            command: format!("git {}", args.join(" ")),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
