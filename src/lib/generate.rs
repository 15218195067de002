//! Generate the complete list of sources for a lockfile.

use futures::future::try_join_all;
use tracing::debug;

use crate::canonical::CanonicalUrl;
use crate::config::RedirectConfig;
use crate::error::Error;
use crate::git::Checkout;
use crate::lockfile::LockFile;
use crate::resolve::{PackageSources, Resolver, git_repo_name};
use crate::source::SourceEntry;
use crate::tarball::{remote_sha256, tarball_url};
use crate::{CARGO_HOME, CONFIG_FILE, GIT_CACHE};

/// Drives resolution of every package in a lockfile.
#[derive(Debug)]
pub struct Generator<C> {
    resolver: Resolver<C>,
    git_tarballs: bool,
    client: reqwest::Client,
}

impl<C: Checkout> Generator<C> {
    pub fn new(checkout: C) -> Self {
        Self {
            resolver: Resolver::new(checkout),
            git_tarballs: false,
            client: reqwest::Client::new(),
        }
    }

    /// Emit git repositories as tarball `archive` sources rather than `git` sources.
    pub fn git_tarballs(mut self, git_tarballs: bool) -> Self {
        self.git_tarballs = git_tarballs;
        self
    }

    /// Generate the sources for `lock`: one entry per (repository, commit) pair, then the entries
    /// for each package, then the cargo config redirecting to the vendored crates.
    pub async fn generate(&self, lock: &LockFile) -> Result<Vec<SourceEntry>, Error> {
        let resolved = try_join_all(
            lock.packages
                .iter()
                .map(|package| self.resolver.resolve(package, lock)),
        )
        .await?;

        let mut config = RedirectConfig::default();
        let mut package_sources = Vec::new();
        for PackageSources { sources, redirect } in resolved.into_iter().flatten() {
            package_sources.extend(sources);
            config.merge(redirect);
        }

        let checkouts = self.resolver.repos().checkouts().await;
        debug!("Adding collected git repos: {checkouts:#?}");
        let mut sources = try_join_all(
            checkouts
                .iter()
                .map(|(repo, commit)| self.git_repo_source(repo, commit)),
        )
        .await?;
        sources.extend(package_sources);

        let contents = config.to_toml()?;
        debug!("Vendored sources:\n{contents}");
        sources.push(SourceEntry::inline(contents, CARGO_HOME, CONFIG_FILE));
        Ok(sources)
    }

    async fn git_repo_source(
        &self,
        repo: &CanonicalUrl,
        commit: &str,
    ) -> Result<SourceEntry, Error> {
        let dest = format!("{GIT_CACHE}/{}", git_repo_name(repo, commit));
        if self.git_tarballs {
            let url = tarball_url(repo, commit)?;
            let sha256 = remote_sha256(&self.client, &url).await?;
            Ok(SourceEntry::archive(url, sha256, dest))
        } else {
            Ok(SourceEntry::git(repo.to_string(), commit, dest))
        }
    }
}
