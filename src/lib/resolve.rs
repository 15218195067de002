//! Turn one locked package into the sources that vendor it.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, PoisonError};

use tracing::{debug, info, warn};

use crate::canonical::CanonicalUrl;
use crate::config::RedirectFragment;
use crate::error::Error;
use crate::git::{Checkout, abbreviate};
use crate::lockfile::{GitSourceId, LockFile, LockedPackage, PackageSource};
use crate::source::SourceEntry;
use crate::workspace::{self, PackageMap};
use crate::{CARGO_CRATES, CRATES_IO, GIT_CACHE};

/// Registry sources that are crates.io.
const CRATES_IO_REGISTRIES: &[&str] = &[
    "registry+https://github.com/rust-lang/crates.io-index",
    "sparse+https://index.crates.io/",
];

/// The sources for one package, and the cargo config entry that redirects its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSources {
    pub sources: Vec<SourceEntry>,
    pub redirect: RedirectFragment,
}

/// The packages found in one repository, per scanned commit. The mutex is held while a commit is
/// checked out and scanned, which serialises all work on the repository's clone.
#[derive(Debug)]
struct GitRepo {
    commits: tokio::sync::Mutex<BTreeMap<String, Arc<PackageMap>>>,
}

/// Every git repository referenced so far, by canonical URL.
#[derive(Debug, Default)]
pub struct GitRepos {
    repos: std::sync::Mutex<BTreeMap<CanonicalUrl, Arc<GitRepo>>>,
}

impl GitRepos {
    fn get_or_create(&self, url: &CanonicalUrl) -> Arc<GitRepo> {
        let mut repos = self.repos.lock().unwrap_or_else(PoisonError::into_inner);
        let repo = repos.entry(url.clone()).or_insert_with(|| {
            Arc::new(GitRepo {
                commits: tokio::sync::Mutex::new(BTreeMap::new()),
            })
        });
        Arc::clone(repo)
    }

    /// Every (repository, commit) pair scanned so far, ordered by URL then commit.
    pub async fn checkouts(&self) -> Vec<(CanonicalUrl, String)> {
        let repos = self
            .repos
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(url, repo)| (url.clone(), Arc::clone(repo)))
            .collect::<Vec<_>>();
        let mut checkouts = Vec::new();
        for (url, repo) in repos {
            let commits = repo.commits.lock().await;
            checkouts.extend(commits.keys().map(|c| (url.clone(), c.clone())));
        }
        checkouts
    }
}

/// The directory name a repository is checked out under, e.g. `bar-abcdef1`.
pub fn git_repo_name(repo: &CanonicalUrl, commit: &str) -> String {
    format!("{}-{}", repo.name(), abbreviate(commit))
}

/// Resolves locked packages, sharing repository scans between packages from the same repository
/// and commit.
#[derive(Debug)]
pub struct Resolver<C> {
    checkout: C,
    repos: GitRepos,
}

impl<C: Checkout> Resolver<C> {
    pub fn new(checkout: C) -> Self {
        Self {
            checkout,
            repos: GitRepos::default(),
        }
    }

    pub fn repos(&self) -> &GitRepos {
        &self.repos
    }

    /// Resolve one package. Packages without a source (local path packages) and registry packages
    /// without a checksum give `None`.
    pub async fn resolve(
        &self,
        package: &LockedPackage,
        lock: &LockFile,
    ) -> Result<Option<PackageSources>, Error> {
        let Some(source) = package.source.as_deref() else {
            debug!("{} has no source", package.name);
            return Ok(None);
        };
        match PackageSource::parse(source)? {
            PackageSource::Git(git) => self.resolve_git(package, &git).await.map(Some),
            PackageSource::Registry(registry) => resolve_registry(package, &registry, lock),
        }
    }

    /// The packages in `repo` at `commit`, checking out and scanning the repository on first use.
    pub async fn package_map(
        &self,
        repo: &CanonicalUrl,
        commit: &str,
    ) -> Result<Arc<PackageMap>, Error> {
        let git_repo = self.repos.get_or_create(repo);
        let mut commits = git_repo.commits.lock().await;
        if let Some(packages) = commits.get(commit) {
            return Ok(Arc::clone(packages));
        }
        info!("Loading packages from {repo}");
        let checkout_dir = self.checkout.checkout(repo, commit).await?;
        let packages = Arc::new(workspace::scan(&checkout_dir)?);
        debug!("Packages in {repo}: {packages:#?}");
        commits.insert(commit.to_string(), Arc::clone(&packages));
        Ok(packages)
    }

    async fn resolve_git(
        &self,
        package: &LockedPackage,
        git: &GitSourceId,
    ) -> Result<PackageSources, Error> {
        let packages = self.package_map(&git.repo, &git.commit).await?;
        let name = &package.name;
        info!("Adding package {name} from {}", git.repo);
        let subpath = packages.get(name).ok_or_else(|| Error::PackageNotFound {
            name: name.clone(),
            repo: git.repo.to_string(),
            commit: git.commit.clone(),
        })?;
        let repo_dir = Path::new(GIT_CACHE)
            .join(git_repo_name(&git.repo, &git.commit))
            .join(subpath);
        let dest = format!("{CARGO_CRATES}/{name}");
        let copy = format!(
            r#"cp -r --reflink=auto "{}" "{dest}""#,
            repo_dir.display()
        );
        Ok(PackageSources {
            sources: vec![
                SourceEntry::shell(copy),
                SourceEntry::checksum_manifest(None, dest)?,
            ],
            redirect: RedirectFragment::git(git.repo.to_string(), git.reference.clone()),
        })
    }
}

fn resolve_registry(
    package: &LockedPackage,
    registry: &str,
    lock: &LockFile,
) -> Result<Option<PackageSources>, Error> {
    let (name, version) = (&package.name, &package.version);
    let Some(checksum) = lock.checksum(package) else {
        warn!("{name} doesn't have checksum");
        return Ok(None);
    };
    if !CRATES_IO_REGISTRIES.contains(&registry) {
        warn!("{name} comes from {registry}, fetching it from crates.io anyway");
    }
    let dest = format!("{CARGO_CRATES}/{name}-{version}");
    Ok(Some(PackageSources {
        sources: vec![
            SourceEntry::archive(
                format!("{CRATES_IO}/{name}/{name}-{version}.crate"),
                checksum,
                dest.clone(),
            ),
            SourceEntry::checksum_manifest(Some(checksum), dest)?,
        ],
        redirect: RedirectFragment::crates_io(),
    }))
}
