//! The parts of `Cargo.lock` needed to locate every locked package.

use std::collections::BTreeMap;

use crate::canonical::{CanonicalUrl, canonicalize};
use crate::error::Error;

/// A parsed `Cargo.lock`. The lockfile is assumed to be resolved and valid already.
#[derive(Debug, Default, serde::Deserialize, PartialEq)]
pub struct LockFile {
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(default, rename = "package")]
    pub packages: Vec<LockedPackage>,
    /// Lockfile-level metadata. Version 1 lockfiles keep checksums here under keys of the form
    /// `checksum <name> <version> (<source>)`.
    #[serde(default)]
    pub metadata: BTreeMap<String, toml::Value>,
}

/// One `[[package]]` entry.
#[derive(Debug, Clone, serde::Deserialize, PartialEq, Eq)]
pub struct LockedPackage {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub checksum: Option<String>,
}

impl LockFile {
    /// Parse the contents of a `Cargo.lock` file.
    pub fn from_toml<S: AsRef<str>>(document: S) -> Result<Self, toml::de::Error> {
        toml::from_str(document.as_ref())
    }

    /// The checksum of a registry package. A metadata entry wins over a checksum stored on the
    /// package itself.
    pub fn checksum<'a>(&'a self, package: &'a LockedPackage) -> Option<&'a str> {
        let source = package.source.as_deref()?;
        let key = format!(
            "checksum {} {} ({source})",
            package.name, package.version
        );
        self.metadata
            .get(&key)
            .and_then(|v| v.as_str())
            .or(package.checksum.as_deref())
    }
}

/// Which of `rev`/`tag`/`branch` a git dependency was declared with.
#[derive(Debug, serde::Deserialize, serde::Serialize, PartialEq, Eq, Clone)]
pub enum GitReference {
    #[serde(rename = "branch")]
    Branch(String),
    #[serde(rename = "tag")]
    Tag(String),
    #[serde(rename = "rev")]
    Rev(String),
}

/// A git source identifier, e.g. `git+https://github.com/foo/bar?branch=main#<commit>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSourceId {
    pub repo: CanonicalUrl,
    pub commit: String,
    pub reference: Option<GitReference>,
}

/// Where a locked package comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSource {
    Registry(String),
    Git(GitSourceId),
}

impl PackageSource {
    /// Classify a lockfile `source` string.
    pub fn parse(source: &str) -> Result<Self, Error> {
        if !source.starts_with("git+") {
            return Ok(Self::Registry(source.to_string()));
        }
        let parsed = url::Url::parse(source).map_err(|err| Error::InvalidUrl {
            url: source.to_string(),
            err,
        })?;
        let commit = match parsed.fragment() {
            Some(commit) if !commit.is_empty() => commit.to_string(),
            _ => {
                return Err(Error::MissingCommit {
                    source_id: source.to_string(),
                });
            }
        };
        let query = |key: &str| {
            parsed
                .query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
        };
        let reference = query("rev")
            .map(GitReference::Rev)
            .or_else(|| query("tag").map(GitReference::Tag))
            .or_else(|| query("branch").map(GitReference::Branch));
        Ok(Self::Git(GitSourceId {
            repo: canonicalize(source)?,
            commit,
            reference,
        }))
    }
}

impl std::fmt::Display for GitSourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.repo)?;
        if let Some(reference) = &self.reference {
            match reference {
                GitReference::Branch(branch) => write!(f, " (branch: {branch})")?,
                GitReference::Tag(tag) => write!(f, " (tag: {tag})")?,
                GitReference::Rev(rev) => write!(f, " (rev: {rev})")?,
            }
        }
        write!(f, " @ {}", self.commit)
    }
}
