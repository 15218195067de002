//! The `[source]` replacement table written to `cargo/config`, which points cargo at the
//! vendored crates instead of the network.

// A BTree maintains key order
use std::collections::BTreeMap;

use crate::lockfile::GitReference;
use crate::{CARGO_CRATES, VENDORED_SOURCES};

/// The cargo source name for crates.io.
pub const CRATES_IO_SOURCE: &str = "crates-io";

/// How one cargo source is redirected.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum SourceReplacement {
    /// The vendored directory itself.
    Directory { directory: String },
    /// A git repository replaced by the vendored directory.
    Git(GitReplacement),
    /// A registry replaced by the vendored directory.
    Registry {
        #[serde(rename = "replace-with")]
        replace_with: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct GitReplacement {
    pub git: String,
    #[serde(rename = "replace-with")]
    pub replace_with: String,
    #[serde(flatten)]
    pub reference: Option<GitReference>,
}

/// A single `source.<key>` entry contributed by one resolved package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectFragment {
    pub key: String,
    pub replacement: SourceReplacement,
}

impl RedirectFragment {
    /// Redirect crates.io to the vendored directory.
    pub fn crates_io() -> Self {
        Self {
            key: CRATES_IO_SOURCE.to_string(),
            replacement: SourceReplacement::Registry {
                replace_with: VENDORED_SOURCES.to_string(),
            },
        }
    }

    /// Redirect a git repository to the vendored directory, keeping the `rev`/`tag`/`branch` it was
    /// declared with so cargo matches it against the lockfile.
    pub fn git<S: Into<String>>(repo_url: S, reference: Option<GitReference>) -> Self {
        let repo_url = repo_url.into();
        Self {
            key: repo_url.clone(),
            replacement: SourceReplacement::Git(GitReplacement {
                git: repo_url,
                replace_with: VENDORED_SOURCES.to_string(),
                reference,
            }),
        }
    }
}

/// The complete `[source]` table.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct RedirectConfig {
    source: BTreeMap<String, SourceReplacement>,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        let mut source = BTreeMap::new();
        source.insert(
            VENDORED_SOURCES.to_string(),
            SourceReplacement::Directory {
                directory: CARGO_CRATES.to_string(),
            },
        );
        Self { source }
    }
}

impl RedirectConfig {
    /// Add a fragment. A later fragment for the same key replaces the earlier one.
    pub fn merge(&mut self, fragment: RedirectFragment) {
        self.source.insert(fragment.key, fragment.replacement);
    }

    pub fn get(&self, key: &str) -> Option<&SourceReplacement> {
        self.source.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.source.keys().map(String::as_str)
    }

    /// Serialize as a cargo config document.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}

impl Extend<RedirectFragment> for RedirectConfig {
    fn extend<T: IntoIterator<Item = RedirectFragment>>(&mut self, iter: T) {
        for fragment in iter {
            self.merge(fragment);
        }
    }
}

#[cfg(test)]
mod test_redirect_config {
    use super::*;

    #[test]
    fn default_has_only_vendored_directory() {
        let config = RedirectConfig::default();
        assert_eq!(config.keys().collect::<Vec<_>>(), [VENDORED_SOURCES]);
    }

    #[test]
    fn merge_overwrites_same_key() {
        let mut config = RedirectConfig::default();
        config.merge(RedirectFragment::git("https://github.com/foo/bar", None));
        config.merge(RedirectFragment::git(
            "https://github.com/foo/bar",
            Some(GitReference::Branch("main".into())),
        ));
        config.merge(RedirectFragment::crates_io());
        config.merge(RedirectFragment::crates_io());
        assert_eq!(config.keys().count(), 3);
        assert!(matches!(
            config.get("https://github.com/foo/bar"),
            Some(SourceReplacement::Git(GitReplacement { reference: Some(GitReference::Branch(b)), .. })) if b == "main"
        ));
    }

    #[test]
    fn serializes_as_cargo_config() {
        let mut config = RedirectConfig::default();
        config.merge(RedirectFragment::crates_io());
        config.merge(RedirectFragment::git(
            "https://github.com/foo/bar",
            Some(GitReference::Rev("abc".into())),
        ));
        let document = config.to_toml().unwrap();
        let parsed: toml::Table = document.parse().unwrap();
        let source = parsed["source"].as_table().unwrap();
        assert_eq!(
            source["crates-io"]["replace-with"].as_str(),
            Some(VENDORED_SOURCES)
        );
        assert_eq!(
            source["vendored-sources"]["directory"].as_str(),
            Some("cargo/vendor")
        );
        let git = source["https://github.com/foo/bar"].as_table().unwrap();
        assert_eq!(git["git"].as_str(), Some("https://github.com/foo/bar"));
        assert_eq!(git["replace-with"].as_str(), Some(VENDORED_SOURCES));
        assert_eq!(git["rev"].as_str(), Some("abc"));
        assert!(!git.contains_key("branch"));
    }
}
