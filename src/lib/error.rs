use std::path::PathBuf;

/// The main error enum for this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to read manifest {}", path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("failed to parse manifest {}", path.display())]
    ManifestParse {
        path: PathBuf,
        #[source]
        err: toml::de::Error,
    },
    #[error("manifest {} has neither a 'package' nor a 'workspace' table", path.display())]
    InvalidManifest { path: PathBuf },
    #[error("manifest {} is missing required key '{key}'", path.display())]
    MissingKey { path: PathBuf, key: String },
    #[error("expected package '{expected}' in {} but found '{found}'", path.display())]
    NameMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },
    #[error("invalid url '{url}'")]
    InvalidUrl {
        url: String,
        #[source]
        err: url::ParseError,
    },
    #[error("git source '{source_id}' does not name a commit in its fragment")]
    MissingCommit { source_id: String },
    #[error("package '{name}' not found in {repo} at commit {commit}")]
    PackageNotFound {
        name: String,
        repo: String,
        commit: String,
    },
    #[error("don't know how to get a tarball for {url}")]
    UnsupportedHost { url: String },
    #[error("invalid workspace member pattern '{pattern}'")]
    Glob {
        pattern: String,
        #[source]
        err: glob::PatternError,
    },
    #[error(transparent)]
    GlobWalk(#[from] glob::GlobError),
    #[error("Command '{command}' exited with status {status}\n{stderr}")]
    Subprocess {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error(transparent)]
    Git2(#[from] git2::Error),
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    TomlSerialize(#[from] toml::ser::Error),
}
