#![allow(rustdoc::redundant_explicit_links)]
//! Generate [flatpak-builder] sources from a `Cargo.lock` so that a Rust application can be built
//! offline inside the flatpak sandbox.
//!
//! [flatpak-builder]: https://docs.flatpak.org/en/latest/flatpak-builder.html
//!
//! Every locked package becomes a set of sources that places it in a vendored crates directory,
//! and a generated `cargo/config` redirects cargo from crates.io and git remotes to that
//! directory:
//!
//! - Registry packages are downloaded as `.crate` archives from crates.io, checked against the
//!   checksum recorded in the lockfile.
//! - Git packages need their repository cloned at the locked commit. The repository is cloned
//!   locally (into a reusable cache) and scanned to find where each package lives, since a
//!   package may be any workspace member or path dependency inside the repository. The
//!   repository itself is emitted as a `git` source (or, optionally, as a tarball `archive`) and
//!   each package is copied from it into the vendored directory.
//!
//! # Usage
//!
//! ```rust
//! use flatpak_cargo::{Generator, GitCache, LockFile, to_json};
//!
//! let lock = LockFile::from_toml(r#"
//! [[package]]
//! name = "foo"
//! version = "1.2.3"
//! source = "registry+https://github.com/rust-lang/crates.io-index"
//! checksum = "abc123"
//! "#)?;
//!
//! let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
//! let generator = Generator::new(GitCache::new(std::env::temp_dir().join("flatpak-cargo")));
//! let sources = runtime.block_on(generator.generate(&lock))?;
//! assert_eq!(sources.len(), 3);
//! println!("{}", to_json(&sources)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Requirements
//!
//! Git packages are cloned with the `git` executable, which must be available on `PATH`.

pub mod canonical;
pub mod config;
mod error;
pub mod generate;
pub mod git;
pub mod lockfile;
pub mod resolve;
pub mod source;
pub mod tarball;
pub mod workspace;

#[doc(inline)]
pub use crate::canonical::{CanonicalUrl, canonicalize};
#[doc(inline)]
pub use crate::config::RedirectConfig;
#[doc(inline)]
pub use crate::error::Error;
#[doc(inline)]
pub use crate::generate::Generator;
#[doc(inline)]
pub use crate::git::{Checkout, GitCache};
#[doc(inline)]
pub use crate::lockfile::{LockFile, LockedPackage};
#[doc(inline)]
pub use crate::source::{SourceEntry, to_json};
#[doc(inline)]
pub use crate::workspace::{PackageMap, scan};

/// Where crates.io serves `.crate` archives.
pub const CRATES_IO: &str = "https://static.crates.io/crates";
/// `CARGO_HOME` inside the build directory.
pub const CARGO_HOME: &str = "cargo";
/// The vendored crates directory.
pub const CARGO_CRATES: &str = "cargo/vendor";
/// The cargo source name of the vendored crates directory.
pub const VENDORED_SOURCES: &str = "vendored-sources";
/// Where git repositories are placed in the build directory.
pub const GIT_CACHE: &str = "flatpak-cargo/git";
/// Length of abbreviated commit hashes.
pub const COMMIT_LEN: usize = 7;
/// The file cargo reads a vendored crate's checksums from.
pub const CHECKSUM_FILE: &str = ".cargo-checksum.json";
/// The cargo config written into [`CARGO_HOME`].
pub const CONFIG_FILE: &str = "config";
