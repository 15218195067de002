//! The flatpak-builder source entries this crate emits.

use serde::Serialize;

use crate::error::Error;

/// One entry of the generated sources file. The `type` tag and field names are those understood
/// by flatpak-builder.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceEntry {
    Archive(ArchiveSource),
    Git(GitSource),
    Inline(InlineSource),
    Shell(ShellSource),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum ArchiveType {
    #[serde(rename = "tar-gzip")]
    TarGzip,
}

/// Download and unpack an archive into `dest`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct ArchiveSource {
    #[serde(rename = "archive-type")]
    pub archive_type: ArchiveType,
    pub url: String,
    pub sha256: String,
    pub dest: String,
}

/// Clone a git repository at `commit` into `dest`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct GitSource {
    pub url: String,
    pub commit: String,
    pub dest: String,
}

/// Write `contents` to `dest/dest-filename`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct InlineSource {
    pub contents: String,
    pub dest: String,
    #[serde(rename = "dest-filename")]
    pub dest_filename: String,
}

/// Run shell commands in the build directory.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct ShellSource {
    pub commands: Vec<String>,
}

impl SourceEntry {
    pub fn archive<U: Into<String>, S: Into<String>, D: Into<String>>(
        url: U,
        sha256: S,
        dest: D,
    ) -> Self {
        Self::Archive(ArchiveSource {
            archive_type: ArchiveType::TarGzip,
            url: url.into(),
            sha256: sha256.into(),
            dest: dest.into(),
        })
    }

    pub fn git<U: Into<String>, C: Into<String>, D: Into<String>>(
        url: U,
        commit: C,
        dest: D,
    ) -> Self {
        Self::Git(GitSource {
            url: url.into(),
            commit: commit.into(),
            dest: dest.into(),
        })
    }

    pub fn inline<C: Into<String>, D: Into<String>, F: Into<String>>(
        contents: C,
        dest: D,
        dest_filename: F,
    ) -> Self {
        Self::Inline(InlineSource {
            contents: contents.into(),
            dest: dest.into(),
            dest_filename: dest_filename.into(),
        })
    }

    pub fn shell<S: Into<String>>(command: S) -> Self {
        Self::Shell(ShellSource {
            commands: vec![command.into()],
        })
    }

    /// The `.cargo-checksum.json` cargo needs to accept a vendored crate. Files are not listed, so
    /// cargo doesn't re-verify them; `package` is the crate checksum, or `null` for git packages.
    pub fn checksum_manifest<D: Into<String>>(
        checksum: Option<&str>,
        dest: D,
    ) -> Result<Self, Error> {
        let contents = format!(
            r#"{{"package": {}, "files": {{}}}}"#,
            serde_json::to_string(&checksum)?
        );
        Ok(Self::inline(contents, dest, crate::CHECKSUM_FILE))
    }
}

/// Render sources as a JSON array, indented by four spaces.
pub fn to_json(sources: &[SourceEntry]) -> Result<String, Error> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    sources.serialize(&mut serializer)?;
    // serde_json only ever writes valid UTF-8
    Ok(String::from_utf8_lossy(&out).into_owned())
}

#[cfg(test)]
mod test_source_entry {
    use super::*;

    #[test]
    fn archive_fields_in_order() {
        let entry = SourceEntry::archive(
            "https://static.crates.io/crates/foo/foo-1.2.3.crate",
            "abc123",
            "cargo/vendor/foo-1.2.3",
        );
        assert_eq!(
            serde_json::to_string(&entry).unwrap(),
            r#"{"type":"archive","archive-type":"tar-gzip","url":"https://static.crates.io/crates/foo/foo-1.2.3.crate","sha256":"abc123","dest":"cargo/vendor/foo-1.2.3"}"#
        );
    }

    #[test]
    fn git_and_shell_shapes() {
        let git = serde_json::to_value(SourceEntry::git("https://a/b", "0123", "d")).unwrap();
        assert_eq!(
            git,
            serde_json::json!({"type": "git", "url": "https://a/b", "commit": "0123", "dest": "d"})
        );
        let shell = serde_json::to_value(SourceEntry::shell("true")).unwrap();
        assert_eq!(shell, serde_json::json!({"type": "shell", "commands": ["true"]}));
    }

    #[test]
    fn checksum_manifest_contents() {
        let registry = SourceEntry::checksum_manifest(Some("abc123"), "cargo/vendor/foo").unwrap();
        assert_eq!(
            registry,
            SourceEntry::inline(
                r#"{"package": "abc123", "files": {}}"#,
                "cargo/vendor/foo",
                ".cargo-checksum.json"
            )
        );
        let git = SourceEntry::checksum_manifest(None, "cargo/vendor/baz").unwrap();
        let SourceEntry::Inline(inline) = git else {
            panic!("expected an inline source");
        };
        assert_eq!(inline.contents, r#"{"package": null, "files": {}}"#);
        assert_eq!(inline.dest_filename, ".cargo-checksum.json");
    }

    #[test]
    fn json_uses_four_space_indent() {
        let json = to_json(&[SourceEntry::shell("true")]).unwrap();
        assert!(json.starts_with("[\n    {\n        \"type\": \"shell\""));
        let back: Vec<SourceEntry> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![SourceEntry::shell("true")]);
    }
}
