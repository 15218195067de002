//! Discover the packages inside a checked-out git repository.
//!
//! Cargo can take any package from a git dependency's repository as long as it is reachable from
//! the root manifest, either as a workspace member or through a chain of `path` dependencies. The
//! scanner walks that graph and records where each package lives.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::Error;

const MANIFEST: &str = "Cargo.toml";

/// Dependency tables cargo resolves for a package pulled in from a git repository.
const DEPENDENCY_TABLES: &[&str] = &["dependencies", "build-dependencies"];

/// Package name to package directory, relative to the repository root. The root package is `.`.
pub type PackageMap = BTreeMap<String, PathBuf>;

/// Scan the repository checked out at `repo_dir`.
pub fn scan<P: AsRef<Path>>(repo_dir: P) -> Result<PackageMap, Error> {
    WorkspaceScanner::new(repo_dir.as_ref()).scan()
}

struct WorkspaceScanner<'a> {
    root: &'a Path,
    /// The root manifest's `[workspace.dependencies]`, for `{ workspace = true }` entries.
    workspace_deps: toml::Table,
    packages: PackageMap,
    /// Packages whose dependencies are being walked. Guards against dependency cycles.
    in_progress: BTreeSet<String>,
}

impl<'a> WorkspaceScanner<'a> {
    fn new(root: &'a Path) -> Self {
        Self {
            root,
            workspace_deps: toml::Table::new(),
            packages: PackageMap::new(),
            in_progress: BTreeSet::new(),
        }
    }

    fn scan(mut self) -> Result<PackageMap, Error> {
        let root_dir = PathBuf::from(".");
        let root_manifest = self.load_manifest(&root_dir)?;
        let package = root_manifest.get("package");
        let workspace = root_manifest.get("workspace").and_then(|w| w.as_table());
        if package.is_none() && workspace.is_none() {
            return Err(Error::InvalidManifest {
                path: self.manifest_path(&root_dir),
            });
        }

        if let Some(deps) = workspace
            .and_then(|w| w.get("dependencies"))
            .and_then(|d| d.as_table())
        {
            self.workspace_deps = deps.clone();
        }

        if package.is_some() {
            let name = package_name(&root_manifest, self.manifest_path(&root_dir))?;
            self.in_progress.insert(name.clone());
            self.scan_dependencies(&root_manifest, &root_dir)?;
            self.register(name, root_dir);
        }

        if let Some(workspace) = workspace {
            let excludes = string_array(workspace, "exclude")
                .map(|e| normalize(Path::new(e)))
                .collect::<Vec<_>>();
            for member in string_array(workspace, "members") {
                self.scan_member(member, &excludes)?;
            }
        }

        Ok(self.packages)
    }

    /// Register every package matching the workspace member glob `member`.
    fn scan_member(&mut self, member: &str, excludes: &[PathBuf]) -> Result<(), Error> {
        let root = glob::Pattern::escape(&self.root.to_string_lossy());
        let pattern = format!("{root}/{member}/{MANIFEST}");
        let entries = glob::glob(&pattern).map_err(|err| Error::Glob {
            pattern: member.to_string(),
            err,
        })?;
        for entry in entries {
            let manifest_path = entry?;
            let member_dir = manifest_path
                .parent()
                .and_then(|dir| dir.strip_prefix(self.root).ok())
                .map(normalize)
                .unwrap_or_else(|| PathBuf::from("."));
            if excludes.iter().any(|e| member_dir.starts_with(e)) {
                debug!("Skipping excluded workspace member {}", member_dir.display());
                continue;
            }
            debug!("Loading workspace member {}", member_dir.display());
            let manifest = self.load_manifest(&member_dir)?;
            let name = package_name(&manifest, manifest_path)?;
            if self.is_known(&name) {
                continue;
            }
            self.in_progress.insert(name.clone());
            self.scan_dependencies(&manifest, &member_dir)?;
            self.register(name, member_dir);
        }
        Ok(())
    }

    /// Register the path dependencies of a manifest (or of a `target.<cfg>` table in one), loaded
    /// from `dir`. Inner dependencies are registered before the packages that depend on them.
    fn scan_dependencies(&mut self, entry: &toml::Table, dir: &Path) -> Result<(), Error> {
        for table in DEPENDENCY_TABLES {
            let Some(deps) = entry.get(*table).and_then(|d| d.as_table()) else {
                continue;
            };
            for (key, dep) in deps {
                let Some((name, dep_dir)) = self.path_dependency(key, dep, dir) else {
                    continue;
                };
                if self.is_known(&name) {
                    continue;
                }
                debug!("Loading dependency {name} from {}", dep_dir.display());
                let manifest = self.load_manifest(&dep_dir)?;
                let manifest_path = self.manifest_path(&dep_dir);
                let found = package_name(&manifest, &manifest_path)?;
                if found != name {
                    return Err(Error::NameMismatch {
                        path: manifest_path,
                        expected: name,
                        found,
                    });
                }
                self.in_progress.insert(name.clone());
                self.scan_dependencies(&manifest, &dep_dir)?;
                self.register(name, dep_dir);
            }
        }
        if let Some(targets) = entry.get("target").and_then(|t| t.as_table()) {
            for target in targets.values().filter_map(|t| t.as_table()) {
                self.scan_dependencies(target, dir)?;
            }
        }
        Ok(())
    }

    /// The package name and directory of a dependency declared with a `path`, if it is one.
    fn path_dependency(&self, key: &str, dep: &toml::Value, dir: &Path) -> Option<(String, PathBuf)> {
        let dep = dep.as_table()?;
        let inherited = dep.get("workspace").and_then(|w| w.as_bool()) == Some(true);
        let (dep, base) = if inherited {
            (self.workspace_deps.get(key)?.as_table()?, Path::new("."))
        } else {
            (dep, dir)
        };
        let path = dep.get("path")?.as_str()?;
        let name = dep.get("package").and_then(|p| p.as_str()).unwrap_or(key);
        Some((name.to_string(), normalize(&base.join(path))))
    }

    fn is_known(&self, name: &str) -> bool {
        self.packages.contains_key(name) || self.in_progress.contains(name)
    }

    fn register(&mut self, name: String, dir: PathBuf) {
        self.in_progress.remove(&name);
        self.packages.entry(name).or_insert(dir);
    }

    fn manifest_path(&self, dir: &Path) -> PathBuf {
        self.root.join(dir).join(MANIFEST)
    }

    fn load_manifest(&self, dir: &Path) -> Result<toml::Table, Error> {
        let path = self.manifest_path(dir);
        let document = std::fs::read_to_string(&path).map_err(|err| Error::ManifestRead {
            path: path.clone(),
            err,
        })?;
        document
            .parse::<toml::Table>()
            .map_err(|err| Error::ManifestParse { path, err })
    }
}

fn package_name<P: AsRef<Path>>(manifest: &toml::Table, path: P) -> Result<String, Error> {
    manifest
        .get("package")
        .and_then(|p| p.get("name"))
        .and_then(|n| n.as_str())
        .map(str::to_string)
        .ok_or_else(|| Error::MissingKey {
            path: path.as_ref().to_path_buf(),
            key: "package.name".to_string(),
        })
}

fn string_array<'t>(table: &'t toml::Table, key: &str) -> impl Iterator<Item = &'t str> {
    table
        .get(key)
        .and_then(|v| v.as_array())
        .into_iter()
        .flatten()
        .filter_map(|v| v.as_str())
}

/// Lexically normalise a relative path: drop `.` components and fold `..` into its parent.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
