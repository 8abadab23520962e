//! `package.json` manifests and workspace enumeration.
//!
//! Manifests are held as order-preserving JSON objects so that rewriting a
//! version leaves every other key exactly where it was.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ReleaseError, Result};

pub const MANIFEST_FILE: &str = "package.json";

/// Dependency maps that may reference sibling packages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    Dependencies,
    PeerDependencies,
}

impl DependencyKind {
    pub const ALL: [DependencyKind; 2] = [
        DependencyKind::Dependencies,
        DependencyKind::PeerDependencies,
    ];

    /// The manifest key for this dependency map
    pub fn key(&self) -> &'static str {
        match self {
            DependencyKind::Dependencies => "dependencies",
            DependencyKind::PeerDependencies => "peerDependencies",
        }
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A parsed `package.json` bound to the file it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    path: PathBuf,
    fields: Map<String, Value>,
}

impl Manifest {
    /// Reads the manifest in `dir`.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let content = fs::read_to_string(&path)
            .map_err(|e| ReleaseError::manifest(&path, format!("cannot read: {}", e)))?;
        Self::parse(path, &content)
    }

    /// Parses manifest text; `path` is where it will be written back.
    pub fn parse(path: PathBuf, content: &str) -> Result<Self> {
        match serde_json::from_str::<Value>(content) {
            Ok(Value::Object(fields)) => Ok(Manifest { path, fields }),
            Ok(_) => Err(ReleaseError::manifest(path, "top level is not an object")),
            Err(e) => Err(ReleaseError::manifest(path, e.to_string())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    pub fn version(&self) -> Option<&str> {
        self.fields.get("version").and_then(Value::as_str)
    }

    /// Whether the package opts out of publishing.
    pub fn is_private(&self) -> bool {
        self.fields
            .get("private")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn set_version(&mut self, version: &str) {
        self.fields
            .insert("version".to_string(), Value::String(version.to_string()));
    }

    /// Names declared in the given dependency map, in file order.
    pub fn dependency_names(&self, kind: DependencyKind) -> Vec<String> {
        match self.fields.get(kind.key()) {
            Some(Value::Object(deps)) => deps.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    pub fn dependency(&self, kind: DependencyKind, name: &str) -> Option<&str> {
        self.fields
            .get(kind.key())
            .and_then(Value::as_object)
            .and_then(|deps| deps.get(name))
            .and_then(Value::as_str)
    }

    /// Replaces an existing dependency range; returns false if absent.
    pub fn set_dependency(&mut self, kind: DependencyKind, name: &str, range: &str) -> bool {
        match self.fields.get_mut(kind.key()) {
            Some(Value::Object(deps)) if deps.contains_key(name) => {
                deps.insert(name.to_string(), Value::String(range.to_string()));
                true
            }
            _ => false,
        }
    }

    /// Serializes with 2-space indentation and a trailing newline.
    pub fn to_json_string(&self) -> Result<String> {
        let mut out = serde_json::to_string_pretty(&self.fields)?;
        out.push('\n');
        Ok(out)
    }

    pub fn save(&self) -> Result<()> {
        let content = self.to_json_string()?;
        fs::write(&self.path, content)
            .map_err(|e| ReleaseError::manifest(&self.path, format!("cannot write: {}", e)))
    }
}

/// A publishable sub-package found under the packages directory.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageDescriptor {
    /// Directory name under the packages directory (e.g. `components`).
    pub dir_name: String,
    pub root: PathBuf,
    pub manifest: Manifest,
}

impl PackageDescriptor {
    /// The published name, falling back to the directory name.
    pub fn name(&self) -> &str {
        self.manifest.name().unwrap_or(&self.dir_name)
    }
}

/// The root manifest plus every enumerated sub-package.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub root_manifest: Manifest,
    pub packages: Vec<PackageDescriptor>,
}

impl Workspace {
    /// Loads the root manifest and scans `root/packages_dir`.
    ///
    /// Hidden entries, `.ts` files and directories without a manifest are
    /// ignored. Packages are ordered by directory name.
    pub fn load(root: &Path, packages_dir: &str) -> Result<Self> {
        let root_manifest = Manifest::load(root)?;
        let scan_dir = root.join(packages_dir);

        let mut packages = Vec::new();
        let entries = fs::read_dir(&scan_dir).map_err(|e| {
            ReleaseError::config(format!(
                "Cannot read packages directory {}: {}",
                scan_dir.display(),
                e
            ))
        })?;

        for entry in entries {
            let entry = entry?;
            let dir_name = entry.file_name().to_string_lossy().into_owned();
            if dir_name.starts_with('.') || dir_name.ends_with(".ts") {
                continue;
            }
            let path = entry.path();
            if !path.is_dir() || !path.join(MANIFEST_FILE).is_file() {
                debug!(entry = %path.display(), "skipping non-package entry");
                continue;
            }
            let manifest = Manifest::load(&path)?;
            packages.push(PackageDescriptor {
                dir_name,
                root: path,
                manifest,
            });
        }

        packages.sort_by(|a, b| a.dir_name.cmp(&b.dir_name));
        debug!(count = packages.len(), "enumerated packages");

        Ok(Workspace {
            root: root.to_path_buf(),
            root_manifest,
            packages,
        })
    }

    pub fn root_name(&self) -> Option<&str> {
        self.root_manifest.name()
    }

    /// The current version from the root manifest.
    pub fn current_version(&self) -> Result<semver::Version> {
        let raw = self.root_manifest.version().ok_or_else(|| {
            ReleaseError::manifest(self.root_manifest.path(), "missing \"version\" field")
        })?;
        semver::Version::parse(raw).map_err(|e| {
            ReleaseError::manifest(
                self.root_manifest.path(),
                format!("invalid version '{}': {}", raw, e),
            )
        })
    }

    pub fn package_dir_names(&self) -> Vec<&str> {
        self.packages.iter().map(|p| p.dir_name.as_str()).collect()
    }

    /// All manifests, root first, mutably.
    pub fn manifests_mut(&mut self) -> impl Iterator<Item = &mut Manifest> {
        std::iter::once(&mut self.root_manifest)
            .chain(self.packages.iter_mut().map(|p| &mut p.manifest))
    }
}
