//! Version propagation across the root and sub-package manifests.

use tracing::debug;

use crate::error::Result;
use crate::manifest::{DependencyKind, Manifest, Workspace};
use crate::ui;

/// A dependency entry pointing at a package of this workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyEdge {
    /// Name of the manifest holding the entry.
    pub package: String,
    pub kind: DependencyKind,
    pub dependency: String,
}

/// Decides which dependency names belong to this workspace.
///
/// A name matches if it equals the root package name, or is
/// `<scope>/<dir>` where `<dir>` is an enumerated sub-package directory.
#[derive(Debug, Clone)]
pub struct WorkspaceMatcher {
    root_name: Option<String>,
    scope_prefix: Option<String>,
    package_dirs: Vec<String>,
}

impl WorkspaceMatcher {
    pub fn new(workspace: &Workspace, scope: Option<&str>) -> Self {
        WorkspaceMatcher {
            root_name: workspace.root_name().map(str::to_string),
            scope_prefix: scope.map(|s| format!("{}/", s.trim_end_matches('/'))),
            package_dirs: workspace
                .package_dir_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn matches(&self, dependency: &str) -> bool {
        if self.root_name.as_deref() == Some(dependency) {
            return true;
        }
        match &self.scope_prefix {
            Some(prefix) => dependency
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| self.package_dirs.iter().any(|dir| dir == rest)),
            None => false,
        }
    }
}

/// Sets `version` on every manifest and on every workspace-internal
/// dependency entry.
///
/// Manifests are always updated in memory. They are written back to disk
/// only when `write` is true; otherwise the write is logged as a dry run.
/// Applying the same version twice yields identical files.
pub fn propagate(
    workspace: &mut Workspace,
    matcher: &WorkspaceMatcher,
    version: &str,
    write: bool,
) -> Result<Vec<DependencyEdge>> {
    let mut edges = Vec::new();

    for manifest in workspace.manifests_mut() {
        edges.extend(update_manifest(manifest, matcher, version));
        if write {
            manifest.save()?;
            debug!(path = %manifest.path().display(), version, "wrote manifest");
        } else {
            ui::display_dry_run(&format!("write {}", manifest.path().display()));
        }
    }

    Ok(edges)
}

/// Copy of every manifest taken before propagation.
///
/// Re-propagating the old version would collapse ranges such as `^1.0.0`
/// into exact versions; restoring the snapshot puts back the exact text.
#[derive(Debug, Clone)]
pub struct ManifestSnapshot {
    manifests: Vec<Manifest>,
}

impl ManifestSnapshot {
    pub fn capture(workspace: &Workspace) -> Self {
        let manifests = std::iter::once(&workspace.root_manifest)
            .chain(workspace.packages.iter().map(|p| &p.manifest))
            .cloned()
            .collect();
        ManifestSnapshot { manifests }
    }

    /// Puts every manifest back, writing files when `write` is true.
    ///
    /// All manifests are attempted; the first write error is returned.
    pub fn restore(&self, workspace: &mut Workspace, write: bool) -> Result<()> {
        let mut first_error = None;
        for (manifest, saved) in workspace.manifests_mut().zip(&self.manifests) {
            *manifest = saved.clone();
            if !write {
                ui::display_dry_run(&format!("restore {}", manifest.path().display()));
                continue;
            }
            if let Err(e) = manifest.save() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

fn update_manifest(
    manifest: &mut Manifest,
    matcher: &WorkspaceMatcher,
    version: &str,
) -> Vec<DependencyEdge> {
    manifest.set_version(version);
    let package = manifest.name().unwrap_or_default().to_string();

    let mut edges = Vec::new();
    for kind in DependencyKind::ALL {
        for dependency in manifest.dependency_names(kind) {
            if !matcher.matches(&dependency) {
                continue;
            }
            manifest.set_dependency(kind, &dependency, version);
            ui::display_dependency_update(&package, kind.key(), &dependency, version);
            edges.push(DependencyEdge {
                package: package.clone(),
                kind,
                dependency,
            });
        }
    }
    edges
}
