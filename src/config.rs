use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{ReleaseError, Result};

pub const CONFIG_FILE: &str = "monorelease.toml";

/// Registry client used to publish each package.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PublishClient {
    #[default]
    Yarn,
    Npm,
    Pnpm,
}

impl PublishClient {
    pub fn program(&self) -> &'static str {
        match self {
            PublishClient::Yarn => "yarn",
            PublishClient::Npm => "npm",
            PublishClient::Pnpm => "pnpm",
        }
    }
}

/// Represents the complete configuration for monorelease.
///
/// Every field has a default, so an empty file (or no file) is valid.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory, relative to the workspace root, holding sub-packages.
    pub packages_dir: String,

    /// npm scope of sibling packages, e.g. `@litingvue`. Derived from the
    /// root package name when unset.
    pub scope: Option<String>,

    /// Package manager running the changelog script and lockfile update.
    pub package_manager: String,

    pub publish_client: PublishClient,

    pub remote: String,

    /// Commit message template; `{version}` is replaced.
    pub commit_message: String,

    pub tag_prefix: String,

    /// Packages never published.
    pub skip: Vec<String>,

    /// Optional argv run before the changelog unless `--skipBuild`.
    pub build_command: Option<Vec<String>>,

    /// Optional argv run after the build unless `--skipTests`.
    pub test_command: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            packages_dir: "packages".to_string(),
            scope: None,
            package_manager: "pnpm".to_string(),
            publish_client: PublishClient::default(),
            remote: "origin".to_string(),
            commit_message: "chore: release v{version}".to_string(),
            tag_prefix: "v".to_string(),
            skip: Vec::new(),
            build_command: None,
            test_command: None,
        }
    }
}

impl Config {
    /// The scope used to recognise sibling packages.
    pub fn scope_for(&self, root_name: Option<&str>) -> Option<String> {
        match (&self.scope, root_name) {
            (Some(scope), _) => Some(normalize_scope(scope)),
            (None, Some(name)) => Some(normalize_scope(name.split('/').next().unwrap_or(name))),
            (None, None) => None,
        }
    }

    pub fn format_commit_message(&self, version: &str) -> String {
        self.commit_message.replace("{version}", version)
    }

    pub fn format_tag(&self, version: &str) -> String {
        format!("{}{}", self.tag_prefix, version)
    }

    fn validate(&self) -> Result<()> {
        if self.packages_dir.trim().is_empty() {
            return Err(ReleaseError::config("packages_dir must not be empty"));
        }
        if self.remote.trim().is_empty() {
            return Err(ReleaseError::config("remote must not be empty"));
        }
        for (key, argv) in [
            ("build_command", &self.build_command),
            ("test_command", &self.test_command),
        ] {
            if matches!(argv, Some(argv) if argv.is_empty()) {
                return Err(ReleaseError::config(format!("{} must not be empty", key)));
            }
        }
        Ok(())
    }
}

fn normalize_scope(scope: &str) -> String {
    let trimmed = scope.trim_end_matches('/');
    if trimmed.starts_with('@') {
        trimmed.to_string()
    } else {
        format!("@{}", trimmed)
    }
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `monorelease.toml` in the workspace root
/// 3. `.monorelease.toml` in the user config directory
/// 4. Default configuration if no file found
pub fn load_config(config_path: Option<&Path>, workspace_root: &Path) -> Result<Config> {
    let local = workspace_root.join(CONFIG_FILE);
    let config_str = if let Some(path) = config_path {
        read(path)?
    } else if local.exists() {
        read(&local)?
    } else if let Some(config_dir) = dirs::config_dir() {
        let config_path = config_dir.join(format!(".{}", CONFIG_FILE));
        if config_path.exists() {
            read(&config_path)?
        } else {
            return Ok(Config::default());
        }
    } else {
        return Ok(Config::default());
    };

    let config: Config =
        toml::from_str(&config_str).map_err(|e| ReleaseError::config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| ReleaseError::config(format!("Cannot read {}: {}", path.display(), e)))
}
