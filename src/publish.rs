//! Per-package publishing: eligibility, dist-tag resolution and the
//! registry command.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::config::PublishClient;
use crate::error::{ReleaseError, Result};
use crate::manifest::PackageDescriptor;
use crate::runner::{CommandRunner, CommandSpec};
use crate::ui;

/// Whether a package takes part in publishing, decided before anything
/// else is looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishEligibility {
    Eligible,
    /// Listed in the skip list; reported at the end of the run.
    SkippedExplicit,
    /// Marked `"private": true`; omitted silently.
    SkippedPrivate,
}

impl PublishEligibility {
    /// The skip list may name either the directory or the package name.
    pub fn evaluate(package: &PackageDescriptor, skip: &[String]) -> Self {
        if skip
            .iter()
            .any(|s| s == &package.dir_name || s == package.name())
        {
            PublishEligibility::SkippedExplicit
        } else if package.manifest.is_private() {
            PublishEligibility::SkippedPrivate
        } else {
            PublishEligibility::Eligible
        }
    }
}

/// What happened to one package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    /// The registry already has this version; the run continued.
    AlreadyPublished,
    Skipped(PublishEligibility),
    /// Dry run: the command was only logged.
    DryRun,
}

impl fmt::Display for PublishOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishOutcome::Published => write!(f, "published"),
            PublishOutcome::AlreadyPublished => write!(f, "already published"),
            PublishOutcome::Skipped(PublishEligibility::SkippedPrivate) => write!(f, "private"),
            PublishOutcome::Skipped(_) => write!(f, "skipped"),
            PublishOutcome::DryRun => write!(f, "dry run"),
        }
    }
}

/// Resolves the distribution tag for `version`.
///
/// An explicit tag wins; otherwise `alpha`, `beta` or `rc` is inferred from
/// the version text, in that order. `None` leaves the registry default.
pub fn resolve_dist_tag(version: &str, explicit: Option<&str>) -> Option<String> {
    if let Some(tag) = explicit.filter(|t| !t.is_empty()) {
        return Some(tag.to_string());
    }
    ["alpha", "beta", "rc"]
        .into_iter()
        .find(|channel| version.contains(channel))
        .map(str::to_string)
}

/// Builds the registry publish command for one package.
pub fn publish_command(
    client: PublishClient,
    package: &PackageDescriptor,
    version: &str,
    dist_tag: Option<&str>,
) -> CommandSpec {
    let mut args = vec!["publish".to_string()];
    if client == PublishClient::Yarn {
        args.push("--new-version".to_string());
        args.push(version.to_string());
    }
    if let Some(tag) = dist_tag {
        args.push("--tag".to_string());
        args.push(tag.to_string());
    }
    args.push("--access".to_string());
    args.push("public".to_string());
    if client == PublishClient::Pnpm {
        args.push("--no-git-checks".to_string());
    }

    CommandSpec::new(client.program(), args)
        .in_dir(&package.root)
        .captured()
}

fn already_published_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)previously published|cannot publish over").expect("static pattern")
    })
}

/// Whether a failed publish means the version is already on the registry.
pub fn is_already_published(err: &ReleaseError) -> bool {
    err.command_stderr()
        .is_some_and(|stderr| already_published_pattern().is_match(stderr))
}

/// Publishes packages in enumeration order.
pub struct Publisher<'a> {
    runner: &'a dyn CommandRunner,
    client: PublishClient,
    dry_run: bool,
}

impl<'a> Publisher<'a> {
    pub fn new(runner: &'a dyn CommandRunner, client: PublishClient, dry_run: bool) -> Self {
        Publisher {
            runner,
            client,
            dry_run,
        }
    }

    /// Publishes one package.
    ///
    /// An "already published" failure is logged and reported as
    /// [PublishOutcome::AlreadyPublished]; every other failure is returned.
    pub fn publish(
        &self,
        package: &PackageDescriptor,
        version: &str,
        skip: &[String],
        explicit_tag: Option<&str>,
    ) -> Result<PublishOutcome> {
        let eligibility = PublishEligibility::evaluate(package, skip);
        if eligibility != PublishEligibility::Eligible {
            debug!(package = package.name(), ?eligibility, "not publishing");
            return Ok(PublishOutcome::Skipped(eligibility));
        }

        let dist_tag = resolve_dist_tag(version, explicit_tag);
        let command = publish_command(self.client, package, version, dist_tag.as_deref());

        ui::display_status(&format!("Publishing {}...", package.name()));
        if self.dry_run {
            ui::display_dry_run(&command.to_string());
            return Ok(PublishOutcome::DryRun);
        }

        match self.runner.run(&command) {
            Ok(_) => {
                ui::display_success(&format!(
                    "Successfully published {}@{}",
                    package.name(),
                    version
                ));
                Ok(PublishOutcome::Published)
            }
            Err(e) if is_already_published(&e) => {
                ui::display_error(&format!("Skipping already published: {}", package.name()));
                Ok(PublishOutcome::AlreadyPublished)
            }
            Err(e) => Err(e),
        }
    }
}
