//! Release orchestration
//!
//! Drives the whole pipeline:
//! 1. Resolve the target version (argument or interactive menu)
//! 2. Confirm with the operator
//! 3. Propagate the version through every manifest
//! 4. Build and test (when configured)
//! 5. Generate the changelog and update the lockfile
//! 6. Commit, publish each package, tag and push
//!
//! Every step after confirmation runs under [RollbackOnFailure], which puts
//! the manifests back if the pipeline does not complete.

use std::ops::{Deref, DerefMut};
use std::path::Path;

use semver::Version;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::Result;
use crate::manifest::Workspace;
use crate::propagate::{propagate, DependencyEdge, ManifestSnapshot, WorkspaceMatcher};
use crate::publish::{PublishEligibility, PublishOutcome, Publisher};
use crate::runner::{CommandRunner, CommandSpec};
use crate::ui::{self, Prompter};
use crate::version::{self, available_increments, choice_label, increment};

/// Real execution or log-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Live,
    Dry,
}

impl RunMode {
    pub fn from_dry_flag(dry: bool) -> Self {
        if dry {
            RunMode::Dry
        } else {
            RunMode::Live
        }
    }

    pub fn is_dry(&self) -> bool {
        *self == RunMode::Dry
    }
}

/// Pipeline states, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseState {
    ResolvingVersion,
    Confirming,
    /// Operator declined; nothing changed.
    Aborted,
    Propagating,
    Building,
    ChangelogAndLock,
    Committing,
    Publishing,
    Tagging,
    Pushing,
    Done,
    /// A step failed and the manifests were restored.
    RolledBack,
}

/// Inputs taken from the command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReleaseOptions {
    /// Explicit target version; prompts when absent.
    pub version: Option<String>,
    pub preid: Option<String>,
    pub mode: RunMode,
    pub skip_build: bool,
    pub skip_tests: bool,
    /// Explicit dist-tag overriding inference.
    pub tag: Option<String>,
    /// Packages to leave unpublished, merged with the configured list.
    pub skip: Vec<String>,
}

/// The confirmed release.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleasePlan {
    pub current: Version,
    pub target: Version,
    pub preid: Option<String>,
    pub skip: Vec<String>,
    pub dist_tag: Option<String>,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseReport {
    pub state: ReleaseState,
    pub plan: Option<ReleasePlan>,
    pub edges: Vec<DependencyEdge>,
    pub committed: bool,
    /// Publish outcome per package, in enumeration order.
    pub outcomes: Vec<(String, PublishOutcome)>,
}

impl ReleaseReport {
    fn new() -> Self {
        ReleaseReport {
            state: ReleaseState::ResolvingVersion,
            plan: None,
            edges: Vec::new(),
            committed: false,
            outcomes: Vec::new(),
        }
    }

    /// Packages left out through the skip list. Private packages are not
    /// listed.
    pub fn skipped(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| {
                *outcome == PublishOutcome::Skipped(PublishEligibility::SkippedExplicit)
            })
            .map(|(name, _)| name.clone())
            .collect()
    }
}

/// Scope guard restoring manifests unless the release completes.
///
/// The snapshot is taken when the guard is created, before anything is
/// propagated. Dropping the guard while armed (an early `?` return or a
/// panic) restores every manifest; [RollbackOnFailure::disarm] keeps the
/// new versions. Restore failures are reported, never raised.
pub struct RollbackOnFailure<'w> {
    workspace: &'w mut Workspace,
    snapshot: ManifestSnapshot,
    write: bool,
    armed: bool,
}

impl<'w> RollbackOnFailure<'w> {
    pub fn new(workspace: &'w mut Workspace, write: bool) -> Self {
        let snapshot = ManifestSnapshot::capture(workspace);
        RollbackOnFailure {
            workspace,
            snapshot,
            write,
            armed: true,
        }
    }

    /// Keep the current manifests.
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Deref for RollbackOnFailure<'_> {
    type Target = Workspace;

    fn deref(&self) -> &Workspace {
        &*self.workspace
    }
}

impl DerefMut for RollbackOnFailure<'_> {
    fn deref_mut(&mut self) -> &mut Workspace {
        &mut *self.workspace
    }
}

impl Drop for RollbackOnFailure<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        ui::display_warning("Release failed, restoring package versions...");
        match self.snapshot.restore(self.workspace, self.write) {
            Ok(()) => debug!("manifests restored"),
            Err(e) => {
                warn!(error = %e, "rollback incomplete");
                ui::display_error(&format!("Could not restore manifests: {}", e));
            }
        }
    }
}

/// Runs one release against a loaded workspace.
pub struct Orchestrator<'a> {
    config: &'a Config,
    runner: &'a dyn CommandRunner,
    prompter: &'a dyn Prompter,
    options: ReleaseOptions,
    history: Vec<ReleaseState>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a Config,
        runner: &'a dyn CommandRunner,
        prompter: &'a dyn Prompter,
        options: ReleaseOptions,
    ) -> Self {
        Orchestrator {
            config,
            runner,
            prompter,
            options,
            history: Vec::new(),
        }
    }

    /// States entered so far, including the terminal one.
    pub fn history(&self) -> &[ReleaseState] {
        &self.history
    }

    pub fn state(&self) -> Option<ReleaseState> {
        self.history.last().copied()
    }

    fn enter(&mut self, state: ReleaseState) {
        debug!(?state, "entering state");
        self.history.push(state);
    }

    /// Runs the release.
    ///
    /// Declining confirmation is a successful run ending in
    /// [ReleaseState::Aborted]. An error after confirmation leaves the
    /// orchestrator in [ReleaseState::RolledBack].
    pub fn run(&mut self, workspace: &mut Workspace) -> Result<ReleaseReport> {
        let mut report = ReleaseReport::new();

        self.enter(ReleaseState::ResolvingVersion);
        let current = workspace.current_version()?;
        let preid = version::effective_preid(&current, self.options.preid.as_deref());
        let target = self.resolve_version(&current, preid.as_deref())?;

        self.enter(ReleaseState::Confirming);
        if !self
            .prompter
            .confirm(&format!("Releasing v{}. Confirm?", target))?
        {
            self.enter(ReleaseState::Aborted);
            report.state = ReleaseState::Aborted;
            return Ok(report);
        }

        let mut skip = self.config.skip.clone();
        skip.extend(self.options.skip.iter().cloned());
        let plan = ReleasePlan {
            dist_tag: self.options.tag.clone(),
            current,
            target,
            preid,
            skip,
        };

        let result = self.execute(workspace, &plan, &mut report);
        report.plan = Some(plan);
        match result {
            Ok(()) => {
                self.enter(ReleaseState::Done);
                report.state = ReleaseState::Done;
                self.finish(&report);
                Ok(report)
            }
            Err(e) => {
                self.enter(ReleaseState::RolledBack);
                Err(e)
            }
        }
    }

    fn resolve_version(&self, current: &Version, preid: Option<&str>) -> Result<Version> {
        if let Some(raw) = &self.options.version {
            return version::parse_target(raw);
        }

        let mut items = Vec::new();
        let mut candidates = Vec::new();
        for kind in available_increments(preid) {
            let next = increment(current, kind, preid)?;
            items.push(choice_label(kind, &next));
            candidates.push(next);
        }
        items.push("custom".to_string());

        let choice = self.prompter.select("Select release type", &items)?;
        match candidates.get(choice) {
            Some(next) => Ok(next.clone()),
            None => {
                let raw = self
                    .prompter
                    .input("Input custom version", &current.to_string())?;
                version::parse_target(&raw)
            }
        }
    }

    fn execute(
        &mut self,
        workspace: &mut Workspace,
        plan: &ReleasePlan,
        report: &mut ReleaseReport,
    ) -> Result<()> {
        let target = plan.target.to_string();
        let live = !self.options.mode.is_dry();
        let mut guard = RollbackOnFailure::new(workspace, live);
        let root = guard.root.clone();

        self.enter(ReleaseState::Propagating);
        ui::display_step("Updating cross dependencies...");
        let scope = self.config.scope_for(guard.root_name());
        let matcher = WorkspaceMatcher::new(&guard, scope.as_deref());
        report.edges = propagate(&mut guard, &matcher, &target, live)?;

        self.enter(ReleaseState::Building);
        self.build(&root)?;

        self.enter(ReleaseState::ChangelogAndLock);
        ui::display_step("Generating changelog...");
        self.run_if_live(
            &CommandSpec::new(&self.config.package_manager, ["run", "changelog"]).in_dir(&root),
        )?;
        ui::display_step("Updating lockfile...");
        self.run_if_live(
            &CommandSpec::new(&self.config.package_manager, ["install", "--prefer-offline"])
                .in_dir(&root),
        )?;

        self.enter(ReleaseState::Committing);
        report.committed = self.commit(&root, &target)?;

        self.enter(ReleaseState::Publishing);
        ui::display_step("Publishing packages...");
        let publisher = Publisher::new(
            self.runner,
            self.config.publish_client,
            self.options.mode.is_dry(),
        );
        for package in &guard.packages {
            let outcome =
                publisher.publish(package, &target, &plan.skip, plan.dist_tag.as_deref())?;
            report
                .outcomes
                .push((package.name().to_string(), outcome));
        }

        let tag = self.config.format_tag(&target);
        self.enter(ReleaseState::Tagging);
        ui::display_step("Pushing to remote...");
        self.run_if_live(
            &CommandSpec::new("git", ["tag", "-a", tag.as_str(), "-m", tag.as_str()]).in_dir(&root),
        )?;

        self.enter(ReleaseState::Pushing);
        let remote = self.config.remote.as_str();
        let tag_ref = format!("refs/tags/{}", tag);
        self.run_if_live(
            &CommandSpec::new("git", ["push", remote, tag_ref.as_str()]).in_dir(&root),
        )?;
        self.run_if_live(&CommandSpec::new("git", ["push", remote]).in_dir(&root))?;

        guard.disarm();
        Ok(())
    }

    fn build(&self, root: &Path) -> Result<()> {
        ui::display_step("Building all packages...");
        let steps = [
            (&self.config.build_command, self.options.skip_build),
            (&self.config.test_command, self.options.skip_tests),
        ];

        let mut ran = false;
        for (argv, skipped) in steps {
            if let (Some(argv), false) = (argv, skipped) {
                self.run_if_live(&CommandSpec::from_argv(argv)?.in_dir(root))?;
                ran = true;
            }
        }
        if !ran {
            ui::display_status("(skipped)");
        }
        Ok(())
    }

    /// Commits pending changes; returns whether a commit was made.
    ///
    /// The diff query is read-only and runs in dry mode too.
    fn commit(&self, root: &Path, target: &str) -> Result<bool> {
        let diff = self
            .runner
            .run(&CommandSpec::new("git", ["diff"]).in_dir(root).captured())?;
        if diff.stdout.trim().is_empty() {
            ui::display_warning("No changes to commit.");
            return Ok(false);
        }

        ui::display_step("Committing changes...");
        let message = self.config.format_commit_message(target);
        self.run_if_live(&CommandSpec::new("git", ["add", "-A"]).in_dir(root))?;
        self.run_if_live(&CommandSpec::new("git", ["commit", "-m", message.as_str()]).in_dir(root))?;
        Ok(true)
    }

    fn run_if_live(&self, command: &CommandSpec) -> Result<()> {
        if self.options.mode.is_dry() {
            ui::display_dry_run(&command.to_string());
            return Ok(());
        }
        self.runner.run(command).map(|_| ())
    }

    fn finish(&self, report: &ReleaseReport) {
        if self.options.mode.is_dry() {
            ui::display_success("Dry run finished - run git diff to see package changes.");
        }
        ui::display_skipped_packages(&report.skipped());
        if let Some(plan) = &report.plan {
            debug!(version = %plan.target, "release complete");
        }
    }
}
