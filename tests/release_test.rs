// tests/release_test.rs
use std::fs;
use std::path::Path;

use monorelease::config::Config;
use monorelease::manifest::{DependencyKind, Workspace};
use monorelease::publish::{PublishEligibility, PublishOutcome};
use monorelease::release::{Orchestrator, ReleaseOptions, ReleaseState, RunMode};
use monorelease::runner::RecordingRunner;
use monorelease::ui::ScriptedPrompter;
use tempfile::TempDir;

const MANIFESTS: [&str; 4] = [
    "package.json",
    "packages/a/package.json",
    "packages/b/package.json",
    "packages/c/package.json",
];

fn write_manifest(dir: &Path, content: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("package.json"), content).unwrap();
}

/// Root `litingvue` at `version` with sub-packages a, b (depends on a) and c.
fn monorepo(version: &str) -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    write_manifest(
        root,
        &format!(
            "{{\n  \"name\": \"litingvue\",\n  \"version\": \"{}\",\n  \"private\": true,\n  \"scripts\": {{\n    \"changelog\": \"conventional-changelog -p angular -i CHANGELOG.md -s\"\n  }}\n}}\n",
            version
        ),
    );
    write_manifest(
        &root.join("packages/a"),
        &format!(
            "{{\n  \"name\": \"@litingvue/a\",\n  \"version\": \"{}\",\n  \"peerDependencies\": {{\n    \"vue\": \"^3.2.0\"\n  }}\n}}\n",
            version
        ),
    );
    write_manifest(
        &root.join("packages/b"),
        &format!(
            "{{\n  \"name\": \"@litingvue/b\",\n  \"version\": \"{}\",\n  \"dependencies\": {{\n    \"@litingvue/a\": \"^{}\",\n    \"lodash\": \"^4.17.21\"\n  }}\n}}\n",
            version, version
        ),
    );
    write_manifest(
        &root.join("packages/c"),
        &format!(
            "{{\n  \"name\": \"@litingvue/c\",\n  \"version\": \"{}\",\n  \"dependencies\": {{\n    \"vue\": \"^3.2.0\"\n  }}\n}}\n",
            version
        ),
    );
    tmp
}

fn snapshot(root: &Path) -> Vec<String> {
    MANIFESTS
        .iter()
        .map(|p| fs::read_to_string(root.join(p)).unwrap())
        .collect()
}

fn options(version: &str) -> ReleaseOptions {
    ReleaseOptions {
        version: Some(version.to_string()),
        ..ReleaseOptions::default()
    }
}

#[test]
fn test_full_release_updates_manifests_and_runs_pipeline() {
    let tmp = monorepo("1.0.0");
    let mut ws = Workspace::load(tmp.path(), "packages").unwrap();
    let config = Config::default();
    let runner = RecordingRunner::new().respond("git diff", "diff --git a/package.json b/package.json");
    let prompter = ScriptedPrompter::new().confirm_answer(true);

    let mut orch = Orchestrator::new(&config, &runner, &prompter, options("1.1.0"));
    let report = orch.run(&mut ws).unwrap();

    assert_eq!(report.state, ReleaseState::Done);
    assert!(report.committed);
    assert_eq!(
        orch.history(),
        &[
            ReleaseState::ResolvingVersion,
            ReleaseState::Confirming,
            ReleaseState::Propagating,
            ReleaseState::Building,
            ReleaseState::ChangelogAndLock,
            ReleaseState::Committing,
            ReleaseState::Publishing,
            ReleaseState::Tagging,
            ReleaseState::Pushing,
            ReleaseState::Done,
        ]
    );

    let reloaded = Workspace::load(tmp.path(), "packages").unwrap();
    assert_eq!(reloaded.root_manifest.version(), Some("1.1.0"));
    for pkg in &reloaded.packages {
        assert_eq!(pkg.manifest.version(), Some("1.1.0"), "{}", pkg.dir_name);
    }
    let b = &reloaded.packages[1].manifest;
    assert_eq!(b.dependency(DependencyKind::Dependencies, "@litingvue/a"), Some("1.1.0"));
    assert_eq!(b.dependency(DependencyKind::Dependencies, "lodash"), Some("^4.17.21"));
    let a = &reloaded.packages[0].manifest;
    assert_eq!(a.dependency(DependencyKind::PeerDependencies, "vue"), Some("^3.2.0"));
    let c = &reloaded.packages[2].manifest;
    assert_eq!(c.dependency(DependencyKind::Dependencies, "vue"), Some("^3.2.0"));

    assert_eq!(
        runner.command_lines(),
        vec![
            "pnpm run changelog",
            "pnpm install --prefer-offline",
            "git diff",
            "git add -A",
            "git commit -m chore: release v1.1.0",
            "yarn publish --new-version 1.1.0 --access public",
            "yarn publish --new-version 1.1.0 --access public",
            "yarn publish --new-version 1.1.0 --access public",
            "git tag -a v1.1.0 -m v1.1.0",
            "git push origin refs/tags/v1.1.0",
            "git push origin",
        ]
    );

    let publish_dirs: Vec<_> = runner
        .calls()
        .into_iter()
        .filter(|c| c.program == "yarn")
        .map(|c| c.cwd.unwrap())
        .collect();
    assert_eq!(publish_dirs[0], tmp.path().join("packages/a"));
    assert_eq!(publish_dirs[2], tmp.path().join("packages/c"));
}

#[test]
fn test_declining_confirmation_changes_nothing() {
    let tmp = monorepo("1.0.0");
    let before = snapshot(tmp.path());
    let mut ws = Workspace::load(tmp.path(), "packages").unwrap();
    let config = Config::default();
    let runner = RecordingRunner::new();
    let prompter = ScriptedPrompter::new().confirm_answer(false);

    let mut orch = Orchestrator::new(&config, &runner, &prompter, options("1.1.0"));
    let report = orch.run(&mut ws).unwrap();

    assert_eq!(report.state, ReleaseState::Aborted);
    assert!(report.plan.is_none());
    assert!(runner.calls().is_empty());
    assert_eq!(snapshot(tmp.path()), before);
}

#[test]
fn test_invalid_version_aborts_before_mutation() {
    let tmp = monorepo("1.0.0");
    let before = snapshot(tmp.path());
    let mut ws = Workspace::load(tmp.path(), "packages").unwrap();
    let config = Config::default();
    let runner = RecordingRunner::new();
    let prompter = ScriptedPrompter::new();

    let mut orch = Orchestrator::new(&config, &runner, &prompter, options("1.1"));
    let err = orch.run(&mut ws).unwrap_err();

    assert!(err.to_string().contains("Invalid target version"));
    assert!(prompter.asked().is_empty());
    assert!(runner.calls().is_empty());
    assert_eq!(snapshot(tmp.path()), before);
}

#[test]
fn test_dry_run_mutates_nothing() {
    let tmp = monorepo("1.0.0");
    let before = snapshot(tmp.path());
    let mut ws = Workspace::load(tmp.path(), "packages").unwrap();
    let config = Config {
        build_command: Some(vec!["pnpm".to_string(), "run".to_string(), "build".to_string()]),
        ..Config::default()
    };
    let runner = RecordingRunner::new();
    let prompter = ScriptedPrompter::new().confirm_answer(true);
    let opts = ReleaseOptions {
        mode: RunMode::Dry,
        ..options("1.1.0")
    };

    let mut orch = Orchestrator::new(&config, &runner, &prompter, opts);
    let report = orch.run(&mut ws).unwrap();

    assert_eq!(report.state, ReleaseState::Done);
    assert_eq!(snapshot(tmp.path()), before);
    // only the read-only diff query reaches the runner
    assert_eq!(runner.command_lines(), vec!["git diff"]);
    assert!(report
        .outcomes
        .iter()
        .all(|(_, outcome)| *outcome == PublishOutcome::DryRun));
}

#[test]
fn test_failure_after_propagation_rolls_back() {
    let tmp = monorepo("1.0.0");
    let before = snapshot(tmp.path());
    let mut ws = Workspace::load(tmp.path(), "packages").unwrap();
    let config = Config::default();
    let runner = RecordingRunner::new().fail("pnpm install", "ERR_PNPM_FETCH_404");
    let prompter = ScriptedPrompter::new().confirm_answer(true);

    let mut orch = Orchestrator::new(&config, &runner, &prompter, options("1.1.0"));
    let err = orch.run(&mut ws).unwrap_err();

    assert!(err.to_string().contains("ERR_PNPM_FETCH_404"));
    assert_eq!(orch.state(), Some(ReleaseState::RolledBack));
    assert_eq!(snapshot(tmp.path()), before);
    assert_eq!(ws.root_manifest.version(), Some("1.0.0"));
    assert!(!runner.ran("git"));
}

#[test]
fn test_fatal_publish_failure_stops_remaining_packages() {
    let tmp = monorepo("1.0.0");
    let before = snapshot(tmp.path());
    let mut ws = Workspace::load(tmp.path(), "packages").unwrap();
    let config = Config::default();
    let runner = RecordingRunner::new().fail("yarn publish", "E401 Unauthorized");
    let prompter = ScriptedPrompter::new().confirm_answer(true);

    let mut orch = Orchestrator::new(&config, &runner, &prompter, options("1.1.0"));
    assert!(orch.run(&mut ws).is_err());

    let publishes = runner
        .command_lines()
        .iter()
        .filter(|l| l.starts_with("yarn publish"))
        .count();
    assert_eq!(publishes, 1);
    assert!(!runner.ran("git tag"));
    assert!(!runner.ran("git push"));
    assert_eq!(snapshot(tmp.path()), before);
    assert_eq!(orch.state(), Some(ReleaseState::RolledBack));
}

#[test]
fn test_already_published_continues() {
    let tmp = monorepo("1.0.0");
    let mut ws = Workspace::load(tmp.path(), "packages").unwrap();
    let config = Config::default();
    let runner = RecordingRunner::new().fail(
        "yarn publish",
        "error You cannot publish over the previously published versions: 1.1.0.",
    );
    let prompter = ScriptedPrompter::new().confirm_answer(true);

    let mut orch = Orchestrator::new(&config, &runner, &prompter, options("1.1.0"));
    let report = orch.run(&mut ws).unwrap();

    assert_eq!(report.state, ReleaseState::Done);
    assert_eq!(report.outcomes.len(), 3);
    assert!(report
        .outcomes
        .iter()
        .all(|(_, o)| *o == PublishOutcome::AlreadyPublished));
    assert!(runner.ran("git tag -a v1.1.0"));
    assert!(runner.ran("git push origin refs/tags/v1.1.0"));
}

#[test]
fn test_skipped_and_private_packages_are_not_published() {
    let tmp = monorepo("1.0.0");
    write_manifest(
        &tmp.path().join("packages/c"),
        "{\n  \"name\": \"@litingvue/c\",\n  \"version\": \"1.0.0\",\n  \"private\": true\n}\n",
    );
    let mut ws = Workspace::load(tmp.path(), "packages").unwrap();
    let config = Config::default();
    let runner = RecordingRunner::new();
    let prompter = ScriptedPrompter::new().confirm_answer(true);
    let opts = ReleaseOptions {
        skip: vec!["@litingvue/a".to_string()],
        ..options("1.1.0")
    };

    let mut orch = Orchestrator::new(&config, &runner, &prompter, opts);
    let report = orch.run(&mut ws).unwrap();

    let published: Vec<_> = runner
        .calls()
        .into_iter()
        .filter(|c| c.program == "yarn")
        .map(|c| c.cwd.unwrap())
        .collect();
    assert_eq!(published, vec![tmp.path().join("packages/b")]);
    assert_eq!(report.skipped(), vec!["@litingvue/a".to_string()]);
    assert_eq!(
        report.outcomes[2],
        (
            "@litingvue/c".to_string(),
            PublishOutcome::Skipped(PublishEligibility::SkippedPrivate)
        )
    );
}

#[test]
fn test_prerelease_infers_dist_tag() {
    let tmp = monorepo("1.0.0");
    let mut ws = Workspace::load(tmp.path(), "packages").unwrap();
    let config = Config::default();
    let runner = RecordingRunner::new();
    let prompter = ScriptedPrompter::new().confirm_answer(true);

    let mut orch = Orchestrator::new(&config, &runner, &prompter, options("2.0.0-beta.1"));
    orch.run(&mut ws).unwrap();

    assert!(runner.ran("yarn publish --new-version 2.0.0-beta.1 --tag beta --access public"));
    assert!(runner.ran("git tag -a v2.0.0-beta.1"));
}

#[test]
fn test_explicit_tag_overrides_inference() {
    let tmp = monorepo("1.0.0");
    let mut ws = Workspace::load(tmp.path(), "packages").unwrap();
    let config = Config::default();
    let runner = RecordingRunner::new();
    let prompter = ScriptedPrompter::new().confirm_answer(true);
    let opts = ReleaseOptions {
        tag: Some("next".to_string()),
        ..options("2.0.0-beta.1")
    };

    let mut orch = Orchestrator::new(&config, &runner, &prompter, opts);
    orch.run(&mut ws).unwrap();

    assert!(runner.ran("yarn publish --new-version 2.0.0-beta.1 --tag next --access public"));
}

#[test]
fn test_no_changes_skips_commit() {
    let tmp = monorepo("1.0.0");
    let mut ws = Workspace::load(tmp.path(), "packages").unwrap();
    let config = Config::default();
    let runner = RecordingRunner::new().respond("git diff", "   \n");
    let prompter = ScriptedPrompter::new().confirm_answer(true);

    let mut orch = Orchestrator::new(&config, &runner, &prompter, options("1.0.1"));
    let report = orch.run(&mut ws).unwrap();

    assert!(!report.committed);
    assert!(!runner.ran("git commit"));
    assert!(!runner.ran("git add"));
    assert!(runner.ran("git tag"));
}

#[test]
fn test_interactive_prerelease_flow() {
    let tmp = monorepo("1.2.3-alpha.0");
    let mut ws = Workspace::load(tmp.path(), "packages").unwrap();
    let config = Config::default();
    let runner = RecordingRunner::new();
    // prerelease is the last increment before "custom"
    let prompter = ScriptedPrompter::new().select_answer(6).confirm_answer(true);

    let mut orch = Orchestrator::new(&config, &runner, &prompter, ReleaseOptions::default());
    let report = orch.run(&mut ws).unwrap();

    let plan = report.plan.unwrap();
    assert_eq!(plan.target.to_string(), "1.2.3-alpha.1");
    assert_eq!(plan.preid.as_deref(), Some("alpha"));
    assert!(runner.ran("yarn publish --new-version 1.2.3-alpha.1 --tag alpha"));
}

#[test]
fn test_custom_configuration_is_used() {
    let tmp = monorepo("1.0.0");
    let mut ws = Workspace::load(tmp.path(), "packages").unwrap();
    let config: Config = toml::from_str(
        r#"
package_manager = "yarn"
publish_client = "npm"
remote = "upstream"
commit_message = "release: {version}"
"#,
    )
    .unwrap();
    let runner = RecordingRunner::new().respond("git diff", "changed");
    let prompter = ScriptedPrompter::new().confirm_answer(true);

    let mut orch = Orchestrator::new(&config, &runner, &prompter, options("1.0.1"));
    orch.run(&mut ws).unwrap();

    assert!(runner.ran("yarn run changelog"));
    assert!(runner.ran("git commit -m release: 1.0.1"));
    assert!(runner.ran("npm publish --access public"));
    assert!(runner.ran("git push upstream refs/tags/v1.0.1"));
}
