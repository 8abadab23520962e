//! Semantic version increments following npm's `semver.inc` rules.

use std::fmt;
use std::str::FromStr;

use semver::{Prerelease, Version};

use crate::error::{ReleaseError, Result};

/// Represents the kind of semantic version bump offered to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Increment {
    Patch,
    Minor,
    Major,
    Prepatch,
    Preminor,
    Premajor,
    Prerelease,
}

impl Increment {
    /// The three increments that are always offered.
    pub const BASE: [Increment; 3] = [Increment::Patch, Increment::Minor, Increment::Major];

    /// Increments only offered while a pre-release identifier is in effect.
    pub const PRE: [Increment; 4] = [
        Increment::Prepatch,
        Increment::Preminor,
        Increment::Premajor,
        Increment::Prerelease,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Increment::Patch => "patch",
            Increment::Minor => "minor",
            Increment::Major => "major",
            Increment::Prepatch => "prepatch",
            Increment::Preminor => "preminor",
            Increment::Premajor => "premajor",
            Increment::Prerelease => "prerelease",
        }
    }
}

impl fmt::Display for Increment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Increment {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "patch" => Ok(Increment::Patch),
            "minor" => Ok(Increment::Minor),
            "major" => Ok(Increment::Major),
            "prepatch" => Ok(Increment::Prepatch),
            "preminor" => Ok(Increment::Preminor),
            "premajor" => Ok(Increment::Premajor),
            "prerelease" => Ok(Increment::Prerelease),
            other => Err(ReleaseError::invalid_version(format!(
                "Unknown increment '{}'",
                other
            ))),
        }
    }
}

/// Parses and validates a target version string.
///
/// Leading `v` prefixes are rejected; the tag step adds its own prefix.
pub fn parse_target(input: &str) -> Result<Version> {
    Version::parse(input.trim())
        .map_err(|e| ReleaseError::invalid_version(format!("{}: {}", input, e)))
}

/// Resolves the pre-release identifier in effect.
///
/// An explicit `--preid` wins; otherwise the first identifier of the current
/// version's pre-release is used, if it has one.
pub fn effective_preid(current: &Version, explicit: Option<&str>) -> Option<String> {
    if let Some(id) = explicit.filter(|id| !id.is_empty()) {
        return Some(id.to_string());
    }
    if current.pre.is_empty() {
        return None;
    }
    current.pre.as_str().split('.').next().map(str::to_string)
}

/// Lists the increments to present, in menu order.
pub fn available_increments(preid: Option<&str>) -> Vec<Increment> {
    let mut increments = Increment::BASE.to_vec();
    if preid.is_some() {
        increments.extend(Increment::PRE);
    }
    increments
}

/// Computes the next version for the given increment.
///
/// # Example
/// ```ignore
/// let v = Version::parse("1.2.3").unwrap();
/// assert_eq!(increment(&v, Increment::Minor, None)?, Version::parse("1.3.0").unwrap());
/// ```
pub fn increment(current: &Version, kind: Increment, preid: Option<&str>) -> Result<Version> {
    let mut next = Version::new(current.major, current.minor, current.patch);
    let had_pre = !current.pre.is_empty();

    match kind {
        Increment::Major => {
            if !(had_pre && current.minor == 0 && current.patch == 0) {
                next = Version::new(current.major + 1, 0, 0);
            }
        }
        Increment::Minor => {
            if !(had_pre && current.patch == 0) {
                next = Version::new(current.major, current.minor + 1, 0);
            }
        }
        Increment::Patch => {
            if !had_pre {
                next.patch += 1;
            }
        }
        Increment::Premajor => {
            next = Version::new(current.major + 1, 0, 0);
            next.pre = bump_prerelease(&Prerelease::EMPTY, preid)?;
        }
        Increment::Preminor => {
            next = Version::new(current.major, current.minor + 1, 0);
            next.pre = bump_prerelease(&Prerelease::EMPTY, preid)?;
        }
        Increment::Prepatch => {
            next = Version::new(current.major, current.minor, current.patch + 1);
            next.pre = bump_prerelease(&Prerelease::EMPTY, preid)?;
        }
        Increment::Prerelease => {
            if had_pre {
                next.pre = bump_prerelease(&current.pre, preid)?;
            } else {
                next.patch += 1;
                next.pre = bump_prerelease(&Prerelease::EMPTY, preid)?;
            }
        }
    }

    Ok(next)
}

/// Advances a pre-release the way npm's `inc('pre', id)` does.
fn bump_prerelease(pre: &Prerelease, preid: Option<&str>) -> Result<Prerelease> {
    let mut parts: Vec<String> = if pre.is_empty() {
        vec!["0".to_string()]
    } else {
        let mut parts: Vec<String> = pre.as_str().split('.').map(str::to_string).collect();
        match parts.iter().rposition(|p| p.parse::<u64>().is_ok()) {
            Some(idx) => {
                let n: u64 = parts[idx].parse().unwrap_or(0);
                parts[idx] = (n + 1).to_string();
            }
            None => parts.push("0".to_string()),
        }
        parts
    };

    if let Some(id) = preid {
        let continues = parts.first().map(String::as_str) == Some(id)
            && parts.get(1).is_some_and(|p| p.parse::<u64>().is_ok());
        if !continues {
            parts = vec![id.to_string(), "0".to_string()];
        }
    }

    Prerelease::new(&parts.join("."))
        .map_err(|e| ReleaseError::invalid_version(format!("pre-release '{}': {}", parts.join("."), e)))
}

/// Formats a menu entry such as `minor (1.3.0)`.
pub fn choice_label(kind: Increment, next: &Version) -> String {
    format!("{} ({})", kind, next)
}
