//! Release identifier parsing and ordering.
//!
//! Tags published by the release channel look like `v1.2.3`,
//! `v1.2.3-dev.abc123` or `v1.2.3-beta.1+build.7`. The helpers here never
//! fail: malformed input degrades to zeroed core components so that callers
//! can always compare two identifiers.
//!
//! Ordering follows semantic-version precedence with two deliberate
//! simplifications: missing core components default to `0`, and build
//! metadata (after `+`) is ignored for ordering.

use std::cmp::Ordering;
use std::fmt;

/// Keywords that mark a prerelease when they start a prerelease token.
pub const PRERELEASE_KEYWORDS: [&str; 5] = ["dev", "beta", "rc", "alpha", "pre"];

/// The `(major, minor, patch)` triple of a release identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SemanticCore {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
}

impl SemanticCore {
    /// Builds a core from explicit components.
    #[must_use]
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for SemanticCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A release tag exactly as published, for example `v3.2.30-dev.adcb1ae`.
///
/// The raw text is preserved because asset URLs are built from it; ordering
/// and classification always operate on the [normalised](normalize) form.
///
/// # Examples
///
/// ```
/// use lodestone_common::version::ReleaseTag;
///
/// let tag = ReleaseTag::new("v1.9.0");
/// assert_eq!(tag.normalized(), "1.9.0");
/// assert!(!tag.is_prerelease());
/// assert!(tag.is_newer_than("1.8.4"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReleaseTag(String);

impl ReleaseTag {
    /// Wraps a raw tag string.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the tag as published.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the normalised form (see [`normalize`]).
    #[must_use]
    pub fn normalized(&self) -> &str {
        normalize(&self.0)
    }

    /// Returns the parsed version core.
    #[must_use]
    pub fn core(&self) -> SemanticCore {
        parse_core(&self.0)
    }

    /// Returns the prerelease identifier, empty for stable releases.
    #[must_use]
    pub fn prerelease(&self) -> &str {
        prerelease_of(&self.0)
    }

    /// Returns `true` when the tag carries a recognised prerelease keyword.
    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        is_prerelease(&self.0)
    }

    /// Compares this tag's precedence with another identifier.
    #[must_use]
    pub fn precedence_cmp(&self, other: &str) -> Ordering {
        compare_semver(&self.0, other)
    }

    /// Returns `true` when this tag has strictly higher precedence.
    #[must_use]
    pub fn is_newer_than(&self, other: &str) -> bool {
        self.precedence_cmp(other) == Ordering::Greater
    }
}

impl fmt::Display for ReleaseTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReleaseTag {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ReleaseTag {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Trims whitespace and strips one leading `v`/`V` that introduces a digit.
///
/// Prerelease and build metadata are retained. Only a `v` directly followed
/// by a digit is removed, which keeps the function idempotent for every
/// input (`"vv1"` is returned unchanged rather than peeled twice).
///
/// # Examples
///
/// ```
/// use lodestone_common::version::normalize;
///
/// assert_eq!(normalize(" v1.2.3-dev.abc "), "1.2.3-dev.abc");
/// assert_eq!(normalize("V2.0.0+build.5"), "2.0.0+build.5");
/// assert_eq!(normalize(normalize("v1.0")), normalize("v1.0"));
/// ```
#[must_use]
pub fn normalize(tag: &str) -> &str {
    let trimmed = tag.trim();
    match trimmed.strip_prefix(['v', 'V']) {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        _ => trimmed,
    }
}

/// Parses the `(major, minor, patch)` core, defaulting bad or missing parts
/// to zero.
///
/// # Examples
///
/// ```
/// use lodestone_common::version::{SemanticCore, parse_core};
///
/// assert_eq!(parse_core("v1.2.3-rc.1"), SemanticCore::new(1, 2, 3));
/// assert_eq!(parse_core("4.x"), SemanticCore::new(4, 0, 0));
/// assert_eq!(parse_core("garbage"), SemanticCore::default());
/// ```
#[must_use]
pub fn parse_core(tag: &str) -> SemanticCore {
    let core = core_text(normalize(tag));
    let mut parts = core.split('.').map(|segment| segment.parse::<u64>().unwrap_or(0));
    SemanticCore {
        major: parts.next().unwrap_or(0),
        minor: parts.next().unwrap_or(0),
        patch: parts.next().unwrap_or(0),
    }
}

/// Returns the prerelease identifier: the text after the first `-` that
/// precedes any `+build` section.
///
/// # Examples
///
/// ```
/// use lodestone_common::version::prerelease_of;
///
/// assert_eq!(prerelease_of("v1.2.3-dev.abc123"), "dev.abc123");
/// assert_eq!(prerelease_of("1.2.3-beta.1+build-7"), "beta.1");
/// assert_eq!(prerelease_of("1.2.3+build-7"), "");
/// ```
#[must_use]
pub fn prerelease_of(tag: &str) -> &str {
    let without_build = strip_build(normalize(tag));
    without_build
        .split_once('-')
        .map_or("", |(_, prerelease)| prerelease)
}

/// Returns the build metadata after the first `+`, empty when absent.
#[must_use]
pub fn build_metadata_of(tag: &str) -> &str {
    normalize(tag).split_once('+').map_or("", |(_, build)| build)
}

/// Returns `true` when the prerelease identifier contains a token that starts
/// with a known keyword (`dev`, `beta`, `rc`, `alpha`, `pre`).
///
/// A token boundary is required on both sides: the keyword must open a
/// `.`/`-` separated token and must not run into further letters, so
/// `rc1` matches while `snapshot` or `preview` do not. Text outside the
/// prerelease identifier (the core or `+build` metadata) is never inspected.
///
/// # Examples
///
/// ```
/// use lodestone_common::version::is_prerelease;
///
/// assert!(is_prerelease("v1.2.3-dev.abc123"));
/// assert!(is_prerelease("v3.2.27-rc1"));
/// assert!(!is_prerelease("v1.2.3"));
/// assert!(!is_prerelease("v1.2.3-snapshot"));
/// assert!(!is_prerelease("v3.2.25+build.dev"));
/// ```
#[must_use]
pub fn is_prerelease(tag: &str) -> bool {
    prerelease_of(tag)
        .split(['.', '-'])
        .any(token_is_prerelease_marker)
}

/// Orders two prerelease identifiers.
///
/// An empty identifier (a stable release) ranks above any prerelease.
/// Dot-separated segments are compared pairwise: numerically when both are
/// numeric, as strings when both are not, and numeric-before-alphanumeric
/// when they differ. A shorter identifier whose segments all match ranks
/// lower.
///
/// # Examples
///
/// ```
/// use lodestone_common::version::compare_prerelease;
/// use std::cmp::Ordering;
///
/// assert_eq!(compare_prerelease("", "dev.1"), Ordering::Greater);
/// assert_eq!(compare_prerelease("beta.2", "beta.10"), Ordering::Less);
/// assert_eq!(compare_prerelease("rc.1", "rc.1.1"), Ordering::Less);
/// ```
#[must_use]
pub fn compare_prerelease(a: &str, b: &str) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }

    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (Some(x), Some(y)) => {
                let ordering = compare_segment(x, y);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (None, None) => return Ordering::Equal,
        }
    }
}

/// Orders two release identifiers by core, then by prerelease.
///
/// The ordering is total and antisymmetric:
/// `compare_semver(a, b) == compare_semver(b, a).reverse()`.
///
/// # Examples
///
/// ```
/// use lodestone_common::version::compare_semver;
/// use std::cmp::Ordering;
///
/// assert_eq!(compare_semver("1.2.3", "1.2.4"), Ordering::Less);
/// assert_eq!(compare_semver("1.2.3", "1.2.3-dev.abc123"), Ordering::Greater);
/// assert_eq!(compare_semver("v1.2.3-dev.abc", "1.2.3-dev.def"), Ordering::Less);
/// ```
#[must_use]
pub fn compare_semver(a: &str, b: &str) -> Ordering {
    parse_core(a)
        .cmp(&parse_core(b))
        .then_with(|| compare_prerelease(prerelease_of(a), prerelease_of(b)))
}

/// Returns `true` for identifiers that carry no numeric version at all, such
/// as the `dev` placeholder stamped into local builds.
///
/// # Examples
///
/// ```
/// use lodestone_common::version::is_development_build;
///
/// assert!(is_development_build("dev"));
/// assert!(is_development_build(""));
/// assert!(!is_development_build("v0.3.0"));
/// ```
#[must_use]
pub fn is_development_build(version: &str) -> bool {
    !core_text(normalize(version))
        .chars()
        .any(|c| c.is_ascii_digit())
}

fn strip_build(normalized: &str) -> &str {
    normalized
        .split_once('+')
        .map_or(normalized, |(head, _)| head)
}

fn core_text(normalized: &str) -> &str {
    let without_build = strip_build(normalized);
    without_build
        .split_once('-')
        .map_or(without_build, |(core, _)| core)
}

fn token_is_prerelease_marker(token: &str) -> bool {
    let lowered = token.to_ascii_lowercase();
    PRERELEASE_KEYWORDS.iter().any(|keyword| {
        lowered
            .strip_prefix(keyword)
            .is_some_and(|rest| !rest.starts_with(|c: char| c.is_ascii_alphabetic()))
    })
}

fn is_numeric(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

fn compare_segment(a: &str, b: &str) -> Ordering {
    match (is_numeric(a), is_numeric(b)) {
        (true, true) => compare_digits(a, b),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.cmp(b),
    }
}

/// Compares decimal digit strings of any length without overflow.
fn compare_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;
