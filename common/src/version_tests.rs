//! Unit tests for release identifier parsing and ordering.

use super::*;
use rstest::rstest;

const SAMPLE_TAGS: [&str; 16] = [
    "v1.2.3",
    "1.2.3",
    "v1.2.4",
    "v1.2.3-dev.abc123",
    "v1.2.3-dev.abc",
    "v1.2.3-dev.def",
    "v1.2.3-beta",
    "v1.2.3-beta.2",
    "v1.2.3-beta.10",
    "v1.2.3-rc.1.1",
    "v2.0.0-dev.x",
    "v3.2.25+build.456",
    "garbage",
    "",
    "vv1.0",
    "10.0",
];

#[rstest]
#[case("v1.2.3", "1.2.3")]
#[case("V1.2.3", "1.2.3")]
#[case("  v1.2.3-dev.abc  ", "1.2.3-dev.abc")]
#[case("1.2.3+build.5", "1.2.3+build.5")]
#[case("version", "version")]
#[case("vv1.0", "vv1.0")]
#[case("", "")]
fn normalize_strips_prefix_and_whitespace(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(normalize(input), expected);
}

#[test]
fn normalize_is_idempotent() {
    for tag in SAMPLE_TAGS {
        let once = normalize(tag);
        assert_eq!(normalize(once), once, "normalize not idempotent for {tag:?}");
    }
}

#[rstest]
#[case("1.2.3", SemanticCore::new(1, 2, 3))]
#[case("v10.20.30-dev.1", SemanticCore::new(10, 20, 30))]
#[case("1.2", SemanticCore::new(1, 2, 0))]
#[case("1", SemanticCore::new(1, 0, 0))]
#[case("1.x.3", SemanticCore::new(1, 0, 3))]
#[case("1.2.3.4", SemanticCore::new(1, 2, 3))]
#[case("dev", SemanticCore::new(0, 0, 0))]
#[case("", SemanticCore::new(0, 0, 0))]
fn parse_core_defaults_missing_components(#[case] input: &str, #[case] expected: SemanticCore) {
    assert_eq!(parse_core(input), expected);
}

#[rstest]
#[case("v1.2.3-dev.abc123", "dev.abc123")]
#[case("v1.2.3", "")]
#[case("v3.2.29-beta.1+build.123", "beta.1")]
#[case("v3.2.25+build.456", "")]
#[case("v1.0.0-rc-2", "rc-2")]
fn prerelease_of_extracts_suffix(#[case] input: &str, #[case] expected: &str) {
    assert_eq!(prerelease_of(input), expected);
}

#[test]
fn build_metadata_is_preserved_separately() {
    assert_eq!(build_metadata_of("v3.2.29-beta.1+build.123"), "build.123");
    assert_eq!(build_metadata_of("v3.2.29"), "");
}

#[rstest]
#[case("v1.2.3-dev.abc123", true)]
#[case("v1.2.3", false)]
#[case("v1.2.3-snapshot", false)]
#[case("v3.2.28-beta", true)]
#[case("v3.2.27-rc1", true)]
#[case("v3.2.27-alpha.3", true)]
#[case("v3.2.26-pre.4", true)]
#[case("v3.2.26-PRE.4", true)]
#[case("v3.2.26-preview", false)]
#[case("dev", false)]
#[case("v3.2.25+build.dev", false)]
#[case("v3.2.29-beta.1+build.123", true)]
fn is_prerelease_requires_keyword_token(#[case] input: &str, #[case] expected: bool) {
    assert_eq!(is_prerelease(input), expected, "tag {input:?}");
}

#[rstest]
#[case("1.2.3", "1.2.4", Ordering::Less)]
#[case("1.2.3", "1.2.3-dev.abc123", Ordering::Greater)]
#[case("1.2.3-dev.abc", "1.2.3-dev.def", Ordering::Less)]
#[case("v2.0.0", "1.99.99", Ordering::Greater)]
#[case("1.2.3-beta.2", "1.2.3-beta.10", Ordering::Less)]
#[case("1.2.3-1", "1.2.3-alpha", Ordering::Less)]
#[case("1.2.3-rc.1", "1.2.3-rc.1.1", Ordering::Less)]
#[case("v1.2.3+build.1", "1.2.3+build.2", Ordering::Equal)]
#[case("3.2.26-dev.abc", "3.2.27", Ordering::Less)]
fn compare_semver_orders_tags(#[case] a: &str, #[case] b: &str, #[case] expected: Ordering) {
    assert_eq!(compare_semver(a, b), expected);
}

#[test]
fn compare_semver_is_antisymmetric() {
    for a in SAMPLE_TAGS {
        for b in SAMPLE_TAGS {
            assert_eq!(
                compare_semver(a, b),
                compare_semver(b, a).reverse(),
                "antisymmetry violated for {a:?} vs {b:?}"
            );
        }
    }
}

#[test]
fn compare_prerelease_handles_huge_numeric_segments() {
    let huge = "dev.340282366920938463463374607431768211456";
    let small = "dev.7";
    assert_eq!(compare_prerelease(small, huge), Ordering::Less);
    assert_eq!(compare_prerelease(huge, small), Ordering::Greater);
}

#[test]
fn release_tag_exposes_components() {
    let tag = ReleaseTag::new("v3.2.30-dev.adcb1ae");
    assert_eq!(tag.as_str(), "v3.2.30-dev.adcb1ae");
    assert_eq!(tag.core(), SemanticCore::new(3, 2, 30));
    assert_eq!(tag.prerelease(), "dev.adcb1ae");
    assert!(tag.is_prerelease());
    assert!(tag.is_newer_than("3.2.29"));
    assert!(!tag.is_newer_than("3.2.30"));
}

#[rstest]
#[case("dev", true)]
#[case("unknown", true)]
#[case("0.0.0", false)]
#[case("v3.2.26", false)]
fn development_builds_have_no_digits(#[case] input: &str, #[case] expected: bool) {
    assert_eq!(is_development_build(input), expected);
}
