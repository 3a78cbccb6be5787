//! Behaviour-driven coverage for release identifier ordering and
//! prerelease classification.

use lodestone_common::version::{compare_semver, is_prerelease};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::{Cell, RefCell};
use std::cmp::Ordering;

#[derive(Debug, Default)]
struct OrderingWorld {
    first: RefCell<Option<String>>,
    second: RefCell<Option<String>>,
    ordering: Cell<Option<Ordering>>,
    classification: Cell<Option<(bool, bool)>>,
}

impl OrderingWorld {
    fn set_releases(&self, first: String, second: String) {
        self.first.replace(Some(first));
        self.second.replace(Some(second));
    }

    fn releases(&self) -> (String, String) {
        let first = self
            .first
            .borrow()
            .clone()
            .unwrap_or_else(|| panic!("first release must be configured"));
        let second = self
            .second
            .borrow()
            .clone()
            .unwrap_or_else(|| panic!("second release must be configured"));
        (first, second)
    }

    fn compare(&self) {
        let (first, second) = self.releases();
        let forward = compare_semver(&first, &second);
        assert_eq!(
            forward,
            compare_semver(&second, &first).reverse(),
            "ordering of {first:?} and {second:?} must be antisymmetric"
        );
        self.ordering.set(Some(forward));
    }

    fn classify(&self) {
        let (first, second) = self.releases();
        self.classification
            .set(Some((is_prerelease(&first), is_prerelease(&second))));
    }

    fn ordering(&self) -> Ordering {
        self.ordering
            .get()
            .unwrap_or_else(|| panic!("ordering must be recorded"))
    }

    fn classification(&self) -> (bool, bool) {
        self.classification
            .get()
            .unwrap_or_else(|| panic!("classification must be recorded"))
    }
}

#[fixture]
fn world() -> OrderingWorld {
    OrderingWorld::default()
}

#[given("release \"{first}\" and release \"{second}\"")]
fn given_releases(world: &OrderingWorld, first: String, second: String) {
    world.set_releases(first, second);
}

#[when("the releases are compared")]
fn when_compared(world: &OrderingWorld) {
    world.compare();
}

#[when("the releases are classified")]
fn when_classified(world: &OrderingWorld) {
    world.classify();
}

#[then("the first release ranks lower")]
fn then_lower(world: &OrderingWorld) {
    assert_eq!(world.ordering(), Ordering::Less);
}

#[then("the first release ranks higher")]
fn then_higher(world: &OrderingWorld) {
    assert_eq!(world.ordering(), Ordering::Greater);
}

#[then("the releases rank equally")]
fn then_equal(world: &OrderingWorld) {
    assert_eq!(world.ordering(), Ordering::Equal);
}

#[then("the first release is a prerelease")]
fn then_first_prerelease(world: &OrderingWorld) {
    assert!(world.classification().0);
}

#[then("the second release is not a prerelease")]
fn then_second_stable(world: &OrderingWorld) {
    assert!(!world.classification().1);
}

#[scenario(path = "tests/features/version_ordering.feature", index = 0)]
fn scenario_patch_ordering(world: OrderingWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/version_ordering.feature", index = 1)]
fn scenario_stable_beats_prerelease(world: OrderingWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/version_ordering.feature", index = 2)]
fn scenario_lexical_tie_break(world: OrderingWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/version_ordering.feature", index = 3)]
fn scenario_build_metadata_ignored(world: OrderingWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/version_ordering.feature", index = 4)]
fn scenario_prerelease_keywords(world: OrderingWorld) {
    let _ = world;
}
