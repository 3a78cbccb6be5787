//! Behaviour-driven coverage for release discovery across channels, pages
//! and missing assets.

use lodestone_updater::error::DiscoveryError;
use lodestone_updater::release::{Channel, ReleaseTarget, ResolvedRelease, resolve};
use lodestone_updater::test_utils::StubReleaseSource;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::{Cell, RefCell};

const MAX_PAGES: u32 = 3;

#[derive(Default)]
struct DiscoveryWorld {
    pages: RefCell<Vec<Vec<String>>>,
    assets_missing: Cell<bool>,
    source: RefCell<Option<StubReleaseSource>>,
    result: RefCell<Option<Result<ResolvedRelease, DiscoveryError>>>,
}

impl DiscoveryWorld {
    fn target() -> ReleaseTarget {
        ReleaseTarget {
            base_url: "https://releases.example.test".to_owned(),
            owner: "lodestone-launcher".to_owned(),
            repo: "lodestone".to_owned(),
            asset_name: "lodestone-linux".to_owned(),
        }
    }

    fn resolve(&self, channel: Channel) {
        let pages = self.pages.borrow();
        let tags: Vec<Vec<&str>> = pages
            .iter()
            .map(|page| page.iter().map(String::as_str).collect())
            .collect();
        let slices: Vec<&[&str]> = tags.iter().map(Vec::as_slice).collect();
        let mut source = StubReleaseSource::new(&slices);
        if self.assets_missing.get() {
            source = source.without_assets();
        }

        let result = resolve(&source, &Self::target(), channel, MAX_PAGES);
        self.result.replace(Some(result));
        self.source.replace(Some(source));
    }

    fn resolved(&self) -> ResolvedRelease {
        match self.result.borrow().as_ref() {
            Some(Ok(resolved)) => resolved.clone(),
            Some(Err(err)) => panic!("discovery failed: {err}"),
            None => panic!("discovery must have run"),
        }
    }

    fn error_matches(&self, predicate: impl Fn(&DiscoveryError) -> bool) -> bool {
        match self.result.borrow().as_ref() {
            Some(Err(err)) => predicate(err),
            Some(Ok(resolved)) => panic!("expected failure, resolved {}", resolved.tag),
            None => panic!("discovery must have run"),
        }
    }

    fn page_calls(&self) -> usize {
        self.source
            .borrow()
            .as_ref()
            .map(|source| source.page_calls().len())
            .unwrap_or_else(|| panic!("discovery must have run"))
    }
}

#[fixture]
fn world() -> DiscoveryWorld {
    DiscoveryWorld::default()
}

#[given("a release listing with pages \"{pages}\"")]
fn given_pages(world: &DiscoveryWorld, pages: String) {
    let parsed = pages
        .split('|')
        .map(|page| page.split(',').map(str::to_owned).collect())
        .collect();
    world.pages.replace(parsed);
}

#[given("an empty release listing")]
fn given_empty_listing(world: &DiscoveryWorld) {
    world.pages.replace(Vec::new());
}

#[given("the release assets are missing")]
fn given_assets_missing(world: &DiscoveryWorld) {
    world.assets_missing.set(true);
}

#[when("the newest stable release is resolved")]
fn when_stable(world: &DiscoveryWorld) {
    world.resolve(Channel::PreferStable);
}

#[when("the newest prerelease release is resolved")]
fn when_prerelease(world: &DiscoveryWorld) {
    world.resolve(Channel::PreferPrerelease);
}

#[then("the resolved tag is \"{tag}\"")]
fn then_tag(world: &DiscoveryWorld, tag: String) {
    assert_eq!(world.resolved().tag.as_str(), tag);
}

#[then("the asset URL ends with \"{suffix}\"")]
fn then_asset_url(world: &DiscoveryWorld, suffix: String) {
    let url = world.resolved().asset.url;
    assert!(url.ends_with(&suffix), "{url}");
}

#[then("\"{count}\" listing pages were requested")]
fn then_page_calls(world: &DiscoveryWorld, count: String) {
    let expected: usize = count.parse().unwrap_or_else(|_| panic!("count must be numeric"));
    assert_eq!(world.page_calls(), expected);
}

#[then("discovery fails because no stable release exists")]
fn then_no_stable(world: &DiscoveryWorld) {
    assert!(world.error_matches(|err| matches!(
        err,
        DiscoveryError::NoStableReleaseFound { pages: MAX_PAGES, .. }
    )));
}

#[then("discovery fails because no release exists")]
fn then_no_release(world: &DiscoveryWorld) {
    assert!(world.error_matches(|err| matches!(err, DiscoveryError::NoReleaseFound { .. })));
}

#[then("discovery fails because the asset is missing")]
fn then_asset_missing(world: &DiscoveryWorld) {
    assert!(world.error_matches(|err| matches!(
        err,
        DiscoveryError::AssetNotFound { tag, .. } if tag == "v1.9.0"
    )));
}

#[scenario(path = "tests/features/release_discovery.feature", index = 0)]
fn scenario_stable_skips_prereleases(world: DiscoveryWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/release_discovery.feature", index = 1)]
fn scenario_stable_pages_forward(world: DiscoveryWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/release_discovery.feature", index = 2)]
fn scenario_prerelease_takes_newest(world: DiscoveryWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/release_discovery.feature", index = 3)]
fn scenario_page_budget(world: DiscoveryWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/release_discovery.feature", index = 4)]
fn scenario_empty_listing(world: DiscoveryWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/release_discovery.feature", index = 5)]
fn scenario_missing_asset(world: DiscoveryWorld) {
    let _ = world;
}
