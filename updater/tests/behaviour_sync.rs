//! Behaviour-driven coverage for syncing a pack behind a backup.

use camino::Utf8PathBuf;
use lodestone_common::test_support::DirSnapshot;
use lodestone_updater::config::{PackConfig, UpdaterConfig};
use lodestone_updater::error::{Result, SyncError, UpdaterError};
use lodestone_updater::orchestrator::{Collaborators, Orchestrator, SyncReport};
use lodestone_updater::test_utils::{
    RecordingLauncher, ScriptedFs, StubDownloader, StubManifestFetcher, StubReleaseSource,
    StubSyncer,
};
use logtest::Logger;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

struct SyncWorld {
    dir: TempDir,
    config: RefCell<UpdaterConfig>,
    manifests: StubManifestFetcher,
    syncer: RefCell<StubSyncer>,
    releases: StubReleaseSource,
    downloader: StubDownloader,
    fs: ScriptedFs,
    launcher: RecordingLauncher,
    before: RefCell<Option<DirSnapshot>>,
    result: RefCell<Option<Result<SyncReport>>>,
}

impl SyncWorld {
    fn content_root(&self) -> PathBuf {
        self.dir.path().join("instance")
    }

    fn utf8(path: PathBuf) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(path).unwrap_or_else(|path| panic!("not UTF-8: {path:?}"))
    }

    fn sync(&self) {
        let snapshot = DirSnapshot::capture(&self.content_root())
            .unwrap_or_else(|err| panic!("snapshot: {err}"));
        self.before.replace(Some(snapshot));

        let config = self.config.borrow();
        let syncer = self.syncer.borrow();
        let deps = Collaborators {
            releases: &self.releases,
            downloader: &self.downloader,
            manifests: &self.manifests,
            syncer: &*syncer,
            fs: &self.fs,
            launcher: &self.launcher,
        };
        let backups_root = Self::utf8(self.dir.path().join("backups"));
        let orchestrator = Orchestrator::new(&config, backups_root, deps, true);
        let result = orchestrator.sync_pack("theboys", &mut std::io::sink());
        self.result.replace(Some(result));
    }

    fn install(&self, version: &str, files: &str) {
        let root = self.content_root();
        for relative in files.split(',') {
            let path = root.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap_or_else(|err| panic!("create dirs: {err}"));
            }
            fs::write(&path, relative).unwrap_or_else(|err| panic!("write {relative}: {err}"));
        }
        fs::write(root.join(".theboys-version"), format!("{version}\n"))
            .unwrap_or_else(|err| panic!("write marker: {err}"));
    }

    fn summary(&self) -> String {
        match self.result.borrow().as_ref() {
            Some(Ok(report)) => report.to_string(),
            Some(Err(err)) => panic!("sync failed: {err}"),
            None => panic!("sync must have run"),
        }
    }

    fn marker(&self) -> Option<String> {
        fs::read_to_string(self.content_root().join(".theboys-version"))
            .ok()
            .map(|text| text.trim().to_owned())
    }

    fn backup_count(&self) -> usize {
        let backups = self.dir.path().join("backups");
        if !backups.exists() {
            return 0;
        }
        fs::read_dir(backups)
            .unwrap_or_else(|err| panic!("list backups: {err}"))
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("theboys-backup-"))
            .count()
    }
}

impl SyncWorld {
    fn new() -> Self {
        let dir = TempDir::new().unwrap_or_else(|err| panic!("temp dir: {err}"));
        let content_dir = Self::utf8(dir.path().join("instance"));
        let config = UpdaterConfig {
            packs: vec![PackConfig {
                id: "theboys".to_owned(),
                display_name: Some("The Boys".to_owned()),
                manifest_url: "https://packs.example.test/theboys/pack.toml".to_owned(),
                content_dir,
                marker_dir: None,
                tracked_items: vec!["mods".to_owned(), "config".to_owned()],
            }],
            ..UpdaterConfig::default()
        };
        Self {
            dir,
            config: RefCell::new(config),
            manifests: StubManifestFetcher::failing(),
            syncer: RefCell::new(StubSyncer::new()),
            releases: StubReleaseSource::default(),
            downloader: StubDownloader::default(),
            fs: ScriptedFs::new(),
            launcher: RecordingLauncher::new(),
            before: RefCell::new(None),
            result: RefCell::new(None),
        }
    }
}

#[fixture]
fn world() -> SyncWorld {
    SyncWorld::new()
}

#[given("a remote pack at version \"{version}\"")]
fn given_remote(world: &SyncWorld, version: String) {
    world.manifests.set_version(&version);
}

#[given("no local installation")]
fn given_no_installation(world: &SyncWorld) {
    assert!(!world.content_root().exists());
}

#[given("a local installation at version \"{version}\" with files \"{files}\"")]
fn given_installation(world: &SyncWorld, version: String, files: String) {
    world.install(&version, &files);
}

#[given("the sync collaborator fails after writing \"{relative}\"")]
fn given_failing_syncer(world: &SyncWorld, relative: String) {
    let syncer = StubSyncer::new().writing(&relative, "partial");
    syncer.set_failing(true);
    world.syncer.replace(syncer);
}

#[given("verification of current packs is enabled")]
fn given_verification(world: &SyncWorld) {
    world.config.borrow_mut().sync.verify_when_current = true;
}

#[when("the pack is synced")]
fn when_synced(world: &SyncWorld) {
    world.sync();
}

#[then("the sync reports \"{summary}\"")]
fn then_reports(world: &SyncWorld, summary: String) {
    assert_eq!(world.summary(), summary);
}

#[then("the sync fails with the previous content restored")]
fn then_failed_restored(world: &SyncWorld) {
    let result = world.result.borrow();
    let Some(Err(err)) = result.as_ref() else {
        panic!("expected a failed sync");
    };
    assert!(matches!(
        err,
        UpdaterError::Sync(SyncError::SyncFailed { restored: true, .. })
    ));
}

#[then("the local marker reads \"{version}\"")]
fn then_marker(world: &SyncWorld, version: String) {
    assert_eq!(world.marker(), Some(version));
}

#[then("\"{count}\" backups exist")]
fn then_backups(world: &SyncWorld, count: String) {
    let expected: usize = count.parse().unwrap_or_else(|_| panic!("count must be numeric"));
    assert_eq!(world.backup_count(), expected);
}

#[then("the content tree is unchanged")]
fn then_unchanged(world: &SyncWorld) {
    let after = DirSnapshot::capture(&world.content_root())
        .unwrap_or_else(|err| panic!("snapshot: {err}"));
    let before = world.before.borrow();
    let before = before.as_ref().unwrap_or_else(|| panic!("a snapshot must exist"));
    let diff = before.diff(&after);
    assert!(diff.is_empty(), "{diff:?}");
}

#[then("the sync collaborator ran \"{count}\" times")]
fn then_syncer_runs(world: &SyncWorld, count: String) {
    let expected: usize = count.parse().unwrap_or_else(|_| panic!("count must be numeric"));
    assert_eq!(world.syncer.borrow().calls().len(), expected);
}

#[scenario(path = "tests/features/pack_sync.feature", index = 0)]
fn scenario_first_install(world: SyncWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/pack_sync.feature", index = 1)]
fn scenario_update_with_backup(world: SyncWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/pack_sync.feature", index = 2)]
fn scenario_failed_sync_restores(world: SyncWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/pack_sync.feature", index = 3)]
fn scenario_up_to_date(world: SyncWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/pack_sync.feature", index = 4)]
fn scenario_verification(world: SyncWorld) {
    let _ = world;
}

#[cfg(unix)]
#[test]
fn unreadable_backup_warns_and_sync_continues() {
    let mut logger = Logger::start();
    let world = SyncWorld::new();
    world.manifests.set_version("3.2.28");
    world.install("3.2.27", "mods/a.jar");
    std::os::unix::fs::symlink(
        world.content_root().join("mods/a.jar"),
        world.content_root().join("mods/link.jar"),
    )
    .unwrap_or_else(|err| panic!("symlink: {err}"));

    world.sync();

    assert_eq!(world.summary(), "updated 3.2.27 -> 3.2.28");
    assert_eq!(world.backup_count(), 0);
    let mut warned = false;
    while let Some(record) = logger.pop() {
        if record.args().to_string().contains("continuing without a backup") {
            warned = true;
            break;
        }
    }
    assert!(warned, "expected the backup failure to be logged");
}
