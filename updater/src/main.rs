//! Lodestone updater CLI entrypoint.
//!
//! This binary checks for and installs launcher releases, syncs managed packs
//! and manages their backups. When started with the hidden cleanup flags it
//! instead finishes a self-update begun by the previous process.

use clap::Parser;
use lodestone_updater::cli::{Cli, Command};
use lodestone_updater::config::UpdaterConfig;
use lodestone_updater::content::HttpManifestFetcher;
use lodestone_updater::dirs::SystemBaseDirs;
use lodestone_updater::error::{ConfigError, Result, UpdaterError};
use lodestone_updater::http::{HttpClient, user_agent};
use lodestone_updater::list_output::{format_backups_human, format_backups_json};
use lodestone_updater::orchestrator::{Collaborators, LauncherUpdate, Orchestrator};
use lodestone_updater::output::{check_summary, progress, sync_summary, write_stderr_line};
use lodestone_updater::release::{Channel, HttpReleaseSource};
use lodestone_updater::replace::{
    ExecutableFs, FinalizeOptions, HttpDownloader, ProcessLauncher, SelfReplace, SystemFs,
    SystemLauncher,
};
use lodestone_updater::sync::CommandSyncer;
use std::io::Write;
use std::path::PathBuf;

/// Network-backed collaborators built from the configuration.
struct HttpServices {
    releases: HttpReleaseSource,
    downloader: HttpDownloader,
    manifests: HttpManifestFetcher,
}

impl HttpServices {
    fn from_config(config: &UpdaterConfig) -> Result<Self> {
        let launcher = &config.launcher;
        let agent = launcher
            .user_agent
            .clone()
            .unwrap_or_else(|| user_agent("Updater"));
        let client = HttpClient::new(launcher.timeout(), agent.clone());
        let download_client = HttpClient::new(launcher.download_timeout(), agent);

        let releases = HttpReleaseSource::new(client.clone(), launcher.target()).map_err(|err| {
            ConfigError::Invalid {
                reason: format!("release page pattern for {}/{}: {err}", launcher.owner, launcher.repo),
            }
        })?;
        Ok(Self {
            releases,
            downloader: HttpDownloader::new(download_client),
            manifests: HttpManifestFetcher::new(client, config.sync.cache_bust),
        })
    }
}

fn main() {
    let cli = Cli::parse();
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<()> {
    if let Some((old_exe, new_exe)) = cli.handoff.paths() {
        return finalize_handoff(
            old_exe,
            new_exe,
            &SystemFs,
            &SystemLauncher,
            &FinalizeOptions::default(),
            cli.quiet,
            stderr,
        );
    }

    let dirs = SystemBaseDirs;
    let config = UpdaterConfig::load(cli.config.as_deref(), &dirs)?;
    let backups_root = config.backups.resolve_root(&dirs)?;
    let services = HttpServices::from_config(&config)?;
    let syncer = CommandSyncer::from_command(&config.sync.command, config.sync.timeout())
        .ok_or_else(|| ConfigError::Invalid {
            reason: "sync.command must name a program".to_owned(),
        })?;

    let deps = Collaborators {
        releases: &services.releases,
        downloader: &services.downloader,
        manifests: &services.manifests,
        syncer: &syncer,
        fs: &SystemFs,
        launcher: &SystemLauncher,
    };
    let orchestrator = Orchestrator::new(&config, backups_root, deps, cli.quiet);
    let context = CommandContext {
        orchestrator: &orchestrator,
        default_channel: config.launcher.channel,
        running: lodestone_updater::current_version(),
        quiet: cli.quiet,
    };
    execute(&context, &cli.resolved_command(), stdout, stderr)
}

/// What a subcommand needs besides its own arguments.
struct CommandContext<'a> {
    orchestrator: &'a Orchestrator<'a>,
    default_channel: Channel,
    running: &'a str,
    quiet: bool,
}

/// Runs one subcommand, writing its result to `stdout`.
fn execute(
    context: &CommandContext<'_>,
    command: &Command,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<()> {
    let orchestrator = context.orchestrator;
    let channel = |selected: Option<Channel>| selected.unwrap_or(context.default_channel);
    match command {
        Command::Check(args) => {
            let check = orchestrator.check_launcher_update(context.running, channel(args.channel))?;
            write_stdout_line(stdout, check_summary(&check))
        }
        Command::SelfUpdate(args) => {
            let current_exe = std::env::current_exe()?;
            let update = orchestrator.update_launcher(
                context.running,
                channel(args.channel.channel),
                args.force,
                current_exe,
                stderr,
            )?;
            if let LauncherUpdate::HandoffStarted { .. } = update {
                progress(stderr, context.quiet, &update);
                return Ok(());
            }
            write_stdout_line(stdout, update)
        }
        Command::Sync(args) => {
            let report = orchestrator.sync_pack(&args.pack, stderr)?;
            write_stdout_line(stdout, sync_summary(&args.pack, &report))
        }
        Command::Restore(args) => {
            let report = orchestrator.restore_pack(&args.pack.pack, args.backup.as_deref())?;
            let items: Vec<&str> = report.restored.iter().map(String::as_str).collect();
            write_stdout_line(
                stdout,
                format!(
                    "{}: restored {} from {}",
                    args.pack.pack,
                    items.join(", "),
                    report.backup_id
                ),
            )
        }
        Command::Backups(args) => {
            let backups = orchestrator.list_pack_backups(&args.pack.pack)?;
            let listing = if args.json {
                format_backups_json(&args.pack.pack, &backups)
            } else {
                format_backups_human(&args.pack.pack, &backups)
            };
            write_stdout_line(stdout, listing)
        }
    }
}

/// Completes a self-update inside the freshly staged executable.
fn finalize_handoff(
    old_exe: PathBuf,
    new_exe: PathBuf,
    fs: &dyn ExecutableFs,
    launcher: &dyn ProcessLauncher,
    options: &FinalizeOptions,
    quiet: bool,
    stderr: &mut dyn Write,
) -> Result<()> {
    let mut machine = SelfReplace::for_handoff(old_exe, new_exe, fs, launcher);
    let outcome = machine.finalize(options)?;
    progress(stderr, quiet, format_args!("Self-update finished: {outcome}"));
    Ok(())
}

fn write_stdout_line(stdout: &mut dyn Write, message: impl std::fmt::Display) -> Result<()> {
    writeln!(stdout, "{message}").map_err(|source| UpdaterError::WriteFailed { source })
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format_args!("error: {err}"));
            err.exit_code()
        }
    }
}
