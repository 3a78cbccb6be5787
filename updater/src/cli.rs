//! CLI argument definitions for the `lodestone` binary.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary focused on wiring
//! collaborators together.

use crate::release::Channel;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Keep the Lodestone launcher and its managed packs up to date.
#[derive(Parser, Debug)]
#[command(name = "lodestone")]
#[command(version = crate::current_version(), about)]
#[command(long_about = concat!(
    "Keep the Lodestone launcher and its managed packs up to date.\n\n",
    "Launcher releases are discovered from the public release pages, so no API ",
    "token is needed. A newer release is downloaded next to the running binary ",
    "and swapped in by a short-lived helper process.\n\n",
    "Packs are synced against their packwiz manifest. Before an update the ",
    "tracked folders are backed up, and a failed sync puts them back.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Check for a launcher update:\n",
    "    $ lodestone check\n\n",
    "  Install the newest prerelease:\n",
    "    $ lodestone self-update --channel prerelease\n\n",
    "  Sync a pack:\n",
    "    $ lodestone sync --pack theboys\n\n",
    "  Roll a pack back to its newest backup:\n",
    "    $ lodestone restore --pack theboys\n\n",
    "  List backups as JSON:\n",
    "    $ lodestone backups --pack theboys --json\n\n",
    "Settings are read from lodestone.toml in the platform config directory,\n",
    "or from the file named by --config or LODESTONE_CONFIG.",
))]
pub struct Cli {
    /// Subcommand to execute (defaults to `check`).
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Configuration file [default: platform-specific].
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Handoff arguments passed to a freshly staged binary.
    #[command(flatten)]
    pub handoff: HandoffArgs,
}

impl Cli {
    /// The command to run; `check` when none was given.
    #[must_use]
    pub fn resolved_command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or_else(|| Command::Check(ChannelArgs::default()))
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Report whether a newer launcher release exists.
    Check(ChannelArgs),

    /// Download and install the newest launcher release.
    SelfUpdate(SelfUpdateArgs),

    /// Sync a pack with its remote manifest.
    Sync(PackArgs),

    /// Restore a pack from a backup.
    Restore(RestoreArgs),

    /// List the backups of a pack.
    Backups(BackupsArgs),
}

/// Release channel selection.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelArgs {
    /// Release channel [default: from configuration].
    #[arg(long, value_enum, value_name = "CHANNEL")]
    pub channel: Option<Channel>,
}

/// Arguments for the self-update command.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct SelfUpdateArgs {
    /// Release channel selection.
    #[command(flatten)]
    pub channel: ChannelArgs,

    /// Install the resolved release even if it is not newer.
    #[arg(long)]
    pub force: bool,
}

/// Selects a configured pack.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct PackArgs {
    /// Pack id (or its slug) from the configuration.
    #[arg(long, value_name = "ID")]
    pub pack: String,
}

/// Arguments for the restore command.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct RestoreArgs {
    /// Pack selection.
    #[command(flatten)]
    pub pack: PackArgs,

    /// Backup id or timestamp [default: newest backup].
    #[arg(long, value_name = "BACKUP-ID")]
    pub backup: Option<String>,
}

/// Arguments for the backups command.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct BackupsArgs {
    /// Pack selection.
    #[command(flatten)]
    pub pack: PackArgs,

    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,
}

/// Internal flags used by the self-replace handoff.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct HandoffArgs {
    /// Run the finalizing step of a self-update.
    #[arg(long = "cleanup-after-update", hide = true, requires_all = ["old_exe", "new_exe"])]
    pub cleanup: bool,

    /// Executable being replaced.
    #[arg(long = "cleanup-old-exe", hide = true, value_name = "PATH")]
    pub old_exe: Option<PathBuf>,

    /// Staged replacement executable.
    #[arg(long = "cleanup-new-exe", hide = true, value_name = "PATH")]
    pub new_exe: Option<PathBuf>,
}

impl HandoffArgs {
    /// The `(old, new)` executable pair when the finalizing step was
    /// requested.
    #[must_use]
    pub fn paths(&self) -> Option<(PathBuf, PathBuf)> {
        if !self.cleanup {
            return None;
        }
        Some((self.old_exe.clone()?, self.new_exe.clone()?))
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
