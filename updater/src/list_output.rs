//! Output formatting for the `backups` command.
//!
//! Backups can be listed for people or as JSON for scripts.

use serde::Serialize;

use crate::backup::BackupRecord;

/// Formats `backups` of `pack` for human-readable output, newest first.
///
/// # Examples
///
/// ```
/// use lodestone_updater::list_output::format_backups_human;
///
/// let output = format_backups_human("theboys", &[]);
/// assert!(output.contains("No backups of theboys"));
/// ```
#[must_use]
pub fn format_backups_human(pack: &str, backups: &[BackupRecord]) -> String {
    if backups.is_empty() {
        return format!(
            "No backups of {pack}.\n\nBackups are taken automatically before each pack update."
        );
    }

    let mut output = format!("Backups of {pack} (newest first):\n");
    for record in backups {
        let items: Vec<&str> = record.items.iter().map(String::as_str).collect();
        let marker = if record.has_marker { "" } else { " (no version marker)" };
        output.push_str(&format!("\n  {}{marker}\n", record.id));
        output.push_str(&format!("    path:  {}\n", record.path.display()));
        if items.is_empty() {
            output.push_str("    items: (none)\n");
        } else {
            output.push_str(&format!("    items: {}\n", items.join(", ")));
        }
    }
    output
}

/// Formats `backups` of `pack` as pretty-printed JSON.
///
/// # Examples
///
/// ```
/// use lodestone_updater::list_output::format_backups_json;
///
/// let json = format_backups_json("theboys", &[]);
/// assert!(json.contains("\"backups\": []"));
/// ```
#[must_use]
pub fn format_backups_json(pack: &str, backups: &[BackupRecord]) -> String {
    let listing = BackupListing { pack, backups };
    serde_json::to_string_pretty(&listing).unwrap_or_else(|_| "{}".to_owned())
}

#[derive(Serialize)]
struct BackupListing<'a> {
    pack: &'a str,
    backups: &'a [BackupRecord],
}
