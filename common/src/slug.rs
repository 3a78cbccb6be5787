//! Pack identifier slugs and the file names derived from them.
//!
//! A slug is the filesystem-safe form of a pack id. Version markers and
//! backup directories are both named after it, so two packs can share a
//! backups root without their records colliding.

/// Fallback slug used when an id contains no usable characters.
pub const DEFAULT_SLUG: &str = "modpack";

/// Lower-cases `id`, keeps ASCII alphanumerics and collapses every other run
/// of characters into a single `-`.
///
/// Leading and trailing dashes are dropped. An id with nothing left becomes
/// [`DEFAULT_SLUG`].
///
/// # Examples
///
/// ```
/// use lodestone_common::slug::slugify;
///
/// assert_eq!(slugify("The Boys: Season 2"), "the-boys-season-2");
/// assert_eq!(slugify("  --  "), "modpack");
/// ```
#[must_use]
pub fn slugify(id: &str) -> String {
    let mut slug = String::with_capacity(id.len());
    let mut pending_dash = false;
    for ch in id.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        DEFAULT_SLUG.to_owned()
    } else {
        slug
    }
}

/// File name of the per-pack version marker: `.<slug>-version`.
#[must_use]
pub fn marker_file_name(slug: &str) -> String {
    format!(".{slug}-version")
}

/// Prefix shared by every backup directory of a pack: `<slug>-backup-`.
#[must_use]
pub fn backup_prefix(slug: &str) -> String {
    format!("{slug}-backup-")
}

/// Name of the advisory lock file guarding a pack: `.<slug>.lock`.
#[must_use]
pub fn lock_file_name(slug: &str) -> String {
    format!(".{slug}.lock")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("theboys", "theboys")]
    #[case("TheBoys", "theboys")]
    #[case("The Boys", "the-boys")]
    #[case("the__boys!!2", "the-boys-2")]
    #[case("-leading and trailing-", "leading-and-trailing")]
    #[case("Ünïcode pack", "n-code-pack")]
    #[case("", "modpack")]
    #[case("!!!", "modpack")]
    fn slugify_collapses_separators(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(slugify(input), expected);
    }

    #[test]
    fn derived_names_embed_slug() {
        assert_eq!(marker_file_name("theboys"), ".theboys-version");
        assert_eq!(backup_prefix("theboys"), "theboys-backup-");
        assert_eq!(lock_file_name("theboys"), ".theboys.lock");
    }
}
