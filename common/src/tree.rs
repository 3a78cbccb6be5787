//! Recursive copy and removal of content trees.
//!
//! Backups and restores move whole directories (mods, config, shader packs)
//! as well as single marker files, so both helpers accept either kind of
//! entry. Symlinks are refused rather than followed so a crafted content
//! tree cannot make a backup read or overwrite files outside the pack.

use log::debug;
use std::fs;
use std::io;
use std::path::Path;

/// Maximum directory nesting followed by [`copy_entry`].
pub const MAX_DIRECTORY_DEPTH: usize = 64;

/// Copies a file or directory tree from `source` to `destination`.
///
/// Existing files at the destination are overwritten. Missing parent
/// directories of `destination` are created.
///
/// # Errors
///
/// Returns an error when `source` is a symlink or contains one, when nesting
/// exceeds [`MAX_DIRECTORY_DEPTH`], or when any underlying I/O fails.
///
/// # Examples
///
/// ```
/// use lodestone_common::tree::copy_entry;
/// use std::fs;
/// use tempfile::tempdir;
///
/// # fn demo() -> std::io::Result<()> {
/// let source = tempdir()?;
/// fs::create_dir(source.path().join("mods"))?;
/// fs::write(source.path().join("mods/a.jar"), "jar")?;
/// let destination = tempdir()?;
/// copy_entry(&source.path().join("mods"), &destination.path().join("mods"))?;
/// assert!(destination.path().join("mods/a.jar").exists());
/// # Ok(())
/// # }
/// # demo().unwrap();
/// ```
pub fn copy_entry(source: &Path, destination: &Path) -> io::Result<()> {
    let file_type = source.symlink_metadata()?.file_type();
    ensure_not_symlink(source, file_type)?;

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }

    debug!("copying {} to {}", source.display(), destination.display());
    if file_type.is_dir() {
        copy_directory_with_depth(source, destination, MAX_DIRECTORY_DEPTH)
    } else {
        fs::copy(source, destination).map(|_| ())
    }
}

/// Removes a file or directory tree. Absent paths are not an error.
///
/// # Errors
///
/// Returns any I/O error other than [`io::ErrorKind::NotFound`].
pub fn remove_entry(path: &Path) -> io::Result<()> {
    let metadata = match path.symlink_metadata() {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    };

    if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

fn copy_directory_with_depth(
    source: &Path,
    destination: &Path,
    remaining_depth: usize,
) -> io::Result<()> {
    if remaining_depth == 0 {
        return Err(depth_limit_error(source));
    }

    fs::create_dir_all(destination)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let entry_path = entry.path();
        let file_type = entry_path.symlink_metadata()?.file_type();
        ensure_not_symlink(&entry_path, file_type)?;

        let target = destination.join(entry.file_name());
        if file_type.is_dir() {
            copy_directory_with_depth(&entry_path, &target, remaining_depth - 1)?;
        } else {
            fs::copy(&entry_path, target)?;
        }
    }

    Ok(())
}

fn ensure_not_symlink(path: &Path, file_type: fs::FileType) -> io::Result<()> {
    if file_type.is_symlink() {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("refusing to follow symlink `{}`", path.display()),
        ))
    } else {
        Ok(())
    }
}

fn depth_limit_error(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!(
            "refusing to copy `{}`: directory depth exceeds limit of {MAX_DIRECTORY_DEPTH} levels",
            path.display(),
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn copies_nested_directories() {
        let source = tempdir().expect("source root");
        let nested = source.path().join("config").join("mod");
        fs::create_dir_all(&nested).expect("nested dir");
        fs::write(nested.join("settings.toml"), "a = 1").expect("nested file");
        let destination = tempdir().expect("destination root");
        let target = destination.path().join("copy").join("config");

        copy_entry(&source.path().join("config"), &target).expect("copy succeeds");

        let copied = fs::read_to_string(target.join("mod").join("settings.toml"))
            .expect("copied file");
        assert_eq!(copied, "a = 1");
    }

    #[test]
    fn copies_single_files() {
        let source = tempdir().expect("source root");
        let marker = source.path().join(".pack-version");
        fs::write(&marker, "1.0.0\n").expect("marker");
        let destination = tempdir().expect("destination root");
        let target = destination.path().join(".pack-version");

        copy_entry(&marker, &target).expect("copy succeeds");

        assert_eq!(fs::read_to_string(target).expect("copied"), "1.0.0\n");
    }

    #[test]
    fn missing_source_errors() {
        let source = tempdir().expect("source root");
        let destination = tempdir().expect("destination root");

        let error = copy_entry(&source.path().join("absent"), destination.path())
            .expect_err("missing source should error");

        assert_eq!(error.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn enforces_depth_limit() {
        let source = tempdir().expect("source root");
        let mut current = source.path().join("root");
        for level in 0..=MAX_DIRECTORY_DEPTH {
            current = current.join(format!("level_{level}"));
        }
        fs::create_dir_all(&current).expect("nested dir");

        let destination = tempdir().expect("destination root");
        let error = copy_entry(&source.path().join("root"), &destination.path().join("root"))
            .expect_err("deep nesting should error");

        assert_eq!(error.kind(), io::ErrorKind::InvalidInput);
        assert!(error.to_string().contains(&MAX_DIRECTORY_DEPTH.to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn rejects_symlinks() {
        use std::os::unix::fs::symlink;

        let source = tempdir().expect("source root");
        let tree = source.path().join("mods");
        fs::create_dir(&tree).expect("tree");
        let outside: PathBuf = source.path().join("outside.txt");
        fs::write(&outside, "secret").expect("outside file");
        symlink(&outside, tree.join("link.txt")).expect("symlink");

        let destination = tempdir().expect("destination root");
        let error = copy_entry(&tree, &destination.path().join("mods"))
            .expect_err("symlink should error");

        assert_eq!(error.kind(), io::ErrorKind::InvalidInput);
        assert!(error.to_string().contains("symlink"));
    }

    #[test]
    fn remove_entry_handles_files_directories_and_absence() {
        let root = tempdir().expect("root");
        let dir = root.path().join("mods");
        fs::create_dir_all(dir.join("inner")).expect("dir");
        let file = root.path().join("marker");
        fs::write(&file, "x").expect("file");

        remove_entry(&dir).expect("remove dir");
        remove_entry(&file).expect("remove file");
        remove_entry(&root.path().join("absent")).expect("absent is fine");

        assert!(!dir.exists());
        assert!(!file.exists());
    }
}
