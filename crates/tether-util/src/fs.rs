use std::fs;
use std::io;
use std::path::Path;

/// Read a file to string, replacing invalid UTF-8 sequences with the replacement character.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn read_to_string_lossy(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Remove a directory tree if it exists.
///
/// Returns `true` if something was removed, `false` if the path was absent.
/// A symlink at the path is removed as a link, never followed.
///
/// # Errors
/// Returns an error if removal fails for a reason other than the path
/// not existing.
pub fn remove_dir_all_if_exists(path: &Path) -> io::Result<bool> {
    match fs::symlink_metadata(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
        Ok(meta) => {
            if meta.file_type().is_symlink() {
                remove_symlink(path)?;
            } else if meta.is_dir() {
                fs::remove_dir_all(path)?;
            } else {
                fs::remove_file(path)?;
            }
            Ok(true)
        }
    }
}

/// Check whether `link` is a symlink whose target is exactly `target`.
///
/// Returns `false` for missing paths, non-links, and unreadable links.
#[must_use]
pub fn is_symlink_to(link: &Path, target: &Path) -> bool {
    match fs::symlink_metadata(link) {
        Ok(meta) if meta.file_type().is_symlink() => fs::read_link(link)
            .map(|dest| dest == target)
            .unwrap_or(false),
        _ => false,
    }
}

#[cfg(unix)]
fn remove_symlink(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}

#[cfg(windows)]
fn remove_symlink(path: &Path) -> io::Result<()> {
    // Directory junctions present as directories; file symlinks as files.
    if fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false) {
        fs::remove_dir(path)
    } else {
        fs::remove_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_read_to_string_lossy_valid_utf8() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(b"hello world").unwrap();

        let content = read_to_string_lossy(&path).unwrap();
        assert_eq!(content, "hello world");
    }

    #[test]
    fn test_read_to_string_lossy_invalid_utf8() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(&[0x48, 0x65, 0x6c, 0x6c, 0x6f, 0x80, 0x81])
            .unwrap();

        let content = read_to_string_lossy(&path).unwrap();
        assert!(content.starts_with("Hello"));
        assert!(content.contains('\u{FFFD}'));
    }

    #[test]
    fn test_remove_dir_all_if_exists_absent() {
        let dir = tempdir().unwrap();
        let removed = remove_dir_all_if_exists(&dir.path().join("missing")).unwrap();
        assert!(!removed);
    }

    #[test]
    fn test_remove_dir_all_if_exists_tree() {
        let dir = tempdir().unwrap();
        let tree = dir.path().join("pkg");
        fs::create_dir_all(tree.join("nested")).unwrap();
        fs::write(tree.join("nested").join("f.txt"), "x").unwrap();

        let removed = remove_dir_all_if_exists(&tree).unwrap();
        assert!(removed);
        assert!(!tree.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_remove_dir_all_if_exists_symlink_not_followed() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("target");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("keep.txt"), "x").unwrap();

        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let removed = remove_dir_all_if_exists(&link).unwrap();
        assert!(removed);
        assert!(link.symlink_metadata().is_err());
        // Link target untouched
        assert!(target.join("keep.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_is_symlink_to() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("target");
        fs::create_dir_all(&target).unwrap();

        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        assert!(is_symlink_to(&link, &target));
        assert!(!is_symlink_to(&link, &dir.path().join("other")));
        assert!(!is_symlink_to(&target, &target));
        assert!(!is_symlink_to(&dir.path().join("missing"), &target));
    }
}
