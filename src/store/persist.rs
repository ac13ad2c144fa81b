//! File persistence
//!
//! Saves rewrite the whole file through a sibling temp file that is renamed
//! over the target. Backups are named after the content hash, so backing up
//! the same content twice is a no-op.

use crate::Result;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Number of hex digits of the content hash used in backup names
const HASH_PREFIX_LEN: usize = 8;

/// `<file>.<hash8>.bak` for the given file content
pub fn backup_path(path: &Path, content: &[u8]) -> PathBuf {
    let hash = blake3::hash(content).to_hex();
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".{}.bak", &hash.as_str()[..HASH_PREFIX_LEN]));
    PathBuf::from(name)
}

/// Copy `path` to its backup name unless that backup already exists.
///
/// Returns the backup path, or `None` if `path` does not exist yet.
pub fn backup(path: &Path) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read(path)?;
    let target = backup_path(path, &content);
    if target.exists() {
        tracing::debug!("Backup {} already present", target.display());
    } else {
        fs::write(&target, &content)?;
        tracing::info!("Backed up {} to {}", path.display(), target.display());
    }
    Ok(Some(target))
}

/// Write newline-terminated lines to `path`, replacing it atomically
pub fn write_lines<'a>(path: &Path, lines: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let mut file = fs::File::create(&tmp)?;
    let mut count = 0usize;
    for line in lines {
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        count += 1;
    }
    file.sync_all()?;
    drop(file);
    fs::rename(&tmp, path)?;
    tracing::debug!("Wrote {} lines to {}", count, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_backup_path_uses_content_hash() {
        let a = backup_path(Path::new("/data/egc.tsv"), b"one");
        let b = backup_path(Path::new("/data/egc.tsv"), b"two");
        assert_ne!(a, b);
        let name = a.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("egc.tsv."));
        assert!(name.ends_with(".bak"));
        assert_eq!(name.len(), "egc.tsv.".len() + HASH_PREFIX_LEN + ".bak".len());
    }

    #[test]
    fn test_backup_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.egc");
        fs::write(&path, "D\tncbi:1\n").unwrap();

        let first = backup(&path).unwrap().unwrap();
        let second = backup(&path).unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(fs::read_to_string(&first).unwrap(), "D\tncbi:1\n");

        let backups = fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| e.as_ref().unwrap().path().extension().is_some_and(|x| x == "bak"))
            .count();
        assert_eq!(backups, 1);
    }

    #[test]
    fn test_backup_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(backup(&dir.path().join("absent.egc")).unwrap().is_none());
    }

    #[test]
    fn test_write_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.egc");
        write_lines(&path, ["a", "b"]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\n");
        assert!(!dir.path().join("out.egc.tmp").exists());
    }
}
