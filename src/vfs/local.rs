//! Local filesystem entries.
//!
//! Thin handles over `std::fs`. Canonicalization goes through `dunce` so
//! Windows paths come back without the verbatim prefix; timestamps are set
//! with `filetime`. Metadata preservation copies the access/modification
//! times and, on Unix, the permission bits.

use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use filetime::FileTime;

use super::{FileOp, VfsEntry, validate_child_name};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEntry {
    path: PathBuf,
}

impl LocalEntry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl VfsEntry for LocalEntry {
    fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    fn path(&self) -> PathBuf {
        self.path.clone()
    }

    fn canonical_path(&self) -> PathBuf {
        dunce::canonicalize(&self.path).unwrap_or_else(|_| self.path.clone())
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn is_dir(&self) -> bool {
        self.path.is_dir()
    }

    fn size(&self) -> u64 {
        fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }

    fn modified_ms(&self) -> i64 {
        fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }

    fn parent(&self) -> Option<Self> {
        self.path.parent().map(Self::new)
    }

    fn child(&self, name: &str) -> io::Result<Self> {
        validate_child_name(name)?;
        Ok(Self::new(self.path.join(name)))
    }

    fn children(&self) -> io::Result<Vec<Self>> {
        let mut entries: Vec<Self> = fs::read_dir(&self.path)?
            .collect::<io::Result<Vec<_>>>()?
            .into_iter()
            .map(|e| Self::new(e.path()))
            .collect();
        entries.sort_by_key(|e| e.path());
        Ok(entries)
    }

    fn supports(&self, _op: FileOp) -> bool {
        true
    }

    #[cfg(unix)]
    fn is_same_entry(&self, other: &Self) -> bool {
        use std::os::unix::fs::MetadataExt;
        match (fs::metadata(&self.path), fs::metadata(&other.path)) {
            (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
            _ => false,
        }
    }

    fn open_read(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(fs::File::open(&self.path)?))
    }

    fn open_write(&self, append: bool) -> io::Result<Box<dyn Write + Send>> {
        let mut opts = OpenOptions::new();
        if append {
            opts.append(true).create(true);
        } else {
            opts.write(true).create(true).truncate(true);
        }
        Ok(Box::new(opts.open(&self.path)?))
    }

    fn mkdir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.path)
    }

    fn delete(&self) -> io::Result<()> {
        if self.path.is_dir() {
            fs::remove_dir(&self.path)
        } else {
            fs::remove_file(&self.path)
        }
    }

    fn rename_to(&self, dest: &Self) -> io::Result<()> {
        fs::rename(&self.path, &dest.path)
    }

    fn set_modified_ms(&self, ms: i64) -> io::Result<()> {
        let mtime = FileTime::from_unix_time(ms.div_euclid(1000), (ms.rem_euclid(1000) * 1_000_000) as u32);
        filetime::set_file_mtime(&self.path, mtime)
    }

    fn preserve_metadata_from(&self, source: &Self) -> io::Result<()> {
        preserve_times(&source.path, &self.path)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let (Ok(src_meta), Ok(dest_meta)) = (fs::metadata(&source.path), fs::metadata(&self.path)) {
                let mut perms = dest_meta.permissions();
                perms.set_mode(src_meta.permissions().mode() & 0o777);
                let _ = fs::set_permissions(&self.path, perms);
            }
        }

        Ok(())
    }
}

fn preserve_times(src: &Path, dest: &Path) -> io::Result<()> {
    let meta = fs::metadata(src)?;

    #[cfg(unix)]
    let (atime, mtime) = {
        use std::os::unix::fs::MetadataExt;
        (
            Some(FileTime::from_unix_time(meta.atime(), meta.atime_nsec() as u32)),
            Some(FileTime::from_unix_time(meta.mtime(), meta.mtime_nsec() as u32)),
        )
    };

    #[cfg(not(unix))]
    let (atime, mtime) = (
        meta.accessed().ok().map(FileTime::from_system_time),
        meta.modified().ok().map(FileTime::from_system_time),
    );

    if let (Some(at), Some(mt)) = (atime, mtime) {
        // Best-effort: a filesystem refusing utimes must not fail the copy.
        let _ = filetime::set_file_times(dest, at, mt);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn child_rejects_traversal_names() {
        let dir = tempdir().unwrap();
        let entry = LocalEntry::new(dir.path());
        assert!(entry.child("..").is_err());
        assert!(entry.child("a/b").is_err());
        assert!(entry.child("ok.txt").is_ok());
    }

    #[test]
    fn size_and_existence_track_the_filesystem() {
        let dir = tempdir().unwrap();
        let entry = LocalEntry::new(dir.path()).child("f.bin").unwrap();
        assert!(!entry.exists());
        fs::write(entry.path(), b"12345").unwrap();
        assert!(entry.exists());
        assert_eq!(entry.size(), 5);
    }

    #[test]
    fn open_write_append_keeps_existing_bytes() {
        let dir = tempdir().unwrap();
        let entry = LocalEntry::new(dir.path().join("log.txt"));
        fs::write(entry.path(), b"one").unwrap();
        {
            let mut w = entry.open_write(true).unwrap();
            w.write_all(b"two").unwrap();
            w.flush().unwrap();
        }
        assert_eq!(fs::read(entry.path()).unwrap(), b"onetwo");
    }

    #[cfg(unix)]
    #[test]
    fn hard_links_are_the_same_entry() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::write(&a, b"x").unwrap();
        fs::hard_link(&a, &b).unwrap();
        assert!(LocalEntry::new(&a).is_same_entry(&LocalEntry::new(&b)));
    }
}
