use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// An advisory `flock(2)` lock guarding a single document.
///
/// The lock lives in a sibling file named `<document>.lock`, created on first
/// acquisition and never deleted. The lock is released when the guard drops.
pub struct FileLock {
    lock_path: PathBuf,
}

/// RAII guard that releases the flock when dropped.
pub struct FileLockGuard {
    file: File,
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl FileLock {
    pub fn for_document(document: &Path) -> Self {
        let mut name = document
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        Self {
            lock_path: document.with_file_name(name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }

    fn open(&self) -> Result<File, crate::Error> {
        if let Some(parent) = self.lock_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)?)
    }

    /// Acquire an exclusive (writer) lock. Blocks until available.
    pub fn lock_exclusive(&self) -> Result<FileLockGuard, crate::Error> {
        let file = self.open()?;
        FileExt::lock_exclusive(&file)?;
        Ok(FileLockGuard { file })
    }

    /// Acquire a shared (reader) lock. Blocks only while an exclusive lock is held.
    pub fn lock_shared(&self) -> Result<FileLockGuard, crate::Error> {
        let file = self.open()?;
        FileExt::lock_shared(&file)?;
        Ok(FileLockGuard { file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_file_sits_next_to_document() {
        let dir = tempfile::tempdir().unwrap();
        let lock = FileLock::for_document(&dir.path().join("nested").join("notes.json"));
        assert_eq!(lock.path(), dir.path().join("nested").join("notes.json.lock"));

        let guard = lock.lock_exclusive().unwrap();
        assert!(lock.path().exists());
        drop(guard);

        let _shared = lock.lock_shared().unwrap();
    }
}
