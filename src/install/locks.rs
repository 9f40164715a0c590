use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// One async mutex per version directory, shared by the loads of a process.
///
/// Holders re-check the installed state after acquiring; across processes
/// the worker's rename settles who wins. Callers drop their handle and call
/// [`InstallLocks::release`] when done, so idle directories leave the map.
#[derive(Debug, Default)]
pub struct InstallLocks {
    locks: Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl InstallLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, version_dir: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(version_dir.to_path_buf())
            .or_default()
            .clone()
    }

    /// Forget the lock for `version_dir` once nobody else holds a handle.
    pub fn release(&self, version_dir: &Path) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks
            .get(version_dir)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(version_dir);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_directory_shares_a_lock() {
        let locks = InstallLocks::new();
        let a = locks.lock_for(Path::new("/root/versions/1.0.0"));
        let b = locks.lock_for(Path::new("/root/versions/1.0.0"));
        let c = locks.lock_for(Path::new("/root/versions/2.0.0"));

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_release_drops_idle_entries_only() {
        let locks = InstallLocks::new();
        let dir = Path::new("/root/versions/1.0.0");

        let first = locks.lock_for(dir);
        let second = locks.lock_for(dir);
        drop(first);
        locks.release(dir);
        assert!(!locks.is_empty());

        drop(second);
        locks.release(dir);
        assert!(locks.is_empty());

        // Releasing an unknown directory is a no-op
        locks.release(Path::new("/root/versions/2.0.0"));
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_lock_is_exclusive() {
        let locks = InstallLocks::new();
        let lock = locks.lock_for(Path::new("/root/versions/1.0.0"));
        let _guard = lock.lock().await;

        let again = locks.lock_for(Path::new("/root/versions/1.0.0"));
        assert!(again.try_lock().is_err());
    }
}
