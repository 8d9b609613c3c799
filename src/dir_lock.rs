use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// Process-wide registry of per-directory creation locks.
///
/// Creating a root directory is a check-then-act sequence; callers racing on
/// the same path serialize on that path's lock only, so unrelated roots never
/// contend. Entries are never removed: one per root directory ever used.
pub(crate) struct DirLocks {
  inner: RwLock<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl DirLocks {
  fn new() -> Self {
    Self {
      inner: RwLock::new(HashMap::new()),
    }
  }

  /// The shared registry.
  pub fn global() -> &'static DirLocks {
    static LOCKS: OnceLock<DirLocks> = OnceLock::new();
    LOCKS.get_or_init(DirLocks::new)
  }

  /// Gets the lock for `path`, creating it if it doesn't exist.
  ///
  /// Double-checked: the common case only takes the read lock.
  pub fn get_or_create(&self, path: &Path) -> Arc<Mutex<()>> {
    {
      let map = self.inner.read();
      if let Some(lock) = map.get(path) {
        return lock.clone();
      }
    }

    let mut map = self.inner.write();
    // Another thread may have inserted it while we waited for the write lock.
    if let Some(lock) = map.get(path) {
      return lock.clone();
    }

    let lock = Arc::new(Mutex::new(()));
    map.insert(path.to_path_buf(), lock.clone());
    lock
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_same_path_same_lock() {
    let locks = DirLocks::new();
    let a = locks.get_or_create(Path::new("/tmp/batches"));
    let b = locks.get_or_create(Path::new("/tmp/batches"));
    let c = locks.get_or_create(Path::new("/tmp/other"));

    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));

    // Holding one path's lock doesn't block another path.
    let _held = a.lock();
    assert!(c.try_lock().is_some());
    assert!(b.try_lock().is_none());
  }
}
