use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::error;

/// Raw filesystem primitives used by the orchestrator.
///
/// Implementations report failures as `io::Error`; the orchestrator only
/// ever sees them through [`SafeFs`], which turns every failure into a
/// logged, neutral result.
pub trait Storage: Send + Sync {
  fn exists(&self, path: &Path) -> io::Result<bool>;
  fn is_dir(&self, path: &Path) -> io::Result<bool>;
  fn is_file(&self, path: &Path) -> io::Result<bool>;
  fn is_writable(&self, path: &Path) -> io::Result<bool>;
  fn create_dir_all(&self, path: &Path) -> io::Result<()>;
  /// Full paths of the direct children of `dir`, in no particular order.
  fn list_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
  fn remove_file(&self, path: &Path) -> io::Result<()>;
  fn len(&self, path: &Path) -> io::Result<u64>;
}

/// [`Storage`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

impl Storage for LocalStorage {
  fn exists(&self, path: &Path) -> io::Result<bool> {
    path.try_exists()
  }

  fn is_dir(&self, path: &Path) -> io::Result<bool> {
    Ok(fs::metadata(path)?.is_dir())
  }

  fn is_file(&self, path: &Path) -> io::Result<bool> {
    Ok(fs::metadata(path)?.is_file())
  }

  fn is_writable(&self, path: &Path) -> io::Result<bool> {
    Ok(!fs::metadata(path)?.permissions().readonly())
  }

  fn create_dir_all(&self, path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
  }

  fn list_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut children = Vec::new();
    for entry in fs::read_dir(dir)? {
      children.push(entry?.path());
    }
    Ok(children)
  }

  fn remove_file(&self, path: &Path) -> io::Result<()> {
    fs::remove_file(path)
  }

  fn len(&self, path: &Path) -> io::Result<u64> {
    Ok(fs::metadata(path)?.len())
  }
}

impl<S: Storage + ?Sized> Storage for std::sync::Arc<S> {
  fn exists(&self, path: &Path) -> io::Result<bool> {
    (**self).exists(path)
  }

  fn is_dir(&self, path: &Path) -> io::Result<bool> {
    (**self).is_dir(path)
  }

  fn is_file(&self, path: &Path) -> io::Result<bool> {
    (**self).is_file(path)
  }

  fn is_writable(&self, path: &Path) -> io::Result<bool> {
    (**self).is_writable(path)
  }

  fn create_dir_all(&self, path: &Path) -> io::Result<()> {
    (**self).create_dir_all(path)
  }

  fn list_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
    (**self).list_dir(dir)
  }

  fn remove_file(&self, path: &Path) -> io::Result<()> {
    (**self).remove_file(path)
  }

  fn len(&self, path: &Path) -> io::Result<u64> {
    (**self).len(path)
  }
}

/// The never-failing view over a [`Storage`].
///
/// Every method returns `false`, `0` or an empty list when the underlying
/// call fails, after logging the failure. A missing file and a permission
/// error look the same to the caller.
#[derive(Debug, Clone, Default)]
pub struct SafeFs<S> {
  storage: S,
}

impl<S: Storage> SafeFs<S> {
  pub fn new(storage: S) -> Self {
    Self { storage }
  }

  pub fn exists(&self, path: &Path) -> bool {
    self.storage.exists(path).unwrap_or_else(|e| {
      error!(target: "ironbatch", "Unable to check existence of {}: {}", path.display(), e);
      false
    })
  }

  pub fn is_dir(&self, path: &Path) -> bool {
    self.storage.is_dir(path).unwrap_or_else(|e| {
      error!(target: "ironbatch", "Unable to check whether {} is a directory: {}", path.display(), e);
      false
    })
  }

  /// False, without logging, if the file vanished since it was listed.
  pub fn is_file(&self, path: &Path) -> bool {
    match self.storage.is_file(path) {
      Ok(is_file) => is_file,
      Err(e) if e.kind() == io::ErrorKind::NotFound => false,
      Err(e) => {
        error!(target: "ironbatch", "Unable to check whether {} is a file: {}", path.display(), e);
        false
      }
    }
  }

  pub fn can_write(&self, path: &Path) -> bool {
    self.storage.is_writable(path).unwrap_or_else(|e| {
      error!(target: "ironbatch", "Unable to check write permission of {}: {}", path.display(), e);
      false
    })
  }

  pub fn mkdirs(&self, path: &Path) -> bool {
    match self.storage.create_dir_all(path) {
      Ok(()) => true,
      Err(e) => {
        error!(target: "ironbatch", "Unable to create directory {}: {}", path.display(), e);
        false
      }
    }
  }

  pub fn list_files(&self, dir: &Path) -> Vec<PathBuf> {
    self.storage.list_dir(dir).unwrap_or_else(|e| {
      error!(target: "ironbatch", "Unable to list directory {}: {}", dir.display(), e);
      Vec::new()
    })
  }

  /// Returns true once the file is gone, including when it was already gone.
  pub fn delete(&self, path: &Path) -> bool {
    match self.storage.remove_file(path) {
      Ok(()) => true,
      Err(e) if e.kind() == io::ErrorKind::NotFound => true,
      Err(e) => {
        error!(target: "ironbatch", "Unable to delete file {}: {}", path.display(), e);
        false
      }
    }
  }

  /// Size of the file in bytes; 0 if it vanished or cannot be queried.
  pub fn length(&self, path: &Path) -> u64 {
    match self.storage.len(path) {
      Ok(len) => len,
      Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
      Err(e) => {
        error!(target: "ironbatch", "Unable to read length of {}: {}", path.display(), e);
        0
      }
    }
  }
}
