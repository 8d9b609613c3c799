#![allow(dead_code)]

use ironbatch::{BatchFileHandler, BatchFileOrchestrator, BatchPolicy, LocalStorage, ManualClock, Storage};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// 2023-11-14T22:13:20Z, a realistic epoch-millis value.
pub const START_MS: u64 = 1_700_000_000_000;

pub type TestOrchestrator = BatchFileOrchestrator<Arc<FaultyStorage>, Arc<ManualClock>>;

/// Local storage whose deletions can be made to fail for chosen files.
#[derive(Default)]
pub struct FaultyStorage {
  undeletable: Mutex<HashSet<PathBuf>>,
}

impl FaultyStorage {
  pub fn fail_deletes_of(&self, path: &Path) {
    self.undeletable.lock().insert(path.to_path_buf());
  }

  pub fn heal(&self) {
    self.undeletable.lock().clear();
  }
}

impl Storage for FaultyStorage {
  fn exists(&self, path: &Path) -> io::Result<bool> {
    LocalStorage.exists(path)
  }
  fn is_dir(&self, path: &Path) -> io::Result<bool> {
    LocalStorage.is_dir(path)
  }
  fn is_file(&self, path: &Path) -> io::Result<bool> {
    LocalStorage.is_file(path)
  }
  fn is_writable(&self, path: &Path) -> io::Result<bool> {
    LocalStorage.is_writable(path)
  }
  fn create_dir_all(&self, path: &Path) -> io::Result<()> {
    LocalStorage.create_dir_all(path)
  }
  fn list_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
    LocalStorage.list_dir(dir)
  }
  fn remove_file(&self, path: &Path) -> io::Result<()> {
    if self.undeletable.lock().contains(path) {
      return Err(io::Error::new(io::ErrorKind::PermissionDenied, "file is held open"));
    }
    LocalStorage.remove_file(path)
  }
  fn len(&self, path: &Path) -> io::Result<u64> {
    LocalStorage.len(path)
  }
}

pub struct TestEnv {
  pub orch: TestOrchestrator,
  pub clock: Arc<ManualClock>,
  pub storage: Arc<FaultyStorage>,
  pub handler: BatchFileHandler,
  pub policy: BatchPolicy,
  // The TempDir guard must be kept alive to prevent premature deletion of the directory.
  pub _dir: TempDir,
  pub root: PathBuf,
}

impl TestEnv {
  pub fn new(policy: BatchPolicy) -> Self {
    let dir = tempfile::tempdir().unwrap();
    // Not created up front: the orchestrator creates it on first use.
    let root = dir.path().join("batches");
    let clock = Arc::new(ManualClock::new(START_MS));
    let storage = Arc::new(FaultyStorage::default());

    let orch = BatchFileOrchestrator::with_parts(&root, policy, storage.clone(), clock.clone()).unwrap();

    Self {
      orch,
      clock,
      storage,
      handler: BatchFileHandler::default(),
      policy,
      _dir: dir,
      root,
    }
  }

  pub fn with_default() -> Self {
    Self::new(scenario_policy())
  }

  /// A fresh orchestrator over the same directory, as after a process restart.
  pub fn restart(&mut self) {
    self.orch =
      BatchFileOrchestrator::with_parts(&self.root, self.policy, self.storage.clone(), self.clock.clone()).unwrap();
  }

  /// Asks for a target and appends exactly `size` raw bytes to it.
  pub fn write(&self, size: u64) -> PathBuf {
    let file = self.orch.get_writable_file(size).expect("no writable file");
    append_raw(&file, size);
    file
  }

  /// Creates a batch file named `timestamp_ms` holding `size` bytes.
  pub fn seed_file(&self, timestamp_ms: u64, size: u64) -> PathBuf {
    fs::create_dir_all(&self.root).unwrap();
    let path = self.root.join(timestamp_ms.to_string());
    fs::write(&path, vec![b'x'; size as usize]).unwrap();
    path
  }

  pub fn files_on_disk(&self) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = match fs::read_dir(&self.root) {
      Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
      Err(_) => Vec::new(),
    };
    files.sort();
    files
  }

  pub fn disk_usage(&self) -> u64 {
    self.files_on_disk().iter().map(|p| fs::metadata(p).map(|m| m.len()).unwrap_or(0)).sum()
  }
}

pub fn append_raw(path: &Path, size: u64) {
  let mut file = OpenOptions::new().create(true).append(true).open(path).unwrap();
  file.write_all(&vec![b'x'; size as usize]).unwrap();
}

/// The thresholds used throughout the behavioral scenarios.
pub fn scenario_policy() -> BatchPolicy {
  BatchPolicy {
    max_item_size: 1_000,
    max_items_per_batch: 3,
    max_batch_size: 5_000,
    max_disk_space: 100_000,
    old_file_threshold_ms: 10_000,
    recent_delay_ms: 1_000,
  }
}
