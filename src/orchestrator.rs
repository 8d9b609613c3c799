use std::collections::HashSet;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::BatchPolicy;
use crate::cursor::WriteCursor;
use crate::dir_lock::DirLocks;
use crate::error::Result;
use crate::storage::{LocalStorage, SafeFs, Storage};
use crate::util;

/// Decides which batch file a producer appends to and which one a consumer
/// reads next.
///
/// Every operation either returns a usable path or an explicit "nothing
/// available" (`None` / empty). Filesystem failures are logged, never
/// returned.
pub trait FileOrchestrator: Send + Sync {
  /// Returns the file to append a payload of `data_size` bytes to.
  fn get_writable_file(&self, data_size: u64) -> Option<PathBuf>;

  /// Returns the oldest file that is safe to read and not in `exclude`.
  fn get_readable_file(&self, exclude: &HashSet<PathBuf>) -> Option<PathBuf>;

  /// All batch files, oldest first.
  fn get_all_files(&self) -> Vec<PathBuf>;

  /// Files to drain on a forced flush, oldest first. Ignores recency.
  fn get_flushable_files(&self) -> Vec<PathBuf>;

  fn get_root_dir(&self) -> Option<&Path>;
}

/// A batch file as seen in a directory listing.
#[derive(Debug, Clone)]
struct BatchFile {
  path: PathBuf,
  timestamp_ms: u64,
}

/// The [`FileOrchestrator`] for a directory of timestamp-named batch files.
///
/// Before each write it deletes files past `old_file_threshold_ms` and then
/// the oldest files until the directory fits in `max_disk_space`. The newest
/// file is reused only while the in-memory write cursor vouches for its
/// item count; otherwise a new file is allocated.
///
/// Thread-safe: one writer lane and one reader lane may share it through an
/// `Arc`. Two orchestrators over the same directory are not supported.
pub struct BatchFileOrchestrator<S = LocalStorage, C = SystemClock> {
  root_dir: PathBuf,
  policy: BatchPolicy,
  recent_read_delay_ms: u64,
  recent_write_delay_ms: u64,
  fs: SafeFs<S>,
  clock: C,
  cursor: Mutex<WriteCursor>,
}

impl BatchFileOrchestrator {
  /// Creates an orchestrator over `root_dir` using the local filesystem and
  /// the system clock. The directory is created lazily on first use.
  pub fn new(root_dir: impl Into<PathBuf>, policy: BatchPolicy) -> Result<Self> {
    Self::with_parts(root_dir, policy, LocalStorage, SystemClock)
  }
}

impl<S: Storage, C: Clock> BatchFileOrchestrator<S, C> {
  pub fn with_parts(root_dir: impl Into<PathBuf>, policy: BatchPolicy, storage: S, clock: C) -> Result<Self> {
    policy.validate()?;

    Ok(Self {
      root_dir: root_dir.into(),
      recent_read_delay_ms: policy.recent_read_delay_ms(),
      recent_write_delay_ms: policy.recent_write_delay_ms(),
      policy,
      fs: SafeFs::new(storage),
      clock,
      cursor: Mutex::new(WriteCursor::new()),
    })
  }

  pub fn policy(&self) -> &BatchPolicy {
    &self.policy
  }

  /// The configured root, whether or not it is currently usable.
  pub fn root_path(&self) -> &Path {
    &self.root_dir
  }

  /// See [`FileOrchestrator::get_writable_file`].
  ///
  /// Payloads above `max_item_size` are refused; the caller drops them.
  /// The returned file may not exist yet: it is created by the first append.
  pub fn get_writable_file(&self, data_size: u64) -> Option<PathBuf> {
    if !self.is_root_dir_valid() {
      return None;
    }

    if data_size > self.policy.max_item_size {
      error!(
        target: "ironbatch",
        "Can't write data with size {} (max item size is {})",
        data_size, self.policy.max_item_size
      );
      return None;
    }

    let now = self.clock.now_ms();
    self.delete_obsolete_files(now);
    self.free_space_if_needed();

    let mut cursor = self.cursor.lock();
    let files = self.list_sorted_batch_files();

    if let Some(file) = self.reusable_writable_file(&files, &mut cursor, data_size, now) {
      return Some(file);
    }

    Some(self.create_new_file(&mut cursor, now))
  }

  /// See [`FileOrchestrator::get_readable_file`].
  ///
  /// A returned file can still vanish before it is opened (retention or
  /// reclamation on the writer lane); treat that as nothing to read.
  pub fn get_readable_file(&self, exclude: &HashSet<PathBuf>) -> Option<PathBuf> {
    if !self.is_root_dir_valid() {
      return None;
    }

    let now = self.clock.now_ms();
    self.delete_obsolete_files(now);

    self
      .list_sorted_batch_files()
      .into_iter()
      .find(|file| !exclude.contains(&file.path) && !is_recent(file.timestamp_ms, self.recent_read_delay_ms, now))
      .map(|file| file.path)
  }

  pub fn get_all_files(&self) -> Vec<PathBuf> {
    if !self.is_root_dir_valid() {
      return Vec::new();
    }

    self.list_sorted_batch_files().into_iter().map(|file| file.path).collect()
  }

  pub fn get_flushable_files(&self) -> Vec<PathBuf> {
    self.get_all_files()
  }

  /// The root directory, if it exists (or could be created) and is writable.
  pub fn get_root_dir(&self) -> Option<&Path> {
    if !self.is_root_dir_valid() {
      return None;
    }

    Some(self.root_dir.as_path())
  }

  // --- Internals ---

  /// Re-checked on every call: the directory can be removed underneath us.
  fn is_root_dir_valid(&self) -> bool {
    if self.fs.exists(&self.root_dir) {
      if !self.fs.is_dir(&self.root_dir) {
        error!(target: "ironbatch", "The provided root file is not a directory: {}", self.root_dir.display());
        return false;
      }
      if !self.fs.can_write(&self.root_dir) {
        error!(target: "ironbatch", "The provided root dir is not writable: {}", self.root_dir.display());
        return false;
      }
      return true;
    }

    let lock = DirLocks::global().get_or_create(&self.root_dir);
    let _guard = lock.lock();

    // Another caller may have created it while we waited.
    if self.fs.exists(&self.root_dir) {
      return true;
    }

    if self.fs.mkdirs(&self.root_dir) {
      true
    } else {
      error!(target: "ironbatch", "The provided root file can't be created: {}", self.root_dir.display());
      false
    }
  }

  fn reusable_writable_file(
    &self,
    files: &[BatchFile],
    cursor: &mut WriteCursor,
    data_size: u64,
    now: u64,
  ) -> Option<PathBuf> {
    // Files named further ahead than the write window come from a clock
    // jump; they age on their own and are never written to.
    let horizon = now.saturating_add(self.recent_write_delay_ms);
    let last_file = files.iter().rev().find(|file| file.timestamp_ms <= horizon)?;

    // The newest file can be from a previous session, from another writer,
    // or the file we last handed out may have been deleted. In any of those
    // cases the item count is unknown, so don't reuse.
    if !cursor.is_tracking(&last_file.path) {
      return None;
    }

    let is_recent_enough = is_recent(last_file.timestamp_ms, self.recent_write_delay_ms, now);
    let has_room_for_more = self.fs.length(&last_file.path).saturating_add(data_size) < self.policy.max_batch_size;
    let has_slot_for_more = cursor.item_count() < self.policy.max_items_per_batch;

    if is_recent_enough && has_room_for_more && has_slot_for_more {
      cursor.record_reuse();
      Some(last_file.path.clone())
    } else {
      None
    }
  }

  /// Names the file after `now`, stepping past names that are already taken.
  fn create_new_file(&self, cursor: &mut WriteCursor, now: u64) -> PathBuf {
    let mut timestamp_ms = cursor.next_timestamp(now, self.recent_write_delay_ms);
    let mut path = self.root_dir.join(util::batch_filename(timestamp_ms));
    while timestamp_ms < u64::MAX && self.fs.exists(&path) {
      timestamp_ms += 1;
      path = self.root_dir.join(util::batch_filename(timestamp_ms));
    }
    debug!(target: "ironbatch", "Starting new batch file {}", path.display());
    cursor.reset(path.clone(), timestamp_ms);
    path
  }

  /// Deletes every file whose age reached `old_file_threshold_ms`, read or
  /// not. Returns the number of files deleted.
  fn delete_obsolete_files(&self, now: u64) -> usize {
    let Some(threshold) = now.checked_sub(self.policy.old_file_threshold_ms) else {
      return 0;
    };

    let mut deleted = 0;
    for file in self.list_sorted_batch_files() {
      if file.timestamp_ms > threshold {
        // Sorted oldest first.
        break;
      }
      if self.fs.delete(&file.path) {
        debug!(target: "ironbatch", "Deleted obsolete batch file {}", file.path.display());
        deleted += 1;
      } else {
        warn!(target: "ironbatch", "Failed to delete obsolete batch file {}", file.path.display());
      }
    }
    deleted
  }

  /// Deletes the oldest files until the directory fits in `max_disk_space`.
  ///
  /// A failed deletion frees nothing and the sweep moves on to the next
  /// file, so repeated failures can leave the directory over quota.
  /// Returns the bytes still over quota afterwards.
  fn free_space_if_needed(&self) -> u64 {
    let files: Vec<(BatchFile, u64)> = self
      .list_sorted_batch_files()
      .into_iter()
      .map(|file| {
        let len = self.fs.length(&file.path);
        (file, len)
      })
      .collect();

    let size_on_disk: u64 = files.iter().map(|(_, len)| len).sum();
    let max_disk_space = self.policy.max_disk_space;
    if size_on_disk <= max_disk_space {
      return 0;
    }

    let size_to_free = size_on_disk - max_disk_space;
    error!(
      target: "ironbatch",
      "Too much disk space used ({}/{}): cleaning up to free {} bytes",
      size_on_disk, max_disk_space, size_to_free
    );

    let mut remaining = size_to_free;
    for (file, len) in &files {
      if remaining == 0 {
        break;
      }
      if self.fs.delete(&file.path) {
        debug!(target: "ironbatch", "Deleted batch file {} ({} bytes) to free space", file.path.display(), len);
        remaining = remaining.saturating_sub(*len);
      } else {
        warn!(target: "ironbatch", "Failed to delete batch file {} while freeing space", file.path.display());
      }
    }

    if remaining > 0 {
      warn!(
        target: "ironbatch",
        "Disk space still over quota after cleanup: before {}, after {}, target {}",
        size_on_disk,
        max_disk_space + remaining,
        max_disk_space
      );
    }
    remaining
  }

  fn list_sorted_batch_files(&self) -> Vec<BatchFile> {
    let mut files: Vec<BatchFile> = self
      .fs
      .list_files(&self.root_dir)
      .into_iter()
      .filter(|path| {
        path
          .file_name()
          .and_then(|name| name.to_str())
          .is_some_and(util::is_batch_file_name)
      })
      .filter(|path| self.fs.is_file(path))
      .map(|path| {
        let timestamp_ms = path
          .file_name()
          .and_then(|name| name.to_str())
          .map(util::parse_batch_timestamp)
          .unwrap_or(0);
        BatchFile { path, timestamp_ms }
      })
      .collect();

    files.sort_by(|a, b| a.timestamp_ms.cmp(&b.timestamp_ms).then_with(|| a.path.cmp(&b.path)));
    files
  }
}

impl<S: Storage, C: Clock> FileOrchestrator for BatchFileOrchestrator<S, C> {
  fn get_writable_file(&self, data_size: u64) -> Option<PathBuf> {
    BatchFileOrchestrator::get_writable_file(self, data_size)
  }

  fn get_readable_file(&self, exclude: &HashSet<PathBuf>) -> Option<PathBuf> {
    BatchFileOrchestrator::get_readable_file(self, exclude)
  }

  fn get_all_files(&self) -> Vec<PathBuf> {
    BatchFileOrchestrator::get_all_files(self)
  }

  fn get_flushable_files(&self) -> Vec<PathBuf> {
    BatchFileOrchestrator::get_flushable_files(self)
  }

  fn get_root_dir(&self) -> Option<&Path> {
    BatchFileOrchestrator::get_root_dir(self)
  }
}

/// A file is recent while its timestamp is within `delay_ms` of `now`.
fn is_recent(timestamp_ms: u64, delay_ms: u64, now: u64) -> bool {
  timestamp_ms >= now.saturating_sub(delay_ms)
}
