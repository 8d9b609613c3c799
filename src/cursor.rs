use std::path::{Path, PathBuf};

/// In-memory record of the file last handed out for writing.
///
/// Never persisted. `item_count` is only meaningful while `last_file` is the
/// newest batch file on disk; any mismatch means the count is unknown.
#[derive(Debug, Clone, Default)]
pub(crate) struct WriteCursor {
  last_file: Option<PathBuf>,
  item_count: u64,
  /// Timestamp of the most recent allocation, kept to make names unique.
  last_allocated_ms: u64,
}

impl WriteCursor {
  pub fn new() -> Self {
    Self::default()
  }

  /// True if `file` is exactly the file this cursor counted items for.
  pub fn is_tracking(&self, file: &Path) -> bool {
    self.last_file.as_deref() == Some(file)
  }

  pub fn item_count(&self) -> u64 {
    self.item_count
  }

  pub fn record_reuse(&mut self) {
    self.item_count += 1;
  }

  /// Base timestamp for a new file: `now_ms`, unless the previous
  /// allocation is at or ahead of it by at most `window_ms` (several files in
  /// one millisecond, or a small clock step back). The caller still has to
  /// step past names already taken on disk.
  pub fn next_timestamp(&self, now_ms: u64, window_ms: u64) -> u64 {
    match self.last_allocated_ms.checked_sub(now_ms) {
      Some(ahead) if self.last_file.is_some() && ahead <= window_ms => self.last_allocated_ms.saturating_add(1),
      _ => now_ms,
    }
  }

  /// Starts tracking a freshly allocated file holding its first item.
  pub fn reset(&mut self, file: PathBuf, timestamp_ms: u64) {
    self.last_file = Some(file);
    self.item_count = 1;
    self.last_allocated_ms = timestamp_ms;
  }
}
