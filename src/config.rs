use crate::error::{Error, Result};

/// Thresholds driving write-target reuse, read eligibility, retention and
/// disk quota enforcement.
///
/// Loaded once by the host and shared by value; the orchestrator never
/// mutates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BatchPolicy {
  /// Largest single payload accepted into a batch, in bytes.
  /// Larger payloads are rejected, never truncated.
  /// Default: 512 KB.
  pub max_item_size: u64,

  /// Maximum number of payloads handed out for one batch file.
  /// Default: 500.
  pub max_items_per_batch: u64,

  /// A batch file is reused only while `len + payload < max_batch_size`.
  /// Default: 4 MB.
  pub max_batch_size: u64,

  /// Upper bound for the combined size of all batch files in the root
  /// directory. Enforced before every write by deleting the oldest files.
  /// Default: 128 MB.
  pub max_disk_space: u64,

  /// Age after which a batch file is deleted whether it was read or not.
  /// Default: 18 hours.
  pub old_file_threshold_ms: u64,

  /// Base window separating "still being appended to" from "safe to read".
  /// See [`BatchPolicy::recent_read_delay_ms`] and
  /// [`BatchPolicy::recent_write_delay_ms`].
  /// Default: 5 seconds.
  pub recent_delay_ms: u64,
}

impl Default for BatchPolicy {
  fn default() -> Self {
    Self {
      max_item_size: 512 * 1024, // 512 KB
      max_items_per_batch: 500,
      max_batch_size: 4 * 1024 * 1024, // 4 MB
      max_disk_space: 128 * 1024 * 1024, // 128 MB
      old_file_threshold_ms: 18 * 60 * 60 * 1000, // 18 h
      recent_delay_ms: 5_000,
    }
  }
}

impl BatchPolicy {
  /// A file younger than this is never handed to a reader.
  ///
  /// Offset by +5% of `recent_delay_ms` so that it always outlasts the
  /// write window: a writer stops reusing a file before a reader may pick it.
  pub fn recent_read_delay_ms(&self) -> u64 {
    (self.recent_delay_ms as f64 * 1.05) as u64
  }

  /// A file younger than this may still be reused for appending (-5%).
  pub fn recent_write_delay_ms(&self) -> u64 {
    (self.recent_delay_ms as f64 * 0.95) as u64
  }

  /// Checks that the thresholds are coherent with each other.
  pub fn validate(&self) -> Result<()> {
    if self.max_item_size == 0 {
      return Err(Error::Config("max_item_size must be greater than 0".into()));
    }
    if self.max_items_per_batch == 0 {
      return Err(Error::Config("max_items_per_batch must be greater than 0".into()));
    }
    if self.max_batch_size == 0 {
      return Err(Error::Config("max_batch_size must be greater than 0".into()));
    }
    if self.max_item_size > self.max_batch_size {
      return Err(Error::Config(format!(
        "max_item_size ({}) exceeds max_batch_size ({})",
        self.max_item_size, self.max_batch_size
      )));
    }
    if self.max_batch_size > self.max_disk_space {
      return Err(Error::Config(format!(
        "max_batch_size ({}) exceeds max_disk_space ({})",
        self.max_batch_size, self.max_disk_space
      )));
    }
    if self.old_file_threshold_ms == 0 {
      return Err(Error::Config("old_file_threshold_ms must be greater than 0".into()));
    }
    Ok(())
  }
}
