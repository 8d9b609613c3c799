use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use tracing::warn;

use crate::error::Result;

/// Default byte placed between two records of a batch file.
pub const DEFAULT_SEPARATOR: u8 = b'\n';

/// Reads and writes separator-delimited records in batch files.
///
/// Records are opaque bytes. A payload that contains the separator will be
/// split on read; choosing a serialization that avoids it is up to the caller.
#[derive(Debug, Clone, Copy)]
pub struct BatchFileHandler {
  separator: u8,
}

impl Default for BatchFileHandler {
  fn default() -> Self {
    Self::new(DEFAULT_SEPARATOR)
  }
}

impl BatchFileHandler {
  pub fn new(separator: u8) -> Self {
    Self { separator }
  }

  pub fn separator(&self) -> u8 {
    self.separator
  }

  /// Appends one record, creating the file if needed.
  pub fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let needs_separator = file.metadata()?.len() > 0;

    let mut buf = Vec::with_capacity(data.len() + 1);
    if needs_separator {
      buf.push(self.separator);
    }
    buf.extend_from_slice(data);

    file.write_all(&buf)?;
    file.flush()?;
    Ok(())
  }

  /// Reads every record of a batch file, oldest first.
  /// A file that no longer exists has no records.
  pub fn read(&self, path: &Path) -> Result<Vec<Vec<u8>>> {
    match fs::read(path) {
      Ok(bytes) => Ok(split_records(&bytes, self.separator)),
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        warn!(target: "ironbatch", "Batch file {} vanished before it could be read", path.display());
        Ok(Vec::new())
      }
      Err(e) => Err(e.into()),
    }
  }

  /// Deletes a batch file once it has been consumed.
  /// Returns `false` if it was already gone.
  pub fn delete(&self, path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
      Ok(()) => Ok(true),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
      Err(e) => Err(e.into()),
    }
  }
}

/// Splits `bytes` around `separator`, dropping empty records.
pub fn split_records(bytes: &[u8], separator: u8) -> Vec<Vec<u8>> {
  bytes
    .split(|&b| b == separator)
    .filter(|record| !record.is_empty())
    .map(|record| record.to_vec())
    .collect()
}

/// Joins records with `separator` between them, wrapped in `prefix` and
/// `suffix`. This is the shape an uploader sends, e.g. `[a,b,c]`.
pub fn join_records<R: AsRef<[u8]>>(records: &[R], separator: &[u8], prefix: &[u8], suffix: &[u8]) -> Vec<u8> {
  let data_size: usize = records.iter().map(|r| r.as_ref().len()).sum();
  let separators_size = separator.len() * records.len().saturating_sub(1);
  let mut out = Vec::with_capacity(prefix.len() + data_size + separators_size + suffix.len());

  out.extend_from_slice(prefix);
  for (i, record) in records.iter().enumerate() {
    if i > 0 {
      out.extend_from_slice(separator);
    }
    out.extend_from_slice(record.as_ref());
  }
  out.extend_from_slice(suffix);
  out
}
