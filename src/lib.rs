//! # IronBatch
//!
//! `ironbatch` is the local durable buffer of a telemetry client. Producers
//! append serialized events to batch files in a root directory; an uploader
//! later picks finished batches up, oldest first.
//!
//! The [`BatchFileOrchestrator`] decides, on every call, which file to
//! append to and which file is safe to read, and enforces the retention and
//! disk quota policy along the way.
//!
//! ## Key Features
//!
//! * **Bounded batches**: A file is reused only while it is recent, under
//!   `max_batch_size` and under `max_items_per_batch`.
//! * **Safe hand-off**: Readers only see files older than the write window
//!   (+5% / -5% around `recent_delay_ms`).
//! * **Retention**: Files older than `old_file_threshold_ms` are deleted.
//! * **Disk quota**: Oldest files go first once `max_disk_space` is exceeded.
//! * **Degrade, don't fail**: Filesystem errors are logged through `tracing`
//!   and surface as `None` / empty results.
//!
//! ## Example
//!
//! ```no_run
//! use std::collections::HashSet;
//! use ironbatch::{BatchFileHandler, BatchFileOrchestrator, BatchPolicy};
//!
//! # fn main() -> ironbatch::Result<()> {
//! let orchestrator = BatchFileOrchestrator::new("./batches", BatchPolicy::default())?;
//! let handler = BatchFileHandler::default();
//!
//! // Producer lane
//! let event = br#"{"type":"view"}"#;
//! if let Some(file) = orchestrator.get_writable_file(event.len() as u64) {
//!   handler.write(&file, event)?;
//! }
//!
//! // Uploader lane
//! if let Some(file) = orchestrator.get_readable_file(&HashSet::new()) {
//!   let events = handler.read(&file)?;
//!   // ... upload `events`, then:
//!   handler.delete(&file)?;
//! }
//! # Ok(())
//! # }
//! ```

mod batch;
mod clock;
mod config;
mod cursor;
mod dir_lock;
mod error;
mod orchestrator;
mod storage;
mod util;

// Re-exports for the flat public API
pub use batch::{BatchFileHandler, DEFAULT_SEPARATOR, join_records, split_records};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::BatchPolicy;
pub use error::{Error, Result};
pub use orchestrator::{BatchFileOrchestrator, FileOrchestrator};
pub use storage::{LocalStorage, SafeFs, Storage};
pub use util::{batch_filename, is_batch_file_name, parse_batch_timestamp};
