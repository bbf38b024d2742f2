//! # menucast-observers
//!
//! Scalar observation sinks for training runs.
//!
//! The trainer reports one value per metric per epoch through the
//! [`ScalarObserver`] trait. Two sinks ship with the crate:
//!
//! ## EventFileWriter
//!
//! Appends JSON lines to `events.jsonl` inside a run directory:
//!
//! ```rust,ignore
//! use menucast_observers::{EventFileWriter, ScalarObserver, tags};
//!
//! let mut writer = EventFileWriter::create(&run_dir)?;
//! writer.record(tags::LOSS_TRAIN, 0.42, 1)?;
//! writer.flush()?;
//!
//! let events = menucast_observers::read_events(&run_dir)?;
//! ```
//!
//! ## MemoryObserver
//!
//! Keeps every series in memory, keyed by tag in first-seen order. Useful in
//! tests and notebooks.

pub mod event_file;
pub mod memory;
pub mod observer;

pub use event_file::*;
pub use memory::*;
pub use observer::*;
