//! Read darshan I/O trace logs and decode their module records.
//!
//! A log is opened with `LogFile::open`; the records of a module (`"POSIX"`, `"MPI-IO"`,
//! `"STDIO"`) are then decoded in one of three shapes:
//!
//! ```no_run
//! use darshan_util::{LogFile, Shape};
//!
//! let mut log = LogFile::open("sample.darshan")?;
//! let rec = log.decode("POSIX", Shape::Named)?;
//! println!("file {} rank {}", rec.id, rec.rank);
//! log.close();
//! # Ok::<(), darshan_util::Error>(())
//! ```
//!
//! Counter names come from the static module registry (`registry.rs`); every decoded
//! record is checked against it. `summary.rs` aggregates records into the numbers shown
//! in job reports.

pub mod error;
pub mod logutils;
pub mod record;
pub mod registry;
pub mod summary;

pub use error::{Error, Result};
pub use logutils::{LogFile, LogWriter};
pub use record::{DecodedRecord, GenericRecord, RecordData, RecordSet, Shape};
pub use registry::{counter_names, fcounter_names, ModuleId};

/// Version of this library, `major.minor.patch`.
pub fn lib_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
