//! Reading and writing darshan logs.
//!
//!   * `log_format.rs` -- the on-disk structures
//!   * `parser.rs` -- nom parsers for them
//!   * `log_file.rs` -- `LogFile`, an opened log
//!   * `writer.rs` -- `LogWriter`, produces logs

pub mod log_file;
pub mod log_format;
pub mod parser;
pub mod writer;

pub use self::log_file::{LogFile, RecordCursor};
pub use self::log_format::{
    CompressionType, Endianness, Job, LogHeader, LogMap, ModuleFlags, ModuleInfo, Mount,
};
pub use self::writer::LogWriter;
