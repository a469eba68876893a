//! Contains the on-disk structures of a darshan log.
//!
//! In order to parse these structures from a log, please have a look at the functions in
//! parser.rs; writer.rs produces them.

use std::collections::BTreeMap;

use bitflags::*;
pub use nom::number::Endianness;

use crate::registry::{ModuleId, MODULE_IDS};

/// Magic number stored right after the version string, in the byte order of the writer.
pub const MAGIC_NR: i64 = 6567223;

/// Log format version written by this crate.
pub const LOG_VERSION: &str = "3.41";

/// Number of region map slots in the header, whether or not a module uses them.
pub const MAX_MODS: usize = 64;

/// Largest decompressed region a reader accepts (1 GiB).
pub const MAX_REGION_SIZE: u64 = 1 << 30;

pub const VERSION_STRING_LEN: usize = 8;

/// version string, magic, compression + padding, partial flags, name map, module maps,
/// module versions
pub const HEADER_SIZE: usize =
    VERSION_STRING_LEN + 8 + 4 + 4 + LOG_MAP_SIZE + MAX_MODS * LOG_MAP_SIZE + MAX_MODS * 4;

pub const LOG_MAP_SIZE: usize = 16;

/// Length of the NUL padded job metadata field.
pub const JOB_METADATA_LEN: usize = 1024;

/// uid, start_time, end_time, nprocs, jobid and the metadata field.
pub const JOB_SIZE: usize = 5 * 8 + JOB_METADATA_LEN;

/// Location of a region inside the log file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LogMap {
    pub off: u64,
    pub len: u64,
}

impl LogMap {
    pub fn start(&self) -> u64 {
        self.off
    }

    /// One past the last byte of the region, `None` if that does not fit a `u64`.
    pub fn end(&self) -> Option<u64> {
        self.off.checked_add(self.len)
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    Zlib,
    Bzip2,
    None,
    Unknown(u8),
}

impl CompressionType {
    pub fn new(comp_type: u8) -> CompressionType {
        match comp_type {
            0 => CompressionType::Zlib,
            1 => CompressionType::Bzip2,
            2 => CompressionType::None,
            _ => CompressionType::Unknown(comp_type),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match *self {
            CompressionType::Zlib => 0,
            CompressionType::Bzip2 => 1,
            CompressionType::None => 2,
            CompressionType::Unknown(c) => c,
        }
    }
}

bitflags! {
    /// Set of modules, one bit per module id. The header uses it to flag modules that ran
    /// out of memory at runtime and hold partial data.
    pub struct ModuleFlags: u32 {
        const NULL = 1 << 0;
        const POSIX = 1 << 1;
        const MPIIO = 1 << 2;
        const H5F = 1 << 3;
        const H5D = 1 << 4;
        const PNETCDF_FILE = 1 << 5;
        const PNETCDF_VAR = 1 << 6;
        const BGQ = 1 << 7;
        const LUSTRE = 1 << 8;
        const STDIO = 1 << 9;
        const DXT_POSIX = 1 << 10;
        const DXT_MPIIO = 1 << 11;
        const MDHIM = 1 << 12;
        const APXC = 1 << 13;
        const APMPI = 1 << 14;
        const HEATMAP = 1 << 15;
    }
}

impl ModuleFlags {
    pub fn module(id: ModuleId) -> ModuleFlags {
        ModuleFlags::from_bits_truncate(1 << id.index())
    }

    pub fn has_module(&self, id: ModuleId) -> bool {
        self.contains(ModuleFlags::module(id))
    }

    pub fn modules(&self) -> Vec<ModuleId> {
        MODULE_IDS
            .iter()
            .copied()
            .filter(|m| self.has_module(*m))
            .collect()
    }
}

/// Uncompressed header at the start of every log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogHeader {
    pub version: String,
    pub endianness: Endianness,
    pub compression: CompressionType,
    pub partial_flags: ModuleFlags,
    pub name_map: LogMap,
    pub mod_map: Vec<LogMap>,
    pub mod_ver: Vec<u32>,
}

impl LogHeader {
    pub fn module_map(&self, id: ModuleId) -> LogMap {
        self.mod_map[id.index()]
    }

    pub fn module_version(&self, id: ModuleId) -> u32 {
        self.mod_ver[id.index()]
    }

    /// A module is recorded in the log if it registered a version or stored any data.
    pub fn has_module(&self, id: ModuleId) -> bool {
        self.module_version(id) != 0 || !self.module_map(id).is_empty()
    }

    pub fn job_map(&self) -> LogMap {
        let off = HEADER_SIZE as u64;
        LogMap {
            off,
            len: self.name_map.off.saturating_sub(off),
        }
    }
}

/// Job level data stored right after the header.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Job {
    pub uid: i64,
    pub start_time: i64,
    pub end_time: i64,
    pub nprocs: i64,
    pub jobid: i64,
    /// `key=value` pairs recorded by the runtime library (`lib_ver`, `h`, ...).
    pub metadata: BTreeMap<String, String>,
}

/// A file system mounted while the job ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub fs_type: String,
    pub mount_point: String,
}

/// Job data together with the executable line and the mount table that follow it.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct JobRegion {
    pub job: Job,
    pub exe: String,
    pub mounts: Vec<Mount>,
}

/// Maps a record id to the path or name it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRecord {
    pub id: u64,
    pub name: String,
}

/// Per-module entry of a log's module table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub id: ModuleId,
    pub name: &'static str,
    pub version: u32,
    /// Stored (possibly compressed) size of the module region in bytes.
    pub len: u64,
    pub partial: bool,
}
