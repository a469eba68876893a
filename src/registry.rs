//! The module registry: which instrumentation modules exist, and for the ones we can
//! decode, the ordered list of counter and fcounter names that make up a record.
//!
//! The tables are plain `'static` data; record layouts in a log are aligned
//! positionally with these lists.

use crate::error::{Error, Result};

/// Identifier of an instrumentation module, as used to index the header's region maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ModuleId {
    Null = 0,
    Posix = 1,
    MpiIo = 2,
    H5F = 3,
    H5D = 4,
    PnetcdfFile = 5,
    PnetcdfVar = 6,
    Bgq = 7,
    Lustre = 8,
    Stdio = 9,
    DxtPosix = 10,
    DxtMpiIo = 11,
    Mdhim = 12,
    Apxc = 13,
    Apmpi = 14,
    Heatmap = 15,
}

/// Every module id, in id order.
pub const MODULE_IDS: [ModuleId; 16] = [
    ModuleId::Null,
    ModuleId::Posix,
    ModuleId::MpiIo,
    ModuleId::H5F,
    ModuleId::H5D,
    ModuleId::PnetcdfFile,
    ModuleId::PnetcdfVar,
    ModuleId::Bgq,
    ModuleId::Lustre,
    ModuleId::Stdio,
    ModuleId::DxtPosix,
    ModuleId::DxtMpiIo,
    ModuleId::Mdhim,
    ModuleId::Apxc,
    ModuleId::Apmpi,
    ModuleId::Heatmap,
];

impl ModuleId {
    pub fn new(index: usize) -> Option<ModuleId> {
        MODULE_IDS.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            ModuleId::Null => "NULL",
            ModuleId::Posix => "POSIX",
            ModuleId::MpiIo => "MPI-IO",
            ModuleId::H5F => "H5F",
            ModuleId::H5D => "H5D",
            ModuleId::PnetcdfFile => "PNETCDF_FILE",
            ModuleId::PnetcdfVar => "PNETCDF_VAR",
            ModuleId::Bgq => "BG/Q",
            ModuleId::Lustre => "LUSTRE",
            ModuleId::Stdio => "STDIO",
            ModuleId::DxtPosix => "DXT_POSIX",
            ModuleId::DxtMpiIo => "DXT_MPIIO",
            ModuleId::Mdhim => "MDHIM",
            ModuleId::Apxc => "APXC",
            ModuleId::Apmpi => "APMPI",
            ModuleId::Heatmap => "HEATMAP",
        }
    }

    pub fn from_name(name: &str) -> Option<ModuleId> {
        MODULE_IDS.iter().copied().find(|m| m.name() == name)
    }

    /// Record schema for this module, if we ship one.
    pub fn schema(self) -> Option<&'static ModuleSchema> {
        SCHEMAS.iter().find(|s| s.id == self)
    }
}

/// Fixed record layout of one module.
#[derive(Debug)]
pub struct ModuleSchema {
    pub id: ModuleId,
    pub name: &'static str,
    /// Module format version this layout corresponds to.
    pub version: u32,
    pub counters: &'static [&'static str],
    pub fcounters: &'static [&'static str],
}

impl ModuleSchema {
    /// Size of one encoded record: the base record (id, rank) plus both counter arrays.
    pub fn record_size(&self) -> usize {
        BASE_RECORD_SIZE + 8 * self.counters.len() + 8 * self.fcounters.len()
    }

    pub fn counter_index(&self, name: &str) -> Option<usize> {
        self.counters.iter().position(|c| *c == name)
    }

    pub fn fcounter_index(&self, name: &str) -> Option<usize> {
        self.fcounters.iter().position(|c| *c == name)
    }
}

/// `id: u64` followed by `rank: i64`.
pub const BASE_RECORD_SIZE: usize = 16;

/// Look up the schema for a module name such as `"POSIX"`.
pub fn schema(module: &str) -> Result<&'static ModuleSchema> {
    ModuleId::from_name(module)
        .and_then(ModuleId::schema)
        .ok_or_else(|| Error::UnknownModule(module.to_string()))
}

pub fn counter_names(module: &str) -> Result<&'static [&'static str]> {
    schema(module).map(|s| s.counters)
}

pub fn fcounter_names(module: &str) -> Result<&'static [&'static str]> {
    schema(module).map(|s| s.fcounters)
}

pub static SCHEMAS: [ModuleSchema; 3] = [
    ModuleSchema {
        id: ModuleId::Posix,
        name: "POSIX",
        version: 4,
        counters: &POSIX_COUNTERS,
        fcounters: &POSIX_FCOUNTERS,
    },
    ModuleSchema {
        id: ModuleId::MpiIo,
        name: "MPI-IO",
        version: 3,
        counters: &MPIIO_COUNTERS,
        fcounters: &MPIIO_FCOUNTERS,
    },
    ModuleSchema {
        id: ModuleId::Stdio,
        name: "STDIO",
        version: 2,
        counters: &STDIO_COUNTERS,
        fcounters: &STDIO_FCOUNTERS,
    },
];

pub static POSIX_COUNTERS: [&str; 69] = [
    "POSIX_OPENS",
    "POSIX_FILENOS",
    "POSIX_DUPS",
    "POSIX_READS",
    "POSIX_WRITES",
    "POSIX_SEEKS",
    "POSIX_STATS",
    "POSIX_MMAPS",
    "POSIX_FSYNCS",
    "POSIX_FDSYNCS",
    "POSIX_RENAME_SOURCES",
    "POSIX_RENAME_TARGETS",
    "POSIX_RENAMED_FROM",
    "POSIX_MODE",
    "POSIX_BYTES_READ",
    "POSIX_BYTES_WRITTEN",
    "POSIX_MAX_BYTE_READ",
    "POSIX_MAX_BYTE_WRITTEN",
    "POSIX_CONSEC_READS",
    "POSIX_CONSEC_WRITES",
    "POSIX_SEQ_READS",
    "POSIX_SEQ_WRITES",
    "POSIX_RW_SWITCHES",
    "POSIX_MEM_NOT_ALIGNED",
    "POSIX_MEM_ALIGNMENT",
    "POSIX_FILE_NOT_ALIGNED",
    "POSIX_FILE_ALIGNMENT",
    "POSIX_MAX_READ_TIME_SIZE",
    "POSIX_MAX_WRITE_TIME_SIZE",
    "POSIX_SIZE_READ_0_100",
    "POSIX_SIZE_READ_100_1K",
    "POSIX_SIZE_READ_1K_10K",
    "POSIX_SIZE_READ_10K_100K",
    "POSIX_SIZE_READ_100K_1M",
    "POSIX_SIZE_READ_1M_4M",
    "POSIX_SIZE_READ_4M_10M",
    "POSIX_SIZE_READ_10M_100M",
    "POSIX_SIZE_READ_100M_1G",
    "POSIX_SIZE_READ_1G_PLUS",
    "POSIX_SIZE_WRITE_0_100",
    "POSIX_SIZE_WRITE_100_1K",
    "POSIX_SIZE_WRITE_1K_10K",
    "POSIX_SIZE_WRITE_10K_100K",
    "POSIX_SIZE_WRITE_100K_1M",
    "POSIX_SIZE_WRITE_1M_4M",
    "POSIX_SIZE_WRITE_4M_10M",
    "POSIX_SIZE_WRITE_10M_100M",
    "POSIX_SIZE_WRITE_100M_1G",
    "POSIX_SIZE_WRITE_1G_PLUS",
    "POSIX_STRIDE1_STRIDE",
    "POSIX_STRIDE2_STRIDE",
    "POSIX_STRIDE3_STRIDE",
    "POSIX_STRIDE4_STRIDE",
    "POSIX_STRIDE1_COUNT",
    "POSIX_STRIDE2_COUNT",
    "POSIX_STRIDE3_COUNT",
    "POSIX_STRIDE4_COUNT",
    "POSIX_ACCESS1_ACCESS",
    "POSIX_ACCESS2_ACCESS",
    "POSIX_ACCESS3_ACCESS",
    "POSIX_ACCESS4_ACCESS",
    "POSIX_ACCESS1_COUNT",
    "POSIX_ACCESS2_COUNT",
    "POSIX_ACCESS3_COUNT",
    "POSIX_ACCESS4_COUNT",
    "POSIX_FASTEST_RANK",
    "POSIX_FASTEST_RANK_BYTES",
    "POSIX_SLOWEST_RANK",
    "POSIX_SLOWEST_RANK_BYTES",
];

pub static POSIX_FCOUNTERS: [&str; 17] = [
    "POSIX_F_OPEN_START_TIMESTAMP",
    "POSIX_F_READ_START_TIMESTAMP",
    "POSIX_F_WRITE_START_TIMESTAMP",
    "POSIX_F_CLOSE_START_TIMESTAMP",
    "POSIX_F_OPEN_END_TIMESTAMP",
    "POSIX_F_READ_END_TIMESTAMP",
    "POSIX_F_WRITE_END_TIMESTAMP",
    "POSIX_F_CLOSE_END_TIMESTAMP",
    "POSIX_F_READ_TIME",
    "POSIX_F_WRITE_TIME",
    "POSIX_F_META_TIME",
    "POSIX_F_MAX_READ_TIME",
    "POSIX_F_MAX_WRITE_TIME",
    "POSIX_F_FASTEST_RANK_TIME",
    "POSIX_F_SLOWEST_RANK_TIME",
    "POSIX_F_VARIANCE_RANK_TIME",
    "POSIX_F_VARIANCE_RANK_BYTES",
];

pub static MPIIO_COUNTERS: [&str; 51] = [
    "MPIIO_INDEP_OPENS",
    "MPIIO_COLL_OPENS",
    "MPIIO_INDEP_READS",
    "MPIIO_INDEP_WRITES",
    "MPIIO_COLL_READS",
    "MPIIO_COLL_WRITES",
    "MPIIO_SPLIT_READS",
    "MPIIO_SPLIT_WRITES",
    "MPIIO_NB_READS",
    "MPIIO_NB_WRITES",
    "MPIIO_SYNCS",
    "MPIIO_HINTS",
    "MPIIO_VIEWS",
    "MPIIO_MODE",
    "MPIIO_BYTES_READ",
    "MPIIO_BYTES_WRITTEN",
    "MPIIO_RW_SWITCHES",
    "MPIIO_MAX_READ_TIME_SIZE",
    "MPIIO_MAX_WRITE_TIME_SIZE",
    "MPIIO_SIZE_READ_AGG_0_100",
    "MPIIO_SIZE_READ_AGG_100_1K",
    "MPIIO_SIZE_READ_AGG_1K_10K",
    "MPIIO_SIZE_READ_AGG_10K_100K",
    "MPIIO_SIZE_READ_AGG_100K_1M",
    "MPIIO_SIZE_READ_AGG_1M_4M",
    "MPIIO_SIZE_READ_AGG_4M_10M",
    "MPIIO_SIZE_READ_AGG_10M_100M",
    "MPIIO_SIZE_READ_AGG_100M_1G",
    "MPIIO_SIZE_READ_AGG_1G_PLUS",
    "MPIIO_SIZE_WRITE_AGG_0_100",
    "MPIIO_SIZE_WRITE_AGG_100_1K",
    "MPIIO_SIZE_WRITE_AGG_1K_10K",
    "MPIIO_SIZE_WRITE_AGG_10K_100K",
    "MPIIO_SIZE_WRITE_AGG_100K_1M",
    "MPIIO_SIZE_WRITE_AGG_1M_4M",
    "MPIIO_SIZE_WRITE_AGG_4M_10M",
    "MPIIO_SIZE_WRITE_AGG_10M_100M",
    "MPIIO_SIZE_WRITE_AGG_100M_1G",
    "MPIIO_SIZE_WRITE_AGG_1G_PLUS",
    "MPIIO_ACCESS1_ACCESS",
    "MPIIO_ACCESS2_ACCESS",
    "MPIIO_ACCESS3_ACCESS",
    "MPIIO_ACCESS4_ACCESS",
    "MPIIO_ACCESS1_COUNT",
    "MPIIO_ACCESS2_COUNT",
    "MPIIO_ACCESS3_COUNT",
    "MPIIO_ACCESS4_COUNT",
    "MPIIO_FASTEST_RANK",
    "MPIIO_FASTEST_RANK_BYTES",
    "MPIIO_SLOWEST_RANK",
    "MPIIO_SLOWEST_RANK_BYTES",
];

pub static MPIIO_FCOUNTERS: [&str; 17] = [
    "MPIIO_F_OPEN_START_TIMESTAMP",
    "MPIIO_F_READ_START_TIMESTAMP",
    "MPIIO_F_WRITE_START_TIMESTAMP",
    "MPIIO_F_CLOSE_START_TIMESTAMP",
    "MPIIO_F_OPEN_END_TIMESTAMP",
    "MPIIO_F_READ_END_TIMESTAMP",
    "MPIIO_F_WRITE_END_TIMESTAMP",
    "MPIIO_F_CLOSE_END_TIMESTAMP",
    "MPIIO_F_READ_TIME",
    "MPIIO_F_WRITE_TIME",
    "MPIIO_F_META_TIME",
    "MPIIO_F_MAX_READ_TIME",
    "MPIIO_F_MAX_WRITE_TIME",
    "MPIIO_F_FASTEST_RANK_TIME",
    "MPIIO_F_SLOWEST_RANK_TIME",
    "MPIIO_F_VARIANCE_RANK_TIME",
    "MPIIO_F_VARIANCE_RANK_BYTES",
];

pub static STDIO_COUNTERS: [&str; 14] = [
    "STDIO_OPENS",
    "STDIO_FDOPENS",
    "STDIO_READS",
    "STDIO_WRITES",
    "STDIO_SEEKS",
    "STDIO_FLUSHES",
    "STDIO_BYTES_WRITTEN",
    "STDIO_BYTES_READ",
    "STDIO_MAX_BYTE_READ",
    "STDIO_MAX_BYTE_WRITTEN",
    "STDIO_FASTEST_RANK",
    "STDIO_FASTEST_RANK_BYTES",
    "STDIO_SLOWEST_RANK",
    "STDIO_SLOWEST_RANK_BYTES",
];

pub static STDIO_FCOUNTERS: [&str; 15] = [
    "STDIO_F_META_TIME",
    "STDIO_F_WRITE_TIME",
    "STDIO_F_READ_TIME",
    "STDIO_F_OPEN_START_TIMESTAMP",
    "STDIO_F_CLOSE_START_TIMESTAMP",
    "STDIO_F_WRITE_START_TIMESTAMP",
    "STDIO_F_READ_START_TIMESTAMP",
    "STDIO_F_OPEN_END_TIMESTAMP",
    "STDIO_F_CLOSE_END_TIMESTAMP",
    "STDIO_F_WRITE_END_TIMESTAMP",
    "STDIO_F_READ_END_TIMESTAMP",
    "STDIO_F_FASTEST_RANK_TIME",
    "STDIO_F_SLOWEST_RANK_TIME",
    "STDIO_F_VARIANCE_RANK_TIME",
    "STDIO_F_VARIANCE_RANK_BYTES",
];
