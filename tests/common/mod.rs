#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use darshan_util::logutils::{CompressionType, Endianness, Job};
use darshan_util::{GenericRecord, LogWriter};

pub const SAMPLE_ID: u64 = 6301063301082038805;

pub const SAMPLE_COUNTERS: [i64; 69] = [
    2049, -1, -1, 0, 16402, 16404, 0, 0, 0, 0, -1, -1, 0, 0, 0, 2199023259968, 0,
    2199023261831, 0, 0, 0, 16384, 0, 0, 8, 16401, 1048576, 0, 134217728, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 4, 14, 0, 0, 0, 0, 0, 0, 16384, 0, 274743689216, 274743691264, 0, 0, 10240,
    4096, 0, 0, 134217728, 272, 544, 328, 16384, 8, 2, 2, 597, 1073741824, 1312, 1073741824,
];

pub const SAMPLE_FCOUNTERS: [f64; 17] = [
    3.9191410541534424,
    0.0,
    3.940063953399658,
    3.927093982696533,
    3.936579942703247,
    0.0,
    115.0781660079956,
    115.77035808563232,
    0.0,
    100397.60042190552,
    11.300841808319092,
    0.0,
    17.940945863723755,
    20.436099529266357,
    85.47495031356812,
    0.0,
    0.0,
];

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn sample_job() -> Job {
    let mut metadata = BTreeMap::new();
    metadata.insert("lib_ver".to_string(), "3.1.3".to_string());
    metadata.insert("h".to_string(), "romio_no_indep_rw=true;cb_nodes=4".to_string());
    Job {
        uid: 69615,
        start_time: 1490000867,
        end_time: 1490000983,
        nprocs: 2048,
        jobid: 4478544,
        metadata,
    }
}

pub fn sample_posix_record() -> GenericRecord {
    GenericRecord::new(
        "POSIX",
        SAMPLE_ID,
        -1,
        SAMPLE_COUNTERS.to_vec(),
        SAMPLE_FCOUNTERS.to_vec(),
    )
    .expect("sample record matches the registry")
}

/// A record with every counter set to `value` and every fcounter to `value / 2`.
pub fn flat_record(module: &str, id: u64, rank: i64, value: i64) -> GenericRecord {
    let schema = darshan_util::registry::schema(module).expect("known module");
    GenericRecord::new(
        module,
        id,
        rank,
        vec![value; schema.counters.len()],
        vec![value as f64 / 2.0; schema.fcounters.len()],
    )
    .expect("flat record matches the registry")
}

/// Writer for a log shaped like the well known `sample.darshan`: one shared POSIX record,
/// an empty STDIO module and no MPI-IO module.
pub fn sample_writer() -> LogWriter {
    let mut w = LogWriter::new(sample_job());
    w.exe("/global/project/projectdirs/m888/glock/tokio-abc-results/bin.edison/vpicio_uni /scratch2/scratchdirs/glock/tokioabc-s.4478544/vpicio/vpicio.hdf5 32")
        .mount("lustre", "/scratch2")
        .mount("gpfs", "/global/project")
        .name(SAMPLE_ID, "/scratch2/scratchdirs/glock/tokioabc-s.4478544/vpicio/vpicio.hdf5")
        .record(sample_posix_record());
    w.module("STDIO").expect("STDIO is registered");
    w
}

pub fn write_log(dir: &Path, name: &str, writer: &LogWriter) -> PathBuf {
    let path = dir.join(name);
    writer.write_file(&path).expect("Can not write log");
    path
}

pub fn sample_log(dir: &Path) -> PathBuf {
    write_log(dir, "sample.darshan", &sample_writer())
}

pub fn uncompressed_sample_log(dir: &Path, endianness: Endianness) -> PathBuf {
    let mut w = sample_writer();
    w.compression(CompressionType::None)
        .expect("uncompressed logs can be written")
        .endianness(endianness);
    write_log(dir, "sample-raw.darshan", &w)
}
