mod common;

use std::fs;
use std::path::Path;

use common::*;
use darshan_util::logutils::Endianness;
use darshan_util::{Error, LogFile, LogWriter, RecordSet, Shape};

#[test]
fn missing_file() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    match LogFile::open(dir.path().join("nope.darshan")) {
        Err(Error::NotFound(p)) => assert!(p.ends_with("nope.darshan")),
        r => panic!("expected NotFound, got {:?}", r),
    }
}

#[test]
fn not_a_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.darshan");
    fs::write(&path, vec![0x5a; 4096]).unwrap();
    assert!(matches!(LogFile::open(&path), Err(Error::Format(_))));

    let short = dir.path().join("short.darshan");
    fs::write(&short, b"3.41").unwrap();
    assert!(matches!(LogFile::open(&short), Err(Error::Format(_))));
}

#[test]
fn truncated_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = sample_log(dir.path());
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 16]).unwrap();
    assert!(matches!(LogFile::open(&path), Err(Error::Format(_))));
}

#[test]
fn absent_empty_and_unknown_modules() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut log = LogFile::open(sample_log(dir.path())).expect("Can not open log");

    assert!(log.has_module("POSIX"));
    assert!(log.has_module("STDIO"));
    assert!(!log.has_module("MPI-IO"));

    match log.decode("MPI-IO", Shape::Numeric) {
        Err(Error::ModuleNotPresent(m)) => assert_eq!(m, "MPI-IO"),
        r => panic!("expected ModuleNotPresent, got {:?}", r),
    }
    match log.decode("STDIO", Shape::Named) {
        Err(Error::EmptyRecord(m)) => assert_eq!(m, "STDIO"),
        r => panic!("expected EmptyRecord, got {:?}", r),
    }
    assert!(matches!(
        log.decode("NOT-A-MODULE", Shape::Numeric),
        Err(Error::UnknownModule(_))
    ));
    assert!(matches!(
        log.decode_all("STDIO", Shape::Tabular),
        Err(Error::EmptyRecord(_))
    ));
}

#[test]
fn empty_module_without_compression() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = LogFile::open(uncompressed_sample_log(dir.path(), Endianness::Little))
        .expect("Can not open log");
    assert!(log.has_module("STDIO"));
    assert!(matches!(
        log.decode("STDIO", Shape::Numeric),
        Err(Error::EmptyRecord(_))
    ));
}

#[test]
fn close_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = LogFile::open(sample_log(dir.path())).expect("Can not open log");
    assert!(!log.is_closed());

    log.close();
    log.close();
    assert!(log.is_closed());

    assert!(matches!(
        log.decode("POSIX", Shape::Numeric),
        Err(Error::UseAfterClose)
    ));
    assert!(matches!(log.records("POSIX"), Err(Error::UseAfterClose)));
    assert!(matches!(log.job(), Err(Error::UseAfterClose)));
    // The header stays readable.
    assert_eq!(log.header().version, "3.41");
}

#[test]
fn repeated_decodes_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = LogFile::open(sample_log(dir.path())).expect("Can not open log");

    for shape in [Shape::Numeric, Shape::Named, Shape::Tabular] {
        let first = log.decode("POSIX", shape).expect("Can not decode");
        let second = log.decode("POSIX", shape).expect("Can not decode");
        assert_eq!(first, second);
        assert_eq!(first.shape(), shape);
    }
    let all = log.decode_all("POSIX", Shape::Named).expect("Can not decode");
    assert_eq!(all.len(), 1);
    assert_eq!(all, log.decode_all("POSIX", Shape::Named).unwrap());
}

#[test]
fn cursor_is_forward_only() {
    let dir = tempfile::tempdir().unwrap();
    let mut w = LogWriter::new(sample_job());
    for rank in 0..4 {
        w.record(flat_record("MPI-IO", 100 + rank as u64, rank, rank));
    }
    let mut log = LogFile::open(write_log(dir.path(), "mpiio.darshan", &w))
        .expect("Can not open log");

    let mut cursor = log.records("MPI-IO").expect("Can not read records");
    assert_eq!(cursor.size_hint(), (4, Some(4)));
    let ranks: Vec<i64> = cursor
        .by_ref()
        .map(|r| r.expect("Can not decode").rank())
        .collect();
    assert_eq!(ranks, vec![0, 1, 2, 3]);
    assert_eq!(cursor.remaining(), 0);
    assert!(cursor.next().is_none());
    assert!(cursor.next().is_none());

    // A fresh cursor starts over.
    assert_eq!(log.records("MPI-IO").unwrap().count(), 4);

    match log.decode_all("MPI-IO", Shape::Tabular).unwrap() {
        RecordSet::Tabular(t) => assert_eq!(t.counters.shape(), (4, 53)),
        s => panic!("expected tables, got {:?}", s),
    }
}

// Header offsets of a little endian log.
const COMPRESSION_AT: usize = 16;
const MOD_MAP_AT: usize = 40;
const MOD_VER_AT: usize = MOD_MAP_AT + 16 * 64;
const POSIX: usize = 1;
const STDIO: usize = 9;

fn read_u64(path: &Path, at: usize) -> u64 {
    let bytes = fs::read(path).unwrap();
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(raw)
}

fn patch(path: &Path, at: usize, new: &[u8]) {
    let mut bytes = fs::read(path).unwrap();
    bytes[at..at + new.len()].copy_from_slice(new);
    fs::write(path, &bytes).unwrap();
}

fn patch_map(path: &Path, module: usize, off: u64, len: u64) {
    patch(path, MOD_MAP_AT + 16 * module, &off.to_le_bytes());
    patch(path, MOD_MAP_AT + 16 * module + 8, &len.to_le_bytes());
}

#[test]
fn region_size_mismatch() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = uncompressed_sample_log(dir.path(), Endianness::Little);

    let off = read_u64(&path, MOD_MAP_AT + 16 * POSIX);
    let len = read_u64(&path, MOD_MAP_AT + 16 * POSIX + 8);
    patch_map(&path, POSIX, off, len - 8);

    let mut log = LogFile::open(&path).expect("Can not open log");
    match log.decode("POSIX", Shape::Numeric) {
        Err(Error::Schema {
            module,
            expected,
            found,
            ..
        }) => {
            assert_eq!(module, "POSIX");
            assert_eq!(found, 16 + 69 * 8 + 17 * 8 - 8);
            assert_eq!(expected, 16 + 69 * 8 + 17 * 8);
        }
        r => panic!("expected a schema error, got {:?}", r),
    }
}

#[test]
fn region_map_past_u64_range() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = sample_log(dir.path());

    patch_map(&path, POSIX, u64::MAX, 1);
    assert!(matches!(LogFile::open(&path), Err(Error::Format(_))));

    patch_map(&path, POSIX, 2, u64::MAX - 1);
    assert!(matches!(LogFile::open(&path), Err(Error::Format(_))));
}

#[test]
fn zero_length_region_in_zlib_log() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = sample_log(dir.path());
    let off = read_u64(&path, MOD_MAP_AT + 16 * STDIO);
    patch_map(&path, STDIO, off, 0);

    let mut log = LogFile::open(&path).expect("Can not open log");
    assert!(log.has_module("STDIO"));
    match log.decode("STDIO", Shape::Numeric) {
        Err(Error::EmptyRecord(m)) => assert_eq!(m, "STDIO"),
        r => panic!("expected EmptyRecord, got {:?}", r),
    }
    assert_eq!(log.decode("POSIX", Shape::Numeric).unwrap().id, SAMPLE_ID);
}

#[test]
fn unsupported_compression() {
    let dir = tempfile::tempdir().unwrap();
    let path = sample_log(dir.path());

    // bzip2
    patch(&path, COMPRESSION_AT, &[1]);
    match LogFile::open(&path) {
        Err(Error::Format(msg)) => assert!(msg.contains("Bzip2")),
        r => panic!("expected a format error, got {:?}", r),
    }

    patch(&path, COMPRESSION_AT, &[7]);
    assert!(matches!(LogFile::open(&path), Err(Error::Format(_))));
}

#[test]
fn unsupported_format_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = sample_log(dir.path());
    patch(&path, 0, b"2.06\0\0\0\0");

    match LogFile::open(&path) {
        Err(Error::Format(msg)) => assert!(msg.contains("2.06")),
        r => panic!("expected a format error, got {:?}", r),
    }
}

#[test]
fn module_version_mismatch() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let path = sample_log(dir.path());
    patch(&path, MOD_VER_AT + 4 * POSIX, &3u32.to_le_bytes());

    let mut log = LogFile::open(&path).expect("Can not open log");
    let posix = log.modules().into_iter().find(|m| m.name == "POSIX").unwrap();
    assert_eq!(posix.version, 3);
    assert!(matches!(
        log.decode("POSIX", Shape::Numeric),
        Err(Error::Format(_))
    ));
    // Other modules are unaffected.
    assert!(matches!(
        log.decode("STDIO", Shape::Numeric),
        Err(Error::EmptyRecord(_))
    ));
}

#[test]
fn job_data() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut log = LogFile::open(sample_log(dir.path())).expect("Can not open log");

    let job = log.job().expect("Can not read job");
    assert_eq!(job, sample_job());
    assert_eq!(job.metadata["lib_ver"], "3.1.3");

    let exe = log.exe().expect("Can not read exe");
    assert!(exe.ends_with("vpicio.hdf5 32"));

    let mounts = log.mounts().expect("Can not read mounts");
    assert_eq!(mounts.len(), 2);
    assert_eq!(mounts[0].fs_type, "lustre");
    assert_eq!(mounts[1].mount_point, "/global/project");

    let names = log.name_records().expect("Can not read names");
    assert_eq!(names.len(), 1);
    assert!(names[&SAMPLE_ID].ends_with("vpicio.hdf5"));

    let modules: Vec<&str> = log.modules().iter().map(|m| m.name).collect();
    assert_eq!(modules, vec!["POSIX", "STDIO"]);
    assert!(log.modules().iter().all(|m| !m.partial));
}

#[test]
fn partial_module_still_decodes() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut w = sample_writer();
    w.partial("POSIX").unwrap();
    let mut log = LogFile::open(write_log(dir.path(), "partial.darshan", &w))
        .expect("Can not open log");

    let posix = log.modules().into_iter().find(|m| m.name == "POSIX").unwrap();
    assert!(posix.partial);
    assert_eq!(log.decode("POSIX", Shape::Numeric).unwrap().id, SAMPLE_ID);
}
