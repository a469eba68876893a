mod common;

use common::*;
use darshan_util::record::{DType, RecordData};
use darshan_util::{counter_names, fcounter_names, lib_version, LogFile, Shape};
use regex::Regex;

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected.iter()) {
        assert!((a - e).abs() <= 1e-7 * e.abs().max(1.0), "{} != {}", a, e);
    }
}

#[test]
fn lib_version_is_semver() {
    let version = lib_version();
    assert_eq!(version.matches('.').count(), 2);
    let re = Regex::new(r"^\d+\.\d+\.\d+(-.+)?$").unwrap();
    assert!(re.is_match(version));
}

#[test]
fn numeric_shape() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut log = LogFile::open(sample_log(dir.path())).expect("Can not open log");

    let rec = log.decode("POSIX", Shape::Numeric).expect("Can not decode");
    assert_eq!(rec.id, 6301063301082038805);
    assert_eq!(rec.rank, -1);
    match rec.data {
        RecordData::Numeric {
            counters,
            fcounters,
        } => {
            assert_eq!(counters.len(), 69);
            assert_eq!(fcounters.len(), 17);
            assert_eq!(counters, SAMPLE_COUNTERS.to_vec());
            assert_close(&fcounters, &SAMPLE_FCOUNTERS);
        }
        d => panic!("expected numeric data, got {:?}", d),
    }
}

#[test]
fn named_shape() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut log = LogFile::open(sample_log(dir.path())).expect("Can not open log");

    let rec = log.decode("POSIX", Shape::Named).expect("Can not decode");
    assert_eq!(rec.id, 6301063301082038805);
    assert_eq!(rec.rank, -1);
    match rec.data {
        RecordData::Named {
            counters,
            fcounters,
        } => {
            assert_eq!(counters.len(), 69);
            assert_eq!(fcounters.len(), 17);

            let names: Vec<_> = counters.names().collect();
            assert_eq!(names, counter_names("POSIX").unwrap().to_vec());
            let fnames: Vec<_> = fcounters.names().collect();
            assert_eq!(fnames, fcounter_names("POSIX").unwrap().to_vec());
            assert!(!names.contains(&"id") && !names.contains(&"rank"));

            assert_eq!(counters.values().collect::<Vec<_>>(), SAMPLE_COUNTERS.to_vec());
            assert_close(&fcounters.values().collect::<Vec<_>>(), &SAMPLE_FCOUNTERS);
            assert_eq!(counters.get("POSIX_OPENS"), Some(2049));
            assert_eq!(counters.get("POSIX_SLOWEST_RANK_BYTES"), Some(1073741824));
        }
        d => panic!("expected named data, got {:?}", d),
    }
}

#[test]
fn tabular_shape() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let mut log = LogFile::open(sample_log(dir.path())).expect("Can not open log");

    let rec = log.decode("POSIX", Shape::Tabular).expect("Can not decode");
    assert_eq!(rec.id, 6301063301082038805);
    assert_eq!(rec.rank, -1);
    let tables = match rec.data {
        RecordData::Tabular(t) => t,
        d => panic!("expected tables, got {:?}", d),
    };

    assert_eq!(tables.counters.shape(), (1, 71));
    assert_eq!(tables.fcounters.shape(), (1, 19));
    for table in [&tables.counters, &tables.fcounters] {
        let id = table.column("id").expect("id column");
        assert_eq!(id.dtype(), DType::U64);
        assert_eq!(id.as_u64().unwrap(), &[6301063301082038805]);
        let rank = table.column("rank").expect("rank column");
        assert_eq!(rank.as_i64().unwrap(), &[-1]);
    }

    let names = tables.counters.column_names();
    assert_eq!(names[2..].to_vec(), counter_names("POSIX").unwrap().to_vec());
    let fnames = tables.fcounters.column_names();
    assert_eq!(fnames[2..].to_vec(), fcounter_names("POSIX").unwrap().to_vec());

    let values: Vec<i64> = tables.counters.columns()[2..]
        .iter()
        .map(|c| c.as_i64().unwrap()[0])
        .collect();
    assert_eq!(values, SAMPLE_COUNTERS.to_vec());
    let fvalues: Vec<f64> = tables.fcounters.columns()[2..]
        .iter()
        .map(|c| c.as_f64().unwrap()[0])
        .collect();
    assert_close(&fvalues, &SAMPLE_FCOUNTERS);
}

#[test]
fn shapes_agree_on_id() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = LogFile::open(sample_log(dir.path())).expect("Can not open log");

    let ids: Vec<u64> = [Shape::Numeric, Shape::Named, Shape::Tabular]
        .iter()
        .map(|s| log.decode("POSIX", *s).expect("Can not decode").id)
        .collect();
    assert_eq!(ids, vec![SAMPLE_ID; 3]);
}

#[test]
fn named_shape_serializes_in_registry_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = LogFile::open(sample_log(dir.path())).expect("Can not open log");
    let rec = log.decode("POSIX", Shape::Named).expect("Can not decode");

    let json = serde_json::to_string(&rec).unwrap();
    assert!(json.starts_with(r#"{"id":6301063301082038805,"rank":-1,"counters":{"POSIX_OPENS":2049,"#));
    let opens = json.find("\"POSIX_OPENS\"").unwrap();
    let slowest = json.find("\"POSIX_SLOWEST_RANK_BYTES\"").unwrap();
    let fcounters = json.find("\"fcounters\"").unwrap();
    assert!(opens < slowest && slowest < fcounters);
}
