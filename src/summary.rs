//! Summary data for reports: job metadata, the module table and per-module aggregates
//! (operation counts and access size histograms). Rendering is left to the caller.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::logutils::LogFile;
use crate::record::GenericRecord;
use crate::registry::{self, ModuleSchema};

/// Command line for display: `"N/A"` when none was recorded and `"Anonymized"` when the
/// runtime replaced it with a number.
pub fn full_command(exe: &str) -> String {
    if exe.is_empty() {
        "N/A".to_string()
    } else if exe.chars().all(|c| c.is_ascii_digit()) {
        "Anonymized".to_string()
    } else {
        exe.to_string()
    }
}

/// Job run time in seconds for display, `"< 1"` for jobs shorter than a second.
pub fn runtime(start_time: i64, end_time: i64) -> String {
    let secs = end_time.saturating_sub(start_time) as f64;
    if secs < 1.0 {
        "< 1".to_string()
    } else {
        format!("{:?}", secs)
    }
}

fn format_time(secs: i64, fmt: &str) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|t| t.format(fmt).to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    /// `"<application> (<date>)"`
    pub header: String,
    pub footer: String,
    /// Job metadata as `(label, value)` rows.
    pub metadata: Vec<(String, String)>,
    /// One `("<MODULE> (ver=<v>)", "<size> KiB")` row per recorded module.
    pub modules: Vec<(String, String)>,
}

impl ReportSummary {
    pub fn from_log(log: &mut LogFile) -> Result<ReportSummary> {
        let job = log.job()?;
        let command = full_command(&log.exe()?);

        let app = match command.as_str() {
            "N/A" | "Anonymized" => command.clone(),
            cmd => {
                let first = cmd.split_whitespace().next().unwrap_or(cmd);
                Path::new(first)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| first.to_string())
            }
        };
        let header = format!("{} ({})", app, format_time(job.start_time, "%Y-%m-%d"));
        let footer = format!(
            "Summary report generated via darshan-util v{}",
            crate::lib_version()
        );

        let log_name = log
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let lib_ver = job
            .metadata
            .get("lib_ver")
            .cloned()
            .unwrap_or_else(|| "N/A".to_string());
        let metadata = vec![
            ("Job ID", job.jobid.to_string()),
            ("User ID", job.uid.to_string()),
            ("# Processes", job.nprocs.to_string()),
            ("Runtime (s)", runtime(job.start_time, job.end_time)),
            ("Start Time", format_time(job.start_time, "%Y-%m-%d %H:%M:%S")),
            ("End Time", format_time(job.end_time, "%Y-%m-%d %H:%M:%S")),
            ("Command", command),
            ("Log Filename", log_name),
            ("Runtime Library Version", lib_ver),
            ("Log Format Version", log.header().version.clone()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let modules = log
            .modules()
            .into_iter()
            .map(|m| {
                let mut size = format!("{:.2} KiB", m.len as f64 / 1024.0);
                if m.partial {
                    size.push_str(" (partial data)");
                }
                (format!("{} (ver={})", m.name, m.version), size)
            })
            .collect();

        Ok(ReportSummary {
            header,
            footer,
            metadata,
            modules,
        })
    }
}

/// Sum of one counter over all records, saturating at `i64::MAX`. Negative values mark
/// counters that were not recorded and do not contribute.
fn sum_counter(records: &[GenericRecord], schema: &ModuleSchema, name: &str) -> Result<i64> {
    let index = schema.counter_index(name).ok_or_else(|| Error::Unsupported {
        module: schema.name.to_string(),
        what: "counter lookup",
    })?;
    Ok(records
        .iter()
        .map(|r| r.counters()[index])
        .filter(|v| *v > 0)
        .fold(0i64, i64::saturating_add))
}

/// Operation counts of one module, summed over all of its records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpCounts {
    pub module: &'static str,
    pub labels: Vec<&'static str>,
    pub counts: Vec<i64>,
}

const POSIX_OPS: [(&str, &[&str]); 7] = [
    ("Read", &["POSIX_READS"]),
    ("Write", &["POSIX_WRITES"]),
    ("Open", &["POSIX_OPENS"]),
    ("Stat", &["POSIX_STATS"]),
    ("Seek", &["POSIX_SEEKS"]),
    ("Mmap", &["POSIX_MMAPS"]),
    ("Fsync", &["POSIX_FSYNCS", "POSIX_FDSYNCS"]),
];

const MPIIO_OPS: [(&str, &[&str]); 7] = [
    ("Ind. Read", &["MPIIO_INDEP_READS"]),
    ("Ind. Write", &["MPIIO_INDEP_WRITES"]),
    ("Ind. Open", &["MPIIO_INDEP_OPENS"]),
    ("Col. Read", &["MPIIO_COLL_READS"]),
    ("Col. Write", &["MPIIO_COLL_WRITES"]),
    ("Col. Open", &["MPIIO_COLL_OPENS"]),
    ("Sync", &["MPIIO_SYNCS"]),
];

const STDIO_OPS: [(&str, &[&str]); 5] = [
    ("Read", &["STDIO_READS"]),
    ("Write", &["STDIO_WRITES"]),
    ("Open", &["STDIO_OPENS"]),
    ("Seek", &["STDIO_SEEKS"]),
    ("Flush", &["STDIO_FLUSHES"]),
];

pub fn op_counts(log: &mut LogFile, module: &str) -> Result<OpCounts> {
    let schema = registry::schema(module)?;
    let ops: &[(&'static str, &[&str])] = match schema.name {
        "POSIX" => &POSIX_OPS,
        "MPI-IO" => &MPIIO_OPS,
        "STDIO" => &STDIO_OPS,
        _ => {
            return Err(Error::Unsupported {
                module: module.to_string(),
                what: "operation counts",
            })
        }
    };

    let records = log.read_records(module)?;
    let mut counts = Vec::with_capacity(ops.len());
    for (_, counters) in ops {
        let mut total = 0;
        for name in counters.iter() {
            total = sum_counter(&records, schema, name)?.saturating_add(total);
        }
        counts.push(total);
    }

    Ok(OpCounts {
        module: schema.name,
        labels: ops.iter().map(|(label, _)| *label).collect(),
        counts,
    })
}

/// Labels of the access size bins, smallest first.
pub const ACCESS_SIZE_LABELS: [&str; 10] = [
    "0-100", "101-1K", "1K-10K", "10K-100K", "100K-1M", "1M-4M", "4M-10M", "10M-100M",
    "100M-1G", "1G+",
];

const ACCESS_SIZE_SUFFIXES: [&str; 10] = [
    "0_100", "100_1K", "1K_10K", "10K_100K", "100K_1M", "1M_4M", "4M_10M", "10M_100M",
    "100M_1G", "1G_PLUS",
];

/// Read and write access counts per size bin, summed over all records of a module.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessHistogram {
    pub module: &'static str,
    pub labels: [&'static str; 10],
    pub read: Vec<i64>,
    pub write: Vec<i64>,
}

pub fn access_histogram(log: &mut LogFile, module: &str) -> Result<AccessHistogram> {
    let schema = registry::schema(module)?;
    let (read_prefix, write_prefix) = match schema.name {
        "POSIX" => ("POSIX_SIZE_READ_", "POSIX_SIZE_WRITE_"),
        "MPI-IO" => ("MPIIO_SIZE_READ_AGG_", "MPIIO_SIZE_WRITE_AGG_"),
        _ => {
            return Err(Error::Unsupported {
                module: module.to_string(),
                what: "access size histogram",
            })
        }
    };

    let records = log.read_records(module)?;
    let bins = |prefix: &str| -> Result<Vec<i64>> {
        ACCESS_SIZE_SUFFIXES
            .iter()
            .map(|suffix| sum_counter(&records, schema, &format!("{}{}", prefix, suffix)))
            .collect()
    };

    Ok(AccessHistogram {
        module: schema.name,
        labels: ACCESS_SIZE_LABELS,
        read: bins(read_prefix)?,
        write: bins(write_prefix)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_labels() {
        assert_eq!(full_command(""), "N/A");
        assert_eq!(full_command("4172838491"), "Anonymized");
        assert_eq!(full_command("/bin/ior -w"), "/bin/ior -w");
    }

    #[test]
    fn runtime_labels() {
        assert_eq!(runtime(100, 100), "< 1");
        assert_eq!(runtime(100, 216), "116.0");
        assert_eq!(runtime(i64::MIN, i64::MAX), format!("{:?}", i64::MAX as f64));
        assert_eq!(runtime(i64::MAX, i64::MIN), "< 1");
    }

    #[test]
    fn time_formatting() {
        assert_eq!(format_time(0, "%Y-%m-%d %H:%M:%S"), "1970-01-01 00:00:00");
        assert_eq!(format_time(i64::MAX, "%Y"), "N/A");
    }

    #[test]
    fn bin_names_exist_in_registry() {
        let posix = registry::schema("POSIX").unwrap();
        let mpiio = registry::schema("MPI-IO").unwrap();
        for s in ACCESS_SIZE_SUFFIXES.iter() {
            assert!(posix.counter_index(&format!("POSIX_SIZE_WRITE_{}", s)).is_some());
            assert!(mpiio.counter_index(&format!("MPIIO_SIZE_READ_AGG_{}", s)).is_some());
        }
        for (ops, schema) in [(&POSIX_OPS[..], posix), (&MPIIO_OPS[..], mpiio)] {
            for (_, names) in ops {
                assert!(names.iter().all(|n| schema.counter_index(n).is_some()));
            }
        }
    }
}
