//! High-level abstractions for an opened darshan log.
//!
//! `LogFile` owns the open file and the parsed header. Every other region (job data, name
//! records, module records) is read from the file, decompressed and parsed on demand, so
//! repeated decodes of the same module are independent re-reads that return identical
//! results. `LogFile::records` hands out a forward-only cursor instead, for callers that
//! want to walk a module once.
//!
//! The handle closes itself when dropped; `close` releases the file early. Any access that
//! needs the file after `close` fails with `Error::UseAfterClose`.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};

use flate2::read::ZlibDecoder;
use log::{debug, trace, warn};
use nom::IResult;

use super::log_format::*;
use super::parser::*;
use crate::error::{Error, Result};
use crate::record::{DecodedRecord, GenericRecord, RecordSet, Shape};
use crate::registry::{self, ModuleId, ModuleSchema, MODULE_IDS};

/// Inflate a zlib stream, refusing output larger than `limit` bytes.
fn inflate(raw: &[u8], limit: u64) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(raw)
        .take(limit + 1)
        .read_to_end(&mut out)?;
    if out.len() as u64 > limit {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("inflates past {} bytes", limit),
        ));
    }
    Ok(out)
}

/// Turn a nom result into our error type, naming the structure that failed to parse.
fn finish<T>(result: IResult<&[u8], T>, what: &str) -> Result<T> {
    match result {
        Ok((_, value)) => Ok(value),
        Err(nom::Err::Incomplete(n)) => Err(Error::format(format!(
            "incomplete {} ({:?} more bytes needed)",
            what, n
        ))),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(Error::format(format!(
            "malformed {} ({:?} with {} bytes left)",
            what,
            e.code,
            e.input.len()
        ))),
    }
}

#[derive(Debug)]
pub struct LogFile {
    path: PathBuf,
    header: LogHeader,
    file: Option<File>,
}

impl LogFile {
    /// Open the log at `path` and parse its header.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<LogFile> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::NotFound(path.clone()),
            _ => Error::Io(e),
        })?;
        let file_len = file.metadata()?.len();

        if file_len < HEADER_SIZE as u64 {
            return Err(Error::format(format!(
                "{} is too short for a log header ({} bytes)",
                path.display(),
                file_len
            )));
        }
        let mut buf = vec![0u8; HEADER_SIZE];
        file.read_exact(&mut buf)?;

        let endian = detect_endianness(&buf)
            .ok_or_else(|| Error::format(format!("{}: bad magic number", path.display())))?;
        let header = finish(parse_header(&buf, endian), "log header")?;

        if !header.version.starts_with("3.") {
            return Err(Error::format(format!(
                "unsupported log format version {:?}",
                header.version
            )));
        }
        match header.compression {
            CompressionType::Zlib | CompressionType::None => {}
            c => {
                return Err(Error::format(format!("unsupported compression {:?}", c)));
            }
        }

        let regions = std::iter::once(("names", header.name_map)).chain(
            MODULE_IDS
                .iter()
                .map(|m| (m.name(), header.module_map(*m))),
        );
        for (what, map) in regions {
            match map.end() {
                Some(end) if end <= file_len => {}
                _ => {
                    return Err(Error::format(format!(
                        "{} region at offset {} with {} bytes extends past end of file ({} bytes)",
                        what, map.off, map.len, file_len
                    )));
                }
            }
        }
        if header.name_map.off < HEADER_SIZE as u64 {
            return Err(Error::format("name region overlaps the log header"));
        }

        debug!(
            "opened {} (format {}, {:?} endian, {:?} compression)",
            path.display(),
            header.version,
            header.endianness,
            header.compression
        );

        Ok(LogFile {
            path,
            header,
            file: Some(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &LogHeader {
        &self.header
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// Release the file. Closing an already closed log does nothing.
    pub fn close(&mut self) {
        if self.file.take().is_some() {
            debug!("closed {}", self.path.display());
        }
    }

    /// Read and decompress one region of the log. An empty region reads as no bytes.
    fn read_region(&mut self, map: LogMap) -> Result<Vec<u8>> {
        let file = self.file.as_mut().ok_or(Error::UseAfterClose)?;
        trace!("reading region at offset {} ({} bytes)", map.off, map.len);
        if map.is_empty() {
            return Ok(Vec::new());
        }

        let mut raw = Vec::new();
        file.seek(SeekFrom::Start(map.off))?;
        file.by_ref().take(map.len).read_to_end(&mut raw)?;
        if (raw.len() as u64) < map.len {
            return Err(Error::format(format!(
                "region at offset {} is truncated ({} of {} bytes)",
                map.off,
                raw.len(),
                map.len
            )));
        }

        match self.header.compression {
            CompressionType::None => Ok(raw),
            CompressionType::Zlib => inflate(&raw, MAX_REGION_SIZE).map_err(|e| {
                Error::format(format!("corrupt zlib region at offset {}: {}", map.off, e))
            }),
            c => Err(Error::format(format!("unsupported compression {:?}", c))),
        }
    }

    fn read_job_region(&mut self) -> Result<JobRegion> {
        let bytes = self.read_region(self.header.job_map())?;
        if bytes.len() < JOB_SIZE {
            return Err(Error::format(format!(
                "job region holds {} bytes, expected at least {}",
                bytes.len(),
                JOB_SIZE
            )));
        }
        finish(parse_job_region(&bytes, self.header.endianness), "job region")
    }

    pub fn job(&mut self) -> Result<Job> {
        self.read_job_region().map(|r| r.job)
    }

    /// Command line of the instrumented executable.
    pub fn exe(&mut self) -> Result<String> {
        self.read_job_region().map(|r| r.exe)
    }

    pub fn mounts(&mut self) -> Result<Vec<Mount>> {
        self.read_job_region().map(|r| r.mounts)
    }

    /// Map from record id to the file name (or other resource name) it was derived from.
    pub fn name_records(&mut self) -> Result<HashMap<u64, String>> {
        let bytes = self.read_region(self.header.name_map)?;
        let endian = self.header.endianness;
        let (rest, names) = parse_name_records(&bytes, endian)
            .map_err(|_| Error::format("malformed name record region"))?;
        if !rest.is_empty() {
            return Err(Error::format(format!(
                "{} trailing bytes in name record region",
                rest.len()
            )));
        }
        Ok(names.into_iter().map(|n| (n.id, n.name)).collect())
    }

    /// Modules recorded in this log, in module id order.
    pub fn modules(&self) -> Vec<ModuleInfo> {
        MODULE_IDS
            .iter()
            .copied()
            .filter(|m| self.header.has_module(*m))
            .map(|m| ModuleInfo {
                id: m,
                name: m.name(),
                version: self.header.module_version(m),
                len: self.header.module_map(m).len,
                partial: self.header.partial_flags.has_module(m),
            })
            .collect()
    }

    pub fn has_module(&self, module: &str) -> bool {
        ModuleId::from_name(module)
            .map(|m| self.header.has_module(m))
            .unwrap_or(false)
    }

    /// Look up the schema for `module` and check that the log recorded it in a version we
    /// can decode.
    fn module_schema(&self, module: &str) -> Result<&'static ModuleSchema> {
        let schema = registry::schema(module)?;
        if !self.header.has_module(schema.id) {
            return Err(Error::ModuleNotPresent(module.to_string()));
        }

        let version = self.header.module_version(schema.id);
        if version != schema.version {
            return Err(Error::format(format!(
                "{} module version {} is not supported (expected {})",
                module, version, schema.version
            )));
        }
        if self.header.partial_flags.has_module(schema.id) {
            warn!("{} module in {} holds partial data", module, self.path.display());
        }

        Ok(schema)
    }

    /// Read the decompressed record region of `module`, checked to be a whole number of
    /// records.
    fn module_region(&mut self, module: &str) -> Result<(&'static ModuleSchema, Vec<u8>)> {
        if self.is_closed() {
            return Err(Error::UseAfterClose);
        }
        let schema = self.module_schema(module)?;
        let bytes = self.read_region(self.header.module_map(schema.id))?;

        if bytes.is_empty() {
            return Err(Error::EmptyRecord(module.to_string()));
        }
        if bytes.len() % schema.record_size() != 0 {
            return Err(Error::Schema {
                module: module.to_string(),
                what: "record region size",
                expected: (bytes.len() / schema.record_size() + 1) * schema.record_size(),
                found: bytes.len(),
            });
        }

        Ok((schema, bytes))
    }

    /// Decode every record of `module` in file order.
    pub fn read_records(&mut self, module: &str) -> Result<Vec<GenericRecord>> {
        let (schema, bytes) = self.module_region(module)?;
        let endian = self.header.endianness;
        bytes
            .chunks(schema.record_size())
            .map(|c| finish(parse_generic_record(c, schema, endian), "module record"))
            .collect()
    }

    /// Decode the first record of `module` in the requested shape.
    pub fn decode(&mut self, module: &str, shape: Shape) -> Result<DecodedRecord> {
        let (schema, bytes) = self.module_region(module)?;
        let endian = self.header.endianness;
        let record = finish(
            parse_generic_record(&bytes[..schema.record_size()], schema, endian),
            "module record",
        )?;
        Ok(record.to_shape(shape))
    }

    /// Decode all records of `module` in the requested shape.
    pub fn decode_all(&mut self, module: &str, shape: Shape) -> Result<RecordSet> {
        let records = self.read_records(module)?;
        Ok(RecordSet::new(&records, shape))
    }

    /// Forward-only cursor over the records of `module`. Once it has yielded the last
    /// record it stays exhausted; open a new cursor to start over.
    pub fn records(&mut self, module: &str) -> Result<RecordCursor> {
        let (schema, bytes) = self.module_region(module)?;
        Ok(RecordCursor {
            schema,
            endian: self.header.endianness,
            bytes,
            offset: 0,
        })
    }
}

impl Drop for LogFile {
    fn drop(&mut self) {
        self.close();
    }
}

pub struct RecordCursor {
    schema: &'static ModuleSchema,
    endian: Endianness,
    bytes: Vec<u8>,
    offset: usize,
}

impl RecordCursor {
    pub fn schema(&self) -> &'static ModuleSchema {
        self.schema
    }

    /// Number of records not yet yielded.
    pub fn remaining(&self) -> usize {
        (self.bytes.len() - self.offset) / self.schema.record_size()
    }
}

impl Iterator for RecordCursor {
    type Item = Result<GenericRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let size = self.schema.record_size();
        if self.offset + size > self.bytes.len() {
            return None;
        }

        let slice = &self.bytes[self.offset..self.offset + size];
        let r = finish(
            parse_generic_record(slice, self.schema, self.endian),
            "module record",
        );
        match r {
            Ok(rec) => {
                self.offset += size;
                Some(Ok(rec))
            }
            Err(e) => {
                // Do not hand out the same failure again.
                self.offset = self.bytes.len();
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n, Some(n))
    }
}

impl FusedIterator for RecordCursor {}
