//! Produces darshan logs in the format `LogFile` reads.
//!
//! Regions are laid out as header, job data, name records and then one region per module in
//! module id order. Each region after the header is compressed on its own.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian, NativeEndian, WriteBytesExt};
use flate2::write::ZlibEncoder;
use log::{debug, warn};

use super::log_format::*;
use crate::error::{Error, Result};
use crate::record::GenericRecord;
use crate::registry::{self, ModuleId};

/// Builder for a darshan log.
#[derive(Debug)]
pub struct LogWriter {
    job: Job,
    exe: String,
    mounts: Vec<Mount>,
    names: Vec<NameRecord>,
    modules: BTreeMap<ModuleId, Vec<GenericRecord>>,
    partial: ModuleFlags,
    compression: CompressionType,
    endianness: Endianness,
}

impl LogWriter {
    pub fn new(job: Job) -> LogWriter {
        LogWriter {
            job,
            exe: String::new(),
            mounts: Vec::new(),
            names: Vec::new(),
            modules: BTreeMap::new(),
            partial: ModuleFlags::empty(),
            compression: CompressionType::Zlib,
            endianness: Endianness::Little,
        }
    }

    pub fn exe<S: Into<String>>(&mut self, exe: S) -> &mut LogWriter {
        self.exe = exe.into();
        self
    }

    pub fn mount<S: Into<String>, T: Into<String>>(
        &mut self,
        fs_type: S,
        mount_point: T,
    ) -> &mut LogWriter {
        self.mounts.push(Mount {
            fs_type: fs_type.into(),
            mount_point: mount_point.into(),
        });
        self
    }

    pub fn name<S: Into<String>>(&mut self, id: u64, name: S) -> &mut LogWriter {
        self.names.push(NameRecord {
            id,
            name: name.into(),
        });
        self
    }

    /// Only zlib and no compression can be written.
    pub fn compression(&mut self, compression: CompressionType) -> Result<&mut LogWriter> {
        match compression {
            CompressionType::Zlib | CompressionType::None => {
                self.compression = compression;
                Ok(self)
            }
            c => Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("can not write {:?} compressed logs", c),
            ))),
        }
    }

    pub fn endianness(&mut self, endianness: Endianness) -> &mut LogWriter {
        self.endianness = endianness;
        self
    }

    /// Record `module` as present even if no records are added for it.
    pub fn module(&mut self, module: &str) -> Result<&mut LogWriter> {
        let schema = registry::schema(module)?;
        self.modules.entry(schema.id).or_default();
        Ok(self)
    }

    pub fn record(&mut self, record: GenericRecord) -> &mut LogWriter {
        self.modules
            .entry(record.schema().id)
            .or_default()
            .push(record);
        self
    }

    /// Flag `module` as holding partial data.
    pub fn partial(&mut self, module: &str) -> Result<&mut LogWriter> {
        let schema = registry::schema(module)?;
        self.partial |= ModuleFlags::module(schema.id);
        Ok(self)
    }

    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut w = BufWriter::new(file);
        self.write(&mut w)?;
        w.flush()?;
        debug!("wrote log {}", path.as_ref().display());
        Ok(())
    }

    pub fn write<W: Write>(&self, w: W) -> Result<()> {
        match self.endianness {
            Endianness::Little => self.write_with::<LittleEndian, W>(w),
            Endianness::Big => self.write_with::<BigEndian, W>(w),
            Endianness::Native => self.write_with::<NativeEndian, W>(w),
        }
    }

    fn write_with<B: ByteOrder, W: Write>(&self, mut w: W) -> Result<()> {
        let job = self.compress(self.encode_job::<B>()?)?;
        let names = self.compress(self.encode_names::<B>()?)?;

        let mut offset = (HEADER_SIZE + job.len()) as u64;
        let name_map = LogMap {
            off: offset,
            len: names.len() as u64,
        };
        offset += name_map.len;

        let mut mod_map = vec![LogMap::default(); MAX_MODS];
        let mut mod_ver = vec![0u32; MAX_MODS];
        let mut regions = Vec::with_capacity(self.modules.len());
        for (id, records) in &self.modules {
            let region = self.compress(encode_records::<B>(records)?)?;
            mod_map[id.index()] = LogMap {
                off: offset,
                len: region.len() as u64,
            };
            mod_ver[id.index()] = id.schema().map(|s| s.version).unwrap_or(0);
            offset += region.len() as u64;
            regions.push(region);
        }

        let header = LogHeader {
            version: LOG_VERSION.to_string(),
            endianness: self.endianness,
            compression: self.compression,
            partial_flags: self.partial,
            name_map,
            mod_map,
            mod_ver,
        };
        w.write_all(&encode_header::<B>(&header)?)?;
        w.write_all(&job)?;
        w.write_all(&names)?;
        for region in regions {
            w.write_all(&region)?;
        }
        Ok(())
    }

    fn compress(&self, bytes: Vec<u8>) -> Result<Vec<u8>> {
        match self.compression {
            CompressionType::Zlib => {
                let mut enc = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
                enc.write_all(&bytes)?;
                Ok(enc.finish()?)
            }
            _ => Ok(bytes),
        }
    }

    fn encode_job<B: ByteOrder>(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(JOB_SIZE + self.exe.len() + 1);
        for v in [
            self.job.uid,
            self.job.start_time,
            self.job.end_time,
            self.job.nprocs,
            self.job.jobid,
        ] {
            out.write_i64::<B>(v)?;
        }

        let mut metadata: Vec<u8> = self
            .job
            .metadata
            .iter()
            .map(|(k, v)| format!("{}={}\n", k, v))
            .collect::<String>()
            .into_bytes();
        if metadata.len() >= JOB_METADATA_LEN {
            warn!(
                "job metadata is {} bytes, truncating to {}",
                metadata.len(),
                JOB_METADATA_LEN - 1
            );
            metadata.truncate(JOB_METADATA_LEN - 1);
        }
        metadata.resize(JOB_METADATA_LEN, 0);
        out.extend_from_slice(&metadata);

        out.extend_from_slice(self.exe.as_bytes());
        for m in &self.mounts {
            out.extend_from_slice(format!("\n{}\t{}", m.fs_type, m.mount_point).as_bytes());
        }
        out.push(0);
        Ok(out)
    }

    fn encode_names<B: ByteOrder>(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for n in &self.names {
            out.write_u64::<B>(n.id)?;
            out.extend_from_slice(n.name.as_bytes());
            out.push(0);
        }
        Ok(out)
    }
}

fn encode_records<B: ByteOrder>(records: &[GenericRecord]) -> Result<Vec<u8>> {
    let size = records.first().map(|r| r.schema().record_size()).unwrap_or(0);
    let mut out = Vec::with_capacity(size * records.len());
    for r in records {
        out.write_u64::<B>(r.id())?;
        out.write_i64::<B>(r.rank())?;
        for c in r.counters() {
            out.write_i64::<B>(*c)?;
        }
        for f in r.fcounters() {
            out.write_f64::<B>(*f)?;
        }
    }
    Ok(out)
}

fn encode_header<B: ByteOrder>(header: &LogHeader) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(HEADER_SIZE);

    let mut version = header.version.clone().into_bytes();
    version.resize(VERSION_STRING_LEN, 0);
    out.extend_from_slice(&version);
    out.write_i64::<B>(MAGIC_NR)?;
    out.write_u8(header.compression.as_u8())?;
    out.extend_from_slice(&[0u8; 3]);
    out.write_u32::<B>(header.partial_flags.bits())?;

    for map in std::iter::once(&header.name_map).chain(header.mod_map.iter()) {
        out.write_u64::<B>(map.off)?;
        out.write_u64::<B>(map.len)?;
    }
    for ver in &header.mod_ver {
        out.write_u32::<B>(*ver)?;
    }

    debug_assert_eq!(out.len(), HEADER_SIZE);
    Ok(out)
}
