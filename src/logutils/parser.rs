//! Uses the `nom` library to parse the on-disk format of darshan logs and transforms it
//! into more rust-like data-structures.
//!
//! Every multi-byte value is stored in the byte order of the machine that wrote the log.
//! `detect_endianness` works it out from the magic number, and all parsers below take the
//! result as an argument.
//!
//! # See also
//!   * `log_file.rs` -- uses these functions to read regions of an opened log
//!   * `log_format.rs` -- for all the struct definitions that are parsed here
//!

use std::collections::BTreeMap;

use nom::bytes::complete::{tag, take, take_till};
use nom::multi::{count, many0};
use nom::number::complete as num;
use nom::IResult;

use super::log_format::*;
use crate::record::GenericRecord;
use crate::registry::ModuleSchema;

fn take_bytes(input: &[u8], n: usize) -> IResult<&[u8], &[u8]> {
    take(n)(input)
}

fn parse_u8(input: &[u8]) -> IResult<&[u8], u8> {
    num::u8(input)
}

fn parse_u32(input: &[u8], endian: Endianness) -> IResult<&[u8], u32> {
    num::u32(endian)(input)
}

fn parse_u64(input: &[u8], endian: Endianness) -> IResult<&[u8], u64> {
    num::u64(endian)(input)
}

fn parse_i64(input: &[u8], endian: Endianness) -> IResult<&[u8], i64> {
    num::i64(endian)(input)
}

fn parse_f64(input: &[u8], endian: Endianness) -> IResult<&[u8], f64> {
    num::f64(endian)(input)
}

/// Text up to the first NUL byte of a fixed-size field.
fn fixed_string(bytes: &[u8]) -> String {
    bytes
        .split(|c| *c == 0x0)
        .next()
        .map(|slice| String::from_utf8_lossy(slice).into_owned())
        .unwrap_or_default()
}

// Parse a NUL terminated string.
fn parse_c_string(input: &[u8]) -> IResult<&[u8], String> {
    let (input, bytes) = take_till(|c| c == 0x0)(input)?;
    let (input, _) = tag(&[0x0u8][..])(input)?;
    Ok((input, String::from_utf8_lossy(bytes).into_owned()))
}

/// Work out the byte order of a log from the magic number following the version string.
pub fn detect_endianness(input: &[u8]) -> Option<Endianness> {
    let magic = input.get(VERSION_STRING_LEN..VERSION_STRING_LEN + 8)?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(magic);

    if i64::from_le_bytes(raw) == MAGIC_NR {
        Some(Endianness::Little)
    } else if i64::from_be_bytes(raw) == MAGIC_NR {
        Some(Endianness::Big)
    } else {
        None
    }
}

// Parse a region map.
pub fn parse_log_map(input: &[u8], endian: Endianness) -> IResult<&[u8], LogMap> {
    let (input, off) = parse_u64(input, endian)?;
    let (input, len) = parse_u64(input, endian)?;
    Ok((input, LogMap { off, len }))
}

// Parse the log header.
pub fn parse_header(input: &[u8], endian: Endianness) -> IResult<&[u8], LogHeader> {
    let (input, version) = take_bytes(input, VERSION_STRING_LEN)?;
    let (input, _magic) = parse_i64(input, endian)?;
    let (input, comp_type) = parse_u8(input)?;
    let (input, _) = take_bytes(input, 3)?; // padding
    let (input, partial_flag) = parse_u32(input, endian)?;
    let (input, name_map) = parse_log_map(input, endian)?;
    let (input, mod_map) = count(|i| parse_log_map(i, endian), MAX_MODS)(input)?;
    let (input, mod_ver) = count(|i| parse_u32(i, endian), MAX_MODS)(input)?;

    Ok((
        input,
        LogHeader {
            version: fixed_string(version),
            endianness: endian,
            compression: CompressionType::new(comp_type),
            partial_flags: ModuleFlags::from_bits_truncate(partial_flag),
            name_map,
            mod_map,
            mod_ver,
        },
    ))
}

/// Parse `key=value` lines of the job metadata field. Lines without `=` are ignored.
pub fn parse_job_metadata(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Split the executable/mount buffer into the command line and the mount table.
fn parse_exe_mounts(text: &str) -> (String, Vec<Mount>) {
    let mut lines = text.split('\n');
    let exe = lines.next().unwrap_or_default().to_string();
    let mounts = lines
        .filter_map(|line| line.split_once('\t'))
        .map(|(fs_type, mount_point)| Mount {
            fs_type: fs_type.to_string(),
            mount_point: mount_point.to_string(),
        })
        .collect();
    (exe, mounts)
}

// Parse the decompressed job region.
pub fn parse_job_region(input: &[u8], endian: Endianness) -> IResult<&[u8], JobRegion> {
    let (input, uid) = parse_i64(input, endian)?;
    let (input, start_time) = parse_i64(input, endian)?;
    let (input, end_time) = parse_i64(input, endian)?;
    let (input, nprocs) = parse_i64(input, endian)?;
    let (input, jobid) = parse_i64(input, endian)?;
    let (input, metadata) = take_bytes(input, JOB_METADATA_LEN)?;
    // The exe/mount buffer is NUL terminated by newer writers; tolerate its absence.
    let exe_mounts = fixed_string(input);
    let (exe, mounts) = parse_exe_mounts(&exe_mounts);

    Ok((
        &input[input.len()..],
        JobRegion {
            job: Job {
                uid,
                start_time,
                end_time,
                nprocs,
                jobid,
                metadata: parse_job_metadata(&fixed_string(metadata)),
            },
            exe,
            mounts,
        },
    ))
}

// Parse a single name record.
pub fn parse_name_record(input: &[u8], endian: Endianness) -> IResult<&[u8], NameRecord> {
    let (input, id) = parse_u64(input, endian)?;
    let (input, name) = parse_c_string(input)?;
    Ok((input, NameRecord { id, name }))
}

// Parse the decompressed name region.
pub fn parse_name_records(input: &[u8], endian: Endianness) -> IResult<&[u8], Vec<NameRecord>> {
    many0(|i| parse_name_record(i, endian))(input)
}

/// Parse one fixed-size module record laid out as `schema` describes.
///
/// The record is built through `GenericRecord::with_schema`, so counts are checked
/// against the registry a second time; with the counts taken from the same schema this
/// can not fail, and a failure is reported as a nom `Verify` error.
pub fn parse_generic_record<'a>(
    input: &'a [u8],
    schema: &'static ModuleSchema,
    endian: Endianness,
) -> IResult<&'a [u8], GenericRecord> {
    let (input, id) = parse_u64(input, endian)?;
    let (input, rank) = parse_i64(input, endian)?;
    let (input, counters) = count(|i| parse_i64(i, endian), schema.counters.len())(input)?;
    let (input, fcounters) = count(|i| parse_f64(i, endian), schema.fcounters.len())(input)?;

    match GenericRecord::with_schema(schema, id, rank, counters, fcounters) {
        Ok(record) => Ok((input, record)),
        Err(_) => Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        ))),
    }
}
