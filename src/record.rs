//! Decoded records and the shapes they can be handed out in.
//!
//! A `GenericRecord` is the raw decoded unit: file id, rank and the two counter arrays,
//! aligned with the module's registry names. Callers ask for one of three shapes:
//!
//!   * `Shape::Numeric` -- the counter arrays as they are.
//!   * `Shape::Named` -- counters paired with their registry names, in registry order.
//!   * `Shape::Tabular` -- one table for counters and one for fcounters, one row per record,
//!     each with leading `id` and `rank` columns.
//!
//! The id is a `u64` in every shape; the `id` column of a table is always `ColumnData::U64`.

use std::fmt;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::registry::{self, ModuleSchema};

/// Requested output shape of a decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Numeric,
    Named,
    Tabular,
}

#[derive(Clone, Serialize)]
pub struct GenericRecord {
    #[serde(skip)]
    schema: &'static ModuleSchema,
    id: u64,
    rank: i64,
    counters: Vec<i64>,
    fcounters: Vec<f64>,
}

impl GenericRecord {
    /// Build a record for `module`, checking the counter arrays against the registry.
    pub fn new(
        module: &str,
        id: u64,
        rank: i64,
        counters: Vec<i64>,
        fcounters: Vec<f64>,
    ) -> Result<GenericRecord> {
        GenericRecord::with_schema(registry::schema(module)?, id, rank, counters, fcounters)
    }

    pub(crate) fn with_schema(
        schema: &'static ModuleSchema,
        id: u64,
        rank: i64,
        counters: Vec<i64>,
        fcounters: Vec<f64>,
    ) -> Result<GenericRecord> {
        if counters.len() != schema.counters.len() {
            return Err(Error::Schema {
                module: schema.name.to_string(),
                what: "counter count",
                expected: schema.counters.len(),
                found: counters.len(),
            });
        }
        if fcounters.len() != schema.fcounters.len() {
            return Err(Error::Schema {
                module: schema.name.to_string(),
                what: "fcounter count",
                expected: schema.fcounters.len(),
                found: fcounters.len(),
            });
        }

        Ok(GenericRecord {
            schema,
            id,
            rank,
            counters,
            fcounters,
        })
    }

    pub fn schema(&self) -> &'static ModuleSchema {
        self.schema
    }

    pub fn module(&self) -> &'static str {
        self.schema.name
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Rank that produced the record, -1 for records shared by all ranks.
    pub fn rank(&self) -> i64 {
        self.rank
    }

    pub fn counters(&self) -> &[i64] {
        &self.counters
    }

    pub fn fcounters(&self) -> &[f64] {
        &self.fcounters
    }

    pub fn counter(&self, name: &str) -> Option<i64> {
        self.schema.counter_index(name).map(|i| self.counters[i])
    }

    pub fn fcounter(&self, name: &str) -> Option<f64> {
        self.schema.fcounter_index(name).map(|i| self.fcounters[i])
    }

    pub fn to_shape(&self, shape: Shape) -> DecodedRecord {
        let data = match shape {
            Shape::Numeric => RecordData::Numeric {
                counters: self.counters.clone(),
                fcounters: self.fcounters.clone(),
            },
            Shape::Named => RecordData::Named {
                counters: NamedCounters::new(self.schema.counters, &self.counters),
                fcounters: NamedCounters::new(self.schema.fcounters, &self.fcounters),
            },
            Shape::Tabular => {
                RecordData::Tabular(TabularRecord::new(self.schema, std::slice::from_ref(self)))
            }
        };

        DecodedRecord {
            id: self.id,
            rank: self.rank,
            data,
        }
    }
}

impl PartialEq for GenericRecord {
    fn eq(&self, other: &GenericRecord) -> bool {
        self.schema.id == other.schema.id
            && self.id == other.id
            && self.rank == other.rank
            && self.counters == other.counters
            && self.fcounters == other.fcounters
    }
}

impl fmt::Debug for GenericRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("GenericRecord")
            .field("module", &self.schema.name)
            .field("id", &self.id)
            .field("rank", &self.rank)
            .field("counters", &self.counters)
            .field("fcounters", &self.fcounters)
            .finish()
    }
}

/// One record in a requested shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedRecord {
    pub id: u64,
    pub rank: i64,
    #[serde(flatten)]
    pub data: RecordData,
}

impl DecodedRecord {
    pub fn shape(&self) -> Shape {
        match self.data {
            RecordData::Numeric { .. } => Shape::Numeric,
            RecordData::Named { .. } => Shape::Named,
            RecordData::Tabular(_) => Shape::Tabular,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecordData {
    Numeric {
        counters: Vec<i64>,
        fcounters: Vec<f64>,
    },
    Named {
        counters: NamedCounters<i64>,
        fcounters: NamedCounters<f64>,
    },
    Tabular(TabularRecord),
}

/// Counter values keyed by registry name, kept in registry order.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedCounters<T> {
    entries: Vec<(&'static str, T)>,
}

impl<T: Copy> NamedCounters<T> {
    fn new(names: &'static [&'static str], values: &[T]) -> NamedCounters<T> {
        NamedCounters {
            entries: names.iter().copied().zip(values.iter().copied()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(n, _)| *n)
    }

    pub fn values(&self) -> impl Iterator<Item = T> + '_ {
        self.entries.iter().map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, T)> + '_ {
        self.entries.iter().copied()
    }

    pub fn get(&self, name: &str) -> Option<T> {
        self.entries.iter().find(|(n, _)| *n == name).map(|(_, v)| *v)
    }
}

impl<T: Serialize> Serialize for NamedCounters<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    U64,
    I64,
    F64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnData {
    U64(Vec<u64>),
    I64(Vec<i64>),
    F64(Vec<f64>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: &'static str,
    data: ColumnData,
}

impl Column {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn dtype(&self) -> DType {
        match self.data {
            ColumnData::U64(_) => DType::U64,
            ColumnData::I64(_) => DType::I64,
            ColumnData::F64(_) => DType::F64,
        }
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::U64(v) => v.len(),
            ColumnData::I64(v) => v.len(),
            ColumnData::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_u64(&self) -> Option<&[u64]> {
        match &self.data {
            ColumnData::U64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<&[i64]> {
        match &self.data {
            ColumnData::I64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<&[f64]> {
        match &self.data {
            ColumnData::F64(v) => Some(v),
            _ => None,
        }
    }
}

/// Column-oriented table, one row per record.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    fn with_key_columns(records: &[GenericRecord]) -> Table {
        Table {
            columns: vec![
                Column {
                    name: "id",
                    data: ColumnData::U64(records.iter().map(|r| r.id).collect()),
                },
                Column {
                    name: "rank",
                    data: ColumnData::I64(records.iter().map(|r| r.rank).collect()),
                },
            ],
        }
    }

    fn counters(schema: &'static ModuleSchema, records: &[GenericRecord]) -> Table {
        let mut table = Table::with_key_columns(records);
        table
            .columns
            .extend(schema.counters.iter().copied().enumerate().map(|(i, name)| Column {
                name,
                data: ColumnData::I64(records.iter().map(|r| r.counters[i]).collect()),
            }));
        table
    }

    fn fcounters(schema: &'static ModuleSchema, records: &[GenericRecord]) -> Table {
        let mut table = Table::with_key_columns(records);
        table
            .columns
            .extend(schema.fcounters.iter().copied().enumerate().map(|(i, name)| Column {
                name,
                data: ColumnData::F64(records.iter().map(|r| r.fcounters[i]).collect()),
            }));
        table
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn height(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.height(), self.width())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for column in &self.columns {
            map.serialize_entry(column.name, &column.data)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabularRecord {
    pub counters: Table,
    pub fcounters: Table,
}

impl TabularRecord {
    fn new(schema: &'static ModuleSchema, records: &[GenericRecord]) -> TabularRecord {
        TabularRecord {
            counters: Table::counters(schema, records),
            fcounters: Table::fcounters(schema, records),
        }
    }
}

/// All records of a module in a requested shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecordSet {
    /// One entry per record (`Shape::Numeric` or `Shape::Named`).
    PerRecord(Vec<DecodedRecord>),
    /// One row per record (`Shape::Tabular`).
    Tabular(TabularRecord),
}

impl RecordSet {
    /// Shape a non-empty set of records of one module.
    pub(crate) fn new(records: &[GenericRecord], shape: Shape) -> RecordSet {
        match (shape, records.first()) {
            (Shape::Tabular, Some(first)) => {
                RecordSet::Tabular(TabularRecord::new(first.schema, records))
            }
            _ => RecordSet::PerRecord(records.iter().map(|r| r.to_shape(shape)).collect()),
        }
    }

    /// Number of records in the set.
    pub fn len(&self) -> usize {
        match self {
            RecordSet::PerRecord(v) => v.len(),
            RecordSet::Tabular(t) => t.counters.height(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
