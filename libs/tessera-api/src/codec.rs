use std::collections::BTreeMap;
use std::io::Write;

use crate::config::ConfigValues;
use crate::error::CodecError;
use crate::schema::Schema;
use crate::value::{RawValue, Scalar};

/// Event sink of a columnar encoder.
///
/// One record is emitted as:
///
/// ```text
/// begin_record
///   begin_field(name, index)
///     write_scalar(v)                        -- primitive field
///     begin_group ... end_group              -- group field, once per value
///   end_field
/// end_record
/// ```
///
/// Repeated fields receive several values between one `begin_field` /
/// `end_field` pair. Absent fields get no events at all.
pub trait ColumnEncoder {
    fn begin_record(&mut self) -> Result<(), CodecError>;
    fn end_record(&mut self) -> Result<(), CodecError>;
    fn begin_field(&mut self, name: &str, index: usize) -> Result<(), CodecError>;
    fn end_field(&mut self) -> Result<(), CodecError>;
    fn begin_group(&mut self) -> Result<(), CodecError>;
    fn end_group(&mut self) -> Result<(), CodecError>;
    fn write_scalar(&mut self, value: Scalar) -> Result<(), CodecError>;

    /// Flush every completed record and finalize the file. A record that
    /// was begun but never ended is dropped.
    fn close(self: Box<Self>) -> Result<EncodeSummary, CodecError>;
}

/// What `close` reports back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeSummary {
    pub records: u64,
    pub columns: usize,
}

/// Pull-based reader over one file's records.
pub trait RecordReader {
    /// Schema stored in the file.
    fn schema(&self) -> &Schema;
    fn next_record(&mut self) -> Result<Option<RawValue>, CodecError>;
}

/// Columnar format factory: binds schemas to encoders and bytes to readers.
pub trait ColumnFormat: Send + Sync {
    /// File extension, without the dot.
    fn extension(&self) -> &str;

    fn encoder(
        &self,
        sink: Box<dyn Write + Send>,
        schema: &Schema,
        metadata: &BTreeMap<String, String>,
    ) -> Result<Box<dyn ColumnEncoder>, CodecError>;

    /// Open a reader over the full contents of a file. No projection:
    /// every column is read.
    fn reader(&self, data: Vec<u8>) -> Result<Box<dyn RecordReader>, CodecError>;

    /// Parse the format's textual schema syntax.
    fn parse_schema(&self, text: &str) -> Result<Schema, CodecError>;

    /// Fresh, uninitialized deserializer for raw records of this format.
    fn deserializer(&self) -> Box<dyn RecordDeserializer>;
}

/// Typed interpretation of one raw record.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Null,
    Boolean(bool),
    Int(i32),
    BigInt(i64),
    Float(f32),
    Double(f64),
    String(String),
    Binary(Vec<u8>),
    List(Vec<TypedValue>),
    Map(Vec<(TypedValue, TypedValue)>),
    Struct(Vec<(String, TypedValue)>),
}

/// Schema-driven deserializer bound to a column declaration.
pub trait RecordDeserializer {
    /// Bind to `columns` / `columns.types`.
    fn initialize(&mut self, config: &ConfigValues) -> Result<(), CodecError>;
    fn deserialize(&self, raw: &RawValue) -> Result<TypedValue, CodecError>;
}
