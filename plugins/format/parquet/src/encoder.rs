use std::io::Write;

use parquet::column::writer::ColumnWriter;
use parquet::data_type::{ByteArray, FixedLenByteArray};
use parquet::file::properties::WriterPropertiesPtr;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::types::TypePtr;
use tessera_api::codec::{ColumnEncoder, EncodeSummary};
use tessera_api::error::CodecError;
use tessera_api::schema::{Field, FieldKind, PhysicalType, Schema};
use tessera_api::value::Scalar;

// ═══════════════════════════════════════════════════════════════
//  Buffered record tree
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
enum LeafValue {
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
}

enum Node {
    Leaf(LeafValue),
    Group(GroupNode),
}

/// Values collected for one group instance, one slot per declared field.
struct GroupNode {
    values: Vec<Vec<Node>>,
}

impl GroupNode {
    fn new(fields: usize) -> Self {
        Self {
            values: (0..fields).map(|_| Vec::new()).collect(),
        }
    }
}

/// An open group on the event stack.
struct Frame {
    /// Field indices from the root to this group; empty for the record itself.
    path: Vec<usize>,
    node: GroupNode,
    open: Option<usize>,
}

fn group_fields<'a>(schema: &'a Schema, path: &[usize]) -> &'a [Field] {
    path.iter()
        .fold(&schema.fields[..], |fields, &i| fields[i].children())
}

// ═══════════════════════════════════════════════════════════════
//  Column buffers
// ═══════════════════════════════════════════════════════════════

/// Striped values and levels of one leaf column.
struct ColumnBuffer {
    path: String,
    values: Vec<LeafValue>,
    def_levels: Vec<i16>,
    rep_levels: Vec<i16>,
    max_def: i16,
    max_rep: i16,
}

impl ColumnBuffer {
    fn push(&mut self, value: LeafValue, rep: i16, def: i16) {
        self.values.push(value);
        self.rep_levels.push(rep);
        self.def_levels.push(def);
    }

    fn push_null(&mut self, rep: i16, def: i16) {
        self.rep_levels.push(rep);
        self.def_levels.push(def);
    }

    fn write_to(self, writer: &mut ColumnWriter<'_>) -> Result<(), CodecError> {
        let defs = (self.max_def > 0).then_some(&self.def_levels[..]);
        let reps = (self.max_rep > 0).then_some(&self.rep_levels[..]);
        let path = self.path;
        let mismatch = |v: &LeafValue| {
            CodecError::encode(format!("column '{path}': unexpected buffered value {v:?}"))
        };
        let written = match writer {
            ColumnWriter::BoolColumnWriter(w) => {
                let values = collect(&self.values, |v| match v {
                    LeafValue::Boolean(b) => Some(*b),
                    _ => None,
                })
                .map_err(mismatch)?;
                w.write_batch(&values, defs, reps)
            }
            ColumnWriter::Int32ColumnWriter(w) => {
                let values = collect(&self.values, |v| match v {
                    LeafValue::Int32(i) => Some(*i),
                    _ => None,
                })
                .map_err(mismatch)?;
                w.write_batch(&values, defs, reps)
            }
            ColumnWriter::Int64ColumnWriter(w) => {
                let values = collect(&self.values, |v| match v {
                    LeafValue::Int64(i) => Some(*i),
                    _ => None,
                })
                .map_err(mismatch)?;
                w.write_batch(&values, defs, reps)
            }
            ColumnWriter::FloatColumnWriter(w) => {
                let values = collect(&self.values, |v| match v {
                    LeafValue::Float(f) => Some(*f),
                    _ => None,
                })
                .map_err(mismatch)?;
                w.write_batch(&values, defs, reps)
            }
            ColumnWriter::DoubleColumnWriter(w) => {
                let values = collect(&self.values, |v| match v {
                    LeafValue::Double(d) => Some(*d),
                    _ => None,
                })
                .map_err(mismatch)?;
                w.write_batch(&values, defs, reps)
            }
            ColumnWriter::ByteArrayColumnWriter(w) => {
                let values = collect(&self.values, |v| match v {
                    LeafValue::Bytes(b) => Some(ByteArray::from(b.clone())),
                    _ => None,
                })
                .map_err(mismatch)?;
                w.write_batch(&values, defs, reps)
            }
            ColumnWriter::FixedLenByteArrayColumnWriter(w) => {
                let values = collect(&self.values, |v| match v {
                    LeafValue::Bytes(b) => Some(FixedLenByteArray::from(ByteArray::from(b.clone()))),
                    _ => None,
                })
                .map_err(mismatch)?;
                w.write_batch(&values, defs, reps)
            }
            ColumnWriter::Int96ColumnWriter(_) => {
                return Err(CodecError::unsupported(format!(
                    "column '{path}': int96 columns cannot be written"
                )));
            }
        };
        written
            .map(|_| ())
            .map_err(|e| CodecError::encode(format!("column '{path}': {e}")))
    }
}

fn collect<T>(values: &[LeafValue], pick: impl Fn(&LeafValue) -> Option<T>) -> Result<Vec<T>, &LeafValue> {
    values.iter().map(|v| pick(v).ok_or(v)).collect()
}

/// One buffer per leaf, depth-first, with the maximum levels of each leaf.
fn column_buffers(fields: &[Field], prefix: &str, def: i16, rep: i16, out: &mut Vec<ColumnBuffer>) {
    for field in fields {
        let def = def + i16::from(!field.is_required());
        let rep = rep + i16::from(field.is_repeated());
        let path = if prefix.is_empty() {
            field.name.clone()
        } else {
            format!("{prefix}.{}", field.name)
        };
        match &field.kind {
            FieldKind::Primitive(_) => out.push(ColumnBuffer {
                path,
                values: Vec::new(),
                def_levels: Vec::new(),
                rep_levels: Vec::new(),
                max_def: def,
                max_rep: rep,
            }),
            FieldKind::Group(children) => column_buffers(children, &path, def, rep, out),
        }
    }
}

/// Stripe one group instance into the leaf buffers starting at `first_leaf`.
///
/// `rep` is the repetition level of the first value written below this
/// group; `rep_depth` is the number of repeated ancestors, i.e. the level a
/// repeated child restarts at.
fn shred_group(
    fields: &[Field],
    node: GroupNode,
    first_leaf: usize,
    rep: i16,
    def: i16,
    rep_depth: i16,
    columns: &mut [ColumnBuffer],
) {
    let mut leaf = first_leaf;
    for (field, values) in fields.iter().zip(node.values) {
        let field_def = def + i16::from(!field.is_required());
        let field_rep = rep_depth + i16::from(field.is_repeated());
        let width = field.leaf_count();
        if values.is_empty() {
            for column in &mut columns[leaf..leaf + width] {
                column.push_null(rep, def);
            }
        }
        for (k, value) in values.into_iter().enumerate() {
            let r = if k == 0 { rep } else { field_rep };
            match value {
                Node::Leaf(v) => columns[leaf].push(v, r, field_def),
                Node::Group(g) => {
                    shred_group(field.children(), g, leaf, r, field_def, field_rep, columns)
                }
            }
        }
        leaf += width;
    }
}

fn coerce(physical: PhysicalType, value: Scalar, field: &str) -> Result<LeafValue, CodecError> {
    let fixed = |n: i32, bytes: Vec<u8>| {
        if bytes.len() == n as usize {
            Ok(LeafValue::Bytes(bytes))
        } else {
            Err(CodecError::encode(format!(
                "field '{field}': {} bytes written to fixed_len_byte_array({n})",
                bytes.len()
            )))
        }
    };
    match (physical, value) {
        (PhysicalType::Boolean, Scalar::Boolean(b)) => Ok(LeafValue::Boolean(b)),
        (PhysicalType::Int32, Scalar::Int(i)) => Ok(LeafValue::Int32(i)),
        (PhysicalType::Int32, Scalar::Long(l)) => i32::try_from(l)
            .map(LeafValue::Int32)
            .map_err(|_| CodecError::encode(format!("field '{field}': {l} does not fit int32"))),
        (PhysicalType::Int64, Scalar::Int(i)) => Ok(LeafValue::Int64(i.into())),
        (PhysicalType::Int64, Scalar::Long(l)) => Ok(LeafValue::Int64(l)),
        (PhysicalType::Float, Scalar::Float(f)) => Ok(LeafValue::Float(f)),
        (PhysicalType::Double, Scalar::Float(f)) => Ok(LeafValue::Double(f.into())),
        (PhysicalType::Double, Scalar::Double(d)) => Ok(LeafValue::Double(d)),
        (PhysicalType::Binary, Scalar::Text(s)) => Ok(LeafValue::Bytes(s.into_bytes())),
        (PhysicalType::Binary, Scalar::Binary(b)) => Ok(LeafValue::Bytes(b)),
        (PhysicalType::FixedLenBinary(n), Scalar::Text(s)) => fixed(n, s.into_bytes()),
        (PhysicalType::FixedLenBinary(n), Scalar::Binary(b)) => fixed(n, b),
        (PhysicalType::Int96, _) => Err(CodecError::unsupported(format!(
            "field '{field}': int96 values cannot be written"
        ))),
        (_, Scalar::Null) => Err(CodecError::encode(format!(
            "field '{field}': null value written, omit the field instead"
        ))),
        (physical, value) => Err(CodecError::encode(format!(
            "field '{field}': cannot write {value:?} to a {physical} column"
        ))),
    }
}

// ═══════════════════════════════════════════════════════════════
//  ParquetEncoder
// ═══════════════════════════════════════════════════════════════

/// Record-shredding event sink.
///
/// Validates the event grammar against the schema as events arrive,
/// buffers each record as a tree, and stripes it into repetition /
/// definition levels on `end_record`. Nothing touches the sink until
/// `close`, which writes every striped record as a single row group.
pub struct ParquetEncoder {
    sink: Box<dyn Write + Send>,
    schema: Schema,
    parquet_schema: TypePtr,
    props: WriterPropertiesPtr,
    columns: Vec<ColumnBuffer>,
    stack: Vec<Frame>,
    records: u64,
}

impl ParquetEncoder {
    pub(crate) fn new(
        sink: Box<dyn Write + Send>,
        schema: Schema,
        parquet_schema: TypePtr,
        props: WriterPropertiesPtr,
    ) -> Self {
        let mut columns = Vec::with_capacity(schema.leaf_count());
        column_buffers(&schema.fields, "", 0, 0, &mut columns);
        Self {
            sink,
            schema,
            parquet_schema,
            props,
            columns,
            stack: Vec::new(),
            records: 0,
        }
    }

    fn top(&mut self, event: &str) -> Result<&mut Frame, CodecError> {
        self.stack
            .last_mut()
            .ok_or_else(|| CodecError::encode(format!("{event} outside of a record")))
    }

    /// The field currently open in the innermost group.
    fn open_field(&mut self, event: &str) -> Result<(&Field, &mut Frame), CodecError> {
        let frame = self
            .stack
            .last_mut()
            .ok_or_else(|| CodecError::encode(format!("{event} outside of a record")))?;
        let index = frame
            .open
            .ok_or_else(|| CodecError::encode(format!("{event} with no open field")))?;
        let field = &group_fields(&self.schema, &frame.path)[index];
        Ok((field, frame))
    }

    /// Fails when the closing group misses a required field.
    fn check_required(&self, frame: &Frame) -> Result<(), CodecError> {
        let fields = group_fields(&self.schema, &frame.path);
        if let Some(open) = frame.open {
            return Err(CodecError::encode(format!(
                "field '{}' is still open",
                fields[open].name
            )));
        }
        for (field, values) in fields.iter().zip(&frame.node.values) {
            if field.is_required() && values.is_empty() {
                return Err(CodecError::encode(format!(
                    "required field '{}' was not written",
                    field.name
                )));
            }
        }
        Ok(())
    }
}

impl ColumnEncoder for ParquetEncoder {
    fn begin_record(&mut self) -> Result<(), CodecError> {
        if !self.stack.is_empty() {
            return Err(CodecError::encode("begin_record inside an unfinished record"));
        }
        self.stack.push(Frame {
            path: Vec::new(),
            node: GroupNode::new(self.schema.fields.len()),
            open: None,
        });
        Ok(())
    }

    fn end_record(&mut self) -> Result<(), CodecError> {
        match self.stack.len() {
            0 => return Err(CodecError::encode("end_record outside of a record")),
            1 => {}
            n => {
                return Err(CodecError::encode(format!(
                    "end_record with {} unclosed groups",
                    n - 1
                )));
            }
        }
        self.check_required(&self.stack[0])?;
        let Some(frame) = self.stack.pop() else {
            return Err(CodecError::encode("end_record outside of a record"));
        };
        shred_group(&self.schema.fields, frame.node, 0, 0, 0, 0, &mut self.columns);
        self.records += 1;
        tracing::trace!(record = self.records, "record striped");
        Ok(())
    }

    fn begin_field(&mut self, name: &str, index: usize) -> Result<(), CodecError> {
        let frame = self.top("begin_field")?;
        let path = frame.path.clone();
        let fields = group_fields(&self.schema, &path);
        let Some(frame) = self.stack.last_mut() else {
            return Err(CodecError::encode("begin_field outside of a record"));
        };
        if let Some(open) = frame.open {
            return Err(CodecError::encode(format!(
                "begin_field '{name}' while field '{}' is still open",
                fields[open].name
            )));
        }
        let field = fields.get(index).ok_or_else(|| {
            CodecError::encode(format!(
                "field index {index} out of range, group has {} fields",
                fields.len()
            ))
        })?;
        if field.name != name {
            return Err(CodecError::encode(format!(
                "field name mismatch at index {index}: schema has '{}', got '{name}'",
                field.name
            )));
        }
        if !frame.node.values[index].is_empty() {
            return Err(CodecError::encode(format!("field '{name}' written twice")));
        }
        frame.open = Some(index);
        Ok(())
    }

    fn end_field(&mut self) -> Result<(), CodecError> {
        let (field, frame) = self.open_field("end_field")?;
        let index = frame.open.unwrap_or_default();
        if frame.node.values[index].is_empty() {
            return Err(CodecError::encode(format!(
                "empty field '{}', omit the field instead",
                field.name
            )));
        }
        frame.open = None;
        Ok(())
    }

    fn begin_group(&mut self) -> Result<(), CodecError> {
        let (field, frame) = self.open_field("begin_group")?;
        let index = frame.open.unwrap_or_default();
        let children = match &field.kind {
            FieldKind::Group(children) => children.len(),
            FieldKind::Primitive(p) => {
                return Err(CodecError::encode(format!(
                    "begin_group on primitive field '{}' ({p})",
                    field.name
                )));
            }
        };
        if !field.is_repeated() && !frame.node.values[index].is_empty() {
            return Err(CodecError::encode(format!(
                "second value for non-repeated field '{}'",
                field.name
            )));
        }
        let mut path = frame.path.clone();
        path.push(index);
        self.stack.push(Frame {
            path,
            node: GroupNode::new(children),
            open: None,
        });
        Ok(())
    }

    fn end_group(&mut self) -> Result<(), CodecError> {
        if self.stack.len() < 2 {
            return Err(CodecError::encode("end_group without matching begin_group"));
        }
        if let Some(frame) = self.stack.last() {
            self.check_required(frame)?;
        }
        let Some(frame) = self.stack.pop() else {
            return Err(CodecError::encode("end_group without matching begin_group"));
        };
        let parent = self.top("end_group")?;
        let index = parent.open.unwrap_or_default();
        parent.node.values[index].push(Node::Group(frame.node));
        Ok(())
    }

    fn write_scalar(&mut self, value: Scalar) -> Result<(), CodecError> {
        let (field, frame) = self.open_field("write_scalar")?;
        let index = frame.open.unwrap_or_default();
        let physical = match &field.kind {
            FieldKind::Primitive(p) => *p,
            FieldKind::Group(_) => {
                return Err(CodecError::encode(format!(
                    "scalar {value} written to group field '{}'",
                    field.name
                )));
            }
        };
        if !field.is_repeated() && !frame.node.values[index].is_empty() {
            return Err(CodecError::encode(format!(
                "second value for non-repeated field '{}'",
                field.name
            )));
        }
        let leaf = coerce(physical, value, &field.name)?;
        frame.node.values[index].push(Node::Leaf(leaf));
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<EncodeSummary, CodecError> {
        let this = *self;
        if !this.stack.is_empty() {
            tracing::warn!(
                schema = %this.schema.name,
                "discarding unfinished record on close"
            );
        }
        let summary = EncodeSummary {
            records: this.records,
            columns: this.columns.len(),
        };

        let encode = |e: parquet::errors::ParquetError| CodecError::encode(e.to_string());
        let mut writer =
            SerializedFileWriter::new(this.sink, this.parquet_schema, this.props).map_err(encode)?;
        if this.records > 0 {
            let mut row_group = writer.next_row_group().map_err(encode)?;
            let mut buffers = this.columns.into_iter();
            while let Some(mut column) = row_group.next_column().map_err(encode)? {
                let buffer = buffers
                    .next()
                    .ok_or_else(|| CodecError::encode("file schema has more columns than buffers"))?;
                buffer.write_to(column.untyped())?;
                column.close().map_err(encode)?;
            }
            row_group.close().map_err(encode)?;
        }
        writer.close().map_err(encode)?;

        tracing::debug!(records = summary.records, columns = summary.columns, "parquet file closed");
        Ok(summary)
    }
}
