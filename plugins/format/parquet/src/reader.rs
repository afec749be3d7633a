use bytes::Bytes;
use parquet::file::reader::FileReader;
use parquet::file::serialized_reader::SerializedFileReader;
use parquet::record::reader::RowIter;
use parquet::record::{Field as RowField, Row};
use tessera_api::codec::RecordReader;
use tessera_api::error::CodecError;
use tessera_api::schema::{Field, FieldKind, Schema, Shape};
use tessera_api::value::{RawValue, Scalar};

use crate::schema::from_parquet;

/// Record reader over an in-memory parquet file.
///
/// Rows are assembled by the parquet record API, which resolves LIST and
/// MAP groups itself. They are turned back into raw groups here so lists and
/// maps come out as `Group([Group(elements)])`, matching the file layout.
pub struct ParquetRecordReader {
    schema: Schema,
    rows: RowIter<'static>,
}

impl ParquetRecordReader {
    pub(crate) fn open(data: Vec<u8>) -> Result<Self, CodecError> {
        let reader = SerializedFileReader::new(Bytes::from(data))
            .map_err(|e| CodecError::decode(format!("open parquet file: {e}")))?;
        let root = reader
            .metadata()
            .file_metadata()
            .schema_descr()
            .root_schema_ptr();
        let schema = from_parquet(&root)?;
        // The row reader asserts on LIST/MAP layouts it cannot assemble.
        schema
            .validate()
            .map_err(|e| CodecError::decode(format!("file schema '{}': {e}", schema.name)))?;
        tracing::debug!(
            schema = %schema.name,
            row_groups = reader.num_row_groups(),
            rows = reader.metadata().file_metadata().num_rows(),
            "parquet file opened"
        );
        let rows = RowIter::from_file_into(Box::new(reader));
        Ok(Self { schema, rows })
    }
}

impl RecordReader for ParquetRecordReader {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn next_record(&mut self) -> Result<Option<RawValue>, CodecError> {
        match self.rows.next() {
            None => Ok(None),
            Some(Err(e)) => Err(CodecError::decode(format!("read row: {e}"))),
            Some(Ok(row)) => raw_from_row(&row, &self.schema.fields).map(Some),
        }
    }
}

fn raw_from_row(row: &Row, fields: &[Field]) -> Result<RawValue, CodecError> {
    if row.len() != fields.len() {
        return Err(CodecError::decode(format!(
            "row has {} columns for {} fields",
            row.len(),
            fields.len()
        )));
    }
    row.get_column_iter()
        .zip(fields)
        .map(|((_, value), field)| raw_from_field(value, field).map_err(|e| e.with_context(&field.name)))
        .collect::<Result<Vec<_>, _>>()
        .map(RawValue::Group)
}

fn raw_from_field(value: &RowField, field: &Field) -> Result<RawValue, CodecError> {
    let shape = field.shape().map_err(CodecError::decode)?;
    Ok(match (value, shape) {
        (RowField::Null, _) => RawValue::Null,
        (other, Shape::Scalar(_)) => RawValue::Primitive(scalar_from_field(other)?),
        (RowField::Group(row), Shape::Record(children)) => raw_from_row(row, children)?,
        (RowField::ListInternal(list), Shape::Repeated) => RawValue::repeated(
            list.elements()
                .iter()
                .map(|e| raw_from_element(e, field))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        (RowField::ListInternal(list), Shape::List { element: Some(element), .. }) => {
            RawValue::repeated(
                list.elements()
                    .iter()
                    .map(|e| raw_from_field(e, element))
                    .collect::<Result<Vec<_>, _>>()?,
            )
        }
        // Two-level lists come back with one more repetition layer: an
        // empty outer list, or a single inner list holding every element.
        (RowField::ListInternal(list), Shape::List { repeated, element: None }) => {
            let elements = match list.elements() {
                [] => &[][..],
                [RowField::ListInternal(inner)] => inner.elements(),
                other => {
                    return Err(CodecError::decode(format!(
                        "two-level list read as {} values instead of one nested list",
                        other.len()
                    )));
                }
            };
            RawValue::repeated(
                elements
                    .iter()
                    .map(|e| raw_from_element(e, repeated))
                    .collect::<Result<Vec<_>, _>>()?,
            )
        }
        (RowField::MapInternal(map), Shape::Map { key_value }) => {
            let [key, value] = key_value.children() else {
                return Err(CodecError::decode(format!(
                    "map entry '{}' is not a key/value pair",
                    key_value.name
                )));
            };
            RawValue::repeated(
                map.entries()
                    .iter()
                    .map(|(k, v)| Ok(RawValue::Group(vec![raw_from_field(k, key)?, raw_from_field(v, value)?])))
                    .collect::<Result<Vec<_>, CodecError>>()?,
            )
        }
        (other, _) => {
            return Err(CodecError::decode(format!(
                "value {other:?} does not match field '{}'",
                field.name
            )));
        }
    })
}

/// One element of a repeated field that is itself the element.
fn raw_from_element(value: &RowField, field: &Field) -> Result<RawValue, CodecError> {
    match (value, &field.kind) {
        (RowField::Null, _) => Ok(RawValue::Null),
        (RowField::Group(row), FieldKind::Group(children)) => raw_from_row(row, children),
        (other, FieldKind::Primitive(_)) => scalar_from_field(other).map(RawValue::Primitive),
        (other, FieldKind::Group(_)) => Err(CodecError::decode(format!(
            "element {other:?} of '{}' is not a group",
            field.name
        ))),
    }
}

fn scalar_from_field(field: &RowField) -> Result<Scalar, CodecError> {
    Ok(match field {
        RowField::Bool(b) => Scalar::Boolean(*b),
        RowField::Byte(i) => Scalar::Int((*i).into()),
        RowField::Short(i) => Scalar::Int((*i).into()),
        RowField::Int(i) => Scalar::Int(*i),
        RowField::Long(i) => Scalar::Long(*i),
        RowField::UByte(i) => Scalar::Int((*i).into()),
        RowField::UShort(i) => Scalar::Int((*i).into()),
        RowField::UInt(i) => Scalar::Long((*i).into()),
        RowField::ULong(i) => i64::try_from(*i)
            .map(Scalar::Long)
            .map_err(|_| CodecError::decode(format!("unsigned value {i} exceeds int64")))?,
        RowField::Float(f) => Scalar::Float(*f),
        RowField::Double(d) => Scalar::Double(*d),
        RowField::Str(s) => Scalar::Text(s.clone()),
        RowField::Bytes(b) => Scalar::Binary(b.data().to_vec()),
        RowField::Date(days) => Scalar::Int(*days),
        RowField::TimestampMillis(ts) | RowField::TimestampMicros(ts) => Scalar::Long(*ts),
        other => {
            return Err(CodecError::unsupported(format!(
                "cannot read parquet value {other:?}"
            )));
        }
    })
}

#[cfg(test)]
mod tests {
    use tessera_api::schema::{PhysicalType, Repetition};

    use super::*;

    #[test]
    fn garbage_bytes_are_a_decode_error() {
        let err = ParquetRecordReader::open(b"not a parquet file".to_vec())
            .err()
            .unwrap();
        assert_eq!(err.kind(), tessera_api::error::ErrorKind::Decode);
    }

    #[test]
    fn scalars_map_onto_the_value_model() {
        assert_eq!(scalar_from_field(&RowField::Int(7)).unwrap(), Scalar::Int(7));
        assert_eq!(scalar_from_field(&RowField::Short(-3)).unwrap(), Scalar::Int(-3));
        assert_eq!(
            scalar_from_field(&RowField::Str("x".into())).unwrap(),
            Scalar::Text("x".into())
        );
        assert_eq!(
            scalar_from_field(&RowField::Double(2.5)).unwrap(),
            Scalar::Double(2.5)
        );
        assert!(scalar_from_field(&RowField::ULong(u64::MAX)).is_err());
    }

    #[test]
    fn null_field_stays_null() {
        let field = Field::optional("x", PhysicalType::Int32);
        assert_eq!(raw_from_field(&RowField::Null, &field).unwrap(), RawValue::Null);
    }

    #[test]
    fn value_not_matching_its_field_is_a_decode_error() {
        let field = Field::list("xs", Repetition::Optional, Field::required("e", PhysicalType::Int32));
        let err = raw_from_field(&RowField::Int(1), &field).unwrap_err();
        assert_eq!(err.kind(), tessera_api::error::ErrorKind::Decode);
    }
}
