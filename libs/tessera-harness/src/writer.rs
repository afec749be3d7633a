use tessera_api::codec::ColumnEncoder;
use tessera_api::schema::{Field, Schema, Shape};
use tessera_api::value::{NestedValue, Scalar};

use crate::error::HarnessError;

/// Emits one record's worth of events into an encoder.
///
/// Closures taking the sink implement this directly, which is how tests
/// hand-write raw event sequences:
///
/// ```ignore
/// harness.write_direct("raw", &schema, |sink: &mut dyn ColumnEncoder| {
///     sink.begin_record()?;
///     sink.begin_field("id", 0)?;
///     sink.write_scalar(Scalar::Int(1))?;
///     sink.end_field()?;
///     sink.end_record()?;
///     Ok(())
/// })?;
/// ```
pub trait RecordProducer {
    fn emit(&mut self, sink: &mut dyn ColumnEncoder) -> Result<(), HarnessError>;
}

impl<F> RecordProducer for F
where
    F: FnMut(&mut dyn ColumnEncoder) -> Result<(), HarnessError>,
{
    fn emit(&mut self, sink: &mut dyn ColumnEncoder) -> Result<(), HarnessError> {
        self(sink)
    }
}

// ═══════════════════════════════════════════════════════════════
//  GroupWriter
// ═══════════════════════════════════════════════════════════════

/// Writes a [`NestedValue`] record as group events against a schema.
///
/// Null values in record positions are absent fields and produce no
/// events; a null in a required position is a schema violation. Lists and
/// maps get the synthetic wrapper group, so an empty list still emits its
/// `begin_group`/`end_group` pair.
pub struct GroupWriter<'a> {
    schema: &'a Schema,
    value: &'a NestedValue,
}

impl<'a> GroupWriter<'a> {
    pub fn new(schema: &'a Schema, value: &'a NestedValue) -> Self {
        Self { schema, value }
    }
}

impl RecordProducer for GroupWriter<'_> {
    fn emit(&mut self, sink: &mut dyn ColumnEncoder) -> Result<(), HarnessError> {
        let values = match self.value {
            NestedValue::Record(values) => values,
            other => {
                return Err(HarnessError::violation(
                    &self.schema.name,
                    0,
                    format!("top-level value must be a record, got {}", other.kind()),
                ));
            }
        };
        sink.begin_record()?;
        write_fields(sink, &self.schema.fields, values, &self.schema.name)?;
        sink.end_record()?;
        Ok(())
    }
}

fn write_fields(
    sink: &mut dyn ColumnEncoder,
    fields: &[Field],
    values: &[NestedValue],
    group: &str,
) -> Result<(), HarnessError> {
    if values.len() != fields.len() {
        return Err(HarnessError::violation(
            group,
            values.len().min(fields.len()),
            format!("record has {} values for {} fields", values.len(), fields.len()),
        ));
    }
    for (index, (field, value)) in fields.iter().zip(values).enumerate() {
        if value.is_null() {
            if field.is_required() {
                return Err(HarnessError::violation(&field.name, index, "required field missing"));
            }
            continue;
        }
        // A bare repeated field has no wrapper to carry an empty list.
        if matches!(value, NestedValue::List(elements) if elements.is_empty()) && field.is_repeated() {
            continue;
        }
        sink.begin_field(&field.name, index)?;
        write_value(sink, field, index, value)?;
        sink.end_field()?;
    }
    Ok(())
}

fn write_value(
    sink: &mut dyn ColumnEncoder,
    field: &Field,
    index: usize,
    value: &NestedValue,
) -> Result<(), HarnessError> {
    let shape = field
        .shape()
        .map_err(|detail| HarnessError::violation(&field.name, index, detail))?;
    let mismatch = |expected: &str| {
        HarnessError::violation(
            &field.name,
            index,
            format!("expected {expected}, got {}", value.kind()),
        )
    };

    match shape {
        Shape::Scalar(_) => match value {
            NestedValue::Scalar(s) => sink.write_scalar(s.clone())?,
            _ => return Err(mismatch("scalar")),
        },
        Shape::Record(children) => match value {
            NestedValue::Record(values) => {
                sink.begin_group()?;
                write_fields(sink, children, values, &field.name)?;
                sink.end_group()?;
            }
            _ => return Err(mismatch("record")),
        },
        Shape::Repeated => {
            let NestedValue::List(elements) = value else {
                return Err(mismatch("list"));
            };
            for element in elements {
                write_self_element(sink, field, index, element)?;
            }
        }
        Shape::List { repeated, element } => {
            let NestedValue::List(elements) = value else {
                return Err(mismatch("list"));
            };
            sink.begin_group()?;
            if !elements.is_empty() {
                sink.begin_field(&repeated.name, 0)?;
                for value in elements {
                    match element {
                        None => write_self_element(sink, repeated, 0, value)?,
                        Some(element) => {
                            sink.begin_group()?;
                            write_fields(sink, std::slice::from_ref(element), std::slice::from_ref(value), &repeated.name)?;
                            sink.end_group()?;
                        }
                    }
                }
                sink.end_field()?;
            }
            sink.end_group()?;
        }
        Shape::Map { key_value } => {
            let NestedValue::List(entries) = value else {
                return Err(mismatch("list of key/value records"));
            };
            sink.begin_group()?;
            if !entries.is_empty() {
                sink.begin_field(&key_value.name, 0)?;
                for entry in entries {
                    write_self_element(sink, key_value, 0, entry)?;
                }
                sink.end_field()?;
            }
            sink.end_group()?;
        }
    }
    Ok(())
}

/// One value of a repeated field that is itself the element.
fn write_self_element(
    sink: &mut dyn ColumnEncoder,
    field: &Field,
    index: usize,
    value: &NestedValue,
) -> Result<(), HarnessError> {
    match (value, field.children()) {
        (NestedValue::Scalar(Scalar::Null), _) => Err(HarnessError::violation(
            &field.name,
            index,
            "null element in a repeated field",
        )),
        (NestedValue::Scalar(s), []) => Ok(sink.write_scalar(s.clone())?),
        (NestedValue::Record(values), children) if !children.is_empty() => {
            sink.begin_group()?;
            write_fields(sink, children, values, &field.name)?;
            sink.end_group()?;
            Ok(())
        }
        (value, []) => Err(HarnessError::violation(
            &field.name,
            index,
            format!("expected scalar element, got {}", value.kind()),
        )),
        (value, _) => Err(HarnessError::violation(
            &field.name,
            index,
            format!("expected record element, got {}", value.kind()),
        )),
    }
}
