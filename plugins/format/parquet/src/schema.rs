use std::sync::Arc;

use parquet::basic::{ConvertedType, LogicalType, Repetition as PqRepetition, Type as PqPhysical};
use parquet::schema::parser::parse_message_type;
use parquet::schema::types::{Type, TypePtr};
use tessera_api::error::CodecError;
use tessera_api::schema::{Annotation, Field, FieldKind, PhysicalType, Repetition, Schema};

// ═══════════════════════════════════════════════════════════════
//  Schema → parquet
// ═══════════════════════════════════════════════════════════════

pub(crate) fn to_parquet(schema: &Schema) -> Result<TypePtr, CodecError> {
    let fields = schema
        .fields
        .iter()
        .map(field_to_parquet)
        .collect::<Result<Vec<_>, _>>()?;
    Type::group_type_builder(&schema.name)
        .with_fields(fields)
        .build()
        .map(Arc::new)
        .map_err(|e| CodecError::config(format!("parquet schema '{}': {e}", schema.name)))
}

fn field_to_parquet(field: &Field) -> Result<TypePtr, CodecError> {
    let repetition = match field.repetition {
        Repetition::Required => PqRepetition::REQUIRED,
        Repetition::Optional => PqRepetition::OPTIONAL,
        Repetition::Repeated => PqRepetition::REPEATED,
    };

    let built = match &field.kind {
        FieldKind::Primitive(physical) => {
            let (logical, converted) = match field.annotation {
                None => (None, ConvertedType::NONE),
                Some(Annotation::Utf8) => (Some(LogicalType::String), ConvertedType::UTF8),
                Some(Annotation::Enum) => (Some(LogicalType::Enum), ConvertedType::ENUM),
                Some(Annotation::Date) => (Some(LogicalType::Date), ConvertedType::DATE),
                Some(other) => {
                    return Err(CodecError::config(format!(
                        "field '{}': {other} annotation is only valid on groups",
                        field.name
                    )));
                }
            };
            let (physical, length) = match physical {
                PhysicalType::Boolean => (PqPhysical::BOOLEAN, -1),
                PhysicalType::Int32 => (PqPhysical::INT32, -1),
                PhysicalType::Int64 => (PqPhysical::INT64, -1),
                PhysicalType::Int96 => (PqPhysical::INT96, -1),
                PhysicalType::Float => (PqPhysical::FLOAT, -1),
                PhysicalType::Double => (PqPhysical::DOUBLE, -1),
                PhysicalType::Binary => (PqPhysical::BYTE_ARRAY, -1),
                PhysicalType::FixedLenBinary(n) => (PqPhysical::FIXED_LEN_BYTE_ARRAY, *n),
            };
            Type::primitive_type_builder(&field.name, physical)
                .with_repetition(repetition)
                .with_length(length)
                .with_logical_type(logical)
                .with_converted_type(converted)
                .build()
        }
        FieldKind::Group(children) => {
            let (logical, converted) = match field.annotation {
                None => (None, ConvertedType::NONE),
                Some(Annotation::List) => (Some(LogicalType::List), ConvertedType::LIST),
                Some(Annotation::Map) => (Some(LogicalType::Map), ConvertedType::MAP),
                Some(Annotation::MapKeyValue) => (None, ConvertedType::MAP_KEY_VALUE),
                Some(other) => {
                    return Err(CodecError::config(format!(
                        "field '{}': {other} annotation is only valid on primitives",
                        field.name
                    )));
                }
            };
            let children = children
                .iter()
                .map(field_to_parquet)
                .collect::<Result<Vec<_>, _>>()?;
            Type::group_type_builder(&field.name)
                .with_repetition(repetition)
                .with_logical_type(logical)
                .with_converted_type(converted)
                .with_fields(children)
                .build()
        }
    };

    built
        .map(Arc::new)
        .map_err(|e| CodecError::config(format!("field '{}': {e}", field.name)))
}

// ═══════════════════════════════════════════════════════════════
//  parquet → Schema
// ═══════════════════════════════════════════════════════════════

pub(crate) fn from_parquet(root: &Type) -> Result<Schema, CodecError> {
    if !root.is_group() {
        return Err(CodecError::decode(format!(
            "root of file schema '{}' is not a group",
            root.name()
        )));
    }
    let fields = root
        .get_fields()
        .iter()
        .map(|f| field_from_parquet(f))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Schema::new(root.name(), fields))
}

fn field_from_parquet(t: &Type) -> Result<Field, CodecError> {
    let info = t.get_basic_info();
    let repetition = if info.has_repetition() {
        match info.repetition() {
            PqRepetition::REQUIRED => Repetition::Required,
            PqRepetition::OPTIONAL => Repetition::Optional,
            PqRepetition::REPEATED => Repetition::Repeated,
        }
    } else {
        Repetition::Required
    };
    let annotation = match info.converted_type() {
        ConvertedType::UTF8 => Some(Annotation::Utf8),
        ConvertedType::ENUM => Some(Annotation::Enum),
        ConvertedType::DATE => Some(Annotation::Date),
        ConvertedType::LIST => Some(Annotation::List),
        ConvertedType::MAP => Some(Annotation::Map),
        ConvertedType::MAP_KEY_VALUE => Some(Annotation::MapKeyValue),
        _ => None,
    };

    let kind = match t {
        Type::PrimitiveType { physical_type, type_length, .. } => {
            FieldKind::Primitive(match physical_type {
                PqPhysical::BOOLEAN => PhysicalType::Boolean,
                PqPhysical::INT32 => PhysicalType::Int32,
                PqPhysical::INT64 => PhysicalType::Int64,
                PqPhysical::INT96 => PhysicalType::Int96,
                PqPhysical::FLOAT => PhysicalType::Float,
                PqPhysical::DOUBLE => PhysicalType::Double,
                PqPhysical::BYTE_ARRAY => PhysicalType::Binary,
                PqPhysical::FIXED_LEN_BYTE_ARRAY => PhysicalType::FixedLenBinary(*type_length),
            })
        }
        Type::GroupType { fields, .. } => FieldKind::Group(
            fields
                .iter()
                .map(|f| field_from_parquet(f))
                .collect::<Result<Vec<_>, _>>()?,
        ),
    };

    Ok(Field {
        name: info.name().to_string(),
        repetition,
        kind,
        annotation,
    })
}

/// Parse `message name { ... }` syntax.
pub(crate) fn parse(text: &str) -> Result<Schema, CodecError> {
    let root = parse_message_type(text)
        .map_err(|e| CodecError::config(format!("parse message type: {e}")))?;
    from_parquet(&root).map_err(|e| CodecError::config(e.message))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGE: &str = "
        message person {
          required binary name (UTF8);
          optional group scores (LIST) {
            repeated group list {
              required int32 element;
            }
          }
          optional group attrs (MAP) {
            repeated group key_value {
              required binary key (UTF8);
              optional double value;
            }
          }
          optional fixed_len_byte_array(16) id;
        }
    ";

    #[test]
    fn parse_reads_nesting_and_annotations() {
        let schema = parse(MESSAGE).unwrap();
        assert_eq!(schema.name, "person");
        assert_eq!(schema.fields.len(), 4);
        assert_eq!(schema.fields[0].annotation, Some(Annotation::Utf8));
        assert_eq!(schema.fields[1].annotation, Some(Annotation::List));
        assert!(schema.fields[1].children()[0].is_repeated());
        assert_eq!(schema.fields[2].annotation, Some(Annotation::Map));
        assert_eq!(
            schema.fields[3].kind,
            FieldKind::Primitive(PhysicalType::FixedLenBinary(16))
        );
    }

    #[test]
    fn conversion_is_stable_both_ways() {
        let schema = parse(MESSAGE).unwrap();
        let back = from_parquet(&to_parquet(&schema).unwrap()).unwrap();
        assert_eq!(schema, back);
    }

    #[test]
    fn display_output_parses_back() {
        let schema = parse(MESSAGE).unwrap();
        assert_eq!(parse(&schema.to_string()).unwrap(), schema);
    }

    #[test]
    fn misplaced_annotation_is_rejected() {
        let schema = Schema::new(
            "m",
            vec![Field::required("n", PhysicalType::Int32).with_annotation(Annotation::List)],
        );
        assert!(to_parquet(&schema).is_err());
    }

    #[test]
    fn garbage_is_a_config_error() {
        let err = parse("message {").unwrap_err();
        assert_eq!(err.kind(), tessera_api::error::ErrorKind::Config);
    }
}
