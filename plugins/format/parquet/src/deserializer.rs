use tessera_api::ConfigParams;
use tessera_api::codec::{RecordDeserializer, TypedValue};
use tessera_api::config::ConfigValues;
use tessera_api::error::CodecError;
use tessera_api::value::{RawValue, Scalar};

use crate::type_info::{TypeInfo, split_top_level};

/// Column declaration of a [`ColumnarSerDe`].
#[derive(Debug, Clone, Default, ConfigParams)]
pub struct SerDeConfig {
    #[param(required, description = "Comma-separated column names")]
    pub columns: String,

    #[param(
        name = "columns.types",
        required,
        description = "Comma-separated column types, e.g. string,array<int>"
    )]
    pub column_types: String,
}

impl SerDeConfig {
    /// Parse both lists into `(name, type)` pairs.
    pub fn columns(&self) -> Result<Vec<(String, TypeInfo)>, CodecError> {
        let names: Vec<&str> = if self.columns.trim().is_empty() {
            Vec::new()
        } else {
            self.columns.split(',').map(str::trim).collect()
        };
        if let Some(pos) = names.iter().position(|n| n.is_empty()) {
            return Err(CodecError::config(format!(
                "column name #{pos} is empty in '{}'",
                self.columns
            )));
        }
        let types = if self.column_types.trim().is_empty() {
            Vec::new()
        } else {
            split_top_level(&self.column_types)?
        };
        if names.len() != types.len() {
            return Err(CodecError::config(format!(
                "{} column names but {} column types",
                names.len(),
                types.len()
            )));
        }
        names
            .into_iter()
            .zip(types)
            .map(|(name, ty)| {
                TypeInfo::parse(ty)
                    .map(|ty| (name.to_string(), ty))
                    .map_err(|e| e.with_context(format!("column '{name}'")))
            })
            .collect()
    }
}

/// Schema-driven deserializer reading raw records as typed rows.
///
/// A record deserializes to a `Struct` with one entry per declared column.
/// Lists and maps are expected in their wrapped raw form.
#[derive(Debug, Default)]
pub struct ColumnarSerDe {
    columns: Option<Vec<(String, TypeInfo)>>,
}

impl ColumnarSerDe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declared columns, once initialized.
    pub fn columns(&self) -> Option<&[(String, TypeInfo)]> {
        self.columns.as_deref()
    }
}

impl RecordDeserializer for ColumnarSerDe {
    fn initialize(&mut self, config: &ConfigValues) -> Result<(), CodecError> {
        let columns = SerDeConfig::from_config(config)?.columns()?;
        tracing::debug!(columns = columns.len(), "serde initialized");
        self.columns = Some(columns);
        Ok(())
    }

    fn deserialize(&self, raw: &RawValue) -> Result<TypedValue, CodecError> {
        let columns = self
            .columns
            .as_deref()
            .ok_or_else(|| CodecError::config("deserializer used before initialize"))?;
        match raw {
            RawValue::Group(children) => read_struct(columns, children),
            other => Err(CodecError::schema_mismatch(format!(
                "record must be a group, got {other}"
            ))),
        }
    }
}

fn read_struct(fields: &[(String, TypeInfo)], children: &[RawValue]) -> Result<TypedValue, CodecError> {
    if children.len() > fields.len() {
        return Err(CodecError::schema_mismatch(format!(
            "{} values for a struct of {} fields",
            children.len(),
            fields.len()
        )));
    }
    fields
        .iter()
        .enumerate()
        .map(|(i, (name, ty))| {
            let value = match children.get(i) {
                Some(raw) => read_value(ty, raw).map_err(|e| e.with_context(format!("field '{name}'")))?,
                None => TypedValue::Null,
            };
            Ok((name.clone(), value))
        })
        .collect::<Result<Vec<_>, CodecError>>()
        .map(TypedValue::Struct)
}

fn read_value(ty: &TypeInfo, raw: &RawValue) -> Result<TypedValue, CodecError> {
    let mismatch = || CodecError::schema_mismatch(format!("cannot read {raw} as {ty}"));
    let scalar = match (ty, raw) {
        (_, RawValue::Null) => return Ok(TypedValue::Null),
        (TypeInfo::Array(element), raw) => {
            let elements = raw.as_repeated().ok_or_else(mismatch)?;
            return elements
                .iter()
                .map(|e| read_value(element, e))
                .collect::<Result<Vec<_>, _>>()
                .map(TypedValue::List);
        }
        (TypeInfo::Map(key, value), raw) => {
            let entries = raw.as_repeated().ok_or_else(mismatch)?;
            return entries
                .iter()
                .map(|entry| match entry {
                    RawValue::Group(kv) if kv.len() == 2 => {
                        Ok((read_value(key, &kv[0])?, read_value(value, &kv[1])?))
                    }
                    other => Err(CodecError::schema_mismatch(format!(
                        "map entry must be a (key, value) group, got {other}"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(TypedValue::Map);
        }
        (TypeInfo::Struct(fields), RawValue::Group(children)) => {
            return read_struct(fields, children);
        }
        (_, RawValue::Primitive(s)) => s,
        _ => return Err(mismatch()),
    };

    let value = match (ty, scalar) {
        (TypeInfo::Boolean, Scalar::Boolean(b)) => TypedValue::Boolean(*b),
        (TypeInfo::TinyInt, Scalar::Int(i)) if i8::try_from(*i).is_ok() => TypedValue::Int(*i),
        (TypeInfo::SmallInt, Scalar::Int(i)) if i16::try_from(*i).is_ok() => TypedValue::Int(*i),
        (TypeInfo::Int | TypeInfo::Date, Scalar::Int(i)) => TypedValue::Int(*i),
        (TypeInfo::BigInt | TypeInfo::Timestamp, Scalar::Int(i)) => TypedValue::BigInt((*i).into()),
        (TypeInfo::BigInt | TypeInfo::Timestamp, Scalar::Long(l)) => TypedValue::BigInt(*l),
        (TypeInfo::Float, Scalar::Float(f)) => TypedValue::Float(*f),
        (TypeInfo::Double, Scalar::Float(f)) => TypedValue::Double((*f).into()),
        (TypeInfo::Double, Scalar::Double(d)) => TypedValue::Double(*d),
        (TypeInfo::String, s) => TypedValue::String(text(s).ok_or_else(mismatch)?),
        (TypeInfo::Varchar(n) | TypeInfo::Char(n), s) => {
            TypedValue::String(text(s).ok_or_else(mismatch)?.chars().take(*n).collect())
        }
        (TypeInfo::Binary, Scalar::Binary(b)) => TypedValue::Binary(b.clone()),
        (TypeInfo::Binary, Scalar::Text(s)) => TypedValue::Binary(s.clone().into_bytes()),
        _ => return Err(mismatch()),
    };
    Ok(value)
}

fn text(scalar: &Scalar) -> Option<String> {
    match scalar {
        Scalar::Text(s) => Some(s.clone()),
        Scalar::Binary(b) => String::from_utf8(b.clone()).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_api::error::ErrorKind;

    fn serde(columns: &str, types: &str) -> ColumnarSerDe {
        let mut serde = ColumnarSerDe::new();
        let config = ConfigValues::new()
            .with_str("columns", columns)
            .with_str("columns.types", types);
        serde.initialize(&config).unwrap();
        serde
    }

    fn text_raw(s: &str) -> RawValue {
        RawValue::Primitive(Scalar::Text(s.into()))
    }

    #[test]
    fn reads_wrapped_list() {
        let serde = serde("name,scores", "string,array<int>");
        let raw = RawValue::Group(vec![
            text_raw("alice"),
            RawValue::repeated(vec![
                RawValue::Primitive(Scalar::Int(1)),
                RawValue::Primitive(Scalar::Int(2)),
            ]),
        ]);
        assert_eq!(
            serde.deserialize(&raw).unwrap(),
            TypedValue::Struct(vec![
                ("name".into(), TypedValue::String("alice".into())),
                (
                    "scores".into(),
                    TypedValue::List(vec![TypedValue::Int(1), TypedValue::Int(2)])
                ),
            ])
        );
    }

    #[test]
    fn reads_map_entries() {
        let serde = serde("attrs", "map<string,bigint>");
        let raw = RawValue::Group(vec![RawValue::repeated(vec![RawValue::Group(vec![
            RawValue::Primitive(Scalar::Binary(b"k".to_vec())),
            RawValue::Primitive(Scalar::Int(5)),
        ])])]);
        assert_eq!(
            serde.deserialize(&raw).unwrap(),
            TypedValue::Struct(vec![(
                "attrs".into(),
                TypedValue::Map(vec![(TypedValue::String("k".into()), TypedValue::BigInt(5))])
            )])
        );
    }

    #[test]
    fn missing_trailing_fields_are_null() {
        let serde = serde("a,b", "int,string");
        let raw = RawValue::Group(vec![RawValue::Primitive(Scalar::Int(3))]);
        assert_eq!(
            serde.deserialize(&raw).unwrap(),
            TypedValue::Struct(vec![
                ("a".into(), TypedValue::Int(3)),
                ("b".into(), TypedValue::Null),
            ])
        );
    }

    #[test]
    fn extra_fields_are_a_mismatch() {
        let serde = serde("a", "int");
        let raw = RawValue::Group(vec![
            RawValue::Primitive(Scalar::Int(3)),
            RawValue::Primitive(Scalar::Int(4)),
        ]);
        assert_eq!(serde.deserialize(&raw).unwrap_err().kind(), ErrorKind::SchemaMismatch);
    }

    #[test]
    fn unwrapped_list_is_a_mismatch() {
        let serde = serde("xs", "array<int>");
        let raw = RawValue::Group(vec![RawValue::Primitive(Scalar::Int(1))]);
        let err = serde.deserialize(&raw).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
        assert!(err.message.contains("field 'xs'"), "{}", err.message);
    }

    #[test]
    fn narrow_ints_are_range_checked() {
        let serde = serde("t", "tinyint");
        let raw = RawValue::Group(vec![RawValue::Primitive(Scalar::Int(300))]);
        assert_eq!(serde.deserialize(&raw).unwrap_err().kind(), ErrorKind::SchemaMismatch);
    }

    #[test]
    fn varchar_truncates() {
        let serde = serde("s", "varchar(3)");
        let raw = RawValue::Group(vec![text_raw("abcdef")]);
        assert_eq!(
            serde.deserialize(&raw).unwrap(),
            TypedValue::Struct(vec![("s".into(), TypedValue::String("abc".into()))])
        );
    }

    #[test]
    fn declaration_errors() {
        let mut serde = ColumnarSerDe::new();
        let config = ConfigValues::new()
            .with_str("columns", "a,b")
            .with_str("columns.types", "int");
        assert_eq!(serde.initialize(&config).unwrap_err().kind(), ErrorKind::Config);

        let config = ConfigValues::new()
            .with_str("columns", "a")
            .with_str("columns.types", "decimal128");
        assert_eq!(serde.initialize(&config).unwrap_err().kind(), ErrorKind::Unsupported);

        let config = ConfigValues::new().with_str("columns", "a");
        assert_eq!(serde.initialize(&config).unwrap_err().kind(), ErrorKind::Config);
        assert!(serde.columns().is_none());
    }

    #[test]
    fn uninitialized_deserialize_fails() {
        let err = ColumnarSerDe::new()
            .deserialize(&RawValue::Group(vec![]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
