use std::fmt;

/// Leaf value of a record.
///
/// Rendering is what comparisons see, so two scalars of different variants
/// are equal for the harness whenever they print the same:
/// - integers: decimal
/// - floats: shortest round-trip form, always with a fractional part (`1.0`)
/// - text: verbatim
/// - binary: lossy UTF-8
/// - null: `null`
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Text(String),
    Binary(Vec<u8>),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Boolean(b) => write!(f, "{b}"),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Long(l) => write!(f, "{l}"),
            Scalar::Float(v) => write!(f, "{v:?}"),
            Scalar::Double(v) => write!(f, "{v:?}"),
            Scalar::Text(s) => f.write_str(s),
            Scalar::Binary(b) => f.write_str(&String::from_utf8_lossy(b)),
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Boolean(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Scalar::Int(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Long(v)
    }
}

impl From<f32> for Scalar {
    fn from(v: f32) -> Self {
        Scalar::Float(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::Double(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Text(v)
    }
}

impl From<Vec<u8>> for Scalar {
    fn from(v: Vec<u8>) -> Self {
        Scalar::Binary(v)
    }
}

/// Logical shape of one record, as the test author thinks about it.
///
/// A `Record` holds one value per declared field, positionally. A `List`
/// holds the elements of a list or the entries of a map (each entry a
/// two-field `Record`). The extra grouping layer the columnar format puts
/// around repeated elements is never represented here.
#[derive(Debug, Clone, PartialEq)]
pub enum NestedValue {
    Scalar(Scalar),
    Record(Vec<NestedValue>),
    List(Vec<NestedValue>),
}

impl NestedValue {
    /// Absent field / null element.
    pub fn null() -> Self {
        NestedValue::Scalar(Scalar::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, NestedValue::Scalar(Scalar::Null))
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            NestedValue::Scalar(Scalar::Null) => "null",
            NestedValue::Scalar(_) => "scalar",
            NestedValue::Record(_) => "record",
            NestedValue::List(_) => "list",
        }
    }
}

impl From<Scalar> for NestedValue {
    fn from(v: Scalar) -> Self {
        NestedValue::Scalar(v)
    }
}

macro_rules! nested_from_scalar {
    ($($t:ty),*) => {
        $(impl From<$t> for NestedValue {
            fn from(v: $t) -> Self {
                NestedValue::Scalar(v.into())
            }
        })*
    };
}

nested_from_scalar!(bool, i32, i64, f32, f64, &str, String, Vec<u8>);

pub fn scalar(v: impl Into<Scalar>) -> NestedValue {
    NestedValue::Scalar(v.into())
}

pub fn record(fields: impl IntoIterator<Item = NestedValue>) -> NestedValue {
    NestedValue::Record(fields.into_iter().collect())
}

pub fn list(elements: impl IntoIterator<Item = NestedValue>) -> NestedValue {
    NestedValue::List(elements.into_iter().collect())
}

/// `record![a, b, c]`: each argument goes through `Into<NestedValue>`.
#[macro_export]
macro_rules! record {
    ($($v:expr),* $(,)?) => {
        $crate::value::NestedValue::Record(vec![$($crate::value::NestedValue::from($v)),*])
    };
}

/// `list![a, b, c]`: each argument goes through `Into<NestedValue>`.
#[macro_export]
macro_rules! list {
    ($($v:expr),* $(,)?) => {
        $crate::value::NestedValue::List(vec![$($crate::value::NestedValue::from($v)),*])
    };
}

/// Record as the decoder hands it out, before any schema interpretation.
///
/// Mirrors the file schema: every group is a `Group` with one child per
/// declared field; a list or map field is `Group([Group(elements)])`, i.e.
/// wrapped in one extra layer; a map entry is `Group([key, value])`.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Primitive(Scalar),
    Group(Vec<RawValue>),
}

impl RawValue {
    /// Wrap repeated elements the way list and map columns are surfaced.
    pub fn repeated(elements: Vec<RawValue>) -> Self {
        RawValue::Group(vec![RawValue::Group(elements)])
    }

    /// Inverse of [`RawValue::repeated`]. `None` when the value is not
    /// shaped as a wrapped repetition.
    pub fn as_repeated(&self) -> Option<&[RawValue]> {
        match self {
            RawValue::Group(outer) => match outer.as_slice() {
                [RawValue::Group(inner)] => Some(inner),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Null => f.write_str("null"),
            RawValue::Primitive(s) => write!(f, "{s}"),
            RawValue::Group(children) => {
                f.write_str("[")?;
                for (i, c) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{c}")?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_keep_fraction() {
        assert_eq!(Scalar::Double(1.0).to_string(), "1.0");
        assert_eq!(Scalar::Float(0.5).to_string(), "0.5");
        assert_eq!(Scalar::Long(1).to_string(), "1");
    }

    #[test]
    fn macros_convert_arguments() {
        let v = record!["alice", list![1, 2], NestedValue::null()];
        assert_eq!(
            v,
            NestedValue::Record(vec![
                scalar("alice"),
                NestedValue::List(vec![scalar(1), scalar(2)]),
                NestedValue::Scalar(Scalar::Null),
            ])
        );
    }

    #[test]
    fn repeated_wrapper_roundtrips() {
        let raw = RawValue::repeated(vec![RawValue::Primitive(Scalar::Int(7))]);
        assert_eq!(raw.to_string(), "[[7]]");
        assert_eq!(raw.as_repeated(), Some(&[RawValue::Primitive(Scalar::Int(7))][..]));
        assert!(RawValue::Group(vec![]).as_repeated().is_none());
    }
}
