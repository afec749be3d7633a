use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════
//  Types
// ════════════════════════════════════════════════════════════════

/// How many values a field may carry per enclosing group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Repetition {
    Required,
    Optional,
    Repeated,
}

impl std::fmt::Display for Repetition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Repetition::Required => f.write_str("required"),
            Repetition::Optional => f.write_str("optional"),
            Repetition::Repeated => f.write_str("repeated"),
        }
    }
}

/// Storage type of a leaf column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhysicalType {
    Boolean,
    Int32,
    Int64,
    Int96,
    Float,
    Double,
    Binary,
    FixedLenBinary(i32),
}

impl std::fmt::Display for PhysicalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhysicalType::Boolean => f.write_str("boolean"),
            PhysicalType::Int32 => f.write_str("int32"),
            PhysicalType::Int64 => f.write_str("int64"),
            PhysicalType::Int96 => f.write_str("int96"),
            PhysicalType::Float => f.write_str("float"),
            PhysicalType::Double => f.write_str("double"),
            PhysicalType::Binary => f.write_str("binary"),
            PhysicalType::FixedLenBinary(n) => write!(f, "fixed_len_byte_array({n})"),
        }
    }
}

/// Interpretation hint attached to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Annotation {
    Utf8,
    Enum,
    Date,
    List,
    Map,
    MapKeyValue,
}

impl std::fmt::Display for Annotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Annotation::Utf8 => f.write_str("UTF8"),
            Annotation::Enum => f.write_str("ENUM"),
            Annotation::Date => f.write_str("DATE"),
            Annotation::List => f.write_str("LIST"),
            Annotation::Map => f.write_str("MAP"),
            Annotation::MapKeyValue => f.write_str("MAP_KEY_VALUE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Primitive(PhysicalType),
    Group(Vec<Field>),
}

// ════════════════════════════════════════════════════════════════
//  Field & Schema
// ════════════════════════════════════════════════════════════════

/// One column descriptor; groups nest arbitrarily.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub repetition: Repetition,
    pub kind: FieldKind,
    #[serde(default)]
    pub annotation: Option<Annotation>,
}

impl Field {
    pub fn primitive(name: impl Into<String>, repetition: Repetition, physical: PhysicalType) -> Self {
        Self {
            name: name.into(),
            repetition,
            kind: FieldKind::Primitive(physical),
            annotation: None,
        }
    }

    pub fn group(name: impl Into<String>, repetition: Repetition, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            repetition,
            kind: FieldKind::Group(fields),
            annotation: None,
        }
    }

    /// Shortcut: required primitive.
    pub fn required(name: impl Into<String>, physical: PhysicalType) -> Self {
        Self::primitive(name, Repetition::Required, physical)
    }

    /// Shortcut: optional primitive.
    pub fn optional(name: impl Into<String>, physical: PhysicalType) -> Self {
        Self::primitive(name, Repetition::Optional, physical)
    }

    /// Shortcut: UTF-8 string column.
    pub fn string(name: impl Into<String>, repetition: Repetition) -> Self {
        Self::primitive(name, repetition, PhysicalType::Binary).with_annotation(Annotation::Utf8)
    }

    /// Three-level list: `<repetition> group name (LIST) { repeated group list { element } }`.
    pub fn list(name: impl Into<String>, repetition: Repetition, element: Field) -> Self {
        let element = Field { name: "element".to_string(), ..element };
        Self::group(
            name,
            repetition,
            vec![Field::group("list", Repetition::Repeated, vec![element])],
        )
        .with_annotation(Annotation::List)
    }

    /// `<repetition> group name (MAP) { repeated group key_value { required key; value } }`.
    pub fn map(name: impl Into<String>, repetition: Repetition, key: Field, value: Field) -> Self {
        let key = Field { name: "key".to_string(), repetition: Repetition::Required, ..key };
        let value = Field { name: "value".to_string(), ..value };
        Self::group(
            name,
            repetition,
            vec![Field::group("key_value", Repetition::Repeated, vec![key, value])],
        )
        .with_annotation(Annotation::Map)
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotation = Some(annotation);
        self
    }

    pub fn is_required(&self) -> bool {
        self.repetition == Repetition::Required
    }

    pub fn is_repeated(&self) -> bool {
        self.repetition == Repetition::Repeated
    }

    pub fn children(&self) -> &[Field] {
        match &self.kind {
            FieldKind::Group(fields) => fields,
            FieldKind::Primitive(_) => &[],
        }
    }

    /// Classify how values map onto this field. See [`Shape`].
    pub fn shape(&self) -> Result<Shape<'_>, String> {
        if self.is_repeated() {
            return Ok(Shape::Repeated);
        }
        let fields = match &self.kind {
            FieldKind::Primitive(p) => return Ok(Shape::Scalar(*p)),
            FieldKind::Group(fields) => fields,
        };
        match self.annotation {
            Some(Annotation::List) => {
                let repeated = single_repeated_child(self, fields)?;
                if is_element_type(repeated) {
                    Ok(Shape::List { repeated, element: None })
                } else {
                    match repeated.children() {
                        [element] => Ok(Shape::List { repeated, element: Some(element) }),
                        _ => Err(format!("list '{}' has an empty repeated group", self.name)),
                    }
                }
            }
            Some(Annotation::Map) | Some(Annotation::MapKeyValue) => {
                let key_value = single_repeated_child(self, fields)?;
                match key_value.children() {
                    [key, _] if !key.is_repeated() && matches!(key.kind, FieldKind::Primitive(_)) => {
                        Ok(Shape::Map { key_value })
                    }
                    _ => Err(format!(
                        "map '{}' must repeat a group of a primitive key and a value",
                        self.name
                    )),
                }
            }
            _ => Ok(Shape::Record(fields)),
        }
    }

    /// Number of leaf columns under this field.
    pub fn leaf_count(&self) -> usize {
        match &self.kind {
            FieldKind::Primitive(_) => 1,
            FieldKind::Group(fields) => fields.iter().map(Field::leaf_count).sum(),
        }
    }
}

fn single_repeated_child<'a>(parent: &Field, fields: &'a [Field]) -> Result<&'a Field, String> {
    match fields {
        [child] if child.is_repeated() => Ok(child),
        _ => Err(format!(
            "{} group '{}' must contain exactly one repeated field",
            parent.annotation.map(|a| a.to_string()).unwrap_or_default(),
            parent.name
        )),
    }
}

/// Two-level list detection: the repeated field *is* the element.
///
/// Same rules the parquet record reader applies, so both sides agree on
/// where the element sits.
fn is_element_type(repeated: &Field) -> bool {
    match &repeated.kind {
        FieldKind::Primitive(_) => true,
        FieldKind::Group(fields) => {
            fields.len() > 1 || repeated.name == "array" || repeated.name.ends_with("_tuple")
        }
    }
}

/// How a field's values are laid out.
#[derive(Debug, Clone, Copy)]
pub enum Shape<'a> {
    /// Non-repeated primitive: one scalar.
    Scalar(PhysicalType),
    /// Non-repeated plain group: one nested record.
    Record(&'a [Field]),
    /// Bare repeated field: each element is the field itself.
    Repeated,
    /// LIST group. `element` is `None` when `repeated` is itself the
    /// element (two-level layout), otherwise the single field inside it.
    List {
        repeated: &'a Field,
        element: Option<&'a Field>,
    },
    /// MAP group; each entry is one `key_value` group.
    Map { key_value: &'a Field },
}

/// Root of a record layout. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self { name: name.into(), fields }
    }

    pub fn leaf_count(&self) -> usize {
        self.fields.iter().map(Field::leaf_count).sum()
    }

    /// Check every LIST/MAP group down the tree is well formed.
    pub fn validate(&self) -> Result<(), String> {
        fn walk(fields: &[Field]) -> Result<(), String> {
            for field in fields {
                field.shape()?;
                walk(field.children())?;
            }
            Ok(())
        }
        walk(&self.fields)
    }
}

impl std::fmt::Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn write_field(f: &mut std::fmt::Formatter<'_>, field: &Field, depth: usize) -> std::fmt::Result {
            let indent = "  ".repeat(depth);
            let annotation = field.annotation.map(|a| format!(" ({a})")).unwrap_or_default();
            match &field.kind {
                FieldKind::Primitive(p) => {
                    writeln!(f, "{indent}{} {p} {}{annotation};", field.repetition, field.name)
                }
                FieldKind::Group(children) => {
                    writeln!(f, "{indent}{} group {}{annotation} {{", field.repetition, field.name)?;
                    for child in children {
                        write_field(f, child, depth + 1)?;
                    }
                    writeln!(f, "{indent}}}")
                }
            }
        }

        writeln!(f, "message {} {{", self.name)?;
        for field in &self.fields {
            write_field(f, field, 1)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_level_list_exposes_element() {
        let field = Field::list("scores", Repetition::Optional, Field::required("x", PhysicalType::Int32));
        match field.shape().unwrap() {
            Shape::List { repeated, element: Some(element) } => {
                assert_eq!(repeated.name, "list");
                assert_eq!(element.name, "element");
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn two_level_list_variants() {
        let primitive = Field::group(
            "xs",
            Repetition::Optional,
            vec![Field::primitive("array", Repetition::Repeated, PhysicalType::Int32)],
        )
        .with_annotation(Annotation::List);
        assert!(matches!(primitive.shape().unwrap(), Shape::List { element: None, .. }));

        let tuple = Field::group(
            "xs",
            Repetition::Optional,
            vec![Field::group(
                "xs_tuple",
                Repetition::Repeated,
                vec![Field::required("a", PhysicalType::Int32)],
            )],
        )
        .with_annotation(Annotation::List);
        assert!(matches!(tuple.shape().unwrap(), Shape::List { element: None, .. }));
    }

    #[test]
    fn malformed_list_is_rejected() {
        let field = Field::group("xs", Repetition::Optional, vec![Field::required("a", PhysicalType::Int32)])
            .with_annotation(Annotation::List);
        assert!(field.shape().is_err());
        assert!(Schema::new("m", vec![field]).validate().is_err());
    }

    #[test]
    fn map_needs_primitive_key_and_value() {
        let map = |children: Vec<Field>| {
            Field::group(
                "m",
                Repetition::Optional,
                vec![Field::group("key_value", Repetition::Repeated, children)],
            )
            .with_annotation(Annotation::MapKeyValue)
        };
        let key = || Field::string("key", Repetition::Required);
        let value = || Field::optional("value", PhysicalType::Int32);

        assert!(matches!(map(vec![key(), value()]).shape().unwrap(), Shape::Map { .. }));
        assert!(map(vec![key()]).shape().is_err());
        assert!(map(vec![key(), value(), value()]).shape().is_err());
        let group_key = Field::group("key", Repetition::Required, vec![key()]);
        assert!(map(vec![group_key, value()]).shape().is_err());
        let repeated_key = Field::primitive("key", Repetition::Repeated, PhysicalType::Int32);
        assert!(map(vec![repeated_key, value()]).shape().is_err());
    }

    #[test]
    fn display_uses_message_syntax() {
        let schema = Schema::new(
            "m",
            vec![
                Field::string("name", Repetition::Required),
                Field::list("tags", Repetition::Optional, Field::string("e", Repetition::Required)),
            ],
        );
        let text = schema.to_string();
        assert!(text.starts_with("message m {"));
        assert!(text.contains("required binary name (UTF8);"));
        assert!(text.contains("optional group tags (LIST) {"));
        assert!(text.contains("repeated group list {"));
        assert_eq!(schema.leaf_count(), 2);
    }
}
