use serde_json::Value as Json;
use tessera_api::schema::{Field, FieldKind, PhysicalType, Schema, Shape};
use tessera_api::value::{NestedValue, Scalar};

/// Build the record a scenario describes.
///
/// Records are arrays (positional) or tables (by field name, missing keys
/// are absent fields). Lists are arrays; maps are tables or arrays of
/// `[key, value]` pairs. Scalars follow the column's physical type.
pub fn record_from_json(schema: &Schema, json: &Json) -> Result<NestedValue, String> {
    fields_from_json(&schema.fields, json, &schema.name)
}

fn fields_from_json(fields: &[Field], json: &Json, group: &str) -> Result<NestedValue, String> {
    let values = match json {
        Json::Array(items) => {
            if items.len() != fields.len() {
                return Err(format!(
                    "'{group}': {} values for {} fields",
                    items.len(),
                    fields.len()
                ));
            }
            fields
                .iter()
                .zip(items)
                .map(|(f, v)| value_from_json(f, v))
                .collect::<Result<Vec<_>, _>>()?
        }
        Json::Object(map) => {
            if let Some(unknown) = map.keys().find(|k| !fields.iter().any(|f| &f.name == *k)) {
                return Err(format!("'{group}' has no field '{unknown}'"));
            }
            fields
                .iter()
                .map(|f| match map.get(&f.name) {
                    Some(v) => value_from_json(f, v),
                    None => Ok(NestedValue::null()),
                })
                .collect::<Result<Vec<_>, _>>()?
        }
        other => return Err(format!("'{group}': expected an array or table, got {other}")),
    };
    Ok(NestedValue::Record(values))
}

fn value_from_json(field: &Field, json: &Json) -> Result<NestedValue, String> {
    if json.is_null() {
        return Ok(NestedValue::null());
    }
    let elements = |json: &Json| match json {
        Json::Array(items) => Ok(items.clone()),
        other => Err(format!("'{}': expected an array, got {other}", field.name)),
    };
    match field.shape()? {
        Shape::Scalar(physical) => scalar_from_json(physical, json, &field.name).map(NestedValue::Scalar),
        Shape::Record(children) => fields_from_json(children, json, &field.name),
        Shape::Repeated => elements(json)?
            .iter()
            .map(|e| element_from_json(field, e))
            .collect::<Result<Vec<_>, _>>()
            .map(NestedValue::List),
        Shape::List { repeated, element } => elements(json)?
            .iter()
            .map(|e| match element {
                None => element_from_json(repeated, e),
                Some(element) => value_from_json(element, e),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(NestedValue::List),
        Shape::Map { key_value } => {
            let entries: Vec<Json> = match json {
                Json::Object(map) => map
                    .iter()
                    .map(|(k, v)| Json::Array(vec![Json::String(k.clone()), v.clone()]))
                    .collect(),
                other => elements(other)?,
            };
            entries
                .iter()
                .map(|entry| fields_from_json(key_value.children(), entry, &key_value.name))
                .collect::<Result<Vec<_>, _>>()
                .map(NestedValue::List)
        }
    }
}

/// Element of a repeated field that is itself the element.
fn element_from_json(field: &Field, json: &Json) -> Result<NestedValue, String> {
    match &field.kind {
        FieldKind::Primitive(p) => {
            scalar_from_json(*p, json, &field.name).map(NestedValue::Scalar)
        }
        FieldKind::Group(children) => fields_from_json(children, json, &field.name),
    }
}

fn scalar_from_json(physical: PhysicalType, json: &Json, field: &str) -> Result<Scalar, String> {
    let wrong = || format!("'{field}': {json} is not a valid {physical}");
    match physical {
        PhysicalType::Boolean => json.as_bool().map(Scalar::Boolean).ok_or_else(wrong),
        PhysicalType::Int32 => json
            .as_i64()
            .and_then(|i| i32::try_from(i).ok())
            .map(Scalar::Int)
            .ok_or_else(wrong),
        PhysicalType::Int64 => json.as_i64().map(Scalar::Long).ok_or_else(wrong),
        PhysicalType::Float => json.as_f64().map(|f| Scalar::Float(f as f32)).ok_or_else(wrong),
        PhysicalType::Double => json.as_f64().map(Scalar::Double).ok_or_else(wrong),
        PhysicalType::Binary | PhysicalType::FixedLenBinary(_) => json
            .as_str()
            .map(|s| Scalar::Text(s.to_string()))
            .ok_or_else(wrong),
        PhysicalType::Int96 => Err(format!("'{field}': int96 values are not supported")),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tessera_api::schema::Repetition;
    use tessera_api::{list, record};

    use super::*;

    fn schema() -> Schema {
        Schema::new(
            "m",
            vec![
                Field::string("name", Repetition::Required),
                Field::list("scores", Repetition::Optional, Field::required("e", PhysicalType::Int32)),
                Field::map(
                    "attrs",
                    Repetition::Optional,
                    Field::string("key", Repetition::Required),
                    Field::optional("value", PhysicalType::Double),
                ),
            ],
        )
    }

    #[test]
    fn positional_and_named_records_agree() {
        let a = record_from_json(&schema(), &json!(["alice", [1, 2], {"x": 1.5}])).unwrap();
        let b = record_from_json(
            &schema(),
            &json!({"name": "alice", "scores": [1, 2], "attrs": [["x", 1.5]]}),
        )
        .unwrap();
        assert_eq!(a, b);
        assert_eq!(a, record!["alice", list![1, 2], list![record!["x", 1.5]]]);
    }

    #[test]
    fn missing_keys_are_absent_fields() {
        let v = record_from_json(&schema(), &json!({"name": "bob"})).unwrap();
        assert_eq!(v, record!["bob", NestedValue::null(), NestedValue::null()]);
    }

    #[test]
    fn type_errors_name_the_field() {
        let err = record_from_json(&schema(), &json!([1, [], {}])).unwrap_err();
        assert!(err.contains("'name'"), "{err}");
        let err = record_from_json(&schema(), &json!({"nope": 1})).unwrap_err();
        assert!(err.contains("nope"), "{err}");
        let err = record_from_json(&schema(), &json!(["a", [3_000_000_000i64], {}])).unwrap_err();
        assert!(err.contains("'element'"), "{err}");
    }
}
