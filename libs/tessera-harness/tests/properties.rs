use proptest::prelude::*;
use tessera_api::schema::{Field, PhysicalType, Repetition, Schema};
use tessera_format_parquet::ParquetFormat;
use tessera_harness::{Harness, NestedValue, assert_equal, list, record, scalar};

fn schema() -> Schema {
    Schema::new(
        "generated",
        vec![
            Field::required("id", PhysicalType::Int64),
            Field::string("name", Repetition::Optional),
            Field::list(
                "scores",
                Repetition::Optional,
                Field::optional("element", PhysicalType::Int32),
            ),
            Field::group(
                "point",
                Repetition::Optional,
                vec![
                    Field::required("x", PhysicalType::Double),
                    Field::optional("y", PhysicalType::Double),
                ],
            ),
            Field::map(
                "attrs",
                Repetition::Optional,
                Field::string("key", Repetition::Required),
                Field::required("value", PhysicalType::Boolean),
            ),
        ],
    )
}

fn optional(v: Option<NestedValue>) -> NestedValue {
    v.unwrap_or_else(NestedValue::null)
}

fn arb_record() -> impl Strategy<Value = NestedValue> {
    (
        any::<i64>(),
        proptest::option::of("[a-z ]{0,12}"),
        proptest::option::of(proptest::collection::vec(proptest::option::of(any::<i32>()), 0..6)),
        proptest::option::of((-1.0e9f64..1.0e9, proptest::option::of(-1.0e9f64..1.0e9))),
        proptest::option::of(proptest::collection::btree_map("[a-z]{1,4}", any::<bool>(), 0..4)),
    )
        .prop_map(|(id, name, scores, point, attrs)| {
            record([
                scalar(id),
                optional(name.map(scalar)),
                optional(scores.map(|s| list(s.into_iter().map(|e| optional(e.map(scalar)))))),
                optional(point.map(|(x, y)| record([scalar(x), optional(y.map(scalar))]))),
                optional(attrs.map(|m| {
                    list(m.into_iter().map(|(k, v)| record([scalar(k), scalar(v)])))
                })),
            ])
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn written_records_read_back_identically(value in arb_record()) {
        let h = Harness::new(ParquetFormat::default()).unwrap();
        let path = h.write_value("generated", &schema(), &value).unwrap();
        let records = h.read_all(&path).unwrap();
        prop_assert_eq!(records.len(), 1);
        prop_assert!(assert_equal("generated", &value, &records[0]).is_ok());
        prop_assert_eq!(&records[0], &value);
    }
}
