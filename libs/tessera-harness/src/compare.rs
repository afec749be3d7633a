use std::fmt::Write;

use tessera_api::value::NestedValue;

use crate::error::HarnessError;

/// Canonical rendering used for comparisons.
///
/// Scalars print through their `Display`; records and lists both print as
/// `[a, b, ...]`, so the two are indistinguishable once rendered.
pub fn render(value: &NestedValue) -> String {
    let mut out = String::new();
    render_into(value, &mut out);
    out
}

fn render_into(value: &NestedValue, out: &mut String) {
    match value {
        NestedValue::Scalar(s) => {
            let _ = write!(out, "{s}");
        }
        NestedValue::Record(children) | NestedValue::List(children) => {
            out.push('[');
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_into(child, out);
            }
            out.push(']');
        }
    }
}

/// Fails with `ComparisonMismatch` unless both values render identically.
pub fn assert_equal(
    message: &str,
    expected: &NestedValue,
    actual: &NestedValue,
) -> Result<(), HarnessError> {
    let expected = render(expected);
    let actual = render(actual);
    if expected == actual {
        return Ok(());
    }
    tracing::debug!(%expected, %actual, "rendered values differ");
    Err(HarnessError::ComparisonMismatch {
        message: message.to_string(),
        expected,
        actual,
    })
}

#[cfg(test)]
mod tests {
    use tessera_api::value::{Scalar, list, record, scalar};

    use super::*;

    #[test]
    fn records_and_lists_render_alike() {
        let a = record([scalar(1), scalar("x")]);
        let b = list([scalar(1), scalar("x")]);
        assert_eq!(render(&a), "[1, x]");
        assert!(assert_equal("shape erased", &a, &b).is_ok());
    }

    #[test]
    fn representation_type_does_not_matter() {
        let a = record([scalar(7i32)]);
        let b = record([scalar(7i64)]);
        let c = record([scalar("7")]);
        assert!(assert_equal("int vs long", &a, &b).is_ok());
        assert!(assert_equal("int vs text", &a, &c).is_ok());
    }

    #[test]
    fn one_vs_one_point_zero_mismatches() {
        let err = assert_equal(
            "record 0",
            &record([scalar(1)]),
            &record([scalar(1.0f64)]),
        )
        .unwrap_err();
        match err {
            HarnessError::ComparisonMismatch { message, expected, actual } => {
                assert_eq!(message, "record 0");
                assert_eq!(expected, "[1]");
                assert_eq!(actual, "[1.0]");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn nulls_and_nesting() {
        let v = record([
            NestedValue::Scalar(Scalar::Null),
            list([record([scalar(true)]), NestedValue::List(vec![])]),
        ]);
        assert_eq!(render(&v), "[null, [[true], []]]");
    }

    #[test]
    fn deep_nesting_renders() {
        let mut v = scalar(0);
        for _ in 0..64 {
            v = list([v]);
        }
        let rendered = render(&v);
        assert_eq!(rendered, format!("{}0{}", "[".repeat(64), "]".repeat(64)));
    }
}
