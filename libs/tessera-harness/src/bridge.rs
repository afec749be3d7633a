use tessera_api::codec::{RecordDeserializer, TypedValue};
use tessera_api::config::ConfigValues;
use tessera_api::value::RawValue;

use crate::error::HarnessError;

/// Bind `deserializer` to the declared columns and run `raw` through it.
///
/// Names and types are checked for equal length before anything else;
/// errors from the deserializer come back as `Deserialize` unchanged.
pub fn deserialize<S: AsRef<str>>(
    deserializer: &mut dyn RecordDeserializer,
    raw: &RawValue,
    names: &[S],
    types: &[S],
) -> Result<TypedValue, HarnessError> {
    if names.len() != types.len() {
        return Err(HarnessError::Configuration(format!(
            "{} column names but {} column types",
            names.len(),
            types.len()
        )));
    }
    let config = ConfigValues::new()
        .with_str("columns", join(names))
        .with_str("columns.types", join(types));
    deserializer
        .initialize(&config)
        .map_err(HarnessError::Deserialize)?;
    let typed = deserializer.deserialize(raw).map_err(HarnessError::Deserialize)?;
    tracing::debug!(columns = names.len(), "raw record deserialized");
    Ok(typed)
}

fn join<S: AsRef<str>>(parts: &[S]) -> String {
    parts.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use tessera_api::error::CodecError;

    use super::*;

    /// Counts initializations; fails deserialization on demand.
    #[derive(Default)]
    struct Probe {
        initialized: usize,
        config: Option<ConfigValues>,
        fail: bool,
    }

    impl RecordDeserializer for Probe {
        fn initialize(&mut self, config: &ConfigValues) -> Result<(), CodecError> {
            self.initialized += 1;
            self.config = Some(config.clone());
            Ok(())
        }

        fn deserialize(&self, _raw: &RawValue) -> Result<TypedValue, CodecError> {
            if self.fail {
                return Err(CodecError::schema_mismatch("bad shape"));
            }
            Ok(TypedValue::Null)
        }
    }

    #[test]
    fn arity_mismatch_never_touches_the_deserializer() {
        let mut probe = Probe::default();
        let err = deserialize(&mut probe, &RawValue::Null, &["a", "b"], &["int"]).unwrap_err();
        assert!(matches!(err, HarnessError::Configuration(_)));
        assert_eq!(probe.initialized, 0);
    }

    #[test]
    fn declarations_are_comma_joined() {
        let mut probe = Probe::default();
        deserialize(
            &mut probe,
            &RawValue::Group(vec![]),
            &["name", "attrs"],
            &["string", "map<string,int>"],
        )
        .unwrap();
        let config = probe.config.unwrap();
        assert_eq!(config.get_str("columns"), Some("name,attrs"));
        assert_eq!(config.get_str("columns.types"), Some("string,map<string,int>"));
    }

    #[test]
    fn deserializer_errors_pass_through() {
        let mut probe = Probe { fail: true, ..Probe::default() };
        let err = deserialize(&mut probe, &RawValue::Null, &["a"], &["int"]).unwrap_err();
        match err {
            HarnessError::Deserialize(e) => {
                assert_eq!(e.kind(), tessera_api::error::ErrorKind::SchemaMismatch)
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
