use crate::error::CodecError;

/// Parameter type for codec / deserializer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Bool,
    I64,
    U64,
    Str,
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamType::Bool => f.write_str("bool"),
            ParamType::I64 => f.write_str("i64"),
            ParamType::U64 => f.write_str("u64"),
            ParamType::Str => f.write_str("string"),
        }
    }
}

/// Declaration of a single config parameter.
///
/// Components export these via `config_params()` (usually derived with
/// `#[derive(ConfigParams)]`) so callers can validate values up front.
#[derive(Debug, Clone)]
pub struct ConfigParam {
    pub name: String,
    pub param_type: ParamType,
    pub required: bool,
    pub default: Option<ParamValue>,
    pub description: String,
}

/// Typed config value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    I64(i64),
    U64(u64),
    Str(String),
}

impl ParamValue {
    fn matches(&self, ty: ParamType) -> bool {
        matches!(
            (self, ty),
            (ParamValue::Bool(_), ParamType::Bool)
                | (ParamValue::I64(_), ParamType::I64)
                | (ParamValue::U64(_), ParamType::U64)
                | (ParamValue::I64(0..), ParamType::U64)
                | (ParamValue::Str(_), ParamType::Str)
        )
    }
}

/// Ordered key/value configuration, the moral equivalent of a
/// properties table. Values are read back through typed getters.
#[derive(Debug, Clone, Default)]
pub struct ConfigValues {
    entries: Vec<(String, ParamValue)>,
}

impl ConfigValues {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: ParamValue) {
        let name = name.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == &name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// Builder form of [`ConfigValues::set`] for string values.
    pub fn with_str(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, ParamValue::Str(value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(ParamValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(ParamValue::I64(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn get_u64(&self, name: &str) -> Option<u64> {
        match self.get(name) {
            Some(ParamValue::U64(v)) => Some(*v),
            // Most config formats lack unsigned integers; accept non-negative i64.
            Some(ParamValue::I64(v)) if *v >= 0 => Some(*v as u64),
            _ => None,
        }
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(ParamValue::Str(v)) => Some(v),
            _ => None,
        }
    }

    /// Check values against declarations: required params present, every
    /// declared param that is set has the declared type. Undeclared keys
    /// are ignored.
    pub fn validate(&self, params: &[ConfigParam]) -> Result<(), CodecError> {
        for param in params {
            match self.get(&param.name) {
                None if param.required => {
                    return Err(CodecError::config(format!(
                        "missing required parameter '{}' ({})",
                        param.name, param.description
                    )));
                }
                Some(value) if !value.matches(param.param_type) => {
                    return Err(CodecError::config(format!(
                        "parameter '{}' must be {}, got {value:?}",
                        param.name, param.param_type
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Build from a flat JSON object. Nested objects, arrays and floats are
    /// rejected.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, CodecError> {
        let object = value
            .as_object()
            .ok_or_else(|| CodecError::config(format!("expected a table of parameters, got {value}")))?;
        let mut config = Self::new();
        for (name, v) in object {
            let param = match v {
                serde_json::Value::Bool(b) => ParamValue::Bool(*b),
                serde_json::Value::String(s) => ParamValue::Str(s.clone()),
                serde_json::Value::Number(n) => match (n.as_i64(), n.as_u64()) {
                    (Some(i), _) => ParamValue::I64(i),
                    (None, Some(u)) => ParamValue::U64(u),
                    _ => {
                        return Err(CodecError::config(format!(
                            "parameter '{name}': floating point values are not supported"
                        )));
                    }
                },
                other => {
                    return Err(CodecError::config(format!(
                        "parameter '{name}': unsupported value {other}"
                    )));
                }
            };
            config.set(name.clone(), param);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Vec<ConfigParam> {
        vec![
            ConfigParam {
                name: "columns".into(),
                param_type: ParamType::Str,
                required: true,
                default: None,
                description: "column names".into(),
            },
            ConfigParam {
                name: "limit".into(),
                param_type: ParamType::U64,
                required: false,
                default: Some(ParamValue::U64(10)),
                description: "row limit".into(),
            },
        ]
    }

    #[test]
    fn validate_reports_missing_required() {
        let err = ConfigValues::new().validate(&params()).unwrap_err();
        assert!(err.message.contains("columns"));
    }

    #[test]
    fn validate_accepts_non_negative_i64_for_u64() {
        let mut config = ConfigValues::new().with_str("columns", "a,b");
        config.set("limit", ParamValue::I64(3));
        config.validate(&params()).unwrap();

        config.set("limit", ParamValue::I64(-1));
        assert!(config.validate(&params()).is_err());
    }

    #[test]
    fn from_json_reads_flat_table() {
        let json = serde_json::json!({ "columns": "a", "limit": 5, "stats": true });
        let config = ConfigValues::from_json(&json).unwrap();
        assert_eq!(config.get_str("columns"), Some("a"));
        assert_eq!(config.get_u64("limit"), Some(5));
        assert_eq!(config.get_bool("stats"), Some(true));

        assert!(ConfigValues::from_json(&serde_json::json!({ "x": 1.5 })).is_err());
    }
}
