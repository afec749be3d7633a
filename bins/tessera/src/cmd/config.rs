use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tessera_api::config::ConfigValues;
use tessera_format_parquet::ParquetFormat;

use super::error::CliError;

// ═══════════════════════════════════════════════════════════════
//  Scenario file (TOML)
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
pub struct ScenarioFile {
    /// Writer parameters, see `WriterOptions`.
    pub writer: Option<serde_json::Value>,
    /// Key/value metadata written into every footer.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default, rename = "scenario")]
    pub scenarios: Vec<Scenario>,
}

#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub name: String,
    /// Message-type syntax.
    pub schema: String,
    pub value: serde_json::Value,
    /// Read-back expectation; `value` when omitted.
    pub expected: Option<serde_json::Value>,
    /// Column declaration for the deserializer check.
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub types: Vec<String>,
}

impl Scenario {
    pub fn checks_serde(&self) -> bool {
        !self.columns.is_empty() || !self.types.is_empty()
    }
}

impl ScenarioFile {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::parse(&content)
            .map_err(|e| CliError::Config(format!("bad scenario file {}: {e}", path.display())))
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn format(&self) -> Result<ParquetFormat, CliError> {
        match &self.writer {
            None => Ok(ParquetFormat::default()),
            Some(table) => Ok(ParquetFormat::from_config(&ConfigValues::from_json(table)?)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILE: &str = r#"
        [writer]
        statistics = false

        [metadata]
        origin = "cli"

        [[scenario]]
        name = "alice"
        schema = """
        message person {
          required binary name (UTF8);
          optional group scores (LIST) {
            repeated group list { required int32 element; }
          }
        }
        """
        value = ["alice", [1, 2, 3]]
        columns = ["name", "scores"]
        types = ["string", "array<int>"]

        [[scenario]]
        name = "empty"
        schema = "message m { optional group tags (LIST) { repeated group list { required binary element (UTF8); } } }"
        value = { tags = [] }
        expected = [[]]
    "#;

    #[test]
    fn parses_scenarios() {
        let file = ScenarioFile::parse(FILE).unwrap();
        assert_eq!(file.scenarios.len(), 2);
        assert_eq!(file.metadata.get("origin").map(String::as_str), Some("cli"));
        assert!(file.scenarios[0].checks_serde());
        assert!(!file.scenarios[1].checks_serde());
        assert!(file.scenarios[1].expected.is_some());
        assert!(!file.format().unwrap().options().statistics);
    }

    #[test]
    fn bad_writer_parameter_is_rejected() {
        let file = ScenarioFile::parse("[writer]\nstatistics = \"yes\"\n").unwrap();
        assert!(file.format().is_err());
    }
}
