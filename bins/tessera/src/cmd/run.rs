use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use tessera_api::codec::ColumnFormat;
use tessera_harness::{Harness, HarnessOptions, LocalFileSystem, assert_equal};

use super::config::{Scenario, ScenarioFile};
use super::error::CliError;
use super::value::record_from_json;

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Scenario file (TOML).
    pub scenarios: PathBuf,

    /// Directory to create scratch directories in.
    #[arg(long, env = "TESSERA_TEMP_ROOT")]
    pub temp_root: Option<PathBuf>,

    /// Only run scenarios whose name contains this string.
    #[arg(long)]
    pub filter: Option<String>,
}

pub fn run(args: &RunArgs) -> Result<(), CliError> {
    let file = ScenarioFile::load(&args.scenarios)?;
    let format: Arc<dyn ColumnFormat> = Arc::new(file.format()?);
    let fs = Arc::new(LocalFileSystem);

    let selected: Vec<&Scenario> = file
        .scenarios
        .iter()
        .filter(|s| args.filter.as_ref().is_none_or(|f| s.name.contains(f.as_str())))
        .collect();
    tracing::info!(
        file = %args.scenarios.display(),
        scenarios = selected.len(),
        "running scenarios"
    );

    let mut failed = 0;
    for scenario in &selected {
        let options = HarnessOptions {
            temp_root: args.temp_root.clone(),
            metadata: file.metadata.clone(),
        };
        let outcome = Harness::with_options(format.clone(), fs.clone(), options)
            .map_err(CliError::from)
            .and_then(|harness| run_scenario(&harness, scenario));
        match outcome {
            Ok(()) => println!("PASS {}", scenario.name),
            Err(e) => {
                failed += 1;
                tracing::debug!(scenario = %scenario.name, error = ?e, "scenario failed");
                println!("FAIL {}: {e}", scenario.name);
            }
        }
    }

    if failed > 0 {
        return Err(CliError::Failed {
            failed,
            total: selected.len(),
        });
    }
    Ok(())
}

/// Write, read back, compare and optionally deserialize one scenario.
pub fn run_scenario(harness: &Harness, scenario: &Scenario) -> Result<(), CliError> {
    let value_error = |message: String| CliError::Value {
        scenario: scenario.name.clone(),
        message,
    };

    let schema = harness.format().parse_schema(&scenario.schema)?;
    let value = record_from_json(&schema, &scenario.value).map_err(value_error)?;
    let expected = match &scenario.expected {
        Some(json) => record_from_json(&schema, json).map_err(value_error)?,
        None => value.clone(),
    };

    let path = harness.write_value(&scenario.name, &schema, &value)?;
    let records = harness.read_all(&path)?;
    if records.len() != 1 {
        return Err(value_error(format!(
            "expected exactly one record, read {}",
            records.len()
        )));
    }
    assert_equal(&scenario.name, &expected, &records[0])?;

    if scenario.checks_serde() {
        let (_, raw) = harness.read_raw(&path)?;
        let typed = harness.deserialize(&raw[0], &scenario.columns, &scenario.types)?;
        tracing::debug!(scenario = %scenario.name, typed = ?typed, "deserialized");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tessera_format_parquet::ParquetFormat;
    use tessera_harness::HarnessError;

    use super::*;

    const FILE: &str = r#"
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
        name = "wrong_expectation"
        schema = "message m { required double v; }"
        value = [1.0]
        expected = [2.0]

        [[scenario]]
        name = "bad_types"
        schema = "message m { required int32 v; }"
        value = [1]
        columns = ["v", "w"]
        types = ["int"]
    "#;

    fn scenario(file: &ScenarioFile, name: &str) -> Result<(), CliError> {
        let harness = Harness::new(ParquetFormat::default()).unwrap();
        let s = file.scenarios.iter().find(|s| s.name == name).unwrap();
        run_scenario(&harness, s)
    }

    #[test]
    fn scenario_outcomes() {
        let file = ScenarioFile::parse(FILE).unwrap();
        scenario(&file, "alice").unwrap();
        assert!(matches!(
            scenario(&file, "wrong_expectation"),
            Err(CliError::Harness(HarnessError::ComparisonMismatch { .. }))
        ));
        assert!(matches!(
            scenario(&file, "bad_types"),
            Err(CliError::Harness(HarnessError::Configuration(_)))
        ));
    }

    #[test]
    fn run_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenarios.toml");
        std::fs::write(&path, FILE).unwrap();

        let mut args = RunArgs {
            scenarios: path,
            temp_root: Some(dir.path().to_path_buf()),
            filter: None,
        };
        assert!(matches!(
            run(&args),
            Err(CliError::Failed { failed: 2, total: 3 })
        ));

        args.filter = Some("alice".into());
        run(&args).unwrap();
    }
}
