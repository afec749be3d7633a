use std::path::PathBuf;

use clap::Args;
use tessera_format_parquet::ParquetFormat;
use tessera_harness::{Harness, render};

use super::error::CliError;

#[derive(Args, Clone, Debug)]
pub struct InspectArgs {
    /// File to read.
    pub file: PathBuf,

    /// Print records as read, with list and map wrappers kept.
    #[arg(long)]
    pub raw: bool,

    /// Print the schema and records as JSON.
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &InspectArgs) -> Result<(), CliError> {
    let harness = Harness::new(ParquetFormat::default())?;
    let (schema, raw) = harness.read_raw(&args.file)?;

    let records: Vec<String> = if args.raw {
        raw.iter().map(ToString::to_string).collect()
    } else {
        harness.read_all(&args.file)?.iter().map(render).collect()
    };

    if args.json {
        let doc = serde_json::json!({ "schema": schema, "records": records });
        let text = serde_json::to_string_pretty(&doc)
            .map_err(|e| CliError::Config(format!("render json: {e}")))?;
        println!("{text}");
    } else {
        println!("{schema}");
        for record in &records {
            println!("{record}");
        }
    }
    Ok(())
}
