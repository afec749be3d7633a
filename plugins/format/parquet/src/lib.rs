mod deserializer;
mod encoder;
mod reader;
mod schema;
mod type_info;

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

use parquet::file::properties::{EnabledStatistics, WriterProperties};
use parquet::format::KeyValue;
use tessera_api::ConfigParams;
use tessera_api::codec::{ColumnEncoder, ColumnFormat, RecordDeserializer, RecordReader};
use tessera_api::config::ConfigValues;
use tessera_api::error::CodecError;
use tessera_api::schema::Schema;

pub use deserializer::{ColumnarSerDe, SerDeConfig};
pub use encoder::ParquetEncoder;
pub use reader::ParquetRecordReader;
pub use type_info::{TypeInfo, split_top_level};

// ---- Config ----

/// Writer settings applied to every file a [`ParquetFormat`] produces.
#[derive(Debug, Clone, ConfigParams)]
pub struct WriterOptions {
    #[param(description = "Value of the footer's created_by field")]
    pub created_by: String,

    #[param(description = "Collect column chunk statistics")]
    pub statistics: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            created_by: concat!("tessera version ", env!("CARGO_PKG_VERSION")).to_string(),
            statistics: true,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  ParquetFormat
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct ParquetFormat {
    options: WriterOptions,
}

impl ParquetFormat {
    pub fn new(options: WriterOptions) -> Self {
        Self { options }
    }

    pub fn from_config(config: &ConfigValues) -> Result<Self, CodecError> {
        Ok(Self::new(WriterOptions::from_config(config)?))
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    fn properties(&self, metadata: &BTreeMap<String, String>) -> WriterProperties {
        let statistics = if self.options.statistics {
            EnabledStatistics::Page
        } else {
            EnabledStatistics::None
        };
        let key_values = (!metadata.is_empty()).then(|| {
            metadata
                .iter()
                .map(|(k, v)| KeyValue::new(k.clone(), v.clone()))
                .collect()
        });
        WriterProperties::builder()
            .set_created_by(self.options.created_by.clone())
            .set_statistics_enabled(statistics)
            .set_key_value_metadata(key_values)
            .build()
    }
}

impl ColumnFormat for ParquetFormat {
    fn extension(&self) -> &str {
        "parquet"
    }

    fn encoder(
        &self,
        sink: Box<dyn Write + Send>,
        schema: &Schema,
        metadata: &BTreeMap<String, String>,
    ) -> Result<Box<dyn ColumnEncoder>, CodecError> {
        schema
            .validate()
            .map_err(|e| CodecError::config(format!("schema '{}': {e}", schema.name)))?;
        let parquet_schema = schema::to_parquet(schema)?;
        let props = Arc::new(self.properties(metadata));
        tracing::debug!(
            schema = %schema.name,
            columns = schema.leaf_count(),
            metadata = metadata.len(),
            "parquet encoder created"
        );
        Ok(Box::new(ParquetEncoder::new(
            sink,
            schema.clone(),
            parquet_schema,
            props,
        )))
    }

    fn reader(&self, data: Vec<u8>) -> Result<Box<dyn RecordReader>, CodecError> {
        Ok(Box::new(ParquetRecordReader::open(data)?))
    }

    fn parse_schema(&self, text: &str) -> Result<Schema, CodecError> {
        schema::parse(text)
    }

    fn deserializer(&self) -> Box<dyn RecordDeserializer> {
        Box::new(ColumnarSerDe::new())
    }
}
