use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tessera_api::codec::{ColumnFormat, EncodeSummary, TypedValue};
use tessera_api::error::CodecError;
use tessera_api::fs::FileSystem;
use tessera_api::schema::{Field, Schema, Shape};
use tessera_api::value::{NestedValue, RawValue};

use crate::bridge;
use crate::error::HarnessError;
use crate::local_fs::LocalFileSystem;
use crate::writer::{GroupWriter, RecordProducer};

/// Harness settings.
#[derive(Debug, Clone, Default)]
pub struct HarnessOptions {
    /// Parent of the scratch directory; the system temp dir when unset.
    pub temp_root: Option<PathBuf>,
    /// Key/value metadata written into every file footer.
    pub metadata: BTreeMap<String, String>,
}

/// One scenario's write/read round-trip context.
///
/// Owns a scratch directory that is removed, with every file written
/// through it, when the harness is dropped.
pub struct Harness {
    temp: TempDir,
    fs: Arc<dyn FileSystem>,
    format: Arc<dyn ColumnFormat>,
    metadata: BTreeMap<String, String>,
}

impl Harness {
    /// Harness over the local file system with default options.
    pub fn new(format: impl ColumnFormat + 'static) -> Result<Self, HarnessError> {
        Self::with_options(
            Arc::new(format),
            Arc::new(LocalFileSystem),
            HarnessOptions::default(),
        )
    }

    pub fn with_options(
        format: Arc<dyn ColumnFormat>,
        fs: Arc<dyn FileSystem>,
        options: HarnessOptions,
    ) -> Result<Self, HarnessError> {
        let temp = match &options.temp_root {
            Some(root) => tempfile::Builder::new()
                .prefix("tessera-")
                .tempdir_in(root)
                .map_err(|source| HarnessError::Io { path: root.clone(), source })?,
            None => tempfile::Builder::new()
                .prefix("tessera-")
                .tempdir()
                .map_err(|source| HarnessError::Io {
                    path: std::env::temp_dir(),
                    source,
                })?,
        };
        tracing::debug!(dir = %temp.path().display(), "scratch directory created");
        Ok(Self {
            temp,
            fs,
            format,
            metadata: options.metadata,
        })
    }

    pub fn temp_dir(&self) -> &Path {
        self.temp.path()
    }

    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    pub fn format(&self) -> &Arc<dyn ColumnFormat> {
        &self.format
    }

    // ---- Write ----

    /// Write one file named `name` holding whatever `producer` emits.
    ///
    /// A stale file at the target path is deleted first; failing to
    /// delete it is logged and ignored. The encoder is closed even when
    /// the producer fails, so the file on disk stays readable; the
    /// producer's error is the one returned. When the format rejects the
    /// schema no file is left behind.
    pub fn write_direct(
        &self,
        name: &str,
        schema: &Schema,
        mut producer: impl RecordProducer,
    ) -> Result<PathBuf, HarnessError> {
        let path = self
            .temp
            .path()
            .join(format!("{name}.{}", self.format.extension()));

        if self.fs.exists(&path) {
            match self.fs.delete(&path) {
                Ok(deleted) => tracing::debug!(path = %path.display(), deleted, "stale file removed"),
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to delete stale file, overwriting"
                ),
            }
        }

        let sink = self
            .fs
            .create(&path)
            .map_err(|source| HarnessError::Io { path: path.clone(), source })?;
        let mut encoder = match self.format.encoder(sink, schema, &self.metadata) {
            Ok(encoder) => encoder,
            Err(source) => {
                // Nothing was written; drop the empty sink file.
                if let Err(e) = self.fs.delete(&path) {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove empty file");
                }
                return Err(HarnessError::Encoding { path, source });
            }
        };

        let emitted = producer.emit(encoder.as_mut());
        let closed = encoder.close();

        emitted.map_err(|e| e.with_path(&path))?;
        let EncodeSummary { records, columns } =
            closed.map_err(|source| HarnessError::Encoding { path: path.clone(), source })?;

        let bytes = self.fs.file_len(&path).unwrap_or_default();
        tracing::info!(path = %path.display(), records, columns, bytes, "file written");
        Ok(path)
    }

    /// [`Harness::write_direct`] with a [`GroupWriter`] over `value`.
    pub fn write_value(
        &self,
        name: &str,
        schema: &Schema,
        value: &NestedValue,
    ) -> Result<PathBuf, HarnessError> {
        self.write_direct(name, schema, GroupWriter::new(schema, value))
    }

    // ---- Read ----

    /// Every record of the file, raw, with the file's own schema.
    pub fn read_raw(&self, path: &Path) -> Result<(Schema, Vec<RawValue>), HarnessError> {
        let io = |source| HarnessError::Io { path: path.to_path_buf(), source };
        let decode = |source| HarnessError::Decode { path: path.to_path_buf(), source };

        let len = self.fs.file_len(path).map_err(io)?;
        let data = self.fs.read_range(path, 0, len).map_err(io)?;
        let mut reader = self.format.reader(data).map_err(decode)?;

        let mut records = Vec::new();
        while let Some(record) = reader.next_record().map_err(decode)? {
            tracing::trace!(record = %record, "raw record");
            records.push(record);
        }
        tracing::info!(path = %path.display(), records = records.len(), bytes = len, "file read");
        Ok((reader.schema().clone(), records))
    }

    /// Every record of the file as nested values, with list and map
    /// wrappers stripped.
    pub fn read_all(&self, path: &Path) -> Result<Vec<NestedValue>, HarnessError> {
        let (schema, records) = self.read_raw(path)?;
        records
            .iter()
            .map(|raw| match raw {
                RawValue::Group(children) => strip_fields(&schema.fields, children),
                other => Err(CodecError::decode(format!("record is not a group: {other}"))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| HarnessError::Decode { path: path.to_path_buf(), source })
    }

    // ---- SerDe ----

    /// Run `raw` through a fresh deserializer of this harness's format.
    pub fn deserialize<S: AsRef<str>>(
        &self,
        raw: &RawValue,
        names: &[S],
        types: &[S],
    ) -> Result<TypedValue, HarnessError> {
        let mut deserializer = self.format.deserializer();
        bridge::deserialize(deserializer.as_mut(), raw, names, types)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Wrapper stripping
// ═══════════════════════════════════════════════════════════════

fn strip_fields(fields: &[Field], children: &[RawValue]) -> Result<NestedValue, CodecError> {
    if children.len() != fields.len() {
        return Err(CodecError::decode(format!(
            "group has {} values for {} fields",
            children.len(),
            fields.len()
        )));
    }
    fields
        .iter()
        .zip(children)
        .map(|(field, raw)| strip_value(field, raw).map_err(|e| e.with_context(&field.name)))
        .collect::<Result<Vec<_>, _>>()
        .map(NestedValue::Record)
}

fn strip_value(field: &Field, raw: &RawValue) -> Result<NestedValue, CodecError> {
    if let RawValue::Null = raw {
        return Ok(NestedValue::null());
    }
    let shape = field.shape().map_err(CodecError::decode)?;
    let elements = |raw: &RawValue| {
        raw.as_repeated()
            .ok_or_else(|| CodecError::decode(format!("expected a wrapped repetition, got {raw}")))
            .map(<[RawValue]>::to_vec)
    };
    match shape {
        Shape::Scalar(_) => match raw {
            RawValue::Primitive(s) => Ok(NestedValue::Scalar(s.clone())),
            other => Err(CodecError::decode(format!("expected a scalar, got {other}"))),
        },
        Shape::Record(children) => match raw {
            RawValue::Group(values) => strip_fields(children, values),
            other => Err(CodecError::decode(format!("expected a group, got {other}"))),
        },
        Shape::Repeated => elements(raw)?
            .iter()
            .map(|e| strip_element(field, e))
            .collect::<Result<Vec<_>, _>>()
            .map(NestedValue::List),
        Shape::List { repeated, element } => elements(raw)?
            .iter()
            .map(|e| match element {
                None => strip_element(repeated, e),
                Some(element) => strip_value(element, e),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(NestedValue::List),
        Shape::Map { key_value } => elements(raw)?
            .iter()
            .map(|entry| match entry {
                RawValue::Group(kv) => strip_fields(key_value.children(), kv),
                other => Err(CodecError::decode(format!("expected a map entry, got {other}"))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(NestedValue::List),
    }
}

/// One element of a repeated field that is itself the element.
fn strip_element(field: &Field, raw: &RawValue) -> Result<NestedValue, CodecError> {
    match (raw, field.children()) {
        (RawValue::Primitive(s), []) => Ok(NestedValue::Scalar(s.clone())),
        (RawValue::Group(values), children) if !children.is_empty() => strip_fields(children, values),
        (RawValue::Null, _) => Ok(NestedValue::null()),
        (other, _) => Err(CodecError::decode(format!(
            "element of '{}' does not match its declaration: {other}",
            field.name
        ))),
    }
}
