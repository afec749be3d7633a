//! Round-trip verification for columnar files: write nested values through
//! a format's event encoder, read them back, compare canonical renderings,
//! and optionally run raw records through the format's deserializer.

pub mod bridge;
pub mod compare;
pub mod error;
pub mod harness;
pub mod local_fs;
pub mod writer;

pub use compare::{assert_equal, render};
pub use error::HarnessError;
pub use harness::{Harness, HarnessOptions};
pub use local_fs::LocalFileSystem;
pub use writer::{GroupWriter, RecordProducer};

pub use tessera_api::value::{NestedValue, RawValue, Scalar, list, record, scalar};
