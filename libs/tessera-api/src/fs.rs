use std::io::{self, Write};
use std::path::Path;

/// File-system capability used by the drivers. Constructed once per
/// harness and shared read-only.
pub trait FileSystem: Send + Sync {
    /// Create (or truncate) a file for writing.
    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>>;

    /// Delete a file. `Ok(false)` when there was nothing to delete.
    fn delete(&self, path: &Path) -> io::Result<bool>;

    fn exists(&self, path: &Path) -> bool;

    /// Length in bytes.
    fn file_len(&self, path: &Path) -> io::Result<u64>;

    /// Read `len` bytes starting at `offset`.
    fn read_range(&self, path: &Path, offset: u64, len: u64) -> io::Result<Vec<u8>>;
}
