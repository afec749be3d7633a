use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tessera_api::fs::FileSystem;

/// [`FileSystem`] over the local disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        Ok(Box::new(File::create(path)?))
    }

    fn delete(&self, path: &Path) -> io::Result<bool> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn file_len(&self, path: &Path) -> io::Result<u64> {
        Ok(std::fs::metadata(path)?.len())
    }

    fn read_range(&self, path: &Path, offset: u64, len: u64) -> io::Result<Vec<u8>> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = Vec::new();
        file.take(len).read_to_end(&mut buf)?;
        if (buf.len() as u64) < len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("{} bytes requested at offset {offset}, {} available", len, buf.len()),
            ));
        }
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_read_delete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bin");
        let fs = LocalFileSystem;

        assert!(!fs.exists(&path));
        fs.create(&path).unwrap().write_all(b"hello world").unwrap();
        assert!(fs.exists(&path));
        assert_eq!(fs.file_len(&path).unwrap(), 11);
        assert_eq!(fs.read_range(&path, 6, 5).unwrap(), b"world");
        assert!(fs.read_range(&path, 6, 50).is_err());

        assert!(fs.delete(&path).unwrap());
        assert!(!fs.delete(&path).unwrap());
    }
}
