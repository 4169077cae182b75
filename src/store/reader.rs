//! Random-access reads from an open archive.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::trace;

use crate::error::{Result, SessionError};
use crate::model::mail::MessageIndexEntry;

/// Read-only handle on an archive, shared by every operation of a session.
///
/// Each read is a seek followed by an exact read, serialized by a mutex so
/// concurrent callers never observe each other's file position.
pub struct ArchiveReader {
    path: PathBuf,
    file: Mutex<File>,
    file_size: u64,
}

impl ArchiveReader {
    /// Open an archive for random-access reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| SessionError::io(&path, e))?;
        let file_size = file
            .metadata()
            .map_err(|e| SessionError::io(&path, e))?
            .len();
        Ok(Self {
            path,
            file: Mutex::new(file),
            file_size,
        })
    }

    /// Size of the archive when it was opened.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Read exactly `length` bytes at `offset`.
    pub fn read_at(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        trace!(offset, length, "Reading from archive");
        let mut buf = vec![0u8; length as usize];
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| SessionError::read(&self.path, offset, e))?;
        file.read_exact(&mut buf)
            .map_err(|e| SessionError::read(&self.path, offset, e))?;
        Ok(buf)
    }

    /// Read up to `max_len` bytes starting at `offset`, stopping at `end`.
    pub fn read_prefix(&self, offset: u64, max_len: u64, end: u64) -> Result<Vec<u8>> {
        let length = max_len.min(end.saturating_sub(offset));
        self.read_at(offset, length)
    }

    /// Full bytes of one indexed message.
    pub fn read_message(&self, entry: &MessageIndexEntry) -> Result<Vec<u8>> {
        self.read_at(entry.offset, entry.length)
    }

    /// First `max_len` bytes of one indexed message.
    pub fn read_message_prefix(&self, entry: &MessageIndexEntry, max_len: u64) -> Result<Vec<u8>> {
        self.read_prefix(entry.offset, max_len, entry.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_positioned_reads() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"0123456789").unwrap();
        tmp.flush().unwrap();

        let reader = ArchiveReader::open(tmp.path()).unwrap();
        assert_eq!(reader.file_size(), 10);
        assert_eq!(reader.read_at(3, 4).unwrap(), b"3456");
        assert_eq!(reader.read_prefix(8, 100, 10).unwrap(), b"89");
        assert!(reader.read_prefix(12, 100, 10).unwrap().is_empty());

        let entry = MessageIndexEntry {
            offset: 2,
            length: 5,
            labels: Vec::new(),
        };
        assert_eq!(reader.read_message(&entry).unwrap(), b"23456");
        assert_eq!(reader.read_message_prefix(&entry, 2).unwrap(), b"23");
    }

    #[test]
    fn test_read_past_end_is_read_error() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"abc").unwrap();
        tmp.flush().unwrap();

        let reader = ArchiveReader::open(tmp.path()).unwrap();
        let err = reader.read_at(1, 10).unwrap_err();
        assert!(matches!(err, SessionError::Read { offset: 1, .. }));
    }
}
