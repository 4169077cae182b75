//! Streaming MBOX boundary scanner.
//!
//! Reads the archive in fixed-size chunks (4 MiB by default) and records the
//! absolute offset of every `From ` envelope line. Never holds more than one
//! chunk plus a few carried-over bytes in memory.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use memchr::memmem;
use tracing::debug;

use crate::error::{Result, SessionError};

/// Default chunk size for sequential scanning.
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// Literal that starts every envelope line.
const ENVELOPE_MARKER: &[u8] = b"From ";

/// An envelope line anywhere after offset 0: line terminator + literal.
const BOUNDARY_NEEDLE: &[u8] = b"\nFrom ";

/// Finds message boundaries in an MBOX archive.
///
/// A boundary is a line starting with `From `, either at offset 0 or right
/// after a `\n`. Quoted `>From ` lines and `From ` in the middle of a line
/// are not boundaries.
pub struct BoundaryScanner {
    path: PathBuf,
    file_size: u64,
    chunk_size: usize,
}

impl BoundaryScanner {
    /// Create a scanner for the given archive.
    ///
    /// Verifies that the file exists and is readable, but does NOT validate
    /// that it is actually an MBOX.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = std::fs::metadata(&path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                SessionError::FileNotFound(path.clone())
            } else {
                SessionError::io(&path, e)
            }
        })?;
        Ok(Self {
            path,
            file_size: metadata.len(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    /// Override the chunk size (clamped to at least one byte).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Scan the whole archive and return the sorted boundary offsets.
    ///
    /// `progress` receives `(bytes_scanned, file_size)` once per chunk.
    pub fn scan(&self, progress: Option<&dyn Fn(u64, u64)>) -> Result<Vec<u64>> {
        if self.file_size == 0 {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path).map_err(|e| SessionError::io(&self.path, e))?;
        let total = self.file_size;
        let report = |scanned: u64| {
            if let Some(cb) = progress {
                cb(scanned, total);
            }
        };
        let boundaries = scan_boundaries(file, self.chunk_size, &report)
            .map_err(|e| SessionError::io(&self.path, e))?;

        debug!(
            path = %self.path.display(),
            boundaries = boundaries.len(),
            chunk_size = self.chunk_size,
            "Boundary scan finished"
        );
        Ok(boundaries)
    }
}

/// Scan any reader for envelope-line offsets.
///
/// The needle `\nFrom ` can straddle two chunks, so the last
/// `needle.len() - 1` bytes of everything seen so far are carried into the
/// next window. A match always ends inside the newly read bytes (the needle
/// is longer than the carry), so no boundary is reported twice and the
/// result does not depend on `chunk_size`.
pub fn scan_boundaries<R: Read>(
    mut reader: R,
    chunk_size: usize,
    progress: &dyn Fn(u64),
) -> std::io::Result<Vec<u64>> {
    let chunk_size = chunk_size.max(1);
    let carry_max = BOUNDARY_NEEDLE.len() - 1;
    let finder = memmem::Finder::new(BOUNDARY_NEEDLE);

    let mut boundaries = Vec::new();
    let mut chunk = vec![0u8; chunk_size];
    let mut window: Vec<u8> = Vec::with_capacity(chunk_size + carry_max);
    let mut position: u64 = 0;
    let mut start_checked = false;

    loop {
        let n = read_full(&mut reader, &mut chunk)?;
        if n == 0 {
            break;
        }

        let window_start = position - window.len() as u64;
        window.extend_from_slice(&chunk[..n]);
        position += n as u64;

        // Until the window first holds a whole marker it still starts at
        // offset 0, so this check sees the beginning of the file.
        if !start_checked && window.len() >= ENVELOPE_MARKER.len() {
            if window.starts_with(ENVELOPE_MARKER) {
                boundaries.push(0);
            }
            start_checked = true;
        }

        for idx in finder.find_iter(&window) {
            boundaries.push(window_start + idx as u64 + 1);
        }

        let keep = window.len().min(carry_max);
        window.drain(..window.len() - keep);

        progress(position);
    }

    Ok(boundaries)
}

/// Fill `buf` as far as the reader allows. Returns 0 only at EOF.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &[u8] = b"From a@example.com Thu Jan 01 00:00:00 2024\n\
Subject: one\n\
\n\
Body mentioning From here and\n\
>From an escaped line\n\
\n\
From b@example.com Fri Jan 02 00:00:00 2024\n\
Subject: two\n\
\n\
Second body\n\
\n\
From c@example.com Sat Jan 03 00:00:00 2024\n\
Subject: three\n\
\n\
Third\n";

    fn scan(data: &[u8], chunk_size: usize) -> Vec<u64> {
        scan_boundaries(Cursor::new(data), chunk_size, &|_| {}).unwrap()
    }

    fn naive(data: &[u8]) -> Vec<u64> {
        let mut out = Vec::new();
        if data.starts_with(ENVELOPE_MARKER) {
            out.push(0);
        }
        for i in 0..data.len() {
            if data[i..].starts_with(BOUNDARY_NEEDLE) {
                out.push(i as u64 + 1);
            }
        }
        out
    }

    #[test]
    fn test_finds_all_envelopes() {
        let found = scan(SAMPLE, DEFAULT_CHUNK_SIZE);
        assert_eq!(found.len(), 3);
        assert_eq!(found[0], 0);
        for &offset in &found {
            assert!(SAMPLE[offset as usize..].starts_with(b"From "));
        }
    }

    #[test]
    fn test_chunk_size_is_not_observable() {
        let expected = naive(SAMPLE);
        for chunk_size in 1..=64 {
            assert_eq!(
                scan(SAMPLE, chunk_size),
                expected,
                "chunk size {chunk_size} changed the result"
            );
        }
    }

    #[test]
    fn test_no_marker_at_start() {
        let data = b"garbage line\nFrom x@y Mon Jan 01 00:00:00 2024\nSubject: s\n\nb\n";
        for chunk_size in [1, 2, 5, 6, 7, 4096] {
            assert_eq!(scan(data, chunk_size), vec![13]);
        }
    }

    #[test]
    fn test_short_and_empty_input() {
        assert!(scan(b"", 4).is_empty());
        assert!(scan(b"From", 1).is_empty());
        assert_eq!(scan(b"From ", 1), vec![0]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let data = b"From a Mon\r\nSubject: a\r\n\r\nx\r\nFrom b Tue\r\nSubject: b\r\n\r\ny\r\n";
        assert_eq!(scan(data, 3), naive(data));
        assert_eq!(scan(data, 3).len(), 2);
    }

    #[test]
    fn test_lowercase_and_escaped_are_ignored() {
        let data = b"From a\nx\nfrom b\n>From c\n From d\n";
        assert_eq!(scan(data, 2), vec![0]);
    }

    #[test]
    fn test_progress_reports_final_position() {
        let last = std::cell::Cell::new(0u64);
        scan_boundaries(Cursor::new(SAMPLE), 16, &|pos| last.set(pos)).unwrap();
        assert_eq!(last.get(), SAMPLE.len() as u64);
    }
}
