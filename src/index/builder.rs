//! Index construction: boundary offsets to message byte ranges and labels.

use std::path::Path;

use tracing::{debug, info};

use crate::error::Result;
use crate::model::mail::MessageIndexEntry;
use crate::parser::labels::extract_labels;
use crate::parser::mbox::{BoundaryScanner, DEFAULT_CHUNK_SIZE};
use crate::store::reader::ArchiveReader;

/// Default number of leading message bytes searched for the label header.
pub const DEFAULT_LABEL_PREFIX_LEN: u64 = 4 * 1024;

/// Block size used to look for the end of an envelope line.
const ENVELOPE_READ_LEN: u64 = 1024;

/// Tuning knobs for index construction.
#[derive(Debug, Clone, Copy)]
pub struct IndexOptions {
    /// Chunk size of the sequential boundary scan.
    pub chunk_size: usize,
    /// Bytes of each message inspected for labels.
    pub label_prefix_len: u64,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            label_prefix_len: DEFAULT_LABEL_PREFIX_LEN,
        }
    }
}

/// Build the message index for an archive.
///
/// 1. Scan the file sequentially for envelope lines.
/// 2. Turn each boundary into a `[offset, length)` message range.
/// 3. Read a short prefix of every message and extract its labels.
///
/// An archive without any envelope line yields an empty index. Any read
/// error aborts the whole build.
pub fn build_index(
    path: &Path,
    options: &IndexOptions,
    progress: Option<&dyn Fn(u64, u64)>,
) -> Result<Vec<MessageIndexEntry>> {
    info!(path = %path.display(), "Building index");

    let scanner = BoundaryScanner::new(path)?.with_chunk_size(options.chunk_size);
    let boundaries = scanner.scan(progress)?;
    let reader = ArchiveReader::open(path)?;
    let entries = entries_from_boundaries(&reader, &boundaries, options.label_prefix_len)?;

    info!(
        path = %path.display(),
        boundaries = boundaries.len(),
        messages = entries.len(),
        "Index built"
    );
    Ok(entries)
}

/// Convert sorted boundary offsets into index entries.
///
/// A message body starts right after its envelope line and ends before the
/// `\n` that precedes the next envelope line. For the last message, one
/// trailing `\n` at end of file is excluded as well. Messages whose body
/// would be empty are dropped.
pub fn entries_from_boundaries(
    reader: &ArchiveReader,
    boundaries: &[u64],
    label_prefix_len: u64,
) -> Result<Vec<MessageIndexEntry>> {
    let file_size = reader.file_size();
    let mut entries = Vec::with_capacity(boundaries.len());

    if boundaries.is_empty() {
        return Ok(entries);
    }

    let ends_with_newline = reader.read_at(file_size - 1, 1)?.first() == Some(&b'\n');

    for (i, &start) in boundaries.iter().enumerate() {
        let next = boundaries.get(i + 1).copied();
        let span_end = next.unwrap_or(file_size);

        let Some(line_end) = find_line_end(reader, start, span_end)? else {
            debug!(offset = start, "Envelope line without terminator, skipping");
            continue;
        };

        let body_start = line_end + 1;
        let body_end = match next {
            Some(next) => next - 1,
            None if ends_with_newline => file_size - 1,
            None => file_size,
        };
        if body_end <= body_start {
            debug!(offset = start, "Empty message, skipping");
            continue;
        }

        let prefix = reader.read_prefix(body_start, label_prefix_len, body_end)?;
        entries.push(MessageIndexEntry {
            offset: body_start,
            length: body_end - body_start,
            labels: extract_labels(&prefix),
        });
    }

    Ok(entries)
}

/// Offset of the first `\n` in `[start, end)`, reading in small blocks.
fn find_line_end(reader: &ArchiveReader, start: u64, end: u64) -> Result<Option<u64>> {
    let mut pos = start;
    while pos < end {
        let block = reader.read_prefix(pos, ENVELOPE_READ_LEN, end)?;
        if let Some(idx) = memchr::memchr(b'\n', &block) {
            return Ok(Some(pos + idx as u64));
        }
        pos += block.len() as u64;
    }
    Ok(None)
}
