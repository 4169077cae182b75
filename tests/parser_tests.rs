//! Integration tests for the boundary scanner, label extraction and index build.

use std::io::Write;
use std::path::{Path, PathBuf};

use assert_fs::prelude::*;
use mboxsession::index::builder::{self, IndexOptions};
use mboxsession::parser::mbox::BoundaryScanner;
use mboxsession::store::reader::ArchiveReader;
use mboxsession::SessionError;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn index(path: &Path) -> Vec<mboxsession::model::mail::MessageIndexEntry> {
    builder::build_index(path, &IndexOptions::default(), None).unwrap()
}

// ─── Test 1: gmail.mbox → exactly 4 messages ────────────────────────

#[test]
fn test_gmail_fixture_count() {
    let scanner = BoundaryScanner::new(fixture("gmail.mbox")).unwrap();
    let boundaries = scanner.scan(None).unwrap();
    assert_eq!(boundaries.len(), 4, "escaped >From must not split a message");
    assert_eq!(boundaries[0], 0);
    assert_eq!(index(&fixture("gmail.mbox")).len(), 4);
}

// ─── Test 2: Byte ranges cover exactly the message text ─────────────

#[test]
fn test_ranges_round_trip() {
    let path = fixture("gmail.mbox");
    let entries = index(&path);
    let reader = ArchiveReader::open(&path).unwrap();

    let first = reader.read_message(&entries[0]).unwrap();
    assert!(first.starts_with(b"X-GM-THRID: 1788000000000000001\n"));
    assert!(first.ends_with(b"with thanks.\n"));

    let last = reader.read_message(entries.last().unwrap()).unwrap();
    assert!(last.starts_with(b"X-GM-THRID: 1788000000000000004\n"));
    assert!(last.ends_with(b"without a subject."));

    // Every range starts right after its envelope line and is followed by
    // "\nFrom " or by the final newline.
    let raw = std::fs::read(&path).unwrap();
    let envelope_start = |offset: u64| {
        let start = offset as usize;
        assert_eq!(raw[start - 1], b'\n', "offset {start}");
        raw[..start - 1]
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1)
    };
    for entry in &entries {
        let line = envelope_start(entry.offset);
        assert!(raw[line..].starts_with(b"From "), "offset {}", entry.offset);
    }
    assert_eq!(envelope_start(entries[0].offset), 0);
    for pair in entries.windows(2) {
        let end = pair[0].end() as usize;
        assert_eq!(&raw[end..end + 6], b"\nFrom ");
        assert_eq!(envelope_start(pair[1].offset), end + 1);
    }
    assert_eq!(entries.last().unwrap().end() + 1, raw.len() as u64);
}

// ─── Test 3: Result independent of chunk size ───────────────────────

#[test]
fn test_chunk_size_independence() {
    let path = fixture("gmail.mbox");
    let reference = index(&path);
    for chunk_size in [1, 2, 3, 5, 6, 7, 64, 1000, 4096] {
        let options = IndexOptions {
            chunk_size,
            ..IndexOptions::default()
        };
        let entries = builder::build_index(&path, &options, None).unwrap();
        assert_eq!(entries, reference, "chunk size {chunk_size}");
    }
}

// ─── Test 4: Labels, including quoted commas and folding ────────────

#[test]
fn test_labels_extracted() {
    let entries = index(&fixture("gmail.mbox"));
    assert_eq!(entries[0].labels, vec!["Inbox", "Important", "Opened"]);
    assert_eq!(
        entries[1].labels,
        vec!["Inbox", "Unread", "Category Promotions"]
    );
    assert_eq!(
        entries[2].labels,
        vec!["Family, Trips", "Work/Projects/Alpha", "Sent", "Opened"]
    );
    assert_eq!(entries[3].labels, vec!["Important", "Starred", "Opened"]);
}

#[test]
fn test_unlabeled_archive() {
    let entries = index(&fixture("plain.mbox"));
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|e| e.labels.is_empty()));
}

// ─── Test 5: Degenerate files ───────────────────────────────────────

#[test]
fn test_empty_file() {
    assert!(index(&fixture("empty.mbox")).is_empty());
}

#[test]
fn test_missing_file() {
    let err = builder::build_index(
        Path::new("/nonexistent/archive.mbox"),
        &IndexOptions::default(),
        None,
    )
    .unwrap_err();
    assert!(matches!(err, SessionError::FileNotFound(_)));
}

#[test]
fn test_leading_text_and_empty_body() {
    let dir = assert_fs::TempDir::new().unwrap();
    let file = dir.child("notes.mbox");
    file.write_str("Subject: not an mbox\n\nFrom here on, nothing.\n")
        .unwrap();
    assert!(index(file.path()).is_empty());
}

#[test]
fn test_unterminated_envelope_is_dropped() {
    let dir = assert_fs::TempDir::new().unwrap();
    let file = dir.child("cut.mbox");
    file.write_str("From a@b Mon Jan 1 00:00:00 2024\nSubject: kept\n\nBody\n\nFrom truncated")
        .unwrap();
    let entries = index(file.path());
    assert_eq!(entries.len(), 1);
    let reader = ArchiveReader::open(file.path()).unwrap();
    assert_eq!(
        reader.read_message(&entries[0]).unwrap(),
        b"Subject: kept\n\nBody\n"
    );
}

#[test]
fn test_crlf_archive() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(
        b"From a@b Mon Jan 1 00:00:00 2024\r\nSubject: one\r\n\r\nA\r\n\
          From a@b Mon Jan 1 00:00:00 2024\r\nSubject: two\r\n\r\nB\r\n",
    )
    .unwrap();
    tmp.flush().unwrap();

    let entries = index(tmp.path());
    assert_eq!(entries.len(), 2);
    let reader = ArchiveReader::open(tmp.path()).unwrap();
    assert_eq!(
        reader.read_message(&entries[0]).unwrap(),
        b"Subject: one\r\n\r\nA\r"
    );
}

// ─── Test 6: Progress reports reach the file size ───────────────────

#[test]
fn test_progress_reaches_total() {
    let path = fixture("gmail.mbox");
    let total = std::fs::metadata(&path).unwrap().len();
    let last = std::cell::Cell::new((0u64, 0u64));
    let options = IndexOptions {
        chunk_size: 256,
        ..IndexOptions::default()
    };
    builder::build_index(&path, &options, Some(&|done, size| last.set((done, size)))).unwrap();
    assert_eq!(last.get(), (total, total));
}
