//! Header-only extraction: list-view fields from a short message prefix.
//!
//! Only the first few KB of a message are read, so pagination cost does not
//! depend on attachment sizes. The decoder gets the truncated prefix first;
//! when it refuses, per-field patterns recover what they can.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::header::{decode_encoded_words, decode_header_bytes, parse_date, split_header_bytes};
use super::mime::{html_to_text, MessageDecoder};

/// Subject used when a message has none.
pub const NO_SUBJECT: &str = "(No Subject)";

/// Default maximum preview length in characters.
pub const DEFAULT_PREVIEW_LEN: usize = 200;

static SUBJECT_RE: Lazy<Regex> = Lazy::new(|| header_pattern("subject"));
static FROM_RE: Lazy<Regex> = Lazy::new(|| header_pattern("from"));
static DATE_RE: Lazy<Regex> = Lazy::new(|| header_pattern("date"));
static CONTENT_TYPE_RE: Lazy<Regex> = Lazy::new(|| header_pattern("content-type"));
static STATUS_RE: Lazy<Regex> = Lazy::new(|| header_pattern("status"));
static FOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r?\n[ \t]+").expect("valid regex"));
static NAME_ADDR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\s*"?([^"<]*?)"?\s*<([^>]*)>"#).expect("valid regex"));
static BARE_ADDR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\s<>@,;]+@[^\s<>,;]+").expect("valid regex"));
static ATTACHMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)content-disposition:\s*attachment").expect("valid regex"));
static BLANK_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r?\n\r?\n").expect("valid regex"));

/// `^Name: value` plus any folded continuation lines, case-insensitive.
fn header_pattern(name: &str) -> Regex {
    Regex::new(&format!(r"(?mi)^{name}:[ \t]*(.*(?:\r?\n[ \t]+.*)*)")).expect("valid regex")
}

/// Fields recovered from a message prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderSummary {
    pub subject: String,
    pub sender_name: String,
    pub sender_email: String,
    pub date: Option<DateTime<Utc>>,
    pub preview: String,
    pub has_attachments: bool,
    /// Read state from a `Status:` header, when the archive has one.
    pub seen: Option<bool>,
}

impl Default for HeaderSummary {
    fn default() -> Self {
        Self {
            subject: NO_SUBJECT.to_string(),
            sender_name: String::new(),
            sender_email: String::new(),
            date: None,
            preview: String::new(),
            has_attachments: false,
            seen: None,
        }
    }
}

/// Extract summary fields from a message prefix.
///
/// Never fails: a prefix the decoder rejects goes through the pattern-based
/// fallback, and every missing field takes its default.
pub fn extract_summary(
    prefix: &[u8],
    decoder: &dyn MessageDecoder,
    preview_len: usize,
) -> HeaderSummary {
    let (raw_headers, raw_body) = split_header_bytes(prefix);
    let headers = decode_header_bytes(raw_headers);
    let body = decode_header_bytes(raw_body);
    let disposition_attachment =
        ATTACHMENT_RE.is_match(&headers) || ATTACHMENT_RE.is_match(&body);
    let seen = header_value(&STATUS_RE, &headers).map(|s| s.contains('R'));

    match decoder.decode(prefix) {
        Ok(parsed) => {
            let body = parsed
                .text
                .or_else(|| parsed.html.as_deref().map(html_to_text))
                .unwrap_or_default();
            let from = parsed.from.unwrap_or_default();
            HeaderSummary {
                subject: non_empty_subject(parsed.subject.as_deref().unwrap_or_default()),
                sender_name: from.name,
                sender_email: from.email,
                date: parsed.date,
                preview: make_preview(&body, preview_len),
                has_attachments: !parsed.attachments.is_empty() || disposition_attachment,
                seen,
            }
        }
        Err(e) => {
            debug!(error = %e, "Decoder rejected prefix, using pattern fallback");
            extract_fields(&headers, &body, preview_len)
        }
    }
}

/// Pattern-based extraction over already-decoded prefix text.
pub fn extract_with_patterns(text: &str, preview_len: usize) -> HeaderSummary {
    let (headers, body) = split_prefix(text);
    extract_fields(headers, body, preview_len)
}

/// Pattern-based extraction over a decoded header block and partial body.
fn extract_fields(headers: &str, body: &str, preview_len: usize) -> HeaderSummary {
    let subject = header_value(&SUBJECT_RE, headers)
        .map(|s| non_empty_subject(&decode_encoded_words(&s)))
        .unwrap_or_else(|| NO_SUBJECT.to_string());

    let (sender_name, sender_email) = header_value(&FROM_RE, headers)
        .map(|from| parse_sender(&from))
        .unwrap_or_default();

    let date = header_value(&DATE_RE, headers).and_then(|d| parse_date(&d));

    let content_type = header_value(&CONTENT_TYPE_RE, headers)
        .map(|ct| ct.to_ascii_lowercase())
        .unwrap_or_default();
    let has_attachments = content_type.starts_with("multipart/mixed")
        || ATTACHMENT_RE.is_match(headers)
        || ATTACHMENT_RE.is_match(body);

    HeaderSummary {
        subject,
        sender_name,
        sender_email,
        date,
        preview: make_preview(body, preview_len),
        has_attachments,
        seen: header_value(&STATUS_RE, headers).map(|s| s.contains('R')),
    }
}

/// Split at the first blank line into `(headers, partial_body)`.
fn split_prefix(text: &str) -> (&str, &str) {
    match BLANK_LINE_RE.find(text) {
        Some(m) => (&text[..m.start()], &text[m.end()..]),
        None => (text, ""),
    }
}

/// First match of a header pattern with folded lines joined by one space.
fn header_value(pattern: &Regex, text: &str) -> Option<String> {
    let caps = pattern.captures(text)?;
    let raw = caps.get(1)?.as_str();
    Some(FOLD_RE.replace_all(raw, " ").trim().to_string())
}

/// Split a `From:` value into `(name, email)`.
fn parse_sender(raw: &str) -> (String, String) {
    let decoded = decode_encoded_words(raw);
    if let Some(caps) = NAME_ADDR_RE.captures(&decoded) {
        let name = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        let email = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
        return (name.to_string(), email.to_string());
    }
    match BARE_ADDR_RE.find(&decoded) {
        Some(m) => (String::new(), m.as_str().to_string()),
        None => (decoded.trim().to_string(), String::new()),
    }
}

fn non_empty_subject(subject: &str) -> String {
    let normalized = subject.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        NO_SUBJECT.to_string()
    } else {
        normalized
    }
}

/// Collapse whitespace and cap at `max_chars` characters.
pub fn make_preview(body: &str, max_chars: usize) -> String {
    body.split_whitespace()
        .flat_map(|word| [" ", word])
        .skip(1)
        .flat_map(str::chars)
        .take(max_chars)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, SessionError};
    use crate::model::mail::ParsedMessage;
    use crate::parser::mime::MailParserDecoder;

    struct RejectingDecoder;

    impl MessageDecoder for RejectingDecoder {
        fn decode(&self, _raw: &[u8]) -> Result<ParsedMessage> {
            Err(SessionError::DecodeFailure("truncated".into()))
        }
    }

    const PREFIX: &[u8] = b"From: \"Doe, Jane\" <jane@example.com>\n\
Subject: Quarterly\n\
\tnumbers\n\
Date: Thu, 04 Jan 2024 10:00:00 +0000\n\
Status: RO\n\
Content-Type: text/plain\n\
\n\
Hello   there,\n\
  the numbers are in.\n";

    #[test]
    fn test_decoder_path() {
        let s = extract_summary(PREFIX, &MailParserDecoder, DEFAULT_PREVIEW_LEN);
        assert_eq!(s.subject, "Quarterly numbers");
        assert_eq!(s.sender_name, "Doe, Jane");
        assert_eq!(s.sender_email, "jane@example.com");
        assert!(s.date.is_some());
        assert_eq!(s.preview, "Hello there, the numbers are in.");
        assert!(!s.has_attachments);
        assert_eq!(s.seen, Some(true));
    }

    #[test]
    fn test_fallback_path() {
        let s = extract_summary(PREFIX, &RejectingDecoder, DEFAULT_PREVIEW_LEN);
        assert_eq!(s.subject, "Quarterly numbers");
        assert_eq!(s.sender_name, "Doe, Jane");
        assert_eq!(s.sender_email, "jane@example.com");
        assert_eq!(
            s.date.unwrap().format("%Y-%m-%d").to_string(),
            "2024-01-04"
        );
        assert_eq!(s.preview, "Hello there, the numbers are in.");
        assert_eq!(s.seen, Some(true));
    }

    #[test]
    fn test_fallback_defaults() {
        let s = extract_with_patterns("X-Other: 1\n\n", DEFAULT_PREVIEW_LEN);
        assert_eq!(s, HeaderSummary::default());
    }

    #[test]
    fn test_fallback_bare_sender() {
        let s = extract_with_patterns("From: bob@example.com\n\nhi", 10);
        assert_eq!(s.sender_name, "");
        assert_eq!(s.sender_email, "bob@example.com");
        assert_eq!(s.preview, "hi");
    }

    #[test]
    fn test_fallback_attachment_detection() {
        let mixed = "Content-Type: Multipart/Mixed;\n boundary=\"b\"\n\n--b\n";
        assert!(extract_with_patterns(mixed, 50).has_attachments);

        let disposition = "Content-Type: multipart/alternative\n\n--b\nContent-Disposition: attachment; filename=x\n";
        assert!(extract_with_patterns(disposition, 50).has_attachments);

        let plain = "Content-Type: text/plain\n\nno files here\n";
        assert!(!extract_with_patterns(plain, 50).has_attachments);
    }

    #[test]
    fn test_fallback_encoded_subject() {
        let s = extract_with_patterns("Subject: =?UTF-8?B?SG9sYSBtdW5kbw==?=\n\n", 10);
        assert_eq!(s.subject, "Hola mundo");
    }

    #[test]
    fn test_fallback_headers_unaffected_by_8bit_body() {
        let prefix = b"From: Jos\xc3\xa9 <jose@example.com>\nSubject: Reuni\xc3\xb3n\n\ncaf\xe9 con leche\n";
        let s = extract_summary(prefix, &RejectingDecoder, DEFAULT_PREVIEW_LEN);
        assert_eq!(s.subject, "Reunión");
        assert_eq!(s.sender_name, "José");
        assert_eq!(s.sender_email, "jose@example.com");
        assert_eq!(s.preview, "café con leche");
    }

    #[test]
    fn test_make_preview_truncates_chars() {
        assert_eq!(make_preview("  añb\n\n c  ", 3), "añb");
        assert_eq!(make_preview("one  two", 100), "one two");
        assert_eq!(make_preview("", 10), "");
    }
}
