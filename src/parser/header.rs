//! RFC 5322 header helpers: byte decoding, unfolding, encoded words and dates.

use chrono::{DateTime, Utc};
use mail_parser::MessageParser;
use memchr::memmem;
use tracing::trace;

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
/// A prefix cut in the middle of a UTF-8 sequence still decodes as UTF-8,
/// minus the incomplete tail.
pub fn decode_header_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        // error_len() is None only for a truncated sequence at the very end.
        Err(e) if e.error_len().is_none() => {
            String::from_utf8_lossy(&bytes[..e.valid_up_to()]).into_owned()
        }
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Split raw message bytes at the first blank line into `(headers, body)`.
///
/// The header slice keeps its final line terminator; the body starts after
/// the blank line. Without a blank line everything is header.
pub fn split_header_bytes(raw: &[u8]) -> (&[u8], &[u8]) {
    if let Some(body) = raw.strip_prefix(b"\r\n").or_else(|| raw.strip_prefix(b"\n")) {
        return (&raw[..0], body);
    }
    let lf = memmem::find(raw, b"\n\n").map(|i| (i + 1, i + 2));
    let crlf = memmem::find(raw, b"\n\r\n").map(|i| (i + 1, i + 3));
    let first = match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };
    match first {
        Some((header_end, body_start)) => (&raw[..header_end], &raw[body_start..]),
        None => (raw, &raw[raw.len()..]),
    }
}

/// Return the header block of `text`: everything before the first blank line.
pub fn header_block(text: &str) -> &str {
    let mut start = 0;
    for line in text.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']).is_empty() {
            return &text[..start];
        }
        start += line.len();
    }
    text
}

/// Unfold a header block into `(lowercase_name, value)` pairs.
///
/// A continuation line (starting with space or tab) is appended to the
/// previous value with a single space. Parsing stops at the first blank line.
pub fn unfold_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in header_block(text).lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = result.last_mut() {
                let piece = line.trim();
                if !piece.is_empty() {
                    if !last.1.is_empty() {
                        last.1.push(' ');
                    }
                    last.1.push_str(piece);
                }
            }
        } else if let Some(colon_pos) = line.find(':') {
            let name = line[..colon_pos].trim().to_lowercase();
            let value = line[colon_pos + 1..].trim().to_string();
            result.push((name, value));
        }
    }

    result
}

/// Get the first value for a header name (`name` must be lowercase).
pub fn get_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

/// Decode RFC 2047 encoded words in a single-line header value.
///
/// The value is wrapped in a one-header message and handed to `mail-parser`,
/// which knows every charset `encoding_rs` does. Plain text passes through.
pub fn decode_encoded_words(input: &str) -> String {
    if !input.contains("=?") {
        return input.to_string();
    }
    let wrapped = format!("Subject: {}\n\n", input.replace(['\r', '\n'], " "));
    MessageParser::default()
        .parse(wrapped.as_bytes())
        .and_then(|msg| msg.subject().map(str::to_string))
        .unwrap_or_else(|| input.to_string())
}

/// Parse an email date string.
///
/// RFC 2822 and RFC 3339 are tried directly; anything else goes through
/// `mail-parser`'s lenient date parser.
pub fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    let fake_msg = format!("Date: {trimmed}\n\n");
    let parsed = MessageParser::default().parse(fake_msg.as_bytes());
    let dt = parsed
        .as_ref()
        .and_then(|msg| msg.date())
        .and_then(|d| DateTime::parse_from_rfc3339(&d.to_rfc3339()).ok())
        .map(|d| d.with_timezone(&Utc));

    if dt.is_none() {
        trace!(date = trimmed, "Could not parse date");
    }
    dt
}
