//! Gmail label extraction from the leading bytes of a message.

use super::header::{
    decode_encoded_words, decode_header_bytes, get_header, split_header_bytes, unfold_headers,
};

/// Header carrying the comma-separated label list in Gmail Takeout exports.
pub const LABEL_HEADER: &str = "x-gmail-labels";

/// Extract the label list from a message prefix.
///
/// Only the header block is decoded, so body bytes in another charset
/// cannot change how a label reads. Folded lines are joined with a single
/// space before splitting, and commas inside double quotes do not split:
/// `Inbox,"Family, Trips"` yields `["Inbox", "Family, Trips"]`.
pub fn extract_labels(prefix: &[u8]) -> Vec<String> {
    let (raw_headers, _) = split_header_bytes(prefix);
    let text = decode_header_bytes(raw_headers);
    let headers = unfold_headers(&text);
    get_header(&headers, LABEL_HEADER)
        .map(split_label_list)
        .unwrap_or_default()
}

/// Split a label header value on commas that are outside double quotes.
pub fn split_label_list(raw: &str) -> Vec<String> {
    let mut labels = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in raw.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                push_label(&mut labels, &current);
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    push_label(&mut labels, &current);

    labels
}

fn push_label(labels: &mut Vec<String>, raw: &str) {
    let label = decode_encoded_words(raw.trim());
    let label = label.trim();
    if !label.is_empty() {
        labels.push(label.to_string());
    }
}
