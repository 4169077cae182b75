//! Keyword search over summaries already resident in a session.
//!
//! Nothing is parsed here: coverage is whatever pagination has loaded so far.

use crate::model::mail::Summary;

/// Case-insensitive substring match against subject, sender and preview.
///
/// `needle` must already be lowercase.
pub fn summary_matches(summary: &Summary, needle: &str) -> bool {
    [
        &summary.subject,
        &summary.sender_name,
        &summary.sender_email,
        &summary.preview,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(needle))
}

/// Filter `summaries` (in iteration order) down to at most `max_results` hits.
///
/// A blank query matches nothing. Otherwise the query is matched as given,
/// surrounding whitespace included.
pub fn search_summaries<'a>(
    summaries: impl IntoIterator<Item = &'a Summary>,
    query: &str,
    max_results: usize,
) -> Vec<Summary> {
    if query.trim().is_empty() {
        return Vec::new();
    }
    let needle = query.to_lowercase();
    summaries
        .into_iter()
        .filter(|s| summary_matches(s, &needle))
        .take(max_results)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(subject: &str, name: &str, email: &str, preview: &str) -> Summary {
        Summary {
            id: "f::0".into(),
            folder_id: "f".into(),
            subject: subject.into(),
            sender_name: name.into(),
            sender_email: email.into(),
            received_date: None,
            is_read: true,
            has_attachments: false,
            preview: preview.into(),
        }
    }

    #[test]
    fn test_matches_each_field_case_insensitively() {
        let s = summary("Quarterly Report", "Alice Smith", "alice@corp.com", "Numbers inside");
        assert!(summary_matches(&s, "quarterly"));
        assert!(summary_matches(&s, "smith"));
        assert!(summary_matches(&s, "corp.com"));
        assert!(summary_matches(&s, "numbers"));
        assert!(!summary_matches(&s, "bob"));
    }

    #[test]
    fn test_max_results_and_blank_query() {
        let items = vec![
            summary("invoice 1", "", "", ""),
            summary("other", "", "", ""),
            summary("Invoice 2", "", "", ""),
            summary("INVOICE 3", "", "", ""),
        ];
        let hits = search_summaries(&items, "Invoice", 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].subject, "invoice 1");
        assert_eq!(hits[1].subject, "Invoice 2");
        assert!(search_summaries(&items, "   ", 10).is_empty());
    }

    #[test]
    fn test_query_whitespace_is_significant() {
        let items = vec![
            summary("", "Bob Jones", "", ""),
            summary("", "", "bob@example.com", ""),
        ];
        let hits = search_summaries(&items, " jones", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].sender_name, "Bob Jones");
        assert!(search_summaries(&items, " bob", 10).is_empty());
        assert_eq!(search_summaries(&items, "bob", 10).len(), 2);
    }
}
