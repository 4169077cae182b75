//! Index entries, summaries and fully decoded messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::address::EmailAddress;
use super::attachment::{Attachment, AttachmentInfo};

/// Byte span of one message inside the archive.
///
/// Produced once while the archive is opened and never mutated afterwards.
/// `offset..offset + length` covers the RFC 2822 message (headers + body)
/// with the `From ` envelope line and the line terminator separating it
/// from the next envelope stripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageIndexEntry {
    /// Absolute offset of the first header byte.
    pub offset: u64,
    /// Length in bytes, always greater than zero.
    pub length: u64,
    /// Labels from the `X-Gmail-Labels` header (empty if absent).
    pub labels: Vec<String>,
}

impl MessageIndexEntry {
    /// Exclusive end offset.
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

/// Compact list-view representation of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Composite message id (`<folder_id>::<ordinal>`).
    pub id: String,
    pub folder_id: String,
    pub subject: String,
    pub sender_name: String,
    pub sender_email: String,
    pub received_date: Option<DateTime<Utc>>,
    pub is_read: bool,
    pub has_attachments: bool,
    pub preview: String,
}

/// Output of the MIME decoder for one message (or one message prefix).
///
/// Attachment payloads are held in memory, which is why these live in a
/// bounded cache.
#[derive(Debug, Clone, Default)]
pub struct ParsedMessage {
    pub subject: Option<String>,
    pub from: Option<EmailAddress>,
    pub to: Vec<EmailAddress>,
    pub cc: Vec<EmailAddress>,
    pub bcc: Vec<EmailAddress>,
    pub date: Option<DateTime<Utc>>,
    /// Plain-text body (first `text/plain` part).
    pub text: Option<String>,
    /// HTML body (first `text/html` part).
    pub html: Option<String>,
    pub attachments: Vec<Attachment>,
}

/// Full detail view returned by `get_message_detail`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDetail {
    pub id: String,
    pub folder_id: String,
    pub subject: String,
    pub sender_name: String,
    pub sender_email: String,
    pub received_date: Option<DateTime<Utc>>,
    pub is_read: bool,
    pub has_attachments: bool,
    pub preview: String,
    pub to: Vec<EmailAddress>,
    pub cc: Vec<EmailAddress>,
    pub bcc: Vec<EmailAddress>,
    pub text: Option<String>,
    pub html: Option<String>,
    pub attachments: Vec<AttachmentInfo>,
}

/// One page of summaries plus the folder's total message count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<Summary>,
    pub total: usize,
}
