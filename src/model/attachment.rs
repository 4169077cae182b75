//! Attachments: decoded payloads and the metadata handed to clients.

use serde::{Deserialize, Serialize};

/// A decoded attachment, payload included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Filename of the attachment. Generated if missing from the headers.
    pub filename: String,

    /// MIME content type (e.g. `"image/jpeg"`, `"application/pdf"`).
    pub content_type: String,

    /// Content-ID for inline attachments referenced from HTML.
    pub content_id: Option<String>,

    /// `true` if the attachment is inline (embedded in HTML).
    pub is_inline: bool,

    /// Decoded bytes.
    pub data: Vec<u8>,
}

impl Attachment {
    /// Metadata view at position `index` within its message.
    pub fn info(&self, index: usize) -> AttachmentInfo {
        AttachmentInfo {
            index,
            filename: self.filename.clone(),
            content_type: self.content_type.clone(),
            size: self.data.len() as u64,
            content_id: self.content_id.clone(),
            is_inline: self.is_inline,
        }
    }
}

/// Attachment metadata without the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentInfo {
    /// Position within the message, as accepted by `get_attachment`.
    pub index: usize,
    pub filename: String,
    pub content_type: String,
    /// Decoded size in bytes.
    pub size: u64,
    pub content_id: Option<String>,
    pub is_inline: bool,
}

/// Result of `get_attachment`: metadata plus the complete payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentContent {
    pub info: AttachmentInfo,
    pub data: Vec<u8>,
}
