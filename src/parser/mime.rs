//! MIME decoding: the decoder seam and its `mail-parser` implementation.

use chrono::{DateTime, Utc};
use mail_parser::{MessageParser, MimeHeaders};

use crate::error::{Result, SessionError};
use crate::model::address::EmailAddress;
use crate::model::attachment::Attachment;
use crate::model::mail::ParsedMessage;

/// Turns raw RFC 2822 bytes into a [`ParsedMessage`].
///
/// Implementations must be tolerant of truncated input where they can, and
/// return [`SessionError::DecodeFailure`] where they cannot. Sessions share
/// one decoder across threads.
pub trait MessageDecoder: Send + Sync {
    fn decode(&self, raw: &[u8]) -> Result<ParsedMessage>;
}

/// Default decoder backed by `mail-parser`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MailParserDecoder;

impl MessageDecoder for MailParserDecoder {
    fn decode(&self, raw: &[u8]) -> Result<ParsedMessage> {
        let msg = MessageParser::default()
            .parse(raw)
            .ok_or_else(|| SessionError::DecodeFailure("mail-parser rejected input".into()))?;

        let date = msg
            .date()
            .and_then(|d| DateTime::parse_from_rfc3339(&d.to_rfc3339()).ok())
            .map(|d| d.with_timezone(&Utc));

        Ok(ParsedMessage {
            subject: msg.subject().map(str::to_string),
            from: msg.from().and_then(|a| a.first()).map(EmailAddress::from),
            to: address_list(msg.to()),
            cc: address_list(msg.cc()),
            bcc: address_list(msg.bcc()),
            date,
            text: msg.body_text(0).map(|s| s.into_owned()),
            html: msg.body_html(0).map(|s| s.into_owned()),
            attachments: attachments_from_parsed(&msg),
        })
    }
}

fn address_list(addr: Option<&mail_parser::Address<'_>>) -> Vec<EmailAddress> {
    addr.map(|a| a.iter().map(EmailAddress::from).collect())
        .unwrap_or_default()
}

/// Build decoded attachments from a parsed `mail_parser::Message`.
fn attachments_from_parsed(msg: &mail_parser::Message<'_>) -> Vec<Attachment> {
    msg.attachments()
        .enumerate()
        .map(|(idx, part)| {
            let filename = part
                .attachment_name()
                .map(String::from)
                .unwrap_or_else(|| format!("attachment_{idx}"));

            let content_type = part
                .content_type()
                .map(|ct| match ct.subtype() {
                    Some(sub) => format!("{}/{sub}", ct.ctype()),
                    None => ct.ctype().to_string(),
                })
                .unwrap_or_else(|| "application/octet-stream".to_string());

            let is_inline = part
                .content_disposition()
                .map(|d| d.ctype() == "inline")
                .unwrap_or(false);

            Attachment {
                filename,
                content_type,
                content_id: part.content_id().map(String::from),
                is_inline,
                data: part.contents().to_vec(),
            }
        })
        .collect()
}

/// Convert HTML to plain text for previews.
///
/// Drops `<script>`/`<style>` blocks and tags, turns block elements into
/// line breaks and decodes the common entities.
pub fn html_to_text(html: &str) -> String {
    let mut text = remove_tag_block(html, "script");
    text = remove_tag_block(&text, "style");

    for tag in ["<br>", "<br/>", "<br />", "</p>", "</div>", "</tr>", "</li>"] {
        text = text.replace(tag, "\n");
        text = text.replace(&tag.to_uppercase(), "\n");
    }

    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }

    for (entity, replacement) in [
        ("&nbsp;", " "),
        ("&#160;", " "),
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#39;", "'"),
        ("&apos;", "'"),
        ("&amp;", "&"),
    ] {
        result = result.replace(entity, replacement);
    }

    result.trim().to_string()
}

/// Remove an entire tag block (e.g. `<script>…</script>`).
fn remove_tag_block(html: &str, tag: &str) -> String {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut result = String::with_capacity(html.len());
    let mut remaining = html;

    while let Some(start) = remaining.to_ascii_lowercase().find(&open) {
        result.push_str(&remaining[..start]);
        let after = &remaining[start..];
        match after.to_ascii_lowercase().find(&close) {
            Some(end) => remaining = &after[end + close.len()..],
            None => {
                remaining = "";
                break;
            }
        }
    }
    result.push_str(remaining);
    result
}
