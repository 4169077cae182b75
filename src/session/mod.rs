//! Sessions: one opened archive with its index, folders and lazy caches.
//!
//! A session is built in one go by [`Session::open`] and is read-only from
//! then on, except for its caches. Summaries are parsed on demand, in folder
//! order, and never evicted; decoded messages live in a bounded
//! [`DetailCache`].

pub mod cache;
pub mod id;
pub mod registry;
pub mod search;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Result, SessionError};
use crate::folder::tree::{synthesize, FolderLayout};
use crate::index::builder::{build_index, IndexOptions};
use crate::model::attachment::AttachmentContent;
use crate::model::folder::FolderNode;
use crate::model::mail::{MessageDetail, MessageIndexEntry, MessagePage, ParsedMessage, Summary};
use crate::parser::mime::{html_to_text, MessageDecoder};
use crate::parser::summary::{extract_summary, make_preview, HeaderSummary, NO_SUBJECT};
use crate::store::reader::ArchiveReader;

use self::cache::DetailCache;
use self::id::{message_id, parse_message_id, SessionId};

pub use self::registry::SessionRegistry;

/// Gmail label marking a message as unread.
const UNREAD_LABEL: &str = "Unread";

/// Per-session tuning, usually derived from the configuration file.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    /// Index construction options.
    pub index: IndexOptions,
    /// Bytes of each message read to build its summary.
    pub header_prefix_len: u64,
    /// Maximum preview length in characters.
    pub preview_len: usize,
    /// Maximum number of decoded messages kept in memory.
    pub detail_cache_size: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            index: IndexOptions::default(),
            header_prefix_len: 16 * 1024,
            preview_len: crate::parser::summary::DEFAULT_PREVIEW_LEN,
            detail_cache_size: cache::DEFAULT_DETAIL_CACHE_SIZE,
        }
    }
}

/// Counters describing how much work a session has done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub messages: usize,
    pub summaries_cached: usize,
    pub summaries_parsed: u64,
    pub details_cached: usize,
    pub details_parsed: u64,
}

/// Live state of one opened archive.
pub struct Session {
    id: SessionId,
    path: PathBuf,
    reader: ArchiveReader,
    index: Vec<MessageIndexEntry>,
    layout: FolderLayout,
    /// Write-once per ordinal; stamped with the folder it was first listed in.
    summaries: RwLock<BTreeMap<usize, Summary>>,
    /// How far each folder has been paginated.
    loaded: Mutex<HashMap<String, usize>>,
    details: Mutex<DetailCache>,
    decoder: Arc<dyn MessageDecoder>,
    settings: SessionSettings,
    summaries_parsed: AtomicU64,
    details_parsed: AtomicU64,
}

impl Session {
    /// Index an archive and synthesize its folders.
    ///
    /// Any failure aborts the open; no partially built session exists.
    pub fn open(
        path: impl AsRef<Path>,
        settings: SessionSettings,
        decoder: Arc<dyn MessageDecoder>,
        progress: Option<&dyn Fn(u64, u64)>,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let index =
            build_index(&path, &settings.index, progress).map_err(SessionError::during_open)?;
        let reader = ArchiveReader::open(&path)?;
        let layout = synthesize(&index, &path);
        let id = SessionId::new();

        info!(
            session = %id,
            path = %path.display(),
            messages = index.len(),
            folders = layout.members.len(),
            "Session opened"
        );

        Ok(Self {
            id,
            path,
            reader,
            index,
            layout,
            summaries: RwLock::new(BTreeMap::new()),
            loaded: Mutex::new(HashMap::new()),
            details: Mutex::new(DetailCache::new(settings.detail_cache_size)),
            decoder,
            settings,
            summaries_parsed: AtomicU64::new(0),
            details_parsed: AtomicU64::new(0),
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The immutable message index.
    pub fn index(&self) -> &[MessageIndexEntry] {
        &self.index
    }

    /// Top-level folders in display order.
    pub fn folders(&self) -> &[FolderNode] {
        &self.layout.tree
    }

    pub fn layout(&self) -> &FolderLayout {
        &self.layout
    }

    /// One page of a folder.
    ///
    /// Summaries are parsed sequentially up to `offset + limit` and cached;
    /// ordinals already cached (from any folder) are not parsed again. An
    /// unknown folder yields an empty page with total 0.
    pub fn list_messages(&self, folder_id: &str, offset: usize, limit: usize) -> Result<MessagePage> {
        let Some(ordinals) = self.layout.ordinals(folder_id) else {
            debug!(session = %self.id, folder = folder_id, "Unknown folder");
            return Ok(MessagePage::default());
        };

        let total = ordinals.len();
        let end = offset.saturating_add(limit).min(total);
        let start = offset.min(end);
        self.ensure_loaded(folder_id, ordinals, end)?;

        let summaries = self.summaries.read();
        let messages = ordinals[start..end]
            .iter()
            .filter_map(|&ordinal| {
                summaries
                    .get(&ordinal)
                    .map(|s| restamp(s, folder_id, ordinal))
            })
            .collect();

        Ok(MessagePage { messages, total })
    }

    /// Full detail of a message, decoding it if it is not cached.
    pub fn get_message_detail(&self, message_id: &str) -> Result<MessageDetail> {
        let (folder_id, ordinal) = self.resolve(message_id)?;
        let parsed = self.parsed_message(message_id, ordinal)?;
        Ok(self.compose_detail(folder_id, ordinal, &parsed))
    }

    /// Payload and metadata of one attachment.
    pub fn get_attachment(&self, message_id: &str, index: usize) -> Result<AttachmentContent> {
        let (_, ordinal) = self.resolve(message_id)?;
        let parsed = self.parsed_message(message_id, ordinal)?;
        let attachment =
            parsed
                .attachments
                .get(index)
                .ok_or_else(|| SessionError::AttachmentNotFound {
                    message_id: message_id.to_string(),
                    index,
                })?;
        Ok(AttachmentContent {
            info: attachment.info(index),
            data: attachment.data.clone(),
        })
    }

    /// Keyword search over summaries loaded so far, in ordinal order.
    pub fn search(&self, query: &str, max_results: usize) -> Vec<Summary> {
        let summaries = self.summaries.read();
        search::search_summaries(summaries.values(), query, max_results)
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            messages: self.index.len(),
            summaries_cached: self.summaries.read().len(),
            summaries_parsed: self.summaries_parsed.load(Ordering::Relaxed),
            details_cached: self.details.lock().len(),
            details_parsed: self.details_parsed.load(Ordering::Relaxed),
        }
    }

    /// Parse every missing summary among `ordinals[..end]`.
    fn ensure_loaded(&self, folder_id: &str, ordinals: &[usize], end: usize) -> Result<()> {
        let loaded = self.loaded.lock().get(folder_id).copied().unwrap_or(0);
        if loaded >= end {
            return Ok(());
        }

        for &ordinal in &ordinals[loaded..end] {
            if self.summaries.read().contains_key(&ordinal) {
                continue;
            }
            let summary = self.load_summary(folder_id, ordinal)?;
            self.summaries.write().entry(ordinal).or_insert(summary);
        }

        let mut counters = self.loaded.lock();
        let counter = counters.entry(folder_id.to_string()).or_insert(0);
        *counter = (*counter).max(end);
        Ok(())
    }

    /// Read a message prefix and turn it into a summary.
    fn load_summary(&self, folder_id: &str, ordinal: usize) -> Result<Summary> {
        let entry = &self.index[ordinal];
        let prefix = self
            .reader
            .read_message_prefix(entry, self.settings.header_prefix_len)?;
        let header = extract_summary(&prefix, self.decoder.as_ref(), self.settings.preview_len);
        self.summaries_parsed.fetch_add(1, Ordering::Relaxed);

        Ok(build_summary(folder_id, ordinal, entry, header))
    }

    /// Decode a message id and check that it names a listed message.
    fn resolve<'a>(&self, message_id: &'a str) -> Result<(&'a str, usize)> {
        let (folder_id, ordinal) = parse_message_id(message_id)?;
        if ordinal >= self.index.len() || !self.layout.contains(folder_id, ordinal) {
            return Err(SessionError::MessageNotFound(message_id.to_string()));
        }
        Ok((folder_id, ordinal))
    }

    /// Cached decoded message, or decode the full byte range now.
    ///
    /// The cache lock is not held while decoding; two callers racing on the
    /// same ordinal may both decode it, and the later insert wins.
    fn parsed_message(&self, message_id: &str, ordinal: usize) -> Result<Arc<ParsedMessage>> {
        if let Some(parsed) = self.details.lock().get(ordinal) {
            return Ok(parsed);
        }

        let raw = self.reader.read_message(&self.index[ordinal])?;
        let parsed = self.decoder.decode(&raw).map_err(|e| {
            warn!(session = %self.id, message = message_id, error = %e, "Decode failed");
            match e {
                SessionError::DecodeFailure(reason) => {
                    SessionError::DecodeFailure(format!("{message_id}: {reason}"))
                }
                other => other,
            }
        })?;
        self.details_parsed.fetch_add(1, Ordering::Relaxed);

        let parsed = Arc::new(parsed);
        if let Some(evicted) = self.details.lock().insert(ordinal, Arc::clone(&parsed)) {
            debug!(session = %self.id, evicted, "Detail cache full, evicted oldest");
        }
        Ok(parsed)
    }

    fn compose_detail(&self, folder_id: &str, ordinal: usize, parsed: &ParsedMessage) -> MessageDetail {
        let entry = &self.index[ordinal];
        let cached = self.summaries.read().get(&ordinal).cloned();

        let from = parsed.from.clone().unwrap_or_default();
        let body = parsed
            .text
            .clone()
            .or_else(|| parsed.html.as_deref().map(html_to_text))
            .unwrap_or_default();
        let subject = parsed
            .subject
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(NO_SUBJECT)
            .to_string();

        MessageDetail {
            id: message_id(folder_id, ordinal),
            folder_id: folder_id.to_string(),
            subject,
            sender_name: from.name,
            sender_email: from.email,
            received_date: parsed.date,
            is_read: cached
                .as_ref()
                .map_or_else(|| read_state(entry, None), |s| s.is_read),
            has_attachments: !parsed.attachments.is_empty(),
            preview: make_preview(&body, self.settings.preview_len),
            to: parsed.to.clone(),
            cc: parsed.cc.clone(),
            bcc: parsed.bcc.clone(),
            text: parsed.text.clone(),
            html: parsed.html.clone(),
            attachments: parsed
                .attachments
                .iter()
                .enumerate()
                .map(|(i, a)| a.info(i))
                .collect(),
        }
    }
}

fn build_summary(
    folder_id: &str,
    ordinal: usize,
    entry: &MessageIndexEntry,
    header: HeaderSummary,
) -> Summary {
    Summary {
        id: message_id(folder_id, ordinal),
        folder_id: folder_id.to_string(),
        is_read: read_state(entry, header.seen),
        subject: header.subject,
        sender_name: header.sender_name,
        sender_email: header.sender_email,
        received_date: header.date,
        has_attachments: header.has_attachments,
        preview: header.preview,
    }
}

/// Read state: Gmail's `Unread` label when the archive is labeled, else the
/// `Status:` header, else read.
fn read_state(entry: &MessageIndexEntry, seen: Option<bool>) -> bool {
    if !entry.labels.is_empty() {
        return !entry.labels.iter().any(|l| l == UNREAD_LABEL);
    }
    seen.unwrap_or(true)
}

/// A cached summary as seen from `folder_id`.
fn restamp(summary: &Summary, folder_id: &str, ordinal: usize) -> Summary {
    let mut summary = summary.clone();
    if summary.folder_id != folder_id {
        summary.folder_id = folder_id.to_string();
        summary.id = message_id(folder_id, ordinal);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(labels: &[&str]) -> MessageIndexEntry {
        MessageIndexEntry {
            offset: 0,
            length: 1,
            labels: labels.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_read_state() {
        assert!(read_state(&entry(&["Inbox", "Opened"]), Some(false)));
        assert!(!read_state(&entry(&["Inbox", "Unread"]), Some(true)));
        assert!(!read_state(&entry(&[]), Some(false)));
        assert!(read_state(&entry(&[]), None));
    }

    #[test]
    fn test_restamp_changes_folder() {
        let header = HeaderSummary::default();
        let s = build_summary("Inbox", 4, &entry(&["Inbox"]), header);
        let again = restamp(&s, "All Mail", 4);
        assert_eq!(again.id, "All Mail::4");
        assert_eq!(again.folder_id, "All Mail");
        assert_eq!(restamp(&s, "Inbox", 4), s);
    }
}
