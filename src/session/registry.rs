//! Process-wide table of open sessions.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use super::id::SessionId;
use super::{Session, SessionSettings, SessionStats};
use crate::error::{Result, SessionError};
use crate::model::attachment::AttachmentContent;
use crate::model::folder::FolderNode;
use crate::model::mail::{MessageDetail, MessagePage, Summary};
use crate::parser::mime::{MailParserDecoder, MessageDecoder};

/// Owns every open session and dispatches operations by session id.
///
/// Operations on different sessions never contend on anything but the
/// short map lookup; a session's own state is shared through an `Arc`, so
/// closing it while a call is running is safe.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<Session>>>,
    settings: SessionSettings,
    decoder: Arc<dyn MessageDecoder>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(SessionSettings::default())
    }
}

impl SessionRegistry {
    pub fn new(settings: SessionSettings) -> Self {
        Self::with_decoder(settings, Arc::new(MailParserDecoder))
    }

    /// Registry using a custom MIME decoder for every session.
    pub fn with_decoder(settings: SessionSettings, decoder: Arc<dyn MessageDecoder>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            settings,
            decoder,
        }
    }

    /// Open an archive and register a new session for it.
    pub fn open_archive(&self, path: impl AsRef<Path>) -> Result<(SessionId, Vec<FolderNode>)> {
        self.open_archive_with_progress(path, None)
    }

    /// Like [`open_archive`](Self::open_archive), reporting scan progress
    /// as `(bytes_scanned, file_size)`.
    pub fn open_archive_with_progress(
        &self,
        path: impl AsRef<Path>,
        progress: Option<&dyn Fn(u64, u64)>,
    ) -> Result<(SessionId, Vec<FolderNode>)> {
        let session = Session::open(path, self.settings, Arc::clone(&self.decoder), progress)?;
        let id = session.id();
        let folders = session.folders().to_vec();
        self.sessions.write().insert(id, Arc::new(session));
        Ok((id, folders))
    }

    /// Shared handle on a live session.
    pub fn session(&self, id: SessionId) -> Result<Arc<Session>> {
        self.sessions
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| SessionError::InvalidSession(id.to_string()))
    }

    pub fn folders(&self, id: SessionId) -> Result<Vec<FolderNode>> {
        Ok(self.session(id)?.folders().to_vec())
    }

    pub fn list_messages(
        &self,
        id: SessionId,
        folder_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<MessagePage> {
        self.session(id)?.list_messages(folder_id, offset, limit)
    }

    pub fn get_message_detail(&self, id: SessionId, message_id: &str) -> Result<MessageDetail> {
        self.session(id)?.get_message_detail(message_id)
    }

    pub fn get_attachment(
        &self,
        id: SessionId,
        message_id: &str,
        index: usize,
    ) -> Result<AttachmentContent> {
        self.session(id)?.get_attachment(message_id, index)
    }

    pub fn search(&self, id: SessionId, query: &str, max_results: usize) -> Result<Vec<Summary>> {
        Ok(self.session(id)?.search(query, max_results))
    }

    pub fn stats(&self, id: SessionId) -> Result<SessionStats> {
        Ok(self.session(id)?.stats())
    }

    /// Drop a session and everything it cached.
    pub fn close_session(&self, id: SessionId) -> Result<()> {
        match self.sessions.write().remove(&id) {
            Some(session) => {
                info!(session = %id, path = %session.path().display(), "Session closed");
                Ok(())
            }
            None => Err(SessionError::InvalidSession(id.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
