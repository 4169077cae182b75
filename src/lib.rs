//! `mboxsession`: session-based random access to large mbox archives.
//!
//! An archive is indexed once on open (envelope boundaries plus Gmail
//! labels), its labels are synthesized into a folder tree, and message
//! summaries and bodies are then parsed lazily from byte ranges.

pub mod config;
pub mod error;
pub mod folder;
pub mod index;
pub mod model;
pub mod parser;
pub mod session;
pub mod store;

pub use error::{ErrorKind, Result, SessionError};
pub use session::id::SessionId;
pub use session::{Session, SessionRegistry, SessionSettings, SessionStats};
