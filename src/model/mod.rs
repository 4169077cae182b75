//! Core data model types: index entries, folders, summaries and decoded messages.

pub mod address;
pub mod attachment;
pub mod folder;
pub mod mail;
