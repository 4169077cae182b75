//! Folder hierarchy derived from message labels.

pub mod tree;
