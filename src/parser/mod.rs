//! Email parsing: boundary scanning, label and header extraction, MIME decoding.

pub mod header;
pub mod labels;
pub mod mbox;
pub mod mime;
pub mod summary;
