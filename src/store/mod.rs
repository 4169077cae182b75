//! Archive access by byte range.

pub mod reader;
