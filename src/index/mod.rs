//! Message index construction.

pub mod builder;
