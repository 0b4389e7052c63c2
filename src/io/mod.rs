//! Byte-level input plumbing.

pub mod compression;
