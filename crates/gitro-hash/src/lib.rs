//! Object identity for the gitro object database reader.
//!
//! This crate provides the core `ObjectId` type (a 20-byte SHA-1
//! fingerprint), hex encoding/decoding, streaming hash computation, and the
//! fan-out table used by pack indices.

mod error;
pub mod fanout;
pub mod hasher;
pub mod hex;
mod oid;

pub use error::HashError;
pub use fanout::FanoutTable;
pub use oid::ObjectId;
