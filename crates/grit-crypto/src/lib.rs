//! Object hashing for grit.
//!
//! Objects are addressed by the SHA-1 of their framed representation
//! (`"<type> <size>\0<payload>"`). Hashing the header along with the payload
//! keeps a blob and a tree with identical payload bytes apart.
//!
//! Digests come from the `sha1` crate; nothing here implements SHA-1 itself.

pub mod hasher;

pub use hasher::{hash_object, ObjectHasher};
