//! Foundation types for grit.
//!
//! This crate provides the identifier and framing types shared by every other
//! grit crate.
//!
//! # Key Types
//!
//! - [`ObjectId`]: Content address of an object (SHA-1 of its framed bytes)
//! - [`ObjectType`]: Closed set of object types: blob, tree, commit
//! - [`ObjectHeader`]: Type and payload size, framed as `"<type> <size>\0"`

pub mod error;
pub mod kind;
pub mod object;

pub use error::TypeError;
pub use kind::{ObjectHeader, ObjectType};
pub use object::ObjectId;
