//! Content-addressed object storage for grit.
//!
//! This crate implements a git-compatible loose object database. Every object
//! (blob, tree, commit) is framed as `"<type> <size>\0<payload>"`, addressed
//! by the SHA-1 of that framing, and stored zlib-compressed at
//! `objects/<2 hex>/<38 hex>`.
//!
//! # Codecs
//!
//! - [`ObjectWriter`]: streaming encoder (frame, compress, hash)
//! - [`ObjectReader`]: streaming decoder (inflate, parse header, bounded payload)
//! - [`TreeEntryReader`] / [`encode_entries`]: tree payload records
//!
//! # Storage Backends
//!
//! All backends implement the [`ObjectStore`] trait:
//!
//! - [`LooseObjectStore`]: on-disk store with staged, atomically renamed writes
//! - [`InMemoryObjectStore`]: `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written.
//! 2. An object is visible only after its whole payload has been hashed.
//! 3. A declared size is exact: longer or shorter payloads are errors.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod builder;
pub mod config;
pub mod error;
pub mod loose;
pub mod memory;
pub mod object;
pub mod reader;
pub mod traits;
pub mod tree;
pub mod writer;

// Re-export primary types at crate root for ergonomic imports.
pub use builder::{TreeBuilder, WorkingFile};
pub use config::StoreConfig;
pub use error::{CodecError, CodecResult, StoreError, StoreResult};
pub use loose::{LooseObjectStore, StagedObject};
pub use memory::InMemoryObjectStore;
pub use object::StoredObject;
pub use reader::ObjectReader;
pub use traits::ObjectStore;
pub use tree::{encode_entries, encoded_tree_len, EntryMode, Tree, TreeEntry, TreeEntryReader};
pub use writer::{hash_reader, ObjectWriter};
