use std::io::Read;

use grit_types::{ObjectId, ObjectType};

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;
use crate::tree::Tree;

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written. The same framed bytes always
///   produce the same ID, so rewriting an object changes nothing.
/// - An object becomes visible only once its full payload has been hashed.
/// - The store only interprets payloads when asked to decode a tree.
/// - All I/O errors are propagated, never silently ignored.
pub trait ObjectStore: Send + Sync {
    /// Stream exactly `size` payload bytes from `source` into a new object.
    ///
    /// A source shorter or longer than `size` fails and stores nothing.
    fn write_stream(&self, kind: ObjectType, size: u64, source: &mut dyn Read)
        -> StoreResult<ObjectId>;

    /// Read an object by its content-addressed ID.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    /// Returns `Err` on I/O failure or data corruption.
    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>>;

    /// Check whether an object exists in the store.
    fn exists(&self, id: &ObjectId) -> StoreResult<bool>;

    /// Write an in-memory object and return its ID.
    fn write(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        self.write_stream(object.kind, object.size, &mut object.data.as_slice())
    }

    /// Encode and write a tree.
    fn write_tree(&self, tree: &Tree) -> StoreResult<ObjectId> {
        self.write(&tree.to_stored_object()?)
    }

    /// Read and decode a tree.
    ///
    /// Fails with `NotFound` if absent and `UnexpectedType` if `id` names
    /// something other than a tree.
    fn read_tree(&self, id: &ObjectId) -> StoreResult<Tree> {
        let object = self.read(id)?.ok_or(StoreError::NotFound(*id))?;
        if object.kind != ObjectType::Tree {
            return Err(StoreError::UnexpectedType {
                id: *id,
                expected: ObjectType::Tree,
                actual: object.kind,
            });
        }
        Tree::decode(&object.data).map_err(|e| StoreError::from(e).for_object(id))
    }
}
