use std::collections::HashMap;
use std::io::Read;
use std::sync::{PoisonError, RwLock};

use grit_types::{ObjectId, ObjectType};

use crate::error::{CodecError, StoreResult};
use crate::object::StoredObject;
use crate::traits::ObjectStore;

/// In-memory, HashMap-based object store.
///
/// Intended for tests and embedding. Ids are the same framed SHA-1 the
/// loose store computes, so the two are interchangeable behind
/// [`ObjectStore`].
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<ObjectId, StoredObject>>,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return a sorted list of all object IDs in the store.
    pub fn all_ids(&self) -> Vec<ObjectId> {
        let map = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<ObjectId> = map.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn write_stream(
        &self,
        kind: ObjectType,
        size: u64,
        source: &mut dyn Read,
    ) -> StoreResult<ObjectId> {
        let mut data = Vec::new();
        source.take(size.saturating_add(1)).read_to_end(&mut data)?;
        let actual = data.len() as u64;
        if actual > size {
            return Err(CodecError::Overflow {
                declared: size,
                attempted: actual,
            }
            .into());
        }
        if actual < size {
            return Err(CodecError::SizeMismatch {
                declared: size,
                actual,
            }
            .into());
        }

        let object = StoredObject::new(kind, data);
        let id = object.compute_id();
        let mut map = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        map.entry(id).or_insert(object);
        Ok(id)
    }

    fn read(&self, id: &ObjectId) -> StoreResult<Option<StoredObject>> {
        let map = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        Ok(map.get(id).cloned())
    }

    fn exists(&self, id: &ObjectId) -> StoreResult<bool> {
        let map = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        Ok(map.contains_key(id))
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &self.len())
            .finish()
    }
}
