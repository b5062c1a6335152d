use std::io;

use grit_types::{ObjectHeader, ObjectId, ObjectType};
use sha1::{Digest, Sha1};

/// Streaming SHA-1 hasher seeded with the framed object header.
///
/// A hasher covers exactly one object: [`finalize`](Self::finalize) consumes
/// it, so digest state can never leak into the next object.
#[derive(Clone)]
pub struct ObjectHasher {
    inner: Sha1,
    fed: u64,
}

impl ObjectHasher {
    /// Create a hasher and immediately feed it `seed`.
    pub fn new(seed: &[u8]) -> Self {
        let mut hasher = Self {
            inner: Sha1::new(),
            fed: 0,
        };
        hasher.update(seed);
        hasher
    }

    /// Create a hasher seeded with the framed bytes of `header`.
    pub fn for_header(header: &ObjectHeader) -> Self {
        Self::new(&header.encode())
    }

    /// Feed more bytes.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
        self.fed += data.len() as u64;
    }

    /// Total bytes fed so far, seed included.
    pub fn bytes_fed(&self) -> u64 {
        self.fed
    }

    /// Digest of everything fed so far, leaving the hasher usable.
    pub fn current(&self) -> ObjectId {
        self.clone().finalize()
    }

    /// Finish hashing and return the object id.
    pub fn finalize(self) -> ObjectId {
        let digest = self.inner.finalize();
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&digest);
        ObjectId::from_hash(hash)
    }
}

impl io::Write for ObjectHasher {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl std::fmt::Debug for ObjectHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectHasher").field("fed", &self.fed).finish()
    }
}

/// Hash a complete in-memory object.
pub fn hash_object(kind: ObjectType, payload: &[u8]) -> ObjectId {
    let mut hasher = ObjectHasher::for_header(&ObjectHeader::new(kind, payload.len() as u64));
    hasher.update(payload);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn hello_blob_matches_git() {
        let id = hash_object(ObjectType::Blob, b"hello\n");
        assert_eq!(id.to_hex(), "ce013625030ba8dba906f756967f9e9ca394464a");
    }

    #[test]
    fn empty_objects_match_git() {
        assert_eq!(
            hash_object(ObjectType::Blob, b"").to_hex(),
            "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391"
        );
        assert_eq!(
            hash_object(ObjectType::Tree, b"").to_hex(),
            "4b825dc642cb6eb9a060e54bf8d69288fbee4904"
        );
    }

    #[test]
    fn type_discrimination() {
        let blob = hash_object(ObjectType::Blob, b"hello\n");
        let tree = hash_object(ObjectType::Tree, b"hello\n");
        assert_ne!(blob, tree);
        assert_eq!(tree.to_hex(), "149e5b19a5281f340f976d2ba38d4f02d8a6e967");
    }

    #[test]
    fn seed_is_part_of_the_digest() {
        let mut seeded = ObjectHasher::new(b"blob 6\0");
        seeded.update(b"hello\n");
        let mut unseeded = ObjectHasher::new(b"");
        unseeded.update(b"blob 6\0hello\n");
        assert_eq!(seeded.finalize(), unseeded.finalize());
    }

    #[test]
    fn current_does_not_consume() {
        let mut hasher = ObjectHasher::new(b"blob 6\0");
        hasher.update(b"hel");
        let partial = hasher.current();
        hasher.update(b"lo\n");
        assert_ne!(partial, hasher.current());
        assert_eq!(hasher.bytes_fed(), 13);
        assert_eq!(
            hasher.finalize().to_hex(),
            "ce013625030ba8dba906f756967f9e9ca394464a"
        );
    }

    #[test]
    fn io_write_feeds_digest() {
        use std::io::Write;

        let mut hasher = ObjectHasher::for_header(&ObjectHeader::new(ObjectType::Blob, 6));
        hasher.write_all(b"hello\n").unwrap();
        assert_eq!(hasher.finalize(), hash_object(ObjectType::Blob, b"hello\n"));
    }

    proptest! {
        #[test]
        fn chunking_does_not_change_digest(data in proptest::collection::vec(any::<u8>(), 0..512), split in 0usize..512) {
            let split = split.min(data.len());
            let mut hasher = ObjectHasher::for_header(&ObjectHeader::new(ObjectType::Blob, data.len() as u64));
            hasher.update(&data[..split]);
            hasher.update(&data[split..]);
            prop_assert_eq!(hasher.finalize(), hash_object(ObjectType::Blob, &data));
        }
    }
}
