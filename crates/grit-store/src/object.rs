use grit_crypto::hash_object;
use grit_types::{ObjectHeader, ObjectId, ObjectType};

/// A stored object: type tag + payload + cached size.
///
/// The store never interprets the payload beyond tree decoding on request;
/// the id depends only on the framed bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// The type of this object.
    pub kind: ObjectType,
    /// The uncompressed payload.
    pub data: Vec<u8>,
    /// The size of `data` in bytes.
    pub size: u64,
}

impl StoredObject {
    /// Create a new stored object from kind and data.
    pub fn new(kind: ObjectType, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self { kind, data, size }
    }

    /// Blob convenience constructor.
    pub fn blob(data: impl Into<Vec<u8>>) -> Self {
        Self::new(ObjectType::Blob, data.into())
    }

    /// The framing header for this object.
    pub fn header(&self) -> ObjectHeader {
        ObjectHeader::new(self.kind, self.size)
    }

    /// Compute the content-addressed ID for this object.
    pub fn compute_id(&self) -> ObjectId {
        hash_object(self.kind, &self.data)
    }
}
