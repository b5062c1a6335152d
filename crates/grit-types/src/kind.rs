use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The type of a stored object.
///
/// The set is closed: an unrecognized type name is always an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    /// Raw content (file contents, arbitrary data).
    Blob,
    /// Directory listing: entries mapping names to object references.
    Tree,
    /// Commit. Accepted as a type tag; its payload is not interpreted.
    Commit,
}

impl ObjectType {
    /// All object types, in tag order.
    pub const ALL: [ObjectType; 3] = [Self::Blob, Self::Tree, Self::Commit];

    /// The name used in framed headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
        }
    }

    /// Parse a header type token.
    pub fn from_name(name: &[u8]) -> Result<Self, TypeError> {
        match name {
            b"blob" => Ok(Self::Blob),
            b"tree" => Ok(Self::Tree),
            b"commit" => Ok(Self::Commit),
            other => Err(TypeError::UnknownObjectType(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s.as_bytes())
    }
}

/// Type and exact payload length of an object.
///
/// Framed on disk (before compression) and fed to the hasher as
/// `"<type> <decimal size>\0"`, immediately followed by the payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectHeader {
    pub kind: ObjectType,
    pub size: u64,
}

impl ObjectHeader {
    pub fn new(kind: ObjectType, size: u64) -> Self {
        Self { kind, size }
    }

    /// The framed header bytes, including the trailing NUL.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.extend_from_slice(self.kind.as_str().as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.size.to_string().as_bytes());
        buf.push(0);
        buf
    }

    /// Length of [`encode`](Self::encode)'s output.
    pub fn encoded_len(&self) -> usize {
        self.kind.as_str().len() + 1 + decimal_width(self.size) + 1
    }
}

fn decimal_width(mut n: u64) -> usize {
    let mut width = 1;
    while n >= 10 {
        n /= 10;
        width += 1;
    }
    width
}
