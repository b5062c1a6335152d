use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Content-addressed identifier for any stored object.
///
/// An `ObjectId` is the SHA-1 of an object's framed bytes
/// (`"<type> <size>\0<payload>"`). Identical framed content always produces
/// the same `ObjectId`, which is the only key the store uses.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId([u8; 20]);

impl ObjectId {
    /// Length of the raw digest in bytes.
    pub const LEN: usize = 20;

    /// Length of the canonical hex rendering.
    pub const HEX_LEN: usize = 40;

    /// Create an `ObjectId` from a pre-computed digest.
    pub const fn from_hash(hash: [u8; 20]) -> Self {
        Self(hash)
    }

    /// Create an `ObjectId` from a raw byte slice (as found in tree payloads).
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        let arr: [u8; 20] = bytes.try_into().map_err(|_| TypeError::InvalidLength {
            expected: Self::LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// The null object ID (all zeros). Never names a real object.
    pub const fn null() -> Self {
        Self([0u8; 20])
    }

    /// Returns `true` if this is the null object ID.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// The raw 20-byte digest.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Lowercase hex representation (40 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 7 characters, as git abbreviates).
    pub fn short_hex(&self) -> String {
        let mut hex = hex::encode(&self.0[..4]);
        hex.truncate(7);
        hex
    }

    /// Parse from a 40-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        if s.len() != Self::HEX_LEN {
            return Err(TypeError::InvalidLength {
                expected: Self::HEX_LEN,
                actual: s.len(),
            });
        }
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Split the hex form into the fan-out directory and the file name
    /// (`"ce"`, `"013625…"`).
    pub fn fanout(&self) -> (String, String) {
        let mut hex = self.to_hex();
        let rest = hex.split_off(2);
        (hex, rest)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 20]> for ObjectId {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl From<ObjectId> for [u8; 20] {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const HELLO: &str = "ce013625030ba8dba906f756967f9e9ca394464a";

    #[test]
    fn null_is_all_zeros() {
        let null = ObjectId::null();
        assert!(null.is_null());
        assert_eq!(null.as_bytes(), &[0u8; 20]);
        assert_eq!(null.to_hex(), "0".repeat(40));
    }

    #[test]
    fn parses_known_hex() {
        let id = ObjectId::from_hex(HELLO).unwrap();
        assert_eq!(id.as_bytes()[0], 0xce);
        assert_eq!(id.as_bytes()[19], 0x4a);
        assert_eq!(id.to_string(), HELLO);
    }

    #[test]
    fn uppercase_input_renders_lowercase() {
        let id = ObjectId::from_hex(&HELLO.to_uppercase()).unwrap();
        assert_eq!(id.to_hex(), HELLO);
    }

    #[test]
    fn wrong_length_is_rejected() {
        // 39 characters: one short of a full id.
        let err = ObjectId::from_hex(&HELLO[..39]).unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 40,
                actual: 39
            }
        );
        assert!(ObjectId::from_hex("").is_err());
    }

    #[test]
    fn non_hex_is_rejected() {
        let err = ObjectId::from_hex(&"g".repeat(40)).unwrap_err();
        assert!(matches!(err, TypeError::InvalidHex(_)));
    }

    #[test]
    fn from_slice_checks_length() {
        assert!(ObjectId::from_slice(&[1u8; 20]).is_ok());
        let err = ObjectId::from_slice(&[1u8; 19]).unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 20,
                actual: 19
            }
        );
    }

    #[test]
    fn fanout_splits_after_two_chars() {
        let id: ObjectId = HELLO.parse().unwrap();
        let (dir, file) = id.fanout();
        assert_eq!(dir, "ce");
        assert_eq!(file, "013625030ba8dba906f756967f9e9ca394464a");
    }

    #[test]
    fn short_hex_is_7_chars() {
        let id: ObjectId = HELLO.parse().unwrap();
        assert_eq!(id.short_hex(), "ce01362");
        assert_eq!(format!("{id:?}"), "ObjectId(ce01362)");
    }

    #[test]
    fn serde_roundtrip() {
        let id: ObjectId = HELLO.parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        let parsed: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn ordering_is_consistent() {
        let id1 = ObjectId::from_hash([0; 20]);
        let id2 = ObjectId::from_hash([1; 20]);
        assert!(id1 < id2);
    }

    proptest! {
        #[test]
        fn hex_roundtrip(bytes in any::<[u8; 20]>()) {
            let id = ObjectId::from_hash(bytes);
            let hex = id.to_hex();
            prop_assert_eq!(hex.len(), 40);
            prop_assert!(hex.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
            prop_assert_eq!(ObjectId::from_hex(&hex).unwrap(), id);
        }
    }
}
