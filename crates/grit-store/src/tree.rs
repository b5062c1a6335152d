use std::cmp::Ordering;
use std::io::{BufRead, BufReader, Read, Write};

use grit_types::{ObjectId, ObjectType};
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, CodecResult};
use crate::object::StoredObject;

/// Longest mode token plus its space (`"100644 "`), with one byte of slack.
const MAX_MODE_TOKEN: u64 = 8;

// ---------------------------------------------------------------------------
// EntryMode
// ---------------------------------------------------------------------------

/// File mode for a tree entry. Always octal on the wire and on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntryMode {
    /// Normal file (0o100644).
    Regular,
    /// Executable file (0o100755).
    Executable,
    /// Symbolic link (0o120000).
    Symlink,
    /// Subtree / directory (0o040000).
    Directory,
    /// Submodule commit reference (0o160000).
    Gitlink,
}

impl EntryMode {
    /// Octal mode value.
    pub fn mode_bits(&self) -> u32 {
        match self {
            Self::Regular => 0o100644,
            Self::Executable => 0o100755,
            Self::Symlink => 0o120000,
            Self::Directory => 0o040000,
            Self::Gitlink => 0o160000,
        }
    }

    /// Parse from an octal mode value.
    pub fn from_mode_bits(bits: u32) -> Option<Self> {
        match bits {
            0o100644 => Some(Self::Regular),
            0o100755 => Some(Self::Executable),
            0o120000 => Some(Self::Symlink),
            0o040000 => Some(Self::Directory),
            0o160000 => Some(Self::Gitlink),
            _ => None,
        }
    }

    /// Parse an octal mode token as it appears in a tree payload.
    pub fn from_octal(token: &[u8]) -> Option<Self> {
        if token.is_empty() || !token.iter().all(|b| (b'0'..=b'7').contains(b)) {
            return None;
        }
        let text = std::str::from_utf8(token).ok()?;
        u32::from_str_radix(text, 8)
            .ok()
            .and_then(Self::from_mode_bits)
    }

    /// The mode as written into tree payloads: octal, no leading zero.
    pub fn payload_form(&self) -> String {
        format!("{:o}", self.mode_bits())
    }

    /// The type of object an entry with this mode references.
    pub fn object_type(&self) -> ObjectType {
        match self {
            Self::Directory => ObjectType::Tree,
            Self::Gitlink => ObjectType::Commit,
            Self::Regular | Self::Executable | Self::Symlink => ObjectType::Blob,
        }
    }

    /// Returns `true` for subtrees.
    pub fn is_tree(&self) -> bool {
        matches!(self, Self::Directory)
    }
}

impl std::fmt::Display for EntryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:06o}", self.mode_bits())
    }
}

// ---------------------------------------------------------------------------
// TreeEntry
// ---------------------------------------------------------------------------

/// A single entry in a tree object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    /// File mode (regular, executable, symlink, directory, gitlink).
    pub mode: EntryMode,
    /// Entry name (filename or directory name).
    pub name: String,
    /// Id of the referenced object.
    pub id: ObjectId,
}

impl TreeEntry {
    /// Create a new tree entry.
    pub fn new(mode: EntryMode, name: impl Into<String>, id: ObjectId) -> Self {
        Self {
            mode,
            name: name.into(),
            id,
        }
    }

    /// Check the name can be stored in a tree payload.
    pub fn validate(&self) -> CodecResult<()> {
        let name = self.name.as_str();
        if name.is_empty() || name == "." || name == ".." || name.contains(['\0', '/']) {
            return Err(CodecError::InvalidEntryName(self.name.clone()));
        }
        Ok(())
    }

    /// Size of this entry's payload record.
    pub fn encoded_len(&self) -> usize {
        self.mode.payload_form().len() + 1 + self.name.len() + 1 + ObjectId::LEN
    }

    /// Write `<octal mode> <name>\0<20 raw id bytes>`.
    pub fn encode_into(&self, out: &mut impl Write) -> CodecResult<()> {
        self.validate()?;
        out.write_all(self.mode.payload_form().as_bytes())?;
        out.write_all(b" ")?;
        out.write_all(self.name.as_bytes())?;
        out.write_all(&[0])?;
        out.write_all(self.id.as_bytes())?;
        Ok(())
    }

    /// Git's canonical tree ordering: names compared byte-wise, with subtree
    /// names compared as if they ended in `/`.
    pub fn git_cmp(&self, other: &Self) -> Ordering {
        let ours = self.name.bytes().chain(self.mode.is_tree().then_some(b'/'));
        let theirs = other.name.bytes().chain(other.mode.is_tree().then_some(b'/'));
        ours.cmp(theirs)
    }
}

impl PartialOrd for TreeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TreeEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.git_cmp(other)
            .then_with(|| self.mode.cmp(&other.mode))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Total payload size of `entries`, needed before the header is written.
pub fn encoded_tree_len(entries: &[TreeEntry]) -> u64 {
    entries.iter().map(|e| e.encoded_len() as u64).sum()
}

/// Encode entries back to back, in the order given.
pub fn encode_entries(entries: &[TreeEntry]) -> CodecResult<Vec<u8>> {
    let mut payload = Vec::with_capacity(encoded_tree_len(entries) as usize);
    for entry in entries {
        entry.encode_into(&mut payload)?;
    }
    Ok(payload)
}

// ---------------------------------------------------------------------------
// TreeEntryReader
// ---------------------------------------------------------------------------

/// Forward-only cursor over a tree payload.
///
/// Yields entries in payload order and `None` at a clean end. After the end
/// or any error it yields `None` for good; re-reading a tree means reopening
/// the object.
pub struct TreeEntryReader<R: Read> {
    inner: BufReader<R>,
    offset: u64,
    entries_read: u64,
    done: bool,
}

impl<R: Read> TreeEntryReader<R> {
    /// Wrap a source positioned at the start of a tree payload.
    pub fn new(source: R) -> Self {
        Self {
            inner: BufReader::new(source),
            offset: 0,
            entries_read: 0,
            done: false,
        }
    }

    /// Payload bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Entries successfully decoded so far.
    pub fn entries_read(&self) -> u64 {
        self.entries_read
    }

    /// Decode the next entry.
    pub fn next_entry(&mut self) -> CodecResult<Option<TreeEntry>> {
        if self.done {
            return Ok(None);
        }
        let result = self.parse_entry();
        match result {
            Ok(Some(_)) => self.entries_read += 1,
            _ => self.done = true,
        }
        result
    }

    fn parse_entry(&mut self) -> CodecResult<Option<TreeEntry>> {
        let start = self.offset;
        if self.inner.fill_buf().map_err(CodecError::from_io)?.is_empty() {
            return Ok(None);
        }

        let mode_token = self.read_delimited(b' ', Some(MAX_MODE_TOKEN), start, "mode")?;
        let mode = EntryMode::from_octal(&mode_token).ok_or_else(|| {
            malformed(
                start,
                format!("invalid mode {:?}", String::from_utf8_lossy(&mode_token)),
            )
        })?;

        let name_token = self.read_delimited(0, None, start, "name")?;
        if name_token.is_empty() {
            return Err(malformed(start, "empty name".to_string()));
        }
        let name = String::from_utf8(name_token)
            .map_err(|_| malformed(start, "name is not valid UTF-8".to_string()))?;

        let mut raw = [0u8; ObjectId::LEN];
        let mut filled = 0;
        while filled < raw.len() {
            let n = self
                .inner
                .read(&mut raw[filled..])
                .map_err(CodecError::from_io)?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        self.offset += filled as u64;
        if filled < raw.len() {
            return Err(malformed(
                start,
                format!("object id for {name:?} has {filled} of {} bytes", raw.len()),
            ));
        }

        Ok(Some(TreeEntry::new(mode, name, ObjectId::from_hash(raw))))
    }

    fn read_delimited(
        &mut self,
        delim: u8,
        limit: Option<u64>,
        start: u64,
        what: &str,
    ) -> CodecResult<Vec<u8>> {
        let mut token = Vec::new();
        let read = match limit {
            Some(limit) => (&mut self.inner).take(limit).read_until(delim, &mut token),
            None => self.inner.read_until(delim, &mut token),
        }
        .map_err(CodecError::from_io)?;
        self.offset += read as u64;

        if token.last() == Some(&delim) {
            token.pop();
            Ok(token)
        } else {
            Err(malformed(start, format!("unterminated {what}")))
        }
    }
}

impl<R: Read> Iterator for TreeEntryReader<R> {
    type Item = CodecResult<TreeEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}

impl<R: Read> std::iter::FusedIterator for TreeEntryReader<R> {}

impl<R: Read> std::fmt::Debug for TreeEntryReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeEntryReader")
            .field("offset", &self.offset)
            .field("entries_read", &self.entries_read)
            .field("done", &self.done)
            .finish()
    }
}

fn malformed(offset: u64, reason: String) -> CodecError {
    CodecError::MalformedTreeEntry { offset, reason }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// Directory listing object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    /// Entries in git's canonical order.
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    /// Create a new tree with the given entries.
    ///
    /// Entries are sorted in git order so the hash matches git's.
    pub fn new(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort();
        Self { entries }
    }

    /// Create an empty tree.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Decode a tree payload, keeping the stored order.
    pub fn decode(payload: &[u8]) -> CodecResult<Self> {
        let entries = TreeEntryReader::new(payload).collect::<CodecResult<Vec<_>>>()?;
        Ok(Self { entries })
    }

    /// Encode the payload.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        encode_entries(&self.entries)
    }

    /// Convert into a `StoredObject` for storage.
    pub fn to_stored_object(&self) -> CodecResult<StoredObject> {
        Ok(StoredObject::new(ObjectType::Tree, self.encode()?))
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the tree has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hello_id() -> ObjectId {
        "ce013625030ba8dba906f756967f9e9ca394464a".parse().unwrap()
    }

    #[test]
    fn entry_mode_bits_roundtrip() {
        for mode in [
            EntryMode::Regular,
            EntryMode::Executable,
            EntryMode::Symlink,
            EntryMode::Directory,
            EntryMode::Gitlink,
        ] {
            assert_eq!(EntryMode::from_mode_bits(mode.mode_bits()), Some(mode));
            assert_eq!(
                EntryMode::from_octal(mode.payload_form().as_bytes()),
                Some(mode)
            );
        }
    }

    #[test]
    fn modes_are_octal_not_decimal() {
        assert_eq!(EntryMode::Directory.payload_form(), "40000");
        assert_eq!(EntryMode::Directory.to_string(), "040000");
        assert_eq!(EntryMode::Regular.payload_form(), "100644");
        assert_eq!(EntryMode::Regular.mode_bits(), 33188);
        // The decimal rendering of 0o100644 is not a mode.
        assert_eq!(EntryMode::from_octal(b"33188"), None);
        assert_eq!(EntryMode::from_octal(b"100648"), None);
        assert_eq!(EntryMode::from_octal(b""), None);
    }

    #[test]
    fn mode_maps_to_object_type() {
        assert_eq!(EntryMode::Directory.object_type(), ObjectType::Tree);
        assert_eq!(EntryMode::Gitlink.object_type(), ObjectType::Commit);
        assert_eq!(EntryMode::Executable.object_type(), ObjectType::Blob);
    }

    #[test]
    fn encodes_single_entry_like_git() {
        let entry = TreeEntry::new(EntryMode::Regular, "hello.txt", hello_id());
        let payload = encode_entries(std::slice::from_ref(&entry)).unwrap();
        assert_eq!(payload.len(), 37);
        assert_eq!(entry.encoded_len(), 37);
        assert!(payload.starts_with(b"100644 hello.txt\0"));
        assert_eq!(&payload[17..], hello_id().as_bytes());

        let tree = Tree::new(vec![entry]);
        assert_eq!(
            tree.to_stored_object().unwrap().compute_id().to_hex(),
            "aaa96ced2d9a1c8e72c56b253a0e2fe78393feb7"
        );
    }

    #[test]
    fn empty_tree_hash() {
        assert_eq!(
            Tree::empty().to_stored_object().unwrap().compute_id().to_hex(),
            "4b825dc642cb6eb9a060e54bf8d69288fbee4904"
        );
    }

    #[test]
    fn git_order_treats_directories_as_slash_suffixed() {
        let tree = Tree::new(vec![
            TreeEntry::new(EntryMode::Regular, "foo.txt", ObjectId::null()),
            TreeEntry::new(EntryMode::Directory, "foo", ObjectId::null()),
            TreeEntry::new(EntryMode::Regular, "foo-bar", ObjectId::null()),
            TreeEntry::new(EntryMode::Regular, "Zeta", ObjectId::null()),
        ]);
        let names: Vec<_> = tree.entries.iter().map(|e| e.name.as_str()).collect();
        // '-' (0x2d) < '.' (0x2e) < '/' (0x2f)
        assert_eq!(names, ["Zeta", "foo-bar", "foo.txt", "foo"]);
    }

    #[test]
    fn encode_entries_keeps_caller_order() {
        let entries = vec![
            TreeEntry::new(EntryMode::Regular, "b", ObjectId::null()),
            TreeEntry::new(EntryMode::Regular, "a", ObjectId::null()),
        ];
        let payload = encode_entries(&entries).unwrap();
        let decoded = Tree::decode(&payload).unwrap();
        assert_eq!(decoded.entries, entries);
    }

    #[test]
    fn invalid_names_are_rejected() {
        for name in ["", ".", "..", "a/b", "nul\0byte"] {
            let entry = TreeEntry::new(EntryMode::Regular, name, ObjectId::null());
            assert!(
                matches!(entry.validate(), Err(CodecError::InvalidEntryName(_))),
                "{name:?}"
            );
            assert!(encode_entries(&[entry]).is_err());
        }
    }

    #[test]
    fn reader_tracks_offset_and_count() {
        let entries = vec![
            TreeEntry::new(EntryMode::Regular, "a", hello_id()),
            TreeEntry::new(EntryMode::Directory, "dir", ObjectId::null()),
        ];
        let payload = encode_entries(&entries).unwrap();
        let mut reader = TreeEntryReader::new(payload.as_slice());

        assert_eq!(reader.next_entry().unwrap(), Some(entries[0].clone()));
        assert_eq!(reader.offset(), entries[0].encoded_len() as u64);
        assert_eq!(reader.next_entry().unwrap(), Some(entries[1].clone()));
        assert_eq!(reader.next_entry().unwrap(), None);
        assert_eq!(reader.next_entry().unwrap(), None);
        assert_eq!(reader.entries_read(), 2);
        assert_eq!(reader.offset(), payload.len() as u64);
    }

    #[test]
    fn truncated_id_is_malformed() {
        let entry = TreeEntry::new(EntryMode::Regular, "a", hello_id());
        let mut payload = encode_entries(&[entry.clone(), entry.clone()]).unwrap();
        payload.truncate(payload.len() - 5);

        let mut reader = TreeEntryReader::new(payload.as_slice());
        assert!(reader.next_entry().unwrap().is_some());
        let err = reader.next_entry().unwrap_err();
        assert!(matches!(
            err,
            CodecError::MalformedTreeEntry { offset, .. } if offset == entry.encoded_len() as u64
        ));
        // Fused after the error.
        assert_eq!(reader.next_entry().unwrap(), None);
        assert!(reader.next().is_none());
    }

    #[test]
    fn malformed_records_are_rejected() {
        let mut no_name_terminator = b"100644 file".to_vec();
        no_name_terminator.extend_from_slice(&[1; 3]);
        let cases: [&[u8]; 6] = [
            b"100644",
            b"1006440000 x\0",
            b"10064x a\0",
            b" a\0",
            b"100644 \0aaaaaaaaaaaaaaaaaaaa",
            &no_name_terminator,
        ];
        for payload in cases {
            let mut reader = TreeEntryReader::new(payload);
            assert!(
                matches!(
                    reader.next_entry(),
                    Err(CodecError::MalformedTreeEntry { offset: 0, .. })
                ),
                "{:?}",
                String::from_utf8_lossy(payload)
            );
        }
    }

    #[test]
    fn non_utf8_name_is_malformed() {
        let mut payload = b"100644 \xff\xfe\0".to_vec();
        payload.extend_from_slice(&[0; 20]);
        assert!(matches!(
            Tree::decode(&payload),
            Err(CodecError::MalformedTreeEntry { .. })
        ));
    }

    #[test]
    fn tree_get_entry() {
        let tree = Tree::new(vec![
            TreeEntry::new(EntryMode::Regular, "a.txt", ObjectId::null()),
            TreeEntry::new(EntryMode::Regular, "b.txt", hello_id()),
        ]);
        assert_eq!(tree.get("b.txt").map(|e| e.id), Some(hello_id()));
        assert!(tree.get("missing").is_none());
        assert_eq!(tree.len(), 2);
        assert!(Tree::empty().is_empty());
    }

    fn entry_strategy() -> impl Strategy<Value = TreeEntry> {
        (
            prop::sample::select(vec![
                EntryMode::Regular,
                EntryMode::Executable,
                EntryMode::Symlink,
                EntryMode::Directory,
                EntryMode::Gitlink,
            ]),
            "[a-zA-Z0-9_.-]{1,16}".prop_filter("reserved name", |n| n != "." && n != ".."),
            any::<[u8; 20]>(),
        )
            .prop_map(|(mode, name, raw)| TreeEntry::new(mode, name, ObjectId::from_hash(raw)))
    }

    proptest! {
        #[test]
        fn codec_reproduces_entries_in_order(entries in prop::collection::vec(entry_strategy(), 0..12)) {
            let payload = encode_entries(&entries).unwrap();
            prop_assert_eq!(payload.len() as u64, encoded_tree_len(&entries));

            let mut reader = TreeEntryReader::new(payload.as_slice());
            let mut decoded = Vec::new();
            while let Some(entry) = reader.next_entry().unwrap() {
                decoded.push(entry);
            }
            prop_assert_eq!(decoded, entries);
        }
    }
}
