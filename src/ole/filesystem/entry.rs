use std::collections::BTreeMap;
use std::io::Write;

use super::{FilesystemError, FilesystemResult};
use crate::ole::class_id::ClassId;
use crate::ole::consts::MAX_NAME_LEN;

/// Stream names that identify a container format, with how to describe it.
const FORMAT_MARKERS: &[(&str, &str)] = &[
    ("Workbook", "a spreadsheet"),
    ("Book", "a BIFF5 spreadsheet"),
    ("WordDocument", "a word-processing document"),
    ("PowerPoint Document", "a slide presentation"),
    ("VisioDocument", "a Visio drawing"),
    ("EncryptedPackage", "an encrypted OOXML package"),
];

/// A node of the directory tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Directory(DirectoryNode),
    Document(DocumentNode),
}

impl Entry {
    pub fn is_directory(&self) -> bool {
        matches!(self, Entry::Directory(_))
    }

    pub fn is_document(&self) -> bool {
        matches!(self, Entry::Document(_))
    }

    pub fn as_directory(&self) -> Option<&DirectoryNode> {
        match self {
            Entry::Directory(dir) => Some(dir),
            Entry::Document(_) => None,
        }
    }

    pub fn as_document(&self) -> Option<&DocumentNode> {
        match self {
            Entry::Document(doc) => Some(doc),
            Entry::Directory(_) => None,
        }
    }
}

/// A stream and its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentNode {
    data: Vec<u8>,
}

impl DocumentNode {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Child {
    /// Insertion order among siblings.
    seq: u64,
    entry: Entry,
}

/// A storage: named children plus a class ID.
///
/// Children are kept in a single map keyed by name. Every child carries the
/// sequence number it was inserted with, and enumeration follows that
/// sequence, so a rename keeps the entry's position.
#[derive(Debug, Clone, Default)]
pub struct DirectoryNode {
    class_id: ClassId,
    children: BTreeMap<String, Child>,
    next_seq: u64,
}

impl PartialEq for DirectoryNode {
    fn eq(&self, other: &Self) -> bool {
        self.class_id == other.class_id
            && self.children.len() == other.children.len()
            && self.entries().zip(other.entries()).all(|(a, b)| a == b)
    }
}

/// Check a prospective entry name.
pub(crate) fn validate_name(name: &str) -> FilesystemResult<()> {
    let reason = if name.is_empty() {
        Some("name is empty")
    } else if name.encode_utf16().count() > MAX_NAME_LEN {
        Some("name is longer than 31 characters")
    } else if name.contains(['/', '\\', ':', '!']) {
        Some("name contains one of '/', '\\', ':', '!'")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(FilesystemError::InvalidName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

impl DirectoryNode {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn class_id(&self) -> ClassId {
        self.class_id
    }

    pub fn set_class_id(&mut self, class_id: ClassId) {
        self.class_id = class_id;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn has_entry(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    /// Look up a child by name.
    ///
    /// A miss inside a container that holds another format's main stream
    /// says so in the error.
    pub fn entry(&self, name: &str) -> FilesystemResult<&Entry> {
        match self.children.get(name) {
            Some(child) => Ok(&child.entry),
            None => Err(self.not_found(name)),
        }
    }

    pub fn entry_mut(&mut self, name: &str) -> FilesystemResult<&mut Entry> {
        if !self.children.contains_key(name) {
            return Err(self.not_found(name));
        }
        match self.children.get_mut(name) {
            Some(child) => Ok(&mut child.entry),
            None => Err(FilesystemError::NotFound {
                name: name.to_string(),
                hint: None,
            }),
        }
    }

    pub fn document(&self, name: &str) -> FilesystemResult<&[u8]> {
        match self.entry(name)? {
            Entry::Document(doc) => Ok(doc.data()),
            Entry::Directory(_) => Err(FilesystemError::NotADocument(name.to_string())),
        }
    }

    pub fn directory(&self, name: &str) -> FilesystemResult<&DirectoryNode> {
        match self.entry(name)? {
            Entry::Directory(dir) => Ok(dir),
            Entry::Document(_) => Err(FilesystemError::NotADirectory(name.to_string())),
        }
    }

    pub fn directory_mut(&mut self, name: &str) -> FilesystemResult<&mut DirectoryNode> {
        match self.entry_mut(name)? {
            Entry::Directory(dir) => Ok(dir),
            Entry::Document(_) => Err(FilesystemError::NotADirectory(name.to_string())),
        }
    }

    /// Child names in insertion order.
    pub fn entry_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries().map(|(name, _)| name)
    }

    /// Children in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Entry)> + '_ {
        let mut ordered: Vec<_> = self.children.iter().collect();
        ordered.sort_by_key(|(_, child)| child.seq);
        ordered
            .into_iter()
            .map(|(name, child)| (name.as_str(), &child.entry))
    }

    pub fn create_document(
        &mut self,
        name: &str,
        data: impl Into<Vec<u8>>,
    ) -> FilesystemResult<&mut DocumentNode> {
        self.check_new_name(name)?;
        match self.insert(name.to_string(), Entry::Document(DocumentNode::new(data.into()))) {
            Entry::Document(doc) => Ok(doc),
            Entry::Directory(_) => unreachable!("document was just inserted"),
        }
    }

    /// Create a document whose contents are produced by `fill`.
    ///
    /// Nothing is inserted when `fill` fails.
    pub fn create_document_with<F>(
        &mut self,
        name: &str,
        fill: F,
    ) -> FilesystemResult<&mut DocumentNode>
    where
        F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
    {
        self.check_new_name(name)?;
        let mut buffer = Vec::new();
        fill(&mut buffer)?;
        self.create_document(name, buffer)
    }

    pub fn create_directory(&mut self, name: &str) -> FilesystemResult<&mut DirectoryNode> {
        self.check_new_name(name)?;
        match self.insert(name.to_string(), Entry::Directory(DirectoryNode::new())) {
            Entry::Directory(dir) => Ok(dir),
            Entry::Document(_) => unreachable!("directory was just inserted"),
        }
    }

    /// Remove a document or an empty directory.
    ///
    /// Returns `Ok(false)` and leaves the tree untouched when `name` is a
    /// directory that still has children.
    pub fn delete_entry(&mut self, name: &str) -> FilesystemResult<bool> {
        let removable = match self.entry(name)? {
            Entry::Directory(dir) => dir.is_empty(),
            Entry::Document(_) => true,
        };
        if !removable {
            log::debug!("Refusing to delete non-empty directory '{name}'");
            return Ok(false);
        }
        self.children.remove(name);
        Ok(true)
    }

    pub fn rename_entry(&mut self, old: &str, new: &str) -> FilesystemResult<()> {
        if !self.children.contains_key(old) {
            return Err(self.not_found(old));
        }
        if old == new {
            return Ok(());
        }
        self.check_new_name(new)?;
        if let Some(child) = self.children.remove(old) {
            self.children.insert(new.to_string(), child);
        }
        Ok(())
    }

    /// Insert an entry read from disk, bypassing name validation.
    pub(crate) fn insert_loaded(&mut self, name: String, entry: Entry) -> bool {
        if self.children.contains_key(&name) {
            return false;
        }
        self.insert(name, entry);
        true
    }

    fn insert(&mut self, name: String, entry: Entry) -> &mut Entry {
        let seq = self.next_seq;
        self.next_seq += 1;
        &mut self
            .children
            .entry(name)
            .or_insert(Child { seq, entry })
            .entry
    }

    fn check_new_name(&self, name: &str) -> FilesystemResult<()> {
        validate_name(name)?;
        if self.children.contains_key(name) {
            return Err(FilesystemError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    /// Missing-entry error. When the caller asked for the main stream of
    /// one format and the main stream of another is present, say which.
    fn not_found(&self, name: &str) -> FilesystemError {
        let wants_format = FORMAT_MARKERS.iter().any(|(marker, _)| *marker == name);
        let hint = if wants_format {
            FORMAT_MARKERS
                .iter()
                .find(|(marker, _)| *marker != name && self.children.contains_key(*marker))
                .map(|(_, kind)| *kind)
        } else {
            None
        };
        FilesystemError::NotFound {
            name: name.to_string(),
            hint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_create_and_enumerate_in_insertion_order() {
        let mut root = DirectoryNode::new();
        root.create_document("Zeta", vec![1]).unwrap();
        root.create_directory("Alpha").unwrap();
        root.create_document("Mid", Vec::new()).unwrap();
        let names: Vec<_> = root.entry_names().collect();
        assert_eq!(names, ["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn test_duplicate_and_invalid_names_do_not_mutate() {
        let mut root = DirectoryNode::new();
        root.create_document("Workbook", vec![0]).unwrap();
        assert!(matches!(
            root.create_directory("Workbook"),
            Err(FilesystemError::DuplicateName(_))
        ));
        assert!(matches!(
            root.create_document("a/b", vec![]),
            Err(FilesystemError::InvalidName { .. })
        ));
        assert!(matches!(
            root.create_document(&"x".repeat(32), vec![]),
            Err(FilesystemError::InvalidName { .. })
        ));
        assert_eq!(root.len(), 1);
    }

    #[test]
    fn test_wrong_format_hint() {
        let mut root = DirectoryNode::new();
        root.create_document("Workbook", vec![0]).unwrap();
        let err = root.entry("WordDocument").unwrap_err();
        assert!(matches!(
            err,
            FilesystemError::NotFound {
                hint: Some("a spreadsheet"),
                ..
            }
        ));
        assert!(err.to_string().contains("spreadsheet"));

        let err = DirectoryNode::new().entry("Workbook").unwrap_err();
        assert!(matches!(err, FilesystemError::NotFound { hint: None, .. }));
    }

    #[test]
    fn test_no_hint_for_ordinary_streams() {
        let mut root = DirectoryNode::new();
        root.create_document("Workbook", vec![0]).unwrap();
        let err = root.entry("\u{5}SummaryInformation").unwrap_err();
        assert!(matches!(err, FilesystemError::NotFound { hint: None, .. }));
        assert!(!err.to_string().contains("spreadsheet"));
    }

    #[test]
    fn test_delete_non_empty_directory_is_refused() {
        let mut root = DirectoryNode::new();
        root.create_directory("Objects")
            .unwrap()
            .create_document("Ole", vec![1])
            .unwrap();
        assert!(!root.delete_entry("Objects").unwrap());
        assert!(root.has_entry("Objects"));

        root.directory_mut("Objects").unwrap().delete_entry("Ole").unwrap();
        assert!(root.delete_entry("Objects").unwrap());
        assert!(root.is_empty());
        assert!(root.delete_entry("Objects").is_err());
    }

    #[test]
    fn test_rename_keeps_position() {
        let mut root = DirectoryNode::new();
        root.create_document("A", vec![1]).unwrap();
        root.create_document("B", vec![2]).unwrap();
        root.rename_entry("A", "C").unwrap();
        assert_eq!(root.entry_names().collect::<Vec<_>>(), ["C", "B"]);
        assert_eq!(root.document("C").unwrap(), &[1]);
        assert!(matches!(
            root.rename_entry("C", "B"),
            Err(FilesystemError::DuplicateName(_))
        ));
    }

    #[test]
    fn test_create_document_with_writer() {
        let mut root = DirectoryNode::new();
        root.create_document_with("Data", |w| w.write_all(b"abc"))
            .unwrap();
        assert_eq!(root.document("Data").unwrap(), b"abc");

        let failed = root.create_document_with("Broken", |_| {
            Err(std::io::Error::other("disk full"))
        });
        assert!(failed.is_err());
        assert!(!root.has_entry("Broken"));
    }

    #[derive(Debug, Clone)]
    enum Op {
        CreateDoc(u8),
        CreateDir(u8),
        Delete(u8),
        Rename(u8, u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..6).prop_map(Op::CreateDoc),
            (0u8..6).prop_map(Op::CreateDir),
            (0u8..6).prop_map(Op::Delete),
            (0u8..6, 0u8..6).prop_map(|(a, b)| Op::Rename(a, b)),
        ]
    }

    proptest! {
        #[test]
        fn prop_directory_matches_model(ops in prop::collection::vec(op(), 0..40)) {
            let mut node = DirectoryNode::new();
            // (name, is_directory) in insertion order
            let mut model: Vec<(String, bool)> = Vec::new();
            let name = |i: u8| format!("E{i}");

            for op in ops {
                match op {
                    Op::CreateDoc(i) | Op::CreateDir(i) => {
                        let is_dir = matches!(op, Op::CreateDir(_));
                        let result = if is_dir {
                            node.create_directory(&name(i)).map(|_| ())
                        } else {
                            node.create_document(&name(i), vec![i]).map(|_| ())
                        };
                        let exists = model.iter().any(|(n, _)| *n == name(i));
                        prop_assert_eq!(result.is_ok(), !exists);
                        if !exists {
                            model.push((name(i), is_dir));
                        }
                    },
                    Op::Delete(i) => {
                        let result = node.delete_entry(&name(i));
                        match model.iter().position(|(n, _)| *n == name(i)) {
                            Some(pos) => {
                                // Directories created here are always empty.
                                prop_assert_eq!(result.ok(), Some(true));
                                model.remove(pos);
                            },
                            None => prop_assert!(result.is_err()),
                        }
                    },
                    Op::Rename(a, b) => {
                        let result = node.rename_entry(&name(a), &name(b));
                        let from = model.iter().position(|(n, _)| *n == name(a));
                        let to_exists = model.iter().any(|(n, _)| *n == name(b));
                        match from {
                            None => prop_assert!(result.is_err()),
                            Some(_) if a == b => prop_assert!(result.is_ok()),
                            Some(_) if to_exists => prop_assert!(result.is_err()),
                            Some(pos) => {
                                prop_assert!(result.is_ok());
                                model[pos].0 = name(b);
                            },
                        }
                    },
                }
                let names: Vec<_> = node.entry_names().map(str::to_string).collect();
                let expected: Vec<_> = model.iter().map(|(n, _)| n.clone()).collect();
                prop_assert_eq!(names, expected);
                for (n, is_dir) in &model {
                    prop_assert_eq!(node.entry(n).unwrap().is_directory(), *is_dir);
                }
            }
        }
    }
}
