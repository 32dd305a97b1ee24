//! Directory stream construction.
//!
//! Siblings are sorted with the comparator Office uses (shorter names
//! first, then case-insensitive, `__` names late and `_VBA_PROJECT` last).
//! The middle sibling becomes the parent's child and each half is linked
//! the same way below it, so the tree stays balanced.

use std::cmp::Ordering;

use bytes::BufMut;

use crate::ole::class_id::ClassId;
use crate::ole::consts::*;

#[derive(Debug, Clone)]
pub(super) struct DirectoryEntryBuilder {
    pub name: String,
    pub entry_type: u8,
    pub start_sector: u32,
    pub size: u64,
    pub sid_left: u32,
    pub sid_right: u32,
    pub sid_child: u32,
    pub class_id: ClassId,
}

impl DirectoryEntryBuilder {
    fn new(name: &str, entry_type: u8) -> Self {
        Self {
            name: name.to_string(),
            entry_type,
            start_sector: ENDOFCHAIN,
            size: 0,
            sid_left: NOSTREAM,
            sid_right: NOSTREAM,
            sid_child: NOSTREAM,
            class_id: ClassId::NULL,
        }
    }

    pub fn root(class_id: ClassId) -> Self {
        Self {
            class_id,
            ..Self::new("Root Entry", STGTY_ROOT)
        }
    }

    pub fn storage(name: &str, class_id: ClassId) -> Self {
        Self {
            start_sector: 0,
            class_id,
            ..Self::new(name, STGTY_STORAGE)
        }
    }

    pub fn stream(name: &str, size: usize) -> Self {
        Self {
            size: size as u64,
            ..Self::new(name, STGTY_STREAM)
        }
    }

    /// The 128-byte on-disk form.
    pub fn write(&self, out: &mut Vec<u8>) {
        let units: Vec<u16> = self.name.encode_utf16().take(MAX_NAME_LEN).collect();
        for &unit in &units {
            out.put_u16_le(unit);
        }
        out.put_bytes(0, 64 - units.len() * 2);
        out.put_u16_le(((units.len() + 1) * 2) as u16);
        out.put_u8(self.entry_type);
        out.put_u8(1); // black
        out.put_u32_le(self.sid_left);
        out.put_u32_le(self.sid_right);
        out.put_u32_le(self.sid_child);
        out.put_slice(self.class_id.as_bytes());
        out.put_u32_le(0); // state bits
        out.put_u64_le(0); // creation time
        out.put_u64_le(0); // modification time
        out.put_u32_le(self.start_sector);
        out.put_u64_le(self.size);
    }
}

/// Flat list of entries, indexed by SID, plus each storage's children.
#[derive(Debug)]
pub(super) struct DirectoryBuilder {
    entries: Vec<DirectoryEntryBuilder>,
    children: Vec<Vec<u32>>,
}

impl DirectoryBuilder {
    pub fn new(root_class_id: ClassId) -> Self {
        Self {
            entries: vec![DirectoryEntryBuilder::root(root_class_id)],
            children: vec![Vec::new()],
        }
    }

    /// Register `entry` under the storage `parent`, returning its SID.
    pub fn add(&mut self, parent: u32, entry: DirectoryEntryBuilder) -> u32 {
        let sid = self.entries.len() as u32;
        self.entries.push(entry);
        self.children.push(Vec::new());
        self.children[parent as usize].push(sid);
        sid
    }

    pub fn entry_mut(&mut self, sid: u32) -> &mut DirectoryEntryBuilder {
        &mut self.entries[sid as usize]
    }

    #[inline]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Link every storage's children and serialize all entries in SID order.
    pub fn generate_directory_stream(&mut self) -> Vec<u8> {
        for parent in 0..self.entries.len() {
            let children = std::mem::take(&mut self.children[parent]);
            self.link_children(parent, &children);
            self.children[parent] = children;
        }
        let mut out = Vec::with_capacity(self.entries.len() * DIRENTRY_SIZE);
        for entry in &self.entries {
            entry.write(&mut out);
        }
        out
    }

    fn link_children(&mut self, parent: usize, children: &[u32]) {
        if children.is_empty() {
            self.entries[parent].sid_child = NOSTREAM;
            return;
        }
        let mut sorted = children.to_vec();
        sorted.sort_by(|&a, &b| {
            compare_names(&self.entries[a as usize].name, &self.entries[b as usize].name)
        });

        self.entries[parent].sid_child = self.link_range(&sorted);
    }

    /// Link `sorted` as a balanced subtree and return the SID of its root.
    fn link_range(&mut self, sorted: &[u32]) -> u32 {
        if sorted.is_empty() {
            return NOSTREAM;
        }
        let mid = sorted.len() / 2;
        let left = self.link_range(&sorted[..mid]);
        let right = self.link_range(&sorted[mid + 1..]);
        let entry = &mut self.entries[sorted[mid] as usize];
        entry.sid_left = left;
        entry.sid_right = right;
        sorted[mid]
    }
}

fn compare_names(a: &str, b: &str) -> Ordering {
    let len_a = a.encode_utf16().count();
    let len_b = b.encode_utf16().count();
    if len_a != len_b {
        return len_a.cmp(&len_b);
    }
    match (a, b) {
        ("_VBA_PROJECT", _) => Ordering::Greater,
        (_, "_VBA_PROJECT") => Ordering::Less,
        _ => match (a.starts_with("__"), b.starts_with("__")) {
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            _ => a.to_uppercase().cmp(&b.to_uppercase()),
        },
    }
}
