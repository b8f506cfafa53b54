//! Managed strings and the budgeted heap of the hosted runtime.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

/// Bytes charged per list slot
pub const LIST_SLOT_BYTES: u64 = 8;

/// Bytes charged per string on top of its payload
pub const STRING_HEADER_BYTES: u64 = 16;

/// Immutable byte string owned by the managed runtime
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ManagedString(Arc<[u8]>);

impl ManagedString {
    pub(crate) fn from_bytes(bytes: &[u8]) -> Self {
        Self(Arc::from(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl fmt::Debug for ManagedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string_lossy())
    }
}

/// Fixed-length, ordered list of managed strings.
///
/// Slots are filled once by the runtime while marshalling; there is no
/// public way to change a list afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ManagedStringList {
    items: Box<[ManagedString]>,
}

impl ManagedStringList {
    pub(crate) fn with_len(len: usize) -> Self {
        Self {
            items: vec![ManagedString::default(); len].into_boxed_slice(),
        }
    }

    pub(crate) fn store(&mut self, index: usize, item: ManagedString) {
        self.items[index] = item;
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ManagedString> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ManagedString> {
        self.items.iter()
    }
}

impl<'a> IntoIterator for &'a ManagedStringList {
    type Item = &'a ManagedString;
    type IntoIter = std::slice::Iter<'a, ManagedString>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Allocation accounting reported by the shutdown dumps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
    pub strings: u64,
    pub lists: u64,
    pub bytes_allocated: u64,
    pub failed_allocations: u64,
}

impl HeapStats {
    pub fn allocations(&self) -> u64 {
        self.strings + self.lists
    }
}

/// What an allocation is for, used only for accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationKind {
    String,
    List,
}

/// Byte-budgeted heap. Nothing is ever freed during a run.
#[derive(Debug, Clone)]
pub struct ManagedHeap {
    limit_bytes: u64,
    stats: HeapStats,
}

impl ManagedHeap {
    pub fn new(limit_bytes: u64) -> Self {
        Self {
            limit_bytes,
            stats: HeapStats::default(),
        }
    }

    pub fn limit_bytes(&self) -> u64 {
        self.limit_bytes
    }

    pub fn remaining_bytes(&self) -> u64 {
        self.limit_bytes.saturating_sub(self.stats.bytes_allocated)
    }

    pub fn stats(&self) -> &HeapStats {
        &self.stats
    }

    /// Charge `bytes` against the budget; `false` when it would be exceeded.
    pub fn try_charge(&mut self, kind: AllocationKind, bytes: u64) -> bool {
        if bytes > self.remaining_bytes() {
            self.stats.failed_allocations += 1;
            return false;
        }

        self.stats.bytes_allocated += bytes;
        match kind {
            AllocationKind::String => self.stats.strings += 1,
            AllocationKind::List => self.stats.lists += 1,
        }
        true
    }

    pub fn string_cost(len: usize) -> u64 {
        STRING_HEADER_BYTES + len as u64
    }

    pub fn list_cost(len: usize) -> u64 {
        LIST_SLOT_BYTES.saturating_mul(len as u64)
    }
}
