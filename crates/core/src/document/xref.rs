//! Cross-reference table with incremental-update bookkeeping.
//!
//! Entries read from the file live in `existing`; entries written after
//! reading finished live in `new`. Deleted ids form the free list that is
//! emitted alongside the new entries, so only the delta is ever written.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::io::{Seek, Write};

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::ensure_format;
use crate::error::{PdfError, Result};

/// Generation recorded for the head of the free list, object 0.
pub const FREE_LIST_HEAD_GENERATION: u32 = 65536;

/// Location of an in-use object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XrefEntry {
    pub offset: u64,
    pub generation: u32,
}

impl XrefEntry {
    pub const fn new(offset: u64, generation: u32) -> Self {
        Self { offset, generation }
    }
}

/// Which map inserts go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XrefPhase {
    /// Populating from the file being opened.
    #[default]
    Reading,
    /// Recording objects appended by an incremental save.
    Writing,
}

#[derive(Debug, Clone)]
pub struct XrefTable {
    existing: FxHashMap<u32, XrefEntry>,
    new: FxHashMap<u32, XrefEntry>,
    deleted: BTreeMap<u32, u32>,
    phase: XrefPhase,
}

impl Default for XrefTable {
    fn default() -> Self {
        Self::new()
    }
}

impl XrefTable {
    pub fn new() -> Self {
        Self {
            existing: FxHashMap::default(),
            new: FxHashMap::default(),
            deleted: BTreeMap::from([(0, FREE_LIST_HEAD_GENERATION)]),
            phase: XrefPhase::Reading,
        }
    }

    pub const fn phase(&self) -> XrefPhase {
        self.phase
    }

    /// Route every later insert to the new-entry map.
    pub const fn finish_reading(&mut self) {
        self.phase = XrefPhase::Writing;
    }

    pub fn set(&mut self, object_id: u32, entry: XrefEntry) {
        match self.phase {
            XrefPhase::Reading => self.existing.insert(object_id, entry),
            XrefPhase::Writing => self.new.insert(object_id, entry),
        };
        self.deleted.remove(&object_id);
    }

    /// Location of a live object; new entries shadow existing ones.
    pub fn get(&self, object_id: u32) -> Option<XrefEntry> {
        if self.deleted.contains_key(&object_id) {
            return None;
        }
        self.new
            .get(&object_id)
            .or_else(|| self.existing.get(&object_id))
            .copied()
    }

    /// Mark an object free and return the generation its id would get on reuse.
    /// Deleting an already free id is a no-op.
    pub fn delete(&mut self, object_id: u32) -> Result<u32> {
        if let Some(entry) = self.new.remove(&object_id) {
            let generation = entry.generation + 1;
            self.deleted.insert(object_id, generation);
            return Ok(generation);
        }
        if let Some(&generation) = self.deleted.get(&object_id) {
            return Ok(generation);
        }
        if let Some(entry) = self.existing.get(&object_id) {
            let generation = entry.generation + 1;
            self.deleted.insert(object_id, generation);
            return Ok(generation);
        }
        Err(PdfError::Format(format!(
            "cannot delete nonexistent object {object_id}"
        )))
    }

    pub fn contains(&self, object_id: u32) -> bool {
        self.get(object_id).is_some()
    }

    /// Live object ids in ascending order.
    pub fn keys(&self) -> Vec<u32> {
        let live: BTreeSet<u32> = self
            .existing
            .keys()
            .chain(self.new.keys())
            .copied()
            .filter(|id| !self.deleted.contains_key(id))
            .collect();
        live.into_iter().collect()
    }

    /// Live entries in ascending id order.
    pub fn entries(&self) -> Vec<(u32, XrefEntry)> {
        self.keys()
            .into_iter()
            .filter_map(|id| self.get(id).map(|entry| (id, entry)))
            .collect()
    }

    /// Free ids with the generation each would be reused at.
    pub fn deleted(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.deleted.iter().map(|(id, generation)| (*id, *generation))
    }

    /// Every id the table knows about, free or live.
    fn all_ids(&self) -> BTreeSet<u32> {
        self.existing
            .keys()
            .chain(self.new.keys())
            .chain(self.deleted.keys())
            .copied()
            .collect()
    }

    /// Number of ids the table knows about, including free ones. This is the
    /// trailer `Size`.
    pub fn len(&self) -> usize {
        self.all_ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Largest id ever recorded, free or live.
    pub fn max_id(&self) -> Option<u32> {
        self.all_ids().last().copied()
    }

    /// Write an `xref` section holding the new and deleted entries only, and
    /// return the offset of its `xref` keyword.
    pub fn write<W: Write + Seek>(&self, out: &mut W) -> Result<u64> {
        let start = out.stream_position()?;
        out.write_all(b"xref\n")?;

        let ids: BTreeSet<u32> = self
            .new
            .keys()
            .chain(self.deleted.keys())
            .copied()
            .collect();
        let mut free: VecDeque<u32> = self.deleted.keys().copied().collect();

        for (first, count) in contiguous_runs(ids.iter().copied()) {
            writeln!(out, "{first} {count}")?;
            for object_id in (0..count).map(|i| first + i) {
                if let Some(entry) = self.new.get(&object_id) {
                    writeln!(out, "{:010} {:05} n ", entry.offset, entry.generation)?;
                    continue;
                }
                let head = free.pop_front();
                ensure_format!(
                    head == Some(object_id),
                    "free list out of sequence: expected object {object_id}, found {head:?}"
                );
                let next_free = free.front().copied().unwrap_or(0);
                let generation = self.deleted.get(&object_id).copied().unwrap_or(0);
                writeln!(out, "{next_free:010} {generation:05} f ")?;
            }
        }
        debug!(
            offset = start,
            new = self.new.len(),
            deleted = self.deleted.len(),
            "wrote xref section"
        );
        Ok(start)
    }
}

/// Split ascending ids into `(first, count)` runs of consecutive ids.
pub fn contiguous_runs(ids: impl IntoIterator<Item = u32>) -> Vec<(u32, u32)> {
    let mut runs: Vec<(u32, u32)> = Vec::new();
    for id in ids {
        match runs.last_mut() {
            Some((first, count)) if first.checked_add(*count) == Some(id) => *count += 1,
            _ => runs.push((id, 1)),
        }
    }
    runs
}
