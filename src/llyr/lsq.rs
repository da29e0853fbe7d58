//! Load/store queue: correlates in-flight memory requests with the elements that issued them.
//!
//! Memory completions arrive asynchronously and only stage their result here; delivery to the
//! consuming element happens when the engine drains ready entries during its next sweep.

use std::collections::VecDeque;

use crate::llyr::data::LlyrData;
use crate::llyr::pe::PeId;
use crate::sim::mem_iface::ReqId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum LsReady {
    #[default]
    Unset = 0,
    DataReady = 1,
    AckReady = 2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LsEntry {
    pub req_id: ReqId,
    /// Element that issued the request.
    pub requester: PeId,
    /// Element that receives the loaded value; the requester itself when it fans out locally.
    pub target: PeId,
    pub ready: LsReady,
    pub data: Option<LlyrData>,
}

impl LsEntry {
    pub fn new(req_id: ReqId, requester: PeId, target: PeId) -> Self {
        Self {
            req_id,
            requester,
            target,
            ready: LsReady::Unset,
            data: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready != LsReady::Unset
    }
}

/// Entries are kept in issue order; lookups are linear, the table is small.
#[derive(Debug, Default)]
pub struct LSQueue {
    entries: VecDeque<LsEntry>,
}

impl LSQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, req_id: ReqId) -> Option<usize> {
        self.entries.iter().position(|e| e.req_id == req_id)
    }

    fn entry_mut(&mut self, req_id: ReqId) -> &mut LsEntry {
        let idx = self
            .position(req_id)
            .unwrap_or_else(|| panic!("lsq: no entry for request {}", req_id));
        &mut self.entries[idx]
    }

    pub fn add_entry(&mut self, entry: LsEntry) {
        assert!(
            self.position(entry.req_id).is_none(),
            "lsq: request {} registered twice", entry.req_id
        );
        self.entries.push_back(entry);
    }

    /// Panics when the request is unknown; every response must match an issued request.
    pub fn lookup_entry(&self, req_id: ReqId) -> &LsEntry {
        let idx = self
            .position(req_id)
            .unwrap_or_else(|| panic!("lsq: no entry for request {}", req_id));
        &self.entries[idx]
    }

    pub fn remove_entry(&mut self, req_id: ReqId) -> Option<LsEntry> {
        let idx = self.position(req_id)?;
        self.entries.remove(idx)
    }

    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn set_entry_data(&mut self, req_id: ReqId, data: LlyrData) {
        self.entry_mut(req_id).data = Some(data);
    }

    pub fn set_entry_ready(&mut self, req_id: ReqId, ready: LsReady) {
        self.entry_mut(req_id).ready = ready;
    }

    pub fn entry_data(&self, req_id: ReqId) -> Option<LlyrData> {
        self.lookup_entry(req_id).data
    }

    pub fn entry_ready(&self, req_id: ReqId) -> LsReady {
        self.lookup_entry(req_id).ready
    }

    /// Oldest entry, ready or not.
    pub fn next_entry(&self) -> Option<&LsEntry> {
        self.entries.front()
    }

    /// Remove up to `max` ready entries, oldest first. Unready entries keep their place.
    pub fn take_ready(&mut self, max: usize) -> Vec<LsEntry> {
        let mut taken = Vec::new();
        let mut idx = 0;
        while idx < self.entries.len() && taken.len() < max {
            if self.entries[idx].is_ready() {
                taken.extend(self.entries.remove(idx));
            } else {
                idx += 1;
            }
        }
        taken
    }

    pub fn outstanding_for(&self, pe: PeId) -> usize {
        self.entries.iter().filter(|e| e.requester == pe).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LsEntry> + '_ {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
