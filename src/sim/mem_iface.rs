use log::debug;
use serde::Serialize;

use crate::base::mem::HasMemory;
use crate::sim::config::MemConfig;
use crate::sim::sparse_mem::SparseMemory;
use crate::timeq::{Backpressure, Cycle, ServerConfig, ServiceRequest, TimedServer};

/// Opaque correlation handle handed out by a memory interface for every accepted request.
pub type ReqId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemCmd {
    Read,
    Write,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemRequest {
    pub cmd: MemCmd,
    pub addr: u64,
    pub size: usize,
    /// Write payload; empty for reads.
    pub data: Vec<u8>,
}

impl MemRequest {
    pub fn read(addr: u64, size: usize) -> Self {
        Self {
            cmd: MemCmd::Read,
            addr,
            size,
            data: Vec::new(),
        }
    }

    pub fn write(addr: u64, data: Vec<u8>) -> Self {
        Self {
            cmd: MemCmd::Write,
            addr,
            size: data.len(),
            data,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemResponseKind {
    ReadResp,
    WriteResp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemResponse {
    pub id: ReqId,
    pub kind: MemResponseKind,
    pub addr: u64,
    /// Read data; empty for write acknowledgements.
    pub data: Vec<u8>,
}

/// Why a memory interface refused a request this cycle. Never an error: the issuer retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemReject {
    QueueFull,
    Busy { retry_at: Cycle },
}

pub trait MemInterface {
    /// Issue a request; on success the returned id will show up in a later `poll`.
    fn send(&mut self, now: Cycle, request: MemRequest) -> Result<ReqId, MemReject>;

    /// Collect every response that has completed by `now`.
    fn poll(&mut self, now: Cycle) -> Result<Vec<MemResponse>, anyhow::Error>;

    fn outstanding(&self) -> usize;

    fn stats(&self) -> MemStats {
        MemStats::default()
    }

    /// Untimed backdoor read of one 64-bit word, for inspection outside the timing model.
    fn debug_read(&self, addr: u64) -> Result<u64, anyhow::Error>;

    /// Forget in-flight requests. Stored contents are kept.
    fn reset(&mut self) {}
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MemStats {
    pub reads: u64,
    pub writes: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub rejects: u64,
}

/// Latency/bandwidth-modelled memory over a sparse backing store.
#[derive(Debug)]
pub struct TimedMemory {
    server: TimedServer<(ReqId, MemRequest)>,
    backing: SparseMemory,
    next_id: ReqId,
    stats: MemStats,
}

impl TimedMemory {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            server: TimedServer::new(config),
            backing: SparseMemory::new(),
            next_id: 0,
            stats: MemStats::default(),
        }
    }

    pub fn from_config(config: &MemConfig, starting_addr: u64) -> Result<Self, anyhow::Error> {
        let mut mem = Self::new(config.server_config());
        mem.backing.init_words(starting_addr, &config.init_words)?;
        Ok(mem)
    }

    pub fn backing(&self) -> &SparseMemory {
        &self.backing
    }

    fn perform(&mut self, id: ReqId, request: MemRequest) -> Result<MemResponse, anyhow::Error> {
        match request.cmd {
            MemCmd::Read => {
                let data = self.backing.read(request.addr, request.size)?;
                self.stats.reads += 1;
                self.stats.bytes_read += request.size as u64;
                Ok(MemResponse { id, kind: MemResponseKind::ReadResp, addr: request.addr, data })
            }
            MemCmd::Write => {
                self.backing.write(request.addr, &request.data)?;
                self.stats.writes += 1;
                self.stats.bytes_written += request.size as u64;
                Ok(MemResponse { id, kind: MemResponseKind::WriteResp, addr: request.addr, data: Vec::new() })
            }
        }
    }
}

impl MemInterface for TimedMemory {
    fn send(&mut self, now: Cycle, request: MemRequest) -> Result<ReqId, MemReject> {
        let id = self.next_id;
        let size = request.size as u32;
        match self.server.try_enqueue(now, ServiceRequest::new((id, request), size)) {
            Ok(ticket) => {
                debug!("mem req {} accepted, ready at {}", id, ticket.ready_at());
                self.next_id += 1;
                Ok(id)
            }
            Err(Backpressure::QueueFull { .. }) => {
                self.stats.rejects += 1;
                Err(MemReject::QueueFull)
            }
            Err(Backpressure::Busy { available_at, .. }) => {
                self.stats.rejects += 1;
                Err(MemReject::Busy { retry_at: available_at })
            }
        }
    }

    fn poll(&mut self, now: Cycle) -> Result<Vec<MemResponse>, anyhow::Error> {
        let mut done = Vec::new();
        self.server.service_ready(now, |result| done.push(result.payload));
        done.into_iter()
            .map(|(id, request)| self.perform(id, request))
            .collect()
    }

    fn outstanding(&self) -> usize {
        self.server.outstanding()
    }

    fn stats(&self) -> MemStats {
        self.stats
    }

    fn debug_read(&self, addr: u64) -> Result<u64, anyhow::Error> {
        Ok(u64::from_le_bytes(self.backing.read_n::<8>(addr)?))
    }

    fn reset(&mut self) {
        self.server.clear();
        self.next_id = 0;
        self.stats = MemStats::default();
    }
}
