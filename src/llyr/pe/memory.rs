use log::debug;

use crate::llyr::data::LlyrData;
use crate::llyr::lsq::LsEntry;
use crate::llyr::optype::MemOp;
use crate::llyr::pe::{ComputeContext, PeId, PeKind, ProcessingElement};
use crate::sim::mem_iface::MemRequest;

/// Bytes moved by every load and store; tokens are 64 bits wide.
pub const ACCESS_SIZE: usize = 8;

#[derive(Debug, Clone)]
pub struct MemUnit {
    op: MemOp,
    stride: u64,
    outstanding: usize,
}

impl MemUnit {
    pub fn new(op: MemOp, stride: u64) -> Self {
        Self {
            op,
            stride,
            outstanding: 0,
        }
    }

    pub fn op(&self) -> MemOp {
        self.op
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    /// Requests issued by this element that memory has not answered yet.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn reset(&mut self) {
        self.outstanding = 0;
    }

    fn is_stream(&self) -> bool {
        matches!(self.op, MemOp::StreamLd | MemOp::StreamSt)
    }

    fn is_load(&self) -> bool {
        matches!(self.op, MemOp::Ld | MemOp::StreamLd)
    }
}

impl ProcessingElement {
    fn mem_unit(&self) -> &MemUnit {
        match &self.kind {
            PeKind::Mem(unit) => unit,
            _ => panic!("pe {} ({}) is not a memory element", self.id, self.op),
        }
    }

    fn mem_unit_mut(&mut self) -> &mut MemUnit {
        match &mut self.kind {
            PeKind::Mem(unit) => unit,
            _ => panic!("pe {} is not a memory element", self.id),
        }
    }

    /// Where a loaded value goes: straight to the sole consumer, otherwise back through this
    /// element's own output queues.
    pub fn load_target(&self) -> PeId {
        let mut consumers = self.outputs.iter().filter(|q| !q.is_routed());
        match (consumers.next(), consumers.next()) {
            (Some(queue), None) => queue.peer.unwrap_or(self.id),
            _ => self.id,
        }
    }

    /// Called by the engine when one of this element's LSQ entries retires.
    pub fn complete_request(&mut self) {
        if let PeKind::Mem(unit) = &mut self.kind {
            unit.outstanding = unit.outstanding.saturating_sub(1);
        }
    }

    fn push_operand(&mut self, arg: u32, token: LlyrData) {
        match self.operand_index(arg) {
            Some(idx) => self.inputs[idx].push(token),
            None => panic!("pe {}: no operand queue {} to re-arm", self.id, arg),
        }
    }

    /// Issue a load or store. Stream variants carry `(address, remaining)` in operands 0 and 1
    /// and re-arm them after every accepted request; a zero count ends the stream.
    pub(crate) fn compute_memory(&mut self, ctx: &mut ComputeContext<'_>, routed: bool) -> bool {
        let unit = self.mem_unit().clone();

        if unit.is_stream() && self.peek_operand(0).is_some() && self.peek_operand(1) == Some(LlyrData::ZERO) {
            self.pop_operand(0);
            self.pop_operand(1);
            debug!("pe {} ({}): stream exhausted", self.id, self.op);
            self.record_fire();
            return true;
        }
        if !self.gate(routed) {
            return false;
        }

        let args = self.peek_operands();
        let addr = args[0].to_ullong();
        let request = match unit.op() {
            MemOp::Ld | MemOp::StreamLd => MemRequest::read(addr, ACCESS_SIZE),
            MemOp::St => MemRequest::write(addr, args[1].to_le_bytes().to_vec()),
            MemOp::StreamSt => MemRequest::write(addr, args[2].to_le_bytes().to_vec()),
        };
        let req_id = match ctx.mem.send(ctx.now, request) {
            Ok(req_id) => req_id,
            Err(reject) => {
                debug!("pe {} ({}): memory rejected {:#x}: {:?}", self.id, self.op, addr, reject);
                return self.stall_on_backpressure();
            }
        };

        let args = self.pop_operands();
        let target = if unit.is_load() { self.load_target() } else { self.id };
        ctx.lsq.add_entry(LsEntry::new(req_id, self.id, target));
        self.mem_unit_mut().outstanding += 1;
        debug!(
            "pe {} ({}): request {} addr {:#x} -> pe {}",
            self.id, self.op, req_id, addr, target
        );

        if unit.is_stream() {
            let remaining = args[1].to_ullong();
            self.push_operand(0, LlyrData(addr.wrapping_add(unit.stride())));
            self.push_operand(1, LlyrData(remaining - 1));
        }
        self.record_fire();
        true
    }
}
