mod graph_tests;
mod mapper_tests;
mod pe_tests;

use crate::llyr::lsq::LSQueue;
use crate::llyr::pe::{ComputeContext, PeQueue, ProcessingElement};
use crate::sim::mem_iface::TimedMemory;
use crate::timeq::{Cycle, ServerConfig};

/// Memory and LSQ for driving a single element outside the engine.
pub struct Harness {
    pub lsq: LSQueue,
    pub mem: TimedMemory,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_server(ServerConfig {
            base_latency: 2,
            bytes_per_cycle: 8,
            queue_capacity: 4,
        })
    }

    pub fn with_server(config: ServerConfig) -> Self {
        Harness {
            lsq: LSQueue::new(),
            mem: TimedMemory::new(config),
        }
    }

    pub fn compute_at(&mut self, now: Cycle, pe: &mut ProcessingElement) -> bool {
        let mut ctx = ComputeContext::new(now, &mut self.lsq, &mut self.mem);
        pe.do_compute(&mut ctx)
    }

    pub fn compute(&mut self, pe: &mut ProcessingElement) -> bool {
        self.compute_at(0, pe)
    }
}

/// Bind operand queues fed by fake neighbours 100, 101, ... and one consumer, 200.
pub fn wire(pe: &mut ProcessingElement, num_operands: u32) {
    for arg in 0..num_operands {
        let src = 100 + arg;
        pe.add_input_queue(PeQueue::operand(src, arg), src);
    }
    pe.add_output_queue(None, 200);
}
