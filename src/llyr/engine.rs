//! Top-level driver of the array: one breadth-first sweep of the mapped graph per clock.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::bail;
use serde::Serialize;

use crate::base::behavior::*;
use crate::base::module::{module, IsModule, ModuleBase};
use crate::llyr::data::LlyrData;
use crate::llyr::graph::{LlyrGraph, VertexId};
use crate::llyr::lsq::{LSQueue, LsEntry, LsReady};
use crate::llyr::mapper::{MappedGraph, ROOT};
use crate::llyr::pe::{ComputeContext, PeId, PeStats, ProcessingElement};
use crate::sim::config::LlyrConfig;
use crate::sim::log::Logger;
use crate::sim::mem_iface::{MemInterface, MemResponse, MemResponseKind, MemStats};
use crate::timeq::Cycle;
use crate::{vdebug, vinfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    Continue,
    Halt,
}

#[derive(Debug, Default)]
pub struct LlyrEngineState {
    pub busy_cycles: u64,
    pub idle_waiting_cycles: u64,
    pub lsq_retired: u64,
    pub halted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PeSummary {
    pub id: PeId,
    pub op: String,
    #[serde(flatten)]
    pub stats: PeStats,
}

/// End-of-run summary, written out as JSON by the driver.
#[derive(Debug, Clone, Serialize)]
pub struct LlyrStats {
    pub cycles: Cycle,
    pub busy_cycles: u64,
    pub idle_waiting_cycles: u64,
    pub lsq_retired: u64,
    pub mem: MemStats,
    pub pes: Vec<PeSummary>,
}

pub struct LlyrEngine {
    base: ModuleBase<LlyrEngineState, LlyrConfig>,
    /// Vertex payload is the element's slot in `pes`.
    graph: LlyrGraph<usize>,
    pes: Vec<ProcessingElement>,
    lsq: LSQueue,
    mem: Box<dyn MemInterface>,
    logger: Arc<Logger>,
}

module!(LlyrEngine, LlyrEngineState, LlyrConfig,);

impl ModuleBehaviors for LlyrEngine {
    fn tick_one(&mut self) {
        self.tick().unwrap();
    }

    fn reset(&mut self) {
        self.pes.iter_mut().for_each(ProcessingElement::reset);
        self.lsq.clear();
        self.mem.reset();
        *self.state_mut() = LlyrEngineState::default();
        self.base().cycle = 0;
    }
}

impl LlyrEngine {
    pub fn new(
        config: Arc<LlyrConfig>,
        mapped: MappedGraph,
        mem: Box<dyn MemInterface>,
        logger: &Arc<Logger>,
    ) -> Self {
        let (graph, pes) = mapped.into_parts();
        assert!(graph.contains(ROOT), "mapped graph has no root vertex");
        let mut me = LlyrEngine {
            base: ModuleBase::default(),
            graph,
            pes,
            lsq: LSQueue::new(),
            mem,
            logger: logger.clone(),
        };
        me.init_conf(config);
        me
    }

    pub fn graph(&self) -> &LlyrGraph<usize> {
        &self.graph
    }

    pub fn lsq(&self) -> &LSQueue {
        &self.lsq
    }

    pub fn mem(&self) -> &dyn MemInterface {
        self.mem.as_ref()
    }

    pub fn pe(&self, id: PeId) -> &ProcessingElement {
        &self.pes[self.graph.vertex(id).payload]
    }

    fn pe_mut(&mut self, id: PeId) -> &mut ProcessingElement {
        let slot = self.graph.vertex(id).payload;
        &mut self.pes[slot]
    }

    pub fn pes(&self) -> impl Iterator<Item = &ProcessingElement> + '_ {
        self.pes.iter()
    }

    pub fn halted(&self) -> bool {
        self.state().halted
    }

    /// One clock: sweep the graph from the root, then collect memory completions into the LSQ.
    pub fn tick(&mut self) -> Result<TickStatus, anyhow::Error> {
        let now = self.now();
        self.logger.set_cycle(now);

        let order: Vec<VertexId> = self.graph.bfs(ROOT).collect();
        let mut visited = HashSet::with_capacity(order.len());
        let mut ls_budget = self.conf().ls_entries;
        let mut compute_complete = false;

        for id in order {
            visited.insert(id);
            compute_complete |= self.do_load_store_ops(&mut ls_budget, &visited);

            let slot = self.graph.vertex(id).payload;
            let mut ctx = ComputeContext::new(now, &mut self.lsq, &mut *self.mem);
            let pe = &mut self.pes[slot];
            pe.do_compute(&mut ctx);
            let sends = pe.do_send();
            compute_complete |= pe.is_pending();

            for (dst, token) in sends {
                self.pe_mut(dst).push_input_from(id, token);
                // a back edge hands work to an element this sweep already passed
                compute_complete |= visited.contains(&dst);
            }
        }

        for response in self.mem.poll(now)? {
            self.handle_event(response);
        }

        self.base().cycle += 1;
        if compute_complete {
            self.state_mut().busy_cycles += 1;
            vdebug!(self.logger, "llyr busy");
            Ok(TickStatus::Continue)
        } else if !self.lsq.is_empty() || self.mem.outstanding() > 0 {
            self.state_mut().idle_waiting_cycles += 1;
            vdebug!(self.logger, "llyr idle, {} lsq entries in flight", self.lsq.num_entries());
            Ok(TickStatus::Continue)
        } else {
            self.state_mut().halted = true;
            vinfo!(self.logger, "llyr done after {} cycles", self.now());
            Ok(TickStatus::Halt)
        }
    }

    /// Retire up to `budget` ready LSQ entries, handing loaded values to their consumers.
    /// Returns true when a value landed on an element this sweep has already visited.
    fn do_load_store_ops(&mut self, budget: &mut usize, visited: &HashSet<VertexId>) -> bool {
        if *budget == 0 || self.lsq.is_empty() {
            return false;
        }
        let retired = self.lsq.take_ready(*budget);
        *budget -= retired.len();

        let mut late = false;
        for LsEntry { req_id, requester, target, ready, data } in retired {
            self.pe_mut(requester).complete_request();
            self.state_mut().lsq_retired += 1;
            match ready {
                LsReady::DataReady => {
                    let token = data.unwrap_or_default();
                    vdebug!(self.logger, "lsq: request {} -> pe {} ({})", req_id, target, token);
                    if target == requester {
                        self.pe_mut(target).do_receive(token);
                    } else {
                        self.pe_mut(target).push_input_from(requester, token);
                    }
                    late |= visited.contains(&target);
                }
                LsReady::AckReady => {
                    vdebug!(self.logger, "lsq: store {} from pe {} acked", req_id, requester);
                }
                LsReady::Unset => unreachable!("take_ready returned an unready entry"),
            }
        }
        late
    }

    /// Stage a memory completion in its LSQ entry. Delivery waits for the next sweep.
    pub fn handle_event(&mut self, response: MemResponse) {
        let entry = self.lsq.lookup_entry(response.id);
        assert_eq!(
            entry.ready,
            LsReady::Unset,
            "lsq: request {} completed twice", response.id
        );
        match response.kind {
            MemResponseKind::ReadResp => {
                self.lsq.set_entry_data(response.id, LlyrData::from_le_bytes(&response.data));
                self.lsq.set_entry_ready(response.id, LsReady::DataReady);
            }
            MemResponseKind::WriteResp => {
                self.lsq.set_entry_ready(response.id, LsReady::AckReady);
            }
        }
    }

    /// Tick until the array halts. Fails if it is still busy after `max_cycles`.
    pub fn run(&mut self, max_cycles: Cycle) -> Result<Cycle, anyhow::Error> {
        while self.now() < max_cycles {
            if self.tick()? == TickStatus::Halt {
                return Ok(self.now());
            }
        }
        bail!(
            "llyr did not halt within {} cycles ({} lsq entries outstanding)",
            max_cycles,
            self.lsq.num_entries()
        )
    }

    pub fn stats(&self) -> LlyrStats {
        let state = self.state();
        LlyrStats {
            cycles: self.now(),
            busy_cycles: state.busy_cycles,
            idle_waiting_cycles: state.idle_waiting_cycles,
            lsq_retired: state.lsq_retired,
            mem: self.mem.stats(),
            pes: self
                .graph
                .iter()
                .map(|(id, v)| PeSummary {
                    id,
                    op: self.pes[v.payload].op().to_string(),
                    stats: self.pes[v.payload].stats(),
                })
                .collect(),
        }
    }
}
