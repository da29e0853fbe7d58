//! Processing elements: one operator instance of the mapped array.
//!
//! Every element follows the same token contract. `do_compute` decides whether to fire from the
//! state of its bound input queues, `do_send` hands at most one token per output queue to the
//! neighbour on the other end, and `do_receive` injects a value that came back from memory.
//! Family-specific behaviour lives in the [`PeKind`] variant and is dispatched by `match`.

pub mod arith;
pub mod control;
pub mod memory;
pub mod queue;

use std::collections::HashMap;

use log::debug;
use serde::Serialize;
use smallvec::SmallVec;

use crate::llyr::data::LlyrData;
use crate::llyr::lsq::LSQueue;
use crate::llyr::optype::{ControlOp, OpType};
use crate::sim::config::LlyrConfig;
use crate::sim::mem_iface::MemInterface;
use crate::timeq::Cycle;

pub use arith::{AdvIntUnit, ComplexUnit, FpUnit, IntUnit, LogicUnit};
pub use control::ControlUnit;
pub use memory::MemUnit;
pub use queue::{PeQueue, RouteTag};

pub type PeId = u32;

pub type Operands = SmallVec<[LlyrData; 4]>;
pub type Sends = SmallVec<[(PeId, LlyrData); 4]>;

/// What a processing element may touch while computing: the shared LSQ and memory port.
pub struct ComputeContext<'a> {
    pub now: Cycle,
    pub lsq: &'a mut LSQueue,
    pub mem: &'a mut dyn MemInterface,
}

impl<'a> ComputeContext<'a> {
    pub fn new(now: Cycle, lsq: &'a mut LSQueue, mem: &'a mut dyn MemInterface) -> Self {
        Self { now, lsq, mem }
    }
}

#[derive(Debug, Clone)]
pub enum PeKind {
    Dummy,
    Mem(MemUnit),
    Int(IntUnit),
    AdvInt(AdvIntUnit),
    Logic(LogicUnit),
    Fp(FpUnit),
    Complex(ComplexUnit),
    Control(ControlUnit),
}

impl PeKind {
    fn new(op: OpType, constant: Option<LlyrData>, stride: u64) -> Self {
        match op {
            OpType::Dummy => PeKind::Dummy,
            OpType::Mem(op) => PeKind::Mem(MemUnit::new(op, stride)),
            OpType::Int(op) => PeKind::Int(IntUnit::new(op, None)),
            OpType::IntConst(op) => PeKind::Int(IntUnit::new(op, Some(constant.unwrap_or_default()))),
            OpType::AdvInt(op) => PeKind::AdvInt(AdvIntUnit::new(op, constant)),
            OpType::Logic(op) => PeKind::Logic(LogicUnit::new(op, None)),
            OpType::LogicConst(op) => PeKind::Logic(LogicUnit::new(op, Some(constant.unwrap_or_default()))),
            OpType::Fp(op) => PeKind::Fp(FpUnit::new(op)),
            OpType::Complex(op) => PeKind::Complex(ComplexUnit::new(op)),
            OpType::Control(op) => PeKind::Control(ControlUnit::new(op, constant)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PeStats {
    pub fired: u64,
    pub operand_stalls: u64,
    pub backpressure_stalls: u64,
    pub routed: u64,
}

#[derive(Debug, Clone)]
pub struct ProcessingElement {
    id: PeId,
    op: OpType,
    latency: u32,
    cycles_to_fire: u32,
    pending_op: bool,
    queue_depth: usize,
    inputs: Vec<PeQueue>,
    outputs: Vec<PeQueue>,
    input_map: HashMap<PeId, usize>,
    output_map: HashMap<PeId, usize>,
    /// Mapper-provided seed tokens per input queue, restored on reset.
    seeds: Vec<(usize, Vec<LlyrData>)>,
    kind: PeKind,
    stats: PeStats,
}

impl ProcessingElement {
    pub fn new(id: PeId, op: OpType, config: &LlyrConfig) -> Self {
        Self::with_constant(id, op, config, None)
    }

    pub fn with_constant(id: PeId, op: OpType, config: &LlyrConfig, constant: Option<LlyrData>) -> Self {
        Self::build(id, op, config, constant, 8)
    }

    /// `stride` is the byte step of streaming memory operations and is ignored elsewhere.
    pub fn build(
        id: PeId,
        op: OpType,
        config: &LlyrConfig,
        constant: Option<LlyrData>,
        stride: u64,
    ) -> Self {
        let latency = op.latency(config);
        Self {
            id,
            op,
            latency,
            cycles_to_fire: latency,
            pending_op: false,
            queue_depth: config.queue_depth.max(1),
            inputs: Vec::new(),
            outputs: Vec::new(),
            input_map: HashMap::new(),
            output_map: HashMap::new(),
            seeds: Vec::new(),
            kind: PeKind::new(op, constant, stride),
            stats: PeStats::default(),
        }
    }

    pub fn dummy(id: PeId) -> Self {
        Self::new(id, OpType::Dummy, &LlyrConfig::default())
    }

    pub fn id(&self) -> PeId {
        self.id
    }

    pub fn op(&self) -> OpType {
        self.op
    }

    pub fn kind(&self) -> &PeKind {
        &self.kind
    }

    pub fn latency(&self) -> u32 {
        self.latency
    }

    pub fn cycles_to_fire(&self) -> u32 {
        self.cycles_to_fire
    }

    pub fn queue_depth(&self) -> usize {
        self.queue_depth
    }

    pub fn stats(&self) -> PeStats {
        self.stats
    }

    pub fn inputs(&self) -> &[PeQueue] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[PeQueue] {
        &self.outputs
    }

    pub fn input(&self, idx: usize) -> &PeQueue {
        &self.inputs[idx]
    }

    pub fn output(&self, idx: usize) -> &PeQueue {
        &self.outputs[idx]
    }

    pub fn input_queue_id(&self, src: PeId) -> Option<usize> {
        self.input_map.get(&src).copied()
    }

    pub fn output_queue_id(&self, dst: PeId) -> Option<usize> {
        self.output_map.get(&dst).copied()
    }

    /// Bind a new input queue fed by `src`. Panics if `src` is already bound.
    pub fn add_input_queue(&mut self, mut queue: PeQueue, src: PeId) -> usize {
        assert!(
            !self.input_map.contains_key(&src),
            "pe {}: input from pe {} bound twice", self.id, src
        );
        let idx = self.inputs.len();
        queue.peer = Some(src);
        self.inputs.push(queue);
        self.input_map.insert(src, idx);
        idx
    }

    /// Bind a new output queue draining into `dst`. Panics if `dst` is already bound.
    pub fn add_output_queue(&mut self, route: Option<RouteTag>, dst: PeId) -> usize {
        assert!(
            !self.output_map.contains_key(&dst),
            "pe {}: output to pe {} bound twice", self.id, dst
        );
        let idx = self.outputs.len();
        self.outputs.push(PeQueue {
            route,
            peer: Some(dst),
            ..PeQueue::default()
        });
        self.output_map.insert(dst, idx);
        idx
    }

    /// Unbound operand queue pre-filled by the mapper, e.g. an initial address stream.
    pub fn add_seed_queue(&mut self, argument: u32, tokens: &[LlyrData]) -> usize {
        let idx = self.inputs.len();
        let mut queue = PeQueue {
            argument: Some(argument),
            ..PeQueue::default()
        };
        queue.data.extend(tokens.iter().copied());
        self.inputs.push(queue);
        self.seeds.push((idx, tokens.to_vec()));
        idx
    }

    pub fn push_input_queue(&mut self, idx: usize, token: LlyrData) {
        self.inputs[idx].push(token);
    }

    /// Deliver a token sent by neighbour `src`. Panics if no queue is bound to `src`.
    pub fn push_input_from(&mut self, src: PeId, token: LlyrData) {
        let idx = self
            .input_queue_id(src)
            .unwrap_or_else(|| panic!("pe {}: no input queue bound to pe {}", self.id, src));
        self.inputs[idx].push(token);
    }

    /// True while the element holds unconsumed operands, is counting down, or still has tokens
    /// waiting to leave.
    pub fn is_pending(&self) -> bool {
        self.pending_op || self.outputs.iter().any(|q| !q.is_empty())
    }

    pub fn pending_op(&self) -> bool {
        self.pending_op
    }

    pub fn num_operands(&self) -> usize {
        self.inputs.iter().filter(|q| q.is_operand()).count()
    }

    pub fn num_ready_operands(&self) -> usize {
        self.inputs
            .iter()
            .filter(|q| q.is_operand() && !q.is_empty())
            .count()
    }

    fn has_operand_tokens(&self) -> bool {
        self.inputs.iter().any(|q| q.is_operand() && !q.is_empty())
    }

    /// Index of the input queue feeding operand `arg`.
    pub(crate) fn operand_index(&self, arg: u32) -> Option<usize> {
        self.inputs
            .iter()
            .position(|q| q.is_operand() && q.argument == Some(arg))
    }

    /// Heads of all operand queues ordered by argument position.
    pub(crate) fn peek_operands(&self) -> Operands {
        let mut heads: SmallVec<[(u32, LlyrData); 4]> = self
            .inputs
            .iter()
            .filter(|q| q.is_operand())
            .filter_map(|q| Some((q.argument?, q.front()?)))
            .collect();
        heads.sort_by_key(|(arg, _)| *arg);
        heads.into_iter().map(|(_, token)| token).collect()
    }

    pub(crate) fn pop_operands(&mut self) -> Operands {
        let operands = self.peek_operands();
        self.inputs
            .iter_mut()
            .filter(|q| q.is_operand())
            .for_each(|q| {
                q.pop();
            });
        operands
    }

    pub(crate) fn pop_operand(&mut self, arg: u32) -> Option<LlyrData> {
        let idx = self.operand_index(arg)?;
        self.inputs[idx].pop()
    }

    pub(crate) fn peek_operand(&self, arg: u32) -> Option<LlyrData> {
        let idx = self.operand_index(arg)?;
        self.inputs[idx].front()
    }

    /// Any non-routed output at capacity blocks firing.
    pub(crate) fn output_blocked(&self) -> bool {
        let in_flight = match &self.kind {
            PeKind::Mem(unit) => unit.outstanding(),
            _ => 0,
        };
        self.outputs
            .iter()
            .filter(|q| !q.is_routed())
            .any(|q| q.len() + in_flight >= self.queue_depth)
    }

    /// Push a result to every output queue without a routing tag.
    pub(crate) fn push_result(&mut self, token: LlyrData) {
        for queue in self.outputs.iter_mut().filter(|q| !q.is_routed()) {
            queue.push(token);
        }
    }

    /// Latency countdown. Returns true on the call that may fire and reloads the counter.
    pub(crate) fn countdown(&mut self) -> bool {
        if self.cycles_to_fire > 0 {
            self.cycles_to_fire -= 1;
            self.pending_op = true;
            return false;
        }
        self.cycles_to_fire = self.latency;
        true
    }

    pub(crate) fn stall_on_backpressure(&mut self) -> bool {
        self.stats.backpressure_stalls += 1;
        self.pending_op = true;
        false
    }

    pub(crate) fn record_fire(&mut self) {
        self.stats.fired += 1;
        self.pending_op = self.has_operand_tokens();
    }

    /// Common firing gate: full operand set, free output space, expired latency.
    fn gate(&mut self, routed: bool) -> bool {
        let num_inputs = self.num_operands();
        let num_ready = self.num_ready_operands();

        if num_ready > 0 && num_ready < num_inputs {
            debug!("pe {} ({}): {}/{} operands ready", self.id, self.op, num_ready, num_inputs);
            self.stats.operand_stalls += 1;
            self.pending_op = true;
            return false;
        }
        if num_inputs == 0 || num_ready < num_inputs {
            self.pending_op = routed;
            return false;
        }
        if self.output_blocked() {
            return self.stall_on_backpressure();
        }
        self.countdown()
    }

    /// Forward the head of every routed input queue to the outputs carrying the same tag. A
    /// queue forwards at most once between two `do_send` calls.
    fn do_routing(&mut self) -> bool {
        let mut routed = false;
        for idx in 0..self.inputs.len() {
            let Some(tag) = self.inputs[idx].route else {
                continue;
            };
            if self.inputs[idx].forwarded {
                continue;
            }
            let Some(token) = self.inputs[idx].pop() else {
                continue;
            };
            let mut delivered = false;
            for out in self.outputs.iter_mut().filter(|q| q.route == Some(tag)) {
                out.push(token);
                delivered = true;
            }
            if !delivered {
                panic!("pe {}: routed token {} on tag {:?} has no outgoing queue", self.id, token, tag);
            }
            self.inputs[idx].forwarded = true;
            self.stats.routed += 1;
            routed = true;
        }
        routed
    }

    /// Inject a value returned by memory. Only memory elements react; the rest ignore it.
    pub fn do_receive(&mut self, token: LlyrData) {
        if matches!(self.kind, PeKind::Mem(_)) {
            self.push_result(token);
        } else {
            debug!("pe {} ({}): ignoring received {}", self.id, self.op, token);
        }
    }

    /// Attempt to fire. Returns true when the element changed state by firing.
    pub fn do_compute(&mut self, ctx: &mut ComputeContext<'_>) -> bool {
        if matches!(self.kind, PeKind::Dummy) {
            return false;
        }

        let routed = self.do_routing();
        let fired = match self.op {
            OpType::Dummy => false,
            OpType::Mem(_) => self.compute_memory(ctx, routed),
            OpType::Control(ControlOp::Route) => {
                self.pending_op = self.inputs.iter().any(|q| q.is_routed() && !q.is_empty());
                routed
            }
            OpType::Control(ControlOp::Merge) => self.compute_merge(routed),
            OpType::Control(ControlOp::Repeater) => self.compute_repeater(routed),
            _ => self.compute_standard(routed),
        };
        if routed && !self.pending_op {
            self.pending_op = self.inputs.iter().any(|q| q.is_routed() && !q.is_empty());
        }
        fired
    }

    fn compute_standard(&mut self, routed: bool) -> bool {
        if !self.gate(routed) {
            return false;
        }

        let args = self.pop_operands();
        let result = match &mut self.kind {
            PeKind::Int(unit) => unit.evaluate(&args),
            PeKind::AdvInt(unit) => unit.evaluate(&args),
            PeKind::Logic(unit) => unit.evaluate(&args),
            PeKind::Fp(unit) => unit.evaluate(&args),
            PeKind::Complex(unit) => unit.evaluate(&args),
            PeKind::Control(unit) => unit.evaluate(&args),
            PeKind::Dummy | PeKind::Mem(_) => None,
        };
        debug!("pe {} ({}) fired {:?} -> {:?}", self.id, self.op, args.as_slice(), result);

        if let Some(token) = result {
            self.push_result(token);
        }
        self.record_fire();
        true
    }

    /// Take at most one token from every bound, non-empty output queue, in queue order.
    pub fn do_send(&mut self) -> Sends {
        self.inputs.iter_mut().for_each(|q| q.forwarded = false);
        self.outputs
            .iter_mut()
            .filter_map(|q| {
                let dst = q.peer?;
                q.pop().map(|token| (dst, token))
            })
            .collect()
    }

    /// Drop all in-flight tokens and refill the seed queues.
    pub fn reset(&mut self) {
        self.inputs.iter_mut().for_each(|q| {
            q.data.clear();
            q.forwarded = false;
        });
        self.outputs.iter_mut().for_each(|q| q.data.clear());
        for (idx, tokens) in &self.seeds {
            self.inputs[*idx].data.extend(tokens.iter().copied());
        }
        self.cycles_to_fire = self.latency;
        self.pending_op = false;
        self.stats = PeStats::default();
        match &mut self.kind {
            PeKind::Mem(unit) => unit.reset(),
            PeKind::AdvInt(unit) => unit.reset(),
            PeKind::Control(unit) => unit.reset(),
            _ => {}
        }
    }
}
