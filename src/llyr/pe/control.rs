use log::debug;

use crate::llyr::data::LlyrData;
use crate::llyr::optype::ControlOp;
use crate::llyr::pe::{PeKind, ProcessingElement};

/// Steering operators. SEL, ROZ/ROO and the filters are plain combinational functions of a full
/// operand set; MERGE and REPEATER fire on partial inputs and are driven from
/// [`ProcessingElement::compute_merge`] and [`ProcessingElement::compute_repeater`].
#[derive(Debug, Clone)]
pub struct ControlUnit {
    op: ControlOp,
    constant: Option<LlyrData>,
    /// Token replayed by REPEATER while its control line stays low.
    buffer: Option<LlyrData>,
}

impl ControlUnit {
    pub fn new(op: ControlOp, constant: Option<LlyrData>) -> Self {
        Self {
            op,
            constant,
            buffer: None,
        }
    }

    pub fn op(&self) -> ControlOp {
        self.op
    }

    pub fn buffer(&self) -> Option<LlyrData> {
        self.buffer
    }

    pub fn reset(&mut self) {
        self.buffer = None;
    }

    /// `None` means the operands were consumed but nothing goes downstream.
    pub fn evaluate(&self, args: &[LlyrData]) -> Option<LlyrData> {
        let first = *args.first()?;
        let arg = |i: usize| args.get(i).copied().unwrap_or_default();
        match self.op {
            ControlOp::Sel => Some(if first.is_zero() { arg(2) } else { arg(1) }),
            ControlOp::Roz => arg(1).is_zero().then_some(first),
            ControlOp::Roo => (!arg(1).is_zero()).then_some(first),
            ControlOp::Filter => (first != LlyrData::ONES).then_some(first),
            ControlOp::FilterConst => (Some(first) != self.constant).then_some(first),
            ControlOp::Merge | ControlOp::Repeater | ControlOp::Route => Some(first),
        }
    }
}

impl ProcessingElement {
    /// MERGE: pass through the first operand queue holding a token. Racing inputs resolve by
    /// queue binding order.
    pub(crate) fn compute_merge(&mut self, routed: bool) -> bool {
        let Some(idx) = self
            .inputs
            .iter()
            .position(|q| q.is_operand() && !q.is_empty())
        else {
            self.pending_op = routed;
            return false;
        };
        if self.output_blocked() {
            return self.stall_on_backpressure();
        }
        if !self.countdown() {
            return false;
        }

        if let Some(token) = self.inputs[idx].pop() {
            debug!("pe {} merge: queue {} -> {}", self.id, idx, token);
            self.push_result(token);
        }
        self.record_fire();
        true
    }

    /// REPEATER: operand 0 is data, operand 1 control. A high control token (or an empty buffer)
    /// latches a new data token; every firing emits the buffer and consumes one control token.
    pub(crate) fn compute_repeater(&mut self, routed: bool) -> bool {
        let data = self.peek_operand(0);
        let Some(control) = self.peek_operand(1) else {
            self.pending_op = routed || data.is_some();
            if data.is_some() {
                self.stats.operand_stalls += 1;
            }
            return false;
        };
        let buffered = match &self.kind {
            PeKind::Control(unit) => unit.buffer(),
            _ => None,
        };
        let refill = !control.is_zero() || buffered.is_none();
        if refill && data.is_none() {
            self.stats.operand_stalls += 1;
            self.pending_op = true;
            return false;
        }
        if self.output_blocked() {
            return self.stall_on_backpressure();
        }
        if !self.countdown() {
            return false;
        }

        self.pop_operand(1);
        let token = if refill { self.pop_operand(0) } else { buffered };
        if let PeKind::Control(unit) = &mut self.kind {
            unit.buffer = token;
        }
        if let Some(token) = token {
            debug!("pe {} repeater: emit {} (refill: {})", self.id, token, refill);
            self.push_result(token);
        }
        self.record_fire();
        true
    }
}
