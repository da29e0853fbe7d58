use std::collections::VecDeque;

use crate::llyr::data::LlyrData;
use crate::llyr::pe::PeId;

/// Interned routing-tag name. A queue carrying a tag shuttles tokens to the output queues with
/// the same tag instead of feeding local compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteTag(pub u32);

#[derive(Debug, Clone, Default)]
pub struct PeQueue {
    pub data: VecDeque<LlyrData>,
    /// Operand position this queue feeds; `None` for routing-only or bookkeeping queues.
    pub argument: Option<u32>,
    /// Set once this routed queue has forwarded a token; cleared by the owner's `do_send`.
    pub forwarded: bool,
    pub route: Option<RouteTag>,
    /// Neighbour on the other end of the binding.
    pub peer: Option<PeId>,
}

impl PeQueue {
    pub fn operand(peer: PeId, argument: u32) -> Self {
        Self {
            argument: Some(argument),
            peer: Some(peer),
            ..Self::default()
        }
    }

    pub fn routed(peer: PeId, route: RouteTag) -> Self {
        Self {
            route: Some(route),
            peer: Some(peer),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_operand(&self) -> bool {
        self.argument.is_some() && self.route.is_none()
    }

    pub fn is_routed(&self) -> bool {
        self.route.is_some()
    }

    pub fn front(&self) -> Option<LlyrData> {
        self.data.front().copied()
    }

    pub fn push(&mut self, token: LlyrData) {
        self.data.push_back(token);
    }

    pub fn pop(&mut self) -> Option<LlyrData> {
        self.data.pop_front()
    }
}
