//! Binds a placed application graph to processing elements and wires their queues.
//!
//! The application arrives as TOML:
//!
//! ```toml
//! [[node]]
//! id = 1
//! op = "LD_ST"
//! stride = 8
//!
//! [[node]]
//! id = 2
//! op = "ADDCONST"
//! constant = 3
//!
//! [[edge]]
//! src = 1
//! dst = 2
//! arg = 0
//!
//! [[seed]]
//! node = 1
//! arg = 0
//! values = [4096]
//! ```
//!
//! Each edge feeds either an operand position (`arg`) or a routing tag (`route`) on the consumer;
//! `tag` marks the producer side of a routed hop.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context};
use log::{debug, info};
use serde::Deserialize;

use crate::llyr::data::LlyrData;
use crate::llyr::graph::{GraphError, LlyrGraph, VertexId};
use crate::llyr::optype::OpType;
use crate::llyr::pe::{PeId, PeQueue, ProcessingElement, RouteTag};
use crate::sim::config::LlyrConfig;

/// Vertex of the synthetic dummy root every sweep starts from.
pub const ROOT: VertexId = 0;

pub const DEFAULT_STRIDE: u64 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputBinding {
    /// Feeds the given operand position.
    Operand(u32),
    /// Passes through under the given routing tag.
    Routed(RouteTag),
}

/// Graph of processing elements with all queue bindings in place; consumed by the engine.
#[derive(Debug)]
pub struct MappedGraph {
    graph: LlyrGraph<usize>,
    pes: Vec<ProcessingElement>,
}

impl Default for MappedGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl MappedGraph {
    pub fn new() -> Self {
        let mut graph = LlyrGraph::new();
        // empty graph, cannot collide
        let _ = graph.add_vertex_with_id(ROOT, 0);
        Self {
            graph,
            pes: vec![ProcessingElement::dummy(ROOT)],
        }
    }

    pub fn graph(&self) -> &LlyrGraph<usize> {
        &self.graph
    }

    pub fn pe(&self, id: PeId) -> &ProcessingElement {
        &self.pes[self.graph.vertex(id).payload]
    }

    pub fn pe_mut(&mut self, id: PeId) -> &mut ProcessingElement {
        let slot = self.graph.vertex(id).payload;
        &mut self.pes[slot]
    }

    /// The element's id doubles as its vertex id.
    pub fn add_pe(&mut self, pe: ProcessingElement) -> Result<PeId, GraphError> {
        let id = self.graph.add_vertex_with_id(pe.id(), self.pes.len())?;
        self.pes.push(pe);
        Ok(id)
    }

    /// Add the edge `src -> dst` and bind the queue pair behind it. Returns `Ok(false)`, binding
    /// nothing, when the edge already exists.
    pub fn connect(
        &mut self,
        src: PeId,
        dst: PeId,
        input: InputBinding,
        out_tag: Option<RouteTag>,
    ) -> Result<bool, GraphError> {
        if !self.graph.add_edge(src, dst, None)? {
            return Ok(false);
        }
        let queue = match input {
            InputBinding::Operand(arg) => PeQueue::operand(src, arg),
            InputBinding::Routed(tag) => PeQueue::routed(src, tag),
        };
        self.pe_mut(dst).add_input_queue(queue, src);
        self.pe_mut(src).add_output_queue(out_tag, dst);
        Ok(true)
    }

    /// Pre-fill an operand queue that no neighbour feeds.
    pub fn seed(&mut self, id: PeId, arg: u32, tokens: &[LlyrData]) {
        self.pe_mut(id).add_seed_queue(arg, tokens);
    }

    /// Hang every vertex the root cannot reach off the root, so each sweep visits all of them.
    /// Returns how many root edges were added.
    pub fn link_orphans(&mut self) -> usize {
        let mut linked = 0;
        let sources: Vec<VertexId> = self
            .graph
            .iter()
            .filter(|(id, v)| *id != ROOT && v.in_degree() == 0)
            .map(|(id, _)| id)
            .collect();
        for id in sources {
            if let Ok(true) = self.graph.add_edge(ROOT, id, None) {
                linked += 1;
            }
        }

        // vertices only fed from inside an unreachable cycle
        loop {
            let reachable: HashSet<VertexId> = self.graph.bfs(ROOT).collect();
            let Some(id) = self.graph.vertex_ids().find(|id| !reachable.contains(id)) else {
                break;
            };
            if let Ok(true) = self.graph.add_edge(ROOT, id, None) {
                linked += 1;
            }
        }
        linked
    }

    pub fn into_parts(self) -> (LlyrGraph<usize>, Vec<ProcessingElement>) {
        (self.graph, self.pes)
    }

    /// Same topology with each vertex labelled by its operation, for diagnostics.
    pub fn labelled(&self) -> LlyrGraph<String> {
        self.graph.map(|_, slot| self.pes[*slot].op().to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppNode {
    pub id: PeId,
    pub op: String,
    pub constant: Option<i64>,
    pub stride: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppEdge {
    pub src: PeId,
    pub dst: PeId,
    pub arg: Option<u32>,
    pub route: Option<String>,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppSeed {
    pub node: PeId,
    pub arg: u32,
    pub values: Vec<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppGraphDesc {
    #[serde(default, rename = "node")]
    pub nodes: Vec<AppNode>,
    #[serde(default, rename = "edge")]
    pub edges: Vec<AppEdge>,
    #[serde(default, rename = "seed")]
    pub seeds: Vec<AppSeed>,
}

impl AppGraphDesc {
    pub fn from_toml(text: &str) -> Result<Self, anyhow::Error> {
        toml::from_str(text).context("cannot parse application graph")
    }

    pub fn load(path: &Path) -> Result<Self, anyhow::Error> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read application graph {}", path.display()))?;
        Self::from_toml(&text)
    }
}

#[derive(Default)]
struct RouteTable {
    tags: HashMap<String, RouteTag>,
}

impl RouteTable {
    fn intern(&mut self, name: &str) -> RouteTag {
        let next = RouteTag(self.tags.len() as u32);
        *self.tags.entry(name.to_string()).or_insert(next)
    }

    fn name(&self, tag: RouteTag) -> &str {
        self.tags
            .iter()
            .find(|(_, t)| **t == tag)
            .map_or("?", |(name, _)| name.as_str())
    }
}

/// Build the element graph for `app`. Setup mistakes in the description are fatal errors.
pub fn map(app: &AppGraphDesc, config: &LlyrConfig) -> Result<MappedGraph, anyhow::Error> {
    let mut mapped = MappedGraph::new();
    let mut routes = RouteTable::default();

    for node in &app.nodes {
        if node.id == ROOT {
            bail!("node id {} is reserved for the root", ROOT);
        }
        let op = OpType::from_mnemonic(&node.op)
            .ok_or_else(|| anyhow!("node {}: unknown operation '{}'", node.id, node.op))?;
        if op.needs_constant() && node.constant.is_none() {
            bail!("node {}: {} needs a constant", node.id, op);
        }
        let pe = ProcessingElement::build(
            node.id,
            op,
            config,
            node.constant.map(LlyrData::from_i64),
            node.stride.unwrap_or(DEFAULT_STRIDE),
        );
        mapped
            .add_pe(pe)
            .with_context(|| format!("cannot place node {}", node.id))?;
    }

    for edge in &app.edges {
        let input = match (edge.arg, &edge.route) {
            (Some(arg), None) => InputBinding::Operand(arg),
            (None, Some(name)) => InputBinding::Routed(routes.intern(name)),
            _ => bail!("edge {} -> {}: needs exactly one of `arg` or `route`", edge.src, edge.dst),
        };
        let out_tag = edge.tag.as_deref().map(|name| routes.intern(name));
        let added = mapped
            .connect(edge.src, edge.dst, input, out_tag)
            .with_context(|| format!("cannot wire edge {} -> {}", edge.src, edge.dst))?;
        if !added {
            bail!("edge {} -> {} appears twice", edge.src, edge.dst);
        }
    }

    for seed in &app.seeds {
        if seed.node == ROOT || !mapped.graph().contains(seed.node) {
            bail!("seed targets unknown node {}", seed.node);
        }
        let tokens: Vec<LlyrData> = seed.values.iter().copied().map(LlyrData::from_i64).collect();
        mapped.seed(seed.node, seed.arg, &tokens);
    }

    for node in &app.nodes {
        check_operands(mapped.pe(node.id))?;
        check_routes(mapped.pe(node.id), &routes)?;
    }

    let linked = mapped.link_orphans();
    debug!("mapper: {} root edges", linked);
    info!(
        "mapped {} elements, {} edges, {} routes",
        mapped.graph().num_vertices() - 1,
        mapped.graph().num_edges(),
        routes.tags.len()
    );
    Ok(mapped)
}

/// Every routed input needs an output carrying the same tag, or its tokens would have nowhere to go.
fn check_routes(pe: &ProcessingElement, routes: &RouteTable) -> Result<(), anyhow::Error> {
    for input in pe.inputs().iter().filter(|q| q.is_routed()) {
        let Some(tag) = input.route else { continue };
        if !pe.outputs().iter().any(|out| out.route == Some(tag)) {
            bail!(
                "node {} ({}): route '{}' has no outgoing edge with that tag",
                pe.id(),
                pe.op(),
                routes.name(tag)
            );
        }
    }
    Ok(())
}

/// Operand positions must be dense from 0 and match what the operation consumes.
fn check_operands(pe: &ProcessingElement) -> Result<(), anyhow::Error> {
    let mut args: Vec<u32> = pe
        .inputs()
        .iter()
        .filter(|q| q.is_operand())
        .filter_map(|q| q.argument)
        .collect();
    args.sort_unstable();
    if args.iter().enumerate().any(|(i, arg)| *arg != i as u32) {
        bail!("node {} ({}): operand positions {:?} are not 0..n", pe.id(), pe.op(), args);
    }
    if !pe.op().arity().accepts(args.len()) {
        bail!(
            "node {} ({}): {} operands bound, expected {:?}",
            pe.id(),
            pe.op(),
            args.len(),
            pe.op().arity()
        );
    }
    Ok(())
}
