use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt::{Debug, Display};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;
use thiserror::Error;

pub type VertexId = u32;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("vertex {0} already exists")]
    DuplicateVertex(VertexId),
    #[error("vertex {0} does not exist")]
    MissingVertex(VertexId),
    #[error("no vertex id left after {0}")]
    IdsExhausted(VertexId),
}

/// Optional per-edge property, only used by diagnostic exporters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeWeight(pub f32);

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub dst: VertexId,
    pub weight: Option<EdgeWeight>,
}

#[derive(Debug, Clone)]
pub struct Vertex<T> {
    pub payload: T,
    in_degree: u32,
    out_degree: u32,
    adjacency: Vec<Edge>,
}

impl<T> Vertex<T> {
    fn new(payload: T) -> Self {
        Self {
            payload,
            in_degree: 0,
            out_degree: 0,
            adjacency: Vec::new(),
        }
    }

    pub fn in_degree(&self) -> u32 {
        self.in_degree
    }

    pub fn out_degree(&self) -> u32 {
        self.out_degree
    }

    /// Outgoing edges in insertion order.
    pub fn adjacency(&self) -> &[Edge] {
        &self.adjacency
    }
}

/// Directed graph keyed by externally assigned, possibly sparse, vertex ids. Cycles are allowed.
#[derive(Debug, Clone)]
pub struct LlyrGraph<T> {
    vertices: BTreeMap<VertexId, Vertex<T>>,
}

impl<T> Default for LlyrGraph<T> {
    fn default() -> Self {
        Self {
            vertices: BTreeMap::new(),
        }
    }
}

impl<T> LlyrGraph<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> Result<VertexId, GraphError> {
        match self.vertices.keys().next_back() {
            None => Ok(0),
            Some(&max) => max.checked_add(1).ok_or(GraphError::IdsExhausted(max)),
        }
    }

    /// Insert with the next free id (one past the current maximum).
    pub fn add_vertex(&mut self, payload: T) -> Result<VertexId, GraphError> {
        let id = self.next_id()?;
        self.vertices.insert(id, Vertex::new(payload));
        Ok(id)
    }

    pub fn add_vertex_with_id(&mut self, id: VertexId, payload: T) -> Result<VertexId, GraphError> {
        if self.vertices.contains_key(&id) {
            return Err(GraphError::DuplicateVertex(id));
        }
        self.vertices.insert(id, Vertex::new(payload));
        Ok(id)
    }

    /// Returns `Ok(false)` when the edge already exists; the adjacency list is left untouched.
    pub fn add_edge(
        &mut self,
        src: VertexId,
        dst: VertexId,
        weight: Option<EdgeWeight>,
    ) -> Result<bool, GraphError> {
        if !self.vertices.contains_key(&dst) {
            return Err(GraphError::MissingVertex(dst));
        }
        let source = self
            .vertices
            .get_mut(&src)
            .ok_or(GraphError::MissingVertex(src))?;
        if source.adjacency.iter().any(|edge| edge.dst == dst) {
            return Ok(false);
        }
        source.adjacency.push(Edge { dst, weight });
        source.out_degree += 1;
        if let Some(sink) = self.vertices.get_mut(&dst) {
            sink.in_degree += 1;
        }
        Ok(true)
    }

    pub fn has_edge(&self, src: VertexId, dst: VertexId) -> bool {
        self.try_vertex(src)
            .is_some_and(|v| v.adjacency.iter().any(|edge| edge.dst == dst))
    }

    pub fn try_vertex(&self, id: VertexId) -> Option<&Vertex<T>> {
        self.vertices.get(&id)
    }

    /// Panics on an unknown id: callers only ever hold ids handed out by this graph.
    pub fn vertex(&self, id: VertexId) -> &Vertex<T> {
        self.vertices
            .get(&id)
            .unwrap_or_else(|| panic!("vertex {} not in graph", id))
    }

    pub fn vertex_mut(&mut self, id: VertexId) -> &mut Vertex<T> {
        self.vertices
            .get_mut(&id)
            .unwrap_or_else(|| panic!("vertex {} not in graph", id))
    }

    pub fn contains(&self, id: VertexId) -> bool {
        self.vertices.contains_key(&id)
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_edges(&self) -> usize {
        self.vertices.values().map(|v| v.adjacency.len()).sum()
    }

    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        self.vertices.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VertexId, &Vertex<T>)> + '_ {
        self.vertices.iter().map(|(id, v)| (*id, v))
    }

    pub fn bfs(&self, root: VertexId) -> Bfs<'_, T> {
        Bfs::new(self, root)
    }

    /// Same ids and edges, payloads transformed by `f`.
    pub fn map<U>(&self, mut f: impl FnMut(VertexId, &T) -> U) -> LlyrGraph<U> {
        let vertices = self
            .vertices
            .iter()
            .map(|(id, v)| {
                let vertex = Vertex {
                    payload: f(*id, &v.payload),
                    in_degree: v.in_degree,
                    out_degree: v.out_degree,
                    adjacency: v.adjacency.clone(),
                };
                (*id, vertex)
            })
            .collect();
        LlyrGraph { vertices }
    }

    /// Deep copy of `src` into `self` under fresh ids. Returns the old-to-new id map.
    pub fn copy_graph(&mut self, src: &LlyrGraph<T>) -> Result<HashMap<VertexId, VertexId>, GraphError>
    where
        T: Clone,
    {
        let mut remap = HashMap::with_capacity(src.num_vertices());
        for (old, vertex) in src.iter() {
            remap.insert(old, self.add_vertex(vertex.payload.clone())?);
        }
        for (old, vertex) in src.iter() {
            for edge in vertex.adjacency() {
                // both ends were just inserted
                let _ = self.add_edge(remap[&old], remap[&edge.dst], edge.weight);
            }
        }
        Ok(remap)
    }
}

impl<T: Debug> LlyrGraph<T> {
    pub fn print_graph(&self) {
        for (id, vertex) in self.iter() {
            let dsts: Vec<_> = vertex.adjacency.iter().map(|e| e.dst).collect();
            info!("vertex {} ({:?}) in:{} out:{} -> {:?}", id, vertex.payload, vertex.in_degree, vertex.out_degree, dsts);
        }
    }
}

impl<T: Display> LlyrGraph<T> {
    pub fn write_dot<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "digraph G {{")?;
        for (id, vertex) in self.iter() {
            writeln!(out, "  {} [label=\"{}: {}\"];", id, id, vertex.payload)?;
        }
        for (id, vertex) in self.iter() {
            for edge in &vertex.adjacency {
                match edge.weight {
                    Some(EdgeWeight(w)) => writeln!(out, "  {} -> {} [weight={}];", id, edge.dst, w)?,
                    None => writeln!(out, "  {} -> {};", id, edge.dst)?,
                }
            }
        }
        writeln!(out, "}}")
    }

    pub fn print_dot(&self, path: &Path) -> std::io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write_dot(&mut out)?;
        out.flush()
    }
}

/// Breadth-first walk. Visited marks live here, so no state leaks between traversals.
pub struct Bfs<'a, T> {
    graph: &'a LlyrGraph<T>,
    queue: VecDeque<VertexId>,
    visited: HashSet<VertexId>,
}

impl<'a, T> Bfs<'a, T> {
    fn new(graph: &'a LlyrGraph<T>, root: VertexId) -> Self {
        let mut queue = VecDeque::new();
        let mut visited = HashSet::new();
        if graph.contains(root) {
            queue.push_back(root);
            visited.insert(root);
        }
        Self { graph, queue, visited }
    }
}

impl<T> Iterator for Bfs<'_, T> {
    type Item = VertexId;

    fn next(&mut self) -> Option<VertexId> {
        let id = self.queue.pop_front()?;
        for edge in self.graph.vertex(id).adjacency() {
            if self.visited.insert(edge.dst) {
                self.queue.push_back(edge.dst);
            }
        }
        Some(id)
    }
}
