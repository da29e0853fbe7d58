use crate::llyr::graph::{EdgeWeight, GraphError, LlyrGraph};

fn make_graph() -> LlyrGraph<&'static str> {
    // 0 -> 1 -> 3 -> 1 (cycle), 0 -> 2 -> 3
    let mut graph = LlyrGraph::new();
    for name in ["root", "a", "b", "c"] {
        graph.add_vertex(name).unwrap();
    }
    for (src, dst) in [(0, 1), (0, 2), (1, 3), (3, 1), (2, 3)] {
        assert_eq!(Ok(true), graph.add_edge(src, dst, None));
    }
    graph
}

#[test]
fn add_vertex_hands_out_dense_ids() {
    let mut graph = LlyrGraph::new();
    assert_eq!(Ok(0), graph.add_vertex(10));
    assert_eq!(Ok(1), graph.add_vertex(11));
    assert_eq!(Ok(7), graph.add_vertex_with_id(7, 17));
    assert_eq!(Ok(8), graph.add_vertex(18));
    assert_eq!(11, graph.vertex(1).payload);
    assert_eq!(17, graph.vertex(7).payload);
    assert_eq!(4, graph.num_vertices());
}

#[test]
fn add_vertex_fails_once_ids_run_out() {
    let mut graph = LlyrGraph::new();
    graph.add_vertex_with_id(0, "root").unwrap();
    graph.add_vertex_with_id(u32::MAX, "last").unwrap();
    assert_eq!(Err(GraphError::IdsExhausted(u32::MAX)), graph.add_vertex("next"));
    assert_eq!("root", graph.vertex(0).payload);
    assert_eq!(2, graph.num_vertices());
}

#[test]
fn duplicate_vertex_id_is_rejected() {
    let mut graph = LlyrGraph::new();
    graph.add_vertex_with_id(3, "first").unwrap();
    assert_eq!(Err(GraphError::DuplicateVertex(3)), graph.add_vertex_with_id(3, "second"));
    assert_eq!("first", graph.vertex(3).payload);
}

#[test]
fn duplicate_edge_is_not_added_twice() {
    let mut graph = make_graph();
    assert_eq!(Ok(false), graph.add_edge(0, 1, Some(EdgeWeight(2.0))));
    assert_eq!(2, graph.vertex(0).adjacency().len());
    assert_eq!(2, graph.vertex(0).out_degree());
    assert_eq!(2, graph.vertex(1).in_degree());
    assert_eq!(5, graph.num_edges());
}

#[test]
fn edge_to_missing_vertex_is_an_error() {
    let mut graph = make_graph();
    assert_eq!(Err(GraphError::MissingVertex(9)), graph.add_edge(0, 9, None));
    assert_eq!(Err(GraphError::MissingVertex(9)), graph.add_edge(9, 0, None));
    assert!(graph.try_vertex(9).is_none());
}

#[test]
#[should_panic]
fn vertex_lookup_of_missing_id_panics() {
    make_graph().vertex(42);
}

#[test]
fn bfs_visits_each_vertex_once_despite_cycles() {
    let graph = make_graph();
    let order: Vec<_> = graph.bfs(0).collect();
    assert_eq!(vec![0, 1, 2, 3], order);
    // no traversal state survives between walks
    assert_eq!(order, graph.bfs(0).collect::<Vec<_>>());
    assert_eq!(vec![3, 1], graph.bfs(3).collect::<Vec<_>>());
    assert_eq!(0, graph.bfs(99).count());
}

#[test]
fn copy_graph_remaps_ids_after_existing_ones() {
    let src = make_graph();
    let mut dst = LlyrGraph::new();
    dst.add_vertex("host").unwrap();
    let remap = dst.copy_graph(&src).unwrap();

    assert_eq!(5, dst.num_vertices());
    assert_eq!(1, remap[&0]);
    assert_eq!("c", dst.vertex(remap[&3]).payload);
    assert!(dst.has_edge(remap[&3], remap[&1]));
    assert!(!dst.has_edge(0, remap[&0]));
    assert_eq!(src.num_edges(), dst.num_edges());
}

#[test]
fn map_keeps_topology() {
    let graph = make_graph();
    let lengths = graph.map(|_, name| name.len());
    assert_eq!(4, lengths.vertex(0).payload);
    assert!(lengths.has_edge(3, 1));
    assert_eq!(graph.num_edges(), lengths.num_edges());
}

#[test]
fn dot_output_lists_vertices_and_edges() {
    let mut graph = make_graph();
    graph.add_edge(2, 0, Some(EdgeWeight(0.5))).unwrap();
    let mut out = Vec::new();
    graph.write_dot(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("digraph G {"));
    assert!(text.contains("  1 [label=\"1: a\"];"));
    assert!(text.contains("  3 -> 1;"));
    assert!(text.contains("  2 -> 0 [weight=0.5];"));
}
