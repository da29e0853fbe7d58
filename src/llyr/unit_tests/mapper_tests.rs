use crate::llyr::data::LlyrData;
use crate::llyr::mapper::{map, AppGraphDesc, InputBinding, MappedGraph, ROOT};
use crate::llyr::optype::{IntOp, OpType};
use crate::llyr::pe::{ProcessingElement, RouteTag};
use crate::sim::config::LlyrConfig;

fn make_mapped(text: &str) -> Result<MappedGraph, anyhow::Error> {
    let app = AppGraphDesc::from_toml(text)?;
    map(&app, &LlyrConfig::default())
}

const CHAIN: &str = r#"
[[node]]
id = 1
op = "ld"

[[node]]
id = 2
op = "ADDCONST"
constant = -1

[[edge]]
src = 1
dst = 2
arg = 0

[[seed]]
node = 1
arg = 0
values = [64, 72]
"#;

#[test]
fn chain_is_wired_and_hung_off_the_root() {
    let mapped = make_mapped(CHAIN).unwrap();
    let graph = mapped.graph();
    assert_eq!(3, graph.num_vertices());
    assert!(graph.has_edge(ROOT, 1));
    assert!(!graph.has_edge(ROOT, 2));
    assert!(graph.has_edge(1, 2));

    let load = mapped.pe(1);
    assert_eq!(OpType::from_mnemonic("LD").unwrap(), load.op());
    assert_eq!(2, load.input(0).len());
    assert_eq!(Some(0), load.output_queue_id(2));
    assert_eq!(2, load.load_target());

    let add = mapped.pe(2);
    assert_eq!(OpType::IntConst(IntOp::Add), add.op());
    assert_eq!(Some(0), add.input_queue_id(1));
    assert_eq!(Some(0), add.input(0).argument);
    assert_eq!(OpType::Dummy, mapped.pe(ROOT).op());
}

#[test]
fn labelled_graph_names_operations() {
    let mapped = make_mapped(CHAIN).unwrap();
    let labels = mapped.labelled();
    assert_eq!("DUMMY", labels.vertex(ROOT).payload);
    assert_eq!("ADDCONST", labels.vertex(2).payload);
}

#[test]
fn unknown_mnemonic_is_fatal() {
    let err = make_mapped("[[node]]\nid = 1\nop = \"FMA\"\n").unwrap_err();
    assert!(err.to_string().contains("unknown operation"));
}

#[test]
fn root_id_is_reserved() {
    assert!(make_mapped("[[node]]\nid = 0\nop = \"ADD\"\n").is_err());
}

#[test]
fn duplicate_node_is_fatal() {
    let text = "[[node]]\nid = 1\nop = \"INC\"\n[[node]]\nid = 1\nop = \"INC\"\n";
    assert!(make_mapped(text).is_err());
}

#[test]
fn missing_constant_is_fatal() {
    assert!(make_mapped("[[node]]\nid = 1\nop = \"SUBCONST\"\n").is_err());
}

#[test]
fn operand_count_must_match_operation() {
    let text = r#"
[[node]]
id = 1
op = "SUB"

[[seed]]
node = 1
arg = 0
values = [1]
"#;
    let err = make_mapped(text).unwrap_err();
    assert!(err.to_string().contains("operands bound"));
}

#[test]
fn operand_positions_must_be_dense() {
    let text = r#"
[[node]]
id = 1
op = "NOT"

[[seed]]
node = 1
arg = 1
values = [1]
"#;
    assert!(make_mapped(text).is_err());
}

#[test]
fn edge_needs_exactly_one_binding() {
    let text = r#"
[[node]]
id = 1
op = "INC"

[[node]]
id = 2
op = "NOT"

[[edge]]
src = 1
dst = 2
arg = 0
route = "r"
"#;
    assert!(make_mapped(text).is_err());
}

#[test]
fn duplicate_edge_is_fatal() {
    let text = r#"
[[node]]
id = 1
op = "INC"

[[node]]
id = 2
op = "ADD"

[[edge]]
src = 1
dst = 2
arg = 0

[[edge]]
src = 1
dst = 2
arg = 1
"#;
    let err = make_mapped(text).unwrap_err();
    assert!(err.to_string().contains("appears twice"));
}

#[test]
fn route_names_share_one_tag() {
    let text = r#"
[[node]]
id = 1
op = "INC"

[[node]]
id = 2
op = "ROUTE"

[[node]]
id = 3
op = "NOT"

[[edge]]
src = 1
dst = 2
route = "west"

[[edge]]
src = 2
dst = 3
arg = 0
tag = "west"

[[seed]]
node = 1
arg = 0
values = [1]
"#;
    let mapped = make_mapped(text).unwrap();
    let router = mapped.pe(2);
    assert!(router.input(0).is_routed());
    assert_eq!(router.input(0).route, router.output(0).route);
    assert_eq!(0, router.num_operands());
    assert!(!mapped.pe(1).output(0).is_routed());
}

#[test]
fn route_without_matching_output_is_rejected() {
    let text = r#"
[[node]]
id = 1
op = "ADDCONST"
constant = 1

[[node]]
id = 2
op = "NOT"

[[node]]
id = 3
op = "NOT"

[[edge]]
src = 1
dst = 2
route = "x"

[[edge]]
src = 2
dst = 3
arg = 0

[[edge]]
src = 3
dst = 2
arg = 0

[[seed]]
node = 1
arg = 0
values = [5]
"#;
    let err = make_mapped(text).unwrap_err();
    assert!(err.to_string().contains("route 'x'"), "{}", err);
}

#[test]
fn unreachable_cycle_gets_a_root_edge() {
    let text = r#"
[[node]]
id = 1
op = "MERGE"

[[node]]
id = 2
op = "ADDCONST"
constant = 1

[[edge]]
src = 1
dst = 2
arg = 0

[[edge]]
src = 2
dst = 1
arg = 0
"#;
    let mapped = make_mapped(text).unwrap();
    assert!(mapped.graph().has_edge(ROOT, 1));
    assert!(!mapped.graph().has_edge(ROOT, 2));
    assert_eq!(3, mapped.graph().bfs(ROOT).count());
}

#[test]
fn manual_wiring_binds_both_ends() {
    let config = LlyrConfig::default();
    let mut mapped = MappedGraph::new();
    mapped.add_pe(ProcessingElement::new(5, OpType::Int(IntOp::Mul), &config)).unwrap();
    mapped.add_pe(ProcessingElement::new(6, OpType::Int(IntOp::Mul), &config)).unwrap();
    assert!(mapped.add_pe(ProcessingElement::dummy(5)).is_err());

    assert_eq!(Ok(true), mapped.connect(5, 6, InputBinding::Operand(1), Some(RouteTag(3))));
    assert_eq!(Ok(false), mapped.connect(5, 6, InputBinding::Operand(0), None));
    assert_eq!(1, mapped.pe(6).inputs().len());
    assert_eq!(Some(RouteTag(3)), mapped.pe(5).output(0).route);

    mapped.seed(6, 0, &[LlyrData(2)]);
    assert_eq!(2, mapped.pe(6).num_operands());
    assert_eq!(1, mapped.link_orphans());
    assert!(mapped.graph().has_edge(ROOT, 5));
}
