use super::{wire, Harness};
use crate::llyr::data::LlyrData;
use crate::llyr::optype::{IntOp, OpType};
use crate::llyr::pe::{PeQueue, ProcessingElement, RouteTag};
use crate::sim::config::LlyrConfig;

fn make_adder(latency: u32, queue_depth: usize) -> ProcessingElement {
    let config = LlyrConfig {
        int_latency: latency,
        queue_depth,
        ..LlyrConfig::default()
    };
    let mut pe = ProcessingElement::new(1, OpType::Int(IntOp::Add), &config);
    wire(&mut pe, 2);
    pe
}

fn feed(pe: &mut ProcessingElement, a: u64, b: u64) {
    pe.push_input_from(100, LlyrData(a));
    pe.push_input_from(101, LlyrData(b));
}

#[test]
fn add_fires_after_latency_countdown() {
    let mut h = Harness::new();
    let mut pe = make_adder(1, 256);
    feed(&mut pe, 3, 4);

    assert!(!h.compute(&mut pe));
    assert_eq!(0, pe.cycles_to_fire());
    assert_eq!(1, pe.input(0).len());
    assert_eq!(1, pe.input(1).len());
    assert!(pe.output(0).is_empty());
    assert!(pe.pending_op());

    assert!(h.compute(&mut pe));
    assert_eq!(1, pe.output(0).len());
    assert_eq!(Some(LlyrData(7)), pe.output(0).front());
    assert_eq!(1, pe.cycles_to_fire());
}

#[test]
fn latency_l_fires_on_call_l_plus_one() {
    for latency in 0..5 {
        let mut h = Harness::new();
        let mut pe = make_adder(latency, 256);
        feed(&mut pe, 1, 1);
        for _ in 0..latency {
            assert!(!h.compute(&mut pe));
            assert!(pe.output(0).is_empty());
        }
        assert!(h.compute(&mut pe), "latency {}", latency);
        assert_eq!(Some(LlyrData(2)), pe.output(0).front());
    }
}

#[test]
fn partial_operands_keep_the_element_pending() {
    let mut h = Harness::new();
    let mut pe = make_adder(0, 256);
    pe.push_input_from(100, LlyrData(9));

    assert!(!h.compute(&mut pe));
    assert!(pe.pending_op());
    assert!(!h.compute(&mut pe));
    assert!(pe.pending_op());
    assert_eq!(2, pe.stats().operand_stalls);
    assert_eq!(1, pe.input(0).len());
}

#[test]
fn idle_element_stays_idle() {
    let mut h = Harness::new();
    let mut pe = make_adder(0, 256);
    for _ in 0..3 {
        assert!(!h.compute(&mut pe));
        assert!(!pe.pending_op());
        assert!(!pe.is_pending());
    }
}

#[test]
fn each_firing_consumes_one_token_per_operand() {
    let mut h = Harness::new();
    let mut pe = make_adder(0, 256);
    for i in 0..3 {
        feed(&mut pe, i, 10 * i);
    }
    for fired in 1..=3usize {
        assert!(h.compute(&mut pe));
        assert_eq!(3 - fired, pe.input(0).len());
        assert_eq!(3 - fired, pe.input(1).len());
        assert_eq!(fired, pe.output(0).len());
        assert_eq!(fired < 3, pe.pending_op());
    }
    let out: Vec<u64> = pe.output(0).data.iter().map(|d| d.to_ullong()).collect();
    assert_eq!(vec![0, 11, 22], out);
    assert_eq!(3, pe.stats().fired);
}

#[test]
fn full_output_queue_blocks_firing() {
    let mut h = Harness::new();
    let mut pe = make_adder(0, 2);
    for _ in 0..3 {
        feed(&mut pe, 1, 2);
    }

    assert!(h.compute(&mut pe));
    assert!(h.compute(&mut pe));
    assert!(!h.compute(&mut pe));
    assert_eq!(2, pe.output(0).len());
    assert_eq!(1, pe.input(0).len());
    assert!(pe.pending_op());
    assert_eq!(1, pe.stats().backpressure_stalls);

    // draining one slot lets the stalled firing through
    assert_eq!(1, pe.do_send().len());
    assert!(h.compute(&mut pe));
    assert_eq!(2, pe.output(0).len());
}

#[test]
fn send_moves_one_token_per_output_queue() {
    let mut h = Harness::new();
    let mut pe = make_adder(0, 256);
    pe.add_output_queue(None, 201);
    feed(&mut pe, 1, 1);
    feed(&mut pe, 2, 2);
    assert!(h.compute(&mut pe));
    assert!(h.compute(&mut pe));

    let sends = pe.do_send();
    assert_eq!(vec![(200, LlyrData(2)), (201, LlyrData(2))], sends.to_vec());
    let sends = pe.do_send();
    assert_eq!(vec![(200, LlyrData(4)), (201, LlyrData(4))], sends.to_vec());
    assert!(pe.do_send().is_empty());
    assert!(!pe.is_pending());
}

#[test]
fn routed_tokens_bypass_compute() {
    let mut h = Harness::new();
    let mut pe = make_adder(0, 1);
    pe.add_input_queue(PeQueue::routed(102, RouteTag(5)), 102);
    pe.add_output_queue(Some(RouteTag(5)), 201);
    pe.add_output_queue(Some(RouteTag(6)), 202);
    assert_eq!(2, pe.num_operands());

    pe.push_input_from(102, LlyrData(77));
    pe.push_input_from(102, LlyrData(78));
    assert!(!h.compute(&mut pe));
    assert!(pe.output(0).is_empty());
    assert_eq!(Some(LlyrData(77)), pe.output(1).front());
    assert!(pe.output(2).is_empty());
    assert!(pe.pending_op());
    assert_eq!(1, pe.stats().routed);

    assert_eq!(vec![(201, LlyrData(77))], pe.do_send().to_vec());
    assert!(!h.compute(&mut pe));
    assert_eq!(Some(LlyrData(78)), pe.output(1).front());
    assert_eq!(2, pe.stats().routed);
}

#[test]
fn routed_queue_forwards_once_per_send() {
    let mut h = Harness::new();
    let mut pe = make_adder(0, 1);
    pe.add_input_queue(PeQueue::routed(102, RouteTag(5)), 102);
    pe.add_output_queue(Some(RouteTag(5)), 201);
    pe.push_input_from(102, LlyrData(1));
    pe.push_input_from(102, LlyrData(2));

    h.compute(&mut pe);
    h.compute(&mut pe);
    assert_eq!(1, pe.output(1).len());
    assert_eq!(1, pe.input(2).len());
    assert_eq!(1, pe.stats().routed);

    pe.do_send();
    h.compute(&mut pe);
    assert_eq!(Some(LlyrData(2)), pe.output(1).front());
    assert!(pe.input(2).is_empty());
}

#[test]
#[should_panic(expected = "has no outgoing queue")]
fn routed_token_without_outlet_panics() {
    let mut h = Harness::new();
    let mut pe = make_adder(0, 4);
    pe.add_input_queue(PeQueue::routed(102, RouteTag(9)), 102);
    pe.push_input_from(102, LlyrData(1));
    h.compute(&mut pe);
}

#[test]
fn route_element_only_forwards() {
    let mut h = Harness::new();
    let mut pe = ProcessingElement::new(4, OpType::from_mnemonic("ROUTE").unwrap(), &LlyrConfig::default());
    pe.add_input_queue(PeQueue::routed(1, RouteTag(0)), 1);
    pe.add_output_queue(Some(RouteTag(0)), 5);

    assert!(!h.compute(&mut pe));
    pe.push_input_from(1, LlyrData(3));
    assert!(h.compute(&mut pe));
    assert_eq!(vec![(5, LlyrData(3))], pe.do_send().to_vec());
    assert!(!pe.is_pending());
}

#[test]
fn const_variant_takes_a_single_queue() {
    let mut h = Harness::new();
    let config = LlyrConfig { int_latency: 0, ..LlyrConfig::default() };
    let op = OpType::from_mnemonic("MULCONST").unwrap();
    let mut pe = ProcessingElement::with_constant(2, op, &config, Some(LlyrData(6)));
    wire(&mut pe, 1);
    assert_eq!(1, pe.num_operands());

    pe.push_input_from(100, LlyrData(7));
    assert!(h.compute(&mut pe));
    assert_eq!(Some(LlyrData(42)), pe.output(0).front());
}

#[test]
fn dummy_never_fires() {
    let mut h = Harness::new();
    let mut pe = ProcessingElement::dummy(0);
    assert!(!h.compute(&mut pe));
    pe.do_receive(LlyrData(1));
    assert!(!pe.is_pending());
    assert!(pe.do_send().is_empty());
}

#[test]
#[should_panic]
fn push_from_unbound_neighbour_panics() {
    let mut pe = make_adder(0, 4);
    pe.push_input_from(55, LlyrData(1));
}

#[test]
fn reset_clears_queues_and_counters() {
    let mut h = Harness::new();
    let mut pe = make_adder(2, 256);
    feed(&mut pe, 1, 1);
    assert!(!h.compute(&mut pe));
    pe.reset();
    assert_eq!(2, pe.cycles_to_fire());
    assert!(pe.input(0).is_empty());
    assert!(!pe.is_pending());
    assert_eq!(0, pe.stats().operand_stalls);
}

#[test]
fn reset_refills_seed_queues() {
    let mut h = Harness::new();
    let config = LlyrConfig { int_latency: 0, ..LlyrConfig::default() };
    let op = OpType::from_mnemonic("ADDCONST").unwrap();
    let mut pe = ProcessingElement::with_constant(3, op, &config, Some(LlyrData(1)));
    pe.add_seed_queue(0, &[LlyrData(10), LlyrData(20)]);
    pe.add_output_queue(None, 200);

    assert!(h.compute(&mut pe));
    assert!(h.compute(&mut pe));
    assert!(pe.input(0).is_empty());

    pe.reset();
    assert_eq!(2, pe.input(0).len());
    assert!(pe.output(0).is_empty());
    assert!(h.compute(&mut pe));
    assert_eq!(Some(LlyrData(11)), pe.output(0).front());
}
