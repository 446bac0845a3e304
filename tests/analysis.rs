use logic_playground::circuit::{ElementId, GateKind};
use logic_playground::graph::{CombDepth, FanOutTable};
use logic_playground::netlist::{CircuitError, Netlist};

/// a, b -> XOR -> NOT -> y
fn two_levels() -> (Netlist, [ElementId; 5]) {
    let mut netlist = Netlist::new("two_levels".to_string());
    let a = netlist.add_input();
    let b = netlist.add_input();
    let xor = netlist.add_gate(GateKind::Xor);
    let not = netlist.add_gate(GateKind::Not);
    let y = netlist.add_output();
    netlist.connect(a, xor, 0).unwrap();
    netlist.connect(b, xor, 1).unwrap();
    netlist.connect(xor, not, 0).unwrap();
    netlist.connect(not, y, 0).unwrap();
    (netlist, [a, b, xor, not, y])
}

#[test]
fn test_comb_depth() {
    let (netlist, [a, b, xor, not, y]) = two_levels();
    let depth_info = netlist.get_analysis::<CombDepth>();
    assert!(depth_info.is_ok());
    let depth_info = depth_info.unwrap();

    assert_eq!(depth_info.get_comb_depth(a), Some(0));
    assert_eq!(depth_info.get_comb_depth(b), Some(0));
    assert_eq!(depth_info.get_comb_depth(xor), Some(1));
    assert_eq!(depth_info.get_comb_depth(not), Some(2));
    assert_eq!(depth_info.get_comb_depth(y), Some(2));
    assert_eq!(depth_info.get_max_depth(), 2);
    assert_eq!(depth_info.gate_order(), vec![xor, not]);
}

#[test]
fn test_gate_order_ignores_creation_order() {
    let mut netlist = Netlist::new("reversed".to_string());
    let last = netlist.add_gate(GateKind::Not);
    let first = netlist.add_gate(GateKind::Not);
    let a = netlist.add_input();
    netlist.connect(a, first, 0).unwrap();
    netlist.connect(first, last, 0).unwrap();
    let depth_info = netlist.get_analysis::<CombDepth>().unwrap();
    assert_eq!(depth_info.gate_order(), vec![first, last]);
}

#[test]
fn test_detect_cycles() {
    let (mut netlist, [_, _, xor, not, _]) = two_levels();
    assert!(netlist.get_analysis::<CombDepth>().is_ok());

    // Feed the inverter back into the XOR
    let b_wire = netlist.wire_into(xor, 1).unwrap();
    netlist.disconnect(b_wire).unwrap();
    netlist.connect(not, xor, 1).unwrap();
    let err = netlist.get_analysis::<CombDepth>().err().unwrap();
    assert!(matches!(err, CircuitError::Cycle(id) if id == xor || id == not));
}

#[test]
fn test_fan_out() {
    let (netlist, [a, b, xor, not, y]) = two_levels();
    let fan_out = netlist.get_analysis::<FanOutTable>().unwrap();
    assert!(fan_out.has_uses(a));
    assert!(fan_out.has_uses(b));
    assert!(!fan_out.has_uses(y));
    assert_eq!(fan_out.get_drivers(xor).count(), 2);
    let users: Vec<_> = fan_out
        .get_users(xor)
        .filter_map(|w| netlist.wire(w))
        .map(|w| w.target())
        .collect();
    assert_eq!(users, vec![not]);
}

#[cfg(feature = "graph")]
#[test]
fn test_petgraph() {
    use logic_playground::graph::MultiDiGraph;

    let (mut netlist, [_, _, xor, not, _]) = two_levels();

    let petgraph = netlist.get_analysis::<MultiDiGraph>();
    assert!(petgraph.is_ok());
    let petgraph = petgraph.unwrap();
    let graph = petgraph.get_graph();
    assert_eq!(graph.node_count(), 5);
    assert_eq!(graph.edge_count(), 4);
    assert!(!petgraph.is_cyclic());
    assert!(petgraph.node_index(xor).is_some());

    netlist.connect(not, not, 3).unwrap();
    // Pin 3 does not exist on a NOT gate, so the wire is not an edge
    let petgraph = netlist.get_analysis::<MultiDiGraph>().unwrap();
    assert_eq!(petgraph.get_graph().edge_count(), 4);

    let b_wire = netlist.wire_into(xor, 1).unwrap();
    netlist.disconnect(b_wire).unwrap();
    netlist.connect(not, xor, 1).unwrap();
    let petgraph = netlist.get_analysis::<MultiDiGraph>().unwrap();
    assert!(petgraph.is_cyclic());
}

#[cfg(feature = "serde")]
#[test]
fn test_serialize_snapshot() {
    let netlist = Netlist::demo_and().unwrap();
    let mut buf = Vec::new();
    netlist.serialize_snapshot(&mut buf).unwrap();
    let json: serde_json::Value = serde_json::from_slice(&buf).unwrap();
    assert_eq!(json["elements"].as_array().unwrap().len(), 4);
    assert_eq!(json["wires"].as_array().unwrap().len(), 3);
    assert_eq!(json["elements"][2]["kind"], "AND");
    assert_eq!(json["elements"][2]["inputs"], serde_json::json!([false, false]));
    assert_eq!(json["wires"][0]["live"], true);
}
