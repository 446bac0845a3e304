#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs, unreachable_pub)]
/*!

`logic-playground`

A small combinational logic simulator. A [netlist::Netlist] holds toggleable inputs, gates and
output probes joined by pin-addressed wires; the [eval::Evaluator] refreshes every derived value
after each mutation.

## Simple Example
```
use logic_playground::{circuit::GateKind, netlist::Netlist};

let mut netlist = Netlist::new("example".to_string());

// Two inputs feeding an AND gate that drives a probe
let a = netlist.add_input();
let b = netlist.add_input();
let and = netlist.add_gate(GateKind::And);
let probe = netlist.add_output();
netlist.connect(a, and, 0).unwrap();
netlist.connect(b, and, 1).unwrap();
netlist.connect(and, probe, 0).unwrap();

netlist.toggle_input(a).unwrap();
netlist.toggle_input(b).unwrap();
assert_eq!(netlist.probe_value(probe), Some(true));

// A second wire into the same pin is refused
assert!(netlist.connect(b, and, 0).is_err());

println!("{netlist}");
```

*/

pub mod circuit;
pub mod eval;
pub mod graph;
pub mod netlist;
pub mod util;
