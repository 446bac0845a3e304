use logic_playground::{assert_verilog_eq, circuit::GateKind, netlist::Netlist};

#[test]
fn min_module() {
    let mut netlist = Netlist::new("min_module".to_string());
    let a = netlist.add_input();
    let y = netlist.add_output();
    netlist.connect(a, y, 0).unwrap();
    assert_verilog_eq!(
        netlist.to_string(),
        format!(
            "module min_module (
               {a},
               {y}
             );
               input {a};
               wire {a};
               output {y};
               wire {y};
               assign {y} = {a};
             endmodule\n"
        )
    );
}

#[test]
fn demo_and_module() {
    let netlist = Netlist::demo_and().unwrap();
    let [a, b] = [0, 1].map(|i| netlist.inputs().nth(i).unwrap());
    let and = netlist.gates().next().unwrap();
    let y = netlist.outputs().next().unwrap();
    assert_verilog_eq!(
        netlist.to_string(),
        format!(
            "module demo_and (
               {a},
               {b},
               {y}
             );
               input {a};
               wire {a};
               input {b};
               wire {b};
               output {y};
               wire {y};
               wire {and};
               and u_{and} ({and}, {a}, {b});
               assign {y} = {and};
             endmodule\n"
        )
    );
}

#[test]
fn missing_drivers_print_as_zero() {
    let mut netlist = Netlist::new("floating".to_string());
    let a = netlist.add_input();
    let gone = netlist.add_input();
    let xor = netlist.add_gate(GateKind::Xor);
    let not = netlist.add_gate(GateKind::Not);
    let y = netlist.add_output();
    netlist.connect(a, xor, 0).unwrap();
    netlist.connect(gone, xor, 1).unwrap();
    netlist.connect(xor, not, 0).unwrap();
    netlist.remove_element(gone).unwrap();
    assert_verilog_eq!(
        netlist.to_string(),
        format!(
            "module floating (
               {a},
               {y}
             );
               input {a};
               wire {a};
               output {y};
               wire {y};
               wire {xor};
               wire {not};
               xor u_{xor} ({xor}, {a}, 1'b0);
               not u_{not} ({not}, {xor});
               assign {y} = 1'b0;
             endmodule\n"
        )
    );
}

#[test]
fn empty_module() {
    let netlist = Netlist::new("empty".to_string());
    assert_verilog_eq!(netlist.to_string(), "module empty (\n);\nendmodule\n");
}
