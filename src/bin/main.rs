use clap::Parser;
use logic_playground::{
    circuit::{Element, GateKind},
    eval::{DEFAULT_ROUNDS, EvalConfig, EvalStrategy},
    graph::CombDepth,
    netlist::{CircuitError, Netlist},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Wire two inputs through a gate into a probe and print the result", long_about = None)]
struct CliArguments {
    /// Gate placed between the inputs and the probe (AND, OR, NOT, XOR, NAND, NOR, XNOR)
    #[arg(long, default_value = "AND")]
    gate: GateKind,

    /// Drive the first input high
    #[arg(short, long)]
    a: bool,

    /// Drive the second input high. Ignored by NOT.
    #[arg(short, long)]
    b: bool,

    /// Evaluate gates in depth order instead of by bounded relaxation
    #[arg(long)]
    levelized: bool,

    /// Number of relaxation rounds
    #[arg(long, default_value_t = DEFAULT_ROUNDS)]
    rounds: usize,
}

fn build(cli: &CliArguments) -> Result<Netlist, CircuitError> {
    let strategy = if cli.levelized {
        EvalStrategy::Levelized
    } else {
        EvalStrategy::Relaxation
    };
    let config = EvalConfig::default()
        .with_rounds(cli.rounds)
        .with_strategy(strategy);
    let mut netlist = Netlist::with_config(
        format!("playground_{}", cli.gate.verilog_primitive()),
        config,
    );

    let a = netlist.add_input();
    let b = netlist.add_input();
    let gate = netlist.add_gate(cli.gate);
    let probe = netlist.add_output();

    netlist.connect(a, gate, 0)?;
    if cli.gate.arity() > 1 {
        netlist.connect(b, gate, 1)?;
    }
    netlist.connect(gate, probe, 0)?;

    netlist.set_input(a, cli.a)?;
    netlist.set_input(b, cli.b)?;
    Ok(netlist)
}

fn main() -> Result<(), CircuitError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = CliArguments::parse();
    let netlist = build(&cli)?;

    print!("{netlist}");
    println!();
    for (id, element) in netlist.elements() {
        let value = match element {
            Element::Output(probe) => probe.value(),
            other => other.output_value(),
        };
        println!("{id}\t{}\t{}", element.kind_name(), u8::from(value));
    }

    let logic_levels = netlist.get_analysis::<CombDepth>()?;
    println!("Logic levels: {}", logic_levels.get_max_depth());
    Ok(())
}
