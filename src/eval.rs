/*!

  Evaluation of a circuit: refreshes every derived value from the inputs and the wiring.

*/

use crate::{
    circuit::{Element, ElementId},
    graph::{Analysis, CombDepth, FanOutTable},
    netlist::Netlist,
};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace, warn};

/// The number of propagate/compute rounds run by default.
/// Chains of gates deeper than this may not settle.
pub const DEFAULT_ROUNDS: usize = 10;

/// How gate outputs are brought up to date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvalStrategy {
    /// Propagate along every wire and recompute every gate, a fixed number of rounds.
    /// Feedback loops are accepted and settle wherever the last round leaves them.
    #[default]
    Relaxation,
    /// Compute each gate once, in order of combinational depth.
    /// Falls back to [EvalStrategy::Relaxation] when the circuit has a feedback loop.
    Levelized,
}

/// Settings for the [Evaluator]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalConfig {
    rounds: usize,
    strategy: EvalStrategy,
    auto_evaluate: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            rounds: DEFAULT_ROUNDS,
            strategy: EvalStrategy::default(),
            auto_evaluate: true,
        }
    }
}

impl EvalConfig {
    /// Sets the number of relaxation rounds
    pub fn with_rounds(mut self, rounds: usize) -> Self {
        self.rounds = rounds;
        self
    }

    /// Sets the evaluation strategy
    pub fn with_strategy(mut self, strategy: EvalStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Chooses whether every mutation re-evaluates the circuit
    pub fn with_auto_evaluate(mut self, auto_evaluate: bool) -> Self {
        self.auto_evaluate = auto_evaluate;
        self
    }

    /// Returns the number of relaxation rounds
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Returns the evaluation strategy
    pub fn strategy(&self) -> EvalStrategy {
        self.strategy
    }

    /// Returns `true` if mutations re-evaluate the circuit
    pub fn auto_evaluate(&self) -> bool {
        self.auto_evaluate
    }
}

/// Computes gate pins, gate outputs, probe values and wire values.
///
/// Evaluation is total: dangling wires, missing pins and unconnected probes read `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator {
    config: EvalConfig,
}

impl Evaluator {
    /// Creates an evaluator with the given settings
    pub fn new(config: EvalConfig) -> Self {
        Self { config }
    }

    /// Returns the settings of the evaluator
    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Brings every derived value of `netlist` up to date.
    pub fn evaluate(&self, netlist: &mut Netlist) {
        reset(netlist);
        match self.config.strategy {
            EvalStrategy::Relaxation => self.relax(netlist),
            EvalStrategy::Levelized => {
                let order = CombDepth::build(netlist).map(|depth| depth.gate_order());
                match order {
                    Ok(order) => levelize(netlist, &order),
                    Err(err) => {
                        warn!(%err, "falling back to bounded relaxation");
                        self.relax(netlist);
                    }
                }
            }
        }
        settle(netlist);
        debug!(
            name = netlist.get_name(),
            elements = netlist.num_elements(),
            wires = netlist.num_wires(),
            strategy = ?self.config.strategy,
            "evaluated circuit"
        );
    }

    fn relax(&self, netlist: &mut Netlist) {
        for round in 0..self.config.rounds {
            propagate(netlist);
            compute(netlist);
            trace!(round, "relaxation round done");
        }
    }
}

/// Clears every gate pin and probe.
fn reset(netlist: &mut Netlist) {
    for element in netlist.elements.values_mut() {
        match element {
            Element::Gate(gate) => gate.reset_inputs(),
            Element::Output(probe) => probe.set_value(false),
            Element::Input(_) => (),
        }
    }
}

/// Copies every source value onto its wire and into the pin the wire ends at.
fn propagate(netlist: &mut Netlist) {
    let Netlist {
        elements, wires, ..
    } = netlist;
    for (id, wire) in wires.iter_mut() {
        let value = elements
            .get(&wire.source())
            .map(Element::output_value)
            .unwrap_or(false);
        wire.set_value(value);
        let delivered = match elements.get_mut(&wire.target()) {
            Some(Element::Gate(gate)) => gate.drive_pin(wire.pin(), value),
            Some(Element::Output(probe)) if wire.pin() == 0 => {
                probe.set_value(value);
                true
            }
            _ => false,
        };
        if !delivered {
            trace!(wire = %id, target = %wire.target(), pin = wire.pin(), "wire delivers nothing");
        }
    }
}

/// Recomputes every gate output from its cached pins.
fn compute(netlist: &mut Netlist) {
    for element in netlist.elements.values_mut() {
        if let Element::Gate(gate) = element {
            gate.compute();
        }
    }
}

/// Computes each gate once. `order` must list drivers before the gates they drive.
fn levelize(netlist: &mut Netlist, order: &[ElementId]) {
    let plan: HashMap<ElementId, Vec<(usize, ElementId)>> = {
        let fan_out = FanOutTable::new(netlist);
        order
            .iter()
            .map(|gate| {
                let drivers = fan_out
                    .get_drivers(*gate)
                    .filter_map(|w| netlist.wire(w))
                    .map(|w| (w.pin(), w.source()))
                    .collect();
                (*gate, drivers)
            })
            .collect()
    };

    for gate_id in order {
        let values: Vec<(usize, bool)> = plan
            .get(gate_id)
            .into_iter()
            .flatten()
            .map(|(pin, source)| (*pin, netlist.get_output_value(*source)))
            .collect();
        if let Some(Element::Gate(gate)) = netlist.elements.get_mut(gate_id) {
            for (pin, value) in values {
                gate.drive_pin(pin, value);
            }
            gate.compute();
        }
    }
}

/// Final pass: wires and probes take the values of the last computed gate outputs.
fn settle(netlist: &mut Netlist) {
    let Netlist {
        elements, wires, ..
    } = netlist;
    let mut probes: BTreeMap<ElementId, bool> = BTreeMap::new();
    for wire in wires.values_mut() {
        let value = elements
            .get(&wire.source())
            .map(Element::output_value)
            .unwrap_or(false);
        wire.set_value(value);
        if wire.pin() == 0 {
            probes.entry(wire.target()).or_insert(value);
        }
    }
    for (id, element) in elements.iter_mut() {
        if let Element::Output(probe) = element {
            probe.set_value(probes.get(id).copied().unwrap_or(false));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::GateKind;

    fn manual() -> EvalConfig {
        EvalConfig::default().with_auto_evaluate(false)
    }

    #[test]
    fn defaults() {
        let config = EvalConfig::default();
        assert_eq!(config.rounds(), 10);
        assert_eq!(config.strategy(), EvalStrategy::Relaxation);
        assert!(config.auto_evaluate());
    }

    #[test]
    fn manual_evaluation_waits_for_caller() {
        let mut netlist = Netlist::with_config("manual".to_string(), manual());
        let a = netlist.add_input();
        let not = netlist.add_gate(GateKind::Not);
        let o = netlist.add_output();
        netlist.connect(a, not, 0).unwrap();
        netlist.connect(not, o, 0).unwrap();
        assert_eq!(netlist.probe_value(o), Some(false));
        netlist.evaluate();
        assert_eq!(netlist.probe_value(o), Some(true));
    }

    #[test]
    fn short_round_bound_leaves_long_chain_unsettled() {
        // Gates are evaluated in creation order, so a chain created back to front only advances
        // one layer per round.
        let config = EvalConfig::default().with_rounds(1);
        let mut netlist = Netlist::with_config("lag".to_string(), config);
        let o = netlist.add_output();
        let second = netlist.add_gate(GateKind::Not);
        let first = netlist.add_gate(GateKind::Not);
        let a = netlist.add_input();
        netlist.connect(a, first, 0).unwrap();
        netlist.connect(first, second, 0).unwrap();
        netlist.connect(second, o, 0).unwrap();
        netlist.set_input(a, true).unwrap();
        // After one round `second` still sees the stale output of `first`.
        assert_eq!(netlist.probe_value(o), Some(false));
        netlist.evaluate();
        assert_eq!(netlist.probe_value(o), Some(true));

        let config = config.with_strategy(EvalStrategy::Levelized);
        let mut netlist = Netlist::with_config("levelized".to_string(), config);
        let o = netlist.add_output();
        let second = netlist.add_gate(GateKind::Not);
        let first = netlist.add_gate(GateKind::Not);
        let a = netlist.add_input();
        netlist.connect(a, first, 0).unwrap();
        netlist.connect(first, second, 0).unwrap();
        netlist.connect(second, o, 0).unwrap();
        netlist.set_input(a, true).unwrap();
        assert_eq!(netlist.probe_value(o), Some(true));
        netlist.set_input(a, false).unwrap();
        assert_eq!(netlist.probe_value(o), Some(false));
    }

    #[test]
    fn levelized_falls_back_on_cycles() {
        let config = EvalConfig::default().with_strategy(EvalStrategy::Levelized);
        let mut netlist = Netlist::with_config("ring".to_string(), config);
        let not = netlist.add_gate(GateKind::Not);
        let o = netlist.add_output();
        netlist.connect(not, not, 0).unwrap();
        netlist.connect(not, o, 0).unwrap();
        // An inverter fed by itself flips every round, so ten rounds leave it where it started.
        assert!(netlist.get_output_value(not));
        assert_eq!(netlist.probe_value(o), Some(true));
    }
}
