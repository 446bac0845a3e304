/*!

  Graph analyses over the wiring of a circuit.

*/

use crate::circuit::{Element, ElementId, WireId};
use crate::netlist::{CircuitError, Netlist};
#[cfg(feature = "graph")]
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

/// A common trait of analyses than can be performed on a circuit.
/// An analysis borrows the circuit, so it cannot outlive the next mutation.
pub trait Analysis<'a>
where
    Self: Sized + 'a,
{
    /// Construct the analysis to the current state of the circuit.
    fn build(netlist: &'a Netlist) -> Result<Self, CircuitError>;
}

/// A table that maps elements to the wires they drive and pins to the wires that drive them.
/// Only live wires are recorded.
pub struct FanOutTable<'a> {
    // A reference to the underlying circuit
    _netlist: &'a Netlist,
    /// Maps an element to the wires leaving it
    fan_out: HashMap<ElementId, Vec<WireId>>,
    /// Maps an element to the wires ending at it
    fan_in: HashMap<ElementId, Vec<WireId>>,
    /// Maps a (target, pin) pair to the wire ending there
    pin_driver: HashMap<(ElementId, usize), WireId>,
}

impl<'a> FanOutTable<'a> {
    /// Builds the table. This never fails.
    pub fn new(netlist: &'a Netlist) -> Self {
        let mut fan_out: HashMap<ElementId, Vec<WireId>> = HashMap::new();
        let mut fan_in: HashMap<ElementId, Vec<WireId>> = HashMap::new();
        let mut pin_driver = HashMap::new();

        for (id, wire) in netlist.wires().filter(|(_, w)| netlist.is_live(w)) {
            fan_out.entry(wire.source()).or_default().push(id);
            fan_in.entry(wire.target()).or_default().push(id);
            if let Entry::Vacant(e) = pin_driver.entry((wire.target(), wire.pin())) {
                e.insert(id);
            }
        }

        Self {
            _netlist: netlist,
            fan_out,
            fan_in,
            pin_driver,
        }
    }

    /// Returns an iterator to the wires driven by `id`.
    pub fn get_users(&self, id: ElementId) -> impl Iterator<Item = WireId> + '_ {
        self.fan_out
            .get(&id)
            .into_iter()
            .flat_map(|users| users.iter().copied())
    }

    /// Returns an iterator to the wires ending at `id`.
    pub fn get_drivers(&self, id: ElementId) -> impl Iterator<Item = WireId> + '_ {
        self.fan_in
            .get(&id)
            .into_iter()
            .flat_map(|drivers| drivers.iter().copied())
    }

    /// Returns the wire ending at pin `pin` of `target`
    pub fn get_driver(&self, target: ElementId, pin: usize) -> Option<WireId> {
        self.pin_driver.get(&(target, pin)).copied()
    }

    /// Returns `true` if `id` drives at least one live wire
    pub fn has_uses(&self, id: ElementId) -> bool {
        self.fan_out.get(&id).is_some_and(|users| !users.is_empty())
    }
}

impl<'a> Analysis<'a> for FanOutTable<'a> {
    fn build(netlist: &'a Netlist) -> Result<Self, CircuitError> {
        Ok(Self::new(netlist))
    }
}

/// The logic level of every element. Inputs sit at level 0 and a gate sits one level above its
/// deepest driver; probes take the level of their driver.
/// Building this analysis fails on a feedback loop.
pub struct CombDepth<'a> {
    // A reference to the underlying circuit
    _netlist: &'a Netlist,
    // Maps an element to its logic level
    comb_depth: HashMap<ElementId, usize>,
    /// Gates sorted by level, then by creation
    gate_order: Vec<ElementId>,
    /// The maximum depth of the circuit
    max_depth: usize,
}

impl CombDepth<'_> {
    /// Returns the logic level of an element.
    pub fn get_comb_depth(&self, id: ElementId) -> Option<usize> {
        self.comb_depth.get(&id).copied()
    }

    /// Returns the maximum logic level of the circuit.
    pub fn get_max_depth(&self) -> usize {
        self.max_depth
    }

    /// Returns the gates ordered so that every gate follows the gates driving it
    pub fn gate_order(&self) -> Vec<ElementId> {
        self.gate_order.clone()
    }
}

impl<'a> Analysis<'a> for CombDepth<'a> {
    fn build(netlist: &'a Netlist) -> Result<Self, CircuitError> {
        let fan_out = FanOutTable::new(netlist);
        let drivers = |id: ElementId| -> Vec<ElementId> {
            fan_out
                .get_drivers(id)
                .filter_map(|w| netlist.wire(w))
                .map(|w| w.source())
                .collect()
        };

        let mut comb_depth: HashMap<ElementId, usize> = HashMap::new();
        let mut on_path: HashSet<ElementId> = HashSet::new();

        for (root, _) in netlist.elements() {
            // Post-order walk towards the inputs: (element, drivers already queued)
            let mut stack = vec![(root, false)];
            while let Some((id, expanded)) = stack.pop() {
                if expanded {
                    on_path.remove(&id);
                    let deepest = drivers(id)
                        .into_iter()
                        .filter_map(|d| comb_depth.get(&d).copied())
                        .max();
                    let depth = match netlist.element(id) {
                        Some(Element::Gate(_)) => deepest.unwrap_or(0) + 1,
                        _ => deepest.unwrap_or(0),
                    };
                    comb_depth.insert(id, depth);
                    continue;
                }
                if comb_depth.contains_key(&id) {
                    continue;
                }
                if !on_path.insert(id) {
                    return Err(CircuitError::Cycle(id));
                }
                stack.push((id, true));
                for driver in drivers(id) {
                    if !comb_depth.contains_key(&driver) {
                        stack.push((driver, false));
                    }
                }
            }
        }

        let mut gate_order: Vec<ElementId> = netlist.gates().collect();
        gate_order.sort_by_key(|id| (comb_depth.get(id).copied().unwrap_or(0), *id));

        let max_depth = comb_depth.values().max().copied().unwrap_or(0);

        Ok(CombDepth {
            _netlist: netlist,
            comb_depth,
            gate_order,
            max_depth,
        })
    }
}

/// A petgraph view of the circuit: one node per element, one edge per live wire.
#[cfg(feature = "graph")]
pub struct MultiDiGraph<'a> {
    _netlist: &'a Netlist,
    graph: DiGraph<ElementId, WireId>,
    mapping: HashMap<ElementId, NodeIndex>,
}

#[cfg(feature = "graph")]
impl MultiDiGraph<'_> {
    /// Return a reference to the graph constructed by this analysis
    pub fn get_graph(&self) -> &DiGraph<ElementId, WireId> {
        &self.graph
    }

    /// Returns the graph node of an element
    pub fn node_index(&self, id: ElementId) -> Option<NodeIndex> {
        self.mapping.get(&id).copied()
    }

    /// Returns `true` if the wiring contains a feedback loop
    pub fn is_cyclic(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }
}

#[cfg(feature = "graph")]
impl<'a> Analysis<'a> for MultiDiGraph<'a> {
    fn build(netlist: &'a Netlist) -> Result<Self, CircuitError> {
        let mut mapping = HashMap::new();
        let mut graph = DiGraph::new();

        for (id, _) in netlist.elements() {
            mapping.insert(id, graph.add_node(id));
        }

        for (id, wire) in netlist.wires().filter(|(_, w)| netlist.is_live(w)) {
            let s_id = mapping[&wire.source()];
            let t_id = mapping[&wire.target()];
            graph.add_edge(s_id, t_id, id);
        }

        Ok(Self {
            _netlist: netlist,
            graph,
            mapping,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::GateKind;

    fn half_adder() -> (Netlist, [ElementId; 4]) {
        let mut netlist = Netlist::new("half_adder".to_string());
        let a = netlist.add_input();
        let b = netlist.add_input();
        let sum = netlist.add_gate(GateKind::Xor);
        let carry = netlist.add_gate(GateKind::And);
        for gate in [sum, carry] {
            netlist.connect(a, gate, 0).unwrap();
            netlist.connect(b, gate, 1).unwrap();
        }
        (netlist, [a, b, sum, carry])
    }

    #[test]
    fn fanout_table() {
        let (netlist, [a, b, sum, carry]) = half_adder();
        let analysis = netlist.get_analysis::<FanOutTable>().unwrap();
        assert_eq!(analysis.get_users(a).count(), 2);
        assert_eq!(analysis.get_users(b).count(), 2);
        assert!(!analysis.has_uses(sum));
        assert_eq!(analysis.get_drivers(carry).count(), 2);
        let driver = analysis.get_driver(carry, 1).unwrap();
        assert_eq!(netlist.wire(driver).unwrap().source(), b);
        assert_eq!(analysis.get_driver(carry, 2), None);
    }

    #[test]
    fn fanout_skips_dangling_wires() {
        let mut netlist = Netlist::default();
        let a = netlist.add_input();
        let gone = netlist.add_output();
        netlist.remove_element(gone).unwrap();
        netlist.connect(a, gone, 0).unwrap();
        let analysis = netlist.get_analysis::<FanOutTable>().unwrap();
        assert!(!analysis.has_uses(a));
    }
}
