/*!

  API for building and querying a logic circuit.

*/

use crate::{
    circuit::{Element, ElementId, Gate, GateKind, InputNode, OutputNode, Position, Wire, WireId},
    eval::{EvalConfig, Evaluator},
    graph::{Analysis, FanOutTable},
};
use bitvec::slice::BitSlice;
use std::collections::BTreeMap;
use tracing::debug;

/// Errors reported by the mutation API. None of them leave the circuit changed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CircuitError {
    /// Another wire already terminates at this pin
    #[error("pin {pin} of {target} is already driven by {wire}")]
    PinOccupied {
        /// The element whose pin was requested
        target: ElementId,
        /// The requested pin
        pin: usize,
        /// The wire occupying the pin
        wire: WireId,
    },
    /// The identifier does not resolve to a live element
    #[error("no element {0} in the circuit")]
    UnknownElement(ElementId),
    /// The element exists but is not an input
    #[error("{0} is not an input")]
    NotAnInput(ElementId),
    /// A feedback loop passes through this element
    #[error("combinational cycle through {0}")]
    Cycle(ElementId),
}

/// A circuit of inputs, gates and output probes joined by pin-addressed wires.
///
/// Elements and wires live in identity-keyed tables. Identifiers are minted in increasing order,
/// so iteration follows creation order. Every mutation re-runs the [Evaluator] before it returns,
/// unless auto-evaluation is turned off in the [EvalConfig].
#[derive(Debug, Clone)]
pub struct Netlist {
    /// The name of the circuit, used as the module name when printed
    name: String,
    /// Inputs, gates and probes
    pub(crate) elements: BTreeMap<ElementId, Element>,
    /// Wires between elements
    pub(crate) wires: BTreeMap<WireId, Wire>,
    evaluator: Evaluator,
}

impl Default for Netlist {
    fn default() -> Self {
        Self::new("playground".to_string())
    }
}

impl Netlist {
    /// Creates an empty circuit with the default evaluator
    pub fn new(name: String) -> Self {
        Self::with_config(name, EvalConfig::default())
    }

    /// Creates an empty circuit evaluated according to `config`
    pub fn with_config(name: String, config: EvalConfig) -> Self {
        Self {
            name,
            elements: BTreeMap::new(),
            wires: BTreeMap::new(),
            evaluator: Evaluator::new(config),
        }
    }

    /// Builds the two-input AND demo circuit: two inputs wired into an AND gate that drives a probe.
    pub fn demo_and() -> Result<Self, CircuitError> {
        let mut netlist = Self::new("demo_and".to_string());
        let a = netlist.add_input_at(Position::new(100.0, 80.0));
        let b = netlist.add_input_at(Position::new(100.0, 150.0));
        let and = netlist.add_gate_at(GateKind::And, Position::new(350.0, 100.0));
        let probe = netlist.add_output_at(Position::new(800.0, 80.0));
        netlist.connect(a, and, 0)?;
        netlist.connect(b, and, 1)?;
        netlist.connect(and, probe, 0)?;
        Ok(netlist)
    }

    /// Returns the name of the circuit
    pub fn get_name(&self) -> &str {
        &self.name
    }

    /// Returns the configuration of the evaluator
    pub fn config(&self) -> &EvalConfig {
        self.evaluator.config()
    }

    /// Recomputes every gate pin, gate output, probe value and wire value.
    pub fn evaluate(&mut self) {
        let evaluator = self.evaluator;
        evaluator.evaluate(self);
    }

    fn refresh(&mut self) {
        if self.config().auto_evaluate() {
            self.evaluate();
        }
    }

    fn insert_element(&mut self, element: Element) -> ElementId {
        let id = ElementId::fresh();
        self.elements.insert(id, element);
        self.refresh();
        id
    }

    /// Adds an input set to `false`
    pub fn add_input(&mut self) -> ElementId {
        self.add_input_at(Position::default())
    }

    /// Adds an input set to `false`, drawn at `position`
    pub fn add_input_at(&mut self, position: Position) -> ElementId {
        self.insert_element(Element::Input(InputNode::new(position)))
    }

    /// Adds an output probe
    pub fn add_output(&mut self) -> ElementId {
        self.add_output_at(Position::default())
    }

    /// Adds an output probe, drawn at `position`
    pub fn add_output_at(&mut self, position: Position) -> ElementId {
        self.insert_element(Element::Output(OutputNode::new(position)))
    }

    /// Adds a gate of the given kind
    pub fn add_gate(&mut self, kind: GateKind) -> ElementId {
        self.add_gate_at(kind, Position::default())
    }

    /// Adds a gate of the given kind, drawn at `position`
    pub fn add_gate_at(&mut self, kind: GateKind, position: Position) -> ElementId {
        self.insert_element(Element::Gate(Gate::new(kind, position)))
    }

    /// Connects the output of `source` to pin `pin` of `target`.
    ///
    /// Fails with [CircuitError::PinOccupied] if a wire already ends at that pin. The endpoints
    /// are not checked: a wire to or from a missing element is created but carries nothing.
    pub fn connect(
        &mut self,
        source: ElementId,
        target: ElementId,
        pin: usize,
    ) -> Result<WireId, CircuitError> {
        if let Some(wire) = self.wire_into(target, pin) {
            debug!(%source, %target, pin, %wire, "pin is already connected");
            return Err(CircuitError::PinOccupied { target, pin, wire });
        }
        let id = WireId::fresh();
        self.wires.insert(id, Wire::new(source, target, pin));
        self.refresh();
        Ok(id)
    }

    /// Removes a wire, returning it if it existed.
    pub fn disconnect(&mut self, wire: WireId) -> Option<Wire> {
        let removed = self.wires.remove(&wire);
        self.refresh();
        removed
    }

    /// Flips an input and returns its new value.
    pub fn toggle_input(&mut self, id: ElementId) -> Result<bool, CircuitError> {
        let value = !self.input_node(id)?.value();
        self.set_input(id, value)?;
        Ok(value)
    }

    /// Sets an input to `value`.
    pub fn set_input(&mut self, id: ElementId, value: bool) -> Result<(), CircuitError> {
        match self.elements.get_mut(&id) {
            Some(Element::Input(input)) => input.set_value(value),
            Some(_) => return Err(CircuitError::NotAnInput(id)),
            None => return Err(CircuitError::UnknownElement(id)),
        }
        self.refresh();
        Ok(())
    }

    fn input_node(&self, id: ElementId) -> Result<&InputNode, CircuitError> {
        match self.elements.get(&id) {
            Some(Element::Input(input)) => Ok(input),
            Some(_) => Err(CircuitError::NotAnInput(id)),
            None => Err(CircuitError::UnknownElement(id)),
        }
    }

    /// Stores a new position for an element. Positions never affect evaluation.
    pub fn move_element(&mut self, id: ElementId, position: Position) -> Result<(), CircuitError> {
        self.elements
            .get_mut(&id)
            .ok_or(CircuitError::UnknownElement(id))?
            .set_position(position);
        Ok(())
    }

    /// Removes an element together with every wire that starts or ends at it.
    pub fn remove_element(&mut self, id: ElementId) -> Result<Element, CircuitError> {
        let element = self
            .elements
            .remove(&id)
            .ok_or(CircuitError::UnknownElement(id))?;
        self.wires
            .retain(|_, wire| wire.source() != id && wire.target() != id);
        self.refresh();
        Ok(element)
    }

    /// Removes every element and wire.
    pub fn clear(&mut self) {
        self.elements.clear();
        self.wires.clear();
        debug!(name = %self.name, "cleared circuit");
        self.refresh();
    }

    /// Returns the value driven by an input or gate.
    /// Probes and unknown identifiers read `false`.
    pub fn get_output_value(&self, id: ElementId) -> bool {
        self.elements
            .get(&id)
            .map(Element::output_value)
            .unwrap_or(false)
    }

    /// Returns the element with identifier `id`
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    /// Returns the wire with identifier `id`
    pub fn wire(&self, id: WireId) -> Option<&Wire> {
        self.wires.get(&id)
    }

    /// Returns the cached input pins of a gate
    pub fn gate_inputs(&self, id: ElementId) -> Option<&BitSlice> {
        self.element(id).and_then(Element::as_gate).map(Gate::inputs)
    }

    /// Returns the value shown by a probe
    pub fn probe_value(&self, id: ElementId) -> Option<bool> {
        match self.element(id)? {
            Element::Output(probe) => Some(probe.value()),
            _ => None,
        }
    }

    /// Returns the value a wire carried at the last evaluation
    pub fn wire_value(&self, id: WireId) -> Option<bool> {
        self.wire(id).map(Wire::value)
    }

    /// Returns the wire that ends at pin `pin` of `target`, if any.
    pub fn wire_into(&self, target: ElementId, pin: usize) -> Option<WireId> {
        self.wires
            .iter()
            .find(|(_, wire)| wire.target() == target && wire.pin() == pin)
            .map(|(id, _)| *id)
    }

    /// Returns `true` if a wire ends at pin `pin` of `target`
    pub fn is_pin_occupied(&self, target: ElementId, pin: usize) -> bool {
        self.wire_into(target, pin).is_some()
    }

    /// Returns `true` if both ends of the wire resolve and the pin exists on the target
    pub fn is_live(&self, wire: &Wire) -> bool {
        let source = self.element(wire.source()).is_some_and(Element::is_source);
        let target = self
            .element(wire.target())
            .is_some_and(|t| wire.pin() < t.input_arity());
        source && target
    }

    /// Returns an iterator over the elements in creation order
    pub fn elements(&self) -> impl Iterator<Item = (ElementId, &Element)> {
        self.elements.iter().map(|(id, e)| (*id, e))
    }

    /// Returns an iterator over the wires in creation order
    pub fn wires(&self) -> impl Iterator<Item = (WireId, &Wire)> {
        self.wires.iter().map(|(id, w)| (*id, w))
    }

    /// Returns an iterator over the inputs
    pub fn inputs(&self) -> impl Iterator<Item = ElementId> {
        self.elements()
            .filter(|(_, e)| matches!(e, Element::Input(_)))
            .map(|(id, _)| id)
    }

    /// Returns an iterator over the gates
    pub fn gates(&self) -> impl Iterator<Item = ElementId> {
        self.elements()
            .filter(|(_, e)| matches!(e, Element::Gate(_)))
            .map(|(id, _)| id)
    }

    /// Returns an iterator over the output probes
    pub fn outputs(&self) -> impl Iterator<Item = ElementId> {
        self.elements()
            .filter(|(_, e)| matches!(e, Element::Output(_)))
            .map(|(id, _)| id)
    }

    /// Returns the number of elements
    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    /// Returns the number of wires
    pub fn num_wires(&self) -> usize {
        self.wires.len()
    }

    /// Returns `true` if the circuit has no elements and no wires
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty() && self.wires.is_empty()
    }

    /// Runs an analysis on the current state of the circuit
    pub fn get_analysis<'a, A: Analysis<'a>>(&'a self) -> Result<A, CircuitError> {
        A::build(self)
    }

    /// Returns a read-only view of every element and wire, for rendering
    pub fn snapshot(&self) -> Snapshot {
        let elements = self
            .elements()
            .map(|(id, element)| {
                let (value, inputs) = match element {
                    Element::Input(input) => (input.value(), Vec::new()),
                    Element::Gate(gate) => (gate.output(), gate.inputs().iter().by_vals().collect()),
                    Element::Output(probe) => (probe.value(), Vec::new()),
                };
                ElementView {
                    id,
                    kind: element.kind_name(),
                    position: element.position(),
                    value,
                    inputs,
                }
            })
            .collect();
        let wires = self
            .wires()
            .map(|(id, wire)| WireView {
                id,
                source: wire.source(),
                target: wire.target(),
                pin: wire.pin(),
                value: wire.value(),
                live: self.is_live(wire),
            })
            .collect();
        Snapshot { elements, wires }
    }

    #[cfg(feature = "serde")]
    /// Writes the rendering snapshot as JSON.
    pub fn serialize_snapshot(&self, writer: impl std::io::Write) -> Result<(), serde_json::Error> {
        serde_json::to_writer_pretty(writer, &self.snapshot())
    }
}

/// The cached state of one element, as a front end would draw it
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct ElementView {
    /// Identifier of the element
    pub id: ElementId,
    /// `"INPUT"`, `"OUTPUT"` or the gate kind
    pub kind: String,
    /// Stored position
    pub position: Position,
    /// Input value, gate output or probe value
    pub value: bool,
    /// Gate input pins, empty for inputs and probes
    pub inputs: Vec<bool>,
}

/// The cached state of one wire
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct WireView {
    /// Identifier of the wire
    pub id: WireId,
    /// Driving element
    pub source: ElementId,
    /// Driven element
    pub target: ElementId,
    /// Pin on the driven element
    pub pin: usize,
    /// Carried value
    pub value: bool,
    /// `false` if an endpoint dangles or the pin does not exist. Front ends skip these.
    pub live: bool,
}

/// A read-only picture of a circuit after evaluation
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct Snapshot {
    /// Elements in creation order
    pub elements: Vec<ElementView>,
    /// Wires in creation order
    pub wires: Vec<WireView>,
}

/// Name of the net driven by `id`, or a constant zero if nothing resolvable drives it.
fn driver_name(netlist: &Netlist, source: Option<ElementId>) -> String {
    match source {
        Some(id) if netlist.element(id).is_some_and(Element::is_source) => id.to_string(),
        _ => "1'b0".to_string(),
    }
}

impl std::fmt::Display for Netlist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fan_out = FanOutTable::new(self);
        let pin_source = |target: ElementId, pin: usize| {
            fan_out
                .get_driver(target, pin)
                .and_then(|w| self.wire(w))
                .map(Wire::source)
        };

        let level = 2;
        let indent = " ".repeat(level);
        let ports: Vec<ElementId> = self.inputs().chain(self.outputs()).collect();

        writeln!(f, "module {} (", self.name)?;
        for (i, port) in ports.iter().enumerate() {
            if i == ports.len() - 1 {
                writeln!(f, "{indent}{port}")?;
            } else {
                writeln!(f, "{indent}{port},")?;
            }
        }
        writeln!(f, ");")?;

        for input in self.inputs() {
            writeln!(f, "{indent}input {input};")?;
            writeln!(f, "{indent}wire {input};")?;
        }
        for output in self.outputs() {
            writeln!(f, "{indent}output {output};")?;
            writeln!(f, "{indent}wire {output};")?;
        }
        for gate in self.gates() {
            writeln!(f, "{indent}wire {gate};")?;
        }

        for (id, element) in self.elements() {
            if let Element::Gate(gate) = element {
                let operands = (0..gate.arity())
                    .map(|pin| driver_name(self, pin_source(id, pin)))
                    .collect::<Vec<_>>()
                    .join(", ");
                writeln!(
                    f,
                    "{indent}{} u_{id} ({id}, {operands});",
                    gate.kind().verilog_primitive()
                )?;
            }
        }

        for output in self.outputs() {
            writeln!(
                f,
                "{indent}assign {output} = {};",
                driver_name(self, pin_source(output, 0))
            )?;
        }

        writeln!(f, "endmodule")
    }
}
