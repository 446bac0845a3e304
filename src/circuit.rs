/*!

  Entities of a combinational circuit: inputs, gates, output probes and the wires between them.

*/

use bitvec::{slice::BitSlice, vec::BitVec};
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies an input, gate or output probe. Identifiers are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct ElementId(u64);

impl ElementId {
    pub(crate) fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw counter value behind this identifier
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Identifies a wire. Identifiers are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct WireId(u64);

impl WireId {
    pub(crate) fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw counter value behind this identifier
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for WireId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// Where the front end draws an element. The core never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub struct Position {
    /// Horizontal coordinate
    pub x: f32,
    /// Vertical coordinate
    pub y: f32,
}

impl Position {
    /// Creates a new position
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// The boolean function computed by a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(::serde::Serialize))]
pub enum GateKind {
    /// Both inputs true
    And,
    /// At least one input true
    Or,
    /// Negation of the single input
    Not,
    /// Exactly one input true
    Xor,
    /// Negation of AND
    Nand,
    /// Negation of OR
    Nor,
    /// Inputs equal
    Xnor,
}

impl GateKind {
    /// Every gate kind, in toolbox order
    pub const ALL: [GateKind; 7] = [
        GateKind::And,
        GateKind::Or,
        GateKind::Not,
        GateKind::Xor,
        GateKind::Nand,
        GateKind::Nor,
        GateKind::Xnor,
    ];

    /// Returns the number of input pins. NOT has one, every other kind has two.
    pub fn arity(&self) -> usize {
        match self {
            GateKind::Not => 1,
            _ => 2,
        }
    }

    /// Computes the gate output. Pins missing from `inputs` read as `false`.
    pub fn eval(&self, inputs: &BitSlice) -> bool {
        let pin = |i: usize| inputs.get(i).map(|b| *b).unwrap_or(false);
        let (a, b) = (pin(0), pin(1));
        match self {
            GateKind::And => a && b,
            GateKind::Or => a || b,
            GateKind::Not => !a,
            GateKind::Xor => a ^ b,
            GateKind::Nand => !(a && b),
            GateKind::Nor => !(a || b),
            GateKind::Xnor => a == b,
        }
    }

    /// Returns the truth table of the gate. Bit `i` holds the output when pin `k` is bit `k` of `i`.
    pub fn truth_table(&self) -> BitVec {
        let arity = self.arity();
        (0..1usize << arity)
            .map(|row| {
                let inputs: BitVec = (0..arity).map(|k| row & (1 << k) != 0).collect();
                self.eval(&inputs)
            })
            .collect()
    }

    /// Returns the name of the matching Verilog gate primitive
    pub fn verilog_primitive(&self) -> &'static str {
        match self {
            GateKind::And => "and",
            GateKind::Or => "or",
            GateKind::Not => "not",
            GateKind::Xor => "xor",
            GateKind::Nand => "nand",
            GateKind::Nor => "nor",
            GateKind::Xnor => "xnor",
        }
    }
}

impl std::fmt::Display for GateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.verilog_primitive().to_uppercase())
    }
}

/// Returned when a string names no gate kind
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown gate kind `{0}`")]
pub struct UnknownGateKind(pub String);

impl std::str::FromStr for GateKind {
    type Err = UnknownGateKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GateKind::ALL
            .into_iter()
            .find(|k| k.verilog_primitive().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownGateKind(s.to_string()))
    }
}

/// A toggleable signal source. Its value is set by the user, never derived.
#[derive(Debug, Clone, PartialEq)]
pub struct InputNode {
    position: Position,
    value: bool,
}

impl InputNode {
    pub(crate) fn new(position: Position) -> Self {
        Self {
            position,
            value: false,
        }
    }

    /// Returns the value driven by this input
    pub fn value(&self) -> bool {
        self.value
    }

    pub(crate) fn set_value(&mut self, value: bool) {
        self.value = value;
    }
}

/// A combinational gate. Its pins and output are a cache of the last evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Gate {
    kind: GateKind,
    position: Position,
    inputs: BitVec,
    output: bool,
}

impl Gate {
    pub(crate) fn new(kind: GateKind, position: Position) -> Self {
        Self {
            kind,
            position,
            inputs: BitVec::repeat(false, kind.arity()),
            output: false,
        }
    }

    /// Returns the kind of gate
    pub fn kind(&self) -> GateKind {
        self.kind
    }

    /// Returns the number of input pins
    pub fn arity(&self) -> usize {
        self.kind.arity()
    }

    /// Returns the cached input pin values
    pub fn inputs(&self) -> &BitSlice {
        &self.inputs
    }

    /// Returns the cached value of input pin `pin`, if the pin exists
    pub fn input(&self, pin: usize) -> Option<bool> {
        self.inputs.get(pin).map(|b| *b)
    }

    /// Returns the cached output value
    pub fn output(&self) -> bool {
        self.output
    }

    /// Writes `value` into pin `pin`. Returns `false` and changes nothing when the pin does not exist.
    pub(crate) fn drive_pin(&mut self, pin: usize, value: bool) -> bool {
        match self.inputs.get_mut(pin) {
            Some(mut slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub(crate) fn reset_inputs(&mut self) {
        self.inputs.fill(false);
    }

    /// Recomputes the output from the cached pins and returns it
    pub(crate) fn compute(&mut self) -> bool {
        self.output = self.kind.eval(&self.inputs);
        self.output
    }
}

/// A display probe with a single input pin
#[derive(Debug, Clone, PartialEq)]
pub struct OutputNode {
    position: Position,
    value: bool,
}

impl OutputNode {
    pub(crate) fn new(position: Position) -> Self {
        Self {
            position,
            value: false,
        }
    }

    /// Returns the value shown by the probe
    pub fn value(&self) -> bool {
        self.value
    }

    pub(crate) fn set_value(&mut self, value: bool) {
        self.value = value;
    }
}

/// A tagged union over everything that can be placed in a circuit.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// A toggleable input
    Input(InputNode),
    /// A logic gate
    Gate(Gate),
    /// An output probe
    Output(OutputNode),
}

impl Element {
    /// Returns the value this element drives onto its wires.
    /// Probes drive nothing and always read `false`.
    pub fn output_value(&self) -> bool {
        match self {
            Element::Input(input) => input.value(),
            Element::Gate(gate) => gate.output(),
            Element::Output(_) => false,
        }
    }

    /// Returns the number of input pins a wire may target
    pub fn input_arity(&self) -> usize {
        match self {
            Element::Input(_) => 0,
            Element::Gate(gate) => gate.arity(),
            Element::Output(_) => 1,
        }
    }

    /// Returns `true` if wires may start at this element
    pub fn is_source(&self) -> bool {
        !matches!(self, Element::Output(_))
    }

    /// Returns the stored position
    pub fn position(&self) -> Position {
        match self {
            Element::Input(input) => input.position,
            Element::Gate(gate) => gate.position,
            Element::Output(output) => output.position,
        }
    }

    pub(crate) fn set_position(&mut self, position: Position) {
        match self {
            Element::Input(input) => input.position = position,
            Element::Gate(gate) => gate.position = position,
            Element::Output(output) => output.position = position,
        }
    }

    /// Returns a short name for the kind of element, like `"INPUT"` or `"XOR"`
    pub fn kind_name(&self) -> String {
        match self {
            Element::Input(_) => "INPUT".to_string(),
            Element::Gate(gate) => gate.kind().to_string(),
            Element::Output(_) => "OUTPUT".to_string(),
        }
    }

    /// Returns the gate within the element, if the element is one
    pub fn as_gate(&self) -> Option<&Gate> {
        match self {
            Element::Gate(gate) => Some(gate),
            _ => None,
        }
    }
}

/// A directed connection from a source element to one input pin of a target element.
/// Endpoints are looked up by identifier and may dangle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wire {
    source: ElementId,
    target: ElementId,
    pin: usize,
    value: bool,
}

impl Wire {
    pub(crate) fn new(source: ElementId, target: ElementId, pin: usize) -> Self {
        Self {
            source,
            target,
            pin,
            value: false,
        }
    }

    /// Returns the driving element
    pub fn source(&self) -> ElementId {
        self.source
    }

    /// Returns the driven element
    pub fn target(&self) -> ElementId {
        self.target
    }

    /// Returns the input pin index on the target
    pub fn pin(&self) -> usize {
        self.pin
    }

    /// Returns the value carried at the last evaluation
    pub fn value(&self) -> bool {
        self.value
    }

    pub(crate) fn set_value(&mut self, value: bool) {
        self.value = value;
    }
}
