use crate::core::channels::QuantumChannel;
use std::fmt;

/// A single step of a [`Circuit`].
#[derive(Clone, Debug)]
pub enum Operation {
    H(usize),
    X(usize),
    Y(usize),
    Z(usize),
    Rz { qubit: usize, theta: f64 },
    Cx { control: usize, target: usize },
    /// Kraus noise acting on one lane.
    Channel { qubit: usize, channel: QuantumChannel },
    /// Measures every lane in the computational basis.
    Measure,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::H(q) => write!(f, "H q{q}"),
            Operation::X(q) => write!(f, "X q{q}"),
            Operation::Y(q) => write!(f, "Y q{q}"),
            Operation::Z(q) => write!(f, "Z q{q}"),
            Operation::Rz { qubit, theta } => write!(f, "RZ({theta:.4}) q{qubit}"),
            Operation::Cx { control, target } => write!(f, "CX q{control} -> q{target}"),
            Operation::Channel { qubit, channel } => {
                write!(f, "KRAUS[{}] q{qubit}", channel.kraus_ops.len())
            }
            Operation::Measure => write!(f, "MEASURE"),
        }
    }
}

/// Ordered gate list over a fixed number of lanes.
///
/// Built once per run and consumed by a backend.
#[derive(Clone, Debug)]
pub struct Circuit {
    pub num_qubits: usize,
    pub operations: Vec<Operation>,
}

impl Circuit {
    pub fn new(num_qubits: usize) -> Self {
        Self {
            num_qubits,
            operations: Vec::new(),
        }
    }

    pub fn push(&mut self, op: Operation) -> &mut Self {
        self.operations.push(op);
        self
    }

    pub fn h(&mut self, qubit: usize) -> &mut Self {
        self.push(Operation::H(qubit))
    }

    pub fn x(&mut self, qubit: usize) -> &mut Self {
        self.push(Operation::X(qubit))
    }

    pub fn y(&mut self, qubit: usize) -> &mut Self {
        self.push(Operation::Y(qubit))
    }

    pub fn z(&mut self, qubit: usize) -> &mut Self {
        self.push(Operation::Z(qubit))
    }

    pub fn rz(&mut self, qubit: usize, theta: f64) -> &mut Self {
        self.push(Operation::Rz { qubit, theta })
    }

    pub fn cx(&mut self, control: usize, target: usize) -> &mut Self {
        self.push(Operation::Cx { control, target })
    }

    pub fn channel(&mut self, qubit: usize, channel: QuantumChannel) -> &mut Self {
        self.push(Operation::Channel { qubit, channel })
    }

    pub fn measure_all(&mut self) -> &mut Self {
        self.push(Operation::Measure)
    }

    pub fn is_measured(&self) -> bool {
        matches!(self.operations.last(), Some(Operation::Measure))
    }

    /// Number of unitary gates, channels and measurements excluded.
    pub fn gate_count(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| !matches!(op, Operation::Channel { .. } | Operation::Measure))
            .count()
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ops: Vec<String> = self.operations.iter().map(ToString::to_string).collect();
        write!(f, "[{} qubits] {}", self.num_qubits, ops.join("; "))
    }
}
