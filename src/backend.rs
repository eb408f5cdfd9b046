use crate::errors::BackendError;
use crate::sampler::Sampler;
use crate::{Circuit, Gate, Measurement, MeasurementDistribution, Operation, QuantumChannel, QuantumState};
use rand::RngCore;

/// Executes circuits and returns measurement statistics.
pub trait QuantumBackend: Send {
    fn name(&self) -> &str;

    /// Widest register this backend accepts.
    fn max_qubits(&self) -> usize;

    /// Runs `circuit` for `shots` shots and returns counts over all lanes.
    fn execute(
        &mut self,
        circuit: &Circuit,
        shots: usize,
        rng: &mut dyn RngCore,
    ) -> Result<MeasurementDistribution, BackendError>;
}

/// In-process backend that evolves a density matrix.
#[derive(Debug, Clone, Default)]
pub struct DensityMatrixBackend {
    sampler: Sampler,
}

/// Density matrices grow as 4^n; keep registers small.
pub const DENSITY_MATRIX_MAX_QUBITS: usize = 6;

impl DensityMatrixBackend {
    pub fn new() -> Self {
        Self {
            sampler: Sampler::new(),
        }
    }

    /// Adds a readout channel applied to every lane right before measurement.
    pub fn with_readout_channel(mut self, channel: QuantumChannel) -> Self {
        self.sampler = self.sampler.with_channel(channel);
        self
    }

    /// Evolves |0..0> through every operation preceding the final measurement.
    pub fn evolve(circuit: &Circuit) -> Result<QuantumState, BackendError> {
        let mut state = QuantumState::new(circuit.num_qubits);

        for op in &circuit.operations {
            match op {
                Operation::H(q) => state.apply(&Gate::h(), &[*q])?,
                Operation::X(q) => state.apply(&Gate::x(), &[*q])?,
                Operation::Y(q) => state.apply(&Gate::y(), &[*q])?,
                Operation::Z(q) => state.apply(&Gate::z(), &[*q])?,
                Operation::Rz { qubit, theta } => state.apply(&Gate::rz(*theta), &[*qubit])?,
                Operation::Cx { control, target } => {
                    state.apply_controlled(&Gate::x(), &[*target], Some(&[*control]))?
                }
                Operation::Channel { qubit, channel } => state.apply_channel(channel, &[*qubit])?,
                Operation::Measure => break,
            }
        }

        state.is_valid()?;
        Ok(state)
    }
}

impl QuantumBackend for DensityMatrixBackend {
    fn name(&self) -> &str {
        "density-matrix"
    }

    fn max_qubits(&self) -> usize {
        DENSITY_MATRIX_MAX_QUBITS
    }

    fn execute(
        &mut self,
        circuit: &Circuit,
        shots: usize,
        rng: &mut dyn RngCore,
    ) -> Result<MeasurementDistribution, BackendError> {
        if circuit.num_qubits > self.max_qubits() {
            return Err(BackendError::TooManyQubits {
                requested: circuit.num_qubits,
                max: self.max_qubits(),
            });
        }
        if !circuit.is_measured() {
            return Err(BackendError::MissingMeasurement);
        }

        let state = Self::evolve(circuit)?;
        let targets: Vec<usize> = (0..circuit.num_qubits).collect();
        let measurement = Measurement::computational(circuit.num_qubits);

        let counts = self
            .sampler
            .run(&state, &measurement, &targets, shots, rng)?;

        if counts.is_empty() {
            return Err(BackendError::EmptyDistribution);
        }
        Ok(counts)
    }
}
