use crate::core::Gate;
use crate::core::channels::QuantumChannel;
use crate::core::errors::{ChannelError, MeasurementError, StateError};
use crate::core::measurements::Measurement;
use crate::core::utils::{ONE, dagger, find_duplicate, trace};
use ndarray::Array2;
use num_complex::Complex64;

/// Mixed state of a small register, stored as its density matrix.
#[derive(Clone, Debug)]
pub struct QuantumState {
    pub density_matrix: Array2<Complex64>,
    pub num_qubits: usize,
}

// A run multiplies a dozen operators together, so this is looser than 1e-12.
const TRACE_TOLERANCE: f64 = 1e-9;

/// `K ρ K†`
fn sandwich(k: &Array2<Complex64>, rho: &Array2<Complex64>) -> Array2<Complex64> {
    k.dot(rho).dot(&dagger(k))
}

impl QuantumState {
    /// `|0..0⟩⟨0..0|` on `num_qubits` qubits.
    pub fn new(num_qubits: usize) -> Self {
        let dim = 1 << num_qubits;
        let mut density_matrix = Array2::<Complex64>::zeros((dim, dim));
        density_matrix[[0, 0]] = ONE;
        Self {
            density_matrix,
            num_qubits,
        }
    }

    fn dim(&self) -> usize {
        1 << self.num_qubits
    }

    /// Square, power-of-two sized and unit trace.
    pub fn is_valid(&self) -> Result<(), StateError> {
        let (rows, cols) = self.density_matrix.dim();
        if rows != cols {
            return Err(StateError::DimensionMismatch {
                expected: rows,
                got_rows: rows,
                got_cols: cols,
            });
        }
        if !rows.is_power_of_two() {
            return Err(StateError::InvalidDimensions);
        }
        let tr = trace(&self.density_matrix);
        if (tr - ONE).norm() > TRACE_TOLERANCE {
            return Err(StateError::InvalidTrace(tr));
        }
        Ok(())
    }

    fn check_qubits(&self, qubits: &[usize]) -> Result<(), StateError> {
        match qubits.iter().find(|&&q| q >= self.num_qubits) {
            Some(&index) => Err(StateError::IndexOutOfBounds {
                index,
                num_qubits: self.num_qubits,
            }),
            None => Ok(()),
        }
    }

    pub fn apply(&mut self, gate: &Gate, target_qubits: &[usize]) -> Result<(), StateError> {
        self.apply_controlled(gate, target_qubits, None)
    }

    /// Applies `gate` to `target_qubits`, conditioned on every control qubit being 1.
    pub fn apply_controlled(
        &mut self,
        gate: &Gate,
        target_qubits: &[usize],
        control_qubits: Option<&[usize]>,
    ) -> Result<(), StateError> {
        if gate.num_qubits != target_qubits.len() {
            return Err(StateError::DimensionMismatch {
                expected: gate.num_qubits,
                got_rows: target_qubits.len(),
                got_cols: 0,
            });
        }
        let controls = control_qubits.unwrap_or(&[]);
        self.check_qubits(target_qubits)?;
        self.check_qubits(controls)?;

        let full = Gate::expand_gate(self.num_qubits, gate, target_qubits, controls)?;
        if full.matrix.dim() != (self.dim(), self.dim()) {
            let (got_rows, got_cols) = full.matrix.dim();
            return Err(StateError::DimensionMismatch {
                expected: self.dim(),
                got_rows,
                got_cols,
            });
        }
        self.density_matrix = sandwich(&full.matrix, &self.density_matrix);
        Ok(())
    }

    /// Probability of each outcome of `measurement` on `target_qubits`, in label order.
    ///
    /// The state is left untouched. Probabilities are renormalized so they sum to 1.
    pub fn outcome_probabilities(
        &self,
        measurement: &Measurement,
        target_qubits: &[usize],
    ) -> Result<Vec<f64>, StateError> {
        self.check_qubits(target_qubits)?;
        if let Some(q) = find_duplicate(target_qubits) {
            return Err(MeasurementError::DuplicateQubit(q).into());
        }

        let ops = measurement.get_expanded_operators(self.num_qubits, target_qubits)?;
        let mut probs: Vec<f64> = ops
            .iter()
            .map(|m| trace(&sandwich(m, &self.density_matrix)).re.max(0.0))
            .collect();

        let total: f64 = probs.iter().sum();
        if total <= 1e-12 {
            return Err(StateError::InvalidTrace(Complex64::new(total, 0.0)));
        }
        probs.iter_mut().for_each(|p| *p /= total);
        Ok(probs)
    }

    /// `ρ → Σ K ρ K†` over the channel's Kraus operators.
    pub fn apply_channel(
        &mut self,
        channel: &QuantumChannel,
        target_qubits: &[usize],
    ) -> Result<(), StateError> {
        if let Some(q) = find_duplicate(target_qubits) {
            return Err(ChannelError::DuplicateQubit(q).into());
        }
        self.check_qubits(target_qubits)?;

        let dim = self.dim();
        let rho = &self.density_matrix;
        let evolved = channel
            .get_expanded_operators(self.num_qubits, target_qubits)?
            .iter()
            .fold(Array2::<Complex64>::zeros((dim, dim)), |acc, k| acc + sandwich(k, rho));
        self.density_matrix = evolved;
        Ok(())
    }
}
