use crate::core::errors::MeasurementError;
use crate::core::utils::{self, ONE};
use ndarray::{Array1, Array2};
use num_complex::Complex64;

/// A labelled set of measurement operators on `num_qubits` qubits.
#[derive(Clone, Debug)]
pub struct Measurement {
    pub operators: Vec<Array2<Complex64>>,
    /// `labels[k]` names the outcome of `operators[k]`.
    pub labels: Vec<String>,
    pub num_qubits: usize,
}

impl Measurement {
    pub fn new(
        operators: Vec<Array2<Complex64>>,
        labels: Vec<String>,
    ) -> Result<Self, MeasurementError> {
        if operators.len() != labels.len() {
            return Err(MeasurementError::CountMismatch {
                ops: operators.len(),
                labels: labels.len(),
            });
        }
        let shape = operators
            .first()
            .ok_or(MeasurementError::InvalidDimensions)?
            .dim();
        let (rows, cols) = shape;
        if rows != cols || !rows.is_power_of_two() || operators.iter().any(|m| m.dim() != shape) {
            return Err(MeasurementError::InvalidDimensions);
        }
        if !utils::is_complete(&operators, rows) {
            return Err(MeasurementError::NotComplete);
        }
        Ok(Self {
            operators,
            labels,
            num_qubits: rows.trailing_zeros() as usize,
        })
    }

    /// Operators lifted onto a `num_total_qubits` register, in label order.
    pub fn get_expanded_operators(
        &self,
        num_total_qubits: usize,
        targets: &[usize],
    ) -> Result<Vec<Array2<Complex64>>, MeasurementError> {
        if targets.len() != self.num_qubits {
            return Err(MeasurementError::TargetMismatch {
                expected: self.num_qubits,
                got: targets.len(),
            });
        }
        Ok(self
            .operators
            .iter()
            .map(|m| utils::embed_operator(num_total_qubits, m, targets, &[]))
            .collect())
    }

    /// Projectors onto every basis state of `num_qubits` qubits.
    ///
    /// The projector onto local index `k` is labelled
    /// `utils::outcome_label(k, num_qubits)`, so labels read in target order.
    pub fn computational(num_qubits: usize) -> Measurement {
        let dim = 1 << num_qubits;
        let (operators, labels) = (0..dim)
            .map(|k| {
                let mut basis = Array1::<Complex64>::zeros(dim);
                basis[k] = ONE;
                (
                    utils::outer_product(&basis, &basis),
                    utils::outcome_label(k, num_qubits),
                )
            })
            .unzip();
        Measurement::new(operators, labels).expect("basis projectors are complete")
    }
}
