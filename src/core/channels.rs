use crate::core::Gate;
use crate::core::errors::ChannelError;
use crate::core::utils::{self, ONE, ZERO};
use ndarray::{Array2, arr2};
use num_complex::Complex64;

/// A completely positive, trace-preserving map given by its Kraus operators.
#[derive(Clone, Debug)]
pub struct QuantumChannel {
    pub kraus_ops: Vec<Array2<Complex64>>,
    pub num_qubits: usize,
}

impl QuantumChannel {
    /// Checks the operators share one `2^n` shape and satisfy `Σ K†K = I`.
    pub fn new(kraus_ops: Vec<Array2<Complex64>>) -> Result<Self, ChannelError> {
        let shape = kraus_ops.first().ok_or(ChannelError::Empty)?.dim();
        let (rows, cols) = shape;
        if rows != cols || !rows.is_power_of_two() {
            return Err(ChannelError::InvalidDimensions);
        }
        if kraus_ops.iter().any(|k| k.dim() != shape) {
            return Err(ChannelError::OperatorSizeMismatch);
        }
        if !utils::is_complete(&kraus_ops, rows) {
            return Err(ChannelError::NotComplete);
        }
        Ok(Self {
            num_qubits: rows.trailing_zeros() as usize,
            kraus_ops,
        })
    }

    /// `self` then `other`: every product `B_j A_i`.
    pub fn compose(&self, other: &QuantumChannel) -> Result<QuantumChannel, ChannelError> {
        if self.num_qubits != other.num_qubits {
            return Err(ChannelError::OperatorSizeMismatch);
        }
        let kraus_ops = other
            .kraus_ops
            .iter()
            .flat_map(|b| self.kraus_ops.iter().map(move |a| b.dot(a)))
            .collect();
        Ok(QuantumChannel {
            kraus_ops,
            num_qubits: self.num_qubits,
        })
    }

    /// Kraus operators lifted onto a `num_total_qubits` register.
    pub fn get_expanded_operators(
        &self,
        num_total_qubits: usize,
        targets: &[usize],
    ) -> Result<Vec<Array2<Complex64>>, ChannelError> {
        if targets.len() != self.num_qubits {
            return Err(ChannelError::InvalidDimensions);
        }
        Ok(self
            .kraus_ops
            .iter()
            .map(|k| utils::embed_operator(num_total_qubits, k, targets, &[]))
            .collect())
    }

    /// X, Y and Z errors with probabilities `px`, `py` and `pz`; the identity
    /// keeps what is left.
    pub fn pauli(px: f64, py: f64, pz: f64) -> Result<QuantumChannel, ChannelError> {
        for p in [px, py, pz] {
            check_probability(p)?;
        }
        let rest = 1.0 - px - py - pz;
        if rest < -1e-12 {
            return Err(ChannelError::InvalidProbability(rest));
        }

        let scaled = |m: Array2<Complex64>, p: f64| m.mapv(|z| z * p.sqrt());
        QuantumChannel::new(vec![
            scaled(Array2::eye(2), rest.max(0.0)),
            scaled(Gate::x().matrix, px),
            scaled(Gate::y().matrix, py),
            scaled(Gate::z().matrix, pz),
        ])
    }

    /// Pure dephasing: coherences shrink by `sqrt(1 - lambda)`, populations stay.
    pub fn phase_damping(lambda: f64) -> Result<QuantumChannel, ChannelError> {
        check_probability(lambda)?;
        let keep = Complex64::new((1.0 - lambda).sqrt(), 0.0);
        let lose = Complex64::new(lambda.sqrt(), 0.0);
        QuantumChannel::new(vec![
            arr2(&[[ONE, ZERO], [ZERO, keep]]),
            arr2(&[[ZERO, ZERO], [ZERO, lose]]),
        ])
    }
}

fn check_probability(p: f64) -> Result<(), ChannelError> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(ChannelError::InvalidProbability(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pauli_channel_is_trace_preserving() {
        let ch = QuantumChannel::pauli(0.1, 0.04, 0.06).unwrap();
        assert_eq!(ch.num_qubits, 1);
        assert_eq!(ch.kraus_ops.len(), 4);
        assert!(utils::is_complete(&ch.kraus_ops, 2));
    }

    #[test]
    fn pauli_rejects_overweight_errors() {
        let err = QuantumChannel::pauli(0.6, 0.3, 0.3).unwrap_err();
        assert!(matches!(err, ChannelError::InvalidProbability(_)));
    }

    #[test]
    fn composed_channel_keeps_width() {
        let a = QuantumChannel::pauli(0.1, 0.0, 0.0).unwrap();
        let b = QuantumChannel::phase_damping(0.2).unwrap();
        let c = a.compose(&b).unwrap();
        assert_eq!(c.kraus_ops.len(), 8);
        assert_eq!(c.num_qubits, 1);
        assert!(utils::is_complete(&c.kraus_ops, 2));
    }

    #[test]
    fn empty_operator_list_is_rejected() {
        assert!(matches!(
            QuantumChannel::new(Vec::new()),
            Err(ChannelError::Empty)
        ));
    }

    #[test]
    fn phase_damping_rejects_bad_lambda() {
        assert!(QuantumChannel::phase_damping(1.5).is_err());
    }
}
