use crate::core::errors::GateError;
use crate::core::utils::{self, ONE, ZERO};
use ndarray::{Array2, arr2};
use num_complex::Complex64;
use std::f64::consts::FRAC_1_SQRT_2;

/// A unitary acting on `num_qubits` qubits.
#[derive(Clone, Debug)]
pub struct Gate {
    pub matrix: Array2<Complex64>,
    pub num_qubits: usize,
}

const UNITARY_TOLERANCE: f64 = 1e-6;

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

impl Gate {
    /// Wraps `matrix` after checking it is a `2^n × 2^n` unitary.
    pub fn new(matrix: Array2<Complex64>) -> Result<Self, GateError> {
        let (rows, cols) = matrix.dim();
        if rows != cols {
            return Err(GateError::NotSquareMatrix);
        }
        if !rows.is_power_of_two() {
            return Err(GateError::InvalidDimensions);
        }
        if !is_unitary(&matrix) {
            return Err(GateError::NonUnitary);
        }
        Ok(Self {
            num_qubits: rows.trailing_zeros() as usize,
            matrix,
        })
    }

    /// Lifts `gate` onto a `num_total_qubits` register.
    ///
    /// The gate acts on `targets` whenever every qubit in `controls` is 1.
    pub fn expand_gate(
        num_total_qubits: usize,
        gate: &Gate,
        targets: &[usize],
        controls: &[usize],
    ) -> Result<Gate, GateError> {
        let duplicate = utils::find_duplicate(targets).or_else(|| utils::find_duplicate(controls));
        if let Some(q) = duplicate {
            return Err(GateError::DuplicateQubit(q));
        }
        if let Some(&q) = controls.iter().find(|q| targets.contains(q)) {
            return Err(GateError::ControlTargetOverlap(q));
        }

        let matrix = utils::embed_operator(num_total_qubits, &gate.matrix, targets, controls);
        Ok(Gate {
            matrix,
            num_qubits: num_total_qubits,
        })
    }

    // Fixed single-qubit gates are unitary by construction.
    fn single(rows: [[Complex64; 2]; 2]) -> Gate {
        Gate::new(arr2(&rows)).unwrap()
    }

    /// Bit flip.
    pub fn x() -> Gate {
        Self::single([[ZERO, ONE], [ONE, ZERO]])
    }

    pub fn y() -> Gate {
        Self::single([[ZERO, c(0.0, -1.0)], [c(0.0, 1.0), ZERO]])
    }

    /// Phase flip.
    pub fn z() -> Gate {
        Self::single([[ONE, ZERO], [ZERO, -ONE]])
    }

    pub fn h() -> Gate {
        let s = c(FRAC_1_SQRT_2, 0.0);
        Self::single([[s, s], [s, -s]])
    }

    /// `RZ(θ) = diag(e^{-iθ/2}, e^{iθ/2})`
    pub fn rz(theta: f64) -> Gate {
        let phase = Complex64::from_polar(1.0, theta / 2.0);
        Self::single([[phase.conj(), ZERO], [ZERO, phase]])
    }
}

fn is_unitary(matrix: &Array2<Complex64>) -> bool {
    let product = matrix.dot(&utils::dagger(matrix));
    product.indexed_iter().all(|((r, col), z)| {
        let expected = if r == col { ONE } else { ZERO };
        (z - expected).norm() < UNITARY_TOLERANCE
    })
}
