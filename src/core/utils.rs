//! Matrix and bit-index helpers shared by the simulator.
//!
//! Qubit `q` is bit `q` of a basis-state index throughout.

use ndarray::{Array1, Array2, Axis};
use num_complex::Complex64;
use std::collections::HashSet;

pub const ONE: Complex64 = Complex64::new(1.0, 0.0);
pub const ZERO: Complex64 = Complex64::new(0.0, 0.0);

/// Sum of the diagonal.
pub fn trace(matrix: &Array2<Complex64>) -> Complex64 {
    matrix.diag().sum()
}

/// Conjugate transpose.
pub fn dagger(matrix: &Array2<Complex64>) -> Array2<Complex64> {
    matrix.t().mapv(|z| z.conj())
}

/// `|a⟩⟨b|`
pub fn outer_product(a: &Array1<Complex64>, b: &Array1<Complex64>) -> Array2<Complex64> {
    let ket = a.view().insert_axis(Axis(1));
    let bra = b.mapv(|z| z.conj()).insert_axis(Axis(0));
    ket.dot(&bra)
}

/// Lifts a local operator on `targets` to the full `2^n × 2^n` register.
///
/// Basis states where any of `controls` is 0 are left untouched; elsewhere the
/// local matrix acts on the target bits and every other bit passes through.
pub fn embed_operator(
    num_qubits: usize,
    local: &Array2<Complex64>,
    targets: &[usize],
    controls: &[usize],
) -> Array2<Complex64> {
    let dim = 1usize << num_qubits;
    let control_mask = mask(controls);
    let keep_mask = !mask(targets);

    let mut full = Array2::<Complex64>::zeros((dim, dim));
    for col in 0..dim {
        if col & control_mask != control_mask {
            full[[col, col]] = ONE;
            continue;
        }
        let local_col = gather_bits(col, targets);
        for (local_row, &amp) in local.column(local_col).iter().enumerate() {
            if amp.norm_sqr() < f64::EPSILON {
                continue;
            }
            let row = (col & keep_mask) | scatter_bits(local_row, targets);
            full[[row, col]] = amp;
        }
    }
    full
}

fn mask(qubits: &[usize]) -> usize {
    qubits.iter().fold(0, |m, &q| m | (1 << q))
}

/// Packs the bits of `value` at `positions` into a compact index, position `i` → bit `i`.
fn gather_bits(value: usize, positions: &[usize]) -> usize {
    positions
        .iter()
        .enumerate()
        .fold(0, |acc, (i, &pos)| acc | (((value >> pos) & 1) << i))
}

/// Inverse of [`gather_bits`].
fn scatter_bits(compact: usize, positions: &[usize]) -> usize {
    positions
        .iter()
        .enumerate()
        .fold(0, |acc, (i, &pos)| acc | (((compact >> i) & 1) << pos))
}

pub fn find_duplicate(indices: &[usize]) -> Option<usize> {
    let mut seen = HashSet::with_capacity(indices.len());
    indices.iter().copied().find(|&q| !seen.insert(q))
}

/// `Σ K†K = I` within 1e-9.
pub fn is_complete(ops: &[Array2<Complex64>], dim: usize) -> bool {
    let sum = ops
        .iter()
        .fold(Array2::<Complex64>::zeros((dim, dim)), |acc, k| {
            acc + dagger(k).dot(k)
        });
    sum.indexed_iter().all(|((r, c), z)| {
        let expected = if r == c { ONE } else { ZERO };
        (z - expected).norm() < 1e-9
    })
}

/// Renders a local outcome index as a bit string, qubit 0 first.
///
/// `outcome_label(0b10, 2)` is `"01"`: qubit 0 read 0, qubit 1 read 1.
pub fn outcome_label(index: usize, width: usize) -> String {
    (0..width)
        .map(|bit| if (index >> bit) & 1 == 1 { '1' } else { '0' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn gather_undoes_scatter() {
        let targets = [2, 0];
        for v in 0..4 {
            assert_eq!(gather_bits(scatter_bits(v, &targets), &targets), v);
        }
    }

    #[test]
    fn outcome_labels_are_qubit_ordered() {
        assert_eq!(outcome_label(0, 2), "00");
        assert_eq!(outcome_label(1, 2), "10");
        assert_eq!(outcome_label(2, 2), "01");
        assert_eq!(outcome_label(3, 2), "11");
        assert_eq!(outcome_label(5, 4), "1010");
    }

    #[test]
    fn finds_first_duplicate() {
        assert_eq!(find_duplicate(&[0, 1, 2]), None);
        assert_eq!(find_duplicate(&[0, 1, 0]), Some(0));
    }

    #[test]
    fn embedding_x_on_qubit_one() {
        let x = array![[ZERO, ONE], [ONE, ZERO]];
        let full = embed_operator(2, &x, &[1], &[]);
        // |q0=1,q1=0> (index 1) -> |q0=1,q1=1> (index 3)
        assert_eq!(full[[3, 1]], ONE);
        assert_eq!(full[[1, 1]], ZERO);
        assert!(is_complete(&[full], 4));
    }

    #[test]
    fn outer_product_of_basis_vectors() {
        let e0 = array![ONE, ZERO];
        let e1 = array![ZERO, ONE];
        let p = outer_product(&e0, &e1);
        assert_eq!(p[[0, 1]], ONE);
        assert_eq!(trace(&p), ZERO);
    }
}
