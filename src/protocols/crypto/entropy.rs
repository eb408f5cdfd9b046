/// Shannon entropy of a bit sequence, in bits per symbol (at most 1.0).
///
/// Empty input has zero entropy.
pub fn entropy(bits: &[bool]) -> f64 {
    let ones = bits.iter().filter(|&&b| b).count();
    shannon(&[bits.len() - ones, ones], bits.len())
}

/// Shannon entropy of a byte sequence, in bits per byte (at most 8.0).
pub fn byte_entropy(bytes: &[u8]) -> f64 {
    let mut histogram = [0usize; 256];
    for &b in bytes {
        histogram[b as usize] += 1;
    }
    shannon(&histogram, bytes.len())
}

fn shannon(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.log2()
        })
        .sum::<f64>()
        .max(0.0)
}
