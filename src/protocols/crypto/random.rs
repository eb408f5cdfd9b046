use crate::backend::{DensityMatrixBackend, QuantumBackend};
use crate::config::ProtocolConfig;
use crate::errors::BackendError;
use crate::{Circuit, MeasurementDistribution};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use tracing::{debug, warn};

pub const DEFAULT_CHUNK_BITS: usize = 4;
pub const DEFAULT_HARVEST_SHOTS: usize = 64;

const RANDOM_STREAM: u64 = 0x5d3c_0de0_0000_0003;

/// Bit generator that measures uniform superpositions when a backend is
/// available and otherwise draws from a CSPRNG.
pub struct RandomBitSource {
    rng: StdRng,
    backend: Option<Box<dyn QuantumBackend>>,
    chunk_bits: usize,
    harvest_shots: usize,
}

impl RandomBitSource {
    pub fn new(
        rng: StdRng,
        backend: Option<Box<dyn QuantumBackend>>,
        chunk_bits: usize,
        harvest_shots: usize,
    ) -> Self {
        let chunk_bits = match &backend {
            Some(b) => chunk_bits.clamp(1, b.max_qubits()),
            None => chunk_bits.max(1),
        };
        Self {
            rng,
            backend,
            chunk_bits,
            harvest_shots: harvest_shots.max(1),
        }
    }

    /// CSPRNG only, seeded from the OS.
    pub fn secure() -> Self {
        Self::new(StdRng::from_os_rng(), None, DEFAULT_CHUNK_BITS, DEFAULT_HARVEST_SHOTS)
    }

    pub fn from_config(config: &ProtocolConfig) -> Self {
        let backend: Option<Box<dyn QuantumBackend>> = config
            .quantum_backend_available
            .then(|| Box::new(DensityMatrixBackend::new()) as Box<dyn QuantumBackend>);
        Self::new(
            config.rng(RANDOM_STREAM),
            backend,
            config.random.quantum_chunk_bits,
            config.random.harvest_shots,
        )
    }

    pub fn is_quantum(&self) -> bool {
        self.backend.is_some()
    }

    /// Returns `n` random bits.
    ///
    /// Bits are harvested in chunks of at most `chunk_bits` qubits; any shortfall
    /// after a backend failure is filled from the CSPRNG.
    pub fn generate_bits(&mut self, n: usize) -> Vec<bool> {
        let mut bits = Vec::with_capacity(n);

        if self.backend.is_some() {
            while bits.len() < n {
                let width = self.chunk_bits.min(n - bits.len());
                match self.harvest_chunk(width) {
                    Ok(chunk) => bits.extend(chunk),
                    Err(err) => {
                        warn!(error = %err, "quantum harvest failed, padding with CSPRNG bits");
                        break;
                    }
                }
            }
        }

        let padding = n - bits.len();
        if padding > 0 {
            debug!(padding, "drawing bits from CSPRNG");
        }
        bits.extend((0..padding).map(|_| self.rng.random_bool(0.5)));
        bits
    }

    fn harvest_chunk(&mut self, width: usize) -> Result<Vec<bool>, BackendError> {
        let Some(backend) = self.backend.as_mut() else {
            return Err(BackendError::NotConfigured);
        };

        let mut circuit = Circuit::new(width);
        for q in 0..width {
            circuit.h(q);
        }
        circuit.measure_all();

        let counts = backend.execute(&circuit, self.harvest_shots, &mut self.rng)?;
        let label = pick_weighted(&counts, &mut self.rng).ok_or(BackendError::EmptyDistribution)?;
        Ok(label.chars().map(|c| c == '1').collect())
    }

    /// `bytes` bytes of key material, bits packed most significant first.
    pub fn generate_key(&mut self, bytes: usize) -> Vec<u8> {
        let bits = self.generate_bits(bytes * 8);
        pack_bits(&bits)
    }

    pub fn generate_nonce(&mut self, bytes: usize) -> Vec<u8> {
        self.generate_key(bytes)
    }

    /// Raw CSPRNG bytes, for salts.
    pub fn secure_bytes(&mut self, bytes: usize) -> Vec<u8> {
        let mut buf = vec![0u8; bytes];
        self.rng.fill_bytes(&mut buf);
        buf
    }
}

/// Draws one outcome label with probability proportional to its count.
fn pick_weighted<'a, R: Rng + ?Sized>(
    counts: &'a MeasurementDistribution,
    rng: &mut R,
) -> Option<&'a str> {
    let total = counts.total();
    if total == 0 {
        return None;
    }
    let mut r = rng.random_range(0..total);
    for (label, n) in counts.iter() {
        if r < n {
            return Some(label);
        }
        r -= n;
    }
    None
}

pub fn pack_bits(bits: &[bool]) -> Vec<u8> {
    bits.chunks(8)
        .map(|chunk| {
            chunk
                .iter()
                .enumerate()
                .fold(0u8, |byte, (i, &b)| byte | ((b as u8) << (7 - i)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::crypto::entropy::entropy;

    fn quantum(seed: u64) -> RandomBitSource {
        RandomBitSource::new(
            StdRng::seed_from_u64(seed),
            Some(Box::new(DensityMatrixBackend::new())),
            DEFAULT_CHUNK_BITS,
            DEFAULT_HARVEST_SHOTS,
        )
    }

    #[test]
    fn produces_exactly_n_bits() {
        let mut source = quantum(1);
        for n in [0, 1, 3, 4, 17, 64] {
            assert_eq!(source.generate_bits(n).len(), n);
        }
    }

    #[test]
    fn harvested_bits_are_roughly_balanced() {
        let mut source = quantum(2);
        let bits = source.generate_bits(2048);
        assert!(entropy(&bits) > 0.98);
    }

    #[test]
    fn secure_fallback_fills_the_request() {
        let mut source = RandomBitSource::secure();
        assert!(!source.is_quantum());
        assert_eq!(source.generate_key(32).len(), 32);
        assert_eq!(source.generate_nonce(12).len(), 12);
    }

    #[test]
    fn chunk_width_respects_backend_limit() {
        let source = RandomBitSource::new(
            StdRng::seed_from_u64(3),
            Some(Box::new(DensityMatrixBackend::new())),
            20,
            8,
        );
        assert_eq!(source.chunk_bits, crate::backend::DENSITY_MATRIX_MAX_QUBITS);
    }

    #[test]
    fn bits_pack_msb_first() {
        let bits = [true, false, false, false, false, false, false, true, true];
        assert_eq!(pack_bits(&bits), vec![0b1000_0001, 0b1000_0000]);
    }
}
