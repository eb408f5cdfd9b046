//! Closed-form statistical model used when no backend can run the circuit.

use crate::MeasurementDistribution;
use crate::protocols::superdense::message::Message;
use rand::Rng;
use rand_distr::StandardNormal;

const BASE_SUCCESS: f64 = 0.88;
const MIN_SUCCESS: f64 = 0.2;

/// Kinds of corruption the statistical model can commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatisticalError {
    /// One of the two bits flips.
    SingleBit,
    /// Both bits flip.
    BothBits,
    /// Decoded bits survive but fidelity drops.
    Phase,
}

impl StatisticalError {
    fn sample<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let r: f64 = rng.random();
        if r < 0.5 {
            StatisticalError::SingleBit
        } else if r < 0.8 {
            StatisticalError::BothBits
        } else {
            StatisticalError::Phase
        }
    }
}

#[derive(Clone, Debug)]
pub struct StatisticalOutcome {
    pub decoded: Message,
    pub fidelity: f64,
    pub counts: MeasurementDistribution,
    pub error: Option<StatisticalError>,
}

/// Probability that a run decodes cleanly, given the channel draws.
pub fn success_probability(noise: f64, channel_quality: f64, interference: f64) -> f64 {
    (BASE_SUCCESS - noise * channel_quality * interference).max(MIN_SUCCESS)
}

/// Samples decoded bits, fidelity and a shot histogram for `message` at `noise`.
pub fn simulate<R: Rng + ?Sized>(
    message: Message,
    noise: f64,
    shots: usize,
    rng: &mut R,
) -> StatisticalOutcome {
    let channel_quality = rng.random_range(0.7..1.2);
    let interference = rng.random_range(0.9..1.1);
    let p_success = success_probability(noise, channel_quality, interference);

    let mut decoded = message;
    let mut error = None;
    if rng.random::<f64>() > p_success {
        let kind = StatisticalError::sample(rng);
        decoded = match kind {
            StatisticalError::SingleBit if rng.random_bool(0.5) => {
                Message::from_bits(message.bit0() == 0, message.bit1() == 1)
            }
            StatisticalError::SingleBit => {
                Message::from_bits(message.bit0() == 1, message.bit1() == 0)
            }
            StatisticalError::BothBits => {
                Message::from_bits(message.bit0() == 0, message.bit1() == 0)
            }
            StatisticalError::Phase => message,
        };
        error = Some(kind);
    }

    let fidelity = match error {
        None => {
            let environment = 1.0 - noise * 0.3 - (channel_quality - 1.0).abs() * 0.1;
            rng.random_range(0.75..0.95) * environment.max(0.4)
        }
        Some(StatisticalError::Phase) => rng.random_range(0.6..0.8),
        Some(_) => rng.random_range(0.1..0.5) * (1.0 - noise).max(0.5),
    };

    let counts = histogram(decoded, fidelity, noise, shots, rng);

    StatisticalOutcome {
        decoded,
        fidelity,
        counts,
        error,
    }
}

/// Puts about `fidelity * shots` on the decoded label, with Gaussian shot noise,
/// and the rest on one error label (low noise) or two (higher noise).
fn histogram<R: Rng + ?Sized>(
    decoded: Message,
    fidelity: f64,
    noise: f64,
    shots: usize,
    rng: &mut R,
) -> MeasurementDistribution {
    let base_correct = (fidelity * shots as f64) as usize;
    let spread = (base_correct as f64 * 0.1).sqrt();
    let jitter = rng.sample::<f64, _>(StandardNormal) * spread;
    let correct = (base_correct as f64 + jitter).clamp(0.0, shots as f64) as usize;
    let mut error_shots = shots - correct;

    let target = decoded.label();
    let error_labels: Vec<String> = Message::ALL
        .iter()
        .map(Message::label)
        .filter(|l| *l != target)
        .collect();

    let mut counts = MeasurementDistribution::new();
    counts.add(target, correct);

    if noise < 0.1 {
        counts.add(error_labels[0].clone(), error_shots);
    } else {
        let half = error_shots / 2;
        for label in error_labels.iter().take(2) {
            counts.add(label.clone(), half);
            error_shots -= half;
        }
        counts.add(error_labels[0].clone(), error_shots);
    }

    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn histogram_always_sums_to_shots() {
        let mut rng = StdRng::seed_from_u64(11);
        for noise in [0.0, 0.05, 0.2, 0.6] {
            for m in Message::ALL {
                let out = simulate(m, noise, 1024, &mut rng);
                assert_eq!(out.counts.total(), 1024);
                assert!((0.0..=1.0).contains(&out.fidelity));
            }
        }
    }

    #[test]
    fn success_probability_has_a_floor() {
        assert_eq!(success_probability(0.0, 1.0, 1.0), BASE_SUCCESS);
        assert_eq!(success_probability(1.0, 1.2, 1.1), MIN_SUCCESS);
    }

    #[test]
    fn phase_errors_keep_the_message() {
        let mut rng = StdRng::seed_from_u64(12);
        for _ in 0..500 {
            let m = Message::from_bits(true, false);
            let out = simulate(m, 0.5, 1024, &mut rng);
            match out.error {
                None | Some(StatisticalError::Phase) => assert_eq!(out.decoded, m),
                Some(_) => assert_ne!(out.decoded, m),
            }
        }
    }

    #[test]
    fn noiseless_fallback_mostly_decodes() {
        let mut rng = StdRng::seed_from_u64(13);
        let m = Message::from_bits(false, true);
        let hits = (0..400)
            .filter(|_| simulate(m, 0.0, 1024, &mut rng).decoded == m)
            .count();
        assert!(hits > 330, "{hits}");
    }
}
