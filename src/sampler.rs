use crate::{Measurement, MeasurementDistribution, QuantumChannel, QuantumState, errors::StateError};
use rand::Rng;

/// Draws repeated measurement shots from a state.
///
/// An optional channel is applied to each measured qubit first; the backend
/// uses it for readout error.
#[derive(Debug, Clone, Default)]
pub struct Sampler {
    pub channel: Option<QuantumChannel>,
}

impl Sampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, channel: QuantumChannel) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Measures `targets` of `state` `num_shots` times.
    ///
    /// Counts are keyed by the measurement's labels and sum to `num_shots`.
    pub fn run<R: Rng + ?Sized>(
        &self,
        state: &QuantumState,
        measurement: &Measurement,
        targets: &[usize],
        num_shots: usize,
        rng: &mut R,
    ) -> Result<MeasurementDistribution, StateError> {
        let probs = match &self.channel {
            Some(channel) => {
                let mut noisy = state.clone();
                for &q in targets {
                    noisy.apply_channel(channel, &[q])?;
                }
                noisy.outcome_probabilities(measurement, targets)?
            }
            None => state.outcome_probabilities(measurement, targets)?,
        };

        let cumulative: Vec<f64> = probs
            .iter()
            .scan(0.0, |acc, &p| {
                *acc += p;
                Some(*acc)
            })
            .collect();
        let last = cumulative.len() - 1;

        let mut tally = vec![0usize; cumulative.len()];
        for _ in 0..num_shots {
            let r: f64 = rng.random();
            // rounding can leave the final bound a hair under 1.0
            let k = cumulative.iter().position(|&c| r < c).unwrap_or(last);
            tally[k] += 1;
        }

        Ok(MeasurementDistribution::from_counts(
            measurement.labels.iter().cloned().zip(tally),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Gate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn counts_sum_to_shots() {
        let mut state = QuantumState::new(2);
        state.apply(&Gate::h(), &[0]).unwrap();
        state.apply(&Gate::h(), &[1]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let dist = Sampler::new()
            .run(&state, &Measurement::computational(2), &[0, 1], 1024, &mut rng)
            .unwrap();
        assert_eq!(dist.total(), 1024);
        for label in ["00", "01", "10", "11"] {
            let n = dist.get(label);
            assert!((180..=330).contains(&n), "{label}: {n}");
        }
    }

    #[test]
    fn channel_is_applied_before_measurement() {
        let state = QuantumState::new(1);
        let mut rng = StdRng::seed_from_u64(1);
        let dist = Sampler::new()
            .with_channel(QuantumChannel::pauli(1.0, 0.0, 0.0).unwrap())
            .run(&state, &Measurement::computational(1), &[0], 100, &mut rng)
            .unwrap();
        assert_eq!(dist.get("1"), 100);
    }
}
