//! Channel noise: adaptive correction of the requested level and error injection.

use crate::errors::ChannelError;
use crate::{Circuit, QuantumChannel};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Upper clamp on the effective noise level.
pub const MAX_EFFECTIVE_NOISE: f64 = 0.6;

/// Cap on the per-run base error rate before per-qubit jitter.
const MAX_BASE_ERROR_RATE: f64 = 0.4;

/// Pauli error mix: X, Y, Z.
pub const PAULI_WEIGHTS: [f64; 3] = [0.5, 0.2, 0.3];

/// Slow environmental factor applied to the effective noise.
pub trait EnvironmentDrift: Send {
    /// Multiplicative factor for the next run.
    fn next_factor(&mut self) -> f64;
}

/// `1 + amplitude * sin(tick)` on a tick that advances once per run.
#[derive(Debug, Clone)]
pub struct PeriodicDrift {
    tick: u64,
    amplitude: f64,
}

impl PeriodicDrift {
    pub fn new(amplitude: f64) -> Self {
        Self { tick: 0, amplitude }
    }

    pub fn starting_at(tick: u64, amplitude: f64) -> Self {
        Self { tick, amplitude }
    }
}

impl Default for PeriodicDrift {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl EnvironmentDrift for PeriodicDrift {
    fn next_factor(&mut self) -> f64 {
        let factor = 1.0 + self.amplitude * (self.tick as f64).sin();
        self.tick = self.tick.wrapping_add(1);
        factor
    }
}

/// Fixed factor, for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct ConstantDrift(pub f64);

impl EnvironmentDrift for ConstantDrift {
    fn next_factor(&mut self) -> f64 {
        self.0
    }
}

/// Feedback factor from the mean fidelity of the most recent runs.
pub fn feedback_correction(recent_fidelity: Option<f64>) -> f64 {
    match recent_fidelity {
        None => 1.0,
        Some(f) if f < 0.6 => 0.7,
        Some(f) if f > 0.9 => 1.1,
        Some(_) => 0.9,
    }
}

/// Scales the requested noise by channel fluctuation, atmosphere, feedback and
/// drift, then clamps it to `[0, MAX_EFFECTIVE_NOISE]`.
pub fn effective_noise<R: Rng + ?Sized>(
    noise_level: f64,
    recent_fidelity: Option<f64>,
    drift_factor: f64,
    rng: &mut R,
) -> f64 {
    let channel_fluctuation = rng.random_range(0.8..1.3);
    let atmospheric_factor = rng.random_range(0.9..1.1);

    let noise = noise_level
        * channel_fluctuation
        * atmospheric_factor
        * feedback_correction(recent_fidelity)
        * drift_factor;

    noise.clamp(0.0, MAX_EFFECTIVE_NOISE)
}

/// How the channel corrupts the sender's and receiver's qubits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelModel {
    /// One sampled Pauli error (and optional phase kick) per qubit per run.
    #[default]
    Discrete,
    /// The same error probabilities applied as a Kraus channel to every shot.
    Kraus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pauli {
    X,
    Y,
    Z,
}

/// Draws a Pauli from [`PAULI_WEIGHTS`].
pub fn sample_pauli<R: Rng + ?Sized>(rng: &mut R) -> Pauli {
    let r: f64 = rng.random();
    if r < PAULI_WEIGHTS[0] {
        Pauli::X
    } else if r < PAULI_WEIGHTS[0] + PAULI_WEIGHTS[1] {
        Pauli::Y
    } else {
        Pauli::Z
    }
}

/// Appends channel noise on both lanes to `circuit`.
///
/// Returns a description of each injected error.
pub fn inject<R: Rng + ?Sized>(
    circuit: &mut Circuit,
    effective_noise: f64,
    model: ChannelModel,
    rng: &mut R,
) -> Result<Vec<String>, ChannelError> {
    let mut events = Vec::new();
    if effective_noise <= 0.0 {
        return Ok(events);
    }

    let base_error_rate = (effective_noise * rng.random_range(0.8..1.2)).min(MAX_BASE_ERROR_RATE);

    for qubit in 0..circuit.num_qubits {
        let error_probability = (base_error_rate * rng.random_range(0.5..1.5)).min(1.0);
        let phase_probability = (base_error_rate * rng.random_range(0.1..0.3)).min(1.0);
        let phase_angle = rng.random_range(0.0..PI / 6.0) * (1.0 + effective_noise);

        match model {
            ChannelModel::Discrete => {
                if rng.random_bool(error_probability) {
                    let pauli = sample_pauli(rng);
                    match pauli {
                        Pauli::X => circuit.x(qubit),
                        Pauli::Y => circuit.y(qubit),
                        Pauli::Z => circuit.z(qubit),
                    };
                    events.push(format!("Channel applied a {pauli:?} error to qubit {qubit}"));
                }
                if rng.random_bool(phase_probability) {
                    circuit.rz(qubit, phase_angle);
                    events.push(format!(
                        "Decoherence rotated qubit {qubit} by {phase_angle:.3} rad"
                    ));
                }
            }
            ChannelModel::Kraus => {
                let pauli = QuantumChannel::pauli(
                    error_probability * PAULI_WEIGHTS[0],
                    error_probability * PAULI_WEIGHTS[1],
                    error_probability * PAULI_WEIGHTS[2],
                )?;
                let dephasing = QuantumChannel::phase_damping(phase_probability)?;
                circuit.channel(qubit, pauli.compose(&dephasing)?);
                events.push(format!(
                    "Kraus channel on qubit {qubit}: error p={error_probability:.3}, dephasing λ={phase_probability:.3}"
                ));
            }
        }
    }

    Ok(events)
}
