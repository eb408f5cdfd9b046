//! The four-step superdense coding run: Bell pair, encoding, noisy channel, Bell decoding.

use crate::backend::{DensityMatrixBackend, QuantumBackend};
use crate::config::ProtocolConfig;
use crate::errors::{BackendError, ChannelError, ConfigError};
use crate::protocols::superdense::fallback;
use crate::protocols::superdense::message::{BellState, Message};
use crate::protocols::superdense::noise::{self, ChannelModel, EnvironmentDrift, PeriodicDrift};
use crate::protocols::superdense::result::{ExecutionPath, QUANTUM_ADVANTAGE, RunResult};
use crate::{Circuit, MeasurementDistribution, QuantumChannel};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use std::time::Instant;
use tracing::{debug, info, warn};

pub const DEFAULT_SHOTS: usize = 1024;

/// Below this effective noise the backend's counts are left untouched.
const MEASUREMENT_ERROR_THRESHOLD: f64 = 0.05;
/// Error shots never take more than this share of the correct label.
const MAX_ERROR_SHARE: f64 = 0.4;
const MEASUREMENT_SIGMA: f64 = 0.02;
const ENVIRONMENTAL_DRIFT: f64 = 0.05;
/// Above this effective noise a run may suffer a decoherence failure.
const DECOHERENCE_THRESHOLD: f64 = 0.3;

const ENGINE_STREAM: u64 = 0x5d3c_0de0_0000_0001;

/// Builds the full protocol circuit for `message`.
///
/// Returns the circuit and a description of every injected channel error.
pub fn build_circuit<R: Rng + ?Sized>(
    message: Message,
    effective_noise: f64,
    model: ChannelModel,
    rng: &mut R,
) -> Result<(Circuit, Vec<String>), ChannelError> {
    let mut circuit = Circuit::new(2);

    // |Φ+⟩ shared between sender (q0) and receiver (q1)
    circuit.h(0).cx(0, 1);

    let tag = message.encoding();
    if tag.applies_x() {
        circuit.x(0);
    }
    if tag.applies_z() {
        circuit.z(0);
    }

    let events = noise::inject(&mut circuit, effective_noise, model, rng)?;

    circuit.cx(0, 1).h(0).measure_all();
    Ok((circuit, events))
}

/// Moves a noise-scaled share of shots from `target` onto the three other labels.
///
/// The total shot count is preserved.
pub fn redistribute_error_shots<R: Rng + ?Sized>(
    counts: &mut MeasurementDistribution,
    target: &str,
    effective_noise: f64,
    rng: &mut R,
) {
    let correct = counts.get(target);
    if correct == 0 {
        return;
    }
    let total = counts.total();
    let drawn = (total as f64 * effective_noise * rng.random_range(0.5..1.5)) as usize;
    let cap = (correct as f64 * MAX_ERROR_SHARE) as usize;
    let mut error_shots = counts.take(target, drawn.min(cap));

    let error_labels: Vec<String> = Message::ALL
        .iter()
        .map(Message::label)
        .filter(|l| l.as_str() != target)
        .collect();
    let last = error_labels.len() - 1;
    for (i, label) in error_labels.into_iter().enumerate() {
        let portion = if i < last { error_shots / 3 } else { error_shots };
        counts.add(label, portion);
        error_shots -= portion;
    }
}

/// Runs superdense coding over a noisy channel and scores the outcome.
pub struct BellProtocolEngine {
    rng: StdRng,
    backend: Option<Box<dyn QuantumBackend>>,
    drift: Box<dyn EnvironmentDrift>,
    shots: usize,
    channel_model: ChannelModel,
}

impl BellProtocolEngine {
    /// Engine on the in-process density-matrix backend with OS-seeded randomness.
    pub fn new() -> Self {
        Self::with_backend(Some(Box::new(DensityMatrixBackend::new())))
    }

    /// `None` runs every request on the statistical model.
    pub fn with_backend(backend: Option<Box<dyn QuantumBackend>>) -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            backend,
            drift: Box::new(PeriodicDrift::default()),
            shots: DEFAULT_SHOTS,
            channel_model: ChannelModel::default(),
        }
    }

    pub fn from_config(config: &ProtocolConfig) -> Result<Self, ConfigError> {
        let backend: Option<Box<dyn QuantumBackend>> = if config.quantum_backend_available {
            let mut backend = DensityMatrixBackend::new();
            if config.readout_error > 0.0 {
                let flip = QuantumChannel::pauli(config.readout_error, 0.0, 0.0)
                    .map_err(|e| ConfigError::Invalid(e.to_string()))?;
                backend = backend.with_readout_channel(flip);
            }
            Some(Box::new(backend))
        } else {
            None
        };

        Ok(Self {
            rng: config.rng(ENGINE_STREAM),
            backend,
            drift: Box::new(PeriodicDrift::default()),
            shots: config.shots,
            channel_model: config.channel_model,
        })
    }

    pub fn with_drift(mut self, drift: impl EnvironmentDrift + 'static) -> Self {
        self.set_drift(drift);
        self
    }

    pub fn set_drift(&mut self, drift: impl EnvironmentDrift + 'static) {
        self.drift = Box::new(drift);
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_shots(mut self, shots: usize) -> Self {
        self.shots = shots;
        self
    }

    pub fn with_channel_model(mut self, model: ChannelModel) -> Self {
        self.channel_model = model;
        self
    }

    pub fn shots(&self) -> usize {
        self.shots
    }

    pub fn backend_name(&self) -> Option<&str> {
        self.backend.as_ref().map(|b| b.name())
    }

    /// Transmits `message` at the requested noise level.
    ///
    /// `recent_fidelity` is the mean fidelity of the last few runs, if the caller
    /// has enough history to feed back. Backend failures fall back to the
    /// statistical model; this never fails.
    pub fn run(
        &mut self,
        message: Message,
        noise_level: f64,
        recent_fidelity: Option<f64>,
    ) -> RunResult {
        let start = Instant::now();
        let drift_factor = self.drift.next_factor();
        let effective_noise =
            noise::effective_noise(noise_level, recent_fidelity, drift_factor, &mut self.rng);
        debug!(
            message = %message,
            requested = noise_level,
            effective = effective_noise,
            "adaptive noise correction"
        );

        let mut result = match self.run_circuit(message, effective_noise) {
            Ok(scored) => scored,
            Err(BackendError::NotConfigured) => {
                debug!("no backend configured, using statistical channel model");
                self.run_statistical(message, effective_noise)
            }
            Err(err) => {
                warn!(error = %err, "backend unavailable, using statistical channel model");
                self.run_statistical(message, effective_noise)
            }
        };

        result.requested_noise = noise_level;
        result.execution_time = start.elapsed().as_secs_f64();
        info!(
            original = %result.original_bits,
            decoded = %result.decoded_bits,
            fidelity = result.fidelity,
            success = result.success,
            path = ?result.path,
            "protocol run complete"
        );
        result
    }

    fn run_circuit(
        &mut self,
        message: Message,
        effective_noise: f64,
    ) -> Result<RunResult, BackendError> {
        let Some(backend) = self.backend.as_mut() else {
            return Err(BackendError::NotConfigured);
        };

        let tag = message.encoding();
        let mut steps = vec![format!("Created entangled Bell state {}", BellState::PhiPlus)];

        let (circuit, events) =
            build_circuit(message, effective_noise, self.channel_model, &mut self.rng)
                .map_err(|e| BackendError::Simulation(e.into()))?;
        steps.push(format!(
            "Alice encoded message [{}{}] with {tag}, preparing {}",
            message.bit0(),
            message.bit1(),
            tag.bell_state()
        ));
        steps.push(format!(
            "Transmitted Alice's qubit through the quantum channel (effective noise {effective_noise:.3})"
        ));
        steps.extend(events);
        debug!(circuit = %circuit, "executing circuit on {}", backend.name());

        let mut counts = backend.execute(&circuit, self.shots, &mut self.rng)?;
        steps.push("Bob performed Bell measurement to decode message".to_string());

        let target = message.label();
        if effective_noise > MEASUREMENT_ERROR_THRESHOLD {
            redistribute_error_shots(&mut counts, &target, effective_noise, &mut self.rng);
        }

        let total = counts.total();
        if total == 0 {
            return Err(BackendError::EmptyDistribution);
        }
        let base_fidelity = counts.get(&target) as f64 / total as f64;
        let uncertainty = self.rng.sample::<f64, _>(StandardNormal) * MEASUREMENT_SIGMA;
        let environment = self
            .rng
            .random_range(-ENVIRONMENTAL_DRIFT..ENVIRONMENTAL_DRIFT);
        let mut fidelity = (base_fidelity + uncertainty + environment).clamp(0.0, 1.0);

        let decoded = counts
            .most_frequent()
            .and_then(Message::from_label)
            .ok_or(BackendError::EmptyDistribution)?;

        let threshold = 0.5 - effective_noise * 0.4;
        let mut success = fidelity > threshold && decoded == message;

        if effective_noise > DECOHERENCE_THRESHOLD && self.rng.random_bool(effective_noise) {
            fidelity *= self.rng.random_range(0.3..0.7);
            success = false;
            steps.push("Decoherence event destroyed the entangled correlations".to_string());
        }

        Ok(RunResult {
            original_bits: message,
            decoded_bits: decoded,
            encoding: tag,
            bell_state: tag.bell_state(),
            fidelity,
            error_rate: 1.0 - fidelity,
            success,
            requested_noise: effective_noise,
            noise_level: effective_noise,
            execution_time: 0.0,
            measurement_counts: counts,
            protocol_steps: steps,
            timestamp: Utc::now(),
            path: ExecutionPath::Circuit,
            quantum_advantage: QUANTUM_ADVANTAGE,
            crypto: None,
        })
    }

    fn run_statistical(&mut self, message: Message, effective_noise: f64) -> RunResult {
        let tag = message.encoding();
        let outcome = fallback::simulate(message, effective_noise, self.shots, &mut self.rng);

        let steps = vec![
            format!("Created entangled Bell state {}", BellState::PhiPlus),
            format!(
                "Alice encoded message [{}{}] with {tag}, preparing {}",
                message.bit0(),
                message.bit1(),
                tag.bell_state()
            ),
            "Transmitted Alice's qubit through the quantum channel".to_string(),
            "Channel outcome drawn from the statistical model".to_string(),
            "Bob performed Bell measurement to decode message".to_string(),
        ];

        RunResult {
            original_bits: message,
            decoded_bits: outcome.decoded,
            encoding: tag,
            bell_state: tag.bell_state(),
            fidelity: outcome.fidelity,
            error_rate: 1.0 - outcome.fidelity,
            success: outcome.decoded == message,
            requested_noise: effective_noise,
            noise_level: effective_noise,
            execution_time: 0.0,
            measurement_counts: outcome.counts,
            protocol_steps: steps,
            timestamp: Utc::now(),
            path: ExecutionPath::Statistical,
            quantum_advantage: QUANTUM_ADVANTAGE,
            crypto: None,
        }
    }
}

impl Default for BellProtocolEngine {
    fn default() -> Self {
        Self::new()
    }
}
