use crate::MeasurementDistribution;
use crate::protocols::crypto::cipher::KeyQuality;
use crate::protocols::superdense::message::{BellState, EncodingTag, Message};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bits carried per transmitted qubit.
pub const QUANTUM_ADVANTAGE: f64 = 2.0;

/// Which simulator produced a [`RunResult`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPath {
    /// Circuit built and executed on a quantum backend.
    Circuit,
    /// Closed-form statistical model, used when no backend is available.
    Statistical,
}

/// Outcome of one protocol execution.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunResult {
    pub original_bits: Message,
    pub decoded_bits: Message,
    pub encoding: EncodingTag,
    pub bell_state: BellState,
    pub fidelity: f64,
    pub error_rate: f64,
    pub success: bool,
    /// Noise level the caller asked for.
    pub requested_noise: f64,
    /// Effective noise after adaptive correction, in [0, 0.6].
    pub noise_level: f64,
    /// Wall time of the run, in seconds.
    pub execution_time: f64,
    pub measurement_counts: MeasurementDistribution,
    pub protocol_steps: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub path: ExecutionPath,
    pub quantum_advantage: f64,
    /// Present when the run went through the cipher layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crypto: Option<CryptoReport>,
}

impl RunResult {
    pub fn decoded_matches(&self) -> bool {
        self.decoded_bits == self.original_bits
    }
}

/// Cipher-layer details attached to a crypto run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CryptoReport {
    pub user_id: String,
    /// Message the caller wanted to send.
    pub plaintext: Message,
    /// Bits that actually went through the channel.
    pub transmitted_bits: Message,
    /// Plaintext recovered from the received bits, if decryption ran.
    pub decrypted_bits: Option<Message>,
    pub encryption_success: bool,
    pub decryption_success: bool,
    pub auth_verified: bool,
    /// Shannon entropy of the key bytes, at most 8 bits per byte.
    pub key_entropy: f64,
    pub security_level: KeyQuality,
    pub session_id: String,
}
