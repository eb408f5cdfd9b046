use crate::config::ProtocolConfig;
use crate::errors::{CipherError, ConfigError, ProtocolError};
use crate::protocols::crypto::cipher::{EncryptedPackage, EntropyStats, SymmetricCipherLayer};
use crate::protocols::crypto::random::RandomBitSource;
use crate::protocols::superdense::eavesdrop::{EavesdropDetector, SecurityCheck, SecurityLogEntry};
use crate::protocols::superdense::engine::BellProtocolEngine;
use crate::protocols::superdense::message::Message;
use crate::protocols::superdense::monitor::{ChannelMonitor, ChannelStatus};
use crate::protocols::superdense::noise::EnvironmentDrift;
use crate::protocols::superdense::report::{self, BalanceEntry, TransmissionSummary};
use crate::protocols::superdense::result::{CryptoReport, RunResult};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Runs averaged into the noise feedback once more than this many exist.
const FEEDBACK_WINDOW: usize = 3;

const DETECTOR_STREAM: u64 = 0x5d3c_0de0_0000_0002;

/// One caller's protocol session: engine, channel monitor, eavesdrop detector,
/// cipher layer and the full results history.
///
/// Not shared between callers; wrap it in a lock if a service needs to.
pub struct ProtocolFacade {
    config: ProtocolConfig,
    engine: BellProtocolEngine,
    monitor: ChannelMonitor,
    detector: EavesdropDetector,
    cipher: SymmetricCipherLayer,
    history: Vec<RunResult>,
}

impl Default for ProtocolFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolFacade {
    pub fn new() -> Self {
        let config = ProtocolConfig::default();
        let engine = BellProtocolEngine::new();
        Self::assemble(config, engine)
    }

    pub fn from_config(config: ProtocolConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let engine = BellProtocolEngine::from_config(&config)?;
        Ok(Self::assemble(config, engine))
    }

    fn assemble(config: ProtocolConfig, engine: BellProtocolEngine) -> Self {
        let monitor = ChannelMonitor::new(config.monitor.window, config.monitor.stability_window);
        let detector = EavesdropDetector::new(
            config.rng(DETECTOR_STREAM),
            config.eavesdrop.intrusion_probability,
        );
        let cipher =
            SymmetricCipherLayer::new(RandomBitSource::from_config(&config), config.cipher.clone());

        Self {
            config,
            engine,
            monitor,
            detector,
            cipher,
            history: Vec::new(),
        }
    }

    /// Replaces the engine's environment drift.
    pub fn with_drift(mut self, drift: impl EnvironmentDrift + 'static) -> Self {
        self.engine.set_drift(drift);
        self
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Sends `(bit0, bit1)` through the channel at `noise_level`.
    ///
    /// Only invalid input is an error; a failed transmission is a normal result.
    pub fn run(&mut self, bit0: u8, bit1: u8, noise_level: f64) -> Result<RunResult, ProtocolError> {
        let message = Message::new(bit0, bit1)?;
        self.run_message(message, noise_level)
    }

    pub fn run_message(
        &mut self,
        message: Message,
        noise_level: f64,
    ) -> Result<RunResult, ProtocolError> {
        validate_noise(noise_level)?;
        Ok(self.transmit(message, noise_level))
    }

    /// Encrypts the message, sends the ciphertext bits and decrypts what arrives.
    ///
    /// The result's `original_bits` are the bits that went over the channel;
    /// the caller's message is in `crypto.plaintext`. A tag failure on the
    /// received package is reported as `auth_verified = false`.
    pub fn run_with_crypto(
        &mut self,
        bit0: u8,
        bit1: u8,
        noise_level: f64,
        user_id: &str,
    ) -> Result<RunResult, ProtocolError> {
        let message = Message::new(bit0, bit1)?;
        validate_noise(noise_level)?;

        let package = self.cipher.encrypt(message, user_id);
        let transmitted = package.transmission_bits()?;

        let recent = self.recent_fidelity();
        let mut result = self.engine.run(transmitted, noise_level, recent);

        let received = package.with_received_bits(result.decoded_bits);
        let (decrypted, auth_verified) = match self.cipher.decrypt(&received) {
            Ok(m) => (Some(m), true),
            Err(CipherError::AuthenticationFailure(reason)) => {
                warn!(user_id, %reason, "received package failed authentication");
                (None, false)
            }
            Err(err) => return Err(err.into()),
        };

        result.crypto = Some(CryptoReport {
            user_id: user_id.to_string(),
            plaintext: message,
            transmitted_bits: transmitted,
            decrypted_bits: decrypted,
            encryption_success: true,
            decryption_success: decrypted == Some(message),
            auth_verified,
            key_entropy: package.metadata.key_entropy,
            security_level: package.metadata.security_level,
            session_id: package.metadata.session_id,
        });

        self.record(result.clone());
        Ok(result)
    }

    pub fn encrypt(&mut self, message: Message, user_id: &str) -> EncryptedPackage {
        self.cipher.encrypt(message, user_id)
    }

    pub fn decrypt(&self, package: &EncryptedPackage) -> Result<Message, ProtocolError> {
        Ok(self.cipher.decrypt(package)?)
    }

    pub fn detect_eavesdropping(&mut self) -> SecurityCheck {
        self.detector.check()
    }

    pub fn channel_status(&self) -> ChannelStatus {
        self.monitor.status()
    }

    /// Runs every message `runs_per_message` times and tallies each one.
    ///
    /// The runs are recorded in the history like any other run.
    pub fn test_balance(
        &mut self,
        runs_per_message: usize,
        noise_level: f64,
    ) -> Result<BTreeMap<String, BalanceEntry>, ProtocolError> {
        if runs_per_message == 0 {
            return Err(ProtocolError::InvalidBatchSize);
        }
        validate_noise(noise_level)?;

        let mut runs = Vec::with_capacity(runs_per_message * Message::ALL.len());
        for message in Message::ALL {
            for _ in 0..runs_per_message {
                runs.push(self.transmit(message, noise_level));
            }
        }

        let tally = report::balance(&runs);
        info!(runs = runs.len(), noise_level, "balance test complete");
        Ok(tally)
    }

    /// Clears the history, the monitor, the security log and the key sessions.
    pub fn reset(&mut self) {
        self.history.clear();
        self.monitor.reset();
        self.detector.clear();
        self.cipher.clear_sessions();
    }

    pub fn history(&self) -> &[RunResult] {
        &self.history
    }

    pub fn security_log(&self) -> &[SecurityLogEntry] {
        self.detector.log()
    }

    pub fn entropy_stats(&self) -> Option<EntropyStats> {
        self.cipher.entropy_stats()
    }

    /// Draws bits from the same source that keys the cipher.
    pub fn sample_random_bits(&mut self, n: usize) -> Vec<bool> {
        self.cipher.source_mut().generate_bits(n)
    }

    pub fn transmission_summary(&self) -> Option<TransmissionSummary> {
        TransmissionSummary::from_history(&self.history)
    }

    /// Per-message tally over the whole history.
    pub fn balance_from_history(&self) -> BTreeMap<String, BalanceEntry> {
        report::balance(&self.history)
    }

    fn transmit(&mut self, message: Message, noise_level: f64) -> RunResult {
        let recent = self.recent_fidelity();
        let result = self.engine.run(message, noise_level, recent);
        self.record(result.clone());
        result
    }

    fn record(&mut self, result: RunResult) {
        self.monitor.record(&result);
        self.history.push(result);
    }

    fn recent_fidelity(&self) -> Option<f64> {
        if self.history.len() <= FEEDBACK_WINDOW {
            return None;
        }
        let recent = &self.history[self.history.len() - FEEDBACK_WINDOW..];
        Some(recent.iter().map(|r| r.fidelity).sum::<f64>() / FEEDBACK_WINDOW as f64)
    }
}

fn validate_noise(noise_level: f64) -> Result<(), ProtocolError> {
    if noise_level.is_finite() && (0.0..=1.0).contains(&noise_level) {
        Ok(())
    } else {
        Err(ProtocolError::InvalidNoiseLevel(noise_level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocols::superdense::noise::ConstantDrift;

    fn facade(seed: u64) -> ProtocolFacade {
        ProtocolFacade::from_config(ProtocolConfig::default().with_seed(seed))
            .unwrap()
            .with_drift(ConstantDrift(1.0))
    }

    #[test]
    fn rejects_bad_input() {
        let mut f = facade(1);
        assert_eq!(
            f.run(1, 2, 0.0).unwrap_err(),
            ProtocolError::InvalidMessage { bit0: 1, bit1: 2 }
        );
        assert!(matches!(
            f.run(0, 0, f64::NAN),
            Err(ProtocolError::InvalidNoiseLevel(_))
        ));
        assert!(matches!(
            f.run(0, 0, 1.5),
            Err(ProtocolError::InvalidNoiseLevel(_))
        ));
        assert_eq!(f.test_balance(0, 0.0), Err(ProtocolError::InvalidBatchSize));
        assert!(f.history().is_empty());
    }

    #[test]
    fn runs_feed_history_and_monitor() {
        let mut f = facade(2);
        for _ in 0..6 {
            f.run(1, 1, 0.0).unwrap();
        }
        assert_eq!(f.history().len(), 6);
        assert_eq!(f.channel_status().consecutive_successes, 6);
        assert!(f.transmission_summary().is_some());

        f.reset();
        assert!(f.history().is_empty());
        assert_eq!(f.channel_status().status.to_string(), "INITIALIZING");
    }

    #[test]
    fn noiseless_crypto_run_decrypts() {
        let mut f = facade(3);
        let r = f.run_with_crypto(1, 0, 0.0, "alice").unwrap();
        let crypto = r.crypto.as_ref().unwrap();
        assert_eq!(crypto.plaintext, Message::from_bits(true, false));
        assert_eq!(r.original_bits, crypto.transmitted_bits);
        assert!(crypto.auth_verified);
        assert!(crypto.decryption_success);
        assert_eq!(crypto.decrypted_bits, Some(crypto.plaintext));
        assert_eq!(f.entropy_stats().unwrap().total_sessions, 1);
    }

    #[test]
    fn eavesdrop_checks_are_logged() {
        let mut f = facade(4);
        for _ in 0..10 {
            f.detect_eavesdropping();
        }
        assert_eq!(f.security_log().len(), 10);
    }

    #[test]
    fn random_bits_are_sampled_on_demand() {
        let mut f = facade(5);
        assert_eq!(f.sample_random_bits(37).len(), 37);
    }
}
