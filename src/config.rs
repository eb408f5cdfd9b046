use crate::errors::ConfigError;
use crate::protocols::crypto::random::{DEFAULT_CHUNK_BITS, DEFAULT_HARVEST_SHOTS};
use crate::protocols::superdense::eavesdrop::DEFAULT_INTRUSION_PROBABILITY;
use crate::protocols::superdense::engine::DEFAULT_SHOTS;
use crate::protocols::superdense::monitor::{DEFAULT_STABILITY_WINDOW, DEFAULT_WINDOW};
use crate::protocols::superdense::noise::ChannelModel;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Runtime settings for a [`ProtocolFacade`](crate::protocols::superdense::ProtocolFacade).
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// shots = 2048
/// seed = 7
/// channel_model = "kraus"
///
/// [cipher]
/// strict_tag_check = true
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    pub shots: usize,
    /// When false every run uses the statistical channel model.
    pub quantum_backend_available: bool,
    /// Seeds every component's generator; `None` seeds from the OS.
    pub seed: Option<u64>,
    pub channel_model: ChannelModel,
    /// Bit-flip probability applied to each lane at readout.
    pub readout_error: f64,
    pub monitor: MonitorConfig,
    pub eavesdrop: EavesdropConfig,
    pub random: RandomConfig,
    pub cipher: CipherConfig,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            shots: DEFAULT_SHOTS,
            quantum_backend_available: true,
            seed: None,
            channel_model: ChannelModel::Discrete,
            readout_error: 0.0,
            monitor: MonitorConfig::default(),
            eavesdrop: EavesdropConfig::default(),
            random: RandomConfig::default(),
            cipher: CipherConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub window: usize,
    pub stability_window: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            stability_window: DEFAULT_STABILITY_WINDOW,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EavesdropConfig {
    pub intrusion_probability: f64,
}

impl Default for EavesdropConfig {
    fn default() -> Self {
        Self {
            intrusion_probability: DEFAULT_INTRUSION_PROBABILITY,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomConfig {
    /// Qubits measured per quantum draw.
    pub quantum_chunk_bits: usize,
    pub harvest_shots: usize,
}

impl Default for RandomConfig {
    fn default() -> Self {
        Self {
            quantum_chunk_bits: DEFAULT_CHUNK_BITS,
            harvest_shots: DEFAULT_HARVEST_SHOTS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CipherConfig {
    pub key_bytes: usize,
    pub nonce_bytes: usize,
    pub salt_bytes: usize,
    /// Recompute the tag on decrypt instead of checking only its length.
    pub strict_tag_check: bool,
}

impl Default for CipherConfig {
    fn default() -> Self {
        Self {
            key_bytes: 32,
            nonce_bytes: 12,
            salt_bytes: 16,
            strict_tag_check: false,
        }
    }
}

impl ProtocolConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shots == 0 {
            return Err(ConfigError::Invalid("shots must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.readout_error) {
            return Err(ConfigError::Invalid(format!(
                "readout_error {} must be in [0, 1]",
                self.readout_error
            )));
        }
        if self.monitor.window == 0 || self.monitor.stability_window == 0 {
            return Err(ConfigError::Invalid(
                "monitor windows must be at least 1".to_string(),
            ));
        }
        if self.monitor.stability_window > self.monitor.window {
            return Err(ConfigError::Invalid(format!(
                "monitor.stability_window {} exceeds monitor.window {}",
                self.monitor.stability_window, self.monitor.window
            )));
        }
        if !(0.0..=1.0).contains(&self.eavesdrop.intrusion_probability) {
            return Err(ConfigError::Invalid(format!(
                "eavesdrop.intrusion_probability {} must be in [0, 1]",
                self.eavesdrop.intrusion_probability
            )));
        }
        if !(1..=crate::backend::DENSITY_MATRIX_MAX_QUBITS).contains(&self.random.quantum_chunk_bits) {
            return Err(ConfigError::Invalid(format!(
                "random.quantum_chunk_bits must be in 1..={}",
                crate::backend::DENSITY_MATRIX_MAX_QUBITS
            )));
        }
        if self.random.harvest_shots == 0 {
            return Err(ConfigError::Invalid(
                "random.harvest_shots must be at least 1".to_string(),
            ));
        }
        if self.cipher.key_bytes == 0 {
            return Err(ConfigError::Invalid(
                "cipher.key_bytes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Generator for one component. Seeded runs mix `stream` into the seed so
    /// components do not share a sequence.
    pub fn rng(&self, stream: u64) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ stream),
            None => StdRng::from_os_rng(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(
            ProtocolConfig::from_toml_str("").unwrap(),
            ProtocolConfig::default()
        );
    }

    #[test]
    fn partial_document_overrides_fields() {
        let config = ProtocolConfig::from_toml_str(
            r#"
            shots = 2048
            seed = 7
            channel_model = "kraus"

            [cipher]
            strict_tag_check = true
            "#,
        )
        .unwrap();
        assert_eq!(config.shots, 2048);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.channel_model, ChannelModel::Kraus);
        assert!(config.cipher.strict_tag_check);
        assert_eq!(config.cipher.key_bytes, 32);
        assert_eq!(config.monitor.window, 50);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            ProtocolConfig::from_toml_str("shots = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ProtocolConfig::from_toml_str("[random]\nquantum_chunk_bits = 12"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ProtocolConfig::from_toml_str("shots = \"many\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            ProtocolConfig::from_file("/nonexistent/densecode.toml"),
            Err(ConfigError::Io(_))
        ));
    }
}
