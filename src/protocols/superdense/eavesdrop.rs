//! Simulated CHSH-based eavesdropping check.
//!
//! The check is a standalone randomized draw; it does not look at the qubits of
//! any actual transmission.

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::f64::consts::SQRT_2;
use tracing::{debug, warn};

/// Maximum quantum CHSH value, 2√2.
pub const TSIRELSON_BOUND: f64 = 2.0 * SQRT_2;
/// Maximum CHSH value reachable by local hidden variables.
pub const CLASSICAL_BOUND: f64 = 2.0;

pub const DEFAULT_INTRUSION_PROBABILITY: f64 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SecurityCheck {
    pub is_secure: bool,
    /// `chsh_value / 2√2`, capped at 1.
    pub security_metric: f64,
    pub chsh_value: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityLevel {
    High,
    Moderate,
    PotentialRisk,
}

impl SecurityLevel {
    pub fn from_chsh(chsh_value: f64) -> Self {
        if chsh_value > 2.4 {
            SecurityLevel::High
        } else if chsh_value > CLASSICAL_BOUND {
            SecurityLevel::Moderate
        } else {
            SecurityLevel::PotentialRisk
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SecurityLogEntry {
    pub timestamp: DateTime<Utc>,
    pub check: SecurityCheck,
    pub level: SecurityLevel,
}

pub struct EavesdropDetector {
    rng: StdRng,
    intrusion_probability: f64,
    log: Vec<SecurityLogEntry>,
}

impl EavesdropDetector {
    /// `intrusion_probability` is the upper end of the per-check attack chance,
    /// which is itself drawn uniformly from `[0, intrusion_probability)`.
    pub fn new(rng: StdRng, intrusion_probability: f64) -> Self {
        Self {
            rng,
            intrusion_probability: intrusion_probability.clamp(0.0, 1.0),
            log: Vec::new(),
        }
    }

    pub fn check(&mut self) -> SecurityCheck {
        let baseline = self.rng.random_range(2.4..2.8);
        let attack_chance = self.rng.random::<f64>() * self.intrusion_probability;

        let (chsh_value, is_secure) = if self.rng.random::<f64>() < attack_chance {
            (self.rng.random_range(1.8..2.1), false)
        } else {
            (baseline, true)
        };

        let check = SecurityCheck {
            is_secure,
            security_metric: (chsh_value / TSIRELSON_BOUND).min(1.0),
            chsh_value,
        };

        if is_secure {
            debug!(chsh = chsh_value, "CHSH violation intact");
        } else {
            warn!(chsh = chsh_value, "CHSH violation degraded, possible eavesdropper");
        }

        self.log.push(SecurityLogEntry {
            timestamp: Utc::now(),
            check,
            level: SecurityLevel::from_chsh(chsh_value),
        });
        check
    }

    pub fn log(&self) -> &[SecurityLogEntry] {
        &self.log
    }

    pub fn clear(&mut self) {
        self.log.clear();
    }
}
