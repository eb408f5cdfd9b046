//! Aggregate views over a results history.

use crate::protocols::superdense::message::Message;
use crate::protocols::superdense::result::RunResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformanceAssessment {
    Excellent,
    Good,
    Low,
}

impl PerformanceAssessment {
    pub fn from_fidelity(average_fidelity: f64) -> Self {
        if average_fidelity > 0.9 {
            PerformanceAssessment::Excellent
        } else if average_fidelity < 0.7 {
            PerformanceAssessment::Low
        } else {
            PerformanceAssessment::Good
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoiseEnvironment {
    High,
    Moderate,
    Low,
}

impl NoiseEnvironment {
    pub fn from_noise(average_noise: f64) -> Self {
        if average_noise > 0.2 {
            NoiseEnvironment::High
        } else if average_noise < 0.05 {
            NoiseEnvironment::Low
        } else {
            NoiseEnvironment::Moderate
        }
    }
}

/// Channel grade from a (noise, fidelity) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl ChannelQuality {
    pub fn from_metrics(noise: f64, fidelity: f64) -> Self {
        if noise < 0.05 && fidelity > 0.9 {
            ChannelQuality::Excellent
        } else if noise < 0.15 && fidelity > 0.7 {
            ChannelQuality::Good
        } else if noise < 0.3 && fidelity > 0.5 {
            ChannelQuality::Fair
        } else {
            ChannelQuality::Poor
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransmissionSummary {
    pub total_runs: usize,
    pub average_fidelity: f64,
    pub success_rate: f64,
    pub average_error_rate: f64,
    pub average_noise: f64,
    pub assessment: PerformanceAssessment,
    pub noise_environment: NoiseEnvironment,
    pub channel_quality: ChannelQuality,
}

impl TransmissionSummary {
    /// `None` for an empty history.
    pub fn from_history(history: &[RunResult]) -> Option<Self> {
        if history.is_empty() {
            return None;
        }
        let n = history.len() as f64;
        let average_fidelity = history.iter().map(|r| r.fidelity).sum::<f64>() / n;
        let success_rate = history.iter().filter(|r| r.success).count() as f64 / n;
        let average_error_rate = history.iter().map(|r| r.error_rate).sum::<f64>() / n;
        let average_noise = history.iter().map(|r| r.noise_level).sum::<f64>() / n;

        Some(Self {
            total_runs: history.len(),
            average_fidelity,
            success_rate,
            average_error_rate,
            average_noise,
            assessment: PerformanceAssessment::from_fidelity(average_fidelity),
            noise_environment: NoiseEnvironment::from_noise(average_noise),
            channel_quality: ChannelQuality::from_metrics(average_noise, average_fidelity),
        })
    }
}

/// Per-message tally used by balance testing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BalanceEntry {
    pub success_rate: f64,
    pub average_fidelity: f64,
    pub total_tests: usize,
}

/// Groups runs by original message, keyed `"b0b1"`.
pub fn balance<'a>(runs: impl IntoIterator<Item = &'a RunResult>) -> BTreeMap<String, BalanceEntry> {
    let mut tallies: BTreeMap<Message, (usize, usize, f64)> = BTreeMap::new();
    for r in runs {
        let entry = tallies.entry(r.original_bits).or_default();
        entry.0 += 1;
        entry.1 += r.success as usize;
        entry.2 += r.fidelity;
    }

    tallies
        .into_iter()
        .map(|(message, (total, successes, fidelity))| {
            let n = total as f64;
            (
                message.label(),
                BalanceEntry {
                    success_rate: successes as f64 / n,
                    average_fidelity: fidelity / n,
                    total_tests: total,
                },
            )
        })
        .collect()
}
