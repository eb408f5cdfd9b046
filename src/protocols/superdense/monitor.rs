//! Rolling channel health derived from recent runs.

use crate::protocols::superdense::result::RunResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

pub const DEFAULT_WINDOW: usize = 50;
pub const DEFAULT_STABILITY_WINDOW: usize = 5;

/// One entry of the monitor's rolling window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelSample {
    pub timestamp: DateTime<Utc>,
    pub fidelity: f64,
    pub success: bool,
    pub noise_level: f64,
    /// Stability right after this sample was recorded.
    pub stability: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelState {
    Initializing,
    Excellent,
    Good,
    Degraded,
    Poor,
}

impl ChannelState {
    pub fn quality(&self) -> &'static str {
        match self {
            ChannelState::Initializing => "Unknown",
            ChannelState::Excellent => "High Performance",
            ChannelState::Good => "Stable Performance",
            ChannelState::Degraded => "Variable Performance",
            ChannelState::Poor => "Unstable Channel",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            ChannelState::Initializing => "Perform test transmission",
            ChannelState::Excellent => "Optimal for critical transmissions",
            ChannelState::Good => "Suitable for normal operations",
            ChannelState::Degraded => "Consider error correction",
            ChannelState::Poor => "Check hardware and reduce noise",
        }
    }

    fn classify(stability: f64, latest_fidelity: f64) -> Self {
        if stability > 0.8 && latest_fidelity > 0.7 {
            ChannelState::Excellent
        } else if stability > 0.6 && latest_fidelity > 0.5 {
            ChannelState::Good
        } else if stability > 0.4 {
            ChannelState::Degraded
        } else {
            ChannelState::Poor
        }
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChannelState::Initializing => "INITIALIZING",
            ChannelState::Excellent => "EXCELLENT",
            ChannelState::Good => "GOOD",
            ChannelState::Degraded => "DEGRADED",
            ChannelState::Poor => "POOR",
        };
        f.write_str(s)
    }
}

/// Snapshot returned by [`ChannelMonitor::status`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelStatus {
    pub status: ChannelState,
    pub quality: String,
    pub stability: f64,
    pub recommendation: String,
    pub consecutive_successes: usize,
    pub consecutive_failures: usize,
}

#[derive(Clone, Debug)]
pub struct ChannelMonitor {
    window: VecDeque<ChannelSample>,
    capacity: usize,
    stability_window: usize,
    consecutive_successes: usize,
    consecutive_failures: usize,
    stability: f64,
    last_update: Option<DateTime<Utc>>,
}

impl Default for ChannelMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_STABILITY_WINDOW)
    }
}

impl ChannelMonitor {
    pub fn new(capacity: usize, stability_window: usize) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            stability_window: stability_window.max(1),
            consecutive_successes: 0,
            consecutive_failures: 0,
            stability: 1.0,
            last_update: None,
        }
    }

    pub fn record(&mut self, result: &RunResult) {
        if result.success {
            self.consecutive_successes += 1;
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures += 1;
            self.consecutive_successes = 0;
        }

        self.window.push_back(ChannelSample {
            timestamp: result.timestamp,
            fidelity: result.fidelity,
            success: result.success,
            noise_level: result.noise_level,
            stability: self.stability,
        });
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }

        if let Some(stability) = self.recent_stability() {
            self.stability = stability;
            if let Some(latest) = self.window.back_mut() {
                latest.stability = stability;
            }
        }
        self.last_update = Some(Utc::now());
    }

    /// `0.6·success_rate + 0.3·mean_fidelity + 0.1·max(0, 1 − var(fidelity))`
    /// over the stability window, once it is full.
    fn recent_stability(&self) -> Option<f64> {
        let n = self.stability_window;
        if self.window.len() < n {
            return None;
        }
        let recent: Vec<&ChannelSample> = self.window.iter().rev().take(n).collect();
        let len = n as f64;

        let success_rate = recent.iter().filter(|s| s.success).count() as f64 / len;
        let mean = recent.iter().map(|s| s.fidelity).sum::<f64>() / len;
        let variance = recent
            .iter()
            .map(|s| (s.fidelity - mean).powi(2))
            .sum::<f64>()
            / len;

        Some(success_rate * 0.6 + mean * 0.3 + (1.0 - variance).max(0.0) * 0.1)
    }

    pub fn status(&self) -> ChannelStatus {
        let state = match self.window.back() {
            None => ChannelState::Initializing,
            Some(latest) => ChannelState::classify(self.stability, latest.fidelity),
        };

        ChannelStatus {
            status: state,
            quality: state.quality().to_string(),
            stability: self.stability,
            recommendation: state.recommendation().to_string(),
            consecutive_successes: self.consecutive_successes,
            consecutive_failures: self.consecutive_failures,
        }
    }

    pub fn stability(&self) -> f64 {
        self.stability
    }

    pub fn samples(&self) -> impl Iterator<Item = &ChannelSample> {
        self.window.iter()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.capacity, self.stability_window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MeasurementDistribution;
    use crate::protocols::superdense::message::Message;
    use crate::protocols::superdense::result::{ExecutionPath, QUANTUM_ADVANTAGE};

    fn result(success: bool, fidelity: f64) -> RunResult {
        let m = Message::from_bits(true, false);
        RunResult {
            original_bits: m,
            decoded_bits: m,
            encoding: m.encoding(),
            bell_state: m.encoding().bell_state(),
            fidelity,
            error_rate: 1.0 - fidelity,
            success,
            requested_noise: 0.0,
            noise_level: 0.0,
            execution_time: 0.0,
            measurement_counts: MeasurementDistribution::from_counts([("10", 1024)]),
            protocol_steps: Vec::new(),
            timestamp: Utc::now(),
            path: ExecutionPath::Circuit,
            quantum_advantage: QUANTUM_ADVANTAGE,
            crypto: None,
        }
    }

    #[test]
    fn starts_initializing() {
        let status = ChannelMonitor::default().status();
        assert_eq!(status.status, ChannelState::Initializing);
        assert_eq!(status.quality, "Unknown");
        assert_eq!(status.stability, 1.0);
    }

    #[test]
    fn stability_waits_for_full_window() {
        let mut monitor = ChannelMonitor::default();
        for _ in 0..4 {
            monitor.record(&result(false, 0.1));
        }
        assert_eq!(monitor.stability(), 1.0);
        monitor.record(&result(false, 0.1));
        assert!(monitor.stability() < 0.2);
    }

    #[test]
    fn counters_reset_on_flip() {
        let mut monitor = ChannelMonitor::default();
        monitor.record(&result(true, 0.9));
        monitor.record(&result(true, 0.9));
        monitor.record(&result(false, 0.2));
        let status = monitor.status();
        assert_eq!(status.consecutive_successes, 0);
        assert_eq!(status.consecutive_failures, 1);
    }

    #[test]
    fn window_is_capped() {
        let mut monitor = ChannelMonitor::new(3, 2);
        for _ in 0..10 {
            monitor.record(&result(true, 0.95));
        }
        assert_eq!(monitor.len(), 3);
    }

    #[test]
    fn transitions_between_extremes() {
        let mut monitor = ChannelMonitor::default();
        for _ in 0..5 {
            monitor.record(&result(true, 0.95));
        }
        assert_eq!(monitor.status().status, ChannelState::Excellent);

        for _ in 0..5 {
            monitor.record(&result(false, 0.2));
        }
        let state = monitor.status().status;
        assert!(matches!(state, ChannelState::Poor | ChannelState::Degraded));
    }
}
