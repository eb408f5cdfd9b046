//! Superdense coding over a noisy channel.

pub mod eavesdrop;
pub mod engine;
pub mod facade;
pub mod fallback;
pub mod message;
pub mod monitor;
pub mod noise;
pub mod report;
pub mod result;
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use eavesdrop::{EavesdropDetector, SecurityCheck, SecurityLevel};
pub use engine::BellProtocolEngine;
pub use facade::ProtocolFacade;
pub use message::{BellState, EncodingTag, Message, TextEncoding};
pub use monitor::{ChannelMonitor, ChannelState, ChannelStatus};
pub use noise::{ChannelModel, ConstantDrift, EnvironmentDrift, PeriodicDrift};
pub use result::{CryptoReport, ExecutionPath, RunResult};
