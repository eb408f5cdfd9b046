pub mod backend;
pub mod config;
mod core;
pub mod protocols;
mod sampler;

pub use crate::backend::{DensityMatrixBackend, QuantumBackend};
pub use crate::config::ProtocolConfig;
pub use crate::core::{
    Circuit, Gate, Measurement, MeasurementDistribution, Operation, QuantumChannel, QuantumState,
    errors, utils,
};
pub use crate::protocols::superdense::{Message, ProtocolFacade, RunResult};
pub use crate::sampler::Sampler;
