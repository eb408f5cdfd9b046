mod channels;
mod circuit;
mod distribution;
pub mod errors;
mod gates;
mod measurements;
mod state;
pub mod utils;

pub use channels::QuantumChannel;
pub use circuit::{Circuit, Operation};
pub use distribution::MeasurementDistribution;
pub use gates::Gate;
pub use measurements::Measurement;
pub use state::QuantumState;
