//! Protocols built on the simulator.
//!
//! `superdense` carries two classical bits per transmitted qubit over a shared
//! Bell pair; `crypto` is the optional XOR cipher layer keyed from harvested
//! random bits.

pub mod crypto;
pub mod superdense;

pub use superdense::{BellProtocolEngine, ProtocolFacade, RunResult};
