use num_complex::Complex64;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum GateError {
    #[error("gate matrix is not unitary")]
    NonUnitary,

    #[error("gate matrix is not square")]
    NotSquareMatrix,

    #[error("gate side length is not a power of two")]
    InvalidDimensions,

    #[error("qubit {0} is both a control and a target")]
    ControlTargetOverlap(usize),

    #[error("qubit {0} appears twice")]
    DuplicateQubit(usize),
}

#[derive(Error, Debug, Clone)]
pub enum MeasurementError {
    #[error("{ops} operators but {labels} labels")]
    CountMismatch { ops: usize, labels: usize },

    #[error("measurement operators are not complete")]
    NotComplete,

    #[error("measurement operators must share one 2^n × 2^n shape")]
    InvalidDimensions,

    #[error("measurement spans {expected} qubits, got {got} targets")]
    TargetMismatch { expected: usize, got: usize },

    #[error("qubit {0} appears twice")]
    DuplicateQubit(usize),
}

#[derive(Error, Debug, Clone)]
pub enum StateError {
    #[error("density matrix trace is {0}, expected 1")]
    InvalidTrace(Complex64),

    #[error("density matrix side length is not a power of two")]
    InvalidDimensions,

    #[error("expected a {expected}-wide operand, got {got_rows}×{got_cols}")]
    DimensionMismatch {
        expected: usize,
        got_rows: usize,
        got_cols: usize,
    },

    #[error("qubit {index} is outside a {num_qubits}-qubit register")]
    IndexOutOfBounds { index: usize, num_qubits: usize },

    #[error(transparent)]
    MeasurementError(#[from] MeasurementError),

    #[error(transparent)]
    GateError(#[from] GateError),

    #[error(transparent)]
    ChannelError(#[from] ChannelError),
}

#[derive(Error, Debug, Clone)]
pub enum ChannelError {
    #[error("channel has no Kraus operators")]
    Empty,

    #[error("Kraus operators are not trace preserving")]
    NotComplete,

    #[error("Kraus operators must be 2^n × 2^n")]
    InvalidDimensions,

    #[error("Kraus operators differ in size")]
    OperatorSizeMismatch,

    #[error("probability {0} is outside [0, 1]")]
    InvalidProbability(f64),

    #[error("qubit {0} appears twice")]
    DuplicateQubit(usize),
}

/// Reasons a quantum backend could not produce a usable distribution.
///
/// Every variant is recovered locally by the statistical fallback.
#[derive(Error, Debug, Clone)]
pub enum BackendError {
    #[error("no quantum backend configured")]
    NotConfigured,

    #[error("circuit needs {requested} qubits, backend supports {max}")]
    TooManyQubits { requested: usize, max: usize },

    #[error("measurement produced an empty distribution")]
    EmptyDistribution,

    #[error("circuit has no measurement")]
    MissingMeasurement,

    #[error("simulation failed: {0}")]
    Simulation(#[from] StateError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CipherError {
    /// The authentication tag did not pass verification.
    #[error("authentication failure: {0}")]
    AuthenticationFailure(String),

    #[error("malformed package: {0}")]
    MalformedPackage(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("invalid message bits ({bit0}, {bit1}): each bit must be 0 or 1")]
    InvalidMessage { bit0: u8, bit1: u8 },

    #[error("invalid noise level {0}: must be a finite value in [0.0, 1.0]")]
    InvalidNoiseLevel(f64),

    #[error("batch size must be at least 1")]
    InvalidBatchSize,

    #[error("cipher error: {0}")]
    Cipher(#[from] CipherError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
