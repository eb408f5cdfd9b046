pub mod cipher;
pub mod entropy;
pub mod random;

pub use cipher::{EncryptedPackage, EntropyStats, KeyQuality, SymmetricCipherLayer};
pub use entropy::{byte_entropy, entropy};
pub use random::RandomBitSource;
