//! XOR cipher over the two message bits, keyed from [`RandomBitSource`].
//!
//! This is a toy construction. The key is stretched by hashing and XORed onto
//! the message, and the tag is `SHA-256(ciphertext ‖ key ‖ salt)`. By default
//! `decrypt` only checks the tag *length*, which provides no integrity at all;
//! `strict_tag_check` recomputes the tag and compares it in constant time, but
//! even then the tag is not a MAC with any formal security.

use crate::config::CipherConfig;
use crate::errors::CipherError;
use crate::protocols::crypto::entropy::byte_entropy;
use crate::protocols::crypto::random::RandomBitSource;
use crate::protocols::superdense::message::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;
use tracing::debug;

pub const TAG_LEN: usize = 32;

/// Entropy quality grade of key material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyQuality {
    Excellent,
    Good,
    Fair,
}

impl KeyQuality {
    /// Grades `entropy / max_entropy`.
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= 0.9 {
            KeyQuality::Excellent
        } else if ratio >= 0.75 {
            KeyQuality::Good
        } else {
            KeyQuality::Fair
        }
    }
}

impl fmt::Display for KeyQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KeyQuality::Excellent => "Excellent",
            KeyQuality::Good => "Good",
            KeyQuality::Fair => "Fair",
        };
        f.write_str(s)
    }
}

/// Highest byte entropy reachable by `len` bytes.
fn max_byte_entropy(len: usize) -> f64 {
    (len.clamp(1, 256) as f64).log2()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub user_id: String,
    /// Byte entropy of the master key, at most 8.0.
    pub key_entropy: f64,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub security_level: KeyQuality,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EncryptedPackage {
    /// One byte per message bit.
    pub ciphertext: Vec<u8>,
    /// Stretched key, same length as the ciphertext.
    pub key: Vec<u8>,
    pub nonce: Vec<u8>,
    pub salt: Vec<u8>,
    pub auth_tag: Vec<u8>,
    pub metadata: PackageMetadata,
}

impl EncryptedPackage {
    /// The bits that go over the quantum channel: the low bit of each ciphertext byte.
    pub fn transmission_bits(&self) -> Result<Message, CipherError> {
        match self.ciphertext.as_slice() {
            [c0, c1] => Ok(Message::from_bits(c0 & 1 == 1, c1 & 1 == 1)),
            other => Err(CipherError::MalformedPackage(format!(
                "expected 2 ciphertext bytes, got {}",
                other.len()
            ))),
        }
    }

    /// Copy of the package as seen by the receiver after the channel delivered `bits`.
    pub fn with_received_bits(&self, bits: Message) -> Self {
        let mut received = self.clone();
        for (byte, bit) in received.ciphertext.iter_mut().zip(bits.bits()) {
            *byte = (*byte & !1) | bit;
        }
        received
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntropyStats {
    pub avg_key_entropy: f64,
    pub quantum_quality: KeyQuality,
    pub total_sessions: usize,
}

#[derive(Clone, Copy, Debug)]
struct SessionRecord {
    key_entropy: f64,
    max_entropy: f64,
}

pub struct SymmetricCipherLayer {
    source: RandomBitSource,
    config: CipherConfig,
    sessions: Vec<SessionRecord>,
}

impl SymmetricCipherLayer {
    pub fn new(source: RandomBitSource, config: CipherConfig) -> Self {
        Self {
            source,
            config,
            sessions: Vec::new(),
        }
    }

    pub fn source_mut(&mut self) -> &mut RandomBitSource {
        &mut self.source
    }

    pub fn encrypt(&mut self, message: Message, user_id: &str) -> EncryptedPackage {
        let master = self.source.generate_key(self.config.key_bytes);
        let nonce = self.source.generate_nonce(self.config.nonce_bytes);
        let salt = self.source.secure_bytes(self.config.salt_bytes);

        let plaintext = message.bits();
        let key = self.stretch_key(&master, &nonce, plaintext.len());
        let ciphertext: Vec<u8> = plaintext.iter().zip(&key).map(|(p, k)| p ^ k).collect();
        let auth_tag = compute_tag(&ciphertext, &key, &salt);

        let key_entropy = byte_entropy(&master);
        let max_entropy = max_byte_entropy(master.len());
        self.sessions.push(SessionRecord {
            key_entropy,
            max_entropy,
        });

        let timestamp = Utc::now();
        let session_id = session_id(user_id, &nonce, &timestamp);
        debug!(user_id, %session_id, key_entropy, "message encrypted");

        EncryptedPackage {
            ciphertext,
            key,
            nonce,
            salt,
            auth_tag,
            metadata: PackageMetadata {
                user_id: user_id.to_string(),
                key_entropy,
                timestamp,
                session_id,
                security_level: KeyQuality::from_ratio(key_entropy / max_entropy),
            },
        }
    }

    /// `stretched[i] = SHA-256(master ‖ nonce ‖ i)[0] ^ fresh random byte`
    fn stretch_key(&mut self, master: &[u8], nonce: &[u8], len: usize) -> Vec<u8> {
        (0..len)
            .map(|i| {
                let digest = Sha256::new()
                    .chain_update(master)
                    .chain_update(nonce)
                    .chain_update((i as u32).to_be_bytes())
                    .finalize();
                let extra = self.source.generate_key(1).first().copied().unwrap_or(0);
                digest[0] ^ extra
            })
            .collect()
    }

    pub fn decrypt(&self, package: &EncryptedPackage) -> Result<Message, CipherError> {
        if package.key.len() != package.ciphertext.len() {
            return Err(CipherError::MalformedPackage(format!(
                "key length {} does not match ciphertext length {}",
                package.key.len(),
                package.ciphertext.len()
            )));
        }
        self.verify_tag(package)?;

        let plaintext: Vec<u8> = package
            .ciphertext
            .iter()
            .zip(&package.key)
            .map(|(c, k)| c ^ k)
            .collect();

        match plaintext.as_slice() {
            [b0, b1] => Message::new(*b0, *b1).map_err(|e| CipherError::MalformedPackage(e.to_string())),
            other => Err(CipherError::MalformedPackage(format!(
                "expected 2 plaintext bytes, got {}",
                other.len()
            ))),
        }
    }

    fn verify_tag(&self, package: &EncryptedPackage) -> Result<(), CipherError> {
        if package.auth_tag.len() != TAG_LEN {
            return Err(CipherError::AuthenticationFailure(format!(
                "tag is {} bytes, expected {TAG_LEN}",
                package.auth_tag.len()
            )));
        }
        if !self.config.strict_tag_check {
            return Ok(());
        }

        let expected = compute_tag(&package.ciphertext, &package.key, &package.salt);
        if bool::from(expected.as_slice().ct_eq(&package.auth_tag)) {
            Ok(())
        } else {
            Err(CipherError::AuthenticationFailure(
                "tag does not match package contents".to_string(),
            ))
        }
    }

    pub fn entropy_stats(&self) -> Option<EntropyStats> {
        if self.sessions.is_empty() {
            return None;
        }
        let n = self.sessions.len() as f64;
        let avg_key_entropy = self.sessions.iter().map(|s| s.key_entropy).sum::<f64>() / n;
        let avg_ratio = self
            .sessions
            .iter()
            .map(|s| s.key_entropy / s.max_entropy)
            .sum::<f64>()
            / n;

        Some(EntropyStats {
            avg_key_entropy,
            quantum_quality: KeyQuality::from_ratio(avg_ratio),
            total_sessions: self.sessions.len(),
        })
    }

    pub fn clear_sessions(&mut self) {
        self.sessions.clear();
    }
}

pub fn compute_tag(ciphertext: &[u8], key: &[u8], salt: &[u8]) -> Vec<u8> {
    Sha256::new()
        .chain_update(ciphertext)
        .chain_update(key)
        .chain_update(salt)
        .finalize()
        .to_vec()
}

fn session_id(user_id: &str, nonce: &[u8], timestamp: &DateTime<Utc>) -> String {
    let digest = Sha256::new()
        .chain_update(user_id.as_bytes())
        .chain_update(nonce)
        .chain_update(timestamp.to_rfc3339().as_bytes())
        .finalize();
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn layer(strict: bool) -> SymmetricCipherLayer {
        let source = RandomBitSource::new(StdRng::seed_from_u64(21), None, 4, 64);
        SymmetricCipherLayer::new(
            source,
            CipherConfig {
                strict_tag_check: strict,
                ..CipherConfig::default()
            },
        )
    }

    #[test]
    fn package_shape() {
        let mut cipher = layer(false);
        let pkg = cipher.encrypt(Message::from_bits(true, false), "alice");
        assert_eq!(pkg.ciphertext.len(), 2);
        assert_eq!(pkg.key.len(), 2);
        assert_eq!(pkg.nonce.len(), 12);
        assert_eq!(pkg.salt.len(), 16);
        assert_eq!(pkg.auth_tag.len(), TAG_LEN);
        assert_eq!(pkg.metadata.session_id.len(), 16);
        assert!(pkg.metadata.key_entropy <= 8.0);
    }

    #[test]
    fn weak_check_only_looks_at_tag_length() {
        let mut cipher = layer(false);
        let mut pkg = cipher.encrypt(Message::from_bits(false, true), "alice");
        pkg.auth_tag[0] ^= 0xff;
        assert!(cipher.decrypt(&pkg).is_ok());

        pkg.auth_tag.truncate(16);
        assert!(matches!(
            cipher.decrypt(&pkg),
            Err(CipherError::AuthenticationFailure(_))
        ));
    }

    #[test]
    fn strict_check_rejects_tampering() {
        let mut cipher = layer(true);
        let pkg = cipher.encrypt(Message::from_bits(true, true), "bob");
        assert_eq!(cipher.decrypt(&pkg), Ok(Message::from_bits(true, true)));

        let flipped = pkg.with_received_bits(Message::from_bits(
            pkg.transmission_bits().unwrap().bit0() == 0,
            pkg.transmission_bits().unwrap().bit1() == 1,
        ));
        assert!(matches!(
            cipher.decrypt(&flipped),
            Err(CipherError::AuthenticationFailure(_))
        ));
    }

    #[test]
    fn received_bits_flow_through_decryption() {
        let mut cipher = layer(false);
        let m = Message::from_bits(false, true);
        let pkg = cipher.encrypt(m, "alice");
        let sent = pkg.transmission_bits().unwrap();
        assert_eq!(cipher.decrypt(&pkg.with_received_bits(sent)), Ok(m));

        let wrong = Message::from_bits(sent.bit0() == 0, sent.bit1() == 1);
        let decrypted = cipher.decrypt(&pkg.with_received_bits(wrong)).unwrap();
        assert_eq!(decrypted, Message::from_bits(m.bit0() == 0, m.bit1() == 1));
    }

    #[test]
    fn entropy_stats_track_sessions() {
        let mut cipher = layer(false);
        assert!(cipher.entropy_stats().is_none());
        for _ in 0..3 {
            cipher.encrypt(Message::from_bits(false, false), "alice");
        }
        let stats = cipher.entropy_stats().unwrap();
        assert_eq!(stats.total_sessions, 3);
        assert!(stats.avg_key_entropy > 4.0 && stats.avg_key_entropy <= 5.0);
        assert_eq!(stats.quantum_quality, KeyQuality::Excellent);
    }

    proptest! {
        #[test]
        fn round_trip(b0 in any::<bool>(), b1 in any::<bool>(), strict in any::<bool>()) {
            let mut cipher = layer(strict);
            let m = Message::from_bits(b0, b1);
            let pkg = cipher.encrypt(m, "alice");
            prop_assert_eq!(cipher.decrypt(&pkg), Ok(m));
        }
    }
}
