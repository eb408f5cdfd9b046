//! Two-bit messages and their superdense encodings.
//!
//! Outcome strings are written in message order: character 0 is `b0`, which
//! after Bell decoding is read from qubit 0 (the sender's qubit), and
//! character 1 is `b1`, read from qubit 1.

use crate::errors::ProtocolError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// An ordered pair of classical bits `(b0, b1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "[u8; 2]", try_from = "[u8; 2]")]
pub struct Message {
    b0: bool,
    b1: bool,
}

impl Message {
    /// All four messages in lexicographic order.
    pub const ALL: [Message; 4] = [
        Message::from_bits(false, false),
        Message::from_bits(false, true),
        Message::from_bits(true, false),
        Message::from_bits(true, true),
    ];

    /// Builds a message from integer bits, rejecting anything but 0 and 1.
    pub fn new(bit0: u8, bit1: u8) -> Result<Self, ProtocolError> {
        if bit0 > 1 || bit1 > 1 {
            return Err(ProtocolError::InvalidMessage { bit0, bit1 });
        }
        Ok(Self::from_bits(bit0 == 1, bit1 == 1))
    }

    pub const fn from_bits(b0: bool, b1: bool) -> Self {
        Self { b0, b1 }
    }

    pub fn bit0(&self) -> u8 {
        self.b0 as u8
    }

    pub fn bit1(&self) -> u8 {
        self.b1 as u8
    }

    pub fn bits(&self) -> [u8; 2] {
        [self.bit0(), self.bit1()]
    }

    /// The outcome string `"b0b1"`.
    pub fn label(&self) -> String {
        format!("{}{}", self.bit0(), self.bit1())
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let mut chars = label.chars();
        let parse = |c: Option<char>| match c {
            Some('0') => Some(false),
            Some('1') => Some(true),
            _ => None,
        };
        let b0 = parse(chars.next())?;
        let b1 = parse(chars.next())?;
        if chars.next().is_some() {
            return None;
        }
        Some(Self::from_bits(b0, b1))
    }

    pub fn encoding(&self) -> EncodingTag {
        EncodingTag::from_message(*self)
    }

    /// Derives a message from free text with the chosen rule.
    pub fn from_text(text: &str, method: TextEncoding) -> Self {
        match method {
            TextEncoding::FirstChar => {
                let Some(c) = text.chars().next() else {
                    return Self::from_bits(false, true);
                };
                // Leading two bits of the code point, padded to at least 8 bits
                let v = c as u32;
                let width = (32 - v.leading_zeros()).max(8);
                Self::from_bits((v >> (width - 1)) & 1 == 1, (v >> (width - 2)) & 1 == 1)
            }
            TextEncoding::Hash => {
                let digest = Sha256::digest(text.as_bytes());
                let low = digest[digest.len() - 1];
                Self::from_bits((low >> 1) & 1 == 1, low & 1 == 1)
            }
            TextEncoding::Frequency => {
                let mut seen = std::collections::HashMap::new();
                for c in text.chars() {
                    *seen.entry(c).or_insert(0usize) += 1;
                }
                let total = text.chars().count();
                let b0 = seen.len() as f64 > total as f64 / 2.0;
                let b1 = seen.values().any(|&n| n > 1);
                Self::from_bits(b0, b1)
            }
            TextEncoding::AsciiSum => {
                let sum: u64 = text.chars().map(|c| c as u64).sum();
                Self::from_bits(sum % 2 == 1, (sum / 2) % 2 == 1)
            }
            TextEncoding::Diversity => {
                let lower = text.to_lowercase();
                let vowels = lower.chars().filter(|c| "aeiou".contains(*c)).count();
                let consonants = lower
                    .chars()
                    .filter(|c| c.is_alphabetic() && !"aeiou".contains(*c))
                    .count();
                Self::from_bits(vowels > consonants, text.chars().count() > 5)
            }
        }
    }
}

impl From<Message> for [u8; 2] {
    fn from(m: Message) -> Self {
        m.bits()
    }
}

impl TryFrom<[u8; 2]> for Message {
    type Error = ProtocolError;

    fn try_from(bits: [u8; 2]) -> Result<Self, Self::Error> {
        Message::new(bits[0], bits[1])
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.bit0(), self.bit1())
    }
}

/// Rules for folding free text into a two-bit message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    /// Top two bits of the first character's 8-bit code.
    FirstChar,
    /// Low two bits of the SHA-256 digest.
    Hash,
    /// More unique than repeated characters, and any repeat at all.
    Frequency,
    /// Parity of the character-code sum and of its half.
    AsciiSum,
    /// More vowels than consonants, and longer than five characters.
    Diversity,
}

/// Gate applied by the sender: `00→I, 01→X, 10→Z, 11→XZ`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EncodingTag {
    I,
    X,
    Z,
    XZ,
}

impl EncodingTag {
    pub fn from_message(message: Message) -> Self {
        match (message.b0, message.b1) {
            (false, false) => EncodingTag::I,
            (false, true) => EncodingTag::X,
            (true, false) => EncodingTag::Z,
            (true, true) => EncodingTag::XZ,
        }
    }

    pub fn message(&self) -> Message {
        match self {
            EncodingTag::I => Message::from_bits(false, false),
            EncodingTag::X => Message::from_bits(false, true),
            EncodingTag::Z => Message::from_bits(true, false),
            EncodingTag::XZ => Message::from_bits(true, true),
        }
    }

    pub fn applies_x(&self) -> bool {
        matches!(self, EncodingTag::X | EncodingTag::XZ)
    }

    pub fn applies_z(&self) -> bool {
        matches!(self, EncodingTag::Z | EncodingTag::XZ)
    }

    pub fn bell_state(&self) -> BellState {
        match self {
            EncodingTag::I => BellState::PhiPlus,
            EncodingTag::X => BellState::PsiPlus,
            EncodingTag::Z => BellState::PhiMinus,
            EncodingTag::XZ => BellState::PsiMinus,
        }
    }
}

impl fmt::Display for EncodingTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EncodingTag::I => "I",
            EncodingTag::X => "X",
            EncodingTag::Z => "Z",
            EncodingTag::XZ => "XZ",
        };
        f.write_str(s)
    }
}

/// The Bell state the channel nominally carries after encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BellState {
    PhiPlus,
    PhiMinus,
    PsiPlus,
    PsiMinus,
}

impl fmt::Display for BellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BellState::PhiPlus => "|Φ+⟩",
            BellState::PhiMinus => "|Φ-⟩",
            BellState::PsiPlus => "|Ψ+⟩",
            BellState::PsiMinus => "|Ψ-⟩",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn encoding_is_a_bijection() {
        let tags: HashSet<EncodingTag> = Message::ALL.iter().map(|m| m.encoding()).collect();
        assert_eq!(tags.len(), 4);
        for m in Message::ALL {
            assert_eq!(m.encoding().message(), m);
        }
        assert_eq!(Message::from_bits(false, true).encoding(), EncodingTag::X);
        assert_eq!(Message::from_bits(true, false).encoding(), EncodingTag::Z);
    }

    #[test]
    fn bell_states_are_distinct() {
        let states: HashSet<BellState> = Message::ALL
            .iter()
            .map(|m| m.encoding().bell_state())
            .collect();
        assert_eq!(states.len(), 4);
    }

    #[test]
    fn rejects_non_binary_bits() {
        assert_eq!(
            Message::new(2, 0),
            Err(ProtocolError::InvalidMessage { bit0: 2, bit1: 0 })
        );
    }

    #[test]
    fn serializes_as_bit_pair() {
        let m = Message::from_bits(true, false);
        assert_eq!(serde_json::to_string(&m).unwrap(), "[1,0]");
        assert!(serde_json::from_str::<Message>("[1,3]").is_err());
    }

    #[test]
    fn first_char_rule_matches_ascii_layout() {
        // 'A' = 0b0100_0001
        assert_eq!(
            Message::from_text("A", TextEncoding::FirstChar),
            Message::from_bits(false, true)
        );
        assert_eq!(
            Message::from_text("", TextEncoding::FirstChar),
            Message::from_bits(false, true)
        );
    }

    #[test]
    fn ascii_sum_rule() {
        // 'a' + 'b' = 97 + 98 = 195 = 0b1100_0011
        assert_eq!(
            Message::from_text("ab", TextEncoding::AsciiSum),
            Message::from_bits(true, true)
        );
    }

    #[test]
    fn diversity_and_frequency_rules() {
        assert_eq!(
            Message::from_text("aeiou", TextEncoding::Diversity),
            Message::from_bits(true, false)
        );
        assert_eq!(
            Message::from_text("hello", TextEncoding::Frequency),
            Message::from_bits(true, true)
        );
    }

    proptest! {
        #[test]
        fn labels_round_trip(b0 in any::<bool>(), b1 in any::<bool>()) {
            let m = Message::from_bits(b0, b1);
            prop_assert_eq!(Message::from_label(&m.label()), Some(m));
        }

        #[test]
        fn hash_rule_is_deterministic(text in ".{0,32}") {
            prop_assert_eq!(
                Message::from_text(&text, TextEncoding::Hash),
                Message::from_text(&text, TextEncoding::Hash)
            );
        }
    }
}
