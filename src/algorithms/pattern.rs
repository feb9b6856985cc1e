use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("erasure pattern must contain at least one pass")]
    Empty,
}

/// Ordered pattern bytes, one per overwrite pass. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct ErasurePattern(Vec<u8>);

impl ErasurePattern {
    /// VSITR 7-pass sequence
    pub const VSITR: [u8; 7] = [0x00, 0xFF, 0x00, 0xFF, 0x00, 0xFF, 0xAA];

    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, PatternError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(PatternError::Empty);
        }
        Ok(Self(bytes))
    }

    pub fn vsitr() -> Self {
        Self(Self::VSITR.to_vec())
    }

    /// Single pass of zeros
    pub fn zero() -> Self {
        Self(vec![0x00])
    }

    pub fn passes(&self) -> usize {
        self.0.len()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().copied()
    }
}

impl Default for ErasurePattern {
    fn default() -> Self {
        Self::vsitr()
    }
}

impl TryFrom<Vec<u8>> for ErasurePattern {
    type Error = PatternError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        Self::new(bytes)
    }
}

impl From<ErasurePattern> for Vec<u8> {
    fn from(pattern: ErasurePattern) -> Self {
        pattern.0
    }
}
