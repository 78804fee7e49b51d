//! Candidate identifier generation

use crate::id::HostId;
use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;
use uuid::Builder;

/// The randomness source could not produce a value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("randomness source unavailable: {message}")]
pub struct EntropyError {
    message: String,
}

impl EntropyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Source of fresh candidate identifiers
pub trait IdGenerator {
    fn generate(&self) -> Result<HostId, EntropyError>;
}

impl<F> IdGenerator for F
where
    F: Fn() -> Result<HostId, EntropyError>,
{
    fn generate(&self) -> Result<HostId, EntropyError> {
        self()
    }
}

/// UUID v4 generator backed by the operating system RNG
///
/// Uses the fallible RNG interface so that an unseeded entropy pool early in
/// boot surfaces as an [`EntropyError`] instead of a panic.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomUuid;

impl IdGenerator for RandomUuid {
    fn generate(&self) -> Result<HostId, EntropyError> {
        let mut bytes = [0u8; 16];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| EntropyError::new(e.to_string()))?;
        Ok(HostId::from_uuid(Builder::from_random_bytes(bytes).into_uuid()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::{Uuid, Version};

    #[test]
    fn test_random_uuid_is_v4() {
        let id = RandomUuid.generate().unwrap();
        let parsed = Uuid::parse_str(id.as_str()).unwrap();
        assert_eq!(parsed.get_version(), Some(Version::Random));
        assert_eq!(id.as_str().len(), 36);
    }

    #[test]
    fn test_random_uuid_values_differ() {
        let a = RandomUuid.generate().unwrap();
        let b = RandomUuid.generate().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_closure_generator() {
        let fixed = || HostId::parse("fixed-id").map_err(|e| EntropyError::new(e.to_string()));
        assert_eq!(fixed.generate().unwrap().as_str(), "fixed-id");

        let failing = || -> Result<HostId, EntropyError> { Err(EntropyError::new("pool empty")) };
        assert_eq!(failing.generate(), Err(EntropyError::new("pool empty")));
    }
}
