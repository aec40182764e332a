//! Content digests used to deduplicate gadget windows.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Hash function used for content digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Md5,
    Sha256,
    Blake3,
}

impl DigestAlgorithm {
    /// Hex digest of `data` under this algorithm.
    pub fn hex_digest(self, data: &[u8]) -> String {
        match self {
            DigestAlgorithm::Md5 => md5_digest(data),
            DigestAlgorithm::Sha256 => sha256_digest(data),
            DigestAlgorithm::Blake3 => blake3_digest(data),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestAlgorithm::Md5 => write!(f, "md5"),
            DigestAlgorithm::Sha256 => write!(f, "sha256"),
            DigestAlgorithm::Blake3 => write!(f, "blake3"),
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(DigestAlgorithm::Md5),
            "sha256" => Ok(DigestAlgorithm::Sha256),
            "blake3" => Ok(DigestAlgorithm::Blake3),
            other => Err(format!("unknown digest algorithm '{}'", other)),
        }
    }
}

/// Computes the MD5 digest of the given data and returns it as a hex string.
pub fn md5_digest(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// Computes the SHA-256 digest of the given data and returns it as a hex string.
pub fn sha256_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Computes the BLAKE3 digest of the given data and returns it as a hex string.
pub fn blake3_digest(data: &[u8]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(data);
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(md5_digest(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(
            sha256_digest(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            blake3_digest(b""),
            "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
        );
    }

    #[test]
    fn test_algorithm_dispatch() {
        let data = [0x5f, 0xc3];
        assert_eq!(DigestAlgorithm::Md5.hex_digest(&data), md5_digest(&data));
        assert_eq!(DigestAlgorithm::Sha256.hex_digest(&data).len(), 64);
        assert_eq!(DigestAlgorithm::Blake3.hex_digest(&data).len(), 64);
    }

    #[test]
    fn test_parse_algorithm() {
        assert_eq!("MD5".parse::<DigestAlgorithm>(), Ok(DigestAlgorithm::Md5));
        assert_eq!("blake3".parse::<DigestAlgorithm>(), Ok(DigestAlgorithm::Blake3));
        assert!("crc32".parse::<DigestAlgorithm>().is_err());
        assert_eq!(DigestAlgorithm::default().to_string(), "md5");
    }
}
