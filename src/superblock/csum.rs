use super::RawSuperblock;
use blake2::Blake2b;
use blake2::digest::consts::U32;
use byteorder::{ByteOrder, LittleEndian};
use sha2::{Digest, Sha256};
use std::fmt;

/// Checksum algorithm named by the superblock's `csum_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumKind {
    Crc32c,
    XxHash64,
    Sha256,
    Blake2b,
    Unknown(u16),
}

impl ChecksumKind {
    pub fn from_raw(csum_type: u16) -> Self {
        match csum_type {
            0 => Self::Crc32c,
            1 => Self::XxHash64,
            2 => Self::Sha256,
            3 => Self::Blake2b,
            other => Self::Unknown(other),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Crc32c => "crc32c",
            Self::XxHash64 => "xxhash64",
            Self::Sha256 => "sha256",
            Self::Blake2b => "blake2b",
            Self::Unknown(_) => "INVALID",
        }
    }

    /// Bytes of the 32-byte csum field actually used.
    pub fn size(&self) -> Option<usize> {
        match self {
            Self::Crc32c => Some(4),
            Self::XxHash64 => Some(8),
            Self::Sha256 | Self::Blake2b => Some(32),
            Self::Unknown(_) => None,
        }
    }

    /// Checksum of `data` in on-disk byte order, if this build can compute it.
    pub fn compute(&self, data: &[u8]) -> Option<Vec<u8>> {
        match self {
            Self::Crc32c => {
                let mut out = [0u8; 4];
                LittleEndian::write_u32(&mut out, crc32c::crc32c(data));
                Some(out.to_vec())
            }
            Self::XxHash64 => {
                let mut out = [0u8; 8];
                LittleEndian::write_u64(&mut out, xxhash_rust::xxh64::xxh64(data, 0));
                Some(out.to_vec())
            }
            Self::Sha256 => Some(Sha256::digest(data).to_vec()),
            Self::Blake2b => Some(Blake2b::<U32>::digest(data).to_vec()),
            Self::Unknown(_) => None,
        }
    }

    /// Compares the stored checksum of `record` against a freshly computed one.
    pub fn verify(&self, record: &RawSuperblock) -> ChecksumStatus {
        let (Some(size), Some(computed)) = (self.size(), self.compute(record.checksummed_region()))
        else {
            return ChecksumStatus::Unverified;
        };
        if record.as_bytes()[..size] == computed[..] {
            ChecksumStatus::Match
        } else {
            ChecksumStatus::Mismatch
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumStatus {
    Match,
    Mismatch,
    Unverified,
}

impl fmt::Display for ChecksumStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChecksumStatus::Match => write!(f, "[match]"),
            ChecksumStatus::Mismatch => write!(f, "[DON'T MATCH]"),
            ChecksumStatus::Unverified => write!(f, "[UNKNOWN CSUM TYPE OR SIZE]"),
        }
    }
}
