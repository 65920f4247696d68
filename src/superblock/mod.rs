//! On-disk btrfs superblock: where the mirrors live and what one looks like.

mod csum;
mod structs;

use byteorder::{ByteOrder, LittleEndian};
use std::fmt;

pub use csum::{ChecksumKind, ChecksumStatus};
pub use structs::{BackupRoot, ChunkStripe, DevItem, Superblock, SysChunk, SysChunkArray};

/// Size of one superblock record on disk.
pub const SUPER_INFO_SIZE: usize = 4096;

/// Number of superblock copies the format defines.
pub const SUPER_MIRROR_MAX: usize = 3;

/// "_BHRfS_M" read as a little-endian u64.
pub const BTRFS_MAGIC: u64 = 0x4D5F_5366_5248_425F;

pub(crate) const MAGIC_OFFSET: usize = 0x40;
pub(crate) const CSUM_SIZE: usize = 32;

const PRIMARY_OFFSET: u64 = 64 * 1024;
const MIRROR_BASE: u64 = 16 * 1024;
const MIRROR_SHIFT: u32 = 12;

/// Byte offset of superblock copy `mirror`.
///
/// Copy 0 sits at 64 KiB; copy `n` at `16 KiB << (12 * n)`, i.e. 64 MiB and
/// 256 GiB. Callers must check `mirror < SUPER_MIRROR_MAX` first.
#[inline]
pub fn offset_of(mirror: usize) -> u64 {
    debug_assert!(mirror < SUPER_MIRROR_MAX, "mirror {mirror} out of range");
    if mirror == 0 {
        PRIMARY_OFFSET
    } else {
        MIRROR_BASE << (MIRROR_SHIFT * mirror as u32)
    }
}

/// Offsets of every mirror, ascending.
pub fn mirror_offsets() -> impl Iterator<Item = u64> {
    (0..SUPER_MIRROR_MAX).map(offset_of)
}

/// One superblock-sized record exactly as it was read from the device.
#[derive(Clone, PartialEq, Eq)]
pub struct RawSuperblock(Box<[u8; SUPER_INFO_SIZE]>);

impl RawSuperblock {
    pub fn zeroed() -> Self {
        Self(Box::new([0u8; SUPER_INFO_SIZE]))
    }

    /// Copies `bytes` into a record; `None` unless it is exactly one record long.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let array = <[u8; SUPER_INFO_SIZE]>::try_from(bytes).ok()?;
        Some(Self(Box::new(array)))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; SUPER_INFO_SIZE] {
        &self.0
    }

    #[inline]
    pub fn as_mut_bytes(&mut self) -> &mut [u8; SUPER_INFO_SIZE] {
        &mut self.0
    }

    /// The signature field, whatever it holds.
    #[inline]
    pub fn magic(&self) -> u64 {
        LittleEndian::read_u64(&self.0[MAGIC_OFFSET..MAGIC_OFFSET + 8])
    }

    #[inline]
    pub fn has_valid_magic(&self) -> bool {
        self.magic() == BTRFS_MAGIC
    }

    /// The bytes covered by the stored checksum.
    #[inline]
    pub(crate) fn checksummed_region(&self) -> &[u8] {
        &self.0[CSUM_SIZE..]
    }
}

impl fmt::Debug for RawSuperblock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawSuperblock")
            .field("magic", &format_args!("{:#018x}", self.magic()))
            .field("len", &SUPER_INFO_SIZE)
            .finish()
    }
}
