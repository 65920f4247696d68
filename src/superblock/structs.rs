use super::{CSUM_SIZE, MAGIC_OFFSET, RawSuperblock, SUPER_INFO_SIZE};
use byteorder::{ByteOrder, LittleEndian};

const FSID_OFFSET: usize = 0x20;
const BYTENR_OFFSET: usize = 0x30;
const FLAGS_OFFSET: usize = 0x38;
const GENERATION_OFFSET: usize = 0x48;
const ROOT_OFFSET: usize = 0x50;
const CHUNK_ROOT_OFFSET: usize = 0x58;
const LOG_ROOT_OFFSET: usize = 0x60;
const TOTAL_BYTES_OFFSET: usize = 0x70;
const BYTES_USED_OFFSET: usize = 0x78;
const ROOT_DIR_OBJECTID_OFFSET: usize = 0x80;
const NUM_DEVICES_OFFSET: usize = 0x88;
const SECTORSIZE_OFFSET: usize = 0x90;
const NODESIZE_OFFSET: usize = 0x94;
const LEAFSIZE_OFFSET: usize = 0x98;
const STRIPESIZE_OFFSET: usize = 0x9C;
const SYS_CHUNK_ARRAY_SIZE_OFFSET: usize = 0xA0;
const CHUNK_ROOT_GENERATION_OFFSET: usize = 0xA4;
const COMPAT_FLAGS_OFFSET: usize = 0xAC;
const COMPAT_RO_FLAGS_OFFSET: usize = 0xB4;
const INCOMPAT_FLAGS_OFFSET: usize = 0xBC;
const CSUM_TYPE_OFFSET: usize = 0xC4;
const ROOT_LEVEL_OFFSET: usize = 0xC6;
const CHUNK_ROOT_LEVEL_OFFSET: usize = 0xC7;
const LOG_ROOT_LEVEL_OFFSET: usize = 0xC8;
const DEV_ITEM_OFFSET: usize = 0xC9;
const LABEL_OFFSET: usize = 0x12B;
const LABEL_SIZE: usize = 256;
const CACHE_GENERATION_OFFSET: usize = 0x22B;
const UUID_TREE_GENERATION_OFFSET: usize = 0x233;
const METADATA_UUID_OFFSET: usize = 0x23B;
const SYS_CHUNK_ARRAY_OFFSET: usize = 0x32B;
const SYS_CHUNK_ARRAY_MAX: usize = 2048;
const SUPER_ROOTS_OFFSET: usize = 0xB2B;
const NUM_BACKUP_ROOTS: usize = 4;
const BACKUP_ROOT_SIZE: usize = 168;

const DISK_KEY_SIZE: usize = 17;
const CHUNK_FIXED_SIZE: usize = 48;
const STRIPE_SIZE: usize = 32;
const CHUNK_ITEM_KEY: u8 = 228;

#[inline]
fn le_u64(buf: &[u8], offset: usize) -> u64 {
    LittleEndian::read_u64(&buf[offset..offset + 8])
}

#[inline]
fn le_u32(buf: &[u8], offset: usize) -> u32 {
    LittleEndian::read_u32(&buf[offset..offset + 4])
}

#[inline]
fn le_u16(buf: &[u8], offset: usize) -> u16 {
    LittleEndian::read_u16(&buf[offset..offset + 2])
}

#[inline]
fn fixed<const N: usize>(buf: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[offset..offset + N]);
    out
}

/// The device this superblock copy was written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevItem {
    pub devid: u64,
    pub total_bytes: u64,
    pub bytes_used: u64,
    pub io_align: u32,
    pub io_width: u32,
    pub sector_size: u32,
    pub dev_type: u64,
    pub generation: u64,
    pub start_offset: u64,
    pub dev_group: u32,
    pub seek_speed: u8,
    pub bandwidth: u8,
    pub uuid: [u8; 16],
    pub fsid: [u8; 16],
}

impl DevItem {
    const SIZE: usize = 98;

    fn parse(buf: &[u8]) -> Self {
        Self {
            devid: le_u64(buf, 0),
            total_bytes: le_u64(buf, 8),
            bytes_used: le_u64(buf, 16),
            io_align: le_u32(buf, 24),
            io_width: le_u32(buf, 28),
            sector_size: le_u32(buf, 32),
            dev_type: le_u64(buf, 36),
            generation: le_u64(buf, 44),
            start_offset: le_u64(buf, 52),
            dev_group: le_u32(buf, 60),
            seek_speed: buf[64],
            bandwidth: buf[65],
            uuid: fixed(buf, 66),
            fsid: fixed(buf, 82),
        }
    }
}

/// One of the rolling backups of the tree roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRoot {
    pub tree_root: u64,
    pub tree_root_gen: u64,
    pub chunk_root: u64,
    pub chunk_root_gen: u64,
    pub extent_root: u64,
    pub extent_root_gen: u64,
    pub fs_root: u64,
    pub fs_root_gen: u64,
    pub dev_root: u64,
    pub dev_root_gen: u64,
    pub csum_root: u64,
    pub csum_root_gen: u64,
    pub total_bytes: u64,
    pub bytes_used: u64,
    pub num_devices: u64,
    pub tree_root_level: u8,
    pub chunk_root_level: u8,
    pub extent_root_level: u8,
    pub fs_root_level: u8,
    pub dev_root_level: u8,
    pub csum_root_level: u8,
}

impl BackupRoot {
    fn parse(buf: &[u8]) -> Self {
        Self {
            tree_root: le_u64(buf, 0),
            tree_root_gen: le_u64(buf, 8),
            chunk_root: le_u64(buf, 16),
            chunk_root_gen: le_u64(buf, 24),
            extent_root: le_u64(buf, 32),
            extent_root_gen: le_u64(buf, 40),
            fs_root: le_u64(buf, 48),
            fs_root_gen: le_u64(buf, 56),
            dev_root: le_u64(buf, 64),
            dev_root_gen: le_u64(buf, 72),
            csum_root: le_u64(buf, 80),
            csum_root_gen: le_u64(buf, 88),
            total_bytes: le_u64(buf, 96),
            bytes_used: le_u64(buf, 104),
            num_devices: le_u64(buf, 112),
            tree_root_level: buf[152],
            chunk_root_level: buf[153],
            extent_root_level: buf[154],
            fs_root_level: buf[155],
            dev_root_level: buf[156],
            csum_root_level: buf[157],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkStripe {
    pub devid: u64,
    pub offset: u64,
    pub dev_uuid: [u8; 16],
}

/// A system chunk mapping embedded in the superblock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysChunk {
    pub key_objectid: u64,
    pub key_type: u8,
    pub key_offset: u64,
    pub length: u64,
    pub owner: u64,
    pub stripe_len: u64,
    pub chunk_type: u64,
    pub io_align: u32,
    pub io_width: u32,
    pub sector_size: u32,
    pub num_stripes: u16,
    pub sub_stripes: u16,
    pub stripes: Vec<ChunkStripe>,
}

/// Decoded `sys_chunk_array`.
///
/// Decoding stops at the first entry that is not a chunk item or does not
/// fit; `truncated` records that it stopped early.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SysChunkArray {
    pub chunks: Vec<SysChunk>,
    pub truncated: bool,
}

impl SysChunkArray {
    pub fn parse(array: &[u8]) -> Self {
        let mut chunks = Vec::new();
        let mut cursor = 0usize;

        while cursor < array.len() {
            let Some(chunk) = Self::parse_one(&array[cursor..]) else {
                return Self {
                    chunks,
                    truncated: true,
                };
            };
            cursor += DISK_KEY_SIZE + CHUNK_FIXED_SIZE + chunk.stripes.len() * STRIPE_SIZE;
            chunks.push(chunk);
        }

        Self {
            chunks,
            truncated: false,
        }
    }

    fn parse_one(buf: &[u8]) -> Option<SysChunk> {
        if buf.len() < DISK_KEY_SIZE + CHUNK_FIXED_SIZE {
            return None;
        }
        let key_type = buf[8];
        if key_type != CHUNK_ITEM_KEY {
            return None;
        }

        let chunk = &buf[DISK_KEY_SIZE..];
        let num_stripes = le_u16(chunk, 44);
        // a chunk always has at least one stripe
        if num_stripes == 0 {
            return None;
        }
        let stripes_len = usize::from(num_stripes) * STRIPE_SIZE;
        let stripes_raw = chunk.get(CHUNK_FIXED_SIZE..CHUNK_FIXED_SIZE + stripes_len)?;

        let stripes = stripes_raw
            .chunks_exact(STRIPE_SIZE)
            .map(|s| ChunkStripe {
                devid: le_u64(s, 0),
                offset: le_u64(s, 8),
                dev_uuid: fixed(s, 16),
            })
            .collect();

        Some(SysChunk {
            key_objectid: le_u64(buf, 0),
            key_type,
            key_offset: le_u64(buf, 9),
            length: le_u64(chunk, 0),
            owner: le_u64(chunk, 8),
            stripe_len: le_u64(chunk, 16),
            chunk_type: le_u64(chunk, 24),
            io_align: le_u32(chunk, 32),
            io_width: le_u32(chunk, 36),
            sector_size: le_u32(chunk, 40),
            num_stripes,
            sub_stripes: le_u16(chunk, 46),
            stripes,
        })
    }
}

/// Decoded view of a superblock record.
///
/// Decoding never fails: every field sits at a fixed offset inside the
/// record, and a record dumped with `--force` may hold garbage anywhere.
#[derive(Debug, Clone)]
pub struct Superblock {
    pub csum: [u8; CSUM_SIZE],
    pub fsid: [u8; 16],
    pub bytenr: u64,
    pub flags: u64,
    pub magic: u64,
    pub generation: u64,
    pub root: u64,
    pub chunk_root: u64,
    pub log_root: u64,
    pub total_bytes: u64,
    pub bytes_used: u64,
    pub root_dir_objectid: u64,
    pub num_devices: u64,
    pub sectorsize: u32,
    pub nodesize: u32,
    pub leafsize: u32,
    pub stripesize: u32,
    pub sys_chunk_array_size: u32,
    pub chunk_root_generation: u64,
    pub compat_flags: u64,
    pub compat_ro_flags: u64,
    pub incompat_flags: u64,
    pub csum_type: u16,
    pub root_level: u8,
    pub chunk_root_level: u8,
    pub log_root_level: u8,
    pub dev_item: DevItem,
    pub label: [u8; LABEL_SIZE],
    pub cache_generation: u64,
    pub uuid_tree_generation: u64,
    pub metadata_uuid: [u8; 16],
    pub sys_chunk_array: Vec<u8>,
    pub backup_roots: Vec<BackupRoot>,
}

impl Superblock {
    pub fn parse(record: &RawSuperblock) -> Self {
        let data: &[u8; SUPER_INFO_SIZE] = record.as_bytes();
        let sys_chunk_array_size = le_u32(data, SYS_CHUNK_ARRAY_SIZE_OFFSET);
        let array_len = (sys_chunk_array_size as usize).min(SYS_CHUNK_ARRAY_MAX);

        let backup_roots = (0..NUM_BACKUP_ROOTS)
            .map(|i| {
                let start = SUPER_ROOTS_OFFSET + i * BACKUP_ROOT_SIZE;
                BackupRoot::parse(&data[start..start + BACKUP_ROOT_SIZE])
            })
            .collect();

        Self {
            csum: fixed(data, 0),
            fsid: fixed(data, FSID_OFFSET),
            bytenr: le_u64(data, BYTENR_OFFSET),
            flags: le_u64(data, FLAGS_OFFSET),
            magic: le_u64(data, MAGIC_OFFSET),
            generation: le_u64(data, GENERATION_OFFSET),
            root: le_u64(data, ROOT_OFFSET),
            chunk_root: le_u64(data, CHUNK_ROOT_OFFSET),
            log_root: le_u64(data, LOG_ROOT_OFFSET),
            total_bytes: le_u64(data, TOTAL_BYTES_OFFSET),
            bytes_used: le_u64(data, BYTES_USED_OFFSET),
            root_dir_objectid: le_u64(data, ROOT_DIR_OBJECTID_OFFSET),
            num_devices: le_u64(data, NUM_DEVICES_OFFSET),
            sectorsize: le_u32(data, SECTORSIZE_OFFSET),
            nodesize: le_u32(data, NODESIZE_OFFSET),
            leafsize: le_u32(data, LEAFSIZE_OFFSET),
            stripesize: le_u32(data, STRIPESIZE_OFFSET),
            sys_chunk_array_size,
            chunk_root_generation: le_u64(data, CHUNK_ROOT_GENERATION_OFFSET),
            compat_flags: le_u64(data, COMPAT_FLAGS_OFFSET),
            compat_ro_flags: le_u64(data, COMPAT_RO_FLAGS_OFFSET),
            incompat_flags: le_u64(data, INCOMPAT_FLAGS_OFFSET),
            csum_type: le_u16(data, CSUM_TYPE_OFFSET),
            root_level: data[ROOT_LEVEL_OFFSET],
            chunk_root_level: data[CHUNK_ROOT_LEVEL_OFFSET],
            log_root_level: data[LOG_ROOT_LEVEL_OFFSET],
            dev_item: DevItem::parse(&data[DEV_ITEM_OFFSET..DEV_ITEM_OFFSET + DevItem::SIZE]),
            label: fixed(data, LABEL_OFFSET),
            cache_generation: le_u64(data, CACHE_GENERATION_OFFSET),
            uuid_tree_generation: le_u64(data, UUID_TREE_GENERATION_OFFSET),
            metadata_uuid: fixed(data, METADATA_UUID_OFFSET),
            sys_chunk_array: data[SYS_CHUNK_ARRAY_OFFSET..SYS_CHUNK_ARRAY_OFFSET + array_len]
                .to_vec(),
            backup_roots,
        }
    }

    pub fn label_str(&self) -> String {
        let end = self
            .label
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.label.len());
        String::from_utf8_lossy(&self.label[..end]).into_owned()
    }

    pub fn sys_chunks(&self) -> SysChunkArray {
        SysChunkArray::parse(&self.sys_chunk_array)
    }
}
