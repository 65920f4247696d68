#![allow(dead_code)]

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;
use superdump::RawSuperblock;

pub const LABEL: &str = "scratch";

/// A well-formed superblock claiming to live at `bytenr`, crc32c-stamped.
pub fn superblock_record(bytenr: u64) -> RawSuperblock {
    let mut record = RawSuperblock::zeroed();
    let data = record.as_mut_bytes();
    data[0x20..0x30].copy_from_slice(&[0x11; 16]);
    data[0x30..0x38].copy_from_slice(&bytenr.to_le_bytes());
    data[0x38..0x40].copy_from_slice(&1u64.to_le_bytes());
    data[0x40..0x48].copy_from_slice(b"_BHRfS_M");
    data[0x48..0x50].copy_from_slice(&9u64.to_le_bytes());
    data[0x70..0x78].copy_from_slice(&(1u64 << 30).to_le_bytes());
    data[0x88..0x90].copy_from_slice(&1u64.to_le_bytes());
    data[0x90..0x94].copy_from_slice(&4096u32.to_le_bytes());
    data[0x94..0x98].copy_from_slice(&16_384u32.to_le_bytes());
    data[0xBC..0xC4].copy_from_slice(&((1u64 << 8) | (1u64 << 9)).to_le_bytes());
    data[0xC9..0xD1].copy_from_slice(&1u64.to_le_bytes());
    data[0xC9 + 82..0xC9 + 98].copy_from_slice(&[0x11; 16]);
    data[0x12B..0x12B + LABEL.len()].copy_from_slice(LABEL.as_bytes());
    stamp_crc32c(&mut record);
    record
}

/// Same record with its signature destroyed.
pub fn corrupt_record(bytenr: u64) -> RawSuperblock {
    let mut record = superblock_record(bytenr);
    record.as_mut_bytes()[0x40..0x48].copy_from_slice(b"NOTBTRFS");
    stamp_crc32c(&mut record);
    record
}

pub fn stamp_crc32c(record: &mut RawSuperblock) {
    let crc = crc32c::crc32c(&record.as_bytes()[32..]);
    record.as_mut_bytes()[..4].copy_from_slice(&crc.to_le_bytes());
}

/// Creates a sparse image of `len` bytes with `records` written at their offsets.
pub fn write_image(path: &Path, len: u64, records: &[(u64, &RawSuperblock)]) {
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)
        .unwrap();
    file.set_len(len).unwrap();
    for (offset, record) in records {
        file.seek(SeekFrom::Start(*offset)).unwrap();
        file.write_all(record.as_bytes()).unwrap();
    }
    file.flush().unwrap();
}
