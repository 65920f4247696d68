//! Text rendering of a validated superblock record.

use crate::error::Result;
use crate::superblock::{
    BTRFS_MAGIC, BackupRoot, ChecksumKind, RawSuperblock, Superblock, SysChunkArray,
};
use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;
use uuid::Uuid;

const SUPER_FLAGS: &[(u64, &str)] = &[
    (1 << 0, "WRITTEN"),
    (1 << 1, "RELOC"),
    (1 << 2, "ERROR"),
    (1 << 32, "SEEDING"),
    (1 << 33, "METADUMP"),
    (1 << 34, "METADUMP_V2"),
    (1 << 35, "CHANGING_FSID"),
    (1 << 36, "CHANGING_FSID_V2"),
];

const COMPAT_RO_FLAGS: &[(u64, &str)] = &[
    (1 << 0, "FREE_SPACE_TREE"),
    (1 << 1, "FREE_SPACE_TREE_VALID"),
    (1 << 2, "VERITY"),
    (1 << 3, "BLOCK_GROUP_TREE"),
];

const INCOMPAT_METADATA_UUID: u64 = 1 << 10;

const INCOMPAT_FLAGS: &[(u64, &str)] = &[
    (1 << 0, "MIXED_BACKREF"),
    (1 << 1, "DEFAULT_SUBVOL"),
    (1 << 2, "MIXED_GROUPS"),
    (1 << 3, "COMPRESS_LZO"),
    (1 << 4, "COMPRESS_ZSTD"),
    (1 << 5, "BIG_METADATA"),
    (1 << 6, "EXTENDED_IREF"),
    (1 << 7, "RAID56"),
    (1 << 8, "SKINNY_METADATA"),
    (1 << 9, "NO_HOLES"),
    (INCOMPAT_METADATA_UUID, "METADATA_UUID"),
    (1 << 11, "RAID1C34"),
    (1 << 12, "ZONED"),
    (1 << 13, "EXTENT_TREE_V2"),
    (1 << 14, "RAID_STRIPE_TREE"),
    (1 << 16, "SIMPLE_QUOTA"),
];

const BLOCK_GROUP_TYPES: &[(u64, &str)] = &[
    (1 << 0, "DATA"),
    (1 << 1, "SYSTEM"),
    (1 << 2, "METADATA"),
    (1 << 3, "RAID0"),
    (1 << 4, "RAID1"),
    (1 << 5, "DUP"),
    (1 << 6, "RAID10"),
    (1 << 7, "RAID5"),
    (1 << 8, "RAID6"),
    (1 << 9, "RAID1C3"),
    (1 << 10, "RAID1C4"),
];

/// Names of the bits set in `value`, with anything unnamed shown as hex.
pub fn flag_names(value: u64, table: &[(u64, &str)]) -> Vec<String> {
    let mut names = Vec::new();
    let mut known = 0u64;
    for &(bit, name) in table {
        known |= bit;
        if value & bit != 0 {
            names.push(name.to_string());
        }
    }
    let unknown = value & !known;
    if unknown != 0 {
        names.push(format!("unknown flag: {unknown:#x}"));
    }
    names
}

struct Printer {
    out: String,
}

impl Printer {
    fn field(&mut self, name: &str, value: impl std::fmt::Display) {
        let _ = writeln!(self.out, "{name:<24}{value}");
    }

    fn flags(&mut self, name: &str, value: u64, table: &[(u64, &str)]) {
        self.field(name, format_args!("{value:#x}"));
        let names = flag_names(value, table);
        if !names.is_empty() {
            let _ = writeln!(self.out, "{:<24}( {} )", "", names.join(" | "));
        }
    }

    fn line(&mut self, text: impl std::fmt::Display) {
        let _ = writeln!(self.out, "{text}");
    }
}

fn uuid(bytes: &[u8; 16]) -> Uuid {
    Uuid::from_bytes(*bytes)
}

/// Renders `record` as `name value` lines. `full` adds the system chunk
/// array and the backup roots.
pub fn render(record: &RawSuperblock, full: bool) -> String {
    let sb = Superblock::parse(record);
    let kind = ChecksumKind::from_raw(sb.csum_type);
    let mut p = Printer { out: String::new() };

    p.field("csum_type", format_args!("{} ({})", sb.csum_type, kind.name()));
    let csum_size = kind.size().unwrap_or(sb.csum.len());
    p.field("csum_size", csum_size);
    p.field(
        "csum",
        format_args!("0x{} {}", hex::encode(&sb.csum[..csum_size]), kind.verify(record)),
    );
    p.field("bytenr", sb.bytenr);
    p.flags("flags", sb.flags, SUPER_FLAGS);
    let magic_text: String = sb
        .magic
        .to_le_bytes()
        .iter()
        .map(|&b| if b.is_ascii_graphic() { b as char } else { '.' })
        .collect();
    p.field(
        "magic",
        format_args!(
            "{} {}",
            magic_text,
            if sb.magic == BTRFS_MAGIC {
                "[match]"
            } else {
                "[DON'T MATCH]"
            }
        ),
    );
    p.field("fsid", uuid(&sb.fsid));
    let metadata_uuid = if sb.incompat_flags & INCOMPAT_METADATA_UUID != 0 {
        &sb.metadata_uuid
    } else {
        &sb.fsid
    };
    p.field("metadata_uuid", uuid(metadata_uuid));
    p.field("label", sb.label_str());
    p.field("generation", sb.generation);
    p.field("root", sb.root);
    p.field("sys_array_size", sb.sys_chunk_array_size);
    p.field("chunk_root_generation", sb.chunk_root_generation);
    p.field("root_level", sb.root_level);
    p.field("chunk_root", sb.chunk_root);
    p.field("chunk_root_level", sb.chunk_root_level);
    p.field("log_root", sb.log_root);
    p.field("log_root_level", sb.log_root_level);
    p.field("total_bytes", sb.total_bytes);
    p.field("bytes_used", sb.bytes_used);
    p.field("sectorsize", sb.sectorsize);
    p.field("nodesize", sb.nodesize);
    p.field("leafsize (deprecated)", sb.leafsize);
    p.field("stripesize", sb.stripesize);
    p.field("root_dir", sb.root_dir_objectid);
    p.field("num_devices", sb.num_devices);
    p.field("compat_flags", format_args!("{:#x}", sb.compat_flags));
    p.flags("compat_ro_flags", sb.compat_ro_flags, COMPAT_RO_FLAGS);
    p.flags("incompat_flags", sb.incompat_flags, INCOMPAT_FLAGS);
    p.field("cache_generation", sb.cache_generation);
    p.field("uuid_tree_generation", sb.uuid_tree_generation);

    let dev = &sb.dev_item;
    p.field("dev_item.uuid", uuid(&dev.uuid));
    p.field(
        "dev_item.fsid",
        format_args!(
            "{} {}",
            uuid(&dev.fsid),
            if dev.fsid == *metadata_uuid {
                "[match]"
            } else {
                "[DON'T MATCH]"
            }
        ),
    );
    p.field("dev_item.type", dev.dev_type);
    p.field("dev_item.total_bytes", dev.total_bytes);
    p.field("dev_item.bytes_used", dev.bytes_used);
    p.field("dev_item.io_align", dev.io_align);
    p.field("dev_item.io_width", dev.io_width);
    p.field("dev_item.sector_size", dev.sector_size);
    p.field("dev_item.devid", dev.devid);
    p.field("dev_item.dev_group", dev.dev_group);
    p.field("dev_item.seek_speed", dev.seek_speed);
    p.field("dev_item.bandwidth", dev.bandwidth);
    p.field("dev_item.generation", dev.generation);

    if full {
        p.line("sys_chunk_array[2048]:");
        render_sys_chunks(&mut p, &sb.sys_chunks());
        p.line("backup_roots[4]:");
        for (i, root) in sb.backup_roots.iter().enumerate() {
            render_backup_root(&mut p, i, root);
        }
    }

    p.out
}

fn render_sys_chunks(p: &mut Printer, array: &SysChunkArray) {
    for chunk in &array.chunks {
        p.line(format_args!(
            "\titem key (FIRST_CHUNK_TREE CHUNK_ITEM {})",
            chunk.key_offset
        ));
        let types = flag_names(chunk.chunk_type, BLOCK_GROUP_TYPES).join("|");
        p.line(format_args!(
            "\t\tlength {} owner {} stripe_len {} type {}",
            chunk.length, chunk.owner, chunk.stripe_len, types
        ));
        p.line(format_args!(
            "\t\tio_align {} io_width {} sector_size {}",
            chunk.io_align, chunk.io_width, chunk.sector_size
        ));
        p.line(format_args!(
            "\t\tnum_stripes {} sub_stripes {}",
            chunk.num_stripes, chunk.sub_stripes
        ));
        for (i, stripe) in chunk.stripes.iter().enumerate() {
            p.line(format_args!(
                "\t\t\tstripe {i} devid {} offset {}",
                stripe.devid, stripe.offset
            ));
            p.line(format_args!("\t\t\tdev_uuid {}", uuid(&stripe.dev_uuid)));
        }
    }
    if array.truncated {
        p.line("\tERROR: sys_chunk_array is corrupted or truncated");
    }
}

fn render_backup_root(p: &mut Printer, index: usize, root: &BackupRoot) {
    p.line(format_args!("\tbackup {index}:"));
    p.line(format_args!(
        "\t\tbackup_tree_root:\t{}\tgen: {}\tlevel: {}",
        root.tree_root, root.tree_root_gen, root.tree_root_level
    ));
    p.line(format_args!(
        "\t\tbackup_chunk_root:\t{}\tgen: {}\tlevel: {}",
        root.chunk_root, root.chunk_root_gen, root.chunk_root_level
    ));
    p.line(format_args!(
        "\t\tbackup_extent_root:\t{}\tgen: {}\tlevel: {}",
        root.extent_root, root.extent_root_gen, root.extent_root_level
    ));
    p.line(format_args!(
        "\t\tbackup_fs_root:\t\t{}\tgen: {}\tlevel: {}",
        root.fs_root, root.fs_root_gen, root.fs_root_level
    ));
    p.line(format_args!(
        "\t\tbackup_dev_root:\t{}\tgen: {}\tlevel: {}",
        root.dev_root, root.dev_root_gen, root.dev_root_level
    ));
    p.line(format_args!(
        "\t\tbackup_csum_root:\t{}\tgen: {}\tlevel: {}",
        root.csum_root, root.csum_root_gen, root.csum_root_level
    ));
    p.line(format_args!("\t\tbackup_total_bytes:\t{}", root.total_bytes));
    p.line(format_args!("\t\tbackup_bytes_used:\t{}", root.bytes_used));
    p.line(format_args!("\t\tbackup_num_devices:\t{}", root.num_devices));
    p.line("");
}

/// Receives every record that passed validation.
pub trait RecordSink {
    fn emit(
        &mut self,
        device: &Path,
        bytenr: u64,
        record: &RawSuperblock,
        full: bool,
    ) -> Result<()>;
}

/// Writes a header and the rendered record for every mirror.
pub struct TextSink<W: Write> {
    out: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> RecordSink for TextSink<W> {
    fn emit(
        &mut self,
        device: &Path,
        bytenr: u64,
        record: &RawSuperblock,
        full: bool,
    ) -> Result<()> {
        writeln!(
            self.out,
            "superblock: bytenr={bytenr}, device={}",
            device.display()
        )?;
        writeln!(self.out, "{}", "-".repeat(57))?;
        self.out.write_all(render(record, full).as_bytes())?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}
