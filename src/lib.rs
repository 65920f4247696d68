//! Locate, validate and dump the superblock copies of btrfs devices.

pub mod cli;
pub mod device;
pub mod error;
pub mod render;
pub mod scan;
pub mod selector;
pub mod superblock;

pub use device::{DeviceFile, DeviceKind, DeviceOpener, ReadOutcome, SuperblockDevice};
pub use error::{DumpError, Result};
pub use render::{RecordSink, TextSink, render};
pub use scan::{DumpOptions, ScanReport, ScanResult, SuperblockScanner, dump_superblocks};
pub use selector::{MirrorIndex, MirrorSelector, SelectorArg};
pub use superblock::{RawSuperblock, SUPER_INFO_SIZE, SUPER_MIRROR_MAX, Superblock, offset_of};
