use crate::device::ReadFailure;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop a superblock dump.
///
/// Running past the end of a small device is not in here: that is a
/// [`ReadOutcome`](crate::device::ReadOutcome), absorbed by the scan.
#[derive(Error, Debug)]
pub enum DumpError {
    #[error("{0}")]
    UserInput(String),

    #[error("cannot open {}", .path.display())]
    DeviceOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot read end of file {}", .path.display())]
    DeviceLengthQuery {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    HardRead(ReadFailure),

    #[error(
        "bad magic on superblock on {} at {offset} (use --force to dump it anyway)",
        .path.display()
    )]
    BadMagic {
        path: PathBuf,
        offset: u64,
        found: u64,
    },

    #[error("failed to write superblock dump")]
    Output(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, DumpError>;
