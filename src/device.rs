//! Read-only access to the devices and images being inspected.
//!
//! The scan talks to devices only through [`DeviceOpener`] and
//! [`SuperblockDevice`], so the policy in [`crate::scan`] can be exercised
//! without real block devices.

use crate::error::{DumpError, Result};
use crate::superblock::{RawSuperblock, SUPER_INFO_SIZE};
use rustix::fs::{FileType, fstat};
use rustix::io::{Errno, pread};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Whether a device can tell us how long it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// Regular files and block devices.
    Sized,
    /// Character devices, pipes and the like; the size guard is skipped.
    Unsized,
}

impl DeviceKind {
    pub fn from_file_type(file_type: FileType) -> Self {
        match file_type {
            FileType::RegularFile | FileType::BlockDevice => DeviceKind::Sized,
            _ => DeviceKind::Unsized,
        }
    }
}

/// Details of a read that neither returned a full record nor cleanly hit
/// the end of the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadFailure {
    pub path: PathBuf,
    pub offset: u64,
    pub requested: usize,
    pub actual: usize,
    /// Raw OS error code, if the read reported one.
    pub errno: Option<i32>,
}

impl fmt::Display for ReadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to read the superblock on {} at {} read {}/{} bytes: ",
            self.path.display(),
            self.offset,
            self.actual,
            self.requested
        )?;
        match self.errno {
            Some(code) => write!(
                f,
                "error = '{}', errno = {code}",
                io::Error::from_raw_os_error(code)
            ),
            None => write!(f, "short read with no OS error, errno = 0"),
        }
    }
}

/// Classified result of reading one superblock copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Valid(RawSuperblock),
    /// Zero bytes and no OS error: the copy lies past the end of the device.
    BeyondDeviceEnd,
    HardError(ReadFailure),
}

/// An open device, scanned one mirror at a time.
///
/// Dropping the value closes the device.
pub trait SuperblockDevice {
    fn path(&self) -> &Path;

    fn kind(&self) -> DeviceKind;

    /// Length in bytes. Only meaningful for [`DeviceKind::Sized`] devices.
    fn byte_len(&mut self) -> Result<u64>;

    /// One positioned read of exactly one superblock record.
    fn read_mirror(&mut self, offset: u64) -> ReadOutcome;
}

/// Opens devices by path.
pub trait DeviceOpener {
    type Device: SuperblockDevice;

    fn open(&mut self, path: &Path) -> Result<Self::Device>;
}

/// True when `offset` is past the last addressable byte of a device of
/// length `len`. Devices of unknown length are always let through.
#[inline]
pub fn beyond_device_end(len: Option<u64>, offset: u64) -> bool {
    matches!(len, Some(len) if offset >= len)
}

/// Maps the raw result of one `pread` of a full record onto a [`ReadOutcome`].
pub fn classify_read(
    path: &Path,
    offset: u64,
    result: rustix::io::Result<usize>,
    record: RawSuperblock,
) -> ReadOutcome {
    let failure = |actual: usize, errno: Option<i32>| {
        ReadOutcome::HardError(ReadFailure {
            path: path.to_path_buf(),
            offset,
            requested: SUPER_INFO_SIZE,
            actual,
            errno,
        })
    };

    match result {
        Ok(n) if n == SUPER_INFO_SIZE => ReadOutcome::Valid(record),
        Ok(0) => ReadOutcome::BeyondDeviceEnd,
        Ok(actual) => failure(actual, None),
        Err(errno) => failure(0, Some(errno.raw_os_error())),
    }
}

/// A device or image file opened read-only.
pub struct DeviceFile {
    file: File,
    path: PathBuf,
    kind: DeviceKind,
}

impl DeviceFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .open(path)
            .map_err(|source| DumpError::DeviceOpen {
                path: path.to_path_buf(),
                source,
            })?;

        let stat = fstat(&file).map_err(|errno| DumpError::DeviceLengthQuery {
            path: path.to_path_buf(),
            source: errno.into(),
        })?;
        let kind = DeviceKind::from_file_type(FileType::from_raw_mode(stat.st_mode as _));

        Ok(Self {
            file,
            path: path.to_path_buf(),
            kind,
        })
    }
}

impl SuperblockDevice for DeviceFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn kind(&self) -> DeviceKind {
        self.kind
    }

    fn byte_len(&mut self) -> Result<u64> {
        (&self.file)
            .seek(SeekFrom::End(0))
            .map_err(|source| DumpError::DeviceLengthQuery {
                path: self.path.clone(),
                source,
            })
    }

    fn read_mirror(&mut self, offset: u64) -> ReadOutcome {
        let mut record = RawSuperblock::zeroed();
        let result = loop {
            match pread(&self.file, &mut record.as_mut_bytes()[..], offset) {
                Err(Errno::INTR) => continue,
                other => break other,
            }
        };
        classify_read(&self.path, offset, result, record)
    }
}

/// Opens [`DeviceFile`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileOpener;

impl DeviceOpener for FileOpener {
    type Device = DeviceFile;

    fn open(&mut self, path: &Path) -> Result<DeviceFile> {
        DeviceFile::open(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn image(len: usize) -> NamedTempFile {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(&vec![0xAB; len]).unwrap();
        temp.flush().unwrap();
        temp
    }

    #[test]
    fn test_size_guard() {
        assert!(!beyond_device_end(None, u64::MAX));
        assert!(!beyond_device_end(Some(8192), 4096));
        assert!(beyond_device_end(Some(8192), 8192));
        assert!(beyond_device_end(Some(8192), 8193));
    }

    #[test]
    fn test_classify_read() {
        let path = Path::new("/dev/test");
        assert!(matches!(
            classify_read(path, 0, Ok(SUPER_INFO_SIZE), RawSuperblock::zeroed()),
            ReadOutcome::Valid(_)
        ));
        assert_eq!(
            classify_read(path, 0, Ok(0), RawSuperblock::zeroed()),
            ReadOutcome::BeyondDeviceEnd
        );

        let ReadOutcome::HardError(short) =
            classify_read(path, 4096, Ok(100), RawSuperblock::zeroed())
        else {
            panic!("short read must be a hard error");
        };
        assert_eq!(short.actual, 100);
        assert_eq!(short.errno, None);

        let ReadOutcome::HardError(eio) =
            classify_read(path, 4096, Err(Errno::IO), RawSuperblock::zeroed())
        else {
            panic!("EIO must be a hard error");
        };
        assert_eq!(eio.errno, Some(Errno::IO.raw_os_error()));
        let message = eio.to_string();
        assert!(message.contains("/dev/test"));
        assert!(message.contains("at 4096"));
        assert!(message.contains("0/4096"));
    }

    #[test]
    fn test_regular_file_is_sized() {
        let temp = image(8192);
        let mut device = DeviceFile::open(temp.path()).unwrap();
        assert_eq!(device.kind(), DeviceKind::Sized);
        assert_eq!(device.byte_len().unwrap(), 8192);
    }

    #[test]
    fn test_read_mirror_outcomes() {
        let temp = image(8192 + 100);
        let mut device = DeviceFile::open(temp.path()).unwrap();

        let ReadOutcome::Valid(record) = device.read_mirror(0) else {
            panic!("full record expected");
        };
        assert!(record.as_bytes().iter().all(|&b| b == 0xAB));

        assert_eq!(device.read_mirror(8192 + 100), ReadOutcome::BeyondDeviceEnd);
        assert!(matches!(
            device.read_mirror(8192),
            ReadOutcome::HardError(ReadFailure { actual: 100, .. })
        ));
    }

    #[test]
    fn test_open_missing_device() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.img");
        let err = DeviceFile::open(&missing).err().unwrap();
        assert!(matches!(err, DumpError::DeviceOpen { .. }));
        assert!(err.to_string().contains("nope.img"));
    }
}
