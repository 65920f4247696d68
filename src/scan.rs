//! Multi-device, multi-mirror superblock scan.
//!
//! Devices are visited in order, one open handle at a time. A mirror that
//! lies past the end of a device is skipped quietly; the first open, read
//! or validation failure ends the whole scan.

use crate::device::{
    DeviceKind, DeviceOpener, FileOpener, ReadOutcome, SuperblockDevice, beyond_device_end,
};
use crate::error::{DumpError, Result};
use crate::render::{RecordSink, TextSink};
use crate::selector::MirrorSelector;
use crate::superblock::RawSuperblock;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

/// Everything carried from one device to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpOptions {
    pub selector: MirrorSelector,
    /// Dump records whose magic does not match.
    pub force: bool,
    /// Render the chunk array and backup roots too.
    pub full: bool,
}

impl DumpOptions {
    pub fn new(selector: MirrorSelector) -> Self {
        Self {
            selector,
            ..Default::default()
        }
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_full(mut self, full: bool) -> Self {
        self.full = full;
        self
    }
}

/// What happened to a single mirror that did not abort the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanResult {
    Rendered,
    /// The mirror is not present on this device.
    SkippedBenign,
}

/// Summary of a scan that ran to completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub devices: usize,
    pub rendered: usize,
    pub skipped: usize,
}

impl ScanReport {
    fn record(&mut self, result: ScanResult) {
        match result {
            ScanResult::Rendered => self.rendered += 1,
            ScanResult::SkippedBenign => self.skipped += 1,
        }
    }
}

pub struct SuperblockScanner<O: DeviceOpener, S: RecordSink> {
    opener: O,
    sink: S,
    options: DumpOptions,
}

impl<O: DeviceOpener, S: RecordSink> SuperblockScanner<O, S> {
    pub fn new(opener: O, sink: S, options: DumpOptions) -> Self {
        Self {
            opener,
            sink,
            options,
        }
    }

    pub fn options(&self) -> &DumpOptions {
        &self.options
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Scans every device in `paths`, stopping at the first hard failure.
    pub fn run<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<ScanReport> {
        if paths.is_empty() {
            return Err(DumpError::UserInput("no device specified".to_string()));
        }

        let offsets = self.options.selector.offsets();
        let mut report = ScanReport::default();

        for path in paths {
            let path = path.as_ref();
            let mut device = self.opener.open(path)?;
            debug!(device = %path.display(), mirrors = offsets.len(), "device opened");

            for &offset in &offsets {
                let result = self.scan_mirror(&mut device, offset)?;
                report.record(result);
            }

            drop(device);
            report.devices += 1;
        }

        info!(
            devices = report.devices,
            rendered = report.rendered,
            skipped = report.skipped,
            "superblock scan complete"
        );
        Ok(report)
    }

    /// Probes one mirror. Errors here abort the scan; the caller's device
    /// handle is dropped on the way out.
    pub fn scan_mirror<D: SuperblockDevice>(
        &mut self,
        device: &mut D,
        offset: u64,
    ) -> Result<ScanResult> {
        let len = match device.kind() {
            DeviceKind::Sized => Some(device.byte_len()?),
            DeviceKind::Unsized => None,
        };
        if beyond_device_end(len, offset) {
            debug!(
                device = %device.path().display(),
                offset,
                "mirror lies past the end of the device, skipping"
            );
            return Ok(ScanResult::SkippedBenign);
        }

        let record = match device.read_mirror(offset) {
            ReadOutcome::Valid(record) => record,
            ReadOutcome::BeyondDeviceEnd => {
                debug!(
                    device = %device.path().display(),
                    offset,
                    "read hit the end of the device, skipping"
                );
                return Ok(ScanResult::SkippedBenign);
            }
            ReadOutcome::HardError(failure) => return Err(DumpError::HardRead(failure)),
        };

        self.validate_magic(device.path(), offset, &record)?;
        self.sink
            .emit(device.path(), offset, &record, self.options.full)?;
        Ok(ScanResult::Rendered)
    }

    fn validate_magic(&self, path: &Path, offset: u64, record: &RawSuperblock) -> Result<()> {
        if record.has_valid_magic() {
            return Ok(());
        }
        if self.options.force {
            warn!(
                device = %path.display(),
                offset,
                magic = record.magic(),
                "bad magic, dumping anyway"
            );
            return Ok(());
        }
        Err(DumpError::BadMagic {
            path: path.to_path_buf(),
            offset,
            found: record.magic(),
        })
    }
}

/// Scans `paths` from the filesystem and writes the rendered mirrors to `out`.
pub fn dump_superblocks<P: AsRef<Path>, W: Write>(
    paths: &[P],
    options: DumpOptions,
    out: W,
) -> Result<ScanReport> {
    SuperblockScanner::new(FileOpener, TextSink::new(out), options).run(paths)
}
