mod common;

use common::{LABEL, corrupt_record, superblock_record, write_image};
use superdump::selector::{self, SelectorArg};
use superdump::{DumpError, DumpOptions, MirrorSelector, SUPER_INFO_SIZE, dump_superblocks, offset_of};
use tempfile::tempdir;

#[test]
fn test_dump_primary_from_image() {
    let dir = tempdir().unwrap();
    let image = dir.path().join("fs.img");
    let m0 = offset_of(0);
    write_image(&image, 1 << 20, &[(m0, &superblock_record(m0))]);

    let mut out = Vec::new();
    let report = dump_superblocks(&[&image], DumpOptions::default(), &mut out).unwrap();

    assert_eq!(report.rendered, 1);
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with(&format!(
        "superblock: bytenr=65536, device={}\n",
        image.display()
    )));
    assert!(text.contains(LABEL));
    assert!(text.contains("[match]"));
    assert!(!text.contains("DON'T MATCH"));
}

#[test]
fn test_all_mirrors_on_small_image() {
    let dir = tempdir().unwrap();
    let image = dir.path().join("small.img");
    let m0 = offset_of(0);
    let m1 = offset_of(1);
    write_image(
        &image,
        m1 + SUPER_INFO_SIZE as u64,
        &[(m0, &superblock_record(m0)), (m1, &superblock_record(m1))],
    );

    let mut out = Vec::new();
    let options = DumpOptions::new(MirrorSelector::AllMirrors);
    let report = dump_superblocks(&[&image], options, &mut out).unwrap();

    assert_eq!(report.rendered, 2);
    assert_eq!(report.skipped, 1);
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains(&format!("bytenr={m0}")));
    assert!(text.contains(&format!("bytenr={m1}")));
    assert!(!text.contains(&format!("bytenr={}", offset_of(2))));
}

#[test]
fn test_truncated_record_is_hard_error() {
    let dir = tempdir().unwrap();
    let image = dir.path().join("cut.img");
    write_image(&image, offset_of(0) + 100, &[]);

    let mut out = Vec::new();
    let err = dump_superblocks(&[&image], DumpOptions::default(), &mut out).unwrap_err();

    assert!(matches!(err, DumpError::HardRead(_)));
    assert!(err.to_string().contains("100/4096"));
    assert!(out.is_empty());
}

#[test]
fn test_image_shorter_than_primary_is_benign() {
    let dir = tempdir().unwrap();
    let image = dir.path().join("tiny.img");
    write_image(&image, 4096, &[]);

    let mut out = Vec::new();
    let report = dump_superblocks(&[&image], DumpOptions::default(), &mut out).unwrap();

    assert_eq!(report.rendered, 0);
    assert_eq!(report.skipped, 1);
    assert!(out.is_empty());
}

#[test]
fn test_force_dumps_corrupt_record() {
    let dir = tempdir().unwrap();
    let image = dir.path().join("corrupt.img");
    let m0 = offset_of(0);
    write_image(&image, 1 << 20, &[(m0, &corrupt_record(m0))]);

    let mut out = Vec::new();
    let err = dump_superblocks(&[&image], DumpOptions::default(), &mut out).unwrap_err();
    assert!(err.to_string().contains("use --force"));
    assert!(out.is_empty());

    let mut out = Vec::new();
    let options = DumpOptions::default().with_force(true);
    let report = dump_superblocks(&[&image], options, &mut out).unwrap();
    assert_eq!(report.rendered, 1);
    assert!(String::from_utf8(out).unwrap().contains("NOTBTRFS [DON'T MATCH]"));
}

#[test]
fn test_legacy_super_value_reads_raw_offset() {
    let dir = tempdir().unwrap();
    let image = dir.path().join("alt.img");
    let alt = 128 * 1024;
    write_image(&image, 1 << 20, &[(alt, &superblock_record(alt))]);

    let options = DumpOptions::new(selector::resolve(&[SelectorArg::Super(alt)]).unwrap());

    let mut out = Vec::new();
    let report = dump_superblocks(&[&image], options, &mut out).unwrap();
    assert_eq!(report.rendered, 1);
    assert!(String::from_utf8(out).unwrap().contains("bytenr=131072"));
}

#[test]
fn test_second_device_missing_after_success() {
    let dir = tempdir().unwrap();
    let image = dir.path().join("ok.img");
    let missing = dir.path().join("missing.img");
    let m0 = offset_of(0);
    write_image(&image, 1 << 20, &[(m0, &superblock_record(m0))]);

    let mut out = Vec::new();
    let err = dump_superblocks(&[&image, &missing], DumpOptions::default(), &mut out).unwrap_err();

    assert!(matches!(err, DumpError::DeviceOpen { .. }));
    assert!(err.to_string().contains("missing.img"));
    assert!(!out.is_empty());
}
