//! Which superblock copies to look at.
//!
//! The command line has several overlapping ways of naming a copy. They are
//! folded into one [`MirrorSelector`] before any device is touched.

use crate::error::{DumpError, Result};
use crate::superblock::{SUPER_MIRROR_MAX, offset_of};
use tracing::warn;

/// Index of a superblock copy, always below [`SUPER_MIRROR_MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MirrorIndex(usize);

impl MirrorIndex {
    /// The only range check on mirror numbers.
    pub fn new(index: u64) -> Option<Self> {
        (index < SUPER_MIRROR_MAX as u64).then_some(Self(index as usize))
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }

    #[inline]
    pub fn offset(self) -> u64 {
        offset_of(self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorSelector {
    AllMirrors,
    MirrorIndex(MirrorIndex),
    RawOffset(u64),
}

impl Default for MirrorSelector {
    fn default() -> Self {
        MirrorSelector::MirrorIndex(MirrorIndex(0))
    }
}

impl MirrorSelector {
    /// Byte offsets to probe, ascending.
    pub fn offsets(&self) -> Vec<u64> {
        match self {
            MirrorSelector::AllMirrors => crate::superblock::mirror_offsets().collect(),
            MirrorSelector::MirrorIndex(index) => vec![index.offset()],
            MirrorSelector::RawOffset(offset) => vec![*offset],
        }
    }
}

/// One selection-related flag, as given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorArg {
    /// `-a/--all`
    All,
    /// `-s/--super`: a copy number, or a byte offset when too large to be one.
    Super(u64),
    /// `--bytenr`
    Bytenr(u64),
    /// Deprecated `-i`.
    LegacyIndex(u64),
}

/// Folds the flags, in command-line order, into a single selector.
///
/// Each of `-s`, `--bytenr` and `-i` replaces the target offset, so the
/// last one given wins. `--all` stays in force until a later `-s` or
/// `--bytenr` cancels it; `-i` never does. An out-of-range `-i` is rejected
/// wherever it appears.
pub fn resolve(args: &[SelectorArg]) -> Result<MirrorSelector> {
    let mut all = false;
    let mut target = MirrorSelector::default();

    for arg in args {
        match *arg {
            SelectorArg::All => all = true,
            SelectorArg::Super(value) => {
                target = classify_super_arg(value);
                all = false;
            }
            SelectorArg::Bytenr(offset) => {
                target = MirrorSelector::RawOffset(offset);
                all = false;
            }
            SelectorArg::LegacyIndex(value) => {
                warn!("option -i is deprecated, please use -s or --super");
                let index = MirrorIndex::new(value).ok_or_else(|| {
                    DumpError::UserInput(format!(
                        "super mirror too big: {value} >= {SUPER_MIRROR_MAX}"
                    ))
                })?;
                target = MirrorSelector::MirrorIndex(index);
            }
        }
    }

    Ok(if all { MirrorSelector::AllMirrors } else { target })
}

/// `-s` once took a byte offset; values too large to be a copy number keep
/// that meaning.
fn classify_super_arg(value: u64) -> MirrorSelector {
    match MirrorIndex::new(value) {
        Some(index) => MirrorSelector::MirrorIndex(index),
        None => {
            warn!("deprecated use of -s <bytenr> with {value}, assuming --bytenr");
            MirrorSelector::RawOffset(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use super::SelectorArg::*;

    fn index(n: u64) -> MirrorSelector {
        MirrorSelector::MirrorIndex(MirrorIndex::new(n).unwrap())
    }

    #[test]
    fn test_default_is_primary_copy() {
        let selector = resolve(&[]).unwrap();
        assert_eq!(selector, index(0));
        assert_eq!(selector.offsets(), vec![65_536]);
    }

    #[test]
    fn test_all_mirrors() {
        let selector = resolve(&[All]).unwrap();
        assert_eq!(selector, MirrorSelector::AllMirrors);
        assert_eq!(selector.offsets().len(), SUPER_MIRROR_MAX);
    }

    #[test]
    fn test_super_copy_small_and_large() {
        assert_eq!(resolve(&[Super(2)]).unwrap(), index(2));
        assert_eq!(resolve(&[Super(3)]).unwrap(), MirrorSelector::RawOffset(3));
    }

    #[test]
    fn test_later_flag_wins() {
        assert_eq!(resolve(&[Super(1), All]).unwrap(), MirrorSelector::AllMirrors);
        assert_eq!(resolve(&[All, Super(1)]).unwrap(), index(1));
        assert_eq!(resolve(&[Super(2), LegacyIndex(1)]).unwrap(), index(1));
        assert_eq!(resolve(&[LegacyIndex(1), Super(2)]).unwrap(), index(2));
        assert_eq!(
            resolve(&[Super(1), Bytenr(131_072)]).unwrap(),
            MirrorSelector::RawOffset(131_072)
        );
        assert_eq!(resolve(&[Bytenr(131_072), Super(1)]).unwrap(), index(1));
    }

    #[test]
    fn test_legacy_index_keeps_all() {
        assert_eq!(resolve(&[All, LegacyIndex(1)]).unwrap(), MirrorSelector::AllMirrors);
        assert_eq!(resolve(&[LegacyIndex(1), All]).unwrap(), MirrorSelector::AllMirrors);
        assert_eq!(resolve(&[LegacyIndex(1)]).unwrap(), index(1));
    }

    #[test]
    fn test_legacy_index_out_of_range_rejected() {
        let err = resolve(&[LegacyIndex(3), Bytenr(65_536)]).unwrap_err();
        assert!(matches!(err, DumpError::UserInput(_)));
        assert!(err.to_string().contains("super mirror too big: 3 >= 3"));
    }

    proptest! {
        #[test]
        fn prop_offsets_strictly_increase(i in 0usize..SUPER_MIRROR_MAX, j in 0usize..SUPER_MIRROR_MAX) {
            prop_assume!(i < j);
            prop_assert!(offset_of(i) < offset_of(j));
        }

        #[test]
        fn prop_large_super_is_raw_offset(value in (SUPER_MIRROR_MAX as u64)..) {
            prop_assert_eq!(resolve(&[Super(value)]).unwrap(), MirrorSelector::RawOffset(value));
        }

        #[test]
        fn prop_large_legacy_index_rejected(value in (SUPER_MIRROR_MAX as u64)..) {
            prop_assert!(resolve(&[LegacyIndex(value)]).is_err());
        }

        #[test]
        fn prop_trailing_bytenr_wins(first in 0u64..SUPER_MIRROR_MAX as u64, offset in any::<u64>()) {
            let selector = resolve(&[All, Super(first), Bytenr(offset)]).unwrap();
            prop_assert_eq!(selector, MirrorSelector::RawOffset(offset));
        }

        #[test]
        fn prop_mirror_index_bounded(value in any::<u64>()) {
            match MirrorIndex::new(value) {
                Some(index) => prop_assert!(index.get() < SUPER_MIRROR_MAX),
                None => prop_assert!(value >= SUPER_MIRROR_MAX as u64),
            }
        }
    }
}
