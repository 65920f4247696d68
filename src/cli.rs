use crate::error::Result;
use crate::scan::DumpOptions;
use crate::selector::{self, SelectorArg};
use clap::{ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "superdump")]
#[command(version, about = "Dump btrfs superblocks from a device in a textual form", long_about = None)]
pub struct Cli {
    /// Print full superblock information, backup roots etc.
    #[arg(short, long)]
    pub full: bool,

    /// Print information about all superblocks
    #[arg(short, long)]
    pub all: bool,

    /// Which copy to print out (values: 0, 1, 2); larger values are taken as --bytenr
    #[arg(short = 's', long = "super", value_name = "SUPER", value_parser = parse_number)]
    pub super_copy: Option<u64>,

    /// Attempt to dump superblocks with bad magic
    #[arg(short = 'F', long)]
    pub force: bool,

    /// Alternate superblock offset
    #[arg(long, value_name = "OFFSET", value_parser = parse_number)]
    pub bytenr: Option<u64>,

    /// Deprecated spelling of --super
    #[arg(short = 'i', hide = true, value_name = "SUPER", value_parser = parse_number)]
    pub legacy_index: Option<u64>,

    /// Log more (repeat for more detail)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Devices or image files to inspect
    #[arg(value_name = "DEVICE")]
    pub devices: Vec<PathBuf>,

    /// Selection flags in the order they were given, when known.
    #[arg(skip)]
    flag_order: Option<Vec<SelectorArg>>,
}

impl Cli {
    /// Parses the process arguments, remembering where each selection flag
    /// appeared so that later flags override earlier ones.
    pub fn parse_ordered() -> Self {
        let matches = Self::command().get_matches();
        Self::from_matches_ordered(&matches)
            .map_err(|e| e.format(&mut Self::command()))
            .unwrap_or_else(|e| e.exit())
    }

    pub fn try_parse_ordered_from<I, T>(args: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command().try_get_matches_from(args)?;
        Self::from_matches_ordered(&matches)
    }

    fn from_matches_ordered(matches: &ArgMatches) -> std::result::Result<Self, clap::Error> {
        let mut cli = Self::from_arg_matches(matches)?;
        let mut given: Vec<(usize, SelectorArg)> = cli
            .flags_by_id()
            .into_iter()
            .filter_map(|(id, arg)| matches.index_of(id).map(|index| (index, arg)))
            .collect();
        given.sort_by_key(|&(index, _)| index);
        cli.flag_order = Some(given.into_iter().map(|(_, arg)| arg).collect());
        Ok(cli)
    }

    fn flags_by_id(&self) -> Vec<(&'static str, SelectorArg)> {
        let mut flags = Vec::new();
        if let Some(value) = self.legacy_index {
            flags.push(("legacy_index", SelectorArg::LegacyIndex(value)));
        }
        if self.all {
            flags.push(("all", SelectorArg::All));
        }
        if let Some(value) = self.super_copy {
            flags.push(("super_copy", SelectorArg::Super(value)));
        }
        if let Some(value) = self.bytenr {
            flags.push(("bytenr", SelectorArg::Bytenr(value)));
        }
        flags
    }

    /// Selection flags in command-line order. Without recorded positions
    /// `-i`, `--all`, `-s` and `--bytenr` are taken in that order.
    pub fn selector_args(&self) -> Vec<SelectorArg> {
        match &self.flag_order {
            Some(order) => order.clone(),
            None => self.flags_by_id().into_iter().map(|(_, arg)| arg).collect(),
        }
    }

    /// Resolves the flags once, before anything is opened.
    pub fn dump_options(&self) -> Result<DumpOptions> {
        let selector = selector::resolve(&self.selector_args())?;
        Ok(DumpOptions::new(selector)
            .with_force(self.force)
            .with_full(self.full))
    }

    /// Default log filter for the given `-v` count.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Decimal, or hexadecimal with a `0x` prefix.
pub fn parse_number(s: &str) -> std::result::Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse::<u64>(),
    };
    parsed.map_err(|e| format!("invalid number '{s}': {e}"))
}
