// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Command line arguments of `ibnetdiscover`.

pub use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use topology::{DiscoveryParams, DiscoveryParamsBuilder, DiscoveryParamsBuilderError, NodeListing};
use tracing::level_filters::LevelFilter;

#[derive(Debug, thiserror::Error)]
pub enum InvalidCmdArguments {
    #[error("Invalid discovery parameters: {0}")]
    InvalidParams(#[from] DiscoveryParamsBuilderError),
}

#[derive(Debug, Parser)]
#[command(name = "ibnetdiscover")]
#[command(version)]
#[command(about = "Discover the topology of a switched fabric", long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct CmdArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "YAML description of the simulated fabric to discover"
    )]
    fabric: PathBuf,

    #[arg(
        short = 'C',
        long = "ca",
        value_name = "CA",
        help = "Channel adapter to discover from"
    )]
    ca: Option<String>,

    #[arg(
        short = 'P',
        long = "ca-port",
        value_name = "PORT",
        help = "Port of the channel adapter to discover from"
    )]
    ca_port: Option<u8>,

    /// Per-query timeout in milliseconds.
    #[arg(
        short = 't',
        long,
        value_name = "MS",
        default_value_t = 2000,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Timeout of every query, in milliseconds"
    )]
    timeout: u64,

    #[arg(short = 'd', long, action = clap::ArgAction::Count, help = "Raise debug level (repeatable)")]
    debug: u8,

    #[arg(short = 'v', long, action = clap::ArgAction::Count, help = "Raise verbosity (repeatable), implies --show")]
    verbose: u8,

    #[arg(short = 's', long, help = "Show progress of the discovery")]
    show: bool,

    #[arg(
        short = 'e',
        long = "err_show",
        visible_alias = "err-show",
        help = "Show errors of the transport (accepted for compatibility)"
    )]
    err_show: bool,

    #[arg(
        short = 'l',
        long,
        conflicts_with_all = ["hca_list", "switch_list", "grouping"],
        help = "List all connected devices instead of writing the topology"
    )]
    list: bool,

    #[arg(
        short = 'H',
        long,
        conflicts_with_all = ["switch_list", "grouping"],
        help = "List connected channel adapters and routers"
    )]
    hca_list: bool,

    #[arg(
        short = 'S',
        long,
        conflicts_with = "grouping",
        help = "List connected switches"
    )]
    switch_list: bool,

    #[arg(short = 'g', long, help = "Group switches into chassis")]
    grouping: bool,

    #[arg(long, value_name = "FILE", help = "File naming switches by GUID")]
    switch_map: Option<PathBuf>,

    #[arg(value_name = "TOPOLOGY_FILE", help = "Write the output here instead of stdout")]
    topology_file: Option<PathBuf>,
}

impl CmdArgs {
    pub fn fabric(&self) -> &Path {
        &self.fabric
    }
    pub fn ca(&self) -> Option<&str> {
        self.ca.as_deref()
    }
    pub fn ca_port(&self) -> Option<u8> {
        self.ca_port
    }
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }
    pub fn show(&self) -> bool {
        self.show || self.verbose > 0
    }
    pub fn err_show(&self) -> bool {
        self.err_show
    }
    pub fn grouping(&self) -> bool {
        self.grouping
    }
    pub fn switch_map(&self) -> Option<&Path> {
        self.switch_map.as_deref()
    }
    pub fn topology_file(&self) -> Option<&Path> {
        self.topology_file.as_deref()
    }

    /// The listing requested instead of a topology file, if any.
    pub fn listing(&self) -> Option<NodeListing> {
        if self.list {
            Some(NodeListing::All)
        } else if self.hca_list {
            Some(NodeListing::Adapters)
        } else if self.switch_list {
            Some(NodeListing::Switches)
        } else {
            None
        }
    }

    /// Default log level: warnings, `-v` for info, `-d` for debug, `-dd` and
    /// more for everything.
    pub fn log_level(&self) -> LevelFilter {
        match (self.debug, self.verbose) {
            (0, 0) => LevelFilter::WARN,
            (0, _) => LevelFilter::INFO,
            (1, _) => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

impl TryFrom<&CmdArgs> for DiscoveryParams {
    type Error = InvalidCmdArguments;

    fn try_from(args: &CmdArgs) -> Result<Self, Self::Error> {
        Ok(DiscoveryParamsBuilder::default()
            .timeout(args.timeout())
            .show(args.show())
            .build()?)
    }
}
