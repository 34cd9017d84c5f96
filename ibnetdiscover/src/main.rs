// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(clippy::all, clippy::pedantic)]

use args::{CmdArgs, Parser};
use miette::{Context, IntoDiagnostic};
use simfabric::{FabricDescription, SimFabric};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use topology::{
    ChassisGrouper, DiscoveryParams, SwitchMap, SystemImageGrouper, Topology, TopologyWriter,
    attach_chassis, discover,
};
use tracing::{debug, error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(level: LevelFilter) {
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Walk the fabric described by the `--fabric` file.
fn discover_fabric(args: &CmdArgs) -> miette::Result<Topology> {
    if let Some(ca) = args.ca() {
        warn!("simulated fabric: ignoring channel adapter '{ca}'");
    }
    if let Some(port) = args.ca_port() {
        warn!("simulated fabric: ignoring channel adapter port {port}");
    }
    if args.err_show() {
        warn!("simulated fabric: no transport errors to show, ignoring --err_show");
    }
    let params = DiscoveryParams::try_from(args).into_diagnostic()?;
    debug!("discovery parameters: {params:?}");

    let description = FabricDescription::from_path(args.fabric()).into_diagnostic()?;
    let mut sim = SimFabric::try_from(description)
        .into_diagnostic()
        .wrap_err_with(|| format!("invalid fabric description {}", args.fabric().display()))?;

    let topology = discover(&mut sim, &params)
        .inspect_err(|e| error!("discovery failed: {e}"))
        .into_diagnostic()?;
    let stats = sim.stats();
    info!(
        "discovered {} nodes and {} ports with {} queries, up to {} hops deep",
        topology.fabric().num_nodes(),
        topology.fabric().num_ports(),
        stats.queries,
        stats.max_depth
    );
    debug!("\n{}", topology.fabric());
    Ok(topology)
}

/// Write the topology file, or the listing asked for, to `out`.
fn write_output<W: Write>(
    args: &CmdArgs,
    topology: &mut Topology,
    switch_map: Option<&SwitchMap>,
    out: &mut W,
) -> miette::Result<()> {
    let chassis = if args.grouping() && args.listing().is_none() {
        let chassis = SystemImageGrouper.group(topology.fabric());
        attach_chassis(topology.fabric_mut(), &chassis);
        chassis
    } else {
        Vec::new()
    };

    let mut writer = TopologyWriter::new(topology).with_chassis(&chassis);
    if let Some(switch_map) = switch_map {
        writer = writer.with_switch_map(switch_map);
    }
    match args.listing() {
        Some(listing) => writer.write_list(out, listing),
        None => writer
            .write_topology(out)
            .map(|links| debug!("{links} port links written")),
    }
    .into_diagnostic()
    .wrap_err("can't write output")?;
    out.flush().into_diagnostic()
}

fn main() -> miette::Result<()> {
    let args = CmdArgs::parse();
    init_logging(args.log_level());
    info!(" ━━━━━━ ibnetdiscover {} ━━━━━━", env!("CARGO_PKG_VERSION"));

    let switch_map = args
        .switch_map()
        .map(SwitchMap::from_path)
        .transpose()
        .into_diagnostic()?;
    let mut topology = discover_fabric(&args)?;

    match args.topology_file() {
        Some(path) => {
            let file = File::create(path)
                .into_diagnostic()
                .wrap_err_with(|| format!("can't create {}", path.display()))?;
            write_output(&args, &mut topology, switch_map.as_ref(), &mut BufWriter::new(file))
        }
        None => write_output(
            &args,
            &mut topology,
            switch_map.as_ref(),
            &mut BufWriter::new(io::stdout().lock()),
        ),
    }
}
