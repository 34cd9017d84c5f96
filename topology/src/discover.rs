// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Breadth-first fabric discovery.
//!
//! The walk starts at the origin device (the empty [`DrPath`]) and then expands
//! switches level by level: every port of every switch at distance `d` is probed,
//! and whatever answers through a linked port is registered at distance `d + 1`
//! (or found again, if it was already known) and linked to the probing port.
//! Non-switch devices are registered but never expanded.
//!
//! Only two failures stop the walk: an origin that does not answer, and running
//! out of memory. Anything else prunes the branch being explored and is logged.

use crate::fabric::{
    Fabric, NodeId, NodeRecord, PortId, PortRecord, RegistryError, SwitchAttributes,
};
use crate::guid::Guid;
use crate::names::clean_description;
use crate::path::{DrPath, MAXHOPS, PathTracker};
use crate::query::{QueryError, SmpQuery};
use derive_builder::Builder;
use std::time::Duration;

#[allow(unused)]
use tracing::{debug, error, info, warn};

/// Per-query timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Parameters of a discovery run. N.B. we derive a builder type
/// `DiscoveryParamsBuilder` and provide defaults for each field.
#[derive(Builder, Clone, Debug)]
pub struct DiscoveryParams {
    /// Timeout handed to every query.
    #[builder(default = "DEFAULT_TIMEOUT")]
    pub timeout: Duration,

    /// Log every processed switch and every endpoint found.
    #[builder(default)]
    pub show: bool,
}

impl Default for DiscoveryParams {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            show: false,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("can't reach origin node: {0}")]
    OriginUnreachable(QueryError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// The result of a discovery run.
#[derive(Debug)]
pub struct Topology {
    fabric: Fabric,
    origin: NodeId,
    max_hops: usize,
}

impl Topology {
    #[cfg(test)]
    pub(crate) fn from_parts(fabric: Fabric, origin: NodeId, max_hops: usize) -> Self {
        Self {
            fabric,
            origin,
            max_hops,
        }
    }
    #[must_use]
    pub fn fabric(&self) -> &Fabric {
        &self.fabric
    }
    /// Mutable access, to attach chassis information after discovery.
    pub fn fabric_mut(&mut self) -> &mut Fabric {
        &mut self.fabric
    }
    /// The device discovery started from.
    #[must_use]
    pub fn origin(&self) -> NodeId {
        self.origin
    }
    /// Deepest directed route used during discovery.
    #[must_use]
    pub fn max_hops(&self) -> usize {
        self.max_hops
    }
    #[must_use]
    pub fn into_fabric(self) -> Fabric {
        self.fabric
    }
}

/// What became of a single port probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    /// The port was linked to the port that answered at its far end.
    Linked,
    /// No physical link on the port.
    LinkDown,
    /// The directed route could not be made any longer.
    TooDeep,
    /// Nothing answered through the port.
    Unreachable,
}

struct Walker<'a, Q: SmpQuery + ?Sized> {
    query: &'a mut Q,
    params: &'a DiscoveryParams,
    fabric: Fabric,
    tracker: PathTracker,
}

/// Discover the fabric reachable from the device `query` talks through.
///
/// # Errors
///
/// Fails if the origin device does not answer, or if nodes or ports can no
/// longer be allocated. Failures to reach anything else are logged and only
/// prune the corresponding branch of the walk.
pub fn discover<Q: SmpQuery + ?Sized>(
    query: &mut Q,
    params: &DiscoveryParams,
) -> Result<Topology, DiscoveryError> {
    Walker {
        query,
        params,
        fabric: Fabric::new(),
        tracker: PathTracker::new(),
    }
    .run()
}

impl<Q: SmpQuery + ?Sized> Walker<'_, Q> {
    fn run(mut self) -> Result<Topology, DiscoveryError> {
        let mut path = DrPath::new();
        debug!("from {path}");

        let (record, port) = self.get_node(&path).map_err(|e| {
            warn!("can't reach node {path}: {e}");
            DiscoveryError::OriginUnreachable(e)
        })?;
        let origin = self.fabric.create_node(record, &path, 0)?;
        let origin_port = self.fabric.create_port(origin, port)?;

        if !self.fabric.node(origin).is_switch() {
            // The switch behind a leaf origin is the first level of the walk.
            let local = self.fabric.node(origin).local_port();
            let outcome = self.probe(origin_port, &mut path, local, 0)?;
            debug!("origin port {local}: {outcome:?}");
        }

        for distance in 0..MAXHOPS - 1 {
            let level = self.fabric.switches_at(distance).to_vec();
            if level.is_empty() {
                break;
            }
            for node in level {
                self.expand(node, distance)?;
            }
        }

        Ok(Topology {
            fabric: self.fabric,
            origin,
            max_hops: self.tracker.max_depth(),
        })
    }

    /// Probe every port of switch `node` but the one it was reached through.
    fn expand(&mut self, node: NodeId, distance: usize) -> Result<(), DiscoveryError> {
        let mut path = self.fabric.node(node).path().clone();
        let num_ports = self.fabric.node(node).num_ports();
        let local = self.fabric.node(node).local_port();
        debug!("dist {distance} node {}", self.fabric.node(node).guid());
        if self.params.show {
            self.dump(&path, "processing", node, None);
        }

        for portnum in (1..=num_ports).filter(|p| *p != local) {
            if self.fabric.find_port(node, portnum).is_some() {
                // already linked from the other end
                continue;
            }
            let record = match self.get_port(&path, portnum) {
                Ok(record) => record,
                Err(e) => {
                    warn!("can't reach node {path} port {portnum}: {e}");
                    continue;
                }
            };
            let port = self.fabric.create_port(node, record)?;
            let outcome = self.probe(port, &mut path, portnum, distance + 1)?;
            debug!("{path} port {portnum}: {outcome:?}");
        }
        Ok(())
    }

    /// Look through `port` (number `portnum`, reached via `path`) and link it to
    /// whatever answers at the far end, registering the remote node at
    /// `distance` if it is new. `path` is restored before returning.
    fn probe(
        &mut self,
        port: PortId,
        path: &mut DrPath,
        portnum: u8,
        distance: usize,
    ) -> Result<Probe, DiscoveryError> {
        if !self.fabric.port(port).phys_state().is_link_up() {
            return Ok(Probe::LinkDown);
        }
        // the level bound in `run` keeps walked paths below MAXHOPS
        if let Err(e) = self.tracker.extend(path, portnum) {
            warn!("{path} port {portnum}: {e}, not going further");
            return Ok(Probe::TooDeep);
        }
        let outcome = self.probe_remote(port, path, distance);
        path.retract();
        outcome
    }

    fn probe_remote(
        &mut self,
        port: PortId,
        path: &DrPath,
        distance: usize,
    ) -> Result<Probe, DiscoveryError> {
        let (record, remote_record) = match self.get_node(path) {
            Ok(found) => found,
            Err(e) => {
                warn!("NodeInfo on {path} failed, skipping port: {e}");
                return Ok(Probe::Unreachable);
            }
        };

        let guid = record.info.guid;
        let (remote_node, known) = match self.fabric.find_node(guid) {
            Some(node) => (node, true),
            None => (self.new_node(record, path, distance)?, false),
        };
        let remote_port = match self.fabric.find_port(remote_node, remote_record.number) {
            Some(remote_port) => {
                debug!(
                    "known remote port {guid}[{}] reached again through {path}",
                    remote_record.number
                );
                remote_port
            }
            None => self.fabric.create_port(remote_node, remote_record)?,
        };

        if self.params.show {
            let prompt = if known { "known remote" } else { "new remote" };
            self.dump(path, prompt, remote_node, Some(remote_port));
        }
        self.fabric.link(port, remote_port);
        Ok(Probe::Linked)
    }

    fn new_node(
        &mut self,
        record: NodeRecord,
        path: &DrPath,
        distance: usize,
    ) -> Result<NodeId, DiscoveryError> {
        match self.fabric.create_node(record, path, distance) {
            Ok(node) => Ok(node),
            Err(e @ RegistryError::OutOfMemory(_)) => {
                error!("no memory");
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read node, description and arrival port of the device at `path`.
    fn get_node(&mut self, path: &DrPath) -> Result<(NodeRecord, PortRecord), QueryError> {
        let timeout = self.params.timeout;
        let info = self.query.node_info(path, timeout)?;
        let description = self.query.node_description(path, timeout)?;
        let port_info = self.query.port_info(path, 0, timeout)?;

        let port = PortRecord {
            number: info.local_port,
            guid: info.port_guid,
            info: port_info,
        };
        let switch = if info.node_type.is_switch() {
            let enhanced_port0 = match self.query.switch_info(path, timeout) {
                Ok(switch_info) => switch_info.enhanced_port0,
                Err(e) => {
                    debug!("SwitchInfo on {path} failed ({e}), assuming base port 0");
                    false
                }
            };
            debug!("{path}: got switch node {} '{description}'", info.guid);
            Some(SwitchAttributes {
                lid: port_info.lid,
                lmc: port_info.lmc,
                enhanced_port0,
            })
        } else {
            None
        };
        Ok((
            NodeRecord {
                info,
                description,
                switch,
            },
            port,
        ))
    }

    fn get_port(&mut self, path: &DrPath, portnum: u8) -> Result<PortRecord, QueryError> {
        let info = self.query.port_info(path, portnum, self.params.timeout)?;
        debug!(
            "{path} portnum {portnum}: lid {} state {} physstate {}",
            info.lid, info.state, info.phys_state
        );
        Ok(PortRecord {
            number: portnum,
            guid: Guid::default(),
            info,
        })
    }

    fn dump(&self, path: &DrPath, prompt: &str, node: NodeId, port: Option<PortId>) {
        let node = self.fabric.node(node);
        let (portnum, lid, lmc) = match port.map(|p| self.fabric.port(p)) {
            Some(port) => (
                if node.is_switch() { 0 } else { port.number() },
                port.lid(),
                port.lmc(),
            ),
            None => node
                .switch_attributes()
                .map_or((0, 0, 0), |sw| (0, sw.lid, sw.lmc)),
        };
        let last_lid = u32::from(lid) + 1u32.checked_shl(u32::from(lmc)).unwrap_or(1) - 1;
        info!(
            "{path} -> {prompt} {} {{{:x}}} portnum {portnum} lid {lid}-{last_lid}\"{}\"",
            node.node_type(),
            node.guid(),
            clean_description(node.description())
        );
    }
}
