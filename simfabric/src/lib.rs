// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! An in-memory fabric answering directed-route management queries.
//!
//! [`SimFabric`] holds devices and the cables between their ports, and
//! implements [`SmpQuery`] by following a [`DrPath`] hop by hop from the
//! configured origin. Failures can be injected per device or per port, and the
//! fabric keeps [`SimStats`] about the queries it served.

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

mod description;

pub use description::{
    CableDescription, EndpointDescription, FabricDescription, FabricDescriptionError,
    FailureDescription, NodeDescription,
};

use ahash::RandomState;
use std::collections::HashMap;
use std::time::Duration;
use topology::{
    DrPath, Guid, NodeInfo, NodeType, PhysPortState, PortInfo, PortState, QueryError, SmpQuery,
    SwitchInfo,
};

#[allow(unused)]
use tracing::{debug, trace};

#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum SimError {
    #[error("Duplicate node {0}")]
    DuplicateNode(Guid),
    #[error("Unknown node {0}")]
    UnknownNode(Guid),
    #[error("Node {0} has no port {1}")]
    NoSuchPort(Guid, u8),
    #[error("Port {1} of node {0} is already cabled")]
    AlreadyCabled(Guid, u8),
    #[error("Port {1} of node {0} has no cable")]
    NotCabled(Guid, u8),
}

/// A port of a simulated device
#[derive(Clone, Debug)]
struct SimPort {
    guid: Guid,
    info: PortInfo,
    remote: Option<(usize, u8)>,
    fail_port_info: bool,
}

impl SimPort {
    fn new(guid: Guid, lid: u16, lmc: u8) -> Self {
        Self {
            guid,
            info: PortInfo {
                lid,
                lmc,
                state: PortState::Down,
                phys_state: PhysPortState::Polling,
            },
            remote: None,
            fail_port_info: false,
        }
    }
}

/// A simulated device.
///
/// Port 0 of a switch is its management port and is always up. Ports 1 and
/// above are down until cabled with [`SimFabric::connect`].
#[derive(Clone, Debug)]
pub struct SimNode {
    info: NodeInfo,
    description: String,
    enhanced_port0: Option<bool>,
    ports: Vec<SimPort>,
    fail_node_info: bool,
}

impl SimNode {
    fn new(node_type: NodeType, guid: Guid, num_ports: u8) -> Self {
        Self {
            info: NodeInfo {
                guid,
                node_type,
                num_ports,
                vendor_id: 0x02c9,
                device_id: 0,
                sys_image_guid: Guid::default(),
                port_guid: guid,
                local_port: 0,
            },
            description: String::new(),
            enhanced_port0: None,
            ports: Vec::with_capacity(usize::from(num_ports) + 1),
            fail_node_info: false,
        }
    }

    /// A switch with `num_ports` external ports, addressed at `lid` through
    /// its management port. All its ports share the node GUID.
    #[must_use]
    pub fn switch(guid: Guid, num_ports: u8, lid: u16) -> Self {
        let mut node = Self::new(NodeType::Switch, guid, num_ports);
        node.info.device_id = 0xb924;
        node.description = format!("switch {guid:x}");
        let mut port0 = SimPort::new(guid, lid, 0);
        port0.info.state = PortState::Active;
        port0.info.phys_state = PhysPortState::LinkUp;
        node.ports.push(port0);
        node.ports
            .extend((1..=num_ports).map(|_| SimPort::new(guid, lid, 0)));
        node
    }

    /// A channel adapter. Port `p` has GUID `guid + p` and LID `base_lid + p - 1`.
    #[must_use]
    pub fn adapter(guid: Guid, num_ports: u8, base_lid: u16) -> Self {
        Self::leaf(NodeType::ChannelAdapter, guid, num_ports, base_lid)
    }

    /// A router, numbered like [`SimNode::adapter`].
    #[must_use]
    pub fn router(guid: Guid, num_ports: u8, base_lid: u16) -> Self {
        Self::leaf(NodeType::Router, guid, num_ports, base_lid)
    }

    fn leaf(node_type: NodeType, guid: Guid, num_ports: u8, base_lid: u16) -> Self {
        let mut node = Self::new(node_type, guid, num_ports);
        node.info.device_id = 0x1017;
        node.description = format!("{node_type} {guid:x}");
        // port 0 is never addressed on a leaf
        node.ports.push(SimPort::new(Guid::default(), 0, 0));
        node.ports.extend((1..=num_ports).map(|p| {
            SimPort::new(
                Guid::new(guid.value().wrapping_add(u64::from(p))),
                base_lid.wrapping_add(u16::from(p) - 1),
                0,
            )
        }));
        node
    }

    #[must_use]
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    #[must_use]
    pub fn with_sys_image_guid(mut self, guid: Guid) -> Self {
        self.info.sys_image_guid = guid;
        self
    }

    #[must_use]
    pub fn with_ids(mut self, vendor_id: u32, device_id: u16) -> Self {
        self.info.vendor_id = vendor_id;
        self.info.device_id = device_id;
        self
    }

    /// Set the LMC of every port.
    #[must_use]
    pub fn with_lmc(mut self, lmc: u8) -> Self {
        for port in &mut self.ports {
            port.info.lmc = lmc;
        }
        self
    }

    /// Make the device answer switch-info queries. Switches that are not
    /// given this answer them as unsupported.
    #[must_use]
    pub fn with_enhanced_port0(mut self, enhanced: bool) -> Self {
        self.enhanced_port0 = Some(enhanced);
        self
    }

    #[must_use]
    pub fn guid(&self) -> Guid {
        self.info.guid
    }

    #[must_use]
    pub fn is_switch(&self) -> bool {
        self.info.node_type.is_switch()
    }
}

/// Queries served by a [`SimFabric`]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SimStats {
    /// Number of queries received, failed ones included.
    pub queries: usize,
    /// Longest directed route seen in a query.
    pub max_depth: usize,
}

/// A simulated fabric
#[derive(Debug)]
pub struct SimFabric {
    nodes: Vec<SimNode>,
    by_guid: HashMap<Guid, usize, RandomState>,
    origin: Option<(usize, u8)>,
    stats: SimStats,
}

impl Default for SimFabric {
    fn default() -> Self {
        Self::new()
    }
}

impl SimFabric {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            by_guid: HashMap::with_hasher(RandomState::with_seed(0)),
            origin: None,
            stats: SimStats::default(),
        }
    }

    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Add a device. The first device added is the origin, through port 1 if
    /// it is not a switch, until [`SimFabric::set_origin`] says otherwise.
    pub fn add_node(&mut self, node: SimNode) -> Result<(), SimError> {
        let guid = node.guid();
        if self.by_guid.contains_key(&guid) {
            return Err(SimError::DuplicateNode(guid));
        }
        let index = self.nodes.len();
        if self.origin.is_none() {
            self.origin = Some((index, u8::from(!node.is_switch())));
        }
        debug!(
            "sim: added {} {guid} with {} ports",
            node.info.node_type, node.info.num_ports
        );
        self.by_guid.insert(guid, index);
        self.nodes.push(node);
        Ok(())
    }

    fn index_of(&self, guid: Guid) -> Result<usize, SimError> {
        self.by_guid
            .get(&guid)
            .copied()
            .ok_or(SimError::UnknownNode(guid))
    }

    /// External port `port` of device `guid`.
    fn port_mut(&mut self, guid: Guid, port: u8) -> Result<&mut SimPort, SimError> {
        let index = self.index_of(guid)?;
        if port == 0 {
            return Err(SimError::NoSuchPort(guid, port));
        }
        self.nodes[index]
            .ports
            .get_mut(usize::from(port))
            .ok_or(SimError::NoSuchPort(guid, port))
    }

    /// Start queries from device `guid`. `port` is the port a leaf origin is
    /// attached through and is ignored for a switch.
    pub fn set_origin(&mut self, guid: Guid, port: u8) -> Result<(), SimError> {
        let index = self.index_of(guid)?;
        if self.nodes[index].is_switch() {
            self.origin = Some((index, 0));
        } else {
            self.port_mut(guid, port)?;
            self.origin = Some((index, port));
        }
        Ok(())
    }

    /// Cable port `a.1` of device `a.0` to port `b.1` of device `b.0`. Both
    /// ports come up.
    pub fn connect(&mut self, a: (Guid, u8), b: (Guid, u8)) -> Result<(), SimError> {
        for (guid, port) in [a, b] {
            let p = self.port_mut(guid, port)?;
            if p.remote.is_some() {
                return Err(SimError::AlreadyCabled(guid, port));
            }
        }
        if a == b {
            return Err(SimError::AlreadyCabled(a.0, a.1));
        }
        let a_index = self.index_of(a.0)?;
        let b_index = self.index_of(b.0)?;
        for ((guid, port), remote) in [(a, (b_index, b.1)), (b, (a_index, a.1))] {
            let p = self.port_mut(guid, port)?;
            p.remote = Some(remote);
            p.info.state = PortState::Active;
            p.info.phys_state = PhysPortState::LinkUp;
        }
        debug!("sim: cabled {}[{}] <-> {}[{}]", a.0, a.1, b.0, b.1);
        Ok(())
    }

    /// Bring both ends of the cable on port `port` of device `guid` down,
    /// leaving the cable in place.
    pub fn set_link_down(&mut self, guid: Guid, port: u8) -> Result<(), SimError> {
        let p = self.port_mut(guid, port)?;
        let (remote, remote_port) = p.remote.ok_or(SimError::NotCabled(guid, port))?;
        p.info.state = PortState::Down;
        p.info.phys_state = PhysPortState::Polling;
        let p = &mut self.nodes[remote].ports[usize::from(remote_port)];
        p.info.state = PortState::Down;
        p.info.phys_state = PhysPortState::Polling;
        Ok(())
    }

    /// Make port-info queries for port `port` of device `guid` time out.
    pub fn fail_port_info(&mut self, guid: Guid, port: u8) -> Result<(), SimError> {
        let index = self.index_of(guid)?;
        self.nodes[index]
            .ports
            .get_mut(usize::from(port))
            .ok_or(SimError::NoSuchPort(guid, port))?
            .fail_port_info = true;
        Ok(())
    }

    /// Make node-info queries to device `guid` time out.
    pub fn fail_node_info(&mut self, guid: Guid) -> Result<(), SimError> {
        let index = self.index_of(guid)?;
        self.nodes[index].fail_node_info = true;
        Ok(())
    }

    #[must_use]
    pub fn stats(&self) -> SimStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = SimStats::default();
    }

    /// Follow `path` from the origin, returning the device reached and the
    /// port the query entered it through.
    fn resolve(&mut self, path: &DrPath) -> Result<(usize, u8), QueryError> {
        self.stats.queries += 1;
        self.stats.max_depth = self.stats.max_depth.max(path.depth());

        let (mut node, mut local) = self
            .origin
            .ok_or_else(|| QueryError::Unreachable("no origin device".to_string()))?;
        for (hop, &portnum) in path.hops().iter().enumerate() {
            let current = &self.nodes[node];
            if hop > 0 && !current.is_switch() {
                return Err(QueryError::Unreachable(format!(
                    "{} does not forward, at hop {hop} of {path}",
                    current.guid()
                )));
            }
            let port = current
                .ports
                .get(usize::from(portnum))
                .filter(|_| portnum != 0)
                .ok_or_else(|| {
                    QueryError::Unreachable(format!("{} has no port {portnum}", current.guid()))
                })?;
            if !port.info.phys_state.is_link_up() {
                return Err(QueryError::Unreachable(format!(
                    "port {portnum} of {} is {}",
                    current.guid(),
                    port.info.phys_state
                )));
            }
            (node, local) = port.remote.ok_or_else(|| {
                QueryError::Unreachable(format!("port {portnum} of {} has no cable", current.guid()))
            })?;
        }
        trace!("sim: {path} reaches {} port {local}", self.nodes[node].guid());
        Ok((node, local))
    }
}

impl SmpQuery for SimFabric {
    fn node_info(&mut self, path: &DrPath, timeout: Duration) -> Result<NodeInfo, QueryError> {
        let (index, local) = self.resolve(path)?;
        let node = &self.nodes[index];
        if node.fail_node_info {
            return Err(QueryError::Timeout(timeout));
        }
        let mut info = node.info.clone();
        info.local_port = local;
        info.port_guid = node
            .ports
            .get(usize::from(local))
            .map_or(Guid::default(), |port| port.guid);
        Ok(info)
    }

    fn node_description(&mut self, path: &DrPath, _: Duration) -> Result<String, QueryError> {
        let (index, _) = self.resolve(path)?;
        Ok(self.nodes[index].description.clone())
    }

    fn port_info(
        &mut self,
        path: &DrPath,
        portnum: u8,
        timeout: Duration,
    ) -> Result<PortInfo, QueryError> {
        let (index, local) = self.resolve(path)?;
        let node = &self.nodes[index];
        let portnum = if portnum == 0 && !node.is_switch() {
            local
        } else {
            portnum
        };
        let port = node.ports.get(usize::from(portnum)).ok_or_else(|| {
            QueryError::Unreachable(format!("{} has no port {portnum}", node.guid()))
        })?;
        if port.fail_port_info {
            return Err(QueryError::Timeout(timeout));
        }
        Ok(port.info)
    }

    fn switch_info(&mut self, path: &DrPath, _: Duration) -> Result<SwitchInfo, QueryError> {
        let (index, _) = self.resolve(path)?;
        let node = &self.nodes[index];
        match node.enhanced_port0 {
            Some(enhanced_port0) if node.is_switch() => Ok(SwitchInfo { enhanced_port0 }),
            _ => Err(QueryError::Unsupported),
        }
    }
}
