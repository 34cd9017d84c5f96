// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The node and port registry of a discovered fabric

use super::RegistryError;
use super::objects::{Node, NodeId, NodeRecord, Port, PortId, PortRecord};
use crate::guid::Guid;
use crate::path::{DrPath, MAXHOPS};
use ahash::RandomState;
use std::collections::HashMap;

#[allow(unused)]
use tracing::{debug, error, trace};

/// All the nodes and ports found by a discovery run.
///
/// Nodes are keyed by GUID and, for switches, filed by distance from the origin.
/// Every other device kind is filed in a single list of leaves. Both the
/// distance buckets and the leaf list keep insertion order.
///
/// Nothing is ever removed: a [`NodeId`] or [`PortId`] handed out by a fabric
/// stays valid for the lifetime of that fabric. Using handles from a different
/// fabric is a programming error and panics.
#[derive(Debug)]
pub struct Fabric {
    nodes: Vec<Node>,
    ports: Vec<Port>,
    by_guid: HashMap<Guid, NodeId, RandomState>,
    switches: Vec<Vec<NodeId>>,
    leaves: Vec<NodeId>,
}

#[allow(clippy::new_without_default)]
impl Fabric {
    //////////////////////////////////////////////////////////////////
    /// Create an empty fabric
    //////////////////////////////////////////////////////////////////
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            ports: Vec::new(),
            by_guid: HashMap::with_hasher(RandomState::with_seed(0)),
            switches: vec![Vec::new(); MAXHOPS],
            leaves: Vec::new(),
        }
    }
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }
    #[must_use]
    pub fn num_ports(&self) -> usize {
        self.ports.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    //////////////////////////////////////////////////////////////////
    /// Look up a node by GUID
    //////////////////////////////////////////////////////////////////
    #[must_use]
    pub fn find_node(&self, guid: Guid) -> Option<NodeId> {
        self.by_guid.get(&guid).copied()
    }

    //////////////////////////////////////////////////////////////////
    /// Register a newly discovered node, reached through `path`.
    ///
    /// Switches are filed in the bucket for `distance`; any other kind of
    /// device goes to the leaf list, whatever its distance.
    ///
    /// # Errors
    ///
    /// Fails if memory for the node cannot be reserved, if a node with the
    /// same GUID already exists, or if a switch distance has no bucket.
    //////////////////////////////////////////////////////////////////
    pub fn create_node(
        &mut self,
        record: NodeRecord,
        path: &DrPath,
        distance: usize,
    ) -> Result<NodeId, RegistryError> {
        let guid = record.info.guid;
        if self.by_guid.contains_key(&guid) {
            error!("Failed to add node {guid}: already exists!");
            return Err(RegistryError::DuplicateNode(guid));
        }
        let is_switch = record.info.node_type.is_switch();
        if is_switch && distance >= MAXHOPS {
            return Err(RegistryError::DistanceOutOfRange(guid, distance));
        }
        self.nodes.try_reserve(1)?;
        self.by_guid.try_reserve(1)?;
        let bucket = if is_switch {
            &mut self.switches[distance]
        } else {
            &mut self.leaves
        };
        bucket.try_reserve(1)?;

        let id = NodeId(self.nodes.len());
        bucket.push(id);
        self.by_guid.insert(guid, id);
        self.nodes.push(Node::new(record, path, distance));
        debug!("Added {} node {guid} at distance {distance}", self.nodes[id.0].node_type());
        Ok(id)
    }

    //////////////////////////////////////////////////////////////////
    /// Look up the port of `node` with number `number`
    //////////////////////////////////////////////////////////////////
    #[must_use]
    pub fn find_port(&self, node: NodeId, number: u8) -> Option<PortId> {
        self.node(node)
            .ports
            .iter()
            .copied()
            .find(|id| self.ports[id.0].number == number)
    }

    //////////////////////////////////////////////////////////////////
    /// Register a newly probed port of `node`.
    ///
    /// All ports of a switch share the switch's port GUID; the GUID in
    /// `record` is only kept for other kinds of devices.
    ///
    /// # Errors
    ///
    /// Fails if memory for the port cannot be reserved or if the node already
    /// has a port with that number.
    //////////////////////////////////////////////////////////////////
    pub fn create_port(
        &mut self,
        node: NodeId,
        mut record: PortRecord,
    ) -> Result<PortId, RegistryError> {
        if self.find_port(node, record.number).is_some() {
            let guid = self.node(node).guid();
            error!("Failed to add port {} to {guid}: already exists!", record.number);
            return Err(RegistryError::DuplicatePort(guid, record.number));
        }
        self.ports.try_reserve(1)?;
        let owner = &mut self.nodes[node.0];
        owner.ports.try_reserve(1)?;
        if owner.is_switch() {
            record.guid = owner.port_guid();
        }
        let id = PortId(self.ports.len());
        owner.ports.push(id);
        trace!("Added port {} to node {}", record.number, owner.guid());
        self.ports.push(Port::new(node, record));
        Ok(id)
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    #[must_use]
    pub fn port(&self, id: PortId) -> &Port {
        &self.ports[id.0]
    }

    /// All nodes, in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Switches at `distance`, in discovery order.
    #[must_use]
    pub fn switches_at(&self, distance: usize) -> &[NodeId] {
        self.switches
            .get(distance)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All switches, by increasing distance.
    pub fn switches(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.switches.iter().flatten().copied()
    }

    /// All non-switch devices, in discovery order.
    #[must_use]
    pub fn leaves(&self) -> &[NodeId] {
        &self.leaves
    }

    /// Ports of `node` ordered by port number.
    #[must_use]
    pub fn ports_of(&self, node: NodeId) -> Vec<PortId> {
        let mut ports = self.node(node).ports.clone();
        ports.sort_by_key(|id| self.ports[id.0].number);
        ports
    }

    /// The remote end of `port`, if it is linked.
    #[must_use]
    pub fn remote_of(&self, port: PortId) -> Option<&Port> {
        self.port(port).remote.map(|id| self.port(id))
    }

    /// Every linked pair of ports, each pair reported once with the lower handle first.
    #[must_use]
    pub fn linked_pairs(&self) -> Vec<(PortId, PortId)> {
        (0..self.ports.len())
            .map(PortId)
            .filter_map(|id| self.port(id).remote.map(|remote| (id, remote)))
            .filter(|(a, b)| a <= b)
            .collect()
    }

    //////////////////////////////////////////////////////////////////
    /// Record that `node` belongs to chassis `chassis`
    //////////////////////////////////////////////////////////////////
    pub fn set_chassis(&mut self, node: NodeId, chassis: u32) {
        self.nodes[node.0].chassis = Some(chassis);
    }

    pub(crate) fn port_mut(&mut self, id: PortId) -> &mut Port {
        &mut self.ports[id.0]
    }
}
