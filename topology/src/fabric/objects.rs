// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Nodes and ports of a discovered fabric

use crate::guid::Guid;
use crate::path::DrPath;
use crate::query::{NodeInfo, NodeType, PhysPortState, PortInfo, PortState};

/// Handle of a [`Node`] in a [`Fabric`](super::Fabric).
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodeId(pub(crate) usize);

/// Handle of a [`Port`] in a [`Fabric`](super::Fabric).
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PortId(pub(crate) usize);

/// Attributes only switches have, read through their management port 0.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SwitchAttributes {
    pub lid: u16,
    pub lmc: u8,
    pub enhanced_port0: bool,
}

/// Everything learned about a device when it is first reached.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NodeRecord {
    pub info: NodeInfo,
    pub description: String,
    pub switch: Option<SwitchAttributes>,
}

/// Everything learned about a port when it is first probed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PortRecord {
    pub number: u8,
    pub guid: Guid,
    pub info: PortInfo,
}

/// A discovered fabric device
#[derive(Debug)]
pub struct Node {
    pub(crate) info: NodeInfo,
    pub(crate) description: String,
    pub(crate) switch: Option<SwitchAttributes>,
    pub(crate) distance: usize,
    pub(crate) path: DrPath,
    pub(crate) ports: Vec<PortId>,
    pub(crate) chassis: Option<u32>,
}

impl Node {
    pub(crate) fn new(record: NodeRecord, path: &DrPath, distance: usize) -> Self {
        Self {
            info: record.info,
            description: record.description,
            switch: record.switch,
            distance,
            path: path.clone(),
            ports: Vec::new(),
            chassis: None,
        }
    }
    #[must_use]
    pub fn guid(&self) -> Guid {
        self.info.guid
    }
    #[must_use]
    pub fn node_type(&self) -> NodeType {
        self.info.node_type
    }
    #[must_use]
    pub fn is_switch(&self) -> bool {
        self.info.node_type.is_switch()
    }
    #[must_use]
    pub fn num_ports(&self) -> u8 {
        self.info.num_ports
    }
    #[must_use]
    pub fn vendor_id(&self) -> u32 {
        self.info.vendor_id
    }
    #[must_use]
    pub fn device_id(&self) -> u16 {
        self.info.device_id
    }
    #[must_use]
    pub fn sys_image_guid(&self) -> Guid {
        self.info.sys_image_guid
    }
    #[must_use]
    pub fn port_guid(&self) -> Guid {
        self.info.port_guid
    }
    /// Port through which this node was first reached.
    #[must_use]
    pub fn local_port(&self) -> u8 {
        self.info.local_port
    }
    /// The description exactly as reported by the device.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
    #[must_use]
    pub fn switch_attributes(&self) -> Option<&SwitchAttributes> {
        self.switch.as_ref()
    }
    /// Hop distance assigned on first discovery.
    #[must_use]
    pub fn distance(&self) -> usize {
        self.distance
    }
    /// Directed route this node was first discovered through.
    #[must_use]
    pub fn path(&self) -> &DrPath {
        &self.path
    }
    /// Ports of this node, in creation order.
    #[must_use]
    pub fn ports(&self) -> &[PortId] {
        &self.ports
    }
    /// Number of the chassis this node was grouped into, if any.
    #[must_use]
    pub fn chassis(&self) -> Option<u32> {
        self.chassis
    }
}

/// A port of a discovered [`Node`]
#[derive(Debug)]
pub struct Port {
    pub(crate) number: u8,
    pub(crate) guid: Guid,
    pub(crate) info: PortInfo,
    pub(crate) node: NodeId,
    pub(crate) remote: Option<PortId>,
}

impl Port {
    pub(crate) fn new(node: NodeId, record: PortRecord) -> Self {
        Self {
            number: record.number,
            guid: record.guid,
            info: record.info,
            node,
            remote: None,
        }
    }
    #[must_use]
    pub fn number(&self) -> u8 {
        self.number
    }
    #[must_use]
    pub fn guid(&self) -> Guid {
        self.guid
    }
    #[must_use]
    pub fn lid(&self) -> u16 {
        self.info.lid
    }
    #[must_use]
    pub fn lmc(&self) -> u8 {
        self.info.lmc
    }
    #[must_use]
    pub fn state(&self) -> PortState {
        self.info.state
    }
    #[must_use]
    pub fn phys_state(&self) -> PhysPortState {
        self.info.phys_state
    }
    /// The node owning this port.
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }
    /// The port at the other end of the cable, once linked.
    #[must_use]
    pub fn remote(&self) -> Option<PortId> {
        self.remote
    }
}
