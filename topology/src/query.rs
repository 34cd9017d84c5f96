// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The query service seam.
//!
//! Discovery never talks to the wire directly: it asks an [`SmpQuery`]
//! implementation for the attributes of whatever device sits at the end of a
//! [`DrPath`]. Retries, backoff and encoding are the implementation's business.

use crate::guid::Guid;
use crate::path::DrPath;
use num_traits::FromPrimitive;
use std::time::Duration;

/// Kind of a fabric device, as reported in its node information.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    Hash,
    PartialEq,
    num_derive::FromPrimitive,
    strum::Display,
    strum::EnumIs,
)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
#[repr(u8)]
pub enum NodeType {
    #[strum(serialize = "???")]
    Unknown = 0,
    #[strum(serialize = "ca")]
    ChannelAdapter = 1,
    #[strum(serialize = "switch")]
    Switch = 2,
    #[strum(serialize = "router")]
    Router = 3,
    #[strum(serialize = "iwarp rnic")]
    ExtendedRouter = 4,
}

impl From<u8> for NodeType {
    fn from(raw: u8) -> Self {
        NodeType::from_u8(raw).unwrap_or(NodeType::Unknown)
    }
}

/// Logical state of a port.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, strum::Display)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
#[repr(u8)]
pub enum PortState {
    NoStateChange = 0,
    #[default]
    Down = 1,
    Init = 2,
    Armed = 3,
    Active = 4,
}

/// Physical state of a port.
///
/// Only [`PhysPortState::LinkUp`] means that a cable is present and trained, so
/// that something can be reached through the port.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, strum::Display, strum::EnumIs)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
#[repr(u8)]
pub enum PhysPortState {
    NoStateChange = 0,
    Sleep = 1,
    #[default]
    Polling = 2,
    Disabled = 3,
    PortConfigurationTraining = 4,
    LinkUp = 5,
    LinkErrorRecovery = 6,
    PhyTest = 7,
}

/// Node information of the device at the end of a path.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NodeInfo {
    pub guid: Guid,
    pub node_type: NodeType,
    pub num_ports: u8,
    pub vendor_id: u32,
    pub device_id: u16,
    pub sys_image_guid: Guid,
    /// GUID of the port through which the query entered the device.
    pub port_guid: Guid,
    /// Number of the port through which the query entered the device.
    pub local_port: u8,
}

/// Port information of one port.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PortInfo {
    pub lid: u16,
    pub lmc: u8,
    pub state: PortState,
    pub phys_state: PhysPortState,
}

/// Switch information. Only switches answer this query.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SwitchInfo {
    pub enhanced_port0: bool,
}

#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("no response within {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("unreachable: {0}")]
    Unreachable(String),
    #[error("attribute not supported")]
    Unsupported,
}

/// Subnet management queries over a directed route.
///
/// Every call is blocking and returns once a response arrived or `timeout`
/// elapsed. A port number of zero in [`SmpQuery::port_info`] designates the
/// port through which the query entered the device.
pub trait SmpQuery {
    fn node_info(&mut self, path: &DrPath, timeout: Duration) -> Result<NodeInfo, QueryError>;

    fn node_description(&mut self, path: &DrPath, timeout: Duration)
    -> Result<String, QueryError>;

    fn port_info(
        &mut self,
        path: &DrPath,
        portnum: u8,
        timeout: Duration,
    ) -> Result<PortInfo, QueryError>;

    fn switch_info(&mut self, path: &DrPath, timeout: Duration) -> Result<SwitchInfo, QueryError>;
}

impl<Q: SmpQuery + ?Sized> SmpQuery for &mut Q {
    fn node_info(&mut self, path: &DrPath, timeout: Duration) -> Result<NodeInfo, QueryError> {
        (**self).node_info(path, timeout)
    }

    fn node_description(
        &mut self,
        path: &DrPath,
        timeout: Duration,
    ) -> Result<String, QueryError> {
        (**self).node_description(path, timeout)
    }

    fn port_info(
        &mut self,
        path: &DrPath,
        portnum: u8,
        timeout: Duration,
    ) -> Result<PortInfo, QueryError> {
        (**self).port_info(path, portnum, timeout)
    }

    fn switch_info(&mut self, path: &DrPath, timeout: Duration) -> Result<SwitchInfo, QueryError> {
        (**self).switch_info(path, timeout)
    }
}
