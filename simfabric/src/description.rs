// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Fabric descriptions, to build a [`SimFabric`] from YAML.
//!
//! ```yaml
//! nodes:
//!   - guid: "0xa0"
//!     type: channel-adapter
//!     ports: 1
//!     lid: 10
//!   - guid: "0x1"
//!     type: switch
//!     ports: 36
//!     lid: 1
//!     description: "spine 1"
//!     enhanced-port0: true
//! origin:
//!   guid: "0xa0"
//!   port: 1
//! cables:
//!   - a: { guid: "0xa0", port: 1 }
//!     b: { guid: "0x1", port: 1 }
//! failures:
//!   port-info:
//!     - { guid: "0x1", port: 36 }
//! ```

use crate::{SimError, SimFabric, SimNode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use topology::{Guid, NodeType};

#[derive(Debug, thiserror::Error)]
pub enum FabricDescriptionError {
    #[error("can't read fabric description {0}: {1}")]
    Io(String, std::io::Error),
    #[error("malformed fabric description: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
    #[error("node {0} has unknown type {1}")]
    BadNodeType(Guid, NodeType),
    #[error(transparent)]
    Invalid(#[from] SimError),
}

/// One device
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct NodeDescription {
    pub guid: Guid,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub ports: u8,
    /// Switch LID, or LID of port 1 of other devices.
    #[serde(default)]
    pub lid: u16,
    #[serde(default)]
    pub lmc: u8,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sys_image_guid: Option<Guid>,
    #[serde(default)]
    pub vendor_id: Option<u32>,
    #[serde(default)]
    pub device_id: Option<u16>,
    #[serde(default)]
    pub enhanced_port0: Option<bool>,
}

/// A port of a device
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct EndpointDescription {
    pub guid: Guid,
    pub port: u8,
}

impl From<EndpointDescription> for (Guid, u8) {
    fn from(ep: EndpointDescription) -> Self {
        (ep.guid, ep.port)
    }
}

/// A cable between two ports. A `down` cable never trains.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct CableDescription {
    pub a: EndpointDescription,
    pub b: EndpointDescription,
    #[serde(default)]
    pub down: bool,
}

/// Queries that time out
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct FailureDescription {
    #[serde(default)]
    pub node_info: Vec<Guid>,
    #[serde(default)]
    pub port_info: Vec<EndpointDescription>,
}

/// A whole simulated fabric
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct FabricDescription {
    pub nodes: Vec<NodeDescription>,
    /// Defaults to the first node, attached through port 1 if not a switch.
    #[serde(default)]
    pub origin: Option<EndpointDescription>,
    #[serde(default)]
    pub cables: Vec<CableDescription>,
    #[serde(default)]
    pub failures: FailureDescription,
}

impl FabricDescription {
    /// Parse a description from YAML text.
    pub fn from_yaml(yaml: &str) -> Result<Self, FabricDescriptionError> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Read and parse a YAML description file.
    pub fn from_path(path: &Path) -> Result<Self, FabricDescriptionError> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| FabricDescriptionError::Io(path.display().to_string(), e))?;
        Self::from_yaml(&yaml)
    }
}

impl TryFrom<&NodeDescription> for SimNode {
    type Error = FabricDescriptionError;

    fn try_from(desc: &NodeDescription) -> Result<Self, Self::Error> {
        let mut node = match desc.node_type {
            NodeType::Switch => SimNode::switch(desc.guid, desc.ports, desc.lid),
            NodeType::ChannelAdapter => SimNode::adapter(desc.guid, desc.ports, desc.lid),
            NodeType::Router | NodeType::ExtendedRouter => {
                SimNode::router(desc.guid, desc.ports, desc.lid)
            }
            NodeType::Unknown => {
                return Err(FabricDescriptionError::BadNodeType(
                    desc.guid,
                    desc.node_type,
                ));
            }
        };
        if desc.node_type == NodeType::ExtendedRouter {
            node.info.node_type = NodeType::ExtendedRouter;
        }
        if let Some(description) = &desc.description {
            node = node.with_description(description);
        }
        if let Some(guid) = desc.sys_image_guid {
            node = node.with_sys_image_guid(guid);
        }
        if desc.vendor_id.is_some() || desc.device_id.is_some() {
            let vendor_id = desc.vendor_id.unwrap_or(node.info.vendor_id);
            let device_id = desc.device_id.unwrap_or(node.info.device_id);
            node = node.with_ids(vendor_id, device_id);
        }
        if let Some(enhanced) = desc.enhanced_port0 {
            node = node.with_enhanced_port0(enhanced);
        }
        Ok(node.with_lmc(desc.lmc))
    }
}

impl TryFrom<&FabricDescription> for SimFabric {
    type Error = FabricDescriptionError;

    fn try_from(desc: &FabricDescription) -> Result<Self, Self::Error> {
        let mut sim = SimFabric::new();
        for node in &desc.nodes {
            sim.add_node(SimNode::try_from(node)?)?;
        }
        if let Some(origin) = desc.origin {
            sim.set_origin(origin.guid, origin.port)?;
        }
        for cable in &desc.cables {
            sim.connect(cable.a.into(), cable.b.into())?;
            if cable.down {
                sim.set_link_down(cable.a.guid, cable.a.port)?;
            }
        }
        for guid in &desc.failures.node_info {
            sim.fail_node_info(*guid)?;
        }
        for ep in &desc.failures.port_info {
            sim.fail_port_info(ep.guid, ep.port)?;
        }
        Ok(sim)
    }
}

impl TryFrom<FabricDescription> for SimFabric {
    type Error = FabricDescriptionError;

    fn try_from(desc: FabricDescription) -> Result<Self, Self::Error> {
        SimFabric::try_from(&desc)
    }
}
