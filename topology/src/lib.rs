// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Discovery of the topology of a switched fabric through directed-route
//! management queries, and rendering of the discovered topology.

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

pub mod discover;
pub mod fabric;
pub mod grouping;
pub mod guid;
pub mod names;
pub mod path;
pub mod query;
pub mod render;

// re-exports
pub use discover::{
    DEFAULT_TIMEOUT, DiscoveryError, DiscoveryParams, DiscoveryParamsBuilder,
    DiscoveryParamsBuilderError, Topology, discover,
};
pub use fabric::{
    Fabric, Node, NodeId, NodeRecord, Port, PortId, PortRecord, RegistryError, SwitchAttributes,
};
pub use grouping::{Chassis, ChassisGrouper, SystemImageGrouper, attach_chassis};
pub use guid::Guid;
pub use names::{SwitchMap, SwitchMapError};
pub use path::{DrPath, MAXHOPS, PathError};
pub use query::{
    NodeInfo, NodeType, PhysPortState, PortInfo, PortState, QueryError, SmpQuery, SwitchInfo,
};
pub use render::{NodeListing, TopologyWriter};
