// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The discovered fabric: nodes, ports and the links between them

mod display;
mod link;
mod objects;
pub(crate) mod registry;

use crate::guid::Guid;
use std::collections::TryReserveError;

// re-exports
pub use objects::{Node, NodeId, NodeRecord, Port, PortId, PortRecord, SwitchAttributes};
pub use registry::Fabric;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("out of memory")]
    OutOfMemory(#[from] TryReserveError),
    #[error("Duplicate node: {0}")]
    DuplicateNode(Guid),
    #[error("Duplicate port {1} on node {0}")]
    DuplicatePort(Guid, u8),
    #[error("Switch {0} at distance {1} is too far from the origin")]
    DistanceOutOfRange(Guid, usize),
}
