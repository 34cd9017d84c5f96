// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Chassis grouping.
//!
//! Several switch chips are often packaged in a single enclosure. Grouping runs
//! after discovery, on the finished [`Fabric`], and correlates those switches
//! into numbered [`Chassis`]. Discovery itself never looks at chassis.

use crate::fabric::{Fabric, NodeId};
use crate::guid::Guid;

#[allow(unused)]
use tracing::debug;

/// Switches found to share an enclosure
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Chassis {
    /// Chassis number, starting at 1.
    pub number: u32,
    pub guid: Guid,
    pub members: Vec<NodeId>,
}

/// Correlates the switches of a discovered fabric into chassis
pub trait ChassisGrouper {
    fn group(&self, fabric: &Fabric) -> Vec<Chassis>;
}

/// Groups switches reporting the same, non-zero, system-image GUID.
///
/// Chassis are numbered in the order their first member appears when walking
/// switches by distance. A system image with a single switch is not a chassis.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemImageGrouper;

impl ChassisGrouper for SystemImageGrouper {
    fn group(&self, fabric: &Fabric) -> Vec<Chassis> {
        let mut groups: Vec<(Guid, Vec<NodeId>)> = Vec::new();
        for switch in fabric.switches() {
            let guid = fabric.node(switch).sys_image_guid();
            if guid.is_zero() {
                continue;
            }
            match groups.iter_mut().find(|(g, _)| *g == guid) {
                Some((_, members)) => members.push(switch),
                None => groups.push((guid, vec![switch])),
            }
        }
        groups
            .into_iter()
            .filter(|(_, members)| members.len() > 1)
            .zip(1u32..)
            .map(|((guid, members), number)| {
                debug!("chassis {number} ({guid}) has {} switches", members.len());
                Chassis {
                    number,
                    guid,
                    members,
                }
            })
            .collect()
    }
}

/// Record chassis membership on the nodes of `fabric`.
pub fn attach_chassis(fabric: &mut Fabric, chassis: &[Chassis]) {
    for ch in chassis {
        for member in &ch.members {
            fabric.set_chassis(*member, ch.number);
        }
    }
}
