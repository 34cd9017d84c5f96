// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Port-to-port links

use super::Fabric;
use super::objects::PortId;

#[allow(unused)]
use tracing::{debug, trace};

impl Fabric {
    //////////////////////////////////////////////////////////////////
    /// Link two ports together.
    ///
    /// Any previous partner of either port loses its link first, so that no
    /// port is ever left pointing at a port that does not point back.
    /// Re-linking two ports that are already linked together is a no-op.
    //////////////////////////////////////////////////////////////////
    pub fn link(&mut self, local: PortId, remote: PortId) {
        trace!(
            "linking {}:{} and {}:{}",
            self.node(self.port(local).node()).guid(),
            self.port(local).number(),
            self.node(self.port(remote).node()).guid(),
            self.port(remote).number(),
        );
        for (port, partner) in [(local, remote), (remote, local)] {
            if let Some(old) = self.port(port).remote()
                && old != partner
            {
                debug!(
                    "port {}:{} moving away from {}:{}",
                    self.node(self.port(port).node()).guid(),
                    self.port(port).number(),
                    self.node(self.port(old).node()).guid(),
                    self.port(old).number(),
                );
                self.port_mut(old).remote = None;
            }
        }
        self.port_mut(local).remote = Some(remote);
        self.port_mut(remote).remote = Some(local);
    }
}
