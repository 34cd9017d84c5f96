// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Display implementations for the fabric objects

use std::fmt::Display;

use super::Fabric;
use super::objects::{Node, NodeId, Port, PortId};

macro_rules! NODE {
    ($kind:expr, $guid:expr, $ports:expr, $dist:expr, $desc:expr) => {
        format_args!(
            "{:<10} {} ports:{:<3} dist:{:<2} \"{}\"",
            $kind, $guid, $ports, $dist, $desc
        )
    };
}
macro_rules! PORT {
    ($num:expr, $lid:expr, $state:expr, $phys:expr) => {
        format_args!("[{:>2}] lid {:<5} {:<8} {:<10}", $num, $lid, $state, $phys)
    };
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node#{}", self.0)
    }
}
impl Display for PortId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "port#{}", self.0)
    }
}
impl Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            NODE!(
                self.node_type(),
                self.guid(),
                self.num_ports(),
                self.distance(),
                self.description()
            )
        )
    }
}
impl Display for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            PORT!(self.number(), self.lid(), self.state(), self.phys_state())
        )
    }
}

fn fmt_fabric_heading(f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    writeln!(
        f,
        " ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━ Fabric ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
}

impl Display for Fabric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt_fabric_heading(f)?;
        if self.is_empty() {
            return writeln!(f, " (empty)");
        }
        for node in self.switches().chain(self.leaves().iter().copied()) {
            writeln!(f, "{}", self.node(node))?;
            for port in self.ports_of(node) {
                write!(f, "   {}", self.port(port))?;
                match self.remote_of(port) {
                    Some(remote) => writeln!(
                        f,
                        " -> {}[{}]",
                        self.node(remote.node()).guid(),
                        remote.number()
                    )?,
                    None => writeln!(f)?,
                }
            }
        }
        Ok(())
    }
}
