// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Topology file and node list output

use crate::discover::Topology;
use crate::fabric::{Fabric, Node, NodeId, Port};
use crate::grouping::Chassis;
use crate::names::{SwitchMap, clean_description};
use crate::query::NodeType;
use chrono::NaiveDateTime;
use std::borrow::Cow;
use std::fmt::Display;
use std::io::{self, Write};

/// Which nodes a listing shows
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
pub enum NodeListing {
    #[strum(serialize = "all")]
    All,
    #[strum(serialize = "switches")]
    Switches,
    /// Channel adapters and routers.
    #[strum(serialize = "adapters")]
    Adapters,
}

/// Quoted node name as used in topology files, e.g. `"S-000000000000000b"`
struct NodeName<'a>(&'a Node);

impl Display for NodeName<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.0.node_type() {
            NodeType::Switch => 'S',
            NodeType::ChannelAdapter => 'H',
            NodeType::Router | NodeType::ExtendedRouter => 'R',
            NodeType::Unknown => '?',
        };
        write!(f, "\"{prefix}-{:x}\"", self.0.guid())
    }
}

/// Writes a discovered [`Topology`] out.
pub struct TopologyWriter<'a> {
    topology: &'a Topology,
    switch_map: Option<&'a SwitchMap>,
    chassis: &'a [Chassis],
    generated: NaiveDateTime,
}

impl<'a> TopologyWriter<'a> {
    #[must_use]
    pub fn new(topology: &'a Topology) -> Self {
        Self {
            topology,
            switch_map: None,
            chassis: &[],
            generated: chrono::Local::now().naive_local(),
        }
    }

    /// Name switches after `switch_map` where it has an entry.
    #[must_use]
    pub fn with_switch_map(mut self, switch_map: &'a SwitchMap) -> Self {
        self.switch_map = Some(switch_map);
        self
    }

    /// Write chassis sections first. The chassis must have been attached to
    /// the fabric with [`attach_chassis`](crate::grouping::attach_chassis).
    #[must_use]
    pub fn with_chassis(mut self, chassis: &'a [Chassis]) -> Self {
        self.chassis = chassis;
        self
    }

    /// Use `generated` as the generation time in the header.
    #[must_use]
    pub fn generated_at(mut self, generated: NaiveDateTime) -> Self {
        self.generated = generated;
        self
    }

    fn fabric(&self) -> &'a Fabric {
        self.topology.fabric()
    }

    fn grouped(&self) -> bool {
        !self.chassis.is_empty()
    }

    fn name_of(&self, node: &'a Node) -> Cow<'a, str> {
        match self.switch_map {
            Some(map) if node.is_switch() => map.lookup(node.guid(), node.description()),
            _ => clean_description(node.description()),
        }
    }

    /// LID a remote port is reachable at: switches are addressed through port 0.
    fn lid_of(node: &Node, port: &Port) -> u16 {
        node.switch_attributes().map_or(port.lid(), |sw| sw.lid)
    }

    //////////////////////////////////////////////////////////////////
    /// Write the topology file: switches by distance (chassis first when
    /// grouping), then channel adapters and routers.
    ///
    /// Returns the number of links written.
    ///
    /// # Errors
    ///
    /// Fails if `out` fails.
    //////////////////////////////////////////////////////////////////
    pub fn write_topology<W: Write>(&self, out: &mut W) -> io::Result<usize> {
        let fabric = self.fabric();
        let origin = fabric.node(self.topology.origin());
        writeln!(out, "#")?;
        writeln!(
            out,
            "# Topology file: generated on {}",
            self.generated.format("%a %b %e %H:%M:%S %Y")
        )?;
        writeln!(out, "#")?;
        writeln!(out, "# Max of {} hops discovered", self.topology.max_hops())?;
        writeln!(
            out,
            "# Initiated from node {:x} port {:x}",
            origin.guid(),
            origin.port_guid()
        )?;

        let mut links = 0;
        if self.grouped() {
            for chassis in self.chassis {
                write!(out, "\nChassis {}", chassis.number)?;
                if !chassis.guid.is_zero() {
                    write!(out, " (guid 0x{:x})", chassis.guid.value())?;
                }
                writeln!(out)?;
                for member in &chassis.members {
                    links += self.write_switch(out, *member)?;
                }
            }
            writeln!(out, "\nNon-Chassis Nodes")?;
            for switch in fabric.switches() {
                if fabric.node(switch).chassis().is_none() {
                    links += self.write_switch(out, switch)?;
                }
            }
        } else {
            for switch in fabric.switches() {
                links += self.write_switch(out, switch)?;
            }
        }
        for leaf in fabric.leaves() {
            links += self.write_leaf(out, *leaf)?;
        }
        Ok(links)
    }

    fn write_ids<W: Write>(out: &mut W, node: &Node) -> io::Result<()> {
        write!(
            out,
            "\nvendid=0x{:x}\ndevid=0x{:x}\n",
            node.vendor_id(),
            node.device_id()
        )?;
        if !node.sys_image_guid().is_zero() {
            writeln!(out, "sysimgguid=0x{:x}", node.sys_image_guid().value())?;
        }
        Ok(())
    }

    fn write_switch<W: Write>(&self, out: &mut W, id: NodeId) -> io::Result<usize> {
        let fabric = self.fabric();
        let node = fabric.node(id);
        Self::write_ids(out, node)?;
        write!(out, "switchguid=0x{:x}", node.guid().value())?;
        if self.grouped()
            && let Some(chassis) = node.chassis()
        {
            write!(out, "\t\t# Chassis {chassis}")?;
        }
        let (enhanced, lid, lmc) = node
            .switch_attributes()
            .map_or((false, 0, 0), |sw| (sw.enhanced_port0, sw.lid, sw.lmc));
        writeln!(
            out,
            "\nSwitch\t{} {}\t\t# \"{}\" {} port 0 lid {lid} lmc {lmc}",
            node.num_ports(),
            NodeName(node),
            self.name_of(node),
            if enhanced { "enhanced" } else { "base" },
        )?;

        let mut links = 0;
        for port in fabric.ports_of(id) {
            let Some(remote) = fabric.remote_of(port) else {
                continue;
            };
            let remote_node = fabric.node(remote.node());
            writeln!(
                out,
                "[{}]\t{}[{}]\t\t# \"{}\" lid {}",
                fabric.port(port).number(),
                NodeName(remote_node),
                remote.number(),
                self.name_of(remote_node),
                Self::lid_of(remote_node, remote),
            )?;
            links += 1;
        }
        Ok(links)
    }

    fn write_leaf<W: Write>(&self, out: &mut W, id: NodeId) -> io::Result<usize> {
        let fabric = self.fabric();
        let node = fabric.node(id);
        let (kind, label) = match node.node_type() {
            NodeType::ChannelAdapter => ("ca", "Ca"),
            NodeType::Router | NodeType::ExtendedRouter => ("rt", "Rt"),
            NodeType::Switch | NodeType::Unknown => ("???", "???"),
        };
        Self::write_ids(out, node)?;
        writeln!(out, "{kind}guid=0x{:x}", node.guid().value())?;
        writeln!(
            out,
            "{label}\t{} {}\t\t# \"{}\"",
            node.num_ports(),
            NodeName(node),
            self.name_of(node)
        )?;

        let mut links = 0;
        for port in fabric.ports_of(id) {
            let Some(remote) = fabric.remote_of(port) else {
                continue;
            };
            let port = fabric.port(port);
            let remote_node = fabric.node(remote.node());
            writeln!(
                out,
                "[{}]\t{}[{}]\t\t# lid {} lmc {} \"{}\" lid {}",
                port.number(),
                NodeName(remote_node),
                remote.number(),
                port.lid(),
                port.lmc(),
                self.name_of(remote_node),
                Self::lid_of(remote_node, remote),
            )?;
            links += 1;
        }
        Ok(links)
    }

    //////////////////////////////////////////////////////////////////
    /// Write one line per node selected by `listing`: switches by distance,
    /// then the other devices.
    ///
    /// # Errors
    ///
    /// Fails if `out` fails.
    //////////////////////////////////////////////////////////////////
    pub fn write_list<W: Write>(&self, out: &mut W, listing: NodeListing) -> io::Result<()> {
        let fabric = self.fabric();
        let switches = fabric.switches().collect::<Vec<_>>();
        let selected: Vec<NodeId> = match listing {
            NodeListing::All => switches
                .into_iter()
                .chain(fabric.leaves().iter().copied())
                .collect(),
            NodeListing::Switches => switches,
            NodeListing::Adapters => fabric.leaves().to_vec(),
        };
        for id in selected {
            let node = fabric.node(id);
            let kind = match node.node_type() {
                NodeType::Switch => "Switch",
                NodeType::ChannelAdapter => "Ca",
                NodeType::Router | NodeType::ExtendedRouter => "Router",
                NodeType::Unknown => "???",
            };
            writeln!(
                out,
                "{kind}\t : {} ports {} devid 0x{:x} vendid 0x{:x} \"{}\"",
                node.guid(),
                node.num_ports(),
                node.device_id(),
                node.vendor_id(),
                self.name_of(node)
            )?;
        }
        Ok(())
    }
}
