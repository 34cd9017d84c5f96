// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Discovery of simulated fabrics.

use ibnetdisc_simfabric::{FabricDescription, SimFabric, SimNode};
use pretty_assertions::assert_eq;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;
use topology::{
    ChassisGrouper, DiscoveryParams, Fabric, Guid, MAXHOPS, NodeListing, NodeType,
    SystemImageGrouper, Topology, TopologyWriter, attach_chassis, discover,
};
use tracing_test::traced_test;

fn guid(raw: u64) -> Guid {
    Guid::new(raw)
}

fn run(sim: &mut SimFabric) -> Topology {
    discover(sim, &DiscoveryParams::default()).unwrap()
}

type Endpoint = (Guid, u8);

/// Links of the fabric, each reported once with its lower endpoint first.
fn links(fabric: &Fabric) -> BTreeSet<(Endpoint, Endpoint)> {
    fabric
        .linked_pairs()
        .into_iter()
        .map(|(a, b)| {
            let a = fabric.port(a);
            let b = fabric.port(b);
            let a = (fabric.node(a.node()).guid(), a.number());
            let b = (fabric.node(b.node()).guid(), b.number());
            (a.min(b), a.max(b))
        })
        .collect()
}

fn distances(fabric: &Fabric) -> BTreeMap<Guid, (usize, Vec<u8>)> {
    fabric
        .nodes()
        .map(|(_, node)| (node.guid(), (node.distance(), node.path().hops().to_vec())))
        .collect()
}

fn distance_of(fabric: &Fabric, raw: u64) -> usize {
    let node = fabric.find_node(guid(raw)).unwrap();
    fabric.node(node).distance()
}

/// Checks identity and port uniqueness, link symmetry and bucketing.
fn assert_well_formed(fabric: &Fabric) {
    let mut guids = HashSet::new();
    for (id, node) in fabric.nodes() {
        assert!(guids.insert(node.guid()), "{} registered twice", node.guid());

        let mut numbers = HashSet::new();
        for port in fabric.ports_of(id) {
            let p = fabric.port(port);
            assert_eq!(p.node(), id);
            assert!(numbers.insert(p.number()), "{} has port {} twice", node.guid(), p.number());
            if let Some(remote) = p.remote() {
                assert_ne!(remote, port);
                assert_eq!(fabric.port(remote).remote(), Some(port));
            }
        }

        if node.is_switch() {
            assert!(node.distance() < MAXHOPS);
            assert!(fabric.switches_at(node.distance()).contains(&id));
            assert!(!fabric.leaves().contains(&id));
        } else {
            assert!(fabric.leaves().contains(&id));
            assert!(fabric.switches().all(|s| s != id));
        }
    }
    assert_eq!(guids.len(), fabric.num_nodes());
}

/// Two spines, four leaf switches and two adapters per leaf switch. Leaf
/// switch `l` reaches spine 0 through ports 1 and 3 and spine 1 through port 2.
/// The origin adapter hangs off port 7 of the first leaf switch.
fn fat_tree() -> SimFabric {
    let mut sim = SimFabric::new();
    sim.add_node(SimNode::adapter(guid(0xa00), 1, 100)).unwrap();
    for s in 0..2u8 {
        sim.add_node(SimNode::switch(guid(0x100 + u64::from(s)), 8, 1 + u16::from(s)))
            .unwrap();
    }
    for l in 0..4u8 {
        let leaf = guid(0x200 + u64::from(l));
        sim.add_node(SimNode::switch(leaf, 8, 10 + u16::from(l)))
            .unwrap();
        sim.connect((leaf, 1), (guid(0x100), l + 1)).unwrap();
        sim.connect((leaf, 2), (guid(0x101), l + 1)).unwrap();
        sim.connect((leaf, 3), (guid(0x100), l + 5)).unwrap();
        for h in 0..2u8 {
            let host = guid(0xa10 + 0x10 * u64::from(l) + 2 * u64::from(h));
            sim.add_node(SimNode::adapter(host, 1, 200 + 2 * u16::from(l) + u16::from(h)))
                .unwrap();
            sim.connect((leaf, 5 + h), (host, 1)).unwrap();
        }
    }
    sim.connect((guid(0xa00), 1), (guid(0x200), 7)).unwrap();
    sim
}

#[test]
fn test_linear_chain() {
    let mut sim = SimFabric::new();
    sim.add_node(SimNode::adapter(guid(0xa), 1, 3)).unwrap();
    sim.add_node(SimNode::switch(guid(0xb), 4, 1)).unwrap();
    sim.add_node(SimNode::switch(guid(0xc), 4, 2)).unwrap();
    sim.connect((guid(0xa), 1), (guid(0xb), 1)).unwrap();
    sim.connect((guid(0xb), 2), (guid(0xc), 1)).unwrap();

    let topology = run(&mut sim);
    let fabric = topology.fabric();
    assert_well_formed(fabric);
    assert_eq!(fabric.num_nodes(), 3);

    let a = fabric.find_node(guid(0xa)).unwrap();
    let b = fabric.find_node(guid(0xb)).unwrap();
    let c = fabric.find_node(guid(0xc)).unwrap();
    assert_eq!(topology.origin(), a);
    assert_eq!(fabric.leaves(), &[a]);
    assert_eq!(fabric.switches_at(0), &[b]);
    assert_eq!(fabric.switches_at(1), &[c]);
    assert!(fabric.switches_at(2).is_empty());

    // one switch-to-switch link, plus the cable the origin hangs off
    let expected = BTreeSet::from([
        ((guid(0xa), 1), (guid(0xb), 1)),
        ((guid(0xb), 2), (guid(0xc), 1)),
    ]);
    assert_eq!(links(fabric), expected);
    assert_eq!(topology.max_hops(), 2);
    assert_eq!(fabric.node(c).path().hops(), &[1, 2]);
}

#[test]
fn test_parallel_links() {
    let mut sim = SimFabric::new();
    sim.add_node(SimNode::switch(guid(0xb), 8, 1)).unwrap();
    sim.add_node(SimNode::switch(guid(0xc), 8, 2)).unwrap();
    sim.connect((guid(0xb), 2), (guid(0xc), 1)).unwrap();
    sim.connect((guid(0xb), 3), (guid(0xc), 2)).unwrap();

    let topology = run(&mut sim);
    let fabric = topology.fabric();
    assert_well_formed(fabric);
    assert_eq!(fabric.num_nodes(), 2);
    assert_eq!(fabric.switches_at(1).len(), 1);

    let expected = BTreeSet::from([
        ((guid(0xb), 2), (guid(0xc), 1)),
        ((guid(0xb), 3), (guid(0xc), 2)),
    ]);
    assert_eq!(links(fabric), expected);
    // first reached through port 2
    assert_eq!(
        fabric.node(fabric.find_node(guid(0xc)).unwrap()).path().hops(),
        &[2]
    );
}

#[test]
fn test_down_link_skipped() {
    let mut sim = SimFabric::new();
    sim.add_node(SimNode::switch(guid(0xb), 4, 1)).unwrap();
    sim.add_node(SimNode::switch(guid(0xc), 4, 2)).unwrap();
    sim.add_node(SimNode::switch(guid(0xd), 4, 3)).unwrap();
    sim.connect((guid(0xb), 2), (guid(0xc), 1)).unwrap();
    sim.connect((guid(0xb), 3), (guid(0xd), 1)).unwrap();
    sim.set_link_down(guid(0xb), 2).unwrap();

    let topology = run(&mut sim);
    let fabric = topology.fabric();
    assert_well_formed(fabric);
    assert_eq!(fabric.find_node(guid(0xc)), None);
    assert!(fabric.find_node(guid(0xd)).is_some());

    let b = fabric.find_node(guid(0xb)).unwrap();
    let b2 = fabric.find_port(b, 2).unwrap();
    assert!(!fabric.port(b2).phys_state().is_link_up());
    assert_eq!(fabric.port(b2).remote(), None);
    assert_eq!(links(fabric), BTreeSet::from([((guid(0xb), 3), (guid(0xd), 1))]));
}

#[test]
#[traced_test]
fn test_query_failures_prune_one_port() {
    let mut sim = SimFabric::new();
    sim.add_node(SimNode::switch(guid(0xb), 4, 1)).unwrap();
    sim.add_node(SimNode::switch(guid(0xc), 4, 2)).unwrap();
    sim.add_node(SimNode::switch(guid(0xd), 4, 3)).unwrap();
    sim.add_node(SimNode::switch(guid(0xe), 4, 4)).unwrap();
    sim.add_node(SimNode::switch(guid(0x9), 4, 6)).unwrap();
    sim.add_node(SimNode::adapter(guid(0xf0), 1, 5)).unwrap();
    sim.connect((guid(0xb), 1), (guid(0xe), 1)).unwrap();
    sim.connect((guid(0xb), 2), (guid(0xc), 1)).unwrap();
    sim.connect((guid(0xb), 3), (guid(0x9), 1)).unwrap();
    sim.connect((guid(0xb), 4), (guid(0xd), 4)).unwrap();
    sim.connect((guid(0xc), 2), (guid(0xf0), 1)).unwrap();
    sim.fail_port_info(guid(0xb), 3).unwrap();
    sim.fail_node_info(guid(0xe)).unwrap();

    let topology = run(&mut sim);
    let fabric = topology.fabric();
    assert_well_formed(fabric);

    // nothing answers behind port 1, port 3 can't be read
    let b = fabric.find_node(guid(0xb)).unwrap();
    assert_eq!(fabric.find_node(guid(0xe)), None);
    assert_eq!(fabric.find_node(guid(0x9)), None);
    assert_eq!(fabric.port(fabric.find_port(b, 1).unwrap()).remote(), None);
    assert!(fabric.find_port(b, 3).is_none());
    assert!(logs_contain(
        "can't reach node DR path slid 0; dlid 0; 0 port 3: no response within 2000ms"
    ));
    assert!(logs_contain(
        "NodeInfo on DR path slid 0; dlid 0; 0,1 failed, skipping port"
    ));

    // the rest of the fabric is unaffected
    assert_eq!(distance_of(fabric, 0xc), 1);
    assert_eq!(distance_of(fabric, 0xd), 1);
    assert!(fabric.find_node(guid(0xf0)).is_some());
    let expected = BTreeSet::from([
        ((guid(0xb), 2), (guid(0xc), 1)),
        ((guid(0xb), 4), (guid(0xd), 4)),
        ((guid(0xc), 2), (guid(0xf0), 1)),
    ]);
    assert_eq!(links(fabric), expected);
}

#[test]
fn test_fat_tree() {
    let mut sim = fat_tree();
    let topology = run(&mut sim);
    let fabric = topology.fabric();
    assert_well_formed(fabric);

    assert_eq!(fabric.num_nodes(), 15);
    assert_eq!(fabric.leaves().len(), 9);
    assert_eq!(links(fabric).len(), 21);

    assert_eq!(distance_of(fabric, 0x200), 0);
    assert_eq!(distance_of(fabric, 0x100), 1);
    assert_eq!(distance_of(fabric, 0x101), 1);
    for leaf in 0x201..=0x203 {
        assert_eq!(distance_of(fabric, leaf), 2);
    }
    // a leaf origin's switches are one hop deeper than their distance
    for switch in fabric.switches() {
        let node = fabric.node(switch);
        assert_eq!(node.path().depth(), node.distance() + 1);
    }
    assert_eq!(topology.max_hops(), 4);
    assert!(sim.stats().max_depth <= MAXHOPS);
}

#[test]
fn test_distance_is_first_discovery() {
    // s0 reaches s1 and s2 directly, and s1 reaches s2 again one level down
    let mut sim = SimFabric::new();
    for raw in 0..3 {
        sim.add_node(SimNode::switch(guid(0x10 + raw), 4, 1)).unwrap();
    }
    sim.connect((guid(0x10), 1), (guid(0x11), 1)).unwrap();
    sim.connect((guid(0x10), 2), (guid(0x12), 1)).unwrap();
    sim.connect((guid(0x11), 2), (guid(0x12), 2)).unwrap();

    let topology = run(&mut sim);
    let fabric = topology.fabric();
    assert_well_formed(fabric);

    let s2 = fabric.node(fabric.find_node(guid(0x12)).unwrap());
    assert_eq!(s2.distance(), 1);
    assert_eq!(s2.path().hops(), &[2]);
    assert!(links(fabric).contains(&((guid(0x11), 2), (guid(0x12), 2))));
    // the later, longer route was used
    assert_eq!(topology.max_hops(), 2);
}

#[test]
fn test_repeated_discovery_same_shape() {
    let mut sim = fat_tree();
    let first = run(&mut sim);
    let queries = sim.stats().queries;
    sim.reset_stats();
    let second = run(&mut sim);

    assert_eq!(links(first.fabric()), links(second.fabric()));
    assert_eq!(distances(first.fabric()), distances(second.fabric()));
    assert_eq!(sim.stats().queries, queries);
}

#[test]
fn test_depth_bound() {
    const CHAIN: u64 = 70;
    let mut sim = SimFabric::new();
    sim.add_node(SimNode::adapter(guid(0xa), 1, 1000)).unwrap();
    for i in 0..CHAIN {
        sim.add_node(SimNode::switch(guid(0x100 + i), 2, 1)).unwrap();
    }
    sim.connect((guid(0xa), 1), (guid(0x100), 1)).unwrap();
    for i in 0..CHAIN - 1 {
        sim.connect((guid(0x100 + i), 2), (guid(0x101 + i), 1)).unwrap();
    }

    let topology = run(&mut sim);
    let fabric = topology.fabric();
    assert_well_formed(fabric);

    // the origin and one switch per usable distance
    assert_eq!(fabric.num_nodes(), 1 + MAXHOPS);
    assert_eq!(topology.max_hops(), MAXHOPS);
    assert_eq!(sim.stats().max_depth, MAXHOPS);
    assert_eq!(distance_of(fabric, 0x100 + 62), MAXHOPS - 1);
    assert_eq!(fabric.find_node(guid(0x100 + 63)), None);
}

fn fixture() -> SimFabric {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/two-level.yaml");
    let desc = FabricDescription::from_path(&path).unwrap();
    SimFabric::try_from(desc).unwrap()
}

fn generated() -> chrono::NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .and_then(|d| d.and_hms_opt(3, 4, 5))
        .unwrap()
}

const TWO_LEVEL: &str = r#"#
# Topology file: generated on Tue Jan  2 03:04:05 2024
#
# Max of 4 hops discovered
# Initiated from node 00000000000000a0 port 00000000000000a1

vendid=0x2c9
devid=0xb924
sysimgguid=0x1000
switchguid=0x10
Switch	8 "S-0000000000000010"		# "leaf 1" enhanced port 0 lid 1 lmc 0
[1]	"H-00000000000000a0"[1]		# "host a" lid 10
[2]	"S-0000000000000020"[1]		# "spine" lid 3

vendid=0x2c9
devid=0xb924
switchguid=0x20
Switch	8 "S-0000000000000020"		# "spine" base port 0 lid 3 lmc 0
[1]	"S-0000000000000010"[2]		# "leaf 1" lid 1
[2]	"S-0000000000000011"[2]		# "leaf 2" lid 2

vendid=0x2c9
devid=0xb924
sysimgguid=0x1000
switchguid=0x11
Switch	8 "S-0000000000000011"		# "leaf 2" base port 0 lid 2 lmc 0
[1]	"H-00000000000000b0"[1]		# "host b" lid 11
[2]	"S-0000000000000020"[2]		# "spine" lid 3

vendid=0x2c9
devid=0x1017
caguid=0xa0
Ca	1 "H-00000000000000a0"		# "host a"
[1]	"S-0000000000000010"[1]		# lid 10 lmc 0 "leaf 1" lid 1

vendid=0x2c9
devid=0x1017
caguid=0xb0
Ca	1 "H-00000000000000b0"		# "host b"
[1]	"S-0000000000000011"[1]		# lid 11 lmc 0 "leaf 2" lid 2
"#;

#[test]
fn test_fixture_topology_file() {
    let mut sim = fixture();
    let topology = run(&mut sim);
    assert_well_formed(topology.fabric());

    let mut out = Vec::new();
    let written = TopologyWriter::new(&topology)
        .generated_at(generated())
        .write_topology(&mut out)
        .unwrap();
    assert_eq!(written, 8);
    assert_eq!(String::from_utf8(out).unwrap(), TWO_LEVEL);
}

#[test]
fn test_fixture_grouped_and_listed() {
    let mut sim = fixture();
    let mut topology = run(&mut sim);
    let chassis = SystemImageGrouper.group(topology.fabric());
    assert_eq!(chassis.len(), 1);
    assert_eq!(chassis[0].guid, guid(0x1000));
    attach_chassis(topology.fabric_mut(), &chassis);

    let mut out = Vec::new();
    TopologyWriter::new(&topology)
        .with_chassis(&chassis)
        .write_topology(&mut out)
        .unwrap();
    let text = String::from_utf8(out).unwrap();
    let chassis_at = text.find("\nChassis 1 (guid 0x1000)\n").unwrap();
    let others_at = text.find("\nNon-Chassis Nodes\n").unwrap();
    let spine_at = text.find("switchguid=0x20\n").unwrap();
    assert!(chassis_at < others_at && others_at < spine_at);
    assert!(text.contains("switchguid=0x11\t\t# Chassis 1\n"));

    let mut out = Vec::new();
    TopologyWriter::new(&topology)
        .write_list(&mut out, NodeListing::All)
        .unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "Switch\t : 0x0000000000000010 ports 8 devid 0xb924 vendid 0x2c9 \"leaf 1\"\n\
         Switch\t : 0x0000000000000020 ports 8 devid 0xb924 vendid 0x2c9 \"spine\"\n\
         Switch\t : 0x0000000000000011 ports 8 devid 0xb924 vendid 0x2c9 \"leaf 2\"\n\
         Ca\t : 0x00000000000000a0 ports 1 devid 0x1017 vendid 0x2c9 \"host a\"\n\
         Ca\t : 0x00000000000000b0 ports 1 devid 0x1017 vendid 0x2c9 \"host b\"\n"
    );
}

#[test]
fn test_router_is_not_expanded() {
    // switch 0xc hides behind the router
    let mut sim = SimFabric::new();
    sim.add_node(SimNode::switch(guid(0xb), 4, 1)).unwrap();
    sim.add_node(SimNode::router(guid(0x50), 2, 20)).unwrap();
    sim.add_node(SimNode::switch(guid(0xc), 4, 2)).unwrap();
    sim.connect((guid(0xb), 1), (guid(0x50), 1)).unwrap();
    sim.connect((guid(0x50), 2), (guid(0xc), 1)).unwrap();

    let topology = run(&mut sim);
    let fabric = topology.fabric();
    assert_well_formed(fabric);

    let router = fabric.find_node(guid(0x50)).unwrap();
    assert_eq!(fabric.node(router).node_type(), NodeType::Router);
    assert_eq!(fabric.leaves(), &[router]);
    assert_eq!(fabric.node(router).distance(), 1);
    assert_eq!(fabric.ports_of(router).len(), 1);
    assert!(fabric.find_port(router, 2).is_none());
    assert_eq!(fabric.find_node(guid(0xc)), None);
    assert_eq!(
        links(fabric),
        BTreeSet::from([((guid(0xb), 1), (guid(0x50), 1))])
    );
}

#[test]
fn test_extended_router_from_yaml() {
    let description = FabricDescription::from_yaml(
        r#"
nodes:
  - guid: "0x10"
    type: switch
    ports: 4
    lid: 1
  - guid: "0x51"
    type: extended-router
    ports: 2
    lid: 30
    description: "gateway"
cables:
  - a: { guid: "0x10", port: 3 }
    b: { guid: "0x51", port: 1 }
"#,
    )
    .unwrap();
    let mut sim = SimFabric::try_from(description).unwrap();
    let topology = run(&mut sim);
    let fabric = topology.fabric();
    assert_well_formed(fabric);

    let router = fabric.find_node(guid(0x51)).unwrap();
    assert_eq!(fabric.node(router).node_type(), NodeType::ExtendedRouter);
    assert_eq!(fabric.leaves(), &[router]);
    assert_eq!(fabric.switches().count(), 1);
    assert_eq!(
        links(fabric),
        BTreeSet::from([((guid(0x10), 3), (guid(0x51), 1))])
    );

    let mut out = Vec::new();
    TopologyWriter::new(&topology)
        .write_topology(&mut out)
        .unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("rtguid=0x51\nRt\t2 \"R-0000000000000051\""));
}
