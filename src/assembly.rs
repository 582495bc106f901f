//! Assembly (spec §4.7): `synthesize(netlist, library, config)` orchestrates
//! placement, routing order, sequential routing, and final voxel-map
//! composition.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::{OnUnroutable, SynthesisConfig};
use crate::error::CoreError;
use crate::geometry::Pos;
use crate::library::InstanceLibrary;
use crate::netlist::{InstanceId, Netlist, NetworkId};
use crate::placement::{self, Placement};
use crate::router::{self, Bus, Obstacles};
use crate::voxel::{Overlap, Schematic};

/// Assembly-layer failure (spec §4.7 step 5): a disjoint overlay found two
/// operands sharing an occupied position, which §4.7 calls a violated
/// invariant rather than a recoverable condition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssemblyError {
    #[error("instance {instance} collides with an already-placed instance at {overlap}")]
    InstanceOverlap { instance: InstanceId, overlap: Overlap },

    #[error("bus for network {network} collides at {overlap}")]
    BusOverlap { network: NetworkId, overlap: Overlap },
}

impl From<AssemblyError> for CoreError {
    fn from(e: AssemblyError) -> Self {
        CoreError::Internal(e.to_string())
    }
}

/// The complete output of one synthesis run (spec §3 "Assembly").
pub struct Assembly {
    pub placement: Placement,
    pub busses: HashMap<NetworkId, Bus>,
    pub voxels: Schematic,
}

/// Validate every netlist instance's library key, port, and pin index
/// against the library (spec §4.7 step 1). The netlist itself already
/// proved internal consistency in `Netlist::build`; this proves it is
/// buildable against this particular library.
fn validate_against_library(netlist: &Netlist, library: &InstanceLibrary) -> Result<(), CoreError> {
    for instance in netlist.instances.values() {
        let tile = library.get(&instance.library_key).ok_or_else(|| CoreError::BadNetlist {
            kind: "unknown_library_key",
            details: instance.library_key.clone(),
        })?;
        for (port_name, port) in &instance.ports {
            let tile_port = tile.ports.get(port_name).ok_or_else(|| CoreError::BadNetlist {
                kind: "unknown_port",
                details: format!("{}.{}", instance.library_key, port_name),
            })?;
            let tile_width: usize = tile_port.sequences.iter().map(|s| s.width()).sum();
            let instance_width: usize = port.sequences.iter().map(|s| s.width()).sum();
            if tile_width != instance_width {
                return Err(CoreError::BadNetlist {
                    kind: "port_width_mismatch",
                    details: format!("{}.{}", instance.library_key, port_name),
                });
            }
        }
    }
    Ok(())
}

fn instance_world_schematic(netlist: &Netlist, placement: &Placement, library: &InstanceLibrary, id: &crate::netlist::InstanceId) -> Schematic {
    let instance = &netlist.instances[id];
    let tile = library.get(&instance.library_key).expect("validated against library before placement");
    let (anchor, rot) = placement.pose(id);
    tile.schematic.transform(Pos::new(0, 0, 0), rot, anchor)
}

fn bus_footprint_schematic(bus: &Bus) -> Schematic {
    let mut schematic = Schematic::new();
    for pos in &bus.footprint {
        schematic.set(*pos, crate::voxel::Block::new("minecraft:redstone_wire"));
    }
    schematic
}

/// Top-level entry point (spec §4.7).
pub fn synthesize(netlist: &Netlist, library: &InstanceLibrary, config: &SynthesisConfig) -> Result<Assembly, CoreError> {
    validate_against_library(netlist, library)?;

    let placement = placement::place(netlist, config)?;
    info!(instances = netlist.instances.len(), "placement complete");

    // Route tight nets first: ascending driver-to-sink bounding-box volume,
    // ties broken by network id (spec §4.7 step 3, §5).
    let net_bbox_volume = |idx: usize| -> i64 {
        let network = &netlist.networks[idx];
        let (driver, _) = router::pin_world_pos(netlist, &placement, network.driver());
        let mut bbox = crate::geometry::Aabb::unit(driver);
        for s in network.sinks() {
            let (sink, _) = router::pin_world_pos(netlist, &placement, s);
            bbox = bbox.union(&crate::geometry::Aabb::unit(sink));
        }
        (bbox.max.x - bbox.min.x + 1) as i64 * (bbox.max.y - bbox.min.y + 1) as i64 * (bbox.max.z - bbox.min.z + 1) as i64
    };
    let mut order: Vec<usize> = (0..netlist.networks.len()).collect();
    order.sort_by(|&a, &b| {
        net_bbox_volume(a)
            .cmp(&net_bbox_volume(b))
            .then_with(|| netlist.networks[a].id.cmp(&netlist.networks[b].id))
    });

    let mut obstacles = Obstacles::from_placement(netlist, &placement);
    let mut busses: HashMap<NetworkId, Bus> = HashMap::new();

    for idx in order {
        let network_id = netlist.networks[idx].id.clone();
        match router::route_network(netlist, &placement, idx, &obstacles, config.max_explored) {
            Ok(bus) => {
                obstacles.absorb_bus(&bus);
                busses.insert(network_id, bus);
            }
            Err(route_err) => match config.on_unroutable {
                OnUnroutable::Skip => {
                    warn!(%network_id, error = %route_err, "skipping unroutable network");
                }
                OnUnroutable::Abort => {
                    warn!(%network_id, error = %route_err, "aborting: network unroutable");
                    return Err(CoreError::Unroutable(network_id));
                }
            },
        }
    }

    let mut voxels = Schematic::new();
    for id in netlist.instances.keys() {
        let instance_schem = instance_world_schematic(netlist, &placement, library, id);
        voxels = voxels
            .overlay(&instance_schem)
            .map_err(|overlap| AssemblyError::InstanceOverlap { instance: id.clone(), overlap })?;
    }
    for (network_id, bus) in &busses {
        let bus_schem = bus_footprint_schematic(bus);
        voxels = voxels
            .overlay(&bus_schem)
            .map_err(|overlap| AssemblyError::BusOverlap { network: network_id.clone(), overlap })?;
    }

    Ok(Assembly { placement, busses, voxels })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Direction, Region};
    use crate::netlist::{Instance, InstanceId, Network, Pin, PinRef, PinRole, PinSequence, Port, PortDirection};
    use crate::voxel::Block;
    use std::collections::HashMap as StdHashMap;

    fn tiny_library() -> InstanceLibrary {
        let mut library = InstanceLibrary::new();
        for (name, pin_pos, face, role, dir) in [
            ("src", Pos::new(0, 0, 0), Direction::PosX, PinRole::Output, PortDirection::Out),
            ("snk", Pos::new(0, 0, 0), Direction::NegX, PinRole::Input, PortDirection::In),
        ] {
            let mut ports = StdHashMap::new();
            ports.insert(
                "p".to_string(),
                Port { direction: dir, sequences: vec![PinSequence { pins: vec![Pin { local_pos: pin_pos, face, role }] }] },
            );
            let mut schematic = Schematic::new();
            schematic.set(Pos::new(0, 0, 0), Block::new("minecraft:sandstone"));
            library.insert(crate::library::LibraryTile {
                name: name.to_string(),
                occupied: Region::single(Pos::new(0, 0, 0)),
                ports,
                schematic,
            });
        }
        library
    }

    fn tiny_netlist() -> Netlist {
        let library = tiny_library();
        let mut instances = StdHashMap::new();
        instances.insert(InstanceId("src".into()), library.instantiate("src").unwrap());
        instances.insert(InstanceId("snk".into()), library.instantiate("snk").unwrap());
        let net = Network {
            id: NetworkId("n0".into()),
            members: vec![
                PinRef { instance: InstanceId("src".into()), port: "p".into(), pin_index: 0 },
                PinRef { instance: InstanceId("snk".into()), port: "p".into(), pin_index: 0 },
            ],
            driver_index: 0,
        };
        Netlist::build(instances, vec![net]).unwrap()
    }

    #[test]
    fn synthesizes_a_two_instance_circuit_without_errors() {
        let library = tiny_library();
        let netlist = tiny_netlist();
        let config = SynthesisConfig { seed: 0, max_steps: 300, placement_workers: 2, ..Default::default() };

        let assembly = synthesize(&netlist, &library, &config).unwrap();
        assert_eq!(assembly.busses.len(), 1);
        assert!(!assembly.voxels.is_empty());
    }

    #[test]
    fn unroutable_with_skip_policy_omits_the_bus() {
        let library = tiny_library();
        let netlist = tiny_netlist();
        let config = SynthesisConfig {
            seed: 0,
            max_steps: 50,
            placement_workers: 1,
            on_unroutable: OnUnroutable::Skip,
            // The two tiles can never coincide (placement rejects the
            // collision), so the one leg always needs at least one real A*
            // step; budget 1 always exhausts before `is_goal` is ever
            // checked on a second pop, forcing `OverBudget` on every run.
            max_explored: Some(1),
            ..Default::default()
        };
        let assembly = synthesize(&netlist, &library, &config).unwrap();
        assert_eq!(assembly.busses.len(), 0);
    }

    #[test]
    fn unroutable_with_abort_policy_fails_synthesis() {
        let library = tiny_library();
        let netlist = tiny_netlist();
        let config = SynthesisConfig {
            seed: 0,
            max_steps: 50,
            placement_workers: 1,
            on_unroutable: OnUnroutable::Abort,
            max_explored: Some(1),
            ..Default::default()
        };
        let result = synthesize(&netlist, &library, &config);
        assert!(matches!(result, Err(CoreError::Unroutable(_))));
    }
}
