//! Placement engine (spec §4.6): simulated-annealing search over instance
//! pose, seeded by a bounded-rejection random initial placement and moved by
//! a bounded-rejection neighbor operator so the SA engine always sees a
//! valid state.

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use thiserror::Error;

use crate::config::SynthesisConfig;
use crate::error::CoreError;
use crate::geometry::{Pos, Region, Rotation};
use crate::netlist::{InstanceId, Netlist};
use crate::router;
use crate::search::annealing::{AnnealingEngine, AnnealingProblem, Schedule};

/// Placement-layer failure (spec §4.6), converted into `CoreError` at the
/// core's outer boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlacementError {
    #[error("placement engine could not seed a valid initial state for instance {0}")]
    Infeasible(InstanceId),
}

impl From<PlacementError> for CoreError {
    fn from(e: PlacementError) -> Self {
        match e {
            PlacementError::Infeasible(id) => CoreError::Infeasible(id),
        }
    }
}

/// A total map `InstanceId -> (anchor, orientation)` (spec §3).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Placement {
    poses: HashMap<InstanceId, (Pos, Rotation)>,
}

impl Placement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, id: InstanceId, anchor: Pos, rot: Rotation) {
        self.poses.insert(id, (anchor, rot));
    }

    pub fn pose(&self, id: &InstanceId) -> (Pos, Rotation) {
        *self.poses.get(id).expect("every netlist instance has a pose once placed")
    }

    pub fn ids(&self) -> impl Iterator<Item = &InstanceId> {
        self.poses.keys()
    }

    fn world_occupied(&self, netlist: &Netlist, id: &InstanceId) -> Region {
        let instance = &netlist.instances[id];
        let (anchor, rot) = self.pose(id);
        instance.occupied.rotate(Pos::new(0, 0, 0), rot).translate(anchor)
    }

    /// Pairwise-disjoint check over every instance this placement currently
    /// covers (spec §8 "placement validity").
    pub fn is_valid(&self, netlist: &Netlist) -> bool {
        let ids: Vec<&InstanceId> = self.poses.keys().collect();
        let regions: Vec<Region> = ids.iter().map(|id| self.world_occupied(netlist, id)).collect();
        for i in 0..regions.len() {
            for j in (i + 1)..regions.len() {
                if regions[i].intersects(&regions[j]) {
                    return false;
                }
            }
        }
        true
    }
}

fn volume(region: &Region) -> i64 {
    let b = region.bbox();
    (b.max.x - b.min.x + 1) as i64 * (b.max.y - b.min.y + 1) as i64 * (b.max.z - b.min.z + 1) as i64
}

/// Random valid initial placement, instances placed in descending
/// occupied-volume order with bounded rejection per instance (spec §4.6).
fn sample_initial_placement(
    netlist: &Netlist,
    config: &SynthesisConfig,
    rng: &mut ChaCha8Rng,
) -> Result<Placement, PlacementError> {
    let mut ids: Vec<InstanceId> = netlist.instances.keys().cloned().collect();
    ids.sort_by_key(|id| std::cmp::Reverse(volume(&netlist.instances[id].occupied)));

    let cube = config.bounding_cube.size.max(1);
    let group = Rotation::group();
    let mut placement = Placement::new();

    for id in ids {
        let mut placed = false;
        for _ in 0..config.max_placement_retries {
            let anchor = Pos::new(rng.gen_range(0..cube), rng.gen_range(0..cube), rng.gen_range(0..cube));
            let rot = group[rng.gen_range(0..group.len())];
            let mut candidate = placement.clone();
            candidate.set(id.clone(), anchor, rot);
            if candidate.is_valid(netlist) {
                placement = candidate;
                placed = true;
                break;
            }
        }
        if !placed {
            return Err(PlacementError::Infeasible(id));
        }
    }
    Ok(placement)
}

/// Translate / rotate-about-+Y / swap-pose, each with equal probability
/// (spec §4.6).
fn propose_move(state: &Placement, netlist: &Netlist, rng: &mut ChaCha8Rng) -> Placement {
    let mut ids: Vec<InstanceId> = netlist.instances.keys().cloned().collect();
    ids.sort();
    if ids.is_empty() {
        return state.clone();
    }

    let mut candidate = state.clone();
    match rng.gen_range(0..3) {
        0 => {
            let id = &ids[rng.gen_range(0..ids.len())];
            let (anchor, rot) = candidate.pose(id);
            let dir = crate::geometry::Direction::ALL[rng.gen_range(0..6)];
            candidate.set(id.clone(), anchor + dir, rot);
        }
        1 => {
            let id = &ids[rng.gen_range(0..ids.len())];
            let (anchor, rot) = candidate.pose(id);
            candidate.set(id.clone(), anchor, rot.then(Rotation::yaw90()));
        }
        _ => {
            if ids.len() >= 2 {
                let i = rng.gen_range(0..ids.len());
                let mut j = rng.gen_range(0..ids.len());
                while j == i {
                    j = rng.gen_range(0..ids.len());
                }
                let pose_i = candidate.pose(&ids[i]);
                let pose_j = candidate.pose(&ids[j]);
                candidate.set(ids[i].clone(), pose_j.0, pose_j.1);
                candidate.set(ids[j].clone(), pose_i.0, pose_i.1);
            }
        }
    }
    candidate
}

struct PlacementProblem<'a> {
    netlist: &'a Netlist,
    config: &'a SynthesisConfig,
    seed_state: Placement,
}

impl<'a> AnnealingProblem for PlacementProblem<'a> {
    type State = Placement;

    fn initial_state(&self, _rng: &mut ChaCha8Rng) -> Placement {
        self.seed_state.clone()
    }

    /// Bounded-retry rejection: only ever returns a collision-free state
    /// (spec §4.6 "the SA engine always sees a valid neighbor").
    fn neighbor(&self, state: &Placement, rng: &mut ChaCha8Rng) -> Placement {
        for _ in 0..self.config.max_placement_retries {
            let candidate = propose_move(state, self.netlist, rng);
            if candidate.is_valid(self.netlist) {
                return candidate;
            }
        }
        state.clone()
    }

    /// Weighted wire length, plus an optional collision-relaxed routing
    /// term, plus an always-zero overlap stabilizer (spec §4.6).
    fn energy(&self, state: &Placement) -> f64 {
        let wire_length: i64 = self
            .netlist
            .networks
            .iter()
            .map(|net| {
                let (driver_pos, _) = router::pin_world_pos(self.netlist, state, net.driver());
                net.sinks()
                    .map(|s| {
                        let (sink_pos, _) = router::pin_world_pos(self.netlist, state, s);
                        driver_pos.manhattan(sink_pos)
                    })
                    .sum::<i64>()
            })
            .sum();

        let routing_term = if self.config.use_routing_energy {
            let obstacles = router::Obstacles::from_placement(self.netlist, state);
            let (cost, collisions) =
                router::presolve_cost(self.netlist, state, &obstacles, self.config.max_explored);
            cost as f64 + collisions as f64 * 1000.0
        } else {
            0.0
        };

        let overlap_stabilizer = 0.0;

        wire_length as f64 + routing_term + overlap_stabilizer
    }
}

/// Run the placement engine: `config.placement_workers` independent SA
/// searches with different seeds, returning the lowest-energy result
/// (spec §5's sanctioned parallel boundary).
pub fn place(netlist: &Netlist, config: &SynthesisConfig) -> Result<Placement, CoreError> {
    if netlist.instances.is_empty() {
        return Ok(Placement::new());
    }

    let schedule = Schedule { t0: config.temperature, alpha: config.alpha };

    let attempts: Vec<Result<(Placement, f64), PlacementError>> = (0..config.placement_workers.max(1))
        .into_par_iter()
        .map(|worker| {
            let worker_seed = config.seed.wrapping_add(worker as u64).wrapping_mul(0x9E3779B97F4A7C15);
            let mut seed_rng = ChaCha8Rng::seed_from_u64(worker_seed);
            let seed_state = sample_initial_placement(netlist, config, &mut seed_rng)?;

            let problem = PlacementProblem { netlist, config, seed_state };
            let result = AnnealingEngine::run(&problem, schedule, config.max_steps, worker_seed);
            Ok((result.best_state, result.best_energy))
        })
        .collect();

    let mut best: Option<(Placement, f64)> = None;
    let mut first_infeasible: Option<PlacementError> = None;
    for attempt in attempts {
        match attempt {
            Ok((placement, energy)) => {
                if best.as_ref().map(|(_, e)| energy < *e).unwrap_or(true) {
                    best = Some((placement, energy));
                }
            }
            Err(e) => {
                if first_infeasible.is_none() {
                    first_infeasible = Some(e);
                }
            }
        }
    }

    match best {
        Some((placement, _)) => Ok(placement),
        None => {
            Err(first_infeasible.unwrap_or_else(|| PlacementError::Infeasible(InstanceId("<unknown>".into()))).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Direction;
    use crate::netlist::{Instance, Network, Pin, PinRef, PinRole, PinSequence, Port, PortDirection};

    fn single_pin_instance(role: PinRole, port_dir: PortDirection) -> Instance {
        let mut ports = HashMap::new();
        ports.insert(
            "p".to_string(),
            Port {
                direction: port_dir,
                sequences: vec![PinSequence {
                    pins: vec![Pin { local_pos: Pos::new(0, 0, 0), face: Direction::PosX, role }],
                }],
            },
        );
        Instance {
            library_key: "test".into(),
            occupied: Region::single(Pos::new(0, 0, 0)),
            ports,
        }
    }

    fn two_instance_netlist() -> Netlist {
        let mut instances = HashMap::new();
        instances.insert(InstanceId("src".into()), single_pin_instance(PinRole::Output, PortDirection::Out));
        instances.insert(InstanceId("snk".into()), single_pin_instance(PinRole::Input, PortDirection::In));
        let net = Network {
            id: crate::netlist::NetworkId("n0".into()),
            members: vec![
                PinRef { instance: InstanceId("src".into()), port: "p".into(), pin_index: 0 },
                PinRef { instance: InstanceId("snk".into()), port: "p".into(), pin_index: 0 },
            ],
            driver_index: 0,
        };
        Netlist::build(instances, vec![net]).unwrap()
    }

    #[test]
    fn placement_is_always_collision_free() {
        let netlist = two_instance_netlist();
        let config = SynthesisConfig { seed: 1, max_steps: 200, placement_workers: 2, ..Default::default() };
        let placement = place(&netlist, &config).unwrap();
        assert!(placement.is_valid(&netlist));
    }

    #[test]
    fn tiny_bounding_cube_is_infeasible() {
        let netlist = two_instance_netlist();
        let config = SynthesisConfig {
            seed: 1,
            bounding_cube: crate::config::BoundingCube { size: 1 },
            max_placement_retries: 10,
            placement_workers: 1,
            ..Default::default()
        };
        let result = place(&netlist, &config);
        assert!(matches!(result, Err(CoreError::Infeasible(_))));
    }

    #[test]
    fn deterministic_for_fixed_seed() {
        let netlist = two_instance_netlist();
        let config = SynthesisConfig { seed: 42, max_steps: 100, placement_workers: 2, ..Default::default() };
        let a = place(&netlist, &config).unwrap();
        let b = place(&netlist, &config).unwrap();
        assert_eq!(a, b);
    }
}
