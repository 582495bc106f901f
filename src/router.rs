//! Path router / bussing (spec §4.5): single-wire A* over `(Pos, Direction)`
//! states, plus the greedy nearest-sink-first multi-leg driver over one
//! network, plus the collision-relaxed pre-solver used for placement
//! scoring.

use std::collections::HashSet;

use rayon::prelude::*;
use thiserror::Error;

use crate::error::{CoreError, NoPathReason};
use crate::geometry::{Direction, Pos, Region};
use crate::netlist::{Netlist, NetworkId, PinRef};
use crate::placement::Placement;
use crate::search::{AstarEngine, AstarOutcome, AstarProblem};

/// Router-layer failure (spec §4.5), converted into `CoreError::NoPath` at
/// the core's outer boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("no path for network {network}: {reason}")]
    NoPath { network: NetworkId, reason: NoPathReason },
}

impl From<RouteError> for CoreError {
    fn from(e: RouteError) -> Self {
        match e {
            RouteError::NoPath { network, reason } => CoreError::NoPath { network, reason },
        }
    }
}

/// Turn penalty added to a step when the wire changes direction (spec §4.5).
const TURN_PENALTY: i64 = 1;
/// Per-remaining-sink nudge added to the heuristic (Steiner approximation,
/// spec §4.5).
const STEINER_PENALTY: i64 = 1;

pub type WireState = (Pos, Direction);

/// The result of routing one network: its block footprint (spec §3 "Bus").
#[derive(Debug, Clone, Default)]
pub struct Bus {
    pub footprint: HashSet<Pos>,
}

/// World-frame positions no wire may enter: every placed instance's
/// transformed occupied region, plus (as networks are routed in order)
/// every earlier network's bus footprint.
#[derive(Debug, Clone, Default)]
pub struct Obstacles {
    instances: HashSet<Pos>,
    busses: HashSet<Pos>,
}

impl Obstacles {
    pub fn from_placement(netlist: &Netlist, placement: &Placement) -> Obstacles {
        let mut instances = HashSet::new();
        for (id, instance) in &netlist.instances {
            let (anchor, rot) = placement.pose(id);
            let world = instance.occupied.rotate(Pos::new(0, 0, 0), rot).translate(anchor);
            instances.extend(world.iter());
        }
        Obstacles { instances, busses: HashSet::new() }
    }

    fn blocks(&self, pos: Pos, ignore_busses: bool) -> bool {
        self.instances.contains(&pos) || (!ignore_busses && self.busses.contains(&pos))
    }

    pub fn absorb_bus(&mut self, bus: &Bus) {
        self.busses.extend(bus.footprint.iter().copied());
    }
}

/// World position and facing of one member pin, resolved through its
/// instance's placement pose.
pub fn pin_world_pos(netlist: &Netlist, placement: &Placement, pin: &PinRef) -> (Pos, Direction) {
    let instance = &netlist.instances[&pin.instance];
    let port = &instance.ports[&pin.port];
    let p = port.pin(pin.pin_index).expect("netlist validated pin index in range");
    let (anchor, rot) = placement.pose(&pin.instance);
    let world_pos = rot.rotate_pos(p.local_pos, Pos::new(0, 0, 0)) + anchor;
    (world_pos, rot.apply(p.face))
}

struct LegProblem<'a> {
    start: Pos,
    start_dir: Direction,
    goal: Pos,
    obstacles: &'a Obstacles,
    ignore_bus_collisions: bool,
    mouths: HashSet<Pos>,
    remaining_sinks: i64,
    max_explored: Option<usize>,
}

impl<'a> AstarProblem for LegProblem<'a> {
    type State = WireState;

    fn start(&self) -> WireState {
        (self.start, self.start_dir)
    }

    fn is_goal(&self, state: &WireState) -> bool {
        state.0 == self.goal
    }

    fn neighbors(&self, state: &WireState) -> Vec<(WireState, i64)> {
        let (pos, entering) = *state;
        let mut out = Vec::with_capacity(6);
        for dir in Direction::ALL {
            let next = pos + dir;
            if !self.mouths.contains(&next) && self.obstacles.blocks(next, self.ignore_bus_collisions) {
                continue;
            }
            if matches!(dir, Direction::PosY | Direction::NegY) {
                let headroom = next + Direction::PosY;
                if !self.mouths.contains(&headroom) && self.obstacles.blocks(headroom, self.ignore_bus_collisions) {
                    continue;
                }
            }
            let turn = if dir == entering { 0 } else { TURN_PENALTY };
            out.push(((next, dir), 1 + turn));
        }
        out
    }

    fn heuristic(&self, state: &WireState) -> i64 {
        state.0.manhattan(self.goal) + self.remaining_sinks * STEINER_PENALTY
    }

    fn max_explored(&self) -> Option<usize> {
        self.max_explored
    }
}

fn route_leg(
    start: Pos,
    start_dir: Direction,
    goal: Pos,
    obstacles: &Obstacles,
    ignore_bus_collisions: bool,
    remaining_sinks: i64,
    max_explored: Option<usize>,
) -> Result<HashSet<Pos>, NoPathReason> {
    if start == goal {
        return Ok(HashSet::from([start]));
    }

    let problem = LegProblem {
        start,
        start_dir,
        goal,
        obstacles,
        ignore_bus_collisions,
        mouths: HashSet::from([start, goal]),
        remaining_sinks,
        max_explored,
    };

    // No move is ever legal from the start state: the wire mouth is sealed
    // in, distinct from exhausting the frontier after genuinely exploring
    // (spec §7's three-way `NoPathReason`).
    if problem.neighbors(&problem.start()).is_empty() {
        return Err(NoPathReason::Unreachable);
    }

    match AstarEngine::search(&problem) {
        AstarOutcome::Found { path, .. } => Ok(path.into_iter().map(|(p, _)| p).collect()),
        AstarOutcome::NoPath => Err(NoPathReason::Blocked),
        AstarOutcome::OverBudget => Err(NoPathReason::OverBudget),
    }
}

/// Route one network's bus: driver to each sink, nearest-first, each leg
/// treating the accumulated footprint as an obstacle (spec §4.5's greedy
/// Steiner approximation).
pub fn route_network(
    netlist: &Netlist,
    placement: &Placement,
    network_idx: usize,
    obstacles: &Obstacles,
    max_explored: Option<usize>,
) -> Result<Bus, RouteError> {
    let network = &netlist.networks[network_idx];
    let (driver_pos, driver_face) = pin_world_pos(netlist, placement, network.driver());

    let mut remaining: Vec<(Pos, Direction)> = network
        .sinks()
        .map(|s| pin_world_pos(netlist, placement, s))
        .collect();

    let mut footprint: HashSet<Pos> = HashSet::from([driver_pos]);
    // "Rooted at the driver": each leg starts from whichever already-routed
    // footprint position is nearest the next sink, so later legs can branch
    // off an earlier leg instead of always restarting at the driver.
    let mut from = driver_pos;
    let mut from_dir = driver_face;

    while !remaining.is_empty() {
        let next_idx = remaining
            .iter()
            .enumerate()
            .min_by_key(|(_, (pos, _))| pos.manhattan(from))
            .map(|(i, _)| i)
            .expect("remaining is non-empty");
        let (sink_pos, _sink_face) = remaining.remove(next_idx);

        let nearest_footprint_point = footprint
            .iter()
            .min_by_key(|p| p.manhattan(sink_pos))
            .copied()
            .unwrap_or(from);

        let leg = route_leg(
            nearest_footprint_point,
            from_dir,
            sink_pos,
            obstacles,
            false,
            remaining.len() as i64,
            max_explored,
        )
        .map_err(|reason| RouteError::NoPath { network: network.id.clone(), reason })?;
        footprint.extend(leg);
        from = sink_pos;
        from_dir = Direction::PosX;
    }

    Ok(Bus { footprint })
}

/// Collision-relaxed pre-solver (spec §4.5): routes every network ignoring
/// other busses' footprints, returning total cost and a collision count.
/// Used only to score candidate placements; never used for the final build.
/// Parallelized across networks (spec §5's sanctioned boundary).
pub fn presolve_cost(
    netlist: &Netlist,
    placement: &Placement,
    obstacles: &Obstacles,
    max_explored: Option<usize>,
) -> (i64, usize) {
    let results: Vec<Option<usize>> = netlist
        .networks
        .par_iter()
        .enumerate()
        .map(|(idx, network)| {
            let (driver_pos, driver_face) = pin_world_pos(netlist, placement, network.driver());
            let sinks: Vec<(Pos, Direction)> =
                network.sinks().map(|s| pin_world_pos(netlist, placement, s)).collect();
            let mut total = 0usize;
            let mut from = driver_pos;
            let mut from_dir = driver_face;
            let mut remaining = sinks;
            while !remaining.is_empty() {
                let next_idx = remaining
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, (pos, _))| pos.manhattan(from))
                    .map(|(i, _)| i)
                    .expect("remaining is non-empty");
                let (sink_pos, _) = remaining.remove(next_idx);
                match route_leg(from, from_dir, sink_pos, obstacles, true, remaining.len() as i64, max_explored) {
                    Ok(leg) => total += leg.len(),
                    Err(_) => return None,
                }
                from = sink_pos;
                from_dir = Direction::PosX;
            }
            let _ = idx;
            Some(total)
        })
        .collect();

    let mut cost = 0i64;
    let mut collisions = 0usize;
    for r in results {
        match r {
            Some(len) => cost += len as i64,
            None => collisions += 1,
        }
    }
    (cost, collisions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rotation;
    use crate::netlist::{Instance, InstanceId, Network, Pin, PinRole, PinSequence, Port, PortDirection};
    use std::collections::HashMap;

    fn single_pin_instance(role: PinRole, port_dir: PortDirection, pos: Pos, face: Direction) -> Instance {
        let mut ports = HashMap::new();
        ports.insert(
            "p".to_string(),
            Port {
                direction: port_dir,
                sequences: vec![PinSequence { pins: vec![Pin { local_pos: pos, face, role }] }],
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
        instances.insert(
            InstanceId("src".into()),
            single_pin_instance(PinRole::Output, PortDirection::Out, Pos::new(0, 0, 0), Direction::PosX),
        );
        instances.insert(
            InstanceId("snk".into()),
            single_pin_instance(PinRole::Input, PortDirection::In, Pos::new(0, 0, 0), Direction::NegX),
        );
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

    fn placement_at(a: Pos, b: Pos) -> Placement {
        let mut p = Placement::new();
        p.set(InstanceId("src".into()), a, Rotation::IDENTITY);
        p.set(InstanceId("snk".into()), b, Rotation::IDENTITY);
        p
    }

    #[test]
    fn routes_adjacent_instances_with_short_bus() {
        let netlist = two_instance_netlist();
        let placement = placement_at(Pos::new(0, 0, 0), Pos::new(1, 0, 0));
        let obstacles = Obstacles::from_placement(&netlist, &placement);
        let bus = route_network(&netlist, &placement, 0, &obstacles, Some(10_000)).unwrap();
        assert!(bus.footprint.len() <= 2);
    }

    #[test]
    fn detects_sink_enclosed_by_obstacles() {
        let netlist = two_instance_netlist();
        let placement = placement_at(Pos::new(0, 0, 0), Pos::new(3, 0, 0));
        let mut obstacles = Obstacles::from_placement(&netlist, &placement);
        for p in [
            Pos::new(2, 0, 0),
            Pos::new(4, 0, 0),
            Pos::new(3, 1, 0),
            Pos::new(3, -1, 0),
            Pos::new(3, 0, 1),
            Pos::new(3, 0, -1),
        ] {
            obstacles.instances.insert(p);
        }
        // The start mouth still has open neighbors; the frontier is genuinely
        // exhausted only once it reaches the sealed-off sink, i.e. `Blocked`.
        let err = route_network(&netlist, &placement, 0, &obstacles, Some(10_000)).unwrap_err();
        assert!(matches!(err, RouteError::NoPath { reason: NoPathReason::Blocked, .. }));
    }

    #[test]
    fn detects_fully_enclosed_start_as_unreachable() {
        let netlist = two_instance_netlist();
        let start = Pos::new(5, 5, 5);
        let placement = placement_at(start, Pos::new(9, 5, 5));
        let mut obstacles = Obstacles::from_placement(&netlist, &placement);
        for dir in Direction::ALL {
            obstacles.instances.insert(start + dir);
        }
        let err = route_network(&netlist, &placement, 0, &obstacles, Some(10_000)).unwrap_err();
        assert!(matches!(err, RouteError::NoPath { reason: NoPathReason::Unreachable, .. }));
    }

    /// A caller going straight to the router, bypassing assembly's
    /// `on_unroutable` policy, sees the raw `CoreError::NoPath` (spec §7).
    #[test]
    fn route_error_converts_to_core_no_path() {
        let netlist = two_instance_netlist();
        let start = Pos::new(5, 5, 5);
        let placement = placement_at(start, Pos::new(9, 5, 5));
        let mut obstacles = Obstacles::from_placement(&netlist, &placement);
        for dir in Direction::ALL {
            obstacles.instances.insert(start + dir);
        }
        let err = route_network(&netlist, &placement, 0, &obstacles, Some(10_000)).unwrap_err();
        let core_err: CoreError = err.into();
        assert!(matches!(
            core_err,
            CoreError::NoPath { reason: NoPathReason::Unreachable, .. }
        ));
    }
}
