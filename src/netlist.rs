//! Netlist model (spec §4.3): instances, ports, pin sequences, networks.
//!
//! Construction is atomic: `Netlist::build` validates every invariant in
//! spec §3 up front and fails with a typed error naming the offending
//! triple, rather than leaving a half-valid value around.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{Direction, Region};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub String);

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NetworkId(pub String);

impl std::fmt::Display for NetworkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The smallest electrical endpoint (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinRole {
    Input,
    Output,
    Bidir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pin {
    /// Position local to the instance's own frame (library-tile space).
    pub local_pos: crate::geometry::Pos,
    pub face: Direction,
    pub role: PinRole,
}

/// An ordered list of same-typed pins; `width()` is its length (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PinSequence {
    pub pins: Vec<Pin>,
}

impl PinSequence {
    pub fn width(&self) -> usize {
        self.pins.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortDirection {
    In,
    Out,
    Inout,
}

/// A named bus interface of one instance (spec §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub direction: PortDirection,
    pub sequences: Vec<PinSequence>,
}

impl Port {
    /// Resolve pin index `idx` against this port's flattened pin list
    /// (sequences concatenated in declaration order).
    pub(crate) fn pin(&self, idx: usize) -> Option<&Pin> {
        self.sequences.iter().flat_map(|s| &s.pins).nth(idx)
    }

    pub(crate) fn pin_count(&self) -> usize {
        self.sequences.iter().map(|s| s.width()).sum()
    }
}

/// One occurrence of a library tile, pre-placement (spec §3): the occupied
/// region and ports are in the tile's local frame; `Placement` (the
/// placement engine's output) assigns `(anchor, orient)` separately.
#[derive(Debug, Clone)]
pub struct Instance {
    pub library_key: String,
    pub occupied: Region,
    pub ports: HashMap<String, Port>,
}

/// One `(instance, port, pin index)` triple that participates in a network.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PinRef {
    pub instance: InstanceId,
    pub port: String,
    pub pin_index: usize,
}

/// A set of pin triples that must be electrically connected; exactly one is
/// the driver (spec §3).
#[derive(Debug, Clone)]
pub struct Network {
    pub id: NetworkId,
    pub members: Vec<PinRef>,
    pub driver_index: usize,
}

impl Network {
    pub fn driver(&self) -> &PinRef {
        &self.members[self.driver_index]
    }

    pub fn sinks(&self) -> impl Iterator<Item = &PinRef> {
        self.members
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != self.driver_index)
            .map(|(_, p)| p)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetlistError {
    #[error("network {network} references unknown instance {instance}")]
    UnknownInstance { network: String, instance: String },

    #[error("network {network} references unknown port {instance}.{port}")]
    UnknownPort {
        network: String,
        instance: String,
        port: String,
    },

    #[error("network {network} references out-of-range pin {instance}.{port}[{index}]")]
    PinOutOfRange {
        network: String,
        instance: String,
        port: String,
        index: usize,
    },

    #[error("pin {instance}.{port}[{index}] is referenced by more than one network ({first} and {second})")]
    PinUsedTwice {
        instance: String,
        port: String,
        index: usize,
        first: String,
        second: String,
    },

    #[error("network {network} has a sink at {instance}.{port}[{index}] whose port direction cannot accept a driven signal")]
    SinkNotInputCompatible {
        network: String,
        instance: String,
        port: String,
        index: usize,
    },

    #[error("network {0} has no members")]
    EmptyNetwork(String),
}

/// A finite map of instances plus a set of networks (spec §3), validated
/// atomically on construction.
#[derive(Debug, Clone, Default)]
pub struct Netlist {
    pub instances: HashMap<InstanceId, Instance>,
    pub networks: Vec<Network>,
}

impl Netlist {
    pub fn build(
        instances: HashMap<InstanceId, Instance>,
        networks: Vec<Network>,
    ) -> Result<Netlist, NetlistError> {
        let mut used_pins: HashMap<(InstanceId, String, usize), NetworkId> = HashMap::new();

        for net in &networks {
            if net.members.is_empty() {
                return Err(NetlistError::EmptyNetwork(net.id.to_string()));
            }
            for (i, member) in net.members.iter().enumerate() {
                let instance = instances.get(&member.instance).ok_or_else(|| {
                    NetlistError::UnknownInstance {
                        network: net.id.to_string(),
                        instance: member.instance.to_string(),
                    }
                })?;
                let port = instance.ports.get(&member.port).ok_or_else(|| {
                    NetlistError::UnknownPort {
                        network: net.id.to_string(),
                        instance: member.instance.to_string(),
                        port: member.port.clone(),
                    }
                })?;
                if member.pin_index >= port.pin_count() {
                    return Err(NetlistError::PinOutOfRange {
                        network: net.id.to_string(),
                        instance: member.instance.to_string(),
                        port: member.port.clone(),
                        index: member.pin_index,
                    });
                }

                let key = (member.instance.clone(), member.port.clone(), member.pin_index);
                if let Some(prior) = used_pins.insert(key, net.id.clone()) {
                    return Err(NetlistError::PinUsedTwice {
                        instance: member.instance.to_string(),
                        port: member.port.clone(),
                        index: member.pin_index,
                        first: prior.to_string(),
                        second: net.id.to_string(),
                    });
                }

                if i != net.driver_index {
                    let pin = port.pin(member.pin_index).expect("checked in range above");
                    let direction_ok = match port.direction {
                        PortDirection::In | PortDirection::Inout => true,
                        PortDirection::Out => false,
                    };
                    let role_ok = matches!(pin.role, PinRole::Input | PinRole::Bidir);
                    if !(direction_ok && role_ok) {
                        return Err(NetlistError::SinkNotInputCompatible {
                            network: net.id.to_string(),
                            instance: member.instance.to_string(),
                            port: member.port.clone(),
                            index: member.pin_index,
                        });
                    }
                }
            }
        }

        Ok(Netlist { instances, networks })
    }

    pub fn network_for_pin(&self, pin: &PinRef) -> Option<&Network> {
        self.networks.iter().find(|n| n.members.contains(pin))
    }

    pub fn driver_sinks(&self) -> impl Iterator<Item = (&PinRef, Vec<&PinRef>)> {
        self.networks
            .iter()
            .map(|n| (n.driver(), n.sinks().collect()))
    }

    /// Inline `child`'s instances and networks into a copy of `self`,
    /// namespacing the child's instance ids with `prefix` (spec §4.3's
    /// "flatten" operation — the core only ever holds flat netlists; this
    /// is the merge primitive an external Frontend uses to build one).
    pub fn flatten_into(mut self, prefix: &str, child: Netlist) -> Result<Netlist, NetlistError> {
        let mut instances = std::mem::take(&mut self.instances);
        let mut networks = std::mem::take(&mut self.networks);

        let rename = |id: &InstanceId| InstanceId(format!("{prefix}.{}", id.0));

        for (id, inst) in child.instances {
            instances.insert(rename(&id), inst);
        }
        for net in child.networks {
            let members = net
                .members
                .iter()
                .map(|m| PinRef {
                    instance: rename(&m.instance),
                    port: m.port.clone(),
                    pin_index: m.pin_index,
                })
                .collect();
            networks.push(Network {
                id: NetworkId(format!("{prefix}.{}", net.id.0)),
                members,
                driver_index: net.driver_index,
            });
        }

        Netlist::build(instances, networks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Pos;

    fn single_pin_instance(role: PinRole, port_dir: PortDirection) -> Instance {
        let mut ports = HashMap::new();
        ports.insert(
            "p".to_string(),
            Port {
                direction: port_dir,
                sequences: vec![PinSequence {
                    pins: vec![Pin {
                        local_pos: Pos::new(0, 0, 0),
                        face: Direction::PosX,
                        role,
                    }],
                }],
            },
        );
        Instance {
            library_key: "test".into(),
            occupied: Region::single(Pos::new(0, 0, 0)),
            ports,
        }
    }

    #[test]
    fn accepts_simple_valid_netlist() {
        let mut instances = HashMap::new();
        instances.insert(InstanceId("src".into()), single_pin_instance(PinRole::Output, PortDirection::Out));
        instances.insert(InstanceId("snk".into()), single_pin_instance(PinRole::Input, PortDirection::In));

        let net = Network {
            id: NetworkId("n0".into()),
            members: vec![
                PinRef { instance: InstanceId("src".into()), port: "p".into(), pin_index: 0 },
                PinRef { instance: InstanceId("snk".into()), port: "p".into(), pin_index: 0 },
            ],
            driver_index: 0,
        };

        assert!(Netlist::build(instances, vec![net]).is_ok());
    }

    #[test]
    fn rejects_pin_used_twice() {
        let mut instances = HashMap::new();
        instances.insert(InstanceId("src".into()), single_pin_instance(PinRole::Output, PortDirection::Out));
        instances.insert(InstanceId("snk".into()), single_pin_instance(PinRole::Input, PortDirection::In));

        let member = |id: &str| PinRef { instance: InstanceId(id.into()), port: "p".into(), pin_index: 0 };
        let n0 = Network { id: NetworkId("n0".into()), members: vec![member("src"), member("snk")], driver_index: 0 };
        let n1 = Network { id: NetworkId("n1".into()), members: vec![member("src"), member("snk")], driver_index: 0 };

        let err = Netlist::build(instances, vec![n0, n1]).unwrap_err();
        assert!(matches!(err, NetlistError::PinUsedTwice { .. }));
    }

    #[test]
    fn rejects_unknown_instance() {
        let instances = HashMap::new();
        let net = Network {
            id: NetworkId("n0".into()),
            members: vec![PinRef { instance: InstanceId("ghost".into()), port: "p".into(), pin_index: 0 }],
            driver_index: 0,
        };
        let err = Netlist::build(instances, vec![net]).unwrap_err();
        assert!(matches!(err, NetlistError::UnknownInstance { .. }));
    }
}
