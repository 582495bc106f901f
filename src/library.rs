//! Instance library (spec §4.4 / §6): tiles loaded from a directory, plus a
//! programmatically-built set of the teacher's original gate primitives
//! (spec_full's "built-in gate library" supplement).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::codec;
use crate::geometry::{Direction, Pos, Region};
use crate::netlist::{Instance, Pin, PinRole, PinSequence, Port, PortDirection};
use crate::voxel::Schematic;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LibraryError {
    #[error("bad tile at {path}: missing or invalid field `{field}`")]
    BadTile { path: String, field: &'static str },

    #[error("io error reading {path}: {message}")]
    Io { path: String, message: String },

    #[error("no tile named `{0}` in the library")]
    UnknownTile(String),
}

impl From<LibraryError> for crate::error::CoreError {
    fn from(e: LibraryError) -> Self {
        match e {
            LibraryError::BadTile { path, field } => crate::error::CoreError::BadTile { path, field },
            LibraryError::Io { path, message } => {
                crate::error::CoreError::Internal(format!("io error reading {path}: {message}"))
            }
            LibraryError::UnknownTile(name) => {
                crate::error::CoreError::BadNetlist { kind: "unknown_library_key", details: name }
            }
        }
    }
}

/// One pre-built 3-D tile: its occupied region, its ports, and the blocks
/// that realize it, all in the tile's own local frame (spec §3 "Instance").
#[derive(Debug, Clone)]
pub struct LibraryTile {
    pub name: String,
    pub occupied: Region,
    pub ports: HashMap<String, Port>,
    pub schematic: Schematic,
}

#[derive(Debug, Default)]
pub struct InstanceLibrary {
    tiles: HashMap<String, LibraryTile>,
}

impl InstanceLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tile: LibraryTile) {
        self.tiles.insert(tile.name.clone(), tile);
    }

    pub fn get(&self, key: &str) -> Option<&LibraryTile> {
        self.tiles.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.tiles.keys()
    }

    /// Build a fresh `Instance` against this library (spec §4.7 step 1
    /// validates this succeeds for every netlist instance's library key).
    pub fn instantiate(&self, key: &str) -> Result<Instance, LibraryError> {
        let tile = self.get(key).ok_or_else(|| LibraryError::UnknownTile(key.to_string()))?;
        Ok(Instance {
            library_key: tile.name.clone(),
            occupied: tile.occupied.clone(),
            ports: tile.ports.clone(),
        })
    }

    /// Load every `<dir>/<tile>/{meta.json,tile.schem}` subfolder (spec §6).
    pub fn load_dir(dir: &Path) -> Result<InstanceLibrary, LibraryError> {
        let mut library = InstanceLibrary::new();
        let entries = fs::read_dir(dir).map_err(|e| LibraryError::Io {
            path: dir.display().to_string(),
            message: e.to_string(),
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| LibraryError::Io {
                path: dir.display().to_string(),
                message: e.to_string(),
            })?;
            if entry.path().is_dir() {
                let tile = load_tile(&entry.path())?;
                library.insert(tile);
            }
        }
        Ok(library)
    }
}

#[derive(Debug, Deserialize)]
struct MetaPin {
    pos: [i32; 3],
    face: String,
    role: String,
}

#[derive(Debug, Deserialize)]
struct MetaPort {
    name: String,
    direction: String,
    pins: Vec<MetaPin>,
}

#[derive(Debug, Deserialize)]
struct MetaOccupied {
    #[serde(rename = "type")]
    kind: String,
    min: Option<[i32; 3]>,
    max: Option<[i32; 3]>,
    points: Option<Vec<[i32; 3]>>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    name: String,
    ports: Vec<MetaPort>,
    occupied: Vec<MetaOccupied>,
}

fn parse_direction(path: &str, s: &str) -> Result<Direction, LibraryError> {
    match s {
        "posx" | "east" | "+x" => Ok(Direction::PosX),
        "negx" | "west" | "-x" => Ok(Direction::NegX),
        "posy" | "up" | "+y" => Ok(Direction::PosY),
        "negy" | "down" | "-y" => Ok(Direction::NegY),
        "posz" | "south" | "+z" => Ok(Direction::PosZ),
        "negz" | "north" | "-z" => Ok(Direction::NegZ),
        _ => Err(LibraryError::BadTile {
            path: path.to_string(),
            field: "face",
        }),
    }
}

fn parse_role(path: &str, s: &str) -> Result<PinRole, LibraryError> {
    match s {
        "input" => Ok(PinRole::Input),
        "output" => Ok(PinRole::Output),
        "bidir" => Ok(PinRole::Bidir),
        _ => Err(LibraryError::BadTile {
            path: path.to_string(),
            field: "role",
        }),
    }
}

fn parse_port_direction(path: &str, s: &str) -> Result<PortDirection, LibraryError> {
    match s {
        "in" => Ok(PortDirection::In),
        "out" => Ok(PortDirection::Out),
        "inout" => Ok(PortDirection::Inout),
        _ => Err(LibraryError::BadTile {
            path: path.to_string(),
            field: "direction",
        }),
    }
}

fn load_tile(dir: &Path) -> Result<LibraryTile, LibraryError> {
    let meta_path: PathBuf = dir.join("meta.json");
    let path_str = meta_path.display().to_string();
    let raw = fs::read_to_string(&meta_path).map_err(|e| LibraryError::Io {
        path: path_str.clone(),
        message: e.to_string(),
    })?;
    let meta: Meta = serde_json::from_str(&raw).map_err(|_| LibraryError::BadTile {
        path: path_str.clone(),
        field: "<root>",
    })?;

    let mut ports = HashMap::new();
    for p in &meta.ports {
        let direction = parse_port_direction(&path_str, &p.direction)?;
        let pins = p
            .pins
            .iter()
            .map(|pin| {
                Ok(Pin {
                    local_pos: Pos::new(pin.pos[0], pin.pos[1], pin.pos[2]),
                    face: parse_direction(&path_str, &pin.face)?,
                    role: parse_role(&path_str, &pin.role)?,
                })
            })
            .collect::<Result<Vec<_>, LibraryError>>()?;
        ports.insert(
            p.name.clone(),
            Port {
                direction,
                sequences: vec![PinSequence { pins }],
            },
        );
    }

    if meta.occupied.is_empty() {
        return Err(LibraryError::BadTile {
            path: path_str,
            field: "occupied",
        });
    }
    let mut regions = Vec::new();
    for occ in &meta.occupied {
        match occ.kind.as_str() {
            "box" => {
                let (min, max) = (
                    occ.min.ok_or_else(|| LibraryError::BadTile {
                        path: path_str.clone(),
                        field: "occupied[].min",
                    })?,
                    occ.max.ok_or_else(|| LibraryError::BadTile {
                        path: path_str.clone(),
                        field: "occupied[].max",
                    })?,
                );
                regions.push(Region::Box(crate::geometry::Aabb::new(
                    Pos::new(min[0], min[1], min[2]),
                    Pos::new(max[0], max[1], max[2]),
                )));
            }
            "points" => {
                let pts = occ.points.clone().ok_or_else(|| LibraryError::BadTile {
                    path: path_str.clone(),
                    field: "occupied[].points",
                })?;
                regions.push(Region::points(pts.into_iter().map(|p| Pos::new(p[0], p[1], p[2]))));
            }
            _ => {
                return Err(LibraryError::BadTile {
                    path: path_str,
                    field: "occupied[].type",
                })
            }
        }
    }
    let occupied = if regions.len() == 1 {
        regions.pop().unwrap()
    } else {
        Region::Compound(regions)
    };

    let schem_path = dir.join("tile.schem");
    let schematic = codec::read_schematic(&schem_path).map_err(|_| LibraryError::BadTile {
        path: schem_path.display().to_string(),
        field: "<tile.schem>",
    })?;

    Ok(LibraryTile {
        name: meta.name,
        occupied,
        ports,
        schematic,
    })
}

/// Build the teacher's original gate layouts (BUF/NOT/AND/NAND/OR/NOR) as an
/// in-memory library, needing no on-disk `meta.json` (spec_full supplement).
pub fn builtin_gate_library() -> InstanceLibrary {
    let mut library = InstanceLibrary::new();
    for kind in ["BUF", "NOT", "AND", "NAND", "OR", "NOR", "INPUT", "CONST_TRUE", "CONST_FALSE"] {
        library.insert(crate::primitives::library_tile_for(kind));
    }
    library
}
