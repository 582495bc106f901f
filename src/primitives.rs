//! The teacher's original gate layouts, turned into data for
//! `library::builtin_gate_library` instead of a `match` producing raw
//! block lists directly (spec_full's built-in gate library supplement).
//! Each gate is a 1-voxel-high redstone contraption on a sandstone floor,
//! laid out left-to-right along +X.

use crate::geometry::{Direction, Pos, Region};
use crate::library::LibraryTile;
use crate::netlist::{Pin, PinRole, PinSequence, Port, PortDirection};
use crate::voxel::{Block, Schematic};
use std::collections::HashMap;

struct RawBlock {
    pos: Pos,
    block: Block,
}

fn b(x: i32, y: i32, z: i32, id: &str) -> RawBlock {
    RawBlock {
        pos: Pos::new(x, y, z),
        block: Block::new(id),
    }
}

fn b_attrs(x: i32, y: i32, z: i32, id: &str, attrs: &[(&str, &str)]) -> RawBlock {
    let mut block = Block::new(id);
    for (k, v) in attrs {
        block = block.with_attr(*k, *v);
    }
    RawBlock {
        pos: Pos::new(x, y, z),
        block,
    }
}

fn floor(blocks: &mut Vec<RawBlock>, size_x: i32, size_z: i32) {
    for x in 0..size_x {
        for z in 0..size_z {
            blocks.push(b(x, 0, z, "minecraft:sandstone"));
        }
    }
}

fn single_input_port() -> (Vec<Pos>, Pos) {
    (vec![Pos::new(-1, 1, 0)], Pos::new(2, 1, 0))
}

fn two_input_ports() -> Vec<Pos> {
    vec![Pos::new(-1, 1, 0), Pos::new(-1, 1, 2)]
}

/// Build a `LibraryTile` from a size, a block list, input pin local
/// positions, and an output pin local position.
fn make_tile(
    name: &str,
    size: (i32, i32, i32),
    blocks: Vec<RawBlock>,
    input_positions: Vec<Pos>,
    output_position: Pos,
) -> LibraryTile {
    let occupied = Region::Box(crate::geometry::Aabb::new(
        Pos::new(0, 0, 0),
        Pos::new(size.0 - 1, size.1 - 1, size.2 - 1),
    ));

    let mut schematic = Schematic::new();
    for rb in blocks {
        schematic.set(rb.pos, rb.block);
    }

    let mut ports = HashMap::new();
    let in_pins: Vec<Pin> = input_positions
        .into_iter()
        .map(|p| Pin {
            local_pos: p,
            face: Direction::PosX,
            role: PinRole::Input,
        })
        .collect();
    if !in_pins.is_empty() {
        ports.insert(
            "in".to_string(),
            Port {
                direction: PortDirection::In,
                sequences: vec![PinSequence { pins: in_pins }],
            },
        );
    }
    ports.insert(
        "out".to_string(),
        Port {
            direction: PortDirection::Out,
            sequences: vec![PinSequence {
                pins: vec![Pin {
                    local_pos: output_position,
                    face: Direction::PosX,
                    role: PinRole::Output,
                }],
            }],
        },
    );

    LibraryTile {
        name: name.to_string(),
        occupied,
        ports,
        schematic,
    }
}

pub fn library_tile_for(kind: &str) -> LibraryTile {
    match kind {
        "BUF" => {
            let mut blocks = Vec::new();
            floor(&mut blocks, 2, 1);
            blocks.push(b(0, 1, 0, "minecraft:redstone_wire"));
            blocks.push(b_attrs(1, 1, 0, "minecraft:repeater", &[("facing", "east"), ("delay", "1")]));
            let (ins, out) = single_input_port();
            make_tile("BUF", (2, 2, 1), blocks, ins, out)
        }

        "NOT" => {
            let mut blocks = Vec::new();
            floor(&mut blocks, 2, 1);
            blocks.push(b_attrs(0, 1, 0, "minecraft:repeater", &[("facing", "east")]));
            blocks.push(b(1, 1, 0, "minecraft:stone"));
            blocks.push(b_attrs(2, 1, 0, "minecraft:redstone_torch", &[("facing", "east"), ("lit", "true")]));
            let (ins, out) = single_input_port();
            make_tile("NOT", (2, 2, 1), blocks, ins, out)
        }

        "OR" => {
            let mut blocks = Vec::new();
            floor(&mut blocks, 2, 3);
            blocks.push(b_attrs(0, 1, 0, "minecraft:repeater", &[("facing", "east")]));
            blocks.push(b_attrs(0, 1, 2, "minecraft:repeater", &[("facing", "east")]));
            blocks.push(b(1, 1, 0, "minecraft:redstone_wire"));
            blocks.push(b(1, 1, 1, "minecraft:redstone_wire"));
            blocks.push(b(1, 1, 2, "minecraft:redstone_wire"));
            make_tile("OR", (2, 2, 3), blocks, two_input_ports(), Pos::new(2, 1, 1))
        }

        "NOR" => {
            let mut blocks = Vec::new();
            floor(&mut blocks, 4, 3);
            blocks.push(b_attrs(0, 1, 0, "minecraft:repeater", &[("facing", "east")]));
            blocks.push(b_attrs(0, 1, 2, "minecraft:repeater", &[("facing", "east")]));
            blocks.push(b(1, 1, 0, "minecraft:redstone_wire"));
            blocks.push(b(1, 1, 1, "minecraft:redstone_wire"));
            blocks.push(b(1, 1, 2, "minecraft:redstone_wire"));
            blocks.push(b_attrs(2, 1, 1, "minecraft:repeater", &[("facing", "east")]));
            blocks.push(b(3, 1, 1, "minecraft:stone"));
            blocks.push(b_attrs(4, 1, 1, "minecraft:redstone_torch", &[("facing", "east"), ("lit", "true")]));
            make_tile("NOR", (4, 2, 3), blocks, two_input_ports(), Pos::new(4, 1, 1))
        }

        "AND" => {
            let mut blocks = Vec::new();
            floor(&mut blocks, 4, 3);
            blocks.push(b(0, 1, 0, "minecraft:stone"));
            blocks.push(b_attrs(0, 2, 0, "minecraft:redstone_torch", &[("lit", "true")]));
            blocks.push(b(0, 1, 2, "minecraft:stone"));
            blocks.push(b_attrs(0, 2, 2, "minecraft:redstone_torch", &[("lit", "true")]));
            blocks.push(b(1, 1, 0, "minecraft:stone"));
            blocks.push(b(1, 1, 1, "minecraft:stone"));
            blocks.push(b(1, 1, 2, "minecraft:stone"));
            blocks.push(b(1, 2, 0, "minecraft:redstone_wire"));
            blocks.push(b(1, 2, 1, "minecraft:redstone_wire"));
            blocks.push(b(1, 2, 2, "minecraft:redstone_wire"));
            blocks.push(b(2, 1, 1, "minecraft:redstone_wire"));
            blocks.push(b(3, 1, 1, "minecraft:stone"));
            blocks.push(b_attrs(4, 1, 1, "minecraft:redstone_torch", &[("facing", "east"), ("lit", "true")]));
            make_tile("AND", (4, 3, 3), blocks, two_input_ports(), Pos::new(4, 1, 1))
        }

        "NAND" => {
            let mut blocks = Vec::new();
            floor(&mut blocks, 2, 3);
            blocks.push(b(0, 1, 0, "minecraft:stone"));
            blocks.push(b_attrs(0, 2, 0, "minecraft:redstone_torch", &[("lit", "true")]));
            blocks.push(b(0, 1, 2, "minecraft:stone"));
            blocks.push(b_attrs(0, 2, 2, "minecraft:redstone_torch", &[("lit", "true")]));
            blocks.push(b(1, 1, 1, "minecraft:stone"));
            blocks.push(b(1, 2, 0, "minecraft:redstone_wire"));
            blocks.push(b(1, 2, 1, "minecraft:redstone_wire"));
            blocks.push(b(1, 2, 2, "minecraft:redstone_wire"));
            make_tile("NAND", (2, 3, 3), blocks, two_input_ports(), Pos::new(2, 2, 1))
        }

        "INPUT" => {
            // A lever driving a single output signal; no input pins.
            let mut blocks = Vec::new();
            floor(&mut blocks, 1, 1);
            blocks.push(b_attrs(0, 1, 0, "minecraft:lever", &[("facing", "east"), ("powered", "false")]));
            make_tile("INPUT", (1, 2, 1), blocks, vec![], Pos::new(1, 1, 0))
        }

        "CONST_TRUE" => {
            let mut blocks = Vec::new();
            floor(&mut blocks, 1, 1);
            blocks.push(b(0, 1, 0, "minecraft:redstone_block"));
            make_tile("CONST_TRUE", (1, 2, 1), blocks, vec![], Pos::new(1, 1, 0))
        }

        "CONST_FALSE" => {
            let mut blocks = Vec::new();
            floor(&mut blocks, 1, 1);
            blocks.push(b(0, 1, 0, "minecraft:air"));
            make_tile("CONST_FALSE", (1, 2, 1), blocks, vec![], Pos::new(1, 1, 0))
        }

        other => panic!("no built-in gate layout for kind `{other}`"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_gate_builds() {
        for kind in ["BUF", "NOT", "AND", "NAND", "OR", "NOR", "INPUT", "CONST_TRUE", "CONST_FALSE"] {
            let tile = library_tile_for(kind);
            assert_eq!(tile.name, kind);
            assert!(!tile.schematic.is_empty() || kind == "CONST_FALSE");
            assert!(tile.ports.contains_key("out"));
        }
    }

    #[test]
    fn two_input_gates_expose_both_pins() {
        for kind in ["AND", "NAND", "OR", "NOR"] {
            let tile = library_tile_for(kind);
            let port = tile.ports.get("in").unwrap();
            assert_eq!(port.sequences[0].width(), 2);
        }
    }
}
