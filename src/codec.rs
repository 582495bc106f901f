//! Litematic NBT codec (spec §6 output format), generalized from the
//! teacher's original `write_schem` to read and write `voxel::Schematic`
//! directly instead of walking a `Circuit`/`Layout` pair.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use nbt::{Map, Value};
use thiserror::Error;

use crate::geometry::{Direction, Pos};
use crate::voxel::{Block, Schematic};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("io error at {path}: {message}")]
    Io { path: String, message: String },

    #[error("malformed litematic at {path}: {detail}")]
    Malformed { path: String, detail: String },
}

/// Canonical block ordering the palette prefers when present, matching the
/// teacher's original writer so the common gate blocks sort stably.
const CANONICAL_ORDER: &[&str] = &[
    "minecraft:air",
    "minecraft:sandstone",
    "minecraft:stone",
    "minecraft:comparator",
    "minecraft:repeater",
    "minecraft:redstone_torch",
    "minecraft:redstone_block",
    "minecraft:redstone_wire",
    "minecraft:lever",
];

fn canonical_key(name: &str, props: &BTreeMap<String, String>) -> String {
    let mut key = name.to_string();
    for (k, v) in props {
        key.push('|');
        key.push_str(k);
        key.push('=');
        key.push_str(v);
    }
    key
}

fn bits_per_entry(palette_len: usize) -> usize {
    let bits = if palette_len <= 1 {
        2
    } else {
        (palette_len as f64).log2().ceil() as usize
    };
    bits.max(2)
}

fn pack_indices(indices: &[u32], bits: usize) -> Vec<i64> {
    let mut longs = Vec::new();
    let mask: u128 = if bits >= 64 { !0u64 as u128 } else { (1u64 << bits) as u128 - 1 };
    let mut acc: u128 = 0;
    let mut acc_bits: usize = 0;
    for &idx in indices {
        acc |= (idx as u128 & mask) << acc_bits;
        acc_bits += bits;
        while acc_bits >= 64 {
            longs.push((acc & 0xffff_ffff_ffff_ffffu128) as u64 as i64);
            acc >>= 64;
            acc_bits -= 64;
        }
    }
    if acc_bits > 0 {
        longs.push((acc & 0xffff_ffff_ffff_ffffu128) as u64 as i64);
    }
    longs
}

fn unpack_indices(longs: &[i64], bits: usize, count: usize) -> Vec<u32> {
    let mask: u128 = if bits >= 64 { !0u64 as u128 } else { (1u64 << bits) as u128 - 1 };
    let mut decoded = Vec::with_capacity(count);
    let mut acc: u128 = 0;
    let mut acc_bits: usize = 0;
    for &l in longs {
        acc |= ((l as u64) as u128) << acc_bits;
        acc_bits += 64;
        while acc_bits >= bits && decoded.len() < count {
            decoded.push((acc & mask) as u32);
            acc >>= bits;
            acc_bits -= bits;
        }
    }
    decoded
}

/// Write a schematic to a gzipped `.litematic` NBT blob (spec §6's
/// `synthesize` output format).
pub fn write_schematic(schematic: &Schematic, path: &Path) -> Result<(), CodecError> {
    let path_str = path.display().to_string();

    let region = schematic
        .bbox_region()
        .map(|r| r.bbox())
        .unwrap_or_else(|| crate::geometry::Aabb::new(Pos::new(0, 0, 0), Pos::new(0, 0, 0)));
    let (min, max) = (region.min, region.max);
    let width = max.x - min.x + 1;
    let height = max.y - min.y + 1;
    let length = max.z - min.z + 1;

    let mut unique: BTreeMap<String, (String, BTreeMap<String, String>)> = BTreeMap::new();
    unique.insert("minecraft:air".to_string(), ("minecraft:air".to_string(), BTreeMap::new()));
    for block in schematic.iter().map(|(_, b)| b) {
        let key = canonical_key(&block.id, &block.attributes);
        unique.entry(key).or_insert_with(|| (block.id.clone(), block.attributes.clone()));
    }

    let mut palette_keys: Vec<(String, BTreeMap<String, String>)> = Vec::new();
    let mut palette_index: BTreeMap<String, usize> = BTreeMap::new();
    for &name in CANONICAL_ORDER {
        if let Some((key, entry)) = unique
            .iter()
            .find(|(_, (n, _))| n == name)
            .map(|(k, v)| (k.clone(), v.clone()))
        {
            palette_index.insert(key.clone(), palette_keys.len());
            palette_keys.push(entry);
            unique.remove(&key);
        }
    }
    for (key, entry) in unique {
        palette_index.insert(key, palette_keys.len());
        palette_keys.push(entry);
    }

    let bits = bits_per_entry(palette_keys.len());
    let mut indices: Vec<u32> = Vec::with_capacity((width * height * length) as usize);
    for y in 0..height {
        for z in 0..length {
            for x in 0..width {
                let pos = Pos::new(min.x + x, min.y + y, min.z + z);
                let idx = match schematic.get(pos) {
                    Some(block) => {
                        let key = canonical_key(&block.id, &block.attributes);
                        *palette_index.get(&key).unwrap_or(&0)
                    }
                    None => 0,
                };
                indices.push(idx as u32);
            }
        }
    }

    let longs = pack_indices(&indices, bits);
    let decoded = unpack_indices(&longs, bits, indices.len());
    if decoded != indices {
        return Err(CodecError::Malformed {
            path: path_str,
            detail: "block state round-trip check failed during packing".to_string(),
        });
    }

    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64;

    let mut metadata = Map::new();
    metadata.insert("Description".to_string(), Value::String(String::new()));
    metadata.insert("Name".to_string(), Value::String("Unnamed".to_string()));
    metadata.insert("Author".to_string(), Value::String("schemlogica".to_string()));
    metadata.insert("TimeCreated".to_string(), Value::Long(now));
    metadata.insert("TimeModified".to_string(), Value::Long(now));

    let total_blocks = indices.iter().filter(|&&i| i != 0).count() as i32;
    metadata.insert("TotalBlocks".to_string(), Value::Int(total_blocks));
    metadata.insert("RegionCount".to_string(), Value::Int(1));
    metadata.insert("TotalVolume".to_string(), Value::Int(width * height * length));
    let mut enclosing = Map::new();
    enclosing.insert("z".to_string(), Value::Int(length));
    enclosing.insert("x".to_string(), Value::Int(width));
    enclosing.insert("y".to_string(), Value::Int(height));
    metadata.insert("EnclosingSize".to_string(), Value::Compound(enclosing));

    let mut region_map = Map::new();
    region_map.insert("Name".to_string(), Value::String("Unnamed".to_string()));
    let mut position = Map::new();
    position.insert("x".to_string(), Value::Int(min.x));
    position.insert("y".to_string(), Value::Int(min.y));
    position.insert("z".to_string(), Value::Int(min.z));
    region_map.insert("Position".to_string(), Value::Compound(position));
    let mut size_map = Map::new();
    size_map.insert("x".to_string(), Value::Int(width));
    size_map.insert("y".to_string(), Value::Int(height));
    size_map.insert("z".to_string(), Value::Int(length));
    region_map.insert("Size".to_string(), Value::Compound(size_map));

    let mut palette_values: Vec<Value> = Vec::new();
    for (name, props) in &palette_keys {
        let mut entry = Map::new();
        entry.insert("Name".to_string(), Value::String(name.clone()));
        if !props.is_empty() {
            let mut props_map = Map::new();
            for (k, v) in props {
                props_map.insert(k.clone(), Value::String(v.clone()));
            }
            entry.insert("Properties".to_string(), Value::Compound(props_map));
        }
        palette_values.push(Value::Compound(entry));
    }
    region_map.insert("BlockStatePalette".to_string(), Value::List(palette_values));
    region_map.insert("BlockStates".to_string(), Value::LongArray(longs));
    region_map.insert("PendingBlockTicks".to_string(), Value::List(vec![]));
    region_map.insert("TileEntities".to_string(), Value::List(vec![]));
    region_map.insert("PendingFluidTicks".to_string(), Value::List(vec![]));
    region_map.insert("Entities".to_string(), Value::List(vec![]));

    let mut root_map = Map::new();
    root_map.insert("SubVersion".to_string(), Value::Int(1));
    root_map.insert("Metadata".to_string(), Value::Compound(metadata));
    root_map.insert("MinecraftDataVersion".to_string(), Value::Int(4671));
    root_map.insert("Version".to_string(), Value::Int(7));
    let mut regions_map: Map<String, Value> = Map::new();
    regions_map.insert("Unnamed".to_string(), Value::Compound(region_map));
    root_map.insert("Regions".to_string(), Value::Compound(regions_map));

    let mut blob = nbt::Blob::new();
    for (k, v) in root_map.into_iter() {
        blob.insert(k, v).map_err(|e| CodecError::Malformed {
            path: path_str.clone(),
            detail: e.to_string(),
        })?;
    }

    let file = File::create(path).map_err(|e| CodecError::Io { path: path_str.clone(), message: e.to_string() })?;
    blob.to_gzip_writer(&mut BufWriter::new(file))
        .map_err(|e| CodecError::Io { path: path_str, message: e.to_string() })?;
    Ok(())
}

fn facing_from_str(s: &str) -> Option<Direction> {
    match s {
        "east" => Some(Direction::PosX),
        "west" => Some(Direction::NegX),
        "up" => Some(Direction::PosY),
        "down" => Some(Direction::NegY),
        "south" => Some(Direction::PosZ),
        "north" => Some(Direction::NegZ),
        _ => None,
    }
}

/// Read a `.litematic` (or bare `.schem`, same NBT container) back into a
/// `Schematic`, used by the instance library loader for `tile.schem` files.
pub fn read_schematic(path: &Path) -> Result<Schematic, CodecError> {
    let path_str = path.display().to_string();
    let file = File::open(path).map_err(|e| CodecError::Io { path: path_str.clone(), message: e.to_string() })?;
    let mut reader = std::io::BufReader::new(file);
    let blob = nbt::Blob::from_gzip_reader(&mut reader)
        .map_err(|e| CodecError::Io { path: path_str.clone(), message: e.to_string() })?;

    let regions = match blob.get("Regions") {
        Some(Value::Compound(m)) => m,
        _ => return Err(CodecError::Malformed { path: path_str, detail: "missing Regions".to_string() }),
    };
    let region = regions
        .values()
        .next()
        .ok_or_else(|| CodecError::Malformed { path: path_str.clone(), detail: "no regions present".to_string() })?;
    let region = match region {
        Value::Compound(m) => m,
        _ => return Err(CodecError::Malformed { path: path_str, detail: "region is not a compound".to_string() }),
    };

    let read_i32_field = |m: &Map<String, Value>, field: &str| -> Result<i32, CodecError> {
        match m.get(field) {
            Some(Value::Int(v)) => Ok(*v),
            _ => Err(CodecError::Malformed {
                path: path_str.clone(),
                detail: format!("missing field {field}"),
            }),
        }
    };
    let read_compound = |field: &str| -> Result<&Map<String, Value>, CodecError> {
        match region.get(field) {
            Some(Value::Compound(m)) => Ok(m),
            _ => Err(CodecError::Malformed {
                path: path_str.clone(),
                detail: format!("missing field {field}"),
            }),
        }
    };

    let position = read_compound("Position")?;
    let size = read_compound("Size")?;
    let min = Pos::new(
        read_i32_field(position, "x")?,
        read_i32_field(position, "y")?,
        read_i32_field(position, "z")?,
    );
    let width = read_i32_field(size, "x")?;
    let height = read_i32_field(size, "y")?;
    let length = read_i32_field(size, "z")?;

    let palette = match region.get("BlockStatePalette") {
        Some(Value::List(l)) => l,
        _ => return Err(CodecError::Malformed { path: path_str, detail: "missing BlockStatePalette".to_string() }),
    };
    let mut palette_blocks: Vec<(String, std::collections::BTreeMap<String, String>)> = Vec::new();
    for entry in palette {
        let entry = match entry {
            Value::Compound(m) => m,
            _ => {
                return Err(CodecError::Malformed {
                    path: path_str.clone(),
                    detail: "palette entry is not a compound".to_string(),
                })
            }
        };
        let name = match entry.get("Name") {
            Some(Value::String(s)) => s.clone(),
            _ => {
                return Err(CodecError::Malformed {
                    path: path_str.clone(),
                    detail: "palette entry missing Name".to_string(),
                })
            }
        };
        let mut props = std::collections::BTreeMap::new();
        if let Some(Value::Compound(p)) = entry.get("Properties") {
            for (k, v) in p {
                if let Value::String(s) = v {
                    props.insert(k.clone(), s.clone());
                }
            }
        }
        palette_blocks.push((name, props));
    }

    let longs = match region.get("BlockStates") {
        Some(Value::LongArray(l)) => l.clone(),
        _ => return Err(CodecError::Malformed { path: path_str, detail: "missing BlockStates".to_string() }),
    };

    let bits = bits_per_entry(palette_blocks.len());
    let count = (width * height * length).max(0) as usize;
    let indices = unpack_indices(&longs, bits, count);

    let mut schematic = Schematic::new();
    let mut i = 0usize;
    for y in 0..height {
        for z in 0..length {
            for x in 0..width {
                let idx = *indices.get(i).unwrap_or(&0) as usize;
                i += 1;
                let Some((name, props)) = palette_blocks.get(idx) else { continue };
                if name == "minecraft:air" {
                    continue;
                }
                let pos = Pos::new(min.x + x, min.y + y, min.z + z);
                let facing = props.get("facing").and_then(|s| facing_from_str(s)).unwrap_or(Direction::PosX);
                let mut block = Block::new(name.clone()).facing(facing);
                for (k, v) in props {
                    block = block.with_attr(k.clone(), v.clone());
                }
                schematic.set(pos, block);
            }
        }
    }
    Ok(schematic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel::Schematic;

    #[test]
    fn write_then_read_round_trips_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.schem");

        let mut schematic = Schematic::new();
        schematic.set(Pos::new(0, 0, 0), Block::new("minecraft:sandstone"));
        schematic.set(
            Pos::new(1, 0, 0),
            Block::new("minecraft:repeater").facing(Direction::PosX).with_attr("delay", "1"),
        );

        write_schematic(&schematic, &path).unwrap();
        let read_back = read_schematic(&path).unwrap();

        assert_eq!(read_back.get(Pos::new(0, 0, 0)).unwrap().id, "minecraft:sandstone");
        let repeater = read_back.get(Pos::new(1, 0, 0)).unwrap();
        assert_eq!(repeater.id, "minecraft:repeater");
        assert_eq!(repeater.attributes.get("delay"), Some(&"1".to_string()));
    }

    #[test]
    fn write_empty_schematic_does_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.schem");
        let schematic = Schematic::new();
        write_schematic(&schematic, &path).unwrap();
        let read_back = read_schematic(&path).unwrap();
        assert!(read_back.is_empty());
    }
}
