//! Voxel map / schematic (spec §4.2): a sparse `Pos -> Block` map built
//! incrementally by disjoint overlay, with bulk rigid transform.

use std::collections::BTreeMap;

use crate::geometry::{Aabb, Direction, Pos, Region, Rotation};

/// An opaque block identifier plus orientation plus attribute map (the
/// Minecraft block state). Equality is structural (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Block {
    pub id: String,
    pub facing: Direction,
    pub attributes: BTreeMap<String, String>,
}

impl Block {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            facing: Direction::PosX,
            attributes: BTreeMap::new(),
        }
    }

    pub fn facing(mut self, dir: Direction) -> Self {
        self.facing = dir;
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Rotate the block's directional attributes to match a rotated
    /// placement (spec §4.2: "a repeater facing east rotated 90° about +Y
    /// becomes facing north"). Table-driven per block kind: any block whose
    /// `facing` participates in its identity gets the rotation applied to
    /// `self.facing`; a `facing=<dir>` attribute, if present, is kept in
    /// sync since some codecs read orientation from there instead.
    pub fn rotate(&self, rot: Rotation) -> Block {
        let mut b = self.clone();
        b.facing = rot.apply(self.facing);
        if b.attributes.contains_key("facing") {
            b.attributes
                .insert("facing".to_string(), b.facing.as_str().to_string());
        }
        b
    }
}

/// Error raised when a disjoint overlay finds an occupied position shared
/// by both operands (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("position ({x}, {y}, {z}) is occupied in both schematics")]
pub struct Overlap {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Overlap {
    fn at(pos: Pos) -> Overlap {
        Overlap {
            x: pos.x,
            y: pos.y,
            z: pos.z,
        }
    }
}

/// A sparse voxel map with an associated bounding-box region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schematic {
    blocks: BTreeMap<Pos, Block>,
}

impl Schematic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks(blocks: impl IntoIterator<Item = (Pos, Block)>) -> Self {
        Self {
            blocks: blocks.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn get(&self, pos: Pos) -> Option<&Block> {
        self.blocks.get(&pos)
    }

    pub fn set(&mut self, pos: Pos, block: Block) {
        self.blocks.insert(pos, block);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Pos, &Block)> {
        self.blocks.iter().map(|(p, b)| (*p, b))
    }

    /// Region of every occupied position (the bounding-box shape, not the
    /// exact set — call `occupied_points` for the precise point set).
    pub fn bbox_region(&self) -> Option<Region> {
        if self.blocks.is_empty() {
            return None;
        }
        let pts: Vec<Pos> = self.blocks.keys().copied().collect();
        let mut bb = Aabb::unit(pts[0]);
        for p in &pts[1..] {
            bb = bb.union(&Aabb::unit(*p));
        }
        Some(Region::Box(bb))
    }

    pub fn occupied_points(&self) -> Region {
        Region::points(self.blocks.keys().copied())
    }

    /// Disjoint overlay (spec §4.2): succeeds iff `self` and `other` share
    /// no position.
    pub fn overlay(&self, other: &Schematic) -> Result<Schematic, Overlap> {
        let mut merged = self.blocks.clone();
        for (pos, block) in &other.blocks {
            if merged.contains_key(pos) {
                return Err(Overlap::at(*pos));
            }
            merged.insert(*pos, block.clone());
        }
        Ok(Schematic { blocks: merged })
    }

    /// Forced overlay: used only by the codec when reconstructing from
    /// disk (spec §4.2) — later writer wins on collision.
    pub fn overlay_forced(&self, other: &Schematic) -> Schematic {
        let mut merged = self.blocks.clone();
        for (pos, block) in &other.blocks {
            merged.insert(*pos, block.clone());
        }
        Schematic { blocks: merged }
    }

    /// Rigid transform: translate then rotate about `origin`, rotating
    /// each block's directional attributes too.
    pub fn transform(&self, origin: Pos, rot: Rotation, translate_by: Pos) -> Schematic {
        let mut out = BTreeMap::new();
        for (pos, block) in &self.blocks {
            let rotated_pos = rot.rotate_pos(*pos, origin) + translate_by;
            out.insert(rotated_pos, block.rotate(rot));
        }
        Schematic { blocks: out }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(pos: Pos, id: &str) -> Schematic {
        Schematic::from_blocks([(pos, Block::new(id))])
    }

    #[test]
    fn overlay_rejects_shared_position() {
        let a = s(Pos::new(0, 0, 0), "minecraft:stone");
        let b = s(Pos::new(0, 0, 0), "minecraft:dirt");
        assert_eq!(a.overlay(&b), Err(Overlap { x: 0, y: 0, z: 0 }));
    }

    #[test]
    fn overlay_associative_when_pairwise_disjoint() {
        let a = s(Pos::new(0, 0, 0), "minecraft:stone");
        let b = s(Pos::new(1, 0, 0), "minecraft:dirt");
        let c = s(Pos::new(2, 0, 0), "minecraft:sand");

        let left = a.overlay(&b).unwrap().overlay(&c).unwrap();
        let right = a.overlay(&b.overlay(&c).unwrap()).unwrap();
        assert_eq!(left, right);
    }

    #[test]
    fn rotate_updates_facing_attribute() {
        let repeater = Block::new("minecraft:repeater")
            .facing(Direction::PosX)
            .with_attr("facing", "east");
        let rotated = repeater.rotate(Rotation::yaw90());
        assert_eq!(rotated.facing, Direction::NegZ);
        assert_eq!(rotated.attributes.get("facing").map(String::as_str), Some("north"));
    }

    #[test]
    fn transform_moves_and_rotates_blocks() {
        let sch = s(Pos::new(1, 0, 0), "minecraft:stone");
        let moved = sch.transform(Pos::new(0, 0, 0), Rotation::IDENTITY, Pos::new(5, 0, 0));
        assert!(moved.get(Pos::new(6, 0, 0)).is_some());
    }
}
