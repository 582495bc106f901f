//! Geometry kernel (spec §4.1): positions, the 24-element axis-aligned
//! rotation group, and region algebra. Everything here is pure, `Copy`,
//! and cheap to hash — these values are A* closed-set keys and SA energy
//! memoization keys (spec §9).

use std::collections::HashSet;
use std::sync::OnceLock;

/// Integer lattice point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Pos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn manhattan(self, other: Pos) -> i64 {
        (self.x as i64 - other.x as i64).abs()
            + (self.y as i64 - other.y as i64).abs()
            + (self.z as i64 - other.z as i64).abs()
    }
}

impl std::ops::Add<Direction> for Pos {
    type Output = Pos;
    fn add(self, dir: Direction) -> Pos {
        let (dx, dy, dz) = dir.to_vec();
        Pos::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

impl std::ops::Add<Pos> for Pos {
    type Output = Pos;
    fn add(self, rhs: Pos) -> Pos {
        Pos::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub<Pos> for Pos {
    type Output = Pos;
    fn sub(self, rhs: Pos) -> Pos {
        Pos::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Neg for Pos {
    type Output = Pos;
    fn neg(self) -> Pos {
        Pos::new(-self.x, -self.y, -self.z)
    }
}

/// One of the six axis-aligned unit vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::PosX,
        Direction::NegX,
        Direction::PosY,
        Direction::NegY,
        Direction::PosZ,
        Direction::NegZ,
    ];

    pub const fn index(self) -> usize {
        match self {
            Direction::PosX => 0,
            Direction::NegX => 1,
            Direction::PosY => 2,
            Direction::NegY => 3,
            Direction::PosZ => 4,
            Direction::NegZ => 5,
        }
    }

    pub const fn from_index(i: usize) -> Direction {
        match i {
            0 => Direction::PosX,
            1 => Direction::NegX,
            2 => Direction::PosY,
            3 => Direction::NegY,
            4 => Direction::PosZ,
            _ => Direction::NegZ,
        }
    }

    pub const fn to_vec(self) -> (i32, i32, i32) {
        match self {
            Direction::PosX => (1, 0, 0),
            Direction::NegX => (-1, 0, 0),
            Direction::PosY => (0, 1, 0),
            Direction::NegY => (0, -1, 0),
            Direction::PosZ => (0, 0, 1),
            Direction::NegZ => (0, 0, -1),
        }
    }

    /// `dir⁻¹` (spec §4.1): the opposite unit vector.
    pub const fn inverse(self) -> Direction {
        match self {
            Direction::PosX => Direction::NegX,
            Direction::NegX => Direction::PosX,
            Direction::PosY => Direction::NegY,
            Direction::NegY => Direction::PosY,
            Direction::PosZ => Direction::NegZ,
            Direction::NegZ => Direction::PosZ,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::PosX => "east",
            Direction::NegX => "west",
            Direction::PosY => "up",
            Direction::NegY => "down",
            Direction::PosZ => "south",
            Direction::NegZ => "north",
        }
    }
}

/// An element of the 24-element axis-aligned rotation group, represented as
/// the permutation of `Direction::ALL` it induces (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rotation {
    image: [Direction; 6],
}

impl Rotation {
    pub const IDENTITY: Rotation = Rotation {
        image: Direction::ALL,
    };

    /// `dir ∘ dir` — apply this rotation to a direction vector.
    pub fn apply(self, dir: Direction) -> Direction {
        self.image[dir.index()]
    }

    fn rot_x90() -> Rotation {
        // Right-handed rotation about +X: Y -> Z -> -Y -> -Z -> Y.
        let mut image = Direction::ALL;
        image[Direction::PosX.index()] = Direction::PosX;
        image[Direction::NegX.index()] = Direction::NegX;
        image[Direction::PosY.index()] = Direction::PosZ;
        image[Direction::PosZ.index()] = Direction::NegY;
        image[Direction::NegY.index()] = Direction::NegZ;
        image[Direction::NegZ.index()] = Direction::PosY;
        Rotation { image }
    }

    fn rot_y90() -> Rotation {
        // Right-handed rotation about +Y: X -> -Z -> -X -> Z -> X.
        let mut image = Direction::ALL;
        image[Direction::PosY.index()] = Direction::PosY;
        image[Direction::NegY.index()] = Direction::NegY;
        image[Direction::PosX.index()] = Direction::NegZ;
        image[Direction::NegZ.index()] = Direction::NegX;
        image[Direction::NegX.index()] = Direction::PosZ;
        image[Direction::PosZ.index()] = Direction::PosX;
        Rotation { image }
    }

    fn rot_z90() -> Rotation {
        // Right-handed rotation about +Z: X -> Y -> -X -> -Y -> X.
        let mut image = Direction::ALL;
        image[Direction::PosZ.index()] = Direction::PosZ;
        image[Direction::NegZ.index()] = Direction::NegZ;
        image[Direction::PosX.index()] = Direction::PosY;
        image[Direction::PosY.index()] = Direction::NegX;
        image[Direction::NegX.index()] = Direction::NegY;
        image[Direction::NegY.index()] = Direction::PosX;
        Rotation { image }
    }

    /// Compose: `self.then(other)` applies `self` first, then `other`.
    pub fn then(self, other: Rotation) -> Rotation {
        let mut image = Direction::ALL;
        for d in Direction::ALL {
            image[d.index()] = other.apply(self.apply(d));
        }
        Rotation { image }
    }

    /// A 90° rotation about +Y, used by the placement engine's neighbor
    /// operator (spec §4.6).
    pub fn yaw90() -> Rotation {
        Rotation::rot_y90()
    }

    /// The full order-24 rotation group, generated by closure over the
    /// three axis generators and memoized on first use.
    pub fn group() -> &'static [Rotation; 24] {
        static GROUP: OnceLock<[Rotation; 24]> = OnceLock::new();
        GROUP.get_or_init(|| {
            let generators = [Rotation::rot_x90(), Rotation::rot_y90(), Rotation::rot_z90()];
            let mut found = vec![Rotation::IDENTITY];
            let mut frontier = vec![Rotation::IDENTITY];
            while let Some(r) = frontier.pop() {
                for g in generators {
                    let candidate = r.then(g);
                    if !found.contains(&candidate) {
                        found.push(candidate);
                        frontier.push(candidate);
                    }
                }
            }
            assert_eq!(found.len(), 24, "axis-aligned rotation group must have order 24");
            found.try_into().unwrap()
        })
    }

    /// Index of this rotation within `Rotation::group()` (stable across a
    /// process run; used to key the composition table).
    pub fn index(self) -> usize {
        Rotation::group().iter().position(|r| *r == self).expect("rotation not in group")
    }

    /// The precomputed 24x24 composition lookup (spec §4.1): `table()[a][b]`
    /// is the index of `group()[a].then(group()[b])`.
    pub fn table() -> &'static [[usize; 24]; 24] {
        static TABLE: OnceLock<[[usize; 24]; 24]> = OnceLock::new();
        TABLE.get_or_init(|| {
            let group = Rotation::group();
            let mut table = [[0usize; 24]; 24];
            for (a, ra) in group.iter().enumerate() {
                for (b, rb) in group.iter().enumerate() {
                    let composed = ra.then(*rb);
                    table[a][b] = group.iter().position(|r| *r == composed).unwrap();
                }
            }
            table
        })
    }

    /// Rotate `pos` about `origin` by this rotation.
    pub fn rotate_pos(self, pos: Pos, origin: Pos) -> Pos {
        let rel = pos - origin;
        // Express the relative offset as a sum of unit steps along the
        // three positive axes it decomposes into, then map each unit
        // through the permutation. Equivalent to applying the 3x3 rotation
        // matrix whose columns are image(+X), image(+Y), image(+Z).
        let ex = self.apply(Direction::PosX).to_vec();
        let ey = self.apply(Direction::PosY).to_vec();
        let ez = self.apply(Direction::PosZ).to_vec();
        let x = Pos::new(ex.0 * rel.x, ex.1 * rel.x, ex.2 * rel.x);
        let y = Pos::new(ey.0 * rel.y, ey.1 * rel.y, ey.2 * rel.y);
        let z = Pos::new(ez.0 * rel.z, ez.1 * rel.z, ez.2 * rel.z);
        origin + x + y + z
    }
}

/// Inclusive axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Aabb {
    pub min: Pos,
    pub max: Pos,
}

impl Aabb {
    pub fn new(min: Pos, max: Pos) -> Self {
        debug_assert!(min.x <= max.x && min.y <= max.y && min.z <= max.z);
        Self { min, max }
    }

    pub fn unit(pos: Pos) -> Self {
        Self { min: pos, max: pos }
    }

    pub fn contains(&self, pos: Pos) -> bool {
        pos.x >= self.min.x
            && pos.x <= self.max.x
            && pos.y >= self.min.y
            && pos.y <= self.max.y
            && pos.z >= self.min.z
            && pos.z <= self.max.z
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    pub fn translate(&self, delta: Pos) -> Aabb {
        Aabb::new(self.min + delta, self.max + delta)
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb::new(
            Pos::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            Pos::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        )
    }

    /// Scanline order x -> y -> z, deterministic (spec §4.1): z varies
    /// fastest, x slowest.
    pub fn iter(&self) -> impl Iterator<Item = Pos> + '_ {
        let (min, max) = (self.min, self.max);
        (min.x..=max.x).flat_map(move |x| {
            (min.y..=max.y).flat_map(move |y| (min.z..=max.z).map(move |z| Pos::new(x, y, z)))
        })
    }
}

/// A set of positions: a point set, a box, or a union of regions (spec §4.1).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Region {
    Points(Vec<Pos>),
    Box(Aabb),
    Compound(Vec<Region>),
}

impl Region {
    pub fn points(points: impl IntoIterator<Item = Pos>) -> Region {
        let mut v: Vec<Pos> = points.into_iter().collect();
        v.sort();
        v.dedup();
        Region::Points(v)
    }

    pub fn single(pos: Pos) -> Region {
        Region::Box(Aabb::unit(pos))
    }

    pub fn bbox(&self) -> Aabb {
        match self {
            Region::Box(b) => *b,
            Region::Points(pts) => {
                let mut iter = pts.iter();
                let first = *iter.next().expect("empty point-set region has no bbox");
                let mut bb = Aabb::unit(first);
                for p in iter {
                    bb = bb.union(&Aabb::unit(*p));
                }
                bb
            }
            Region::Compound(regions) => {
                let mut iter = regions.iter();
                let mut bb = iter.next().expect("empty compound region has no bbox").bbox();
                for r in iter {
                    bb = bb.union(&r.bbox());
                }
                bb
            }
        }
    }

    pub fn contains(&self, pos: Pos) -> bool {
        match self {
            Region::Box(b) => b.contains(pos),
            Region::Points(pts) => pts.binary_search(&pos).is_ok(),
            Region::Compound(regions) => regions.iter().any(|r| r.contains(pos)),
        }
    }

    pub fn iter(&self) -> Box<dyn Iterator<Item = Pos> + '_> {
        match self {
            Region::Box(b) => Box::new(b.iter()),
            Region::Points(pts) => Box::new(pts.iter().copied()),
            Region::Compound(regions) => Box::new(regions.iter().flat_map(|r| r.iter())),
        }
    }

    pub fn translate(&self, delta: Pos) -> Region {
        match self {
            Region::Box(b) => Region::Box(b.translate(delta)),
            Region::Points(pts) => Region::points(pts.iter().map(|p| *p + delta)),
            Region::Compound(regions) => {
                Region::Compound(regions.iter().map(|r| r.translate(delta)).collect())
            }
        }
    }

    pub fn rotate(&self, origin: Pos, rot: Rotation) -> Region {
        match self {
            Region::Box(b) => {
                // A box rotated by a non-identity rotation is no longer
                // axis-aligned in the *same* orientation only in the sense
                // that min/max swap; corners still form an AABB since
                // rotations are axis-permuting.
                let corners = [
                    Pos::new(b.min.x, b.min.y, b.min.z),
                    Pos::new(b.max.x, b.min.y, b.min.z),
                    Pos::new(b.min.x, b.max.y, b.min.z),
                    Pos::new(b.min.x, b.min.y, b.max.z),
                    Pos::new(b.max.x, b.max.y, b.min.z),
                    Pos::new(b.max.x, b.min.y, b.max.z),
                    Pos::new(b.min.x, b.max.y, b.max.z),
                    Pos::new(b.max.x, b.max.y, b.max.z),
                ];
                let rotated: Vec<Pos> = corners.iter().map(|c| rot.rotate_pos(*c, origin)).collect();
                let mut bb = Aabb::unit(rotated[0]);
                for p in &rotated[1..] {
                    bb = bb.union(&Aabb::unit(*p));
                }
                Region::Box(bb)
            }
            Region::Points(pts) => Region::points(pts.iter().map(|p| rot.rotate_pos(*p, origin))),
            Region::Compound(regions) => {
                Region::Compound(regions.iter().map(|r| r.rotate(origin, rot)).collect())
            }
        }
    }

    /// Hot-path intersection-nonempty predicate (spec §4.1): compound
    /// regions short-circuit on bounding boxes first.
    pub fn intersects(&self, other: &Region) -> bool {
        if !self.bbox().intersects(&other.bbox()) {
            return false;
        }
        match (self, other) {
            (Region::Compound(a), _) => a.iter().any(|r| r.intersects(other)),
            (_, Region::Compound(b)) => b.iter().any(|r| self.intersects(r)),
            (Region::Points(a), Region::Points(b)) => {
                let set: HashSet<Pos> = a.iter().copied().collect();
                b.iter().any(|p| set.contains(p))
            }
            (Region::Points(a), Region::Box(b)) => a.iter().any(|p| b.contains(*p)),
            (Region::Box(a), Region::Points(b)) => b.iter().any(|p| a.contains(*p)),
            (Region::Box(a), Region::Box(b)) => a.intersects(b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rotation_group_has_order_24() {
        assert_eq!(Rotation::group().len(), 24);
    }

    #[test]
    fn composition_table_matches_direct_application() {
        let group = Rotation::group();
        let table = Rotation::table();
        for (a, ra) in group.iter().enumerate() {
            for (b, rb) in group.iter().enumerate() {
                let expected = ra.then(*rb);
                for d in Direction::ALL {
                    assert_eq!(group[table[a][b]].apply(d), expected.apply(d));
                }
            }
        }
    }

    #[test]
    fn inverse_is_involution() {
        for d in Direction::ALL {
            assert_eq!(d.inverse().inverse(), d);
            assert_ne!(d.inverse(), d);
        }
    }

    fn arb_pos() -> impl Strategy<Value = Pos> {
        (-8i32..8, -8i32..8, -8i32..8).prop_map(|(x, y, z)| Pos::new(x, y, z))
    }

    fn arb_rotation() -> impl Strategy<Value = Rotation> {
        (0..24usize).prop_map(|i| Rotation::group()[i])
    }

    proptest! {
        #[test]
        fn geometry_round_trip(
            p1 in prop::collection::vec(arb_pos(), 1..6),
            p2 in prop::collection::vec(arb_pos(), 1..6),
            t in arb_pos(),
            r in arb_rotation(),
        ) {
            let r1 = Region::points(p1);
            let r2 = Region::points(p2);
            let before = r1.intersects(&r2);

            let origin = Pos::new(0, 0, 0);
            let transform = |region: &Region| region.rotate(origin, r).translate(t);
            let after = transform(&r1).intersects(&transform(&r2));

            prop_assert_eq!(before, after);
        }
    }
}
