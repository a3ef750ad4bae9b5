//! Fixed-point spatial math for deterministic decision making.
//!
//! All distance comparisons in the decision layer use fixed-point
//! arithmetic so that the same observations always produce the same
//! orders, regardless of platform. Floating-point operations can
//! produce different results on different CPUs.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all decision-layer math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// World positions are measured in tiles; one tile is one world unit.
pub const TILE: i32 = 1;

/// A tile coordinate on the map grid.
///
/// Build sites and start locations are addressed in tiles; unit
/// positions are continuous [`Vec2Fixed`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TilePos {
    /// Tile column.
    pub x: i32,
    /// Tile row.
    pub y: i32,
}

impl TilePos {
    /// Create a new tile position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Center of this tile in world coordinates.
    #[must_use]
    pub fn center(self) -> Vec2Fixed {
        Vec2Fixed::new(Fixed::from_num(self.x), Fixed::from_num(self.y))
    }
}

/// Fixed-point 2D world position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Build a position from integer tile coordinates.
    #[must_use]
    pub fn from_tiles(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Nearest tile containing this position.
    #[must_use]
    pub fn to_tile(self) -> TilePos {
        TilePos::new(self.x.to_num::<i32>(), self.y.to_num::<i32>())
    }

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// True when `other` lies within `radius_tiles` tiles of this position.
    ///
    /// Radius comparisons are done on squared distances so no square
    /// root is ever taken.
    #[must_use]
    pub fn within(self, other: Self, radius_tiles: i32) -> bool {
        let r = Fixed::from_num(radius_tiles * TILE);
        self.distance_squared(other) <= r * r
    }

    /// Midpoint between two positions.
    #[must_use]
    pub fn midpoint(self, other: Self) -> Self {
        let two = Fixed::from_num(2);
        Self::new((self.x + other.x) / two, (self.y + other.y) / two)
    }
}

/// Average of a set of positions.
///
/// Returns [`Vec2Fixed::ZERO`] for an empty set; callers treat an empty
/// roster as having no meaningful centroid.
#[must_use]
pub fn centroid(points: &[Vec2Fixed]) -> Vec2Fixed {
    if points.is_empty() {
        return Vec2Fixed::ZERO;
    }
    let mut sum = Vec2Fixed::ZERO;
    for p in points {
        sum = sum + *p;
    }
    let n = Fixed::from_num(points.len() as i64);
    Vec2Fixed::new(sum.x / n, sum.y / n)
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_squared() {
        let a = Vec2Fixed::from_tiles(3, 0);
        let b = Vec2Fixed::from_tiles(0, 4);
        // 3² + 4² = 25
        assert_eq!(a.distance_squared(b), Fixed::from_num(25));
    }

    #[test]
    fn test_within_is_inclusive() {
        let a = Vec2Fixed::from_tiles(0, 0);
        let b = Vec2Fixed::from_tiles(10, 0);
        assert!(a.within(b, 10));
        assert!(!a.within(b, 9));
    }

    #[test]
    fn test_midpoint() {
        let a = Vec2Fixed::from_tiles(0, 0);
        let b = Vec2Fixed::from_tiles(10, 20);
        assert_eq!(a.midpoint(b), Vec2Fixed::from_tiles(5, 10));
    }

    #[test]
    fn test_centroid_averages() {
        let points = [
            Vec2Fixed::from_tiles(0, 0),
            Vec2Fixed::from_tiles(4, 0),
            Vec2Fixed::from_tiles(2, 6),
        ];
        assert_eq!(centroid(&points), Vec2Fixed::from_tiles(2, 2));
    }

    #[test]
    fn test_centroid_empty() {
        assert_eq!(centroid(&[]), Vec2Fixed::ZERO);
    }

    #[test]
    fn test_tile_round_trip() {
        let t = TilePos::new(7, 11);
        assert_eq!(t.center().to_tile(), t);
    }
}
