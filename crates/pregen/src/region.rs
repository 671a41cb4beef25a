use crate::{Error, Result};
use core::fmt;
use serde::{Deserialize, Serialize};

/// Identity of a single grid cell, in chunk coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.x, self.z)
    }
}

/// The square of cells `[cx - r, cx + r] x [cz - r, cz + r]` around a center.
///
/// A region is fixed when a task is created and never changes afterwards. A
/// negative radius describes the empty region.
///
/// # Example
/// ```
/// use pregen::{ChunkPos, Region};
///
/// assert_eq!(Region::new(ChunkPos::new(0, 0), 0).cardinality(), 1);
/// assert_eq!(Region::new(ChunkPos::new(10, -4), 2).cardinality(), 25);
/// assert_eq!(Region::new(ChunkPos::new(0, 0), -1).cardinality(), 0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    center: ChunkPos,
    radius: i32,
}

impl Region {
    pub const fn new(center: ChunkPos, radius: i32) -> Self {
        Self { center, radius }
    }

    pub const fn center(&self) -> ChunkPos {
        self.center
    }

    pub const fn radius(&self) -> i32 {
        self.radius
    }

    /// Number of cells on one side of the square.
    ///
    /// Computed in `u64` so that the largest radius cannot overflow.
    pub(crate) const fn side(&self) -> u64 {
        if self.radius < 0 {
            0
        } else {
            2 * self.radius as u64 + 1
        }
    }

    /// Total number of cells in the region.
    pub const fn cardinality(&self) -> u64 {
        self.side() * self.side()
    }

    pub const fn is_empty(&self) -> bool {
        self.radius < 0
    }

    /// Whether every cell of the region has `i32` coordinates. The empty
    /// region always fits.
    pub const fn fits_grid(&self) -> bool {
        if self.is_empty() {
            return true;
        }
        let (min_x, max_x) = self.x_bounds();
        let (min_z, max_z) = self.z_bounds();
        min_x >= i32::MIN as i64
            && max_x <= i32::MAX as i64
            && min_z >= i32::MIN as i64
            && max_z <= i32::MAX as i64
    }

    /// Checks that the region can be enumerated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RegionOutOfBounds`] if the region reaches past the
    /// `i32` grid.
    pub fn validate(&self) -> Result<()> {
        if self.fits_grid() {
            Ok(())
        } else {
            Err(Error::RegionOutOfBounds {
                center: self.center,
                radius: self.radius,
            })
        }
    }

    /// Inclusive `(min, max)` bounds on the x axis.
    pub(crate) const fn x_bounds(&self) -> (i64, i64) {
        (
            self.center.x as i64 - self.radius as i64,
            self.center.x as i64 + self.radius as i64,
        )
    }

    /// Inclusive `(min, max)` bounds on the z axis.
    pub(crate) const fn z_bounds(&self) -> (i64, i64) {
        (
            self.center.z as i64 - self.radius as i64,
            self.center.z as i64 + self.radius as i64,
        )
    }

    pub fn contains(&self, pos: ChunkPos) -> bool {
        let (min_x, max_x) = self.x_bounds();
        let (min_z, max_z) = self.z_bounds();
        (min_x..=max_x).contains(&(pos.x as i64)) && (min_z..=max_z).contains(&(pos.z as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cardinality_matches_square_side() {
        for radius in 0..16 {
            let region = Region::new(ChunkPos::new(3, -7), radius);
            let side = (2 * radius + 1) as u64;
            assert_eq!(region.cardinality(), side * side);
        }
    }

    #[test]
    fn negative_radius_is_empty() {
        let region = Region::new(ChunkPos::new(0, 0), -3);
        assert!(region.is_empty());
        assert_eq!(region.cardinality(), 0);
        assert!(!region.contains(ChunkPos::new(0, 0)));
    }

    #[test]
    fn extreme_region_does_not_overflow() {
        let region = Region::new(ChunkPos::new(i32::MAX, i32::MIN), i32::MAX);
        let side = 2 * i32::MAX as u64 + 1;
        assert_eq!(region.cardinality(), side * side);
        assert!(region.contains(ChunkPos::new(i32::MAX, i32::MIN)));
        assert!(!region.fits_grid());
    }

    #[test]
    fn regions_past_the_grid_edge_are_rejected() {
        let inside = Region::new(ChunkPos::new(i32::MAX - 1, i32::MIN + 1), 1);
        assert!(inside.fits_grid());
        assert!(inside.validate().is_ok());
        assert!(Region::new(ChunkPos::new(0, 0), i32::MAX).fits_grid());
        assert!(Region::new(ChunkPos::new(i32::MIN, i32::MAX), -1).fits_grid());

        for region in [
            Region::new(ChunkPos::new(i32::MAX, 0), 1),
            Region::new(ChunkPos::new(i32::MIN, 0), 1),
            Region::new(ChunkPos::new(0, i32::MAX), 1),
            Region::new(ChunkPos::new(0, i32::MIN), 1),
            Region::new(ChunkPos::new(1, 0), i32::MAX),
        ] {
            assert!(!region.fits_grid(), "{region:?}");
            assert!(matches!(
                region.validate(),
                Err(Error::RegionOutOfBounds { center, radius })
                    if center == region.center() && radius == region.radius()
            ));
        }
    }

    #[test]
    fn contains_is_inclusive_at_edges() {
        let region = Region::new(ChunkPos::new(10, 10), 2);
        assert!(region.contains(ChunkPos::new(8, 12)));
        assert!(region.contains(ChunkPos::new(12, 8)));
        assert!(!region.contains(ChunkPos::new(13, 10)));
        assert!(!region.contains(ChunkPos::new(10, 7)));
    }
}
