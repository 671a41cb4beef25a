//! Deterministic, resumable enumeration of the cells of a [`Region`].
//!
//! Cells are produced in row-major order: `x` ascending in the outer loop, `z`
//! ascending in the inner loop, starting from the minimum corner. The
//! position of the sequence is a single ordinal ([`Cursor`]), so a stopped
//! task can be persisted and later rebuilt at exactly the same point without
//! skipping or repeating cells.

use crate::{ChunkPos, Error, Region, Result};
use serde::{Deserialize, Serialize};

/// Position of a [`CoordinateSequence`]: the ordinal of the next cell to be
/// emitted. A cursor equal to the region's cardinality marks an exhausted
/// sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cursor {
    pub index: u64,
}

impl Cursor {
    pub const fn new(index: u64) -> Self {
        Self { index }
    }
}

/// A single-consumer cursor over every cell of a [`Region`].
///
/// The sequence is not meant to be advanced concurrently; the dispatcher is
/// its only consumer. [`Self::count`] always reports the full cardinality of
/// the region, including cells emitted before a resume.
///
/// # Example
/// ```
/// use pregen::{ChunkPos, CoordinateSequence, Region};
///
/// let mut seq = CoordinateSequence::new(Region::new(ChunkPos::new(0, 0), 1));
/// assert_eq!(seq.count(), 9);
/// assert_eq!(seq.next(), Some(ChunkPos::new(-1, -1)));
/// assert_eq!(seq.next(), Some(ChunkPos::new(-1, 0)));
///
/// let mut resumed = CoordinateSequence::resume(*seq.region(), seq.cursor()).unwrap();
/// assert_eq!(resumed.next(), Some(ChunkPos::new(-1, 1)));
/// ```
#[derive(Clone, Debug)]
pub struct CoordinateSequence {
    region: Region,
    side: u64,
    total: u64,
    index: u64,
}

impl CoordinateSequence {
    /// Starts a sequence at the first cell of `region`, which must pass
    /// [`Region::validate`].
    pub fn new(region: Region) -> Self {
        Self {
            region,
            side: region.side(),
            total: region.cardinality(),
            index: 0,
        }
    }

    /// Rebuilds a sequence over `region` positioned at `cursor`.
    ///
    /// # Errors
    ///
    /// - [`Error::RegionOutOfBounds`] if the region reaches past the `i32`
    ///   grid.
    /// - [`Error::InvalidCursor`] if the cursor lies past the end of the
    ///   region.
    pub fn resume(region: Region, cursor: Cursor) -> Result<Self> {
        region.validate()?;
        let mut seq = Self::new(region);
        if cursor.index > seq.total {
            return Err(Error::InvalidCursor {
                index: cursor.index,
                cardinality: seq.total,
            });
        }
        seq.index = cursor.index;
        Ok(seq)
    }

    pub const fn region(&self) -> &Region {
        &self.region
    }

    /// Total number of cells in the region. Does not consume the sequence.
    pub const fn count(&self) -> u64 {
        self.total
    }

    pub const fn has_next(&self) -> bool {
        self.index < self.total
    }

    /// Number of cells already emitted, including those emitted before a
    /// resume.
    pub const fn emitted(&self) -> u64 {
        self.index
    }

    pub const fn remaining(&self) -> u64 {
        self.total - self.index
    }

    pub const fn cursor(&self) -> Cursor {
        Cursor::new(self.index)
    }

    /// Advances the cursor and returns the cell it pointed at.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<ChunkPos> {
        if !self.has_next() {
            return None;
        }
        let pos = self.pos_at(self.index);
        self.index += 1;
        Some(pos)
    }

    /// Drains the remaining cells, advancing this sequence as it goes.
    pub fn cells(&mut self) -> impl Iterator<Item = ChunkPos> + '_ {
        core::iter::from_fn(move || self.next())
    }

    /// Cell at `index` in enumeration order. `index` must be below the
    /// cardinality and the region must pass [`Region::validate`].
    fn pos_at(&self, index: u64) -> ChunkPos {
        let (min_x, _) = self.region.x_bounds();
        let (min_z, _) = self.region.z_bounds();
        let x = min_x + (index / self.side) as i64;
        let z = min_z + (index % self.side) as i64;
        ChunkPos::new(x as i32, z as i32)
    }
}
