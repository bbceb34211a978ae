//! Voxel phenotypes: raw developmental grids and their structured projection.

use serde::{Deserialize, Serialize};

/// Raw phenotype buffer: a cubic grid of `side^3` voxels.
///
/// Voxel value 0 is empty space, any other value `v` is a cell of type `v - 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoxelGrid {
    side: usize,
    voxels: Vec<u8>,
}

impl VoxelGrid {
    /// Allocate an empty grid.
    pub fn new(side: usize) -> Self {
        Self {
            side,
            voxels: vec![0; side * side * side],
        }
    }

    /// Grid side in voxels.
    #[inline]
    pub fn side(&self) -> usize {
        self.side
    }

    /// Total voxel count (`side^3`).
    #[inline]
    pub fn volume(&self) -> usize {
        self.voxels.len()
    }

    /// Linear index of a voxel. X varies fastest, then Y, then Z.
    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.side + y) * self.side + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> u8 {
        self.voxels[self.index(x, y, z)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: u8) {
        let idx = self.index(x, y, z);
        self.voxels[idx] = value;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.voxels
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.voxels
    }

    /// Reset every voxel to empty.
    pub fn clear(&mut self) {
        self.voxels.fill(0);
    }

    /// Overwrite this grid with the contents of another grid of the same side.
    pub fn copy_from(&mut self, other: &VoxelGrid) {
        debug_assert_eq!(self.side, other.side);
        self.voxels.copy_from_slice(&other.voxels);
    }

    /// Number of non-empty voxels.
    pub fn occupied(&self) -> usize {
        self.voxels.iter().filter(|&&v| v != 0).count()
    }
}

/// A single living cell of a developed body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub x: u16,
    pub y: u16,
    pub z: u16,
    pub cell_type: u8,
}

/// Sparse structured view of a developed body, used for scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub cells: Vec<Cell>,
}

impl Body {
    /// Project a voxel grid into a new body.
    pub fn isolate_from(grid: &VoxelGrid) -> Self {
        let mut body = Self::default();
        body.isolate_into(grid);
        body
    }

    /// Project a voxel grid into this body, reusing its allocation.
    pub fn isolate_into(&mut self, grid: &VoxelGrid) {
        self.cells.clear();
        let side = grid.side();
        for (idx, &value) in grid.as_slice().iter().enumerate() {
            if value == 0 {
                continue;
            }
            let x = idx % side;
            let y = (idx / side) % side;
            let z = idx / (side * side);
            self.cells.push(Cell {
                x: x as u16,
                y: y as u16,
                z: z as u16,
                cell_type: value - 1,
            });
        }
    }

    /// Number of cells.
    #[inline]
    pub fn count(&self) -> usize {
        self.cells.len()
    }

    /// Axis-aligned bounds `(min, max)` of the body, inclusive.
    pub fn bounds(&self) -> Option<([u16; 3], [u16; 3])> {
        let first = self.cells.first()?;
        let init = ([first.x, first.y, first.z], [first.x, first.y, first.z]);
        Some(self.cells.iter().fold(init, |(mut lo, mut hi), c| {
            for (axis, v) in [c.x, c.y, c.z].into_iter().enumerate() {
                lo[axis] = lo[axis].min(v);
                hi[axis] = hi[axis].max(v);
            }
            (lo, hi)
        }))
    }

    /// Vertical (Y) extent in voxels; 0 for an empty body.
    pub fn height(&self) -> usize {
        self.bounds()
            .map(|(lo, hi)| (hi[1] - lo[1]) as usize + 1)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_indexing() {
        let mut grid = VoxelGrid::new(4);
        assert_eq!(grid.volume(), 64);
        grid.set(1, 2, 3, 5);
        assert_eq!(grid.get(1, 2, 3), 5);
        assert_eq!(grid.as_slice()[grid.index(1, 2, 3)], 5);
        assert_eq!(grid.occupied(), 1);
        grid.clear();
        assert_eq!(grid.occupied(), 0);
    }

    #[test]
    fn test_isolate_body() {
        let mut grid = VoxelGrid::new(8);
        grid.set(1, 0, 2, 1);
        grid.set(1, 5, 2, 3);
        grid.set(7, 3, 0, 2);

        let body = Body::isolate_from(&grid);
        assert_eq!(body.count(), 3);
        assert!(body.cells.contains(&Cell {
            x: 1,
            y: 5,
            z: 2,
            cell_type: 2
        }));
        assert_eq!(body.height(), 6);
        assert_eq!(body.bounds(), Some(([1, 0, 0], [7, 5, 2])));
    }

    #[test]
    fn test_isolate_reuses_body() {
        let mut grid = VoxelGrid::new(4);
        grid.set(0, 0, 0, 1);
        let mut body = Body::isolate_from(&grid);

        grid.clear();
        body.isolate_into(&grid);
        assert_eq!(body.count(), 0);
        assert_eq!(body.height(), 0);
        assert!(body.bounds().is_none());
    }
}
