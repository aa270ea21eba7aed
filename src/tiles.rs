// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Splits a region of the complex plane into square tiles of a fixed
//! number of samples, so that each tile can be sampled and rendered on
//! its own with bounded memory.
//!
//! Tile bounds are anchored at the region's lower-left corner and step
//! by `density * tile_size`; the last row and column of tiles are not
//! clamped, so they may reach past the requested upper bounds.
use error::FractalError;
use itertools::iproduct;
use planes::Region;

/// Default edge length of a tile, in samples.
pub const DEFAULT_TILE_SIZE: usize = 100;

const BYTES_PER_PIXEL: usize = 4;

/// A row-major, two-dimensional arrangement of tiles.  Row 0 is the
/// top of the image, that is, the highest imaginary range.  The same
/// container carries the tile regions going into the renderer and the
/// raster tiles coming out of it, so spatial order never has to be
/// reconstructed.
#[derive(Clone, Debug, PartialEq)]
pub struct Arrangement<T> {
    columns: usize,
    rows: usize,
    tile_size: usize,
    cells: Vec<T>,
}

impl<T> Arrangement<T> {
    /// Wraps `cells`, given row-major, as an arrangement of
    /// `columns x rows` tiles.  Returns None when the counts disagree.
    pub fn from_cells(
        columns: usize,
        rows: usize,
        tile_size: usize,
        cells: Vec<T>,
    ) -> Option<Arrangement<T>> {
        if cells.len() != columns * rows {
            return None;
        }
        Some(Arrangement {
            columns,
            rows,
            tile_size,
            cells,
        })
    }

    /// Tiles per row.
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Tiles per column.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Edge length of every tile, in samples (and pixels).
    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    /// The total number of tiles.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Describes an arrangement with no tiles.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The tile at the given row and column.
    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row < self.rows && col < self.columns {
            self.cells.get(row * self.columns + col)
        } else {
            None
        }
    }

    /// The row and column of a linear index; tiles are scheduled and
    /// gathered by this index.
    pub fn position_of(&self, index: usize) -> (usize, usize) {
        (index / self.columns, index % self.columns)
    }

    /// All tiles, row-major.
    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    /// Consumes the arrangement, returning its tiles row-major.
    pub fn into_cells(self) -> Vec<T> {
        self.cells
    }

    /// Iterates the rows from top to bottom.
    pub fn iter_rows(&self) -> ::std::slice::Chunks<T> {
        self.cells.chunks(self.columns.max(1))
    }

    /// A new arrangement of the same shape, built from each tile and its
    /// linear index.  Stops at the first error.
    pub fn try_map<U, E, F>(&self, mut f: F) -> Result<Arrangement<U>, E>
    where
        F: FnMut(usize, &T) -> Result<U, E>,
    {
        let cells = self
            .cells
            .iter()
            .enumerate()
            .map(|(index, cell)| f(index, cell))
            .collect::<Result<Vec<U>, E>>()?;
        Ok(Arrangement {
            columns: self.columns,
            rows: self.rows,
            tile_size: self.tile_size,
            cells,
        })
    }
}

/// Divides a region into an `Arrangement<Region>` of square tiles,
/// each holding `tile_size x tile_size` samples at `density`.
#[derive(Debug)]
pub struct GridPartitioner {
    region: Region,
    density: f64,
    tile_size: usize,
}

impl GridPartitioner {
    /// Constructor.  Fails if the density would degenerate the region,
    /// if the tiles would be empty, or if the stitched raster would not
    /// fit `u32` dimensions.
    pub fn new(
        region: Region,
        density: f64,
        tile_size: usize,
    ) -> Result<GridPartitioner, FractalError> {
        region.check_density(density)?;
        if tile_size == 0 {
            return Err(FractalError::InvalidTileSize { tile_size });
        }
        let partitioner = GridPartitioner {
            region,
            density,
            tile_size,
        };
        if partitioner.raster_size().is_none() {
            return Err(FractalError::invalid_region(
                region.bounds(),
                density,
                "the tiled raster would not fit u32 dimensions",
            ));
        }
        Ok(partitioner)
    }

    /// Width and height of the stitched raster, or None if either side
    /// overflows a `u32` or the pixels overflow memory.
    pub fn raster_size(&self) -> Option<(u32, u32)> {
        let width = self.tiles_per_row().checked_mul(self.tile_size)?;
        let height = self.tiles_per_column().checked_mul(self.tile_size)?;
        let bytes = width.checked_mul(height)?.checked_mul(BYTES_PER_PIXEL)?;
        let largest = ::std::u32::MAX as usize;
        if width > largest || height > largest || bytes > ::std::isize::MAX as usize {
            return None;
        }
        Some((width as u32, height as u32))
    }

    /// Samples needed to cover the real range, rounded up.
    pub fn horizontal_steps(&self) -> usize {
        (self.region.width() / self.density).ceil() as usize
    }

    /// Samples needed to cover the imaginary range, rounded up.
    pub fn vertical_steps(&self) -> usize {
        (self.region.height() / self.density).ceil() as usize
    }

    /// Tiles per row.
    pub fn tiles_per_row(&self) -> usize {
        ceil_div(self.horizontal_steps(), self.tile_size)
    }

    /// Tiles per column.
    pub fn tiles_per_column(&self) -> usize {
        ceil_div(self.vertical_steps(), self.tile_size)
    }

    /// The extent of one tile along either axis.
    pub fn tile_increment(&self) -> f64 {
        self.density * (self.tile_size as f64)
    }

    /// The edges of `count` consecutive tiles starting at `origin`.
    fn spans(&self, origin: f64, count: usize) -> Vec<(f64, f64)> {
        let increment = self.tile_increment();
        (0..count)
            .map(|k| {
                (
                    origin + (k as f64) * increment,
                    origin + ((k + 1) as f64) * increment,
                )
            })
            .collect()
    }

    /// Produce the tiles.  The vertical spans are generated bottom-up
    /// and reversed, so that row 0 holds the highest imaginary range.
    pub fn partition(&self) -> Result<Arrangement<Region>, FractalError> {
        let (columns, rows) = (self.tiles_per_row(), self.tiles_per_column());
        let horizontal = self.spans(self.region.x_min(), columns);
        let mut vertical = self.spans(self.region.i_min(), rows);
        vertical.reverse();

        let mut cells = Vec::with_capacity(columns * rows);
        for (im, x) in iproduct!(vertical.iter(), horizontal.iter()) {
            cells.push(Region::new(x.0, x.1, im.0, im.1)?);
        }
        debug!(
            "partitioned {:?} at density {} into {}x{} tiles of {} samples",
            self.region, self.density, columns, rows, self.tile_size
        );
        Ok(Arrangement {
            columns,
            rows,
            tile_size: self.tile_size,
            cells,
        })
    }
}

fn ceil_div(numerator: usize, denominator: usize) -> usize {
    numerator / denominator + if numerator % denominator == 0 { 0 } else { 1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num::Complex;

    fn square() -> Region {
        Region::new(-1.0, 1.0, -1.0, 1.0).unwrap()
    }

    #[test]
    fn partitioner_rejects_bad_inputs() {
        match GridPartitioner::new(square(), 0.0, 10) {
            Err(FractalError::InvalidRegion { .. }) => {}
            other => panic!("expected InvalidRegion, got {:?}", other),
        }
        match GridPartitioner::new(square(), 0.1, 0) {
            Err(FractalError::InvalidTileSize { tile_size: 0 }) => {}
            other => panic!("expected InvalidTileSize, got {:?}", other),
        }
    }

    #[test]
    fn partitioner_rejects_rasters_too_large_to_address() {
        match GridPartitioner::new(square(), 1e-200, DEFAULT_TILE_SIZE) {
            Err(FractalError::InvalidRegion { .. }) => {}
            other => panic!("expected InvalidRegion, got {:?}", other),
        }
        // 4e9 samples a side fits a u32, two whole tiles of 3e9 do not.
        match GridPartitioner::new(square(), 5e-10, 3_000_000_000) {
            Err(FractalError::InvalidRegion { reason, .. }) => {
                assert!(reason.contains("u32"));
            }
            other => panic!("expected InvalidRegion, got {:?}", other),
        }
    }

    #[test]
    fn raster_size_is_whole_tiles() {
        let region = Region::new(0.0, 2.5, 0.0, 1.0).unwrap();
        let partitioner = GridPartitioner::new(region, 0.5, 2).unwrap();
        assert_eq!(partitioner.raster_size(), Some((6, 2)));
    }

    #[test]
    fn try_map_keeps_the_shape() {
        let grid = Arrangement::from_cells(3, 2, 4, vec![0usize, 1, 2, 3, 4, 5]).unwrap();
        let doubled: Result<_, ()> = grid.try_map(|index, cell| Ok(index + cell));
        let doubled = doubled.unwrap();
        assert_eq!((doubled.columns(), doubled.rows(), doubled.tile_size()), (3, 2, 4));
        assert_eq!(doubled.into_cells(), vec![0, 2, 4, 6, 8, 10]);
        let failed: Result<Arrangement<usize>, usize> =
            grid.try_map(|index, _| if index == 4 { Err(index) } else { Ok(index) });
        assert_eq!(failed, Err(4));
    }

    #[test]
    fn default_region_makes_two_by_two_tiles() {
        let partitioner = GridPartitioner::new(square(), 0.01, DEFAULT_TILE_SIZE).unwrap();
        assert_eq!(partitioner.horizontal_steps(), 200);
        let tiles = partitioner.partition().unwrap();
        assert_eq!((tiles.columns(), tiles.rows()), (2, 2));
        assert_eq!(tiles.len(), 4);
    }

    #[test]
    fn top_row_holds_the_highest_imaginary_range() {
        let tiles = GridPartitioner::new(square(), 0.5, 2)
            .unwrap()
            .partition()
            .unwrap();
        assert_eq!(tiles.get(0, 0), Some(&Region::new(-1.0, 0.0, 0.0, 1.0).unwrap()));
        assert_eq!(tiles.get(0, 1), Some(&Region::new(0.0, 1.0, 0.0, 1.0).unwrap()));
        assert_eq!(tiles.get(1, 0), Some(&Region::new(-1.0, 0.0, -1.0, 0.0).unwrap()));
        assert_eq!(tiles.get(1, 1), Some(&Region::new(0.0, 1.0, -1.0, 0.0).unwrap()));
        assert_eq!(tiles.get(2, 0), None);
    }

    #[test]
    fn uneven_regions_round_up_and_overshoot() {
        // 2.5 / 0.5 = 5 steps wide, 1 / 0.5 = 2 steps tall, in tiles of 2.
        let region = Region::new(0.0, 2.5, 0.0, 1.0).unwrap();
        let tiles = GridPartitioner::new(region, 0.5, 2)
            .unwrap()
            .partition()
            .unwrap();
        assert_eq!((tiles.columns(), tiles.rows()), (3, 1));
        let last = tiles.get(0, 2).unwrap();
        assert_eq!(last.x_min(), 2.0);
        assert_eq!(last.x_max(), 3.0);
    }

    #[test]
    fn every_sample_position_lands_in_exactly_one_tile() {
        let region = Region::new(-1.3, 0.9, -0.4, 1.1).unwrap();
        let density = 0.1;
        let partitioner = GridPartitioner::new(region, density, 4).unwrap();
        let tiles = partitioner.partition().unwrap();
        for row in 0..partitioner.vertical_steps() {
            for col in 0..partitioner.horizontal_steps() {
                // Probe the middle of each sample cell to stay clear of
                // floating-point ties on tile edges.
                let point = Complex::new(
                    region.x_min() + density * (col as f64 + 0.5),
                    region.i_min() + density * (row as f64 + 0.5),
                );
                let owners = tiles.cells().iter().filter(|t| t.contains(&point)).count();
                assert_eq!(owners, 1, "sample {},{} has {} owners", row, col, owners);
            }
        }
    }

    #[test]
    fn arrangement_indexes_row_major() {
        let grid = Arrangement::from_cells(3, 2, 1, vec![0, 1, 2, 3, 4, 5]).unwrap();
        assert_eq!(grid.get(1, 0), Some(&3));
        assert_eq!(grid.position_of(4), (1, 1));
        let rows: Vec<Vec<i32>> = grid.iter_rows().map(|r| r.to_vec()).collect();
        assert_eq!(rows, vec![vec![0, 1, 2], vec![3, 4, 5]]);
        assert_eq!(grid.into_cells(), vec![0, 1, 2, 3, 4, 5]);
        assert!(Arrangement::from_cells(3, 2, 1, vec![0; 5]).is_none());
    }
}
