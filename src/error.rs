// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The single error type shared by every stage of the pipeline.
use std::io;

/// Everything that can go wrong while partitioning, sampling,
/// rendering, stitching, or writing a fractal.  Numeric overflow
/// during escape-time iteration is not an error; it is folded into an
/// `Unbounded` classification by the evaluators.
#[derive(Debug, Fail)]
pub enum FractalError {
    /// The region is empty, inverted, or the sampling step would
    /// degenerate it.  Carries the offending bounds and density.
    #[fail(
        display = "invalid region [{}, {}] x [{}, {}]i at density {}: {}",
        x_min, x_max, i_min, i_max, density, reason
    )]
    InvalidRegion {
        /// Lower real bound.
        x_min: f64,
        /// Upper real bound.
        x_max: f64,
        /// Lower imaginary bound.
        i_min: f64,
        /// Upper imaginary bound.
        i_max: f64,
        /// The sampling step in effect, NaN if none was supplied yet.
        density: f64,
        /// What was wrong.
        reason: &'static str,
    },

    /// Tiles must hold at least one pixel.
    #[fail(display = "invalid tile size {}: tiles must be at least 1x1", tile_size)]
    InvalidTileSize {
        /// The rejected size.
        tile_size: usize,
    },

    /// The stitcher was handed a tile that does not match the grid.
    #[fail(
        display = "tile at row {}, column {} is {}x{}, expected {}x{}",
        row, col, width, height, tile_size, tile_size
    )]
    TileSizeMismatch {
        /// Arrangement row of the tile.
        row: usize,
        /// Arrangement column of the tile.
        col: usize,
        /// Actual width.
        width: u32,
        /// Actual height.
        height: u32,
        /// Expected width and height.
        tile_size: usize,
    },

    /// The tiles would stitch into a raster wider or taller than a
    /// `u32` can address.
    #[fail(
        display = "{}x{} tiles of {} pixels exceed the largest raster",
        columns, rows, tile_size
    )]
    RasterTooLarge {
        /// Tiles per row.
        columns: usize,
        /// Tiles per column.
        rows: usize,
        /// Edge length of a tile.
        tile_size: usize,
    },

    /// A tile worker thread panicked before returning its tiles.
    #[fail(display = "a tile worker panicked")]
    WorkerPanicked,

    /// The raster could not be written.
    #[fail(display = "could not write image: {}", _0)]
    Io(#[cause] io::Error),
}

impl From<io::Error> for FractalError {
    fn from(err: io::Error) -> FractalError {
        FractalError::Io(err)
    }
}

impl FractalError {
    pub(crate) fn invalid_region(
        bounds: (f64, f64, f64, f64),
        density: f64,
        reason: &'static str,
    ) -> FractalError {
        FractalError::InvalidRegion {
            x_min: bounds.0,
            x_max: bounds.1,
            i_min: bounds.2,
            i_max: bounds.3,
            density,
            reason,
        }
    }
}
