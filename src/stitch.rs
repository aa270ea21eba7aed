// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Assembles an arrangement of square raster tiles into one image.
//! Each row of tiles is joined left to right into a strip, and the
//! strips are stacked top to bottom, so the tile at `(col, row)` lands
//! at pixel offset `(col * tile_size, row * tile_size)`.
use error::FractalError;
use image::RgbaImage;
use tiles::Arrangement;

const BYTES_PER_PIXEL: usize = 4;

/// Joins tiles of a fixed edge length.
#[derive(Debug)]
pub struct ImageStitcher {
    tile_size: usize,
}

impl ImageStitcher {
    /// A stitcher for `tile_size x tile_size` tiles.
    pub fn new(tile_size: usize) -> Result<ImageStitcher, FractalError> {
        if tile_size == 0 || tile_size > ::std::u32::MAX as usize {
            return Err(FractalError::InvalidTileSize { tile_size });
        }
        Ok(ImageStitcher { tile_size })
    }

    /// Pixels spanned by `count` tiles, if that fits a `u32`.
    fn edge(&self, count: usize) -> Option<u32> {
        let pixels = self.tile_size.checked_mul(count)?;
        if pixels > ::std::u32::MAX as usize {
            None
        } else {
            Some(pixels as u32)
        }
    }

    fn check(&self, row: usize, col: usize, tile: &RgbaImage) -> Result<(), FractalError> {
        let edge = self.tile_size as u32;
        if tile.width() != edge || tile.height() != edge {
            return Err(FractalError::TileSizeMismatch {
                row,
                col,
                width: tile.width(),
                height: tile.height(),
                tile_size: self.tile_size,
            });
        }
        Ok(())
    }

    /// Joins one row of tiles, left to right, into a strip one tile
    /// high.  `row` is only used to report a misshapen tile.
    pub fn stitch_row(&self, row: usize, tiles: &[RgbaImage]) -> Result<RgbaImage, FractalError> {
        let width = self.edge(tiles.len()).ok_or(FractalError::RasterTooLarge {
            columns: tiles.len(),
            rows: 1,
            tile_size: self.tile_size,
        })?;
        let span = self.tile_size * BYTES_PER_PIXEL;
        let stride = span * tiles.len();
        let mut strip = RgbaImage::new(width, self.tile_size as u32);
        {
            let buffer: &mut [u8] = &mut *strip;
            for (col, tile) in tiles.iter().enumerate() {
                self.check(row, col, tile)?;
                for (y, line) in tile.chunks(span).enumerate() {
                    let start = y * stride + col * span;
                    buffer[start..start + span].copy_from_slice(line);
                }
            }
        }
        Ok(strip)
    }

    /// Stacks strips of `width` pixels, top to bottom.
    pub fn stack(&self, width: u32, strips: &[RgbaImage]) -> Result<RgbaImage, FractalError> {
        let height = self.edge(strips.len()).ok_or(FractalError::RasterTooLarge {
            columns: 1,
            rows: strips.len(),
            tile_size: self.tile_size,
        })?;
        let mut raster = RgbaImage::new(width, height);
        {
            let buffer: &mut [u8] = &mut *raster;
            let mut offset = 0;
            for strip in strips {
                let bytes: &[u8] = strip;
                buffer[offset..offset + bytes.len()].copy_from_slice(bytes);
                offset += bytes.len();
            }
        }
        Ok(raster)
    }

    /// Assemble the whole arrangement.  The result is exactly
    /// `columns * tile_size` by `rows * tile_size` pixels.
    pub fn stitch(&self, tiles: &Arrangement<RgbaImage>) -> Result<RgbaImage, FractalError> {
        let too_large = FractalError::RasterTooLarge {
            columns: tiles.columns(),
            rows: tiles.rows(),
            tile_size: self.tile_size,
        };
        let width = match (self.edge(tiles.columns()), self.edge(tiles.rows())) {
            (Some(width), Some(_)) => width,
            _ => return Err(too_large),
        };
        let strips = tiles
            .iter_rows()
            .enumerate()
            .map(|(row, cells)| self.stitch_row(row, cells))
            .collect::<Result<Vec<_>, _>>()?;
        self.stack(width, &strips)
    }
}
