// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turns tiles of the complex plane into tiles of pixels, and drives
//! the whole pipeline: partition, sample, classify, colour, stitch.
//!
//! Every tile is sampled from one lattice anchored at the region's
//! lower-left corner: tile `(row, col)` takes the samples whose step
//! indices fall in its `tile_size` square.  Neighbouring tiles therefore
//! meet without gaps, and the only unsampled pixels are the trailing
//! overshoot past the region's sample counts.
//!
//! Tiles share nothing but the read-only renderer, so they can be
//! rendered in any order on any thread.  The threaded path hands out
//! tile indices from a shared queue and puts the finished tiles back
//! in index order, which makes its output identical to the sequential
//! path.

extern crate crossbeam;

use crossbeam::thread::ScopedJoinHandle;
use error::FractalError;
use escape::{Escape, EscapeEvaluator};
use image::{Rgba, RgbaImage};
use output::RasterSink;
use planes::{PlaneSampler, Region, Rounding, SampleGrid};
use std::sync::{Arc, Mutex};
use stitch::ImageStitcher;
use tiles::{Arrangement, GridPartitioner, DEFAULT_TILE_SIZE};

/// The colours a tile is painted with.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Palette {
    /// Colour of samples whose orbit stayed bounded.
    pub bounded: Rgba<u8>,
    /// Colour of samples whose orbit escaped.
    pub unbounded: Rgba<u8>,
    /// Colour of tile pixels that received no sample.
    pub unsampled: Rgba<u8>,
}

impl Default for Palette {
    fn default() -> Palette {
        Palette {
            bounded: Rgba([0, 0, 102, 0]),
            unbounded: Rgba([255, 204, 51, 0]),
            unsampled: Rgba([0, 0, 0, 0]),
        }
    }
}

impl Palette {
    /// The colour for a classification.
    pub fn color(&self, escape: Escape) -> Rgba<u8> {
        match escape {
            Escape::Bounded => self.bounded,
            Escape::Unbounded => self.unbounded,
        }
    }
}

/// Paints one sample grid into a square tile.
pub struct TileRenderer<'a> {
    evaluator: &'a dyn EscapeEvaluator,
    palette: Palette,
    tile_size: usize,
}

impl<'a> TileRenderer<'a> {
    /// A renderer producing `tile_size x tile_size` tiles.
    pub fn new(
        evaluator: &'a dyn EscapeEvaluator,
        palette: Palette,
        tile_size: usize,
    ) -> TileRenderer<'a> {
        TileRenderer {
            evaluator,
            palette,
            tile_size,
        }
    }

    /// Classify every sample and write its colour to the pixel at the
    /// same row and column.  Samples that fall outside the tile are
    /// dropped; pixels that get no sample keep the unsampled colour.
    pub fn render(&self, grid: &SampleGrid) -> RgbaImage {
        self.render_at(grid, 0)
    }

    /// As `render`, with the grid's first row placed `first_row` pixels
    /// down the tile.
    pub fn render_at(&self, grid: &SampleGrid, first_row: usize) -> RgbaImage {
        let edge = self.tile_size as u32;
        let mut tile = RgbaImage::from_pixel(edge, edge, self.palette.unsampled);
        let room = self.tile_size.saturating_sub(first_row);
        for (row, samples) in grid.rows().take(room).enumerate() {
            for (col, point) in samples.iter().take(self.tile_size).enumerate() {
                let color = self.palette.color(self.evaluator.classify(*point));
                tile.put_pixel(col as u32, (first_row + row) as u32, color);
            }
        }
        tile
    }
}

type Rendered = Result<RgbaImage, FractalError>;
type Finished = Vec<(usize, Rendered)>;

/// Holds everything needed to render a region of the complex plane
/// into a single raster.  Once built, a renderer is read-only and can
/// be shared between worker threads.
pub struct FractalRenderer {
    region: Region,
    density: f64,
    tile_size: usize,
    rounding: Rounding,
    palette: Palette,
    threads: usize,
    evaluator: Box<dyn EscapeEvaluator>,
}

impl FractalRenderer {
    /// Requires the region to render, the spacing between samples, and
    /// the membership test.  Everything else starts at its default:
    /// tiles of 100 samples, the default palette, floor rounding, and a
    /// single thread.
    pub fn new<E>(region: Region, density: f64, evaluator: E) -> Result<Self, FractalError>
    where
        E: EscapeEvaluator + 'static,
    {
        FractalRenderer::from_boxed(region, density, Box::new(evaluator))
    }

    /// As `new`, for an evaluator chosen at run time.
    pub fn from_boxed(
        region: Region,
        density: f64,
        evaluator: Box<dyn EscapeEvaluator>,
    ) -> Result<Self, FractalError> {
        region.check_density(density)?;
        Ok(FractalRenderer {
            region,
            density,
            tile_size: DEFAULT_TILE_SIZE,
            rounding: Rounding::default(),
            palette: Palette::default(),
            threads: 1,
            evaluator,
        })
    }

    /// Sets the edge length of a tile, in samples.
    pub fn with_tile_size(mut self, tile_size: usize) -> Result<Self, FractalError> {
        if tile_size == 0 {
            return Err(FractalError::InvalidTileSize { tile_size });
        }
        self.tile_size = tile_size;
        Ok(self)
    }

    /// Sets the colours.
    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    /// Sets how per-tile sample counts are rounded.
    pub fn with_rounding(mut self, rounding: Rounding) -> Self {
        self.rounding = rounding;
        self
    }

    /// Sets the number of worker threads; zero is treated as one.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// The region being rendered.
    pub fn region(&self) -> Region {
        self.region
    }

    /// The edge length of a tile.
    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    /// Split the region into tiles.
    pub fn partition(&self) -> Result<Arrangement<Region>, FractalError> {
        GridPartitioner::new(self.region, self.density, self.tile_size)?.partition()
    }

    /// Sample and paint the tile at `row`, `col` of `tiles`.  The tile
    /// takes the lattice samples `col * tile_size` onward along the real
    /// axis and, counting rows of tiles up from the bottom, the same
    /// along the imaginary axis.  Samples past the region's counts are
    /// left unsampled.
    pub fn render_tile(
        &self,
        tiles: &Arrangement<Region>,
        row: usize,
        col: usize,
    ) -> Result<RgbaImage, FractalError> {
        let size = tiles.tile_size();
        let sampler = PlaneSampler::with_rounding(self.region, self.density, self.rounding)?;
        let first_step = tiles.rows().saturating_sub(row + 1) * size;
        let grid = sampler.sample_block(col * size, first_step, size);
        trace!(
            "tile {},{} {:?}: {}x{} samples",
            row,
            col,
            tiles.get(row, col),
            grid.width(),
            grid.height()
        );
        // Short blocks sit against the bottom of the tile.
        let renderer = TileRenderer::new(&*self.evaluator, self.palette, size);
        Ok(renderer.render_at(&grid, size - grid.height()))
    }

    fn render_index(&self, tiles: &Arrangement<Region>, index: usize) -> Rendered {
        let (row, col) = tiles.position_of(index);
        self.render_tile(tiles, row, col)
    }

    /// Render every tile of the arrangement, keeping its shape and
    /// order.
    pub fn render_tiles(
        &self,
        tiles: &Arrangement<Region>,
    ) -> Result<Arrangement<RgbaImage>, FractalError> {
        if self.threads > 1 && tiles.len() > 1 {
            self.render_tiles_threaded(tiles)
        } else {
            tiles.try_map(|index, _| self.render_index(tiles, index))
        }
    }

    /// A multi-threaded version of the tile loop.  Workers pull tile
    /// indices until the queue is dry; the results are then slotted
    /// back by index.
    fn render_tiles_threaded(
        &self,
        tiles: &Arrangement<Region>,
    ) -> Result<Arrangement<RgbaImage>, FractalError> {
        let workers = self.threads.min(tiles.len());
        debug!("rendering {} tiles on {} workers", tiles.len(), workers);
        let queue = Arc::new(Mutex::new(0..tiles.len()));

        let mut finished: Finished = vec![];
        let mut lost_worker = false;
        crossbeam::scope(|spawner| {
            let handles: Vec<ScopedJoinHandle<Finished>> = (0..workers)
                .map(|_| {
                    let queue = queue.clone();
                    spawner.spawn(move |_| {
                        let mut done: Finished = vec![];
                        loop {
                            let next = match queue.lock() {
                                Ok(mut pending) => pending.next(),
                                Err(_) => None,
                            };
                            match next {
                                Some(index) => {
                                    trace!("worker picked up tile {}", index);
                                    done.push((index, self.render_index(tiles, index)));
                                }
                                None => {
                                    break;
                                }
                            }
                        }
                        done
                    })
                })
                .collect();

            for handle in handles {
                match handle.join() {
                    Ok(done) => finished.extend(done),
                    Err(_) => lost_worker = true,
                }
            }
        })
        .map_err(|_| FractalError::WorkerPanicked)?;

        if lost_worker {
            return Err(FractalError::WorkerPanicked);
        }

        // Every index left the queue exactly once, and every worker that
        // took one joined cleanly, so each slot is filled.
        let mut slots: Vec<Option<Rendered>> = (0..tiles.len()).map(|_| None).collect();
        for (index, tile) in finished {
            slots[index] = Some(tile);
        }
        tiles.try_map(|index, _| {
            slots[index]
                .take()
                .unwrap_or_else(|| Err(FractalError::WorkerPanicked))
        })
    }

    /// The main entry point: render the whole region into one raster.
    pub fn render(&self) -> Result<RgbaImage, FractalError> {
        let tiles = self.partition()?;
        let rendered = self.render_tiles(&tiles)?;
        let raster = ImageStitcher::new(self.tile_size)?.stitch(&rendered)?;
        info!(
            "rendered {}x{} raster from {} tiles",
            raster.width(),
            raster.height(),
            rendered.len()
        );
        Ok(raster)
    }

    /// Render, then hand the finished raster to `sink`.
    pub fn render_to(&self, sink: &dyn RasterSink) -> Result<(), FractalError> {
        let raster = self.render()?;
        sink.write(&raster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use escape::Julia;
    use num::Complex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn square() -> Region {
        Region::new(-1.0, 1.0, -1.0, 1.0).unwrap()
    }

    fn always_bounded(_: Complex<f64>) -> Escape {
        Escape::Bounded
    }

    fn upper_half(p: Complex<f64>) -> Escape {
        if p.im > 0.0 {
            Escape::Bounded
        } else {
            Escape::Unbounded
        }
    }

    #[test]
    fn palette_maps_classifications() {
        let palette = Palette::default();
        assert_eq!(palette.color(Escape::Bounded), Rgba([0, 0, 102, 0]));
        assert_eq!(palette.color(Escape::Unbounded), Rgba([255, 204, 51, 0]));
    }

    #[test]
    fn tile_rows_follow_grid_rows() {
        let grid = PlaneSampler::new(square(), 0.5).unwrap().sample();
        let evaluator = upper_half;
        let palette = Palette::default();
        let tile = TileRenderer::new(&evaluator, palette, 4).render(&grid);
        assert_eq!(tile.dimensions(), (4, 4));
        // Grid rows 0 and 1 are at +0.5i and 0i.
        assert_eq!(*tile.get_pixel(0, 0), palette.bounded);
        assert_eq!(*tile.get_pixel(3, 0), palette.bounded);
        assert_eq!(*tile.get_pixel(0, 1), palette.unbounded);
        assert_eq!(*tile.get_pixel(2, 3), palette.unbounded);
    }

    #[test]
    fn short_grids_leave_unsampled_pixels() {
        let region = Region::new(0.0, 1.0, 0.0, 0.7).unwrap();
        let grid = PlaneSampler::new(region, 0.3).unwrap().sample();
        let evaluator = always_bounded;
        let palette = Palette::default();
        let tile = TileRenderer::new(&evaluator, palette, 4).render(&grid);
        assert_eq!(*tile.get_pixel(2, 1), palette.bounded);
        assert_eq!(*tile.get_pixel(3, 0), palette.unsampled);
        assert_eq!(*tile.get_pixel(0, 2), palette.unsampled);
    }

    #[test]
    fn oversized_grids_are_clipped() {
        let grid = PlaneSampler::new(square(), 0.25).unwrap().sample();
        let evaluator = always_bounded;
        let tile = TileRenderer::new(&evaluator, Palette::default(), 3).render(&grid);
        assert_eq!(tile.dimensions(), (3, 3));
        assert!(tile.pixels().all(|p| *p == Palette::default().bounded));
    }

    #[test]
    fn each_sample_is_classified_once() {
        struct Counting(AtomicUsize);
        impl EscapeEvaluator for Counting {
            fn classify(&self, _: Complex<f64>) -> Escape {
                self.0.fetch_add(1, Ordering::SeqCst);
                Escape::Unbounded
            }
        }
        let counter = Counting(AtomicUsize::new(0));
        let grid = PlaneSampler::new(square(), 0.5).unwrap().sample();
        TileRenderer::new(&counter, Palette::default(), 4).render(&grid);
        assert_eq!(counter.0.load(Ordering::SeqCst), 16);
    }

    #[test]
    fn render_at_pushes_short_grids_down() {
        let region = Region::new(0.0, 1.0, 0.0, 0.5).unwrap();
        let grid = PlaneSampler::new(region, 0.25).unwrap().sample();
        assert_eq!((grid.width(), grid.height()), (4, 2));
        let evaluator = always_bounded;
        let palette = Palette::default();
        let tile = TileRenderer::new(&evaluator, palette, 4).render_at(&grid, 2);
        assert_eq!(*tile.get_pixel(0, 1), palette.unsampled);
        assert_eq!(*tile.get_pixel(0, 2), palette.bounded);
        assert_eq!(*tile.get_pixel(3, 3), palette.bounded);
    }

    #[test]
    fn tiles_share_one_lattice() {
        // 150 x 100 samples tile unevenly by 16, and tile spans rebuilt
        // in floating point can fall a hair short of 16 steps.
        let region = Region::new(-1.5, 1.5, -1.0, 1.0).unwrap();
        let renderer = FractalRenderer::new(region, 0.02, Julia::default())
            .unwrap()
            .with_tile_size(16)
            .unwrap();
        let tiles = renderer.partition().unwrap();
        assert_eq!((tiles.columns(), tiles.rows()), (10, 7));
        let interior = renderer.render_tile(&tiles, 3, 1).unwrap();
        assert!(interior.pixels().all(|p| *p != Palette::default().unsampled));
        // The top-right tile holds 6 columns and 4 rows of samples.
        let corner = renderer.render_tile(&tiles, 0, 9).unwrap();
        let sampled = corner.pixels().filter(|p| **p != Palette::default().unsampled);
        assert_eq!(sampled.count(), 6 * 4);
        assert!(*corner.get_pixel(5, 12) != Palette::default().unsampled);
        assert_eq!(*corner.get_pixel(6, 12), Palette::default().unsampled);
        assert_eq!(*corner.get_pixel(5, 11), Palette::default().unsampled);
    }

    #[test]
    fn renderer_rejects_bad_settings() {
        assert!(FractalRenderer::new(square(), -0.1, Julia::default()).is_err());
        let renderer = FractalRenderer::new(square(), 0.1, Julia::default()).unwrap();
        match renderer.with_tile_size(0) {
            Err(FractalError::InvalidTileSize { .. }) => {}
            _ => panic!("expected InvalidTileSize"),
        }
    }

    #[test]
    fn always_bounded_fills_the_raster() {
        let renderer = FractalRenderer::new(square(), 0.5, always_bounded)
            .unwrap()
            .with_tile_size(2)
            .unwrap();
        let raster = renderer.render().unwrap();
        assert_eq!(raster.dimensions(), (4, 4));
        assert!(raster.pixels().all(|p| *p == Palette::default().bounded));
    }

    #[test]
    fn threaded_rendering_matches_sequential() {
        let region = Region::new(-1.5, 1.5, -1.0, 1.0).unwrap();
        let sequential = FractalRenderer::new(region, 0.02, Julia::default())
            .unwrap()
            .with_tile_size(16)
            .unwrap();
        let threaded = FractalRenderer::new(region, 0.02, Julia::default())
            .unwrap()
            .with_tile_size(16)
            .unwrap()
            .with_threads(4);
        let expected = sequential.render().unwrap();
        let actual = threaded.render().unwrap();
        assert_eq!(expected.dimensions(), actual.dimensions());
        assert!(expected.into_raw() == actual.into_raw());
    }

    #[test]
    fn zero_threads_means_one() {
        let renderer = FractalRenderer::new(square(), 0.5, always_bounded)
            .unwrap()
            .with_threads(0);
        assert_eq!(renderer.threads, 1);
    }

    #[test]
    fn a_panicking_evaluator_is_reported() {
        let explosive = |_: Complex<f64>| -> Escape { panic!("boom") };
        let renderer = FractalRenderer::new(square(), 0.5, explosive)
            .unwrap()
            .with_tile_size(2)
            .unwrap()
            .with_threads(2);
        match renderer.render() {
            Err(FractalError::WorkerPanicked) => {}
            other => panic!("expected WorkerPanicked, got {:?}", other.map(|r| r.dimensions())),
        }
    }
}
