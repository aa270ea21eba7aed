#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tiled escape-time fractal renderer
//!
//! An escape-time fractal such as a Julia or Mandelbrot set is drawn
//! by taking every point of a rectangle of the complex plane, feeding
//! it to a quadratic recurrence, and asking whether the orbit stays
//! small after a fixed number of steps.  Points that stay small get
//! one colour, points that run off to infinity get another.
//!
//! Rather than sampling the whole rectangle at once, the region is cut
//! into square tiles of a fixed number of samples.  Each tile is
//! sampled, classified and painted on its own, which bounds the memory
//! any one step needs and lets the tiles be handed out to worker
//! threads.  The finished tiles are then stitched back together, top
//! row first, into a single image and handed to a sink.
//!
//! ```no_run
//! use fractals::{FileSink, FractalRenderer, Julia, Region};
//!
//! let region = Region::new(-1.0, 1.0, -1.0, 1.0).unwrap();
//! let renderer = FractalRenderer::new(region, 0.01, Julia::default()).unwrap();
//! renderer.render_to(&FileSink::default()).unwrap();
//! ```

extern crate crossbeam;
#[macro_use]
extern crate failure;
extern crate image;
extern crate itertools;
#[macro_use]
extern crate log;
extern crate num;

pub mod config;
pub mod error;
pub mod escape;
pub mod output;
pub mod planes;
pub mod render;
pub mod stitch;
pub mod tiles;

pub use config::{Formula, Settings};
pub use error::FractalError;
pub use escape::{Escape, EscapeEvaluator, Julia, Mandelbrot};
pub use output::{FileSink, OutputFormat, RasterSink};
pub use planes::{PlaneSampler, Region, Rounding, SampleGrid};
pub use render::{FractalRenderer, Palette, TileRenderer};
pub use stitch::ImageStitcher;
pub use tiles::{Arrangement, GridPartitioner};
