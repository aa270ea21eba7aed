// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Every tunable of a render in one plain record, with the classic
//! defaults: the square from -1 to 1 on both axes, sampled every 0.01
//! in tiles of 100, against the Julia set for -0.4 + 0.6i.
use error::FractalError;
use escape::{
    default_julia_constant, EscapeEvaluator, Julia, Mandelbrot, DEFAULT_ITERATIONS,
    DEFAULT_THRESHOLD,
};
use num::Complex;
use output::{FileSink, OutputFormat, DEFAULT_OUTPUT};
use planes::{Region, Rounding};
use render::{FractalRenderer, Palette};
use std::path::PathBuf;
use tiles::DEFAULT_TILE_SIZE;

/// Default spacing between samples.
pub const DEFAULT_DENSITY: f64 = 0.01;

/// Which recurrence to iterate.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Formula {
    /// Julia set of the given constant.
    Julia(Complex<f64>),
    /// The Mandelbrot set.
    Mandelbrot,
}

impl Default for Formula {
    fn default() -> Formula {
        Formula::Julia(default_julia_constant())
    }
}

/// Settings for one render.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// `[x_min, x_max, i_min, i_max]`.
    pub bounds: [f64; 4],
    /// Spacing between samples.
    pub density: f64,
    /// Edge length of a tile, in samples.
    pub tile_size: usize,
    /// The recurrence.
    pub formula: Formula,
    /// Iterations after the seed step.
    pub iterations: usize,
    /// Bound on `|z|^2`.
    pub threshold: f64,
    /// Colours.
    pub palette: Palette,
    /// Sample count rounding.
    pub rounding: Rounding,
    /// Worker threads for tile rendering.
    pub threads: usize,
    /// Destination file.
    pub output: PathBuf,
    /// Destination encoding.
    pub format: OutputFormat,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            bounds: [-1.0, 1.0, -1.0, 1.0],
            density: DEFAULT_DENSITY,
            tile_size: DEFAULT_TILE_SIZE,
            formula: Formula::default(),
            iterations: DEFAULT_ITERATIONS,
            threshold: DEFAULT_THRESHOLD,
            palette: Palette::default(),
            rounding: Rounding::default(),
            threads: 1,
            output: PathBuf::from(DEFAULT_OUTPUT),
            format: OutputFormat::Jpeg,
        }
    }
}

impl Settings {
    /// The validated region.
    pub fn region(&self) -> Result<Region, FractalError> {
        let [x_min, x_max, i_min, i_max] = self.bounds;
        Region::new(x_min, x_max, i_min, i_max)
    }

    /// The membership test these settings describe.
    pub fn evaluator(&self) -> Box<dyn EscapeEvaluator> {
        match self.formula {
            Formula::Julia(c) => Box::new(Julia {
                c,
                iterations: self.iterations,
                threshold: self.threshold,
            }),
            Formula::Mandelbrot => Box::new(Mandelbrot {
                iterations: self.iterations,
                threshold: self.threshold,
            }),
        }
    }

    /// Build the renderer.  Fails on an invalid region, density or
    /// tile size.
    pub fn renderer(&self) -> Result<FractalRenderer, FractalError> {
        let renderer = FractalRenderer::from_boxed(self.region()?, self.density, self.evaluator())?
            .with_tile_size(self.tile_size)?
            .with_palette(self.palette)
            .with_rounding(self.rounding)
            .with_threads(self.threads);
        Ok(renderer)
    }

    /// The output sink.
    pub fn sink(&self) -> FileSink {
        FileSink::new(&self.output, self.format)
    }

    /// Render and write the image.
    pub fn run(&self) -> Result<(), FractalError> {
        debug!("rendering with {:?}", self);
        self.renderer()?.render_to(&self.sink())
    }
}
