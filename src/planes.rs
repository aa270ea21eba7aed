// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Contains the Region and PlaneSampler types, which describe a
//! rectangle on the complex plane and the grid of sample points taken
//! from it at a fixed density.  The samples are laid out the way an
//! image is: row 0 is the top of the picture, which is the *largest*
//! imaginary value, so the natural bottom-up order of the complex
//! plane is flipped during sampling.
use error::FractalError;
use num::Complex;

/// Describes a rectangle on the complex plane, treating the real part
/// as the x-component and the imaginary part as the y-component.
/// Both ranges are guaranteed to be non-empty.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Region {
    x_min: f64,
    x_max: f64,
    i_min: f64,
    i_max: f64,
}

impl Region {
    /// Constructor.  Takes the real range and the imaginary range of
    /// the rectangle; fails if either range is empty or inverted.
    pub fn new(x_min: f64, x_max: f64, i_min: f64, i_max: f64) -> Result<Region, FractalError> {
        let bounds = (x_min, x_max, i_min, i_max);
        // Negated comparisons so that NaN bounds fail too.
        if !(x_max - x_min > 0.0) {
            return Err(FractalError::invalid_region(
                bounds,
                ::std::f64::NAN,
                "the real range is empty",
            ));
        }
        if !(i_max - i_min > 0.0) {
            return Err(FractalError::invalid_region(
                bounds,
                ::std::f64::NAN,
                "the imaginary range is empty",
            ));
        }
        Ok(Region {
            x_min,
            x_max,
            i_min,
            i_max,
        })
    }

    /// Lower bound on the real axis.
    pub fn x_min(&self) -> f64 {
        self.x_min
    }

    /// Upper bound on the real axis.
    pub fn x_max(&self) -> f64 {
        self.x_max
    }

    /// Lower bound on the imaginary axis.
    pub fn i_min(&self) -> f64 {
        self.i_min
    }

    /// Upper bound on the imaginary axis.
    pub fn i_max(&self) -> f64 {
        self.i_max
    }

    /// Extent along the real axis.
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    /// Extent along the imaginary axis.
    pub fn height(&self) -> f64 {
        self.i_max - self.i_min
    }

    /// True if the point lies within the half-open rectangle
    /// `[x_min, x_max) x [i_min, i_max)`.
    pub fn contains(&self, point: &Complex<f64>) -> bool {
        point.re >= self.x_min
            && point.re < self.x_max
            && point.im >= self.i_min
            && point.im < self.i_max
    }

    pub(crate) fn bounds(&self) -> (f64, f64, f64, f64) {
        (self.x_min, self.x_max, self.i_min, self.i_max)
    }

    /// Rejects a sampling step that would degenerate this region, or
    /// one so fine that a side of the raster no longer fits a `u32`.
    pub(crate) fn check_density(&self, density: f64) -> Result<(), FractalError> {
        if !(density > 0.0) || !density.is_finite() {
            return Err(FractalError::invalid_region(
                self.bounds(),
                density,
                "the density must be a positive, finite step",
            ));
        }
        let limit = f64::from(::std::u32::MAX);
        if !((self.width() / density).ceil() <= limit) || !((self.height() / density).ceil() <= limit)
        {
            return Err(FractalError::invalid_region(
                self.bounds(),
                density,
                "the density is too fine for a raster of u32 dimensions",
            ));
        }
        Ok(())
    }
}

/// How the number of samples along an axis is derived from
/// `extent / density`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Rounding {
    /// Round down: never sample past the region's upper bounds.  A
    /// partial step at the top or right edge goes unsampled.
    Floor,
    /// Round up: always cover the full requested region, counting the
    /// same way the tile partitioner does.
    Ceil,
}

impl Default for Rounding {
    fn default() -> Rounding {
        Rounding::Floor
    }
}

impl Rounding {
    /// The number of whole steps of `density` in `extent`.
    pub fn steps(self, extent: f64, density: f64) -> usize {
        let ratio = extent / density;
        match self {
            Rounding::Floor => ratio.floor() as usize,
            Rounding::Ceil => ratio.ceil() as usize,
        }
    }
}

/// An immutable, row-major grid of complex sample points.  Row 0
/// holds the highest imaginary value.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleGrid {
    width: usize,
    height: usize,
    points: Vec<Complex<f64>>,
}

impl SampleGrid {
    /// Number of samples per row.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The total number of samples in the grid.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Describes that the grid holds no samples at all.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The sample at the given row and column, if it exists.
    pub fn get(&self, row: usize, col: usize) -> Option<Complex<f64>> {
        if row < self.height && col < self.width {
            Some(self.points[row * self.width + col])
        } else {
            None
        }
    }

    /// Iterates the rows from top to bottom.
    pub fn rows(&self) -> ::std::slice::Chunks<Complex<f64>> {
        // chunks() panics on zero; an empty slice yields no rows anyway.
        self.points.chunks(self.width.max(1))
    }

    /// All samples, flattened row-major.
    pub fn points(&self) -> &[Complex<f64>] {
        &self.points
    }
}

/// Maps one region of the complex plane to a grid of sample points
/// spaced `density` apart on both axes.
#[derive(Debug)]
pub struct PlaneSampler {
    region: Region,
    density: f64,
    rounding: Rounding,
}

impl PlaneSampler {
    /// Constructor.  Fails if the density is not a positive, finite
    /// step.
    pub fn new(region: Region, density: f64) -> Result<PlaneSampler, FractalError> {
        PlaneSampler::with_rounding(region, density, Rounding::default())
    }

    /// As `new`, choosing how sample counts are rounded.
    pub fn with_rounding(
        region: Region,
        density: f64,
        rounding: Rounding,
    ) -> Result<PlaneSampler, FractalError> {
        region.check_density(density)?;
        let sampler = PlaneSampler {
            region,
            density,
            rounding,
        };
        if sampler.columns().checked_mul(sampler.rows()).is_none() {
            return Err(FractalError::invalid_region(
                region.bounds(),
                density,
                "the sample count does not fit in memory",
            ));
        }
        Ok(sampler)
    }

    /// Samples along the real axis.
    pub fn columns(&self) -> usize {
        self.rounding.steps(self.region.width(), self.density)
    }

    /// Samples along the imaginary axis.
    pub fn rows(&self) -> usize {
        self.rounding.steps(self.region.height(), self.density)
    }

    /// Given a row and column of the generated grid, counted from the
    /// bottom of the region, return the matching complex number.
    fn point_at(&self, step_row: usize, col: usize) -> Complex<f64> {
        Complex::new(
            self.region.x_min + self.density * (col as f64),
            self.region.i_min + self.density * (step_row as f64),
        )
    }

    /// Rows are generated from the bottom of the block upward and
    /// emitted in reverse, so that row 0 is the top.
    fn grid(&self, first_col: usize, first_step: usize, width: usize, height: usize) -> SampleGrid {
        let mut points = Vec::with_capacity(width * height);
        for step_row in (first_step..first_step + height).rev() {
            for col in first_col..first_col + width {
                points.push(self.point_at(step_row, col));
            }
        }
        SampleGrid {
            width,
            height,
            points,
        }
    }

    /// Produce the whole grid.
    pub fn sample(&self) -> SampleGrid {
        self.grid(0, 0, self.columns(), self.rows())
    }

    /// Produce one square block of the grid, at most `size` samples on
    /// a side, whose lower-left sample is `first_col` steps to the right
    /// of and `first_step` steps above the region's lower-left corner.
    /// Every sample lies on the same lattice as `sample()`.  Samples
    /// past the sampler's counts are left out, so blocks on the right
    /// and top edges may come up short.
    pub fn sample_block(&self, first_col: usize, first_step: usize, size: usize) -> SampleGrid {
        let width = self.columns().saturating_sub(first_col).min(size);
        let height = self.rows().saturating_sub(first_step).min(size);
        self.grid(first_col, first_step, width, height)
    }
}
