// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Escape-time membership tests.  An evaluator takes a point on the
//! complex plane and decides whether the recurrence seeded from it
//! stays bounded within a fixed budget of iterations.
//!
//! Iterates that overflow the range of `f64` become infinite or NaN
//! rather than trapping, so every step checks that the iterate is
//! still finite and treats anything else as having escaped.
use num::Complex;

/// The classification of a single sample point.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Escape {
    /// The recurrence stayed inside the threshold.
    Bounded,
    /// The recurrence escaped, or overflowed on the way out.
    Unbounded,
}

/// The capability the tile renderer needs: a total function from a
/// sample point to its classification.  Implementations must never
/// panic, whatever the input.
pub trait EscapeEvaluator: Send + Sync {
    /// Classify one sample point.
    fn classify(&self, point: Complex<f64>) -> Escape;
}

impl<F> EscapeEvaluator for F
where
    F: Fn(Complex<f64>) -> Escape + Send + Sync,
{
    fn classify(&self, point: Complex<f64>) -> Escape {
        self(point)
    }
}

/// Default number of iterations applied after the seed.
pub const DEFAULT_ITERATIONS: usize = 30;

/// Default bound on `|z|^2` for a point to count as bounded.
pub const DEFAULT_THRESHOLD: f64 = 3.0;

/// Default Julia constant.
pub fn default_julia_constant() -> Complex<f64> {
    Complex::new(-0.4, 0.6)
}

#[inline]
fn is_finite(z: &Complex<f64>) -> bool {
    z.re.is_finite() && z.im.is_finite()
}

/// Runs `z <- z^2 + c` from `seed` for `iterations` steps and
/// classifies the result against `threshold`.  This is the saturating
/// form of the test: an overflow at any step, or in the final
/// magnitude, counts as an escape.
pub fn iterate_quadratic(
    seed: Complex<f64>,
    c: Complex<f64>,
    iterations: usize,
    threshold: f64,
) -> Escape {
    let mut z = seed;
    if !is_finite(&z) {
        return Escape::Unbounded;
    }
    for _ in 0..iterations {
        z = z * z + c;
        if !is_finite(&z) {
            return Escape::Unbounded;
        }
    }
    let magnitude = z.norm_sqr();
    if magnitude.is_finite() && magnitude < threshold {
        Escape::Bounded
    } else {
        Escape::Unbounded
    }
}

/// The filled Julia set for a fixed constant: each sample is the
/// starting point of the orbit.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Julia {
    /// The constant added at every step.
    pub c: Complex<f64>,
    /// Iterations after the seed step.
    pub iterations: usize,
    /// Bound on `|z|^2`.
    pub threshold: f64,
}

impl Default for Julia {
    fn default() -> Julia {
        Julia {
            c: default_julia_constant(),
            iterations: DEFAULT_ITERATIONS,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl Julia {
    /// A Julia evaluator for the given constant with the default
    /// budget and threshold.
    pub fn new(c: Complex<f64>) -> Julia {
        Julia {
            c,
            ..Julia::default()
        }
    }
}

impl EscapeEvaluator for Julia {
    fn classify(&self, point: Complex<f64>) -> Escape {
        // The seed is already one step along the orbit.
        let seed = point * point + self.c;
        iterate_quadratic(seed, self.c, self.iterations, self.threshold)
    }
}

/// The Mandelbrot set: each sample is the constant, and every orbit
/// starts at zero.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Mandelbrot {
    /// Iterations after the seed step.
    pub iterations: usize,
    /// Bound on `|z|^2`.
    pub threshold: f64,
}

impl Default for Mandelbrot {
    fn default() -> Mandelbrot {
        Mandelbrot {
            iterations: DEFAULT_ITERATIONS,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl EscapeEvaluator for Mandelbrot {
    fn classify(&self, point: Complex<f64>) -> Escape {
        // 0^2 + c
        iterate_quadratic(point, point, self.iterations, self.threshold)
    }
}
