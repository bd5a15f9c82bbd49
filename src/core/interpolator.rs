//! Two-dimensional interpolators over complex radar blocks

use crate::core::kernels::Kernel;
use crate::types::{SarComplex, SarComplex64};
use ndarray::Array2;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Samples a radar block at a fractional location.
///
/// `x` is the range (column) coordinate and `y` the azimuth (row)
/// coordinate, both local to the block. Callers only invoke an interpolator
/// for locations at least `support_margin()` pixels inside the valid extent.
pub trait Interpolator: Send + Sync {
    fn interpolate(&self, data: &Array2<SarComplex>, x: f64, y: f64) -> SarComplex;

    /// Border, in pixels, the interpolator needs around a sample location
    fn support_margin(&self) -> usize {
        1
    }

    fn name(&self) -> &'static str;
}

/// Interpolation method selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMethod {
    Nearest,
    #[default]
    Bilinear,
    Bicubic,
    Sinc,
}

impl std::fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterpolationMethod::Nearest => write!(f, "nearest"),
            InterpolationMethod::Bilinear => write!(f, "bilinear"),
            InterpolationMethod::Bicubic => write!(f, "bicubic"),
            InterpolationMethod::Sinc => write!(f, "sinc"),
        }
    }
}

/// Nearest-neighbour sampling
#[derive(Debug, Clone, Default)]
pub struct NearestInterpolator;

impl Interpolator for NearestInterpolator {
    fn interpolate(&self, data: &Array2<SarComplex>, x: f64, y: f64) -> SarComplex {
        let (rows, cols) = data.dim();
        let col = x.round();
        let row = y.round();
        if col < 0.0 || row < 0.0 || col as usize >= cols || row as usize >= rows {
            return SarComplex::zero();
        }
        data[[row as usize, col as usize]]
    }

    fn name(&self) -> &'static str {
        "nearest"
    }
}

/// Bilinear interpolation of real and imaginary parts
#[derive(Debug, Clone, Default)]
pub struct BilinearInterpolator;

impl Interpolator for BilinearInterpolator {
    fn interpolate(&self, data: &Array2<SarComplex>, x: f64, y: f64) -> SarComplex {
        let (rows, cols) = data.dim();
        if x < 0.0 || y < 0.0 || rows == 0 || cols == 0 {
            return SarComplex::zero();
        }
        let x1 = x.floor() as usize;
        let y1 = y.floor() as usize;
        if x1 >= cols || y1 >= rows {
            return SarComplex::zero();
        }
        let x2 = (x1 + 1).min(cols - 1);
        let y2 = (y1 + 1).min(rows - 1);

        let dx = x - x1 as f64;
        let dy = y - y1 as f64;

        let v11 = widen(data[[y1, x1]]);
        let v12 = widen(data[[y2, x1]]);
        let v21 = widen(data[[y1, x2]]);
        let v22 = widen(data[[y2, x2]]);

        let interpolated = v11 * (1.0 - dx) * (1.0 - dy)
            + v21 * dx * (1.0 - dy)
            + v12 * (1.0 - dx) * dy
            + v22 * dx * dy;

        narrow(interpolated)
    }

    fn name(&self) -> &'static str {
        "bilinear"
    }
}

/// Separable convolution with an arbitrary kernel.
///
/// Taps sit on the integer positions within the kernel half-width of the
/// sample location. Taps falling outside the block contribute nothing.
#[derive(Debug, Clone)]
pub struct KernelInterpolator<K: Kernel> {
    kernel: K,
    name: &'static str,
}

impl<K: Kernel> KernelInterpolator<K> {
    pub fn new(kernel: K, name: &'static str) -> Self {
        Self { kernel, name }
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Integer positions within the kernel support of `t`, clipped to `0..len`
    fn taps(&self, t: f64, len: usize) -> Range<usize> {
        let h = self.kernel.halfwidth();
        let first = (t - h).ceil().max(0.0);
        let end = ((t + h).floor() + 1.0).min(len as f64);
        if !(first < end) {
            return 0..0;
        }
        first as usize..end as usize
    }
}

impl<K: Kernel> Interpolator for KernelInterpolator<K> {
    fn interpolate(&self, data: &Array2<SarComplex>, x: f64, y: f64) -> SarComplex {
        let (rows, cols) = data.dim();
        let cols_range = self.taps(x, cols);

        let mut acc = SarComplex64::zero();
        for row in self.taps(y, rows) {
            let wy = self.kernel.eval(y - row as f64);
            if wy == 0.0 {
                continue;
            }
            for col in cols_range.clone() {
                let wx = self.kernel.eval(x - col as f64);
                acc += widen(data[[row, col]]) * (wx * wy);
            }
        }
        narrow(acc)
    }

    fn support_margin(&self) -> usize {
        self.kernel.halfwidth().ceil().max(1.0) as usize
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

#[inline]
fn widen(v: SarComplex) -> SarComplex64 {
    SarComplex64::new(v.re as f64, v.im as f64)
}

#[inline]
pub(crate) fn narrow(v: SarComplex64) -> SarComplex {
    SarComplex::new(v.re as f32, v.im as f32)
}
