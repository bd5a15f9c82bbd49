//! One-dimensional interpolation kernels
//!
//! A kernel is a closure around a weighting function with a finite width.
//! Kernels are evaluated at offsets in `[-width/2, width/2]` and return zero
//! outside that range.

use crate::types::{SarError, SarResult};
use num_complex::Complex;
use std::f64::consts::PI;

/// Weighting function with finite support
pub trait Kernel: Send + Sync {
    /// Evaluate kernel at offset `x`
    fn eval(&self, x: f64) -> f64;

    /// Total width of the kernel, in samples
    fn width(&self) -> f64;

    fn halfwidth(&self) -> f64 {
        self.width() / 2.0
    }
}

/// Normalized sinc, sin(pi x) / (pi x)
pub fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        let px = PI * x;
        px.sin() / px
    }
}

/// Triangle function
#[derive(Debug, Clone)]
pub struct BartlettKernel {
    halfwidth: f64,
}

impl BartlettKernel {
    pub fn new(width: f64) -> SarResult<Self> {
        if !(width > 0.0 && width.is_finite()) {
            return Err(SarError::InvalidInput(format!(
                "Bartlett kernel width must be positive, got {}",
                width
            )));
        }
        Ok(Self {
            halfwidth: width / 2.0,
        })
    }
}

impl Kernel for BartlettKernel {
    fn eval(&self, x: f64) -> f64 {
        let ax = x.abs();
        if ax > self.halfwidth {
            return 0.0;
        }
        1.0 - ax / self.halfwidth
    }

    fn width(&self) -> f64 {
        self.halfwidth * 2.0
    }
}

/// Linear kernel, a Bartlett kernel of width 2
#[derive(Debug, Clone)]
pub struct LinearKernel(BartlettKernel);

impl LinearKernel {
    pub fn new() -> Self {
        Self(BartlettKernel { halfwidth: 1.0 })
    }
}

impl Default for LinearKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel for LinearKernel {
    fn eval(&self, x: f64) -> f64 {
        self.0.eval(x)
    }

    fn width(&self) -> f64 {
        self.0.width()
    }
}

/// Keys cubic convolution kernel (a = -0.5), width 4
#[derive(Debug, Clone, Default)]
pub struct CubicKernel;

impl Kernel for CubicKernel {
    fn eval(&self, x: f64) -> f64 {
        const A: f64 = -0.5;
        let ax = x.abs();
        if ax <= 1.0 {
            ((A + 2.0) * ax - (A + 3.0)) * ax * ax + 1.0
        } else if ax < 2.0 {
            ((A * ax - 5.0 * A) * ax + 8.0 * A) * ax - 4.0 * A
        } else {
            0.0
        }
    }

    fn width(&self) -> f64 {
        4.0
    }
}

/// Knab's kernel for interpolating band-limited signals.
///
/// A sinc tapered by a window that depends on the signal bandwidth, given as
/// a fraction of the sample rate.
#[derive(Debug, Clone)]
pub struct KnabKernel {
    halfwidth: f64,
    bandwidth: f64,
}

impl KnabKernel {
    pub fn new(width: f64, bandwidth: f64) -> SarResult<Self> {
        if !(0.0 < bandwidth && bandwidth < 1.0) {
            return Err(SarError::InvalidInput(format!(
                "Knab kernel bandwidth must be in (0, 1), got {}",
                bandwidth
            )));
        }
        if !(width > 0.0) {
            return Err(SarError::InvalidInput(format!(
                "Knab kernel width must be positive, got {}",
                width
            )));
        }
        Ok(Self {
            halfwidth: width / 2.0,
            bandwidth,
        })
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    fn sampling_window(&self, t: f64) -> f64 {
        let c = PI * self.halfwidth * (1.0 - self.bandwidth);
        let tf = t / self.halfwidth;
        // Complex sqrt keeps the window defined right at the edges.
        let y = Complex::new(1.0 - tf * tf, 0.0).sqrt();
        let window = ((y * c).cosh() / c.cosh()).re;
        if window.is_finite() {
            window
        } else {
            0.0
        }
    }
}

impl Kernel for KnabKernel {
    fn eval(&self, x: f64) -> f64 {
        if x.abs() > self.halfwidth {
            return 0.0;
        }
        sinc(x) * self.sampling_window(x)
    }

    fn width(&self) -> f64 {
        self.halfwidth * 2.0
    }
}

/// Lookup-table approximation of another kernel.
///
/// The table samples `|x|` on `[0, halfwidth]`; values in between are
/// linearly interpolated.
#[derive(Debug, Clone)]
pub struct TabulatedKernel {
    halfwidth: f64,
    table: Vec<f64>,
    inv_dx: f64,
}

impl TabulatedKernel {
    pub fn new<K: Kernel + ?Sized>(kernel: &K, n: usize) -> SarResult<Self> {
        if n < 2 {
            return Err(SarError::InvalidInput(format!(
                "Tabulated kernel needs at least 2 samples, got {}",
                n
            )));
        }
        let halfwidth = kernel.halfwidth();
        if !(halfwidth > 0.0 && halfwidth.is_finite()) {
            return Err(SarError::InvalidInput(format!(
                "Cannot tabulate a kernel of width {}",
                kernel.width()
            )));
        }
        let dx = halfwidth / (n - 1) as f64;
        let table = (0..n).map(|i| kernel.eval(i as f64 * dx)).collect();

        Ok(Self {
            halfwidth,
            table,
            inv_dx: 1.0 / dx,
        })
    }
}

impl Kernel for TabulatedKernel {
    fn eval(&self, x: f64) -> f64 {
        let xi = x.abs() * self.inv_dx;
        let i = xi.floor() as usize;
        let imax = self.table.len() - 1;
        if i > imax {
            return 0.0;
        }
        if i == imax {
            return self.table[imax];
        }
        let frac = xi - i as f64;
        self.table[i] * (1.0 - frac) + self.table[i + 1] * frac
    }

    fn width(&self) -> f64 {
        self.halfwidth * 2.0
    }
}
