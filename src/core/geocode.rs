//! Interpolated geocoding of complex radar blocks
//!
//! For every pixel of a geo block, the radar-coordinate location computed by
//! the geometry stage is translated into the local frame of the radar block,
//! sampled with an [`Interpolator`], and the geometrical phase of the pixel is
//! removed from the sample. Locations outside the block (with the
//! interpolator's support margin) produce zero.

use crate::core::interpolator::{
    narrow, BilinearInterpolator, InterpolationMethod, Interpolator, KernelInterpolator,
    NearestInterpolator,
};
use crate::core::kernels::{CubicKernel, KnabKernel, TabulatedKernel};
use crate::types::{
    BlockOrigin, GeoBlock, PixelMap, RadarBlock, SarComplex, SarComplex64, SarError, SarResult,
};
use ndarray::{Array2, Axis};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Geocoding resampler parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodeParams {
    /// Interpolation method used to sample the radar block
    pub interpolation: InterpolationMethod,
    /// Total width of the sinc kernel, in samples
    pub sinc_width: f64,
    /// Signal bandwidth as a fraction of the sample rate
    pub sinc_bandwidth: f64,
    /// Lookup table size of the tabulated sinc kernel
    pub sinc_table_size: usize,
    /// Border, in pixels, kept clear of the block edges. Can widen but never
    /// shrink the interpolator's own support margin.
    pub margin: Option<usize>,
}

impl Default for GeocodeParams {
    fn default() -> Self {
        Self {
            interpolation: InterpolationMethod::Bilinear,
            sinc_width: 8.0,
            sinc_bandwidth: 0.8,
            sinc_table_size: 2048,
            margin: None,
        }
    }
}

impl GeocodeParams {
    /// Build the interpolator these parameters describe
    pub fn build_interpolator(&self) -> SarResult<Box<dyn Interpolator>> {
        let interp: Box<dyn Interpolator> = match self.interpolation {
            InterpolationMethod::Nearest => Box::new(NearestInterpolator),
            InterpolationMethod::Bilinear => Box::new(BilinearInterpolator),
            InterpolationMethod::Bicubic => Box::new(KernelInterpolator::new(CubicKernel, "bicubic")),
            InterpolationMethod::Sinc => {
                let knab = KnabKernel::new(self.sinc_width, self.sinc_bandwidth)?;
                let table = TabulatedKernel::new(&knab, self.sinc_table_size)?;
                Box::new(KernelInterpolator::new(table, "sinc"))
            }
        };
        Ok(interp)
    }
}

/// Pixel counts of one resampled block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResampleSummary {
    pub valid_pixels: usize,
    pub total_pixels: usize,
}

impl ResampleSummary {
    /// Percentage of geo pixels that received a sample
    pub fn coverage(&self) -> f64 {
        if self.total_pixels == 0 {
            return 0.0;
        }
        self.valid_pixels as f64 / self.total_pixels as f64 * 100.0
    }

    fn merge(&mut self, other: ResampleSummary) {
        self.valid_pixels += other.valid_pixels;
        self.total_pixels += other.total_pixels;
    }
}

/// Resample a radar block onto a geo block.
///
/// `radar_x`, `radar_y` and `geometrical_phase` are indexed by the row-major
/// position of the geo pixel and must each hold `geo_block.len()` values.
/// `radar_block_width` x `radar_block_length` is the valid extent of
/// `radar_block`, which may be allocated larger. A pixel is sampled when its
/// block-local location lies at least `margin` pixels inside the valid
/// extent; every other pixel is set to zero. The margin is raised to the
/// interpolator's support margin (and to at least 1), so kernel taps never
/// read past the valid extent.
///
/// On error the geo block is left untouched.
#[allow(clippy::too_many_arguments)]
pub fn interpolate(
    radar_block: &RadarBlock,
    geo_block: &mut GeoBlock,
    radar_x: &[f64],
    radar_y: &[f64],
    geometrical_phase: &[SarComplex64],
    radar_block_width: usize,
    radar_block_length: usize,
    azimuth_first_line: i64,
    range_first_pixel: i64,
    interp: &dyn Interpolator,
    margin: usize,
) -> SarResult<ResampleSummary> {
    let (geo_rows, geo_cols) = geo_block.dim();
    let total_pixels = geo_rows * geo_cols;
    if radar_x.len() != total_pixels
        || radar_y.len() != total_pixels
        || geometrical_phase.len() != total_pixels
    {
        return Err(SarError::InvalidInput(format!(
            "Pixel map lengths (x={}, y={}, phase={}) do not match {}x{} geo block",
            radar_x.len(),
            radar_y.len(),
            geometrical_phase.len(),
            geo_rows,
            geo_cols
        )));
    }
    let (radar_rows, radar_cols) = radar_block.dim();
    if radar_block_width > radar_cols || radar_block_length > radar_rows {
        return Err(SarError::InvalidInput(format!(
            "Valid extent {}x{} exceeds radar block {}x{}",
            radar_block_length, radar_block_width, radar_rows, radar_cols
        )));
    }

    let margin = margin.max(interp.support_margin()).max(1) as f64;
    let x_max = radar_block_width as f64 - margin;
    let y_max = radar_block_length as f64 - margin;
    let x_offset = range_first_pixel as f64;
    let y_offset = azimuth_first_line as f64;

    let sample = |kk: usize| -> Option<SarComplex> {
        let x = radar_x[kk] - x_offset;
        let y = radar_y[kk] - y_offset;
        // NaN fails every comparison and lands out of bounds
        if !(x >= margin && x < x_max && y >= margin && y < y_max) {
            return None;
        }
        let value = interp.interpolate(radar_block, x, y);
        let value = SarComplex64::new(value.re as f64, value.im as f64);
        Some(narrow(value * geometrical_phase[kk].conj()))
    };

    let fill_row = |row: usize, mut line: ndarray::ArrayViewMut1<SarComplex>| -> usize {
        let mut valid = 0;
        for (col, out) in line.iter_mut().enumerate() {
            match sample(row * geo_cols + col) {
                Some(value) => {
                    *out = value;
                    valid += 1;
                }
                None => *out = SarComplex::zero(),
            }
        }
        valid
    };

    #[cfg(feature = "parallel")]
    let valid_pixels: usize = {
        use rayon::prelude::*;
        geo_block
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .map(|(row, line)| fill_row(row, line))
            .sum()
    };

    #[cfg(not(feature = "parallel"))]
    let valid_pixels: usize = geo_block
        .axis_iter_mut(Axis(0))
        .enumerate()
        .map(|(row, line)| fill_row(row, line))
        .sum();

    let summary = ResampleSummary {
        valid_pixels,
        total_pixels,
    };
    log::debug!(
        "Resampled {}x{} geo block with {}: {}/{} valid ({:.1}%)",
        geo_rows,
        geo_cols,
        interp.name(),
        summary.valid_pixels,
        summary.total_pixels,
        summary.coverage()
    );
    Ok(summary)
}

/// Flag shared between a driver and whoever may want to stop it.
///
/// Checked between blocks, never inside the per-pixel loop.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// One unit of geocoding work
#[derive(Debug, Clone)]
pub struct GeocodeBlock<'a> {
    /// Radar samples covering the block, possibly with extra margin
    pub radar: &'a RadarBlock,
    /// Valid range extent of `radar`
    pub radar_width: usize,
    /// Valid azimuth extent of `radar`
    pub radar_length: usize,
    pub origin: BlockOrigin,
    pub pixels: &'a PixelMap,
    /// Geo block shape (rows, cols)
    pub geo_shape: (usize, usize),
}

impl<'a> GeocodeBlock<'a> {
    /// Block whose valid extent is the whole radar array
    pub fn new(
        radar: &'a RadarBlock,
        origin: BlockOrigin,
        pixels: &'a PixelMap,
        geo_shape: (usize, usize),
    ) -> Self {
        let (radar_length, radar_width) = radar.dim();
        Self {
            radar,
            radar_width,
            radar_length,
            origin,
            pixels,
            geo_shape,
        }
    }
}

/// Interpolator and margin bundled for repeated block resampling
pub struct Resampler {
    interp: Box<dyn Interpolator>,
    margin: usize,
}

impl Resampler {
    pub fn new(params: &GeocodeParams) -> SarResult<Self> {
        let interp = params.build_interpolator()?;
        Ok(Self::with_interpolator(interp, params.margin))
    }

    /// Use a caller-supplied interpolator; `margin` is clamped to its support margin
    pub fn with_interpolator(interp: Box<dyn Interpolator>, margin: Option<usize>) -> Self {
        let margin = margin
            .unwrap_or(0)
            .max(interp.support_margin())
            .max(1);
        Self { interp, margin }
    }

    pub fn margin(&self) -> usize {
        self.margin
    }

    pub fn interpolator(&self) -> &dyn Interpolator {
        self.interp.as_ref()
    }

    pub fn resample_block(
        &self,
        block: &GeocodeBlock<'_>,
        geo_block: &mut GeoBlock,
    ) -> SarResult<ResampleSummary> {
        if geo_block.dim() != block.geo_shape {
            return Err(SarError::InvalidInput(format!(
                "Geo block is {:?}, expected {:?}",
                geo_block.dim(),
                block.geo_shape
            )));
        }
        interpolate(
            block.radar,
            geo_block,
            &block.pixels.radar_x,
            &block.pixels.radar_y,
            &block.pixels.geometrical_phase,
            block.radar_width,
            block.radar_length,
            block.origin.azimuth_first_line,
            block.origin.range_first_pixel,
            self.interp.as_ref(),
            self.margin,
        )
    }

    /// Resample a sequence of blocks, stopping between blocks if cancelled
    pub fn resample_blocks(
        &self,
        blocks: &[GeocodeBlock<'_>],
        cancel: &CancellationToken,
    ) -> SarResult<Vec<GeoBlock>> {
        log::info!(
            "🗺️  Geocoding {} blocks with {} interpolation (margin {})",
            blocks.len(),
            self.interp.name(),
            self.margin
        );

        let mut outputs = Vec::with_capacity(blocks.len());
        let mut summary = ResampleSummary::default();
        for (index, block) in blocks.iter().enumerate() {
            if cancel.is_cancelled() {
                log::warn!("Geocoding cancelled after {} of {} blocks", index, blocks.len());
                return Err(SarError::Cancelled {
                    completed: index,
                    total: blocks.len(),
                });
            }
            let mut geo_block = Array2::zeros(block.geo_shape);
            summary.merge(self.resample_block(block, &mut geo_block)?);
            outputs.push(geo_block);
        }

        log::info!(
            "✅ Geocoding completed: {:.1}% coverage ({}/{} pixels)",
            summary.coverage(),
            summary.valid_pixels,
            summary.total_pixels
        );
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indexed_block(rows: usize, cols: usize) -> RadarBlock {
        Array2::from_shape_fn((rows, cols), |(i, j)| {
            SarComplex::new((i * cols + j) as f32, 1.0)
        })
    }

    #[test]
    fn test_nearest_scenario_in_bounds() {
        let radar = indexed_block(4, 4);
        let mut geo = Array2::from_elem((1, 1), SarComplex::new(-1.0, -1.0));
        let summary = interpolate(
            &radar,
            &mut geo,
            &[2.0],
            &[2.0],
            &[SarComplex64::new(1.0, 0.0)],
            4,
            4,
            0,
            0,
            &NearestInterpolator,
            1,
        )
        .unwrap();
        assert_eq!(geo[[0, 0]], radar[[2, 2]]);
        assert_eq!(summary.valid_pixels, 1);
    }

    #[test]
    fn test_nearest_scenario_out_of_bounds() {
        let radar = indexed_block(4, 4);
        let mut geo = Array2::from_elem((1, 1), SarComplex::new(-1.0, -1.0));
        let summary = interpolate(
            &radar,
            &mut geo,
            &[10.0],
            &[2.0],
            &[SarComplex64::new(1.0, 0.0)],
            4,
            4,
            0,
            0,
            &NearestInterpolator,
            1,
        )
        .unwrap();
        assert_eq!(geo[[0, 0]], SarComplex::zero());
        assert_eq!(summary.valid_pixels, 0);
        assert_eq!(summary.coverage(), 0.0);
    }

    #[test]
    fn test_length_mismatch_leaves_output_untouched() {
        let radar = indexed_block(4, 4);
        let sentinel = SarComplex::new(7.0, 7.0);
        let mut geo = Array2::from_elem((1, 2), sentinel);
        let result = interpolate(
            &radar,
            &mut geo,
            &[2.0],
            &[2.0, 2.0],
            &[SarComplex64::new(1.0, 0.0); 2],
            4,
            4,
            0,
            0,
            &NearestInterpolator,
            1,
        );
        assert!(matches!(result, Err(SarError::InvalidInput(_))));
        assert!(geo.iter().all(|v| *v == sentinel));
    }

    #[test]
    fn test_valid_extent_larger_than_block_rejected() {
        let radar = indexed_block(4, 4);
        let mut geo = Array2::zeros((1, 1));
        let result = interpolate(
            &radar,
            &mut geo,
            &[2.0],
            &[2.0],
            &[SarComplex64::new(1.0, 0.0)],
            5,
            4,
            0,
            0,
            &NearestInterpolator,
            1,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_params_build_interpolators() {
        for (method, margin) in [
            (InterpolationMethod::Nearest, 1),
            (InterpolationMethod::Bilinear, 1),
            (InterpolationMethod::Bicubic, 2),
            (InterpolationMethod::Sinc, 4),
        ] {
            let params = GeocodeParams {
                interpolation: method,
                ..Default::default()
            };
            let resampler = Resampler::new(&params).unwrap();
            assert_eq!(resampler.margin(), margin);
            assert_eq!(resampler.interpolator().name(), method.to_string());
        }
    }

    #[test]
    fn test_margin_override() {
        let params = GeocodeParams {
            margin: Some(3),
            ..Default::default()
        };
        assert_eq!(Resampler::new(&params).unwrap().margin(), 3);

        let params = GeocodeParams {
            margin: Some(0),
            ..Default::default()
        };
        assert_eq!(Resampler::new(&params).unwrap().margin(), 1);

        // Cannot shrink below the kernel support
        let params = GeocodeParams {
            interpolation: InterpolationMethod::Bicubic,
            margin: Some(1),
            ..Default::default()
        };
        assert_eq!(Resampler::new(&params).unwrap().margin(), 2);
    }

    #[test]
    fn test_bad_sinc_bandwidth_rejected() {
        let params = GeocodeParams {
            interpolation: InterpolationMethod::Sinc,
            sinc_bandwidth: 1.5,
            ..Default::default()
        };
        assert!(Resampler::new(&params).is_err());
    }
}
