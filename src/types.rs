use ndarray::Array2;
use num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::device::DeviceError;

/// Complex-valued SAR data type (I + jQ)
pub type SarComplex = Complex<f32>;

/// Double precision complex value used for phase factors
pub type SarComplex64 = Complex<f64>;

/// Block of complex samples in radar coordinates (azimuth x range)
pub type RadarBlock = Array2<SarComplex>;

/// Block of complex samples on the geographic output grid (rows x cols)
pub type GeoBlock = Array2<SarComplex>;

/// Offset of a radar block's first sample within the full swath
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockOrigin {
    pub azimuth_first_line: i64,
    pub range_first_pixel: i64,
}

impl BlockOrigin {
    pub fn new(azimuth_first_line: i64, range_first_pixel: i64) -> Self {
        Self {
            azimuth_first_line,
            range_first_pixel,
        }
    }
}

/// Radar-coordinate location and geometrical phase of every pixel in a geo block.
///
/// All three arrays are indexed by the linearized (row-major) geo pixel
/// position. `radar_x` and `radar_y` are swath-global fractional indices.
#[derive(Debug, Clone, Default)]
pub struct PixelMap {
    /// Range-direction fractional index
    pub radar_x: Vec<f64>,
    /// Azimuth-direction fractional index
    pub radar_y: Vec<f64>,
    /// Unit-magnitude phase factor removed after interpolation
    pub geometrical_phase: Vec<SarComplex64>,
}

impl PixelMap {
    pub fn new(
        radar_x: Vec<f64>,
        radar_y: Vec<f64>,
        geometrical_phase: Vec<SarComplex64>,
    ) -> SarResult<Self> {
        let map = Self {
            radar_x,
            radar_y,
            geometrical_phase,
        };
        map.check_len(map.radar_x.len())?;
        Ok(map)
    }

    /// Number of geo pixels described by this map
    pub fn len(&self) -> usize {
        self.radar_x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.radar_x.is_empty()
    }

    /// Verify that all three arrays describe exactly `expected` pixels
    pub fn check_len(&self, expected: usize) -> SarResult<()> {
        if self.radar_x.len() != expected
            || self.radar_y.len() != expected
            || self.geometrical_phase.len() != expected
        {
            return Err(SarError::InvalidInput(format!(
                "Pixel map lengths (x={}, y={}, phase={}) do not match {} geo pixels",
                self.radar_x.len(),
                self.radar_y.len(),
                self.geometrical_phase.len(),
                expected
            )));
        }
        Ok(())
    }
}

/// Error types for SAR processing
#[derive(Debug, thiserror::Error)]
pub enum SarError {
    #[error("Device allocation error: {0}")]
    Allocation(#[source] DeviceError),

    #[error("Device transfer error: {0}")]
    Transfer(#[source] DeviceError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Processing cancelled after {completed} of {total} blocks")]
    Cancelled { completed: usize, total: usize },

    #[error("Processing error: {0}")]
    Processing(String),
}

/// Result type for SAR operations
pub type SarResult<T> = Result<T, SarError>;
