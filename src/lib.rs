//! sargeo: radar-to-geo resampling and device-resident topo layers
//!
//! Geocoding resamples complex SAR data from radar (azimuth, range)
//! geometry onto a geographic grid. This crate provides the interpolated
//! resampler used per output block and the device buffer that holds the
//! topo layers (target position, incidence and heading angles, simulated
//! amplitude, cross-track distance) while the geometry stage computes them.

pub mod types;
pub mod device;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    SarComplex, SarComplex64, RadarBlock, GeoBlock, BlockOrigin, PixelMap, SarError, SarResult,
};

pub use device::{DeviceMemory, DeviceHandle, DeviceError, HostDevice};

pub use crate::core::{
    interpolate, Interpolator, InterpolationMethod, GeocodeParams, GeocodeBlock, Resampler,
    ResampleSummary, CancellationToken, TopoLayer, TopoLayers, LayerBuffer,
};

/// Python bindings
#[cfg(feature = "python")]
mod python {
    use crate::core::{GeocodeBlock, GeocodeParams, InterpolationMethod, Resampler};
    use crate::types::{BlockOrigin, PixelMap, SarError};
    use ndarray::Array2;
    use numpy::{Complex32, Complex64, IntoPyArray, PyArray2, PyReadonlyArray1, PyReadonlyArray2};
    use pyo3::prelude::*;

    fn to_py_err(e: SarError) -> PyErr {
        PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!("{}", e))
    }

    /// Python module definition
    #[pymodule]
    fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
        m.add_class::<PyResampler>()?;
        Ok(())
    }

    /// Python wrapper for Resampler
    #[pyclass(name = "Resampler")]
    struct PyResampler {
        inner: Resampler,
    }

    #[pymethods]
    impl PyResampler {
        #[new]
        #[pyo3(signature = (method = "bilinear", margin = None))]
        fn new(method: &str, margin: Option<usize>) -> PyResult<Self> {
            let interpolation = match method.to_lowercase().as_str() {
                "nearest" => InterpolationMethod::Nearest,
                "bilinear" => InterpolationMethod::Bilinear,
                "bicubic" => InterpolationMethod::Bicubic,
                "sinc" => InterpolationMethod::Sinc,
                _ => return Err(PyErr::new::<pyo3::exceptions::PyValueError, _>(
                    format!("Invalid interpolation method: {}", method)
                )),
            };
            let params = GeocodeParams {
                interpolation,
                margin,
                ..Default::default()
            };
            let inner = Resampler::new(&params).map_err(to_py_err)?;
            Ok(PyResampler { inner })
        }

        #[getter]
        fn margin(&self) -> usize {
            self.inner.margin()
        }

        #[allow(clippy::too_many_arguments)]
        fn geocode<'py>(
            &self,
            py: Python<'py>,
            radar: PyReadonlyArray2<'py, Complex32>,
            radar_x: PyReadonlyArray1<'py, f64>,
            radar_y: PyReadonlyArray1<'py, f64>,
            geometrical_phase: PyReadonlyArray1<'py, Complex64>,
            geo_shape: (usize, usize),
            azimuth_first_line: i64,
            range_first_pixel: i64,
        ) -> PyResult<&'py PyArray2<Complex32>> {
            let radar = radar.as_array().to_owned();
            let pixels = PixelMap::new(
                radar_x.as_array().to_vec(),
                radar_y.as_array().to_vec(),
                geometrical_phase.as_array().to_vec(),
            )
            .map_err(to_py_err)?;
            let origin = BlockOrigin::new(azimuth_first_line, range_first_pixel);
            let block = GeocodeBlock::new(&radar, origin, &pixels, geo_shape);

            let mut geo = Array2::zeros(geo_shape);
            self.inner.resample_block(&block, &mut geo).map_err(to_py_err)?;
            Ok(geo.into_pyarray(py))
        }

        fn __repr__(&self) -> String {
            format!(
                "Resampler(method='{}', margin={})",
                self.inner.interpolator().name(),
                self.inner.margin()
            )
        }
    }
}
