//! Core geocoding modules

pub mod kernels;
pub mod interpolator;
pub mod geocode;
pub mod topo_layers;
pub mod layer_buffer;

// Re-export main types
pub use kernels::{Kernel, BartlettKernel, LinearKernel, CubicKernel, KnabKernel, TabulatedKernel};
pub use interpolator::{
    Interpolator, InterpolationMethod, NearestInterpolator, BilinearInterpolator, KernelInterpolator,
};
pub use geocode::{
    interpolate, GeocodeParams, GeocodeBlock, Resampler, ResampleSummary, CancellationToken,
};
pub use topo_layers::{TopoLayer, TopoLayers, LayerRaster, LayerPrecision, LayerElement};
pub use layer_buffer::LayerBuffer;
