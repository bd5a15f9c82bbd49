//! Host-side topo layer rasters
//!
//! Geometry byproducts computed alongside geocoding: target position,
//! incidence, heading, local incidence, local psi, simulated amplitude and
//! layover/shadow cross-track distance. Every layer is optional; only the
//! layers the caller requests get a host raster.

use ndarray::{Array2, ArrayViewMut2};
use serde::{Deserialize, Serialize};

/// The nine topo layers, in allocation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TopoLayer {
    X,
    Y,
    Z,
    Inc,
    Hdg,
    LocalInc,
    LocalPsi,
    Sim,
    CrossTrack,
}

/// Element type of a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerPrecision {
    Double,
    Single,
}

impl LayerPrecision {
    pub fn element_size(&self) -> usize {
        match self {
            LayerPrecision::Double => std::mem::size_of::<f64>(),
            LayerPrecision::Single => std::mem::size_of::<f32>(),
        }
    }
}

/// Host element types a layer can hold
pub trait LayerElement: bytemuck::Pod {
    const PRECISION: LayerPrecision;
}

impl LayerElement for f64 {
    const PRECISION: LayerPrecision = LayerPrecision::Double;
}

impl LayerElement for f32 {
    const PRECISION: LayerPrecision = LayerPrecision::Single;
}

impl TopoLayer {
    pub const ALL: [TopoLayer; 9] = [
        TopoLayer::X,
        TopoLayer::Y,
        TopoLayer::Z,
        TopoLayer::Inc,
        TopoLayer::Hdg,
        TopoLayer::LocalInc,
        TopoLayer::LocalPsi,
        TopoLayer::Sim,
        TopoLayer::CrossTrack,
    ];

    pub fn precision(&self) -> LayerPrecision {
        match self {
            TopoLayer::X | TopoLayer::Y | TopoLayer::Z | TopoLayer::CrossTrack => {
                LayerPrecision::Double
            }
            TopoLayer::Inc
            | TopoLayer::Hdg
            | TopoLayer::LocalInc
            | TopoLayer::LocalPsi
            | TopoLayer::Sim => LayerPrecision::Single,
        }
    }

    pub fn element_size(&self) -> usize {
        self.precision().element_size()
    }

    /// Position of the layer in [`TopoLayer::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            TopoLayer::X => "x",
            TopoLayer::Y => "y",
            TopoLayer::Z => "z",
            TopoLayer::Inc => "inc",
            TopoLayer::Hdg => "hdg",
            TopoLayer::LocalInc => "localInc",
            TopoLayer::LocalPsi => "localPsi",
            TopoLayer::Sim => "simamp",
            TopoLayer::CrossTrack => "crossTrack",
        }
    }
}

impl std::fmt::Display for TopoLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Host raster backing one requested layer
#[derive(Debug, Clone, PartialEq)]
pub enum LayerRaster {
    Double(Array2<f64>),
    Single(Array2<f32>),
}

impl LayerRaster {
    fn zeros(precision: LayerPrecision, length: usize, width: usize) -> Self {
        match precision {
            LayerPrecision::Double => LayerRaster::Double(Array2::zeros((length, width))),
            LayerPrecision::Single => LayerRaster::Single(Array2::zeros((length, width))),
        }
    }

    pub fn precision(&self) -> LayerPrecision {
        match self {
            LayerRaster::Double(_) => LayerPrecision::Double,
            LayerRaster::Single(_) => LayerPrecision::Single,
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        match self {
            LayerRaster::Double(array) => array.dim(),
            LayerRaster::Single(array) => array.dim(),
        }
    }

    /// Size of the raster in bytes
    pub fn nbytes(&self) -> usize {
        let (rows, cols) = self.dim();
        rows * cols * self.precision().element_size()
    }

    /// Raw bytes of the raster, `None` if it is not contiguous
    pub fn as_bytes_mut(&mut self) -> Option<&mut [u8]> {
        match self {
            LayerRaster::Double(array) => array.as_slice_mut().map(bytemuck::cast_slice_mut),
            LayerRaster::Single(array) => array.as_slice_mut().map(bytemuck::cast_slice_mut),
        }
    }
}

/// Set of host topo rasters sharing one `length x width` shape
#[derive(Debug, Clone)]
pub struct TopoLayers {
    length: usize,
    width: usize,
    rasters: [Option<LayerRaster>; 9],
}

impl TopoLayers {
    /// Layer set with no layer requested
    pub fn new(length: usize, width: usize) -> Self {
        Self {
            length,
            width,
            rasters: Default::default(),
        }
    }

    /// Layer set with the given layers requested and zero-filled
    pub fn with_layers(length: usize, width: usize, layers: &[TopoLayer]) -> Self {
        let mut set = Self::new(length, width);
        for &layer in layers {
            set.request(layer);
        }
        set
    }

    /// Layer set with all nine layers requested
    pub fn all(length: usize, width: usize) -> Self {
        Self::with_layers(length, width, &TopoLayer::ALL)
    }

    /// Request a layer, allocating its host raster if not already present
    pub fn request(&mut self, layer: TopoLayer) {
        let slot = &mut self.rasters[layer.index()];
        if slot.is_none() {
            *slot = Some(LayerRaster::zeros(layer.precision(), self.length, self.width));
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn has_raster(&self, layer: TopoLayer) -> bool {
        self.rasters[layer.index()].is_some()
    }

    /// Requested layers, in allocation order
    pub fn requested(&self) -> Vec<TopoLayer> {
        TopoLayer::ALL
            .iter()
            .copied()
            .filter(|layer| self.has_raster(*layer))
            .collect()
    }

    pub fn raster(&self, layer: TopoLayer) -> Option<&LayerRaster> {
        self.rasters[layer.index()].as_ref()
    }

    /// Callers must keep the raster at the set's shape and the layer's precision
    pub(crate) fn raster_mut(&mut self, layer: TopoLayer) -> Option<&mut LayerRaster> {
        self.rasters[layer.index()].as_mut()
    }

    /// Double precision layer (x, y, z, cross-track)
    pub fn double(&self, layer: TopoLayer) -> Option<&Array2<f64>> {
        match self.raster(layer)? {
            LayerRaster::Double(array) => Some(array),
            LayerRaster::Single(_) => None,
        }
    }

    pub fn double_mut(&mut self, layer: TopoLayer) -> Option<ArrayViewMut2<'_, f64>> {
        match self.raster_mut(layer)? {
            LayerRaster::Double(array) => Some(array.view_mut()),
            LayerRaster::Single(_) => None,
        }
    }

    /// Single precision layer (angles and simulated amplitude)
    pub fn single(&self, layer: TopoLayer) -> Option<&Array2<f32>> {
        match self.raster(layer)? {
            LayerRaster::Single(array) => Some(array),
            LayerRaster::Double(_) => None,
        }
    }

    pub fn single_mut(&mut self, layer: TopoLayer) -> Option<ArrayViewMut2<'_, f32>> {
        match self.raster_mut(layer)? {
            LayerRaster::Single(array) => Some(array.view_mut()),
            LayerRaster::Double(_) => None,
        }
    }
}
