//! Device-resident topo layers
//!
//! A [`LayerBuffer`] holds device copies of all nine topo layers for one
//! processing block. The geometry computation fills them in place; at the
//! end of the block only the layers the caller requested are copied back
//! into the host [`TopoLayers`].

use crate::core::topo_layers::{LayerElement, TopoLayer, TopoLayers};
use crate::device::{DeviceHandle, DeviceMemory};
use crate::types::{SarError, SarResult};
use std::sync::Arc;

/// One device allocation, released when dropped
struct DeviceAllocation {
    device: Arc<dyn DeviceMemory>,
    handle: DeviceHandle,
    nbytes: usize,
}

impl Drop for DeviceAllocation {
    fn drop(&mut self) {
        if let Err(e) = self.device.release(self.handle) {
            log::error!(
                "Failed to release {} bytes at {} on {} device: {}",
                self.nbytes,
                self.handle,
                self.device.name(),
                e
            );
            // Device memory is in an unknown state; nothing above us can recover.
            if !std::thread::panicking() {
                panic!("device memory release failed: {}", e);
            }
        }
    }
}

/// Allocations of all nine layers, indexed by [`TopoLayer::index`]
struct OwnedLayers {
    allocations: Vec<DeviceAllocation>,
}

impl OwnedLayers {
    fn allocate(device: &Arc<dyn DeviceMemory>, elements: usize) -> SarResult<Self> {
        let mut owned = OwnedLayers {
            allocations: Vec::with_capacity(TopoLayer::ALL.len()),
        };

        for layer in TopoLayer::ALL {
            let nbytes = elements.checked_mul(layer.element_size()).ok_or_else(|| {
                SarError::InvalidInput(format!(
                    "{} layer of {} elements overflows the address space",
                    layer, elements
                ))
            })?;
            // Early return drops `owned`, releasing what was acquired so far.
            let handle = device.allocate(nbytes).map_err(|e| {
                log::error!("Allocation of {} layer ({} bytes) failed: {}", layer, nbytes, e);
                SarError::Allocation(e)
            })?;
            owned.allocations.push(DeviceAllocation {
                device: Arc::clone(device),
                handle,
                nbytes,
            });
        }

        Ok(owned)
    }

    fn get(&self, layer: TopoLayer) -> &DeviceAllocation {
        &self.allocations[layer.index()]
    }
}

impl Drop for OwnedLayers {
    fn drop(&mut self) {
        // Reverse acquisition order
        while let Some(allocation) = self.allocations.pop() {
            drop(allocation);
        }
    }
}

enum LayerStorage<'a> {
    Owned(OwnedLayers),
    View(&'a OwnedLayers),
}

/// Device copies of the nine topo layers for one block.
///
/// All nine layers are allocated on construction regardless of which layers
/// the host requested, since the geometry computation may need intermediate
/// layers. An owning buffer releases its memory when dropped; a view created
/// with [`LayerBuffer::view`] aliases another buffer and releases nothing.
pub struct LayerBuffer<'a> {
    length: usize,
    width: usize,
    storage: LayerStorage<'a>,
}

impl LayerBuffer<'static> {
    /// Allocate device layers sized from the host layer set
    pub fn new(device: Arc<dyn DeviceMemory>, layers: &TopoLayers) -> SarResult<Self> {
        let (length, width) = (layers.length(), layers.width());
        let elements = length.checked_mul(width).ok_or_else(|| {
            SarError::InvalidInput(format!("Layer shape {}x{} overflows", length, width))
        })?;

        let owned = OwnedLayers::allocate(&device, elements)?;
        log::debug!(
            "Allocated {}x{} topo layers on {} device ({} bytes)",
            length,
            width,
            device.name(),
            owned.allocations.iter().map(|a| a.nbytes).sum::<usize>()
        );

        Ok(Self {
            length,
            width,
            storage: LayerStorage::Owned(owned),
        })
    }
}

impl<'a> LayerBuffer<'a> {
    /// Non-owning view of this buffer's device memory
    pub fn view(&self) -> LayerBuffer<'_> {
        LayerBuffer {
            length: self.length,
            width: self.width,
            storage: LayerStorage::View(self.layers()),
        }
    }

    pub fn is_owner(&self) -> bool {
        matches!(self.storage, LayerStorage::Owned(_))
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Size in bytes of one layer's device buffer
    pub fn nbytes(&self, layer: TopoLayer) -> usize {
        self.layers().get(layer).nbytes
    }

    fn layers(&self) -> &OwnedLayers {
        match &self.storage {
            LayerStorage::Owned(owned) => owned,
            LayerStorage::View(owned) => *owned,
        }
    }

    /// Overwrite a whole device layer from host memory.
    ///
    /// Used by host-side geometry computations; device kernels write the
    /// buffers directly.
    pub fn upload<T: LayerElement>(&mut self, layer: TopoLayer, data: &[T]) -> SarResult<()> {
        let owned = match &self.storage {
            LayerStorage::Owned(owned) => owned,
            LayerStorage::View(_) => {
                return Err(SarError::InvalidInput(format!(
                    "Cannot write {} layer through a read-only view",
                    layer
                )))
            }
        };
        if T::PRECISION != layer.precision() {
            return Err(SarError::InvalidInput(format!(
                "{} layer holds {:?} precision elements",
                layer,
                layer.precision()
            )));
        }
        if data.len() != self.length * self.width {
            return Err(SarError::InvalidInput(format!(
                "{} layer expects {} elements, got {}",
                layer,
                self.length * self.width,
                data.len()
            )));
        }

        let allocation = owned.get(layer);
        allocation
            .device
            .copy_to_device(bytemuck::cast_slice(data), allocation.handle)
            .map_err(SarError::Transfer)
    }

    /// Copy every layer the target has a raster for back to the host.
    ///
    /// Layers the target did not request are skipped without touching host
    /// memory. All writes into the device buffers must be complete before
    /// calling this. Any failed copy aborts the whole call.
    pub fn copy_to_host(&self, target: &mut TopoLayers) -> SarResult<()> {
        if target.length() != self.length || target.width() != self.width {
            return Err(SarError::InvalidInput(format!(
                "Target layers are {}x{}, device layers are {}x{}",
                target.length(),
                target.width(),
                self.length,
                self.width
            )));
        }
        if self.length == 0 || self.width == 0 {
            return Ok(());
        }

        let owned = self.layers();
        // Validate every destination before the first copy
        for layer in TopoLayer::ALL {
            let raster = match target.raster(layer) {
                Some(raster) => raster,
                None => continue,
            };
            let nbytes = owned.get(layer).nbytes;
            if raster.precision() != layer.precision() || raster.nbytes() != nbytes {
                return Err(SarError::InvalidInput(format!(
                    "Host {} raster is {:?} {}x{} ({} bytes), device layer holds {} bytes",
                    layer,
                    raster.precision(),
                    raster.dim().0,
                    raster.dim().1,
                    raster.nbytes(),
                    nbytes
                )));
            }
        }

        let mut copied = 0;
        for layer in TopoLayer::ALL {
            if !target.has_raster(layer) {
                continue;
            }
            let allocation = owned.get(layer);
            let host = target
                .raster_mut(layer)
                .and_then(|raster| raster.as_bytes_mut())
                .ok_or_else(|| {
                    SarError::Processing(format!("Host {} raster is not contiguous", layer))
                })?;
            allocation
                .device
                .copy_to_host(allocation.handle, host)
                .map_err(|e| {
                    log::error!("Copy of {} layer to host failed: {}", layer, e);
                    SarError::Transfer(e)
                })?;
            copied += 1;
        }

        log::debug!("Copied {} of {} topo layers to host", copied, TopoLayer::ALL.len());
        Ok(())
    }
}
