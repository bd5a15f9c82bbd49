//! Accelerator memory capability
//!
//! The layer buffer only needs four primitives from an accelerator: allocate
//! a number of bytes, release an allocation, and copy whole byte ranges in
//! either direction. Backends implement [`DeviceMemory`]; [`HostDevice`]
//! emulates a device in host memory.

pub mod host;

pub use host::HostDevice;

use std::fmt;

/// Opaque handle to a device allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(u64);

impl DeviceHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dev#{}", self.0)
    }
}

/// Failures reported by a device backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("out of device memory: requested {requested} bytes, {available} available")]
    OutOfMemory { requested: usize, available: usize },

    #[error("invalid device handle {0}")]
    InvalidHandle(DeviceHandle),

    #[error("size mismatch: device buffer holds {device} bytes, host buffer {host} bytes")]
    SizeMismatch { device: usize, host: usize },

    #[error("device backend error: {0}")]
    Backend(String),
}

/// Allocation and copy primitives of an accelerator.
///
/// Copies are synchronous and always cover a whole allocation.
pub trait DeviceMemory: Send + Sync {
    fn allocate(&self, nbytes: usize) -> Result<DeviceHandle, DeviceError>;

    fn release(&self, handle: DeviceHandle) -> Result<(), DeviceError>;

    /// Device to host
    fn copy_to_host(&self, src: DeviceHandle, dst: &mut [u8]) -> Result<(), DeviceError>;

    /// Host to device
    fn copy_to_device(&self, src: &[u8], dst: DeviceHandle) -> Result<(), DeviceError>;

    fn name(&self) -> &str {
        "device"
    }
}
