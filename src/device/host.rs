//! Device emulated in host memory

use super::{DeviceError, DeviceHandle, DeviceMemory};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Arena {
    next_id: u64,
    buffers: HashMap<u64, Vec<u8>>,
    bytes_in_use: usize,
    allocations: usize,
    releases: usize,
}

/// Host-memory backend for [`DeviceMemory`].
///
/// Used when no accelerator is present and in tests. Keeps allocation
/// accounting and can enforce a capacity limit to emulate an out-of-memory
/// device.
#[derive(Debug, Default)]
pub struct HostDevice {
    arena: Mutex<Arena>,
    capacity: Option<usize>,
}

impl HostDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Device that refuses allocations beyond `capacity` bytes in use
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: Mutex::new(Arena::default()),
            capacity: Some(capacity),
        }
    }

    /// Number of allocations not yet released
    pub fn live_allocations(&self) -> usize {
        self.accounting().buffers.len()
    }

    pub fn bytes_in_use(&self) -> usize {
        self.accounting().bytes_in_use
    }

    /// Total successful allocations over the device lifetime
    pub fn allocation_count(&self) -> usize {
        self.accounting().allocations
    }

    /// Total successful releases over the device lifetime
    pub fn release_count(&self) -> usize {
        self.accounting().releases
    }

    /// Arena for read-only accounting; a poisoned lock still reports its counts
    fn accounting(&self) -> MutexGuard<'_, Arena> {
        self.arena.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Arena>, DeviceError> {
        self.arena
            .lock()
            .map_err(|_| DeviceError::Backend("host device arena poisoned".to_string()))
    }
}

impl DeviceMemory for HostDevice {
    fn allocate(&self, nbytes: usize) -> Result<DeviceHandle, DeviceError> {
        let mut arena = self.lock()?;
        if let Some(capacity) = self.capacity {
            let available = capacity.saturating_sub(arena.bytes_in_use);
            if nbytes > available {
                return Err(DeviceError::OutOfMemory {
                    requested: nbytes,
                    available,
                });
            }
        }

        let id = arena.next_id;
        arena.next_id += 1;
        arena.buffers.insert(id, vec![0u8; nbytes]);
        arena.bytes_in_use += nbytes;
        arena.allocations += 1;
        log::trace!("Host device allocated {} bytes as dev#{}", nbytes, id);
        Ok(DeviceHandle::from_raw(id))
    }

    fn release(&self, handle: DeviceHandle) -> Result<(), DeviceError> {
        let mut arena = self.lock()?;
        let buffer = arena
            .buffers
            .remove(&handle.raw())
            .ok_or(DeviceError::InvalidHandle(handle))?;
        arena.bytes_in_use -= buffer.len();
        arena.releases += 1;
        Ok(())
    }

    fn copy_to_host(&self, src: DeviceHandle, dst: &mut [u8]) -> Result<(), DeviceError> {
        let arena = self.lock()?;
        let buffer = arena
            .buffers
            .get(&src.raw())
            .ok_or(DeviceError::InvalidHandle(src))?;
        if buffer.len() != dst.len() {
            return Err(DeviceError::SizeMismatch {
                device: buffer.len(),
                host: dst.len(),
            });
        }
        dst.copy_from_slice(buffer);
        Ok(())
    }

    fn copy_to_device(&self, src: &[u8], dst: DeviceHandle) -> Result<(), DeviceError> {
        let mut arena = self.lock()?;
        let buffer = arena
            .buffers
            .get_mut(&dst.raw())
            .ok_or(DeviceError::InvalidHandle(dst))?;
        if buffer.len() != src.len() {
            return Err(DeviceError::SizeMismatch {
                device: buffer.len(),
                host: src.len(),
            });
        }
        buffer.copy_from_slice(src);
        Ok(())
    }

    fn name(&self) -> &str {
        "host"
    }
}
