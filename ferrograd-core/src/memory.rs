//! Accounting allocator for externally-owned numeric buffers.
//!
//! Every [`Buffer`](crate::buffer::Buffer) created through a pool holds an
//! [`Allocation`] token. The token gives its bytes back to the pool when it is
//! dropped, so the pool always knows how much memory live graph nodes pin on
//! each device.

use crate::device::StorageDevice;
use crate::error::{FerrogradError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Usage counters for one device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub live_bytes: usize,
    pub peak_bytes: usize,
    pub live_allocations: usize,
    pub total_allocations: usize,
}

#[derive(Debug, Default)]
pub struct MemoryPool {
    usage: Mutex<HashMap<StorageDevice, MemoryStats>>,
    capacity: HashMap<StorageDevice, usize>,
}

impl MemoryPool {
    /// Creates an unbounded pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the number of live bytes on `device`.
    pub fn with_capacity(mut self, device: StorageDevice, bytes: usize) -> Self {
        self.capacity.insert(device, bytes);
        self
    }

    fn lock_usage(&self) -> MutexGuard<'_, HashMap<StorageDevice, MemoryStats>> {
        // The counters stay meaningful even if a holder panicked mid-update.
        self.usage.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Reserves `bytes` on `device`.
    ///
    /// # Errors
    /// Returns `FerrogradError::ResourceExhausted` when the reservation would
    /// exceed the device capacity. The caller is expected to abort the run.
    pub fn allocate(self: &Arc<Self>, device: StorageDevice, bytes: usize) -> Result<Allocation> {
        let mut usage = self.lock_usage();
        let stats = usage.entry(device).or_default();
        if let Some(&cap) = self.capacity.get(&device) {
            let available = cap.saturating_sub(stats.live_bytes);
            if bytes > available {
                log::error!(
                    "allocation of {} bytes on {} refused: {} of {} bytes in use",
                    bytes,
                    device.label(),
                    stats.live_bytes,
                    cap
                );
                return Err(FerrogradError::ResourceExhausted {
                    device,
                    requested: bytes,
                    available,
                });
            }
        }
        stats.live_bytes += bytes;
        stats.peak_bytes = stats.peak_bytes.max(stats.live_bytes);
        stats.live_allocations += 1;
        stats.total_allocations += 1;
        Ok(Allocation {
            pool: Arc::clone(self),
            device,
            bytes,
        })
    }

    fn free(&self, device: StorageDevice, bytes: usize) {
        let mut usage = self.lock_usage();
        let stats = usage.entry(device).or_default();
        stats.live_bytes = stats.live_bytes.saturating_sub(bytes);
        stats.live_allocations = stats.live_allocations.saturating_sub(1);
    }

    /// Snapshot of the counters for `device`.
    pub fn stats(&self, device: StorageDevice) -> MemoryStats {
        self.lock_usage().get(&device).copied().unwrap_or_default()
    }

    pub fn live_bytes(&self, device: StorageDevice) -> usize {
        self.stats(device).live_bytes
    }

    pub fn live_allocations(&self, device: StorageDevice) -> usize {
        self.stats(device).live_allocations
    }

    pub fn capacity(&self, device: StorageDevice) -> Option<usize> {
        self.capacity.get(&device).copied()
    }
}

/// Token for bytes reserved in a [`MemoryPool`]. Dropping it frees them.
#[derive(Debug)]
pub struct Allocation {
    pool: Arc<MemoryPool>,
    device: StorageDevice,
    bytes: usize,
}

impl Allocation {
    pub fn device(&self) -> StorageDevice {
        self.device
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn pool(&self) -> &Arc<MemoryPool> {
        &self.pool
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        log::trace!("freeing {} bytes on {}", self.bytes, self.device.label());
        self.pool.free(self.device, self.bytes);
    }
}
