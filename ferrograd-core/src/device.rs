use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Represents the physical location where tensor data is stored.
///
/// The accelerator variant is host-backed: its allocations are accounted
/// separately by the [`MemoryPool`](crate::memory::MemoryPool) so that device
/// capacity and migration behave like real accelerator memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StorageDevice {
    /// Data is stored in main system memory (RAM).
    #[default]
    Cpu,
    /// Data is stored in accelerator memory.
    Gpu,
}

impl StorageDevice {
    /// Short lowercase label used in logs and archive indexes.
    pub fn label(&self) -> &'static str {
        match self {
            StorageDevice::Cpu => "cpu",
            StorageDevice::Gpu => "gpu",
        }
    }
}
