//! Engine configuration and the explicit context object passed to layers.

use std::path::Path;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::buffer::HostData;
use crate::device::StorageDevice;
use crate::error::{FerrogradError, Result};
use crate::memory::MemoryPool;
use crate::parallel::WorkerPool;
use crate::tensor::Tensor;
use crate::types::DType;

/// Engine-wide settings. Every field has a default, so a JSON document only
/// needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Device new parameters and inputs are allocated on.
    pub device: StorageDevice,
    /// Default element type for created tensors.
    pub dtype: DType,
    /// Host memory cap in bytes.
    pub cpu_capacity: Option<usize>,
    /// Accelerator memory cap in bytes.
    pub gpu_capacity: Option<usize>,
    /// Batches with more rows than this are split across workers.
    pub parallel_threshold: usize,
    pub max_workers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            device: StorageDevice::Cpu,
            dtype: DType::F32,
            cpu_capacity: None,
            gpu_capacity: None,
            parallel_threshold: 256,
            max_workers: 4,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        log::debug!("loading engine config from {}", path.as_ref().display());
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(FerrogradError::ConfigurationError(
                "max_workers must be at least 1".to_string(),
            ));
        }
        for (device, cap) in [(StorageDevice::Cpu, self.cpu_capacity), (StorageDevice::Gpu, self.gpu_capacity)] {
            if cap == Some(0) {
                return Err(FerrogradError::ConfigurationError(format!(
                    "{} capacity must be positive",
                    device.label()
                )));
            }
        }
        Ok(())
    }

    pub fn capacity(&self, device: StorageDevice) -> Option<usize> {
        match device {
            StorageDevice::Cpu => self.cpu_capacity,
            StorageDevice::Gpu => self.gpu_capacity,
        }
    }
}

/// Configuration, memory pool and worker pool shared by everything built
/// for one training run. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Context {
    config: Arc<EngineConfig>,
    pool: Arc<MemoryPool>,
    workers: Arc<Mutex<Option<Arc<WorkerPool>>>>,
}

impl Context {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let mut pool = MemoryPool::new();
        for device in [StorageDevice::Cpu, StorageDevice::Gpu] {
            if let Some(cap) = config.capacity(device) {
                pool = pool.with_capacity(device, cap);
            }
        }
        log::debug!("context created: {:?}", config);
        Ok(Context {
            config: Arc::new(config),
            pool: Arc::new(pool),
            workers: Arc::new(Mutex::new(None)),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pool(&self) -> &Arc<MemoryPool> {
        &self.pool
    }

    pub fn device(&self) -> StorageDevice {
        self.config.device
    }

    pub fn dtype(&self) -> DType {
        self.config.dtype
    }

    /// The worker pool, started on first use.
    pub fn workers(&self) -> Result<Arc<WorkerPool>> {
        let mut slot = self
            .workers
            .lock()
            .map_err(|_| FerrogradError::LockPoisoned("context worker pool".to_string()))?;
        if let Some(workers) = slot.as_ref() {
            return Ok(Arc::clone(workers));
        }
        let workers = Arc::new(WorkerPool::new(self.config.max_workers, self.config.parallel_threshold)?);
        *slot = Some(Arc::clone(&workers));
        Ok(workers)
    }

    /// Allocates a tensor on the configured device, accounted in the pool.
    pub fn tensor(&self, data: HostData, shape: Vec<usize>) -> Result<Tensor> {
        Tensor::from_host(data, shape, self.config.device, Some(&self.pool))
    }

    /// Allocates a tensor of the configured dtype from f64 values.
    pub fn tensor_from_f64(&self, values: Vec<f64>, shape: Vec<usize>) -> Result<Tensor> {
        self.tensor(HostData::from_f64_vec(self.config.dtype, values), shape)
    }

    pub fn full(&self, shape: &[usize], value: f64) -> Result<Tensor> {
        let numel: usize = shape.iter().product();
        self.tensor_from_f64(vec![value; numel], shape.to_vec())
    }

    pub fn zeros(&self, shape: &[usize]) -> Result<Tensor> {
        self.full(shape, 0.0)
    }
}
