use std::fmt::Debug;
use std::sync::Arc;

use num_traits::Float;

use crate::device::StorageDevice;
use crate::error::{FerrogradError, Result};
use crate::memory::{Allocation, MemoryPool};
use crate::types::DType;

/// Typed element storage backing a [`Buffer`].
#[derive(Debug, Clone, PartialEq)]
pub enum HostData {
    /// Buffer holding f32 data.
    F32(Vec<f32>),
    /// Buffer holding f64 data.
    F64(Vec<f64>),
}

impl HostData {
    pub fn dtype(&self) -> DType {
        match self {
            HostData::F32(_) => DType::F32,
            HostData::F64(_) => DType::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            HostData::F32(v) => v.len(),
            HostData::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn byte_len(&self) -> usize {
        self.len() * self.dtype().size_of()
    }

    /// Widens every element to f64 (lossless for both supported dtypes).
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match self {
            HostData::F32(v) => v.iter().map(|&x| x as f64).collect(),
            HostData::F64(v) => v.clone(),
        }
    }

    /// Narrows `values` into storage of the requested dtype.
    pub fn from_f64_vec(dtype: DType, values: Vec<f64>) -> Self {
        match dtype {
            DType::F32 => HostData::F32(values.into_iter().map(|x| x as f32).collect()),
            DType::F64 => HostData::F64(values),
        }
    }

    /// Little-endian byte image, used by the persistence archive.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            HostData::F32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            HostData::F64(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        }
    }

    /// Parses a little-endian byte image produced by [`HostData::to_le_bytes`].
    pub fn from_le_bytes(dtype: DType, bytes: &[u8]) -> Result<Self> {
        let width = dtype.size_of();
        if bytes.len() % width != 0 {
            return Err(FerrogradError::Serialization(format!(
                "buffer of {} bytes is not a whole number of {:?} elements",
                bytes.len(),
                dtype
            )));
        }
        let data = match dtype {
            DType::F32 => HostData::F32(
                bytes
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            DType::F64 => HostData::F64(
                bytes
                    .chunks_exact(8)
                    .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
                    .collect(),
            ),
        };
        Ok(data)
    }
}

/// Element types the reference kernels are generic over.
pub trait Element: Float + Debug + Send + Sync + 'static {
    const DTYPE: DType;

    fn slice(data: &HostData) -> Option<&[Self]>;

    fn wrap(values: Vec<Self>) -> HostData;

    fn from_f64(value: f64) -> Self;
}

impl Element for f32 {
    const DTYPE: DType = DType::F32;

    fn slice(data: &HostData) -> Option<&[Self]> {
        match data {
            HostData::F32(v) => Some(v),
            _ => None,
        }
    }

    fn wrap(values: Vec<Self>) -> HostData {
        HostData::F32(values)
    }

    fn from_f64(value: f64) -> Self {
        value as f32
    }
}

impl Element for f64 {
    const DTYPE: DType = DType::F64;

    fn slice(data: &HostData) -> Option<&[Self]> {
        match data {
            HostData::F64(v) => Some(v),
            _ => None,
        }
    }

    fn wrap(values: Vec<Self>) -> HostData {
        HostData::F64(values)
    }

    fn from_f64(value: f64) -> Self {
        value
    }
}

/// An externally-owned numeric buffer living on one device.
///
/// When the buffer was created through a [`MemoryPool`] it carries an
/// [`Allocation`]; dropping the buffer returns its bytes to that pool.
#[derive(Debug)]
pub struct Buffer {
    data: HostData,
    device: StorageDevice,
    allocation: Option<Allocation>,
}

impl Buffer {
    /// Allocates a buffer on `device`, accounted in `pool` when one is given.
    pub fn new(data: HostData, device: StorageDevice, pool: Option<&Arc<MemoryPool>>) -> Result<Self> {
        let allocation = match pool {
            Some(pool) => Some(pool.allocate(device, data.byte_len())?),
            None => None,
        };
        Ok(Buffer {
            data,
            device,
            allocation,
        })
    }

    /// Wraps CPU data without pool accounting.
    pub fn unaccounted(data: HostData) -> Self {
        Buffer {
            data,
            device: StorageDevice::Cpu,
            allocation: None,
        }
    }

    pub fn data(&self) -> &HostData {
        &self.data
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    pub fn device(&self) -> StorageDevice {
        self.device
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The pool this buffer is accounted in, if any.
    pub fn pool(&self) -> Option<&Arc<MemoryPool>> {
        self.allocation.as_ref().map(|a| a.pool())
    }

    /// Attempts to view the elements as `T`.
    ///
    /// Returns an error if the buffer does not hold `T` elements.
    pub fn try_slice<T: Element>(&self) -> Result<&[T]> {
        T::slice(&self.data).ok_or_else(|| FerrogradError::DtypeMismatch {
            expected: T::DTYPE,
            actual: self.dtype(),
            operation: "try_slice".to_string(),
        })
    }
}
