// Core modules of the engine
pub mod autograd;
pub mod buffer;
pub mod config;
pub mod device;
pub mod error;
pub mod kernels;
pub mod memory;
pub mod ops;
pub mod parallel;
pub mod tensor;
pub mod types;
pub mod value_cell;

// Training surface built on the graph
pub mod nn;
pub mod optim;
pub mod persist;
pub mod utils;

// Re-export the common types so they are reachable as `ferrograd_core::Tensor` etc.
pub use autograd::{BatchScope, Function, Variable};
pub use config::{Context, EngineConfig};
pub use device::StorageDevice;
pub use error::{FerrogradError, Result};
pub use tensor::Tensor;
pub use types::DType;
