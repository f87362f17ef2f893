//! Parameters, the layer registry and the reference layers.

pub mod init;
pub mod layer;
pub mod layers;
pub mod parameter;

// Re-export common items
pub use init::Init;
pub use layer::{Layer, NamedParams, Params, Registry, Slot, WeightOwner};
pub use layers::{Linear, ReLU, Residual, Sequential};
pub use parameter::Parameter;
