//! Computation graph: nodes, backward propagation and teardown.

pub mod cleanup;
pub mod function;
pub mod graph;
pub mod scope;
pub mod variable;

pub use cleanup::{cleanup_graph, cleanup_roots, CleanupReport, GraphCleaner};
pub use function::{Function, FunctionId, Operation};
pub use scope::{with_scope, BatchScope};
pub use variable::{Variable, VariableId};
