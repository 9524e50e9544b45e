// Module declarations
pub mod context;
pub mod conditions;
pub mod tags;

// Re-exports for convenience
pub use context::{DbParameter, RequestContext};
pub use conditions::{Bindings, ConditionEvaluator, Frame};
pub use tags::TagEvaluator;
