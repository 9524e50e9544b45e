// Module declarations
pub mod command;
pub mod plan;
pub mod mapper;

// Re-exports for convenience
pub use command::CommandExecutor;
pub use plan::{Dispatch, ExecutionPlan, PlanResolver, StatementTarget, TypeShape, MAX_TUPLE_ARITY};
pub use mapper::SqlMapper;
