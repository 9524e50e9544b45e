// Module declarations
mod model;
pub mod tag;
pub mod result_map;
pub mod catalog;

// Re-exports for convenience
pub use model::{CommandType, DataSourceChoice, ExecuteBehavior, Statement};
pub use tag::{Tag, Test, TestExpr, TrimMode, When};
pub use result_map::{
    Arg, ConstructorMap, MultipleResultMap, ParameterDef, ParameterMap, Property, ResultMap, ResultSlot,
};
pub use catalog::{SqlMapDocument, StatementCatalog, StatementRegistry};
