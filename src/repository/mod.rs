// Module declarations
pub mod descriptor;
pub mod returns;
pub mod builder;
pub mod invoke;

// Re-exports for convenience
pub use descriptor::{ContractDescriptor, MethodDescriptor, ParamDescriptor, ParamKind, StatementOverride};
pub use returns::MethodReturn;
pub use builder::{scope_from_template, statement_id, NamingFn, RepositoryBuilder};
pub use invoke::Repository;
