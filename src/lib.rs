// mapsql - SQL-mapping engine in Rust
// Dynamic SQL templates, compiled row mappers and repository binding

// Clippy configuration - allow non-critical warnings
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::cognitive_complexity)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::format_push_string)]
#![allow(clippy::wildcard_enum_match_arm)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::type_complexity)]
#![allow(clippy::module_name_repetitions)]

// Values, parameter bags, errors, options
pub mod core;

// nom parsers (test expressions, placeholders, command classification)
pub mod parser;

// Statement model, tag tree, result maps, catalog
pub mod statement;

// Dynamic SQL evaluation and per-call request context
pub mod evaluator;

// Row sources, type handlers, compiled row mappers
pub mod mapping;

// Command executor seam, execution plans, SqlMapper facade
pub mod executor;

// Contract descriptors and repository binding
pub mod repository;

// Re-export commonly used types for convenience
pub use core::{ErrorKind, MapperError, MapperOptions, ParamBag, Result, Value, ValueKind};
pub use statement::{ExecuteBehavior, Statement, StatementCatalog, StatementRegistry, Tag};
pub use evaluator::{RequestContext, TagEvaluator};
pub use mapping::{DataSet, DataTable, Entity, MapperCache, MemoryRowSource, RowSource};
pub use executor::{CommandExecutor, ExecutionPlan, PlanResolver, SqlMapper, TypeShape};
pub use repository::{ContractDescriptor, MethodDescriptor, Repository, RepositoryBuilder};
