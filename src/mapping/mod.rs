// Module declarations
pub mod row_source;
pub mod handlers;
pub mod entity;
pub mod compiler;
pub mod cache;
pub mod multiple;
pub mod nested;

// Re-exports for convenience
pub use row_source::{DataSet, DataTable, MemoryRowSource, RowSource};
pub use handlers::{read_direct, JsonTypeHandler, TypeHandler, TypeHandlerRegistry};
pub use entity::{Entity, FromValue, Member};
pub use compiler::{MapperCompiler, RowMapper};
pub use cache::{MapperCache, MapperKey};
pub use multiple::{ElementShape, MultipleResult, ResultElement};
pub use nested::{assemble, NestedField, NestedRows};
