// Module declarations
mod common;
pub mod expression;
pub mod placeholder;
pub mod command;

// Re-export all public types
pub use expression::{parse_test, CompareOp, Expr};
pub use placeholder::{scan, Segment};
pub use command::{SqlCommandAnalyzer, SqlCommandType};
