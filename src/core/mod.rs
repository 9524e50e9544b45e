// Module declarations
pub mod error;
pub mod value;
pub mod params;
pub mod options;

// Re-exports for convenience
pub use error::{ErrorKind, ExecutionSource, MapperError, Result};
pub use value::{Value, ValueKind};
pub use params::ParamBag;
pub use options::MapperOptions;
