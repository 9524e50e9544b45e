use thiserror::Error;

/// Boxed error coming back from the external command executor
pub type ExecutionSource = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = MapperError> = std::result::Result<T, E>;

/// Coarse error taxonomy
///
/// Configuration and mapping errors are authoring defects detected at first use;
/// execution errors come from the executor untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Mapping,
    Execution,
}

#[derive(Error, Debug)]
pub enum MapperError {
    #[error("Statement '{0}' not found")]
    StatementNotFound(String),
    #[error("Invalid test expression '{expression}' in statement '{statement}': {reason}")]
    InvalidExpression {
        statement: String,
        expression: String,
        reason: String,
    },
    #[error("Foreach source '{path}' in statement '{statement}' is not a list")]
    NotACollection { statement: String, path: String },
    #[error("Include of '{target}' from statement '{statement}' exceeds the maximum depth of {depth}")]
    IncludeDepthExceeded {
        statement: String,
        target: String,
        depth: usize,
    },
    #[error("Method {contract}.{method}: generic parameter '{parameter}' is not supported")]
    UnsupportedGeneric {
        contract: String,
        method: String,
        parameter: String,
    },
    #[error("Method {contract}.{method}: return tuple has {arity} elements, at most 8 are supported")]
    TupleArity {
        contract: String,
        method: String,
        arity: usize,
    },
    #[error("Method '{0}' is not bound")]
    MethodNotFound(String),
    #[error("Statement '{statement}': {reason}")]
    ShapeMismatch { statement: String, reason: String },
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
    #[error("Invalid statement document: {0}")]
    InvalidDocument(String),
    #[error("No parameterless constructor defined for the target type: [{0}]")]
    NoDefaultConstructor(String),
    #[error("No constructor of [{type_name}] accepts ({signature})")]
    NoMatchingConstructor { type_name: String, signature: String },
    #[error("Column '{column}' required by [{type_name}] is missing from the result set")]
    ColumnNotFound { type_name: String, column: String },
    #[error("Cannot convert {found} into {expected} for '{target}'")]
    Conversion {
        target: String,
        expected: String,
        found: String,
    },
    #[error("Type handler '{0}' is not registered")]
    HandlerNotFound(String),
    #[error(transparent)]
    Execution(ExecutionSource),
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("JSON Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MapperError {
    /// Wrap an executor failure without altering it
    pub fn execution<E>(err: E) -> Self
    where
        E: Into<ExecutionSource>,
    {
        Self::Execution(err.into())
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NoDefaultConstructor(_)
            | Self::NoMatchingConstructor { .. }
            | Self::ColumnNotFound { .. }
            | Self::Conversion { .. }
            | Self::HandlerNotFound(_) => ErrorKind::Mapping,
            Self::Execution(_) => ErrorKind::Execution,
            _ => ErrorKind::Configuration,
        }
    }
}
