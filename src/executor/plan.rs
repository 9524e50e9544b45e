//! Execution-plan resolution
//!
//! Decides which database operation serves a call from the statement's
//! metadata and the caller's declared return shape.

use std::sync::Arc;

use crate::core::{MapperError, Result, ValueKind};
use crate::mapping::ElementShape;
use crate::parser::{SqlCommandAnalyzer, SqlCommandType};
use crate::statement::{CommandType, DataSourceChoice, ExecuteBehavior, Statement, StatementCatalog};

/// Maximum number of result sets a tuple return can receive
pub const MAX_TUPLE_ARITY: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Dispatch {
    #[default]
    Sync,
    Async,
}

/// Declared return shape of a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeShape {
    Void,
    /// Integral return, the affected count of non-queries
    Integer,
    Scalar(ValueKind),
    Collection(&'static str),
    Entity(&'static str),
    Tuple(Vec<ElementShape>),
    Table,
    DataSet,
    /// Returns the mapper itself instead of running a statement
    Accessor,
    /// Open generic parameter; never resolvable
    Generic(String),
}

/// What a call targets: a catalog statement or literal SQL, plus per-call overrides
#[derive(Debug, Clone, Default)]
pub struct StatementTarget {
    /// Contract and method the target belongs to, used in error messages
    pub contract: String,
    pub method: String,
    pub scope: String,
    pub id: String,
    pub sql: Option<String>,
    pub execute: ExecuteBehavior,
    pub command_type: Option<CommandType>,
    pub source_choice: Option<DataSourceChoice>,
}

impl StatementTarget {
    pub fn statement(scope: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn sql(sql: impl Into<String>) -> Self {
        Self {
            sql: Some(sql.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_execute(mut self, execute: ExecuteBehavior) -> Self {
        self.execute = execute;
        self
    }

    fn full_id(&self) -> String {
        format!("{}.{}", self.scope, self.id)
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub scope: String,
    pub id: String,
    pub sql: Option<String>,
    pub behavior: ExecuteBehavior,
    pub dispatch: Dispatch,
    pub shape: TypeShape,
    pub command_type: CommandType,
    pub source_choice: DataSourceChoice,
    /// Flags of the statement text or of the literal SQL
    pub sql_command_type: SqlCommandType,
    pub statement: Option<Arc<Statement>>,
}

impl ExecutionPlan {
    #[must_use]
    pub fn full_id(&self) -> String {
        format!("{}.{}", self.scope, self.id)
    }
}

pub struct PlanResolver;

impl PlanResolver {
    pub fn resolve(
        catalog: &dyn StatementCatalog,
        target: &StatementTarget,
        shape: &TypeShape,
        dispatch: Dispatch,
    ) -> Result<ExecutionPlan> {
        if let TypeShape::Generic(parameter) = shape {
            return Err(MapperError::UnsupportedGeneric {
                contract: target.contract.clone(),
                method: target.method.clone(),
                parameter: parameter.clone(),
            });
        }
        if let TypeShape::Tuple(elements) = shape {
            if elements.len() > MAX_TUPLE_ARITY {
                return Err(MapperError::TupleArity {
                    contract: target.contract.clone(),
                    method: target.method.clone(),
                    arity: elements.len(),
                });
            }
        }

        let (statement, sql_command_type) = match &target.sql {
            Some(sql) => (None, SqlCommandAnalyzer::analyse(sql)),
            None => {
                let statement = catalog.get(&target.scope, &target.id)?;
                let flags = statement.sql_command_type();
                (Some(statement), flags)
            }
        };

        let declared = match (target.execute, &statement) {
            (ExecuteBehavior::Auto, Some(statement)) => statement.execute,
            (declared, _) => declared,
        };
        let has_multiple_results = statement
            .as_ref()
            .is_some_and(|s| s.multiple_result_map.is_some());

        let behavior = match declared {
            ExecuteBehavior::Auto => Self::infer(shape, sql_command_type, has_multiple_results, target)?,
            explicit => explicit,
        };
        if !Self::produces(behavior, shape) {
            return Err(MapperError::ShapeMismatch {
                statement: Self::label(target),
                reason: format!("{behavior:?} cannot produce a {shape:?} return"),
            });
        }

        Ok(ExecutionPlan {
            scope: target.scope.clone(),
            id: target.id.clone(),
            sql: target.sql.clone(),
            behavior,
            dispatch,
            shape: shape.clone(),
            command_type: target
                .command_type
                .or_else(|| statement.as_ref().map(|s| s.command_type))
                .unwrap_or_default(),
            source_choice: target
                .source_choice
                .or_else(|| statement.as_ref().map(|s| s.source_choice))
                .unwrap_or_default(),
            sql_command_type,
            statement,
        })
    }

    fn infer(
        shape: &TypeShape,
        command: SqlCommandType,
        has_multiple_results: bool,
        target: &StatementTarget,
    ) -> Result<ExecuteBehavior> {
        let behavior = match shape {
            TypeShape::Table => ExecuteBehavior::GetDataTable,
            TypeShape::DataSet => ExecuteBehavior::GetDataSet,
            TypeShape::Tuple(_) => ExecuteBehavior::FillMultiple,
            TypeShape::Void | TypeShape::Integer | TypeShape::Scalar(_) => {
                if command.is_select() {
                    ExecuteBehavior::ExecuteScalar
                } else {
                    ExecuteBehavior::Execute
                }
            }
            TypeShape::Collection(_) => ExecuteBehavior::Query,
            TypeShape::Entity(_) if has_multiple_results => ExecuteBehavior::GetNested,
            TypeShape::Entity(_) => ExecuteBehavior::QuerySingle,
            TypeShape::Accessor | TypeShape::Generic(_) => {
                return Err(MapperError::ShapeMismatch {
                    statement: Self::label(target),
                    reason: format!("a {shape:?} return is not backed by a statement"),
                });
            }
        };
        Ok(behavior)
    }

    /// Whether `behavior` can yield a value of `shape`
    #[must_use]
    pub const fn produces(behavior: ExecuteBehavior, shape: &TypeShape) -> bool {
        match behavior {
            ExecuteBehavior::Auto => false,
            ExecuteBehavior::Execute | ExecuteBehavior::ExecuteScalar => {
                matches!(shape, TypeShape::Void | TypeShape::Integer | TypeShape::Scalar(_))
            }
            ExecuteBehavior::QuerySingle => matches!(shape, TypeShape::Entity(_) | TypeShape::Scalar(_)),
            ExecuteBehavior::Query => matches!(shape, TypeShape::Collection(_)),
            ExecuteBehavior::GetNested => matches!(shape, TypeShape::Entity(_)),
            ExecuteBehavior::FillMultiple => matches!(shape, TypeShape::Tuple(_)),
            ExecuteBehavior::GetDataTable => matches!(shape, TypeShape::Table),
            ExecuteBehavior::GetDataSet => matches!(shape, TypeShape::DataSet),
        }
    }

    fn label(target: &StatementTarget) -> String {
        match &target.sql {
            Some(_) if !target.method.is_empty() => format!("{}.{}", target.contract, target.method),
            Some(sql) => sql.clone(),
            None => target.full_id(),
        }
    }
}
