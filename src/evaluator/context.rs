//! Per-call request state
//!
//! Built fresh for every invocation, filled by the tag evaluator, read by the
//! executor and the row mapper, then dropped.

use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::core::{ParamBag, Value};
use crate::statement::{CommandType, DataSourceChoice, ResultMap, Statement};

/// Bound parameter in emission order
#[derive(Debug, Clone, PartialEq)]
pub struct DbParameter {
    pub name: String,
    pub value: Value,
}

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub scope: String,
    pub sql_id: String,
    /// Literal SQL used instead of a catalog statement
    pub real_sql: Option<String>,
    pub request: ParamBag,
    /// Caller override; unset falls back to the statement's command type
    pub command_type: Option<CommandType>,
    pub source_choice: DataSourceChoice,
    sql: String,
    parameters: Vec<DbParameter>,
    statement: Option<Arc<Statement>>,
    result_map: Option<Arc<ResultMap>>,
    prepared: bool,
}

impl RequestContext {
    pub fn new(scope: impl Into<String>, sql_id: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            sql_id: sql_id.into(),
            ..Self::default()
        }
    }

    pub fn from_sql(sql: impl Into<String>) -> Self {
        Self {
            real_sql: Some(sql.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_request(mut self, request: ParamBag) -> Self {
        self.request = request;
        self
    }

    #[must_use]
    pub const fn with_command_type(mut self, command_type: CommandType) -> Self {
        self.command_type = Some(command_type);
        self
    }

    /// Command type the executor should use
    #[must_use]
    pub fn command_type(&self) -> CommandType {
        self.command_type.unwrap_or_default()
    }

    #[must_use]
    pub fn is_statement_sql(&self) -> bool {
        self.real_sql.is_none()
    }

    #[must_use]
    pub fn full_sql_id(&self) -> String {
        format!("{}.{}", self.scope, self.sql_id)
    }

    /// Statement identity for caches: the full id, or a fingerprint of literal SQL
    #[must_use]
    pub fn statement_key(&self) -> String {
        match &self.real_sql {
            None => self.full_sql_id(),
            Some(sql) => format!("sql:{}", hex::encode(Sha256::digest(sql.as_bytes()))),
        }
    }

    /// Generated SQL
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn parameters(&self) -> &[DbParameter] {
        &self.parameters
    }

    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    #[must_use]
    pub const fn statement(&self) -> Option<&Arc<Statement>> {
        self.statement.as_ref()
    }

    #[must_use]
    pub const fn result_map(&self) -> Option<&Arc<ResultMap>> {
        self.result_map.as_ref()
    }

    pub fn set_result_map(&mut self, result_map: Option<Arc<ResultMap>>) {
        self.result_map = result_map;
    }

    /// Handler named by the current result map for `column`
    #[must_use]
    pub fn property_handler(&self, column: &str) -> Option<&str> {
        self.result_map
            .as_ref()?
            .property_for_column(column)?
            .handler
            .as_deref()
    }

    #[must_use]
    pub const fn is_prepared(&self) -> bool {
        self.prepared
    }

    pub(crate) fn attach_statement(&mut self, statement: Arc<Statement>) {
        // Caller overrides survive; the defaults take the statement's values
        if self.command_type.is_none() {
            self.command_type = Some(statement.command_type);
        }
        if self.source_choice == DataSourceChoice::Unknown {
            self.source_choice = statement.source_choice;
        }
        self.result_map = statement.result_map_at(0);
        self.statement = Some(statement);
    }

    pub(crate) fn set_output(&mut self, sql: String, parameters: Vec<DbParameter>) {
        self.sql = sql;
        self.parameters = parameters;
        self.prepared = true;
    }
}
