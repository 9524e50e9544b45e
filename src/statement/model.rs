use serde::Deserialize;
use std::sync::Arc;

use super::result_map::{MultipleResultMap, ParameterMap, ResultMap};
use super::tag::Tag;
use crate::parser::{SqlCommandAnalyzer, SqlCommandType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
pub enum CommandType {
    #[default]
    Text,
    StoredProcedure,
}

/// Data source the executor should route to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
pub enum DataSourceChoice {
    #[default]
    Unknown,
    Write,
    Read,
}

/// Database operation category chosen for a call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
pub enum ExecuteBehavior {
    #[default]
    Auto,
    Execute,
    ExecuteScalar,
    QuerySingle,
    Query,
    GetDataTable,
    GetDataSet,
    FillMultiple,
    GetNested,
}

/// Named SQL template plus execution and result metadata
///
/// Immutable once built; shared between requests as `Arc<Statement>`.
#[derive(Debug, Clone)]
pub struct Statement {
    pub scope: String,
    pub id: String,
    pub command_type: CommandType,
    pub execute: ExecuteBehavior,
    pub source_choice: DataSourceChoice,
    pub tags: Vec<Tag>,
    pub parameter_map: Option<Arc<ParameterMap>>,
    pub result_map: Option<Arc<ResultMap>>,
    pub multiple_result_map: Option<Arc<MultipleResultMap>>,
    sql_command_type: SqlCommandType,
}

impl Statement {
    pub fn new(scope: impl Into<String>, id: impl Into<String>, tags: Vec<Tag>) -> Self {
        let mut text = String::new();
        for tag in &tags {
            tag.for_each_text(&mut |t| {
                text.push_str(t);
                text.push(' ');
            });
        }
        Self {
            scope: scope.into(),
            id: id.into(),
            command_type: CommandType::Text,
            execute: ExecuteBehavior::Auto,
            source_choice: DataSourceChoice::Unknown,
            tags,
            parameter_map: None,
            result_map: None,
            multiple_result_map: None,
            sql_command_type: SqlCommandAnalyzer::analyse(&text),
        }
    }

    /// Statement made of a single plain-text tag
    pub fn from_sql(scope: impl Into<String>, id: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::new(scope, id, vec![Tag::text(sql)])
    }

    #[must_use]
    pub fn full_id(&self) -> String {
        format!("{}.{}", self.scope, self.id)
    }

    #[must_use]
    pub const fn sql_command_type(&self) -> SqlCommandType {
        self.sql_command_type
    }

    #[must_use]
    pub const fn with_command_type(mut self, command_type: CommandType) -> Self {
        self.command_type = command_type;
        self
    }

    #[must_use]
    pub const fn with_execute(mut self, execute: ExecuteBehavior) -> Self {
        self.execute = execute;
        self
    }

    #[must_use]
    pub const fn with_source_choice(mut self, source_choice: DataSourceChoice) -> Self {
        self.source_choice = source_choice;
        self
    }

    #[must_use]
    pub fn with_result_map(mut self, result_map: Arc<ResultMap>) -> Self {
        self.result_map = Some(result_map);
        self
    }

    #[must_use]
    pub fn with_parameter_map(mut self, parameter_map: Arc<ParameterMap>) -> Self {
        self.parameter_map = Some(parameter_map);
        self
    }

    #[must_use]
    pub fn with_multiple_result_map(mut self, map: Arc<MultipleResultMap>) -> Self {
        self.multiple_result_map = Some(map);
        self
    }

    /// Result map for the `index`-th result set
    #[must_use]
    pub fn result_map_at(&self, index: usize) -> Option<Arc<ResultMap>> {
        match &self.multiple_result_map {
            Some(multi) => multi.slot(index).and_then(|slot| slot.result_map.clone()),
            None if index == 0 => self.result_map.clone(),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_type_from_tags() {
        let stmt = Statement::new(
            "User",
            "Update",
            vec![
                Tag::text("UPDATE users"),
                Tag::set_clause(vec![Tag::if_test("name", vec![Tag::text("name = :name,")])]),
                Tag::text("WHERE id = :id"),
            ],
        );
        assert_eq!(stmt.full_id(), "User.Update");
        assert_eq!(stmt.sql_command_type(), SqlCommandType::UPDATE);
        assert!(Statement::from_sql("User", "List", "SELECT * FROM users").sql_command_type().is_select());
    }

    #[test]
    fn test_result_map_at() {
        let map = Arc::new(ResultMap::new("User"));
        let stmt = Statement::from_sql("User", "Get", "SELECT 1").with_result_map(map);
        assert!(stmt.result_map_at(0).is_some());
        assert!(stmt.result_map_at(1).is_none());
    }
}
