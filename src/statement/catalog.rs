//! Statement lookup
//!
//! `StatementCatalog` is the seam to whatever loads statement definitions.
//! `StatementRegistry` is the in-memory implementation, fillable from a JSON
//! `SqlMapDocument`.

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::model::{CommandType, DataSourceChoice, ExecuteBehavior, Statement};
use super::result_map::{MultipleResultMap, ParameterMap, ResultMap, ResultSlot};
use super::tag::Tag;
use crate::core::{MapperError, Result};

pub trait StatementCatalog: Send + Sync {
    /// Fails with `StatementNotFound` naming `scope.id`
    fn get(&self, scope: &str, id: &str) -> Result<Arc<Statement>>;
}

#[derive(Debug, Default)]
pub struct StatementRegistry {
    statements: HashMap<String, Arc<Statement>>,
}

impl StatementRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a statement
    pub fn insert(&mut self, statement: Statement) -> Arc<Statement> {
        let statement = Arc::new(statement);
        self.statements.insert(statement.full_id(), Arc::clone(&statement));
        statement
    }

    #[must_use]
    pub fn with(mut self, statement: Statement) -> Self {
        self.insert(statement);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Sorted full ids of every registered statement
    #[must_use]
    pub fn full_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.statements.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn load_json(&mut self, json: &str) -> Result<usize> {
        let document: SqlMapDocument = serde_json::from_str(json)?;
        self.load_document(document)
    }

    /// Register every statement of a document, resolving map references by id
    pub fn load_document(&mut self, document: SqlMapDocument) -> Result<usize> {
        let scope = document.scope;
        let result_maps: HashMap<String, Arc<ResultMap>> = document
            .result_maps
            .into_iter()
            .map(|m| (m.id.clone(), Arc::new(m)))
            .collect();
        let parameter_maps: HashMap<String, Arc<ParameterMap>> = document
            .parameter_maps
            .into_iter()
            .map(|m| (m.id.clone(), Arc::new(m)))
            .collect();

        let lookup_result_map = |id: &str, owner: &str| {
            result_maps.get(id).cloned().ok_or_else(|| {
                MapperError::InvalidDocument(format!("{scope}.{owner}: unknown result map '{id}'"))
            })
        };

        let mut multiple_result_maps = HashMap::new();
        for def in document.multiple_result_maps {
            let mut results = Vec::with_capacity(def.results.len());
            for slot in def.results {
                let result_map = match slot.result_map.as_deref() {
                    Some(id) => Some(lookup_result_map(id, &def.id)?),
                    None => None,
                };
                results.push(ResultSlot { property: slot.property, result_map });
            }
            multiple_result_maps.insert(
                def.id.clone(),
                Arc::new(MultipleResultMap { id: def.id, results }),
            );
        }

        let mut loaded = 0;
        for def in document.statements {
            let tags = match (def.sql, def.tags.is_empty()) {
                (Some(sql), true) => vec![Tag::text(sql)],
                (None, false) => def.tags,
                (Some(_), false) => {
                    return Err(MapperError::InvalidDocument(format!(
                        "{scope}.{}: both sql and tags are given",
                        def.id
                    )));
                }
                (None, true) => {
                    return Err(MapperError::InvalidDocument(format!(
                        "{scope}.{}: statement has no body",
                        def.id
                    )));
                }
            };

            let mut statement = Statement::new(scope.clone(), def.id.clone(), tags)
                .with_command_type(def.command_type)
                .with_execute(def.execute)
                .with_source_choice(def.source_choice);

            if let Some(id) = def.result_map.as_deref() {
                statement = statement.with_result_map(lookup_result_map(id, &def.id)?);
            }
            if let Some(id) = def.parameter_map.as_deref() {
                let map = parameter_maps.get(id).cloned().ok_or_else(|| {
                    MapperError::InvalidDocument(format!("{scope}.{}: unknown parameter map '{id}'", def.id))
                })?;
                statement = statement.with_parameter_map(map);
            }
            if let Some(id) = def.multiple_result_map.as_deref() {
                let map = multiple_result_maps.get(id).cloned().ok_or_else(|| {
                    MapperError::InvalidDocument(format!(
                        "{scope}.{}: unknown multiple result map '{id}'",
                        def.id
                    ))
                })?;
                statement = statement.with_multiple_result_map(map);
            }

            self.insert(statement);
            loaded += 1;
        }
        Ok(loaded)
    }
}

impl StatementCatalog for StatementRegistry {
    fn get(&self, scope: &str, id: &str) -> Result<Arc<Statement>> {
        let full_id = format!("{scope}.{id}");
        self.statements
            .get(&full_id)
            .cloned()
            .ok_or(MapperError::StatementNotFound(full_id))
    }
}

/// Serialized form of one scope's statements
#[derive(Debug, Deserialize)]
pub struct SqlMapDocument {
    pub scope: String,
    #[serde(default)]
    pub result_maps: Vec<ResultMap>,
    #[serde(default)]
    pub parameter_maps: Vec<ParameterMap>,
    #[serde(default)]
    pub multiple_result_maps: Vec<MultipleResultMapDef>,
    pub statements: Vec<StatementDef>,
}

#[derive(Debug, Deserialize)]
pub struct MultipleResultMapDef {
    pub id: String,
    pub results: Vec<ResultSlotDef>,
}

#[derive(Debug, Deserialize)]
pub struct ResultSlotDef {
    #[serde(default)]
    pub property: Option<String>,
    #[serde(default)]
    pub result_map: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatementDef {
    pub id: String,
    #[serde(default)]
    pub sql: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub command_type: CommandType,
    #[serde(default)]
    pub execute: ExecuteBehavior,
    #[serde(default)]
    pub source_choice: DataSourceChoice,
    #[serde(default)]
    pub result_map: Option<String>,
    #[serde(default)]
    pub parameter_map: Option<String>,
    #[serde(default)]
    pub multiple_result_map: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "scope": "User",
        "result_maps": [
            {"id": "UserMap", "properties": [{"name": "name", "column": "user_name"}]}
        ],
        "multiple_result_maps": [
            {"id": "UserGraph", "results": [{}, {"property": "roles", "result_map": "UserMap"}]}
        ],
        "statements": [
            {"id": "GetList", "sql": "SELECT * FROM users", "result_map": "UserMap"},
            {"id": "Delete", "sql": "DELETE FROM users WHERE id = :id", "source_choice": "Write"},
            {"id": "GetGraph", "sql": "SELECT 1; SELECT 2", "multiple_result_map": "UserGraph"}
        ]
    }"#;

    #[test]
    fn test_load_document() {
        let mut registry = StatementRegistry::new();
        assert_eq!(registry.load_json(DOCUMENT).unwrap(), 3);
        assert_eq!(registry.full_ids(), vec!["User.Delete", "User.GetGraph", "User.GetList"]);

        let list = registry.get("User", "GetList").unwrap();
        assert_eq!(list.result_map.as_ref().unwrap().id, "UserMap");
        let delete = registry.get("User", "Delete").unwrap();
        assert_eq!(delete.source_choice, DataSourceChoice::Write);
        let graph = registry.get("User", "GetGraph").unwrap();
        assert_eq!(graph.multiple_result_map.as_ref().unwrap().position("roles"), Some(1));
    }

    #[test]
    fn test_missing_statement() {
        let registry = StatementRegistry::new();
        let err = registry.get("User", "Nope").unwrap_err();
        assert_eq!(err.to_string(), "Statement 'User.Nope' not found");
    }

    #[test]
    fn test_unknown_result_map_reference() {
        let json = r#"{"scope": "A", "statements": [{"id": "X", "sql": "SELECT 1", "result_map": "Nope"}]}"#;
        let err = StatementRegistry::new().load_json(json).unwrap_err();
        assert!(matches!(err, MapperError::InvalidDocument(_)));
    }
}
